//! (72,64) SECDED Hamming block.
//!
//! One block protects an 8 byte message with 9 bytes of storage. Bit 0 holds
//! the overall parity of bits 1..=71, the power-of-two positions hold the
//! group parity bits, and the remaining 64 positions hold the message bits in
//! ascending order. The XOR of the indices of all set bits is zero for an
//! intact block and equals the flipped position after a single upset, which
//! is what makes one-step correction possible.

use crate::bits::{BitView, BitViewMut};

/// Bytes in one decoded message.
pub const MSG_SIZE: usize = 8;
/// Bytes in one encoded block.
pub const BLOCK_SIZE: usize = 9;
/// Bits in one encoded block.
pub const BLOCK_BITS: usize = BLOCK_SIZE * 8;

/// Outcome of scanning a block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorReport {
    /// Block parity and syndrome both check out.
    None,
    /// Exactly one flipped bit, at the given block-local position.
    Single { position: usize },
    /// Two (or an even number of) flipped bits. Not correctable, the block
    /// contents must be treated as lost.
    Double,
}

impl ErrorReport {
    /// Detected error size: 0, 1 or 2.
    pub fn size(&self) -> usize {
        match self {
            ErrorReport::None => 0,
            ErrorReport::Single { .. } => 1,
            ErrorReport::Double => 2,
        }
    }
}

/// A single encoded block.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HammingBlock([u8; BLOCK_SIZE]);

impl HammingBlock {
    pub fn new() -> Self {
        Self([0; BLOCK_SIZE])
    }

    /// Encodes `message` into the block, overwriting its contents.
    pub fn encode(&mut self, message: &[u8; MSG_SIZE]) {
        self.0 = [0; BLOCK_SIZE];
        let source = BitView::new(message);
        let mut block = BitViewMut::new(&mut self.0);

        // Copy message bits into the non-parity positions, accumulating the
        // XOR of every position that receives a 1.
        let mut index_parity = 0usize;
        let mut message_idx = 0;
        for position in 0..BLOCK_BITS {
            if position.is_power_of_two() || position == 0 {
                continue;
            }
            let bit = source.get(message_idx);
            block.set(position, bit);
            if bit {
                index_parity ^= position;
            }
            message_idx += 1;
        }

        // Each bit of the accumulated parity lands at the power-of-two
        // position equal to its value.
        for group in 0..7 {
            block.set(1 << group, index_parity & (1 << group) != 0);
        }

        // Overall parity of bits 1..=71 goes into bit 0.
        let mut set_bits = 0;
        for position in 1..BLOCK_BITS {
            if block.get(position) {
                set_bits += 1;
            }
        }
        block.set(0, set_bits % 2 != 0);
    }

    /// Scans the block without modifying it.
    pub fn scan(&self) -> ErrorReport {
        let block = BitView::new(&self.0);

        let mut index_parity = 0usize;
        let mut set_bits = 0;
        for position in 1..BLOCK_BITS {
            if block.get(position) {
                index_parity ^= position;
                set_bits += 1;
            }
        }
        let block_parity = set_bits % 2 != 0;

        if block.get(0) == block_parity {
            if index_parity == 0 {
                ErrorReport::None
            } else {
                ErrorReport::Double
            }
        } else {
            // The syndrome is the position of the flipped bit. This holds
            // for data bits, group parity bits and the overall parity bit
            // itself (syndrome 0).
            ErrorReport::Single {
                position: index_parity,
            }
        }
    }

    /// Scans the block and repairs a single-bit error in place. Blocks with
    /// larger errors are left untouched, callers decide what to do with them.
    pub fn correct(&mut self) -> ErrorReport {
        let report = self.scan();
        if let ErrorReport::Single { position } = report {
            BitViewMut::new(&mut self.0).flip(position);
        }
        report
    }

    /// Extracts the message bits in ascending position order.
    pub fn decode(&self) -> [u8; MSG_SIZE] {
        let mut message = [0u8; MSG_SIZE];
        let block = BitView::new(&self.0);
        let mut out = BitViewMut::new(&mut message);

        let mut message_idx = 0;
        for position in 0..BLOCK_BITS {
            if position.is_power_of_two() || position == 0 {
                continue;
            }
            out.set(message_idx, block.get(position));
            message_idx += 1;
        }
        message
    }

    /// Overwrites the block with already-encoded bytes.
    pub fn fill(&mut self, encoded: &[u8; BLOCK_SIZE]) {
        self.0 = *encoded;
    }

    /// Zeroes the block. Used after an uncorrectable error so the loss is
    /// explicit rather than silent.
    pub fn clear(&mut self) {
        self.0 = [0; BLOCK_SIZE];
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }

    /// Flips one bit. Ground-test hook for exercising the scrub path.
    pub fn inject_error(&mut self, position: usize) {
        BitViewMut::new(&mut self.0).flip(position);
    }
}
