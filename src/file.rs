//! Interleaved container of Hamming blocks.
//!
//! A file holds `BLOCKS` encoded blocks covering `BLOCKS * 8` logical bytes.
//! On the physical medium the blocks are bit-interleaved: bit `b` of block
//! `k` sits at global bit `k + b * BLOCKS`. A burst of adjacent upsets then
//! lands on many different blocks instead of several bits of one, and each
//! block can only repair one bit.

use crate::bits::{BitView, BitViewMut};
use crate::hamming::{BLOCK_BITS, BLOCK_SIZE, ErrorReport, HammingBlock, MSG_SIZE};
use alloc::vec;
use alloc::vec::Vec;

/// Aggregate result of scrubbing a whole file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScrubReport {
    /// Blocks with any detected error.
    pub num_errors: u32,
    /// Single-bit errors repaired.
    pub corrected: u32,
    /// Uncorrectable blocks. Each one has been zero-cleared.
    pub uncorrected: u32,
}

/// `BLOCKS` Hamming blocks plus the interleave transform.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EncodedFile<const BLOCKS: usize> {
    blocks: [HammingBlock; BLOCKS],
}

impl<const BLOCKS: usize> Default for EncodedFile<BLOCKS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const BLOCKS: usize> EncodedFile<BLOCKS> {
    /// Logical payload capacity in bytes.
    pub const DECODED_BYTES: usize = BLOCKS * MSG_SIZE;
    /// Physical (encoded, interleaved) size in bytes.
    pub const ENCODED_BYTES: usize = BLOCKS * BLOCK_SIZE;

    pub fn new() -> Self {
        Self {
            blocks: [HammingBlock::new(); BLOCKS],
        }
    }

    /// Splits `src` into 8 byte messages and encodes one block per message.
    /// Input shorter than the capacity is zero-padded.
    ///
    /// Panics if `src` exceeds [`Self::DECODED_BYTES`].
    pub fn encode(&mut self, src: &[u8]) {
        assert!(src.len() <= Self::DECODED_BYTES, "input exceeds file capacity");

        let mut message = [0u8; MSG_SIZE];
        for (block_num, block) in self.blocks.iter_mut().enumerate() {
            message.fill(0);
            let start = block_num * MSG_SIZE;
            let end = src.len().min(start + MSG_SIZE);
            if start < end {
                message[..end - start].copy_from_slice(&src[start..end]);
            }
            block.encode(&message);
        }
    }

    /// Populates the blocks from an interleaved physical image.
    ///
    /// Panics if `encoded` is not exactly [`Self::ENCODED_BYTES`] long.
    pub fn fill(&mut self, encoded: &[u8]) {
        assert_eq!(encoded.len(), Self::ENCODED_BYTES, "bad encoded image size");

        let laced = BitView::new(encoded);
        let mut unlaced = [0u8; BLOCK_SIZE];
        for (block_num, block) in self.blocks.iter_mut().enumerate() {
            for block_bit in 0..BLOCK_BITS {
                let value = laced.get(block_num + block_bit * BLOCKS);
                BitViewMut::new(&mut unlaced).set(block_bit, value);
            }
            block.fill(&unlaced);
        }
    }

    /// Returns the interleaved physical image of the file.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::ENCODED_BYTES];
        let mut laced = BitViewMut::new(&mut out);
        for (block_num, block) in self.blocks.iter().enumerate() {
            let bits = BitView::new(block.as_bytes());
            for block_bit in 0..BLOCK_BITS {
                laced.set(block_num + block_bit * BLOCKS, bits.get(block_bit));
            }
        }
        out
    }

    /// Scans and corrects every block. Uncorrectable blocks are zero-cleared
    /// so the data loss shows up as zeroed fields instead of garbage.
    pub fn scrub(&mut self) -> ScrubReport {
        let mut report = ScrubReport::default();
        for block in &mut self.blocks {
            let error = block.correct();
            match error {
                ErrorReport::None => {}
                ErrorReport::Single { .. } => {
                    report.num_errors += 1;
                    report.corrected += 1;
                }
                ErrorReport::Double => {
                    block.clear();
                    report.num_errors += 1;
                    report.uncorrected += 1;
                }
            }
        }
        report
    }

    /// Concatenates the decoded messages in block order.
    pub fn decode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::DECODED_BYTES);
        for block in &self.blocks {
            out.extend_from_slice(&block.decode());
        }
        out
    }

    /// Flips one bit of one block. Ground-test hook.
    pub fn inject_error(&mut self, block_num: usize, position: usize) {
        self.blocks[block_num].inject_error(position);
    }
}
