mod round_trip {
    use edac_store::hamming::{HammingBlock, MSG_SIZE};
    use pretty_assertions::assert_eq;

    #[test]
    fn representative_messages() {
        let messages: [[u8; MSG_SIZE]; 5] = [
            [0x00; MSG_SIZE],
            [0xFF; MSG_SIZE],
            [0xAA; MSG_SIZE],
            [0x55; MSG_SIZE],
            [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF],
        ];

        for message in messages {
            let mut block = HammingBlock::new();
            block.encode(&message);
            assert_eq!(block.decode(), message);
        }
    }

    #[test]
    fn every_single_byte_value_in_first_position() {
        for value in 0..=u8::MAX {
            let message = [value, 0, 0, 0, 0, 0, 0, 0];
            let mut block = HammingBlock::new();
            block.encode(&message);
            assert_eq!(block.decode(), message);
        }
    }

    #[test]
    fn fresh_encode_scans_clean() {
        let mut block = HammingBlock::new();
        block.encode(&[0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x11, 0x22, 0x33]);
        assert_eq!(block.scan(), edac_store::hamming::ErrorReport::None);
    }
}

mod single_bit {
    use edac_store::hamming::{BLOCK_BITS, ErrorReport, HammingBlock};
    use pretty_assertions::assert_eq;

    /// Flipping any one of the 72 bits must be located exactly and repaired
    /// back to the original block. Data bits, group parity bits and the
    /// overall parity bit are all covered.
    #[test]
    fn every_position_corrects_back() {
        let message = [0x5A, 0xC3, 0x00, 0xFF, 0x12, 0x34, 0x56, 0x78];

        for position in 0..BLOCK_BITS {
            let mut reference = HammingBlock::new();
            reference.encode(&message);

            let mut damaged = reference;
            damaged.inject_error(position);

            let report = damaged.correct();
            assert_eq!(report, ErrorReport::Single { position });
            assert_eq!(damaged, reference, "bit {position} not restored");
            assert_eq!(damaged.decode(), message);
        }
    }

    #[test]
    fn scan_does_not_modify() {
        let mut block = HammingBlock::new();
        block.encode(&[1, 2, 3, 4, 5, 6, 7, 8]);
        block.inject_error(17);

        let before = block;
        assert_eq!(block.scan(), ErrorReport::Single { position: 17 });
        assert_eq!(block, before);
    }
}

mod double_bit {
    use edac_store::hamming::{BLOCK_BITS, HammingBlock};
    use pretty_assertions::assert_eq;

    /// Every pair of distinct flipped bits must be reported as
    /// uncorrectable, and correction must leave the block alone rather
    /// than invent a plausible-looking wrong message.
    #[test]
    fn all_pairs_detected_never_miscorrected() {
        let message = [0xA5, 0x0F, 0xF0, 0x3C, 0xC3, 0x99, 0x66, 0x81];
        let mut reference = HammingBlock::new();
        reference.encode(&message);

        for first in 0..BLOCK_BITS {
            for second in (first + 1)..BLOCK_BITS {
                let mut damaged = reference;
                damaged.inject_error(first);
                damaged.inject_error(second);

                let report = damaged.correct();
                assert_eq!(report.size(), 2, "bits {first},{second} not detected");

                // untouched, still carrying both flips
                let mut expected = reference;
                expected.inject_error(first);
                expected.inject_error(second);
                assert_eq!(damaged, expected);
            }
        }
    }
}
