//! Property tests for the FEC codecs.
//!
//! These encode the universal invariants the payload pipeline relies on:
//! round-trips are exact, single-bit errors are invisible, and detectors
//! never pass corrupted words.

use fuselink_fec::{ConvEncoder, ViterbiDecoder, bptc, crc, golay, qr, reed_solomon};
use proptest::prelude::*;

proptest! {
    #[test]
    fn golay_24_12_round_trip(data in 0u16..(1 << 12)) {
        let decoded = golay::decode_24_12(golay::encode_24_12(data));
        prop_assert_eq!(decoded.data, data);
        prop_assert!(decoded.ok);
    }

    #[test]
    fn golay_24_12_single_bit(data in 0u16..(1 << 12), pos in 0u32..24) {
        let decoded = golay::decode_24_12(golay::encode_24_12(data) ^ (1 << pos));
        prop_assert_eq!(decoded.data, data);
        prop_assert_eq!(decoded.errors, 1);
    }

    #[test]
    fn golay_23_12_single_bit(data in 0u16..(1 << 11), pos in 0u32..23) {
        let decoded = golay::decode_23_12(golay::encode_23_12(data) ^ (1 << pos));
        prop_assert_eq!(decoded.data, data);
        prop_assert!(decoded.ok);
    }

    #[test]
    fn bptc_round_trip(data in prop::array::uniform12(any::<u8>())) {
        let mut payload = [0u8; 33];
        bptc::encode(&data, &mut payload);
        let (out, corrections) = bptc::decode(&payload);
        prop_assert_eq!(out, data);
        prop_assert_eq!(corrections, 0);
    }

    #[test]
    fn bptc_single_bit_error(data in prop::array::uniform12(any::<u8>()), raw in 0usize..196) {
        let mut payload = [0u8; 33];
        bptc::encode(&data, &mut payload);
        // Map the codeword index onto the payload, skipping the sync field
        let pos = if raw < 98 { raw } else { raw + 68 };
        payload[pos / 8] ^= 0x80 >> (pos % 8);
        let (out, corrections) = bptc::decode(&payload);
        prop_assert_eq!(out, data);
        prop_assert!(corrections >= 1);
    }

    #[test]
    fn qr_round_trip_and_single_bit(data in 0u8..128, pos in 0u32..16) {
        let (b0, b1) = qr::encode(data);
        let cw = (u16::from(b0) << 8) | u16::from(b1);
        let noisy = cw ^ (1 << pos);
        let (out, _, ok) = qr::decode((noisy >> 8) as u8, (noisy & 0xFF) as u8);
        prop_assert_eq!(out, data);
        prop_assert!(ok);
    }

    #[test]
    fn reed_solomon_check_and_reject(
        data in prop::array::uniform9(any::<u8>()),
        byte in 0usize..12,
        delta in 1u8..=255,
    ) {
        let cw = reed_solomon::encode_9(&data);
        prop_assert!(reed_solomon::check_12(&cw));
        let mut noisy = cw;
        noisy[byte] ^= delta;
        prop_assert!(!reed_solomon::check_12(&noisy));
    }

    #[test]
    fn crc_round_trip(body in prop::collection::vec(any::<u8>(), 1..64)) {
        let mut buf = body.clone();
        buf.extend_from_slice(&[0, 0]);
        crc::append(&mut buf);
        prop_assert!(crc::check(&buf));
    }

    #[test]
    fn crc_detects_single_bit_flips(body in prop::collection::vec(any::<u8>(), 1..32), pos in 0usize..256) {
        let mut buf = body.clone();
        buf.extend_from_slice(&[0, 0]);
        crc::append(&mut buf);
        let pos = pos % (buf.len() * 8);
        buf[pos / 8] ^= 0x80 >> (pos % 8);
        prop_assert!(!crc::check(&buf));
    }

    #[test]
    fn convolutional_round_trip(data in prop::collection::vec(any::<u8>(), 12), count in 1usize..=96) {
        let mut coded = [0u8; 25];
        ConvEncoder.encode(&data, count, &mut coded);
        let mut out = vec![0u8; count.div_ceil(8)];
        let metric = ViterbiDecoder::new().decode(&coded, count, &mut out);
        prop_assert_eq!(metric, 0);
        for i in 0..count {
            let expected = data[i / 8] & (0x80 >> (i % 8)) != 0;
            let got = out[i / 8] & (0x80 >> (i % 8)) != 0;
            prop_assert_eq!(got, expected, "bit {}", i);
        }
    }

    #[test]
    fn convolutional_corrects_one_symbol(data in prop::collection::vec(any::<u8>(), 12), pos in 0usize..200) {
        let mut coded = [0u8; 25];
        ConvEncoder.encode(&data, 96, &mut coded);
        coded[pos / 8] ^= 0x80 >> (pos % 8);
        let mut out = [0u8; 12];
        ViterbiDecoder::new().decode(&coded, 96, &mut out);
        prop_assert_eq!(&out[..], &data[..]);
    }
}

#[test]
fn hamming_15_11_all_positions() {
    // Exhaustive across a representative data sample, all 15 flips each
    for data in [0u16, 0x001, 0x2AA, 0x555, 0x7FF, 0x400] {
        let mut bits = [false; 15];
        for (i, bit) in bits.iter_mut().enumerate().take(11) {
            *bit = data & (1 << (10 - i)) != 0;
        }
        fuselink_fec::hamming::encode_15_11(&mut bits);
        let reference = bits;
        for pos in 0..15 {
            let mut noisy = reference;
            noisy[pos] = !noisy[pos];
            assert!(fuselink_fec::hamming::decode_15_11(&mut noisy));
            assert_eq!(noisy, reference, "data {data:#x} pos {pos}");
        }
    }
}
