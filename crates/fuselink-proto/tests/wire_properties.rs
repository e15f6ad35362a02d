//! Property tests for the wire formats.

use fuselink_proto::{
    Callsign, DmrSlot, DmrdPacket, Fich, FrameKind, YsfFrame,
    fich::{CallMode, DataType, FrameIndicator},
    homebrew,
};
use proptest::prelude::*;

fn arbitrary_fich() -> impl Strategy<Value = Fich> {
    (
        prop_oneof![
            Just(FrameIndicator::Header),
            Just(FrameIndicator::Communications),
            Just(FrameIndicator::Terminator),
        ],
        prop_oneof![Just(CallMode::Group), Just(CallMode::Individual)],
        0u8..8,
        prop_oneof![
            Just(DataType::VdMode1),
            Just(DataType::DataFullRate),
            Just(DataType::VdMode2),
            Just(DataType::VoiceFullRate),
        ],
        any::<u8>(),
        any::<u8>(),
    )
        .prop_map(|(frame_indicator, call_mode, frame_number, data_type, source_id, destination_id)| {
            Fich { frame_indicator, call_mode, frame_number, data_type, source_id, destination_id }
        })
}

proptest! {
    #[test]
    fn fich_round_trip(fich in arbitrary_fich()) {
        let region = fich.encode();
        let (decoded, errors) = Fich::decode(&region).unwrap();
        prop_assert_eq!(decoded, fich);
        prop_assert_eq!(errors, 0);
    }

    #[test]
    fn fich_single_bit_flip_is_corrected(fich in arbitrary_fich(), pos in 0usize..200) {
        let mut region = fich.encode();
        region[pos / 8] ^= 0x80 >> (pos % 8);
        let (decoded, errors) = Fich::decode(&region).unwrap();
        prop_assert_eq!(decoded, fich);
        prop_assert!(errors >= 1);
    }

    #[test]
    fn dmrd_field_round_trip(
        seq in any::<u8>(),
        source in 0u32..(1 << 24),
        destination in 0u32..(1 << 24),
        repeater in any::<u32>(),
        stream in any::<u32>(),
        n in 1u8..=5,
    ) {
        let mut packet = DmrdPacket::new();
        packet.set_sequence(seq);
        packet.set_source_id(source).unwrap();
        packet.set_destination_id(destination).unwrap();
        packet.set_repeater_id(repeater);
        packet.set_stream_id(stream);
        packet.set_flags(DmrSlot::Slot2, false, FrameKind::Voice(n));

        let bytes = packet.to_bytes();
        let parsed = DmrdPacket::from_bytes(&bytes).unwrap();
        prop_assert_eq!(parsed.sequence(), seq);
        prop_assert_eq!(parsed.source_id(), source);
        prop_assert_eq!(parsed.destination_id(), destination);
        prop_assert_eq!(parsed.repeater_id(), repeater);
        prop_assert_eq!(parsed.stream_id(), stream);
        prop_assert_eq!(parsed.frame_kind(), FrameKind::Voice(n));
    }

    #[test]
    fn callsign_round_trip(s in "[A-Z0-9]{1,10}") {
        let cs = Callsign::new(&s).unwrap();
        let wire = Callsign::from_wire(cs.as_bytes());
        prop_assert_eq!(wire.trimmed(), s.trim_end());
    }

    #[test]
    fn ysf_frame_payload_round_trip(payload in prop::array::uniform32(any::<u8>())) {
        let mut full = [0u8; 90];
        full[..32].copy_from_slice(&payload);
        let mut frame = YsfFrame::new(
            Callsign::new("KJ4ABC").unwrap(),
            Callsign::new("ALL").unwrap(),
        );
        frame.set_payload(&full);
        let bytes = frame.to_bytes();
        let parsed = YsfFrame::from_bytes(&bytes).unwrap();
        prop_assert_eq!(parsed.payload(), &full);
    }
}

#[test]
fn happy_path_login_packet() {
    // Scenario: password "TEST", salt 12 34 56 78, repeater ID 123456.
    let packet = homebrew::auth_key(123_456, [0x12, 0x34, 0x56, 0x78], "TEST");
    assert_eq!(packet.len(), 40);
    assert_eq!(&packet[..4], b"RPTK");
    assert_eq!(packet[4..8], [0x00, 0x01, 0xE2, 0x40]);

    let mut salted = Vec::new();
    salted.extend_from_slice(&[0x12, 0x34, 0x56, 0x78]);
    salted.extend_from_slice(b"TEST");
    let expected = <sha2::Sha256 as sha2::Digest>::digest(&salted);
    assert_eq!(&packet[8..], expected.as_slice());
}
