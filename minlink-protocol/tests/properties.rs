use minlink_protocol::{
    decode_frame, Frame, FrameId, StreamDecoder, HEADER_BYTE, MAX_APP_ID, MAX_PAYLOAD_SIZE,
};
use proptest::prelude::*;

fn payload() -> impl Strategy<Value = Vec<u8>> {
    // Bias towards header bytes so stuffing gets exercised
    prop::collection::vec(
        prop_oneof![Just(HEADER_BYTE), Just(0x55u8), any::<u8>()],
        0..=MAX_PAYLOAD_SIZE,
    )
}

fn frame() -> impl Strategy<Value = Frame> {
    (0..=MAX_APP_ID, any::<u8>(), any::<bool>(), payload()).prop_map(
        |(id, seq, reliable, payload)| {
            if reliable {
                Frame::transport(id, seq, &payload).unwrap()
            } else {
                Frame::new(id, &payload).unwrap()
            }
        },
    )
}

/// Line noise that does not end in a header byte
///
/// A trailing 0xAA would merge with the next frame's header and shift it by
/// one byte, which the wire format cannot disambiguate.
fn noise() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64).prop_map(|mut bytes| {
        if bytes.last() == Some(&HEADER_BYTE) {
            bytes.pop();
            bytes.push(0x00);
        }
        bytes
    })
}

fn decode_all(bytes: &[u8]) -> Vec<Frame> {
    let mut decoder = StreamDecoder::new();
    decoder.feed(bytes).collect()
}

proptest! {
    #[test]
    fn roundtrip(frame in frame()) {
        let encoded = frame.encode_to_vec().unwrap();
        let decoded = decode_frame(&encoded).unwrap();
        prop_assert_eq!(decoded, frame);
    }

    #[test]
    fn roundtrip_in_arbitrary_chunks(frame in frame(), chunk in 1usize..32) {
        let encoded = frame.encode_to_vec().unwrap();
        let mut decoder = StreamDecoder::new();
        let mut frames = Vec::new();
        for piece in encoded.chunks(chunk) {
            frames.extend(decoder.feed(piece));
        }
        prop_assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn resynchronizes_after_noise(first in frame(), garbage in noise(), second in frame()) {
        let mut stream = Vec::new();
        stream.extend_from_slice(&first.encode_to_vec().unwrap());
        stream.extend_from_slice(&garbage);
        stream.extend_from_slice(&second.encode_to_vec().unwrap());

        prop_assert_eq!(decode_all(&stream), vec![first, second]);
    }

    #[test]
    fn single_bit_corruption_is_rejected(
        first in frame(),
        second in frame(),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let mut corrupted = first.encode_to_vec().unwrap().to_vec();
        // Everything after ID/CTRL, SEQ and LENGTH up to (not including) EOF
        let body_start = if first.id.has_seq() { 6 } else { 5 };
        let body_end = corrupted.len() - 1;
        let index = body_start + position.index(body_end - body_start);
        corrupted[index] ^= 1 << bit;

        let mut stream = corrupted;
        stream.extend_from_slice(&second.encode_to_vec().unwrap());

        prop_assert_eq!(decode_all(&stream), vec![second]);
    }

    #[test]
    fn app_ids_map_to_app_frames(id in 0..=MAX_APP_ID) {
        let frame = Frame::new(id, &[]).unwrap();
        let decoded = decode_frame(&frame.encode_to_vec().unwrap()).unwrap();
        prop_assert_eq!(decoded.id, FrameId::App(id));
    }
}
