//! Property tests for control-frame reassembly.

use proptest::prelude::*;
use sotto_proto::{ControlMessage, Framer, mumble};

/// Build a wire image from a list of (type, payload) pairs.
fn wire_image(frames: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (ty, payload) in frames {
        out.extend_from_slice(&sotto_proto::header::encode_frame(*ty, payload));
    }
    out
}

proptest! {
    /// Frames survive arbitrary re-chunking of the byte stream.
    #[test]
    fn reassembly_is_chunking_invariant(
        frames in prop::collection::vec(
            (any::<u16>(), prop::collection::vec(any::<u8>(), 0..256)),
            0..8,
        ),
        chunk in 1usize..64,
    ) {
        let wire = wire_image(&frames);

        let mut framer = Framer::new();
        let mut recovered = Vec::new();
        for piece in wire.chunks(chunk) {
            framer.extend(piece);
            while let Some(frame) = framer.next_frame().unwrap() {
                recovered.push((frame.ty, frame.payload.to_vec()));
            }
        }

        prop_assert_eq!(recovered, frames);
    }

    /// Encoded control messages decode back to themselves after framing.
    #[test]
    fn control_messages_survive_framing(session in any::<u32>(), channel in any::<u32>()) {
        let msg = ControlMessage::UserState(mumble::UserState {
            session: Some(session),
            channel_id: Some(channel),
            ..Default::default()
        });

        let mut framer = Framer::new();
        framer.extend(&msg.encode_frame());

        let frame = framer.next_frame().unwrap().unwrap();
        let decoded = ControlMessage::decode(frame.ty, frame.payload).unwrap();
        prop_assert_eq!(decoded, msg);
    }
}
