#![allow(dead_code)]

pub use bytes::Bytes;
pub use rcmon_lib::constants::*;
pub use rcmon_lib::*;

use std::sync::{Arc, Mutex};

/// Parser whose callback appends every delivered snapshot to the returned
/// shared vector.
pub fn collector() -> (RcParser, Arc<Mutex<Vec<RcState>>>) {
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    let parser = RcParser::new(move |s: &RcState| sink.lock().unwrap().push(*s));
    (parser, states)
}

/// Payload with all analog channels at the 0x0400 centre value and every
/// control bit clear.
pub fn centred_payload() -> [u8; RC_PUSH_PAYLOAD_LEN] {
    let mut payload = [0u8; RC_PUSH_PAYLOAD_LEN];
    for pair in payload[5..].chunks_mut(2) {
        pair[0] = 0x00;
        pair[1] = 0x04;
    }
    payload
}

/// Centred payload with every button, the whole five-way pad, and flight
/// mode Normal asserted.
pub fn all_pressed_payload() -> [u8; RC_PUSH_PAYLOAD_LEN] {
    let mut payload = centred_payload();
    payload[0] = 0x70;
    payload[1] = 0xF9;
    payload[2] = 0x1D;
    payload
}

/// Build a valid frame with the given class/id and payload, using the
/// routing a real controller uses for pushes.
pub fn frame_with(cmd_set: u8, cmd_id: u8, payload: &[u8]) -> Bytes {
    Frame::new(
        FrameHeader {
            sender: Address::new(DeviceKind::RemoteController, 0),
            receiver: Address::new(DeviceKind::App, 0),
            sequence: 0x0001,
            pack_type: PackType::Request,
            ack: AckPolicy::NoAck,
            encryption: 0,
            cmd_set,
            cmd_id,
        },
        payload.to_vec(),
    )
    .to_bytes()
    .expect("test frame within size bounds")
}

/// A valid RC push frame carrying `payload`.
pub fn push_frame(payload: &[u8]) -> Bytes {
    frame_with(CMD_SET_RC, CMD_ID_RC_PUSH, payload)
}
