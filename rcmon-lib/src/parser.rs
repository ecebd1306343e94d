//! Streaming DUML frame parser.
//!
//! Accepts arbitrarily chunked bytes from a lossy transport, resynchronises
//! onto frame boundaries with the two cascaded checksums, and invokes a
//! consumer callback for every valid RC push frame. Everything else —
//! noise, other command sets, frames failing either checksum — is dropped
//! without comment; the byte source is best effort and the only recourse a
//! caller would have is to keep feeding, which is what happens anyway.

use crate::constants::*;
use crate::error::RcmError;
use crate::frame::Frame;
use crate::push::{decode_rc_push, RcState};
use crate::ring::RingBuffer;
use crate::crc::crc8;

/// Payload decoder for one `(cmd_set, cmd_id)` pair.
type PayloadDecoder = fn(&[u8]) -> Result<RcState, RcmError>;

/// Tagged dispatch from message class/id to a payload decoder. Frames
/// whose pair has no entry are consumed and dropped. New push message
/// types slot in here without touching the framing layer.
fn payload_decoder(cmd_set: u8, cmd_id: u8) -> Option<PayloadDecoder> {
    match (cmd_set, cmd_id) {
        (CMD_SET_RC, CMD_ID_RC_PUSH) => Some(decode_rc_push),
        _ => None,
    }
}

enum ScanState {
    /// Hunting for a start-of-frame byte with a valid header behind it.
    SeekStart,
    /// Header accepted; waiting for the declared number of bytes.
    Accumulate,
}

/// Stateful stream parser. One parser per byte source; feed it from a
/// single producer. The callback runs synchronously inside [`feed`] and
/// receives a snapshot reference valid only for the duration of the call.
///
/// [`feed`]: RcParser::feed
pub struct RcParser {
    callback: Box<dyn FnMut(&RcState) + Send>,
    ring: RingBuffer,
    state: ScanState,
    /// Declared total length of the frame being accumulated.
    expected_len: usize,
}

impl RcParser {
    pub fn new(callback: impl FnMut(&RcState) + Send + 'static) -> Self {
        Self {
            callback: Box::new(callback),
            ring: RingBuffer::new(),
            state: ScanState::SeekStart,
            expected_len: 0,
        }
    }

    /// Feed raw transport bytes. Returns how many push snapshots were
    /// delivered to the callback during this call. Chunk boundaries are
    /// irrelevant; a zero-length slice is a no-op.
    pub fn feed(&mut self, data: &[u8]) -> usize {
        let mut delivered = 0;
        for &byte in data {
            self.ring.push(byte);
            delivered += self.drain();
        }
        delivered
    }

    /// Discard buffered bytes and return to header hunting. Call after a
    /// transport reconnect.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.state = ScanState::SeekStart;
        self.expected_len = 0;
    }

    /// Run the scanner until it needs more input, delivering any completed
    /// push frames along the way.
    fn drain(&mut self) -> usize {
        let mut delivered = 0;
        loop {
            match self.state {
                ScanState::SeekStart => {
                    if self.ring.is_empty() {
                        return delivered;
                    }
                    if self.ring.peek(0) != SOF {
                        self.ring.consume(1);
                        continue;
                    }
                    if self.ring.len() < FRAME_PREFIX_LEN {
                        return delivered;
                    }

                    let mut prefix = [0u8; 3];
                    self.ring.copy_to(0, &mut prefix);
                    if crc8(&prefix) != self.ring.peek(3) {
                        // A 0x55 inside noise, or inside the tail of a
                        // bogus earlier candidate. One byte of progress.
                        self.ring.consume(1);
                        continue;
                    }

                    let declared =
                        usize::from(u16::from_le_bytes([prefix[1], prefix[2]]) & 0x03FF);
                    if !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&declared) {
                        self.ring.consume(1);
                        continue;
                    }

                    self.expected_len = declared;
                    self.state = ScanState::Accumulate;
                }
                ScanState::Accumulate => {
                    if self.ring.len() < self.expected_len {
                        return delivered;
                    }

                    let mut scratch = [0u8; MAX_FRAME_LEN];
                    let window = &mut scratch[..self.expected_len];
                    self.ring.copy_to(0, window);

                    // The header checksum already vouched for the length,
                    // so the whole window is consumed whether or not the
                    // frame checksum holds; no rescanning inside it.
                    self.ring.consume(self.expected_len);
                    self.state = ScanState::SeekStart;

                    let Ok(frame) = Frame::parse(window) else {
                        continue;
                    };
                    let Some(decode) = payload_decoder(frame.header.cmd_set, frame.header.cmd_id)
                    else {
                        continue;
                    };
                    if let Ok(snapshot) = decode(&frame.payload) {
                        (self.callback)(&snapshot);
                        delivered += 1;
                    }
                }
            }
        }
    }
}
