//! DUML v1 frame model and builder.
//!
//! Frame layout on the wire:
//!
//! ```text
//! [0]     SOF (0x55)
//! [1-2]   length(10 bits) + version(6 bits), little endian
//! [3]     CRC8 over bytes 0..3
//! [4]     sender kind(5) + index(3)
//! [5]     receiver kind(5) + index(3)
//! [6-7]   sequence number, little endian
//! [8]     encryption(3) + ack(2, bits 5-6) + pack type(bit 7)
//! [9]     command set
//! [10]    command id
//! [11..]  payload
//! [-2,-1] CRC16 over everything before it, little endian
//! ```
//!
//! The length field counts the whole frame, header and trailer included,
//! and must stay within 13..=1400.

use crate::constants::*;
use crate::crc::{crc16, crc8};
use crate::error::RcmError;
use bytes::Bytes;
use modular_bitfield::prelude::*;
use num_enum::{FromPrimitive, IntoPrimitive};

#[bitfield(bytes = 2)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthVersion {
    pub length: B10,
    pub version: B6,
}

#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteByte {
    pub kind: B5,
    pub index: B3,
}

#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeByte {
    pub encryption: B3,
    #[skip]
    reserved: B2,
    pub ack: B2,
    pub pack_type: B1,
}

/// Device kinds used in the routing bytes. These are data, not behaviour;
/// unknown kinds round-trip unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum DeviceKind {
    Any = 0,
    Camera = 1,
    App = 2,
    FlightController = 3,
    Gimbal = 4,
    RemoteController = 6,
    Workstation = 10,
    #[num_enum(catch_all)]
    Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum PackType {
    #[num_enum(default)]
    Request = 0,
    Response = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum AckPolicy {
    NoAck = 0,
    AfterExec = 2,
    #[num_enum(catch_all)]
    Unknown(u8),
}

/// One endpoint of a frame: 5-bit device kind plus 3-bit instance index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub kind: DeviceKind,
    pub index: u8,
}

impl Address {
    #[must_use]
    pub const fn new(kind: DeviceKind, index: u8) -> Self {
        Self { kind, index }
    }
}

/// Everything in a frame except the payload and the checksums (those are
/// derived during encoding).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub sender: Address,
    pub receiver: Address,
    pub sequence: u16,
    pub pack_type: PackType,
    pub ack: AckPolicy,
    pub encryption: u8,
    pub cmd_set: u8,
    pub cmd_id: u8,
}

/// A complete logical frame. Building computes both checksums; parsing
/// verifies them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Bytes,
}

impl Frame {
    #[must_use]
    pub fn new(header: FrameHeader, payload: impl Into<Bytes>) -> Self {
        Self {
            header,
            payload: payload.into(),
        }
    }

    /// Total on-wire length, header and trailer included.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        FRAME_HEADER_LEN + self.payload.len() + FRAME_TRAILER_LEN
    }

    /// Serialise into a caller-supplied buffer and return the frame length.
    pub fn encode_into(&self, out: &mut [u8]) -> Result<usize, RcmError> {
        let total = self.wire_len();
        if total > MAX_FRAME_LEN {
            return Err(RcmError::FrameTooLarge {
                len: total,
                max: MAX_FRAME_LEN,
            });
        }
        if out.len() < total {
            return Err(RcmError::BufferTooSmall {
                needed: total,
                capacity: out.len(),
            });
        }

        let h = &self.header;

        out[0] = SOF;
        // The length field is 10 bits wide, so totals past 1023 wrap on the
        // wire even though the protocol cap is 1400. Inherited quirk.
        out[1..3].copy_from_slice(
            &LengthVersion::new()
                .with_length(total as u16 & 0x03FF)
                .with_version(PROTOCOL_VERSION)
                .into_bytes(),
        );
        out[3] = crc8(&out[..3]);
        out[4] = RouteByte::new()
            .with_kind(u8::from(h.sender.kind) & 0x1F)
            .with_index(h.sender.index & 0x07)
            .into_bytes()[0];
        out[5] = RouteByte::new()
            .with_kind(u8::from(h.receiver.kind) & 0x1F)
            .with_index(h.receiver.index & 0x07)
            .into_bytes()[0];
        out[6..8].copy_from_slice(&h.sequence.to_le_bytes());
        out[8] = TypeByte::new()
            .with_encryption(h.encryption & 0x07)
            .with_ack(u8::from(h.ack) & 0x03)
            .with_pack_type(u8::from(h.pack_type) & 0x01)
            .into_bytes()[0];
        out[9] = h.cmd_set;
        out[10] = h.cmd_id;
        out[FRAME_HEADER_LEN..total - FRAME_TRAILER_LEN].copy_from_slice(&self.payload);

        let trailer = crc16(&out[..total - FRAME_TRAILER_LEN]);
        out[total - FRAME_TRAILER_LEN..total].copy_from_slice(&trailer.to_le_bytes());

        Ok(total)
    }

    /// Serialise into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Result<Bytes, RcmError> {
        let mut buf = vec![0u8; self.wire_len().min(MAX_FRAME_LEN)];
        let written = self.encode_into(&mut buf)?;
        buf.truncate(written);
        Ok(Bytes::from(buf))
    }

    /// Parse one complete frame, verifying structure and both checksums.
    ///
    /// The slice must hold exactly the frame: its length field has to match
    /// `bytes.len()`. The version field is read but deliberately never
    /// checked; devices in the field report 1 but the format tolerates
    /// others.
    pub fn parse(bytes: &[u8]) -> Result<Self, RcmError> {
        if bytes.len() < MIN_FRAME_LEN {
            return Err(RcmError::InvalidFrame(format!(
                "{} bytes is below the {MIN_FRAME_LEN}-byte minimum",
                bytes.len()
            )));
        }
        if bytes[0] != SOF {
            return Err(RcmError::InvalidFrame(format!(
                "bad start-of-frame byte {:#04x}",
                bytes[0]
            )));
        }
        if crc8(&bytes[..3]) != bytes[3] {
            return Err(RcmError::InvalidFrame("header checksum mismatch".into()));
        }

        let len_ver = LengthVersion::from_bytes([bytes[1], bytes[2]]);
        let declared = usize::from(len_ver.length());
        if declared != bytes.len() {
            return Err(RcmError::InvalidFrame(format!(
                "length field says {declared}, slice holds {}",
                bytes.len()
            )));
        }

        let body = &bytes[..bytes.len() - FRAME_TRAILER_LEN];
        let trailer = u16::from_le_bytes([bytes[bytes.len() - 2], bytes[bytes.len() - 1]]);
        if crc16(body) != trailer {
            return Err(RcmError::InvalidFrame("frame checksum mismatch".into()));
        }

        let sender = RouteByte::from_bytes([bytes[4]]);
        let receiver = RouteByte::from_bytes([bytes[5]]);
        let type_byte = TypeByte::from_bytes([bytes[8]]);

        Ok(Self {
            header: FrameHeader {
                sender: Address::new(DeviceKind::from_primitive(sender.kind()), sender.index()),
                receiver: Address::new(
                    DeviceKind::from_primitive(receiver.kind()),
                    receiver.index(),
                ),
                sequence: u16::from_le_bytes([bytes[6], bytes[7]]),
                pack_type: PackType::from_primitive(type_byte.pack_type()),
                ack: AckPolicy::from_primitive(type_byte.ack()),
                encryption: type_byte.encryption(),
                cmd_set: bytes[9],
                cmd_id: bytes[10],
            },
            payload: Bytes::copy_from_slice(&body[FRAME_HEADER_LEN..]),
        })
    }
}

fn workstation_to_rc(sequence: u16, ack: AckPolicy, cmd_id: u8, payload: &'static [u8]) -> Frame {
    Frame::new(
        FrameHeader {
            sender: Address::new(DeviceKind::Workstation, 0),
            receiver: Address::new(DeviceKind::RemoteController, 0),
            sequence,
            pack_type: PackType::Request,
            ack,
            encryption: 0,
            cmd_set: CMD_SET_RC,
            cmd_id,
        },
        Bytes::from_static(payload),
    )
}

/// Handshake frame asking the controller to start streaming push frames.
pub fn enable_push_frame(sequence: u16) -> Result<Bytes, RcmError> {
    workstation_to_rc(sequence, AckPolicy::AfterExec, CMD_ID_RC_ENABLE, &[0x01]).to_bytes()
}

/// Poll frame requesting a one-shot channel report; used as a fallback
/// when push streaming stays silent.
pub fn channel_request_frame(sequence: u16) -> Result<Bytes, RcmError> {
    workstation_to_rc(sequence, AckPolicy::NoAck, CMD_ID_RC_CHANNEL, &[]).to_bytes()
}
