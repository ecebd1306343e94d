//! RC push payload codec.
//!
//! The `rc_button_physical_status_push` payload is 17 bytes: five densely
//! bit-packed control bytes followed by six unsigned little-endian analog
//! readings. [`RcPushRaw`] mirrors the wire layout; [`RcState`] is the
//! decoded snapshot handed to consumers. The bit positions were recovered
//! by reverse engineering and are fixed.

use crate::constants::{RC_PUSH_PAYLOAD_LEN, STICK_CENTRE_OFFSET};
use crate::error::RcmError;
use modular_bitfield::prelude::*;
use num_enum::{FromPrimitive, IntoPrimitive};
use std::fmt;
use strum_macros::Display;
use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Control bytes 0..5 of the push payload.
///
/// Reserved positions are skipped so they can never leak into a decoded
/// field, and always encode as zero.
#[bitfield(bytes = 5)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PushControlBits {
    // byte 0
    #[skip]
    reserved0: B4,
    pub pause: bool,
    pub gohome: bool,
    pub shutter: bool,
    #[skip]
    reserved1: bool,

    // byte 1
    pub record: bool,
    #[skip]
    reserved2: B2,
    pub five_right: bool,
    pub five_up: bool,
    pub five_down: bool,
    pub five_left: bool,
    pub five_centre: bool,

    // byte 2
    pub flight_mode: B2,
    pub custom1: bool,
    pub custom2: bool,
    pub custom3: bool,
    #[skip]
    reserved3: B3,

    // byte 3 carries no known fields
    #[skip]
    reserved4: u8,

    // byte 4
    #[skip]
    reserved5: bool,
    pub wheel_magnitude: B5,
    pub wheel_positive: bool,
    #[skip]
    reserved6: bool,
}

/// Wire layout of the 17-byte push payload.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct RcPushRaw {
    pub control: [u8; 5],
    pub right_horizontal: U16,
    pub right_vertical: U16,
    pub left_vertical: U16,
    pub left_horizontal: U16,
    pub left_wheel: U16,
    pub right_wheel: U16,
}

/// Flight mode switch positions. Tripod reads as CineSmooth on some
/// aircraft; the wire value is the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum FlightMode {
    Sport = 0,
    Normal = 1,
    Tripod = 2,
    #[num_enum(default)]
    Unknown = 3,
}

/// Five-direction joystick; multiple directions may be asserted at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FiveWay {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub centre: bool,
}

/// Analog stick axes, zero-centred. Magnitudes normally stay within about
/// ±660 but corrupt input can exceed that; raw readings are preserved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StickAxes {
    pub horizontal: i16,
    pub vertical: i16,
}

/// Complete controller state from a single push frame.
///
/// A plain value: copy it freely. The parser produces a fresh snapshot per
/// accepted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RcState {
    pub pause: bool,
    pub gohome: bool,
    pub shutter: bool,
    pub record: bool,
    pub custom1: bool,
    pub custom2: bool,
    pub custom3: bool,

    pub five_way: FiveWay,
    pub flight_mode: FlightMode,

    /// Aileron (horizontal) / elevator (vertical).
    pub right_stick: StickAxes,
    /// Rudder (horizontal) / throttle (vertical).
    pub left_stick: StickAxes,

    pub left_wheel: i16,
    pub right_wheel: i16,
    /// Rotary-encoder tick delta for the right wheel, −31..=31.
    pub right_wheel_delta: i8,
}

impl RcState {
    /// Idle controller: nothing pressed, sticks and wheels centred,
    /// flight mode switch in Normal.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            pause: false,
            gohome: false,
            shutter: false,
            record: false,
            custom1: false,
            custom2: false,
            custom3: false,
            five_way: FiveWay {
                up: false,
                down: false,
                left: false,
                right: false,
                centre: false,
            },
            flight_mode: FlightMode::Normal,
            right_stick: StickAxes {
                horizontal: 0,
                vertical: 0,
            },
            left_stick: StickAxes {
                horizontal: 0,
                vertical: 0,
            },
            left_wheel: 0,
            right_wheel: 0,
            right_wheel_delta: 0,
        }
    }
}

impl Default for RcState {
    fn default() -> Self {
        Self::neutral()
    }
}

impl fmt::Display for RcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "L({:+5},{:+5}) R({:+5},{:+5}) whl({:+5},{:+5},{:+3}) mode={}",
            self.left_stick.horizontal,
            self.left_stick.vertical,
            self.right_stick.horizontal,
            self.right_stick.vertical,
            self.left_wheel,
            self.right_wheel,
            self.right_wheel_delta,
            self.flight_mode,
        )?;
        for (name, pressed) in [
            ("pause", self.pause),
            ("gohome", self.gohome),
            ("shutter", self.shutter),
            ("record", self.record),
            ("c1", self.custom1),
            ("c2", self.custom2),
            ("c3", self.custom3),
            ("5d-up", self.five_way.up),
            ("5d-down", self.five_way.down),
            ("5d-left", self.five_way.left),
            ("5d-right", self.five_way.right),
            ("5d-ctr", self.five_way.centre),
        ] {
            if pressed {
                write!(f, " {name}")?;
            }
        }
        Ok(())
    }
}

/// Raw analog reading to zero-centred signed value. Out-of-range readings
/// wrap modulo 2^16; they are not clamped.
#[inline]
fn centre(raw: U16) -> i16 {
    raw.get().wrapping_sub(STICK_CENTRE_OFFSET) as i16
}

#[inline]
fn uncentre(value: i16) -> U16 {
    U16::new((value as u16).wrapping_add(STICK_CENTRE_OFFSET))
}

impl From<&RcPushRaw> for RcState {
    fn from(raw: &RcPushRaw) -> Self {
        let bits = PushControlBits::from_bytes(raw.control);

        let magnitude = bits.wheel_magnitude() as i8;
        let delta = if bits.wheel_positive() {
            magnitude
        } else {
            // Magnitude zero stays zero; two's complement has no -0.
            -magnitude
        };

        Self {
            pause: bits.pause(),
            gohome: bits.gohome(),
            shutter: bits.shutter(),
            record: bits.record(),
            custom1: bits.custom1(),
            custom2: bits.custom2(),
            custom3: bits.custom3(),
            five_way: FiveWay {
                up: bits.five_up(),
                down: bits.five_down(),
                left: bits.five_left(),
                right: bits.five_right(),
                centre: bits.five_centre(),
            },
            flight_mode: FlightMode::from_primitive(bits.flight_mode()),
            right_stick: StickAxes {
                horizontal: centre(raw.right_horizontal),
                vertical: centre(raw.right_vertical),
            },
            left_stick: StickAxes {
                horizontal: centre(raw.left_horizontal),
                vertical: centre(raw.left_vertical),
            },
            left_wheel: centre(raw.left_wheel),
            right_wheel: centre(raw.right_wheel),
            right_wheel_delta: delta,
        }
    }
}

impl From<&RcState> for RcPushRaw {
    fn from(state: &RcState) -> Self {
        let delta = state.right_wheel_delta.clamp(-31, 31);
        let (magnitude, positive) = if delta > 0 {
            (delta as u8, true)
        } else {
            (delta.unsigned_abs(), false)
        };

        let control = PushControlBits::new()
            .with_pause(state.pause)
            .with_gohome(state.gohome)
            .with_shutter(state.shutter)
            .with_record(state.record)
            .with_custom1(state.custom1)
            .with_custom2(state.custom2)
            .with_custom3(state.custom3)
            .with_five_up(state.five_way.up)
            .with_five_down(state.five_way.down)
            .with_five_left(state.five_way.left)
            .with_five_right(state.five_way.right)
            .with_five_centre(state.five_way.centre)
            .with_flight_mode(u8::from(state.flight_mode) & 0x03)
            .with_wheel_magnitude(magnitude)
            .with_wheel_positive(positive);

        Self {
            control: control.into_bytes(),
            right_horizontal: uncentre(state.right_stick.horizontal),
            right_vertical: uncentre(state.right_stick.vertical),
            left_vertical: uncentre(state.left_stick.vertical),
            left_horizontal: uncentre(state.left_stick.horizontal),
            left_wheel: uncentre(state.left_wheel),
            right_wheel: uncentre(state.right_wheel),
        }
    }
}

/// Decode a push payload into a controller snapshot.
///
/// The payload must be at least [`RC_PUSH_PAYLOAD_LEN`] bytes; extra bytes
/// are ignored.
pub fn decode_rc_push(payload: &[u8]) -> Result<RcState, RcmError> {
    if payload.len() < RC_PUSH_PAYLOAD_LEN {
        return Err(RcmError::ShortPayload {
            expected: RC_PUSH_PAYLOAD_LEN,
            actual: payload.len(),
        });
    }

    let raw = RcPushRaw::ref_from_bytes(&payload[..RC_PUSH_PAYLOAD_LEN]).map_err(|_| {
        RcmError::ShortPayload {
            expected: RC_PUSH_PAYLOAD_LEN,
            actual: payload.len(),
        }
    })?;

    Ok(RcState::from(raw))
}

/// Encode a controller snapshot as a push payload (the emulator-facing
/// inverse of [`decode_rc_push`]). Reserved bits encode as zero; the wheel
/// delta is clamped to ±31.
#[must_use]
pub fn encode_rc_push(state: &RcState) -> [u8; RC_PUSH_PAYLOAD_LEN] {
    let raw = RcPushRaw::from(state);
    let mut out = [0u8; RC_PUSH_PAYLOAD_LEN];
    out.copy_from_slice(raw.as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_layout_is_17_bytes() {
        assert_eq!(std::mem::size_of::<RcPushRaw>(), RC_PUSH_PAYLOAD_LEN);
    }

    #[test]
    fn control_bits_match_wire_positions() {
        let bits = PushControlBits::from_bytes([0x70, 0xF9, 0x1D, 0x00, 0x00]);
        assert!(bits.pause() && bits.gohome() && bits.shutter());
        assert!(bits.record());
        assert!(bits.five_up() && bits.five_down() && bits.five_left());
        assert!(bits.five_right() && bits.five_centre());
        assert_eq!(bits.flight_mode(), 1);
        assert!(bits.custom1() && bits.custom2() && bits.custom3());
    }

    #[test]
    fn wheel_delta_bits() {
        let bits = PushControlBits::from_bytes([0, 0, 0, 0, (10 << 1) | (1 << 6)]);
        assert_eq!(bits.wheel_magnitude(), 10);
        assert!(bits.wheel_positive());

        let bits = PushControlBits::from_bytes([0, 0, 0, 0, 31 << 1]);
        assert_eq!(bits.wheel_magnitude(), 31);
        assert!(!bits.wheel_positive());
    }

    #[test]
    fn flight_mode_names() {
        assert_eq!(FlightMode::Sport.to_string(), "Sport");
        assert_eq!(FlightMode::Normal.to_string(), "Normal");
        assert_eq!(FlightMode::Tripod.to_string(), "Tripod");
        assert_eq!(FlightMode::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn flight_mode_from_out_of_range_is_unknown() {
        assert_eq!(FlightMode::from_primitive(3), FlightMode::Unknown);
        assert_eq!(FlightMode::from_primitive(99), FlightMode::Unknown);
    }

    #[test]
    fn encode_neutral_centres_analogs() {
        let payload = encode_rc_push(&RcState::neutral());
        assert_eq!(payload[0], 0);
        assert_eq!(payload[1], 0);
        assert_eq!(payload[2], 0x01); // mode switch in Normal
        assert_eq!(payload[3], 0);
        assert_eq!(payload[4], 0);
        for pair in payload[5..].chunks(2) {
            assert_eq!(pair, [0x00, 0x04]);
        }
    }

    #[test]
    fn encode_clamps_wheel_delta() {
        let mut state = RcState::neutral();
        state.right_wheel_delta = i8::MIN;
        let payload = encode_rc_push(&state);
        assert_eq!(payload[4], 31 << 1);

        state.right_wheel_delta = 100;
        let payload = encode_rc_push(&state);
        assert_eq!(payload[4], (31 << 1) | (1 << 6));
    }

    #[test]
    fn encode_zero_delta_clears_sign() {
        let mut state = RcState::neutral();
        state.right_wheel_delta = 0;
        assert_eq!(encode_rc_push(&state)[4], 0);
    }
}
