//! Tests for the RC push payload decoder: bit positions, reserved-bit
//! isolation, analog centring, and the wheel delta encoding.

mod common;

use common::*;

fn decoded(payload: &[u8]) -> RcState {
    decode_rc_push(payload).expect("payload decodes")
}

#[test]
fn all_zero_payload() {
    let state = decoded(&[0u8; RC_PUSH_PAYLOAD_LEN]);

    assert!(!state.pause && !state.gohome && !state.shutter && !state.record);
    assert!(!state.custom1 && !state.custom2 && !state.custom3);
    assert!(
        !state.five_way.up
            && !state.five_way.down
            && !state.five_way.left
            && !state.five_way.right
            && !state.five_way.centre
    );
    assert_eq!(state.flight_mode, FlightMode::Sport);

    // Raw 0x0000 sits 0x400 below centre.
    assert_eq!(state.right_stick.horizontal, -1024);
    assert_eq!(state.right_stick.vertical, -1024);
    assert_eq!(state.left_stick.horizontal, -1024);
    assert_eq!(state.left_stick.vertical, -1024);
    assert_eq!(state.left_wheel, -1024);
    assert_eq!(state.right_wheel, -1024);
    assert_eq!(state.right_wheel_delta, 0);
}

#[test]
fn centred_payload_is_all_zeroes() {
    let state = decoded(&centred_payload());

    assert_eq!(state.right_stick, StickAxes::default());
    assert_eq!(state.left_stick, StickAxes::default());
    assert_eq!(state.left_wheel, 0);
    assert_eq!(state.right_wheel, 0);
    assert_eq!(state.right_wheel_delta, 0);
    assert_eq!(state.flight_mode, FlightMode::Sport);
    assert!(!state.pause && !state.record);
}

#[test]
fn all_pressed_payload_sets_every_button() {
    let state = decoded(&all_pressed_payload());

    assert!(state.pause && state.gohome && state.shutter && state.record);
    assert!(state.custom1 && state.custom2 && state.custom3);
    assert!(
        state.five_way.up
            && state.five_way.down
            && state.five_way.left
            && state.five_way.right
            && state.five_way.centre
    );
    assert_eq!(state.flight_mode, FlightMode::Normal);
    assert_eq!(state.right_stick, StickAxes::default());
}

#[test]
fn individual_buttons() {
    let base = centred_payload();

    let mut p = base;
    p[0] = 1 << 4;
    assert!(decoded(&p).pause);
    p[0] = 1 << 5;
    let s = decoded(&p);
    assert!(s.gohome && !s.pause);
    p[0] = 1 << 6;
    assert!(decoded(&p).shutter);

    let mut p = base;
    p[1] = 1 << 0;
    assert!(decoded(&p).record);

    let mut p = base;
    p[2] = 1 << 2;
    let s = decoded(&p);
    assert!(s.custom1 && !s.custom2 && !s.custom3);
    p[2] = 1 << 3;
    assert!(decoded(&p).custom2);
    p[2] = 1 << 4;
    assert!(decoded(&p).custom3);
}

#[test]
fn five_way_directions() {
    let base = centred_payload();
    let cases: [(u8, fn(&FiveWay) -> bool); 5] = [
        (1 << 3, |f: &FiveWay| f.right),
        (1 << 4, |f: &FiveWay| f.up),
        (1 << 5, |f: &FiveWay| f.down),
        (1 << 6, |f: &FiveWay| f.left),
        (1 << 7, |f: &FiveWay| f.centre),
    ];

    for (bit, check) in cases {
        let mut p = base;
        p[1] = bit;
        let state = decoded(&p);
        assert!(check(&state.five_way), "bit {bit:#04x}");

        // Only that direction fires.
        let asserted = [
            state.five_way.up,
            state.five_way.down,
            state.five_way.left,
            state.five_way.right,
            state.five_way.centre,
        ]
        .iter()
        .filter(|&&b| b)
        .count();
        assert_eq!(asserted, 1);
    }
}

#[test]
fn flight_mode_positions() {
    let base = centred_payload();

    for (bits, mode) in [
        (0x00, FlightMode::Sport),
        (0x01, FlightMode::Normal),
        (0x02, FlightMode::Tripod),
        (0x03, FlightMode::Unknown),
    ] {
        let mut p = base;
        p[2] = bits;
        assert_eq!(decoded(&p).flight_mode, mode);
    }

    // Custom-button bits alongside the mode bits leave extraction alone.
    let mut p = base;
    p[2] = 0x07;
    let state = decoded(&p);
    assert_eq!(state.flight_mode, FlightMode::Unknown);
    assert!(state.custom1);
}

#[test]
fn wheel_delta_full_grid() {
    let base = centred_payload();

    for magnitude in 0..=31u8 {
        for positive in [false, true] {
            let mut p = base;
            p[4] = (magnitude << 1) | (u8::from(positive) << 6);
            let expected = match (magnitude, positive) {
                (0, _) => 0,
                (m, true) => m as i8,
                (m, false) => -(m as i8),
            };
            assert_eq!(
                decoded(&p).right_wheel_delta,
                expected,
                "magnitude {magnitude} positive {positive}"
            );
        }
    }
}

#[test]
fn centring_wraps_across_the_full_range() {
    let mut p = centred_payload();

    for raw in 0..=u16::MAX {
        let [lo, hi] = raw.to_le_bytes();
        p[5] = lo;
        p[6] = hi;
        let expected = raw.wrapping_sub(0x0400) as i16;
        assert_eq!(decoded(&p).right_stick.horizontal, expected, "raw {raw:#06x}");
    }

    // Spot the documented boundary cases on another channel.
    p[5] = 0x00;
    p[6] = 0x04;
    p[15] = 0xFF;
    p[16] = 0xFF;
    assert_eq!(decoded(&p).right_wheel, -1025);
}

#[test]
fn reserved_bits_are_inert() {
    let mut base = all_pressed_payload();
    base[4] = (9 << 1) | (1 << 6);
    let reference = decoded(&base);

    let mut reserved: Vec<(usize, u8)> = vec![
        (0, 0),
        (0, 1),
        (0, 2),
        (0, 3),
        (0, 7),
        (1, 1),
        (1, 2),
        (2, 5),
        (2, 6),
        (2, 7),
        (4, 0),
        (4, 7),
    ];
    reserved.extend((0..8).map(|bit| (3usize, bit)));

    for (byte, bit) in reserved {
        let mut p = base;
        p[byte] ^= 1 << bit;
        assert_eq!(decoded(&p), reference, "byte {byte} bit {bit}");
    }
}

#[test]
fn short_payload_is_rejected() {
    for len in [0usize, 1, 10, 16] {
        let payload = vec![0u8; len];
        assert!(
            matches!(
                decode_rc_push(&payload),
                Err(RcmError::ShortPayload { expected: 17, actual }) if actual == len
            ),
            "len {len}"
        );
    }
}

#[test]
fn longer_payload_ignores_the_tail() {
    let mut long = [0u8; 32];
    long[..RC_PUSH_PAYLOAD_LEN].copy_from_slice(&all_pressed_payload());
    for extra in long.iter_mut().skip(RC_PUSH_PAYLOAD_LEN) {
        *extra = 0xEE;
    }

    assert_eq!(decoded(&long), decoded(&all_pressed_payload()));
}

#[test]
fn encode_inverts_decode_for_in_range_states() {
    let mut sample = RcState::neutral();
    sample.pause = true;
    sample.record = true;
    sample.custom2 = true;
    sample.five_way.left = true;
    sample.five_way.centre = true;
    sample.flight_mode = FlightMode::Tripod;
    sample.right_stick = StickAxes {
        horizontal: 330,
        vertical: -330,
    };
    sample.left_stick = StickAxes {
        horizontal: -660,
        vertical: 660,
    };
    sample.left_wheel = -120;
    sample.right_wheel = 45;
    sample.right_wheel_delta = -17;

    for state in [RcState::neutral(), sample] {
        let payload = encode_rc_push(&state);
        assert_eq!(decoded(&payload), state);
    }
}
