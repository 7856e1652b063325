//! Property-based tests for the accumulator and encoder.
//!
//! Uses proptest to check the invariants that must hold for any event
//! sequence, not just the hand-picked examples in the unit tests.

use proptest::prelude::*;
use sermouse_core::protocol::packet::recombine_axis;
use sermouse_core::{
    Axis, Button, MouseEvent, MouseState, PacketSize, PendingLevel, WirePacket,
};

fn any_event() -> impl Strategy<Value = MouseEvent> {
    prop_oneof![
        (any::<bool>(), -300i32..=300).prop_map(|(x, delta)| MouseEvent::Motion {
            axis: if x { Axis::X } else { Axis::Y },
            delta,
        }),
        (-40i32..=40).prop_map(|delta| MouseEvent::Wheel { delta }),
        (0u8..3, any::<bool>()).prop_map(|(b, pressed)| MouseEvent::Button {
            button: match b {
                0 => Button::Left,
                1 => Button::Right,
                _ => Button::Middle,
            },
            pressed,
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// The wire halves of each axis recombine to the clamped running sum.
    #[test]
    fn prop_axis_split_recombines_to_clamped_sum(
        deltas in proptest::collection::vec((any::<bool>(), -200i32..=200), 0..40),
    ) {
        let mut state = MouseState::new(true);
        let (mut x, mut y) = (0i32, 0i32);
        for (is_x, delta) in &deltas {
            if *is_x {
                state.apply_motion(Axis::X, *delta);
                x = (x + delta).clamp(-127, 127);
            } else {
                state.apply_motion(Axis::Y, *delta);
                y = (y + delta).clamp(-127, 127);
            }
        }

        let packet = WirePacket::encode(&state, PacketSize::Short);
        let bytes = packet.as_bytes();

        prop_assert_eq!(i32::from(recombine_axis(bytes[0], bytes[1])), x);
        prop_assert_eq!(i32::from(recombine_axis(bytes[0] >> 2, bytes[2])), y);
    }

    /// Accumulated values never leave their ranges.
    #[test]
    fn prop_accumulator_stays_in_range(
        events in proptest::collection::vec(any_event(), 0..100),
    ) {
        let mut state = MouseState::new(true);
        for event in events {
            state.apply(event);
            prop_assert!((-127..=127).contains(&state.dx()));
            prop_assert!((-127..=127).contains(&state.dy()));
            prop_assert!((-15..=15).contains(&state.wheel()));
        }
    }

    /// The pending level is monotone within a window.
    #[test]
    fn prop_pending_level_never_decreases(
        events in proptest::collection::vec(any_event(), 1..60),
        wheel in any::<bool>(),
    ) {
        let mut state = MouseState::new(wheel);
        let mut previous = PendingLevel::None;
        for event in events {
            state.apply(event);
            prop_assert!(state.pending_level() >= previous);
            previous = state.pending_level();
        }
    }

    /// Any button transition forces a send; middle changes or wheel deltas
    /// with wheel support always need the 4-byte form.
    #[test]
    fn prop_buttons_force_and_middle_or_wheel_go_full(event in any_event()) {
        let mut state = MouseState::new(true);
        state.apply(event);

        match event {
            MouseEvent::Button { button, .. } => {
                prop_assert!(state.force_send());
                if button == Button::Middle {
                    prop_assert_eq!(state.pending_level(), PendingLevel::Full);
                }
            }
            MouseEvent::Wheel { delta } if delta != 0 => {
                prop_assert_eq!(state.pending_level(), PendingLevel::Full);
            }
            _ => {}
        }
    }

    /// Every encoded packet has the sync bit in byte 0 only and a clean byte 3.
    #[test]
    fn prop_packets_keep_sync_framing(
        events in proptest::collection::vec(any_event(), 1..30),
    ) {
        let mut state = MouseState::new(true);
        for event in events {
            state.apply(event);
        }
        let packet = WirePacket::encode(&state, PacketSize::Full);
        let bytes = packet.as_bytes();

        prop_assert_eq!(bytes[0] & 0xC0, 0x40);
        prop_assert!(bytes[1..].iter().all(|b| b & 0xC0 == 0));
        prop_assert_eq!(bytes[3] & 0xE0, 0);
    }
}
