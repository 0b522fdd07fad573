//! Property-based tests for axis remapping and battery decoding.

use propad_engine::adaptor::{decode_battery_level, AxisCalibration, StickCalibration};
use proptest::prelude::*;

fn arb_axis() -> impl Strategy<Value = AxisCalibration> {
    let table = StickCalibration::default();
    prop::sample::select(vec![table.left_x, table.left_y, table.right_x, table.right_y])
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(500))]

    /// Remap preserves the sign of the deviation from neutral.
    #[test]
    fn prop_remap_is_sign_preserving(axis in arb_axis(), value in 0u16..0x1000) {
        let mapped = axis.remap(value);
        let clamped = value.clamp(axis.min, axis.max);
        if clamped > axis.neutral {
            prop_assert!(mapped > 0, "above neutral must map positive, got {mapped}");
        } else if clamped < axis.neutral {
            prop_assert!(mapped < 0, "below neutral must map negative, got {mapped}");
        } else {
            prop_assert_eq!(mapped, 0);
        }
    }

    /// Remap is monotonic over the whole 12-bit input range.
    #[test]
    fn prop_remap_is_monotonic(axis in arb_axis(), a in 0u16..0x1000, b in 0u16..0x1000) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            axis.remap(low) <= axis.remap(high),
            "remap({low:#05x}) > remap({high:#05x})"
        );
    }

    /// Remap lands exactly on the calibration anchors.
    #[test]
    fn prop_remap_anchors(axis in arb_axis()) {
        prop_assert_eq!(axis.remap(axis.min), i16::MIN);
        prop_assert_eq!(axis.remap(axis.neutral), 0);
        prop_assert_eq!(axis.remap(axis.max), i16::MAX);
    }

    /// Neighboring samples never jump more than the local scale allows, so
    /// the curve has no discontinuities.
    #[test]
    fn prop_remap_is_continuous(axis in arb_axis(), value in 0u16..0x0FFF) {
        let here = i32::from(axis.remap(value));
        let next = i32::from(axis.remap(value + 1));
        // the steeper half of the default tables spans ~0x550 counts over
        // a 0x8000 range, so one count moves the output by well under 64
        prop_assert!((next - here).abs() < 64, "step of {} at {value:#05x}", next - here);
    }

    /// Battery decoding is monotonic in the raw gauge byte.
    #[test]
    fn prop_battery_decode_is_monotonic(a: u8, b: u8) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(decode_battery_level(low) <= decode_battery_level(high));
    }
}
