//! Numeric operators shared by the VM and constant folding.

use crate::runner::ds::operations::type_conversion::{to_int32, to_number, to_uint32};
use crate::runner::ds::value::JsValue;

fn shift_count(v: &JsValue) -> u32 {
    to_uint32(v) & 0x1f
}

pub fn subtract(a: &JsValue, b: &JsValue) -> f64 {
    to_number(a) - to_number(b)
}

pub fn multiply(a: &JsValue, b: &JsValue) -> f64 {
    to_number(a) * to_number(b)
}

pub fn divide(a: &JsValue, b: &JsValue) -> f64 {
    to_number(a) / to_number(b)
}

/// `%` truncates toward zero, like C's `fmod`, which is what `f64 %` does.
pub fn remainder(a: &JsValue, b: &JsValue) -> f64 {
    to_number(a) % to_number(b)
}

pub fn shift_left(a: &JsValue, b: &JsValue) -> f64 {
    to_int32(a).wrapping_shl(shift_count(b)) as f64
}

pub fn shift_right(a: &JsValue, b: &JsValue) -> f64 {
    (to_int32(a) >> shift_count(b)) as f64
}

pub fn unsigned_shift_right(a: &JsValue, b: &JsValue) -> f64 {
    (to_uint32(a) >> shift_count(b)) as f64
}

pub fn bit_and(a: &JsValue, b: &JsValue) -> f64 {
    (to_int32(a) & to_int32(b)) as f64
}

pub fn bit_or(a: &JsValue, b: &JsValue) -> f64 {
    (to_int32(a) | to_int32(b)) as f64
}

pub fn bit_xor(a: &JsValue, b: &JsValue) -> f64 {
    (to_int32(a) ^ to_int32(b)) as f64
}

pub fn bit_not(a: &JsValue) -> f64 {
    !to_int32(a) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: f64) -> JsValue {
        JsValue::Number(v)
    }

    #[test]
    fn test_shifts_mask_their_count() {
        assert_eq!(shift_left(&n(1.0), &n(33.0)), 2.0);
        assert_eq!(shift_right(&n(-8.0), &n(1.0)), -4.0);
        assert_eq!(unsigned_shift_right(&n(-1.0), &n(0.0)), 4294967295.0);
        assert_eq!(shift_right(&n(1.0), &n(1.0)), 0.0);
    }

    #[test]
    fn test_remainder_keeps_dividend_sign() {
        assert_eq!(remainder(&n(-7.0), &n(2.0)), -1.0);
        assert!(remainder(&n(1.0), &n(0.0)).is_nan());
    }

    #[test]
    fn test_bitwise_on_strings() {
        assert_eq!(bit_or(&JsValue::from("3"), &n(4.0)), 7.0);
        assert_eq!(bit_not(&n(0.0)), -1.0);
    }
}
