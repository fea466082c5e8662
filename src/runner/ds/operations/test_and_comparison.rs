use crate::runner::ds::operations::type_conversion::{
    to_number, to_primitive, to_string, PreferredType,
};
use crate::runner::ds::value::JsValue;
use std::rc::Rc;

fn same_reference(a: &JsValue, b: &JsValue) -> bool {
    match (a.as_object(), b.as_object()) {
        (Some(x), Some(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// `SameValue`: like `===` except `NaN` equals itself and `+0` differs from `-0`.
pub fn same_value(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Number(x), JsValue::Number(y)) => {
            if x.is_nan() && y.is_nan() {
                true
            } else {
                x == y && x.is_sign_negative() == y.is_sign_negative()
            }
        }
        _ => strict_equality_comparison(a, b),
    }
}

/// `===`
pub fn strict_equality_comparison(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Undefined, JsValue::Undefined) => true,
        (JsValue::Null, JsValue::Null) => true,
        (JsValue::Boolean(x), JsValue::Boolean(y)) => x == y,
        (JsValue::Number(x), JsValue::Number(y)) => x == y,
        (JsValue::String(x), JsValue::String(y)) => x == y,
        _ => same_reference(a, b),
    }
}

/// `==`
pub fn abstract_equality_comparison(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Undefined, JsValue::Null) | (JsValue::Null, JsValue::Undefined) => true,
        (JsValue::Number(x), JsValue::String(_)) => *x == to_number(b),
        (JsValue::String(_), JsValue::Number(y)) => to_number(a) == *y,
        (JsValue::Boolean(_), _) => {
            abstract_equality_comparison(&JsValue::Number(to_number(a)), b)
        }
        (_, JsValue::Boolean(_)) => {
            abstract_equality_comparison(a, &JsValue::Number(to_number(b)))
        }
        (JsValue::Number(_), _) | (JsValue::String(_), _) if b.is_object() => {
            abstract_equality_comparison(a, &to_primitive(b, PreferredType::Default))
        }
        (_, JsValue::Number(_)) | (_, JsValue::String(_)) if a.is_object() => {
            abstract_equality_comparison(&to_primitive(a, PreferredType::Default), b)
        }
        _ => strict_equality_comparison(a, b),
    }
}

/// The abstract relational comparison `a < b`. `None` stands for "undefined" (a NaN operand).
pub fn abstract_relational_comparison(a: &JsValue, b: &JsValue) -> Option<bool> {
    let pa = to_primitive(a, PreferredType::Number);
    let pb = to_primitive(b, PreferredType::Number);
    if let (JsValue::String(x), JsValue::String(y)) = (&pa, &pb) {
        return Some(x.encode_utf16().lt(y.encode_utf16()));
    }
    let nx = to_number(&pa);
    let ny = to_number(&pb);
    if nx.is_nan() || ny.is_nan() {
        None
    } else {
        Some(nx < ny)
    }
}

pub fn less_than(a: &JsValue, b: &JsValue) -> bool {
    abstract_relational_comparison(a, b).unwrap_or(false)
}

pub fn greater_than(a: &JsValue, b: &JsValue) -> bool {
    abstract_relational_comparison(b, a).unwrap_or(false)
}

pub fn less_than_or_equal(a: &JsValue, b: &JsValue) -> bool {
    matches!(abstract_relational_comparison(b, a), Some(false))
}

pub fn greater_than_or_equal(a: &JsValue, b: &JsValue) -> bool {
    matches!(abstract_relational_comparison(a, b), Some(false))
}

/// The `+` operator: string concatenation if either primitive operand is a string,
/// numeric addition otherwise.
pub fn add(a: &JsValue, b: &JsValue) -> JsValue {
    let pa = to_primitive(a, PreferredType::Default);
    let pb = to_primitive(b, PreferredType::Default);
    match (&pa, &pb) {
        (JsValue::String(x), _) => JsValue::String(format!("{}{}", x, to_string(&pb))),
        (_, JsValue::String(y)) => JsValue::String(format!("{}{}", to_string(&pa), y)),
        _ => JsValue::Number(to_number(&pa) + to_number(&pb)),
    }
}
