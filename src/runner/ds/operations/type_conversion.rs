use crate::runner::ds::object::ObjectType;
use crate::runner::ds::operations::object::join_elements;
use crate::runner::ds::object_property::{parse_array_index, PropertyKey};
use crate::runner::ds::value::JsValue;

pub const TYPE_STR_UNDEFINED: &str = "undefined";
pub const TYPE_STR_NULL: &str = "null";
pub const TYPE_STR_BOOLEAN: &str = "boolean";
pub const TYPE_STR_STRING: &str = "string";
pub const TYPE_STR_NUMBER: &str = "number";
pub const TYPE_STR_OBJECT: &str = "object";
pub const TYPE_STR_FUNCTION: &str = "function";

/// Longest string `join` will build, in bytes.
pub const MAX_STRING_LENGTH: usize = (1 << 30) - 25;

/// The `typeof` result.
pub fn get_type(a: &JsValue) -> &'static str {
    match a {
        JsValue::Undefined => TYPE_STR_UNDEFINED,
        JsValue::Null => TYPE_STR_OBJECT,
        JsValue::Boolean(_) => TYPE_STR_BOOLEAN,
        JsValue::String(_) => TYPE_STR_STRING,
        JsValue::Number(_) => TYPE_STR_NUMBER,
        JsValue::Object(_) => TYPE_STR_OBJECT,
        JsValue::Function(_) => TYPE_STR_FUNCTION,
    }
}

pub enum PreferredType {
    Default,
    String,
    Number,
}

/// Converts objects to primitives; primitives are returned unchanged.
///
/// Wrappers unbox, arrays join their elements with `,`. User-defined `valueOf`/`toString`
/// are not consulted.
pub fn to_primitive(v: &JsValue, preferred_type: PreferredType) -> JsValue {
    let o = match v {
        JsValue::Object(o) | JsValue::Function(o) => o,
        _ => return v.clone(),
    };
    let len = match &*(**o).borrow() {
        ObjectType::Wrapper(w) => {
            let p = w.primitive_value().clone();
            return match preferred_type {
                PreferredType::String => JsValue::String(to_string(&p)),
                PreferredType::Number | PreferredType::Default => p,
            };
        }
        ObjectType::Function(f) => {
            return JsValue::String(format!("function {}() {{ [code] }}", f.name()))
        }
        ObjectType::Ordinary(_) => return JsValue::String("[object Object]".to_string()),
        ObjectType::Array(a) => a.length(),
    };
    // Elements are read back through the object, so the borrow above must end first.
    JsValue::String(join_elements(o, len, ","))
}

pub fn to_boolean(v: &JsValue) -> bool {
    match v {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => !(n.is_nan() || *n == 0.0),
        JsValue::String(s) => !s.is_empty(),
        JsValue::Object(_) | JsValue::Function(_) => true,
    }
}

pub fn to_number(v: &JsValue) -> f64 {
    match v {
        JsValue::Undefined => f64::NAN,
        JsValue::Null => 0.0,
        JsValue::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        JsValue::Number(n) => *n,
        JsValue::String(s) => string_to_number(s),
        JsValue::Object(_) | JsValue::Function(_) => {
            to_number(&to_primitive(v, PreferredType::Number))
        }
    }
}

/// `ToNumber` applied to a string: surrounding whitespace is ignored, the empty string is 0.
pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return match u64::from_str_radix(hex, 16) {
            Ok(n) => n as f64,
            Err(_) => f64::NAN,
        };
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // Rust accepts spellings like "inf" and "nan" that JavaScript does not.
    let numeric = t
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !numeric {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

/// `Number.prototype.toString()` for radix 10.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if n.fract() == 0.0 && abs < 1e21 {
        return format!("{}", n as i128);
    }
    if abs >= 1e21 || abs < 1e-6 {
        let formatted = format!("{:e}", n);
        return match formatted.find('e') {
            Some(pos) if !formatted[pos + 1..].starts_with('-') => {
                format!("{}e+{}", &formatted[..pos], &formatted[pos + 1..])
            }
            _ => formatted,
        };
    }
    format!("{}", n)
}

pub fn to_string(v: &JsValue) -> String {
    match v {
        JsValue::Undefined => TYPE_STR_UNDEFINED.to_string(),
        JsValue::Null => TYPE_STR_NULL.to_string(),
        JsValue::Boolean(b) => b.to_string(),
        JsValue::Number(n) => number_to_string(*n),
        JsValue::String(s) => s.clone(),
        JsValue::Object(_) | JsValue::Function(_) => {
            to_string(&to_primitive(v, PreferredType::String))
        }
    }
}

pub fn to_int32(v: &JsValue) -> i32 {
    to_uint32(v) as i32
}

pub fn to_uint32(v: &JsValue) -> u32 {
    let n = to_number(v);
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let modulo = n.trunc().rem_euclid(4294967296.0);
    modulo as u32
}

/// Normalises any value used as a property name.
pub fn to_property_key(v: &JsValue) -> PropertyKey {
    match v {
        JsValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n < u32::MAX as f64 => {
            PropertyKey::Int(*n as u32)
        }
        JsValue::String(s) => match parse_array_index(s) {
            Some(i) => PropertyKey::Int(i),
            None => PropertyKey::Str(s.clone()),
        },
        _ => PropertyKey::new(&to_string(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting() {
        assert_eq!(number_to_string(1.0), "1");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(123456789.0), "123456789");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1.5e-7), "1.5e-7");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number("0x1F"), 31.0);
        assert_eq!(string_to_number("1e3"), 1000.0);
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("12px").is_nan());
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
    }

    #[test]
    fn test_int32_wraps() {
        assert_eq!(to_int32(&JsValue::Number(4294967297.0)), 1);
        assert_eq!(to_int32(&JsValue::Number(-1.0)), -1);
        assert_eq!(to_uint32(&JsValue::Number(-1.0)), 4294967295);
        assert_eq!(to_int32(&JsValue::Number(f64::NAN)), 0);
        assert_eq!(to_int32(&JsValue::Number(2147483648.0)), -2147483648);
    }

    #[test]
    fn test_property_key_from_values() {
        assert_eq!(to_property_key(&JsValue::Number(3.0)), PropertyKey::Int(3));
        assert_eq!(to_property_key(&JsValue::String("3".to_string())), PropertyKey::Int(3));
        assert_eq!(
            to_property_key(&JsValue::Number(1.5)),
            PropertyKey::Str("1.5".to_string())
        );
        assert_eq!(
            to_property_key(&JsValue::Boolean(true)),
            PropertyKey::Str("true".to_string())
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!to_boolean(&JsValue::String(String::new())));
        assert!(!to_boolean(&JsValue::Number(f64::NAN)));
        assert!(to_boolean(&JsValue::String("0".to_string())));
    }
}
