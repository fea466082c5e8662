use std::fmt;
use std::fmt::{Display, Formatter};

use crate::runner::ds::value::JsValue;

/// A property name, normalised so that `o[1]` and `o["1"]` address the same slot.
///
/// `Int` holds canonical array indices (`0 ..= 2^32 - 2`); every other name is `Str`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Str(String),
    Int(u32),
}

impl PropertyKey {
    pub fn new(name: &str) -> Self {
        match parse_array_index(name) {
            Some(i) => PropertyKey::Int(i),
            None => PropertyKey::Str(name.to_string()),
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, PropertyKey::Int(_))
    }

    pub fn is_named(&self, name: &str) -> bool {
        match self {
            PropertyKey::Str(s) => s == name,
            PropertyKey::Int(_) => false,
        }
    }
}

impl Display for PropertyKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Str(s) => write!(f, "{}", s),
            PropertyKey::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        PropertyKey::new(name)
    }
}

impl From<u32> for PropertyKey {
    fn from(index: u32) -> Self {
        PropertyKey::Int(index)
    }
}

/// Returns the array index a string denotes, if it is in canonical form.
pub fn parse_array_index(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 10 {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match s.parse::<u64>() {
        Ok(n) if n < u32::MAX as u64 => Some(n as u32),
        _ => None,
    }
}

/// A data property. Accessor properties are not part of this engine.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub value: JsValue,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl PropertyDescriptor {
    /// The attributes a plain assignment creates.
    pub fn new_data(value: JsValue) -> Self {
        PropertyDescriptor {
            value,
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Writable and configurable but skipped by enumeration. Used for built-in methods.
    pub fn new_hidden(value: JsValue) -> Self {
        PropertyDescriptor {
            value,
            writable: true,
            enumerable: false,
            configurable: true,
        }
    }

    pub fn new_frozen(value: JsValue) -> Self {
        PropertyDescriptor {
            value,
            writable: false,
            enumerable: false,
            configurable: false,
        }
    }
}
