use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::operations::type_conversion::{
    number_to_string, TYPE_STR_NULL, TYPE_STR_UNDEFINED,
};

/// The boxed representation of every JavaScript value.
///
/// Callable objects are carried as `Function` so call sites can tell them apart without
/// borrowing the object. Both `Object` and `Function` point into the shared object graph.
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    String(String),
    Number(f64),
    Object(JsObjectType),
    Function(JsObjectType),
}

impl JsValue {
    /// Wraps an object reference, picking `Function` for callables.
    pub fn from_object(o: JsObjectType) -> Self {
        let callable = (*o).borrow().is_callable();
        if callable {
            JsValue::Function(o)
        } else {
            JsValue::Object(o)
        }
    }

    pub fn as_object(&self) -> Option<&JsObjectType> {
        match self {
            JsValue::Object(o) | JsValue::Function(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_) | JsValue::Function(_))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, JsValue::Function(_))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl Clone for JsValue {
    fn clone(&self) -> Self {
        match self {
            JsValue::Undefined => JsValue::Undefined,
            JsValue::Null => JsValue::Null,
            JsValue::Boolean(b) => JsValue::Boolean(*b),
            JsValue::String(s) => JsValue::String(s.to_string()),
            JsValue::Number(n) => JsValue::Number(*n),
            JsValue::Object(o) => JsValue::Object(o.clone()),
            JsValue::Function(o) => JsValue::Function(o.clone()),
        }
    }
}

impl Display for JsValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "{}", TYPE_STR_UNDEFINED),
            JsValue::Null => write!(f, "{}", TYPE_STR_NULL),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::String(s) => write!(f, "\"{}\"", s),
            JsValue::Number(n) => write!(f, "{}", number_to_string(*n)),
            JsValue::Object(o) => write!(f, "[object {}]", (**o).borrow().class_name()),
            JsValue::Function(_) => write!(f, "function"),
        }
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "JsValue::Undefined"),
            JsValue::Null => write!(f, "JsValue::Null"),
            JsValue::Boolean(b) => write!(f, "JsValue::Boolean({})", b),
            JsValue::String(s) => write!(f, "JsValue::String({:?})", s),
            JsValue::Number(n) => write!(f, "JsValue::Number({:?})", n),
            JsValue::Object(_) => write!(f, "JsValue::Object(...)"),
            JsValue::Function(_) => write!(f, "JsValue::Function(...)"),
        }
    }
}

/// Identity comparison for objects, value comparison for primitives (NaN != NaN).
impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => Rc::ptr_eq(a, b),
            (JsValue::Function(a), JsValue::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(s.to_string())
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(s)
    }
}
