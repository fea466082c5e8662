//! The static type lattice computed by analysis.
//!
//! `Dynamic` is the top element: nothing is known. Every other element names one runtime
//! representation. `Object` and `Function` are boxed references; `Number` and `Boolean` can
//! be kept unboxed by a backend.

use std::fmt;

use crate::runner::ds::operations::type_conversion::{
    TYPE_STR_BOOLEAN, TYPE_STR_FUNCTION, TYPE_STR_NUMBER, TYPE_STR_OBJECT, TYPE_STR_STRING,
    TYPE_STR_UNDEFINED,
};
use crate::runner::ds::value::JsValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExprType {
    #[default]
    Dynamic,
    Object,
    Number,
    Boolean,
    String,
    Undefined,
    Function,
}

impl ExprType {
    /// Least upper bound: equal types stay, anything else widens to `Dynamic`.
    pub fn join(self, other: ExprType) -> ExprType {
        if self == other {
            self
        } else {
            ExprType::Dynamic
        }
    }

    pub fn is_unboxed(self) -> bool {
        matches!(self, ExprType::Number | ExprType::Boolean)
    }

    pub fn is_object(self) -> bool {
        matches!(self, ExprType::Object | ExprType::Function)
    }

    /// `Number` when both operands are `Number`, `Dynamic` otherwise.
    pub fn numeric(left: ExprType, right: ExprType) -> ExprType {
        if left == ExprType::Number && right == ExprType::Number {
            ExprType::Number
        } else {
            ExprType::Dynamic
        }
    }

    /// The `typeof` string every value of this type produces, if there is one.
    pub fn type_of(self) -> Option<&'static str> {
        match self {
            ExprType::Dynamic => None,
            ExprType::Object => Some(TYPE_STR_OBJECT),
            ExprType::Number => Some(TYPE_STR_NUMBER),
            ExprType::Boolean => Some(TYPE_STR_BOOLEAN),
            ExprType::String => Some(TYPE_STR_STRING),
            ExprType::Undefined => Some(TYPE_STR_UNDEFINED),
            ExprType::Function => Some(TYPE_STR_FUNCTION),
        }
    }

    /// Type of a constant. `null` has no element of its own and stays `Dynamic`.
    pub fn of_value(v: &JsValue) -> ExprType {
        match v {
            JsValue::Undefined => ExprType::Undefined,
            JsValue::Null => ExprType::Dynamic,
            JsValue::Boolean(_) => ExprType::Boolean,
            JsValue::String(_) => ExprType::String,
            JsValue::Number(_) => ExprType::Number,
            JsValue::Object(_) => ExprType::Object,
            JsValue::Function(_) => ExprType::Function,
        }
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExprType::Dynamic => "dynamic",
            ExprType::Object => "object",
            ExprType::Number => "number",
            ExprType::Boolean => "boolean",
            ExprType::String => "string",
            ExprType::Undefined => "undefined",
            ExprType::Function => "function",
        };
        f.write_str(name)
    }
}
