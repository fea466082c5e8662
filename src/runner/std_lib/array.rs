//! Array built-in.
//!
//! Provides the Array constructor, `push` and `join`.

use crate::runner::ds::array_object::ARRAY_LENGTH_PROP;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::execution_context::EvalContext;
use crate::runner::ds::object::ObjectType;
use crate::runner::ds::object_property::PropertyKey;
use crate::runner::ds::operations::object::{create_array, get, join_elements, set, to_object};
use crate::runner::ds::operations::type_conversion::{to_string, to_uint32, MAX_STRING_LENGTH};
use crate::runner::ds::value::JsValue;

use super::{argument, BuiltInObject};

/// Register the Array built-in.
pub fn register(ctx: &mut EvalContext) {
    let prototype = ctx.realm.array_prototype.clone();
    BuiltInObject::new("Array", array_constructor)
        .with_constructor(array_constructor)
        .with_prototype(prototype)
        .add_prototype_method("push", array_push)
        .add_prototype_method("join", array_join)
        .install(ctx);
}

/// `Array(n)` makes an empty array of length n; any other argument list becomes the elements.
fn array_constructor(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    if let [JsValue::Number(n)] = args.as_slice() {
        let len = to_uint32(&JsValue::Number(*n));
        if len as f64 != *n {
            return Err(JErrorType::RangeError("Invalid array length".to_string()));
        }
        let array = create_array(ctx, Vec::new())?;
        if let ObjectType::Array(a) = &mut *array.borrow_mut() {
            a.set_length(len);
        }
        return Ok(JsValue::Object(array));
    }
    let elements = args.into_iter().map(Some).collect();
    Ok(JsValue::Object(create_array(ctx, elements)?))
}

/// Array.prototype.push. Works on any object with a `length`.
fn array_push(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let o = to_object(ctx, &this)?;
    if let ObjectType::Array(a) = &mut *o.borrow_mut() {
        check_new_length(a.length(), args.len())?;
        let mut len = a.length();
        for arg in args {
            len = a.push(arg)?;
        }
        return Ok(JsValue::Number(len as f64));
    }
    let mut len = to_uint32(&get(&o, &ARRAY_LENGTH_PROP));
    check_new_length(len, args.len())?;
    for arg in args {
        set(&o, PropertyKey::Int(len), arg);
        len += 1;
    }
    set(&o, ARRAY_LENGTH_PROP.clone(), JsValue::Number(len as f64));
    Ok(JsValue::Number(len as f64))
}

/// Nothing is written when the pushed elements would not all fit below `u32::MAX`.
fn check_new_length(len: u32, added: usize) -> Result<(), JErrorType> {
    if len as u64 + added as u64 > u32::MAX as u64 {
        return Err(JErrorType::RangeError("Invalid array length".to_string()));
    }
    Ok(())
}

/// Array.prototype.join
///
/// Visits only the indices that exist, so a huge sparse `length` costs separators, not
/// element slots.
fn array_join(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let o = to_object(ctx, &this)?;
    let separator = match argument(&args, 0) {
        JsValue::Undefined => ",".to_string(),
        s => to_string(&s),
    };
    let len = to_uint32(&get(&o, &ARRAY_LENGTH_PROP));
    let separator_bytes = len.saturating_sub(1) as u64 * separator.len() as u64;
    if separator_bytes > MAX_STRING_LENGTH as u64 {
        return Err(JErrorType::RangeError("Invalid string length".to_string()));
    }
    if !ctx.heap.can_allocate(separator_bytes as usize) {
        return Err(JErrorType::RangeError("Out of memory".to_string()));
    }
    let joined = join_elements(&o, len, &separator);
    if joined.len() > MAX_STRING_LENGTH {
        return Err(JErrorType::RangeError("Invalid string length".to_string()));
    }
    Ok(JsValue::String(joined))
}
