//! Boolean built-in.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::execution_context::EvalContext;
use crate::runner::ds::operations::object::create_wrapper;
use crate::runner::ds::operations::type_conversion::to_boolean;
use crate::runner::ds::value::JsValue;

use super::{argument, unwrap_primitive, BuiltInObject};

/// Register the Boolean built-in.
pub fn register(ctx: &mut EvalContext) {
    let prototype = ctx.realm.boolean_prototype.clone();
    BuiltInObject::new("Boolean", boolean_call)
        .with_constructor(boolean_construct)
        .with_prototype(prototype)
        .add_prototype_method("toString", boolean_to_string)
        .add_prototype_method("valueOf", boolean_value_of)
        .install(ctx);
}

fn boolean_call(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Boolean(to_boolean(&argument(&args, 0))))
}

fn boolean_construct(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let b = JsValue::Boolean(to_boolean(&argument(&args, 0)));
    Ok(JsValue::Object(create_wrapper(ctx, b)?))
}

fn this_boolean_value(this: &JsValue) -> Result<bool, JErrorType> {
    match unwrap_primitive(this) {
        JsValue::Boolean(b) => Ok(b),
        _ => Err(JErrorType::TypeError(
            "Boolean.prototype.valueOf requires that 'this' be a Boolean".to_string(),
        )),
    }
}

/// Boolean.prototype.valueOf
fn boolean_value_of(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Boolean(this_boolean_value(&this)?))
}

/// Boolean.prototype.toString
fn boolean_to_string(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::String(this_boolean_value(&this)?.to_string()))
}
