//! Number built-in.
//!
//! `Number(v)` converts, `new Number(v)` boxes.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::execution_context::EvalContext;
use crate::runner::ds::operations::object::create_wrapper;
use crate::runner::ds::operations::type_conversion::{number_to_string, to_number};
use crate::runner::ds::value::JsValue;

use super::{unwrap_primitive, BuiltInObject};

/// Register the Number built-in.
pub fn register(ctx: &mut EvalContext) {
    let prototype = ctx.realm.number_prototype.clone();
    BuiltInObject::new("Number", number_call)
        .with_constructor(number_construct)
        .with_prototype(prototype)
        .add_prototype_method("toString", number_to_string_method)
        .add_prototype_method("valueOf", number_value_of)
        .install(ctx);
}

fn number_of(args: &[JsValue]) -> f64 {
    match args.first() {
        Some(v) => to_number(v),
        None => 0.0,
    }
}

fn number_call(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Number(number_of(&args)))
}

fn number_construct(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let n = JsValue::Number(number_of(&args));
    Ok(JsValue::Object(create_wrapper(ctx, n)?))
}

fn this_number_value(this: &JsValue) -> Result<f64, JErrorType> {
    match unwrap_primitive(this) {
        JsValue::Number(n) => Ok(n),
        _ => Err(JErrorType::TypeError(
            "Number.prototype.valueOf requires that 'this' be a Number".to_string(),
        )),
    }
}

/// Number.prototype.valueOf
fn number_value_of(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Number(this_number_value(&this)?))
}

/// Number.prototype.toString (radix 10 only)
fn number_to_string_method(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::String(number_to_string(this_number_value(&this)?)))
}
