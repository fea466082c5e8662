//! String built-in.
//!
//! `String(v)` converts, `new String(v)` boxes.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::execution_context::EvalContext;
use crate::runner::ds::operations::object::create_wrapper;
use crate::runner::ds::operations::type_conversion::to_string;
use crate::runner::ds::value::JsValue;

use super::{unwrap_primitive, BuiltInObject};

/// Register the String built-in.
pub fn register(ctx: &mut EvalContext) {
    let prototype = ctx.realm.string_prototype.clone();
    BuiltInObject::new("String", string_call)
        .with_constructor(string_construct)
        .with_prototype(prototype)
        .add_prototype_method("toString", string_value_of)
        .add_prototype_method("valueOf", string_value_of)
        .install(ctx);
}

fn string_of(args: &[JsValue]) -> String {
    match args.first() {
        Some(v) => to_string(v),
        None => String::new(),
    }
}

fn string_call(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::String(string_of(&args)))
}

fn string_construct(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let s = JsValue::String(string_of(&args));
    Ok(JsValue::Object(create_wrapper(ctx, s)?))
}

/// String.prototype.valueOf / toString
fn string_value_of(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    match unwrap_primitive(&this) {
        s @ JsValue::String(_) => Ok(s),
        _ => Err(JErrorType::TypeError(
            "String.prototype.valueOf requires that 'this' be a String".to_string(),
        )),
    }
}
