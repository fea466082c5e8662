//! Object built-in.
//!
//! Provides the Object constructor, the prototype utilities and `hasOwnProperty`.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::execution_context::EvalContext;
use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::operations::object::{
    create_array, create_object, create_object_with_prototype, enumerate_keys,
    get_prototype_of, has_own_property, set_prototype_of, to_object,
};
use crate::runner::ds::operations::type_conversion::to_property_key;
use crate::runner::ds::value::JsValue;

use super::{argument, BuiltInObject};

/// Register the Object built-in.
pub fn register(ctx: &mut EvalContext) {
    let prototype = ctx.realm.object_prototype.clone();
    BuiltInObject::new("Object", object_constructor)
        .with_constructor(object_constructor)
        .with_prototype(prototype)
        .add_method("create", object_create)
        .add_method("keys", object_keys)
        .add_method("getPrototypeOf", object_get_prototype_of)
        .add_method("setPrototypeOf", object_set_prototype_of)
        .add_prototype_method("hasOwnProperty", object_has_own_property)
        .add_prototype_method("toString", object_to_string)
        .install(ctx);
}

/// `Object(v)` and `new Object(v)`: boxes primitives, passes objects through.
fn object_constructor(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let value = argument(&args, 0);
    if value.is_nullish() {
        Ok(JsValue::Object(create_object(ctx)?))
    } else {
        Ok(JsValue::from_object(to_object(ctx, &value)?))
    }
}

fn prototype_argument(v: &JsValue) -> Result<Option<JsObjectType>, JErrorType> {
    match v {
        JsValue::Object(o) | JsValue::Function(o) => Ok(Some(o.clone())),
        JsValue::Null => Ok(None),
        _ => Err(JErrorType::TypeError(format!(
            "Object prototype may only be an Object or null: {}",
            v
        ))),
    }
}

/// Object.create
fn object_create(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let prototype = prototype_argument(&argument(&args, 0))?;
    Ok(JsValue::Object(create_object_with_prototype(
        ctx, prototype, 0,
    )?))
}

/// Object.keys
fn object_keys(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let o = to_object(ctx, &argument(&args, 0))?;
    let keys = enumerate_keys(&o)
        .into_iter()
        .map(|k| Some(JsValue::String(k)))
        .collect();
    Ok(JsValue::Object(create_array(ctx, keys)?))
}

/// Object.getPrototypeOf
fn object_get_prototype_of(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let o = to_object(ctx, &argument(&args, 0))?;
    Ok(match get_prototype_of(&o) {
        Some(p) => JsValue::from_object(p),
        None => JsValue::Null,
    })
}

/// Object.setPrototypeOf. Refuses prototype chains that would loop.
fn object_set_prototype_of(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let target = argument(&args, 0);
    if target.is_nullish() {
        return Err(JErrorType::TypeError(
            "Object.setPrototypeOf called on null or undefined".to_string(),
        ));
    }
    let prototype = prototype_argument(&argument(&args, 1))?;
    if let Some(o) = target.as_object() {
        if !set_prototype_of(o, prototype) {
            return Err(JErrorType::TypeError(
                "Cyclic __proto__ value or non-extensible object".to_string(),
            ));
        }
    }
    Ok(target)
}

/// Object.prototype.hasOwnProperty
fn object_has_own_property(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let key = to_property_key(&argument(&args, 0));
    let o = to_object(ctx, &this)?;
    Ok(JsValue::Boolean(has_own_property(&o, &key)))
}

/// Object.prototype.toString
fn object_to_string(
    ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let tag = match &this {
        JsValue::Undefined => "Undefined",
        JsValue::Null => "Null",
        _ => {
            let o = to_object(ctx, &this)?;
            let tag = (*o).borrow().class_name();
            tag
        }
    };
    Ok(JsValue::String(format!("[object {}]", tag)))
}
