//! Value properties of the global object and the `emit` output function.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::execution_context::EvalContext;
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::operations::type_conversion::to_string;
use crate::runner::ds::value::JsValue;

use super::register_global_function;

/// Global value properties no script can overwrite. Assignments to them are dropped.
pub const READ_ONLY_GLOBALS: [&str; 3] = ["undefined", "NaN", "Infinity"];

pub fn register(ctx: &mut EvalContext) {
    let global = ctx.global_object();
    {
        let mut global = global.borrow_mut();
        let base = global.as_js_object_mut().get_object_base_mut();
        let values = [
            JsValue::Undefined,
            JsValue::Number(f64::NAN),
            JsValue::Number(f64::INFINITY),
        ];
        for (name, value) in READ_ONLY_GLOBALS.iter().zip(values) {
            base.define_own_property(PropertyKey::new(name), PropertyDescriptor::new_frozen(value));
        }
    }
    register_global_function(ctx, "emit", emit);
}

/// `emit(v)`: appends `ToString(v)` to the captured output, with no separator.
fn emit(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    for arg in &args {
        let text = to_string(arg);
        ctx.write_output(&text);
    }
    Ok(JsValue::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::operations::object::get;

    #[test]
    fn test_global_constants_are_read_only() {
        let mut ctx = EvalContext::default();
        register(&mut ctx);
        let global = ctx.global_object();
        assert!(!crate::runner::ds::operations::object::set(
            &global,
            PropertyKey::new("undefined"),
            JsValue::Number(1.0)
        ));
        assert_eq!(get(&global, &PropertyKey::new("undefined")), JsValue::Undefined);
        assert_eq!(
            get(&global, &PropertyKey::new("Infinity")),
            JsValue::Number(f64::INFINITY)
        );
    }

    #[test]
    fn test_emit_concatenates_without_separator() {
        let mut ctx = EvalContext::default();
        emit(&mut ctx, JsValue::Undefined, vec![JsValue::Number(1.0)]).unwrap();
        emit(&mut ctx, JsValue::Undefined, vec![JsValue::from("a")]).unwrap();
        assert_eq!(ctx.output(), "1a");
    }
}
