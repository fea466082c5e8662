//! Host built-ins installed into every realm.
//!
//! Each built-in is described with a [`BuiltInObject`] and installed as a non-enumerable
//! property of the global object.

pub mod array;
pub mod boolean;
pub mod core;
pub mod global;
pub mod number;
pub mod object;
pub mod string;

pub use self::core::install_core_builtins;

use crate::runner::ds::execution_context::EvalContext;
use crate::runner::ds::function_object::NativeFn;
use crate::runner::ds::object::{JsObjectType, ObjectType};
use crate::runner::ds::operations::object::{create_native_function, define_hidden_property};
use crate::runner::ds::value::JsValue;

/// Description of a built-in constructor: how it behaves when called, when constructed, and
/// which methods it carries.
pub struct BuiltInObject {
    /// Name of the global binding (e.g. "Object", "Array").
    pub name: String,
    call: NativeFn,
    construct: Option<NativeFn>,
    /// Intrinsic prototype that becomes `<name>.prototype`.
    prototype: Option<JsObjectType>,
    methods: Vec<(String, NativeFn)>,
    prototype_methods: Vec<(String, NativeFn)>,
}

impl BuiltInObject {
    pub fn new(name: impl Into<String>, call: NativeFn) -> Self {
        BuiltInObject {
            name: name.into(),
            call,
            construct: None,
            prototype: None,
            methods: Vec::new(),
            prototype_methods: Vec::new(),
        }
    }

    /// Set the behaviour under `new`.
    pub fn with_constructor(mut self, construct: NativeFn) -> Self {
        self.construct = Some(construct);
        self
    }

    pub fn with_prototype(mut self, prototype: JsObjectType) -> Self {
        self.prototype = Some(prototype);
        self
    }

    /// Add a static method.
    pub fn add_method(mut self, name: impl Into<String>, func: NativeFn) -> Self {
        self.methods.push((name.into(), func));
        self
    }

    /// Add a method to the prototype. Ignored unless a prototype is set.
    pub fn add_prototype_method(mut self, name: impl Into<String>, func: NativeFn) -> Self {
        self.prototype_methods.push((name.into(), func));
        self
    }

    /// Creates the constructor function, wires `prototype`/`constructor` and binds it on the
    /// global object.
    pub fn install(self, ctx: &mut EvalContext) -> JsObjectType {
        let function_prototype = ctx.realm.function_prototype.clone();
        let constructor =
            create_native_function(&function_prototype, &self.name, self.call, self.construct);
        for (name, func) in self.methods {
            let method = create_native_function(&function_prototype, &name, func, None);
            define_hidden_property(&constructor, &name, JsValue::Function(method));
        }
        if let Some(prototype) = &self.prototype {
            for (name, func) in self.prototype_methods {
                let method = create_native_function(&function_prototype, &name, func, None);
                define_hidden_property(prototype, &name, JsValue::Function(method));
            }
            define_hidden_property(&constructor, "prototype", JsValue::Object(prototype.clone()));
            define_hidden_property(prototype, "constructor", JsValue::Function(constructor.clone()));
        }
        define_hidden_property(
            &ctx.global_object(),
            &self.name,
            JsValue::Function(constructor.clone()),
        );
        log::debug!("installed built-in {}", self.name);
        constructor
    }
}

/// Binds a plain native function on the global object.
pub fn register_global_function(ctx: &mut EvalContext, name: &str, func: NativeFn) {
    let function_prototype = ctx.realm.function_prototype.clone();
    let function = create_native_function(&function_prototype, name, func, None);
    define_hidden_property(&ctx.global_object(), name, JsValue::Function(function));
}

/// The argument at `index`, or `undefined` when the caller passed fewer.
pub(crate) fn argument(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or(JsValue::Undefined)
}

/// Unboxes wrapper objects; other values come back as they are.
pub(crate) fn unwrap_primitive(v: &JsValue) -> JsValue {
    if let JsValue::Object(o) = v {
        if let ObjectType::Wrapper(w) = &*(**o).borrow() {
            return w.primitive_value().clone();
        }
    }
    v.clone()
}
