use crate::runner::ds::error::JErrorType;
use crate::runner::ds::execution_context::EvalContext;
use crate::runner::ds::object::{JsObject, ObjectBase};
use crate::runner::ds::scope::ScopeRef;
use crate::runner::ds::value::JsValue;
use crate::runner::jit::bytecode::FunctionChunk;
use std::rc::Rc;

/// Function signature for built-in methods.
/// Native functions receive the evaluation context, `this` value, and arguments.
pub type NativeFn = fn(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType>;

pub struct NativeFunction {
    pub name: String,
    pub call: NativeFn,
    /// Behaviour under `new`. Natives without one are not constructors.
    pub construct: Option<NativeFn>,
}

/// A closure: compiled body plus the activation it was created in.
pub struct ScriptFunction {
    pub code: Rc<FunctionChunk>,
    pub scope: Option<ScopeRef>,
}

pub enum FunctionKind {
    Script(ScriptFunction),
    Native(NativeFunction),
}

pub struct FunctionObject {
    base: ObjectBase,
    pub kind: FunctionKind,
}

impl FunctionObject {
    pub fn new(kind: FunctionKind, base: ObjectBase) -> Self {
        FunctionObject { base, kind }
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            FunctionKind::Script(f) => f.code.name.as_deref().unwrap_or(""),
            FunctionKind::Native(f) => &f.name,
        }
    }

    pub fn is_constructor(&self) -> bool {
        match &self.kind {
            FunctionKind::Script(_) => true,
            FunctionKind::Native(f) => f.construct.is_some(),
        }
    }
}

impl JsObject for FunctionObject {
    fn get_object_base(&self) -> &ObjectBase {
        &self.base
    }

    fn get_object_base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn class_name(&self) -> &'static str {
        "Function"
    }
}
