//! Stack-based bytecode virtual machine.
//!
//! Executes the bytecode emitted by the compiler. Each function call gets a fresh [`Frame`]
//! with its own operand stack; variables live in the activation scope so closures created
//! during the call keep seeing them after it returns.

use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::execution_context::EvalContext;
use crate::runner::ds::function_object::{FunctionKind, NativeFn};
use crate::runner::ds::object::{JsObjectType, ObjectType};
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::operations::arithmetic;
use crate::runner::ds::operations::object::{
    create_array, create_object_with_prototype, create_script_function, delete_property,
    for_in_keys, get, get_v, has_own_property, has_property, instance_of, put_v, set,
    to_object, PROTOTYPE_PROP,
};
use crate::runner::ds::operations::test_and_comparison::{
    abstract_equality_comparison, add, greater_than, greater_than_or_equal, less_than,
    less_than_or_equal, strict_equality_comparison,
};
use crate::runner::ds::operations::type_conversion::{
    get_type, to_boolean, to_number, to_property_key, TYPE_STR_UNDEFINED,
};
use crate::runner::ds::scope::{ActivationScope, ScopeRef};
use crate::runner::ds::value::JsValue;

use super::bytecode::{Chunk, FunctionChunk, OpCode};

/// Result of VM execution.
pub enum VmResult {
    /// Normal completion with a value.
    Ok(JsValue),
    /// Runtime error.
    Error(JErrorType),
}

impl VmResult {
    pub fn into_result(self) -> Result<JsValue, JErrorType> {
        match self {
            VmResult::Ok(v) => Ok(v),
            VmResult::Error(e) => Err(e),
        }
    }
}

macro_rules! vm_try {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return VmResult::Error(e),
        }
    };
}

/// A live for-in loop: the key snapshot taken at loop entry.
struct ForInState {
    object: Option<JsObjectType>,
    keys: Vec<String>,
    index: usize,
    current: Option<String>,
}

/// The state of one chunk being executed.
pub struct Frame {
    /// Instruction pointer.
    ip: usize,
    /// Operand stack.
    stack: Vec<JsValue>,
    /// Activation holding the locals. `None` for the program.
    scope: Option<ScopeRef>,
    this: JsValue,
    iterators: Vec<ForInState>,
    /// Value of the last expression statement.
    completion: JsValue,
}

impl Frame {
    pub fn new(scope: Option<ScopeRef>, this: JsValue) -> Self {
        Frame {
            ip: 0,
            stack: Vec::with_capacity(16),
            scope,
            this,
            iterators: Vec::new(),
            completion: JsValue::Undefined,
        }
    }

    #[inline]
    fn pop(&mut self) -> JsValue {
        self.stack.pop().unwrap_or(JsValue::Undefined)
    }

    /// The top `n` values, bottom first.
    fn pop_n(&mut self, n: usize) -> Vec<JsValue> {
        let at = self.stack.len().saturating_sub(n);
        self.stack.split_off(at)
    }

    fn peek(&self, depth: usize) -> JsValue {
        self.stack
            .len()
            .checked_sub(depth + 1)
            .and_then(|i| self.stack.get(i))
            .cloned()
            .unwrap_or(JsValue::Undefined)
    }

    fn scope_at(&self, depth: usize) -> Option<ScopeRef> {
        self.scope.as_ref().and_then(|s| s.ancestor(depth))
    }
}

enum CallTarget {
    Script(Rc<FunctionChunk>, Option<ScopeRef>),
    Native(NativeFn),
}

/// What calling (or constructing, when `constructing`) `function` runs. `None` when the
/// object cannot be invoked that way.
fn call_target(function: &JsObjectType, constructing: bool) -> Option<CallTarget> {
    match &*(**function).borrow() {
        ObjectType::Function(f) => match &f.kind {
            FunctionKind::Script(s) => Some(CallTarget::Script(s.code.clone(), s.scope.clone())),
            FunctionKind::Native(n) if constructing => n.construct.map(CallTarget::Native),
            FunctionKind::Native(n) => Some(CallTarget::Native(n.call)),
        },
        _ => None,
    }
}

#[inline]
fn num(v: &JsValue) -> f64 {
    match v {
        JsValue::Number(n) => *n,
        _ => to_number(v),
    }
}

/// The bytecode virtual machine.
pub struct Vm<'a> {
    /// Evaluation context (realm, heap, output).
    ctx: &'a mut EvalContext,
}

impl<'a> Vm<'a> {
    pub fn new(ctx: &'a mut EvalContext) -> Self {
        Vm { ctx }
    }

    /// Runs a program chunk with the global object as `this`.
    pub fn run_program(&mut self, chunk: &Chunk) -> VmResult {
        let this = JsValue::from_object(self.ctx.global_object());
        let mut frame = Frame::new(None, this);
        self.run(chunk, &mut frame)
    }

    /// Calls `callee` with an explicit receiver.
    pub fn call(
        &mut self,
        callee: &JsValue,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> Result<JsValue, JErrorType> {
        let function = match callee {
            JsValue::Function(f) => f.clone(),
            _ => {
                return Err(JErrorType::TypeError(format!(
                    "{} is not a function",
                    callee
                )))
            }
        };
        let target = call_target(&function, false).ok_or_else(|| {
            JErrorType::TypeError(format!("{} is not a function", callee))
        })?;
        self.ctx.enter_call()?;
        let result = match target {
            CallTarget::Script(code, scope) => self.call_script(&function, code, scope, this, args),
            CallTarget::Native(native) => native(self.ctx, this, args),
        };
        self.ctx.exit_call();
        result
    }

    /// `new callee(...args)`.
    pub fn construct(&mut self, callee: &JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
        let not_a_constructor =
            || JErrorType::TypeError(format!("{} is not a constructor", callee));
        let function = match callee {
            JsValue::Function(f) => f.clone(),
            _ => return Err(not_a_constructor()),
        };
        let target = call_target(&function, true).ok_or_else(not_a_constructor)?;
        self.ctx.enter_call()?;
        let result = match target {
            CallTarget::Script(code, scope) => {
                self.construct_script(&function, code, scope, args)
            }
            CallTarget::Native(native) => native(self.ctx, JsValue::Undefined, args),
        };
        self.ctx.exit_call();
        result
    }

    fn construct_script(
        &mut self,
        function: &JsObjectType,
        code: Rc<FunctionChunk>,
        scope: Option<ScopeRef>,
        args: Vec<JsValue>,
    ) -> Result<JsValue, JErrorType> {
        let prototype = match get(function, &PROTOTYPE_PROP) {
            JsValue::Object(p) | JsValue::Function(p) => p,
            _ => self.ctx.realm.object_prototype.clone(),
        };
        let instance = JsValue::Object(create_object_with_prototype(
            self.ctx,
            Some(prototype),
            0,
        )?);
        let result = self.call_script(function, code, scope, instance.clone(), args)?;
        Ok(if result.is_object() { result } else { instance })
    }

    fn call_script(
        &mut self,
        function: &JsObjectType,
        code: Rc<FunctionChunk>,
        scope: Option<ScopeRef>,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> Result<JsValue, JErrorType> {
        let activation = Rc::new(ActivationScope::new(code.local_count, scope));
        if let Some(slot) = code.self_slot {
            activation.set(slot, JsValue::Function(function.clone()));
        }
        for (i, arg) in args.into_iter().take(code.param_count).enumerate() {
            activation.set(i, arg);
        }
        let mut frame = Frame::new(Some(activation), this);
        self.run(&code.chunk, &mut frame).into_result()
    }

    /// Run a chunk until it returns or halts.
    pub fn run(&mut self, chunk: &Chunk, frame: &mut Frame) -> VmResult {
        loop {
            if frame.ip >= chunk.code.len() {
                return VmResult::Ok(frame.completion.clone());
            }

            let instr = &chunk.code[frame.ip];
            let op = instr.op;
            let operand = instr.operand;
            let operand2 = instr.operand2;
            frame.ip += 1;

            match op {
                // ── Constants & Literals ──────────────────────
                OpCode::Constant => {
                    let val = chunk.constants[operand as usize].clone();
                    frame.stack.push(val);
                }
                OpCode::Undefined => frame.stack.push(JsValue::Undefined),
                OpCode::Null => frame.stack.push(JsValue::Null),
                OpCode::True => frame.stack.push(JsValue::Boolean(true)),
                OpCode::False => frame.stack.push(JsValue::Boolean(false)),
                OpCode::This => frame.stack.push(frame.this.clone()),

                // ── Arithmetic ───────────────────────────────
                OpCode::Add => {
                    let b = frame.pop();
                    let a = frame.pop();
                    frame.stack.push(add(&a, &b));
                }
                OpCode::Sub
                | OpCode::Mul
                | OpCode::Div
                | OpCode::Mod
                | OpCode::BitAnd
                | OpCode::BitOr
                | OpCode::BitXor
                | OpCode::ShiftLeft
                | OpCode::ShiftRight
                | OpCode::UShiftRight => {
                    let b = frame.pop();
                    let a = frame.pop();
                    let f: fn(&JsValue, &JsValue) -> f64 = match op {
                        OpCode::Sub => arithmetic::subtract,
                        OpCode::Mul => arithmetic::multiply,
                        OpCode::Div => arithmetic::divide,
                        OpCode::Mod => arithmetic::remainder,
                        OpCode::BitAnd => arithmetic::bit_and,
                        OpCode::BitOr => arithmetic::bit_or,
                        OpCode::BitXor => arithmetic::bit_xor,
                        OpCode::ShiftLeft => arithmetic::shift_left,
                        OpCode::ShiftRight => arithmetic::shift_right,
                        _ => arithmetic::unsigned_shift_right,
                    };
                    frame.stack.push(JsValue::Number(f(&a, &b)));
                }
                OpCode::Negate => {
                    let a = frame.pop();
                    frame.stack.push(JsValue::Number(-to_number(&a)));
                }
                OpCode::UnaryPlus => {
                    let a = frame.pop();
                    frame.stack.push(JsValue::Number(num(&a)));
                }
                OpCode::Increment => {
                    let a = frame.pop();
                    frame.stack.push(JsValue::Number(num(&a) + 1.0));
                }
                OpCode::Decrement => {
                    let a = frame.pop();
                    frame.stack.push(JsValue::Number(num(&a) - 1.0));
                }
                OpCode::BitNot => {
                    let a = frame.pop();
                    frame.stack.push(JsValue::Number(arithmetic::bit_not(&a)));
                }

                // ── Typed arithmetic ─────────────────────────
                OpCode::AddNum | OpCode::SubNum | OpCode::MulNum | OpCode::DivNum | OpCode::ModNum => {
                    let b = num(&frame.pop());
                    let a = num(&frame.pop());
                    let result = match op {
                        OpCode::AddNum => a + b,
                        OpCode::SubNum => a - b,
                        OpCode::MulNum => a * b,
                        OpCode::DivNum => a / b,
                        _ => a % b,
                    };
                    frame.stack.push(JsValue::Number(result));
                }
                OpCode::NegateNum => {
                    let a = num(&frame.pop());
                    frame.stack.push(JsValue::Number(-a));
                }
                OpCode::LessNum | OpCode::LessEqualNum | OpCode::GreaterNum | OpCode::GreaterEqualNum => {
                    let b = num(&frame.pop());
                    let a = num(&frame.pop());
                    let result = match op {
                        OpCode::LessNum => a < b,
                        OpCode::LessEqualNum => a <= b,
                        OpCode::GreaterNum => a > b,
                        _ => a >= b,
                    };
                    frame.stack.push(JsValue::Boolean(result));
                }

                // ── Comparison ───────────────────────────────
                OpCode::StrictEqual
                | OpCode::StrictNotEqual
                | OpCode::Equal
                | OpCode::NotEqual
                | OpCode::LessThan
                | OpCode::LessEqual
                | OpCode::GreaterThan
                | OpCode::GreaterEqual => {
                    let b = frame.pop();
                    let a = frame.pop();
                    let result = match op {
                        OpCode::StrictEqual => strict_equality_comparison(&a, &b),
                        OpCode::StrictNotEqual => !strict_equality_comparison(&a, &b),
                        OpCode::Equal => abstract_equality_comparison(&a, &b),
                        OpCode::NotEqual => !abstract_equality_comparison(&a, &b),
                        OpCode::LessThan => less_than(&a, &b),
                        OpCode::LessEqual => less_than_or_equal(&a, &b),
                        OpCode::GreaterThan => greater_than(&a, &b),
                        _ => greater_than_or_equal(&a, &b),
                    };
                    frame.stack.push(JsValue::Boolean(result));
                }
                OpCode::In => {
                    let object = frame.pop();
                    let key = frame.pop();
                    let o = match object.as_object() {
                        Some(o) => o,
                        None => {
                            return VmResult::Error(JErrorType::TypeError(format!(
                                "Cannot use 'in' operator to search for {} in {}",
                                key, object
                            )))
                        }
                    };
                    let found = has_property(o, &to_property_key(&key));
                    frame.stack.push(JsValue::Boolean(found));
                }
                OpCode::InstanceOf => {
                    let constructor = frame.pop();
                    let value = frame.pop();
                    let result = vm_try!(instance_of(&value, &constructor));
                    frame.stack.push(JsValue::Boolean(result));
                }

                // ── Logical / Unary ──────────────────────────
                OpCode::Not => {
                    let a = frame.pop();
                    frame.stack.push(JsValue::Boolean(!to_boolean(&a)));
                }
                OpCode::NotBool => {
                    let result = match frame.pop() {
                        JsValue::Boolean(b) => !b,
                        other => !to_boolean(&other),
                    };
                    frame.stack.push(JsValue::Boolean(result));
                }
                OpCode::TypeOf => {
                    let a = frame.pop();
                    frame.stack.push(JsValue::String(get_type(&a).to_string()));
                }
                OpCode::Void => {
                    frame.pop();
                    frame.stack.push(JsValue::Undefined);
                }

                // ── Variables ────────────────────────────────
                OpCode::GetLocal => {
                    let val = frame
                        .scope
                        .as_ref()
                        .map(|s| s.get(operand as usize))
                        .unwrap_or(JsValue::Undefined);
                    frame.stack.push(val);
                }
                OpCode::SetLocal => {
                    let val = frame.pop();
                    if let Some(s) = &frame.scope {
                        s.set(operand as usize, val);
                    }
                }
                OpCode::GetScoped => {
                    let val = frame
                        .scope_at(operand as usize)
                        .map(|s| s.get(operand2 as usize))
                        .unwrap_or(JsValue::Undefined);
                    frame.stack.push(val);
                }
                OpCode::SetScoped => {
                    let val = frame.pop();
                    if let Some(s) = frame.scope_at(operand as usize) {
                        s.set(operand2 as usize, val);
                    }
                }
                OpCode::GetGlobal => {
                    let name = chunk.get_name(operand);
                    let global = self.ctx.global_object();
                    let key = PropertyKey::new(name);
                    if !has_property(&global, &key) {
                        return VmResult::Error(JErrorType::ReferenceError(format!(
                            "{} is not defined",
                            name
                        )));
                    }
                    frame.stack.push(get(&global, &key));
                }
                OpCode::SetGlobal => {
                    let val = frame.pop();
                    let global = self.ctx.global_object();
                    set(&global, PropertyKey::new(chunk.get_name(operand)), val);
                }
                OpCode::TypeOfGlobal => {
                    let global = self.ctx.global_object();
                    let key = PropertyKey::new(chunk.get_name(operand));
                    let type_str = if has_property(&global, &key) {
                        get_type(&get(&global, &key))
                    } else {
                        TYPE_STR_UNDEFINED
                    };
                    frame.stack.push(JsValue::String(type_str.to_string()));
                }
                OpCode::DeclareGlobal => {
                    let global = self.ctx.global_object();
                    let key = PropertyKey::new(chunk.get_name(operand));
                    if !has_own_property(&global, &key) {
                        let mut desc = PropertyDescriptor::new_data(JsValue::Undefined);
                        desc.configurable = false;
                        (*global)
                            .borrow_mut()
                            .as_js_object_mut()
                            .get_object_base_mut()
                            .define_own_property(key, desc);
                    }
                }
                OpCode::DeleteGlobal => {
                    let global = self.ctx.global_object();
                    let key = PropertyKey::new(chunk.get_name(operand));
                    let deleted = !has_own_property(&global, &key) || delete_property(&global, &key);
                    frame.stack.push(JsValue::Boolean(deleted));
                }

                // ── Objects & Properties ─────────────────────
                OpCode::GetProp => {
                    let obj = frame.pop();
                    let key = PropertyKey::new(chunk.get_name(operand));
                    let val = vm_try!(get_v(self.ctx, &obj, &key));
                    frame.stack.push(val);
                }
                OpCode::SetProp => {
                    let val = frame.pop();
                    let obj = frame.pop();
                    let key = PropertyKey::new(chunk.get_name(operand));
                    vm_try!(put_v(&obj, key, val.clone()));
                    frame.stack.push(val);
                }
                OpCode::GetElem => {
                    let key = frame.pop();
                    let obj = frame.pop();
                    let val = vm_try!(get_v(self.ctx, &obj, &to_property_key(&key)));
                    frame.stack.push(val);
                }
                OpCode::SetElem => {
                    let val = frame.pop();
                    let key = frame.pop();
                    let obj = frame.pop();
                    vm_try!(put_v(&obj, to_property_key(&key), val.clone()));
                    frame.stack.push(val);
                }
                OpCode::DeleteProp => {
                    let obj = frame.pop();
                    let key = PropertyKey::new(chunk.get_name(operand));
                    let deleted = vm_try!(delete_from(&obj, &key));
                    frame.stack.push(JsValue::Boolean(deleted));
                }
                OpCode::DeleteElem => {
                    let key = frame.pop();
                    let obj = frame.pop();
                    let deleted = vm_try!(delete_from(&obj, &to_property_key(&key)));
                    frame.stack.push(JsValue::Boolean(deleted));
                }
                OpCode::CreateObject => {
                    let shape = &chunk.object_shapes[operand as usize];
                    let values = frame.pop_n(shape.len());
                    let prototype = self.ctx.realm.object_prototype.clone();
                    let obj = vm_try!(create_object_with_prototype(
                        self.ctx,
                        Some(prototype),
                        shape.len()
                    ));
                    for (key, val) in shape.iter().zip(values) {
                        set(&obj, PropertyKey::new(key), val);
                    }
                    frame.stack.push(JsValue::Object(obj));
                }
                OpCode::CreateArray => {
                    let shape = &chunk.array_shapes[operand as usize];
                    let present = shape.iter().filter(|p| **p).count();
                    let mut values = frame.pop_n(present).into_iter();
                    let elements = shape
                        .iter()
                        .map(|p| if *p { values.next() } else { None })
                        .collect();
                    let arr = vm_try!(create_array(self.ctx, elements));
                    frame.stack.push(JsValue::Object(arr));
                }

                // ── Functions ────────────────────────────────
                OpCode::MakeClosure => {
                    let code = chunk.functions[operand as usize].clone();
                    let f = vm_try!(create_script_function(self.ctx, code, frame.scope.clone()));
                    frame.stack.push(JsValue::Function(f));
                }
                OpCode::Call => {
                    let args = frame.pop_n(operand as usize);
                    let callee = frame.pop();
                    let this = JsValue::from_object(self.ctx.global_object());
                    let result = vm_try!(self.call(&callee, this, args));
                    frame.stack.push(result);
                }
                OpCode::CallMethod => {
                    let args = frame.pop_n(operand as usize);
                    let callee = frame.pop();
                    let receiver = frame.pop();
                    let result = vm_try!(self.call(&callee, receiver, args));
                    frame.stack.push(result);
                }
                OpCode::New => {
                    let args = frame.pop_n(operand as usize);
                    let callee = frame.pop();
                    let result = vm_try!(self.construct(&callee, args));
                    frame.stack.push(result);
                }

                // ── Control Flow ─────────────────────────────
                OpCode::Jump => {
                    frame.ip = operand as usize;
                }
                OpCode::JumpIfFalse => {
                    let val = frame.pop();
                    if !to_boolean(&val) {
                        frame.ip = operand as usize;
                    }
                }
                OpCode::JumpIfTrue => {
                    let val = frame.pop();
                    if to_boolean(&val) {
                        frame.ip = operand as usize;
                    }
                }

                // ── for-in ───────────────────────────────────
                OpCode::ForInStart => {
                    let iterable = frame.pop();
                    let state = if iterable.is_nullish() {
                        ForInState {
                            object: None,
                            keys: Vec::new(),
                            index: 0,
                            current: None,
                        }
                    } else {
                        let object = vm_try!(to_object(self.ctx, &iterable));
                        let keys = for_in_keys(&object);
                        log::trace!("for-in over {} keys", keys.len());
                        ForInState {
                            object: Some(object),
                            keys,
                            index: 0,
                            current: None,
                        }
                    };
                    frame.iterators.push(state);
                }
                OpCode::ForInNext => {
                    let mut exhausted = true;
                    if let Some(state) = frame.iterators.last_mut() {
                        while state.index < state.keys.len() {
                            let key = state.keys[state.index].clone();
                            state.index += 1;
                            // Keys deleted since the snapshot are skipped.
                            let present = state
                                .object
                                .as_ref()
                                .map(|o| has_property(o, &PropertyKey::new(&key)))
                                .unwrap_or(false);
                            if present {
                                state.current = Some(key);
                                exhausted = false;
                                break;
                            }
                        }
                    }
                    if exhausted {
                        frame.ip = operand as usize;
                    }
                }
                OpCode::ForInKey => {
                    let key = frame
                        .iterators
                        .last()
                        .and_then(|s| s.current.clone())
                        .map(JsValue::String)
                        .unwrap_or(JsValue::Undefined);
                    frame.stack.push(key);
                }
                OpCode::ForInEnd => {
                    frame.iterators.pop();
                }

                // ── Stack manipulation ───────────────────────
                OpCode::Pop => {
                    frame.pop();
                }
                OpCode::Dup => {
                    let val = frame.peek(0);
                    frame.stack.push(val);
                }
                OpCode::Dup2 => {
                    let a = frame.peek(1);
                    let b = frame.peek(0);
                    frame.stack.push(a);
                    frame.stack.push(b);
                }
                OpCode::Swap => {
                    let len = frame.stack.len();
                    if len >= 2 {
                        frame.stack.swap(len - 1, len - 2);
                    }
                }
                OpCode::Bury => {
                    let val = frame.pop();
                    let at = frame.stack.len().saturating_sub(operand as usize);
                    frame.stack.insert(at, val);
                }

                // ── Misc ─────────────────────────────────────
                OpCode::Completion => {
                    frame.completion = frame.pop();
                }
                OpCode::Return => {
                    return VmResult::Ok(frame.pop());
                }
                OpCode::Halt => {
                    return VmResult::Ok(frame.completion.clone());
                }
            }
        }
    }
}

/// The `delete` operator on a property reference.
fn delete_from(target: &JsValue, key: &PropertyKey) -> Result<bool, JErrorType> {
    match target {
        JsValue::Object(o) | JsValue::Function(o) => {
            Ok(!has_own_property(o, key) || delete_property(o, key))
        }
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "Cannot delete property '{}' of {}",
            key, target
        ))),
        _ => Ok(true),
    }
}
