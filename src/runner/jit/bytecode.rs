//! Bytecode instruction set and chunk structure.
//!
//! Defines a flat, stack-based bytecode IR that the compiler emits
//! and the VM executes. Every function body gets its own [`Chunk`];
//! nested functions hang off their parent's chunk as [`FunctionChunk`]s.

use std::rc::Rc;

use crate::runner::ds::value::JsValue;

/// Bytecode opcodes for the stack-based VM.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum OpCode {
    // ── Constants & Literals ──────────────────────────────────
    /// Push a constant from the constant pool onto the stack.
    Constant,
    /// Push `undefined` onto the stack.
    Undefined,
    /// Push `null` onto the stack.
    Null,
    /// Push `true` onto the stack.
    True,
    /// Push `false` onto the stack.
    False,
    /// Push the current `this` value.
    This,

    // ── Arithmetic ───────────────────────────────────────────
    /// Pop two values, push their sum (string concatenation or numeric add).
    Add,
    /// Pop two values, push their difference.
    Sub,
    /// Pop two values, push their product.
    Mul,
    /// Pop two values, push their quotient.
    Div,
    /// Pop two values, push their remainder.
    Mod,
    /// Pop one value, push its numeric negation.
    Negate,
    /// Unary `+`: converts to number.
    UnaryPlus,
    /// Pop one value, push `ToNumber(value) + 1`.
    Increment,
    /// Pop one value, push `ToNumber(value) - 1`.
    Decrement,

    // ── Typed arithmetic ─────────────────────────────────────
    // Emitted when analysis proved both operands are numbers.
    AddNum,
    SubNum,
    MulNum,
    DivNum,
    ModNum,
    NegateNum,

    // ── Bitwise ──────────────────────────────────────────────
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    ShiftLeft,
    ShiftRight,
    UShiftRight,

    // ── Comparison ───────────────────────────────────────────
    /// Strict equality (`===`).
    StrictEqual,
    /// Strict inequality (`!==`).
    StrictNotEqual,
    /// Abstract equality (`==`).
    Equal,
    /// Abstract inequality (`!=`).
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    LessNum,
    LessEqualNum,
    GreaterNum,
    GreaterEqualNum,
    /// Stack: [key, object]. Pushes whether the object has the key.
    In,
    /// Stack: [value, constructor].
    InstanceOf,

    // ── Logical / Unary ──────────────────────────────────────
    /// Logical NOT.
    Not,
    /// Logical NOT of a value known to be a boolean.
    NotBool,
    /// `typeof`: pops value, pushes type string.
    TypeOf,
    /// `void`: pops value, pushes undefined.
    Void,

    // ── Variables ────────────────────────────────────────────
    /// Get a slot of the current activation (operand: slot index).
    GetLocal,
    /// Pop into a slot of the current activation (operand: slot index).
    SetLocal,
    /// Get a slot of an enclosing activation (operands: depth, slot index).
    GetScoped,
    /// Pop into a slot of an enclosing activation (operands: depth, slot index).
    SetScoped,
    /// Get a global by name (operand: name index). Missing globals are a ReferenceError.
    GetGlobal,
    /// Pop into a global (operand: name index).
    SetGlobal,
    /// `typeof` of a global, `"undefined"` when it does not exist (operand: name index).
    TypeOfGlobal,
    /// Create a `var` binding on the global object unless it exists (operand: name index).
    DeclareGlobal,
    /// `delete` of a global (operand: name index).
    DeleteGlobal,

    // ── Objects & Properties ─────────────────────────────────
    /// Get a property: pop object and push object.property.
    /// Operand: name index of property name.
    GetProp,
    /// Set a property: stack has [object, value]. Pushes the value back.
    /// Operand: name index of property name.
    SetProp,
    /// Get a computed property: stack has [object, key].
    GetElem,
    /// Set a computed property: stack has [object, key, value]. Pushes the value back.
    SetElem,
    /// Delete a property: stack has [object]. Operand: name index.
    DeleteProp,
    /// Delete a computed property: stack has [object, key].
    DeleteElem,
    /// Build an object literal from the values on the stack (operand: object shape index).
    CreateObject,
    /// Build an array literal from the values on the stack (operand: array shape index).
    CreateArray,

    // ── Functions ────────────────────────────────────────────
    /// Create a closure over the current activation (operand: function index).
    MakeClosure,
    /// Call a function. Operand: argument count.
    /// Stack: [callee, arg_1, ..., arg_n]
    Call,
    /// Call a method. Operand: argument count.
    /// Stack: [receiver, callee, arg_1, ..., arg_n]
    CallMethod,
    /// Construct. Operand: argument count.
    /// Stack: [callee, arg_1, ..., arg_n]
    New,

    // ── Control Flow ─────────────────────────────────────────
    /// Unconditional jump (operand: absolute offset).
    Jump,
    /// Jump if top of stack is falsy (operand: absolute offset). Pops the value.
    JumpIfFalse,
    /// Jump if top of stack is truthy (operand: absolute offset). Pops the value.
    JumpIfTrue,

    // ── for-in ───────────────────────────────────────────────
    /// Pop the iterable and push a key snapshot onto the iterator stack.
    ForInStart,
    /// Advance to the next key still present, or jump to the operand when exhausted.
    ForInNext,
    /// Push the current key of the innermost iterator.
    ForInKey,
    /// Drop the innermost iterator.
    ForInEnd,

    // ── Stack manipulation ───────────────────────────────────
    /// Pop and discard the top of the stack.
    Pop,
    /// Duplicate the top of the stack.
    Dup,
    /// Duplicate the top two stack values (a,b -> a,b,a,b).
    Dup2,
    /// Swap the top two stack values.
    Swap,
    /// Move the top of the stack down below the next `operand` values.
    Bury,

    // ── Misc ─────────────────────────────────────────────────
    /// Pop into the script's completion value.
    Completion,
    /// Return from the current function. Pops return value from stack.
    Return,
    /// Halt execution (end of script), yielding the completion value.
    Halt,
}

/// A single bytecode instruction with optional operands.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub op: OpCode,
    /// Primary operand (constant pool index, jump offset, arg count, etc.).
    pub operand: u32,
    /// Secondary operand (slot index of GetScoped/SetScoped).
    pub operand2: u32,
}

impl Instruction {
    pub fn simple(op: OpCode) -> Self {
        Instruction { op, operand: 0, operand2: 0 }
    }

    pub fn with_operand(op: OpCode, operand: u32) -> Self {
        Instruction { op, operand, operand2: 0 }
    }

    pub fn with_two_operands(op: OpCode, operand: u32, operand2: u32) -> Self {
        Instruction { op, operand, operand2 }
    }
}

/// A compiled function body plus what the VM needs to set up its activation.
#[derive(Debug, Clone)]
pub struct FunctionChunk {
    pub name: Option<String>,
    pub param_count: usize,
    /// Size of the activation: parameters first, then hoisted names.
    pub local_count: usize,
    /// Slot that receives the function itself (named function expressions).
    pub self_slot: Option<usize>,
    pub chunk: Chunk,
}

/// A compiled chunk of bytecode with its constant pool.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    /// The bytecode instructions.
    pub code: Vec<Instruction>,
    /// Constant pool; holds literal values.
    pub constants: Vec<JsValue>,
    /// Deduplicated name table for variable/property names.
    pub names: Vec<String>,
    /// Array literal shapes: `true` for a present element, `false` for a hole.
    pub array_shapes: Vec<Vec<bool>>,
    /// Object literal shapes: property names in source order.
    pub object_shapes: Vec<Vec<String>>,
    /// Functions created by MakeClosure in this chunk.
    pub functions: Vec<Rc<FunctionChunk>>,
}

impl Chunk {
    pub fn new() -> Self {
        Chunk::default()
    }

    /// Emit an instruction and return its index.
    pub fn emit(&mut self, instr: Instruction) -> usize {
        let idx = self.code.len();
        self.code.push(instr);
        idx
    }

    /// Emit a simple (no-operand) instruction.
    pub fn emit_op(&mut self, op: OpCode) -> usize {
        self.emit(Instruction::simple(op))
    }

    /// Emit an instruction with one operand.
    pub fn emit_with(&mut self, op: OpCode, operand: u32) -> usize {
        self.emit(Instruction::with_operand(op, operand))
    }

    /// Add a constant to the pool and return its index. Equal primitives share an entry.
    pub fn add_constant(&mut self, value: JsValue) -> u32 {
        let existing = self.constants.iter().position(|c| match (c, &value) {
            (JsValue::Number(a), JsValue::Number(b)) => a.to_bits() == b.to_bits(),
            (JsValue::String(a), JsValue::String(b)) => a == b,
            _ => false,
        });
        if let Some(idx) = existing {
            return idx as u32;
        }
        let idx = self.constants.len();
        self.constants.push(value);
        idx as u32
    }

    /// Add a name to the deduplicated name table and return its index.
    pub fn add_name(&mut self, s: &str) -> u32 {
        for (i, existing) in self.names.iter().enumerate() {
            if existing == s {
                return i as u32;
            }
        }
        let idx = self.names.len();
        self.names.push(s.to_string());
        idx as u32
    }

    pub fn add_array_shape(&mut self, shape: Vec<bool>) -> u32 {
        self.array_shapes.push(shape);
        (self.array_shapes.len() - 1) as u32
    }

    pub fn add_object_shape(&mut self, shape: Vec<String>) -> u32 {
        self.object_shapes.push(shape);
        (self.object_shapes.len() - 1) as u32
    }

    pub fn add_function(&mut self, function: FunctionChunk) -> u32 {
        self.functions.push(Rc::new(function));
        (self.functions.len() - 1) as u32
    }

    /// Get a name by index (zero-copy reference).
    #[inline]
    pub fn get_name(&self, idx: u32) -> &str {
        &self.names[idx as usize]
    }

    /// Patch a jump instruction's operand to point to the current code position.
    pub fn patch_jump(&mut self, jump_idx: usize) {
        self.code[jump_idx].operand = self.code.len() as u32;
    }

    /// Patch a jump instruction's operand to point to `target`.
    pub fn patch_jump_to(&mut self, jump_idx: usize, target: usize) {
        self.code[jump_idx].operand = target as u32;
    }

    /// Get the current code position (for jump targets).
    pub fn current_pos(&self) -> usize {
        self.code.len()
    }

    /// Disassemble the chunk, and the chunks of its functions, for debugging.
    pub fn disassemble(&self, name: &str) -> String {
        let mut out = format!("== {} ==\n", name);
        for (i, instr) in self.code.iter().enumerate() {
            out.push_str(&format!("{:04}  {:?}", i, instr.op));
            match instr.op {
                OpCode::Constant => {
                    let val = &self.constants[instr.operand as usize];
                    out.push_str(&format!("  {} ({:?})", instr.operand, val));
                }
                OpCode::GetGlobal
                | OpCode::SetGlobal
                | OpCode::TypeOfGlobal
                | OpCode::DeclareGlobal
                | OpCode::DeleteGlobal
                | OpCode::GetProp
                | OpCode::SetProp
                | OpCode::DeleteProp => {
                    let name_str = self.get_name(instr.operand);
                    out.push_str(&format!("  \"{}\"", name_str));
                }
                OpCode::GetLocal | OpCode::SetLocal => {
                    out.push_str(&format!("  slot={}", instr.operand));
                }
                OpCode::GetScoped | OpCode::SetScoped => {
                    out.push_str(&format!("  depth={} slot={}", instr.operand, instr.operand2));
                }
                OpCode::Jump | OpCode::JumpIfFalse | OpCode::JumpIfTrue | OpCode::ForInNext => {
                    out.push_str(&format!("  -> {:04}", instr.operand));
                }
                OpCode::Call | OpCode::CallMethod | OpCode::New => {
                    out.push_str(&format!("  argc={}", instr.operand));
                }
                OpCode::CreateObject => {
                    let shape = &self.object_shapes[instr.operand as usize];
                    out.push_str(&format!("  {{{}}}", shape.join(", ")));
                }
                OpCode::CreateArray => {
                    let shape = &self.array_shapes[instr.operand as usize];
                    out.push_str(&format!("  len={}", shape.len()));
                }
                OpCode::MakeClosure => {
                    let f = &self.functions[instr.operand as usize];
                    out.push_str(&format!("  fn={}", f.name.as_deref().unwrap_or("<anonymous>")));
                }
                OpCode::Bury => {
                    out.push_str(&format!("  {}", instr.operand));
                }
                _ => {}
            }
            out.push('\n');
        }
        for f in &self.functions {
            out.push('\n');
            out.push_str(&f.chunk.disassemble(f.name.as_deref().unwrap_or("<anonymous>")));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_and_names_are_deduplicated() {
        let mut chunk = Chunk::new();
        let a = chunk.add_constant(JsValue::Number(1.0));
        let b = chunk.add_constant(JsValue::Number(1.0));
        let c = chunk.add_constant(JsValue::from("1"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(chunk.add_name("x"), chunk.add_name("x"));
    }

    #[test]
    fn test_patch_jump() {
        let mut chunk = Chunk::new();
        let jump = chunk.emit_with(OpCode::JumpIfFalse, 0);
        chunk.emit_op(OpCode::Pop);
        chunk.patch_jump(jump);
        assert_eq!(chunk.code[jump].operand, 2);
        let text = chunk.disassemble("test");
        assert!(text.contains("JumpIfFalse  -> 0002"));
    }
}
