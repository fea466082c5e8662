//! Bytecode backend.
//!
//! The analysed AST is lowered into stack-based bytecode and executed by a small VM:
//!
//! ```text
//! JavaScript source → Parser → AST → Analysis → Compiler → Bytecode → VM → Result
//! ```
//!
//! Slots chosen by analysis become direct activation accesses, and expression types select
//! the typed arithmetic instructions.

pub mod bytecode;
pub mod compiler;
pub mod vm;

pub use self::compiler::BytecodeBackend;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::execution_context::EvalContext;
use crate::runner::ds::value::JsValue;

use self::bytecode::Chunk;
use self::vm::Vm;

/// A program compiled by a backend, ready to run against any context.
///
/// # Examples
///
/// ```
/// use kiln::compiler::{analyze_program, AnalyzeOptions, CompilerBackend};
/// use kiln::parser::JsParser;
/// use kiln::runner::ds::execution_context::EvalContext;
/// use kiln::runner::ds::value::JsValue;
/// use kiln::runner::jit::BytecodeBackend;
///
/// let ast = JsParser::parse_to_ast("var x = 5 + 3; x * 2").unwrap();
/// let ast = analyze_program(ast, AnalyzeOptions::default()).unwrap();
/// let script = BytecodeBackend.compile(&ast).unwrap();
/// let mut ctx = EvalContext::default();
/// match script.invoke(&mut ctx).unwrap() {
///     JsValue::Number(n) => assert_eq!(n, 16.0),
///     _ => panic!("expected a number"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CompiledScript {
    chunk: Chunk,
}

impl CompiledScript {
    pub fn new(chunk: Chunk) -> Self {
        CompiledScript { chunk }
    }

    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    /// Runs the script and returns the value of the last expression statement executed.
    pub fn invoke(&self, ctx: &mut EvalContext) -> Result<JsValue, JErrorType> {
        let mut vm = Vm::new(ctx);
        let result = vm.run_program(&self.chunk).into_result();
        if let Err(e) = &result {
            log::debug!("script threw {}", e);
        }
        result
    }

    pub fn disassemble(&self) -> String {
        self.chunk.disassemble("script")
    }
}
