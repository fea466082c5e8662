use crate::compiler::error::CompileError;
use crate::parser::ast::Node;
use crate::runner::jit::CompiledScript;

/// Turns an analysed program into something the runtime can invoke.
///
/// The program handed over has every identifier resolved and every expression typed; a
/// backend may use the types for instruction selection but must stay correct for
/// `ExprType::Dynamic`.
pub trait CompilerBackend {
    fn compile(&self, program: &Node) -> Result<CompiledScript, CompileError>;
}
