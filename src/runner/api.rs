//! The embedding API: source text in, completion value and captured output out.

use thiserror::Error;

use crate::compiler::analyze::analyze_program;
use crate::compiler::backend::CompilerBackend;
use crate::compiler::error::CompileError;
use crate::parser::JsParser;
use crate::runner::config::EngineConfig;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::execution_context::EvalContext;
use crate::runner::ds::function_object::NativeFn;
use crate::runner::ds::value::JsValue;
use crate::runner::jit::{BytecodeBackend, CompiledScript};
use crate::runner::std_lib::{install_core_builtins, register_global_function};

/// Anything that can go wrong running a script.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] JErrorType),
}

/// A realm plus the pipeline that feeds it.
///
/// Globals created by one [`Engine::run`] stay visible to the next.
///
/// ```
/// use kiln::runner::api::Engine;
/// use kiln::runner::config::EngineConfig;
///
/// let mut engine = Engine::new(EngineConfig::default());
/// engine.run("var o = {a: 1, b: 2}; for (var k in o) emit(k)").unwrap();
/// assert_eq!(engine.output(), "ab");
/// ```
pub struct Engine {
    config: EngineConfig,
    ctx: EvalContext,
    backend: BytecodeBackend,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let mut ctx = EvalContext::new(&config);
        install_core_builtins(&mut ctx);
        Engine {
            config,
            ctx,
            backend: BytecodeBackend::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse, analyse and compile without running.
    pub fn compile(&self, source: &str) -> Result<CompiledScript, EngineError> {
        let ast = JsParser::parse_to_ast(source)?;
        let ast = analyze_program(ast, self.config.analysis_options())?;
        Ok(self.backend.compile(&ast)?)
    }

    /// Compile and run `source`, returning the value of its last expression statement.
    pub fn run(&mut self, source: &str) -> Result<JsValue, EngineError> {
        let script = self.compile(source)?;
        self.execute(&script)
    }

    pub fn execute(&mut self, script: &CompiledScript) -> Result<JsValue, EngineError> {
        Ok(script.invoke(&mut self.ctx)?)
    }

    /// Text written by `emit` so far.
    pub fn output(&self) -> &str {
        self.ctx.output()
    }

    pub fn take_output(&mut self) -> String {
        self.ctx.take_output()
    }

    /// Binds a host function as a non-enumerable global.
    pub fn register_global(&mut self, name: &str, func: NativeFn) {
        register_global_function(&mut self.ctx, name, func);
    }

    pub fn context(&self) -> &EvalContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut EvalContext {
        &mut self.ctx
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
