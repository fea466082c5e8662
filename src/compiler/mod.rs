//! Everything between the AST and executable code: scope resolution, type narrowing,
//! constant folding, label checking, and the backend seam.

pub mod analyze;
pub mod backend;
pub mod error;
pub mod expr_type;
pub mod scope;

pub use analyze::{analyze, analyze_program, AnalyzeOptions};
pub use backend::CompilerBackend;
pub use error::{CompileError, JumpKind};
pub use expr_type::ExprType;
pub use scope::ScopeContext;
