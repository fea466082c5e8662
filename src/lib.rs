//! # kiln - an analysing JavaScript engine core
//!
//! Scripts go through a fixed pipeline:
//!
//! 1. **[`parser`]** - a PEG grammar produces a parse tree, which the builder turns into a
//!    typed [`parser::ast::Node`] tree.
//! 2. **[`compiler`]** - the analysis pass resolves every identifier to a slot, narrows
//!    expression types, folds constants and checks labels.
//! 3. **[`runner::jit`]** - the bytecode backend lowers the analysed tree and a stack VM runs
//!    it against a realm.
//!
//! ## Quick Start
//!
//! ```
//! use kiln::runner::api::Engine;
//! use kiln::runner::config::EngineConfig;
//!
//! let mut engine = Engine::new(EngineConfig::default());
//! engine
//!     .run("function sq(n) { return n * n } emit(sq(4)); emit(typeof sq)")
//!     .unwrap();
//! assert_eq!(engine.output(), "16function");
//! ```
//!
//! ## Host functions
//!
//! ```
//! use kiln::runner::api::Engine;
//! use kiln::runner::ds::error::JErrorType;
//! use kiln::runner::ds::execution_context::EvalContext;
//! use kiln::runner::ds::value::JsValue;
//!
//! fn triple(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
//!     match args.first() {
//!         Some(JsValue::Number(n)) => Ok(JsValue::Number(n * 3.0)),
//!         _ => Ok(JsValue::Number(f64::NAN)),
//!     }
//! }
//!
//! let mut engine = Engine::default();
//! engine.register_global("triple", triple);
//! engine.run("emit(triple(7))").unwrap();
//! assert_eq!(engine.output(), "21");
//! ```
//!
//! ## Architecture
//!
//! - **[`parser`]** - grammar, parse tree adapter and AST
//! - **[`compiler`]** - scopes, `ExprType` narrowing, constant folding, backend trait
//! - **[`runner`]** - execution side
//!   - **[`runner::ds`]** - values, objects, activations, heap accounting
//!   - **[`runner::std_lib`]** - host globals
//!   - **[`runner::jit`]** - bytecode compiler and VM

#[macro_use]
extern crate lazy_static;

pub mod compiler;
pub mod parser;
pub mod runner;
