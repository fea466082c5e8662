//! Execution side of the engine: the object model, built-ins, the bytecode backend and the
//! public [`api::Engine`] facade.

pub mod api;
pub mod config;
pub mod ds;
pub mod jit;
pub mod std_lib;
