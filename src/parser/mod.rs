mod api;
pub mod ast;
mod builder;
pub mod tree;
#[allow(non_fmt_panics)]
#[cfg(test)]
mod unit_tests;

pub use api::{JsParser, Rule};
