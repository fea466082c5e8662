//! Core built-ins installation.

use crate::runner::ds::execution_context::EvalContext;

use super::array;
use super::boolean;
use super::global;
use super::number;
use super::object;
use super::string;

/// Installs every core built-in into the context's realm.
pub fn install_core_builtins(ctx: &mut EvalContext) {
    // Global value properties first; constructors may be looked up by later steps.
    global::register(ctx);
    object::register(ctx);
    array::register(ctx);
    string::register(ctx);
    number::register(ctx);
    boolean::register(ctx);
}
