//! Runtime data structures: values, the object model and the per-run execution state.

pub mod array_object;
pub mod error;
pub mod execution_context;
pub mod function_object;
pub mod heap;
pub mod object;
pub mod object_property;
pub mod operations;
pub mod realm;
pub mod scope;
pub mod value;
pub mod wrapper_object;
