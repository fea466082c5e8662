use thiserror::Error;

/// Runtime errors raised while a compiled script executes.
///
/// These mirror the ECMAScript native error kinds that the engine can produce. Each variant
/// carries the message shown to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JErrorType {
    #[error("Uncaught ReferenceError: {0}")]
    ReferenceError(String),
    #[error("Uncaught TypeError: {0}")]
    TypeError(String),
    #[error("Uncaught RangeError: {0}")]
    RangeError(String),
    #[error("Uncaught SyntaxError: {0}")]
    SyntaxError(String),
}

impl JErrorType {
    pub fn message(&self) -> &str {
        match self {
            JErrorType::ReferenceError(m)
            | JErrorType::TypeError(m)
            | JErrorType::RangeError(m)
            | JErrorType::SyntaxError(m) => m,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            JErrorType::ReferenceError(_) => "ReferenceError",
            JErrorType::TypeError(_) => "TypeError",
            JErrorType::RangeError(_) => "RangeError",
            JErrorType::SyntaxError(_) => "SyntaxError",
        }
    }
}
