use std::fmt;

use thiserror::Error;

use crate::parser::ast::SourcePosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Break,
    Continue,
}

impl fmt::Display for JumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JumpKind::Break => "break",
            JumpKind::Continue => "continue",
        })
    }
}

fn label_suffix(label: &Option<String>) -> String {
    match label {
        Some(l) => format!(" to label '{}'", l),
        None => String::new(),
    }
}

/// Failures between source text and a runnable script.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("SyntaxError: {message}")]
    Parse { message: String },
    /// `break`/`continue` with no lexically enclosing target. `label` is `None` for the
    /// unlabelled forms.
    #[error("SyntaxError: illegal {kind}{} at {position}", label_suffix(.label))]
    InvalidLabelTarget {
        label: Option<String>,
        kind: JumpKind,
        position: SourcePosition,
    },
    #[error("SyntaxError: label '{label}' has already been declared at {position}")]
    DuplicateLabel {
        label: String,
        position: SourcePosition,
    },
    #[error("SyntaxError: illegal return statement at {position}")]
    IllegalReturn { position: SourcePosition },
    #[error("backend failure: {message}")]
    Backend { message: String },
}
