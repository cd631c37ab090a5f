//! Errors raised while rewriting a loop.
//!
//! Every variant carries the span of the loop being rewritten so the host can
//! point its diagnostic at the offending statement.

use swc_common::Span;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum LoopError {
    #[error("destructuring patterns in a block-scoped loop head are not supported")]
    DestructuringHead(Span),

    #[error("`{label}` targets a statement outside the loop; labeled jumps out of a per-iteration scope are not supported")]
    OuterLabel { label: String, span: Span },

    #[error("`{keyword}` cannot move into the function that gives each iteration its own scope")]
    SuspendInBody { keyword: &'static str, span: Span },

    #[error("`{keyword}` refers to the enclosing function and cannot move into the function that gives each iteration its own scope")]
    FunctionBound { keyword: &'static str, span: Span },

    #[error("a closure captures a `let`/`const` declared in an inner `while`, `do-while` or `var` loop; per-iteration bindings of that loop are not supported")]
    InnerLoopCapture(Span),

    #[error("destructuring `var` declarations inside a loop body that needs its own scope are not supported")]
    DestructuringVar(Span),

    #[error("internal error: {message}")]
    Internal { message: String, span: Span },
}

impl LoopError {
    /// Span of the loop (or of the construct inside it) that caused the error.
    pub fn span(&self) -> Span {
        match self {
            LoopError::DestructuringHead(span)
            | LoopError::DestructuringVar(span)
            | LoopError::InnerLoopCapture(span) => *span,
            LoopError::OuterLabel { span, .. }
            | LoopError::SuspendInBody { span, .. }
            | LoopError::FunctionBound { span, .. }
            | LoopError::Internal { span, .. } => *span,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoopError>;
