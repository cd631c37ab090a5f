//! Desugaring pass that rewrites block-scoped `for` loops into function-scoped ones.
//!
//! Transforms:
//! - `for (let i ...) body` with no closure over `i` → `for (var i ...) body`
//! - a loop whose per-iteration bindings are captured by a closure →
//!   `var loop = function (i) { body }; for (var i ...) loop(i);`
//!
//! `break`, `continue` and `return` inside an extracted body travel back to
//! the loop through the value returned by the loop function.

mod build;
pub mod capture;
pub mod control_flow;
pub mod desugar;
pub mod error;
pub mod extract;
pub mod namer;
pub mod region;
mod rename;
pub mod scope;

#[cfg(test)]
mod test_utils;

pub use capture::CaptureRecord;
pub use control_flow::Completion;
pub use desugar::{desugar_module, desugar_module_with, LoopReport, Outcome};
pub use error::LoopError;
pub use namer::NameRegistry;
