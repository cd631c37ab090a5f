//! ECMAScript AST for blockloop.
//!
//! Re-exports the standard SWC AST and adds the option types shared by the
//! parser, the desugaring pass and the CLI:
//! - [`InputSyntax`]: which dialect the source is parsed as
//! - [`LoopOptions`]: the names and sentinel values the loop rewrite emits

pub use swc_ecma_ast::*;

use serde::{Deserialize, Serialize};

/// Source dialect accepted by the parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSyntax {
    /// Parse as TypeScript instead of plain ECMAScript.
    pub typescript: bool,
    /// Enable JSX (`.jsx` / `.tsx`).
    pub jsx: bool,
}

impl InputSyntax {
    /// Pick the dialect from a file extension (`.ts`, `.tsx`, `.jsx`, anything else is JS).
    pub fn from_filename(filename: &str) -> Self {
        Self {
            typescript: filename.ends_with(".ts") || filename.ends_with(".tsx"),
            jsx: filename.ends_with(".tsx") || filename.ends_with(".jsx"),
        }
    }
}

/// Names and sentinel values used when a loop body is extracted into a function.
///
/// Every field is a base name: the pass still runs it through the name
/// registry, so `loop` becomes `loop$1` when `loop` is already taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopOptions {
    /// Base name of the extracted loop body function.
    pub function_name: String,
    /// Base name of the variable holding the loop body function's result.
    pub result_name: String,
    /// String literal returned by the loop body function to request a `break`.
    pub break_sentinel: String,
    /// Property under which a wrapped `return` value travels back to the caller.
    pub return_key: String,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            function_name: "loop".into(),
            result_name: "returned".into(),
            break_sentinel: "break".into(),
            return_key: "v".into(),
        }
    }
}

impl std::fmt::Display for LoopOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "function={} result={} break={:?} return-key={}",
            self.function_name, self.result_name, self.break_sentinel, self.return_key
        )
    }
}
