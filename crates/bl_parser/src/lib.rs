//! JavaScript/TypeScript front end for blockloop.
//!
//! Wraps the standard SWC parser: builds the source map, picks the dialect
//! from [`bl_ast::InputSyntax`] and reports syntax errors through the SWC
//! diagnostic handler before returning an error.

pub mod parse;

pub use parse::{parse_js, ParseResult};
