use anyhow::Result;
use bl_ast::InputSyntax;
use swc_common::{
    comments::SingleThreadedComments, errors::Handler, sync::Lrc, FileName, SourceMap,
};
use swc_ecma_ast::EsVersion;
use swc_ecma_parser::{EsSyntax, Syntax, TsSyntax};

/// Result of parsing a source file.
pub struct ParseResult {
    pub module: swc_ecma_ast::Module,
    pub comments: SingleThreadedComments,
    pub source_map: Lrc<SourceMap>,
}

impl ParseResult {
    /// A diagnostic handler writing to stderr, with spans resolved against this file.
    pub fn handler(&self) -> Handler {
        Handler::with_emitter_writer(Box::new(std::io::stderr()), Some(self.source_map.clone()))
    }
}

/// Parse a source string as an ES module.
///
/// Fatal syntax errors are emitted to stderr and returned as an error.
/// Recoverable ones are emitted but do not fail the parse.
pub fn parse_js(source: &str, filename: &str, syntax: &InputSyntax) -> Result<ParseResult> {
    let source_map: Lrc<SourceMap> = Default::default();
    let source_file = source_map.new_source_file(
        Lrc::new(FileName::Custom(filename.to_string())),
        source.to_string(),
    );

    let comments = SingleThreadedComments::default();

    let handler =
        Handler::with_emitter_writer(Box::new(std::io::stderr()), Some(source_map.clone()));

    let parser_syntax = if syntax.typescript {
        Syntax::Typescript(TsSyntax {
            tsx: syntax.jsx,
            decorators: true,
            ..Default::default()
        })
    } else {
        Syntax::Es(EsSyntax {
            jsx: syntax.jsx,
            ..Default::default()
        })
    };

    let mut recovered = vec![];
    let module = swc_ecma_parser::parse_file_as_module(
        &source_file,
        parser_syntax,
        EsVersion::latest(),
        Some(&comments),
        &mut recovered,
    )
    .map_err(|e| {
        e.into_diagnostic(&handler).emit();
        anyhow::anyhow!("failed to parse {filename}")
    })?;

    for error in recovered {
        error.into_diagnostic(&handler).emit();
    }

    Ok(ParseResult {
        module,
        comments,
        source_map,
    })
}
