//! Parse/emit helpers shared by the unit tests.

use std::cell::RefCell;

use bl_ast::{InputSyntax, LoopOptions};
use swc_common::{sync::Lrc, SourceMap, DUMMY_SP};
use swc_ecma_ast as ast;
use swc_ecma_codegen::{text_writer::JsWriter, Config, Emitter, Node};

thread_local! {
    // The emitter resolves spans (line breaks in array literals) against the
    // source map of the code it prints.
    static SOURCE_MAP: RefCell<Lrc<SourceMap>> = RefCell::new(Default::default());
}

pub(crate) fn parse(src: &str) -> ast::Module {
    let parsed = bl_parser::parse_js(src, "test.js", &InputSyntax::default())
        .expect("test source parses");
    SOURCE_MAP.with(|cm| *cm.borrow_mut() = parsed.source_map.clone());
    parsed.module
}

/// Statements parsed as the body of a labeled loop inside a function, so
/// `return`, `break outer` and `continue elsewhere` are all legal.
pub(crate) fn parse_stmts(src: &str) -> Vec<ast::Stmt> {
    let wrapped = format!("function wrap() {{ elsewhere: outer: for (;;) {{ {src} }} }}");
    let mut module = parse(&wrapped);
    let Some(ast::ModuleItem::Stmt(ast::Stmt::Decl(ast::Decl::Fn(func)))) = module.body.pop()
    else {
        panic!("expected the wrapper function");
    };
    let mut body = func.function.body.expect("wrapper body").stmts;
    let mut stmt = body.pop().expect("wrapper loop");
    loop {
        match stmt {
            ast::Stmt::Labeled(labeled) => stmt = *labeled.body,
            ast::Stmt::For(f) => match *f.body {
                ast::Stmt::Block(block) => return block.stmts,
                other => panic!("unexpected loop body {other:?}"),
            },
            other => panic!("unexpected wrapper statement {other:?}"),
        }
    }
}

pub(crate) fn emit(module: &ast::Module) -> String {
    let cm = SOURCE_MAP.with(|cm| cm.borrow().clone());
    let mut buf = vec![];
    {
        let mut emitter = Emitter {
            cfg: Config::default().with_target(ast::EsVersion::latest()),
            cm: cm.clone(),
            comments: None,
            wr: JsWriter::new(cm, "\n", &mut buf, None),
        };
        module.emit_with(&mut emitter).expect("emit succeeds");
    }
    String::from_utf8(buf).expect("emitted code is utf-8")
}

pub(crate) fn emit_stmts(stmts: Vec<ast::Stmt>) -> String {
    emit(&ast::Module {
        span: DUMMY_SP,
        body: stmts.into_iter().map(ast::ModuleItem::Stmt).collect(),
        shebang: None,
    })
}

/// Re-print source through the same emitter so comparisons ignore formatting.
pub(crate) fn normalize(src: &str) -> String {
    emit(&parse(src))
}

/// Statement-level variant of [`normalize`] for snippets that only parse
/// inside a function or loop.
pub(crate) fn normalize_stmts(src: &str) -> String {
    emit_stmts(parse_stmts(src))
}

pub(crate) fn desugar(src: &str) -> String {
    let module = crate::desugar_module(parse(src), &LoopOptions::default())
        .expect("desugaring succeeds");
    emit(&module)
}
