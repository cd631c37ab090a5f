//! `break`/`continue`/`return` across the loop body function boundary.
//!
//! Inside the extracted function every jump that targeted the loop (or the
//! enclosing function) becomes a `return` carrying a [`Completion`]. The caller
//! decodes it right after the call with [`dispatch`].

use swc_common::{Span, DUMMY_SP};
use swc_ecma_ast as ast;
use swc_ecma_visit::{VisitMut, VisitMutWith};

use bl_ast::LoopOptions;

use crate::build;
use crate::error::LoopError;

/// How one run of the loop body function ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Fell off the end, or `continue`.
    Normal,
    /// `break` out of the loop.
    Break,
    /// `return` from the function that contains the loop.
    Return(Option<Box<ast::Expr>>),
}

impl Completion {
    /// The `return` statement that signals this completion from inside the
    /// loop body function.
    pub fn into_return(self, options: &LoopOptions, span: Span) -> ast::Stmt {
        let arg = match self {
            Completion::Normal => None,
            Completion::Break => Some(build::str_lit(&options.break_sentinel, span)),
            Completion::Return(value) => Some(build::object(
                &options.return_key,
                value.unwrap_or_else(|| build::undefined(span)),
                span,
            )),
        };
        build::return_stmt(arg, span)
    }
}

/// A rewritten jump site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlowSite {
    Break(Span),
    Continue(Span),
    Return(Span),
}

/// Jump sites found while rewriting one loop body.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Sites {
    pub sites: Vec<ControlFlowSite>,
}

impl Sites {
    pub fn breaks(&self) -> bool {
        self.sites.iter().any(|s| matches!(s, ControlFlowSite::Break(_)))
    }

    pub fn returns(&self) -> bool {
        self.sites.iter().any(|s| matches!(s, ControlFlowSite::Return(_)))
    }

    /// The caller has to look at the function's result.
    pub fn needs_dispatch(&self) -> bool {
        self.breaks() || self.returns()
    }
}

/// Rewrite the jump sites of a loop body about to become a function body.
///
/// `labels` are the labels attached to the loop itself; `write_back` is
/// emitted before every `continue` so the loop head sees the updated counter.
pub fn rewrite_sites(
    stmts: &mut [ast::Stmt],
    labels: &[String],
    write_back: &[ast::Stmt],
    options: &LoopOptions,
    loop_span: Span,
) -> Result<Sites, LoopError> {
    let mut rewriter = SiteRewriter {
        labels,
        write_back,
        options,
        loop_span,
        inner_labels: Vec::new(),
        loop_depth: 0,
        switch_depth: 0,
        sites: Sites::default(),
        error: None,
    };
    for stmt in stmts.iter_mut() {
        stmt.visit_mut_with(&mut rewriter);
    }
    match rewriter.error {
        Some(err) => Err(err),
        None => Ok(rewriter.sites),
    }
}

/// Caller-side statement running one iteration: a plain call when the body
/// never breaks or returns, otherwise
/// `{ var returned = loop(i); if (returned === "break") break; if (returned) return returned.v; }`.
pub fn dispatch(
    call: Box<ast::Expr>,
    result_name: &str,
    sites: &Sites,
    options: &LoopOptions,
) -> ast::Stmt {
    if !sites.needs_dispatch() {
        return build::expr_stmt(call);
    }

    let mut stmts = vec![build::var_stmt(
        DUMMY_SP,
        [(result_name.to_string(), Some(call))],
    )];
    // The break check goes first: a wrapped return is truthy too.
    if sites.breaks() {
        stmts.push(build::if_stmt(
            build::strict_eq(
                build::ident_expr(result_name, DUMMY_SP),
                build::str_lit(&options.break_sentinel, DUMMY_SP),
                DUMMY_SP,
            ),
            build::break_stmt(DUMMY_SP),
            DUMMY_SP,
        ));
    }
    if sites.returns() {
        stmts.push(build::if_stmt(
            build::ident_expr(result_name, DUMMY_SP),
            build::return_stmt(
                Some(build::member(
                    build::ident_expr(result_name, DUMMY_SP),
                    &options.return_key,
                    DUMMY_SP,
                )),
                DUMMY_SP,
            ),
            DUMMY_SP,
        ));
    }
    build::block(stmts)
}

struct SiteRewriter<'a> {
    labels: &'a [String],
    write_back: &'a [ast::Stmt],
    options: &'a LoopOptions,
    loop_span: Span,
    inner_labels: Vec<String>,
    loop_depth: usize,
    switch_depth: usize,
    sites: Sites,
    error: Option<LoopError>,
}

enum Target {
    Loop,
    Inner,
}

impl SiteRewriter<'_> {
    fn target(&mut self, label: Option<&ast::Ident>, stopped_by_inner: bool) -> Option<Target> {
        match label {
            None if stopped_by_inner => Some(Target::Inner),
            None => Some(Target::Loop),
            Some(label) => {
                let label = label.sym.to_string();
                if self.inner_labels.contains(&label) {
                    Some(Target::Inner)
                } else if self.labels.contains(&label) {
                    Some(Target::Loop)
                } else {
                    self.error.get_or_insert(LoopError::OuterLabel {
                        label,
                        span: self.loop_span,
                    });
                    None
                }
            }
        }
    }

    fn continue_stmt(&self, span: Span) -> ast::Stmt {
        let ret = Completion::Normal.into_return(self.options, span);
        if self.write_back.is_empty() {
            return ret;
        }
        let mut stmts = self.write_back.to_vec();
        stmts.push(ret);
        build::block(stmts)
    }
}

impl VisitMut for SiteRewriter<'_> {
    fn visit_mut_stmt(&mut self, stmt: &mut ast::Stmt) {
        match stmt {
            ast::Stmt::Break(brk) => {
                let stopped = self.loop_depth > 0 || self.switch_depth > 0;
                if let Some(Target::Loop) = self.target(brk.label.as_ref(), stopped) {
                    self.sites.sites.push(ControlFlowSite::Break(brk.span));
                    *stmt = Completion::Break.into_return(self.options, brk.span);
                }
            }
            ast::Stmt::Continue(cont) => {
                let stopped = self.loop_depth > 0;
                if let Some(Target::Loop) = self.target(cont.label.as_ref(), stopped) {
                    self.sites.sites.push(ControlFlowSite::Continue(cont.span));
                    *stmt = self.continue_stmt(cont.span);
                }
            }
            ast::Stmt::Return(ret) => {
                self.sites.sites.push(ControlFlowSite::Return(ret.span));
                let span = ret.span;
                *stmt = Completion::Return(ret.arg.take()).into_return(self.options, span);
            }
            ast::Stmt::Labeled(labeled) => {
                self.inner_labels.push(labeled.label.sym.to_string());
                labeled.body.visit_mut_with(self);
                self.inner_labels.pop();
            }
            ast::Stmt::For(_)
            | ast::Stmt::ForIn(_)
            | ast::Stmt::ForOf(_)
            | ast::Stmt::While(_)
            | ast::Stmt::DoWhile(_) => {
                self.loop_depth += 1;
                stmt.visit_mut_children_with(self);
                self.loop_depth -= 1;
            }
            ast::Stmt::Switch(_) => {
                self.switch_depth += 1;
                stmt.visit_mut_children_with(self);
                self.switch_depth -= 1;
            }
            _ => stmt.visit_mut_children_with(self),
        }
    }

    fn visit_mut_function(&mut self, _: &mut ast::Function) {}
    fn visit_mut_arrow_expr(&mut self, _: &mut ast::ArrowExpr) {}
    fn visit_mut_constructor(&mut self, _: &mut ast::Constructor) {}
    fn visit_mut_getter_prop(&mut self, _: &mut ast::GetterProp) {}
    fn visit_mut_setter_prop(&mut self, _: &mut ast::SetterProp) {}
    fn visit_mut_class(&mut self, _: &mut ast::Class) {}
}
