//! Top-level desugaring entry point.
//!
//! Walks every function-scope region of a module, outermost first, and
//! rewrites its block-scoped loops one at a time in source order.

use swc_common::Span;
use swc_ecma_ast as ast;
use swc_ecma_visit::{VisitMut, VisitMutWith, VisitWith};

use bl_ast::LoopOptions;

use crate::capture::CaptureRecord;
use crate::error::{LoopError, Result};
use crate::extract::rewrite_loop;
use crate::namer::NameRegistry;
use crate::region::{self, FirstCandidate, Mentions, Splice};

/// What happened to one loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Declarations turned into `var` in place.
    Flattened,
    /// Body moved into a function called once per iteration.
    Extracted { function_name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopReport {
    pub span: Span,
    pub outcome: Outcome,
    pub capture: CaptureRecord,
}

/// Rewrite every block-scoped loop in a module.
pub fn desugar_module(module: ast::Module, options: &LoopOptions) -> Result<ast::Module> {
    let mut names = NameRegistry::from_module(&module);
    desugar_module_with(module, options, &mut names).map(|(module, _)| module)
}

/// Like [`desugar_module`], drawing generated names from `names` and
/// reporting the outcome for each loop.
///
/// `names` must already know every identifier of the module, see
/// [`NameRegistry::from_module`].
pub fn desugar_module_with(
    mut module: ast::Module,
    options: &LoopOptions,
    names: &mut NameRegistry,
) -> Result<(ast::Module, Vec<LoopReport>)> {
    let mut desugarer = Desugarer {
        options,
        names,
        reports: Vec::new(),
        error: None,
    };
    module.visit_mut_with(&mut desugarer);
    match desugarer.error {
        Some(err) => Err(err),
        None => Ok((module, desugarer.reports)),
    }
}

struct Desugarer<'a> {
    options: &'a LoopOptions,
    names: &'a mut NameRegistry,
    reports: Vec<LoopReport>,
    error: Option<LoopError>,
}

impl Desugarer<'_> {
    fn process<R>(&mut self, region: &mut R)
    where
        R: VisitWith<FirstCandidate> + VisitWith<Mentions> + VisitMutWith<Splice>,
    {
        while self.error.is_none() {
            let Some(stmt) = region::first_candidate(&*region) else {
                return;
            };
            let span = swc_common::Spanned::span(&stmt);
            let region_ref = &*region;
            let mentioned = |name: &str| region::mentions(region_ref, name);
            match rewrite_loop(stmt, &mentioned, self.names, self.options) {
                Ok((replacement, report)) => {
                    self.reports.push(report);
                    if !region::splice_first_candidate(region, replacement) {
                        self.error = Some(LoopError::Internal {
                            message: "rewritten loop could not be spliced back".into(),
                            span,
                        });
                    }
                }
                Err(err) => {
                    tracing::debug!(error = %err, "loop rewrite failed");
                    self.error = Some(err);
                }
            }
        }
    }
}

impl VisitMut for Desugarer<'_> {
    fn visit_mut_module(&mut self, module: &mut ast::Module) {
        self.process(module);
        if self.error.is_none() {
            module.visit_mut_children_with(self);
        }
    }

    fn visit_mut_function(&mut self, function: &mut ast::Function) {
        if self.error.is_some() {
            return;
        }
        if let Some(body) = &mut function.body {
            self.process(body);
        }
        function.visit_mut_children_with(self);
    }

    fn visit_mut_arrow_expr(&mut self, arrow: &mut ast::ArrowExpr) {
        if self.error.is_some() {
            return;
        }
        if let ast::BlockStmtOrExpr::BlockStmt(body) = &mut *arrow.body {
            self.process(body);
        }
        arrow.visit_mut_children_with(self);
    }

    fn visit_mut_constructor(&mut self, ctor: &mut ast::Constructor) {
        if self.error.is_some() {
            return;
        }
        if let Some(body) = &mut ctor.body {
            self.process(body);
        }
        ctor.visit_mut_children_with(self);
    }

    fn visit_mut_getter_prop(&mut self, getter: &mut ast::GetterProp) {
        if self.error.is_some() {
            return;
        }
        if let Some(body) = &mut getter.body {
            self.process(body);
        }
        getter.visit_mut_children_with(self);
    }

    fn visit_mut_setter_prop(&mut self, setter: &mut ast::SetterProp) {
        if self.error.is_some() {
            return;
        }
        if let Some(body) = &mut setter.body {
            self.process(body);
        }
        setter.visit_mut_children_with(self);
    }

    fn visit_mut_static_block(&mut self, block: &mut ast::StaticBlock) {
        if self.error.is_some() {
            return;
        }
        self.process(&mut block.body);
        block.visit_mut_children_with(self);
    }
}
