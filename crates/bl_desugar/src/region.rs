//! Walks over one function-scope region (a module body or a function body).
//!
//! A region is rewritten one loop at a time: [`first_candidate`] clones the
//! first block-scoped loop in source order, [`mentions`] asks whether a name
//! is used elsewhere in the region, and [`splice_first_candidate`] swaps the
//! loop for its replacement. All three skip nested functions the same way, so
//! "the first candidate" always designates the same statement.

use swc_ecma_ast as ast;
use swc_ecma_visit::{Visit, VisitMut, VisitMutWith, VisitWith};

use crate::scope::{self, is_block_scoped};

/// Borrowed view of a block-scoped loop, looking through labels.
pub struct LoopView<'a> {
    pub decl: &'a ast::VarDecl,
    pub head: Vec<&'a ast::Expr>,
    pub body: &'a ast::Stmt,
}

pub fn loop_view(stmt: &ast::Stmt) -> Option<LoopView<'_>> {
    match stmt {
        ast::Stmt::Labeled(labeled) => loop_view(&labeled.body),
        ast::Stmt::For(f) => match &f.init {
            Some(ast::VarDeclOrExpr::VarDecl(decl)) if is_block_scoped(decl) => Some(LoopView {
                decl,
                head: f.test.iter().chain(f.update.iter()).map(|e| &**e).collect(),
                body: &f.body,
            }),
            _ => None,
        },
        ast::Stmt::ForIn(f) => scope::head_decl(&f.left)
            .filter(|decl| is_block_scoped(decl))
            .map(|decl| LoopView {
                decl,
                head: vec![&*f.right],
                body: &f.body,
            }),
        ast::Stmt::ForOf(f) => scope::head_decl(&f.left)
            .filter(|decl| is_block_scoped(decl))
            .map(|decl| LoopView {
                decl,
                head: vec![&*f.right],
                body: &f.body,
            }),
        _ => None,
    }
}

pub fn is_candidate(stmt: &ast::Stmt) -> bool {
    loop_view(stmt).is_some()
}

/// Clone the first block-scoped loop of the region, if any.
pub fn first_candidate<R>(region: &R) -> Option<ast::Stmt>
where
    R: VisitWith<FirstCandidate>,
{
    let mut finder = FirstCandidate { found: None };
    region.visit_with(&mut finder);
    finder.found
}

/// Whether `name` occurs in the region outside the first candidate loop.
///
/// Nested functions that bind `name` themselves do not count, and neither do
/// other block-scoped loops that declare it for their own use.
pub fn mentions<R>(region: &R, name: &str) -> bool
where
    R: VisitWith<Mentions>,
{
    let mut scan = Mentions {
        name: name.to_string(),
        depth: 0,
        skipped: false,
        found: false,
    };
    region.visit_with(&mut scan);
    scan.found
}

/// Replace the first candidate loop with `replacement`. Returns `false` if the
/// region has no candidate.
pub fn splice_first_candidate<R>(region: &mut R, replacement: Vec<ast::Stmt>) -> bool
where
    R: VisitMutWith<Splice>,
{
    let mut splice = Splice {
        replacement: Some(replacement),
    };
    region.visit_mut_with(&mut splice);
    splice.replacement.is_none()
}

pub struct FirstCandidate {
    found: Option<ast::Stmt>,
}

impl Visit for FirstCandidate {
    fn visit_stmt(&mut self, stmt: &ast::Stmt) {
        if self.found.is_some() {
            return;
        }
        if is_candidate(stmt) {
            self.found = Some(stmt.clone());
            return;
        }
        stmt.visit_children_with(self);
    }

    fn visit_function(&mut self, _: &ast::Function) {}
    fn visit_arrow_expr(&mut self, _: &ast::ArrowExpr) {}
    fn visit_class(&mut self, _: &ast::Class) {}
    fn visit_getter_prop(&mut self, _: &ast::GetterProp) {}
    fn visit_setter_prop(&mut self, _: &ast::SetterProp) {}
}

pub struct Splice {
    replacement: Option<Vec<ast::Stmt>>,
}

impl Splice {
    fn done(&self) -> bool {
        self.replacement.is_none()
    }
}

impl VisitMut for Splice {
    fn visit_mut_module_items(&mut self, items: &mut Vec<ast::ModuleItem>) {
        for i in 0..items.len() {
            if self.done() {
                return;
            }
            if let ast::ModuleItem::Stmt(stmt) = &items[i] {
                if is_candidate(stmt) {
                    let replacement = self.replacement.take().unwrap_or_default();
                    items.splice(i..=i, replacement.into_iter().map(ast::ModuleItem::Stmt));
                    return;
                }
            }
            items[i].visit_mut_with(self);
        }
    }

    fn visit_mut_stmts(&mut self, stmts: &mut Vec<ast::Stmt>) {
        for i in 0..stmts.len() {
            if self.done() {
                return;
            }
            if is_candidate(&stmts[i]) {
                let replacement = self.replacement.take().unwrap_or_default();
                stmts.splice(i..=i, replacement);
                return;
            }
            stmts[i].visit_mut_with(self);
        }
    }

    // A loop in a single-statement position (`if (x) for (let ...) ...`).
    fn visit_mut_stmt(&mut self, stmt: &mut ast::Stmt) {
        if self.done() {
            return;
        }
        if is_candidate(stmt) {
            let replacement = self.replacement.take().unwrap_or_default();
            *stmt = crate::build::block(replacement);
            return;
        }
        stmt.visit_mut_children_with(self);
    }

    fn visit_mut_function(&mut self, _: &mut ast::Function) {}
    fn visit_mut_arrow_expr(&mut self, _: &mut ast::ArrowExpr) {}
    fn visit_mut_class(&mut self, _: &mut ast::Class) {}
    fn visit_mut_getter_prop(&mut self, _: &mut ast::GetterProp) {}
    fn visit_mut_setter_prop(&mut self, _: &mut ast::SetterProp) {}
}

pub struct Mentions {
    name: String,
    depth: usize,
    skipped: bool,
    found: bool,
}

impl Mentions {
    fn nested(&mut self, binds_name: bool, visit: impl FnOnce(&mut Self)) {
        if binds_name || self.found {
            return;
        }
        self.depth += 1;
        visit(self);
        self.depth -= 1;
    }
}

impl Visit for Mentions {
    fn visit_stmt(&mut self, stmt: &ast::Stmt) {
        if self.found {
            return;
        }
        if let Some(view) = loop_view(stmt) {
            if self.depth == 0 && !self.skipped {
                self.skipped = true;
                return;
            }
            // Another block-scoped loop: everything it declares for itself is its own.
            if scope::declared_names(view.decl).contains(&self.name) {
                return;
            }
            for decl in &view.decl.decls {
                decl.init.visit_with(self);
            }
            for expr in view.head {
                expr.visit_with(self);
            }
            let body_declares = match view.body {
                ast::Stmt::Block(block) => scope::lexical_names(&block.stmts).contains(&self.name),
                _ => false,
            };
            if !body_declares {
                view.body.visit_with(self);
            }
            return;
        }
        stmt.visit_children_with(self);
    }

    fn visit_ident(&mut self, ident: &ast::Ident) {
        if &*ident.sym == self.name.as_str() {
            self.found = true;
        }
    }

    fn visit_labeled_stmt(&mut self, stmt: &ast::LabeledStmt) {
        stmt.body.visit_with(self);
    }

    fn visit_break_stmt(&mut self, _: &ast::BreakStmt) {}
    fn visit_continue_stmt(&mut self, _: &ast::ContinueStmt) {}

    fn visit_fn_expr(&mut self, expr: &ast::FnExpr) {
        let named = expr.ident.as_ref().is_some_and(|id| &*id.sym == self.name.as_str());
        if !named {
            expr.function.visit_with(self);
        }
    }

    fn visit_function(&mut self, function: &ast::Function) {
        let binds = scope::function_names(function).contains(&self.name);
        self.nested(binds, |this| function.visit_children_with(this));
    }

    fn visit_arrow_expr(&mut self, arrow: &ast::ArrowExpr) {
        let binds = scope::arrow_names(arrow).contains(&self.name);
        self.nested(binds, |this| arrow.visit_children_with(this));
    }

    fn visit_constructor(&mut self, ctor: &ast::Constructor) {
        let binds = scope::constructor_names(ctor).contains(&self.name);
        self.nested(binds, |this| ctor.visit_children_with(this));
    }

    fn visit_getter_prop(&mut self, getter: &ast::GetterProp) {
        let binds = scope::getter_names(getter).contains(&self.name);
        self.nested(binds, |this| getter.visit_children_with(this));
    }

    fn visit_setter_prop(&mut self, setter: &ast::SetterProp) {
        let binds = scope::setter_names(setter).contains(&self.name);
        self.nested(binds, |this| setter.visit_children_with(this));
    }

    fn visit_class(&mut self, class: &ast::Class) {
        self.nested(false, |this| class.visit_children_with(this));
    }
}
