//! Scope-aware identifier rewriting.
//!
//! [`Renamer`] renames references to one binding and stops wherever a nested
//! scope declares the same name again. [`AliasRewriter`] replaces `this` and
//! `arguments` with generated aliases up to the next ordinary function.

use swc_ecma_ast as ast;
use swc_ecma_visit::{VisitMut, VisitMutWith};

use crate::{build, scope};

pub(crate) struct Renamer<'a> {
    from: &'a str,
    to: &'a str,
}

impl<'a> Renamer<'a> {
    pub(crate) fn new(from: &'a str, to: &'a str) -> Self {
        Self { from, to }
    }

    /// Rename inside a statement list whose own declarations are the binding
    /// being renamed (so they are not treated as shadowing).
    pub(crate) fn rename_stmts(&mut self, stmts: &mut [ast::Stmt]) {
        if self.from == self.to {
            return;
        }
        for stmt in stmts {
            stmt.visit_mut_with(self);
        }
    }

    pub(crate) fn rename<N: VisitMutWith<Self>>(&mut self, node: &mut N) {
        if self.from != self.to {
            node.visit_mut_with(self);
        }
    }

    fn shadows(&self, names: impl IntoIterator<Item = String>) -> bool {
        names.into_iter().any(|name| name == self.from)
    }
}

impl VisitMut for Renamer<'_> {
    fn visit_mut_ident(&mut self, ident: &mut ast::Ident) {
        if &*ident.sym == self.from {
            ident.sym = self.to.into();
        }
    }

    // `{ i }` keeps its key: `{ i: i$1 }`.
    fn visit_mut_prop(&mut self, prop: &mut ast::Prop) {
        if let ast::Prop::Shorthand(id) = prop {
            if &*id.sym == self.from {
                let span = id.span;
                *prop = build::key_value(self.from, build::ident_expr(self.to, span), span);
                return;
            }
        }
        prop.visit_mut_children_with(self);
    }

    // The pattern `{ i = d }` reads property `i`: `{ i: i$1 = d }`.
    fn visit_mut_object_pat_prop(&mut self, prop: &mut ast::ObjectPatProp) {
        if let ast::ObjectPatProp::Assign(assign) = prop {
            if &*assign.key.id.sym == self.from {
                let key_span = assign.key.id.span;
                let mut binding = assign.key.clone();
                binding.id.sym = self.to.into();
                let mut value = ast::Pat::Ident(binding);
                if let Some(mut default) = assign.value.take() {
                    default.visit_mut_with(self);
                    value = ast::Pat::Assign(ast::AssignPat {
                        span: assign.span,
                        left: Box::new(value),
                        right: default,
                    });
                }
                *prop = ast::ObjectPatProp::KeyValue(ast::KeyValuePatProp {
                    key: build::prop_name(self.from, key_span),
                    value: Box::new(value),
                });
                return;
            }
        }
        prop.visit_mut_children_with(self);
    }

    fn visit_mut_block_stmt(&mut self, block: &mut ast::BlockStmt) {
        if self.shadows(scope::lexical_names(&block.stmts)) {
            return;
        }
        block.visit_mut_children_with(self);
    }

    fn visit_mut_stmt(&mut self, stmt: &mut ast::Stmt) {
        if self.shadows(scope::loop_head_names(stmt)) {
            return;
        }
        stmt.visit_mut_children_with(self);
    }

    fn visit_mut_catch_clause(&mut self, clause: &mut ast::CatchClause) {
        if self.shadows(scope::catch_names(clause)) {
            return;
        }
        clause.visit_mut_children_with(self);
    }

    fn visit_mut_fn_expr(&mut self, expr: &mut ast::FnExpr) {
        if expr.ident.as_ref().is_some_and(|id| &*id.sym == self.from) {
            return;
        }
        expr.function.visit_mut_with(self);
    }

    fn visit_mut_function(&mut self, function: &mut ast::Function) {
        if self.shadows(scope::function_names(function)) {
            return;
        }
        function.visit_mut_children_with(self);
    }

    fn visit_mut_arrow_expr(&mut self, arrow: &mut ast::ArrowExpr) {
        if self.shadows(scope::arrow_names(arrow)) {
            return;
        }
        arrow.visit_mut_children_with(self);
    }

    fn visit_mut_constructor(&mut self, ctor: &mut ast::Constructor) {
        if self.shadows(scope::constructor_names(ctor)) {
            return;
        }
        ctor.visit_mut_children_with(self);
    }

    fn visit_mut_getter_prop(&mut self, getter: &mut ast::GetterProp) {
        if self.shadows(scope::getter_names(getter)) {
            return;
        }
        getter.visit_mut_children_with(self);
    }

    fn visit_mut_setter_prop(&mut self, setter: &mut ast::SetterProp) {
        if self.shadows(scope::setter_names(setter)) {
            return;
        }
        setter.visit_mut_children_with(self);
    }

    fn visit_mut_labeled_stmt(&mut self, stmt: &mut ast::LabeledStmt) {
        stmt.body.visit_mut_with(self);
    }

    fn visit_mut_break_stmt(&mut self, _: &mut ast::BreakStmt) {}
    fn visit_mut_continue_stmt(&mut self, _: &mut ast::ContinueStmt) {}
}

/// Replaces `this`/`arguments` with aliases declared outside the loop body function.
pub(crate) struct AliasRewriter<'a> {
    pub this_alias: Option<&'a str>,
    pub arguments_alias: Option<&'a str>,
}

impl VisitMut for AliasRewriter<'_> {
    fn visit_mut_expr(&mut self, expr: &mut ast::Expr) {
        match expr {
            ast::Expr::This(this) => {
                if let Some(alias) = self.this_alias {
                    *expr = ast::Expr::Ident(build::ident(alias, this.span));
                }
            }
            ast::Expr::Ident(id) if &*id.sym == "arguments" => {
                if let Some(alias) = self.arguments_alias {
                    id.sym = alias.into();
                }
            }
            _ => expr.visit_mut_children_with(self),
        }
    }

    fn visit_mut_prop(&mut self, prop: &mut ast::Prop) {
        if let Some(alias) = self.arguments_alias {
            if let ast::Prop::Shorthand(id) = prop {
                if &*id.sym == "arguments" {
                    let span = id.span;
                    *prop = build::key_value("arguments", build::ident_expr(alias, span), span);
                    return;
                }
            }
        }
        prop.visit_mut_children_with(self);
    }

    // Ordinary functions, methods and class bodies bind their own `this` and
    // `arguments`; arrows do not.
    fn visit_mut_function(&mut self, _: &mut ast::Function) {}
    fn visit_mut_constructor(&mut self, _: &mut ast::Constructor) {}
    fn visit_mut_getter_prop(&mut self, _: &mut ast::GetterProp) {}
    fn visit_mut_setter_prop(&mut self, _: &mut ast::SetterProp) {}
    fn visit_mut_class(&mut self, _: &mut ast::Class) {}
}
