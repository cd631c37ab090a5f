//! Rewrites one block-scoped loop.
//!
//! A loop whose per-iteration bindings never reach a closure is flattened:
//! its `let`/`const` become `var`, renamed where that would clash. Otherwise
//! the body moves into a function called once per iteration:
//!
//! ```js
//! var loop = function (i) { setTimeout(() => log(i)); };
//! for (var i = 0; i < 10; i += 1) loop(i);
//! ```

use swc_common::{Span, Spanned, DUMMY_SP};
use swc_ecma_ast as ast;
use swc_ecma_visit::{VisitMut, VisitMutWith};

use bl_ast::LoopOptions;

use crate::build;
use crate::capture::{self, CaptureRecord};
use crate::control_flow::{dispatch, rewrite_sites};
use crate::desugar::{LoopReport, Outcome};
use crate::error::{LoopError, Result};
use crate::namer::NameRegistry;
use crate::region;
use crate::rename::{AliasRewriter, Renamer};
use crate::scope;

/// An owned block-scoped loop taken apart.
pub struct LoopParts {
    /// Labels attached to the loop, outermost first.
    pub labels: Vec<ast::Ident>,
    pub span: Span,
    pub decl: Box<ast::VarDecl>,
    pub head: LoopHead,
    pub body: Box<ast::Stmt>,
}

pub enum LoopHead {
    For {
        test: Option<Box<ast::Expr>>,
        update: Option<Box<ast::Expr>>,
    },
    ForIn {
        right: Box<ast::Expr>,
    },
    ForOf {
        is_await: bool,
        right: Box<ast::Expr>,
    },
}

impl LoopHead {
    fn exprs(&self) -> Vec<&ast::Expr> {
        match self {
            LoopHead::For { test, update } => {
                test.iter().chain(update.iter()).map(|e| &**e).collect()
            }
            LoopHead::ForIn { right } | LoopHead::ForOf { right, .. } => vec![&**right],
        }
    }

    fn exprs_mut(&mut self) -> Vec<&mut ast::Expr> {
        match self {
            LoopHead::For { test, update } => test
                .iter_mut()
                .chain(update.iter_mut())
                .map(|e| &mut **e)
                .collect(),
            LoopHead::ForIn { right } | LoopHead::ForOf { right, .. } => vec![&mut **right],
        }
    }
}

impl LoopParts {
    /// Take a loop apart. `None` unless `stmt` is a (possibly labeled)
    /// `for`/`for-in`/`for-of` with a `let`/`const` head.
    pub fn from_stmt(stmt: ast::Stmt) -> Option<Self> {
        let mut labels = Vec::new();
        let mut stmt = stmt;
        while let ast::Stmt::Labeled(labeled) = stmt {
            labels.push(labeled.label);
            stmt = *labeled.body;
        }
        let parts = match stmt {
            ast::Stmt::For(f) => match f.init {
                Some(ast::VarDeclOrExpr::VarDecl(decl)) if scope::is_block_scoped(&decl) => {
                    LoopParts {
                        labels,
                        span: f.span,
                        decl,
                        head: LoopHead::For {
                            test: f.test,
                            update: f.update,
                        },
                        body: f.body,
                    }
                }
                _ => return None,
            },
            ast::Stmt::ForIn(f) => match f.left {
                ast::ForHead::VarDecl(decl) if scope::is_block_scoped(&decl) => LoopParts {
                    labels,
                    span: f.span,
                    decl,
                    head: LoopHead::ForIn { right: f.right },
                    body: f.body,
                },
                _ => return None,
            },
            ast::Stmt::ForOf(f) => match f.left {
                ast::ForHead::VarDecl(decl) if scope::is_block_scoped(&decl) => LoopParts {
                    labels,
                    span: f.span,
                    decl,
                    head: LoopHead::ForOf {
                        is_await: f.is_await,
                        right: f.right,
                    },
                    body: f.body,
                },
                _ => return None,
            },
            _ => return None,
        };
        Some(parts)
    }

    /// Put the loop back together, labels included.
    pub fn into_stmt(self) -> ast::Stmt {
        let LoopParts {
            labels,
            span,
            decl,
            head,
            body,
        } = self;
        let mut stmt = match head {
            LoopHead::For { test, update } => ast::Stmt::For(ast::ForStmt {
                span,
                init: Some(ast::VarDeclOrExpr::VarDecl(decl)),
                test,
                update,
                body,
            }),
            LoopHead::ForIn { right } => ast::Stmt::ForIn(ast::ForInStmt {
                span,
                left: ast::ForHead::VarDecl(decl),
                right,
                body,
            }),
            LoopHead::ForOf { is_await, right } => ast::Stmt::ForOf(ast::ForOfStmt {
                span,
                is_await,
                left: ast::ForHead::VarDecl(decl),
                right,
                body,
            }),
        };
        for label in labels.into_iter().rev() {
            stmt = ast::Stmt::Labeled(ast::LabeledStmt {
                span,
                label,
                body: Box::new(stmt),
            });
        }
        stmt
    }

    fn label_names(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.sym.to_string()).collect()
    }

    /// Rename a loop variable in the declaration and head expressions.
    fn rename_head(&mut self, from: &str, to: &str) {
        let mut renamer = Renamer::new(from, to);
        renamer.rename(&mut *self.decl);
        for expr in self.head.exprs_mut() {
            renamer.rename(expr);
        }
    }
}

/// Rewrite a candidate loop. `mentioned` answers whether a name is used in
/// the enclosing function scope outside this loop.
pub fn rewrite_loop(
    stmt: ast::Stmt,
    mentioned: &dyn Fn(&str) -> bool,
    names: &mut NameRegistry,
    options: &LoopOptions,
) -> Result<(Vec<ast::Stmt>, LoopReport)> {
    let stmt_span = stmt.span();
    let mut parts = LoopParts::from_stmt(stmt).ok_or_else(|| LoopError::Internal {
        message: "candidate is not a block-scoped loop".into(),
        span: stmt_span,
    })?;
    let span = parts.span;

    if parts
        .decl
        .decls
        .iter()
        .any(|d| !matches!(d.name, ast::Pat::Ident(_)))
    {
        return Err(LoopError::DestructuringHead(span));
    }

    let loop_vars = scope::declared_names(&parts.decl);
    let record = capture::analyze(&parts.decl, &parts.head.exprs(), &parts.body);
    if record.inner_loop_binding_captured {
        return Err(LoopError::InnerLoopCapture(span));
    }

    // The loop counter becomes a binding of the enclosing function, so it
    // has to get out of the way of anything else that lives there.
    let mut outer = Vec::with_capacity(loop_vars.len());
    for name in &loop_vars {
        if mentioned(name) {
            let renamed = names.rename(name);
            parts.rename_head(name, &renamed);
            outer.push(renamed);
        } else {
            outer.push(name.clone());
        }
    }

    if record.needs_extraction() {
        extract(parts, &loop_vars, outer, record, names, options)
    } else {
        flatten(parts, &loop_vars, outer, record, mentioned, names)
    }
}

fn flatten(
    mut parts: LoopParts,
    loop_vars: &[String],
    outer: Vec<String>,
    record: CaptureRecord,
    mentioned: &dyn Fn(&str) -> bool,
    names: &mut NameRegistry,
) -> Result<(Vec<ast::Stmt>, LoopReport)> {
    for (name, renamed) in loop_vars.iter().zip(&outer) {
        Renamer::new(name, renamed).rename(&mut *parts.body);
    }
    parts.decl.kind = ast::VarDeclKind::Var;

    let conflicts = |name: &str| body_conflict(&record, loop_vars, name) || mentioned(name);
    let mut flattener = Flattener {
        names: &mut *names,
        conflicts: &conflicts,
        reset_uninitialized: true,
    };
    parts.body.visit_mut_with(&mut flattener);

    tracing::debug!(vars = ?outer, "flattened block-scoped loop");
    let report = LoopReport {
        span: parts.span,
        outcome: Outcome::Flattened,
        capture: record,
    };
    Ok((vec![parts.into_stmt()], report))
}

fn extract(
    parts: LoopParts,
    loop_vars: &[String],
    outer: Vec<String>,
    record: CaptureRecord,
    names: &mut NameRegistry,
    options: &LoopOptions,
) -> Result<(Vec<ast::Stmt>, LoopReport)> {
    let span = parts.span;
    if let Some((keyword, _)) = record.suspension {
        return Err(LoopError::SuspendInBody { keyword, span });
    }
    if let Some((keyword, _)) = record.function_bound {
        return Err(LoopError::FunctionBound { keyword, span });
    }
    if record.destructuring_var.is_some() {
        return Err(LoopError::DestructuringVar(span));
    }

    let labels = parts.label_names();
    let LoopParts {
        labels: label_idents,
        decl,
        head,
        body,
        ..
    } = parts;
    let mut stmts = match *body {
        ast::Stmt::Block(block) => block.stmts,
        other => vec![other],
    };

    let hoisted = record.body_vars.clone();
    Hoister.visit_mut_stmts(&mut stmts);

    let conflicts = |name: &str| body_conflict(&record, loop_vars, name);
    Flattener {
        names: &mut *names,
        conflicts: &conflicts,
        reset_uninitialized: false,
    }
    .flatten_list(&mut stmts);

    // for-in/for-of reassign the variable from the head on every iteration,
    // so only a plain `for` has to see writes made by the body.
    let writes_back = matches!(head, LoopHead::For { .. });
    let mut params = Vec::with_capacity(loop_vars.len());
    let mut write_back = Vec::new();
    for (name, outer_name) in loop_vars.iter().zip(&outer) {
        if writes_back && record.needs_write_back(name) {
            let param = names.fresh(name);
            Renamer::new(name, &param).rename_stmts(&mut stmts);
            write_back.push(build::expr_stmt(build::assign(
                outer_name,
                build::ident_expr(&param, DUMMY_SP),
                DUMMY_SP,
            )));
            params.push(param);
        } else {
            params.push(name.clone());
        }
    }

    let arguments_alias = record
        .arguments_captured
        .then(|| names.fresh_suffixed("arguments"));
    let this_alias = record.this_captured.then(|| names.fresh_suffixed("this"));
    let mut aliases = AliasRewriter {
        this_alias: this_alias.as_deref(),
        arguments_alias: arguments_alias.as_deref(),
    };
    for stmt in &mut stmts {
        stmt.visit_mut_with(&mut aliases);
    }

    let sites = rewrite_sites(&mut stmts, &labels, &write_back, options, span)?;
    stmts.extend(write_back);

    let function_name = names.fresh(&options.function_name);
    let result_name = if sites.needs_dispatch() {
        names.fresh(&options.result_name)
    } else {
        String::new()
    };

    let mut out = Vec::new();
    if let Some(alias) = arguments_alias {
        out.push(build::var_stmt(
            DUMMY_SP,
            [(alias, Some(build::ident_expr("arguments", DUMMY_SP)))],
        ));
    }
    if let Some(alias) = this_alias {
        out.push(build::var_stmt(
            DUMMY_SP,
            [(alias, Some(Box::new(ast::Expr::This(ast::ThisExpr { span: DUMMY_SP }))))],
        ));
    }
    if !hoisted.is_empty() {
        out.push(build::var_stmt(
            DUMMY_SP,
            hoisted.into_iter().map(|name| (name, None)),
        ));
    }
    out.push(build::var_stmt(
        DUMMY_SP,
        [(
            function_name.clone(),
            Some(build::fn_expr(&params, stmts, span)),
        )],
    ));

    let call = build::call(&function_name, &outer, DUMMY_SP);
    let mut decl = decl;
    decl.kind = ast::VarDeclKind::Var;
    let rebuilt = LoopParts {
        labels: label_idents,
        span,
        decl,
        head,
        body: Box::new(dispatch(call, &result_name, &sites, options)),
    };
    out.push(rebuilt.into_stmt());

    tracing::debug!(
        function = %function_name,
        params = ?params,
        sites = sites.sites.len(),
        "extracted loop body"
    );
    let report = LoopReport {
        span,
        outcome: Outcome::Extracted { function_name },
        capture: record,
    };
    Ok((out, report))
}

/// Whether a `let`/`const` from the body has to be renamed when it turns into a `var`.
fn body_conflict(record: &CaptureRecord, loop_vars: &[String], name: &str) -> bool {
    record.body_declarations.get(name).copied().unwrap_or(0) > 1
        || loop_vars.iter().any(|v| v == name)
        || record.free_names.contains(name)
}

/// Turns the body's `let`/`const` into `var`, including those of inner
/// `while`/`do-while`/`var` loops. Nested block-scoped loops and functions
/// are left alone.
struct Flattener<'a> {
    names: &'a mut NameRegistry,
    conflicts: &'a dyn Fn(&str) -> bool,
    /// `let x;` becomes `var x = void 0;` so each iteration starts from `undefined`.
    reset_uninitialized: bool,
}

impl Flattener<'_> {
    fn flatten_list(&mut self, stmts: &mut Vec<ast::Stmt>) {
        let declared: Vec<String> = stmts
            .iter()
            .filter_map(|stmt| match stmt {
                ast::Stmt::Decl(ast::Decl::Var(var)) if scope::is_block_scoped(var) => {
                    Some(scope::declared_names(var))
                }
                _ => None,
            })
            .flatten()
            .collect();
        for name in declared {
            if (self.conflicts)(&name) {
                let renamed = self.names.rename(&name);
                Renamer::new(&name, &renamed).rename_stmts(stmts);
            }
        }

        for stmt in stmts.iter_mut() {
            if let ast::Stmt::Decl(ast::Decl::Var(var)) = stmt {
                if !scope::is_block_scoped(var) {
                    continue;
                }
                if self.reset_uninitialized && var.kind == ast::VarDeclKind::Let {
                    for decl in &mut var.decls {
                        if decl.init.is_none() {
                            decl.init = Some(build::undefined(decl.span));
                        }
                    }
                }
                var.kind = ast::VarDeclKind::Var;
            }
        }

        for stmt in stmts.iter_mut() {
            stmt.visit_mut_with(self);
        }
    }
}

impl VisitMut for Flattener<'_> {
    fn visit_mut_block_stmt(&mut self, block: &mut ast::BlockStmt) {
        self.flatten_list(&mut block.stmts);
    }

    fn visit_mut_stmt(&mut self, stmt: &mut ast::Stmt) {
        if region::is_candidate(stmt) {
            return;
        }
        match stmt {
            ast::Stmt::For(_)
            | ast::Stmt::ForIn(_)
            | ast::Stmt::ForOf(_)
            | ast::Stmt::While(_)
            | ast::Stmt::DoWhile(_) => {
                let reset = std::mem::replace(&mut self.reset_uninitialized, true);
                stmt.visit_mut_children_with(self);
                self.reset_uninitialized = reset;
            }
            _ => stmt.visit_mut_children_with(self),
        }
    }

    fn visit_mut_function(&mut self, _: &mut ast::Function) {}
    fn visit_mut_arrow_expr(&mut self, _: &mut ast::ArrowExpr) {}
    fn visit_mut_class(&mut self, _: &mut ast::Class) {}
    fn visit_mut_constructor(&mut self, _: &mut ast::Constructor) {}
    fn visit_mut_getter_prop(&mut self, _: &mut ast::GetterProp) {}
    fn visit_mut_setter_prop(&mut self, _: &mut ast::SetterProp) {}
}

/// Replaces `var` declarations of an extracted body with assignments; the
/// names themselves are declared once in front of the loop function.
struct Hoister;

impl Hoister {
    fn assignments(decl: &mut ast::VarDecl) -> Option<Box<ast::Expr>> {
        let exprs = decl
            .decls
            .iter_mut()
            .filter_map(|d| {
                let init = d.init.take()?;
                let ast::Pat::Ident(id) = &d.name else {
                    return None;
                };
                Some(build::assign(&id.id.sym, init, d.span))
            })
            .collect();
        build::sequence(exprs, decl.span)
    }
}

impl VisitMut for Hoister {
    fn visit_mut_stmts(&mut self, stmts: &mut Vec<ast::Stmt>) {
        stmts.visit_mut_children_with(self);
        stmts.retain(|stmt| !matches!(stmt, ast::Stmt::Empty(_)));
    }

    fn visit_mut_stmt(&mut self, stmt: &mut ast::Stmt) {
        stmt.visit_mut_children_with(self);
        if let ast::Stmt::Decl(ast::Decl::Var(var)) = stmt {
            if var.kind != ast::VarDeclKind::Var {
                return;
            }
            let span = var.span;
            *stmt = match Self::assignments(var) {
                Some(expr) => build::expr_stmt(expr),
                None => ast::Stmt::Empty(ast::EmptyStmt { span }),
            };
        }
    }

    fn visit_mut_for_stmt(&mut self, stmt: &mut ast::ForStmt) {
        stmt.visit_mut_children_with(self);
        if let Some(ast::VarDeclOrExpr::VarDecl(var)) = &mut stmt.init {
            if var.kind == ast::VarDeclKind::Var {
                stmt.init = Self::assignments(var).map(ast::VarDeclOrExpr::Expr);
            }
        }
    }

    fn visit_mut_for_head(&mut self, head: &mut ast::ForHead) {
        if let ast::ForHead::VarDecl(var) = head {
            if var.kind == ast::VarDeclKind::Var && var.decls.len() == 1 {
                let pat = var.decls[0].name.clone();
                *head = ast::ForHead::Pat(Box::new(pat));
            }
        }
    }

    fn visit_mut_function(&mut self, _: &mut ast::Function) {}
    fn visit_mut_arrow_expr(&mut self, _: &mut ast::ArrowExpr) {}
    fn visit_mut_class(&mut self, _: &mut ast::Class) {}
    fn visit_mut_constructor(&mut self, _: &mut ast::Constructor) {}
    fn visit_mut_getter_prop(&mut self, _: &mut ast::GetterProp) {}
    fn visit_mut_setter_prop(&mut self, _: &mut ast::SetterProp) {}
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{desugar, normalize, parse};
    use crate::{desugar_module, LoopError};
    use bl_ast::LoopOptions;

    #[test]
    fn captured_body_binding_moves_into_a_function() {
        assert_eq!(
            desugar(
                "function log(square) { console.log(square); }
                 for (let i = 0; i < 10; i += 1) {
                     const square = i * i;
                     setTimeout(function () { log(square); }, i * 100);
                 }"
            ),
            normalize(
                "function log(square) { console.log(square); }
                 var loop = function (i) {
                     var square = i * i;
                     setTimeout(function () { log(square); }, i * 100);
                 };
                 for (var i = 0; i < 10; i += 1) loop(i);"
            ),
        );
    }

    #[test]
    fn blockless_body_captured_by_arrow() {
        assert_eq!(
            desugar("for (let i = 0; i < 10; i += 1) setTimeout(() => console.log(i), i * 100);"),
            normalize(
                "var loop = function (i) { setTimeout(() => console.log(i), i * 100); };
                 for (var i = 0; i < 10; i += 1) loop(i);"
            ),
        );
    }

    #[test]
    fn uncaptured_loops_are_flattened() {
        assert_eq!(
            desugar(
                "for (let i = 0; i < 10; i += 1) { const square = i * i; console.log(square); }
                 for (let i = 0; i < 10; i += 1) console.log(i);"
            ),
            normalize(
                "for (var i = 0; i < 10; i += 1) { var square = i * i; console.log(square); }
                 for (var i$1 = 0; i$1 < 10; i$1 += 1) console.log(i$1);"
            ),
        );
    }

    #[test]
    fn this_and_arguments_are_aliased() {
        assert_eq!(
            desugar(
                "function f() {
                     for (let i = 0; i < 10; i += 1) {
                         console.log(this, arguments, i);
                         setTimeout(function () { console.log(this, arguments, i); }, i * 100);
                     }
                 }"
            ),
            normalize(
                "function f() {
                     var arguments$1 = arguments;
                     var this$1 = this;
                     var loop = function (i) {
                         console.log(this$1, arguments$1, i);
                         setTimeout(function () { console.log(this, arguments, i); }, i * 100);
                     };
                     for (var i = 0; i < 10; i += 1) loop(i);
                 }"
            ),
        );
    }

    #[test]
    fn reassigned_counter_is_written_back() {
        assert_eq!(
            desugar(
                "var fns = [];
                 for (let i = 0; i < 10; i += 1) { fns.push(function () { return i; }); i += 1; }"
            ),
            normalize(
                "var fns = [];
                 var loop = function (i$1) {
                     fns.push(function () { return i$1; });
                     i$1 += 1;
                     i = i$1;
                 };
                 for (var i = 0; i < 10; i += 1) loop(i);"
            ),
        );
    }

    #[test]
    fn conflicting_counter_is_renamed_before_write_back() {
        assert_eq!(
            desugar(
                "var i = 'conflicting';
                 var fns = [];
                 for (let i = 0; i < 10; i += 1) { fns.push(function () { return i; }); i += 1; }"
            ),
            normalize(
                "var i = 'conflicting';
                 var fns = [];
                 var loop = function (i$2) {
                     fns.push(function () { return i$2; });
                     i$2 += 1;
                     i$1 = i$2;
                 };
                 for (var i$1 = 0; i$1 < 10; i$1 += 1) loop(i$1);"
            ),
        );
    }

    #[test]
    fn break_continue_and_return_cross_the_function_boundary() {
        assert_eq!(
            desugar(
                "function foo() {
                     for (let i = 0; i < 10; i += 1) {
                         if (i % 2) continue;
                         if (i > 5) break;
                         if (i === 'potato') return 'huh?';
                         setTimeout(() => console.log(i));
                     }
                 }"
            ),
            normalize(
                r#"function foo() {
                     var loop = function (i) {
                         if (i % 2) return;
                         if (i > 5) return "break";
                         if (i === 'potato') return { v: 'huh?' };
                         setTimeout(() => console.log(i));
                     };
                     for (var i = 0; i < 10; i += 1) {
                         var returned = loop(i);
                         if (returned === "break") break;
                         if (returned) return returned.v;
                     }
                 }"#
            ),
        );
    }

    #[test]
    fn continue_writes_back_before_returning() {
        assert_eq!(
            desugar(
                "for (let i = 0; i < 10; i++) { if (skip(i)) { i++; continue; } fns.push(() => i); }"
            ),
            normalize(
                "var loop = function (i$1) {
                     if (skip(i$1)) { i$1++; { i = i$1; return; } }
                     fns.push(() => i$1);
                     i = i$1;
                 };
                 for (var i = 0; i < 10; i++) loop(i);"
            ),
        );
    }

    #[test]
    fn body_vars_are_hoisted_in_front_of_the_function() {
        assert_eq!(
            desugar(
                "for (const x of xs) { var last = x, seen; for (var k in x) seen = k; fns.push(() => x); }
                 use(last);"
            ),
            normalize(
                "var last, seen, k;
                 var loop = function (x) { last = x; for (k in x) seen = k; fns.push(() => x); };
                 for (var x of xs) loop(x);
                 use(last);"
            ),
        );
    }

    #[test]
    fn labeled_loops_keep_their_label() {
        assert_eq!(
            desugar(
                "outer: for (const row of rows) {
                     for (const cell of row) { if (!cell) continue outer; if (cell < 0) break outer; }
                     fns.push(() => row);
                 }"
            ),
            normalize(
                r#"var loop = function (row) {
                     for (var cell of row) { if (!cell) return; if (cell < 0) return "break"; }
                     fns.push(() => row);
                 };
                 outer: for (var row of rows) {
                     var returned = loop(row);
                     if (returned === "break") break;
                 }"#
            ),
        );
    }

    #[test]
    fn flattened_declarations_are_renamed_on_collision() {
        assert_eq!(
            desugar(
                "var x = 1;
                 for (let i = 0; i < 2; i++) { let x; let y = i; x = y; }
                 for (let i = 0; i < 2; i++) { let y; log(y); }
                 log(x);"
            ),
            normalize(
                "var x = 1;
                 for (var i = 0; i < 2; i++) { var x$1 = void 0; var y = i; x$1 = y; }
                 for (var i$1 = 0; i$1 < 2; i$1++) { var y$1 = void 0; log(y$1); }
                 log(x);"
            ),
        );
    }

    #[test]
    fn nested_loops_are_rewritten_inside_out_of_the_function() {
        assert_eq!(
            desugar(
                "for (let i = 0; i < 2; i++) { for (let j = 0; j < 2; j++) fns.push(() => i + j); }"
            ),
            normalize(
                "var loop = function (i) {
                     var loop$1 = function (j) { fns.push(() => i + j); };
                     for (var j = 0; j < 2; j++) loop$1(j);
                 };
                 for (var i = 0; i < 2; i++) loop(i);"
            ),
        );
    }

    #[test]
    fn unsupported_constructs_are_reported() {
        let options = LoopOptions::default();
        let cases: [(&str, fn(&LoopError) -> bool); 7] = [
            ("for (let [a, b] of pairs) log(a);", |e| {
                matches!(e, LoopError::DestructuringHead(_))
            }),
            (
                "async function f() { for (const x of xs) { await g(x); fns.push(() => x); } }",
                |e| matches!(e, LoopError::SuspendInBody { keyword: "await", .. }),
            ),
            ("for (const x of xs) { var [a] = x; fns.push(() => a + x); }", |e| {
                matches!(e, LoopError::DestructuringVar(_))
            }),
            (
                "top: for (;;) { for (const x of xs) { fns.push(() => x); continue top; } }",
                |e| matches!(e, LoopError::OuterLabel { label, .. } if label == "top"),
            ),
            (
                "class A extends B { m() { for (let i = 0; i < 3; i++) { super.m(i); fns.push(() => i); } } }",
                |e| matches!(e, LoopError::FunctionBound { keyword: "super", .. }),
            ),
            (
                "function F() { for (let i = 0; i < 3; i++) { fns.push(() => new.target, () => i); } }",
                |e| matches!(e, LoopError::FunctionBound { keyword: "new.target", .. }),
            ),
            (
                "for (let i = 0; i < 3; i++) { while (c) { let x = i; fns.push(() => x); } }",
                |e| matches!(e, LoopError::InnerLoopCapture(_)),
            ),
        ];
        for (src, check) in cases {
            let err = desugar_module(parse(src), &options).expect_err(src);
            assert!(check(&err), "{src}: unexpected {err:?}");
        }
    }

    #[test]
    fn suspension_is_fine_when_flattening() {
        assert_eq!(
            desugar("async function f() { for (const x of xs) { await g(x); } }"),
            normalize("async function f() { for (var x of xs) { await g(x); } }"),
        );
        assert_eq!(
            desugar("class A extends B { m() { for (let i = 0; i < 3; i++) super.m(i); } }"),
            normalize("class A extends B { m() { for (var i = 0; i < 3; i++) super.m(i); } }"),
        );
    }

    #[test]
    fn destructured_body_bindings_keep_their_property_keys() {
        assert_eq!(
            desugar(
                "var x = 1;
                 for (let i = 0; i < 2; i++) { const { x } = o; log(x); }
                 log(x);"
            ),
            normalize(
                "var x = 1;
                 for (var i = 0; i < 2; i++) { var { x: x$1 } = o; log(x$1); }
                 log(x);"
            ),
        );
        assert_eq!(
            desugar("for (let i = 0; i < 9; i++) { fns.push(() => i); ({ i } = step); }"),
            normalize(
                "var loop = function (i$1) { fns.push(() => i$1); ({ i: i$1 } = step); i = i$1; };
                 for (var i = 0; i < 9; i++) loop(i);"
            ),
        );
    }

    #[test]
    fn parenthesized_and_loop_head_writes_are_written_back() {
        assert_eq!(
            desugar("for (let i = 0; i < 9; i++) { fns.push(() => i); (i)++; }"),
            normalize(
                "var loop = function (i$1) { fns.push(() => i$1); (i$1)++; i = i$1; };
                 for (var i = 0; i < 9; i++) loop(i);"
            ),
        );
        assert_eq!(
            desugar("for (let i = 0; i < 30; i++) { fns.push(() => i); for (i of [20]) {} }"),
            normalize(
                "var loop = function (i$1) { fns.push(() => i$1); for (i$1 of [20]) {} i = i$1; };
                 for (var i = 0; i < 30; i++) loop(i);"
            ),
        );
    }

    #[test]
    fn shorthand_arguments_uses_the_alias() {
        assert_eq!(
            desugar(
                "function f() { for (let i = 0; i < 2; i++) { g({ arguments }); fns.push(() => i); } }"
            ),
            normalize(
                "function f() {
                     var arguments$1 = arguments;
                     var loop = function (i) { g({ arguments: arguments$1 }); fns.push(() => i); };
                     for (var i = 0; i < 2; i++) loop(i);
                 }"
            ),
        );
    }

    #[test]
    fn inner_while_and_var_loops_are_flattened_with_the_body() {
        assert_eq!(
            desugar(
                "for (let i = 0; i < 3; i++) {
                     while (c) { let x = i; log(x); }
                     do { let y; y = i; } while (c);
                 }"
            ),
            normalize(
                "for (var i = 0; i < 3; i++) {
                     while (c) { var x = i; log(x); }
                     do { var y = void 0; y = i; } while (c);
                 }"
            ),
        );
        assert_eq!(
            desugar(
                "for (let i = 0; i < 3; i++) {
                     fns.push(() => i);
                     for (var k = 0; k < 2; k++) { let y; log(y, k); }
                 }"
            ),
            normalize(
                "var k;
                 var loop = function (i) {
                     fns.push(() => i);
                     for (k = 0; k < 2; k++) { var y = void 0; log(y, k); }
                 };
                 for (var i = 0; i < 3; i++) loop(i);"
            ),
        );
    }

    #[test]
    fn options_rename_generated_identifiers() {
        let options = LoopOptions {
            function_name: "body".into(),
            result_name: "r".into(),
            break_sentinel: "stop".into(),
            return_key: "value".into(),
        };
        let module = desugar_module(
            parse("function f() { for (const x of xs) { if (x) break; if (!x) return x; fns.push(() => x); } }"),
            &options,
        )
        .unwrap();
        assert_eq!(
            crate::test_utils::emit(&module),
            normalize(
                r#"function f() {
                     var body = function (x) {
                         if (x) return "stop";
                         if (!x) return { value: x };
                         fns.push(() => x);
                     };
                     for (var x of xs) {
                         var r = body(x);
                         if (r === "stop") break;
                         if (r) return r.value;
                     }
                 }"#
            ),
        );
    }
}
