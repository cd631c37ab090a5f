//! Capture analysis for block-scoped loops.
//!
//! Walks the head and body of one loop with a stack of lexical frames and
//! records which per-iteration bindings are referenced from nested closures,
//! whether `this`/`arguments` would move into an extracted function, and which
//! loop variables the body reassigns.

use std::collections::{BTreeSet, HashMap, HashSet};

use swc_common::Span;
use swc_ecma_ast as ast;
use swc_ecma_visit::{Visit, VisitWith};

use crate::scope;

/// What a loop's body does with its per-iteration bindings.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CaptureRecord {
    /// A loop variable is referenced from a nested function in the body.
    pub variable_captured: bool,
    /// A `let`/`const` declared directly in the body is referenced from a nested function.
    pub body_binding_captured: bool,
    /// A `let`/`const` declared in an inner `while`, `do-while` or `var`-headed
    /// loop is referenced from a nested function.
    pub inner_loop_binding_captured: bool,
    /// `this` is used at a level that would move into an extracted function.
    pub this_captured: bool,
    /// Same as `this_captured`, for `arguments`.
    pub arguments_captured: bool,
    /// Loop variables assigned or updated inside the body.
    pub reassigned: BTreeSet<String>,
    /// Per-iteration `let`/`const` names declared in the body and how often.
    pub body_declarations: HashMap<String, usize>,
    /// Names referenced in the loop that resolve to a binding outside it.
    pub free_names: HashSet<String>,
    /// `var` names declared in the body, in source order.
    pub body_vars: Vec<String>,
    /// First `yield`/`await` that belongs to the enclosing function.
    pub suspension: Option<(&'static str, Span)>,
    /// First `super` or `new.target` that belongs to the enclosing function.
    pub function_bound: Option<(&'static str, Span)>,
    /// First destructuring `var` declaration in the body.
    pub destructuring_var: Option<Span>,
}

impl CaptureRecord {
    /// The body has to run in a function of its own to give each iteration
    /// fresh bindings.
    pub fn needs_extraction(&self) -> bool {
        self.variable_captured || self.body_binding_captured
    }

    /// The extracted function must copy its parameter back to the loop counter.
    pub fn needs_write_back(&self, name: &str) -> bool {
        self.needs_extraction() && self.reassigned.contains(name)
    }
}

/// Analyze a loop given its head declaration, the expressions of its head and its body.
pub fn analyze(decl: &ast::VarDecl, head: &[&ast::Expr], body: &ast::Stmt) -> CaptureRecord {
    let mut analyzer = CaptureAnalyzer::default();

    let loop_vars = scope::declared_names(decl)
        .into_iter()
        .map(|name| (name, Origin::LoopVar))
        .collect();
    analyzer.frames.push(Frame {
        kind: FrameKind::Block,
        names: loop_vars,
    });

    decl.visit_with(&mut analyzer);
    for expr in head {
        expr.visit_with(&mut analyzer);
    }

    analyzer.in_body = true;
    body.visit_with(&mut analyzer);

    analyzer.record
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    LoopVar,
    /// `let`/`const` declared directly in the body (not in a nested loop).
    Iteration,
    /// `let`/`const` declared in the body of an inner loop that is not
    /// rewritten on its own, so it ends up flattened with this one.
    InnerLoop,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Block,
    Arrow,
    Function,
}

struct Frame {
    kind: FrameKind,
    names: HashMap<String, Origin>,
}

#[derive(Default)]
struct CaptureAnalyzer {
    frames: Vec<Frame>,
    record: CaptureRecord,
    in_body: bool,
    loop_depth: usize,
    inner_loop_depth: usize,
}

impl CaptureAnalyzer {
    fn in_closure(&self) -> bool {
        self.frames.iter().any(|f| f.kind != FrameKind::Block)
    }

    fn in_ordinary_function(&self) -> bool {
        self.frames.iter().any(|f| f.kind == FrameKind::Function)
    }

    fn block_origin(&self) -> Origin {
        if !self.in_body || self.loop_depth > 0 || self.in_closure() {
            Origin::Local
        } else if self.inner_loop_depth > 0 {
            Origin::InnerLoop
        } else {
            Origin::Iteration
        }
    }

    fn with_frame(
        &mut self,
        kind: FrameKind,
        names: impl IntoIterator<Item = String>,
        visit: impl FnOnce(&mut Self),
    ) {
        let origin = match kind {
            FrameKind::Block => self.block_origin(),
            FrameKind::Arrow | FrameKind::Function => Origin::Local,
        };
        let mut frame = Frame {
            kind,
            names: HashMap::new(),
        };
        for name in names {
            let per_iteration = matches!(origin, Origin::Iteration | Origin::InnerLoop);
            if per_iteration && !frame.names.contains_key(&name) {
                *self.record.body_declarations.entry(name.clone()).or_default() += 1;
            }
            frame.names.insert(name, origin);
        }
        self.frames.push(frame);
        visit(self);
        self.frames.pop();
    }

    /// Resolve `name` from the innermost frame outwards. Returns the origin and
    /// whether a closure lies between the reference and the declaration.
    fn resolve(&self, name: &str) -> Option<(Origin, bool)> {
        for (depth, frame) in self.frames.iter().enumerate().rev() {
            let implicit_arguments = name == "arguments" && frame.kind == FrameKind::Function;
            if let Some(origin) = frame.names.get(name).copied() {
                let crossed = self.frames[depth + 1..]
                    .iter()
                    .any(|f| f.kind != FrameKind::Block);
                return Some((origin, crossed));
            }
            if implicit_arguments {
                return Some((Origin::Local, false));
            }
        }
        None
    }

    fn reference(&mut self, name: &str) {
        match self.resolve(name) {
            Some((origin, true)) if self.in_body => match origin {
                Origin::LoopVar => self.record.variable_captured = true,
                Origin::Iteration => self.record.body_binding_captured = true,
                Origin::InnerLoop => self.record.inner_loop_binding_captured = true,
                Origin::Local => {}
            },
            Some(_) => {}
            None => {
                if name == "arguments" && self.in_body && !self.in_ordinary_function() {
                    self.record.arguments_captured = true;
                }
                self.record.free_names.insert(name.to_string());
            }
        }
    }

    fn write(&mut self, name: &str) {
        if !self.in_body {
            return;
        }
        if let Some((Origin::LoopVar, _)) = self.resolve(name) {
            self.record.reassigned.insert(name.to_string());
        }
    }

    /// A nested block-scoped loop, rewritten later on its own.
    fn nested_loop(&mut self, head: Vec<String>, visit: impl FnOnce(&mut Self)) {
        self.loop_depth += 1;
        self.with_frame(FrameKind::Block, head, visit);
        self.loop_depth -= 1;
    }

    /// A nested loop without a block-scoped head. Its body is flattened
    /// together with this loop's.
    fn inner_loop(&mut self, visit: impl FnOnce(&mut Self)) {
        self.inner_loop_depth += 1;
        visit(self);
        self.inner_loop_depth -= 1;
    }

    fn loop_over(&mut self, left: &ast::ForHead, visit: impl FnOnce(&mut Self)) {
        if let ast::ForHead::Pat(pat) = left {
            for name in assigned_names(pat) {
                self.write(&name);
            }
        }
        let head = head_names(left);
        if head.is_empty() {
            self.inner_loop(visit);
        } else {
            self.nested_loop(head, visit);
        }
    }

    fn function_bound(&mut self, keyword: &'static str, span: Span) {
        if self.in_body && !self.in_ordinary_function() {
            self.record.function_bound.get_or_insert((keyword, span));
        }
    }
}

impl Visit for CaptureAnalyzer {
    fn visit_ident(&mut self, ident: &ast::Ident) {
        self.reference(&ident.sym);
    }

    fn visit_this_expr(&mut self, _: &ast::ThisExpr) {
        if self.in_body && !self.in_ordinary_function() {
            self.record.this_captured = true;
        }
    }

    fn visit_assign_expr(&mut self, expr: &ast::AssignExpr) {
        match &expr.left {
            ast::AssignTarget::Simple(ast::SimpleAssignTarget::Ident(target)) => {
                self.write(&target.id.sym);
            }
            ast::AssignTarget::Simple(ast::SimpleAssignTarget::Paren(paren)) => {
                if let ast::Expr::Ident(target) = unparen(&paren.expr) {
                    self.write(&target.sym);
                }
            }
            ast::AssignTarget::Pat(pat) => {
                for name in assigned_names(&ast::Pat::from(pat.clone())) {
                    self.write(&name);
                }
            }
            _ => {}
        }
        expr.visit_children_with(self);
    }

    fn visit_update_expr(&mut self, expr: &ast::UpdateExpr) {
        if let ast::Expr::Ident(target) = unparen(&expr.arg) {
            self.write(&target.sym);
        }
        expr.visit_children_with(self);
    }

    fn visit_var_decl(&mut self, decl: &ast::VarDecl) {
        if self.in_body && decl.kind == ast::VarDeclKind::Var && !self.in_closure() {
            for declarator in &decl.decls {
                match &declarator.name {
                    ast::Pat::Ident(id) => {
                        let name = id.id.sym.to_string();
                        if !self.record.body_vars.contains(&name) {
                            self.record.body_vars.push(name);
                        }
                    }
                    _ => {
                        self.record.destructuring_var.get_or_insert(decl.span);
                    }
                }
            }
        }
        decl.visit_children_with(self);
    }

    fn visit_block_stmt(&mut self, block: &ast::BlockStmt) {
        let names = scope::lexical_names(&block.stmts);
        self.with_frame(FrameKind::Block, names, |this| block.visit_children_with(this));
    }

    fn visit_for_stmt(&mut self, stmt: &ast::ForStmt) {
        match &stmt.init {
            Some(ast::VarDeclOrExpr::VarDecl(decl)) if scope::is_block_scoped(decl) => {
                let head = scope::declared_names(decl);
                self.nested_loop(head, |this| stmt.visit_children_with(this));
            }
            _ => self.inner_loop(|this| stmt.visit_children_with(this)),
        }
    }

    fn visit_for_in_stmt(&mut self, stmt: &ast::ForInStmt) {
        self.loop_over(&stmt.left, |this| stmt.visit_children_with(this));
    }

    fn visit_for_of_stmt(&mut self, stmt: &ast::ForOfStmt) {
        if stmt.is_await && self.in_body && !self.in_closure() {
            self.record.suspension.get_or_insert(("await", stmt.span));
        }
        self.loop_over(&stmt.left, |this| stmt.visit_children_with(this));
    }

    fn visit_while_stmt(&mut self, stmt: &ast::WhileStmt) {
        self.inner_loop(|this| stmt.visit_children_with(this));
    }

    fn visit_do_while_stmt(&mut self, stmt: &ast::DoWhileStmt) {
        self.inner_loop(|this| stmt.visit_children_with(this));
    }

    fn visit_catch_clause(&mut self, clause: &ast::CatchClause) {
        let names = scope::catch_names(clause);
        self.frames.push(Frame {
            kind: FrameKind::Block,
            names: names.into_iter().map(|n| (n, Origin::Local)).collect(),
        });
        clause.visit_children_with(self);
        self.frames.pop();
    }

    fn visit_fn_expr(&mut self, expr: &ast::FnExpr) {
        let own_name = expr.ident.iter().map(|id| id.sym.to_string());
        self.frames.push(Frame {
            kind: FrameKind::Block,
            names: own_name.map(|n| (n, Origin::Local)).collect(),
        });
        expr.function.visit_with(self);
        self.frames.pop();
    }

    fn visit_function(&mut self, function: &ast::Function) {
        let names = scope::function_names(function);
        self.with_frame(FrameKind::Function, names, |this| {
            function.visit_children_with(this)
        });
    }

    fn visit_arrow_expr(&mut self, arrow: &ast::ArrowExpr) {
        let names = scope::arrow_names(arrow);
        self.with_frame(FrameKind::Arrow, names, |this| arrow.visit_children_with(this));
    }

    fn visit_constructor(&mut self, ctor: &ast::Constructor) {
        let names = scope::constructor_names(ctor);
        self.with_frame(FrameKind::Function, names, |this| ctor.visit_children_with(this));
    }

    fn visit_getter_prop(&mut self, getter: &ast::GetterProp) {
        let names = scope::getter_names(getter);
        self.with_frame(FrameKind::Function, names, |this| {
            getter.visit_children_with(this)
        });
    }

    fn visit_setter_prop(&mut self, setter: &ast::SetterProp) {
        let names = scope::setter_names(setter);
        self.with_frame(FrameKind::Function, names, |this| {
            setter.visit_children_with(this)
        });
    }

    fn visit_class(&mut self, class: &ast::Class) {
        self.with_frame(FrameKind::Function, Vec::new(), |this| {
            class.visit_children_with(this)
        });
    }

    fn visit_yield_expr(&mut self, expr: &ast::YieldExpr) {
        if self.in_body && !self.in_closure() {
            self.record.suspension.get_or_insert(("yield", expr.span));
        }
        expr.visit_children_with(self);
    }

    fn visit_await_expr(&mut self, expr: &ast::AwaitExpr) {
        if self.in_body && !self.in_closure() {
            self.record.suspension.get_or_insert(("await", expr.span));
        }
        expr.visit_children_with(self);
    }

    fn visit_super(&mut self, sup: &ast::Super) {
        self.function_bound("super", sup.span);
    }

    fn visit_meta_prop_expr(&mut self, expr: &ast::MetaPropExpr) {
        if matches!(expr.kind, ast::MetaPropKind::NewTarget) {
            self.function_bound("new.target", expr.span);
        }
    }

    fn visit_labeled_stmt(&mut self, stmt: &ast::LabeledStmt) {
        stmt.body.visit_with(self);
    }

    fn visit_break_stmt(&mut self, _: &ast::BreakStmt) {}
    fn visit_continue_stmt(&mut self, _: &ast::ContinueStmt) {}
}

fn head_names(head: &ast::ForHead) -> Vec<String> {
    match scope::head_decl(head) {
        Some(decl) if scope::is_block_scoped(decl) => scope::declared_names(decl),
        _ => Vec::new(),
    }
}

fn unparen(expr: &ast::Expr) -> &ast::Expr {
    match expr {
        ast::Expr::Paren(paren) => unparen(&paren.expr),
        _ => expr,
    }
}

fn assigned_names(pat: &ast::Pat) -> Vec<String> {
    let mut targets = AssignedNames::default();
    pat.visit_with(&mut targets);
    targets.names
}

/// Identifiers written by an assignment pattern. Default values are skipped.
#[derive(Default)]
struct AssignedNames {
    names: Vec<String>,
}

impl Visit for AssignedNames {
    fn visit_binding_ident(&mut self, ident: &ast::BindingIdent) {
        self.names.push(ident.id.sym.to_string());
    }

    fn visit_pat(&mut self, pat: &ast::Pat) {
        match pat {
            ast::Pat::Expr(expr) => {
                if let ast::Expr::Ident(target) = unparen(expr) {
                    self.names.push(target.sym.to_string());
                }
            }
            _ => pat.visit_children_with(self),
        }
    }

    fn visit_expr(&mut self, _: &ast::Expr) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{first_candidate, loop_view};
    use crate::test_utils::parse;

    fn analyze_src(src: &str) -> CaptureRecord {
        let module = parse(src);
        let stmt = first_candidate(&module).expect("a block-scoped loop");
        let view = loop_view(&stmt).expect("a loop view");
        analyze(view.decl, &view.head, view.body)
    }

    /// Analyze the first loop of `src` placed in a derived class's constructor.
    fn analyze_in_constructor(src: &str) -> CaptureRecord {
        let module = parse(&format!("class A extends B {{ constructor() {{ {src} }} }}"));
        let Some(ast::ModuleItem::Stmt(ast::Stmt::Decl(ast::Decl::Class(class)))) =
            module.body.first()
        else {
            panic!("expected the wrapper class");
        };
        let Some(ast::ClassMember::Constructor(ctor)) = class.class.body.first() else {
            panic!("expected the wrapper constructor");
        };
        let body = ctor.body.as_ref().expect("constructor body");
        let stmt = first_candidate(body).expect("a block-scoped loop");
        let view = loop_view(&stmt).expect("a loop view");
        analyze(view.decl, &view.head, view.body)
    }

    #[test]
    fn plain_loop_captures_nothing() {
        let record = analyze_src("for (let i = 0; i < 10; i += 1) console.log(i);");
        assert!(!record.needs_extraction());
        assert!(!record.this_captured);
        assert!(record.reassigned.is_empty());
        assert!(record.free_names.contains("console"));
    }

    #[test]
    fn closure_captures_loop_variable() {
        let record =
            analyze_src("for (let i = 0; i < 10; i += 1) setTimeout(() => console.log(i), i * 100);");
        assert!(record.variable_captured);
        assert!(record.needs_extraction());
    }

    #[test]
    fn closure_captures_body_binding() {
        let record = analyze_src(
            "for (let i = 0; i < 10; i += 1) {
                const square = i * i;
                setTimeout(function () { log(square); }, i * 100);
            }",
        );
        assert!(!record.variable_captured);
        assert!(record.body_binding_captured);
        assert_eq!(record.body_declarations.get("square"), Some(&1));
    }

    #[test]
    fn shadowed_parameter_is_not_a_capture() {
        let record = analyze_src("for (let i = 0; i < 3; i++) { f(function (i) { return i; }); }");
        assert!(!record.needs_extraction());
    }

    #[test]
    fn this_and_arguments_follow_arrows_but_not_functions() {
        let record = analyze_src(
            "for (let i = 0; i < 3; i++) { h(function () { return this + arguments[0]; }); }",
        );
        assert!(!record.this_captured);
        assert!(!record.arguments_captured);

        let record = analyze_src("for (let i = 0; i < 3; i++) { h(() => [this, arguments]); }");
        assert!(record.this_captured);
        assert!(record.arguments_captured);
    }

    #[test]
    fn writes_are_recorded_for_loop_variables_only() {
        let record = analyze_src(
            "for (let i = 0, n = 3; i < n; i++) { fns.push(() => i); i += 1; [n] = [4]; other = 1; }",
        );
        let expected: BTreeSet<String> = ["i", "n"].iter().map(|s| s.to_string()).collect();
        assert_eq!(record.reassigned, expected);
        assert!(record.needs_write_back("i"));
    }

    #[test]
    fn parenthesized_and_loop_head_writes_are_recorded() {
        let record = analyze_src("for (let i = 0; i < 9; i++) { fns.push(() => i); (i)++; }");
        assert!(record.needs_write_back("i"));

        let record = analyze_src("for (let i = 0; i < 9; i++) { fns.push(() => i); (i) += 2; }");
        assert!(record.needs_write_back("i"));

        let record = analyze_src(
            "for (let i = 0, n = 3; i < 30; i++) { fns.push(() => i); for (i of [20]) {} for (n in o) {} }",
        );
        let expected: BTreeSet<String> = ["i", "n"].iter().map(|s| s.to_string()).collect();
        assert_eq!(record.reassigned, expected);

        let record = analyze_src("for (let i = 0; i < 9; i++) { fns.push(() => i); [(i)] = [5]; }");
        assert!(record.needs_write_back("i"));
    }

    #[test]
    fn super_and_new_target_belong_to_the_enclosing_function() {
        let record = analyze_in_constructor("for (let i = 0; i < 3; i++) { super.m(i); }");
        assert!(matches!(record.function_bound, Some(("super", _))));

        let record = analyze_in_constructor("for (let i = 0; i < 3; i++) { h(() => new.target); }");
        assert!(matches!(record.function_bound, Some(("new.target", _))));

        let record = analyze_in_constructor(
            "for (let i = 0; i < 3; i++) { h({ m() { return super.m(); } }, function () { return new.target; }); }",
        );
        assert!(record.function_bound.is_none());
    }

    #[test]
    fn inner_while_bindings_are_tracked_with_the_body() {
        let record = analyze_src("for (let i = 0; i < 3; i++) { while (c) { let x = i; log(x); } }");
        assert!(!record.needs_extraction());
        assert!(!record.inner_loop_binding_captured);
        assert_eq!(record.body_declarations.get("x"), Some(&1));

        let record = analyze_src(
            "for (let i = 0; i < 3; i++) { for (var k = 0; k < 2; k++) { const x = k; fns.push(() => x); } }",
        );
        assert!(record.inner_loop_binding_captured);
        assert!(!record.needs_extraction());
    }

    #[test]
    fn update_in_loop_head_is_not_a_body_write() {
        let record = analyze_src("for (let i = 0; i < 3; i++) { fns.push(() => i); }");
        assert!(record.reassigned.is_empty());
    }

    #[test]
    fn suspension_in_body_is_reported() {
        let record = analyze_src("for (const x of xs) { await g(x); h(async () => await x); }");
        assert!(matches!(record.suspension, Some(("await", _))));
        let record = analyze_src("for (const x of xs) { h(async () => await x); }");
        assert!(record.suspension.is_none());
    }

    #[test]
    fn nested_loop_bindings_belong_to_the_nested_loop() {
        let record = analyze_src(
            "for (let i = 0; i < 3; i++) { for (let j = 0; j < 3; j++) { const k = j; fns.push(() => k + j); } }",
        );
        assert!(!record.needs_extraction());
        assert!(record.body_declarations.is_empty());
    }

    #[test]
    fn body_vars_and_destructuring_are_reported() {
        let record = analyze_src("for (const x of xs) { var total = x; var [a] = x; h(() => x); }");
        assert_eq!(record.body_vars, ["total"]);
        assert!(record.destructuring_var.is_some());
    }
}
