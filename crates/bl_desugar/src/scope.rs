//! Lexical scope facts over the SWC AST.
//!
//! Answers "which names does this scope declare" for the node kinds that open
//! a scope: blocks (`let`/`const`/`class`/`function`), functions and arrows
//! (parameters plus hoisted `var`s), loop heads and catch clauses.

use std::collections::HashSet;

use swc_ecma_ast as ast;
use swc_ecma_visit::{Visit, VisitWith};

/// Whether a declaration introduces a block-scoped binding.
pub fn is_block_scoped(decl: &ast::VarDecl) -> bool {
    matches!(decl.kind, ast::VarDeclKind::Let | ast::VarDeclKind::Const)
}

/// Names bound by a pattern, in source order. Default values and computed
/// keys are not descended into.
pub fn binding_names(pat: &ast::Pat) -> Vec<String> {
    let mut collector = BindingCollector::default();
    pat.visit_with(&mut collector);
    collector.names
}

/// Names bound by every declarator of `decl`.
pub fn declared_names(decl: &ast::VarDecl) -> Vec<String> {
    decl.decls
        .iter()
        .flat_map(|d| binding_names(&d.name))
        .collect()
}

/// Block-scoped names declared directly in a statement list.
pub fn lexical_names(stmts: &[ast::Stmt]) -> Vec<String> {
    let mut names = Vec::new();
    for stmt in stmts {
        match stmt {
            ast::Stmt::Decl(ast::Decl::Var(var)) if is_block_scoped(var) => {
                names.extend(declared_names(var));
            }
            ast::Stmt::Decl(ast::Decl::Class(class)) => names.push(class.ident.sym.to_string()),
            ast::Stmt::Decl(ast::Decl::Fn(func)) => names.push(func.ident.sym.to_string()),
            _ => {}
        }
    }
    names
}

/// `var` names hoisted out of a statement list, without entering nested functions.
pub fn hoisted_var_names(stmts: &[ast::Stmt]) -> Vec<String> {
    let mut collector = VarCollector::default();
    for stmt in stmts {
        stmt.visit_with(&mut collector);
    }
    collector.names
}

/// Everything a function-like scope binds: parameters, hoisted `var`s and the
/// declarations at the top of its body.
pub fn function_scope_names<'a>(
    params: impl IntoIterator<Item = &'a ast::Pat>,
    body: Option<&ast::BlockStmt>,
) -> HashSet<String> {
    let mut names: HashSet<String> = params.into_iter().flat_map(binding_names).collect();
    if let Some(body) = body {
        names.extend(hoisted_var_names(&body.stmts));
        names.extend(lexical_names(&body.stmts));
    }
    names
}

pub fn function_names(function: &ast::Function) -> HashSet<String> {
    function_scope_names(function.params.iter().map(|p| &p.pat), function.body.as_ref())
}

pub fn arrow_names(arrow: &ast::ArrowExpr) -> HashSet<String> {
    let body = match &*arrow.body {
        ast::BlockStmtOrExpr::BlockStmt(block) => Some(block),
        ast::BlockStmtOrExpr::Expr(_) => None,
    };
    function_scope_names(arrow.params.iter(), body)
}

pub fn constructor_names(ctor: &ast::Constructor) -> HashSet<String> {
    let mut params = Vec::new();
    for param in &ctor.params {
        match param {
            ast::ParamOrTsParamProp::Param(p) => params.push(p.pat.clone()),
            ast::ParamOrTsParamProp::TsParamProp(prop) => match &prop.param {
                ast::TsParamPropParam::Ident(id) => params.push(ast::Pat::Ident(id.clone())),
                ast::TsParamPropParam::Assign(assign) => params.push((*assign.left).clone()),
            },
        }
    }
    function_scope_names(params.iter(), ctor.body.as_ref())
}

pub fn setter_names(setter: &ast::SetterProp) -> HashSet<String> {
    function_scope_names(std::iter::once(&*setter.param), setter.body.as_ref())
}

pub fn getter_names(getter: &ast::GetterProp) -> HashSet<String> {
    function_scope_names(std::iter::empty::<&ast::Pat>(), getter.body.as_ref())
}

/// Names a loop head binds for the duration of the loop (`let`/`const` only).
pub fn loop_head_names(stmt: &ast::Stmt) -> Vec<String> {
    let decl = match stmt {
        ast::Stmt::For(f) => match &f.init {
            Some(ast::VarDeclOrExpr::VarDecl(decl)) => Some(&**decl),
            _ => None,
        },
        ast::Stmt::ForIn(f) => head_decl(&f.left),
        ast::Stmt::ForOf(f) => head_decl(&f.left),
        _ => None,
    };
    match decl {
        Some(decl) if is_block_scoped(decl) => declared_names(decl),
        _ => Vec::new(),
    }
}

pub fn head_decl(head: &ast::ForHead) -> Option<&ast::VarDecl> {
    match head {
        ast::ForHead::VarDecl(decl) => Some(decl),
        _ => None,
    }
}

pub fn catch_names(clause: &ast::CatchClause) -> Vec<String> {
    clause.param.as_ref().map(binding_names).unwrap_or_default()
}

#[derive(Default)]
struct BindingCollector {
    names: Vec<String>,
}

impl Visit for BindingCollector {
    fn visit_binding_ident(&mut self, ident: &ast::BindingIdent) {
        self.names.push(ident.id.sym.to_string());
    }

    fn visit_expr(&mut self, _: &ast::Expr) {}

    fn visit_prop_name(&mut self, _: &ast::PropName) {}
}

#[derive(Default)]
struct VarCollector {
    names: Vec<String>,
}

impl Visit for VarCollector {
    fn visit_var_decl(&mut self, decl: &ast::VarDecl) {
        if decl.kind == ast::VarDeclKind::Var {
            for name in declared_names(decl) {
                if !self.names.contains(&name) {
                    self.names.push(name);
                }
            }
        }
    }

    fn visit_expr(&mut self, _: &ast::Expr) {}
    fn visit_function(&mut self, _: &ast::Function) {}
    fn visit_class(&mut self, _: &ast::Class) {}
}
