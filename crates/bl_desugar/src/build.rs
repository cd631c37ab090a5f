//! Small constructors for the statements and expressions the rewrite emits.

use swc_common::{Span, SyntaxContext, DUMMY_SP};
use swc_ecma_ast as ast;

pub(crate) fn ident(name: &str, span: Span) -> ast::Ident {
    ast::Ident::new_no_ctxt(name.into(), span)
}

pub(crate) fn ident_expr(name: &str, span: Span) -> Box<ast::Expr> {
    Box::new(ast::Expr::Ident(ident(name, span)))
}

pub(crate) fn str_lit(value: &str, span: Span) -> Box<ast::Expr> {
    Box::new(ast::Expr::Lit(ast::Lit::Str(ast::Str {
        span,
        value: value.into(),
        raw: None,
    })))
}

/// `void 0`
pub(crate) fn undefined(span: Span) -> Box<ast::Expr> {
    Box::new(ast::Expr::Unary(ast::UnaryExpr {
        span,
        op: ast::UnaryOp::Void,
        arg: Box::new(ast::Expr::Lit(ast::Lit::Num(ast::Number {
            span,
            value: 0.0,
            raw: None,
        }))),
    }))
}

pub(crate) fn block(stmts: Vec<ast::Stmt>) -> ast::Stmt {
    ast::Stmt::Block(ast::BlockStmt {
        span: DUMMY_SP,
        ctxt: SyntaxContext::empty(),
        stmts,
    })
}

pub(crate) fn expr_stmt(expr: Box<ast::Expr>) -> ast::Stmt {
    ast::Stmt::Expr(ast::ExprStmt {
        span: expr_span(&expr),
        expr,
    })
}

/// `var a = init, b;`
pub(crate) fn var_decl(
    span: Span,
    decls: impl IntoIterator<Item = (String, Option<Box<ast::Expr>>)>,
) -> ast::VarDecl {
    ast::VarDecl {
        span,
        ctxt: SyntaxContext::empty(),
        kind: ast::VarDeclKind::Var,
        declare: false,
        decls: decls
            .into_iter()
            .map(|(name, init)| ast::VarDeclarator {
                span,
                name: ast::Pat::Ident(ident(&name, span).into()),
                init,
                definite: false,
            })
            .collect(),
    }
}

pub(crate) fn var_stmt(
    span: Span,
    decls: impl IntoIterator<Item = (String, Option<Box<ast::Expr>>)>,
) -> ast::Stmt {
    ast::Stmt::Decl(ast::Decl::Var(Box::new(var_decl(span, decls))))
}

/// `target = value`
pub(crate) fn assign(target: &str, value: Box<ast::Expr>, span: Span) -> Box<ast::Expr> {
    Box::new(ast::Expr::Assign(ast::AssignExpr {
        span,
        op: ast::AssignOp::Assign,
        left: ast::AssignTarget::Simple(ast::SimpleAssignTarget::Ident(
            ident(target, span).into(),
        )),
        right: value,
    }))
}

/// A single expression, or a comma sequence of several.
pub(crate) fn sequence(mut exprs: Vec<Box<ast::Expr>>, span: Span) -> Option<Box<ast::Expr>> {
    match exprs.len() {
        0 => None,
        1 => exprs.pop(),
        _ => Some(Box::new(ast::Expr::Seq(ast::SeqExpr { span, exprs }))),
    }
}

pub(crate) fn return_stmt(arg: Option<Box<ast::Expr>>, span: Span) -> ast::Stmt {
    ast::Stmt::Return(ast::ReturnStmt { span, arg })
}

pub(crate) fn break_stmt(span: Span) -> ast::Stmt {
    ast::Stmt::Break(ast::BreakStmt { span, label: None })
}

pub(crate) fn if_stmt(test: Box<ast::Expr>, cons: ast::Stmt, span: Span) -> ast::Stmt {
    ast::Stmt::If(ast::IfStmt {
        span,
        test,
        cons: Box::new(cons),
        alt: None,
    })
}

/// `left === right`
pub(crate) fn strict_eq(left: Box<ast::Expr>, right: Box<ast::Expr>, span: Span) -> Box<ast::Expr> {
    Box::new(ast::Expr::Bin(ast::BinExpr {
        span,
        op: ast::BinaryOp::EqEqEq,
        left,
        right,
    }))
}

/// `obj.prop`
pub(crate) fn member(obj: Box<ast::Expr>, prop: &str, span: Span) -> Box<ast::Expr> {
    Box::new(ast::Expr::Member(ast::MemberExpr {
        span,
        obj,
        prop: ast::MemberProp::Ident(ast::IdentName::new(prop.into(), span)),
    }))
}

/// `{ key: value }`
pub(crate) fn object(key: &str, value: Box<ast::Expr>, span: Span) -> Box<ast::Expr> {
    Box::new(ast::Expr::Object(ast::ObjectLit {
        span,
        props: vec![ast::PropOrSpread::Prop(Box::new(key_value(key, value, span)))],
    }))
}

/// `key: value` inside an object literal.
pub(crate) fn key_value(key: &str, value: Box<ast::Expr>, span: Span) -> ast::Prop {
    ast::Prop::KeyValue(ast::KeyValueProp {
        key: prop_name(key, span),
        value,
    })
}

pub(crate) fn prop_name(key: &str, span: Span) -> ast::PropName {
    ast::PropName::Ident(ast::IdentName::new(key.into(), span))
}

/// `callee(args...)`
pub(crate) fn call(callee: &str, args: &[String], span: Span) -> Box<ast::Expr> {
    Box::new(ast::Expr::Call(ast::CallExpr {
        span,
        ctxt: SyntaxContext::empty(),
        callee: ast::Callee::Expr(ident_expr(callee, span)),
        args: args
            .iter()
            .map(|arg| ast::ExprOrSpread {
                spread: None,
                expr: ident_expr(arg, span),
            })
            .collect(),
        type_args: None,
    }))
}

/// `function (params) { stmts }`
pub(crate) fn fn_expr(params: &[String], stmts: Vec<ast::Stmt>, span: Span) -> Box<ast::Expr> {
    Box::new(ast::Expr::Fn(ast::FnExpr {
        ident: None,
        function: Box::new(ast::Function {
            params: params
                .iter()
                .map(|name| ast::Param {
                    span,
                    decorators: vec![],
                    pat: ast::Pat::Ident(ident(name, span).into()),
                })
                .collect(),
            decorators: vec![],
            span,
            ctxt: SyntaxContext::empty(),
            body: Some(ast::BlockStmt {
                span,
                ctxt: SyntaxContext::empty(),
                stmts,
            }),
            is_generator: false,
            is_async: false,
            type_params: None,
            return_type: None,
        }),
    }))
}

fn expr_span(expr: &ast::Expr) -> Span {
    use swc_common::Spanned;
    expr.span()
}
