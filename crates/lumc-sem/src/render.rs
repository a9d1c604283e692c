//! Textual form: `(<NodeKind> attr=... )`, used only by tests as a
//! string-equality oracle for end-to-end scenarios. Attribute order is
//! fixed per kind; this is not a stability contract for callers, only for
//! this crate's own test suite.

use crate::ast::{ExprId, ExprKind, SourceFile};
use std::fmt::Write;

/// Renders `id` and everything it contains. Every node carries `range=`; a
/// node that has already been assigned a type (post-apply) also carries
/// `type="..."` — before `apply` has run, that attribute is simply absent
/// rather than printed as an empty or placeholder value.
pub fn render_expr(source: &SourceFile, id: ExprId) -> String {
    let expr = &source.exprs[id];
    let range = format!("range={}..{}", expr.span.start, expr.span.end);
    let ty_attr = expr.ty().map(|ty| format!(" type=\"{}\"", ty)).unwrap_or_default();

    let mut out = String::new();
    match &expr.kind {
        ExprKind::IntegerLiteral(value) => {
            write!(out, "(IntegerLiteral {range} value={value}{ty_attr})").unwrap();
        }
        ExprKind::DeclRef(target) => {
            write!(out, "(DeclRef {range} decl={}{ty_attr})", target.index()).unwrap();
        }
        ExprKind::OverloadedDeclRef(overloaded) => {
            let targets = overloaded
                .targets
                .iter()
                .map(|t| t.index().to_string())
                .collect::<Vec<_>>()
                .join(",");
            write!(out, "(OverloadedDeclRef {range} targets=[{targets}]{ty_attr})").unwrap();
        }
        ExprKind::UnresolvedDeclRef(name) => {
            write!(out, "(UnresolvedDeclRef {range} name={}{ty_attr})", name.as_str()).unwrap();
        }
        ExprKind::Call { callee, argument } => {
            let callee = render_expr(source, *callee);
            let argument = render_expr(source, *argument);
            write!(out, "(Call {range} callee={callee} argument={argument}{ty_attr})").unwrap();
        }
        ExprKind::Closure(closure) => {
            let body = closure
                .body
                .iter()
                .map(|&e| render_expr(source, e))
                .collect::<Vec<_>>()
                .join(" ");
            write!(
                out,
                "(Closure {range} parameter={} body=[{body}]{ty_attr})",
                closure.parameter.index()
            )
            .unwrap();
        }
        ExprKind::InjectIntoOptional { sub, ty } => {
            let sub = render_expr(source, *sub);
            write!(out, "(InjectIntoOptional {range} sub={sub} type=\"{ty}\")").unwrap();
        }
        ExprKind::BindOptional { sub, ty } => {
            let sub = render_expr(source, *sub);
            write!(out, "(BindOptional {range} sub={sub} type=\"{ty}\")").unwrap();
        }
        ExprKind::OptionalEvaluation { sub, ty } => {
            let sub = render_expr(source, *sub);
            write!(out, "(OptionalEvaluation {range} sub={sub} type=\"{ty}\")").unwrap();
        }
    }
    out
}
