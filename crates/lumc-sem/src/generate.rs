//! Constraint generation: the post-order walk that turns an expression tree
//! into entries in a [`ConstraintSystem`], recording each visited node's
//! tentative type as it goes.

use crate::ast::{ClosureExpr, Decl, ExprId, ExprKind, SourceFile, VariableDecl};
use crate::constraint::{Constraint, OverloadChoice};
use crate::error::{CheckError, CheckResult};
use crate::store::ConstraintSystem;
use crate::types::Type;

/// `typeAnnotation` if present, else a fresh type variable — memoized onto
/// the declaration so a later reference sees the same type. Safe to call
/// more than once for the same declaration (returns the already-computed
/// type instead of minting a second variable).
pub fn generate_decl_type(cs: &mut ConstraintSystem, decl: &Decl) -> Type {
    match decl {
        Decl::Function(f) => f.interface_type.clone(),
        Decl::Variable(v) => generate_variable_decl_type(cs, v),
    }
}

fn generate_variable_decl_type(cs: &mut ConstraintSystem, v: &VariableDecl) -> Type {
    if let Some(existing) = v.ty.borrow().clone() {
        return existing;
    }
    let ty = v
        .type_annotation
        .clone()
        .unwrap_or_else(|| cs.fresh_type_variable());
    *v.ty.borrow_mut() = Some(ty.clone());
    ty
}

/// Generates constraints for `id` and every node it contains (post-order:
/// children before parent), returning the node's tentative type. Also
/// records that type in the constraint system's AST-type map.
pub fn generate_expr(cs: &mut ConstraintSystem, source: &SourceFile, id: ExprId) -> CheckResult<Type> {
    let ty = match &source.exprs[id].kind {
        ExprKind::IntegerLiteral(_) => Type::primitive("Int"),

        ExprKind::DeclRef(target) => {
            let tv = cs.fresh_type_variable();
            let var = tv.as_type_variable().expect("fresh_type_variable always returns a TypeVariable");
            let interface_type = source.decls[*target].interface_type();
            cs.resolve_overload(var, OverloadChoice { decl: *target }, interface_type, id);
            tv
        }

        ExprKind::OverloadedDeclRef(overloaded) => {
            let tv = cs.fresh_type_variable();
            let var = tv.as_type_variable().expect("fresh_type_variable always returns a TypeVariable");
            let alternatives = overloaded
                .targets
                .iter()
                .map(|&target| Constraint::BindOverload(var, OverloadChoice { decl: target }, id))
                .collect();
            cs.add_disjunction(alternatives)
                .map_err(|_| CheckError::InvalidNodeDuringGeneration(id))?;
            tv
        }

        ExprKind::UnresolvedDeclRef(_) => return Err(CheckError::InvalidNodeDuringGeneration(id)),

        ExprKind::Call { callee, argument } => {
            let (callee, argument) = (*callee, *argument);
            let callee_ty = generate_expr(cs, source, callee)?;
            let argument_ty = generate_expr(cs, source, argument)?;
            let tv = cs.fresh_type_variable();
            cs.add(
                Constraint::ApplicableFunction(Type::function(argument_ty, tv.clone()), callee_ty),
                true,
            );
            tv
        }

        ExprKind::Closure(closure) => generate_closure(cs, source, closure, id)?,

        ExprKind::InjectIntoOptional { .. }
        | ExprKind::BindOptional { .. }
        | ExprKind::OptionalEvaluation { .. } => {
            return Err(CheckError::InvalidNodeDuringGeneration(id));
        }
    };

    cs.set_tentative_type(id, ty.clone());
    Ok(ty)
}

/// Only a single tail expression is supported (`body.last!` in the source
/// model); anything else is `UnsupportedMultiStatementClosure`.
fn generate_closure(
    cs: &mut ConstraintSystem,
    source: &SourceFile,
    closure: &ClosureExpr,
    _location: ExprId,
) -> CheckResult<Type> {
    let [body_expr] = closure.body[..] else {
        return Err(CheckError::UnsupportedMultiStatementClosure);
    };

    let param_ty = generate_decl_type(cs, &source.decls[closure.parameter]);
    let result_ty = closure
        .return_type
        .clone()
        .unwrap_or_else(|| cs.fresh_type_variable());

    let body_ty = generate_expr(cs, source, body_expr)?;
    cs.add(Constraint::Conversion(body_ty, result_ty.clone(), None), true);

    Ok(Type::function(param_ty, result_ty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ClosureExpr, Decl, FunctionDecl, OverloadedDeclRefExpr, SourceFile, VariableDecl};
    use lumc_util::{Span, Symbol};

    fn int() -> Type {
        Type::primitive("Int")
    }

    #[test]
    fn integer_literal_generates_int_with_no_constraints() {
        let mut source = SourceFile::new();
        let id = source.push_expr(Span::DUMMY, ExprKind::IntegerLiteral(1));
        let mut cs = ConstraintSystem::new();
        let ty = generate_expr(&mut cs, &source, id).unwrap();
        assert_eq!(ty, int());
        assert!(cs.entries().is_empty());
        assert_eq!(cs.tentative_type(id), Some(&int()));
    }

    #[test]
    fn decl_ref_resolves_overload_and_records_selection() {
        let mut source = SourceFile::new();
        let f = source.push_decl(Decl::Function(FunctionDecl {
            name: Symbol::intern("f"),
            interface_type: int(),
        }));
        let id = source.push_expr(Span::DUMMY, ExprKind::DeclRef(f));
        let mut cs = ConstraintSystem::new();
        generate_expr(&mut cs, &source, id).unwrap();
        assert_eq!(cs.selection(id).unwrap().choice.decl, f);
        assert_eq!(cs.entries().len(), 1);
    }

    #[test]
    fn overloaded_decl_ref_adds_a_disjunction_of_bind_overloads() {
        let mut source = SourceFile::new();
        let f1 = source.push_decl(Decl::Function(FunctionDecl {
            name: Symbol::intern("f"),
            interface_type: int(),
        }));
        let f2 = source.push_decl(Decl::Function(FunctionDecl {
            name: Symbol::intern("f"),
            interface_type: Type::optional(int()),
        }));
        let id = source.push_expr(
            Span::DUMMY,
            ExprKind::OverloadedDeclRef(OverloadedDeclRefExpr { targets: vec![f1, f2] }),
        );
        let mut cs = ConstraintSystem::new();
        generate_expr(&mut cs, &source, id).unwrap();
        assert_eq!(cs.entries().len(), 1);
        assert!(matches!(
            cs.entries()[0].constraint,
            Constraint::Disjunction(ref alts) if alts.len() == 2
        ));
    }

    #[test]
    fn unresolved_decl_ref_fails_generation() {
        let mut source = SourceFile::new();
        let id = source.push_expr(Span::DUMMY, ExprKind::UnresolvedDeclRef(Symbol::intern("x")));
        let mut cs = ConstraintSystem::new();
        assert!(matches!(
            generate_expr(&mut cs, &source, id),
            Err(CheckError::InvalidNodeDuringGeneration(_))
        ));
    }

    #[test]
    fn call_adds_applicable_function_constraint() {
        let mut source = SourceFile::new();
        let callee = source.push_expr(Span::DUMMY, ExprKind::IntegerLiteral(1));
        let argument = source.push_expr(Span::DUMMY, ExprKind::IntegerLiteral(2));
        let call = source.push_expr(Span::DUMMY, ExprKind::Call { callee, argument });
        let mut cs = ConstraintSystem::new();
        generate_expr(&mut cs, &source, call).unwrap();
        assert!(matches!(
            cs.entries().last().unwrap().constraint,
            Constraint::ApplicableFunction(..)
        ));
    }

    #[test]
    fn closure_types_as_function_from_param_to_result() {
        let mut source = SourceFile::new();
        let param = source.push_decl(Decl::Variable(VariableDecl::new(
            Symbol::intern("x"),
            Some(int()),
            None,
        )));
        let body = source.push_expr(Span::DUMMY, ExprKind::DeclRef(param));
        let closure_id = source.push_expr(
            Span::DUMMY,
            ExprKind::Closure(ClosureExpr {
                parameter: param,
                return_type: Some(int()),
                body: vec![body],
            }),
        );
        let mut cs = ConstraintSystem::new();
        let ty = generate_expr(&mut cs, &source, closure_id).unwrap();
        assert!(matches!(ty, Type::Function { .. }));
    }

    #[test]
    fn closure_with_multi_statement_body_is_unsupported() {
        let mut source = SourceFile::new();
        let param = source.push_decl(Decl::Variable(VariableDecl::new(
            Symbol::intern("x"),
            Some(int()),
            None,
        )));
        let a = source.push_expr(Span::DUMMY, ExprKind::IntegerLiteral(1));
        let b = source.push_expr(Span::DUMMY, ExprKind::IntegerLiteral(2));
        let closure_id = source.push_expr(
            Span::DUMMY,
            ExprKind::Closure(ClosureExpr {
                parameter: param,
                return_type: Some(int()),
                body: vec![a, b],
            }),
        );
        let mut cs = ConstraintSystem::new();
        assert!(matches!(
            generate_expr(&mut cs, &source, closure_id),
            Err(CheckError::UnsupportedMultiStatementClosure)
        ));
    }

    #[test]
    fn variable_decl_type_is_memoized_across_calls() {
        let v = VariableDecl::new(Symbol::intern("x"), None, None);
        let mut cs = ConstraintSystem::new();
        let first = generate_variable_decl_type(&mut cs, &v);
        let second = generate_variable_decl_type(&mut cs, &v);
        assert_eq!(first, second);
    }
}
