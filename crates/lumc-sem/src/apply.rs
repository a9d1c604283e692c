//! Solution application: the post-order walk that assigns each node its
//! fixed type and rewrites the tree to insert implicit-conversion wrapper
//! nodes, per the recorded [`TypeConversionRelation`]s.

use crate::ast::{ExprId, ExprKind, SourceFile};
use crate::constraint::Conversion;
use crate::error::{CheckError, CheckResult};
use crate::solver::Solution;
use crate::types::Type;

/// Sets `source.exprs[id]`'s type from the solution, then performs any
/// kind-specific rewrite (coercing a `Call`'s argument, a `Closure`'s tail
/// expression). Recurses into children first — applying a child's solution
/// type before the parent needs it to coerce.
pub fn apply_expr(source: &mut SourceFile, solution: &Solution, id: ExprId) -> CheckResult<()> {
    match source.exprs[id].kind {
        ExprKind::Call { callee, argument } => {
            apply_expr(source, solution, callee)?;
            apply_expr(source, solution, argument)?;
            set_type(source, solution, id)?;
            if let Some(Type::Function { parameter, .. }) = source.exprs[callee].ty() {
                let coerced = coerce(source, solution, argument, &parameter)?;
                source.exprs[id].kind = ExprKind::Call { callee, argument: coerced };
            }
        }
        ExprKind::Closure(ref closure) => {
            let return_type = closure.return_type.clone();
            let body = closure.body.clone();
            for &e in &body {
                apply_expr(source, solution, e)?;
            }
            set_type(source, solution, id)?;
            if let (Some(return_type), Some(&last)) = (return_type, body.last()) {
                let coerced = coerce(source, solution, last, &return_type)?;
                if let ExprKind::Closure(ref mut closure_mut) = source.exprs[id].kind {
                    *closure_mut.body.last_mut().unwrap() = coerced;
                }
            }
        }
        ExprKind::IntegerLiteral(_) | ExprKind::DeclRef(_) | ExprKind::OverloadedDeclRef(_) => {
            set_type(source, solution, id)?;
        }
        ExprKind::UnresolvedDeclRef(_)
        | ExprKind::InjectIntoOptional { .. }
        | ExprKind::BindOptional { .. }
        | ExprKind::OptionalEvaluation { .. } => {
            return Err(CheckError::InvalidNodeDuringApply(id));
        }
    }
    Ok(())
}

fn set_type(source: &SourceFile, solution: &Solution, id: ExprId) -> CheckResult<()> {
    let ty = solution
        .fixed_type(id)
        .ok_or(CheckError::InvalidNodeDuringApply(id))?;
    source.exprs[id].set_ty(ty);
    Ok(())
}

/// Public entry point to [`coerce`] for callers outside this module that
/// need to coerce an expression to a type after `apply_expr` has already run
/// on it — e.g. the statement-level driver wrapping a `let` initializer in
/// its declared optional type.
pub fn coerce_expr(source: &mut SourceFile, solution: &Solution, expr: ExprId, to_ty: &Type) -> CheckResult<ExprId> {
    coerce(source, solution, expr, to_ty)
}

/// Rewrites `expr` to produce a value of type `to_ty`, inserting implicit
/// conversion wrapper nodes as needed. A no-op when `expr`'s type already
/// matches `to_ty`.
fn coerce(source: &mut SourceFile, solution: &Solution, expr: ExprId, to_ty: &Type) -> CheckResult<ExprId> {
    let from_ty = source.exprs[expr].ty().ok_or(CheckError::InvalidNodeDuringApply(expr))?;
    if &from_ty == to_ty {
        return Ok(expr);
    }

    if let Some(relation) = solution
        .conversions
        .iter()
        .find(|r| &r.left == &from_ty && &r.right == to_ty)
    {
        return match relation.conversion {
            Conversion::DeepEquality => Ok(expr),
            Conversion::ValueToOptional => {
                let wrapped_ty = to_ty.wrapped().ok_or(CheckError::CoerceUnconsidered(expr))?.clone();
                let inner = coerce(source, solution, expr, &wrapped_ty)?;
                Ok(wrap_inject(source, inner, to_ty.clone()))
            }
            Conversion::OptionalToOptional => coerce_optional_to_optional(source, solution, expr, &from_ty, to_ty),
        };
    }

    if let Some(to_wrapped) = to_ty.wrapped() {
        if from_ty.is_optional() {
            return coerce_optional_to_optional(source, solution, expr, &from_ty, to_ty);
        }
        let inner = coerce(source, solution, expr, to_wrapped)?;
        return Ok(wrap_inject(source, inner, to_ty.clone()));
    }

    Err(CheckError::CoerceUnconsidered(expr))
}

/// `fromDepth`/`toDepth` are optional-nesting depths. A pure lift (`toDepth >
/// fromDepth` and the to-chain's corresponding element equals `fromTy`)
/// wraps in that many `InjectIntoOptional`s, outermost first. Otherwise the
/// general bind/evaluate sandwich handles reshaping (e.g. widening the
/// wrapped type, or a same-depth optional-to-optional conversion).
fn coerce_optional_to_optional(
    source: &mut SourceFile,
    solution: &Solution,
    expr: ExprId,
    from_ty: &Type,
    to_ty: &Type,
) -> CheckResult<ExprId> {
    let from_chain = from_ty.look_through_all_optionals();
    let to_chain = to_ty.look_through_all_optionals();
    let from_depth = from_chain.len();
    let to_depth = to_chain.len();

    if to_depth > from_depth && to_chain[to_depth - from_depth] == *from_ty {
        let mut current = expr;
        for depth in (from_depth..to_depth).rev() {
            let wrapper_ty = nth_optional_wrapping(to_ty, depth - from_depth);
            current = wrap_inject(source, current, wrapper_ty);
        }
        return Ok(current);
    }

    let from_wrapped = from_ty.wrapped().ok_or(CheckError::CoerceUnconsidered(expr))?.clone();
    let to_wrapped = to_ty.wrapped().ok_or(CheckError::CoerceUnconsidered(expr))?.clone();

    let bound = wrap_bind(source, expr, from_wrapped);
    let coerced = coerce(source, solution, bound, &to_wrapped)?;
    let injected = wrap_inject(source, coerced, to_ty.clone());
    Ok(wrap_evaluate(source, injected, to_ty.clone()))
}

/// `base`'s own optional chain, `n` layers in from `base` itself — `n == 0`
/// is `base`, `n == 1` is `base` with one `Optional` peeled off, and so on.
fn nth_optional_wrapping(base: &Type, n: usize) -> Type {
    let chain = base.look_through_all_optionals();
    chain[n].clone()
}

fn wrap_inject(source: &mut SourceFile, sub: ExprId, ty: Type) -> ExprId {
    let span = source.exprs[sub].span;
    let id = source.push_expr(span, ExprKind::InjectIntoOptional { sub, ty: ty.clone() });
    source.exprs[id].set_ty(ty);
    id
}

fn wrap_bind(source: &mut SourceFile, sub: ExprId, ty: Type) -> ExprId {
    let span = source.exprs[sub].span;
    let id = source.push_expr(span, ExprKind::BindOptional { sub, ty: ty.clone() });
    source.exprs[id].set_ty(ty);
    id
}

fn wrap_evaluate(source: &mut SourceFile, sub: ExprId, ty: Type) -> ExprId {
    let span = source.exprs[sub].span;
    let id = source.push_expr(span, ExprKind::OptionalEvaluation { sub, ty: ty.clone() });
    source.exprs[id].set_ty(ty);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Decl, FunctionDecl, SourceFile};
    use crate::constraint::TypeConversionRelation;
    use lumc_util::Span;
    use lumc_util::FxHashMap;

    fn int() -> Type {
        Type::primitive("Int")
    }

    fn empty_solution(tentative_types: FxHashMap<ExprId, Type>, conversions: Vec<TypeConversionRelation>) -> Solution {
        Solution {
            bindings: crate::bindings::TypeVariableBindings::new(),
            tentative_types,
            selections: FxHashMap::default(),
            conversions,
        }
    }

    #[test]
    fn apply_sets_integer_literal_type() {
        let mut source = SourceFile::new();
        let id = source.push_expr(Span::DUMMY, ExprKind::IntegerLiteral(1));
        let solution = empty_solution(FxHashMap::from_iter([(id, int())]), vec![]);
        apply_expr(&mut source, &solution, id).unwrap();
        assert_eq!(source.exprs[id].ty(), Some(int()));
    }

    #[test]
    fn coerce_same_type_is_a_no_op() {
        let mut source = SourceFile::new();
        let id = source.push_expr(Span::DUMMY, ExprKind::IntegerLiteral(1));
        source.exprs[id].set_ty(int());
        let solution = empty_solution(FxHashMap::default(), vec![]);
        let result = coerce(&mut source, &solution, id, &int()).unwrap();
        assert_eq!(result, id);
    }

    #[test]
    fn coerce_value_to_optional_wraps_in_inject() {
        let mut source = SourceFile::new();
        let id = source.push_expr(Span::DUMMY, ExprKind::IntegerLiteral(1));
        source.exprs[id].set_ty(int());
        let to_ty = Type::optional(int());
        let solution = empty_solution(
            FxHashMap::default(),
            vec![TypeConversionRelation {
                conversion: Conversion::ValueToOptional,
                left: int(),
                right: to_ty.clone(),
            }],
        );
        let result = coerce(&mut source, &solution, id, &to_ty).unwrap();
        assert!(matches!(source.exprs[result].kind, ExprKind::InjectIntoOptional { .. }));
        assert_eq!(source.exprs[result].ty(), Some(to_ty));
    }

    #[test]
    fn coerce_two_levels_of_optional_nests_two_injects() {
        let mut source = SourceFile::new();
        let id = source.push_expr(Span::DUMMY, ExprKind::IntegerLiteral(1));
        source.exprs[id].set_ty(int());
        let to_ty = Type::optional(Type::optional(int()));
        let solution = empty_solution(FxHashMap::default(), vec![]);
        let result = coerce(&mut source, &solution, id, &to_ty).unwrap();
        assert_eq!(source.exprs[result].ty(), Some(to_ty.clone()));
        match &source.exprs[result].kind {
            ExprKind::InjectIntoOptional { sub, .. } => {
                assert!(matches!(source.exprs[*sub].kind, ExprKind::InjectIntoOptional { .. }));
            }
            _ => panic!("expected InjectIntoOptional"),
        }
    }

    #[test]
    fn coerce_an_already_optional_source_lifts_to_a_deeper_optional() {
        let mut source = SourceFile::new();
        let id = source.push_expr(Span::DUMMY, ExprKind::IntegerLiteral(1));
        let from_ty = Type::optional(int());
        source.exprs[id].set_ty(from_ty.clone());
        let to_ty = Type::optional(Type::optional(int()));
        let solution = empty_solution(FxHashMap::default(), vec![]);
        let result = coerce(&mut source, &solution, id, &to_ty).unwrap();
        assert_eq!(source.exprs[result].ty(), Some(to_ty.clone()));
        match &source.exprs[result].kind {
            ExprKind::InjectIntoOptional { sub, ty } => {
                assert_eq!(*sub, id);
                assert_eq!(*ty, to_ty);
            }
            _ => panic!("expected InjectIntoOptional"),
        }
    }

    #[test]
    fn call_coerces_argument_to_parameter_type() {
        let mut source = SourceFile::new();
        let f = source.push_decl(Decl::Function(FunctionDecl {
            name: lumc_util::Symbol::intern("f"),
            interface_type: Type::function(Type::optional(int()), int()),
        }));
        let callee = source.push_expr(Span::DUMMY, ExprKind::DeclRef(f));
        let argument = source.push_expr(Span::DUMMY, ExprKind::IntegerLiteral(1));
        let call = source.push_expr(Span::DUMMY, ExprKind::Call { callee, argument });

        let mut tentative_types = FxHashMap::default();
        tentative_types.insert(callee, Type::function(Type::optional(int()), int()));
        tentative_types.insert(argument, int());
        tentative_types.insert(call, int());
        let solution = empty_solution(tentative_types, vec![]);

        apply_expr(&mut source, &solution, call).unwrap();

        match source.exprs[call].kind {
            ExprKind::Call { argument: new_arg, .. } => {
                assert!(matches!(
                    source.exprs[new_arg].kind,
                    ExprKind::InjectIntoOptional { .. }
                ));
            }
            _ => panic!("expected Call"),
        }
    }
}
