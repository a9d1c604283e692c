//! Matching and simplification: `matchTypes` and friends, plus the
//! constraint-store worklist loop that drives them to a fixed point.

use crate::ast::SourceFile;
use crate::constraint::{Constraint, Conversion, EqualityKind, OverloadChoice};
use crate::store::ConstraintSystem;
use crate::types::Type;

/// The three-valued outcome of matching/simplification. Never surfaced past
/// this module and the solver — the checker only ever sees "solution found"
/// or "no solution".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveResult {
    Solved,
    Ambiguous,
    Failure,
}

/// Whether an ambiguous variable-involving `Conversion` match is allowed to
/// resolve itself by re-queuing a fresh (inactive) entry and reporting
/// `Solved`, or must report `Ambiguous` and let the caller decide. Top-level
/// calls (direct from the worklist) use the latter, so the original entry —
/// not a duplicate — is what's left behind for reconsideration. Recursive
/// calls made while decomposing a compound match (function parameter/result,
/// deep-equality optionals, conversion unwrapping) use the former, since an
/// ambiguous sub-result at that point is not a real choice point, only a
/// not-yet-concrete operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchOptions {
    generate_constraints_when_ambiguous: bool,
}

impl MatchOptions {
    pub const TOP_LEVEL: MatchOptions = MatchOptions {
        generate_constraints_when_ambiguous: false,
    };
    pub const DECOMPOSITION: MatchOptions = MatchOptions {
        generate_constraints_when_ambiguous: true,
    };
}

/// The workhorse matcher. Simplifies both sides against current bindings,
/// then dispatches on whether either side is (still) a type variable.
pub fn match_types(
    cs: &mut ConstraintSystem,
    kind: EqualityKind,
    left: &Type,
    right: &Type,
    options: MatchOptions,
) -> SolveResult {
    let l = cs.bindings.simplify(left);
    let r = cs.bindings.simplify(right);

    let l_var = l.as_type_variable();
    let r_var = r.as_type_variable();

    if l_var.is_none() && r_var.is_none() {
        return match_fixed_types(cs, kind, &l, &r);
    }

    if let (Some(a), Some(b)) = (l_var, r_var) {
        let ra = cs.bindings.representative(a);
        let rb = cs.bindings.representative(b);
        if ra == rb {
            return SolveResult::Solved;
        }
        return match kind {
            EqualityKind::Bind => {
                cs.bindings.merge(ra, rb);
                cs.reactivate_mentioning(ra);
                SolveResult::Solved
            }
            EqualityKind::Conversion => resolve_ambiguous(cs, kind, &l, &r, options),
        };
    }

    // Exactly one side is a variable.
    match kind {
        EqualityKind::Bind => {
            let (var, concrete) = if let Some(v) = l_var {
                (cs.bindings.representative(v), r.clone())
            } else {
                (cs.bindings.representative(r_var.unwrap()), l.clone())
            };
            match_types_bind(cs, var, &concrete)
        }
        EqualityKind::Conversion => resolve_ambiguous(cs, kind, &l, &r, options),
    }
}

fn match_types_bind(
    cs: &mut ConstraintSystem,
    var: crate::types::TypeVariable,
    concrete: &Type,
) -> SolveResult {
    if concrete.contained_type_variables().contains(&var) {
        return SolveResult::Failure;
    }
    cs.bindings.assign(var, concrete.clone());
    cs.reactivate_mentioning(var);
    SolveResult::Solved
}

fn resolve_ambiguous(
    cs: &mut ConstraintSystem,
    kind: EqualityKind,
    l: &Type,
    r: &Type,
    options: MatchOptions,
) -> SolveResult {
    if options.generate_constraints_when_ambiguous {
        cs.add(make_constraint(kind, l.clone(), r.clone(), None), false);
        SolveResult::Solved
    } else {
        SolveResult::Ambiguous
    }
}

fn make_constraint(kind: EqualityKind, l: Type, r: Type, conv: Option<Conversion>) -> Constraint {
    match kind {
        EqualityKind::Bind => Constraint::Bind(l, r, conv),
        EqualityKind::Conversion => Constraint::Conversion(l, r, conv),
    }
}

/// No variables on either side: decompose by shape.
fn match_fixed_types(cs: &mut ConstraintSystem, kind: EqualityKind, l: &Type, r: &Type) -> SolveResult {
    if let (Type::Function { .. }, Type::Function { .. }) = (l, r) {
        return match_function_types(cs, kind, l, r);
    }

    let mut candidates = Vec::new();
    let same_primitive = matches!((l, r), (Type::Primitive(a), Type::Primitive(b)) if a == b);
    let both_optional = l.is_optional() && r.is_optional();
    if same_primitive || both_optional {
        candidates.push(Conversion::DeepEquality);
    }
    if kind == EqualityKind::Conversion {
        if both_optional {
            candidates.push(Conversion::OptionalToOptional);
        }
        let left_depth = l.look_through_all_optionals().len();
        let right_depth = r.look_through_all_optionals().len();
        if left_depth < right_depth {
            candidates.push(Conversion::ValueToOptional);
        }
    }

    match candidates.len() {
        0 => SolveResult::Failure,
        1 => simplify_kind(cs, kind, l, r, Some(candidates[0])),
        _ => {
            let alternatives = candidates
                .into_iter()
                .map(|conv| {
                    let sub_kind = if conv == Conversion::DeepEquality {
                        EqualityKind::Bind
                    } else {
                        kind
                    };
                    make_constraint(sub_kind, l.clone(), r.clone(), Some(conv))
                })
                .collect();
            cs.add_disjunction(alternatives)
                .expect("built with at least two alternatives");
            SolveResult::Solved
        }
    }
}

/// Parameter is contravariant (for `Conversion`; invariant under `Bind`
/// since the sub-kind equals `kind` either way), result is covariant.
fn match_function_types(cs: &mut ConstraintSystem, kind: EqualityKind, lfn: &Type, rfn: &Type) -> SolveResult {
    let (Type::Function { parameter: lparam, result: lresult }, Type::Function { parameter: rparam, result: rresult }) =
        (lfn, rfn)
    else {
        unreachable!("match_function_types requires both operands to be Function")
    };
    let param = match_types(cs, kind, rparam, lparam, MatchOptions::DECOMPOSITION);
    let result = match_types(cs, kind, lresult, rresult, MatchOptions::DECOMPOSITION);
    combine_decomposition(param, result)
}

fn match_deep_equality_types(cs: &mut ConstraintSystem, l: &Type, r: &Type) -> SolveResult {
    match (l, r) {
        (Type::Primitive(a), Type::Primitive(b)) => {
            if a == b {
                SolveResult::Solved
            } else {
                SolveResult::Failure
            }
        }
        (Type::Optional(a), Type::Optional(b)) => {
            match_types(cs, EqualityKind::Bind, a, b, MatchOptions::DECOMPOSITION)
        }
        _ => SolveResult::Failure,
    }
}

/// `simplify(kind, L, R, conversion)`: with no conversion chosen yet, this
/// is plain `matchTypes` at top level; with one chosen, dispatch on it and
/// record the conversion relation on success.
pub fn simplify_kind(
    cs: &mut ConstraintSystem,
    kind: EqualityKind,
    l: &Type,
    r: &Type,
    conversion: Option<Conversion>,
) -> SolveResult {
    match conversion {
        None => match_types(cs, kind, l, r, MatchOptions::TOP_LEVEL),
        Some(conv) => {
            let result = apply_conversion(cs, kind, l, r, conv);
            if result == SolveResult::Solved {
                cs.record_conversion(conv, l.clone(), r.clone());
            }
            result
        }
    }
}

fn apply_conversion(cs: &mut ConstraintSystem, kind: EqualityKind, l: &Type, r: &Type, conversion: Conversion) -> SolveResult {
    match conversion {
        Conversion::DeepEquality => match_deep_equality_types(cs, l, r),
        Conversion::ValueToOptional => {
            let Some(r_wrapped) = r.wrapped() else {
                return SolveResult::Failure;
            };
            let l_operand = l.wrapped().unwrap_or(l);
            match_types(cs, kind, l_operand, r_wrapped, MatchOptions::DECOMPOSITION)
        }
        Conversion::OptionalToOptional => match (l.wrapped(), r.wrapped()) {
            (Some(lw), Some(rw)) => match_types(cs, kind, lw, rw, MatchOptions::DECOMPOSITION),
            _ => SolveResult::Failure,
        },
    }
}

fn combine_decomposition(a: SolveResult, b: SolveResult) -> SolveResult {
    match (a, b) {
        (SolveResult::Failure, _) | (_, SolveResult::Failure) => SolveResult::Failure,
        (SolveResult::Solved, SolveResult::Solved) => SolveResult::Solved,
        _ => {
            debug_assert!(
                false,
                "decomposition sub-match returned Ambiguous; DECOMPOSITION options should have resolved it"
            );
            SolveResult::Failure
        }
    }
}

/// `simplify(constraint)` — per-kind dispatch for a single constraint.
/// `BindOverload` needs `source` to look up the chosen declaration's
/// interface type; no other branch touches the AST.
fn simplify_constraint(cs: &mut ConstraintSystem, constraint: &Constraint, source: &SourceFile) -> SolveResult {
    match constraint {
        Constraint::Bind(l, r, conv) => simplify_kind(cs, EqualityKind::Bind, l, r, *conv),
        Constraint::Conversion(l, r, conv) => simplify_kind(cs, EqualityKind::Conversion, l, r, *conv),
        Constraint::ApplicableFunction(lfn, right) => simplify_applicable_function(cs, lfn, right),
        Constraint::BindOverload(var, choice, location) => {
            let interface_type = source.decls[choice.decl].interface_type();
            cs.resolve_overload(*var, *choice, interface_type, *location);
            SolveResult::Solved
        }
        Constraint::Disjunction(_) => SolveResult::Ambiguous,
    }
}

fn simplify_applicable_function(cs: &mut ConstraintSystem, lfn: &Type, right: &Type) -> SolveResult {
    let r = cs.bindings.simplify(right);
    if r.is_type_variable() {
        return SolveResult::Ambiguous;
    }
    match &r {
        Type::Function { .. } => {
            let Type::Function { parameter: lparam, result: lresult } = lfn else {
                unreachable!("ApplicableFunction's left operand must be a Function, by construction")
            };
            let Type::Function { parameter: rparam, result: rresult } = &r else {
                unreachable!()
            };
            let param = match_types(cs, EqualityKind::Conversion, lparam, rparam, MatchOptions::DECOMPOSITION);
            let result = match_types(cs, EqualityKind::Bind, lresult, rresult, MatchOptions::DECOMPOSITION);
            combine_decomposition(param, result)
        }
        _ => SolveResult::Failure,
    }
}

/// The worklist loop: while not failed and some entry is active, take one,
/// deactivate it, simplify it. Returns `false` iff the system ends up
/// failed.
pub fn simplify(cs: &mut ConstraintSystem, source: &SourceFile) -> bool {
    while !cs.is_failed() {
        let Some(id) = cs.find_first_active() else {
            break;
        };
        cs.entry_mut(id).unwrap().is_active = false;
        let constraint = cs
            .entries()
            .iter()
            .find(|e| e.id == id)
            .unwrap()
            .constraint
            .clone();
        match simplify_constraint(cs, &constraint, source) {
            SolveResult::Solved => cs.remove(id),
            SolveResult::Failure => {
                cs.remove(id);
                cs.fail(constraint);
            }
            SolveResult::Ambiguous => { /* left in place, now inactive */ }
        }
    }
    !cs.is_failed()
}
