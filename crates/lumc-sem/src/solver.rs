//! Backtracking search over disjunctions and free type variables: the
//! outermost loop that drives a [`ConstraintSystem`] to one or more
//! solutions.

use crate::ast::{ExprId, SourceFile};
use crate::bindings::TypeVariableBindings;
use crate::constraint::{Constraint, OverloadSelection, TypeConversionRelation};
use crate::match_types::simplify;
use crate::store::ConstraintSystem;
use crate::types::{join, Type, TypeVariable};
use lumc_util::FxHashMap;
use std::collections::BTreeSet;

/// A fully-determined outcome: every free variable bound, every overload
/// chosen, every conversion recorded. What `apply` consumes.
#[derive(Clone, Debug)]
pub struct Solution {
    pub bindings: TypeVariableBindings,
    pub tentative_types: FxHashMap<ExprId, Type>,
    pub selections: FxHashMap<ExprId, OverloadSelection>,
    pub conversions: Vec<TypeConversionRelation>,
}

impl Solution {
    /// The fully-resolved type recorded for `expr`, with every reachable
    /// type variable substituted via this solution's bindings.
    pub fn fixed_type(&self, expr: ExprId) -> Option<Type> {
        self.tentative_types.get(&expr).map(|ty| self.bindings.simplify(ty))
    }
}

/// Whether a proposed binding for a free type variable is acceptable before
/// committing to it. Always `true` in this checker — there is no type-class
/// or trait-bound machinery to veto a candidate — but kept as a named hook
/// so a future constraint on bindable types has one call site to extend.
fn is_viable_binding(_var: TypeVariable, _ty: &Type) -> bool {
    true
}

/// Which relation a candidate binding arose from, ordered by how narrowly it
/// determines the variable: a `Bind` pins the variable exactly, a
/// `Conversion(v, T)` only requires it be a subtype of `T`, a
/// `Conversion(T, v)` only that it be a supertype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PotentialBindingKind {
    Exact,
    Subtype,
    Supertype,
}

/// One candidate binding for a free type variable, gathered from the types
/// mentioned opposite it in surviving `Bind`/`Conversion` constraints.
#[derive(Clone, Debug, PartialEq, Eq)]
struct PotentialBinding {
    kind: PotentialBindingKind,
    ty: Type,
}

/// Collects potential bindings for every still-free type variable mentioned
/// in `cs`'s remaining constraints. Per variable, `Exact`/`Subtype`
/// candidates are kept as separate alternatives; `Supertype` candidates are
/// coalesced pairwise via `join` (a variable with two plausible supertypes
/// gets their join as a single candidate, not two to try independently).
fn potential_bindings(cs: &ConstraintSystem) -> FxHashMap<TypeVariable, Vec<PotentialBinding>> {
    let mut separate: FxHashMap<TypeVariable, Vec<PotentialBinding>> = FxHashMap::default();
    let mut supertypes: FxHashMap<TypeVariable, Type> = FxHashMap::default();

    let mut consider = |var: TypeVariable, candidate: Type, kind: PotentialBindingKind| {
        let rep = cs.bindings.representative(var);
        if !cs.bindings.is_free(rep) {
            return;
        }
        if kind == PotentialBindingKind::Supertype {
            supertypes
                .entry(rep)
                .and_modify(|acc| *acc = join(acc, &candidate))
                .or_insert(candidate);
        } else {
            separate
                .entry(rep)
                .or_default()
                .push(PotentialBinding { kind, ty: candidate });
        }
    };

    for entry in cs.entries() {
        collect_from_constraint(&entry.constraint, cs, &mut consider);
    }

    for (var, ty) in supertypes {
        separate.entry(var).or_default().push(PotentialBinding {
            kind: PotentialBindingKind::Supertype,
            ty,
        });
    }
    separate
}

fn collect_from_constraint(
    constraint: &Constraint,
    cs: &ConstraintSystem,
    consider: &mut impl FnMut(TypeVariable, Type, PotentialBindingKind),
) {
    match constraint {
        Constraint::Bind(l, r, _) => offer_pair(l, r, cs, consider, PotentialBindingKind::Exact),
        Constraint::Conversion(l, r, _) => {
            let l = cs.bindings.simplify(l);
            let r = cs.bindings.simplify(r);
            if let Some(v) = l.as_type_variable() {
                if r.as_type_variable().is_none() {
                    consider(v, r.clone(), PotentialBindingKind::Subtype);
                }
            }
            if let Some(v) = r.as_type_variable() {
                if l.as_type_variable().is_none() {
                    consider(v, l, PotentialBindingKind::Supertype);
                }
            }
        }
        Constraint::Disjunction(alts) => {
            for alt in alts {
                collect_from_constraint(alt, cs, consider);
            }
        }
        Constraint::ApplicableFunction(..) | Constraint::BindOverload(..) => {}
    }
}

fn offer_pair(
    l: &Type,
    r: &Type,
    cs: &ConstraintSystem,
    consider: &mut impl FnMut(TypeVariable, Type, PotentialBindingKind),
    kind: PotentialBindingKind,
) {
    let l = cs.bindings.simplify(l);
    let r = cs.bindings.simplify(r);
    match (l.as_type_variable(), r.as_type_variable()) {
        (Some(_), Some(_)) => {}
        (Some(v), None) => consider(v, r, kind),
        (None, Some(v)) => consider(v, l, kind),
        (None, None) => {}
    }
}

/// Runs the three-level backtracking search (component / type-variable /
/// disjunction steps) and returns every solution found. An empty result
/// means no solution exists.
pub fn solve(cs: &mut ConstraintSystem, source: &SourceFile) -> Vec<Solution> {
    let mut solutions = Vec::new();
    component_step(cs, source, &mut solutions);
    solutions
}

/// Drives the worklist to a fixed point, then either records a solution (no
/// free variables and no disjunctions left to resolve), fails the branch, or
/// descends into a type-variable step or a disjunction step.
fn component_step(cs: &mut ConstraintSystem, source: &SourceFile, solutions: &mut Vec<Solution>) {
    if !simplify(cs, source) {
        return;
    }

    if let Some(id) = find_disjunction(cs) {
        disjunction_step(cs, source, id, solutions);
        return;
    }

    let bindings = potential_bindings(cs);
    // Tie-break on the variable's own id, so the branch order (and hence which
    // solution lands at `solutions[0]`) doesn't depend on `FxHashMap` iteration order.
    let best = bindings
        .into_iter()
        .min_by_key(|(var, candidates)| (candidates.len(), candidates.iter().map(|b| b.kind).min(), var.id()));
    if let Some((var, mut candidates)) = best {
        candidates.sort_by_key(|b| b.kind);
        type_variable_step(cs, source, var, candidates, solutions);
        return;
    }

    if has_unbound_free_variable(cs) {
        return;
    }

    solutions.push(snapshot(cs));
}

/// Every `TypeVariable` reachable from a recorded tentative type or a
/// surviving constraint, regardless of whether `potential_bindings` found a
/// candidate for it — a variable mentioned only inside an `ApplicableFunction`
/// or `BindOverload` constraint (neither scanned for candidates) could
/// otherwise slip through as silently unbound.
fn has_unbound_free_variable(cs: &ConstraintSystem) -> bool {
    let mut vars = BTreeSet::new();
    for ty in cs.tentative_types().values() {
        vars.extend(ty.contained_type_variables());
    }
    for entry in cs.entries() {
        collect_constraint_vars(&entry.constraint, &mut vars);
    }
    vars.into_iter()
        .any(|v| cs.bindings.is_free(cs.bindings.representative(v)))
}

fn collect_constraint_vars(constraint: &Constraint, out: &mut BTreeSet<TypeVariable>) {
    match constraint {
        Constraint::Bind(l, r, _) | Constraint::Conversion(l, r, _) => {
            out.extend(l.contained_type_variables());
            out.extend(r.contained_type_variables());
        }
        Constraint::ApplicableFunction(l, r) => {
            out.extend(l.contained_type_variables());
            out.extend(r.contained_type_variables());
        }
        Constraint::BindOverload(v, _, _) => {
            out.insert(*v);
        }
        Constraint::Disjunction(alts) => {
            for alt in alts {
                collect_constraint_vars(alt, out);
            }
        }
    }
}

/// Tries each candidate binding for `var` in turn, checkpointing before and
/// restoring after so sibling attempts never see each other's mutations.
fn type_variable_step(
    cs: &mut ConstraintSystem,
    source: &SourceFile,
    var: TypeVariable,
    candidates: Vec<PotentialBinding>,
    solutions: &mut Vec<Solution>,
) {
    for candidate in candidates {
        if !is_viable_binding(var, &candidate.ty) {
            continue;
        }
        let checkpoint = cs.checkpoint();
        cs.bindings.assign(var, candidate.ty.clone());
        cs.reactivate_mentioning(var);
        component_step(cs, source, solutions);
        cs.restore(checkpoint);
    }
}

/// Tries each alternative of the disjunction entry `id` in turn: removes the
/// disjunction, adds the alternative as an active constraint, recurses, and
/// restores before trying the next.
fn disjunction_step(cs: &mut ConstraintSystem, source: &SourceFile, id: u32, solutions: &mut Vec<Solution>) {
    let Some(Constraint::Disjunction(alternatives)) =
        cs.entries().iter().find(|e| e.id == id).map(|e| e.constraint.clone())
    else {
        return;
    };
    for alt in alternatives {
        let checkpoint = cs.checkpoint();
        cs.remove(id);
        cs.add(alt, true);
        component_step(cs, source, solutions);
        cs.restore(checkpoint);
    }
}

fn find_disjunction(cs: &ConstraintSystem) -> Option<u32> {
    cs.entries()
        .iter()
        .find(|e| matches!(e.constraint, Constraint::Disjunction(_)))
        .map(|e| e.id)
}

fn snapshot(cs: &ConstraintSystem) -> Solution {
    Solution {
        bindings: cs.bindings.clone(),
        tentative_types: cs.tentative_types().clone(),
        selections: cs.selections().clone(),
        conversions: cs.conversions().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Decl, DeclId, ExprId, FunctionDecl, SourceFile};
    use crate::constraint::{Constraint, OverloadChoice};
    use lumc_util::{Idx, Symbol};

    fn int() -> Type {
        Type::primitive("Int")
    }
    fn bool_ty() -> Type {
        Type::primitive("Bool")
    }
    fn tv(id: u32) -> Type {
        Type::TypeVariable(TypeVariable(id))
    }

    #[test]
    fn fully_determined_system_yields_exactly_one_solution() {
        let mut cs = ConstraintSystem::new();
        cs.add(Constraint::Bind(int(), int(), None), true);
        let source = SourceFile::new();
        let solutions = solve(&mut cs, &source);
        assert_eq!(solutions.len(), 1);
    }

    #[test]
    fn contradictory_system_yields_no_solutions() {
        let mut cs = ConstraintSystem::new();
        cs.add(Constraint::Bind(int(), bool_ty(), None), true);
        let source = SourceFile::new();
        assert!(solve(&mut cs, &source).is_empty());
    }

    #[test]
    fn free_variable_bound_from_opposing_concrete_type() {
        let mut cs = ConstraintSystem::new();
        cs.add(Constraint::Bind(tv(0), int(), None), true);
        let source = SourceFile::new();
        let solutions = solve(&mut cs, &source);
        assert_eq!(solutions.len(), 1);
        assert_eq!(cs.bindings.fixed_type(TypeVariable(0)), Some(int()));
    }

    #[test]
    fn conversion_constraint_drives_free_variable_binding_via_potential_bindings() {
        // A bare `Conversion` with a variable on one side is ambiguous at top
        // level and left in place; the solver's potential-bindings pass is
        // what actually proposes and commits a binding for it.
        let mut cs = ConstraintSystem::new();
        cs.add(Constraint::Conversion(tv(0), int(), None), true);
        let source = SourceFile::new();
        let solutions = solve(&mut cs, &source);
        assert_eq!(solutions.len(), 1);
        assert_eq!(cs.bindings.fixed_type(TypeVariable(0)), Some(int()));
    }

    #[test]
    fn disjunction_with_one_viable_alternative_solves_uniquely() {
        let mut cs = ConstraintSystem::new();
        cs.add(
            Constraint::Disjunction(vec![
                Constraint::Bind(int(), bool_ty(), None),
                Constraint::Bind(int(), int(), None),
            ]),
            true,
        );
        let source = SourceFile::new();
        assert_eq!(solve(&mut cs, &source).len(), 1);
    }

    #[test]
    fn disjunction_with_two_viable_alternatives_yields_two_solutions() {
        let mut cs = ConstraintSystem::new();
        cs.add(
            Constraint::Disjunction(vec![
                Constraint::Bind(int(), int(), None),
                Constraint::Bind(bool_ty(), bool_ty(), None),
            ]),
            true,
        );
        let source = SourceFile::new();
        assert_eq!(solve(&mut cs, &source).len(), 2);
    }

    #[test]
    fn bind_overload_resolves_to_a_single_solution_with_selection_recorded() {
        let mut cs = ConstraintSystem::new();
        let mut source = SourceFile::new();
        let decl = source.push_decl(Decl::Function(FunctionDecl {
            name: Symbol::intern("f"),
            interface_type: int(),
        }));
        let loc = ExprId::from_usize(0);
        let var = TypeVariable(0);
        cs.add(Constraint::BindOverload(var, OverloadChoice { decl }, loc), true);
        cs.add(Constraint::Bind(Type::TypeVariable(var), int(), None), true);
        let solutions = solve(&mut cs, &source);
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].selections.get(&loc).unwrap().choice.decl, decl);
        let _ = DeclId::from_usize(0);
    }

    #[test]
    fn restoring_after_a_failed_branch_does_not_leak_its_bindings() {
        let mut cs = ConstraintSystem::new();
        cs.add(
            Constraint::Disjunction(vec![
                Constraint::Bind(tv(0), bool_ty(), None),
                Constraint::Bind(tv(0), int(), None),
            ]),
            true,
        );
        let source = SourceFile::new();
        let solutions = solve(&mut cs, &source);
        assert_eq!(solutions.len(), 1);
        // The live system should reflect only the last-tried (and restored)
        // branch's checkpoint, i.e. have no leftover binding for T0.
        assert!(cs.bindings.is_free(TypeVariable(0)));
    }
}
