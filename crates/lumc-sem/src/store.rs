//! The constraint system: one instance per expression being type-checked.
//!
//! Owns the bindings table, the ordered list of constraint entries, the
//! per-node tentative-type map, the overload selections, and the conversion
//! relations recorded as constraints are simplified. Mutated throughout
//! generation and solving; consulted read-only (or discarded) after apply.

use crate::ast::ExprId;
use crate::bindings::TypeVariableBindings;
use crate::constraint::{
    Constraint, ConstraintEntry, Conversion, OverloadChoice, OverloadSelection,
    TypeConversionRelation,
};
use crate::types::{Type, TypeVariable};
use lumc_util::FxHashMap;

pub struct ConstraintSystem {
    pub bindings: TypeVariableBindings,
    entries: Vec<ConstraintEntry>,
    tentative_types: FxHashMap<ExprId, Type>,
    selections: FxHashMap<ExprId, OverloadSelection>,
    conversions: Vec<TypeConversionRelation>,
    failed_constraint: Option<Constraint>,
    next_var: u32,
    next_entry_id: u32,
}

impl ConstraintSystem {
    pub fn new() -> Self {
        ConstraintSystem {
            bindings: TypeVariableBindings::new(),
            entries: Vec::new(),
            tentative_types: FxHashMap::default(),
            selections: FxHashMap::default(),
            conversions: Vec::new(),
            failed_constraint: None,
            next_var: 0,
            next_entry_id: 0,
        }
    }

    pub fn fresh_type_variable(&mut self) -> Type {
        let v = TypeVariable(self.next_var);
        self.next_var += 1;
        Type::TypeVariable(v)
    }

    /// Appends a constraint entry. `active` should be `false` when the
    /// constraint arises from decomposing another constraint, `true` when
    /// it is (re)introduced as ambiguous or added directly by generation.
    pub fn add(&mut self, constraint: Constraint, active: bool) -> u32 {
        let id = self.next_entry_id;
        self.next_entry_id += 1;
        self.entries.push(ConstraintEntry {
            id,
            constraint,
            is_active: active,
        });
        id
    }

    pub fn remove(&mut self, id: u32) {
        self.entries.retain(|e| e.id != id);
    }

    pub fn entries(&self) -> &[ConstraintEntry] {
        &self.entries
    }

    pub fn entry_mut(&mut self, id: u32) -> Option<&mut ConstraintEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    pub fn find_first_active(&self) -> Option<u32> {
        self.entries.iter().find(|e| e.is_active).map(|e| e.id)
    }

    pub fn has_active(&self) -> bool {
        self.entries.iter().any(|e| e.is_active)
    }

    pub fn is_failed(&self) -> bool {
        self.failed_constraint.is_some()
    }

    pub fn fail(&mut self, constraint: Constraint) {
        self.failed_constraint = Some(constraint);
    }

    pub fn failed_constraint(&self) -> Option<&Constraint> {
        self.failed_constraint.as_ref()
    }

    /// Re-activates every entry whose constraint mentions a type variable
    /// in the equivalence class `changed` now belongs to, after a `merge`
    /// or `assign` changes that class's binding.
    pub fn reactivate_mentioning(&mut self, changed: TypeVariable) {
        let rep = self.bindings.representative(changed);
        for entry in self.entries.iter_mut() {
            if constraint_mentions(&entry.constraint, rep, &self.bindings) {
                entry.is_active = true;
            }
        }
    }

    /// `addDisjunction`: a single alternative is added directly; zero
    /// alternatives is a failure to construct the constraint at all (the
    /// caller has nothing to add); more than one is wrapped in a
    /// `Disjunction` entry.
    pub fn add_disjunction(&mut self, alternatives: Vec<Constraint>) -> Result<(), ()> {
        match alternatives.len() {
            0 => Err(()),
            1 => {
                self.add(alternatives.into_iter().next().unwrap(), true);
                Ok(())
            }
            _ => {
                self.add(Constraint::Disjunction(alternatives), true);
                Ok(())
            }
        }
    }

    /// Binds `choice.decl`'s interface type (`interface_type`, looked up by
    /// the caller since this module has no access to the AST arena) to
    /// `bound_var` via a fresh `Bind` constraint, and records the selection
    /// keyed by `location`.
    pub fn resolve_overload(
        &mut self,
        bound_var: TypeVariable,
        choice: OverloadChoice,
        interface_type: Type,
        location: ExprId,
    ) {
        self.add(
            Constraint::Bind(Type::TypeVariable(bound_var), interface_type.clone(), None),
            true,
        );
        self.selections.insert(
            location,
            OverloadSelection {
                choice,
                opened_type: interface_type,
            },
        );
    }

    pub fn set_tentative_type(&mut self, expr: ExprId, ty: Type) {
        self.tentative_types.insert(expr, ty);
    }

    pub fn tentative_type(&self, expr: ExprId) -> Option<&Type> {
        self.tentative_types.get(&expr)
    }

    pub fn selection(&self, expr: ExprId) -> Option<&OverloadSelection> {
        self.selections.get(&expr)
    }

    pub fn selections(&self) -> &FxHashMap<ExprId, OverloadSelection> {
        &self.selections
    }

    pub fn record_conversion(&mut self, conversion: Conversion, left: Type, right: Type) {
        self.conversions.push(TypeConversionRelation {
            conversion,
            left,
            right,
        });
    }

    pub fn conversions(&self) -> &[TypeConversionRelation] {
        &self.conversions
    }

    pub fn tentative_types(&self) -> &FxHashMap<ExprId, Type> {
        &self.tentative_types
    }

    /// A full-value snapshot of everything an attempted solver branch could
    /// mutate. Deliberately not `Rc`/`Arc`-shared with the live system: a
    /// mutation made after checkpointing must never be visible through the
    /// snapshot.
    pub fn checkpoint(&self) -> StepState {
        StepState {
            bindings: self.bindings.clone(),
            entries: self.entries.clone(),
            tentative_types: self.tentative_types.clone(),
            selections: self.selections.clone(),
            conversions: self.conversions.clone(),
            failed_constraint: self.failed_constraint.clone(),
        }
    }

    /// Restores a previously taken [`StepState`], discarding whatever the
    /// system holds now. Counters (`next_var`, `next_entry_id`) are not part
    /// of the snapshot: no solver step fabricates a fresh variable or a new
    /// constraint id, only activates/deactivates and adds entries already
    /// accounted for by the checkpoint's entry list.
    pub fn restore(&mut self, state: StepState) {
        self.bindings = state.bindings;
        self.entries = state.entries;
        self.tentative_types = state.tentative_types;
        self.selections = state.selections;
        self.conversions = state.conversions;
        self.failed_constraint = state.failed_constraint;
    }
}

/// A complete solver checkpoint, per spec: bindings, AST type map, overload
/// selections, conversion relations, the failed-constraint marker, and the
/// constraint list (each entry's `is_active` included).
#[derive(Clone)]
pub struct StepState {
    bindings: TypeVariableBindings,
    entries: Vec<ConstraintEntry>,
    tentative_types: FxHashMap<ExprId, Type>,
    selections: FxHashMap<ExprId, OverloadSelection>,
    conversions: Vec<TypeConversionRelation>,
    failed_constraint: Option<Constraint>,
}

impl Default for ConstraintSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn constraint_mentions(
    constraint: &Constraint,
    rep: TypeVariable,
    bindings: &TypeVariableBindings,
) -> bool {
    let mentions_type = |ty: &Type| {
        ty.contained_type_variables()
            .iter()
            .any(|v| bindings.representative(*v) == rep)
    };
    match constraint {
        Constraint::Bind(l, r, _) | Constraint::Conversion(l, r, _) => {
            mentions_type(l) || mentions_type(r)
        }
        Constraint::ApplicableFunction(l, r) => mentions_type(l) || mentions_type(r),
        Constraint::BindOverload(v, _, _) => bindings.representative(*v) == rep,
        Constraint::Disjunction(cs) => cs.iter().any(|c| constraint_mentions(c, rep, bindings)),
    }
}
