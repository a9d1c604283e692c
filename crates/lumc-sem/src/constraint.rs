//! Constraint representation: the vocabulary the solver operates on.

use crate::ast::{DeclId, ExprId};
use crate::types::{Type, TypeVariable};

/// Which implicit conversion satisfied a `Bind`/`Conversion` constraint.
/// Recorded as a [`TypeConversionRelation`] once a constraint using one is
/// simplified, and consulted during solution application to decide what
/// wrapper node (if any) to insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conversion {
    DeepEquality,
    ValueToOptional,
    OptionalToOptional,
}

/// A candidate declaration for an unresolved overloaded reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverloadChoice {
    pub decl: DeclId,
}

/// The overload actually picked for a `DeclRef`/`OverloadedDeclRef` node,
/// plus the type its declaration was bound at (`interfaceType(target)`
/// before any solver substitution — the type the `Bind` constraint used).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverloadSelection {
    pub choice: OverloadChoice,
    pub opened_type: Type,
}

/// A proof that a specific conversion was used between two concrete types.
/// Consulted by `apply::coerce` to decide which wrapper node to insert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeConversionRelation {
    pub conversion: Conversion,
    pub left: Type,
    pub right: Type,
}

/// Shared tag distinguishing `Bind` (structural equality up to variable
/// binding) from `Conversion` (left convertible to right) constraints,
/// without duplicating their payload shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EqualityKind {
    Bind,
    Conversion,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constraint {
    /// Structural equality up to variable binding, optionally already
    /// decided to proceed via a specific conversion.
    Bind(Type, Type, Option<Conversion>),
    /// `left` convertible to `right`, optionally already decided via a
    /// specific conversion.
    Conversion(Type, Type, Option<Conversion>),
    /// `right` (the callee) must be callable with parameter/result shape
    /// `left`. Kept deferred until `right` is a concrete `Function`; `left`
    /// is always constructed as a `Type::Function` by `generate`.
    ApplicableFunction(Type, Type),
    BindOverload(TypeVariable, OverloadChoice, ExprId),
    /// Exactly one alternative must hold.
    Disjunction(Vec<Constraint>),
}

impl Constraint {
    /// The shared kind of `Bind`/`Conversion`, used by matching code that
    /// treats both uniformly except for the eventual binding semantics.
    pub fn equality_kind(&self) -> Option<EqualityKind> {
        match self {
            Constraint::Bind(..) => Some(EqualityKind::Bind),
            Constraint::Conversion(..) => Some(EqualityKind::Conversion),
            _ => None,
        }
    }
}

/// An identity-equatable wrapper around a [`Constraint`] with a mutable
/// worklist bit. Two entries with value-equal constraints are still
/// distinct entries — identity is the assigned `id`, not the payload.
#[derive(Clone, Debug)]
pub struct ConstraintEntry {
    pub id: u32,
    pub constraint: Constraint,
    pub is_active: bool,
}

impl PartialEq for ConstraintEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for ConstraintEntry {}
