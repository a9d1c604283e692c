//! Type model.
//!
//! `Type` is the concrete type representation the rest of the crate is built
//! around: a small, closed set of variants with no generics, no subtyping
//! beyond optional-wrapping, and no user-defined nominal types beyond
//! `Primitive`'s name.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// A type variable identity. Ordered and compared by id only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeVariable(pub u32);

impl TypeVariable {
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TypeVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$T{}", self.0)
    }
}

/// The concrete type representation.
///
/// `TypeVariable` is the only variant whose equality is identity-by-id rather
/// than structural; every other variant compares structurally, which is why
/// `Type` derives `PartialEq`/`Eq` directly (the derive is correct for
/// `TypeVariable` too, since its own `PartialEq` is id-only) and why ordering
/// between variants of different tags is never relied upon anywhere in this
/// crate: `TypeVariable`'s `Ord` is only ever consulted to compare two
/// `TypeVariable`s against each other (e.g. picking a representative by
/// smallest id), never across variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    /// A nominal, non-generic named type (`Int`, `Bool`, ...), compared by name.
    Primitive(String),
    /// A function from one parameter type to one result type.
    Function {
        parameter: Box<Type>,
        result: Box<Type>,
    },
    /// `T?` — `wrapped` may itself be `Optional`, nesting arbitrarily.
    Optional(Box<Type>),
    /// An as-yet-unbound type variable.
    TypeVariable(TypeVariable),
    /// The universal supertype. Only ever produced as a `join` sentinel; a
    /// well-formed solution never assigns `TopAny` to a type variable.
    TopAny,
}

impl Type {
    pub fn primitive(name: impl Into<String>) -> Type {
        Type::Primitive(name.into())
    }

    pub fn function(parameter: Type, result: Type) -> Type {
        Type::Function {
            parameter: Box::new(parameter),
            result: Box::new(result),
        }
    }

    pub fn optional(wrapped: Type) -> Type {
        Type::Optional(Box::new(wrapped))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Type::Optional(_))
    }

    pub fn is_type_variable(&self) -> bool {
        matches!(self, Type::TypeVariable(_))
    }

    /// If `self` is `TypeVariable(v)`, returns `v`.
    pub fn as_type_variable(&self) -> Option<TypeVariable> {
        match self {
            Type::TypeVariable(v) => Some(*v),
            _ => None,
        }
    }

    /// The set of `TypeVariable`s reachable inside this type. A `BTreeSet` so
    /// callers (occurs-check, `simplify`) get deterministic iteration order
    /// without a separate sort step.
    pub fn contained_type_variables(&self) -> BTreeSet<TypeVariable> {
        let mut out = BTreeSet::new();
        self.collect_type_variables(&mut out);
        out
    }

    fn collect_type_variables(&self, out: &mut BTreeSet<TypeVariable>) {
        match self {
            Type::TypeVariable(v) => {
                out.insert(*v);
            }
            Type::Function { parameter, result } => {
                parameter.collect_type_variables(out);
                result.collect_type_variables(out);
            }
            Type::Optional(wrapped) => wrapped.collect_type_variables(out),
            Type::Primitive(_) | Type::TopAny => {}
        }
    }

    /// `[T0=self, T1, ..., Tn]`, unwrapping one `Optional` layer per step.
    /// `.len()` is the optional-nesting depth (0 for a non-optional type).
    pub fn look_through_all_optionals(&self) -> Vec<Type> {
        let mut chain = vec![self.clone()];
        let mut current = self;
        while let Type::Optional(wrapped) = current {
            chain.push((**wrapped).clone());
            current = wrapped;
        }
        chain
    }

    /// The type wrapped by one layer of `Optional`, if any.
    pub fn wrapped(&self) -> Option<&Type> {
        match self {
            Type::Optional(wrapped) => Some(wrapped),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(name) => write!(f, "{name}"),
            Type::Function { parameter, result } => write!(f, "({parameter})->({result})"),
            Type::Optional(wrapped) => write!(f, "{wrapped}?"),
            Type::TypeVariable(v) => write!(f, "{v}"),
            Type::TopAny => write!(f, "Any"),
        }
    }
}

/// Compares two `TypeVariable`s directly; unrelated to `Type`'s derived `Eq`.
impl PartialOrd for Type {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Type::TypeVariable(a), Type::TypeVariable(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Least common supertype in the conversion lattice.
///
/// `join(T,T)=T`; `join(T,T?)=T?`; `join(T?,T?)=join(T,T)?`; otherwise
/// `TopAny`. Never returns an `Option` — `TopAny` is itself the "no useful
/// upper bound" sentinel.
pub fn join(a: &Type, b: &Type) -> Type {
    if a == b {
        return a.clone();
    }
    match (a, b) {
        (Type::Optional(a_inner), Type::Optional(b_inner)) => {
            Type::optional(join(a_inner, b_inner))
        }
        (Type::Optional(a_inner), _) if a_inner.as_ref() == b => a.clone(),
        (_, Type::Optional(b_inner)) if b_inner.as_ref() == a => b.clone(),
        _ => Type::TopAny,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tv(id: u32) -> Type {
        Type::TypeVariable(TypeVariable(id))
    }

    fn int() -> Type {
        Type::primitive("Int")
    }

    // ===== join =====

    #[test]
    fn join_identical_types_is_identity() {
        assert_eq!(join(&int(), &int()), int());
    }

    #[test]
    fn join_t_and_optional_t_is_optional_t() {
        assert_eq!(join(&int(), &Type::optional(int())), Type::optional(int()));
        assert_eq!(join(&Type::optional(int()), &int()), Type::optional(int()));
    }

    #[test]
    fn join_optional_optional_recurses_then_wraps() {
        let bool_ty = Type::primitive("Bool");
        assert_eq!(
            join(&Type::optional(int()), &Type::optional(bool_ty)),
            Type::optional(Type::TopAny)
        );
    }

    #[test]
    fn join_unrelated_types_is_top_any() {
        assert_eq!(join(&int(), &Type::primitive("Bool")), Type::TopAny);
    }

    // ===== contained_type_variables =====

    #[test]
    fn contained_type_variables_of_primitive_is_empty() {
        assert!(int().contained_type_variables().is_empty());
    }

    #[test]
    fn contained_type_variables_collects_from_function() {
        let f = Type::function(tv(2), tv(1));
        let vars: Vec<_> = f.contained_type_variables().into_iter().collect();
        assert_eq!(vars, vec![TypeVariable(1), TypeVariable(2)]);
    }

    #[test]
    fn contained_type_variables_collects_through_optional() {
        let t = Type::optional(tv(0));
        assert_eq!(
            t.contained_type_variables(),
            BTreeSet::from([TypeVariable(0)])
        );
    }

    // ===== look_through_all_optionals =====

    #[test]
    fn look_through_all_optionals_non_optional_is_singleton() {
        assert_eq!(int().look_through_all_optionals(), vec![int()]);
    }

    #[test]
    fn look_through_all_optionals_depth_matches_nesting() {
        let t = Type::optional(Type::optional(int()));
        let chain = t.look_through_all_optionals();
        assert_eq!(chain, vec![t.clone(), Type::optional(int()), int()]);
        assert_eq!(chain.len(), 3);
    }

    // ===== TypeVariable identity =====

    #[test]
    fn type_variable_equality_is_by_id() {
        assert_eq!(TypeVariable(5), TypeVariable(5));
        assert_ne!(TypeVariable(5), TypeVariable(6));
    }

    #[test]
    fn type_variable_ordering_is_by_id() {
        assert!(TypeVariable(1) < TypeVariable(2));
    }
}
