//! The union-find-like substitution map over type variables.

use crate::types::{Type, TypeVariable};
use std::collections::HashMap;

/// What a single type variable is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Binding {
    Fixed(Type),
    /// Redirects to another variable. Invariant: at most one hop — `merge`
    /// rewrites every existing `Transfer` pointing at the variable being
    /// absorbed so no chain is ever longer than one link.
    Transfer(TypeVariable),
}

/// Maps type variables to `Free | Fixed(T) | Transfer(v)`. A variable with
/// no entry is `Free`.
#[derive(Clone, Debug, Default)]
pub struct TypeVariableBindings {
    entries: HashMap<TypeVariable, Binding>,
}

impl TypeVariableBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// The representative of `v`: follows one `Transfer` hop if present.
    pub fn representative(&self, v: TypeVariable) -> TypeVariable {
        match self.entries.get(&v) {
            Some(Binding::Transfer(rep)) => *rep,
            _ => v,
        }
    }

    /// Chases `Transfer` to a `Fixed` binding, if one exists for `v`'s class.
    pub fn fixed_type(&self, v: TypeVariable) -> Option<Type> {
        match self.entries.get(&self.representative(v)) {
            Some(Binding::Fixed(ty)) => Some(ty.clone()),
            _ => None,
        }
    }

    pub fn is_free(&self, v: TypeVariable) -> bool {
        self.fixed_type(v).is_none()
    }

    /// Unifies two representatives. Precondition: both `v1` and `v2` are
    /// already representatives (i.e. `representative(v) == v`) and neither
    /// is `Fixed`. No-op if they are already the same variable.
    ///
    /// The smaller-id variable becomes the representative; the other is
    /// rewritten to `Transfer(rep)`, and every entry that previously
    /// transferred to the absorbed variable is re-pointed at the new
    /// representative directly, preserving the one-hop invariant.
    pub fn merge(&mut self, v1: TypeVariable, v2: TypeVariable) {
        debug_assert!(self.representative(v1) == v1, "v1 must be a representative");
        debug_assert!(self.representative(v2) == v2, "v2 must be a representative");
        debug_assert!(self.fixed_type(v1).is_none(), "v1 must not be Fixed");
        debug_assert!(self.fixed_type(v2).is_none(), "v2 must not be Fixed");

        if v1 == v2 {
            return;
        }
        let (rep, absorbed) = if v1.id() < v2.id() { (v1, v2) } else { (v2, v1) };

        for binding in self.entries.values_mut() {
            if let Binding::Transfer(target) = binding {
                if *target == absorbed {
                    *target = rep;
                }
            }
        }
        self.entries.insert(absorbed, Binding::Transfer(rep));
    }

    /// Binds `v`'s representative to a concrete type. Precondition: `v` is a
    /// representative, currently `Free`, and `ty` is not itself a
    /// `TypeVariable` (a type variable is bound via `merge`, not `assign`).
    pub fn assign(&mut self, v: TypeVariable, ty: Type) {
        debug_assert!(self.representative(v) == v, "v must be a representative");
        debug_assert!(self.is_free(v), "v must be Free");
        debug_assert!(!ty.is_type_variable(), "assign target must not be a TypeVariable");
        self.entries.insert(v, Binding::Fixed(ty));
    }

    /// Recursively replaces every `TypeVariable` reachable inside `ty` with
    /// its fixed type (if bound) or its representative (if still `Free`).
    /// Stable under a fully-bound closure: contains no `TypeVariable` left
    /// once every reachable variable is `Fixed`.
    pub fn simplify(&self, ty: &Type) -> Type {
        match ty {
            Type::TypeVariable(v) => match self.fixed_type(*v) {
                Some(fixed) => self.simplify(&fixed),
                None => Type::TypeVariable(self.representative(*v)),
            },
            Type::Function { parameter, result } => Type::Function {
                parameter: Box::new(self.simplify(parameter)),
                result: Box::new(self.simplify(result)),
            },
            Type::Optional(wrapped) => Type::optional(self.simplify(wrapped)),
            Type::Primitive(_) | Type::TopAny => ty.clone(),
        }
    }
}
