//! Hindley-Milner-style type inference with function overloading and
//! optional (nullable) types.
//!
//! A statement's expression tree is type-checked in three passes: pre-check
//! resolves names against a [`ast::DeclContext`], constraint generation
//! (`generate`) walks the tree post-order recording [`constraint::Constraint`]s
//! into a [`store::ConstraintSystem`], and the solver (`solver`) searches for
//! an assignment of every free [`types::TypeVariable`] that satisfies them —
//! backtracking over ambiguous overloads via checkpoint/restore. The winning
//! [`solver::Solution`] is then applied (`apply`), assigning each node its
//! fixed type and inserting implicit `Optional`-conversion wrapper nodes
//! where the declared and inferred types differ by a wrapping depth.
//!
//! [`checker::TypeChecker`] drives all of this per top-level statement; most
//! callers only need that and [`ast::SourceFile`].

mod apply;
mod ast;
mod bindings;
mod checker;
mod constraint;
mod edge_cases;
mod error;
mod generate;
mod match_types;
mod render;
mod solver;
mod store;
mod types;

pub use apply::{apply_expr, coerce_expr};
pub use ast::{
    BlockContext, ClosureExpr, Decl, DeclContext, DeclId, Expr, ExprId, ExprKind, FunctionDecl,
    OverloadedDeclRefExpr, SourceFile, Statement, VariableDecl,
};
pub use bindings::TypeVariableBindings;
pub use checker::{precheck, type_check_expr, TypeCheckCallbacks, TypeChecker};
pub use constraint::{
    Constraint, ConstraintEntry, Conversion, EqualityKind, OverloadChoice, OverloadSelection,
    TypeConversionRelation,
};
pub use error::{CheckError, CheckResult};
pub use generate::{generate_decl_type, generate_expr};
pub use match_types::{match_types, simplify, MatchOptions, SolveResult};
pub use render::render_expr;
pub use solver::{solve, Solution};
pub use store::{ConstraintSystem, StepState};
pub use types::{join, Type, TypeVariable};
