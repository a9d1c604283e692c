//! The statement-level driver: pre-check, generate, solve, apply.
//!
//! [`TypeChecker`] is the façade a caller reaches for. It walks a
//! [`SourceFile`]'s top-level statements one at a time, resolving any
//! `UnresolvedDeclRef` left by name resolution, running constraint generation
//! and the solver, and applying the first solution found. Each statement
//! gets its own [`ConstraintSystem`] — there is no cross-statement sharing of
//! type variables, matching the single-statement-at-a-time scope the rest of
//! this crate assumes.

use crate::ast::{BlockContext, Decl, DeclContext, ExprId, ExprKind, SourceFile, Statement};
use crate::constraint::Constraint;
use crate::error::{CheckError, CheckResult};
use crate::generate;
use crate::solver::{self, Solution};
use crate::store::ConstraintSystem;
use crate::types::Type;
use lumc_util::diagnostic::{DiagnosticBuilder, DiagnosticCode};
use lumc_util::{Handler, Symbol};
use std::cell::RefCell;

/// Resolves every `UnresolvedDeclRef` reachable from `id` against `context`,
/// rewriting each to a `DeclRef` or `OverloadedDeclRef` in place.
///
/// Resolution runs as a read-only pass first (so the same `source` can serve
/// as both the arena being walked and the outermost `DeclContext` without a
/// mutable/shared borrow conflict), then a second pass performs the
/// rewrites. Fails closed on the first undeclared name — there is no partial
/// recovery, consistent with a single failing statement aborting the whole
/// checker before any constraints are generated for it.
pub fn precheck(source: &mut SourceFile, handler: &Handler, id: ExprId) -> CheckResult<()> {
    let mut resolutions = Vec::new();
    if let Err(err) = collect_resolutions(&*source, id, &*source, &mut resolutions) {
        report_name_unresolved(source, handler, &err);
        return Err(err);
    }
    for (expr_id, targets) in resolutions {
        let kind = if targets.len() == 1 {
            ExprKind::DeclRef(targets[0])
        } else {
            ExprKind::OverloadedDeclRef(crate::ast::OverloadedDeclRefExpr { targets })
        };
        source.exprs[expr_id].kind = kind;
    }
    Ok(())
}

fn report_name_unresolved(_source: &SourceFile, handler: &Handler, err: &CheckError) {
    if let CheckError::NameUnresolved(name) = err {
        // The offending expression's own span isn't threaded through the
        // error value itself, so this reports against a dummy span rather
        // than the name's actual source location.
        DiagnosticBuilder::error(format!("cannot resolve `{}`", name.as_str()))
            .code(DiagnosticCode::E_SEMANTIC_UNDEFINED_VAR)
            .span(lumc_util::Span::DUMMY)
            .emit(handler);
    }
}

fn collect_resolutions(
    source: &SourceFile,
    id: ExprId,
    context: &dyn DeclContext,
    out: &mut Vec<(ExprId, Vec<crate::ast::DeclId>)>,
) -> CheckResult<()> {
    match &source.exprs[id].kind {
        ExprKind::UnresolvedDeclRef(name) => {
            let targets = context.resolve(*name);
            if targets.is_empty() {
                return Err(CheckError::NameUnresolved(*name));
            }
            out.push((id, targets));
            Ok(())
        }
        ExprKind::Call { callee, argument } => {
            collect_resolutions(source, *callee, context, out)?;
            collect_resolutions(source, *argument, context, out)
        }
        ExprKind::Closure(closure) => {
            let block = BlockContext {
                parameter_name: source.decls[closure.parameter].name(),
                parameter: closure.parameter,
                parent: context,
            };
            for &e in &closure.body {
                collect_resolutions(source, e, &block, out)?;
            }
            Ok(())
        }
        ExprKind::DeclRef(_) | ExprKind::OverloadedDeclRef(_) | ExprKind::IntegerLiteral(_) => Ok(()),
        ExprKind::InjectIntoOptional { .. } | ExprKind::BindOptional { .. } | ExprKind::OptionalEvaluation { .. } => {
            Ok(())
        }
    }
}

/// Optional hooks into [`type_check_expr`]'s three stages, all no-ops by
/// default. Mirrors the specification's `didGenerateConstraints` /
/// `didFoundSolution` / `didApplySolution` callback surface: the first wires
/// up extra constraints once generation has produced a tentative type for the
/// expression (before solving), and the latter two may rewrite the node
/// (returning a replacement `ExprId`, typically the same one) once a solution
/// has been found and once it has been applied, respectively.
#[derive(Default)]
pub struct TypeCheckCallbacks<'a> {
    pub did_generate_constraints: Option<&'a mut dyn FnMut(&mut ConstraintSystem, ExprId)>,
    pub did_find_solution: Option<&'a mut dyn FnMut(&ConstraintSystem, &Solution, ExprId) -> ExprId>,
    pub did_apply_solution: Option<&'a mut dyn FnMut(&ConstraintSystem, &Solution, ExprId) -> ExprId>,
}

/// Runs pre-check, generation, solving, and application for a single
/// expression, in its own fresh [`ConstraintSystem`]. See
/// [`TypeCheckCallbacks`] for the three optional hook points.
pub fn type_check_expr(
    source: &mut SourceFile,
    handler: &Handler,
    expr: ExprId,
    mut callbacks: TypeCheckCallbacks<'_>,
) -> CheckResult<Solution> {
    precheck(source, handler, expr)?;

    let mut cs = ConstraintSystem::new();
    generate::generate_expr(&mut cs, &*source, expr)?;

    if let Some(cb) = callbacks.did_generate_constraints.as_mut() {
        cb(&mut cs, expr);
    }

    let mut solutions = solver::solve(&mut cs, &*source);
    if solutions.is_empty() {
        DiagnosticBuilder::error("no solution satisfies the constraints generated for this expression")
            .code(DiagnosticCode::E_SEMANTIC_TYPE_MISMATCH)
            .span(source.exprs[expr].span)
            .emit(handler);
        return Err(CheckError::NoSolution);
    }
    let solution = solutions.remove(0);

    let mut expr = expr;
    if let Some(cb) = callbacks.did_find_solution.as_mut() {
        expr = cb(&cs, &solution, expr);
    }

    crate::apply::apply_expr(source, &solution, expr)?;

    if let Some(cb) = callbacks.did_apply_solution.as_mut() {
        expr = cb(&cs, &solution, expr);
    }
    let _ = expr;

    Ok(solution)
}

/// Drives type checking for every statement in a [`SourceFile`], one
/// statement at a time. A `let` with an initializer wires a `Conversion`
/// constraint from the initializer's type to the declaration's own type
/// (its annotation, or a fresh variable if none was given) before solving,
/// then writes the solved, fully-simplified declared type back onto the
/// declaration so later statements referencing it by name see a concrete
/// `interface_type`.
pub struct TypeChecker<'a> {
    source: &'a mut SourceFile,
    handler: &'a Handler,
}

impl<'a> TypeChecker<'a> {
    pub fn new(source: &'a mut SourceFile, handler: &'a Handler) -> Self {
        TypeChecker { source, handler }
    }

    pub fn type_check(&mut self) -> CheckResult<()> {
        let statements = self.source.statements.clone();
        for statement in statements {
            self.type_check_statement(statement)?;
        }
        Ok(())
    }

    fn type_check_statement(&mut self, statement: Statement) -> CheckResult<()> {
        match statement {
            Statement::Expr(expr) => {
                type_check_expr(self.source, self.handler, expr, TypeCheckCallbacks::default())?;
                Ok(())
            }
            Statement::Decl(decl_id) => self.type_check_decl(decl_id),
        }
    }

    fn type_check_decl(&mut self, decl_id: crate::ast::DeclId) -> CheckResult<()> {
        let (type_annotation, initializer) = match &self.source.decls[decl_id] {
            Decl::Variable(v) => (v.type_annotation.clone(), v.initializer),
            // A function's interface type is fixed at declaration; there is
            // no body in this AST model for the checker to descend into.
            Decl::Function(_) => return Ok(()),
        };

        let Some(initializer) = initializer else {
            return Ok(());
        };

        let declared_slot: RefCell<Option<Type>> = RefCell::new(None);
        let mut wire_declared_type = |cs: &mut ConstraintSystem, expr: ExprId| {
            let declared_ty = type_annotation.clone().unwrap_or_else(|| cs.fresh_type_variable());
            *declared_slot.borrow_mut() = Some(declared_ty.clone());
            if let Some(initializer_ty) = cs.tentative_type(expr).cloned() {
                cs.add(Constraint::Conversion(initializer_ty, declared_ty, None), true);
            }
        };

        let callbacks = TypeCheckCallbacks {
            did_generate_constraints: Some(&mut wire_declared_type),
            ..Default::default()
        };
        let solution = type_check_expr(self.source, self.handler, initializer, callbacks)?;

        let declared_ty = declared_slot
            .into_inner()
            .expect("wire_declared_type always runs during generation");
        let resolved = solution.bindings.simplify(&declared_ty);
        let coerced_initializer = crate::apply::coerce_expr(self.source, &solution, initializer, &resolved)?;
        if let Decl::Variable(v) = &mut self.source.decls[decl_id] {
            *v.ty.borrow_mut() = Some(resolved);
            v.initializer = Some(coerced_initializer);
        }
        Ok(())
    }
}
