//! The AST surface this crate consumes.
//!
//! Lexing, parsing, and name resolution are external collaborators; this
//! module is the interface they are expected to hand off to, not a parser.
//! Nodes live in a `SourceFile`-owned arena and are referenced only by
//! `Copy` index (`ExprId`, `DeclId`) — there is no owning pointer for a
//! caller to leak or a cycle for this crate to break, which is the Rust
//! rendering of "AST nodes are not owned by the core" (the original models
//! this with traced back-references instead).

use crate::types::Type;
use lumc_util::{define_idx, Idx, IndexVec, Span, Symbol};
use std::cell::RefCell;
use std::collections::HashMap;

define_idx!(
    /// Index of an [`Expr`] in a [`SourceFile`]'s expression arena.
    ExprId
);
define_idx!(
    /// Index of a [`Decl`] in a [`SourceFile`]'s declaration arena.
    DeclId
);

/// An expression node. `ty` is set during solution application; before that
/// it is `None` even for nodes the solver has already assigned a tentative
/// type to (tentative types live in the constraint system, not on the node).
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
    pub ty: RefCell<Option<Type>>,
}

impl Expr {
    pub fn new(span: Span, kind: ExprKind) -> Self {
        Expr {
            span,
            kind,
            ty: RefCell::new(None),
        }
    }

    pub fn ty(&self) -> Option<Type> {
        self.ty.borrow().clone()
    }

    pub fn set_ty(&self, ty: Type) {
        *self.ty.borrow_mut() = Some(ty);
    }
}

pub enum ExprKind {
    IntegerLiteral(i64),
    DeclRef(DeclId),
    OverloadedDeclRef(OverloadedDeclRefExpr),
    /// Must not survive pre-check; generation fails if it encounters one.
    UnresolvedDeclRef(Symbol),
    Call { callee: ExprId, argument: ExprId },
    Closure(ClosureExpr),

    // Implicit-conversion wrappers. Only ever produced by `apply::coerce`,
    // never by `generate` — see `generate::generate_expr`.
    InjectIntoOptional { sub: ExprId, ty: Type },
    BindOptional { sub: ExprId, ty: Type },
    OptionalEvaluation { sub: ExprId, ty: Type },
}

/// An unresolved-by-name reference with more than one candidate declaration.
/// `targets` is cleared by [`clear_targets`](Self::clear_targets) on arena
/// teardown to sever the only cycle-shaped reference this AST has (a
/// `Vec<DeclId>` pointing back into the same arena's declaration list).
pub struct OverloadedDeclRefExpr {
    pub targets: Vec<DeclId>,
}

impl OverloadedDeclRefExpr {
    pub fn clear_targets(&mut self) {
        self.targets.clear();
    }
}

pub struct ClosureExpr {
    pub parameter: DeclId,
    pub return_type: Option<Type>,
    /// Kept as a `Vec` to match the AST's general statement-sequence shape,
    /// but constraint generation only supports a non-empty body and types
    /// the *last* element (see `generate::generate_closure`); multi-statement
    /// bodies are explicitly deferred, matching the source's `body.last!`.
    pub body: Vec<ExprId>,
}

pub enum Decl {
    Variable(VariableDecl),
    Function(FunctionDecl),
}

impl Decl {
    pub fn name(&self) -> Symbol {
        match self {
            Decl::Variable(v) => v.name,
            Decl::Function(f) => f.name,
        }
    }

    /// The type this declaration is referenced at (`DeclRef`'s
    /// `interfaceType(target)`). A function's interface type is its
    /// signature, fixed at declaration time. A variable's is its type
    /// annotation if present; referencing a variable with neither an
    /// annotation nor an already-solved type is a caller error (forward
    /// reference to an uninferred binding), which is out of scope for a
    /// single-statement-at-a-time checker and is treated as an internal
    /// precondition violation rather than a generation failure.
    pub fn interface_type(&self) -> Type {
        match self {
            Decl::Function(f) => f.interface_type.clone(),
            Decl::Variable(v) => v
                .type_annotation
                .clone()
                .or_else(|| v.ty.borrow().clone())
                .expect("DeclRef target variable has no known interface type"),
        }
    }
}

pub struct VariableDecl {
    pub name: Symbol,
    pub type_annotation: Option<Type>,
    pub initializer: Option<ExprId>,
    pub ty: RefCell<Option<Type>>,
}

impl VariableDecl {
    pub fn new(name: Symbol, type_annotation: Option<Type>, initializer: Option<ExprId>) -> Self {
        VariableDecl {
            name,
            type_annotation,
            initializer,
            ty: RefCell::new(None),
        }
    }
}

pub struct FunctionDecl {
    pub name: Symbol,
    pub interface_type: Type,
}

/// Name resolution lookup over a chain of parent contexts. Zero targets
/// means the name is undeclared; one means a resolved reference; more than
/// one means an overload set.
pub trait DeclContext {
    fn resolve(&self, name: Symbol) -> Vec<DeclId>;
}

/// A statement at the top level of a [`SourceFile`].
#[derive(Clone, Copy)]
pub enum Statement {
    Decl(DeclId),
    Expr(ExprId),
}

/// Owns every `Expr` and `Decl` in one file and exposes module-level name
/// resolution. The sole arena a [`crate::ast::ExprId`]/[`DeclId`] is valid
/// against.
pub struct SourceFile {
    pub exprs: IndexVec<ExprId, Expr>,
    pub decls: IndexVec<DeclId, Decl>,
    pub statements: Vec<Statement>,
    bindings: HashMap<Symbol, Vec<DeclId>>,
}

impl SourceFile {
    pub fn new() -> Self {
        SourceFile {
            exprs: IndexVec::new(),
            decls: IndexVec::new(),
            statements: Vec::new(),
            bindings: HashMap::default(),
        }
    }

    pub fn push_expr(&mut self, span: Span, kind: ExprKind) -> ExprId {
        self.exprs.push(Expr::new(span, kind))
    }

    /// Adds a declaration to the arena and registers it as a resolution
    /// candidate for its name, so later statements can refer to it by name
    /// (including as part of an overload set if the name repeats).
    pub fn push_decl(&mut self, decl: Decl) -> DeclId {
        let name = decl.name();
        let id = self.decls.push(decl);
        self.bindings.entry(name).or_default().push(id);
        id
    }

    pub fn push_statement(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Releases every `OverloadedDeclRefExpr`'s back-reference list. Called
    /// once the file is done being type-checked, breaking the only
    /// self-referential shape this arena has before it is dropped.
    pub fn dispose(&mut self) {
        for expr in self.exprs.iter_mut() {
            if let ExprKind::OverloadedDeclRef(overloaded) = &mut expr.kind {
                overloaded.clear_targets();
            }
        }
    }
}

impl Default for SourceFile {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclContext for SourceFile {
    fn resolve(&self, name: Symbol) -> Vec<DeclId> {
        self.bindings.get(&name).cloned().unwrap_or_default()
    }
}

/// A closure's parameter scope: resolves its own parameter, otherwise
/// chains to whatever context it was opened in (the enclosing source file,
/// or another `BlockContext` for a nested closure).
pub struct BlockContext<'a> {
    pub parameter_name: Symbol,
    pub parameter: DeclId,
    pub parent: &'a dyn DeclContext,
}

impl<'a> DeclContext for BlockContext<'a> {
    fn resolve(&self, name: Symbol) -> Vec<DeclId> {
        if name == self.parameter_name {
            vec![self.parameter]
        } else {
            self.parent.resolve(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumc_util::Span;

    fn sym(s: &str) -> Symbol {
        Symbol::intern(s)
    }

    #[test]
    fn resolve_undeclared_name_returns_empty() {
        let file = SourceFile::new();
        assert!(file.resolve(sym("x")).is_empty());
    }

    #[test]
    fn resolve_single_declaration_returns_one_target() {
        let mut file = SourceFile::new();
        let id = file.push_decl(Decl::Variable(VariableDecl::new(
            sym("x"),
            Some(Type::primitive("Int")),
            None,
        )));
        assert_eq!(file.resolve(sym("x")), vec![id]);
    }

    #[test]
    fn resolve_repeated_name_returns_overload_set() {
        let mut file = SourceFile::new();
        let f1 = file.push_decl(Decl::Function(FunctionDecl {
            name: sym("f"),
            interface_type: Type::function(Type::primitive("Int"), Type::primitive("Int")),
        }));
        let f2 = file.push_decl(Decl::Function(FunctionDecl {
            name: sym("f"),
            interface_type: Type::function(
                Type::primitive("Int"),
                Type::optional(Type::primitive("Int")),
            ),
        }));
        assert_eq!(file.resolve(sym("f")), vec![f1, f2]);
    }

    #[test]
    fn block_context_resolves_parameter_before_parent() {
        let mut file = SourceFile::new();
        let outer = file.push_decl(Decl::Variable(VariableDecl::new(
            sym("x"),
            Some(Type::primitive("Int")),
            None,
        )));
        let param = file.push_decl(Decl::Variable(VariableDecl::new(
            sym("x"),
            Some(Type::primitive("Bool")),
            None,
        )));
        let block = BlockContext {
            parameter_name: sym("x"),
            parameter: param,
            parent: &file,
        };
        assert_eq!(block.resolve(sym("x")), vec![param]);
        assert_ne!(block.resolve(sym("x")), vec![outer]);
    }

    #[test]
    fn block_context_chains_to_parent_for_other_names() {
        let mut file = SourceFile::new();
        let outer = file.push_decl(Decl::Variable(VariableDecl::new(
            sym("y"),
            Some(Type::primitive("Int")),
            None,
        )));
        let param = file.push_decl(Decl::Variable(VariableDecl::new(
            sym("x"),
            Some(Type::primitive("Bool")),
            None,
        )));
        let block = BlockContext {
            parameter_name: sym("x"),
            parameter: param,
            parent: &file,
        };
        assert_eq!(block.resolve(sym("y")), vec![outer]);
    }

    #[test]
    fn dispose_clears_overloaded_targets() {
        let mut file = SourceFile::new();
        let f = file.push_decl(Decl::Function(FunctionDecl {
            name: sym("f"),
            interface_type: Type::primitive("Int"),
        }));
        let id = file.push_expr(
            Span::DUMMY,
            ExprKind::OverloadedDeclRef(OverloadedDeclRefExpr { targets: vec![f] }),
        );
        file.dispose();
        match &file.exprs[id].kind {
            ExprKind::OverloadedDeclRef(o) => assert!(o.targets.is_empty()),
            _ => panic!("expected OverloadedDeclRef"),
        }
    }
}
