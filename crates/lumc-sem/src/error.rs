//! Errors surfaced by statement type-checking.

use crate::ast::ExprId;
use lumc_util::Symbol;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("failed to resolve: {0}")]
    NameUnresolved(Symbol),
    #[error("no solution")]
    NoSolution,
    #[error("invalid node encountered during constraint generation at {0:?}")]
    InvalidNodeDuringGeneration(ExprId),
    #[error("invalid node encountered during solution application at {0:?}")]
    InvalidNodeDuringApply(ExprId),
    /// The apply phase found no conversion path despite the solver claiming
    /// success. Should not happen for well-formed programs — this is always
    /// a bug, never a user-facing diagnostic.
    #[error("no conversion path found for {0:?} despite solver success")]
    CoerceUnconsidered(ExprId),
    /// The source AST model assumes a closure body is a single tail
    /// expression (`body.last!`); a statement-level typing pass for
    /// multi-statement bodies does not exist yet.
    #[error("multi-statement closure bodies are not supported")]
    UnsupportedMultiStatementClosure,
}

pub type CheckResult<T> = Result<T, CheckError>;
