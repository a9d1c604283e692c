//! lumc-util - Core Utilities and Foundation Types
//!
//! This crate provides the foundational types shared across the Lumen
//! compiler: interned symbols, typed-index vectors, source spans, and the
//! diagnostic reporting machinery. None of these types know anything about
//! Lumen's grammar or type system; they exist so the crates that do (parsing,
//! semantic analysis) can build on primitives that are fast and hard to misuse
//! by accident (e.g. mixing up an expression index with a declaration index).
//!
//! # Modules
//!
//! - [`symbol`]: string interning (`Symbol`)
//! - [`span`]: source locations (`Span`, `FileId`, `SourceMap`)
//! - [`index_vec`]: typed-index vectors (`IndexVec<I, T>`, `Idx`)
//! - [`diagnostic`]: diagnostic construction and reporting (`Handler`, `DiagnosticBuilder`)
//! - [`def_id`]: global definition identifiers (`DefId`)
//! - [`error`]: `thiserror`-derived error types for the above

pub mod def_id;
pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use def_id::{DefId, DefIdGenerator};
pub use diagnostic::{DiagnosticBuilder, Handler, Level};
pub use error::{DiagnosticError, IndexVecError, SourceMapError, SymbolError};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, Span};
pub use symbol::Symbol;

pub use rustc_hash::{FxHashMap, FxHashSet};

/// Define a newtype index backed by `u32` and wire it up to [`Idx`].
///
/// Generated types are `Copy`, totally ordered (by index, which is also
/// insertion order), and hashable, so they work as `BTreeMap`/`HashMap` keys
/// and can be stored in an [`IndexVec`].
#[macro_export]
macro_rules! define_idx {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $crate::Idx for $name {
            fn from_usize(idx: usize) -> Self {
                assert!(idx <= u32::MAX as usize, "index overflow for {}", stringify!($name));
                $name(idx as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}
