//! Property and invariant tests that cross module boundaries — the things a
//! single module's own `#[cfg(test)]` block can't see because they depend on
//! the interaction between the bindings table, the constraint store, the
//! matcher, and the solver. Per-module invariants (representative/merge,
//! simplify recursion, occurs-check, function-type contravariance) already
//! have focused unit tests alongside the code they exercise; what's here
//! either restates those as property tests over arbitrary inputs, or
//! exercises the full generate → solve → apply pipeline.
