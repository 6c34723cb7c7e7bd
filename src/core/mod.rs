//! Optimistic membership bookkeeping.

/// Set aliases.
pub mod indices;
/// Added / pending-addition / pending-removal sets and the derived counter.
pub mod store;
