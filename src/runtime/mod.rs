//! Command pipeline: per-item workers, result routing and the counter stream.

/// Add/remove command values and their state transitions.
pub mod command;
/// Replay-latest counter broadcast.
pub mod counter;
mod dispatcher;
/// Event stream types emitted by the repository.
pub mod events;
/// Repository handle, configuration and errors.
pub mod handle;
mod local;
mod router;
