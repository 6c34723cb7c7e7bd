//! Runtime event stream payloads.

use crate::response::Response;

use super::command::Command;

/// Events emitted by the repository and its per-item workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryEvent {
    /// A worker finished a command, either by executing or by folding it.
    Resolved {
        /// The finished command.
        command: Command,
        /// Its own outcome; earlier waiters on the item saw `Skipped`.
        response: Response,
    },
    /// A queued command was displaced by a newer one before it could run.
    Superseded {
        /// The displaced command.
        command: Command,
    },
    /// A catalog fetch replaced the confirmed set.
    CatalogRefreshed {
        /// Number of items in the fetched catalog.
        items: usize,
    },
}
