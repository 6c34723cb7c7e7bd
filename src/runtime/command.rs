//! One intended add/remove operation and its state transitions.

use tracing::{debug, warn};

use crate::{
    api::{Api, ApiError, ApiErrorConverter, ApiResponse, TransportError, status},
    core::store::OptimisticStore,
    response::Response,
    types::{CommandKind, ItemId, Timestamp},
};

use super::local::LocalState;

/// Immutable request to add or remove one item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    item_id: ItemId,
    timestamp: Timestamp,
    kind: CommandKind,
}

impl Command {
    /// Builds a command. Timestamps must be unique per repository.
    pub fn new(kind: CommandKind, item_id: ItemId, timestamp: Timestamp) -> Self {
        Self {
            item_id,
            timestamp,
            kind,
        }
    }

    /// Target item.
    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    /// Issue timestamp.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Requested operation.
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Same kind and same item, ignoring the timestamp.
    pub fn is_same(&self, other: &Command) -> bool {
        self.kind == other.kind && self.item_id == other.item_id
    }

    /// Issued at or after `other`.
    pub fn is_not_before(&self, other: &Command) -> bool {
        self.timestamp >= other.timestamp
    }

    /// Optimistic effect applied the moment the command is issued.
    pub(crate) fn pre_execute(&self, store: &mut OptimisticStore) {
        match self.kind {
            CommandKind::Add => {
                store.mark_pending_add(&self.item_id);
                store.clear_pending_remove(&self.item_id);
            }
            CommandKind::Remove => {
                store.mark_pending_remove(&self.item_id);
                store.clear_pending_add(&self.item_id);
            }
        }
    }

    /// Turns the pending mark into confirmed state.
    pub(crate) fn commit(&self, store: &mut OptimisticStore) {
        match self.kind {
            CommandKind::Add => store.commit_add(&self.item_id),
            CommandKind::Remove => store.commit_remove(&self.item_id),
        }
    }

    fn revert(&self, store: &mut OptimisticStore) {
        match self.kind {
            CommandKind::Add => store.clear_pending_add(&self.item_id),
            CommandKind::Remove => store.clear_pending_remove(&self.item_id),
        }
    }

    /// Failure statuses meaning the remote side already is where we want it.
    fn is_idempotent(&self, code: u16) -> bool {
        match self.kind {
            CommandKind::Add => code == status::CONFLICT,
            CommandKind::Remove => code == status::NOT_FOUND,
        }
    }

    /// Performs the remote call for this command.
    pub(crate) async fn call<A: Api>(&self, api: &A) -> Result<ApiResponse, TransportError> {
        debug!(item = %self.item_id, kind = %self.kind, ts = self.timestamp, "executing command");
        match self.kind {
            CommandKind::Add => api.add_item(&self.item_id).await,
            CommandKind::Remove => api.remove_item(&self.item_id).await,
        }
    }

    /// Reconciles optimistic state with the outcome of [`Command::call`].
    ///
    /// Success and idempotent statuses commit, publishing the counter only if
    /// the commit moved it. Anything else reverts the pending mark and
    /// republishes, unless `superseded_by_same` says a newer command of the same
    /// kind is queued for the item: its pending mark is this one, and it stays.
    pub(crate) fn settle<C>(
        &self,
        outcome: Result<ApiResponse, TransportError>,
        converter: &C,
        local: &LocalState,
        superseded_by_same: bool,
    ) -> Response
    where
        C: ApiErrorConverter,
    {
        match outcome {
            Ok(reply) if reply.is_successful() || self.is_idempotent(reply.code()) => {
                local.update_and_sync(|store| self.commit(store));
                Response::successful()
            }
            Ok(reply) => {
                warn!(item = %self.item_id, kind = %self.kind, code = reply.code(), "remote rejected command");
                self.fail(local, superseded_by_same);
                let error = reply.cause().cloned().unwrap_or_else(|| ApiError::Status {
                    code: reply.code(),
                    message: String::new(),
                });
                Response::failed(converter.convert_api_error(&error))
            }
            Err(err) => {
                warn!(item = %self.item_id, kind = %self.kind, error = %err, "command transport failure");
                self.fail(local, superseded_by_same);
                Response::failed(converter.convert_api_error(&ApiError::Transport(err)))
            }
        }
    }

    fn fail(&self, local: &LocalState, superseded_by_same: bool) {
        if superseded_by_same {
            debug!(item = %self.item_id, kind = %self.kind, "keeping pending mark for queued retry");
        } else {
            local.update_and_publish(|store| self.revert(store));
        }
    }
}
