//! Matches finished commands back to the callers waiting on them.

use std::sync::{Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use tokio::sync::oneshot;
use tracing::trace;

use crate::{response::Response, types::ItemId};

use super::command::Command;

#[derive(Debug)]
struct Waiter {
    command: Command,
    reply: oneshot::Sender<Response>,
}

/// Outstanding callers keyed by item identity.
///
/// A finished command resolves every waiter on its item issued at or before it:
/// the waiter for that very command gets the real response, older ones were
/// coalesced away and get [`Response::skipped`]. Waiters are removed as they are
/// resolved, so each caller hears back exactly once.
#[derive(Debug, Default)]
pub(crate) struct ResultRouter {
    waiting: Mutex<HashMap<ItemId, Vec<Waiter>>>,
}

impl ResultRouter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Must be called before the command can possibly finish.
    pub(crate) fn register(&self, command: &Command) -> oneshot::Receiver<Response> {
        let (reply, rx) = oneshot::channel();
        self.lock()
            .entry(command.item_id().clone())
            .or_default()
            .push(Waiter {
                command: command.clone(),
                reply,
            });
        rx
    }

    /// Resolves the waiters `finished` is responsible for and returns how many.
    pub(crate) fn deliver(&self, finished: &Command, response: &Response) -> usize {
        let resolved = {
            let mut waiting = self.lock();
            let Some(waiters) = waiting.get_mut(finished.item_id()) else {
                return 0;
            };
            let (due, later): (Vec<_>, Vec<_>) = std::mem::take(waiters)
                .into_iter()
                .partition(|w| finished.is_not_before(&w.command));
            if later.is_empty() {
                waiting.remove(finished.item_id());
            } else {
                *waiters = later;
            }
            due
        };

        let count = resolved.len();
        for waiter in resolved {
            let out = if waiter.command == *finished {
                response.clone()
            } else {
                trace!(item = %finished.item_id(), ts = waiter.command.timestamp(), by = finished.timestamp(), "superseded waiter skipped");
                Response::skipped()
            };
            // The caller may have stopped waiting; nothing to do then.
            let _ = waiter.reply.send(out);
        }
        count
    }

    /// Number of callers still waiting on `id`.
    #[cfg(test)]
    pub(crate) fn waiting_on(&self, id: &ItemId) -> usize {
        self.lock().get(id).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ItemId, Vec<Waiter>>> {
        self.waiting.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
