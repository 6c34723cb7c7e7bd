//! Per-item serialized execution with latest-wins coalescing.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicI64, Ordering},
};

use hashbrown::HashMap;
use tokio::sync::{Notify, broadcast, oneshot};
use tracing::{debug, trace};

use crate::{
    api::{Api, ApiErrorConverter, TransportError},
    response::Response,
    types::{CommandKind, ItemId, Timestamp},
};

use super::{command::Command, events::RepositoryEvent, local::LocalState, router::ResultRouter};

/// State every worker needs. Must not own a mailbox, or dropping the
/// [`Dispatcher`] would no longer stop the workers.
pub(crate) struct Shared<A, C> {
    pub(crate) api: Arc<A>,
    pub(crate) converter: Arc<C>,
    pub(crate) local: Arc<LocalState>,
    pub(crate) router: ResultRouter,
    pub(crate) events: broadcast::Sender<RepositoryEvent>,
}

/// Single-slot mailbox feeding one item's worker.
#[derive(Debug, Default)]
struct Mailbox {
    slot: Mutex<Slot>,
    ready: Notify,
}

impl Mailbox {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Default)]
struct Slot {
    /// Accepted while the worker was idle; always runs.
    committed: Option<Command>,
    /// Newest command that arrived while the worker was busy.
    latest: Option<Command>,
    busy: bool,
    closed: bool,
}

impl Slot {
    /// Queues `command`, returning whatever it displaced.
    fn offer(&mut self, command: Command) -> Option<Command> {
        if !self.busy && self.committed.is_none() {
            self.committed = Some(command);
            None
        } else {
            self.latest.replace(command)
        }
    }

    fn take(&mut self) -> Option<Command> {
        let next = self.committed.take().or_else(|| self.latest.take());
        self.busy = next.is_some();
        next
    }
}

enum Step {
    Run(Command),
    Wait,
    Exit,
}

/// Accepts commands from any caller and runs at most one remote call per item
/// at a time. Workers are spawned lazily, one per distinct item, and stay alive
/// until the dispatcher is dropped.
pub(crate) struct Dispatcher<A, C> {
    shared: Arc<Shared<A, C>>,
    mailboxes: Mutex<HashMap<ItemId, Arc<Mailbox>>>,
    clock: AtomicI64,
}

impl<A, C> Dispatcher<A, C>
where
    A: Api,
    C: ApiErrorConverter,
{
    pub(crate) fn new(shared: Shared<A, C>) -> Self {
        Self {
            shared: Arc::new(shared),
            mailboxes: Mutex::new(HashMap::new()),
            clock: AtomicI64::new(1),
        }
    }

    /// Issues a command: stamps it, applies its optimistic effect, registers the
    /// caller and hands it to the item's worker, all before returning.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn submit(&self, kind: CommandKind, item_id: ItemId) -> oneshot::Receiver<Response> {
        let mailbox = self.mailbox_for(&item_id);

        let (rx, superseded) = {
            let mut slot = mailbox.lock();
            // Stamped under the slot lock so per-item arrival order is timestamp order.
            let command = Command::new(kind, item_id, self.next_timestamp());
            self.shared
                .local
                .update_and_publish(|store| command.pre_execute(store));
            let rx = self.shared.router.register(&command);
            (rx, slot.offer(command))
        };
        mailbox.ready.notify_one();

        if let Some(command) = superseded {
            trace!(item = %command.item_id(), kind = %command.kind(), ts = command.timestamp(), "command superseded");
            let _ = self.shared.events.send(RepositoryEvent::Superseded { command });
        }
        rx
    }

    /// Number of items that have a worker.
    pub(crate) fn workers(&self) -> usize {
        self.lock_mailboxes().len()
    }

    fn next_timestamp(&self) -> Timestamp {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn mailbox_for(&self, item_id: &ItemId) -> Arc<Mailbox> {
        let mut mailboxes = self.lock_mailboxes();
        if let Some(mailbox) = mailboxes.get(item_id) {
            return Arc::clone(mailbox);
        }

        let mailbox = Arc::new(Mailbox::default());
        mailboxes.insert(item_id.clone(), Arc::clone(&mailbox));
        debug!(item = %item_id, "spawning item worker");
        tokio::spawn(run_worker(
            item_id.clone(),
            Arc::clone(&mailbox),
            Arc::clone(&self.shared),
        ));
        mailbox
    }

    fn lock_mailboxes(&self) -> MutexGuard<'_, HashMap<ItemId, Arc<Mailbox>>> {
        self.mailboxes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A, C> Drop for Dispatcher<A, C> {
    fn drop(&mut self) {
        let mailboxes = self
            .mailboxes
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for mailbox in mailboxes.values() {
            mailbox.lock().closed = true;
            mailbox.ready.notify_one();
        }
    }
}

async fn run_worker<A, C>(item_id: ItemId, mailbox: Arc<Mailbox>, shared: Arc<Shared<A, C>>)
where
    A: Api,
    C: ApiErrorConverter,
{
    // Last command this worker executed; cleared when it failed.
    let mut last_executed: Option<Command> = None;

    loop {
        let step = {
            let mut slot = mailbox.lock();
            match slot.take() {
                Some(command) => Step::Run(command),
                None if slot.closed => Step::Exit,
                None => Step::Wait,
            }
        };

        let command = match step {
            Step::Run(command) => command,
            Step::Wait => {
                mailbox.ready.notified().await;
                continue;
            }
            Step::Exit => break,
        };

        let response = process(&command, &mut last_executed, &mailbox, &shared).await;
        let resolved = shared.router.deliver(&command, &response);
        trace!(item = %item_id, ts = command.timestamp(), resolved, "command resolved");
        let _ = shared
            .events
            .send(RepositoryEvent::Resolved { command, response });
    }

    debug!(item = %item_id, "item worker stopped");
}

async fn process<A, C>(
    command: &Command,
    last_executed: &mut Option<Command>,
    mailbox: &Mailbox,
    shared: &Arc<Shared<A, C>>,
) -> Response
where
    A: Api,
    C: ApiErrorConverter,
{
    if last_executed
        .as_ref()
        .is_some_and(|previous| previous.is_same(command))
    {
        // The previous identical call succeeded and nothing ran since, so the
        // remote side is already in the requested state.
        debug!(item = %command.item_id(), kind = %command.kind(), "folding repeated command");
        shared.local.update_and_sync(|store| command.commit(store));
        return Response::skipped();
    }

    *last_executed = Some(command.clone());

    let call = {
        let shared = Arc::clone(shared);
        let command = command.clone();
        tokio::spawn(async move { command.call(shared.api.as_ref()).await })
    };
    let outcome = match call.await {
        Ok(outcome) => outcome,
        Err(err) => Err(TransportError::new(format!("api call aborted: {err}"))),
    };

    // Settled under the slot lock so no same-kind command can slip in between
    // the check and the revert.
    let response = {
        let slot = mailbox.lock();
        let superseded_by_same = slot
            .latest
            .as_ref()
            .is_some_and(|queued| queued.is_same(command));
        command.settle(
            outcome,
            shared.converter.as_ref(),
            &shared.local,
            superseded_by_same,
        )
    };
    if response.is_failed() {
        *last_executed = None;
    }
    response
}
