//! Replay-latest broadcast of the optimistic item count.

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::warn;

/// Publishing side of the counter.
///
/// Not synchronized on its own: it lives inside the same critical section as the
/// [`OptimisticStore`](crate::core::store::OptimisticStore), so values go out in
/// exactly the order the state changed and a new subscriber can never miss the
/// value published between reading `latest` and attaching to the channel.
#[derive(Debug)]
pub(crate) struct CounterStream {
    latest: usize,
    tx: broadcast::Sender<usize>,
}

impl CounterStream {
    /// Creates the stream with a first value and a per-subscriber backlog bound.
    /// `capacity` must be positive; [`RepositoryConfig::validate`] enforces it.
    ///
    /// [`RepositoryConfig::validate`]: super::handle::RepositoryConfig::validate
    pub(crate) fn new(initial: usize, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { latest: initial, tx }
    }

    /// Records `value` as current and fans it out. Repeated values are emitted too.
    pub(crate) fn publish(&mut self, value: usize) {
        self.latest = value;
        // No receivers is fine; late subscribers start from `latest`.
        let _ = self.tx.send(value);
    }

    /// Most recently published value.
    pub(crate) fn latest(&self) -> usize {
        self.latest
    }

    /// Attaches a subscriber that first sees the current value.
    pub(crate) fn subscribe(&self) -> CounterSubscription {
        CounterSubscription {
            replay: Some(self.latest),
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving side returned by `ItemRepository::counter`.
#[derive(Debug)]
pub struct CounterSubscription {
    replay: Option<usize>,
    rx: broadcast::Receiver<usize>,
}

impl CounterSubscription {
    /// Waits for the next value. `None` once the repository is gone.
    ///
    /// A subscriber that falls more than the configured capacity behind skips
    /// the values it missed.
    pub async fn next(&mut self) -> Option<usize> {
        if let Some(value) = self.replay.take() {
            return Some(value);
        }
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "counter subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next value if one is already available.
    pub fn try_next(&mut self) -> Option<usize> {
        if let Some(value) = self.replay.take() {
            return Some(value);
        }
        loop {
            match self.rx.try_recv() {
                Ok(value) => return Some(value),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "counter subscriber lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Collects every value available right now.
    pub fn drain(&mut self) -> Vec<usize> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}
