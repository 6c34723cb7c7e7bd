use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    api::{Api, ApiErrorConverter, DefaultErrorConverter, Item, TransportError},
    core::store::OptimisticStore,
    response::Response,
    types::{CommandKind, ItemId},
};

use super::{
    counter::CounterSubscription,
    dispatcher::{Dispatcher, Shared},
    events::RepositoryEvent,
    local::LocalState,
    router::ResultRouter,
};

/// Failure of a repository operation that has no [`Response`] to carry it.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The catalog could not be fetched; local state is untouched.
    #[error("catalog fetch failed: {0}")]
    Fetch(#[from] TransportError),
}

/// Why a [`RepositoryConfig`] could not be loaded or accepted.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("read {}: {source}", path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid JSON for this config.
    #[error("parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Channel capacities for a repository. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Values a counter subscriber may fall behind before it starts skipping.
    pub counter_capacity: usize,
    /// Events a [`RepositoryEvent`] subscriber may fall behind before it lags.
    pub event_capacity: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            counter_capacity: 256,
            event_capacity: 1024,
        }
    }
}

impl RepositoryConfig {
    /// Parses and validates a JSON config.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&s)
    }

    /// Rejects zero capacities.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.counter_capacity == 0 {
            return Err(ConfigError::Invalid("counter_capacity must be positive".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid("event_capacity must be positive".to_string()));
        }
        Ok(())
    }
}

/// Handle to an optimistic recommended-items repository.
///
/// Cheap to clone; all clones share one optimistic store, one counter and one
/// set of per-item workers. Workers stop once the last clone, and every future
/// returned by [`ItemRepository::add_item`] / [`ItemRepository::remove_item`],
/// has been dropped.
pub struct ItemRepository<A, C = DefaultErrorConverter> {
    inner: Arc<Inner<A, C>>,
}

impl<A, C> Clone for ItemRepository<A, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<A, C> {
    api: Arc<A>,
    local: Arc<LocalState>,
    events_tx: broadcast::Sender<RepositoryEvent>,
    dispatcher: Dispatcher<A, C>,
}

impl<A: Api> ItemRepository<A, DefaultErrorConverter> {
    /// Repository with [`DefaultErrorConverter`] and default configuration.
    pub fn new(api: A) -> Self {
        Self::with_converter(api, DefaultErrorConverter)
    }
}

impl<A, C> ItemRepository<A, C>
where
    A: Api,
    C: ApiErrorConverter,
{
    /// Repository that maps remote errors through `converter`.
    pub fn with_converter(api: A, converter: C) -> Self {
        Self::build(api, converter, &RepositoryConfig::default())
    }

    /// Repository with explicit channel capacities.
    ///
    /// Fails with [`ConfigError::Invalid`] when `config` does not validate.
    pub fn with_config(
        api: A,
        converter: C,
        config: RepositoryConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(api, converter, &config))
    }

    fn build(api: A, converter: C, config: &RepositoryConfig) -> Self {
        let api = Arc::new(api);
        let local = Arc::new(LocalState::new(OptimisticStore::new(), config.counter_capacity));
        let (events_tx, _) = broadcast::channel(config.event_capacity);
        let dispatcher = Dispatcher::new(Shared {
            api: Arc::clone(&api),
            converter: Arc::new(converter),
            local: Arc::clone(&local),
            router: ResultRouter::new(),
            events: events_tx.clone(),
        });

        Self {
            inner: Arc::new(Inner {
                api,
                local,
                events_tx,
                dispatcher,
            }),
        }
    }

    /// Fetches the catalog and makes it the confirmed set.
    ///
    /// Pending additions and removals are kept as they are, so an optimistic
    /// addition the catalog does not know about yet is still reported by
    /// [`ItemRepository::has_item`] until its own call settles.
    pub async fn get_item_list(&self) -> Result<Vec<A::Item>, RepositoryError> {
        let items = self.inner.api.get_item_list().await.map_err(|err| {
            warn!(error = %err, "catalog fetch failed");
            RepositoryError::from(err)
        })?;

        self.inner
            .local
            .update_and_publish(|store| store.refresh(items.iter().map(|item| item.id().clone())));
        debug!(items = items.len(), "catalog refreshed");
        let _ = self
            .inner
            .events_tx
            .send(RepositoryEvent::CatalogRefreshed { items: items.len() });
        Ok(items)
    }

    /// Optimistic item count: the current value first, then every change.
    pub fn counter(&self) -> CounterSubscription {
        self.inner.local.subscribe_counter()
    }

    /// Most recently published optimistic item count.
    pub fn counter_value(&self) -> usize {
        self.inner.local.latest_counter()
    }

    /// Whether `id` is recommended according to the optimistic view.
    pub fn has_item(&self, id: &ItemId) -> bool {
        self.inner.local.read(|store| store.contains(id))
    }

    /// Requests that `id` be recommended.
    ///
    /// Nothing happens until the returned future is first polled. That first
    /// poll updates the optimistic view and queues the request; the future then
    /// resolves exactly once, with [`Response::skipped`] if a newer request for
    /// the same item made this one redundant.
    pub fn add_item(&self, id: ItemId) -> impl Future<Output = Response> + Send + use<A, C> {
        self.launch(CommandKind::Add, id)
    }

    /// Requests that `id` stop being recommended. Same contract as
    /// [`ItemRepository::add_item`].
    pub fn remove_item(&self, id: ItemId) -> impl Future<Output = Response> + Send + use<A, C> {
        self.launch(CommandKind::Remove, id)
    }

    /// Attaches to the [`RepositoryEvent`] stream from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<RepositoryEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Number of items that have had a command issued, each owning a worker.
    pub fn tracked_items(&self) -> usize {
        self.inner.dispatcher.workers()
    }

    fn launch(&self, kind: CommandKind, id: ItemId) -> impl Future<Output = Response> + Send + use<A, C> {
        let inner = Arc::clone(&self.inner);
        async move {
            let reply = inner.dispatcher.submit(kind, id.clone());
            match reply.await {
                Ok(response) => response,
                Err(_) => {
                    warn!(item = %id, kind = %kind, "reply dropped without a response");
                    Response::skipped()
                }
            }
        }
    }
}
