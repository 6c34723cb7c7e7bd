use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use hashbrown::HashSet;

use crate::types::ItemId;

use super::{Api, ApiError, ApiResponse, TransportError, status};

/// Remote set kept in process memory.
///
/// Answers like the real service: a duplicate add is `409 CONFLICT`, removing an
/// absent item is `404 NOT_FOUND`. Calls complete immediately and never fail at
/// the transport level.
#[derive(Debug, Default)]
pub struct InMemoryApi {
    items: Mutex<HashSet<ItemId>>,
}

impl InMemoryApi {
    /// Empty remote set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remote set pre-populated with `items`.
    pub fn with_items(items: impl IntoIterator<Item = ItemId>) -> Self {
        Self {
            items: Mutex::new(items.into_iter().collect()),
        }
    }

    fn items(&self) -> MutexGuard<'_, HashSet<ItemId>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Api for InMemoryApi {
    type Item = ItemId;

    async fn get_item_list(&self) -> Result<Vec<ItemId>, TransportError> {
        Ok(self.items().iter().cloned().collect())
    }

    async fn add_item(&self, id: &ItemId) -> Result<ApiResponse, TransportError> {
        if self.items().insert(id.clone()) {
            Ok(ApiResponse::successful())
        } else {
            Ok(ApiResponse::failed(
                status::CONFLICT,
                ApiError::Status {
                    code: status::CONFLICT,
                    message: format!("{id} is already recommended"),
                },
            ))
        }
    }

    async fn remove_item(&self, id: &ItemId) -> Result<ApiResponse, TransportError> {
        if self.items().remove(id) {
            Ok(ApiResponse::successful())
        } else {
            Ok(ApiResponse::failed(
                status::NOT_FOUND,
                ApiError::Status {
                    code: status::NOT_FOUND,
                    message: format!("{id} is not recommended"),
                },
            ))
        }
    }
}
