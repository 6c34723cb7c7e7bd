//! Optimistic add/remove toggling of items in a remote recommended set.
//!
//! Callers fire add and remove requests at will. The local view reflects each
//! request the moment it is issued, at most one remote call per item is in
//! flight, bursts on one item collapse into only the calls still needed, and
//! every caller gets back exactly one [`response::Response`].
//!
//! # Examples
//!
//! Optimistic bookkeeping with [`core::store::OptimisticStore`]:
//! ```
//! use switchman::{core::store::OptimisticStore, types::ItemId};
//!
//! let soup = ItemId::from("soup");
//! let mut store = OptimisticStore::from_catalog([soup.clone()]);
//! assert_eq!(store.counter_value(), 1);
//!
//! store.mark_pending_remove(&soup);
//! assert!(!store.contains(&soup));
//! assert_eq!(store.counter_value(), 0);
//! ```
//!
//! Repository usage against the in-process [`api::memory::InMemoryApi`]:
//! ```
//! use switchman::{
//!     api::memory::InMemoryApi,
//!     runtime::handle::ItemRepository,
//!     types::ItemId,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let repo = ItemRepository::new(InMemoryApi::with_items([ItemId::from("pasta")]));
//! repo.get_item_list().await.expect("fetch");
//! assert!(repo.has_item(&ItemId::from("pasta")));
//!
//! let mut counter = repo.counter();
//! assert_eq!(counter.next().await, Some(1));
//!
//! let response = repo.add_item(ItemId::from("soup")).await;
//! assert!(response.is_successful());
//! assert!(repo.has_item(&ItemId::from("soup")));
//! assert_eq!(counter.next().await, Some(2));
//! # }
//! ```
#![deny(missing_docs)]

/// Remote service boundary and error conversion.
pub mod api;
/// Optimistic membership store.
pub mod core;
/// Caller-facing outcome types.
pub mod response;
/// Per-item command pipeline and repository handle.
pub mod runtime;
/// Shared primitive types.
pub mod types;
