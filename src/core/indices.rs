use hashbrown::HashSet;

use crate::types::ItemId;

/// Unordered set of item identities.
pub type IdSet = HashSet<ItemId>;
