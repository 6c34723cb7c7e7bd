use std::collections::BTreeSet;

use proptest::prelude::*;

use switchman::{core::store::OptimisticStore, types::ItemId};

#[derive(Debug, Clone)]
enum Action {
    IssueAdd(u8),
    IssueRemove(u8),
    ConfirmAdd(u8),
    ConfirmRemove(u8),
    RevertAdd(u8),
    RevertRemove(u8),
    Refresh(Vec<u8>),
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0u8..12).prop_map(Action::IssueAdd),
        (0u8..12).prop_map(Action::IssueRemove),
        (0u8..12).prop_map(Action::ConfirmAdd),
        (0u8..12).prop_map(Action::ConfirmRemove),
        (0u8..12).prop_map(Action::RevertAdd),
        (0u8..12).prop_map(Action::RevertRemove),
        prop::collection::vec(0u8..12, 0..8).prop_map(Action::Refresh),
    ]
}

fn item(n: u8) -> ItemId {
    ItemId::new(format!("item-{n}"))
}

/// Applies `action` the way the repository drives the store: issuing a command
/// marks one side pending and clears the other, settling only clears or commits.
fn apply(store: &mut OptimisticStore, action: &Action) {
    match action {
        Action::IssueAdd(n) => {
            store.mark_pending_add(&item(*n));
            store.clear_pending_remove(&item(*n));
        }
        Action::IssueRemove(n) => {
            store.mark_pending_remove(&item(*n));
            store.clear_pending_add(&item(*n));
        }
        Action::ConfirmAdd(n) => store.commit_add(&item(*n)),
        Action::ConfirmRemove(n) => store.commit_remove(&item(*n)),
        Action::RevertAdd(n) => store.clear_pending_add(&item(*n)),
        Action::RevertRemove(n) => store.clear_pending_remove(&item(*n)),
        Action::Refresh(ids) => store.refresh(ids.iter().copied().map(item)),
    }
}

fn contained(store: &OptimisticStore) -> BTreeSet<ItemId> {
    (0u8..12).map(item).filter(|id| store.contains(id)).collect()
}

proptest! {
    #[test]
    fn counter_matches_contained_items(actions in prop::collection::vec(action_strategy(), 1..200)) {
        let mut store = OptimisticStore::new();

        for action in &actions {
            apply(&mut store, action);

            prop_assert!(store.pending_additions().is_disjoint(store.pending_removals()));

            for n in 0u8..12 {
                let id = item(n);
                let expected = (store.added().contains(&id) || store.pending_additions().contains(&id))
                    && !store.pending_removals().contains(&id);
                prop_assert_eq!(store.contains(&id), expected);
            }

            prop_assert_eq!(store.counter_value(), contained(&store).len());
        }
    }

    #[test]
    fn issuing_is_visible_immediately(actions in prop::collection::vec(action_strategy(), 0..100), n in 0u8..12) {
        let mut store = OptimisticStore::new();
        for action in &actions {
            apply(&mut store, action);
        }

        apply(&mut store, &Action::IssueAdd(n));
        prop_assert!(store.contains(&item(n)));

        apply(&mut store, &Action::IssueRemove(n));
        prop_assert!(!store.contains(&item(n)));
    }

    #[test]
    fn confirming_settles_pending_marks(actions in prop::collection::vec(action_strategy(), 0..100), n in 0u8..12) {
        let mut store = OptimisticStore::new();
        for action in &actions {
            apply(&mut store, action);
        }

        apply(&mut store, &Action::IssueAdd(n));
        apply(&mut store, &Action::ConfirmAdd(n));
        prop_assert!(store.added().contains(&item(n)));
        prop_assert!(!store.pending_additions().contains(&item(n)));

        apply(&mut store, &Action::IssueRemove(n));
        apply(&mut store, &Action::ConfirmRemove(n));
        prop_assert!(!store.added().contains(&item(n)));
        prop_assert!(!store.pending_removals().contains(&item(n)));
        prop_assert!(!store.contains(&item(n)));
    }
}

#[test]
fn reverted_removal_restores_confirmed_item() {
    let mut store = OptimisticStore::from_catalog([item(1)]);

    apply(&mut store, &Action::IssueRemove(1));
    assert_eq!(store.counter_value(), 0);

    apply(&mut store, &Action::RevertRemove(1));
    assert!(store.contains(&item(1)));
    assert_eq!(store.counter_value(), 1);
}

#[test]
fn pending_addition_already_confirmed_counts_once() {
    let mut store = OptimisticStore::from_catalog([item(1)]);

    apply(&mut store, &Action::IssueAdd(1));

    assert_eq!(store.counter_value(), 1);
}

#[test]
fn refresh_leaves_pending_marks_alone() {
    let mut store = OptimisticStore::from_catalog([item(1), item(2)]);
    apply(&mut store, &Action::IssueAdd(3));
    apply(&mut store, &Action::IssueRemove(1));

    store.refresh([item(1), item(4)]);

    assert!(!store.contains(&item(1)));
    assert!(!store.contains(&item(2)));
    assert!(store.contains(&item(3)));
    assert!(store.contains(&item(4)));
    assert_eq!(store.counter_value(), 2);
}

#[test]
fn committing_without_pending_mark_is_harmless() {
    let mut store = OptimisticStore::new();

    store.commit_remove(&item(5));
    store.commit_add(&item(6));
    store.commit_add(&item(6));

    assert_eq!(store.added().len(), 1);
    assert_eq!(store.counter_value(), 1);
}
