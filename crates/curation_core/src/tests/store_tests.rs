use super::*;

fn entity(id: &str) -> CandidateEntity {
    CandidateEntity::new(id, format!("Artwork {id}"))
}

fn member(id: &str, order: u32) -> CandidateEntity {
    entity(id).with_membership(Membership::at(order))
}

fn ids(list: &[CandidateEntity]) -> Vec<&str> {
    list.iter().map(|entity| entity.id.as_str()).collect()
}

fn store_with(selected: &[&str], candidates: &[&str]) -> SelectionStore {
    let mut store = SelectionStore::new();
    store.merge_selection_page(
        selected
            .iter()
            .enumerate()
            .map(|(index, id)| member(id, index as u32))
            .collect(),
    );
    store.merge_candidate_page(candidates.iter().map(|id| entity(id)).collect());
    store
}

#[test]
fn toggle_appends_candidate_to_selection() {
    let mut store = store_with(&["x", "y"], &["z", "w"]);

    assert!(store.toggle(&EntityId::new("z")));

    assert_eq!(ids(store.selection()), vec!["x", "y", "z"]);
    assert_eq!(ids(store.pool()), vec!["w"]);
}

#[test]
fn toggle_removes_selected_and_shifts_following_items() {
    let mut store = store_with(&["x", "y", "z"], &[]);

    assert!(store.toggle(&EntityId::new("x")));

    assert_eq!(ids(store.selection()), vec!["y", "z"]);
    assert_eq!(store.selection_index(&EntityId::new("z")), Some(1));
    assert_eq!(ids(store.pool()), vec!["x"]);
}

#[test]
fn toggle_twice_restores_both_partitions() {
    let original = store_with(&["x", "y"], &["a", "b", "c"]);

    for id in ["a", "b", "c"] {
        let mut store = original.clone();
        assert!(store.toggle(&EntityId::new(id)));
        assert!(store.toggle(&EntityId::new(id)));
        assert_eq!(store, original, "toggling {id} twice changed the store");
    }

    // A member toggled out and back in rejoins at the end; everything else keeps its order.
    for id in ["x", "y"] {
        let mut store = original.clone();
        assert!(store.toggle(&EntityId::new(id)));
        assert!(store.toggle(&EntityId::new(id)));
        assert_eq!(ids(store.pool()), ids(original.pool()));

        let others = |list: &[CandidateEntity]| -> Vec<String> {
            list.iter()
                .filter(|entity| entity.id.as_str() != id)
                .map(|entity| entity.id.to_string())
                .collect()
        };
        assert_eq!(others(store.selection()), others(original.selection()));
        assert_eq!(store.selection().len(), original.selection().len());
    }
}

#[test]
fn deselected_member_returns_to_pool_in_arrival_order() {
    let mut store = store_with(&["x", "y"], &["a", "b"]);

    assert!(store.toggle(&EntityId::new("a")));
    assert!(store.toggle(&EntityId::new("y")));
    assert!(store.toggle(&EntityId::new("a")));

    assert_eq!(ids(store.selection()), vec!["x"]);
    assert_eq!(ids(store.pool()), vec!["y", "a", "b"]);
}

#[test]
fn toggle_unknown_id_is_a_no_op() {
    let mut store = store_with(&["x"], &["a"]);
    let before = store.clone();

    assert!(!store.toggle(&EntityId::new("ghost")));
    assert_eq!(store, before);
}

#[test]
fn move_last_to_front() {
    let mut store = store_with(&["x", "y", "z"], &[]);

    assert!(store.move_item(2, 0));

    assert_eq!(ids(store.selection()), vec!["z", "x", "y"]);
}

#[test]
fn move_is_a_permutation_landing_at_target() {
    let names = ["a", "b", "c", "d", "e"];
    for from in 0..names.len() {
        for to in 0..names.len() {
            let mut store = store_with(&names, &[]);
            store.move_item(from, to);

            let mut after = ids(store.selection());
            assert_eq!(after[to], names[from], "move({from}, {to})");
            after.sort();
            assert_eq!(after, names.to_vec());
        }
    }
}

#[test]
fn move_rejects_out_of_range_and_same_index() {
    let mut store = store_with(&["x", "y"], &[]);
    let before = store.clone();

    assert!(!store.move_item(0, 2));
    assert!(!store.move_item(5, 0));
    assert!(!store.move_item(1, 1));
    assert_eq!(store, before);
}

#[test]
fn merge_drops_ids_already_seen_in_either_partition() {
    let mut store = store_with(&["x"], &["a"]);

    let stats = store.merge_candidate_page(vec![entity("a"), entity("x"), entity("b")]);
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.duplicates, 2);

    let stats = store.merge_selection_page(vec![member("b", 1), member("y", 1)]);
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.duplicates, 1);

    let mut all: Vec<&str> = ids(store.selection());
    all.extend(ids(store.pool()));
    let unique: HashSet<&str> = all.iter().copied().collect();
    assert_eq!(unique.len(), all.len());
}

#[test]
fn candidate_rows_flagged_as_members_are_left_to_the_selection_listing() {
    let mut store = SelectionStore::new();

    let stats = store.merge_candidate_page(vec![member("x", 0), entity("a")]);

    assert_eq!(stats.already_selected, 1);
    assert_eq!(ids(store.pool()), vec!["a"]);
    assert!(!store.knows(&EntityId::new("x")));

    store.merge_selection_page(vec![member("x", 0)]);
    assert_eq!(ids(store.selection()), vec!["x"]);
}

#[test]
fn fresh_store_is_clean() {
    let store = store_with(&["x", "y"], &["a"]);
    let saved = store.saved_snapshot();

    assert!(store.diff(&saved).is_empty());
    assert!(!store.is_dirty(&saved));
}

#[test]
fn diff_reports_only_changed_entities() {
    let mut store = store_with(&["x", "y", "z"], &["a", "b"]);
    let saved = store.saved_snapshot();

    store.move_item(2, 1);
    store.toggle(&EntityId::new("a"));

    let changes = store.diff(&saved);
    assert_eq!(
        changes.entries(),
        &[
            ChangeEntry {
                id: EntityId::new("z"),
                membership: true,
                order: Some(1),
            },
            ChangeEntry {
                id: EntityId::new("y"),
                membership: true,
                order: Some(2),
            },
            ChangeEntry {
                id: EntityId::new("a"),
                membership: true,
                order: Some(3),
            },
        ]
    );
    assert!(changes.get(&EntityId::new("x")).is_none());
    assert!(changes.get(&EntityId::new("b")).is_none());
}

#[test]
fn diff_clears_deselected_members() {
    let mut store = store_with(&["x", "y"], &[]);
    let saved = store.saved_snapshot();

    store.toggle(&EntityId::new("x"));

    let changes = store.diff(&saved);
    assert_eq!(changes.len(), 2);
    assert_eq!(
        changes.get(&EntityId::new("y")),
        Some(&ChangeEntry {
            id: EntityId::new("y"),
            membership: true,
            order: Some(0),
        })
    );
    assert_eq!(
        changes.get(&EntityId::new("x")),
        Some(&ChangeEntry {
            id: EntityId::new("x"),
            membership: false,
            order: None,
        })
    );
}

#[test]
fn diff_clears_snapshot_members_missing_from_both_partitions() {
    let saved_from = store_with(&["x", "gone"], &[]);
    let saved = saved_from.saved_snapshot();
    let current = store_with(&["x"], &[]);

    let changes = current.diff(&saved);

    assert_eq!(
        changes.entries(),
        &[ChangeEntry {
            id: EntityId::new("gone"),
            membership: false,
            order: None,
        }]
    );
}

#[test]
fn diff_normalizes_gapped_server_orders() {
    let mut store = SelectionStore::new();
    store.merge_selection_page(vec![member("x", 0), member("y", 4)]);

    let changes = store.diff(&store.saved_snapshot());

    assert_eq!(changes.len(), 1);
    assert_eq!(
        changes.get(&EntityId::new("y")).and_then(|entry| entry.order),
        Some(1)
    );
}

#[test]
fn reverting_an_edit_makes_the_store_clean_again() {
    let mut store = store_with(&["x", "y", "z"], &["a"]);
    let saved = store.saved_snapshot();

    store.move_item(0, 2);
    store.toggle(&EntityId::new("a"));
    assert!(store.is_dirty(&saved));

    store.toggle(&EntityId::new("a"));
    store.move_item(2, 0);
    assert!(!store.is_dirty(&saved));
}

#[test]
fn order_follows_position_after_moves() {
    let mut store = store_with(&["a", "b", "c", "d"], &[]);
    store.move_item(0, 3);
    store.move_item(1, 0);

    for (index, entity) in store.selection().iter().enumerate() {
        assert_eq!(
            store.current_membership(&entity.id),
            Membership::at(index as u32)
        );
    }
}

#[test]
fn apply_saved_shape_makes_current_shape_the_baseline() {
    let mut store = store_with(&["x", "y"], &["a"]);
    store.toggle(&EntityId::new("x"));
    store.toggle(&EntityId::new("a"));

    store.apply_saved_shape();

    assert!(!store.is_dirty(&store.saved_snapshot()));
    assert_eq!(store.selection()[0].membership, Membership::at(0));
    assert_eq!(store.pool()[0].membership, Membership::none());
}
