#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{catalog, owner, registry, session, thing, ByCategory, Category, Owner, Shop};
use sift_core::persist::{self, SavedGroup, SavedPredicate, SavedTree};
use sift_core::kinds::SubGroup;
use sift_core::{Combinator, FilterTree, MoveOutcome, RootKind};

fn node(kind: &str, state: serde_json::Value) -> SavedPredicate {
    SavedPredicate {
        kind: kind.to_string(),
        enabled: true,
        include: true,
        state,
        group: None,
    }
}

fn saved(members: Vec<SavedPredicate>) -> SavedTree {
    SavedTree {
        name: "Search".to_string(),
        active: true,
        root_kind: RootKind::Search,
        saved_at: None,
        group: SavedGroup {
            combinator: Combinator::All,
            members,
        },
    }
}

fn owner_node(name: &str) -> SavedPredicate {
    node(
        "owner",
        serde_json::json!({ "selectionName": name, "extraOption": 0, "config": null }),
    )
}

fn category_node(name: &str) -> SavedPredicate {
    node(
        "category",
        serde_json::json!({ "selectionName": name, "extraOption": 0, "config": {} }),
    )
}

#[test]
fn test_load_resolves_global_names_immediately() {
    let tree: FilterTree<Shop> =
        persist::load(&saved(vec![category_node("tools")]), &catalog(), &registry()).unwrap();

    let p = &tree.group().members()[0];
    let typed = p.filter_as::<ByCategory>().unwrap();
    assert_eq!(typed.selection().map(|c| c.name.as_str()), Some("tools"));
    assert_eq!(typed.kind().limit, Some(10.0));
    assert!(p.is_enabled());
    assert!(!tree.is_changed());
    assert!(tree.applies_to(&thing("saw", "tools", 2.0)));
}

#[test]
fn test_unknown_global_name_disables_predicate() {
    let tree: FilterTree<Shop> =
        persist::load(&saved(vec![category_node("food")]), &catalog(), &registry()).unwrap();

    let p = &tree.group().members()[0];
    assert!(!p.is_enabled());
    assert_eq!(p.selection_error(), Some("Category 'food' not found"));
    assert_eq!(tree.errors().len(), 1);

    // Excluded from the arithmetic, and never matches on its own
    assert!(tree.applies_to(&thing("apple", "food", 0.2)));
    assert!(!p.applies_to(&thing("apple", "food", 0.2)));
}

#[test]
fn test_null_marker_is_absent_not_error() {
    let tree: FilterTree<Shop> =
        persist::load(&saved(vec![category_node("null")]), &catalog(), &registry()).unwrap();

    let p = &tree.group().members()[0];
    assert!(p.is_enabled());
    assert!(p.selection_error().is_none());
    assert!(p.filter_as::<ByCategory>().unwrap().selection().is_none());
}

#[test]
fn test_environment_names_wait_for_binding() {
    let mut tree: FilterTree<Shop> =
        persist::load(&saved(vec![owner_node("ada")]), &catalog(), &registry()).unwrap();
    let item = thing("pen", "tools", 0.1).owned_by("ada");

    // Phase one leaves environment-bound names alone
    let p = &tree.group().members()[0];
    assert!(p.selection_error().is_none());
    assert!(p.filter_as::<Owner>().unwrap().selection().is_none());
    assert!(!tree.applies_to(&item));

    let office = session("office", &["ada", "bob"]);
    tree.bind_environment(&office);
    assert!(tree.is_bound());
    assert!(tree.applies_to(&item));
}

#[test]
fn test_missing_person_error_names_environment() {
    let mut tree: FilterTree<Shop> =
        persist::load(&saved(vec![owner_node("cy")]), &catalog(), &registry()).unwrap();

    tree.bind_environment(&session("office", &["ada"]));

    let err = tree.group().members()[0].selection_error().unwrap();
    assert_eq!(err, "Owner 'cy' not found in office");
}

#[test]
fn test_rebinding_to_new_environment_re_resolves() {
    let mut tree: FilterTree<Shop> =
        persist::load(&saved(vec![owner_node("cy")]), &catalog(), &registry()).unwrap();
    let first = session("office", &["ada"]);
    let second = session("lab", &["cy"]);

    tree.bind_environment(&first);
    assert_eq!(tree.errors().len(), 1);

    tree.bind_environment(&second);
    assert!(tree.errors().is_empty());
    assert!(tree.applies_to(&thing("flask", "tools", 0.3).owned_by("cy")));
}

#[test]
fn test_binding_same_environment_twice_is_noop() {
    let mut tree = FilterTree::<Shop>::new("t", RootKind::Holder);
    let root = tree.root_group_id();
    let id = tree.add(root, owner("ada"), None).unwrap();
    let office = session("office", &["ada"]);

    tree.bind_environment(&office);
    let first = tree.find_predicate(id).unwrap().filter_as::<Owner>().unwrap().selection().cloned();
    tree.bind_environment(&office);
    let second = tree.find_predicate(id).unwrap().filter_as::<Owner>().unwrap().selection().cloned();

    assert_eq!(first, second);
    assert!(tree.errors().is_empty());
}

#[test]
fn test_duplicate_in_bound_tree_resolves_in_that_environment() {
    let mut tree = FilterTree::<Shop>::new("t", RootKind::Holder);
    let root = tree.root_group_id();
    tree.add(root, owner("ada"), None).unwrap();
    let office = session("office", &["ada"]);
    tree.bind_environment(&office);

    let outcome = tree.reorder(root, 0, 1, true);
    let MoveOutcome::Duplicated(copy) = outcome else {
        panic!("expected duplicate, got {:?}", outcome);
    };

    let pen = thing("pen", "tools", 0.1).owned_by("ada");
    let original = &tree.group().members()[0];
    let duplicate = tree.find_predicate(copy).unwrap();
    assert!(original.applies_to(&pen));
    assert_eq!(duplicate.applies_to(&pen), original.applies_to(&pen));
    assert_eq!(
        duplicate.filter_as::<Owner>().unwrap().selection().map(|p| p.0.as_str()),
        Some("ada")
    );
}

#[test]
fn test_holder_copied_in_bound_tree_resolves_its_members() {
    let mut tree = FilterTree::<Shop>::new("t", RootKind::Holder);
    let root = tree.root_group_id();
    let holder = tree.add(root, SubGroup::predicate(Combinator::Any), None).unwrap();
    let inner = tree.find_predicate(holder).unwrap().group().unwrap().id();
    tree.add(inner, owner("bo"), None).unwrap();
    let office = session("office", &["bo"]);
    tree.bind_environment(&office);

    let copy = match tree.reorder(root, 0, 1, true) {
        MoveOutcome::Duplicated(copy) => copy,
        other => panic!("expected duplicate, got {:?}", other),
    };
    let pen = thing("pen", "tools", 0.1).owned_by("bo");
    assert!(tree.find_predicate(holder).unwrap().applies_to(&pen));
    assert!(tree.find_predicate(copy).unwrap().applies_to(&pen));

    let pulled_out = match tree.move_across(inner, 0, root, 0, true) {
        MoveOutcome::Duplicated(id) => id,
        other => panic!("expected duplicate, got {:?}", other),
    };
    assert!(tree.find_predicate(pulled_out).unwrap().applies_to(&pen));

    // A predicate added to a bound tree resolves against that environment
    let stranger = tree.add(root, owner("zed"), None).unwrap();
    assert_eq!(
        tree.find_predicate(stranger).unwrap().selection_error(),
        Some("Owner 'zed' not found in office")
    );
}

#[test]
fn test_rebind_current_after_environment_dropped() {
    let mut tree = FilterTree::<Shop>::new("t", RootKind::Holder);
    let office = session("office", &["ada"]);
    tree.bind_environment(&office);
    drop(office);

    tree.rebind_current();
    assert!(!tree.is_bound());
    assert!(tree.bound_environment().is_none());
}

#[test]
fn test_clone_drops_environment_selection_and_keeps_errors() {
    let mut tree = FilterTree::<Shop>::new("t", RootKind::Holder);
    let root = tree.root_group_id();
    tree.add(root, owner("ada"), None).unwrap();
    let broken = persist::load(&saved(vec![category_node("food")]), &catalog(), &registry())
        .unwrap()
        .group()
        .members()[0]
        .duplicate();
    tree.add(root, broken, None).unwrap();
    tree.mark_changed();

    let copy = tree.clone_as_search();

    assert!(!copy.is_changed());
    assert!(!copy.is_bound());
    let copied_owner = copy.group().members()[0].filter_as::<Owner>().unwrap();
    assert!(copied_owner.selection().is_none());
    assert_eq!(copied_owner.selection_name(), Some("ada"));
    assert_eq!(copy.errors().len(), 1);

    let mut copy = copy;
    copy.bind_environment(&session("office", &["ada"]));
    assert_eq!(copy.errors().len(), 1);
    let rebound = copy.group().members()[0].filter_as::<Owner>().unwrap();
    assert_eq!(rebound.selection().map(|p| p.0.as_str()), Some("ada"));
}

#[test]
fn test_choose_fires_post_chosen_and_marks_changed() {
    let mut tree = FilterTree::<Shop>::new("t", RootKind::Holder);
    let root = tree.root_group_id();
    let id = tree.add(root, common::category("toys"), None).unwrap();
    tree.mark_saved();

    let tools = Category {
        name: "tools".to_string(),
        max_weight: 10.0,
    };
    tree.choose::<common::CategoryKind>(id, Some(tools)).unwrap();

    let typed = tree.find_predicate(id).unwrap().filter_as::<ByCategory>().unwrap();
    assert_eq!(typed.kind().times_chosen, 1);
    assert_eq!(typed.kind().limit, Some(10.0));
    assert_eq!(typed.selection_name(), Some("tools"));
    assert!(tree.is_changed());

    let err = tree.choose::<common::OwnerKind>(id, None).unwrap_err();
    assert_eq!(err.code(), "ERR_KIND_MISMATCH");
}
