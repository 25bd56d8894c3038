//! Tests for building, enumerating and navigating projections

use rstest::rstest;

use treeview::domain::{
    filter_by_field, group_by_field, sort_by_field, ChangeAction, DomainError, ProjectionChange,
    ProjectionOptions, Record, SourceChange, TreeCursor, TreeProjection,
};
use treeview::util::testing;

fn rec(id: i64, pid: i64) -> Record {
    Record::new().with("id", id).with("pid", pid)
}

fn adjacency(records: Vec<Record>) -> TreeProjection<Record> {
    testing::init_test_setup();
    TreeProjection::new(ProjectionOptions::adjacency("id", "pid").with_root_key(0), records)
        .expect("build projection")
}

/// `[key]` for group headers, the record key otherwise.
fn labels(projection: &TreeProjection<Record>) -> Vec<String> {
    projection
        .enumerate()
        .map(|(_, node)| match node.group_key() {
            Some(key) => format!("[{key}]"),
            None => node.key("id").map(|k| k.to_string()).unwrap_or_default(),
        })
        .collect()
}

fn uids(projection: &TreeProjection<Record>) -> Vec<String> {
    projection
        .enumerate()
        .map(|(_, node)| node.uid().to_string())
        .collect()
}

#[test]
fn given_adjacency_records_when_enumerating_then_parents_precede_children_in_source_order() {
    // Arrange
    let projection = adjacency(vec![rec(1, 0), rec(10, 1), rec(11, 1), rec(2, 0)]);

    // Act
    let order = labels(&projection);

    // Assert
    assert_eq!(order, vec!["1", "10", "11", "2"]);
    let levels: Vec<usize> = projection.enumerate().map(|(_, n)| n.level()).collect();
    assert_eq!(levels, vec![1, 2, 2, 1]);
}

#[test]
fn given_enumeration_when_restarted_then_reflects_current_state() {
    let mut projection = adjacency(vec![rec(1, 0)]);
    let first: Vec<_> = projection.enumerate().map(|(id, _)| id).collect();

    projection
        .handle(SourceChange::Add {
            index: 1,
            items: vec![rec(2, 0)],
        })
        .expect("add");

    assert_eq!(first.len(), 1);
    assert_eq!(labels(&projection), vec!["1", "2"]);
}

#[test]
fn given_nested_records_when_enumerating_then_children_follow_their_owner() {
    testing::init_test_setup();
    let records = vec![
        Record::new().with("id", 1).with_nested(
            "items",
            vec![
                Record::new().with("id", 2),
                Record::new()
                    .with("id", 3)
                    .with_nested("items", vec![Record::new().with("id", 4)]),
            ],
        ),
        Record::new().with("id", 5),
    ];

    let projection =
        TreeProjection::new(ProjectionOptions::nested("id", "items"), records).expect("build");

    assert_eq!(labels(&projection), vec!["1", "2", "3", "4", "5"]);
    assert_eq!(uids(&projection), vec!["1", "2:1", "3:1", "4:3:1", "5"]);
    assert_eq!(projection.record_count(), 2);
}

#[test]
fn given_grouped_siblings_when_enumerating_then_groups_nest_inside_their_owner() {
    // Arrange
    testing::init_test_setup();
    let records = vec![
        Record::new().with("id", 1).with("node", true).with("group", "a"),
        Record::new().with("id", 2).with("node", false).with("group", "b"),
        Record::new().with("id", 11).with("pid", 1).with("group", "b"),
    ];
    let options = ProjectionOptions::adjacency("id", "pid")
        .with_root_key(0)
        .with_node_field("node");
    let mut projection = TreeProjection::new(options, records).expect("build");

    // Act
    projection.set_group(Some(group_by_field("group")));

    // Assert
    assert_eq!(labels(&projection), vec!["[a]", "1", "[b]", "11", "[b]", "2"]);
    let levels: Vec<usize> = projection.enumerate().map(|(_, n)| n.level()).collect();
    assert_eq!(levels, vec![1, 1, 2, 2, 1, 1]);
    let headers: Vec<String> = projection
        .enumerate()
        .filter(|(_, n)| n.is_group())
        .map(|(_, n)| n.uid().to_string())
        .collect();
    assert_eq!(headers, vec!["#a", "#b:1", "#b"]);
}

#[test]
fn given_sort_and_group_when_enumerating_then_sort_decides_run_order() {
    let records = vec![
        rec(1, 0).with("g", "x").with("rank", 3),
        rec(2, 0).with("g", "y").with("rank", 1),
        rec(3, 0).with("g", "x").with("rank", 2),
    ];
    let mut projection = adjacency(records);

    projection.set_sort(Some(sort_by_field("rank", false)));
    projection.set_group(Some(group_by_field("g")));

    assert_eq!(labels(&projection), vec!["[y]", "2", "[x]", "3", "1"]);
}

#[test]
fn given_duplicate_keys_under_one_parent_when_building_then_uids_get_suffixes() {
    let projection = adjacency(vec![rec(1, 0), rec(2, 1), rec(2, 1)]);

    assert_eq!(uids(&projection), vec!["1", "2:1", "2:1-1"]);
    let second = projection.find_by_uid("2:1-1").expect("suffixed uid");
    assert_eq!(projection.index_of(second), Ok(Some(2)));
}

#[test]
fn given_removed_sibling_when_uids_collide_later_then_existing_suffix_is_kept() {
    let mut projection = adjacency(vec![rec(1, 0), rec(2, 1), rec(2, 1)]);

    projection
        .handle(SourceChange::Remove {
            index: 1,
            items: vec![rec(2, 1)],
        })
        .expect("remove");

    assert_eq!(uids(&projection), vec!["1", "2:1-1"]);
}

#[test]
fn given_unresolvable_parent_key_when_building_then_record_falls_back_to_root() {
    let projection = adjacency(vec![rec(1, 0), rec(7, 99)]);

    assert_eq!(labels(&projection), vec!["1", "7"]);
    let orphan = projection.find_by_uid("7").expect("orphan");
    assert_eq!(projection.parent_of(orphan), Ok(Some(projection.root())));
}

#[test]
fn given_cyclic_parent_keys_when_building_then_cycle_is_broken_at_root() {
    let projection = adjacency(vec![rec(1, 3), rec(2, 1), rec(3, 2)]);

    let levels: Vec<usize> = projection.enumerate().map(|(_, n)| n.level()).collect();
    assert_eq!(projection.len(), 3);
    assert_eq!(levels.iter().filter(|&&l| l == 1).count(), 1);
}

#[test]
fn given_projection_when_mapping_indices_then_round_trip_holds() {
    // Arrange
    let mut projection = adjacency(vec![rec(1, 0), rec(10, 1), rec(2, 0), rec(20, 2)]);
    projection.set_group(Some(group_by_field("pid")));
    projection.set_root_enumerable(true);

    // Act / Assert
    for index in 0..projection.len() {
        match projection.source_index_of(index) {
            Some(source) => {
                assert_eq!(projection.projected_index_of_source(source), Some(index));
                assert_eq!(projection.node_of_source(source), projection.node_at(index));
            }
            None => {
                let id = projection.node_at(index).expect("node at index");
                let node = projection.node(id).expect("node");
                assert!(node.is_root() || node.is_group());
            }
        }
    }
    assert_eq!(projection.source_index_of(projection.len()), None);
}

#[test]
fn given_cursor_when_walking_then_follows_flat_order_and_edges() {
    let projection = adjacency(vec![rec(1, 0), rec(10, 1), rec(2, 0)]);
    let one = projection.find_by_uid("1").expect("1");
    let ten = projection.find_by_uid("10:1").expect("10");
    let two = projection.find_by_uid("2").expect("2");
    let mut cursor = TreeCursor::new();

    assert!(!cursor.move_to_previous(&projection));
    assert!(cursor.move_to_next(&projection));
    assert_eq!(cursor.current(), Some(one));

    assert!(cursor.move_to_below(&projection));
    assert_eq!(cursor.current(), Some(ten));
    assert!(!cursor.move_to_below(&projection));

    assert!(cursor.move_to_above(&projection));
    assert_eq!(cursor.current(), Some(one));
    assert!(!cursor.move_to_above(&projection));
    assert_eq!(cursor.current(), Some(one));

    assert!(cursor.move_to_next(&projection));
    assert!(cursor.move_to_next(&projection));
    assert_eq!(cursor.current(), Some(two));
    assert!(!cursor.move_to_next(&projection));
    assert!(cursor.move_to_previous(&projection));
    assert_eq!(cursor.current(), Some(ten));
}

#[test]
fn given_cursor_placed_on_nested_node_when_moving_up_then_reaches_visible_root() {
    let mut projection = adjacency(vec![rec(1, 0), rec(10, 1)]);
    projection.set_root_enumerable(true);
    let ten = projection.find_by_uid("10:1").expect("10");
    let mut cursor = TreeCursor::at(ten);

    assert!(cursor.move_to_above(&projection));
    assert!(cursor.move_to_above(&projection));
    assert_eq!(cursor.current(), Some(projection.root()));
    assert!(!cursor.move_to_above(&projection));

    cursor.reset();
    assert_eq!(cursor.current(), None);
}

#[test]
fn given_root_record_when_building_then_root_key_comes_from_the_record() {
    testing::init_test_setup();
    let options = ProjectionOptions::adjacency("id", "pid")
        .with_root_record(Record::new().with("id", 100).with("name", "all"))
        .with_root_enumerable(true);

    let projection = TreeProjection::new(options, vec![rec(1, 100), rec(2, 1)]).expect("build");

    assert_eq!(uids(&projection), vec!["100", "1", "2:1"]);
    let root = projection.node(projection.root()).expect("root");
    assert!(root.record().is_some());
    assert_eq!(projection.source_index_of(0), None);
}

#[test]
fn given_filter_when_applied_then_hidden_subtrees_are_removed() {
    let records = vec![
        rec(1, 0).with("visible", true),
        rec(10, 1).with("visible", true),
        rec(2, 0).with("visible", false),
        rec(20, 2).with("visible", true),
    ];
    let mut projection = adjacency(records);
    let two = projection.find_by_uid("2").expect("2");
    let twenty = projection.find_by_uid("20:2").expect("20");

    let events = projection.set_filter(Some(filter_by_field("visible")));

    assert_eq!(events, vec![ProjectionChange::removed(2, vec![two, twenty])]);
    assert_eq!(labels(&projection), vec!["1", "10"]);
    assert_eq!(projection.index_of(two), Ok(None));

    let events = projection.set_filter(None);
    assert_eq!(events, vec![ProjectionChange::added(2, vec![two, twenty])]);
}

#[rstest]
#[case(true, ChangeAction::Add)]
#[case(false, ChangeAction::Remove)]
fn given_root_toggle_when_changed_then_emits_single_root_event(
    #[case] enumerable: bool,
    #[case] action: ChangeAction,
) {
    let mut projection = adjacency(vec![rec(1, 0), rec(2, 0)]);
    if !enumerable {
        projection.set_root_enumerable(true);
    }

    let events = projection.set_root_enumerable(enumerable);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, action);
    assert_eq!(events[0].items(), &[projection.root()]);
}

#[test]
fn given_flagged_record_without_children_when_classifying_then_flag_wins() {
    testing::init_test_setup();
    let options = ProjectionOptions::adjacency("id", "pid")
        .with_root_key(0)
        .with_node_field("folder");
    let projection = TreeProjection::new(
        options,
        vec![rec(1, 0).with("folder", true), rec(2, 0), rec(3, 2)],
    )
    .expect("build");

    let one = projection.find_by_uid("1").expect("1");
    let two = projection.find_by_uid("2").expect("2");
    let three = projection.find_by_uid("3:2").expect("3");
    assert_eq!(projection.is_node(one), Ok(true));
    assert_eq!(projection.is_node(two), Ok(true));
    assert_eq!(projection.is_leaf(three), Ok(true));
}

#[test]
fn given_stale_node_when_querying_then_unknown_node_is_reported() {
    let mut projection = adjacency(vec![rec(1, 0), rec(2, 0)]);
    let one = projection.find_by_uid("1").expect("1");

    projection
        .handle(SourceChange::Remove {
            index: 0,
            items: vec![rec(1, 0)],
        })
        .expect("remove");

    assert!(!projection.contains(one));
    assert_eq!(projection.children_of(one), Err(DomainError::UnknownNode(one)));
    assert_eq!(projection.level_of(one), Err(DomainError::UnknownNode(one)));
    assert_eq!(projection.set_expanded(one, true), Err(DomainError::UnknownNode(one)));
}
