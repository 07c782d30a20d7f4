//! End-to-end layout scenarios driven through the public API

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use quill_core::{
    ChannelNotifier, Config, EmptyDefaults, LayoutEvent, MemoryPersistence, OpenOptions,
    PersistedGroup, PersistedLayout, PersistedTab, SplitSide, Tab, TabData, TabManager, TabType,
};

fn manager() -> TabManager {
    TabManager::new(
        Config::new(PathBuf::from("/tmp/quill-scenarios")),
        Arc::new(EmptyDefaults),
        Arc::new(MemoryPersistence::new()),
    )
}

fn tab(id: &str, entity: &str) -> PersistedTab {
    PersistedTab {
        id: id.to_string(),
        entity_id: entity.to_string(),
        tab_type: TabType::Document,
        data: TabData::new(),
    }
}

fn group(id: &str, order: f64, width: u32, active: &str, tabs: Vec<PersistedTab>) -> PersistedGroup {
    PersistedGroup {
        id: id.to_string(),
        order,
        width,
        active_tab: Some(active.to_string()),
        group_data: HashMap::new(),
        tabs,
    }
}

fn with_layout(groups: Vec<PersistedGroup>, active_group: &str) -> TabManager {
    let manager = manager();
    manager.initialize(Some(PersistedLayout {
        groups,
        active_group: Some(active_group.to_string()),
    }));
    manager
}

fn tab_ids(manager: &TabManager, group_id: &str) -> Vec<String> {
    manager.group_tabs(group_id).into_iter().map(|t| t.id).collect()
}

#[test]
fn test_close_active_tab_activates_successor() {
    let manager = with_layout(
        vec![group("g1", 0.0, 600, "t1", vec![tab("t1", "e1"), tab("t2", "e2")])],
        "g1",
    );
    assert_eq!(manager.group_tabs("g1")[1].order, 500.0);

    manager.close_tab("t1", "g1");
    assert_eq!(tab_ids(&manager, "g1"), vec!["t2"]);
    assert_eq!(manager.active_tab_id().unwrap(), "t2");
    assert!(manager.validate().is_ok());
}

#[test]
fn test_close_only_tab_destroys_group() {
    let manager = with_layout(
        vec![
            group("g1", 0.0, 600, "t1", vec![tab("t1", "e1")]),
            group("g2", 500.0, 400, "t3", vec![tab("t3", "e3")]),
        ],
        "g2",
    );

    manager.close_tab("t3", "g2");
    assert!(manager.group("g2").is_none());
    assert_eq!(manager.active_group_id().unwrap(), "g1");
    assert_eq!(manager.group("g1").unwrap().width, 1000);
    assert!(manager.validate().is_ok());
}

#[test]
fn test_split_right_halves_target() {
    let manager = with_layout(
        vec![group("g1", 1000.0, 600, "t1", vec![tab("t1", "e1")])],
        "g1",
    );

    let g3 = manager
        .split_right(Tab::with_id("t4", "e4", TabType::Document), Some("g1"), None)
        .unwrap();
    let created = manager.group(&g3).unwrap();
    assert_eq!(created.order, 1500.0);
    assert_eq!(created.width, 300);
    assert_eq!(manager.group("g1").unwrap().width, 300);
    assert_eq!(tab_ids(&manager, &g3), vec!["t4"]);
    assert_eq!(manager.active_tab_id().unwrap(), "t4");
}

#[test]
fn test_history_steps_back_through_opens() {
    let manager = manager();
    manager.initialize(None);
    let day = manager.active_tab_id().unwrap();
    let group_id = manager.active_group_id().unwrap();

    let a = manager.open_tab(
        Tab::new("doc-a", TabType::Document),
        None,
        OpenOptions::new_tab().activate(true),
    );
    let b = manager.open_tab(Tab::new("doc-b", TabType::Document), None, OpenOptions::in_place());
    assert!(manager.tab(&a).is_none());
    assert_eq!(manager.active_tab_id().unwrap(), b);

    assert!(manager.history_backward());
    assert_eq!(manager.active_tab_id().unwrap(), a);
    assert!(manager.tab(&b).is_none());
    assert_eq!(tab_ids(&manager, &group_id), vec![day.clone(), a.clone()]);

    assert!(manager.history_backward());
    assert_eq!(tab_ids(&manager, &group_id), vec![day.clone()]);
    assert_eq!(manager.active_tab_id().unwrap(), day);
    assert!(!manager.history_backward());

    assert!(manager.history_forward());
    assert!(manager.history_forward());
    assert_eq!(manager.active_tab_id().unwrap(), b);
    assert!(!manager.can_go_forward());
}

#[test]
fn test_move_onto_same_entity_activates_existing() {
    let manager = with_layout(
        vec![
            group("g1", 0.0, 600, "x", vec![tab("x", "shared"), tab("w", "other")]),
            group("g2", 500.0, 600, "z", vec![tab("y", "shared"), tab("z", "third")]),
        ],
        "g1",
    );

    assert!(manager.move_tab("x", "g1", "g2", 0));
    assert!(manager.tab("x").is_none());
    assert_eq!(tab_ids(&manager, "g2"), vec!["y", "z"]);
    assert_eq!(manager.active_group_id().unwrap(), "g2");
    assert_eq!(manager.active_tab_id().unwrap(), "y");

    assert!(manager.history_backward());
    assert_eq!(tab_ids(&manager, "g1"), vec!["x", "w"]);
    assert_eq!(manager.active_tab_id().unwrap(), "x");
}

#[test]
fn test_move_only_tab_onto_same_entity_destroys_source() {
    let manager = with_layout(
        vec![
            group("g1", 0.0, 600, "x", vec![tab("x", "shared")]),
            group("g2", 500.0, 600, "z", vec![tab("y", "shared"), tab("z", "third")]),
        ],
        "g1",
    );

    assert!(manager.move_tab("x", "g1", "g2", 1));
    assert!(manager.group("g1").is_none());
    assert_eq!(manager.active_tab_id().unwrap(), "y");
    assert!(manager.validate().is_ok());

    assert!(manager.history_backward());
    assert_eq!(tab_ids(&manager, "g1"), vec!["x"]);
    assert_eq!(manager.group("g1").unwrap().order, 0.0);
    assert_eq!(manager.active_tab_id().unwrap(), "x");
}

#[test]
fn test_undo_redo_returns_to_same_layout() {
    let manager = manager();
    manager.initialize(None);
    let start = manager.snapshot();

    let a = manager.open_tab(Tab::new("a", TabType::Document), None, OpenOptions::new_tab());
    let left = manager.active_group_id().unwrap();
    let right = manager
        .split_right(manager.tab(&a).unwrap(), None, Some(&left))
        .unwrap();
    manager.open_tab(Tab::new("b", TabType::View), Some(&right), OpenOptions::new_tab());
    manager.focus_next_group();
    let day = manager.active_tab_id().unwrap();
    manager.close_tab(&day, &left);
    let end = manager.snapshot();

    let mut steps = 0;
    while manager.history_backward() {
        steps += 1;
        assert!(manager.validate().is_ok());
    }
    assert_eq!(steps, 5);
    assert_eq!(manager.snapshot(), start);

    while manager.history_forward() {
        assert!(manager.validate().is_ok());
    }
    assert_eq!(manager.snapshot(), end);
}

#[test]
fn test_new_action_discards_redo() {
    let manager = manager();
    manager.initialize(None);
    manager.open_tab(Tab::new("a", TabType::Document), None, OpenOptions::new_tab());
    manager.history_backward();
    assert!(manager.can_go_forward());

    manager.open_tab(Tab::new("b", TabType::Document), None, OpenOptions::new_tab());
    assert!(!manager.can_go_forward());
}

#[test]
fn test_snapshot_restores_identically() {
    let manager = manager();
    manager.initialize(None);
    let left = manager.active_group_id().unwrap();
    manager.open_tab(
        Tab::new("a", TabType::Document).with_data(
            serde_json::json!({"scroll": 42})
                .as_object()
                .cloned()
                .unwrap(),
        ),
        None,
        OpenOptions::new_tab(),
    );
    manager.split_left(Tab::new("b", TabType::Project), Some(&left), None);
    manager.set_group_width(&left, 420);
    let snapshot = manager.snapshot();

    let json = snapshot.to_json().unwrap();
    let restored = self::manager();
    restored.initialize(Some(PersistedLayout::from_json(&json).unwrap()));
    assert_eq!(restored.snapshot(), snapshot);
    assert_eq!(restored.active_tab_id(), manager.active_tab_id());
}

#[test]
fn test_unrestorable_layout_falls_back() {
    let manager = with_layout(vec![group("g1", 0.0, 600, "t1", Vec::new())], "g1");
    let groups = manager.groups();
    assert_eq!(groups.len(), 1);
    assert_ne!(groups[0].id, "g1");
    assert_eq!(manager.active_tab().unwrap().tab_type, TabType::MyDay);
}

#[test]
fn test_restore_reads_persistence() {
    let persistence = MemoryPersistence::with_layout(PersistedLayout {
        groups: vec![group("g1", 0.0, 500, "t2", vec![tab("t1", "e1"), tab("t2", "e2")])],
        active_group: None,
    });
    let manager = TabManager::new(
        Config::new(PathBuf::from("/tmp/quill-scenarios")),
        Arc::new(EmptyDefaults),
        Arc::new(persistence),
    );

    manager.restore();
    assert_eq!(manager.active_group_id().unwrap(), "g1");
    assert_eq!(manager.active_tab_id().unwrap(), "t2");
}

#[tokio::test]
async fn test_events_follow_operations() {
    let (notifier, mut rx) = ChannelNotifier::new();
    let manager = manager().with_notifier(Arc::new(notifier));
    manager.initialize(None);
    let group_id = manager.active_group_id().unwrap();

    let a = manager.open_tab(Tab::new("a", TabType::Document), None, OpenOptions::new_tab());
    let right = manager
        .split_right(Tab::new("b", TabType::Document), None, None)
        .unwrap();
    manager.close_tab(&a, &group_id);

    match rx.recv().await {
        Some(LayoutEvent::Open { tab_id, group_id: g, .. }) => {
            assert_eq!(tab_id, a);
            assert_eq!(g, group_id);
        }
        other => panic!("unexpected event {other:?}"),
    }
    match rx.recv().await {
        Some(LayoutEvent::Split { group_id: g, side, .. }) => {
            assert_eq!(g, right);
            assert_eq!(side, SplitSide::Right);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(matches!(
        rx.recv().await,
        Some(LayoutEvent::Close { entity_id, .. }) if entity_id == "a"
    ));
}
