//! Command execution against the tab store

use quill_history::Dispatch;
use quill_tabs::{GroupUpdate, TabStore};

use crate::command::LayoutCommand;

/// Applies [`LayoutCommand`]s to a [`TabStore`]. Commands that reference
/// tabs or groups which no longer exist do nothing.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    store: TabStore,
}

impl LayoutEngine {
    pub fn new(store: TabStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TabStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TabStore {
        &mut self.store
    }

    pub fn apply(&mut self, command: &LayoutCommand) {
        tracing::trace!(kind = command.kind(), "Applying layout command");

        match command {
            LayoutCommand::EnsureGroup { group } => {
                if !self.store.contains_group(&group.id) {
                    self.store.insert_group(group.to_group());
                }
            }
            LayoutCommand::InsertTab {
                tab,
                group_id,
                index,
                activate,
            } => {
                if self.store.insert_tab_at(tab.clone(), group_id, *index, false) && *activate {
                    self.store.activate_tab_in_group(&tab.id, group_id);
                }
            }
            LayoutCommand::RemoveTab { tab_id, group_id } => {
                self.store.close(tab_id, group_id);
            }
            LayoutCommand::ReplaceTab {
                group_id,
                old_tab_id,
                tab,
            } => {
                if self.store.activate_tab_in_group(old_tab_id, group_id) {
                    self.store.replace_active_tab(tab.clone(), group_id);
                }
            }
            LayoutCommand::MoveTab {
                tab_id,
                source_id,
                destination_id,
                index,
            } => {
                self.store.move_tab(tab_id, source_id, destination_id, *index);
            }
            LayoutCommand::ActivateTab { tab_id, group_id } => {
                if self.store.activate_tab_in_group(tab_id, group_id) {
                    self.store.set_active_group(group_id);
                }
            }
            LayoutCommand::FocusGroup { group_id } => {
                self.store.set_active_group(group_id);
            }
            LayoutCommand::SetWidths { widths } => {
                for (group_id, width) in widths {
                    self.store.update_group(group_id, GroupUpdate::width(*width));
                }
            }
            LayoutCommand::SetOrders { orders } => {
                for (group_id, order) in orders {
                    let update = GroupUpdate {
                        order: Some(*order),
                        ..Default::default()
                    };
                    self.store.update_group(group_id, update);
                }
            }
            LayoutCommand::SetGroupData {
                group_id,
                group_data,
            } => {
                let update = GroupUpdate {
                    group_data: Some(group_data.clone()),
                    ..Default::default()
                };
                self.store.update_group(group_id, update);
            }
            LayoutCommand::UpdateTabData { tab_id, data } => {
                self.store.update_tab_data(tab_id, data);
            }
            LayoutCommand::ReplaceTabData { tab_id, data } => {
                self.store.replace_tab_data(tab_id, data.clone());
            }
            LayoutCommand::Batch(commands) => {
                for command in commands {
                    self.apply(command);
                }
            }
        }
    }
}

impl Dispatch<LayoutCommand> for LayoutEngine {
    fn dispatch(&mut self, command: &LayoutCommand) {
        self.apply(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::GroupSpec;
    use quill_tabs::{Tab, TabData, TabGroup, TabType};

    fn engine() -> LayoutEngine {
        let mut store = TabStore::new();
        store.insert_group(TabGroup::with_id("g1", 0.0, 600));
        store.add_tab(Tab::with_id("a", "doc-a", TabType::Document), "g1", true);
        LayoutEngine::new(store)
    }

    #[test]
    fn test_insert_into_recreated_group() {
        let mut engine = engine();
        engine.apply(&LayoutCommand::batch([
            LayoutCommand::EnsureGroup {
                group: GroupSpec::of(&TabGroup::with_id("g2", 500.0, 300)),
            },
            LayoutCommand::InsertTab {
                tab: Tab::with_id("b", "doc-b", TabType::Document),
                group_id: "g2".to_string(),
                index: 0,
                activate: true,
            },
            LayoutCommand::activate("b", "g2"),
        ]));

        let store = engine.store();
        assert_eq!(store.group("g2").unwrap().width, 300);
        assert_eq!(store.active_tab_id().unwrap(), "b");
        assert!(store.validate().is_ok());
    }

    #[test]
    fn test_replace_tab_in_slot() {
        let mut engine = engine();
        engine.apply(&LayoutCommand::ReplaceTab {
            group_id: "g1".to_string(),
            old_tab_id: "a".to_string(),
            tab: Tab::with_id("x", "doc-x", TabType::Document),
        });
        assert_eq!(engine.store().tab_ids("g1").to_vec(), vec!["x".to_string()]);
    }

    #[test]
    fn test_set_orders_and_group_data() {
        let mut engine = engine();
        let mut remembered = std::collections::HashMap::new();
        remembered.insert("doc-a".to_string(), TabData::new());
        engine.apply(&LayoutCommand::batch([
            LayoutCommand::SetOrders {
                orders: vec![("g1".to_string(), 1500.0), ("missing".to_string(), 0.0)],
            },
            LayoutCommand::SetGroupData {
                group_id: "g1".to_string(),
                group_data: remembered.clone(),
            },
        ]));

        let group = engine.store().group("g1").unwrap();
        assert_eq!(group.order, 1500.0);
        assert_eq!(group.group_data, remembered);
    }

    #[test]
    fn test_stale_commands_are_ignored() {
        let mut engine = engine();
        engine.apply(&LayoutCommand::RemoveTab {
            tab_id: "gone".to_string(),
            group_id: "g1".to_string(),
        });
        engine.apply(&LayoutCommand::activate("gone", "g1"));
        engine.apply(&LayoutCommand::MoveTab {
            tab_id: "a".to_string(),
            source_id: "g1".to_string(),
            destination_id: "missing".to_string(),
            index: 0,
        });
        engine.apply(&LayoutCommand::SetWidths {
            widths: vec![("missing".to_string(), 10)],
        });

        assert_eq!(engine.store().tab_count(), 1);
        assert_eq!(engine.store().active_tab_id().unwrap(), "a");
    }
}
