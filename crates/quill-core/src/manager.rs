//! Tab Manager
//!
//! User-facing layout operations. Undoable operations are written as a pair
//! of commands: the forward command is applied through the engine and both
//! are pushed onto the history stack.
//!
//! Every operation holds the state lock for its whole duration. Resolver
//! calls happen before the lock is taken; cleanup, notifications and
//! persistence happen after it is released.

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use uuid::Uuid;

use quill_history::{HistoryEntry, HistoryStack};
use quill_layout::{LayoutPersistence, PersistedLayout};
use quill_tabs::{
    is_collapsed, midpoint, renumbered, EntityId, GroupId, Tab, TabData, TabGroup, TabId, TabStore,
    TabType, ORDER_STEP,
};

use crate::command::{GroupSpec, LayoutCommand};
use crate::config::Config;
use crate::drag::{DragState, DropTarget};
use crate::engine::LayoutEngine;
use crate::resolver::{EntityResolver, LayoutEvent, Notification, SplitSide};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Append instead of replacing the group's active tab
    pub open_in_new_tab: bool,
    /// Defaults to activating only `new` tabs
    pub should_activate: Option<bool>,
}

impl OpenOptions {
    pub fn in_place() -> Self {
        Self::default()
    }

    pub fn new_tab() -> Self {
        Self {
            open_in_new_tab: true,
            should_activate: None,
        }
    }

    pub fn activate(mut self, activate: bool) -> Self {
        self.should_activate = Some(activate);
        self
    }
}

/// How the user asked for an entity to be opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenIntent {
    /// Plain click
    Replace,
    /// Middle click or modifier click
    NewTab,
    /// Open beside the current pane
    SplitRight,
}

struct ManagerState {
    layout: LayoutEngine,
    history: HistoryStack<LayoutCommand>,
    drag: DragState,
    /// Bumped on every change, stamps persistence writes
    generation: u64,
}

impl ManagerState {
    fn store(&self) -> &TabStore {
        self.layout.store()
    }

    /// Apply `forward` and record it with its inverse
    fn record(&mut self, name: &str, forward: LayoutCommand, backward: LayoutCommand) {
        self.record_entry(HistoryEntry::new(name, forward, backward));
    }

    /// Apply `forward` and record it without an inverse. With `replay`, undoing
    /// the next entry re-applies this one.
    fn record_forward(&mut self, name: &str, forward: LayoutCommand, replay: bool) {
        let entry = HistoryEntry::forward_only(name, forward);
        self.record_entry(if replay { entry.replay_on_undo() } else { entry });
    }

    fn record_entry(&mut self, entry: HistoryEntry<LayoutCommand>) {
        self.ensure_baseline();
        if let Some(forward) = &entry.forward {
            self.layout.apply(forward);
        }
        self.history.push(entry);
    }

    fn ensure_baseline(&mut self) {
        if self.history.is_empty() {
            let baseline = baseline_entry(self.layout.store());
            self.history.push(baseline);
        }
    }
}

#[derive(Default)]
struct Effects {
    events: Vec<LayoutEvent>,
    closed: Vec<Tab>,
    changed: bool,
}

/// Serializes layout writes so an older snapshot never lands after a newer one
#[derive(Debug, Default)]
struct WriteOrder {
    last: Mutex<u64>,
}

impl WriteOrder {
    fn store(
        &self,
        persistence: &dyn LayoutPersistence,
        generation: u64,
        layout: &PersistedLayout,
    ) -> bool {
        let mut last = self.last.lock();
        if generation <= *last {
            tracing::debug!(generation, last = *last, "Skipping stale layout write");
            return false;
        }
        *last = generation;
        if let Err(e) = persistence.store(layout) {
            tracing::warn!(error = %e, "Failed to persist layout");
        }
        true
    }
}

pub struct TabManager {
    state: Arc<Mutex<ManagerState>>,
    config: Arc<RwLock<Config>>,
    resolver: Arc<dyn EntityResolver>,
    persistence: Arc<dyn LayoutPersistence>,
    writes: Arc<WriteOrder>,
    notifier: Option<Arc<dyn Notification>>,
}

impl TabManager {
    pub fn new(
        config: Config,
        resolver: Arc<dyn EntityResolver>,
        persistence: Arc<dyn LayoutPersistence>,
    ) -> Self {
        let state = ManagerState {
            layout: LayoutEngine::new(TabStore::with_renormalize_after(config.renormalize_after)),
            history: HistoryStack::with_capacity(config.history_capacity),
            drag: DragState::Idle,
            generation: 0,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            config: Arc::new(RwLock::new(config)),
            resolver,
            persistence,
            writes: Arc::new(WriteOrder::default()),
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notification>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    pub fn set_config(&self, config: Config) {
        *self.config.write() = config;
    }

    // ---- lifecycle ----

    /// Replace the whole layout. Without a usable layout the workspace starts
    /// with a single My Day tab. History restarts from the new state.
    pub fn initialize(&self, persisted: Option<PersistedLayout>) {
        let fallback = self.my_day_tab();
        let width = self.config.read().default_group_width;

        self.transact(|state, effects| {
            state.layout.store_mut().clear();
            state.history.clear();
            state.drag = DragState::Idle;

            let restored = persisted
                .as_ref()
                .filter(|layout| layout.is_restorable())
                .map_or(0, |layout| layout.restore_into(state.layout.store_mut()));

            if state.store().is_empty() {
                let store = state.layout.store_mut();
                store.clear();
                let group_id = store.create_group(0.0, width);
                store.add_tab(fallback, &group_id, true);
                tracing::info!(group_id = %group_id, "Seeded default layout");
            } else {
                tracing::info!(
                    groups = restored,
                    tabs = state.store().tab_count(),
                    "Restored layout"
                );
            }

            let baseline = baseline_entry(state.store());
            state.history.push(baseline);
            effects.changed = true;
        });
    }

    /// Load the layout from persistence and initialize from it
    pub fn restore(&self) {
        let persisted = match self.persistence.load() {
            Ok(layout) => layout,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load layout, starting fresh");
                None
            }
        };
        self.initialize(persisted);
    }

    /// Build a tab for an entity, with defaults from the resolver
    pub fn new_tab(&self, entity_id: impl Into<EntityId>, tab_type: TabType, data: TabData) -> Tab {
        let entity_id = entity_id.into();
        let defaults = self.resolver.create_default_data(&entity_id, tab_type, &data);
        Tab::new(entity_id, tab_type)
            .with_data(data)
            .with_default_data(defaults)
    }

    // ---- opening ----

    /// Open a tab in a group (the active group when `group_id` is `None` or
    /// unknown). An entity already shown in the group is activated instead of
    /// being opened twice. Returns the id of the tab that ends up showing it.
    pub fn open_tab(&self, tab: Tab, group_id: Option<&str>, options: OpenOptions) -> TabId {
        let width = self.config.read().default_group_width;

        self.transact(|state, effects| {
            let store = state.store();
            let focus = focus_command(store);

            let mut prelude = Vec::new();
            let target = group_id
                .filter(|id| store.contains_group(id))
                .map(str::to_string)
                .or_else(|| store.active_group_id().cloned());
            let group_id = match target {
                Some(id) => id,
                None => {
                    let spec = GroupSpec::of(&TabGroup::new(0.0, width));
                    let id = spec.id.clone();
                    prelude.push(LayoutCommand::EnsureGroup { group: spec });
                    id
                }
            };

            if let Some(existing) = store.find_entity(&group_id, &tab.entity_id) {
                let existing_id = existing.id.clone();
                let mut forward = Vec::new();
                let mut backward = Vec::new();
                if !tab.data.is_empty() {
                    forward.push(LayoutCommand::UpdateTabData {
                        tab_id: existing_id.clone(),
                        data: tab.data.clone(),
                    });
                    backward.push(LayoutCommand::ReplaceTabData {
                        tab_id: existing_id.clone(),
                        data: existing.data.clone(),
                    });
                }
                forward.push(LayoutCommand::activate(existing_id.clone(), group_id.clone()));
                backward.push(focus);

                tracing::debug!(tab_id = %existing_id, group_id = %group_id, "Entity already open, activating");
                state.record(
                    "open_tab",
                    LayoutCommand::batch(forward),
                    LayoutCommand::batch(backward),
                );
                effects.changed = true;
                return existing_id;
            }

            let mut tab = tab;
            let remembered = store
                .group(&group_id)
                .and_then(|g| g.entity_data(&tab.entity_id))
                .cloned();
            tab.seed_data(remembered.as_ref());

            let replaced = if options.open_in_new_tab {
                None
            } else {
                store
                    .active_tab_in(&group_id)
                    .and_then(|id| store.tab(id))
                    .cloned()
            };
            let index = store.tab_ids(&group_id).len();

            let tab_id = tab.id.clone();
            let event = LayoutEvent::Open {
                tab_id: tab_id.clone(),
                entity_id: tab.entity_id.clone(),
                tab_type: tab.tab_type,
                group_id: group_id.clone(),
            };

            let (forward, backward) = match replaced {
                Some(old) => (
                    LayoutCommand::batch([
                        LayoutCommand::ReplaceTab {
                            group_id: group_id.clone(),
                            old_tab_id: old.id.clone(),
                            tab,
                        },
                        LayoutCommand::activate(tab_id.clone(), group_id.clone()),
                    ]),
                    LayoutCommand::batch([
                        LayoutCommand::ReplaceTab {
                            group_id: group_id.clone(),
                            old_tab_id: tab_id.clone(),
                            tab: old,
                        },
                        focus,
                    ]),
                ),
                None => {
                    let activate = options
                        .should_activate
                        .unwrap_or(tab.tab_type == TabType::New);
                    let mut forward = prelude;
                    forward.push(LayoutCommand::InsertTab {
                        tab,
                        group_id: group_id.clone(),
                        index,
                        activate,
                    });
                    if activate {
                        forward.push(LayoutCommand::activate(tab_id.clone(), group_id.clone()));
                    }
                    (
                        LayoutCommand::batch(forward),
                        LayoutCommand::batch([
                            LayoutCommand::RemoveTab {
                                tab_id: tab_id.clone(),
                                group_id: group_id.clone(),
                            },
                            focus,
                        ]),
                    )
                }
            };

            state.record("open_tab", forward, backward);
            tracing::info!(tab_id = %tab_id, group_id = %group_id, "Opened tab");
            effects.events.push(event);
            effects.changed = true;
            tab_id
        })
    }

    pub fn open_with_intent(&self, tab: Tab, group_id: Option<&str>, intent: OpenIntent) -> TabId {
        match intent {
            OpenIntent::Replace => self.open_tab(tab, group_id, OpenOptions::in_place()),
            OpenIntent::NewTab => self.open_tab(tab, group_id, OpenOptions::new_tab()),
            OpenIntent::SplitRight => {
                let tab_id = tab.id.clone();
                self.split_right(tab, group_id, None);
                tab_id
            }
        }
    }

    // ---- splitting ----

    /// Open `tab` in a new pane to the left of `target` (the active group by
    /// default). A tab that already lives in `origin` is moved, not copied.
    pub fn split_left(&self, tab: Tab, target: Option<&str>, origin: Option<&str>) -> Option<GroupId> {
        self.split(tab, target, origin, SplitSide::Left)
    }

    pub fn split_right(&self, tab: Tab, target: Option<&str>, origin: Option<&str>) -> Option<GroupId> {
        self.split(tab, target, origin, SplitSide::Right)
    }

    fn split(
        &self,
        tab: Tab,
        target: Option<&str>,
        origin: Option<&str>,
        side: SplitSide,
    ) -> Option<GroupId> {
        self.transact(|state, effects| {
            let store = state.store();
            let target_id = target
                .filter(|id| store.contains_group(id))
                .map(str::to_string)
                .or_else(|| store.active_group_id().cloned())?;
            let target_group = store.group(&target_id)?.clone();
            let origin_id = origin
                .filter(|id| store.tab_index(id, &tab.id).is_some())
                .map(str::to_string)
                .or_else(|| store.group_of(&tab.id).cloned());

            if origin_id.as_deref() == Some(target_id.as_str()) && store.tab_ids(&target_id).len() == 1 {
                tracing::debug!(tab_id = %tab.id, "Cannot split a pane off its only tab");
                return None;
            }

            let neighbor = match side {
                SplitSide::Left => store.left_group(&target_id),
                SplitSide::Right => store.right_group(&target_id),
            };
            let order = match (side, neighbor) {
                (_, Some(neighbor)) => midpoint(target_group.order, neighbor.order),
                (SplitSide::Left, None) => target_group.order - ORDER_STEP,
                (SplitSide::Right, None) => target_group.order + ORDER_STEP,
            };
            let width = target_group.width / 2;
            let mut group = TabGroup::new(order, width);
            let new_id = group.id.clone();

            let (prev, next) = match side {
                SplitSide::Left => (neighbor.map(|g| g.order), Some(target_group.order)),
                SplitSide::Right => (Some(target_group.order), neighbor.map(|g| g.order)),
            };
            let mut old_orders = Vec::new();
            let mut new_orders = Vec::new();
            if is_collapsed(prev, order, next) {
                let existing = store.all_groups();
                let at = existing
                    .iter()
                    .position(|g| g.id == target_id)
                    .map_or(0, |p| if side == SplitSide::Right { p + 1 } else { p });
                let mut sequence: Vec<(GroupId, f64)> =
                    existing.iter().map(|g| (g.id.clone(), g.order)).collect();
                sequence.insert(at, (new_id.clone(), order));

                for ((id, old), key) in sequence.into_iter().zip(renumbered(existing.len() + 1)) {
                    if id == new_id {
                        group.order = key;
                    } else {
                        old_orders.push((id.clone(), old));
                        new_orders.push((id, key));
                    }
                }
                tracing::debug!(groups = existing.len() + 1, "Renumbered group orders");
            }
            let order = group.order;
            let focus = focus_command(store);

            let mut forward = Vec::new();
            if !new_orders.is_empty() {
                forward.push(LayoutCommand::SetOrders { orders: new_orders });
            }
            forward.push(LayoutCommand::EnsureGroup {
                group: GroupSpec::of(&group),
            });
            forward.push(LayoutCommand::SetWidths {
                widths: vec![(target_id.clone(), width)],
            });
            let mut backward = Vec::new();
            let mut widths = vec![(target_id.clone(), target_group.width)];

            match &origin_id {
                Some(origin_id) => {
                    let origin_group = store.group(origin_id)?;
                    let index = store.tab_index(origin_id, &tab.id).unwrap_or(0);
                    let origin_active = store
                        .active_tab_in(origin_id)
                        .filter(|id| **id != tab.id)
                        .cloned();

                    forward.push(LayoutCommand::MoveTab {
                        tab_id: tab.id.clone(),
                        source_id: origin_id.clone(),
                        destination_id: new_id.clone(),
                        index: 0,
                    });
                    backward.push(LayoutCommand::EnsureGroup {
                        group: GroupSpec::of(origin_group),
                    });
                    backward.push(LayoutCommand::MoveTab {
                        tab_id: tab.id.clone(),
                        source_id: new_id.clone(),
                        destination_id: origin_id.clone(),
                        index,
                    });
                    if let Some(active) = origin_active {
                        backward.push(LayoutCommand::activate(active, origin_id.clone()));
                    }
                    if *origin_id != target_id {
                        widths.push((origin_id.clone(), origin_group.width));
                    }
                }
                None => {
                    let mut tab = tab.clone();
                    tab.seed_data(None);
                    backward.push(LayoutCommand::RemoveTab {
                        tab_id: tab.id.clone(),
                        group_id: new_id.clone(),
                    });
                    forward.push(LayoutCommand::InsertTab {
                        tab,
                        group_id: new_id.clone(),
                        index: 0,
                        activate: true,
                    });
                }
            }

            forward.push(LayoutCommand::activate(tab.id.clone(), new_id.clone()));
            backward.push(LayoutCommand::SetWidths { widths });
            if !old_orders.is_empty() {
                backward.push(LayoutCommand::SetOrders { orders: old_orders });
            }
            backward.push(focus);

            let name = match side {
                SplitSide::Left => "split_left",
                SplitSide::Right => "split_right",
            };
            state.record(name, LayoutCommand::batch(forward), LayoutCommand::batch(backward));

            tracing::info!(tab_id = %tab.id, group_id = %new_id, order, width, "Split pane");
            effects.events.push(LayoutEvent::Split {
                tab_id: tab.id.clone(),
                group_id: new_id.clone(),
                side,
            });
            effects.changed = true;
            Some(new_id)
        })
    }

    /// Show `tab` as an extra member of an existing pane. A tab that already
    /// lives in another pane moves there and takes focus; a tab from outside
    /// the layout is opened.
    pub fn split_center(&self, tab: Tab, target: &str, origin: Option<&str>) -> Option<TabId> {
        let origin_id = self.read(|store| {
            origin
                .filter(|id| store.tab_index(id, &tab.id).is_some())
                .map(str::to_string)
                .or_else(|| store.group_of(&tab.id).cloned())
        });
        if !self.read(|store| store.contains_group(target)) {
            return None;
        }

        match origin_id {
            Some(origin_id) if origin_id == target => None,
            Some(origin_id) => {
                let index = self.read(|store| store.tab_ids(target).len());
                if !self.move_tab_inner(&tab.id, &origin_id, target, index, true) {
                    return None;
                }
                // Dropping onto a pane that shows the entity keeps its tab
                self.read(|store| {
                    if store.contains_tab(&tab.id) {
                        Some(tab.id.clone())
                    } else {
                        store.find_entity(target, &tab.entity_id).map(|t| t.id.clone())
                    }
                })
            }
            None => Some(self.open_tab(tab, Some(target), OpenOptions::new_tab().activate(true))),
        }
    }

    // ---- closing ----

    /// Close a tab. The last tab of the workspace is swapped for a blank tab;
    /// the last tab of a pane takes the pane with it and its width goes to
    /// the neighbouring pane.
    pub fn close_tab(&self, tab_id: &str, group_id: &str) {
        let placeholder = self.placeholder_tab();

        self.transact(|state, effects| {
            let store = state.store();
            let Some(index) = store.tab_index(group_id, tab_id) else {
                tracing::debug!(tab_id, group_id, "Ignoring close of unknown tab");
                return;
            };
            let (Some(tab), Some(group)) = (store.tab(tab_id).cloned(), store.group(group_id).cloned())
            else {
                return;
            };
            let focus = focus_command(store);
            let members = store.tab_ids(group_id).len();
            let group_survives = members > 1 || store.group_count() == 1;
            let group_data = (group_survives && !tab.data.is_empty()).then(|| {
                let mut updated = group.clone();
                updated.merge_entity_data(&tab.entity_id, &tab.data);
                (updated.group_data, group.group_data.clone())
            });

            let (forward, backward) = if members == 1 && store.group_count() == 1 {
                let placeholder_id = placeholder.id.clone();
                (
                    LayoutCommand::batch([
                        LayoutCommand::ReplaceTab {
                            group_id: group_id.to_string(),
                            old_tab_id: tab_id.to_string(),
                            tab: placeholder,
                        },
                        LayoutCommand::activate(placeholder_id.clone(), group_id),
                    ]),
                    LayoutCommand::batch([
                        LayoutCommand::ReplaceTab {
                            group_id: group_id.to_string(),
                            old_tab_id: placeholder_id,
                            tab: tab.clone(),
                        },
                        focus,
                    ]),
                )
            } else if members == 1 {
                let sibling = store
                    .left_group(group_id)
                    .or_else(|| store.right_group(group_id))
                    .map(|g| (g.id.clone(), g.width));

                let mut forward = Vec::new();
                let mut backward = vec![
                    LayoutCommand::EnsureGroup {
                        group: GroupSpec::of(&group),
                    },
                    LayoutCommand::InsertTab {
                        tab: tab.clone(),
                        group_id: group_id.to_string(),
                        index: 0,
                        activate: true,
                    },
                ];
                if let Some((sibling_id, sibling_width)) = sibling {
                    forward.push(LayoutCommand::SetWidths {
                        widths: vec![(sibling_id.clone(), sibling_width.saturating_add(group.width))],
                    });
                    backward.push(LayoutCommand::SetWidths {
                        widths: vec![(sibling_id, sibling_width)],
                    });
                }
                forward.push(LayoutCommand::RemoveTab {
                    tab_id: tab_id.to_string(),
                    group_id: group_id.to_string(),
                });
                backward.push(focus);
                (LayoutCommand::batch(forward), LayoutCommand::batch(backward))
            } else {
                let was_active = store.active_tab_in(group_id).is_some_and(|id| id == tab_id);
                (
                    LayoutCommand::RemoveTab {
                        tab_id: tab_id.to_string(),
                        group_id: group_id.to_string(),
                    },
                    LayoutCommand::batch([
                        LayoutCommand::InsertTab {
                            tab: tab.clone(),
                            group_id: group_id.to_string(),
                            index,
                            activate: was_active,
                        },
                        focus,
                    ]),
                )
            };

            let (forward, backward) = match group_data {
                Some((remembered, previous)) => (
                    LayoutCommand::batch([
                        LayoutCommand::SetGroupData {
                            group_id: group_id.to_string(),
                            group_data: remembered,
                        },
                        forward,
                    ]),
                    LayoutCommand::batch([
                        backward,
                        LayoutCommand::SetGroupData {
                            group_id: group_id.to_string(),
                            group_data: previous,
                        },
                    ]),
                ),
                None => (forward, backward),
            };
            state.record("close_tab", forward, backward);

            tracing::info!(tab_id, group_id, "Closed tab");
            effects.events.push(LayoutEvent::close(&tab));
            effects.closed.push(tab);
            effects.changed = true;
        });
    }

    /// Close every tab matching `predicate`. Not undoable.
    pub fn close_tabs_by_filter<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Tab) -> bool,
    {
        self.close_matching(|store| {
            let mut targets = Vec::new();
            for group in store.groups() {
                for tab in store.group_tabs(&group.id) {
                    if predicate(tab) {
                        targets.push((tab.id.clone(), group.id.clone()));
                    }
                }
            }
            targets
        })
    }

    /// Close the other tabs of the pane holding `tab_id`
    pub fn close_other_tabs(&self, tab_id: &str) -> usize {
        self.close_matching(|store| {
            let Some(group_id) = store.group_of(tab_id) else {
                return Vec::new();
            };
            store
                .tab_ids(group_id)
                .iter()
                .filter(|id| *id != tab_id)
                .map(|id| (id.clone(), group_id.clone()))
                .collect()
        })
    }

    pub fn close_tabs_by_entity(&self, entity_id: &str) -> usize {
        self.close_tabs_by_filter(|tab| tab.entity_id == entity_id)
    }

    pub fn close_group(&self, group_id: &str) -> usize {
        self.close_matching(|store| {
            store
                .tab_ids(group_id)
                .iter()
                .map(|id| (id.clone(), group_id.to_string()))
                .collect()
        })
    }

    pub fn close_all(&self) -> usize {
        self.close_tabs_by_filter(|_| true)
    }

    fn close_matching<S>(&self, select: S) -> usize
    where
        S: FnOnce(&TabStore) -> Vec<(TabId, GroupId)>,
    {
        let placeholder = self.placeholder_tab();
        let width = self.config.read().default_group_width;

        self.transact(|state, effects| {
            let targets = select(state.store());
            if targets.is_empty() {
                return 0;
            }

            let store = state.layout.store_mut();
            let mut closed = 0;
            for (tab_id, group_id) in &targets {
                if let Some(tab) = store.close(tab_id, group_id) {
                    effects.events.push(LayoutEvent::close(&tab));
                    effects.closed.push(tab);
                    closed += 1;
                }
            }

            if store.is_empty() {
                store.clear();
                let group_id = store.create_group(0.0, width);
                store.add_tab(placeholder, &group_id, true);
                tracing::debug!(group_id = %group_id, "Workspace emptied, seeded blank tab");
            }

            tracing::info!(closed, "Closed tabs");
            effects.changed = true;
            closed
        })
    }

    // ---- moving ----

    /// Move a tab to `index` in another pane, or reorder it within its pane.
    /// When the destination already shows the same entity, the moved tab is
    /// closed and the existing one activated.
    pub fn move_tab(&self, tab_id: &str, source_id: &str, destination_id: &str, index: usize) -> bool {
        self.move_tab_inner(tab_id, source_id, destination_id, index, false)
    }

    /// With `activate`, a moved tab is focused in its destination
    fn move_tab_inner(
        &self,
        tab_id: &str,
        source_id: &str,
        destination_id: &str,
        index: usize,
        activate: bool,
    ) -> bool {
        self.transact(|state, effects| {
            let store = state.store();
            let Some(old_index) = store.tab_index(source_id, tab_id) else {
                return false;
            };
            let (Some(tab), Some(source)) = (store.tab(tab_id).cloned(), store.group(source_id)) else {
                return false;
            };
            if !store.contains_group(destination_id) {
                return false;
            }
            let focus = focus_command(store);

            if source_id == destination_id {
                let index = index.min(store.tab_ids(source_id).len() - 1);
                if index == old_index {
                    return false;
                }
                state.record(
                    "reorder_tab",
                    LayoutCommand::MoveTab {
                        tab_id: tab_id.to_string(),
                        source_id: source_id.to_string(),
                        destination_id: source_id.to_string(),
                        index,
                    },
                    LayoutCommand::MoveTab {
                        tab_id: tab_id.to_string(),
                        source_id: source_id.to_string(),
                        destination_id: source_id.to_string(),
                        index: old_index,
                    },
                );
                tracing::debug!(tab_id, group_id = source_id, index, "Reordered tab");
                effects.changed = true;
                return true;
            }

            let source_spec = GroupSpec::of(source);
            let was_active = store.active_tab_in(source_id).is_some_and(|id| id == tab_id);
            let source_active = store
                .active_tab_in(source_id)
                .filter(|id| *id != tab_id)
                .cloned();
            let duplicate = store
                .find_entity(destination_id, &tab.entity_id)
                .map(|existing| existing.id.clone());
            let index = index.min(store.tab_ids(destination_id).len());

            let mut backward = vec![LayoutCommand::EnsureGroup { group: source_spec }];
            let forward = match duplicate {
                Some(existing) => {
                    tracing::debug!(tab_id, existing = %existing, "Destination already shows entity");
                    backward.push(LayoutCommand::InsertTab {
                        tab,
                        group_id: source_id.to_string(),
                        index: old_index,
                        activate: was_active,
                    });
                    LayoutCommand::batch([
                        LayoutCommand::RemoveTab {
                            tab_id: tab_id.to_string(),
                            group_id: source_id.to_string(),
                        },
                        LayoutCommand::activate(existing, destination_id),
                    ])
                }
                None => {
                    backward.push(LayoutCommand::MoveTab {
                        tab_id: tab_id.to_string(),
                        source_id: destination_id.to_string(),
                        destination_id: source_id.to_string(),
                        index: old_index,
                    });
                    let moved = LayoutCommand::MoveTab {
                        tab_id: tab_id.to_string(),
                        source_id: source_id.to_string(),
                        destination_id: destination_id.to_string(),
                        index,
                    };
                    if activate {
                        LayoutCommand::batch([moved, LayoutCommand::activate(tab_id, destination_id)])
                    } else {
                        moved
                    }
                }
            };
            if let Some(active) = source_active {
                backward.push(LayoutCommand::activate(active, source_id));
            }
            backward.push(focus);

            state.record("move_tab", forward, LayoutCommand::batch(backward));

            tracing::info!(tab_id, source_id, destination_id, index, "Moved tab");
            effects.events.push(LayoutEvent::Move {
                tab_id: tab_id.to_string(),
                source_id: source_id.to_string(),
                destination_id: destination_id.to_string(),
            });
            effects.changed = true;
            true
        })
    }

    // ---- focus ----

    /// Focus a tab. Undo puts focus back; undoing the step after this one
    /// re-applies it. Focusing the focused tab records nothing.
    pub fn activate_tab(&self, tab_id: &str, group_id: Option<&str>) -> bool {
        self.transact(|state, effects| {
            let store = state.store();
            let Some(group_id) = group_id
                .filter(|id| store.tab_index(id, tab_id).is_some())
                .map(str::to_string)
                .or_else(|| store.group_of(tab_id).cloned())
            else {
                return false;
            };
            let focused = store.active_group_id() == Some(&group_id)
                && store.active_tab_in(&group_id).is_some_and(|id| id == tab_id);
            if focused {
                tracing::trace!(tab_id, "Tab already focused");
                return false;
            }

            let backward = focus_command(store);
            state.record_entry(
                HistoryEntry::new("activate_tab", LayoutCommand::activate(tab_id, group_id), backward)
                    .replay_on_undo(),
            );
            effects.changed = true;
            true
        })
    }

    pub fn activate_next_tab(&self) -> bool {
        self.activate_adjacent_tab(true)
    }

    pub fn activate_previous_tab(&self) -> bool {
        self.activate_adjacent_tab(false)
    }

    fn activate_adjacent_tab(&self, forward: bool) -> bool {
        let target = self.read(|store| {
            let group = store.active_group()?;
            let ids = store.tab_ids(&group.id);
            if ids.len() < 2 {
                return None;
            }
            let current = store
                .active_tab_in(&group.id)
                .and_then(|active| ids.iter().position(|id| id == active))
                .unwrap_or(0);
            let next = if forward {
                (current + 1) % ids.len()
            } else {
                (current + ids.len() - 1) % ids.len()
            };
            Some((ids[next].clone(), group.id.clone()))
        });

        match target {
            Some((tab_id, group_id)) => self.activate_tab(&tab_id, Some(&group_id)),
            None => false,
        }
    }

    /// Focus the n-th tab of the active pane
    pub fn activate_tab_index(&self, index: usize) -> bool {
        self.transact(|state, effects| {
            let store = state.store();
            let Some(group_id) = store.active_group_id().cloned() else {
                return false;
            };
            let Some(tab_id) = store.tab_ids(&group_id).get(index).cloned() else {
                return false;
            };

            state.record_forward(
                "activate_tab_index",
                LayoutCommand::activate(tab_id, group_id),
                false,
            );
            effects.changed = true;
            true
        })
    }

    pub fn focus_next_group(&self) -> bool {
        self.focus_adjacent_group(true)
    }

    pub fn focus_previous_group(&self) -> bool {
        self.focus_adjacent_group(false)
    }

    fn focus_adjacent_group(&self, forward: bool) -> bool {
        self.transact(|state, effects| {
            let store = state.store();
            let groups: Vec<GroupId> = store.groups().iter().map(|g| g.id.clone()).collect();
            if groups.len() < 2 {
                return false;
            }
            let current = store
                .active_group_id()
                .and_then(|active| groups.iter().position(|id| id == active))
                .unwrap_or(0);
            let next = if forward {
                (current + 1) % groups.len()
            } else {
                (current + groups.len() - 1) % groups.len()
            };

            let name = if forward {
                "focus_next_group"
            } else {
                "focus_previous_group"
            };
            state.record(
                name,
                LayoutCommand::FocusGroup {
                    group_id: groups[next].clone(),
                },
                LayoutCommand::FocusGroup {
                    group_id: groups[current].clone(),
                },
            );
            effects.changed = true;
            true
        })
    }

    // ---- history ----

    pub fn history_backward(&self) -> bool {
        self.transact(|state, effects| {
            let moved = state.history.backward(&mut state.layout);
            effects.changed = moved;
            moved
        })
    }

    pub fn history_forward(&self) -> bool {
        self.transact(|state, effects| {
            let moved = state.history.forward(&mut state.layout);
            effects.changed = moved;
            moved
        })
    }

    pub fn can_go_back(&self) -> bool {
        self.state.lock().history.can_go_back()
    }

    pub fn can_go_forward(&self) -> bool {
        self.state.lock().history.can_go_forward()
    }

    // ---- data and widths ----

    pub fn update_tab_data(&self, tab_id: &str, data: &TabData) -> bool {
        self.transact(|state, effects| {
            effects.changed = state.layout.store_mut().update_tab_data(tab_id, data);
            effects.changed
        })
    }

    pub fn tab_data(&self, tab_id: &str) -> Option<TabData> {
        self.read(|store| store.tab(tab_id).map(|tab| tab.data.clone()))
    }

    pub fn group_data(&self, group_id: &str, entity_id: &str) -> Option<TabData> {
        self.read(|store| {
            store
                .group(group_id)
                .and_then(|group| group.entity_data(entity_id))
                .cloned()
        })
    }

    pub fn update_group_data(&self, group_id: &str, entity_id: &str, data: &TabData) -> bool {
        self.transact(|state, effects| {
            effects.changed = state
                .layout
                .store_mut()
                .update_group_data(group_id, entity_id, data);
            effects.changed
        })
    }

    pub fn set_group_width(&self, group_id: &str, width: u32) -> bool {
        self.transact(|state, effects| {
            if !state.store().contains_group(group_id) {
                return false;
            }
            state.layout.apply(&LayoutCommand::SetWidths {
                widths: vec![(group_id.to_string(), width)],
            });
            effects.changed = true;
            true
        })
    }

    /// Rescale pane widths to fill `container_width` (the current total when
    /// `None`). Does nothing unless `rebalance_widths` is enabled.
    pub fn recalculate_all_tabs(&self, container_width: Option<u32>) {
        let config = self.config();
        if !config.rebalance_widths {
            tracing::debug!("Width rebalancing disabled");
            return;
        }

        self.transact(|state, effects| {
            let store = state.store();
            let groups = store.groups();
            let total: u64 = groups.iter().map(|g| u64::from(g.width)).sum();
            if total == 0 {
                return;
            }
            let target = container_width.map_or(total, u64::from);

            let widths: Vec<(GroupId, u32)> = groups
                .iter()
                .map(|g| {
                    let scaled = u64::from(g.width) * target / total;
                    let width = u32::try_from(scaled).unwrap_or(u32::MAX);
                    (g.id.clone(), width.max(config.min_pane_width))
                })
                .collect();

            tracing::debug!(groups = widths.len(), target, "Rebalanced pane widths");
            state.layout.apply(&LayoutCommand::SetWidths { widths });
            effects.changed = true;
        });
    }

    // ---- drag and drop ----

    pub fn begin_drag(&self, tab_id: &str, origin_group: &str) -> bool {
        let mut state = self.state.lock();
        if state.store().tab_index(origin_group, tab_id).is_none() {
            return false;
        }
        state.drag = DragState::Dragging {
            tab_id: tab_id.to_string(),
            origin_group: origin_group.to_string(),
        };
        true
    }

    pub fn drag_state(&self) -> DragState {
        self.state.lock().drag.clone()
    }

    pub fn cancel_drag(&self) {
        self.state.lock().drag = DragState::Idle;
    }

    /// Finish a drag. The drag state is cleared whether or not the drop
    /// changes the layout.
    pub fn drop_tab(&self, target: DropTarget) -> bool {
        let (drag, tab) = {
            let mut state = self.state.lock();
            let drag = state.drag.take();
            let tab = match &drag {
                DragState::Dragging { tab_id, .. } => state.store().tab(tab_id).cloned(),
                DragState::Idle => None,
            };
            (drag, tab)
        };

        let (DragState::Dragging { origin_group, .. }, Some(tab)) = (drag, tab) else {
            return false;
        };

        match target {
            DropTarget::Left(group_id) => self
                .split_left(tab, Some(&group_id), Some(&origin_group))
                .is_some(),
            DropTarget::Right(group_id) => self
                .split_right(tab, Some(&group_id), Some(&origin_group))
                .is_some(),
            DropTarget::Center(group_id) => self
                .split_center(tab, &group_id, Some(&origin_group))
                .is_some(),
            DropTarget::Index { group_id, index } => {
                self.move_tab(&tab.id, &origin_group, &group_id, index)
            }
        }
    }

    // ---- queries ----

    /// Non-empty panes, left to right
    pub fn groups(&self) -> Vec<TabGroup> {
        self.read(|store| store.groups().into_iter().cloned().collect())
    }

    pub fn group(&self, group_id: &str) -> Option<TabGroup> {
        self.read(|store| store.group(group_id).cloned())
    }

    pub fn group_tabs(&self, group_id: &str) -> Vec<Tab> {
        self.read(|store| store.group_tabs(group_id).into_iter().cloned().collect())
    }

    pub fn tab(&self, tab_id: &str) -> Option<Tab> {
        self.read(|store| store.tab(tab_id).cloned())
    }

    pub fn active_group_id(&self) -> Option<GroupId> {
        self.read(|store| store.active_group_id().cloned())
    }

    pub fn active_tab_id(&self) -> Option<TabId> {
        self.read(|store| store.active_tab_id().cloned())
    }

    pub fn active_tab(&self) -> Option<Tab> {
        self.read(|store| store.active_tab().cloned())
    }

    pub fn is_single_tab_open(&self) -> bool {
        self.read(|store| store.is_single_tab_open())
    }

    /// Open tabs of one kind, in pane then tab order
    pub fn open_tabs_of_type(&self, tab_type: TabType) -> Vec<Tab> {
        self.read(|store| store.tabs_of_type(tab_type).into_iter().cloned().collect())
    }

    pub fn snapshot(&self) -> PersistedLayout {
        self.read(PersistedLayout::capture)
    }

    pub fn validate(&self) -> quill_tabs::Result<()> {
        self.read(|store| store.validate())
    }

    // ---- internals ----

    fn read<R>(&self, f: impl FnOnce(&TabStore) -> R) -> R {
        let state = self.state.lock();
        f(state.store())
    }

    fn transact<R>(&self, f: impl FnOnce(&mut ManagerState, &mut Effects) -> R) -> R {
        let mut effects = Effects::default();
        let (result, snapshot) = {
            let mut state = self.state.lock();
            let result = f(&mut *state, &mut effects);
            let snapshot = if effects.changed {
                state.generation += 1;
                Some((state.generation, PersistedLayout::capture(state.store())))
            } else {
                None
            };
            (result, snapshot)
        };

        for tab in &effects.closed {
            self.resolver.cleanup_entity(tab);
        }
        if let Some(notifier) = &self.notifier {
            for event in effects.events {
                notifier.notify(event);
            }
        }
        if let Some((generation, layout)) = snapshot {
            self.writes.store(self.persistence.as_ref(), generation, &layout);
        }

        result
    }

    fn placeholder_tab(&self) -> Tab {
        self.new_tab(Uuid::new_v4().to_string(), TabType::New, TabData::new())
    }

    fn my_day_tab(&self) -> Tab {
        let today = Utc::now().date_naive().to_string();
        self.new_tab(today, TabType::MyDay, TabData::new())
    }
}

impl Clone for TabManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            config: Arc::clone(&self.config),
            resolver: Arc::clone(&self.resolver),
            persistence: Arc::clone(&self.persistence),
            writes: Arc::clone(&self.writes),
            notifier: self.notifier.clone(),
        }
    }
}

/// Command that puts focus back where it is now
fn focus_command(store: &TabStore) -> LayoutCommand {
    match (store.active_group_id(), store.active_tab_id()) {
        (Some(group_id), Some(tab_id)) => LayoutCommand::activate(tab_id.clone(), group_id.clone()),
        (Some(group_id), None) => LayoutCommand::FocusGroup {
            group_id: group_id.clone(),
        },
        _ => LayoutCommand::Batch(Vec::new()),
    }
}

fn baseline_entry(store: &TabStore) -> HistoryEntry<LayoutCommand> {
    HistoryEntry::forward_only("initialize", focus_command(store)).replay_on_undo()
}
