//! Collaborators owned by the host application
//!
//! The layout manager knows tabs only by entity id. The host supplies
//! default display state for new tabs, cleans up entities whose tab went
//! away, and may listen for layout events.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use quill_tabs::{EntityId, GroupId, Tab, TabData, TabId, TabType};

pub trait EntityResolver: Send + Sync {
    /// Baseline data for a new tab of `tab_type` showing `entity_id`
    fn create_default_data(&self, entity_id: &str, tab_type: TabType, extra: &TabData) -> TabData;

    /// Called after a tab is closed, outside any layout lock
    fn cleanup_entity(&self, _tab: &Tab) {}
}

/// Resolver that supplies no defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDefaults;

impl EntityResolver for EmptyDefaults {
    fn create_default_data(&self, _entity_id: &str, _tab_type: TabType, _extra: &TabData) -> TabData {
        TabData::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitSide {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LayoutEvent {
    Open {
        tab_id: TabId,
        entity_id: EntityId,
        tab_type: TabType,
        group_id: GroupId,
    },
    Close {
        tab_id: TabId,
        entity_id: EntityId,
        tab_type: TabType,
    },
    Split {
        tab_id: TabId,
        group_id: GroupId,
        side: SplitSide,
    },
    Move {
        tab_id: TabId,
        source_id: GroupId,
        destination_id: GroupId,
    },
}

impl LayoutEvent {
    pub fn close(tab: &Tab) -> Self {
        LayoutEvent::Close {
            tab_id: tab.id.clone(),
            entity_id: tab.entity_id.clone(),
            tab_type: tab.tab_type,
        }
    }
}

/// Receives layout events. Must not block.
pub trait Notification: Send + Sync {
    fn notify(&self, event: LayoutEvent);
}

/// Forwards events into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<LayoutEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LayoutEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notification for ChannelNotifier {
    fn notify(&self, event: LayoutEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Layout event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_notifier_delivers_in_order() {
        let (notifier, mut rx) = ChannelNotifier::new();
        let tab = Tab::with_id("t1", "doc-1", TabType::Document);

        notifier.notify(LayoutEvent::Open {
            tab_id: tab.id.clone(),
            entity_id: tab.entity_id.clone(),
            tab_type: tab.tab_type,
            group_id: "g1".to_string(),
        });
        notifier.notify(LayoutEvent::close(&tab));

        assert!(matches!(rx.recv().await, Some(LayoutEvent::Open { .. })));
        assert_eq!(rx.recv().await, Some(LayoutEvent::close(&tab)));
    }

    #[test]
    fn test_notify_after_receiver_dropped() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        notifier.notify(LayoutEvent::Split {
            tab_id: "t1".to_string(),
            group_id: "g2".to_string(),
            side: SplitSide::Right,
        });
    }

    #[test]
    fn test_empty_defaults() {
        let data = EmptyDefaults.create_default_data("e1", TabType::View, &TabData::new());
        assert!(data.is_empty());
    }
}
