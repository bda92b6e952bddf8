//! Change notifications for the graph store.
//!
//! Every mutation on [`GraphStore`](super::GraphStore) notifies registered
//! observers inline, before the mutating call returns. The store keeps no
//! history of its own; undo/redo, persistence and UI refresh all live in
//! whatever layer subscribes here.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::types::Position;

/// Events emitted by the graph store on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GraphEvent {
    /// A node was registered
    #[serde(rename_all = "camelCase")]
    NodeAdded { node_id: String },

    /// A node was removed (its connections are reported separately)
    #[serde(rename_all = "camelCase")]
    NodeRemoved { node_id: String },

    /// A node moved on the canvas
    #[serde(rename_all = "camelCase")]
    NodePositionChanged { node_id: String, position: Position },

    /// A node property changed
    #[serde(rename_all = "camelCase")]
    NodePropertyChanged { node_id: String, key: String },

    /// A connection was created
    #[serde(rename_all = "camelCase")]
    ConnectionAdded { connection_id: String },

    /// A single connection was removed
    #[serde(rename_all = "camelCase")]
    ConnectionRemoved { connection_id: String },

    /// One or more connections were removed in bulk (node removal, pin
    /// removal, or replacement during connect)
    #[serde(rename_all = "camelCase")]
    ConnectionsPruned { connection_ids: Vec<String> },

    /// The whole graph was replaced from a serialized payload
    GraphRestored,
}

/// Observer of graph store mutations.
///
/// Notifications are synchronous and arrive in mutation order; an observer
/// must not call back into the store from inside `notify`.
pub trait GraphObserver {
    fn notify(&self, event: &GraphEvent);
}

/// An observer that discards all events.
///
/// Useful as a placeholder when notifications are not needed.
pub struct NullObserver;

impl GraphObserver for NullObserver {
    fn notify(&self, _event: &GraphEvent) {}
}

/// An observer that collects events into a vector.
///
/// Used by tests to assert on notification sequences.
#[derive(Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<GraphEvent>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events seen so far.
    pub fn events(&self) -> Vec<GraphEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Drop every collected event.
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl GraphObserver for CollectingObserver {
    fn notify(&self, event: &GraphEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
