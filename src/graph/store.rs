//! The graph store: nodes, connections, and the invariants between them.
//!
//! All mutation goes through [`GraphStore`] methods so the connection
//! invariants hold at every moment:
//!
//! 1. Connections run from an output pin to an input pin.
//! 2. Pin kinds must match, or either side is `any`.
//! 3. No duplicate `(from node, from pin, to node, to pin)` tuples.
//! 4. No self-connections.
//! 5. A data input holds at most one incoming connection; connecting a
//!    new source silently replaces the old one.
//! 6. An exec output holds at most one outgoing connection (same
//!    replacement rule), while exec inputs accept any number of incoming
//!    connections.
//!
//! Invalid `connect` requests return `false` and never panic. The one
//! fallible operation is the node factory, which errors on an unknown
//! type id.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::events::{GraphEvent, GraphObserver};
use super::types::{Connection, GraphPayload, Node, PinKind, PinRef, Position};
use crate::error::Result;
use crate::registry::NodeRegistry;

const CONNECTION_ID_PREFIX: &str = "conn";

/// Container for one blueprint graph.
///
/// Nodes and connections keep their insertion order; that order is the
/// documented tie-break wherever the compiler has to pick "the first"
/// of several equally ranked items, so it must survive serialization
/// (and does: the payload stores plain arrays).
#[derive(Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    node_counters: HashMap<String, u64>,
    connection_counter: u64,
    observers: Vec<Arc<dyn GraphObserver>>,
}

impl fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphStore")
            .field("nodes", &self.nodes.len())
            .field("connections", &self.connections.len())
            .finish()
    }
}

impl GraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer; it is notified inline on every mutation.
    pub fn add_observer(&mut self, observer: Arc<dyn GraphObserver>) {
        self.observers.push(observer);
    }

    fn notify(&self, event: GraphEvent) {
        for observer in &self.observers {
            observer.notify(&event);
        }
    }

    // -----------------------------------------------------------------------
    // Node lifecycle
    // -----------------------------------------------------------------------

    /// Instantiate a node from its registered type definition.
    ///
    /// Clones the definition's pin templates, seeds the property bag from
    /// its defaults, runs the type's `on_create` initializer, and assigns
    /// a fresh `<type>_<counter>` id. This is the only graph operation
    /// that can fail: asking for an unregistered type id is a programmer
    /// or configuration error, not user-graph malformation.
    pub fn create_node(
        &mut self,
        registry: &NodeRegistry,
        type_id: &str,
        position: Position,
    ) -> Result<String> {
        let definition = registry
            .get(type_id)
            .ok_or_else(|| crate::error::GraphError::UnknownNodeType(type_id.to_string()))?;

        let id = self.allocate_node_id(type_id);
        let mut node = Node {
            id: id.clone(),
            node_type: definition.type_id.clone(),
            title: definition.title.clone(),
            position,
            inputs: definition.inputs.clone(),
            outputs: definition.outputs.clone(),
            properties: definition.default_properties.clone(),
        };
        if let Some(init) = definition.on_create {
            init(&mut node);
        }
        self.add_node(node);
        Ok(id)
    }

    /// Register an already-built node.
    ///
    /// The node's id is absorbed into the per-type counters so later
    /// factory calls cannot collide with it.
    pub fn add_node(&mut self, node: Node) {
        absorb_id(&mut self.node_counters, &node.id);
        let node_id = node.id.clone();
        self.nodes.push(node);
        self.notify(GraphEvent::NodeAdded { node_id });
    }

    /// Remove a node and every connection touching it.
    ///
    /// Emits `NodeRemoved`, then `ConnectionsPruned` for the cascade.
    /// No-op when the id is unknown.
    pub fn remove_node(&mut self, node_id: &str) {
        let Some(index) = self.nodes.iter().position(|n| n.id == node_id) else {
            return;
        };
        self.nodes.remove(index);

        let pruned: Vec<String> = self
            .connections
            .iter()
            .filter(|c| c.involves_node(node_id))
            .map(|c| c.id.clone())
            .collect();
        self.connections.retain(|c| !c.involves_node(node_id));

        self.notify(GraphEvent::NodeRemoved {
            node_id: node_id.to_string(),
        });
        if !pruned.is_empty() {
            self.notify(GraphEvent::ConnectionsPruned {
                connection_ids: pruned,
            });
        }
    }

    /// Move a node; no-op when the id is unknown.
    pub fn set_node_position(&mut self, node_id: &str, position: Position) {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == node_id) else {
            return;
        };
        node.position = position;
        self.notify(GraphEvent::NodePositionChanged {
            node_id: node_id.to_string(),
            position,
        });
    }

    /// Set one property on a node; no-op when the id is unknown.
    pub fn set_node_property(&mut self, node_id: &str, key: &str, value: serde_json::Value) {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == node_id) else {
            return;
        };
        node.properties.insert(key.to_string(), value);
        self.notify(GraphEvent::NodePropertyChanged {
            node_id: node_id.to_string(),
            key: key.to_string(),
        });
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    /// Connect an output pin to an input pin.
    ///
    /// Validates the invariants listed in the module docs, applies the
    /// single-occupancy replacement rules for data inputs and exec
    /// outputs, caches the effective kind, and reports success. Invalid
    /// requests simply return `false`.
    pub fn connect(&mut self, from: PinRef, to: PinRef) -> bool {
        if from.node_id == to.node_id {
            return false;
        }
        let Some(from_node) = self.node(&from.node_id) else {
            return false;
        };
        let Some(to_node) = self.node(&to.node_id) else {
            return false;
        };
        let Some(from_pin) = from_node.output(&from.pin_id) else {
            return false;
        };
        let Some(to_pin) = to_node.input(&to.pin_id) else {
            return false;
        };
        if !from_pin.kind.is_compatible_with(to_pin.kind) {
            return false;
        }
        if self
            .connections
            .iter()
            .any(|c| c.from == from && c.to == to)
        {
            return false;
        }

        let from_kind = from_pin.kind;
        let to_kind = to_pin.kind;

        // Replacement rules: a data input holds one incoming connection,
        // an exec output holds one outgoing connection.
        let mut displaced: Vec<String> = Vec::new();
        if to_kind.is_data() {
            displaced.extend(
                self.connections
                    .iter()
                    .filter(|c| c.to == to)
                    .map(|c| c.id.clone()),
            );
        }
        if from_kind.is_exec() {
            displaced.extend(
                self.connections
                    .iter()
                    .filter(|c| c.from == from)
                    .map(|c| c.id.clone()),
            );
        }
        if !displaced.is_empty() {
            self.connections.retain(|c| !displaced.contains(&c.id));
            self.notify(GraphEvent::ConnectionsPruned {
                connection_ids: displaced,
            });
        }

        let kind = if to_kind == PinKind::Any {
            from_kind
        } else {
            to_kind
        };
        let id = self.allocate_connection_id();
        self.connections.push(Connection {
            id: id.clone(),
            from,
            to,
            kind,
        });
        self.notify(GraphEvent::ConnectionAdded { connection_id: id });
        true
    }

    /// Remove one connection by id; no-op when unknown.
    pub fn remove_connection(&mut self, connection_id: &str) {
        let Some(index) = self
            .connections
            .iter()
            .position(|c| c.id == connection_id)
        else {
            return;
        };
        self.connections.remove(index);
        self.notify(GraphEvent::ConnectionRemoved {
            connection_id: connection_id.to_string(),
        });
    }

    /// Remove every connection touching a pin.
    ///
    /// Used when a pin disappears or its declared kind is forcibly
    /// changed; no-op when nothing matches.
    pub fn remove_connections_for_pin(&mut self, pin: &PinRef) {
        let pruned: Vec<String> = self
            .connections
            .iter()
            .filter(|c| c.involves_pin(pin))
            .map(|c| c.id.clone())
            .collect();
        if pruned.is_empty() {
            return;
        }
        self.connections.retain(|c| !c.involves_pin(pin));
        self.notify(GraphEvent::ConnectionsPruned {
            connection_ids: pruned,
        });
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All connections, in insertion order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Find a node by id.
    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    /// Find a connection by id.
    pub fn connection(&self, connection_id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == connection_id)
    }

    /// Connections touching a node, optionally narrowed to one pin.
    pub fn connections_for_node(&self, node_id: &str, pin_id: Option<&str>) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| match pin_id {
                Some(pin) => {
                    (c.from.node_id == node_id && c.from.pin_id == pin)
                        || (c.to.node_id == node_id && c.to.pin_id == pin)
                }
                None => c.involves_node(node_id),
            })
            .collect()
    }

    /// Connections leaving a specific output pin, in insertion order.
    pub fn connections_from<'a>(
        &'a self,
        node_id: &'a str,
        pin_id: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.from.node_id == node_id && c.from.pin_id == pin_id)
    }

    /// The first connection feeding a specific input pin.
    ///
    /// `connect` keeps data inputs at single occupancy, but payloads
    /// loaded through `replace_state` are preserved verbatim and may
    /// carry more; the first in insertion order wins.
    pub fn connection_into(&self, node_id: &str, pin_id: &str) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.to.node_id == node_id && c.to.pin_id == pin_id)
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Snapshot the graph as a serializable payload.
    pub fn to_payload(&self) -> GraphPayload {
        GraphPayload {
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
        }
    }

    /// Serialize the graph to a JSON value.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.to_payload())?)
    }

    /// Build a store from a JSON value produced by [`Self::to_json`].
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let payload: GraphPayload = serde_json::from_value(value)?;
        let mut store = Self::new();
        store.replace_state(payload);
        Ok(store)
    }

    /// Replace the whole graph with a loaded payload.
    ///
    /// Nodes and connections are adopted verbatim (no re-validation), the
    /// per-type id counters are rebuilt from the highest numeric suffix
    /// seen so later factory calls cannot collide, and a single
    /// `GraphRestored` notification stands in for the per-entity ones.
    pub fn replace_state(&mut self, payload: GraphPayload) {
        self.nodes = payload.nodes;
        self.connections = payload.connections;

        self.node_counters.clear();
        for node in &self.nodes {
            absorb_id(&mut self.node_counters, &node.id);
        }
        self.connection_counter = 0;
        for connection in &self.connections {
            if let Some(n) = parse_counter(&connection.id, CONNECTION_ID_PREFIX) {
                self.connection_counter = self.connection_counter.max(n);
            }
        }

        self.notify(GraphEvent::GraphRestored);
    }

    // -----------------------------------------------------------------------
    // Id allocation
    // -----------------------------------------------------------------------

    fn allocate_node_id(&mut self, type_id: &str) -> String {
        let counter = self.node_counters.entry(type_id.to_string()).or_insert(0);
        *counter += 1;
        format!("{}_{:04}", type_id, counter)
    }

    fn allocate_connection_id(&mut self) -> String {
        self.connection_counter += 1;
        format!("{}_{:04}", CONNECTION_ID_PREFIX, self.connection_counter)
    }
}

/// Fold an id of the form `<prefix>_<counter>` into the counter table.
fn absorb_id(counters: &mut HashMap<String, u64>, id: &str) {
    if let Some((prefix, suffix)) = id.rsplit_once('_') {
        if let Ok(n) = suffix.parse::<u64>() {
            let entry = counters.entry(prefix.to_string()).or_insert(0);
            *entry = (*entry).max(n);
        }
    }
}

/// Parse the numeric suffix of `<prefix>_<counter>` ids.
fn parse_counter(id: &str, prefix: &str) -> Option<u64> {
    let (head, suffix) = id.rsplit_once('_')?;
    if head != prefix {
        return None;
    }
    suffix.parse().ok()
}
