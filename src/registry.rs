//! Node type registry and the pluggable code-generation contract.
//!
//! Every node type the editor can place is described by a
//! [`NodeTypeDefinition`] (pins, defaults, entry-point role) plus an
//! optional [`NodeBehavior`] that knows how to lower instances of that
//! type to Lua. The compiler consumes the registry read-only; the graph
//! store consumes it only through the node factory.
//!
//! Both behavior hooks are optional and default to "defer": a type with
//! no behavior (or a hook returning `None`) falls back to the compiler's
//! generic handling, so unregistered or data-only types never break
//! generation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::codegen::{ExecContext, ValueContext};
use crate::graph::types::{Node, Pin};

/// Host lifecycle events, in the order their functions are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LifecycleEvent {
    Init,
    Update,
    /// The 60fps variant of [`LifecycleEvent::Update`]. Never registered
    /// directly; `Update` entries resolve to it when the project's 60fps
    /// flag is set.
    UpdateFast,
    Draw,
}

impl LifecycleEvent {
    /// The function name the host calls for this event.
    pub fn function_name(self) -> &'static str {
        match self {
            LifecycleEvent::Init => "_init",
            LifecycleEvent::Update => "_update",
            LifecycleEvent::UpdateFast => "_update60",
            LifecycleEvent::Draw => "_draw",
        }
    }
}

/// How an entry-capable node type starts a generated function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// A fixed host event such as `_init`.
    Lifecycle(LifecycleEvent),
    /// A user-named event; name and parameters live in node properties.
    Custom,
}

/// Palette grouping for the editor; the compiler ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCategory {
    Event,
    ControlFlow,
    Function,
    Pure,
}

/// Static description of one node type.
#[derive(Debug, Clone)]
pub struct NodeTypeDefinition {
    pub type_id: String,
    pub title: String,
    pub category: NodeCategory,
    /// Pin templates cloned into every new instance.
    pub inputs: Vec<Pin>,
    pub outputs: Vec<Pin>,
    /// Seed for the instance property bag.
    pub default_properties: serde_json::Map<String, serde_json::Value>,
    /// `Some` when instances of this type begin a generated function.
    pub entry_point: Option<EntryPoint>,
    /// Extra per-instance setup run after the factory clones the
    /// templates (e.g. stamping a parameter pin for a fresh custom event).
    pub on_create: Option<fn(&mut Node)>,
}

/// Per-type code generation strategy.
///
/// Both hooks are optional; the defaults defer to the compiler's
/// fallback (a marker comment for exec, the pin default or `nil` for
/// values). Implementations append statements through the context
/// rather than touching generator state directly.
pub trait NodeBehavior: Send + Sync {
    /// Produce the executable statement lines for this node, usually
    /// ending by continuing the chain through an exec-out pin.
    fn emit_exec(&self, ctx: &mut ExecContext<'_, '_>) -> Option<Vec<String>> {
        let _ = ctx;
        None
    }

    /// Produce the inline expression for one named output pin.
    fn evaluate_value(&self, ctx: &mut ValueContext<'_, '_>) -> Option<String> {
        let _ = ctx;
        None
    }
}

struct RegistryEntry {
    definition: NodeTypeDefinition,
    behavior: Option<Arc<dyn NodeBehavior>>,
}

/// Lookup table from node type id to definition and behavior.
#[derive(Default)]
pub struct NodeRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("types", &self.entries.len())
            .finish()
    }
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type with its code-generation behavior. Re-registering
    /// a type id replaces the previous entry.
    pub fn register(&mut self, definition: NodeTypeDefinition, behavior: Arc<dyn NodeBehavior>) {
        self.entries.insert(
            definition.type_id.clone(),
            RegistryEntry {
                definition,
                behavior: Some(behavior),
            },
        );
    }

    /// Register a type without a behavior; the compiler falls back to
    /// its generic handling for instances.
    pub fn register_definition(&mut self, definition: NodeTypeDefinition) {
        self.entries.insert(
            definition.type_id.clone(),
            RegistryEntry {
                definition,
                behavior: None,
            },
        );
    }

    pub fn get(&self, type_id: &str) -> Option<&NodeTypeDefinition> {
        self.entries.get(type_id).map(|e| &e.definition)
    }

    pub fn behavior(&self, type_id: &str) -> Option<&dyn NodeBehavior> {
        self.entries
            .get(type_id)
            .and_then(|e| e.behavior.as_deref())
    }

    pub fn has_type(&self, type_id: &str) -> bool {
        self.entries.contains_key(type_id)
    }

    /// All registered type ids, sorted for stable iteration.
    pub fn node_types(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// The entry-point role of a type, if it has one.
    pub fn entry_point(&self, type_id: &str) -> Option<EntryPoint> {
        self.get(type_id).and_then(|d| d.entry_point)
    }

    /// Type ids that begin generated functions, sorted.
    pub fn entry_node_types(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .entries
            .values()
            .filter(|e| e.definition.entry_point.is_some())
            .map(|e| e.definition.type_id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Distinct lifecycle events covered by registered entry types, in
    /// emission order.
    pub fn entry_events(&self) -> Vec<LifecycleEvent> {
        let mut events: Vec<LifecycleEvent> = self
            .entries
            .values()
            .filter_map(|e| match e.definition.entry_point {
                Some(EntryPoint::Lifecycle(event)) => Some(event),
                _ => None,
            })
            .collect();
        events.sort_unstable();
        events.dedup();
        events
    }

    /// Absorb another registry; its entries win on type-id clashes.
    pub fn merge(&mut self, other: NodeRegistry) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
