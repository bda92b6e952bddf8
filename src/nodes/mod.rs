//! The standard node library.
//!
//! Every node type the editor ships with, grouped the way the palette
//! groups them: events, control flow, callable functions, and pure
//! value nodes. Each module registers its definitions and behaviors
//! into a [`NodeRegistry`]; [`standard_registry`] assembles the full
//! set.
//!
//! Nothing in the compiler core depends on this module. A host can
//! start from an empty registry, merge this one, and layer its own
//! types on top.

pub mod control_flow_nodes;
pub mod event_nodes;
pub mod function_nodes;
pub mod pure_nodes;

use crate::registry::NodeRegistry;

/// A registry preloaded with the full standard library.
pub fn standard_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    register_standard_nodes(&mut registry);
    registry
}

/// Register the standard library into an existing registry.
pub fn register_standard_nodes(registry: &mut NodeRegistry) {
    event_nodes::register(registry);
    control_flow_nodes::register(registry);
    function_nodes::register(registry);
    pure_nodes::register(registry);
}

/// Coerce a `json!({..})` literal into a property map.
pub(crate) fn properties(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_covers_the_palette() {
        let registry = standard_registry();
        for type_id in [
            "event_init",
            "event_update",
            "event_draw",
            "event_custom",
            "call_custom_event",
            "branch",
            "for_loop",
            "sequence",
            "print",
            "cls",
            "set_variable",
            "number_literal",
            "string_literal",
            "boolean_literal",
            "get_variable",
            "arithmetic",
            "comparison",
            "button",
        ] {
            assert!(registry.has_type(type_id), "missing {}", type_id);
            assert!(registry.behavior(type_id).is_some(), "no behavior for {}", type_id);
        }
        assert_eq!(registry.len(), 18);
    }

    #[test]
    fn entry_types_are_the_event_nodes() {
        let registry = standard_registry();
        assert_eq!(
            registry.entry_node_types(),
            vec!["event_custom", "event_draw", "event_init", "event_update"]
        );
    }
}
