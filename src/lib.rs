//! # Cartograph
//!
//! Compiler core for transforming blueprint visual node graphs into Lua
//! carts for a PICO-8 style host.
//!
//! Cartograph pairs an editable graph store with a deterministic code
//! generator, providing:
//! - Typed graph storage with validated connections and change notifications
//! - Deterministic Lua generation (identical graphs yield identical carts)
//! - Best-effort output where unresolved inputs become comments, never errors
//! - Pluggable node behaviors through a central registry
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cartograph::{compile_graph, standard_registry, GraphStore, PinRef, Position};
//!
//! let registry = standard_registry();
//! let mut graph = GraphStore::new();
//!
//! let event = graph.create_node(&registry, "event_init", Position::default())?;
//! let print = graph.create_node(&registry, "print", Position::default())?;
//! graph.set_node_property(&print, "msg", serde_json::json!("hello"));
//! graph.connect(PinRef::new(&event, "exec_out"), PinRef::new(&print, "exec_in"));
//!
//! let cart = compile_graph(&graph, &registry);
//! std::fs::write("cart.lua", cart)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! Compilation runs as a fixed pipeline over one graph snapshot:
//!
//! 1. **Entry Discovery** - Find event nodes and map them to host callbacks
//! 2. **Signature Allocation** - Name custom events and their parameters
//! 3. **Variable Declarations** - Emit project globals with collision-safe identifiers
//! 4. **Execution Walk** - Follow exec connections from each entry, guarding cycles
//! 5. **Value Evaluation** - Resolve data inputs through memoized expressions

pub mod codegen;
pub mod compiler;
pub mod error;
pub mod graph;
pub mod nodes;
pub mod registry;

// Re-export the main compilation API
pub use compiler::{compile_graph, compile_graph_with_variables, BlueprintCompiler};

// Re-export graph types for convenience
pub use graph::events::{CollectingObserver, GraphEvent, GraphObserver, NullObserver};
pub use graph::store::GraphStore;
pub use graph::types::{Connection, GraphPayload, Node, Pin, PinKind, PinRef, Position};

// Re-export registry and codegen surfaces
pub use codegen::{ProjectSettings, VariableDef};
pub use error::{GraphError, Result};
pub use nodes::{register_standard_nodes, standard_registry};
pub use registry::{
    EntryPoint, LifecycleEvent, NodeBehavior, NodeCategory, NodeRegistry, NodeTypeDefinition,
};
