//! # Blueprint Compiler
//!
//! Main entry points for compiling blueprint graphs to Lua carts.
//!
//! Compilation is best-effort by design: a half-wired graph still
//! produces a syntactically valid cart, with inline comments standing in
//! for whatever could not be resolved. The only fallible operation in
//! the whole pipeline is node creation against an unknown type id, which
//! happens long before compilation.

use tracing::info;

use crate::codegen::{LuaCodeGenerator, ProjectSettings, VariableDef};
use crate::graph::store::GraphStore;
use crate::registry::NodeRegistry;

/// Compile a blueprint graph to Lua source with default settings.
///
/// This is the main entry point. It takes a graph snapshot and the node
/// registry and produces the complete cart text, deterministically:
/// identical inputs yield byte-identical output.
///
/// # Arguments
///
/// * `graph` - The blueprint graph to compile
/// * `registry` - Node type definitions and behaviors
///
/// # Examples
///
/// ```
/// use cartograph::{compile_graph, standard_registry, GraphStore};
///
/// let graph = GraphStore::new();
/// let registry = standard_registry();
/// let cart = compile_graph(&graph, &registry);
/// assert!(cart.starts_with("--"));
/// ```
pub fn compile_graph(graph: &GraphStore, registry: &NodeRegistry) -> String {
    compile_graph_with_variables(graph, registry, &[], &ProjectSettings::default())
}

/// Compile a blueprint graph with project variables and settings.
///
/// Variables become global declarations at the top of the cart; settings
/// currently carry the 60fps flag that remaps update entries to the
/// host's fast event.
pub fn compile_graph_with_variables(
    graph: &GraphStore,
    registry: &NodeRegistry,
    variables: &[VariableDef],
    settings: &ProjectSettings,
) -> String {
    info!("[CARTO] starting cart compilation");
    info!(
        "[CARTO] graph: {} nodes, {} connections",
        graph.nodes().len(),
        graph.connections().len()
    );
    info!(
        "[CARTO] registry: {} node types, {} variables",
        registry.len(),
        variables.len()
    );

    let code = LuaCodeGenerator::new(graph, registry, variables, settings).generate();

    info!("[CARTO] compilation complete ({} bytes)", code.len());
    code
}

/// Long-lived compiler holding the registry, variable metadata, and
/// project settings.
///
/// All per-compilation state lives in the generator built for each
/// call, so one instance can be reused across any number of compiles
/// (or shared behind a reference) without calls contaminating each
/// other.
#[derive(Debug)]
pub struct BlueprintCompiler {
    registry: NodeRegistry,
    variables: Vec<VariableDef>,
    settings: ProjectSettings,
}

impl BlueprintCompiler {
    pub fn new(registry: NodeRegistry) -> Self {
        Self {
            registry,
            variables: Vec::new(),
            settings: ProjectSettings::default(),
        }
    }

    /// A compiler preloaded with the standard node library.
    pub fn with_standard_nodes() -> Self {
        Self::new(crate::nodes::standard_registry())
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        &mut self.registry
    }

    /// Replace the project variable list used for declarations.
    pub fn set_variables(&mut self, variables: Vec<VariableDef>) {
        self.variables = variables;
    }

    pub fn set_settings(&mut self, settings: ProjectSettings) {
        self.settings = settings;
    }

    /// Compile one graph snapshot to cart text.
    pub fn compile(&self, graph: &GraphStore) -> String {
        compile_graph_with_variables(graph, &self.registry, &self.variables, &self.settings)
    }
}
