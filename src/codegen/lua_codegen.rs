//! Lua code generation from a blueprint graph snapshot.
//!
//! [`LuaCodeGenerator`] is a per-call value: build one, call
//! [`LuaCodeGenerator::generate`], throw it away. All memoization and
//! cycle-guard state lives inside it, so interleaved compiles can never
//! see each other's caches.
//!
//! Generation is a single synchronous pass:
//!
//! 1. discover entry nodes (lifecycle events and custom events),
//! 2. emit global variable declarations,
//! 3. build the custom-event symbol table (function names, parameters),
//! 4. emit one Lua function per entry by walking its exec chain.
//!
//! Exec chains are guarded by [`ExecPath`], a copy-on-branch set of the
//! node ids active on the current branch. Sibling branches each receive
//! their own copy, so a node legitimately reachable from both sides of
//! an `if` is emitted twice, while a branch revisiting its own ancestor
//! is cut off with a comment. Value expressions are memoized per
//! `(node, pin)` and guarded by a separate in-flight set that breaks
//! data cycles by resolving to `nil`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::format;
use crate::graph::store::GraphStore;
use crate::graph::types::{Node, PinKind};
use crate::registry::{EntryPoint, LifecycleEvent, NodeRegistry};

/// First line of every compiled cart.
pub const BANNER: &str = "-- generated by cartograph; edits will be overwritten";

/// Second (and last) line of a cart compiled from an entry-less graph.
pub const EMPTY_PLACEHOLDER: &str = "-- empty blueprint: no event nodes";

/// A project-level global variable to declare at the top of the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: PinKind,
    #[serde(default)]
    pub default_value: Value,
}

/// Project-wide knobs that influence generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectSettings {
    /// Remap update entries to the host's 60fps event.
    pub fps60: bool,
}

/// Node ids active on the current exec branch.
///
/// Extended by copy as the walk descends, never mutated in place, so
/// handing the same parent path to several branches keeps them isolated
/// from each other while each still sees its own ancestors.
#[derive(Debug, Clone, Default)]
pub struct ExecPath(HashSet<String>);

impl ExecPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.0.contains(node_id)
    }

    /// A copy of this path with one more node id in it.
    pub fn with(&self, node_id: &str) -> Self {
        let mut next = self.clone();
        next.0.insert(node_id.to_string());
        next
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One parameter of a custom event, as resolved into the symbol table.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEventParam {
    /// Stable id; pairs the `param_<id>` output on the defining node
    /// with the `arg_<id>` input on every caller.
    pub id: String,
    pub name: String,
    /// Deduplicated local identifier used in the function signature.
    pub identifier: String,
    pub kind: PinKind,
    pub optional: bool,
}

/// Symbol-table entry for one custom event definition.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEventSig {
    pub node_id: String,
    pub display_name: String,
    pub function_name: String,
    pub params: Vec<CustomEventParam>,
}

struct EntrySet {
    /// First instance per resolved lifecycle event, in emission order.
    lifecycle: Vec<(LifecycleEvent, String)>,
    /// Custom event definition nodes, in graph order.
    custom: Vec<String>,
}

/// Single-use generator lowering one graph snapshot to Lua text.
pub struct LuaCodeGenerator<'g> {
    graph: &'g GraphStore,
    registry: &'g NodeRegistry,
    variables: &'g [VariableDef],
    settings: &'g ProjectSettings,
    variable_identifiers: HashMap<String, String>,
    event_signatures: HashMap<String, CustomEventSig>,
    custom_order: Vec<String>,
    value_cache: HashMap<(String, String), String>,
    value_in_flight: HashSet<(String, String)>,
}

impl<'g> LuaCodeGenerator<'g> {
    pub fn new(
        graph: &'g GraphStore,
        registry: &'g NodeRegistry,
        variables: &'g [VariableDef],
        settings: &'g ProjectSettings,
    ) -> Self {
        Self {
            graph,
            registry,
            variables,
            settings,
            variable_identifiers: HashMap::new(),
            event_signatures: HashMap::new(),
            custom_order: Vec::new(),
            value_cache: HashMap::new(),
            value_in_flight: HashSet::new(),
        }
    }

    /// Lower the graph to a complete cart.
    ///
    /// Consumes the generator; identical inputs produce byte-identical
    /// output.
    pub fn generate(mut self) -> String {
        let entries = self.discover_entries();
        debug!(
            lifecycle = entries.lifecycle.len(),
            custom = entries.custom.len(),
            "discovered entry nodes"
        );
        if entries.lifecycle.is_empty() && entries.custom.is_empty() {
            return format!("{}\n{}\n", BANNER, EMPTY_PLACEHOLDER);
        }

        let mut sections = vec![BANNER.to_string()];

        let declarations = self.emit_variable_declarations();
        if !declarations.is_empty() {
            sections.push(declarations.join("\n"));
        }

        self.build_event_signatures(&entries.custom);

        for (event, node_id) in &entries.lifecycle {
            sections.push(self.emit_lifecycle_function(*event, node_id));
        }
        let custom_order = self.custom_order.clone();
        for node_id in &custom_order {
            if let Some(rendered) = self.emit_custom_function(node_id) {
                sections.push(rendered);
            }
        }

        let mut out = sections.join("\n\n");
        out.push('\n');
        out
    }

    // -----------------------------------------------------------------------
    // Entry discovery and symbol tables
    // -----------------------------------------------------------------------

    /// Split entry-capable node instances into lifecycle and custom sets.
    ///
    /// Lifecycle entries resolve their event first (`update` becomes the
    /// 60fps event when the project flag is set); only the first instance
    /// per resolved event counts, later duplicates are ignored.
    fn discover_entries(&self) -> EntrySet {
        let mut lifecycle: Vec<(LifecycleEvent, String)> = Vec::new();
        let mut seen: HashSet<LifecycleEvent> = HashSet::new();
        let mut custom: Vec<String> = Vec::new();

        for node in self.graph.nodes() {
            match self.registry.entry_point(&node.node_type) {
                Some(EntryPoint::Lifecycle(event)) => {
                    let resolved = if event == LifecycleEvent::Update && self.settings.fps60 {
                        LifecycleEvent::UpdateFast
                    } else {
                        event
                    };
                    if seen.insert(resolved) {
                        lifecycle.push((resolved, node.id.clone()));
                    }
                }
                Some(EntryPoint::Custom) => custom.push(node.id.clone()),
                None => {}
            }
        }

        lifecycle.sort_by_key(|(event, _)| *event);
        EntrySet { lifecycle, custom }
    }

    /// Declare one global per variable, in caller order.
    ///
    /// Display names are sanitized and deduplicated across the whole
    /// list; the resulting `variableId -> identifier` map serves every
    /// later variable read and write.
    fn emit_variable_declarations(&mut self) -> Vec<String> {
        let mut used: HashSet<String> = HashSet::new();
        let mut lines = Vec::new();
        for variable in self.variables {
            let identifier =
                format::allocate_unique(&format::sanitize_identifier(&variable.name), &mut used);
            self.variable_identifiers
                .insert(variable.id.clone(), identifier.clone());
            let kind = declared_kind(variable.kind);
            lines.push(format!(
                "{} = {}",
                identifier,
                format::format_variable_default(&variable.default_value, kind)
            ));
        }
        lines
    }

    /// Build the custom-event symbol table.
    ///
    /// Definitions are ordered by (display name, node id) so that name
    /// allocation is stable: two events both displayed "Jump" become
    /// `event_jump` and `event_jump_2` with the lower node id first.
    fn build_event_signatures(&mut self, custom_ids: &[String]) {
        let graph = self.graph;
        let mut ordered: Vec<(String, String)> = custom_ids
            .iter()
            .filter_map(|id| {
                let node = graph.node(id)?;
                let display = node.string_property("name").unwrap_or("event").to_string();
                Some((display, id.clone()))
            })
            .collect();
        ordered.sort();

        let mut used: HashSet<String> = HashSet::new();
        for (display_name, node_id) in ordered {
            let Some(node) = graph.node(&node_id) else {
                continue;
            };
            let base = format!("event_{}", format::sanitize_identifier(&display_name));
            let function_name = format::allocate_unique(&base, &mut used);
            let params = parse_event_params(node);
            self.custom_order.push(node_id.clone());
            self.event_signatures.insert(
                node_id.clone(),
                CustomEventSig {
                    node_id,
                    display_name,
                    function_name,
                    params,
                },
            );
        }
    }

    // -----------------------------------------------------------------------
    // Function emission
    // -----------------------------------------------------------------------

    fn emit_lifecycle_function(&mut self, event: LifecycleEvent, node_id: &str) -> String {
        let body = self.emit_exec_chain(node_id, 1, &ExecPath::new());
        render_function(event.function_name(), "", &body)
    }

    fn emit_custom_function(&mut self, node_id: &str) -> Option<String> {
        let sig = self.event_signatures.get(node_id)?.clone();
        let params: Vec<&str> = sig.params.iter().map(|p| p.identifier.as_str()).collect();
        let body = self.emit_exec_chain(node_id, 1, &ExecPath::new());
        Some(render_function(&sig.function_name, &params.join(", "), &body))
    }

    // -----------------------------------------------------------------------
    // Exec-chain walking
    // -----------------------------------------------------------------------

    /// Emit the statement lines for one node and everything downstream.
    ///
    /// `path` holds the node ids already active on this branch; a revisit
    /// emits a single cycle comment instead of recursing. A node with no
    /// registered behavior (or whose behavior defers) gets the generic
    /// fallback: a marker comment, then the chain continues through its
    /// first exec output.
    fn emit_exec_chain(&mut self, node_id: &str, indent_level: usize, path: &ExecPath) -> Vec<String> {
        if path.contains(node_id) {
            return vec![format!(
                "{}-- cycle detected: {}",
                format::indent(indent_level),
                node_id
            )];
        }
        let graph = self.graph;
        let Some(node) = graph.node(node_id) else {
            return vec![format!(
                "{}-- missing node: {}",
                format::indent(indent_level),
                node_id
            )];
        };

        let next = path.with(node_id);
        let registry = self.registry;
        if let Some(behavior) = registry.behavior(&node.node_type) {
            let mut ctx = ExecContext {
                gen: self,
                node,
                indent: indent_level,
                path: next.clone(),
            };
            if let Some(lines) = behavior.emit_exec(&mut ctx) {
                return lines;
            }
        }
        self.fallback_exec(node, indent_level, &next)
    }

    fn fallback_exec(&mut self, node: &'g Node, indent_level: usize, path: &ExecPath) -> Vec<String> {
        let mut lines = vec![format!(
            "{}-- no handler for node type '{}'",
            format::indent(indent_level),
            node.node_type
        )];
        if let Some(pin) = node.first_exec_output() {
            lines.extend(self.emit_targets(&node.id, &pin.id, indent_level, path));
        }
        lines
    }

    /// Walk every chain hanging off one exec output pin, in connection
    /// insertion order. Each target sees the same parent path.
    fn emit_targets(
        &mut self,
        node_id: &str,
        pin_id: &str,
        indent_level: usize,
        path: &ExecPath,
    ) -> Vec<String> {
        let graph = self.graph;
        let targets: Vec<&str> = graph
            .connections_from(node_id, pin_id)
            .map(|c| c.to.node_id.as_str())
            .collect();
        let mut lines = Vec::new();
        for target in targets {
            lines.extend(self.emit_exec_chain(target, indent_level, path));
        }
        lines
    }

    // -----------------------------------------------------------------------
    // Value evaluation
    // -----------------------------------------------------------------------

    /// Evaluate the inline expression for one output pin.
    ///
    /// Memoized per `(node, pin)` for this generation pass. A pin asked
    /// for again while its own evaluation is still on the stack is a
    /// data cycle and resolves to `nil`.
    fn evaluate_value(&mut self, node_id: &str, pin_id: &str) -> String {
        let key = (node_id.to_string(), pin_id.to_string());
        if let Some(cached) = self.value_cache.get(&key) {
            return cached.clone();
        }
        if self.value_in_flight.contains(&key) {
            return "nil".to_string();
        }
        self.value_in_flight.insert(key.clone());
        let expr = self.evaluate_value_inner(node_id, pin_id);
        self.value_in_flight.remove(&key);
        self.value_cache.insert(key, expr.clone());
        expr
    }

    fn evaluate_value_inner(&mut self, node_id: &str, pin_id: &str) -> String {
        let graph = self.graph;
        let Some(node) = graph.node(node_id) else {
            return "nil".to_string();
        };
        let registry = self.registry;
        if let Some(behavior) = registry.behavior(&node.node_type) {
            let mut ctx = ValueContext {
                gen: self,
                node,
                pin_id: pin_id.to_string(),
            };
            if let Some(expr) = behavior.evaluate_value(&mut ctx) {
                return expr;
            }
        }
        if let Some(pin) = node.output(pin_id) {
            if let Some(default) = &pin.default_value {
                return format::format_literal(default, pin.kind);
            }
        }
        "nil".to_string()
    }

    /// Resolve the expression feeding one input pin.
    ///
    /// Resolution order: connected source pin, then a non-null literal
    /// override stored in the node's properties under the pin id, then
    /// the pin's declared default, then the caller's fallback verbatim.
    fn resolve_value_input(&mut self, node: &Node, pin_id: &str, fallback: &str) -> String {
        let graph = self.graph;
        if let Some(connection) = graph.connection_into(&node.id, pin_id) {
            let from_node = connection.from.node_id.clone();
            let from_pin = connection.from.pin_id.clone();
            return self.evaluate_value(&from_node, &from_pin);
        }
        if let Some(value) = node.property(pin_id) {
            if !value.is_null() {
                let kind = node.input(pin_id).map(|p| p.kind).unwrap_or(PinKind::Any);
                return format::format_literal(value, kind);
            }
        }
        if let Some(pin) = node.input(pin_id) {
            if let Some(default) = &pin.default_value {
                return format::format_literal(default, pin.kind);
            }
        }
        fallback.to_string()
    }
}

fn render_function(name: &str, params: &str, body: &[String]) -> String {
    let mut out = format!("function {}({})", name, params);
    for line in body {
        out.push('\n');
        out.push_str(line);
    }
    out.push_str("\nend");
    out
}

fn declared_kind(kind: PinKind) -> PinKind {
    if kind == PinKind::Exec {
        PinKind::Any
    } else {
        kind
    }
}

fn parse_kind(raw: &str) -> PinKind {
    match raw {
        "exec" => PinKind::Exec,
        "number" => PinKind::Number,
        "boolean" => PinKind::Boolean,
        "string" => PinKind::String,
        "table" => PinKind::Table,
        _ => PinKind::Any,
    }
}

/// Read the ordered parameter list out of a definition node's `params`
/// property. Identifiers are deduplicated within the event; `exec` is
/// not a value kind and widens to `any`.
fn parse_event_params(node: &Node) -> Vec<CustomEventParam> {
    let Some(Value::Array(entries)) = node.property("params") else {
        return Vec::new();
    };
    let mut used: HashSet<String> = HashSet::new();
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let obj = entry.as_object()?;
            let id = obj
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| (index + 1).to_string());
            let name = obj.get("name").and_then(Value::as_str).unwrap_or(&id).to_string();
            let kind = obj
                .get("kind")
                .and_then(Value::as_str)
                .map(parse_kind)
                .unwrap_or(PinKind::Any);
            let kind = declared_kind(kind);
            let optional = obj.get("optional").and_then(Value::as_bool).unwrap_or(false);
            let identifier =
                format::allocate_unique(&format::sanitize_identifier(&name), &mut used);
            Some(CustomEventParam {
                id,
                name,
                identifier,
                kind,
                optional,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Behavior contexts
// ---------------------------------------------------------------------------

/// Everything an exec behavior may touch while emitting statements.
///
/// Wraps the generator with the node under emission, the current indent
/// level, and the active cycle-guard path. Continuation helpers hand the
/// path down by value, so behaviors cannot accidentally leak a branch's
/// visits into its siblings.
pub struct ExecContext<'c, 'g> {
    gen: &'c mut LuaCodeGenerator<'g>,
    node: &'g Node,
    indent: usize,
    path: ExecPath,
}

impl<'c, 'g> ExecContext<'c, 'g> {
    /// The node being emitted.
    pub fn node(&self) -> &'g Node {
        self.node
    }

    pub fn indent_level(&self) -> usize {
        self.indent
    }

    /// Indentation for the current level.
    pub fn indent(&self) -> String {
        format::indent(self.indent)
    }

    pub fn indent_at(&self, level: usize) -> String {
        format::indent(level)
    }

    /// The cycle-guard path for this branch, current node included.
    pub fn path(&self) -> &ExecPath {
        &self.path
    }

    /// Resolve the expression feeding one of this node's input pins.
    pub fn resolve_value_input(&mut self, pin_id: &str, fallback: &str) -> String {
        self.gen.resolve_value_input(self.node, pin_id, fallback)
    }

    /// Continue the chain through an exec output at the current indent.
    pub fn emit_next_exec(&mut self, pin_id: &str) -> Vec<String> {
        self.gen
            .emit_targets(&self.node.id, pin_id, self.indent, &self.path)
    }

    /// Continue the chain through an exec output at an explicit indent.
    pub fn emit_next_exec_at(&mut self, pin_id: &str, indent_level: usize) -> Vec<String> {
        self.gen
            .emit_targets(&self.node.id, pin_id, indent_level, &self.path)
    }

    /// Emit a sub-block hanging off an exec output, one level deeper.
    pub fn emit_branch(&mut self, pin_id: &str) -> Vec<String> {
        self.gen
            .emit_targets(&self.node.id, pin_id, self.indent + 1, &self.path)
    }

    /// Recurse directly into another node's chain with this branch's path.
    pub fn emit_exec_chain(&mut self, node_id: &str, indent_level: usize) -> Vec<String> {
        self.gen.emit_exec_chain(node_id, indent_level, &self.path)
    }

    /// Node ids connected to an exec output, in insertion order.
    pub fn exec_targets(&self, pin_id: &str) -> Vec<String> {
        self.gen
            .graph
            .connections_from(&self.node.id, pin_id)
            .map(|c| c.to.node_id.clone())
            .collect()
    }

    pub fn has_targets(&self, pin_id: &str) -> bool {
        self.gen
            .graph
            .connections_from(&self.node.id, pin_id)
            .next()
            .is_some()
    }

    /// The generated identifier for a project variable, if declared.
    pub fn variable_identifier(&self, variable_id: &str) -> Option<String> {
        self.gen.variable_identifiers.get(variable_id).cloned()
    }

    /// The symbol-table entry for a custom event definition node.
    pub fn event_signature(&self, node_id: &str) -> Option<CustomEventSig> {
        self.gen.event_signatures.get(node_id).cloned()
    }

    pub fn sanitize_identifier(&self, raw: &str) -> String {
        format::sanitize_identifier(raw)
    }

    pub fn sanitize_operator(&self, raw: &str) -> &'static str {
        format::sanitize_operator(raw)
    }

    pub fn format_literal(&self, value: &Value, kind: PinKind) -> String {
        format::format_literal(value, kind)
    }
}

/// Everything a value behavior may touch while building an expression.
pub struct ValueContext<'c, 'g> {
    gen: &'c mut LuaCodeGenerator<'g>,
    node: &'g Node,
    pin_id: String,
}

impl<'c, 'g> ValueContext<'c, 'g> {
    /// The node owning the output pin under evaluation.
    pub fn node(&self) -> &'g Node {
        self.node
    }

    /// The output pin id being evaluated.
    pub fn pin_id(&self) -> &str {
        &self.pin_id
    }

    /// Resolve the expression feeding one of this node's input pins.
    pub fn resolve_value_input(&mut self, pin_id: &str, fallback: &str) -> String {
        self.gen.resolve_value_input(self.node, pin_id, fallback)
    }

    pub fn variable_identifier(&self, variable_id: &str) -> Option<String> {
        self.gen.variable_identifiers.get(variable_id).cloned()
    }

    pub fn event_signature(&self, node_id: &str) -> Option<CustomEventSig> {
        self.gen.event_signatures.get(node_id).cloned()
    }

    pub fn sanitize_identifier(&self, raw: &str) -> String {
        format::sanitize_identifier(raw)
    }

    pub fn sanitize_operator(&self, raw: &str) -> &'static str {
        format::sanitize_operator(raw)
    }

    pub fn format_literal(&self, value: &Value, kind: PinKind) -> String {
        format::format_literal(value, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::{Connection, GraphPayload, Pin, PinRef, Position};
    use crate::registry::{NodeBehavior, NodeCategory, NodeTypeDefinition};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Passthrough;
    impl NodeBehavior for Passthrough {
        fn emit_exec(&self, ctx: &mut ExecContext<'_, '_>) -> Option<Vec<String>> {
            Some(ctx.emit_next_exec("exec_out"))
        }
    }

    struct Statement(&'static str);
    impl NodeBehavior for Statement {
        fn emit_exec(&self, ctx: &mut ExecContext<'_, '_>) -> Option<Vec<String>> {
            let mut lines = vec![format!("{}{}", ctx.indent(), self.0)];
            lines.extend(ctx.emit_next_exec("exec_out"));
            Some(lines)
        }
    }

    struct CountingValue(Arc<AtomicUsize>);
    impl NodeBehavior for CountingValue {
        fn evaluate_value(&self, _ctx: &mut ValueContext<'_, '_>) -> Option<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Some("42".to_string())
        }
    }

    /// Evaluates its own `input` pin; wiring two of these to each other
    /// forms a genuine data cycle.
    struct SelfFeeding;
    impl NodeBehavior for SelfFeeding {
        fn evaluate_value(&self, ctx: &mut ValueContext<'_, '_>) -> Option<String> {
            Some(format!("({} + 1)", ctx.resolve_value_input("input", "nil")))
        }
    }

    /// Emits a statement built from its `value` input, then continues.
    struct Consume;
    impl NodeBehavior for Consume {
        fn emit_exec(&self, ctx: &mut ExecContext<'_, '_>) -> Option<Vec<String>> {
            let value = ctx.resolve_value_input("value", "nil");
            let mut lines = vec![format!("{}use({})", ctx.indent(), value)];
            lines.extend(ctx.emit_next_exec("exec_out"));
            Some(lines)
        }
    }

    fn definition(
        type_id: &str,
        inputs: Vec<Pin>,
        outputs: Vec<Pin>,
        entry_point: Option<EntryPoint>,
    ) -> NodeTypeDefinition {
        NodeTypeDefinition {
            type_id: type_id.into(),
            title: type_id.into(),
            category: NodeCategory::Function,
            inputs,
            outputs,
            default_properties: serde_json::Map::new(),
            entry_point,
            on_create: None,
        }
    }

    fn test_registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.register(
            definition(
                "start",
                vec![],
                vec![Pin::output("exec_out", "", PinKind::Exec)],
                Some(EntryPoint::Lifecycle(LifecycleEvent::Init)),
            ),
            Arc::new(Passthrough),
        );
        registry.register(
            definition(
                "tick",
                vec![],
                vec![Pin::output("exec_out", "", PinKind::Exec)],
                Some(EntryPoint::Lifecycle(LifecycleEvent::Update)),
            ),
            Arc::new(Passthrough),
        );
        registry.register(
            definition(
                "step",
                vec![Pin::input("exec_in", "", PinKind::Exec)],
                vec![Pin::output("exec_out", "", PinKind::Exec)],
                None,
            ),
            Arc::new(Statement("step()")),
        );
        registry
    }

    fn node(id: &str, node_type: &str, inputs: Vec<Pin>, outputs: Vec<Pin>) -> Node {
        Node {
            id: id.into(),
            node_type: node_type.into(),
            title: node_type.into(),
            position: Position::default(),
            inputs,
            outputs,
            properties: serde_json::Map::new(),
        }
    }

    fn exec_node(id: &str, node_type: &str) -> Node {
        node(
            id,
            node_type,
            vec![Pin::input("exec_in", "", PinKind::Exec)],
            vec![Pin::output("exec_out", "", PinKind::Exec)],
        )
    }

    fn connection(id: &str, from: (&str, &str), to: (&str, &str), kind: PinKind) -> Connection {
        Connection {
            id: id.into(),
            from: PinRef::new(from.0, from.1),
            to: PinRef::new(to.0, to.1),
            kind,
        }
    }

    fn generate(graph: &GraphStore, registry: &NodeRegistry) -> String {
        LuaCodeGenerator::new(graph, registry, &[], &ProjectSettings::default()).generate()
    }

    #[test]
    fn empty_graph_compiles_to_two_line_placeholder() {
        let graph = GraphStore::new();
        let registry = test_registry();
        let out = generate(&graph, &registry);
        assert_eq!(out, format!("{}\n{}\n", BANNER, EMPTY_PLACEHOLDER));
    }

    #[test]
    fn single_chain_emits_in_order() {
        let registry = test_registry();
        let mut graph = GraphStore::new();
        graph.add_node(node(
            "start_0001",
            "start",
            vec![],
            vec![Pin::output("exec_out", "", PinKind::Exec)],
        ));
        graph.add_node(exec_node("step_0001", "step"));
        graph.add_node(exec_node("step_0002", "step"));
        graph.connect(
            PinRef::new("start_0001", "exec_out"),
            PinRef::new("step_0001", "exec_in"),
        );
        graph.connect(
            PinRef::new("step_0001", "exec_out"),
            PinRef::new("step_0002", "exec_in"),
        );

        let out = generate(&graph, &registry);
        assert!(out.contains("function _init()\n  step()\n  step()\nend"));
    }

    #[test]
    fn exec_cycle_emits_comment_and_stops() {
        let registry = test_registry();
        let mut graph = GraphStore::new();
        graph.add_node(node(
            "start_0001",
            "start",
            vec![],
            vec![Pin::output("exec_out", "", PinKind::Exec)],
        ));
        graph.add_node(exec_node("step_0001", "step"));
        graph.add_node(exec_node("step_0002", "step"));
        graph.connect(
            PinRef::new("start_0001", "exec_out"),
            PinRef::new("step_0001", "exec_in"),
        );
        graph.connect(
            PinRef::new("step_0001", "exec_out"),
            PinRef::new("step_0002", "exec_in"),
        );
        graph.connect(
            PinRef::new("step_0002", "exec_out"),
            PinRef::new("step_0001", "exec_in"),
        );

        let out = generate(&graph, &registry);
        assert!(out.contains("  -- cycle detected: step_0001"));
        // both steps still emitted once before the guard fires
        assert_eq!(out.matches("step()").count(), 2);
    }

    #[test]
    fn fan_out_duplicates_shared_downstream_nodes() {
        // start fans out to two chains that converge on one shared node;
        // the shared node must appear once per branch, not once total.
        let registry = test_registry();
        let mut graph = GraphStore::new();
        let payload = GraphPayload {
            nodes: vec![
                node(
                    "start_0001",
                    "start",
                    vec![],
                    vec![Pin::output("exec_out", "", PinKind::Exec)],
                ),
                exec_node("step_0001", "step"),
                exec_node("step_0002", "step"),
                exec_node("step_0003", "step"),
            ],
            connections: vec![
                connection(
                    "conn_0001",
                    ("start_0001", "exec_out"),
                    ("step_0001", "exec_in"),
                    PinKind::Exec,
                ),
                connection(
                    "conn_0002",
                    ("start_0001", "exec_out"),
                    ("step_0002", "exec_in"),
                    PinKind::Exec,
                ),
                connection(
                    "conn_0003",
                    ("step_0001", "exec_out"),
                    ("step_0003", "exec_in"),
                    PinKind::Exec,
                ),
                connection(
                    "conn_0004",
                    ("step_0002", "exec_out"),
                    ("step_0003", "exec_in"),
                    PinKind::Exec,
                ),
            ],
        };
        graph.replace_state(payload);

        let out = generate(&graph, &registry);
        assert_eq!(out.matches("step()").count(), 4);
        assert!(!out.contains("cycle detected"));
    }

    #[test]
    fn missing_exec_target_emits_comment() {
        let registry = test_registry();
        let mut graph = GraphStore::new();
        let payload = GraphPayload {
            nodes: vec![node(
                "start_0001",
                "start",
                vec![],
                vec![Pin::output("exec_out", "", PinKind::Exec)],
            )],
            connections: vec![connection(
                "conn_0001",
                ("start_0001", "exec_out"),
                ("ghost_0001", "exec_in"),
                PinKind::Exec,
            )],
        };
        graph.replace_state(payload);

        let out = generate(&graph, &registry);
        assert!(out.contains("  -- missing node: ghost_0001"));
    }

    #[test]
    fn unregistered_type_gets_fallback_comment_and_continues() {
        let registry = test_registry();
        let mut graph = GraphStore::new();
        graph.add_node(node(
            "start_0001",
            "start",
            vec![],
            vec![Pin::output("exec_out", "", PinKind::Exec)],
        ));
        graph.add_node(exec_node("mystery_0001", "mystery"));
        graph.add_node(exec_node("step_0001", "step"));
        graph.connect(
            PinRef::new("start_0001", "exec_out"),
            PinRef::new("mystery_0001", "exec_in"),
        );
        graph.connect(
            PinRef::new("mystery_0001", "exec_out"),
            PinRef::new("step_0001", "exec_in"),
        );

        let out = generate(&graph, &registry);
        assert!(out.contains("  -- no handler for node type 'mystery'"));
        assert!(out.contains("  step()"));
    }

    #[test]
    fn value_evaluation_is_memoized() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = test_registry();
        registry.register(
            definition(
                "answer",
                vec![],
                vec![Pin::output("value", "value", PinKind::Number)],
                None,
            ),
            Arc::new(CountingValue(counter.clone())),
        );
        registry.register(
            definition(
                "consume",
                vec![
                    Pin::input("exec_in", "", PinKind::Exec),
                    Pin::input("value", "value", PinKind::Number),
                ],
                vec![Pin::output("exec_out", "", PinKind::Exec)],
                None,
            ),
            Arc::new(Consume),
        );

        let mut graph = GraphStore::new();
        graph.add_node(node(
            "start_0001",
            "start",
            vec![],
            vec![Pin::output("exec_out", "", PinKind::Exec)],
        ));
        graph.add_node(node(
            "answer_0001",
            "answer",
            vec![],
            vec![Pin::output("value", "value", PinKind::Number)],
        ));
        for id in ["consume_0001", "consume_0002"] {
            graph.add_node(node(
                id,
                "consume",
                vec![
                    Pin::input("exec_in", "", PinKind::Exec),
                    Pin::input("value", "value", PinKind::Number),
                ],
                vec![Pin::output("exec_out", "", PinKind::Exec)],
            ));
            graph.connect(
                PinRef::new("answer_0001", "value"),
                PinRef::new(id, "value"),
            );
        }
        graph.connect(
            PinRef::new("start_0001", "exec_out"),
            PinRef::new("consume_0001", "exec_in"),
        );
        graph.connect(
            PinRef::new("consume_0001", "exec_out"),
            PinRef::new("consume_0002", "exec_in"),
        );

        let out = generate(&graph, &registry);
        assert_eq!(out.matches("use(42)").count(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn value_cycle_resolves_to_nil() {
        let mut registry = test_registry();
        registry.register(
            definition(
                "feed",
                vec![Pin::input("input", "input", PinKind::Number)],
                vec![Pin::output("value", "value", PinKind::Number)],
                None,
            ),
            Arc::new(SelfFeeding),
        );
        registry.register(
            definition(
                "consume",
                vec![
                    Pin::input("exec_in", "", PinKind::Exec),
                    Pin::input("value", "value", PinKind::Number),
                ],
                vec![Pin::output("exec_out", "", PinKind::Exec)],
                None,
            ),
            Arc::new(Consume),
        );

        let feed_pins = || {
            (
                vec![Pin::input("input", "input", PinKind::Number)],
                vec![Pin::output("value", "value", PinKind::Number)],
            )
        };
        let mut graph = GraphStore::new();
        graph.add_node(node(
            "start_0001",
            "start",
            vec![],
            vec![Pin::output("exec_out", "", PinKind::Exec)],
        ));
        let (ins, outs) = feed_pins();
        graph.add_node(node("feed_0001", "feed", ins, outs));
        let (ins, outs) = feed_pins();
        graph.add_node(node("feed_0002", "feed", ins, outs));
        graph.add_node(node(
            "consume_0001",
            "consume",
            vec![
                Pin::input("exec_in", "", PinKind::Exec),
                Pin::input("value", "value", PinKind::Number),
            ],
            vec![Pin::output("exec_out", "", PinKind::Exec)],
        ));
        graph.connect(
            PinRef::new("feed_0001", "value"),
            PinRef::new("feed_0002", "input"),
        );
        graph.connect(
            PinRef::new("feed_0002", "value"),
            PinRef::new("feed_0001", "input"),
        );
        graph.connect(
            PinRef::new("feed_0002", "value"),
            PinRef::new("consume_0001", "value"),
        );
        graph.connect(
            PinRef::new("start_0001", "exec_out"),
            PinRef::new("consume_0001", "exec_in"),
        );

        let out = generate(&graph, &registry);
        // the inner revisit of feed_0002 breaks the cycle with nil
        assert!(out.contains("use(((nil + 1) + 1))"));
    }

    #[test]
    fn variables_are_declared_deduplicated_and_formatted() {
        let registry = test_registry();
        let mut graph = GraphStore::new();
        graph.add_node(node(
            "start_0001",
            "start",
            vec![],
            vec![Pin::output("exec_out", "", PinKind::Exec)],
        ));

        let variables = vec![
            VariableDef {
                id: "var-1".into(),
                name: "Score".into(),
                kind: PinKind::Number,
                default_value: json!(0),
            },
            VariableDef {
                id: "var-2".into(),
                name: "score".into(),
                kind: PinKind::Number,
                default_value: json!(10),
            },
            VariableDef {
                id: "var-3".into(),
                name: "Player Pos".into(),
                kind: PinKind::Table,
                default_value: json!({"x": 64, "y": 64}),
            },
        ];
        let out = LuaCodeGenerator::new(&graph, &registry, &variables, &ProjectSettings::default())
            .generate();

        assert!(out.contains("score = 0\nscore_2 = 10\nplayer_pos = {x = 64, y = 64}"));
    }

    #[test]
    fn update_entry_remaps_to_update60_when_fps60_set() {
        let registry = test_registry();
        let mut graph = GraphStore::new();
        graph.add_node(node(
            "tick_0001",
            "tick",
            vec![],
            vec![Pin::output("exec_out", "", PinKind::Exec)],
        ));

        let normal = generate(&graph, &registry);
        assert!(normal.contains("function _update()"));
        assert!(!normal.contains("_update60"));

        let settings = ProjectSettings { fps60: true };
        let fast = LuaCodeGenerator::new(&graph, &registry, &[], &settings).generate();
        assert!(fast.contains("function _update60()"));
        assert!(!fast.contains("function _update()"));
    }

    #[test]
    fn first_entry_per_event_wins() {
        let registry = test_registry();
        let mut graph = GraphStore::new();
        graph.add_node(node(
            "start_0001",
            "start",
            vec![],
            vec![Pin::output("exec_out", "", PinKind::Exec)],
        ));
        graph.add_node(node(
            "start_0002",
            "start",
            vec![],
            vec![Pin::output("exec_out", "", PinKind::Exec)],
        ));
        graph.add_node(exec_node("step_0001", "step"));
        // only the second (ignored) entry has a target
        graph.connect(
            PinRef::new("start_0002", "exec_out"),
            PinRef::new("step_0001", "exec_in"),
        );

        let out = generate(&graph, &registry);
        assert_eq!(out.matches("function _init()").count(), 1);
        assert!(!out.contains("step()"));
    }

    #[test]
    fn lifecycle_functions_render_in_fixed_order() {
        let mut registry = test_registry();
        registry.register(
            definition(
                "paint",
                vec![],
                vec![Pin::output("exec_out", "", PinKind::Exec)],
                Some(EntryPoint::Lifecycle(LifecycleEvent::Draw)),
            ),
            Arc::new(Passthrough),
        );
        let mut graph = GraphStore::new();
        // insertion order deliberately scrambled
        graph.add_node(node(
            "paint_0001",
            "paint",
            vec![],
            vec![Pin::output("exec_out", "", PinKind::Exec)],
        ));
        graph.add_node(node(
            "tick_0001",
            "tick",
            vec![],
            vec![Pin::output("exec_out", "", PinKind::Exec)],
        ));
        graph.add_node(node(
            "start_0001",
            "start",
            vec![],
            vec![Pin::output("exec_out", "", PinKind::Exec)],
        ));

        let out = generate(&graph, &registry);
        let init_at = out.find("function _init").unwrap();
        let update_at = out.find("function _update").unwrap();
        let draw_at = out.find("function _draw").unwrap();
        assert!(init_at < update_at && update_at < draw_at);
    }

    #[test]
    fn generation_is_idempotent() {
        let registry = test_registry();
        let mut graph = GraphStore::new();
        graph.add_node(node(
            "start_0001",
            "start",
            vec![],
            vec![Pin::output("exec_out", "", PinKind::Exec)],
        ));
        graph.add_node(exec_node("step_0001", "step"));
        graph.connect(
            PinRef::new("start_0001", "exec_out"),
            PinRef::new("step_0001", "exec_in"),
        );

        let first = generate(&graph, &registry);
        let second = generate(&graph, &registry);
        assert_eq!(first, second);
    }

    #[test]
    fn event_params_parse_with_dedup_and_kind_restriction() {
        let mut n = node("def_0001", "event_custom", vec![], vec![]);
        n.properties.insert(
            "params".into(),
            json!([
                {"id": "p1", "name": "Power", "kind": "number"},
                {"id": "p2", "name": "power", "kind": "exec", "optional": true},
                {"id": "p3"}
            ]),
        );
        let params = parse_event_params(&n);
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].identifier, "power");
        assert_eq!(params[0].kind, PinKind::Number);
        assert!(!params[0].optional);
        assert_eq!(params[1].identifier, "power_2");
        assert_eq!(params[1].kind, PinKind::Any);
        assert!(params[1].optional);
        assert_eq!(params[2].id, "p3");
        assert_eq!(params[2].identifier, "p3");
        assert_eq!(params[2].kind, PinKind::Any);
    }
}
