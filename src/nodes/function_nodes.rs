//! Callable statement nodes: host API calls and variable assignment.

use std::sync::Arc;

use serde_json::json;

use super::properties;
use crate::codegen::ExecContext;
use crate::graph::types::{Pin, PinKind};
use crate::registry::{NodeBehavior, NodeCategory, NodeRegistry, NodeTypeDefinition};

pub fn register(registry: &mut NodeRegistry) {
    registry.register(
        NodeTypeDefinition {
            type_id: "print".into(),
            title: "Print".into(),
            category: NodeCategory::Function,
            inputs: vec![
                Pin::input("exec_in", "", PinKind::Exec),
                Pin::input("msg", "text", PinKind::String).with_default(json!("")),
                Pin::input("x", "x", PinKind::Number).with_default(json!(0)),
                Pin::input("y", "y", PinKind::Number).with_default(json!(0)),
                Pin::input("color", "color", PinKind::Number).with_default(json!(7)),
            ],
            outputs: vec![Pin::output("exec_out", "", PinKind::Exec)],
            default_properties: serde_json::Map::new(),
            entry_point: None,
            on_create: None,
        },
        Arc::new(PrintBehavior),
    );
    registry.register(
        NodeTypeDefinition {
            type_id: "cls".into(),
            title: "Clear Screen".into(),
            category: NodeCategory::Function,
            inputs: vec![
                Pin::input("exec_in", "", PinKind::Exec),
                Pin::input("color", "color", PinKind::Number).with_default(json!(0)),
            ],
            outputs: vec![Pin::output("exec_out", "", PinKind::Exec)],
            default_properties: serde_json::Map::new(),
            entry_point: None,
            on_create: None,
        },
        Arc::new(ClsBehavior),
    );
    registry.register(
        NodeTypeDefinition {
            type_id: "set_variable".into(),
            title: "Set Variable".into(),
            category: NodeCategory::Function,
            inputs: vec![
                Pin::input("exec_in", "", PinKind::Exec),
                Pin::input("value", "value", PinKind::Any),
            ],
            outputs: vec![Pin::output("exec_out", "", PinKind::Exec)],
            default_properties: properties(json!({ "variableId": null, "name": "" })),
            entry_point: None,
            on_create: None,
        },
        Arc::new(SetVariableBehavior),
    );
}

struct PrintBehavior;

impl NodeBehavior for PrintBehavior {
    fn emit_exec(&self, ctx: &mut ExecContext<'_, '_>) -> Option<Vec<String>> {
        let msg = ctx.resolve_value_input("msg", "\"\"");
        let x = ctx.resolve_value_input("x", "0");
        let y = ctx.resolve_value_input("y", "0");
        let color = ctx.resolve_value_input("color", "7");
        let mut lines = vec![format!(
            "{}print({}, {}, {}, {})",
            ctx.indent(),
            msg,
            x,
            y,
            color
        )];
        lines.extend(ctx.emit_next_exec("exec_out"));
        Some(lines)
    }
}

struct ClsBehavior;

impl NodeBehavior for ClsBehavior {
    fn emit_exec(&self, ctx: &mut ExecContext<'_, '_>) -> Option<Vec<String>> {
        let color = ctx.resolve_value_input("color", "0");
        let call = if color == "0" {
            "cls()".to_string()
        } else {
            format!("cls({})", color)
        };
        let mut lines = vec![format!("{}{}", ctx.indent(), call)];
        lines.extend(ctx.emit_next_exec("exec_out"));
        Some(lines)
    }
}

struct SetVariableBehavior;

impl NodeBehavior for SetVariableBehavior {
    fn emit_exec(&self, ctx: &mut ExecContext<'_, '_>) -> Option<Vec<String>> {
        let identifier = assignment_target(ctx);
        let value = ctx.resolve_value_input("value", "nil");
        let mut lines = vec![format!("{}{} = {}", ctx.indent(), identifier, value)];
        lines.extend(ctx.emit_next_exec("exec_out"));
        Some(lines)
    }
}

/// The identifier to assign: the declared variable's generated name when
/// the id is known, otherwise the node's cached display name sanitized.
fn assignment_target(ctx: &ExecContext<'_, '_>) -> String {
    if let Some(id) = ctx.node().string_property("variableId") {
        if let Some(identifier) = ctx.variable_identifier(id) {
            return identifier;
        }
    }
    let name = ctx.node().string_property("name").unwrap_or("");
    ctx.sanitize_identifier(name)
}
