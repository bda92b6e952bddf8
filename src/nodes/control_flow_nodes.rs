//! Control-flow node types: branch, for-loop, and sequence.
//!
//! These are the nodes that spawn sub-chains. Every sub-chain walk goes
//! through the context's branch helpers, which hand each branch its own
//! copy of the cycle-guard path; a node wired into both sides of a
//! branch is emitted in both, and only a genuine ancestor revisit is
//! cut off.

use std::sync::Arc;

use serde_json::json;

use super::properties;
use crate::codegen::format::sequence_label;
use crate::codegen::ExecContext;
use crate::graph::types::{Pin, PinKind};
use crate::registry::{NodeBehavior, NodeCategory, NodeRegistry, NodeTypeDefinition};

pub fn register(registry: &mut NodeRegistry) {
    registry.register(
        NodeTypeDefinition {
            type_id: "branch".into(),
            title: "Branch".into(),
            category: NodeCategory::ControlFlow,
            inputs: vec![
                Pin::input("exec_in", "", PinKind::Exec),
                Pin::input("condition", "condition", PinKind::Boolean),
            ],
            outputs: vec![
                Pin::output("then", "then", PinKind::Exec),
                Pin::output("else", "else", PinKind::Exec),
            ],
            default_properties: serde_json::Map::new(),
            entry_point: None,
            on_create: None,
        },
        Arc::new(BranchBehavior),
    );
    registry.register(
        NodeTypeDefinition {
            type_id: "for_loop".into(),
            title: "For Loop".into(),
            category: NodeCategory::ControlFlow,
            inputs: vec![
                Pin::input("exec_in", "", PinKind::Exec),
                Pin::input("start", "start", PinKind::Number).with_default(json!(0)),
                Pin::input("end", "end", PinKind::Number).with_default(json!(0)),
                Pin::input("step", "step", PinKind::Number).with_default(json!(1)),
            ],
            outputs: vec![
                Pin::output("body", "body", PinKind::Exec),
                Pin::output("completed", "completed", PinKind::Exec),
            ],
            default_properties: properties(json!({ "variable": "i" })),
            entry_point: None,
            on_create: None,
        },
        Arc::new(ForLoopBehavior),
    );
    registry.register(
        NodeTypeDefinition {
            type_id: "sequence".into(),
            title: "Sequence".into(),
            category: NodeCategory::ControlFlow,
            inputs: vec![Pin::input("exec_in", "", PinKind::Exec)],
            outputs: vec![
                Pin::output("then_0", "A", PinKind::Exec),
                Pin::output("then_1", "B", PinKind::Exec),
            ],
            default_properties: serde_json::Map::new(),
            entry_point: None,
            on_create: None,
        },
        Arc::new(SequenceBehavior),
    );
}

struct BranchBehavior;

impl NodeBehavior for BranchBehavior {
    fn emit_exec(&self, ctx: &mut ExecContext<'_, '_>) -> Option<Vec<String>> {
        let condition = ctx.resolve_value_input("condition", "false");
        let mut lines = vec![format!("{}if {} then", ctx.indent(), condition)];

        let then_block = ctx.emit_branch("then");
        if then_block.is_empty() {
            lines.push(format!("{}-- empty", ctx.indent_at(ctx.indent_level() + 1)));
        } else {
            lines.extend(then_block);
        }

        // an unconnected else pin omits the whole else block
        if ctx.has_targets("else") {
            lines.push(format!("{}else", ctx.indent()));
            lines.extend(ctx.emit_branch("else"));
        }

        lines.push(format!("{}end", ctx.indent()));
        Some(lines)
    }
}

struct ForLoopBehavior;

impl NodeBehavior for ForLoopBehavior {
    fn emit_exec(&self, ctx: &mut ExecContext<'_, '_>) -> Option<Vec<String>> {
        let variable =
            ctx.sanitize_identifier(ctx.node().string_property("variable").unwrap_or("i"));
        let start = ctx.resolve_value_input("start", "0");
        let end = ctx.resolve_value_input("end", "0");
        let step = ctx.resolve_value_input("step", "1");

        let header = if step == "1" {
            format!("{}for {} = {}, {} do", ctx.indent(), variable, start, end)
        } else {
            format!(
                "{}for {} = {}, {}, {} do",
                ctx.indent(),
                variable,
                start,
                end,
                step
            )
        };
        let mut lines = vec![header];

        let body = ctx.emit_branch("body");
        if body.is_empty() {
            lines.push(format!("{}-- empty", ctx.indent_at(ctx.indent_level() + 1)));
        } else {
            lines.extend(body);
        }
        lines.push(format!("{}end", ctx.indent()));

        // completed falls through after the loop at the same indent
        lines.extend(ctx.emit_next_exec("completed"));
        Some(lines)
    }
}

struct SequenceBehavior;

impl NodeBehavior for SequenceBehavior {
    fn emit_exec(&self, ctx: &mut ExecContext<'_, '_>) -> Option<Vec<String>> {
        let branch_pins: Vec<String> = ctx
            .node()
            .outputs
            .iter()
            .filter(|p| p.kind.is_exec())
            .map(|p| p.id.clone())
            .collect();

        let mut lines = Vec::new();
        for (index, pin_id) in branch_pins.iter().enumerate() {
            lines.push(format!("{}-- {}", ctx.indent(), sequence_label(index)));
            lines.extend(ctx.emit_next_exec(pin_id));
        }
        Some(lines)
    }
}
