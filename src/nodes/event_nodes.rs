//! Entry-point node types: host lifecycle events, custom events, and
//! the node that calls a custom event from elsewhere in the graph.
//!
//! Lifecycle and custom event nodes are pure passthroughs at emission
//! time; the generator has already opened their function block, so they
//! just continue the chain. The interesting parts live in the custom
//! event's parameter pins (`param_<id>` outputs evaluating to the bound
//! parameter identifier) and in the call node, which consults the
//! symbol table for the target's resolved name and signature.

use std::sync::Arc;

use serde_json::json;

use super::properties;
use crate::codegen::{ExecContext, ValueContext};
use crate::graph::types::{Pin, PinKind};
use crate::registry::{
    EntryPoint, LifecycleEvent, NodeBehavior, NodeCategory, NodeRegistry, NodeTypeDefinition,
};

pub fn register(registry: &mut NodeRegistry) {
    registry.register(
        lifecycle_definition("event_init", "Init", LifecycleEvent::Init),
        Arc::new(LifecycleEventBehavior),
    );
    registry.register(
        lifecycle_definition("event_update", "Update", LifecycleEvent::Update),
        Arc::new(LifecycleEventBehavior),
    );
    registry.register(
        lifecycle_definition("event_draw", "Draw", LifecycleEvent::Draw),
        Arc::new(LifecycleEventBehavior),
    );
    registry.register(
        NodeTypeDefinition {
            type_id: "event_custom".into(),
            title: "Custom Event".into(),
            category: NodeCategory::Event,
            inputs: vec![],
            outputs: vec![Pin::output("exec_out", "", PinKind::Exec)],
            default_properties: properties(json!({ "name": "my_event", "params": [] })),
            entry_point: Some(EntryPoint::Custom),
            on_create: None,
        },
        Arc::new(CustomEventBehavior),
    );
    registry.register(
        NodeTypeDefinition {
            type_id: "call_custom_event".into(),
            title: "Call Event".into(),
            category: NodeCategory::Function,
            inputs: vec![Pin::input("exec_in", "", PinKind::Exec)],
            outputs: vec![Pin::output("exec_out", "", PinKind::Exec)],
            default_properties: properties(json!({ "targetEventId": null })),
            entry_point: None,
            on_create: None,
        },
        Arc::new(CallEventBehavior),
    );
}

fn lifecycle_definition(
    type_id: &str,
    title: &str,
    event: LifecycleEvent,
) -> NodeTypeDefinition {
    NodeTypeDefinition {
        type_id: type_id.into(),
        title: title.into(),
        category: NodeCategory::Event,
        inputs: vec![],
        outputs: vec![Pin::output("exec_out", "", PinKind::Exec)],
        default_properties: serde_json::Map::new(),
        entry_point: Some(EntryPoint::Lifecycle(event)),
        on_create: None,
    }
}

struct LifecycleEventBehavior;

impl NodeBehavior for LifecycleEventBehavior {
    fn emit_exec(&self, ctx: &mut ExecContext<'_, '_>) -> Option<Vec<String>> {
        Some(ctx.emit_next_exec("exec_out"))
    }
}

struct CustomEventBehavior;

impl NodeBehavior for CustomEventBehavior {
    fn emit_exec(&self, ctx: &mut ExecContext<'_, '_>) -> Option<Vec<String>> {
        Some(ctx.emit_next_exec("exec_out"))
    }

    /// `param_<id>` outputs read as the parameter's local identifier
    /// inside the event body.
    fn evaluate_value(&self, ctx: &mut ValueContext<'_, '_>) -> Option<String> {
        let param_id = ctx.pin_id().strip_prefix("param_")?.to_string();
        let sig = ctx.event_signature(&ctx.node().id)?;
        sig.params
            .iter()
            .find(|p| p.id == param_id)
            .map(|p| p.identifier.clone())
    }
}

struct CallEventBehavior;

impl NodeBehavior for CallEventBehavior {
    fn emit_exec(&self, ctx: &mut ExecContext<'_, '_>) -> Option<Vec<String>> {
        let target = ctx
            .node()
            .string_property("targetEventId")
            .map(str::to_string);
        let sig = target.as_deref().and_then(|id| ctx.event_signature(id));

        let mut lines = Vec::new();
        match sig {
            Some(sig) => {
                let mut args: Vec<(String, bool)> = Vec::new();
                for param in &sig.params {
                    let pin_id = format!("arg_{}", param.id);
                    // optional parameters default to nil so they can be
                    // trimmed; required ones get a typed zero value
                    let fallback = if param.optional {
                        "nil"
                    } else {
                        kind_fallback(param.kind)
                    };
                    let expr = ctx.resolve_value_input(&pin_id, fallback);
                    args.push((expr, param.optional));
                }
                // drop trailing optional arguments left at nil
                while let Some((expr, optional)) = args.last() {
                    if *optional && expr == "nil" {
                        args.pop();
                    } else {
                        break;
                    }
                }
                let rendered: Vec<String> = args.into_iter().map(|(expr, _)| expr).collect();
                lines.push(format!(
                    "{}{}({})",
                    ctx.indent(),
                    sig.function_name,
                    rendered.join(", ")
                ));
            }
            None => {
                lines.push(format!(
                    "{}-- unknown custom event: {}",
                    ctx.indent(),
                    target.as_deref().unwrap_or("?")
                ));
            }
        }
        lines.extend(ctx.emit_next_exec("exec_out"));
        Some(lines)
    }
}

fn kind_fallback(kind: PinKind) -> &'static str {
    match kind {
        PinKind::Number => "0",
        PinKind::Boolean => "false",
        PinKind::String => "\"\"",
        PinKind::Table => "{}",
        PinKind::Any | PinKind::Exec => "nil",
    }
}
