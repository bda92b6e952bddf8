//! Pure value nodes: no exec pins, no statements, just expressions.
//!
//! These only implement the value hook. Their output expressions are
//! built on demand when a downstream input resolves, memoized by the
//! generator for the rest of the pass.

use std::sync::Arc;

use serde_json::{json, Value};

use super::properties;
use crate::codegen::ValueContext;
use crate::graph::types::{Pin, PinKind};
use crate::registry::{NodeBehavior, NodeCategory, NodeRegistry, NodeTypeDefinition};

pub fn register(registry: &mut NodeRegistry) {
    registry.register(
        literal_definition("number_literal", "Number", PinKind::Number, json!(0)),
        Arc::new(LiteralBehavior(PinKind::Number)),
    );
    registry.register(
        literal_definition("string_literal", "String", PinKind::String, json!("")),
        Arc::new(LiteralBehavior(PinKind::String)),
    );
    registry.register(
        literal_definition("boolean_literal", "Boolean", PinKind::Boolean, json!(false)),
        Arc::new(LiteralBehavior(PinKind::Boolean)),
    );
    registry.register(
        NodeTypeDefinition {
            type_id: "get_variable".into(),
            title: "Get Variable".into(),
            category: NodeCategory::Pure,
            inputs: vec![],
            outputs: vec![Pin::output("value", "value", PinKind::Any)],
            default_properties: properties(json!({ "variableId": null, "name": "" })),
            entry_point: None,
            on_create: None,
        },
        Arc::new(GetVariableBehavior),
    );
    registry.register(
        NodeTypeDefinition {
            type_id: "arithmetic".into(),
            title: "Arithmetic".into(),
            category: NodeCategory::Pure,
            inputs: vec![
                Pin::input("a", "a", PinKind::Number).with_default(json!(0)),
                Pin::input("b", "b", PinKind::Number).with_default(json!(0)),
            ],
            outputs: vec![Pin::output("value", "value", PinKind::Number)],
            default_properties: properties(json!({ "op": "+" })),
            entry_point: None,
            on_create: None,
        },
        Arc::new(ArithmeticBehavior),
    );
    registry.register(
        NodeTypeDefinition {
            type_id: "comparison".into(),
            title: "Comparison".into(),
            category: NodeCategory::Pure,
            inputs: vec![
                Pin::input("a", "a", PinKind::Any).with_default(json!(0)),
                Pin::input("b", "b", PinKind::Any).with_default(json!(0)),
            ],
            outputs: vec![Pin::output("value", "value", PinKind::Boolean)],
            default_properties: properties(json!({ "op": "==" })),
            entry_point: None,
            on_create: None,
        },
        Arc::new(ComparisonBehavior),
    );
    registry.register(
        NodeTypeDefinition {
            type_id: "button".into(),
            title: "Button".into(),
            category: NodeCategory::Pure,
            inputs: vec![Pin::input("index", "index", PinKind::Number).with_default(json!(0))],
            outputs: vec![Pin::output("value", "pressed", PinKind::Boolean)],
            default_properties: serde_json::Map::new(),
            entry_point: None,
            on_create: None,
        },
        Arc::new(ButtonBehavior),
    );
}

fn literal_definition(
    type_id: &str,
    title: &str,
    kind: PinKind,
    default: Value,
) -> NodeTypeDefinition {
    NodeTypeDefinition {
        type_id: type_id.into(),
        title: title.into(),
        category: NodeCategory::Pure,
        inputs: vec![],
        outputs: vec![Pin::output("value", "value", kind)],
        default_properties: properties(json!({ "value": default })),
        entry_point: None,
        on_create: None,
    }
}

/// Formats the node's `value` property as a literal of the fixed kind.
struct LiteralBehavior(PinKind);

impl NodeBehavior for LiteralBehavior {
    fn evaluate_value(&self, ctx: &mut ValueContext<'_, '_>) -> Option<String> {
        let value = ctx.node().property("value").cloned().unwrap_or(Value::Null);
        Some(ctx.format_literal(&value, self.0))
    }
}

struct GetVariableBehavior;

impl NodeBehavior for GetVariableBehavior {
    fn evaluate_value(&self, ctx: &mut ValueContext<'_, '_>) -> Option<String> {
        if let Some(id) = ctx.node().string_property("variableId") {
            if let Some(identifier) = ctx.variable_identifier(id) {
                return Some(identifier);
            }
        }
        let name = ctx.node().string_property("name").unwrap_or("");
        Some(ctx.sanitize_identifier(name))
    }
}

struct ArithmeticBehavior;

impl NodeBehavior for ArithmeticBehavior {
    fn evaluate_value(&self, ctx: &mut ValueContext<'_, '_>) -> Option<String> {
        let a = ctx.resolve_value_input("a", "0");
        let b = ctx.resolve_value_input("b", "0");
        let op = arithmetic_operator(ctx.node().string_property("op").unwrap_or("+"));
        Some(format!("({} {} {})", a, op, b))
    }
}

fn arithmetic_operator(raw: &str) -> &'static str {
    match raw.trim() {
        "+" => "+",
        "-" => "-",
        "*" => "*",
        "/" => "/",
        "%" => "%",
        _ => "+",
    }
}

struct ComparisonBehavior;

impl NodeBehavior for ComparisonBehavior {
    fn evaluate_value(&self, ctx: &mut ValueContext<'_, '_>) -> Option<String> {
        let a = ctx.resolve_value_input("a", "0");
        let b = ctx.resolve_value_input("b", "0");
        let op = ctx.sanitize_operator(ctx.node().string_property("op").unwrap_or("=="));
        Some(format!("({} {} {})", a, op, b))
    }
}

struct ButtonBehavior;

impl NodeBehavior for ButtonBehavior {
    fn evaluate_value(&self, ctx: &mut ValueContext<'_, '_>) -> Option<String> {
        let index = ctx.resolve_value_input("index", "0");
        Some(format!("btn({})", index))
    }
}
