//! Core types for blueprint graphs.
//!
//! These types define the structure of a blueprint: nodes, their typed
//! pins, and the directional connections between them. The serialized
//! shape (camelCase keys, lowercase kind/direction strings) is the wire
//! format shared with the editor front end.

use serde::{Deserialize, Serialize};

/// The kind of value a pin carries.
///
/// `Exec` pins carry control flow; every other kind carries data. `Any`
/// is the wildcard: it is compatible with every kind on either side of a
/// connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinKind {
    /// Control-flow pin
    Exec,
    /// Numeric value
    Number,
    /// Boolean value
    Boolean,
    /// Text string
    String,
    /// Lua table
    Table,
    /// Accepts any data kind
    #[default]
    Any,
}

impl PinKind {
    /// Check whether a connection between this kind and `other` is legal.
    ///
    /// This is the single compatibility relation used everywhere; call
    /// sites never compare kinds ad hoc.
    pub fn is_compatible_with(self, other: PinKind) -> bool {
        self == other || matches!(self, PinKind::Any) || matches!(other, PinKind::Any)
    }

    /// True for the control-flow kind.
    pub fn is_exec(self) -> bool {
        matches!(self, PinKind::Exec)
    }

    /// True for every data-carrying kind (everything except `Exec`).
    pub fn is_data(self) -> bool {
        !self.is_exec()
    }
}

/// Which side of a node a pin sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDirection {
    Input,
    Output,
}

/// A typed, directional connection point on a node.
///
/// Pin ids are unique within their owning node across both directions;
/// they are not globally unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    /// Identifier, stable within the owning node
    pub id: String,
    /// Human-readable label
    pub name: String,
    /// Input or output
    pub direction: PinDirection,
    /// Kind of value carried
    pub kind: PinKind,
    /// Default used when the pin is unconnected and carries no literal override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    /// Tooltip text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Pin {
    /// Create an input pin.
    pub fn input(id: impl Into<String>, name: impl Into<String>, kind: PinKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            direction: PinDirection::Input,
            kind,
            default_value: None,
            description: None,
        }
    }

    /// Create an output pin.
    pub fn output(id: impl Into<String>, name: impl Into<String>, kind: PinKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            direction: PinDirection::Output,
            kind,
            default_value: None,
            description: None,
        }
    }

    /// Set a default value for this pin.
    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Set a description for this pin.
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// Canvas position of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A node instance in a blueprint graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique id, generated as `<type>_<counter>` with a zero-padded
    /// per-type counter
    pub id: String,
    /// Node type (references a NodeTypeDefinition)
    #[serde(rename = "type")]
    pub node_type: String,
    /// Display title
    pub title: String,
    /// Canvas position
    pub position: Position,
    /// Input pins
    pub inputs: Vec<Pin>,
    /// Output pins
    pub outputs: Vec<Pin>,
    /// Property bag: type-specific configuration plus per-pin literal
    /// overrides keyed by pin id
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl Node {
    /// Find an input pin by id.
    pub fn input(&self, pin_id: &str) -> Option<&Pin> {
        self.inputs.iter().find(|p| p.id == pin_id)
    }

    /// Find an output pin by id.
    pub fn output(&self, pin_id: &str) -> Option<&Pin> {
        self.outputs.iter().find(|p| p.id == pin_id)
    }

    /// Find a pin by id on either side.
    pub fn pin(&self, pin_id: &str) -> Option<&Pin> {
        self.input(pin_id).or_else(|| self.output(pin_id))
    }

    /// The first exec output pin, if the node has one.
    pub fn first_exec_output(&self) -> Option<&Pin> {
        self.outputs.iter().find(|p| p.kind.is_exec())
    }

    /// Look up a property value.
    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    /// Look up a property value as a string.
    pub fn string_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }
}

/// Reference to one pin on one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinRef {
    pub node_id: String,
    pub pin_id: String,
}

impl PinRef {
    pub fn new(node_id: impl Into<String>, pin_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            pin_id: pin_id.into(),
        }
    }
}

/// A directed edge from an output pin to an input pin.
///
/// `kind` is cached at connect time: the input pin's kind, unless that is
/// `Any`, in which case the output pin's kind. The cache is a
/// denormalization: whichever component edits a pin's declared kind after
/// the fact is responsible for updating or deleting the affected
/// connections; the store does not re-validate them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub from: PinRef,
    pub to: PinRef,
    pub kind: PinKind,
}

impl Connection {
    /// Check if this connection touches a specific node.
    pub fn involves_node(&self, node_id: &str) -> bool {
        self.from.node_id == node_id || self.to.node_id == node_id
    }

    /// Check if this connection touches a specific pin.
    pub fn involves_pin(&self, pin: &PinRef) -> bool {
        self.from == *pin || self.to == *pin
    }
}

/// Serialized form of a whole graph: the round-trip payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphPayload {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
}
