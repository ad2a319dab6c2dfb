//! Generic, order-preserving document nodes and the accessors everything else is built on.
//!
//! A decoded document is a sequence of single-key entries. Element children keep
//! document order and repeated siblings stay separate entries, so setup, execution
//! and teardown steps come out in the order they were written.

use std::fmt;

/// Key under which leaf text content is stored inside an element.
pub const TEXT_KEY: &str = "#text";

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Num(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Seq(Vec<Node>),
    Scalar(Scalar),
}

impl NodeValue {
    pub fn as_seq(&self) -> Option<&[Node]> {
        match self {
            Self::Seq(nodes) => Some(nodes),
            Self::Scalar(_) => None,
        }
    }
}

/// One key→value entry of a decoded document.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub key: String,
    pub value: NodeValue,
}

impl Node {
    pub fn element(key: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            key: key.into(),
            value: NodeValue::Seq(children),
        }
    }

    /// An element wrapping a single text entry: `{ key: [{ "#text": text }] }`.
    pub fn text(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self::element(key, vec![Self::scalar(TEXT_KEY, Scalar::Str(text.into()))])
    }

    pub fn scalar(key: impl Into<String>, value: Scalar) -> Self {
        Self {
            key: key.into(),
            value: NodeValue::Scalar(value),
        }
    }

    pub fn children(&self) -> Option<&[Node]> {
        self.value.as_seq()
    }
}

/// First value stored under `key`, in document order.
pub fn first_value<'a>(nodes: &'a [Node], key: &str) -> Option<&'a NodeValue> {
    nodes.iter().find(|n| n.key == key).map(|n| &n.value)
}

/// Every value stored under `key`, in document order.
pub fn all_values<'a>(nodes: &'a [Node], key: &'a str) -> impl Iterator<Item = &'a NodeValue> + 'a {
    nodes.iter().filter(move |n| n.key == key).map(|n| &n.value)
}

/// Children of the first element stored under `key`.
pub fn first_children<'a>(nodes: &'a [Node], key: &str) -> Option<&'a [Node]> {
    first_value(nodes, key).and_then(NodeValue::as_seq)
}

/// Text content of a value.
///
/// Accepts the wrapped shape `[{ "#text": value }]` as well as a bare scalar.
/// Numbers and booleans are stringified.
pub fn inner_text(value: &NodeValue) -> Option<String> {
    match value {
        NodeValue::Scalar(s) => Some(s.to_string()),
        NodeValue::Seq(nodes) => nodes
            .iter()
            .find(|n| n.key == TEXT_KEY)
            .and_then(|n| match &n.value {
                NodeValue::Scalar(s) => Some(s.to_string()),
                NodeValue::Seq(_) => None,
            }),
    }
}

/// Resolve a dotted key path (`"VERDICT-RESULT.VERDICT"`) depth-first.
///
/// Each segment picks the first matching entry; resolution stops at the first
/// missing segment or at a scalar that still has segments left.
pub fn path_value<'a>(nodes: &'a [Node], path: &str) -> Option<&'a NodeValue> {
    let mut segments = path.split('.');
    let mut value = first_value(nodes, segments.next()?)?;
    for segment in segments {
        value = first_value(value.as_seq()?, segment)?;
    }
    Some(value)
}

pub fn path_text(nodes: &[Node], path: &str) -> Option<String> {
    path_value(nodes, path).and_then(inner_text)
}

/// All text below a value, joined with newlines. `None` when there is no text at all.
pub fn deep_text(value: &NodeValue) -> Option<String> {
    fn collect(value: &NodeValue, out: &mut Vec<String>) {
        match value {
            NodeValue::Scalar(s) => out.push(s.to_string()),
            NodeValue::Seq(nodes) => {
                for node in nodes {
                    collect(&node.value, out);
                }
            }
        }
    }

    let mut parts = Vec::new();
    collect(value, &mut parts);
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}
