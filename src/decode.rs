//! Decoding raw markup into generic nodes.
//!
//! XML goes through `roxmltree`; JSON is accepted in the order-preserving shape
//! `[{ "TAG": [ ...children ], ":@": { attrs } }, { "#text": value }]`.
//! Attributes are dropped: nothing in an ATX report is read from them.

use anyhow::{bail, Context as _};
use serde_json::Value;

use crate::node::{Node, NodeValue, Scalar, TEXT_KEY};

const JSON_ATTRS_KEY: &str = ":@";

/// Decode an XML document. The result holds a single entry for the root element.
pub fn from_xml(text: &str) -> anyhow::Result<Vec<Node>> {
    let document = roxmltree::Document::parse(text).context("Failed to decode XML")?;
    Ok(vec![element_node(document.root_element())])
}

fn element_node(element: roxmltree::Node<'_, '_>) -> Node {
    let mut children = Vec::new();
    for child in element.children() {
        if child.is_element() {
            children.push(element_node(child));
        } else if child.is_text() {
            let text = child.text().unwrap_or_default().trim();
            if !text.is_empty() {
                children.push(Node::scalar(TEXT_KEY, Scalar::Str(text.to_string())));
            }
        }
    }

    Node::element(element.tag_name().name(), children)
}

/// Decode a JSON dump in the order-preserving shape.
pub fn from_json(text: &str) -> anyhow::Result<Vec<Node>> {
    let value: Value = serde_json::from_str(text).context("Failed to decode JSON")?;
    match value {
        Value::Array(items) => json_sequence(&items),
        Value::Object(_) => json_sequence(std::slice::from_ref(&value)),
        other => bail!("Expected a JSON array of nodes, got {other}"),
    }
}

fn json_sequence(items: &[Value]) -> anyhow::Result<Vec<Node>> {
    let mut nodes = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(map) = item else {
            bail!("Expected a JSON object entry, got {item}");
        };
        for (key, value) in map.iter().filter(|(k, _)| k.as_str() != JSON_ATTRS_KEY) {
            let value = match value {
                Value::Array(children) => NodeValue::Seq(json_sequence(children)?),
                Value::String(s) => NodeValue::Scalar(Scalar::Str(s.clone())),
                Value::Number(n) => NodeValue::Scalar(Scalar::Num(n.as_f64().unwrap_or_default())),
                Value::Bool(b) => NodeValue::Scalar(Scalar::Bool(*b)),
                Value::Null => NodeValue::Seq(vec![]),
                Value::Object(_) => bail!("Nested object under '{key}' is not an ordered node sequence"),
            };
            nodes.push(Node {
                key: key.clone(),
                value,
            });
        }
    }
    Ok(nodes)
}
