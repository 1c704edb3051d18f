//! JSON projection of retained nodes.
//!
//! The mapping is deliberately lossy: namespaces are dropped and only local
//! names are kept.
//!
//! - a text node becomes `{"#text": [text]}`;
//! - the top element gets `"_name"` set to its local name;
//! - each attribute becomes `"@local": value`;
//! - children are grouped by local name (or `"#text"` for text) into arrays
//!   in document order.

use serde_json::{Map, Value};

use crate::tree::{Element, Node};

const NAME_KEY: &str = "_name";
const TEXT_KEY: &str = "#text";

/// Projects a node onto a JSON object.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use xmlpluck::parser::{Parser, ParseOptions};
/// use xmlpluck::selector::PathSelector;
/// use xmlpluck::serial::json::to_value;
///
/// let xml = r#"<a id="1">hi<b>x</b><b>y</b></a>"#;
/// let mut parser = Parser::new(xml.as_bytes(), PathSelector::default(), ParseOptions::default());
/// let found = parser.next_match().unwrap().unwrap();
/// assert_eq!(
///     to_value(&found.into_element().into()),
///     json!({
///         "_name": "a",
///         "@id": "1",
///         "#text": ["hi"],
///         "b": [{"#text": ["x"]}, {"#text": ["y"]}],
///     })
/// );
/// ```
#[must_use]
pub fn to_value(node: &Node) -> Value {
    match node {
        Node::Text(text) => {
            let mut map = Map::new();
            map.insert(TEXT_KEY.to_string(), Value::Array(vec![Value::String(text.clone())]));
            Value::Object(map)
        }
        Node::Element(element) => project(element, true),
    }
}

/// Projects an element onto a JSON object, as [`to_value`] does for
/// [`Node::Element`].
#[must_use]
pub fn element_to_value(element: &Element) -> Value {
    project(element, true)
}

fn project(element: &Element, top: bool) -> Value {
    let mut map = Map::new();
    if top {
        map.insert(NAME_KEY.to_string(), Value::String(element.name.local.clone()));
    }
    for attr in &element.attributes {
        map.insert(format!("@{}", attr.name.local), Value::String(attr.value.clone()));
    }
    for child in &element.children {
        let (key, value) = match child {
            Node::Text(text) => (TEXT_KEY.to_string(), Value::String(text.clone())),
            Node::Element(e) => (e.name.local.clone(), project(e, false)),
        };
        let slot = map.entry(key).or_insert_with(|| Value::Array(Vec::new()));
        match slot {
            Value::Array(items) => items.push(value),
            // a child named like the `_name` key
            other => *other = Value::Array(vec![other.take(), value]),
        }
    }
    Value::Object(map)
}
