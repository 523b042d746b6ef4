//! JSON rendering of instance trees
//!
//! The document is an object with a single member named after the root
//! container. Lists render as arrays of objects, leaf-lists as arrays of
//! scalars, empty leafs as `[null]`.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use serde_json::value::RawValue;

use super::EncodingFormat;
use crate::error::{CodecError, Result};
use crate::object::ObjectNode;
use crate::schema::{NodeKind, SchemaNode, SchemaTree};
use crate::types::Scalar;

fn malformed(message: impl ToString) -> CodecError {
    CodecError::Malformed {
        format: EncodingFormat::Json,
        message: message.to_string(),
    }
}

struct Document<'a>(&'a ObjectNode);

impl Serialize for Document<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0.schema().name(), &JsonNode(self.0))?;
        map.end()
    }
}

struct JsonNode<'a>(&'a ObjectNode);

impl Serialize for JsonNode<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let node = self.0;
        let mut map = serializer.serialize_map(None)?;
        for field in node.schema().children() {
            let name = field.name();
            match field.kind() {
                NodeKind::Leaf => {
                    if let Some(value) = node.get_leaf(name).map_err(S::Error::custom)? {
                        map.serialize_entry(name, &JsonScalar(value))?;
                    }
                }
                NodeKind::LeafList => {
                    let values = node.leaf_list(name).map_err(S::Error::custom)?;
                    if !values.is_empty() {
                        let values: Vec<JsonScalar<'_>> = values.iter().map(JsonScalar).collect();
                        map.serialize_entry(name, &values)?;
                    }
                }
                NodeKind::Container => {
                    if let Some(child) = node.container(name).map_err(S::Error::custom)? {
                        map.serialize_entry(name, &JsonNode(child))?;
                    }
                }
                NodeKind::List => {
                    let entries = node.children(name).map_err(S::Error::custom)?;
                    if !entries.is_empty() {
                        let entries: Vec<JsonNode<'_>> = entries.iter().map(JsonNode).collect();
                        map.serialize_entry(name, &entries)?;
                    }
                }
            }
        }
        map.end()
    }
}

struct JsonScalar<'a>(&'a Scalar);

impl Serialize for JsonScalar<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Int(n) => serializer.serialize_i64(*n),
            Scalar::Uint(n) => serializer.serialize_u64(*n),
            // Bare number with exactly fraction-digits digits
            Scalar::Decimal(d) => RawValue::from_string(d.to_string())
                .map_err(S::Error::custom)?
                .serialize(serializer),
            Scalar::String(s) | Scalar::Enum(s) => serializer.serialize_str(s),
            Scalar::Binary(_) => serializer.serialize_str(&self.0.to_text()),
            Scalar::Empty => [()].serialize(serializer),
        }
    }
}

pub(super) fn encode(tree: &ObjectNode) -> Result<Vec<u8>> {
    serde_json::to_vec(&Document(tree)).map_err(malformed)
}

/// Members of one JSON object in document order. A repeated member name is
/// a deserialization error rather than last-one-wins.
struct Members(Vec<(String, Box<RawValue>)>);

impl<'de> Deserialize<'de> for Members {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct MembersVisitor;

        impl<'de> Visitor<'de> for MembersVisitor {
            type Value = Members;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Members, A::Error> {
                let mut seen = HashSet::new();
                let mut members = Vec::new();
                while let Some(name) = map.next_key::<String>()? {
                    if !seen.insert(name.clone()) {
                        return Err(de::Error::custom(format!("duplicate member '{}'", name)));
                    }
                    let value: Box<RawValue> = map.next_value()?;
                    members.push((name, value));
                }
                Ok(Members(members))
            }
        }

        deserializer.deserialize_map(MembersVisitor)
    }
}

/// Parse a JSON value, rejecting objects that repeat a member name
fn parse_strict(raw: &RawValue) -> Result<Value> {
    let text = raw.get().trim_start();
    if text.starts_with('{') {
        let Members(members) = serde_json::from_str(text).map_err(malformed)?;
        let mut object = Map::new();
        for (name, value) in members {
            object.insert(name, parse_strict(&value)?);
        }
        Ok(Value::Object(object))
    } else if text.starts_with('[') {
        let items: Vec<Box<RawValue>> = serde_json::from_str(text).map_err(malformed)?;
        items
            .iter()
            .map(|item| parse_strict(item))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    } else {
        serde_json::from_str(text).map_err(malformed)
    }
}

pub(super) fn decode(schema: &SchemaTree, bytes: &[u8]) -> Result<ObjectNode> {
    let raw: Box<RawValue> = serde_json::from_slice(bytes).map_err(malformed)?;
    let document = parse_strict(&raw)?;
    let Value::Object(members) = document else {
        return Err(malformed("top-level value must be an object"));
    };
    if members.len() != 1 {
        return Err(malformed(format!(
            "expected exactly one root member, found {}",
            members.len()
        )));
    }
    let Some((name, body)) = members.into_iter().next() else {
        return Err(malformed("missing root member"));
    };
    let root = schema.root(&name).ok_or_else(|| CodecError::UnknownField {
        path: "/".into(),
        name: name.clone(),
    })?;

    let mut tree = ObjectNode::new(Arc::clone(root))?;
    decode_members(&mut tree, &body)?;
    Ok(tree)
}

fn shape_error(field: &SchemaNode, expected: &str, value: &Value) -> CodecError {
    CodecError::Conversion {
        path: field.path().to_string(),
        expected: expected.to_string(),
        value: value.to_string(),
    }
}

fn decode_scalar(field: &SchemaNode, value: &Value) -> Result<Scalar> {
    field
        .yang_type()
        .and_then(|t| t.parse_json(value))
        .ok_or_else(|| {
            let expected = field
                .yang_type()
                .map(|t| t.to_string())
                .unwrap_or_else(|| field.kind().to_string());
            shape_error(field, &expected, value)
        })
}

fn decode_members(node: &mut ObjectNode, value: &Value) -> Result<()> {
    let Value::Object(members) = value else {
        return Err(shape_error(node.schema(), "object", value));
    };
    for (name, value) in members {
        let field = node
            .schema()
            .child(name)
            .cloned()
            .ok_or_else(|| CodecError::UnknownField {
                path: node.schema().path().to_string(),
                name: name.clone(),
            })?;
        match field.kind() {
            NodeKind::Leaf => node.set_leaf(name, decode_scalar(&field, value)?)?,
            NodeKind::LeafList => {
                let Value::Array(items) = value else {
                    return Err(shape_error(&field, "array", value));
                };
                for item in items {
                    node.push_leaf(name, decode_scalar(&field, item)?)?;
                }
            }
            NodeKind::Container => decode_members(node.container_mut(name)?, value)?,
            NodeKind::List => {
                let Value::Array(items) = value else {
                    return Err(shape_error(&field, "array", value));
                };
                for item in items {
                    let mut entry = ObjectNode::new(Arc::clone(&field))?;
                    decode_members(&mut entry, item)?;
                    node.add_list_entry(name, entry)?;
                }
            }
        }
    }
    Ok(())
}
