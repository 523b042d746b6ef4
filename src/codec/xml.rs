//! XML rendering of instance trees
//!
//! Each container, list entry and leaf becomes one element named after its
//! schema node; list entries and leaf-list values repeat the element in
//! order. `xmlns` is written only where the namespace changes.

use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Writer};

use super::EncodingFormat;
use crate::error::{CodecError, Result};
use crate::object::ObjectNode;
use crate::schema::{NodeKind, SchemaNode, SchemaTree};
use crate::types::Scalar;

fn malformed(message: impl Display) -> CodecError {
    CodecError::Malformed {
        format: EncodingFormat::Xml,
        message: message.to_string(),
    }
}

pub(super) fn encode(tree: &ObjectNode) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    write_node(&mut writer, tree, None)?;
    Ok(writer.into_inner())
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer.write_event(event).map_err(malformed)
}

fn start_tag<'a>(schema: &'a SchemaNode, parent_namespace: Option<&str>) -> BytesStart<'a> {
    let mut start = BytesStart::new(schema.name());
    if let Some(ns) = schema.namespace() {
        if Some(ns) != parent_namespace {
            start.push_attribute(("xmlns", ns));
        }
    }
    start
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    node: &ObjectNode,
    parent_namespace: Option<&str>,
) -> Result<()> {
    let schema = node.schema();
    emit(writer, Event::Start(start_tag(schema, parent_namespace)))?;
    for field in schema.children() {
        let name = field.name();
        match field.kind() {
            NodeKind::Leaf => {
                if let Some(value) = node.get_leaf(name)? {
                    write_leaf(writer, field, value, schema.namespace())?;
                }
            }
            NodeKind::LeafList => {
                for value in node.leaf_list(name)? {
                    write_leaf(writer, field, value, schema.namespace())?;
                }
            }
            NodeKind::Container | NodeKind::List => {
                for child in node.children(name)? {
                    write_node(writer, child, schema.namespace())?;
                }
            }
        }
    }
    emit(writer, Event::End(BytesEnd::new(schema.name())))
}

fn write_leaf(
    writer: &mut Writer<Vec<u8>>,
    field: &SchemaNode,
    value: &Scalar,
    parent_namespace: Option<&str>,
) -> Result<()> {
    let start = start_tag(field, parent_namespace);
    if let Scalar::Empty = value {
        return emit(writer, Event::Empty(start));
    }
    let text = value.to_text();
    emit(writer, Event::Start(start))?;
    emit(writer, Event::Text(BytesText::new(&text)))?;
    emit(writer, Event::End(BytesEnd::new(field.name())))
}

/// Parsed element, before schema resolution
#[derive(Debug, Default)]
struct Element {
    name: String,
    /// Namespace in scope for the element, from a prefix or a default `xmlns`
    namespace: Option<String>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn open(start: &BytesStart<'_>, resolved: ResolveResult<'_>) -> Result<Self> {
        let name = std::str::from_utf8(start.local_name().as_ref())
            .map_err(malformed)?
            .to_string();
        let namespace = match resolved {
            ResolveResult::Bound(ns) => {
                Some(std::str::from_utf8(ns.as_ref()).map_err(malformed)?.to_string())
            }
            ResolveResult::Unbound => None,
            ResolveResult::Unknown(prefix) => {
                return Err(malformed(format!(
                    "undeclared namespace prefix '{}' on '{}'",
                    String::from_utf8_lossy(&prefix),
                    name
                )));
            }
        };
        Ok(Self {
            name,
            namespace,
            ..Default::default()
        })
    }
}

fn close(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

fn append_text(stack: &mut [Element], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(element) => element.text.push_str(text),
        None if text.trim().is_empty() => {}
        None => return Err(malformed("text outside the root element")),
    }
    Ok(())
}

fn parse_document(bytes: &[u8]) -> Result<Element> {
    let mut reader = NsReader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position();
        match reader.read_resolved_event_into(&mut buf) {
            Err(e) => return Err(malformed(format!("at byte {}: {}", position, e))),
            Ok((resolved, Event::Start(start))) => {
                if root.is_some() {
                    return Err(malformed("content after the root element"));
                }
                stack.push(Element::open(&start, resolved)?);
            }
            Ok((resolved, Event::Empty(start))) => {
                if root.is_some() {
                    return Err(malformed("content after the root element"));
                }
                let element = Element::open(&start, resolved)?;
                close(&mut stack, &mut root, element);
            }
            Ok((_, Event::End(_))) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed("unbalanced end tag"))?;
                close(&mut stack, &mut root, element);
            }
            Ok((_, Event::Text(text))) => {
                let text = text.unescape().map_err(malformed)?;
                append_text(&mut stack, &text)?;
            }
            Ok((_, Event::CData(data))) => {
                let data = data.into_inner();
                let text = std::str::from_utf8(&data).map_err(malformed)?;
                append_text(&mut stack, text)?;
            }
            Ok((_, Event::Eof)) => break,
            // Declarations, comments, processing instructions
            Ok(_) => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(malformed(format!("element '{}' is never closed", open.name)));
    }
    root.ok_or_else(|| malformed("document has no root element"))
}

pub(super) fn decode(schema: &SchemaTree, bytes: &[u8]) -> Result<ObjectNode> {
    let document = parse_document(bytes)?;
    let root = schema
        .root(&document.name)
        .ok_or_else(|| CodecError::UnknownField {
            path: "/".into(),
            name: document.name.clone(),
        })?;
    check_namespace(&document, root, "/")?;

    let mut tree = ObjectNode::new(Arc::clone(root))?;
    decode_element(&mut tree, &document)?;
    Ok(tree)
}

/// A namespace in scope, declared on the element or inherited, must match
/// the schema's namespace for the node. Elements outside any namespace are
/// matched by name only.
fn check_namespace(element: &Element, field: &SchemaNode, parent_path: &str) -> Result<()> {
    match &element.namespace {
        Some(declared) if Some(declared.as_str()) != field.namespace() => {
            Err(CodecError::UnknownField {
                path: parent_path.to_string(),
                name: format!("{{{}}}{}", declared, element.name),
            })
        }
        _ => Ok(()),
    }
}

fn decode_scalar(field: &SchemaNode, element: &Element) -> Result<Scalar> {
    if !element.children.is_empty() {
        return Err(malformed(format!("leaf {} has child elements", field.path())));
    }
    let Some(ty) = field.yang_type() else {
        return Err(malformed(format!("{} is not a leaf", field.path())));
    };
    ty.parse_text(&element.text)
        .ok_or_else(|| CodecError::Conversion {
            path: field.path().to_string(),
            expected: ty.to_string(),
            value: format!("'{}'", element.text),
        })
}

fn decode_element(node: &mut ObjectNode, element: &Element) -> Result<()> {
    if !element.text.trim().is_empty() {
        return Err(malformed(format!(
            "unexpected text in {}",
            node.schema().path()
        )));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for child in &element.children {
        let field = node
            .schema()
            .child(&child.name)
            .cloned()
            .ok_or_else(|| CodecError::UnknownField {
                path: node.schema().path().to_string(),
                name: child.name.clone(),
            })?;
        check_namespace(child, &field, node.schema().path())?;

        let single = matches!(field.kind(), NodeKind::Leaf | NodeKind::Container);
        if single && !seen.insert(child.name.as_str()) {
            return Err(malformed(format!("{} appears more than once", field.path())));
        }

        match field.kind() {
            NodeKind::Leaf => node.set_leaf(&child.name, decode_scalar(&field, child)?)?,
            NodeKind::LeafList => node.push_leaf(&child.name, decode_scalar(&field, child)?)?,
            NodeKind::Container => decode_element(node.container_mut(&child.name)?, child)?,
            NodeKind::List => {
                let mut entry = ObjectNode::new(Arc::clone(&field))?;
                decode_element(&mut entry, child)?;
                node.add_list_entry(&child.name, entry)?;
            }
        }
    }
    Ok(())
}
