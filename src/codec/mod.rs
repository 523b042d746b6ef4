//! Schema-driven codec engine
//!
//! The engine walks an [`ObjectNode`] tree in schema declaration order and
//! renders it as XML or JSON, and parses either format back into a tree,
//! resolving every name and value against the schema. Any structural or type
//! error aborts the whole operation; no partial tree is ever returned.

mod json;
mod xml;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{CodecError, Result};
use crate::object::ObjectNode;
use crate::schema::SchemaTree;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Interchange encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingFormat {
    Xml,
    Json,
}

impl fmt::Display for EncodingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingFormat::Xml => f.write_str("XML"),
            EncodingFormat::Json => f.write_str("JSON"),
        }
    }
}

impl FromStr for EncodingFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "xml" => Ok(EncodingFormat::Xml),
            "json" => Ok(EncodingFormat::Json),
            _ => Err(CodecError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Bidirectional transform between instance trees and encoded bytes
#[derive(Debug, Clone)]
pub struct CodecEngine {
    schema: Arc<SchemaTree>,
}

impl CodecEngine {
    pub fn new(schema: Arc<SchemaTree>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Arc<SchemaTree> {
        &self.schema
    }

    /// Encode a tree rooted at one of this engine's schema roots
    pub fn encode(&self, tree: &ObjectNode, format: EncodingFormat) -> Result<Vec<u8>> {
        if !self.schema.is_root(tree.schema()) {
            return Err(CodecError::RootMismatch(tree.schema().path().to_string()));
        }
        let bytes = match format {
            EncodingFormat::Xml => xml::encode(tree)?,
            EncodingFormat::Json => json::encode(tree)?,
        };
        tracing::debug!(
            root = tree.schema().name(),
            %format,
            len = bytes.len(),
            "encoded tree"
        );
        Ok(bytes)
    }

    /// Decode a payload into a fresh tree
    pub fn decode(&self, bytes: &[u8], format: EncodingFormat) -> Result<ObjectNode> {
        if bytes.starts_with(UTF8_BOM) {
            return Err(CodecError::Malformed {
                format,
                message: "byte order mark is not allowed".into(),
            });
        }
        let tree = match format {
            EncodingFormat::Xml => xml::decode(&self.schema, bytes)?,
            EncodingFormat::Json => json::decode(&self.schema, bytes)?,
        };
        tracing::debug!(
            root = tree.schema().name(),
            %format,
            len = bytes.len(),
            "decoded tree"
        );
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::SchemaNode;
    use crate::types::{Decimal64, Scalar, YangType};

    fn engine() -> CodecEngine {
        let isis = SchemaNode::container("Isis")
            .with_child(SchemaNode::leaf("enabled", YangType::Boolean))
            .with_child(
                SchemaNode::list("Interfaces", ["name"])
                    .with_child(SchemaNode::leaf("name", YangType::String))
                    .with_child(SchemaNode::leaf("metric", YangType::Int32)),
            );
        let other = SchemaNode::container("Other");
        CodecEngine::new(Arc::new(SchemaTree::new("isis", vec![isis, other]).unwrap()))
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("xml".parse::<EncodingFormat>().unwrap(), EncodingFormat::Xml);
        assert_eq!("JSON".parse::<EncodingFormat>().unwrap(), EncodingFormat::Json);
        let err = "cbor".parse::<EncodingFormat>().unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedFormat(ref name) if name == "cbor"));
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_encode_rejects_foreign_tree() {
        let engine = engine();
        let foreign = SchemaTree::new("isis", vec![SchemaNode::container("Isis")]).unwrap();
        let tree = foreign.create("Isis").unwrap();

        let err = engine.encode(&tree, EncodingFormat::Json).unwrap_err();
        assert!(matches!(err, CodecError::RootMismatch(_)));
    }

    #[test]
    fn test_decode_rejects_bom() {
        let engine = engine();
        let mut payload = UTF8_BOM.to_vec();
        payload.extend_from_slice(br#"{"Isis":{}}"#);

        let err = engine.decode(&payload, EncodingFormat::Json).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }

    #[test]
    fn test_decode_selects_root_by_name() {
        let engine = engine();
        let tree = engine.decode(b"<Other></Other>", EncodingFormat::Xml).unwrap();
        assert_eq!(tree.schema().name(), "Other");
    }

    #[test]
    fn test_decimal_renders_identically_in_both_formats() {
        let root = SchemaNode::container("Timers")
            .with_child(SchemaNode::leaf("hello", YangType::decimal64(2).unwrap()));
        let engine = CodecEngine::new(Arc::new(SchemaTree::new("t", vec![root]).unwrap()));
        let mut tree = engine.schema().create("Timers").unwrap();
        tree.set_leaf("hello", Decimal64::new(1050, 2)).unwrap();

        let json = engine.encode(&tree, EncodingFormat::Json).unwrap();
        assert_eq!(json, br#"{"Timers":{"hello":10.50}}"#);
        let xml = engine.encode(&tree, EncodingFormat::Xml).unwrap();
        assert_eq!(xml, b"<Timers><hello>10.50</hello></Timers>");

        let decoded = engine.decode(&json, EncodingFormat::Json).unwrap();
        assert_eq!(
            decoded.get_leaf("hello").unwrap(),
            Some(&Scalar::Decimal(Decimal64::new(1050, 2)))
        );
    }
}
