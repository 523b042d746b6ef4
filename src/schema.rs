//! Schema tree: read-only description of containers, lists and leafs
//!
//! A [`SchemaTree`] is built once (from builders or a JSON descriptor) and then
//! shared behind `Arc` by every operation. Freezing the tree computes each
//! node's absolute path and effective namespace and validates the structural
//! invariants, so nothing downstream has to re-check them.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{CodecError, Result};
use crate::object::ObjectNode;
use crate::types::YangType;

/// Kind of schema node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Container,
    List,
    Leaf,
    LeafList,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Container => "container",
            NodeKind::List => "list",
            NodeKind::Leaf => "leaf",
            NodeKind::LeafList => "leaf-list",
        }
    }

    /// Containers and lists hold child nodes, leafs and leaf-lists hold values
    pub fn is_interior(self) -> bool {
        matches!(self, NodeKind::Container | NodeKind::List)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single schema node
#[derive(Debug)]
pub struct SchemaNode {
    name: String,
    kind: NodeKind,
    yang_type: Option<YangType>,
    keys: Vec<String>,
    presence: bool,
    /// Declared namespace on builders, effective namespace once frozen
    namespace: Option<String>,
    path: String,
    children: Vec<Arc<SchemaNode>>,
    index: HashMap<String, usize>,
}

impl SchemaNode {
    fn with_kind(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            yang_type: None,
            keys: Vec::new(),
            presence: false,
            namespace: None,
            path: String::new(),
            children: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Container builder
    pub fn container(name: impl Into<String>) -> Self {
        Self::with_kind(name, NodeKind::Container)
    }

    /// List builder with its ordered key leaf names
    pub fn list<I, S>(name: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut node = Self::with_kind(name, NodeKind::List);
        node.keys = keys.into_iter().map(Into::into).collect();
        node
    }

    /// Leaf builder
    pub fn leaf(name: impl Into<String>, yang_type: YangType) -> Self {
        let mut node = Self::with_kind(name, NodeKind::Leaf);
        node.yang_type = Some(yang_type);
        node
    }

    /// Leaf-list builder
    pub fn leaf_list(name: impl Into<String>, yang_type: YangType) -> Self {
        let mut node = Self::with_kind(name, NodeKind::LeafList);
        node.yang_type = Some(yang_type);
        node
    }

    /// Append a child; children keep declaration order
    pub fn with_child(mut self, child: SchemaNode) -> Self {
        self.index.insert(child.name.clone(), self.children.len());
        self.children.push(Arc::new(child));
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Mark a container as presence-optional
    pub fn presence(mut self) -> Self {
        self.presence = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Leaf type, `None` for containers and lists
    pub fn yang_type(&self) -> Option<&YangType> {
        self.yang_type.as_ref()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_presence(&self) -> bool {
        self.presence
    }

    /// Effective namespace (declared or inherited from the parent)
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Absolute path, e.g. `/Isis/Interfaces/metric`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Children in schema declaration order
    pub fn children(&self) -> &[Arc<SchemaNode>] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&Arc<SchemaNode>> {
        self.index.get(name).map(|&i| &self.children[i])
    }

    fn freeze(&self, parent_path: &str, parent_namespace: Option<&str>) -> Result<SchemaNode> {
        if self.name.is_empty() || self.name.contains('/') {
            return Err(CodecError::InvalidSchema(format!(
                "invalid node name '{}' under '{}'",
                self.name, parent_path
            )));
        }
        let path = format!("{}/{}", parent_path, self.name);
        let namespace = self
            .namespace
            .clone()
            .or_else(|| parent_namespace.map(str::to_string));
        let invalid = |msg: &str| CodecError::InvalidSchema(format!("{}: {}", path, msg));

        match self.kind {
            NodeKind::Leaf | NodeKind::LeafList => {
                if self.yang_type.is_none() {
                    return Err(invalid("leaf node without a type"));
                }
                if !self.children.is_empty() {
                    return Err(invalid("leaf node cannot have children"));
                }
            }
            NodeKind::Container | NodeKind::List => {
                if self.yang_type.is_some() {
                    return Err(invalid("only leaf nodes carry a type"));
                }
            }
        }
        if self.presence && self.kind != NodeKind::Container {
            return Err(invalid("only containers can be presence containers"));
        }
        if self.kind != NodeKind::List && !self.keys.is_empty() {
            return Err(invalid("only lists declare keys"));
        }

        let mut children = Vec::with_capacity(self.children.len());
        let mut index = HashMap::with_capacity(self.children.len());
        for child in &self.children {
            if index.insert(child.name.clone(), children.len()).is_some() {
                return Err(invalid(&format!("duplicate child '{}'", child.name)));
            }
            children.push(Arc::new(child.freeze(&path, namespace.as_deref())?));
        }

        if self.kind == NodeKind::List {
            if self.keys.is_empty() {
                return Err(invalid("list must declare at least one key"));
            }
            for (i, key) in self.keys.iter().enumerate() {
                if self.keys[..i].contains(key) {
                    return Err(invalid(&format!("key '{}' declared twice", key)));
                }
                match index.get(key).map(|&i| children[i].kind) {
                    Some(NodeKind::Leaf) => {}
                    _ => return Err(invalid(&format!("key '{}' is not a child leaf", key))),
                }
            }
        }

        Ok(SchemaNode {
            name: self.name.clone(),
            kind: self.kind,
            yang_type: self.yang_type.clone(),
            keys: self.keys.clone(),
            presence: self.presence,
            namespace,
            path,
            children,
            index,
        })
    }
}

/// Immutable, validated schema tree
#[derive(Debug)]
pub struct SchemaTree {
    module: String,
    roots: Vec<Arc<SchemaNode>>,
}

/// Raw schema descriptor for deserialization
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSchema {
    module: String,
    namespace: Option<String>,
    nodes: Vec<RawNode>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNode {
    name: String,
    kind: NodeKind,
    #[serde(rename = "type")]
    node_type: Option<Value>,
    #[serde(rename = "fraction-digits")]
    fraction_digits: Option<u8>,
    #[serde(default)]
    keys: Vec<String>,
    #[serde(default)]
    presence: bool,
    namespace: Option<String>,
    #[serde(default)]
    children: Vec<RawNode>,
}

impl RawNode {
    fn into_node(self) -> Result<SchemaNode> {
        let mut node = SchemaNode::with_kind(self.name, self.kind);
        node.yang_type = match &self.node_type {
            Some(t) => Some(YangType::from_schema_type(t, self.fraction_digits)?),
            None => None,
        };
        node.keys = self.keys;
        node.presence = self.presence;
        node.namespace = self.namespace;
        for child in self.children {
            node = node.with_child(child.into_node()?);
        }
        Ok(node)
    }
}

impl SchemaTree {
    /// Freeze and validate a set of top-level containers
    pub fn new(module: impl Into<String>, roots: Vec<SchemaNode>) -> Result<Self> {
        let mut frozen: Vec<Arc<SchemaNode>> = Vec::with_capacity(roots.len());
        for root in &roots {
            if root.kind != NodeKind::Container {
                return Err(CodecError::InvalidSchema(format!(
                    "top-level node '{}' must be a container, found {}",
                    root.name, root.kind
                )));
            }
            if frozen.iter().any(|r| r.name == root.name) {
                return Err(CodecError::InvalidSchema(format!(
                    "duplicate top-level node '{}'",
                    root.name
                )));
            }
            frozen.push(Arc::new(root.freeze("", None)?));
        }
        Ok(Self {
            module: module.into(),
            roots: frozen,
        })
    }

    /// Parse a schema descriptor from the given path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Parse a schema descriptor from a JSON string
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawSchema = serde_json::from_str(content)?;
        let roots = raw
            .nodes
            .into_iter()
            .map(|n| {
                let mut node = n.into_node()?;
                if node.namespace.is_none() {
                    node.namespace = raw.namespace.clone();
                }
                Ok(node)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(raw.module, roots)
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn roots(&self) -> &[Arc<SchemaNode>] {
        &self.roots
    }

    pub fn root(&self, name: &str) -> Option<&Arc<SchemaNode>> {
        self.roots.iter().find(|r| r.name == name)
    }

    /// Whether `node` is one of this tree's own root nodes
    pub fn is_root(&self, node: &Arc<SchemaNode>) -> bool {
        self.roots.iter().any(|r| Arc::ptr_eq(r, node))
    }

    /// Resolve an absolute path such as `/Isis/Interfaces/metric`
    pub fn resolve(&self, path: &str) -> Result<Arc<SchemaNode>> {
        let unknown = || CodecError::UnknownPath(path.to_string());
        let mut parts = path.split('/').filter(|s| !s.is_empty());
        let mut current = self.root(parts.next().ok_or_else(unknown)?).ok_or_else(unknown)?;
        for part in parts {
            current = current.child(part).ok_or_else(unknown)?;
        }
        Ok(Arc::clone(current))
    }

    /// Create an empty instance tree for the named root container
    pub fn create(&self, root: &str) -> Result<ObjectNode> {
        let schema = self
            .root(root)
            .ok_or_else(|| CodecError::UnknownPath(format!("/{}", root)))?;
        ObjectNode::new(Arc::clone(schema))
    }
}

impl std::str::FromStr for SchemaTree {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_json_str(s)
    }
}
