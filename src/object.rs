//! Typed, mutable instance trees
//!
//! An [`ObjectNode`] is one container or list entry, bound to the schema node
//! it instantiates. Every mutation is checked against that schema, so a tree
//! handed to the codec is always schema-valid.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{CodecError, Result};
use crate::schema::{NodeKind, SchemaNode};
use crate::types::Scalar;

#[derive(Debug, Clone, PartialEq)]
enum LeafSlot {
    Single(Scalar),
    Multi(Vec<Scalar>),
}

#[derive(Debug, Clone, Default)]
struct ListEntries {
    entries: Vec<ObjectNode>,
    keys: HashSet<Vec<Scalar>>,
}

impl PartialEq for ListEntries {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ChildSlot {
    Container(ObjectNode),
    List(ListEntries),
}

/// Instance of a container or list entry
#[derive(Debug, Clone)]
pub struct ObjectNode {
    schema: Arc<SchemaNode>,
    values: HashMap<String, LeafSlot>,
    children: HashMap<String, ChildSlot>,
}

fn kind_mismatch(schema: &SchemaNode, expected: &'static str) -> CodecError {
    CodecError::KindMismatch {
        path: schema.path().to_string(),
        expected,
        actual: schema.kind().as_str(),
    }
}

fn render_key(keys: &[String], values: &[Scalar]) -> String {
    keys.iter()
        .zip(values)
        .map(|(k, v)| format!("[{}='{}']", k, v))
        .collect()
}

impl ObjectNode {
    /// Create an empty instance of a container or list node.
    ///
    /// Non-presence child containers always exist and are created here;
    /// presence containers are created on demand by [`ObjectNode::container_mut`].
    pub fn new(schema: Arc<SchemaNode>) -> Result<Self> {
        if !schema.kind().is_interior() {
            return Err(kind_mismatch(&schema, "container or list"));
        }
        let mut children = HashMap::new();
        for child in schema.children() {
            if child.kind() == NodeKind::Container && !child.is_presence() {
                children.insert(
                    child.name().to_string(),
                    ChildSlot::Container(ObjectNode::new(Arc::clone(child))?),
                );
            }
        }
        Ok(Self {
            schema,
            values: HashMap::new(),
            children,
        })
    }

    /// Schema node this instance conforms to
    pub fn schema(&self) -> &Arc<SchemaNode> {
        &self.schema
    }

    fn field(&self, name: &str, expected: NodeKind) -> Result<&Arc<SchemaNode>> {
        let field = self
            .schema
            .child(name)
            .ok_or_else(|| CodecError::UnknownField {
                path: self.schema.path().to_string(),
                name: name.to_string(),
            })?;
        if field.kind() != expected {
            return Err(kind_mismatch(field, expected.as_str()));
        }
        Ok(field)
    }

    fn checked(field: &SchemaNode, value: Scalar) -> Result<Scalar> {
        // Leaf fields always carry a type once the tree is frozen
        let Some(ty) = field.yang_type() else {
            return Err(kind_mismatch(field, "leaf"));
        };
        ty.coerce(&value).ok_or_else(|| CodecError::TypeMismatch {
            path: field.path().to_string(),
            expected: ty.to_string(),
            actual: value.describe(),
        })
    }

    /// Set a leaf value, checked against the leaf's type
    pub fn set_leaf(&mut self, name: &str, value: impl Into<Scalar>) -> Result<()> {
        let field = self.field(name, NodeKind::Leaf)?;
        let value = Self::checked(field, value.into())?;
        self.values.insert(name.to_string(), LeafSlot::Single(value));
        Ok(())
    }

    /// Append a value to a leaf-list, preserving insertion order
    pub fn push_leaf(&mut self, name: &str, value: impl Into<Scalar>) -> Result<()> {
        let field = self.field(name, NodeKind::LeafList)?;
        let value = Self::checked(field, value.into())?;
        match self
            .values
            .entry(name.to_string())
            .or_insert_with(|| LeafSlot::Multi(Vec::new()))
        {
            LeafSlot::Multi(values) => values.push(value),
            LeafSlot::Single(_) => return Err(kind_mismatch(&self.schema, "leaf-list")),
        }
        Ok(())
    }

    /// Current leaf value, `None` when unset
    pub fn get_leaf(&self, name: &str) -> Result<Option<&Scalar>> {
        self.field(name, NodeKind::Leaf)?;
        Ok(match self.values.get(name) {
            Some(LeafSlot::Single(v)) => Some(v),
            _ => None,
        })
    }

    /// Leaf-list values in insertion order, empty when unset
    pub fn leaf_list(&self, name: &str) -> Result<&[Scalar]> {
        self.field(name, NodeKind::LeafList)?;
        Ok(match self.values.get(name) {
            Some(LeafSlot::Multi(values)) => values,
            _ => &[],
        })
    }

    /// Unset a leaf or leaf-list; returns whether anything was removed
    pub fn clear_leaf(&mut self, name: &str) -> Result<bool> {
        if self.field(name, NodeKind::LeafList).is_err() {
            self.field(name, NodeKind::Leaf)?;
        }
        Ok(self.values.remove(name).is_some())
    }

    /// Child container, `None` for an absent presence container
    pub fn container(&self, name: &str) -> Result<Option<&ObjectNode>> {
        self.field(name, NodeKind::Container)?;
        Ok(match self.children.get(name) {
            Some(ChildSlot::Container(node)) => Some(node),
            _ => None,
        })
    }

    /// Mutable child container, creating a presence container if needed
    pub fn container_mut(&mut self, name: &str) -> Result<&mut ObjectNode> {
        let field = Arc::clone(self.field(name, NodeKind::Container)?);
        let slot = match self.children.entry(name.to_string()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(ChildSlot::Container(ObjectNode::new(Arc::clone(&field))?)),
        };
        match slot {
            ChildSlot::Container(node) => Ok(node),
            ChildSlot::List(_) => Err(kind_mismatch(&field, "container")),
        }
    }

    /// Remove a presence container; returns whether it was present
    pub fn remove_container(&mut self, name: &str) -> Result<bool> {
        let field = self.field(name, NodeKind::Container)?;
        if !field.is_presence() {
            return Err(kind_mismatch(field, "presence container"));
        }
        Ok(self.children.remove(name).is_some())
    }

    /// Fresh, detached entry for the named list, to be filled and then added
    pub fn new_list_entry(&self, name: &str) -> Result<ObjectNode> {
        ObjectNode::new(Arc::clone(self.field(name, NodeKind::List)?))
    }

    /// Append an entry to a list. Entry order is preserved; key tuples must be unique.
    pub fn add_list_entry(&mut self, name: &str, entry: ObjectNode) -> Result<()> {
        let field = Arc::clone(self.field(name, NodeKind::List)?);
        if !Arc::ptr_eq(&field, &entry.schema) {
            return Err(CodecError::TypeMismatch {
                path: field.path().to_string(),
                expected: format!("entry of {}", field.path()),
                actual: format!("instance of {}", entry.schema.path()),
            });
        }

        let key = field
            .keys()
            .iter()
            .map(|k| match entry.values.get(k) {
                Some(LeafSlot::Single(v)) => Ok(v.clone()),
                _ => Err(CodecError::MissingKey {
                    path: field.path().to_string(),
                    key: k.clone(),
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        let slot = self
            .children
            .entry(name.to_string())
            .or_insert_with(|| ChildSlot::List(ListEntries::default()));
        let ChildSlot::List(list) = slot else {
            return Err(kind_mismatch(&field, "list"));
        };
        if list.keys.contains(&key) {
            return Err(CodecError::DuplicateKey {
                path: field.path().to_string(),
                key: render_key(field.keys(), &key),
            });
        }
        list.keys.insert(key);
        list.entries.push(entry);
        Ok(())
    }

    /// Instances under a child node: list entries in order, or the container
    /// itself as a one-element slice. Empty when nothing is present.
    pub fn children(&self, name: &str) -> Result<&[ObjectNode]> {
        let field = self
            .schema
            .child(name)
            .ok_or_else(|| CodecError::UnknownField {
                path: self.schema.path().to_string(),
                name: name.to_string(),
            })?;
        if !field.kind().is_interior() {
            return Err(kind_mismatch(field, "container or list"));
        }
        Ok(match self.children.get(name) {
            Some(ChildSlot::List(list)) => &list.entries,
            Some(ChildSlot::Container(node)) => std::slice::from_ref(node),
            None => &[],
        })
    }

    /// Look up a list entry by its key values, given in key order
    pub fn find_entry(&self, name: &str, key: &[Scalar]) -> Result<Option<&ObjectNode>> {
        let field = self.field(name, NodeKind::List)?;
        if key.len() != field.keys().len() {
            return Ok(None);
        }
        let mut canonical = Vec::with_capacity(key.len());
        for (k, v) in field.keys().iter().zip(key) {
            let Some(leaf) = field.child(k) else {
                return Ok(None);
            };
            match leaf.yang_type().and_then(|t| t.coerce(v)) {
                Some(v) => canonical.push(v),
                None => return Ok(None),
            }
        }
        Ok(self.children(name)?.iter().find(|entry| {
            field
                .keys()
                .iter()
                .zip(&canonical)
                .all(|(k, v)| matches!(entry.values.get(k), Some(LeafSlot::Single(s)) if s == v))
        }))
    }
}

impl PartialEq for ObjectNode {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.schema, &other.schema) || self.schema.path() == other.schema.path())
            && self.values == other.values
            && self.children == other.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::SchemaTree;
    use crate::types::YangType;

    fn isis_schema() -> SchemaTree {
        let root = SchemaNode::container("Isis")
            .with_child(SchemaNode::leaf("enabled", YangType::Boolean))
            .with_child(SchemaNode::leaf_list("tags", YangType::Uint16))
            .with_child(
                SchemaNode::list("Interfaces", ["name"])
                    .with_child(SchemaNode::leaf("name", YangType::String))
                    .with_child(SchemaNode::leaf("metric", YangType::Int32)),
            )
            .with_child(
                SchemaNode::container("Nsr")
                    .presence()
                    .with_child(SchemaNode::leaf("enabled", YangType::Boolean)),
            )
            .with_child(
                SchemaNode::container("Distribute")
                    .with_child(SchemaNode::leaf("level", YangType::enumeration(["level-1", "level-2"]))),
            )
            .with_child(
                SchemaNode::list("Adjacencies", ["id"]).with_child(SchemaNode::leaf(
                    "id",
                    YangType::Union(vec![YangType::Uint8, YangType::String]),
                )),
            );
        SchemaTree::new("isis", vec![root]).unwrap()
    }

    #[test]
    fn test_set_and_get_leaf() {
        let tree = isis_schema();
        let mut isis = tree.create("Isis").unwrap();

        assert_eq!(isis.get_leaf("enabled").unwrap(), None);
        isis.set_leaf("enabled", true).unwrap();
        assert_eq!(isis.get_leaf("enabled").unwrap(), Some(&Scalar::Bool(true)));
    }

    #[test]
    fn test_set_leaf_type_error() {
        let tree = isis_schema();
        let mut isis = tree.create("Isis").unwrap();

        let err = isis.set_leaf("enabled", "yes").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert!(err.to_string().contains("/Isis/enabled"));
    }

    #[test]
    fn test_set_leaf_unknown_field() {
        let tree = isis_schema();
        let mut isis = tree.create("Isis").unwrap();

        let err = isis.set_leaf("bogus", 1).unwrap_err();
        assert!(matches!(err, CodecError::UnknownField { ref name, .. } if name == "bogus"));
    }

    #[test]
    fn test_leaf_list_preserves_order() {
        let tree = isis_schema();
        let mut isis = tree.create("Isis").unwrap();

        for tag in [30u16, 10, 20] {
            isis.push_leaf("tags", tag).unwrap();
        }
        assert_eq!(
            isis.leaf_list("tags").unwrap(),
            &[Scalar::Uint(30), Scalar::Uint(10), Scalar::Uint(20)]
        );
        assert!(isis.push_leaf("tags", 70000).is_err());
        assert!(isis.set_leaf("tags", 1).is_err());
    }

    #[test]
    fn test_non_presence_containers_exist() {
        let tree = isis_schema();
        let mut isis = tree.create("Isis").unwrap();

        assert!(isis.container("Distribute").unwrap().is_some());
        assert!(isis.container("Nsr").unwrap().is_none());
        isis.container_mut("Nsr").unwrap().set_leaf("enabled", false).unwrap();
        assert_eq!(isis.children("Nsr").unwrap().len(), 1);
        assert!(isis.remove_container("Nsr").unwrap());
        assert!(isis.remove_container("Distribute").is_err());
    }

    #[test]
    fn test_enum_leaf_accepts_member_names_only() {
        let tree = isis_schema();
        let mut isis = tree.create("Isis").unwrap();
        let distribute = isis.container_mut("Distribute").unwrap();

        distribute.set_leaf("level", "level-2").unwrap();
        assert_eq!(
            distribute.get_leaf("level").unwrap(),
            Some(&Scalar::Enum("level-2".into()))
        );
        assert!(distribute.set_leaf("level", "level-3").is_err());
    }

    #[test]
    fn test_list_entries_keep_insertion_order() {
        let tree = isis_schema();
        let mut isis = tree.create("Isis").unwrap();

        for name in ["Gi0/2", "Gi0/0", "Gi0/1"] {
            let mut entry = isis.new_list_entry("Interfaces").unwrap();
            entry.set_leaf("name", name).unwrap();
            isis.add_list_entry("Interfaces", entry).unwrap();
        }
        let names: Vec<_> = isis
            .children("Interfaces")
            .unwrap()
            .iter()
            .map(|e| e.get_leaf("name").unwrap().unwrap().to_text())
            .collect();
        assert_eq!(names, ["Gi0/2", "Gi0/0", "Gi0/1"]);

        let found = isis
            .find_entry("Interfaces", &[Scalar::from("Gi0/0")])
            .unwrap()
            .unwrap();
        assert_eq!(found.get_leaf("name").unwrap(), Some(&Scalar::String("Gi0/0".into())));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let tree = isis_schema();
        let mut isis = tree.create("Isis").unwrap();

        let mut first = isis.new_list_entry("Interfaces").unwrap();
        first.set_leaf("name", "Gi0/0").unwrap();
        first.set_leaf("metric", 10).unwrap();
        isis.add_list_entry("Interfaces", first).unwrap();

        let mut second = isis.new_list_entry("Interfaces").unwrap();
        second.set_leaf("name", "Gi0/0").unwrap();
        second.set_leaf("metric", 20).unwrap();
        let err = isis.add_list_entry("Interfaces", second).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
        assert!(err.to_string().contains("[name='Gi0/0']"));
        assert_eq!(isis.children("Interfaces").unwrap().len(), 1);
    }

    #[test]
    fn test_union_keys_compare_by_value() {
        let tree = isis_schema();
        let mut isis = tree.create("Isis").unwrap();

        let mut first = isis.new_list_entry("Adjacencies").unwrap();
        first.set_leaf("id", "1").unwrap();
        assert_eq!(first.get_leaf("id").unwrap(), Some(&Scalar::Uint(1)));
        isis.add_list_entry("Adjacencies", first).unwrap();

        let mut second = isis.new_list_entry("Adjacencies").unwrap();
        second.set_leaf("id", 1u8).unwrap();
        let err = isis.add_list_entry("Adjacencies", second).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);

        assert!(isis.find_entry("Adjacencies", &[Scalar::from("1")]).unwrap().is_some());
    }

    #[test]
    fn test_list_entry_requires_keys() {
        let tree = isis_schema();
        let mut isis = tree.create("Isis").unwrap();

        let mut entry = isis.new_list_entry("Interfaces").unwrap();
        entry.set_leaf("metric", 10).unwrap();
        let err = isis.add_list_entry("Interfaces", entry).unwrap_err();
        assert!(matches!(err, CodecError::MissingKey { ref key, .. } if key == "name"));
    }

    #[test]
    fn test_structural_equality() {
        let tree = isis_schema();
        let mut a = tree.create("Isis").unwrap();
        let mut b = tree.create("Isis").unwrap();
        assert_eq!(a, b);

        a.set_leaf("enabled", true).unwrap();
        assert_ne!(a, b);
        b.set_leaf("enabled", true).unwrap();
        assert_eq!(a, b);
    }
}
