//! The schema tree.
//!
//! Nodes live in an arena owned by [`Schema`] and are addressed by
//! [`NodeId`]. Every node knows its path from the root and its maximum
//! repetition and definition levels, computed top-down once at construction:
//!
//! * `r_level_max` is the number of REPEATED nodes on the path, self included.
//! * `d_level_max` is the number of OPTIONAL or REPEATED nodes on the path,
//!   self included.
mod definition;

pub use definition::*;

use std::fmt;

use ahash::RandomState;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::encodings::Encoding;
use crate::errors::Result;
use crate::types::{ConvertedType, LeafType, TypeTag};
use crate::Compression;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Repetition {
    Required,
    Optional,
    Repeated,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group {
        children: Vec<NodeId>,
        /// `LIST` or `MAP` annotation, if declared.
        converted: Option<ConvertedType>,
    },
    Leaf(LeafType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub id: NodeId,
    pub name: String,
    pub path: Vec<String>,
    pub parent: Option<NodeId>,
    pub repetition: Repetition,
    pub kind: NodeKind,
    pub r_level_max: u32,
    pub d_level_max: u32,
    pub encoding: Encoding,
    /// Page compression; `None` defers to the writer's default.
    pub compression: Option<Compression>,
}

impl SchemaNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn leaf(&self) -> Option<&LeafType> {
        match &self.kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            NodeKind::Group { .. } => None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Group { children, .. } => children,
            NodeKind::Leaf(_) => &[],
        }
    }

    pub fn is_repeated(&self) -> bool {
        self.repetition == Repetition::Repeated
    }

    /// Dotted path, e.g. `Name.Language.Code`.
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    nodes: Vec<SchemaNode>,
    roots: Vec<NodeId>,
    leaves: Vec<NodeId>,
    by_path: HashMap<String, NodeId, RandomState>,
}

impl Schema {
    pub fn new(definition: &SchemaDefinition) -> Result<Self> {
        if definition.is_empty() {
            return Err(schema_err!("schema has no fields"));
        }
        let mut schema = Schema {
            nodes: vec![],
            roots: vec![],
            leaves: vec![],
            by_path: HashMap::with_hasher(RandomState::new()),
        };
        schema.roots = schema.build_fields(definition, None)?;
        Ok(schema)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let definition: SchemaDefinition = serde_json::from_str(json)?;
        Self::new(&definition)
    }

    /// Adds `definition`'s fields below `parent` in declaration order. Nodes
    /// are pushed in pre-order, so the arena is the depth-first field list.
    fn build_fields(
        &mut self,
        definition: &SchemaDefinition,
        parent: Option<NodeId>,
    ) -> Result<Vec<NodeId>> {
        let mut ids = Vec::with_capacity(definition.len());
        for (name, field) in definition.iter() {
            ids.push(self.build_field(name, field, parent)?);
        }
        Ok(ids)
    }

    fn build_field(
        &mut self,
        name: &str,
        field: &FieldDefinition,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        let repetition = if field.repeated {
            Repetition::Repeated
        } else if field.optional {
            Repetition::Optional
        } else {
            Repetition::Required
        };

        let (mut path, mut r_level_max, mut d_level_max, parent_compression) = match parent {
            Some(p) => {
                let p = &self.nodes[p];
                (p.path.clone(), p.r_level_max, p.d_level_max, p.compression)
            }
            None => (vec![], 0, 0, None),
        };
        path.push(name.to_owned());
        if repetition == Repetition::Repeated {
            r_level_max += 1;
        }
        if repetition != Repetition::Required {
            d_level_max += 1;
        }

        let tag = field
            .type_
            .as_deref()
            .map(str::parse::<TypeTag>)
            .transpose()?;

        let kind = match &field.fields {
            Some(fields) => {
                if fields.is_empty() {
                    return Err(schema_err!("group {} has no fields", path.join(".")));
                }
                let converted = match tag {
                    None => None,
                    Some(TypeTag::Converted(c @ (ConvertedType::List | ConvertedType::Map))) => {
                        Some(c)
                    }
                    Some(other) => {
                        return Err(schema_err!(
                            "group {} cannot have type {}",
                            path.join("."),
                            other
                        ))
                    }
                };
                NodeKind::Group {
                    children: vec![],
                    converted,
                }
            }
            None => {
                let tag = tag.ok_or_else(|| {
                    schema_err!("field {} declares neither a type nor fields", path.join("."))
                })?;
                NodeKind::Leaf(LeafType::new(
                    tag,
                    field.type_length,
                    field.precision,
                    field.scale,
                )?)
            }
        };

        let id = self.nodes.len();
        let key = path.join(".");
        let is_leaf = matches!(kind, NodeKind::Leaf(_));
        self.nodes.push(SchemaNode {
            id,
            name: name.to_owned(),
            path,
            parent,
            repetition,
            kind,
            r_level_max,
            d_level_max,
            encoding: field.encoding.unwrap_or_default(),
            compression: field.compression.or(parent_compression),
        });
        self.by_path.insert(key, id);

        if is_leaf {
            self.leaves.push(id);
        } else if let Some(fields) = &field.fields {
            let children = self.build_fields(fields, Some(id))?;
            if let NodeKind::Group { children: c, .. } = &mut self.nodes[id].kind {
                *c = children;
            }
        }
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id]
    }

    /// All nodes in depth-first declaration order.
    pub fn field_list(&self) -> &[SchemaNode] {
        &self.nodes
    }

    pub fn roots(&self) -> impl Iterator<Item = &SchemaNode> {
        self.roots.iter().map(|id| &self.nodes[*id])
    }

    pub fn root_ids(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn leaves(&self) -> impl Iterator<Item = &SchemaNode> {
        self.leaves.iter().map(|id| &self.nodes[*id])
    }

    pub fn leaf_ids(&self) -> &[NodeId] {
        &self.leaves
    }

    /// Position of leaf `id` among the leaves. Leaves are created in
    /// increasing id order, so the list is sorted.
    pub fn column_index(&self, id: NodeId) -> Option<usize> {
        self.leaves.binary_search(&id).ok()
    }

    pub fn num_columns(&self) -> usize {
        self.leaves.len()
    }

    /// Looks a node up by its dotted path.
    pub fn find_field(&self, path: &str) -> Option<&SchemaNode> {
        self.by_path.get(path).map(|id| &self.nodes[*id])
    }

    /// The nodes from the root down to `id`, inclusive.
    pub fn branch(&self, id: NodeId) -> Vec<&SchemaNode> {
        let mut branch = vec![];
        let mut current = Some(id);
        while let Some(id) = current {
            let node = &self.nodes[id];
            branch.push(node);
            current = node.parent;
        }
        branch.reverse();
        branch
    }

    /// The nodes from the root down to the node at `path`, inclusive.
    pub fn find_field_branch(&self, path: &str) -> Option<Vec<&SchemaNode>> {
        self.by_path.get(path).map(|id| self.branch(*id))
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            let indent = "  ".repeat(node.path.len() - 1);
            let type_name = match &node.kind {
                NodeKind::Leaf(leaf) => leaf.name(),
                NodeKind::Group { converted: Some(c), .. } => c.name(),
                NodeKind::Group { .. } => "group",
            };
            writeln!(
                f,
                "{indent}{:?} {} {} (r={}, d={})",
                node.repetition, type_name, node.name, node.r_level_max, node.d_level_max
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::types::PhysicalType;

    #[test]
    fn test_levels() {
        let schema = Schema::from_json(
            r#"{
                "a": { "type": "INT64" },
                "b": { "optional": true, "fields": {
                    "c": { "type": "UTF8", "repeated": true },
                    "d": { "repeated": true, "fields": {
                        "e": { "type": "DOUBLE", "optional": true }
                    }}
                }}
            }"#,
        )
        .unwrap();

        let levels = |path: &str| {
            let n = schema.find_field(path).unwrap();
            (n.r_level_max, n.d_level_max)
        };
        assert_eq!(levels("a"), (0, 0));
        assert_eq!(levels("b"), (0, 1));
        assert_eq!(levels("b.c"), (1, 2));
        assert_eq!(levels("b.d"), (1, 2));
        assert_eq!(levels("b.d.e"), (1, 3));

        let leaves: Vec<_> = schema.leaves().map(|n| n.path_string()).collect();
        assert_eq!(leaves, vec!["a", "b.c", "b.d.e"]);

        let branch: Vec<_> = schema
            .find_field_branch("b.d.e")
            .unwrap()
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(branch, vec!["b", "d", "e"]);
        assert_eq!(
            schema.find_field("a").unwrap().leaf().unwrap().physical,
            PhysicalType::Int64
        );
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(
            Schema::from_json(r#"{ "a": { "fields": {} } }"#),
            Err(Error::InvalidSchema(_))
        ));
        assert!(matches!(
            Schema::from_json(r#"{ "a": { "type": "NOPE" } }"#),
            Err(Error::UnsupportedType(_))
        ));
        assert!(matches!(
            Schema::from_json(r#"{ "a": { "optional": true } }"#),
            Err(Error::InvalidSchema(_))
        ));
        assert!(matches!(
            Schema::from_json(r#"{ "a": { "type": "LIST" } }"#),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_list_helper_levels() {
        let def = SchemaDefinition::new().field("ids", scalar_list_field("INT32", true));
        let schema = Schema::new(&def).unwrap();
        let element = schema.find_field("ids.list.element").unwrap();
        assert_eq!((element.r_level_max, element.d_level_max), (1, 3));
        assert!(matches!(
            schema.find_field("ids").unwrap().kind,
            NodeKind::Group {
                converted: Some(ConvertedType::List),
                ..
            }
        ));
    }

    #[test]
    fn test_compression_inherited() {
        let schema = Schema::from_json(
            r#"{ "g": { "compression": "ZSTD", "fields": { "x": { "type": "INT32" } } } }"#,
        )
        .unwrap();
        assert_eq!(
            schema.find_field("g.x").unwrap().compression,
            Some(Compression::Zstd)
        );
    }
}
