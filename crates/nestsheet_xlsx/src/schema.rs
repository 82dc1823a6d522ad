//! Representative schema derivation and leaf counting.

use serde_json::{Map, Value};

use crate::spec::{RenderError, Result};

/// Closed set of value shapes the flattener dispatches on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueShape<'a> {
    /// Scalar (string, number, bool, null).
    Scalar(&'a Value),
    /// Non-array object.
    Nested(&'a Map<String, Value>),
    /// Array with no elements.
    EmptyArray,
    /// Non-empty array with at least one element that is not an object.
    ScalarArray(&'a [Value]),
    /// Non-empty array whose every element is an object.
    RecordArray(&'a [Value]),
}

impl<'a> ValueShape<'a> {
    /// Classify a value once.
    pub fn of(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => ValueShape::Nested(map),
            Value::Array(items) if items.is_empty() => ValueShape::EmptyArray,
            Value::Array(items) if items.iter().all(Value::is_object) => {
                ValueShape::RecordArray(items)
            }
            Value::Array(items) => ValueShape::ScalarArray(items),
            _ => ValueShape::Scalar(value),
        }
    }

    /// Tag without the borrowed payload.
    pub fn tag(&self) -> EnumShapeTag {
        match self {
            ValueShape::Scalar(_) => EnumShapeTag::Scalar,
            ValueShape::Nested(_) => EnumShapeTag::Nested,
            ValueShape::EmptyArray => EnumShapeTag::EmptyArray,
            ValueShape::ScalarArray(_) => EnumShapeTag::ScalarArray,
            ValueShape::RecordArray(_) => EnumShapeTag::RecordArray,
        }
    }
}

/// Shape recorded on a schema node when it is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumShapeTag {
    /// Scalar value.
    Scalar,
    /// Nested object.
    Nested,
    /// Empty array (placeholder column).
    EmptyArray,
    /// Array rendered as a vertical run.
    ScalarArray,
    /// Array of objects (promoted or transposed).
    RecordArray,
}

/// Node of the representative schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    /// One leaf column.
    Leaf {
        /// Key name (header label).
        key: String,
        /// Shape of the sample value.
        shape: EnumShapeTag,
    },
    /// Banner over the leaves of its children.
    Branch {
        /// Key name (banner label).
        key: String,
        /// Shape of the sample value (`Nested` or `RecordArray`).
        shape: EnumShapeTag,
        /// Children in key order.
        children: Vec<SchemaNode>,
    },
}

impl SchemaNode {
    /// Key name of the node.
    pub fn key(&self) -> &str {
        match self {
            SchemaNode::Leaf { key, .. } | SchemaNode::Branch { key, .. } => key,
        }
    }

    /// Shape tag of the node.
    pub fn shape(&self) -> EnumShapeTag {
        match self {
            SchemaNode::Leaf { shape, .. } | SchemaNode::Branch { shape, .. } => *shape,
        }
    }

    /// Children in key order; empty for a leaf.
    pub fn children(&self) -> &[SchemaNode] {
        match self {
            SchemaNode::Leaf { .. } => &[],
            SchemaNode::Branch { children, .. } => children,
        }
    }

    /// Whether the node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, SchemaNode::Leaf { .. })
    }

    /// Number of leaf columns reachable from this node.
    pub fn leaf_count(&self) -> usize {
        match self {
            SchemaNode::Leaf { .. } => 1,
            SchemaNode::Branch { children, .. } => children.iter().map(Self::leaf_count).sum(),
        }
    }

    /// Leaf key paths (`a.b.c`) in column order.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut l_paths = Vec::with_capacity(self.leaf_count());
        for child in self.children() {
            collect_leaf_paths(child, "", &mut l_paths);
        }
        l_paths
    }
}

fn collect_leaf_paths(node: &SchemaNode, prefix: &str, out: &mut Vec<String>) {
    let c_path = join_path(prefix, node.key());
    match node {
        SchemaNode::Leaf { .. } => out.push(c_path),
        SchemaNode::Branch { children, .. } => {
            for child in children {
                collect_leaf_paths(child, &c_path, out);
            }
        }
    }
}

/// Join a dotted key path.
pub fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Derive the sheet schema from a sample object (first record or explicit
/// header schema).
///
/// Arrays collapse to their first element (recursively), or to a placeholder
/// leaf when empty. A nested empty object becomes one blank leaf column. The
/// root must span at least one leaf.
pub fn derive_schema(sample: &Map<String, Value>) -> Result<SchemaNode> {
    if sample.is_empty() {
        return Err(RenderError::EmptySchema {
            path: String::new(),
        });
    }
    Ok(SchemaNode::Branch {
        key: String::new(),
        shape: EnumShapeTag::Nested,
        children: derive_children(sample),
    })
}

fn derive_children(map: &Map<String, Value>) -> Vec<SchemaNode> {
    map.iter()
        .map(|(key, value)| derive_node(key, value))
        .collect()
}

fn derive_node(key: &str, value: &Value) -> SchemaNode {
    let shape = ValueShape::of(value);
    let tag = shape.tag();
    match collapse_representative(value) {
        Value::Object(map) if !map.is_empty() => SchemaNode::Branch {
            key: key.to_string(),
            shape: tag,
            children: derive_children(map),
        },
        _ => SchemaNode::Leaf {
            key: key.to_string(),
            shape: tag,
        },
    }
}

/// Representative element of a value: arrays collapse to their first element
/// until a non-array is reached. Empty arrays have no representative and
/// render as a placeholder leaf.
pub(crate) fn collapse_representative(value: &Value) -> &Value {
    static VALUE_PLACEHOLDER: Value = Value::Null;

    let mut current = value;
    while let Value::Array(items) = current {
        match items.first() {
            Some(first) => current = first,
            None => return &VALUE_PLACEHOLDER,
        }
    }
    current
}
