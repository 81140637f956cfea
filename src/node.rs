use std::any::Any;
use std::rc::Rc;

use chrono::{DateTime, FixedOffset};

use crate::{
    CollectionStyle, Mark, ScalarStyle, DEFAULT_MAPPING_TAG, DEFAULT_SEQUENCE_TAG, BINARY_TAG,
    BOOL_TAG, FLOAT_TAG, INT_TAG, NULL_TAG, STR_TAG, TIMESTAMP_TAG,
};

/// The three node kinds, as seen by the resolver.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NodeKind {
    Scalar,
    Sequence,
    Mapping,
}

/// A typed scalar value.
///
/// `Other` carries a value produced by a user-registered constructor; it is
/// opaque to the library and compares equal only to itself.
#[derive(Clone)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Timestamp(DateTime<FixedOffset>),
    String(String),
    Other(Rc<dyn Any>),
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScalarValue::Null, ScalarValue::Null) => true,
            (ScalarValue::Bool(a), ScalarValue::Bool(b)) => a == b,
            (ScalarValue::Int(a), ScalarValue::Int(b)) => a == b,
            (ScalarValue::Float(a), ScalarValue::Float(b)) => a == b,
            (ScalarValue::Bytes(a), ScalarValue::Bytes(b)) => a == b,
            // Compared as instants; the offset is presentation only.
            (ScalarValue::Timestamp(a), ScalarValue::Timestamp(b)) => a == b,
            (ScalarValue::String(a), ScalarValue::String(b)) => a == b,
            (ScalarValue::Other(a), ScalarValue::Other(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "Null"),
            ScalarValue::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            ScalarValue::Int(value) => f.debug_tuple("Int").field(value).finish(),
            ScalarValue::Float(value) => f.debug_tuple("Float").field(value).finish(),
            ScalarValue::Bytes(value) => f.debug_tuple("Bytes").field(value).finish(),
            ScalarValue::Timestamp(value) => f.debug_tuple("Timestamp").field(value).finish(),
            ScalarValue::String(value) => f.debug_tuple("String").field(value).finish(),
            ScalarValue::Other(_) => write!(f, "Other(..)"),
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("tag", &self.tag)
            .field("content", &self.content)
            .finish_non_exhaustive()
    }
}

/// The content of a node: a typed scalar or an owned collection.
#[derive(Clone, Debug)]
pub enum NodeContent {
    Scalar {
        value: ScalarValue,
        /// The source or requested presentation style, if known.
        style: ScalarStyle,
    },
    Sequence {
        items: Vec<Node>,
        style: CollectionStyle,
    },
    Mapping {
        pairs: Vec<(Node, Node)>,
        style: CollectionStyle,
    },
}

impl PartialEq for NodeContent {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                NodeContent::Scalar { value: a, .. },
                NodeContent::Scalar { value: b, .. },
            ) => a == b,
            (
                NodeContent::Sequence { items: a, .. },
                NodeContent::Sequence { items: b, .. },
            ) => a == b,
            (
                NodeContent::Mapping { pairs: a, .. },
                NodeContent::Mapping { pairs: b, .. },
            ) => a == b,
            _ => false,
        }
    }
}

/// A node of the document tree.
///
/// Equality is structural and tag-insensitive: two nodes are equal when their
/// contents are, regardless of tags, styles and marks. This is the equality
/// used for duplicate-key detection.
#[derive(Clone)]
pub struct Node {
    /// The canonical tag.
    pub tag: String,
    /// The typed content.
    pub content: NodeContent,
    /// The source position, zero for nodes built in memory.
    pub mark: Mark,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content
    }
}

impl Node {
    pub(crate) fn make(tag: impl Into<String>, content: NodeContent) -> Node {
        Node {
            tag: tag.into(),
            content,
            mark: Mark::default(),
        }
    }

    fn scalar(tag: &str, value: ScalarValue) -> Node {
        Node::make(
            tag,
            NodeContent::Scalar {
                value,
                style: ScalarStyle::Any,
            },
        )
    }

    /// A `!!null` scalar node.
    pub fn null() -> Node {
        Node::scalar(NULL_TAG, ScalarValue::Null)
    }

    /// A `!!bool` scalar node.
    pub fn bool(value: bool) -> Node {
        Node::scalar(BOOL_TAG, ScalarValue::Bool(value))
    }

    /// An `!!int` scalar node.
    pub fn int(value: i64) -> Node {
        Node::scalar(INT_TAG, ScalarValue::Int(value))
    }

    /// A `!!float` scalar node.
    pub fn float(value: f64) -> Node {
        Node::scalar(FLOAT_TAG, ScalarValue::Float(value))
    }

    /// A `!!binary` scalar node.
    pub fn bytes(value: impl Into<Vec<u8>>) -> Node {
        Node::scalar(BINARY_TAG, ScalarValue::Bytes(value.into()))
    }

    /// A `!!timestamp` scalar node.
    pub fn timestamp(value: DateTime<FixedOffset>) -> Node {
        Node::scalar(TIMESTAMP_TAG, ScalarValue::Timestamp(value))
    }

    /// A `!!str` scalar node.
    pub fn string(value: impl Into<String>) -> Node {
        Node::scalar(STR_TAG, ScalarValue::String(value.into()))
    }

    /// A `!!seq` node owning its items.
    pub fn from_items(items: Vec<Node>) -> Node {
        Node::make(
            DEFAULT_SEQUENCE_TAG,
            NodeContent::Sequence {
                items,
                style: CollectionStyle::Any,
            },
        )
    }

    /// A `!!map` node owning its pairs.
    pub fn from_pairs(pairs: Vec<(Node, Node)>) -> Node {
        Node::make(
            DEFAULT_MAPPING_TAG,
            NodeContent::Mapping {
                pairs,
                style: CollectionStyle::Any,
            },
        )
    }

    /// Replace the tag, keeping the content.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Node {
        self.tag = tag.into();
        self
    }

    /// Request a presentation style for a scalar node.
    pub fn with_scalar_style(mut self, style: ScalarStyle) -> Node {
        if let NodeContent::Scalar {
            style: ref mut slot,
            ..
        } = self.content
        {
            *slot = style;
        }
        self
    }

    /// Request a presentation style for a collection node.
    pub fn with_collection_style(mut self, style: CollectionStyle) -> Node {
        match self.content {
            NodeContent::Sequence {
                style: ref mut slot,
                ..
            }
            | NodeContent::Mapping {
                style: ref mut slot,
                ..
            } => *slot = style,
            NodeContent::Scalar { .. } => {}
        }
        self
    }

    pub fn kind(&self) -> NodeKind {
        match self.content {
            NodeContent::Scalar { .. } => NodeKind::Scalar,
            NodeContent::Sequence { .. } => NodeKind::Sequence,
            NodeContent::Mapping { .. } => NodeKind::Mapping,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(
            self.content,
            NodeContent::Scalar {
                value: ScalarValue::Null,
                ..
            }
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.content {
            NodeContent::Scalar {
                value: ScalarValue::Bool(value),
                ..
            } => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match &self.content {
            NodeContent::Scalar {
                value: ScalarValue::Int(value),
                ..
            } => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match &self.content {
            NodeContent::Scalar {
                value: ScalarValue::Float(value),
                ..
            } => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.content {
            NodeContent::Scalar {
                value: ScalarValue::String(value),
                ..
            } => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.content {
            NodeContent::Scalar {
                value: ScalarValue::Bytes(value),
                ..
            } => Some(value),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        match &self.content {
            NodeContent::Scalar {
                value: ScalarValue::Timestamp(value),
                ..
            } => Some(*value),
            _ => None,
        }
    }

    pub fn as_items(&self) -> Option<&[Node]> {
        match &self.content {
            NodeContent::Sequence { items, .. } => Some(items),
            _ => None,
        }
    }

    pub fn as_pairs(&self) -> Option<&[(Node, Node)]> {
        match &self.content {
            NodeContent::Mapping { pairs, .. } => Some(pairs),
            _ => None,
        }
    }

    /// Look up a mapping value by string key.
    pub fn get(&self, key: &str) -> Option<&Node> {
        let pairs = self.as_pairs()?;
        pairs
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    /// Look up a mapping value by string key, mutably.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        match &mut self.content {
            NodeContent::Mapping { pairs, .. } => pairs
                .iter_mut()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Append an item to a sequence node. Panics on other kinds.
    pub fn push(&mut self, item: Node) {
        match &mut self.content {
            NodeContent::Sequence { items, .. } => items.push(item),
            _ => panic!("push on a non-sequence node"),
        }
    }

    /// Insert or replace a mapping pair, keyed by structural equality.
    /// Panics on other kinds.
    pub fn insert(&mut self, key: Node, value: Node) {
        match &mut self.content {
            NodeContent::Mapping { pairs, .. } => {
                if let Some(pair) = pairs.iter_mut().find(|(k, _)| *k == key) {
                    pair.1 = value;
                } else {
                    pairs.push((key, value));
                }
            }
            _ => panic!("insert on a non-mapping node"),
        }
    }

    /// Remove a mapping pair by structural key equality, returning the value.
    pub fn remove(&mut self, key: &Node) -> Option<Node> {
        match &mut self.content {
            NodeContent::Mapping { pairs, .. } => {
                let position = pairs.iter().position(|(k, _)| k == key)?;
                Some(pairs.remove(position).1)
            }
            _ => None,
        }
    }
}

impl std::ops::Index<&str> for Node {
    type Output = Node;

    fn index(&self, key: &str) -> &Node {
        self.get(key).expect("no such key in mapping node")
    }
}

impl std::ops::Index<usize> for Node {
    type Output = Node;

    fn index(&self, index: usize) -> &Node {
        match &self.content {
            NodeContent::Sequence { items, .. } => &items[index],
            _ => panic!("integer index on a non-sequence node"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_ignores_tags() {
        let a = Node::string("12");
        let b = Node::string("12").with_tag("!custom");
        assert_eq!(a, b);
        assert_ne!(Node::string("12"), Node::int(12));
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        assert_ne!(Node::float(f64::NAN), Node::float(f64::NAN));
        assert_eq!(Node::float(1.5), Node::float(1.5));
    }

    #[test]
    fn other_values_compare_by_identity() {
        let value: Rc<dyn std::any::Any> = Rc::new(42u8);
        let a = Node::make(
            "!custom",
            NodeContent::Scalar {
                value: ScalarValue::Other(value.clone()),
                style: ScalarStyle::Any,
            },
        );
        let b = a.clone();
        assert_eq!(a, b);
        let c = Node::make(
            "!custom",
            NodeContent::Scalar {
                value: ScalarValue::Other(Rc::new(42u8)),
                style: ScalarStyle::Any,
            },
        );
        assert_ne!(a, c);
    }

    #[test]
    fn mapping_access_and_mutation() {
        let mut node = Node::from_pairs(vec![(Node::string("a"), Node::int(1))]);
        assert_eq!(node["a"].as_int(), Some(1));
        node.insert(Node::string("a"), Node::int(2));
        assert_eq!(node["a"].as_int(), Some(2));
        assert_eq!(node.as_pairs().unwrap().len(), 1);
        node.insert(Node::string("b"), Node::int(3));
        assert_eq!(node.as_pairs().unwrap().len(), 2);
        let removed = node.remove(&Node::string("a"));
        assert_eq!(removed.unwrap().as_int(), Some(2));
        assert!(node.get("a").is_none());
    }

    #[test]
    fn sequence_push_and_index() {
        let mut node = Node::from_items(vec![Node::int(1)]);
        node.push(Node::int(2));
        assert_eq!(node[1].as_int(), Some(2));
    }
}
