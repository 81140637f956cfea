use log::trace;

use crate::composer::Document;
use crate::emitter::Emitter;
use crate::node::{Node, NodeContent, NodeKind, ScalarValue};
use crate::representer::Representer;
use crate::resolver::{Resolver, SchemaResolver};
use crate::{DumpError, Event};

/// A node long enough, or shared widely enough, to be worth anchoring:
/// string and byte scalars over 64 units, collections over 2 entries.
fn anchorable(node: &Node) -> bool {
    match &node.content {
        NodeContent::Scalar { value, .. } => match value {
            ScalarValue::String(text) => text.len() > 64,
            ScalarValue::Bytes(bytes) => bytes.len() > 64,
            _ => false,
        },
        NodeContent::Sequence { items, .. } => items.len() > 2,
        NodeContent::Mapping { pairs, .. } => pairs.len() > 2,
    }
}

struct AnchorEntry {
    node: Node,
    references: usize,
    anchor: Option<String>,
    serialized: bool,
}

/// The lowering stage: walks a document tree and emits the event sequence
/// that re-creates it, assigning anchors to repeated nodes and computing the
/// implicit-tag flags the emitter needs.
pub struct Serializer {
    resolver: Box<dyn Resolver>,
    representer: Representer,
    last_anchor_id: usize,
}

impl Serializer {
    pub fn new() -> Serializer {
        Serializer {
            resolver: Box::new(SchemaResolver::new()),
            representer: Representer::new(),
            last_anchor_id: 0,
        }
    }

    /// Replace the resolver used for implicit-tag decisions.
    pub fn set_resolver(&mut self, resolver: impl Resolver + 'static) {
        self.resolver = Box::new(resolver);
    }

    /// Replace the representer used for user values.
    pub fn set_representer(&mut self, representer: Representer) {
        self.representer = representer;
    }

    /// Emit one document into an open emitter stream.
    pub fn serialize<W: std::io::Write>(
        &mut self,
        emitter: &mut Emitter<W>,
        document: &Document,
    ) -> Result<(), DumpError> {
        let root = self.representer.normalize(&document.root)?;

        let mut anchors: Vec<AnchorEntry> = Vec::new();
        Self::count_references(&root, &mut anchors);
        anchors.retain(|entry| entry.references > 1);

        emitter.emit(Event::document_start(
            document.version_directive,
            document.tag_directives.clone(),
            document.start_implicit,
        ))?;
        self.serialize_node(emitter, &root, &mut anchors)?;
        emitter.emit(Event::document_end(document.end_implicit))?;

        self.last_anchor_id = 0;
        Ok(())
    }

    /// First pass: count occurrences of anchorable nodes, by structural
    /// equality.
    fn count_references(node: &Node, anchors: &mut Vec<AnchorEntry>) {
        if anchorable(node) {
            if let Some(entry) = anchors.iter_mut().find(|entry| entry.node == *node) {
                entry.references += 1;
                // Repeats share one entry; their children were already seen.
                return;
            }
            anchors.push(AnchorEntry {
                node: node.clone(),
                references: 1,
                anchor: None,
                serialized: false,
            });
        }
        match &node.content {
            NodeContent::Scalar { .. } => {}
            NodeContent::Sequence { items, .. } => {
                for item in items {
                    Self::count_references(item, anchors);
                }
            }
            NodeContent::Mapping { pairs, .. } => {
                for (key, value) in pairs {
                    Self::count_references(key, anchors);
                    Self::count_references(value, anchors);
                }
            }
        }
    }

    fn generate_anchor(&mut self) -> String {
        self.last_anchor_id += 1;
        let anchor = format!("id{:03}", self.last_anchor_id);
        trace!("generated anchor {anchor}");
        anchor
    }

    fn serialize_node<W: std::io::Write>(
        &mut self,
        emitter: &mut Emitter<W>,
        node: &Node,
        anchors: &mut Vec<AnchorEntry>,
    ) -> Result<(), DumpError> {
        let mut anchor = None;
        if let Some(index) = anchors.iter().position(|entry| entry.node == *node) {
            if anchors[index].serialized {
                let name = anchors[index]
                    .anchor
                    .clone()
                    .expect("serialized entries are named");
                emitter.emit(Event::alias(name))?;
                return Ok(());
            }
            let name = self.generate_anchor();
            anchors[index].anchor = Some(name.clone());
            anchors[index].serialized = true;
            anchor = Some(name);
        }

        match &node.content {
            NodeContent::Scalar { .. } => {
                let (value, style) = self.representer.present_scalar(node)?;
                let detected = self
                    .resolver
                    .resolve(NodeKind::Scalar, None, Some(&value), true)
                    == node.tag;
                let default = node.tag == self.resolver.default_scalar_tag();
                emitter.emit(Event::scalar(
                    anchor,
                    Some(node.tag.clone()),
                    value,
                    detected,
                    default,
                    style,
                ))?;
            }
            NodeContent::Sequence { items, style } => {
                let implicit = node.tag == self.resolver.default_sequence_tag();
                emitter.emit(Event::sequence_start(
                    anchor,
                    Some(node.tag.clone()),
                    implicit,
                    *style,
                ))?;
                for item in items {
                    self.serialize_node(emitter, item, anchors)?;
                }
                emitter.emit(Event::sequence_end())?;
            }
            NodeContent::Mapping { pairs, style } => {
                let implicit = node.tag == self.resolver.default_mapping_tag();
                emitter.emit(Event::mapping_start(
                    anchor,
                    Some(node.tag.clone()),
                    implicit,
                    *style,
                ))?;
                for (key, value) in pairs {
                    self.serialize_node(emitter, key, anchors)?;
                    self.serialize_node(emitter, value, anchors)?;
                }
                emitter.emit(Event::mapping_end())?;
            }
        }
        Ok(())
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big_seq() -> Node {
        Node::from_items(vec![Node::int(1), Node::int(2), Node::int(3)])
    }

    #[test]
    fn repeated_collections_are_anchored() {
        let root = Node::from_items(vec![big_seq(), big_seq()]);
        let mut anchors = Vec::new();
        Serializer::count_references(&root, &mut anchors);
        anchors.retain(|entry| entry.references > 1);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].references, 2);
    }

    #[test]
    fn short_scalars_are_not_anchorable() {
        assert!(!anchorable(&Node::string("short")));
        assert!(anchorable(&Node::string("x".repeat(65))));
        assert!(!anchorable(&Node::from_items(vec![Node::int(1)])));
        assert!(anchorable(&big_seq()));
    }

    #[test]
    fn serializes_aliases_for_repeats() {
        let root = Node::from_items(vec![big_seq(), big_seq()]);
        let mut output = Vec::new();
        let mut emitter = Emitter::new(&mut output);
        emitter.open().unwrap();
        let mut serializer = Serializer::new();
        serializer
            .serialize(&mut emitter, &Document::new(root))
            .unwrap();
        emitter.close().unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("&id001"), "{text}");
        assert!(text.contains("*id001"), "{text}");
    }
}
