use std::collections::HashMap;
use std::io::Read;

use log::debug;

use crate::constructor::Constructor;
use crate::node::{Node, NodeContent, NodeKind};
use crate::parser::Parser;
use crate::resolver::{Resolver, SchemaResolver};
use crate::{
    ComposerError, Encoding, Event, EventData, Mark, TagDirective, VersionDirective, MERGE_TAG,
};

/// A composed document: the root node plus the stream framing that produced
/// it, so a load→dump round trip can preserve directives and explicit
/// indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The root node.
    pub root: Node,
    /// The `%YAML` directive, if one was given.
    pub version_directive: Option<VersionDirective>,
    /// The `%TAG` directives in effect.
    pub tag_directives: Vec<TagDirective>,
    /// Was the document started without an explicit `---`?
    pub start_implicit: bool,
    /// Was the document ended without an explicit `...`?
    pub end_implicit: bool,
    /// The beginning of the document.
    pub start_mark: Mark,
    /// The end of the document.
    pub end_mark: Mark,
}

impl Document {
    /// Wrap a root node in implicit document framing.
    pub fn new(root: Node) -> Document {
        Document {
            root,
            version_directive: None,
            tag_directives: Vec::new(),
            start_implicit: true,
            end_implicit: true,
            start_mark: Mark::default(),
            end_mark: Mark::default(),
        }
    }
}

/// The tree-building stage: consumes events and produces documents, resolving
/// anchors and aliases and applying merge-key semantics.
pub struct Composer<'r> {
    parser: Parser<'r>,
    resolver: Box<dyn Resolver>,
    constructor: Constructor,
    /// Per-document anchor table. `None` marks a node still under
    /// construction, which an alias must not reach.
    anchors: HashMap<String, Option<Node>>,
    /// One-event look-ahead over the parser.
    buffered: Option<Event>,
    stream_started: bool,
}

impl<'r> Composer<'r> {
    pub fn new() -> Composer<'r> {
        Composer {
            parser: Parser::new(),
            resolver: Box::new(SchemaResolver::new()),
            constructor: Constructor::new(),
            anchors: HashMap::new(),
            buffered: None,
            stream_started: false,
        }
    }

    /// Set the input source. Must be called exactly once before composing.
    pub fn set_input(&mut self, input: impl Read + 'r) {
        self.parser.set_input(input);
    }

    /// Override encoding detection.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.parser.set_encoding(encoding);
    }

    /// Replace the resolver. Takes effect for documents composed afterwards.
    pub fn set_resolver(&mut self, resolver: impl Resolver + 'static) {
        self.resolver = Box::new(resolver);
    }

    /// Replace the constructor.
    pub fn set_constructor(&mut self, constructor: Constructor) {
        self.constructor = constructor;
    }

    fn error<T>(problem: &'static str, mark: Mark) -> Result<T, ComposerError> {
        Err(ComposerError::Problem { problem, mark })
    }

    fn peek_event(&mut self) -> Result<&Event, ComposerError> {
        if self.buffered.is_none() {
            self.buffered = Some(self.parser.parse()?);
        }
        Ok(self.buffered.as_ref().expect("just buffered"))
    }

    fn next_event(&mut self) -> Result<Event, ComposerError> {
        match self.buffered.take() {
            Some(event) => Ok(event),
            None => Ok(self.parser.parse()?),
        }
    }

    /// Compose the next document of the stream, or `None` at stream end.
    pub fn next_document(&mut self) -> Result<Option<Document>, ComposerError> {
        if !self.stream_started {
            let event = self.next_event()?;
            debug_assert!(matches!(event.data, EventData::StreamStart { .. }));
            self.stream_started = true;
        }
        let event = self.next_event()?;
        let start_mark = event.start_mark;
        let (version_directive, tag_directives, start_implicit) = match event.data {
            EventData::DocumentStart {
                version_directive,
                tag_directives,
                implicit,
            } => (version_directive, tag_directives, implicit),
            EventData::StreamEnd => return Ok(None),
            _ => unreachable!("the parser frames documents with DOCUMENT-START"),
        };
        debug!("composing document at {start_mark}");
        let root = self.compose_node()?;
        let end = self.next_event()?;
        let EventData::DocumentEnd {
            implicit: end_implicit,
        } = end.data
        else {
            unreachable!("the parser brackets every document with DOCUMENT-END");
        };
        // Anchor scope is one document.
        self.anchors.clear();
        debug!("document composed, ends at {}", end.end_mark);
        Ok(Some(Document {
            root,
            version_directive,
            tag_directives,
            start_implicit,
            end_implicit,
            start_mark,
            end_mark: end.end_mark,
        }))
    }

    /// Register a placeholder for an anchored node under construction.
    fn open_anchor(&mut self, anchor: Option<&str>, mark: Mark) -> Result<(), ComposerError> {
        let Some(anchor) = anchor else {
            return Ok(());
        };
        if self.anchors.contains_key(anchor) {
            return Self::error("found duplicate anchor", mark);
        }
        self.anchors.insert(anchor.to_string(), None);
        Ok(())
    }

    fn close_anchor(&mut self, anchor: Option<String>, node: &Node) {
        if let Some(anchor) = anchor {
            self.anchors.insert(anchor, Some(node.clone()));
        }
    }

    fn compose_node(&mut self) -> Result<Node, ComposerError> {
        let event = self.next_event()?;
        match event.data {
            EventData::Alias { anchor } => match self.anchors.get(&anchor) {
                None => Self::error("found undefined alias", event.start_mark),
                // The aliased node is an ancestor still being composed; the
                // composed tree must stay acyclic.
                Some(None) => Self::error("found recursive alias", event.start_mark),
                Some(Some(node)) => Ok(node.clone()),
            },
            EventData::Scalar {
                anchor,
                tag,
                value,
                plain_implicit,
                style,
                ..
            } => {
                self.open_anchor(anchor.as_deref(), event.start_mark)?;
                let tag = self.resolver.resolve(
                    NodeKind::Scalar,
                    tag.as_deref(),
                    Some(&value),
                    plain_implicit,
                );
                let constructed =
                    self.constructor
                        .construct_scalar(&tag, &value, event.start_mark)?;
                let node = Node {
                    tag,
                    content: NodeContent::Scalar {
                        value: constructed,
                        style,
                    },
                    mark: event.start_mark,
                };
                self.close_anchor(anchor, &node);
                Ok(node)
            }
            EventData::SequenceStart {
                anchor,
                tag,
                implicit,
                style,
            } => {
                self.open_anchor(anchor.as_deref(), event.start_mark)?;
                let tag = self
                    .resolver
                    .resolve(NodeKind::Sequence, tag.as_deref(), None, implicit);
                let mut items = Vec::new();
                while !matches!(self.peek_event()?.data, EventData::SequenceEnd) {
                    items.push(self.compose_node()?);
                }
                self.next_event()?;
                let node = Node {
                    tag,
                    content: NodeContent::Sequence { items, style },
                    mark: event.start_mark,
                };
                self.constructor.construct_collection(&node)?;
                self.close_anchor(anchor, &node);
                Ok(node)
            }
            EventData::MappingStart {
                anchor,
                tag,
                implicit,
                style,
            } => {
                self.open_anchor(anchor.as_deref(), event.start_mark)?;
                let tag = self
                    .resolver
                    .resolve(NodeKind::Mapping, tag.as_deref(), None, implicit);
                let mut pairs = Vec::new();
                while !matches!(self.peek_event()?.data, EventData::MappingEnd) {
                    let key = self.compose_node()?;
                    let value = self.compose_node()?;
                    pairs.push((key, value));
                }
                self.next_event()?;
                let pairs = Self::flatten_merge_keys(pairs, event.start_mark)?;
                let node = Node {
                    tag,
                    content: NodeContent::Mapping { pairs, style },
                    mark: event.start_mark,
                };
                self.constructor.construct_collection(&node)?;
                self.close_anchor(anchor, &node);
                Ok(node)
            }
            _ => unreachable!("the parser yields only node events here"),
        }
    }

    /// Fold `<<` pairs into the enclosing mapping. Merged pairs supply
    /// defaults: a key already present in the mapping, or merged earlier,
    /// wins over a later one.
    fn flatten_merge_keys(
        pairs: Vec<(Node, Node)>,
        mark: Mark,
    ) -> Result<Vec<(Node, Node)>, ComposerError> {
        if !pairs.iter().any(|(key, _)| key.tag == MERGE_TAG) {
            return Ok(pairs);
        }
        let mut merged: Vec<(Node, Node)> = Vec::new();
        let mut explicit: Vec<(Node, Node)> = Vec::new();
        for (key, value) in pairs {
            if key.tag != MERGE_TAG {
                explicit.push((key, value));
                continue;
            }
            match value.content {
                NodeContent::Mapping {
                    pairs: merge_pairs, ..
                } => {
                    for pair in merge_pairs {
                        if !merged.iter().any(|(k, _)| *k == pair.0) {
                            merged.push(pair);
                        }
                    }
                }
                NodeContent::Sequence { items, .. } => {
                    for item in items {
                        let NodeContent::Mapping {
                            pairs: merge_pairs, ..
                        } = item.content
                        else {
                            return Self::error(
                                "expected a mapping for merging",
                                item.mark,
                            );
                        };
                        for pair in merge_pairs {
                            if !merged.iter().any(|(k, _)| *k == pair.0) {
                                merged.push(pair);
                            }
                        }
                    }
                }
                _ => {
                    return Self::error(
                        "expected a mapping or list of mappings for merging",
                        mark,
                    );
                }
            }
        }
        // Merged defaults come first; explicit pairs override them.
        merged.retain(|(key, _)| !explicit.iter().any(|(k, _)| k == key));
        merged.extend(explicit);
        Ok(merged)
    }
}

impl<'r> Default for Composer<'r> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ScalarValue;

    fn compose(input: &str) -> Document {
        let mut composer = Composer::new();
        composer.set_input(input.as_bytes());
        composer.next_document().unwrap().unwrap()
    }

    fn compose_err(input: &str) -> ComposerError {
        let mut composer = Composer::new();
        composer.set_input(input.as_bytes());
        composer.next_document().unwrap_err()
    }

    #[test]
    fn typed_scalars() {
        let doc = compose("a: 42\nb: yes\nc: ~\nd: 3.5\ne: words\n");
        assert_eq!(doc.root["a"].as_int(), Some(42));
        assert_eq!(doc.root["b"].as_bool(), Some(true));
        assert!(doc.root["c"].is_null());
        assert_eq!(doc.root["d"].as_float(), Some(3.5));
        assert_eq!(doc.root["e"].as_str(), Some("words"));
    }

    #[test]
    fn quoted_scalars_are_strings() {
        let doc = compose("a: '42'\nb: \"yes\"\n");
        assert_eq!(doc.root["a"].as_str(), Some("42"));
        assert_eq!(doc.root["b"].as_str(), Some("yes"));
    }

    #[test]
    fn anchors_resolve() {
        let doc = compose("a: &x {v: 1}\nb: *x\nc: *x\n");
        assert_eq!(doc.root["b"], doc.root["a"]);
        assert_eq!(doc.root["c"], doc.root["a"]);
        assert_eq!(doc.root["b"]["v"].as_int(), Some(1));
    }

    #[test]
    fn undefined_alias_is_an_error() {
        let err = compose_err("a: *nowhere\n");
        assert!(err.to_string().contains("undefined alias"));
    }

    #[test]
    fn duplicate_anchor_is_an_error() {
        let err = compose_err("a: &x 1\nb: &x 2\n");
        assert!(err.to_string().contains("duplicate anchor"));
    }

    #[test]
    fn recursive_alias_is_an_error() {
        let err = compose_err("&a [1, *a]\n");
        assert!(err.to_string().contains("recursive alias"));
    }

    #[test]
    fn merge_key_defaults_do_not_override() {
        let doc = compose("defaults: &d {a: 1, b: 2}\nspecific:\n  <<: *d\n  a: 0\n");
        let specific = &doc.root["specific"];
        assert_eq!(specific["a"].as_int(), Some(0));
        assert_eq!(specific["b"].as_int(), Some(2));
    }

    #[test]
    fn merge_sequence_earlier_wins() {
        let doc = compose(
            "one: &one {x: 1}\ntwo: &two {x: 2, y: 2}\nmerged:\n  <<: [*one, *two]\n",
        );
        let merged = &doc.root["merged"];
        assert_eq!(merged["x"].as_int(), Some(1));
        assert_eq!(merged["y"].as_int(), Some(2));
    }

    #[test]
    fn merge_of_non_mapping_is_an_error() {
        let err = compose_err("a: &x 1\nb:\n  <<: *x\n");
        assert!(err.to_string().contains("merging"));
    }

    #[test]
    fn duplicate_keys_are_an_error() {
        let err = compose_err("a: 1\na: 2\n");
        assert!(err.to_string().contains("duplicate key"));
    }

    #[test]
    fn duplicate_detection_is_tag_insensitive_after_construction() {
        // Quoted "12" constructs as a string, plain 12 as an int; they are
        // structurally different keys.
        let doc = compose("'12': a\n12: b\n");
        assert_eq!(doc.root.as_pairs().unwrap().len(), 2);
    }

    #[test]
    fn set_composes() {
        let doc = compose("!!set { Mark McGwire, Sammy Sosa, Ken Griffey }\n");
        assert_eq!(doc.root.tag, crate::SET_TAG);
        let pairs = doc.root.as_pairs().unwrap();
        assert_eq!(pairs.len(), 3);
        assert!(pairs.iter().all(|(_, v)| v.is_null()));
        assert!(pairs
            .iter()
            .any(|(k, _)| k.as_str() == Some("Mark McGwire")));
    }

    #[test]
    fn omap_composes_and_checks_duplicates() {
        let doc = compose("!!omap\n- a: 1\n- b: 2\n");
        assert_eq!(doc.root.tag, crate::OMAP_TAG);
        let err = compose_err("!!omap\n- a: 1\n- a: 2\n");
        assert!(err.to_string().contains("duplicate key"));
    }

    #[test]
    fn pairs_allows_duplicates() {
        let doc = compose("!!pairs\n- a: 1\n- a: 2\n");
        assert_eq!(doc.root.as_items().unwrap().len(), 2);
    }

    #[test]
    fn binary_composes() {
        let doc = compose("!!binary |\n  aGVsbG8=\n");
        assert_eq!(doc.root.as_bytes(), Some(b"hello".as_slice()));
    }

    #[test]
    fn timestamp_composes() {
        let doc = compose("time: 2001-12-15T02:59:43.1Z\n");
        let ts = doc.root["time"].as_timestamp().unwrap();
        assert_eq!(ts.to_rfc3339(), "2001-12-15T02:59:43.100+00:00");
    }

    #[test]
    fn sexagesimal_scenario() {
        let doc = compose(
            "canonical: 685230\noctal: 02472256\nhex: 0x_0A_74_AE\nbin: 0b1010_0111_0100_1010_1110\nsex: 190:20:30\n",
        );
        for key in ["canonical", "octal", "hex", "bin", "sex"] {
            assert_eq!(doc.root[key].as_int(), Some(685_230), "{key}");
        }
    }

    #[test]
    fn multi_document_stream() {
        let mut composer = Composer::new();
        composer.set_input("---\none\n---\ntwo\n".as_bytes());
        let first = composer.next_document().unwrap().unwrap();
        let second = composer.next_document().unwrap().unwrap();
        assert_eq!(first.root.as_str(), Some("one"));
        assert_eq!(second.root.as_str(), Some("two"));
        assert!(composer.next_document().unwrap().is_none());
        assert!(!first.start_implicit);
    }

    #[test]
    fn empty_stream_has_no_documents() {
        let mut composer = Composer::new();
        composer.set_input("".as_bytes());
        assert!(composer.next_document().unwrap().is_none());
    }

    #[test]
    fn malformed_int_under_explicit_tag_is_an_error() {
        let err = compose_err("!!int banana\n");
        assert!(matches!(err, ComposerError::Constructor(_)));
    }

    #[test]
    fn custom_constructor_produces_other() {
        use std::rc::Rc;
        let mut composer = Composer::new();
        let mut constructor = Constructor::new();
        constructor.add_scalar("!point", |value, mark| {
            let parts: Vec<&str> = value.split(',').collect();
            if parts.len() != 2 {
                return Err(crate::ConstructorError {
                    problem: format!("cannot construct point from {value:?}"),
                    mark,
                });
            }
            Ok(ScalarValue::Other(Rc::new((
                parts[0].trim().to_string(),
                parts[1].trim().to_string(),
            ))))
        });
        composer.set_constructor(constructor);
        composer.set_input("!point 1, 2\n".as_bytes());
        let doc = composer.next_document().unwrap().unwrap();
        let NodeContent::Scalar {
            value: ScalarValue::Other(other),
            ..
        } = &doc.root.content
        else {
            panic!("expected user value");
        };
        let point = other
            .downcast_ref::<(String, String)>()
            .expect("point type");
        assert_eq!(point.0, "1");
    }
}
