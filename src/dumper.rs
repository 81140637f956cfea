use std::io::Write;

use crate::composer::Document;
use crate::emitter::Emitter;
use crate::node::Node;
use crate::representer::Representer;
use crate::resolver::Resolver;
use crate::serializer::Serializer;
use crate::{Break, DumpError, Encoding, TagDirective, VersionDirective};

/// The output facade: wires a node tree through the serializer and emitter
/// into a byte sink.
///
/// All options are set before the first dump; the stream is opened lazily on
/// the first document and closed by [`Dumper::finish`] (or implicitly when a
/// single `dump` call is all there is).
pub struct Dumper<W: Write> {
    emitter: Emitter<W>,
    serializer: Serializer,
    explicit_start: bool,
    explicit_end: bool,
    version: Option<VersionDirective>,
    tag_directives: Vec<TagDirective>,
}

impl Dumper<std::fs::File> {
    /// Dump into a file created at `path`.
    pub fn to_path(path: impl AsRef<std::path::Path>) -> std::io::Result<Dumper<std::fs::File>> {
        Ok(Dumper::new(std::fs::File::create(path)?))
    }
}

impl<W: Write> Dumper<W> {
    pub fn new(output: W) -> Dumper<W> {
        Dumper {
            emitter: Emitter::new(output),
            serializer: Serializer::new(),
            explicit_start: false,
            explicit_end: false,
            version: None,
            tag_directives: Vec::new(),
        }
    }

    /// Emit in the canonical form: explicit documents, flow collections,
    /// double-quoted scalars, tags everywhere.
    pub fn canonical(mut self, canonical: bool) -> Self {
        self.emitter.set_canonical(canonical);
        self
    }

    /// The indentation increment, clamped to 2..9.
    pub fn indent(mut self, indent: i32) -> Self {
        self.emitter.set_indent(indent);
        self
    }

    /// The preferred line width; non-positive means unlimited.
    pub fn width(mut self, width: i32) -> Self {
        self.emitter.set_width(width);
        self
    }

    /// The output line break style.
    pub fn line_break(mut self, line_break: Break) -> Self {
        self.emitter.set_line_break(line_break);
        self
    }

    /// The output encoding.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.emitter.set_encoding(encoding);
        self
    }

    /// Always write the `---` document start indicator.
    pub fn explicit_start(mut self, explicit: bool) -> Self {
        self.explicit_start = explicit;
        self
    }

    /// Always write the `...` document end indicator.
    pub fn explicit_end(mut self, explicit: bool) -> Self {
        self.explicit_end = explicit;
        self
    }

    /// Write a `%YAML` directive. The major version must be 1.
    pub fn version(mut self, major: i32, minor: i32) -> Self {
        self.version = Some(VersionDirective { major, minor });
        self
    }

    /// Seed `%TAG` directives for the emitted documents.
    pub fn tag_directives(mut self, directives: Vec<TagDirective>) -> Self {
        self.tag_directives = directives;
        self
    }

    /// Swap the resolver used for implicit-tag decisions.
    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.serializer.set_resolver(resolver);
        self
    }

    /// Swap the representer used for user values.
    pub fn with_representer(mut self, representer: Representer) -> Self {
        self.serializer.set_representer(representer);
        self
    }

    /// Dump a single node as one document and close the stream.
    pub fn dump(mut self, root: Node) -> Result<(), DumpError> {
        self.dump_document(&Document::new(root))?;
        self.finish()
    }

    /// Dump one document per node and close the stream.
    pub fn dump_all(mut self, roots: impl IntoIterator<Item = Node>) -> Result<(), DumpError> {
        for root in roots {
            self.dump_document(&Document::new(root))?;
        }
        self.finish()
    }

    /// Dump one document, keeping the stream open for more.
    pub fn dump_document(&mut self, document: &Document) -> Result<(), DumpError> {
        if let Some(version) = self.version {
            if version.major != 1 {
                return Err(DumpError::Problem("major version must be 1"));
            }
        }
        if !self.emitter.is_open() {
            self.emitter.open()?;
        }
        let mut framed = document.clone();
        framed.start_implicit = document.start_implicit && !self.explicit_start;
        framed.end_implicit = document.end_implicit && !self.explicit_end;
        if framed.version_directive.is_none() {
            framed.version_directive = self.version;
        }
        if framed.tag_directives.is_empty() {
            framed.tag_directives = self.tag_directives.clone();
        }
        self.serializer.serialize(&mut self.emitter, &framed)
    }

    /// Close the stream and flush the sink.
    pub fn finish(mut self) -> Result<(), DumpError> {
        if !self.emitter.is_open() {
            self.emitter.open()?;
        }
        self.emitter.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CollectionStyle;

    fn dump_to_string(node: Node) -> String {
        let mut output = Vec::new();
        Dumper::new(&mut output).dump(node).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn dump_mapping() {
        let node = Node::from_pairs(vec![
            (Node::string("a"), Node::int(1)),
            (Node::string("b"), Node::bool(true)),
        ]);
        assert_eq!(dump_to_string(node), "a: 1\nb: true\n");
    }

    #[test]
    fn dump_typed_scalars() {
        let node = Node::from_pairs(vec![
            (Node::string("null"), Node::null()),
            (Node::string("float"), Node::float(0.25)),
            (Node::string("inf"), Node::float(f64::INFINITY)),
        ]);
        assert_eq!(
            dump_to_string(node),
            "'null': null\nfloat: 0.25\ninf: .inf\n"
        );
    }

    #[test]
    fn dump_string_that_looks_like_int_is_quoted() {
        let node = Node::from_pairs(vec![(Node::string("k"), Node::string("42"))]);
        assert_eq!(dump_to_string(node), "k: '42'\n");
    }

    #[test]
    fn explicit_markers() {
        let mut output = Vec::new();
        Dumper::new(&mut output)
            .explicit_start(true)
            .explicit_end(true)
            .dump(Node::string("x"))
            .unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "--- x\n...\n");
    }

    #[test]
    fn version_directive_round() {
        let mut output = Vec::new();
        Dumper::new(&mut output)
            .version(1, 1)
            .dump(Node::string("x"))
            .unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("%YAML 1.1\n---"), "{text}");
    }

    #[test]
    fn bad_version_is_an_error() {
        let mut output = Vec::new();
        let result = Dumper::new(&mut output)
            .version(2, 0)
            .dump(Node::string("x"));
        assert!(result.is_err());
    }

    #[test]
    fn dump_all_writes_document_markers() {
        let mut output = Vec::new();
        Dumper::new(&mut output)
            .dump_all(vec![Node::int(1), Node::int(2)])
            .unwrap();
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text, "1\n--- 2\n...\n");
    }

    #[test]
    fn set_tag_over_sequence_dumps_as_mapping() {
        let node = Node::from_items(vec![
            Node::int(1),
            Node::int(2),
            Node::int(3),
            Node::int(4),
            Node::int(5),
        ])
        .with_tag(crate::SET_TAG)
        .with_collection_style(CollectionStyle::Block);
        let text = dump_to_string(node);
        assert!(text.contains("!!set"), "{text}");
        assert!(text.contains("1: null"), "{text}");
        assert!(!text.contains("- 1"), "{text}");
    }

    #[test]
    fn canonical_dump_reparses_to_same_tree() {
        let node = Node::from_pairs(vec![
            (Node::string("a"), Node::int(1)),
            (
                Node::string("b"),
                Node::from_items(vec![Node::bool(false), Node::null()]),
            ),
        ]);
        let mut output = Vec::new();
        Dumper::new(&mut output).canonical(true).dump(node.clone()).unwrap();
        let text = String::from_utf8(output).unwrap();
        let reloaded = crate::Loader::from_str(&text).load().unwrap();
        assert_eq!(reloaded.root, node);
    }
}
