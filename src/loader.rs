use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::composer::{Composer, Document};
use crate::constructor::Constructor;
use crate::resolver::Resolver;
use crate::{ComposerError, Encoding, Mark};

/// The input facade: wires a byte source through the reader, scanner, parser
/// and composer, and hands out documents.
///
/// The resolver and constructor may be swapped before the first document is
/// pulled.
pub struct Loader<'r> {
    composer: Composer<'r>,
}

impl<'r> Loader<'r> {
    /// Load from an in-memory string.
    pub fn from_str(input: &'r str) -> Loader<'r> {
        Self::from_reader(input.as_bytes())
    }

    /// Load from an in-memory byte buffer.
    pub fn from_bytes(input: &'r [u8]) -> Loader<'r> {
        Self::from_reader(input)
    }

    /// Load from a file path.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Loader<'static>> {
        let file = File::open(path)?;
        Ok(Loader::from_reader(file))
    }

    /// Load from an arbitrary byte source.
    pub fn from_reader(input: impl Read + 'r) -> Loader<'r> {
        let mut composer = Composer::new();
        composer.set_input(input);
        Loader { composer }
    }

    /// Override encoding detection.
    pub fn with_encoding(mut self, encoding: Encoding) -> Loader<'r> {
        self.composer.set_encoding(encoding);
        self
    }

    /// Swap the tag resolver.
    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Loader<'r> {
        self.composer.set_resolver(resolver);
        self
    }

    /// Swap the constructor.
    pub fn with_constructor(mut self, constructor: Constructor) -> Loader<'r> {
        self.composer.set_constructor(constructor);
        self
    }

    /// Load exactly one document. Zero documents, or more than one, is an
    /// error.
    pub fn load(mut self) -> Result<Document, ComposerError> {
        let Some(document) = self.composer.next_document()? else {
            return Err(ComposerError::Problem {
                problem: "expected a single document in the stream",
                mark: Mark::default(),
            });
        };
        if let Some(extra) = self.composer.next_document()? {
            return Err(ComposerError::ProblemWithContext {
                context: "expected a single document in the stream",
                context_mark: document.start_mark,
                problem: "but found another document",
                mark: extra.start_mark,
            });
        }
        Ok(document)
    }

    /// Load every document in the stream.
    pub fn load_all(self) -> Result<Vec<Document>, ComposerError> {
        self.documents().collect()
    }

    /// Iterate over documents lazily, one per pull.
    pub fn documents(self) -> Documents<'r> {
        Documents {
            composer: self.composer,
            done: false,
        }
    }
}

/// A lazy document iterator. Fuses after the first error: any error is fatal
/// for the rest of the stream.
pub struct Documents<'r> {
    composer: Composer<'r>,
    done: bool,
}

impl<'r> Iterator for Documents<'r> {
    type Item = Result<Document, ComposerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.composer.next_document() {
            Ok(Some(document)) => Some(Ok(document)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_single() {
        let doc = Loader::from_str("Answer: 42").load().unwrap();
        assert_eq!(doc.root["Answer"].as_int(), Some(42));
    }

    #[test]
    fn load_rejects_empty_stream() {
        assert!(Loader::from_str("").load().is_err());
    }

    #[test]
    fn load_rejects_second_document() {
        let err = Loader::from_str("---\none\n---\ntwo\n").load().unwrap_err();
        assert!(err.to_string().contains("single document"));
    }

    #[test]
    fn load_all_collects() {
        let docs = Loader::from_str("---\n1\n---\n2\n---\n3\n").load_all().unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[2].root.as_int(), Some(3));
    }

    #[test]
    fn documents_iterator_is_lazy_and_fused() {
        let mut documents = Loader::from_str("---\nok\n---\n[unclosed\n").documents();
        assert!(documents.next().unwrap().is_ok());
        assert!(documents.next().unwrap().is_err());
        assert!(documents.next().is_none());
    }

    #[test]
    fn empty_stream_yields_no_documents() {
        assert_eq!(Loader::from_str("").load_all().unwrap().len(), 0);
        assert_eq!(Loader::from_str("# only a comment\n").load_all().unwrap().len(), 0);
    }
}
