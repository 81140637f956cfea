/// A source position attached to tokens, events and nodes for diagnostics.
///
/// Both coordinates are zero-based and saturate at `u16::MAX` rather than
/// wrapping on pathologically long inputs.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct Mark {
    /// The position line.
    pub line: u16,
    /// The position column.
    pub column: u16,
}

impl Mark {
    pub(crate) fn bump_column(&mut self) {
        self.column = self.column.saturating_add(1);
    }

    pub(crate) fn bump_line(&mut self) {
        self.line = self.line.saturating_add(1);
        self.column = 0;
    }
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {} column {}", self.line, self.column)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("invalid byte order marker")]
    InvalidBom,
    #[error("invalid UTF-8 octet sequence at offset {offset}")]
    InvalidUtf8 { offset: usize },
    #[error("invalid UTF-16 surrogate at offset {offset}: {value:x}")]
    InvalidUtf16 { offset: usize, value: u16 },
    #[error("invalid UTF-32 code unit at offset {offset}: {value:x}")]
    InvalidUtf32 { offset: usize, value: u32 },
    #[error("incomplete {encoding} character at offset {offset}")]
    Incomplete {
        encoding: &'static str,
        offset: usize,
    },
    #[error("character {value:#x} at offset {offset} is outside the printable subset")]
    NonPrintable { offset: usize, value: u32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("{}: {} {} ({})", problem_mark, problem, context, context_mark)]
    Problem {
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        problem_mark: Mark,
    },
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("{}: {}", mark, problem)]
    Problem { problem: &'static str, mark: Mark },
    #[error("{}: {} {} ({})", mark, problem, context, context_mark)]
    ProblemWithContext {
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        mark: Mark,
    },
    #[error(transparent)]
    Scanner(#[from] ScannerError),
}

#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    #[error("{}: {}", mark, problem)]
    Problem { problem: &'static str, mark: Mark },
    #[error("{}: {} {} ({})", mark, problem, context, context_mark)]
    ProblemWithContext {
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        mark: Mark,
    },
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Constructor(#[from] ConstructorError),
}

#[derive(Debug, thiserror::Error)]
#[error("{}: {}", mark, problem)]
pub struct ConstructorError {
    pub problem: String,
    pub mark: Mark,
}

#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum EmitterError {
    #[error("{0}")]
    Problem(&'static str),
    #[error(transparent)]
    Writer(#[from] WriterError),
}

#[derive(Debug, thiserror::Error)]
pub enum RepresenterError {
    #[error("no representer registered for {type_name}")]
    NoRepresenter { type_name: &'static str },
    #[error("{0}")]
    Problem(String),
}

/// Errors surfaced while dumping a node tree.
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("{0}")]
    Problem(&'static str),
    #[error(transparent)]
    Emitter(#[from] EmitterError),
    #[error(transparent)]
    Representer(#[from] RepresenterError),
}
