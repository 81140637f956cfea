use crate::{Encoding, Mark, ScalarStyle};

/// The token structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token type.
    pub data: TokenData,
    /// The beginning of the token.
    pub start_mark: Mark,
    /// The end of the token.
    pub end_mark: Mark,
}

impl Token {
    pub(crate) fn new(data: TokenData, start_mark: Mark, end_mark: Mark) -> Self {
        Token {
            data,
            start_mark,
            end_mark,
        }
    }
}

/// The body of a `%YAML` or `%TAG` directive. Unknown directives are scanned
/// and dropped by the scanner and never reach the token stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveValue {
    Version { major: i32, minor: i32 },
    Tag { handle: String, prefix: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenData {
    /// A STREAM-START token.
    StreamStart {
        /// The stream encoding.
        encoding: Encoding,
    },
    /// A STREAM-END token.
    StreamEnd,
    /// A DIRECTIVE token (`%YAML` or `%TAG`).
    Directive { value: DirectiveValue },
    /// A DOCUMENT-START token (`---`).
    DocumentStart,
    /// A DOCUMENT-END token (`...`).
    DocumentEnd,
    /// A BLOCK-SEQUENCE-START token.
    BlockSequenceStart,
    /// A BLOCK-MAPPING-START token.
    BlockMappingStart,
    /// A BLOCK-END token.
    BlockEnd,
    /// A FLOW-SEQUENCE-START token (`[`).
    FlowSequenceStart,
    /// A FLOW-SEQUENCE-END token (`]`).
    FlowSequenceEnd,
    /// A FLOW-MAPPING-START token (`{`).
    FlowMappingStart,
    /// A FLOW-MAPPING-END token (`}`).
    FlowMappingEnd,
    /// A BLOCK-ENTRY token (`-`).
    BlockEntry,
    /// A FLOW-ENTRY token (`,`).
    FlowEntry,
    /// A KEY token (`?`, or retroactive for simple keys).
    Key,
    /// A VALUE token (`:`).
    Value,
    /// An ALIAS token (`*name`).
    Alias {
        /// The alias value.
        value: String,
    },
    /// An ANCHOR token (`&name`).
    Anchor {
        /// The anchor value.
        value: String,
    },
    /// A TAG token.
    Tag {
        /// The tag handle.
        handle: String,
        /// The tag suffix.
        suffix: String,
    },
    /// A SCALAR token.
    Scalar {
        /// The scalar value.
        value: String,
        /// The scalar style.
        style: ScalarStyle,
    },
}
