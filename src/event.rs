use crate::{
    CollectionStyle, Encoding, Mark, ScalarStyle, TagDirective, VersionDirective,
};

/// The event structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// The event data.
    pub data: EventData,
    /// The beginning of the event.
    pub start_mark: Mark,
    /// The end of the event.
    pub end_mark: Mark,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    /// The stream parameters.
    StreamStart {
        /// The stream encoding.
        encoding: Encoding,
    },
    StreamEnd,
    /// The document parameters.
    DocumentStart {
        /// The version directive.
        version_directive: Option<VersionDirective>,
        /// The tag directives list.
        tag_directives: Vec<TagDirective>,
        /// Is the document indicator implicit?
        implicit: bool,
    },
    DocumentEnd {
        implicit: bool,
    },
    /// A reference to a previously anchored node.
    Alias {
        /// The anchor.
        anchor: String,
    },
    /// The scalar parameters.
    Scalar {
        /// The anchor.
        anchor: Option<String>,
        /// The tag.
        tag: Option<String>,
        /// The scalar value.
        value: String,
        /// Would the resolver detect the tag from the plain form?
        plain_implicit: bool,
        /// Is the tag the default for any non-plain style?
        quoted_implicit: bool,
        /// The scalar style.
        style: ScalarStyle,
    },
    /// The sequence parameters.
    SequenceStart {
        /// The anchor.
        anchor: Option<String>,
        /// The tag.
        tag: Option<String>,
        /// Is the tag optional?
        implicit: bool,
        /// The sequence style.
        style: CollectionStyle,
    },
    SequenceEnd,
    /// The mapping parameters.
    MappingStart {
        /// The anchor.
        anchor: Option<String>,
        /// The tag.
        tag: Option<String>,
        /// Is the tag optional?
        implicit: bool,
        /// The mapping style.
        style: CollectionStyle,
    },
    MappingEnd,
}

impl Event {
    /// Make an event from its data, setting both marks to zero.
    pub(crate) fn new(data: EventData) -> Self {
        Self {
            data,
            start_mark: Mark::default(),
            end_mark: Mark::default(),
        }
    }

    pub(crate) fn spanning(data: EventData, start_mark: Mark, end_mark: Mark) -> Self {
        Self {
            data,
            start_mark,
            end_mark,
        }
    }

    /// Create the STREAM-START event.
    pub fn stream_start(encoding: Encoding) -> Self {
        Self::new(EventData::StreamStart { encoding })
    }

    /// Create the STREAM-END event.
    pub fn stream_end() -> Self {
        Self::new(EventData::StreamEnd)
    }

    /// Create the DOCUMENT-START event.
    ///
    /// The `implicit` argument is stylistic and may be ignored by the emitter.
    pub fn document_start(
        version_directive: Option<VersionDirective>,
        tag_directives: Vec<TagDirective>,
        implicit: bool,
    ) -> Self {
        Self::new(EventData::DocumentStart {
            version_directive,
            tag_directives,
            implicit,
        })
    }

    /// Create the DOCUMENT-END event.
    pub fn document_end(implicit: bool) -> Self {
        Self::new(EventData::DocumentEnd { implicit })
    }

    /// Create an ALIAS event.
    pub fn alias(anchor: impl Into<String>) -> Self {
        Self::new(EventData::Alias {
            anchor: anchor.into(),
        })
    }

    /// Create a SCALAR event.
    ///
    /// Either the `tag` attribute or one of the implicit flags must be set.
    pub fn scalar(
        anchor: Option<String>,
        tag: Option<String>,
        value: impl Into<String>,
        plain_implicit: bool,
        quoted_implicit: bool,
        style: ScalarStyle,
    ) -> Self {
        Self::new(EventData::Scalar {
            anchor,
            tag,
            value: value.into(),
            plain_implicit,
            quoted_implicit,
            style,
        })
    }

    /// Create a SEQUENCE-START event.
    pub fn sequence_start(
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        style: CollectionStyle,
    ) -> Self {
        Self::new(EventData::SequenceStart {
            anchor,
            tag,
            implicit,
            style,
        })
    }

    /// Create a SEQUENCE-END event.
    pub fn sequence_end() -> Self {
        Self::new(EventData::SequenceEnd)
    }

    /// Create a MAPPING-START event.
    pub fn mapping_start(
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        style: CollectionStyle,
    ) -> Self {
        Self::new(EventData::MappingStart {
            anchor,
            tag,
            implicit,
            style,
        })
    }

    /// Create a MAPPING-END event.
    pub fn mapping_end() -> Self {
        Self::new(EventData::MappingEnd)
    }
}
