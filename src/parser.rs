use std::io::Read;

use crate::scanner::Scanner;
use crate::token::DirectiveValue;
use crate::{
    CollectionStyle, Encoding, Event, EventData, Mark, ParserError, ScalarStyle, TagDirective,
    Token, TokenData, VersionDirective,
};

const DEFAULT_TAG_DIRECTIVES: [(&str, &str); 2] = [("!", "!"), ("!!", "tag:yaml.org,2002:")];

/// The states of the parser, one per grammar production.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
enum ParserState {
    /// Expect STREAM-START.
    #[default]
    StreamStart,
    /// Expect the beginning of an implicit document.
    ImplicitDocumentStart,
    /// Expect DOCUMENT-START.
    DocumentStart,
    /// Expect the content of a document.
    DocumentContent,
    /// Expect DOCUMENT-END.
    DocumentEnd,
    /// Expect a block node.
    BlockNode,
    /// Expect a block node or an indentless sequence.
    BlockNodeOrIndentlessSequence,
    /// Expect a flow node.
    FlowNode,
    /// Expect the first entry of a block sequence.
    BlockSequenceFirstEntry,
    /// Expect an entry of a block sequence.
    BlockSequenceEntry,
    /// Expect an entry of an indentless sequence.
    IndentlessSequenceEntry,
    /// Expect the first key of a block mapping.
    BlockMappingFirstKey,
    /// Expect a block mapping key.
    BlockMappingKey,
    /// Expect a block mapping value.
    BlockMappingValue,
    /// Expect the first entry of a flow sequence.
    FlowSequenceFirstEntry,
    /// Expect an entry of a flow sequence.
    FlowSequenceEntry,
    /// Expect a key of a single-pair mapping inside a flow sequence.
    FlowSequenceEntryMappingKey,
    /// Expect a value of a single-pair mapping inside a flow sequence.
    FlowSequenceEntryMappingValue,
    /// Expect the end of a single-pair mapping inside a flow sequence.
    FlowSequenceEntryMappingEnd,
    /// Expect the first key of a flow mapping.
    FlowMappingFirstKey,
    /// Expect a key of a flow mapping.
    FlowMappingKey,
    /// Expect a value of a flow mapping.
    FlowMappingValue,
    /// Expect an empty value of a flow mapping.
    FlowMappingEmptyValue,
    /// Expect nothing.
    End,
}

/// The event-generating stage: drives a recursive descent over the token
/// stream with an explicit stack of pending states.
pub struct Parser<'r> {
    pub(crate) scanner: Scanner<'r>,
    /// The stack of states to return to.
    states: Vec<ParserState>,
    /// The current state.
    state: ParserState,
    /// The stack of marks kept for error context.
    marks: Vec<Mark>,
    /// The tag directives in effect for the current document.
    tag_directives: Vec<TagDirective>,
    pub(crate) stream_end_produced: bool,
}

impl<'r> Parser<'r> {
    pub fn new() -> Parser<'r> {
        Parser {
            scanner: Scanner::new(),
            states: Vec::with_capacity(16),
            state: ParserState::default(),
            marks: Vec::with_capacity(16),
            tag_directives: Vec::with_capacity(16),
            stream_end_produced: false,
        }
    }

    /// Set the input source. Must be called exactly once before parsing.
    pub fn set_input(&mut self, input: impl Read + 'r) {
        self.scanner.set_input(input);
    }

    /// Override encoding detection.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.scanner.set_encoding(encoding);
    }

    /// Parse the input stream and produce the next event.
    ///
    /// The first event is STREAM-START and the last STREAM-END, after which
    /// the parser keeps returning STREAM-END.
    pub fn parse(&mut self) -> Result<Event, ParserError> {
        if self.stream_end_produced || self.state == ParserState::End {
            return Ok(Event::new(EventData::StreamEnd));
        }
        let event = self.state_machine()?;
        if matches!(event.data, EventData::StreamEnd) {
            self.stream_end_produced = true;
        }
        Ok(event)
    }

    fn error<T>(problem: &'static str, mark: Mark) -> Result<T, ParserError> {
        Err(ParserError::Problem { problem, mark })
    }

    fn error_context<T>(
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        mark: Mark,
    ) -> Result<T, ParserError> {
        Err(ParserError::ProblemWithContext {
            context,
            context_mark,
            problem,
            mark,
        })
    }

    fn peek_token(&mut self) -> Result<&Token, ParserError> {
        if !self.scanner.token_available {
            self.scanner.fetch_more_tokens()?;
        }
        Ok(self
            .scanner
            .tokens
            .front()
            .expect("token_available implies a queued token"))
    }

    fn take_token(&mut self) -> Result<Token, ParserError> {
        if !self.scanner.token_available {
            self.scanner.fetch_more_tokens()?;
        }
        self.scanner.token_available = false;
        self.scanner.tokens_taken += 1;
        let token = self
            .scanner
            .tokens
            .pop_front()
            .expect("token_available implies a queued token");
        if matches!(token.data, TokenData::StreamEnd) {
            self.scanner.stream_end_produced = true;
        }
        Ok(token)
    }

    fn skip_token(&mut self) -> Result<(), ParserError> {
        self.take_token().map(drop)
    }

    fn state_machine(&mut self) -> Result<Event, ParserError> {
        match self.state {
            ParserState::StreamStart => self.parse_stream_start(),
            ParserState::ImplicitDocumentStart => self.parse_document_start(true),
            ParserState::DocumentStart => self.parse_document_start(false),
            ParserState::DocumentContent => self.parse_document_content(),
            ParserState::DocumentEnd => self.parse_document_end(),
            ParserState::BlockNode => self.parse_node(true, false),
            ParserState::BlockNodeOrIndentlessSequence => self.parse_node(true, true),
            ParserState::FlowNode => self.parse_node(false, false),
            ParserState::BlockSequenceFirstEntry => self.parse_block_sequence_entry(true),
            ParserState::BlockSequenceEntry => self.parse_block_sequence_entry(false),
            ParserState::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            ParserState::BlockMappingFirstKey => self.parse_block_mapping_key(true),
            ParserState::BlockMappingKey => self.parse_block_mapping_key(false),
            ParserState::BlockMappingValue => self.parse_block_mapping_value(),
            ParserState::FlowSequenceFirstEntry => self.parse_flow_sequence_entry(true),
            ParserState::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            ParserState::FlowSequenceEntryMappingKey => {
                self.parse_flow_sequence_entry_mapping_key()
            }
            ParserState::FlowSequenceEntryMappingValue => {
                self.parse_flow_sequence_entry_mapping_value()
            }
            ParserState::FlowSequenceEntryMappingEnd => {
                self.parse_flow_sequence_entry_mapping_end()
            }
            ParserState::FlowMappingFirstKey => self.parse_flow_mapping_key(true),
            ParserState::FlowMappingKey => self.parse_flow_mapping_key(false),
            ParserState::FlowMappingValue => self.parse_flow_mapping_value(false),
            ParserState::FlowMappingEmptyValue => self.parse_flow_mapping_value(true),
            ParserState::End => unreachable!("parser end state reached unexpectedly"),
        }
    }

    fn empty_scalar(mark: Mark) -> Event {
        Event::spanning(
            EventData::Scalar {
                anchor: None,
                tag: None,
                value: String::new(),
                plain_implicit: true,
                quoted_implicit: false,
                style: ScalarStyle::Plain,
            },
            mark,
            mark,
        )
    }

    fn parse_stream_start(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        let TokenData::StreamStart { encoding } = token.data else {
            let mark = token.start_mark;
            return Self::error("did not find expected <stream-start>", mark);
        };
        let event = Event::spanning(
            EventData::StreamStart { encoding },
            token.start_mark,
            token.end_mark,
        );
        self.state = ParserState::ImplicitDocumentStart;
        self.skip_token()?;
        Ok(event)
    }

    fn parse_document_start(&mut self, implicit: bool) -> Result<Event, ParserError> {
        if !implicit {
            // Skip stray DOCUMENT-END tokens between documents.
            while matches!(self.peek_token()?.data, TokenData::DocumentEnd) {
                self.skip_token()?;
            }
        }
        let token = self.peek_token()?;
        if implicit
            && !matches!(
                token.data,
                TokenData::Directive { .. } | TokenData::DocumentStart | TokenData::StreamEnd
            )
        {
            // A bare document without directives or `---`.
            let start_mark = token.start_mark;
            self.process_directives()?;
            self.states.push(ParserState::DocumentEnd);
            self.state = ParserState::BlockNode;
            return Ok(Event::spanning(
                EventData::DocumentStart {
                    version_directive: None,
                    tag_directives: Vec::new(),
                    implicit: true,
                },
                start_mark,
                start_mark,
            ));
        }
        if matches!(token.data, TokenData::StreamEnd) {
            let event = Event::spanning(EventData::StreamEnd, token.start_mark, token.end_mark);
            self.state = ParserState::End;
            self.skip_token()?;
            return Ok(event);
        }
        let start_mark = token.start_mark;
        let (version_directive, tag_directives) = self.process_directives()?;
        let token = self.peek_token()?;
        let TokenData::DocumentStart = token.data else {
            return Self::error("did not find expected <document start>", token.start_mark);
        };
        let end_mark = token.end_mark;
        self.states.push(ParserState::DocumentEnd);
        self.state = ParserState::DocumentContent;
        self.skip_token()?;
        Ok(Event::spanning(
            EventData::DocumentStart {
                version_directive,
                tag_directives,
                implicit: false,
            },
            start_mark,
            end_mark,
        ))
    }

    /// Consume directive tokens, record `%TAG` handles, and install the
    /// default `!` and `!!` handles.
    #[allow(clippy::type_complexity)]
    fn process_directives(
        &mut self,
    ) -> Result<(Option<VersionDirective>, Vec<TagDirective>), ParserError> {
        let mut version_directive: Option<VersionDirective> = None;
        let mut tag_directives: Vec<TagDirective> = Vec::new();
        while let TokenData::Directive { .. } = self.peek_token()?.data {
            let token = self.take_token()?;
            let TokenData::Directive { value } = token.data else {
                unreachable!()
            };
            match value {
                DirectiveValue::Version { major, minor } => {
                    if version_directive.is_some() {
                        return Self::error("found duplicate %YAML directive", token.start_mark);
                    }
                    version_directive = Some(VersionDirective { major, minor });
                }
                DirectiveValue::Tag { handle, prefix } => {
                    if tag_directives.iter().any(|d| d.handle == handle) {
                        return Self::error("found duplicate %TAG directive", token.start_mark);
                    }
                    tag_directives.push(TagDirective { handle, prefix });
                }
            }
        }
        self.tag_directives = tag_directives.clone();
        for (handle, prefix) in DEFAULT_TAG_DIRECTIVES {
            if !self.tag_directives.iter().any(|d| d.handle == handle) {
                self.tag_directives.push(TagDirective {
                    handle: handle.into(),
                    prefix: prefix.into(),
                });
            }
        }
        Ok((version_directive, tag_directives))
    }

    fn parse_document_content(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if matches!(
            token.data,
            TokenData::Directive { .. }
                | TokenData::DocumentStart
                | TokenData::DocumentEnd
                | TokenData::StreamEnd
        ) {
            let mark = token.start_mark;
            self.state = self.states.pop().expect("state stack");
            Ok(Self::empty_scalar(mark))
        } else {
            self.parse_node(true, false)
        }
    }

    fn parse_document_end(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        let start_mark = token.start_mark;
        let mut end_mark = start_mark;
        let mut implicit = true;
        if matches!(token.data, TokenData::DocumentEnd) {
            end_mark = token.end_mark;
            implicit = false;
            self.skip_token()?;
        }
        self.tag_directives.clear();
        self.state = ParserState::DocumentStart;
        Ok(Event::spanning(
            EventData::DocumentEnd { implicit },
            start_mark,
            end_mark,
        ))
    }

    /// Resolve a tag property against the directives in effect.
    fn resolve_tag(
        &self,
        handle: &str,
        suffix: String,
        start_mark: Mark,
        tag_mark: Mark,
    ) -> Result<String, ParserError> {
        if handle.is_empty() {
            // A verbatim `!<...>` tag, or the bare `!` non-specific tag.
            return Ok(suffix);
        }
        for directive in &self.tag_directives {
            if directive.handle == handle {
                return Ok(format!("{}{}", directive.prefix, suffix));
            }
        }
        Self::error_context(
            "while parsing a node",
            start_mark,
            "found undefined tag handle",
            tag_mark,
        )
    }

    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if matches!(token.data, TokenData::Alias { .. }) {
            let token = self.take_token()?;
            let TokenData::Alias { value } = token.data else {
                unreachable!()
            };
            self.state = self.states.pop().expect("state stack");
            return Ok(Event::spanning(
                EventData::Alias { anchor: value },
                token.start_mark,
                token.end_mark,
            ));
        }

        let mut anchor: Option<String> = None;
        let mut tag_property: Option<(String, String)> = None;
        let mut start_mark = token.start_mark;
        let mut end_mark = token.start_mark;
        let mut tag_mark = token.start_mark;

        if matches!(token.data, TokenData::Anchor { .. }) {
            let token = self.take_token()?;
            let TokenData::Anchor { value } = token.data else {
                unreachable!()
            };
            start_mark = token.start_mark;
            end_mark = token.end_mark;
            anchor = Some(value);
            let token = self.peek_token()?;
            if matches!(token.data, TokenData::Tag { .. }) {
                let token = self.take_token()?;
                let TokenData::Tag { handle, suffix } = token.data else {
                    unreachable!()
                };
                tag_mark = token.start_mark;
                end_mark = token.end_mark;
                tag_property = Some((handle, suffix));
            }
        } else if matches!(token.data, TokenData::Tag { .. }) {
            let token = self.take_token()?;
            let TokenData::Tag { handle, suffix } = token.data else {
                unreachable!()
            };
            start_mark = token.start_mark;
            tag_mark = token.start_mark;
            end_mark = token.end_mark;
            tag_property = Some((handle, suffix));
            let token = self.peek_token()?;
            if matches!(token.data, TokenData::Anchor { .. }) {
                let token = self.take_token()?;
                let TokenData::Anchor { value } = token.data else {
                    unreachable!()
                };
                end_mark = token.end_mark;
                anchor = Some(value);
            }
        }

        let tag = match tag_property {
            Some((handle, suffix)) => {
                Some(self.resolve_tag(&handle, suffix, start_mark, tag_mark)?)
            }
            None => None,
        };

        let implicit = tag.is_none() || tag.as_deref() == Some("");
        let token = self.peek_token()?;

        if indentless_sequence && matches!(token.data, TokenData::BlockEntry) {
            end_mark = token.end_mark;
            self.state = ParserState::IndentlessSequenceEntry;
            return Ok(Event::spanning(
                EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: CollectionStyle::Block,
                },
                start_mark,
                end_mark,
            ));
        }
        if matches!(token.data, TokenData::Scalar { .. }) {
            let token = self.take_token()?;
            let TokenData::Scalar { value, style } = token.data else {
                unreachable!()
            };
            end_mark = token.end_mark;
            // The implicit flags drive the composer's tag resolution: plain
            // scalars resolve by content, quoted ones default to !!str.
            let mut plain_implicit = false;
            let mut quoted_implicit = false;
            if (style == ScalarStyle::Plain && tag.is_none()) || tag.as_deref() == Some("!") {
                plain_implicit = true;
            } else if tag.is_none() {
                quoted_implicit = true;
            }
            self.state = self.states.pop().expect("state stack");
            return Ok(Event::spanning(
                EventData::Scalar {
                    anchor,
                    tag,
                    value,
                    plain_implicit,
                    quoted_implicit,
                    style,
                },
                start_mark,
                end_mark,
            ));
        }
        if matches!(token.data, TokenData::FlowSequenceStart) {
            end_mark = token.end_mark;
            self.state = ParserState::FlowSequenceFirstEntry;
            return Ok(Event::spanning(
                EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: CollectionStyle::Flow,
                },
                start_mark,
                end_mark,
            ));
        }
        if matches!(token.data, TokenData::FlowMappingStart) {
            end_mark = token.end_mark;
            self.state = ParserState::FlowMappingFirstKey;
            return Ok(Event::spanning(
                EventData::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    style: CollectionStyle::Flow,
                },
                start_mark,
                end_mark,
            ));
        }
        if block && matches!(token.data, TokenData::BlockSequenceStart) {
            end_mark = token.end_mark;
            self.state = ParserState::BlockSequenceFirstEntry;
            return Ok(Event::spanning(
                EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: CollectionStyle::Block,
                },
                start_mark,
                end_mark,
            ));
        }
        if block && matches!(token.data, TokenData::BlockMappingStart) {
            end_mark = token.end_mark;
            self.state = ParserState::BlockMappingFirstKey;
            return Ok(Event::spanning(
                EventData::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    style: CollectionStyle::Block,
                },
                start_mark,
                end_mark,
            ));
        }
        if anchor.is_some() || tag.is_some() {
            // Properties with no content stand for an empty scalar.
            self.state = self.states.pop().expect("state stack");
            return Ok(Event::spanning(
                EventData::Scalar {
                    anchor,
                    tag,
                    value: String::new(),
                    plain_implicit: implicit,
                    quoted_implicit: false,
                    style: ScalarStyle::Plain,
                },
                start_mark,
                end_mark,
            ));
        }
        Self::error_context(
            if block {
                "while parsing a block node"
            } else {
                "while parsing a flow node"
            },
            start_mark,
            "did not find expected node content",
            token.start_mark,
        )
    }

    fn parse_block_sequence_entry(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let token = self.peek_token()?;
            let mark = token.start_mark;
            self.marks.push(mark);
            self.skip_token()?;
        }
        let token = self.peek_token()?;
        if matches!(token.data, TokenData::BlockEntry) {
            let mark = token.end_mark;
            self.skip_token()?;
            let token = self.peek_token()?;
            if matches!(token.data, TokenData::BlockEntry | TokenData::BlockEnd) {
                self.state = ParserState::BlockSequenceEntry;
                Ok(Self::empty_scalar(mark))
            } else {
                self.states.push(ParserState::BlockSequenceEntry);
                self.parse_node(true, false)
            }
        } else if matches!(token.data, TokenData::BlockEnd) {
            let event = Event::spanning(EventData::SequenceEnd, token.start_mark, token.end_mark);
            self.state = self.states.pop().expect("state stack");
            self.marks.pop();
            self.skip_token()?;
            Ok(event)
        } else {
            let token_mark = token.start_mark;
            let mark = self.marks.pop().expect("mark stack");
            Self::error_context(
                "while parsing a block collection",
                mark,
                "did not find expected '-' indicator",
                token_mark,
            )
        }
    }

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if matches!(token.data, TokenData::BlockEntry) {
            let mark = token.end_mark;
            self.skip_token()?;
            let token = self.peek_token()?;
            if matches!(
                token.data,
                TokenData::BlockEntry | TokenData::Key | TokenData::Value | TokenData::BlockEnd
            ) {
                self.state = ParserState::IndentlessSequenceEntry;
                Ok(Self::empty_scalar(mark))
            } else {
                self.states.push(ParserState::IndentlessSequenceEntry);
                self.parse_node(true, false)
            }
        } else {
            // An indentless sequence ends at the enclosing mapping's token.
            let event = Event::spanning(EventData::SequenceEnd, token.start_mark, token.start_mark);
            self.state = self.states.pop().expect("state stack");
            Ok(event)
        }
    }

    fn parse_block_mapping_key(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let token = self.peek_token()?;
            let mark = token.start_mark;
            self.marks.push(mark);
            self.skip_token()?;
        }
        let token = self.peek_token()?;
        if matches!(token.data, TokenData::Key) {
            let mark = token.end_mark;
            self.skip_token()?;
            let token = self.peek_token()?;
            if matches!(
                token.data,
                TokenData::Key | TokenData::Value | TokenData::BlockEnd
            ) {
                self.state = ParserState::BlockMappingValue;
                Ok(Self::empty_scalar(mark))
            } else {
                self.states.push(ParserState::BlockMappingValue);
                self.parse_node(true, true)
            }
        } else if matches!(token.data, TokenData::BlockEnd) {
            let event = Event::spanning(EventData::MappingEnd, token.start_mark, token.end_mark);
            self.state = self.states.pop().expect("state stack");
            self.marks.pop();
            self.skip_token()?;
            Ok(event)
        } else {
            let token_mark = token.start_mark;
            let mark = self.marks.pop().expect("mark stack");
            Self::error_context(
                "while parsing a block mapping",
                mark,
                "did not find expected key",
                token_mark,
            )
        }
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if matches!(token.data, TokenData::Value) {
            let mark = token.end_mark;
            self.skip_token()?;
            let token = self.peek_token()?;
            if matches!(
                token.data,
                TokenData::Key | TokenData::Value | TokenData::BlockEnd
            ) {
                self.state = ParserState::BlockMappingKey;
                Ok(Self::empty_scalar(mark))
            } else {
                self.states.push(ParserState::BlockMappingKey);
                self.parse_node(true, true)
            }
        } else {
            let mark = token.start_mark;
            self.state = ParserState::BlockMappingKey;
            Ok(Self::empty_scalar(mark))
        }
    }

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let token = self.peek_token()?;
            let mark = token.start_mark;
            self.marks.push(mark);
            self.skip_token()?;
        }
        let token = self.peek_token()?;
        if !matches!(token.data, TokenData::FlowSequenceEnd) {
            if !first {
                if matches!(token.data, TokenData::FlowEntry) {
                    self.skip_token()?;
                } else {
                    let token_mark = token.start_mark;
                    let mark = self.marks.pop().expect("mark stack");
                    return Self::error_context(
                        "while parsing a flow sequence",
                        mark,
                        "did not find expected ',' or ']'",
                        token_mark,
                    );
                }
            }
            let token = self.peek_token()?;
            if matches!(token.data, TokenData::Key) {
                // A `key: value` pair inside a flow sequence is a single-pair
                // mapping.
                let event = Event::spanning(
                    EventData::MappingStart {
                        anchor: None,
                        tag: None,
                        implicit: true,
                        style: CollectionStyle::Flow,
                    },
                    token.start_mark,
                    token.end_mark,
                );
                self.state = ParserState::FlowSequenceEntryMappingKey;
                self.skip_token()?;
                return Ok(event);
            }
            if !matches!(token.data, TokenData::FlowSequenceEnd) {
                self.states.push(ParserState::FlowSequenceEntry);
                return self.parse_node(false, false);
            }
        }
        let token = self.peek_token()?;
        let event = Event::spanning(EventData::SequenceEnd, token.start_mark, token.end_mark);
        self.state = self.states.pop().expect("state stack");
        self.marks.pop();
        self.skip_token()?;
        Ok(event)
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if matches!(
            token.data,
            TokenData::Value | TokenData::FlowEntry | TokenData::FlowSequenceEnd
        ) {
            let mark = token.end_mark;
            self.state = ParserState::FlowSequenceEntryMappingValue;
            Ok(Self::empty_scalar(mark))
        } else {
            self.states.push(ParserState::FlowSequenceEntryMappingValue);
            self.parse_node(false, false)
        }
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if matches!(token.data, TokenData::Value) {
            let mark = token.end_mark;
            self.skip_token()?;
            let token = self.peek_token()?;
            if matches!(
                token.data,
                TokenData::FlowEntry | TokenData::FlowSequenceEnd
            ) {
                self.state = ParserState::FlowSequenceEntryMappingEnd;
                Ok(Self::empty_scalar(mark))
            } else {
                self.states.push(ParserState::FlowSequenceEntryMappingEnd);
                self.parse_node(false, false)
            }
        } else {
            let mark = token.start_mark;
            self.state = ParserState::FlowSequenceEntryMappingEnd;
            Ok(Self::empty_scalar(mark))
        }
    }

    fn parse_flow_sequence_entry_mapping_end(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        let mark = token.start_mark;
        self.state = ParserState::FlowSequenceEntry;
        Ok(Event::spanning(EventData::MappingEnd, mark, mark))
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let token = self.peek_token()?;
            let mark = token.start_mark;
            self.marks.push(mark);
            self.skip_token()?;
        }
        let token = self.peek_token()?;
        if !matches!(token.data, TokenData::FlowMappingEnd) {
            if !first {
                if matches!(token.data, TokenData::FlowEntry) {
                    self.skip_token()?;
                } else {
                    let token_mark = token.start_mark;
                    let mark = self.marks.pop().expect("mark stack");
                    return Self::error_context(
                        "while parsing a flow mapping",
                        mark,
                        "did not find expected ',' or '}'",
                        token_mark,
                    );
                }
            }
            let token = self.peek_token()?;
            if matches!(token.data, TokenData::Key) {
                let mark = token.end_mark;
                self.skip_token()?;
                let token = self.peek_token()?;
                if matches!(
                    token.data,
                    TokenData::Value | TokenData::FlowEntry | TokenData::FlowMappingEnd
                ) {
                    self.state = ParserState::FlowMappingValue;
                    return Ok(Self::empty_scalar(mark));
                }
                self.states.push(ParserState::FlowMappingValue);
                return self.parse_node(false, false);
            }
            if !matches!(token.data, TokenData::FlowMappingEnd) {
                self.states.push(ParserState::FlowMappingEmptyValue);
                return self.parse_node(false, false);
            }
        }
        let token = self.peek_token()?;
        let event = Event::spanning(EventData::MappingEnd, token.start_mark, token.end_mark);
        self.state = self.states.pop().expect("state stack");
        self.marks.pop();
        self.skip_token()?;
        Ok(event)
    }

    fn parse_flow_mapping_value(&mut self, empty: bool) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if empty {
            let mark = token.start_mark;
            self.state = ParserState::FlowMappingKey;
            return Ok(Self::empty_scalar(mark));
        }
        if matches!(token.data, TokenData::Value) {
            let mark = token.end_mark;
            self.skip_token()?;
            let token = self.peek_token()?;
            if !matches!(
                token.data,
                TokenData::FlowEntry | TokenData::FlowMappingEnd
            ) {
                self.states.push(ParserState::FlowMappingKey);
                return self.parse_node(false, false);
            }
            self.state = ParserState::FlowMappingKey;
            Ok(Self::empty_scalar(mark))
        } else {
            let mark = token.start_mark;
            self.state = ParserState::FlowMappingKey;
            Ok(Self::empty_scalar(mark))
        }
    }
}

impl<'r> Default for Parser<'r> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events_of(input: &str) -> Vec<EventData> {
        let mut parser = Parser::new();
        parser.set_input(input.as_bytes());
        let mut events = Vec::new();
        loop {
            let event = parser.parse().unwrap();
            let done = matches!(event.data, EventData::StreamEnd);
            events.push(event.data);
            if done {
                break;
            }
        }
        events
    }

    fn plain(value: &str) -> EventData {
        EventData::Scalar {
            anchor: None,
            tag: None,
            value: value.into(),
            plain_implicit: true,
            quoted_implicit: false,
            style: ScalarStyle::Plain,
        }
    }

    #[test]
    fn empty_stream() {
        let events = events_of("");
        assert_eq!(
            events,
            [
                EventData::StreamStart {
                    encoding: Encoding::Utf8
                },
                EventData::StreamEnd,
            ]
        );
    }

    #[test]
    fn scalar_document() {
        let events = events_of("hello\n");
        assert!(matches!(events[1], EventData::DocumentStart { implicit: true, .. }));
        assert_eq!(events[2], plain("hello"));
        assert!(matches!(events[3], EventData::DocumentEnd { implicit: true }));
    }

    #[test]
    fn sequence_events_balance() {
        let events = events_of("- a\n- [b, c]\n");
        let mut depth = 0i32;
        for event in &events {
            match event {
                EventData::SequenceStart { .. } | EventData::MappingStart { .. } => depth += 1,
                EventData::SequenceEnd | EventData::MappingEnd => depth -= 1,
                _ => {}
            }
            assert!(depth >= 0);
        }
        assert_eq!(depth, 0);
    }

    #[test]
    fn mapping_with_empty_value() {
        let events = events_of("a:\nb: 1\n");
        assert_eq!(events[3], plain("a"));
        assert_eq!(events[4], plain(""));
        assert_eq!(events[5], plain("b"));
    }

    #[test]
    fn explicit_documents() {
        let events = events_of("---\none\n---\ntwo\n");
        let doc_starts = events
            .iter()
            .filter(|e| matches!(e, EventData::DocumentStart { .. }))
            .count();
        assert_eq!(doc_starts, 2);
    }

    #[test]
    fn secondary_handle_expansion() {
        let events = events_of("!!str 42\n");
        let EventData::Scalar { tag, .. } = &events[2] else {
            panic!("expected scalar");
        };
        assert_eq!(tag.as_deref(), Some("tag:yaml.org,2002:str"));
    }

    #[test]
    fn tag_directive_expansion() {
        let events = events_of("%TAG !e! tag:example.com,2000:\n---\n!e!thing x\n");
        let EventData::Scalar { tag, .. } = &events[2] else {
            panic!("expected scalar");
        };
        assert_eq!(tag.as_deref(), Some("tag:example.com,2000:thing"));
    }

    #[test]
    fn undefined_handle_is_error() {
        let mut parser = Parser::new();
        parser.set_input("!x!thing value\n".as_bytes());
        let result = (0..10).try_for_each(|_| parser.parse().map(drop));
        assert!(result.is_err());
    }

    #[test]
    fn primary_handle_stays_local() {
        let events = events_of("!local x\n");
        let EventData::Scalar { tag, .. } = &events[2] else {
            panic!("expected scalar");
        };
        assert_eq!(tag.as_deref(), Some("!local"));
    }

    #[test]
    fn quoted_scalar_implicit_flags() {
        let events = events_of("'hi'\n");
        let EventData::Scalar {
            plain_implicit,
            quoted_implicit,
            ..
        } = events[2]
        else {
            panic!("expected scalar");
        };
        assert!(!plain_implicit);
        assert!(quoted_implicit);
    }

    #[test]
    fn alias_event() {
        let events = events_of("a: &x 1\nb: *x\n");
        assert!(events
            .iter()
            .any(|e| matches!(e, EventData::Alias { anchor } if anchor == "x")));
    }

    #[test]
    fn flow_pair_in_sequence() {
        let events = events_of("[a: b]\n");
        let mapping_starts = events
            .iter()
            .filter(|e| matches!(e, EventData::MappingStart { .. }))
            .count();
        assert_eq!(mapping_starts, 1);
    }

    #[test]
    fn indentless_sequence() {
        let events = events_of("key:\n- 1\n- 2\n");
        assert!(events
            .iter()
            .any(|e| matches!(e, EventData::SequenceStart { .. })));
    }
}
