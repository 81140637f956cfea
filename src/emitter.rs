use std::collections::VecDeque;
use std::io::Write;

use crate::chars::{is_anchor_char, is_blank, is_blankz, is_break, is_printable, is_space, is_uri_char};
use crate::{
    Break, CollectionStyle, EmitterError, Encoding, Event, EventData, ScalarStyle, TagDirective,
    VersionDirective,
};

pub(crate) const OUTPUT_BUFFER_SIZE: usize = 16384;

/// The states of the emitter.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
enum EmitterState {
    /// Expect STREAM-START.
    #[default]
    StreamStart,
    /// Expect the first DOCUMENT-START or STREAM-END.
    FirstDocumentStart,
    /// Expect DOCUMENT-START or STREAM-END.
    DocumentStart,
    /// Expect the content of a document.
    DocumentContent,
    /// Expect DOCUMENT-END.
    DocumentEnd,
    /// Expect the first item of a flow sequence.
    FlowSequenceFirstItem,
    /// Expect an item of a flow sequence.
    FlowSequenceItem,
    /// Expect the first key of a flow mapping.
    FlowMappingFirstKey,
    /// Expect a key of a flow mapping.
    FlowMappingKey,
    /// Expect a value for a simple key of a flow mapping.
    FlowMappingSimpleValue,
    /// Expect a value of a flow mapping.
    FlowMappingValue,
    /// Expect the first item of a block sequence.
    BlockSequenceFirstItem,
    /// Expect an item of a block sequence.
    BlockSequenceItem,
    /// Expect the first key of a block mapping.
    BlockMappingFirstKey,
    /// Expect the key of a block mapping.
    BlockMappingKey,
    /// Expect a value for a simple key of a block mapping.
    BlockMappingSimpleValue,
    /// Expect a value of a block mapping.
    BlockMappingValue,
    /// Expect nothing.
    End,
}

/// Characters that can only be rendered through a double-quoted escape: the
/// non-printable set, plus tabs and the BOM.
fn needs_escape(ch: char) -> bool {
    !is_printable(ch) || ch == '\t' || ch == '\u{FEFF}'
}

/// Character-level facts about a scalar, gathered once and consulted by the
/// style selection rules.
#[derive(Default)]
struct ScalarAnalysis {
    empty: bool,
    multiline: bool,
    allow_flow_plain: bool,
    allow_block_plain: bool,
    allow_single_quoted: bool,
    allow_double_quoted: bool,
    allow_block: bool,
}

/// The rendering stage: turns events into characters, choosing styles,
/// indentation and line wrapping. The characters are encoded to bytes by the
/// writer half (`writer.rs`).
///
/// The emitter owns its sink; a `&mut W` sink works too, since mutable
/// references implement `Write`.
pub struct Emitter<W: Write> {
    pub(crate) output: W,
    /// Characters accumulated since the last flush.
    pub(crate) buffer: String,
    /// Encoded bytes awaiting the sink, for multi-byte output encodings.
    pub(crate) raw_buffer: Vec<u8>,
    pub(crate) encoding: Encoding,

    canonical: bool,
    best_indent: i32,
    best_width: i32,
    line_break: Break,

    states: Vec<EmitterState>,
    state: EmitterState,
    /// Bounded look-ahead of events awaiting processing.
    events: VecDeque<Event>,
    indents: Vec<i32>,
    indent: i32,
    flow_level: usize,

    root_context: bool,
    sequence_context: bool,
    mapping_context: bool,
    simple_key_context: bool,

    pub(crate) line: i32,
    pub(crate) column: i32,
    whitespace: bool,
    indention: bool,
    open_ended: i32,

    tag_directives: Vec<TagDirective>,
    opened: bool,
    closed: bool,
}

impl<W: Write> Emitter<W> {
    pub fn new(output: W) -> Emitter<W> {
        Emitter {
            output,
            buffer: String::with_capacity(OUTPUT_BUFFER_SIZE),
            raw_buffer: Vec::new(),
            encoding: Encoding::Any,
            canonical: false,
            best_indent: 2,
            best_width: 80,
            line_break: Break::Any,
            states: Vec::with_capacity(16),
            state: EmitterState::default(),
            events: VecDeque::with_capacity(16),
            indents: Vec::with_capacity(16),
            indent: -1,
            flow_level: 0,
            root_context: false,
            sequence_context: false,
            mapping_context: false,
            simple_key_context: false,
            line: 0,
            column: 0,
            whitespace: true,
            indention: true,
            open_ended: 0,
            tag_directives: Vec::new(),
            opened: false,
            closed: false,
        }
    }

    /// Emit everything in the canonical form.
    pub fn set_canonical(&mut self, canonical: bool) {
        self.canonical = canonical;
    }

    /// Set the indentation increment, clamped to 2..9.
    pub fn set_indent(&mut self, indent: i32) {
        self.best_indent = if indent >= 2 && indent <= 9 { indent } else { 2 };
    }

    /// Set the preferred line width; non-positive means unlimited.
    pub fn set_width(&mut self, width: i32) {
        self.best_width = if width > 0 { width } else { -1 };
    }

    /// Set the output line break style.
    pub fn set_line_break(&mut self, line_break: Break) {
        self.line_break = line_break;
    }

    /// Set the output encoding.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
    }

    /// Has the stream been opened?
    pub fn is_open(&self) -> bool {
        self.opened
    }

    /// Start a stream: emits STREAM-START with the configured encoding.
    pub fn open(&mut self) -> Result<(), EmitterError> {
        assert!(!self.opened, "emitter already opened");
        let encoding = self.encoding;
        self.emit(Event::stream_start(encoding))?;
        self.opened = true;
        Ok(())
    }

    /// Finish the stream: emits STREAM-END and flushes.
    pub fn close(&mut self) -> Result<(), EmitterError> {
        assert!(self.opened, "emitter not opened");
        if self.closed {
            return Ok(());
        }
        self.emit(Event::stream_end())?;
        self.closed = true;
        Ok(())
    }

    fn error<T>(problem: &'static str) -> Result<T, EmitterError> {
        Err(EmitterError::Problem(problem))
    }

    /// Emit an event.
    ///
    /// Events are buffered until enough look-ahead is available to decide on
    /// styles and implicit tags: one extra event for DOCUMENT-START, two for
    /// SEQUENCE-START, three for MAPPING-START.
    pub fn emit(&mut self, event: Event) -> Result<(), EmitterError> {
        self.events.push_back(event);
        while let Some(event) = self.next_processable_event() {
            self.state_machine(&event)?;
        }
        Ok(())
    }

    fn next_processable_event(&mut self) -> Option<Event> {
        let first = self.events.front()?;
        let accumulate = match &first.data {
            EventData::DocumentStart { .. } => 1,
            EventData::SequenceStart { .. } => 2,
            EventData::MappingStart { .. } => 3,
            _ => return self.events.pop_front(),
        };
        if self.events.len() > accumulate {
            return self.events.pop_front();
        }
        // Count nesting; a balanced prefix means the decision can be made.
        let mut level = 0i32;
        for event in &self.events {
            match event.data {
                EventData::StreamStart { .. }
                | EventData::DocumentStart { .. }
                | EventData::SequenceStart { .. }
                | EventData::MappingStart { .. } => level += 1,
                EventData::StreamEnd
                | EventData::DocumentEnd { .. }
                | EventData::SequenceEnd
                | EventData::MappingEnd => level -= 1,
                _ => {}
            }
            if level <= 0 {
                return self.events.pop_front();
            }
        }
        None
    }

    fn state_machine(&mut self, event: &Event) -> Result<(), EmitterError> {
        match self.state {
            EmitterState::StreamStart => self.emit_stream_start(event),
            EmitterState::FirstDocumentStart => self.emit_document_start(event, true),
            EmitterState::DocumentStart => self.emit_document_start(event, false),
            EmitterState::DocumentContent => {
                self.states.push(EmitterState::DocumentEnd);
                self.emit_node(event, true, false, false, false)
            }
            EmitterState::DocumentEnd => self.emit_document_end(event),
            EmitterState::FlowSequenceFirstItem => self.emit_flow_sequence_item(event, true),
            EmitterState::FlowSequenceItem => self.emit_flow_sequence_item(event, false),
            EmitterState::FlowMappingFirstKey => self.emit_flow_mapping_key(event, true),
            EmitterState::FlowMappingKey => self.emit_flow_mapping_key(event, false),
            EmitterState::FlowMappingSimpleValue => self.emit_flow_mapping_value(event, true),
            EmitterState::FlowMappingValue => self.emit_flow_mapping_value(event, false),
            EmitterState::BlockSequenceFirstItem => self.emit_block_sequence_item(event, true),
            EmitterState::BlockSequenceItem => self.emit_block_sequence_item(event, false),
            EmitterState::BlockMappingFirstKey => self.emit_block_mapping_key(event, true),
            EmitterState::BlockMappingKey => self.emit_block_mapping_key(event, false),
            EmitterState::BlockMappingSimpleValue => self.emit_block_mapping_value(event, true),
            EmitterState::BlockMappingValue => self.emit_block_mapping_value(event, false),
            EmitterState::End => Self::error("expected nothing after STREAM-END"),
        }
    }

    fn emit_stream_start(&mut self, event: &Event) -> Result<(), EmitterError> {
        let EventData::StreamStart { encoding } = &event.data else {
            return Self::error("expected STREAM-START");
        };
        if self.encoding == Encoding::Any {
            self.encoding = *encoding;
        }
        if self.encoding == Encoding::Any {
            self.encoding = Encoding::Utf8;
        }
        if self.best_indent < 2 || self.best_indent > 9 {
            self.best_indent = 2;
        }
        if self.best_width >= 0 && self.best_width <= self.best_indent * 2 {
            self.best_width = 80;
        }
        if self.best_width < 0 {
            self.best_width = i32::MAX;
        }
        if self.line_break == Break::Any {
            self.line_break = Break::Ln;
        }
        self.indent = -1;
        self.line = 0;
        self.column = 0;
        self.whitespace = true;
        self.indention = true;
        self.open_ended = 0;
        if self.encoding != Encoding::Utf8 {
            self.write_bom()?;
        }
        self.state = EmitterState::FirstDocumentStart;
        Ok(())
    }

    fn emit_document_start(&mut self, event: &Event, first: bool) -> Result<(), EmitterError> {
        if let EventData::DocumentStart {
            version_directive,
            tag_directives,
            implicit,
        } = &event.data
        {
            let mut implicit = *implicit;
            if let Some(version_directive) = version_directive {
                Self::analyze_version_directive(*version_directive)?;
            }
            for tag_directive in tag_directives {
                Self::analyze_tag_directive(tag_directive)?;
                self.append_tag_directive(tag_directive.clone(), false)?;
            }
            for (handle, prefix) in [("!", "!"), ("!!", "tag:yaml.org,2002:")] {
                self.append_tag_directive(
                    TagDirective {
                        handle: handle.into(),
                        prefix: prefix.into(),
                    },
                    true,
                )?;
            }
            if !first || self.canonical {
                implicit = false;
            }
            if (version_directive.is_some() || !tag_directives.is_empty()) && self.open_ended != 0
            {
                self.write_indicator("...", true, false, false)?;
                self.write_indent()?;
            }
            self.open_ended = 0;
            if let Some(version_directive) = version_directive {
                implicit = false;
                self.write_indicator("%YAML", true, false, false)?;
                let version = format!("{}.{}", version_directive.major, version_directive.minor);
                self.write_indicator(&version, true, false, false)?;
                self.write_indent()?;
            }
            if !tag_directives.is_empty() {
                implicit = false;
                for tag_directive in tag_directives.clone() {
                    self.write_indicator("%TAG", true, false, false)?;
                    self.write_tag_handle(&tag_directive.handle)?;
                    self.write_tag_content(&tag_directive.prefix, true)?;
                    self.write_indent()?;
                }
            }
            if self.check_empty_document() {
                implicit = false;
            }
            if !implicit {
                self.write_indent()?;
                self.write_indicator("---", true, false, false)?;
                if self.canonical {
                    self.write_indent()?;
                }
            }
            self.state = EmitterState::DocumentContent;
            self.open_ended = 0;
            return Ok(());
        }
        if let EventData::StreamEnd = &event.data {
            if self.open_ended == 2 {
                self.write_indicator("...", true, false, false)?;
                self.open_ended = 0;
                self.write_indent()?;
            }
            self.flush()?;
            self.state = EmitterState::End;
            return Ok(());
        }
        Self::error("expected DOCUMENT-START or STREAM-END")
    }

    fn emit_document_end(&mut self, event: &Event) -> Result<(), EmitterError> {
        let EventData::DocumentEnd { implicit } = &event.data else {
            return Self::error("expected DOCUMENT-END");
        };
        self.write_indent()?;
        if *implicit {
            if self.open_ended == 1 {
                self.open_ended = 2;
            }
        } else {
            self.write_indicator("...", true, false, false)?;
            self.write_indent()?;
            self.open_ended = 0;
        }
        self.flush()?;
        self.state = EmitterState::DocumentStart;
        self.tag_directives.clear();
        Ok(())
    }

    fn emit_node(
        &mut self,
        event: &Event,
        root: bool,
        sequence: bool,
        mapping: bool,
        simple_key: bool,
    ) -> Result<(), EmitterError> {
        self.root_context = root;
        self.sequence_context = sequence;
        self.mapping_context = mapping;
        self.simple_key_context = simple_key;
        match &event.data {
            EventData::Alias { .. } => self.emit_alias(event),
            EventData::Scalar { .. } => self.emit_scalar(event),
            EventData::SequenceStart { .. } => self.emit_sequence_start(event),
            EventData::MappingStart { .. } => self.emit_mapping_start(event),
            _ => Self::error("expected SCALAR, SEQUENCE-START, MAPPING-START, or ALIAS"),
        }
    }

    fn emit_alias(&mut self, event: &Event) -> Result<(), EmitterError> {
        let EventData::Alias { anchor } = &event.data else {
            unreachable!()
        };
        let anchor = anchor.clone();
        self.process_anchor(Some(&anchor), "*")?;
        if self.simple_key_context {
            self.write_char(' ')?;
        }
        self.state = self.states.pop().expect("emitter state stack");
        Ok(())
    }

    fn emit_scalar(&mut self, event: &Event) -> Result<(), EmitterError> {
        let EventData::Scalar {
            anchor,
            tag,
            value,
            plain_implicit,
            quoted_implicit,
            style,
        } = &event.data
        else {
            unreachable!()
        };
        let anchor = anchor.clone();
        let tag = tag.clone();
        let value = value.clone();
        let analysis = Self::analyze_scalar(&value);
        let style = self.select_scalar_style(
            *style,
            &analysis,
            tag.as_deref(),
            *plain_implicit,
            *quoted_implicit,
        )?;
        self.process_anchor(anchor.as_deref(), "&")?;
        let implicit = if style == ScalarStyle::Plain {
            *plain_implicit
        } else {
            *quoted_implicit
        };
        self.process_tag(tag.as_deref(), implicit, *plain_implicit, style)?;
        self.increase_indent(true, false);
        self.process_scalar(&value, style)?;
        self.indent = self.indents.pop().expect("indent stack");
        self.state = self.states.pop().expect("emitter state stack");
        Ok(())
    }

    fn emit_sequence_start(&mut self, event: &Event) -> Result<(), EmitterError> {
        let EventData::SequenceStart {
            anchor,
            tag,
            implicit,
            style,
        } = &event.data
        else {
            unreachable!()
        };
        let anchor = anchor.clone();
        let tag = tag.clone();
        self.process_anchor(anchor.as_deref(), "&")?;
        self.process_tag(tag.as_deref(), *implicit, false, ScalarStyle::Any)?;
        if self.flow_level > 0
            || self.canonical
            || *style == CollectionStyle::Flow
            || self.check_empty_sequence()
        {
            self.state = EmitterState::FlowSequenceFirstItem;
        } else {
            self.state = EmitterState::BlockSequenceFirstItem;
        }
        Ok(())
    }

    fn emit_mapping_start(&mut self, event: &Event) -> Result<(), EmitterError> {
        let EventData::MappingStart {
            anchor,
            tag,
            implicit,
            style,
        } = &event.data
        else {
            unreachable!()
        };
        let anchor = anchor.clone();
        let tag = tag.clone();
        self.process_anchor(anchor.as_deref(), "&")?;
        self.process_tag(tag.as_deref(), *implicit, false, ScalarStyle::Any)?;
        if self.flow_level > 0
            || self.canonical
            || *style == CollectionStyle::Flow
            || self.check_empty_mapping()
        {
            self.state = EmitterState::FlowMappingFirstKey;
        } else {
            self.state = EmitterState::BlockMappingFirstKey;
        }
        Ok(())
    }

    fn emit_flow_sequence_item(&mut self, event: &Event, first: bool) -> Result<(), EmitterError> {
        if first {
            self.write_indicator("[", true, true, false)?;
            self.increase_indent(true, false);
            self.flow_level += 1;
        }
        if let EventData::SequenceEnd = &event.data {
            self.flow_level -= 1;
            self.indent = self.indents.pop().expect("indent stack");
            if self.canonical && !first {
                self.write_indicator(",", false, false, false)?;
                self.write_indent()?;
            }
            self.write_indicator("]", false, false, false)?;
            self.state = self.states.pop().expect("emitter state stack");
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if self.canonical || self.column > self.best_width {
            self.write_indent()?;
        }
        self.states.push(EmitterState::FlowSequenceItem);
        self.emit_node(event, false, true, false, false)
    }

    fn emit_flow_mapping_key(&mut self, event: &Event, first: bool) -> Result<(), EmitterError> {
        if first {
            self.write_indicator("{", true, true, false)?;
            self.increase_indent(true, false);
            self.flow_level += 1;
        }
        if let EventData::MappingEnd = &event.data {
            self.flow_level -= 1;
            self.indent = self.indents.pop().expect("indent stack");
            if self.canonical && !first {
                self.write_indicator(",", false, false, false)?;
                self.write_indent()?;
            }
            self.write_indicator("}", false, false, false)?;
            self.state = self.states.pop().expect("emitter state stack");
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if self.canonical || self.column > self.best_width {
            self.write_indent()?;
        }
        if !self.canonical && self.check_simple_key(event) {
            self.states.push(EmitterState::FlowMappingSimpleValue);
            self.emit_node(event, false, false, true, true)
        } else {
            self.write_indicator("?", true, false, false)?;
            self.states.push(EmitterState::FlowMappingValue);
            self.emit_node(event, false, false, true, false)
        }
    }

    fn emit_flow_mapping_value(&mut self, event: &Event, simple: bool) -> Result<(), EmitterError> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            if self.canonical || self.column > self.best_width {
                self.write_indent()?;
            }
            self.write_indicator(":", true, false, false)?;
        }
        self.states.push(EmitterState::FlowMappingKey);
        self.emit_node(event, false, false, true, false)
    }

    fn emit_block_sequence_item(&mut self, event: &Event, first: bool) -> Result<(), EmitterError> {
        if first {
            // An indentless sequence sits at its mapping's indentation.
            self.increase_indent(false, self.mapping_context && !self.indention);
        }
        if let EventData::SequenceEnd = &event.data {
            self.indent = self.indents.pop().expect("indent stack");
            self.state = self.states.pop().expect("emitter state stack");
            return Ok(());
        }
        self.write_indent()?;
        self.write_indicator("-", true, false, true)?;
        self.states.push(EmitterState::BlockSequenceItem);
        self.emit_node(event, false, true, false, false)
    }

    fn emit_block_mapping_key(&mut self, event: &Event, first: bool) -> Result<(), EmitterError> {
        if first {
            self.increase_indent(false, false);
        }
        if let EventData::MappingEnd = &event.data {
            self.indent = self.indents.pop().expect("indent stack");
            self.state = self.states.pop().expect("emitter state stack");
            return Ok(());
        }
        self.write_indent()?;
        if self.check_simple_key(event) {
            self.states.push(EmitterState::BlockMappingSimpleValue);
            self.emit_node(event, false, false, true, true)
        } else {
            self.write_indicator("?", true, false, true)?;
            self.states.push(EmitterState::BlockMappingValue);
            self.emit_node(event, false, false, true, false)
        }
    }

    fn emit_block_mapping_value(
        &mut self,
        event: &Event,
        simple: bool,
    ) -> Result<(), EmitterError> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            self.write_indent()?;
            self.write_indicator(":", true, false, true)?;
        }
        self.states.push(EmitterState::BlockMappingKey);
        self.emit_node(event, false, false, true, false)
    }

    /// May this event be rendered on one short line as an implicit key?
    fn check_simple_key(&self, event: &Event) -> bool {
        match &event.data {
            EventData::Alias { anchor } => anchor.len() <= 128,
            EventData::Scalar {
                anchor, tag, value, ..
            } => {
                let length = anchor.as_deref().map_or(0, str::len)
                    + tag.as_deref().map_or(0, str::len)
                    + value.len();
                length <= 128 && !value.contains(|ch| is_break(ch))
            }
            EventData::SequenceStart { .. } => self.check_empty_sequence(),
            EventData::MappingStart { .. } => self.check_empty_mapping(),
            _ => false,
        }
    }

    fn check_empty_sequence(&self) -> bool {
        if self.events.is_empty() {
            return false;
        }
        matches!(self.events[0].data, EventData::SequenceEnd)
    }

    fn check_empty_mapping(&self) -> bool {
        if self.events.is_empty() {
            return false;
        }
        matches!(self.events[0].data, EventData::MappingEnd)
    }

    fn check_empty_document(&self) -> bool {
        false
    }

    fn analyze_version_directive(
        version_directive: VersionDirective,
    ) -> Result<(), EmitterError> {
        if version_directive.major != 1 {
            return Self::error("incompatible %YAML directive");
        }
        Ok(())
    }

    fn analyze_tag_directive(tag_directive: &TagDirective) -> Result<(), EmitterError> {
        let handle = &tag_directive.handle;
        if handle.is_empty() {
            return Self::error("tag handle must not be empty");
        }
        if !handle.starts_with('!') || !handle.ends_with('!') {
            return Self::error("tag handle must start and end with '!'");
        }
        if handle.len() > 2 && !handle[1..handle.len() - 1].chars().all(is_anchor_char) {
            return Self::error("tag handle must contain alphanumerical characters only");
        }
        if tag_directive.prefix.is_empty() {
            return Self::error("tag prefix must not be empty");
        }
        Ok(())
    }

    fn append_tag_directive(
        &mut self,
        value: TagDirective,
        allow_duplicates: bool,
    ) -> Result<(), EmitterError> {
        for tag_directive in &self.tag_directives {
            if value.handle == tag_directive.handle {
                if allow_duplicates {
                    return Ok(());
                }
                return Self::error("duplicate %TAG directive");
            }
        }
        self.tag_directives.push(value);
        Ok(())
    }

    fn increase_indent(&mut self, flow: bool, indentless: bool) {
        self.indents.push(self.indent);
        if self.indent < 0 {
            self.indent = if flow { self.best_indent } else { 0 };
        } else if !indentless {
            self.indent += self.best_indent;
        }
    }

    fn process_anchor(
        &mut self,
        anchor: Option<&str>,
        indicator: &str,
    ) -> Result<(), EmitterError> {
        let Some(anchor) = anchor else {
            return Ok(());
        };
        if anchor.is_empty() || !anchor.chars().all(is_anchor_char) {
            return Self::error("anchor must contain alphanumerical characters only");
        }
        self.write_indicator(indicator, true, false, false)?;
        self.write_string(anchor)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    /// Write the tag for the node being emitted, unless the implicit flag
    /// says the parser would re-detect it.
    fn process_tag(
        &mut self,
        tag: Option<&str>,
        implicit: bool,
        plain_implicit: bool,
        style: ScalarStyle,
    ) -> Result<(), EmitterError> {
        if implicit && !self.canonical {
            return Ok(());
        }
        let Some(tag) = tag else {
            if style != ScalarStyle::Plain && style != ScalarStyle::Any && plain_implicit {
                // A quoted rendering of a plain-implicit scalar still parses
                // back correctly under the non-specific tag.
                self.write_indicator("!", true, false, false)?;
                self.whitespace = false;
                self.indention = false;
                return Ok(());
            }
            return Self::error("neither tag nor implicit flags are specified");
        };
        if tag.is_empty() {
            return Self::error("tag must not be empty");
        }
        if tag == "!" {
            self.write_indicator("!", true, false, false)?;
            self.whitespace = false;
            self.indention = false;
            return Ok(());
        }
        // Rewrite the canonical form through a matching %TAG directive.
        let mut handle: Option<String> = None;
        let mut suffix = tag.to_string();
        for tag_directive in &self.tag_directives {
            if tag.starts_with(&tag_directive.prefix) && tag.len() > tag_directive.prefix.len() {
                handle = Some(tag_directive.handle.clone());
                suffix = tag[tag_directive.prefix.len()..].to_string();
                break;
            }
        }
        match handle {
            Some(handle) => {
                self.write_tag_handle(&handle)?;
                self.write_tag_content(&suffix, false)?;
            }
            None => {
                self.write_indicator("!<", true, false, false)?;
                self.write_tag_content(&suffix, false)?;
                self.write_indicator(">", false, false, false)?;
            }
        }
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    /// Gather the character-level flags that constrain the scalar's styles.
    fn analyze_scalar(value: &str) -> ScalarAnalysis {
        if value.is_empty() {
            return ScalarAnalysis {
                empty: true,
                multiline: false,
                allow_flow_plain: false,
                allow_block_plain: false,
                allow_single_quoted: true,
                allow_double_quoted: true,
                allow_block: false,
            };
        }

        let mut block_indicators = false;
        let mut flow_indicators = false;
        let mut line_breaks = false;
        let mut special_characters = false;
        let mut leading_space = false;
        let mut leading_break = false;
        let mut trailing_space = false;
        let mut trailing_break = false;
        let mut break_space = false;
        let mut space_break = false;
        let mut previous_space = false;
        let mut previous_break = false;

        if value.starts_with("---") || value.starts_with("...") {
            block_indicators = true;
            flow_indicators = true;
        }

        let starts_with_indicator = matches!(
            value.chars().next(),
            Some(
                '#' | ',' | '[' | ']' | '{' | '}' | '&' | '*' | '!' | '|' | '>' | '\'' | '"'
                    | '%' | '@' | '`'
            )
        );
        if starts_with_indicator {
            flow_indicators = true;
            block_indicators = true;
        }

        let chars: Vec<char> = value.chars().collect();
        let mut preceded_by_whitespace = true;
        for (index, &ch) in chars.iter().enumerate() {
            let next = chars.get(index + 1).copied();
            let followed_by_whitespace = next.map_or(true, |n| is_blank(n) || is_break(n));
            if index == 0 {
                match ch {
                    '-' | '?' | ':' if followed_by_whitespace => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    '-' | '?' | ':' => {
                        // Allowed to start a plain scalar.
                    }
                    _ => {}
                }
            } else {
                match ch {
                    ',' | '[' | ']' | '{' | '}' => {
                        flow_indicators = true;
                    }
                    ':' => {
                        flow_indicators = true;
                        if followed_by_whitespace {
                            block_indicators = true;
                        }
                    }
                    '?' => {
                        flow_indicators = true;
                    }
                    '#' if preceded_by_whitespace => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    _ => {}
                }
            }
            if needs_escape(ch) {
                special_characters = true;
            }
            if is_break(ch) {
                line_breaks = true;
            }
            if is_space(ch) {
                if index == 0 {
                    leading_space = true;
                }
                if index == chars.len() - 1 {
                    trailing_space = true;
                }
                if previous_break {
                    break_space = true;
                }
                previous_space = true;
                previous_break = false;
            } else if is_break(ch) {
                if index == 0 {
                    leading_break = true;
                }
                if index == chars.len() - 1 {
                    trailing_break = true;
                }
                if previous_space {
                    space_break = true;
                }
                previous_space = false;
                previous_break = true;
            } else {
                previous_space = false;
                previous_break = false;
            }
            preceded_by_whitespace = is_blankz(ch);
        }

        let mut analysis = ScalarAnalysis {
            empty: false,
            multiline: line_breaks,
            allow_flow_plain: true,
            allow_block_plain: true,
            allow_single_quoted: true,
            allow_double_quoted: true,
            allow_block: true,
        };
        if leading_space || leading_break || trailing_space || trailing_break {
            analysis.allow_flow_plain = false;
            analysis.allow_block_plain = false;
        }
        if trailing_space {
            analysis.allow_block = false;
        }
        if break_space {
            analysis.allow_flow_plain = false;
            analysis.allow_block_plain = false;
            analysis.allow_single_quoted = false;
        }
        if space_break || special_characters {
            analysis.allow_flow_plain = false;
            analysis.allow_block_plain = false;
            analysis.allow_single_quoted = false;
            analysis.allow_block = false;
        }
        if line_breaks {
            analysis.allow_flow_plain = false;
            analysis.allow_block_plain = false;
        }
        if flow_indicators {
            analysis.allow_flow_plain = false;
        }
        if block_indicators {
            analysis.allow_block_plain = false;
        }
        analysis
    }

    /// Pick the style the scalar will actually be written in, by precedence:
    /// canonical/forced double; plain; requested block; single; double.
    fn select_scalar_style(
        &mut self,
        requested: ScalarStyle,
        analysis: &ScalarAnalysis,
        tag: Option<&str>,
        plain_implicit: bool,
        quoted_implicit: bool,
    ) -> Result<ScalarStyle, EmitterError> {
        let no_tag = tag.is_none();
        if no_tag && !plain_implicit && !quoted_implicit {
            return Self::error("neither tag nor implicit flags are specified");
        }
        let mut style = if requested == ScalarStyle::Any {
            ScalarStyle::Plain
        } else {
            requested
        };
        if self.canonical {
            style = ScalarStyle::DoubleQuoted;
        }
        if self.simple_key_context && (analysis.multiline || analysis.empty) {
            style = ScalarStyle::DoubleQuoted;
        }
        if style == ScalarStyle::Plain {
            if (self.flow_level > 0 && !analysis.allow_flow_plain)
                || (self.flow_level == 0 && !analysis.allow_block_plain)
            {
                style = ScalarStyle::SingleQuoted;
            }
            if analysis.empty && (self.flow_level > 0 || self.simple_key_context) {
                style = ScalarStyle::SingleQuoted;
            }
            // Plain output must be re-detectable by the resolver.
            if !plain_implicit && !analysis.empty {
                style = ScalarStyle::SingleQuoted;
            }
        }
        if style == ScalarStyle::SingleQuoted && !analysis.allow_single_quoted {
            style = ScalarStyle::DoubleQuoted;
        }
        if style == ScalarStyle::Literal || style == ScalarStyle::Folded {
            if !analysis.allow_block || self.flow_level > 0 || self.simple_key_context {
                style = ScalarStyle::DoubleQuoted;
            }
        }
        // Everything can be escaped; double-quoted is the fallback of last
        // resort.
        debug_assert!(analysis.allow_double_quoted);
        Ok(style)
    }

    fn process_scalar(&mut self, value: &str, style: ScalarStyle) -> Result<(), EmitterError> {
        match style {
            ScalarStyle::Plain => self.write_plain_scalar(value, !self.simple_key_context),
            ScalarStyle::SingleQuoted => {
                self.write_single_quoted_scalar(value, !self.simple_key_context)
            }
            ScalarStyle::DoubleQuoted => {
                self.write_double_quoted_scalar(value, !self.simple_key_context)
            }
            ScalarStyle::Literal => self.write_literal_scalar(value),
            ScalarStyle::Folded => self.write_folded_scalar(value),
            ScalarStyle::Any => unreachable!("style was selected before writing"),
        }
    }

    // Low-level character output. The writer half (`writer.rs`) drains
    // `buffer` into the byte sink.

    fn flush_if_needed(&mut self) -> Result<(), EmitterError> {
        if self.buffer.len() >= OUTPUT_BUFFER_SIZE - 5 {
            self.flush()?;
        }
        Ok(())
    }

    fn write_char(&mut self, ch: char) -> Result<(), EmitterError> {
        self.flush_if_needed()?;
        self.buffer.push(ch);
        self.column += 1;
        Ok(())
    }

    fn write_string(&mut self, string: &str) -> Result<(), EmitterError> {
        for ch in string.chars() {
            self.write_char(ch)?;
        }
        Ok(())
    }

    fn put_break(&mut self) -> Result<(), EmitterError> {
        self.flush_if_needed()?;
        match self.line_break {
            Break::Cr => self.buffer.push('\r'),
            Break::CrLn => self.buffer.push_str("\r\n"),
            Break::Ln | Break::Any => self.buffer.push('\n'),
        }
        self.column = 0;
        self.line += 1;
        Ok(())
    }

    /// Write one line break from scalar content: ASCII breaks become the
    /// configured break, U+2028/U+2029 are kept verbatim.
    fn write_break(&mut self, ch: char) -> Result<(), EmitterError> {
        if ch == '\n' {
            self.put_break()?;
        } else {
            self.write_char(ch)?;
            self.column = 0;
            self.line += 1;
        }
        Ok(())
    }

    pub(crate) fn write_indent(&mut self) -> Result<(), EmitterError> {
        let indent = self.indent.max(0);
        if !self.indention || self.column > indent || (self.column == indent && !self.whitespace)
        {
            self.put_break()?;
        }
        while self.column < indent {
            self.write_char(' ')?;
        }
        self.whitespace = true;
        self.indention = true;
        Ok(())
    }

    fn write_indicator(
        &mut self,
        indicator: &str,
        need_whitespace: bool,
        is_whitespace: bool,
        is_indention: bool,
    ) -> Result<(), EmitterError> {
        if need_whitespace && !self.whitespace {
            self.write_char(' ')?;
        }
        self.write_string(indicator)?;
        self.whitespace = is_whitespace;
        self.indention = self.indention && is_indention;
        Ok(())
    }

    fn write_tag_handle(&mut self, handle: &str) -> Result<(), EmitterError> {
        if !self.whitespace {
            self.write_char(' ')?;
        }
        self.write_string(handle)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_tag_content(
        &mut self,
        content: &str,
        need_whitespace: bool,
    ) -> Result<(), EmitterError> {
        if need_whitespace && !self.whitespace {
            self.write_char(' ')?;
        }
        for ch in content.chars() {
            if is_uri_char(ch) && ch != '%' {
                self.write_char(ch)?;
            } else {
                let mut encoded = [0u8; 4];
                for octet in ch.encode_utf8(&mut encoded).as_bytes() {
                    self.write_string(&format!("%{octet:02X}"))?;
                }
            }
        }
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_plain_scalar(
        &mut self,
        value: &str,
        allow_breaks: bool,
    ) -> Result<(), EmitterError> {
        if !self.whitespace {
            self.write_char(' ')?;
        }
        let chars: Vec<char> = value.chars().collect();
        let mut spaces = false;
        let mut breaks = false;
        for (index, &ch) in chars.iter().enumerate() {
            if is_space(ch) {
                if allow_breaks
                    && !spaces
                    && self.column > self.best_width
                    && index + 1 < chars.len()
                    && !is_space(chars[index + 1])
                {
                    self.write_indent()?;
                } else {
                    self.write_char(ch)?;
                }
                spaces = true;
            } else if is_break(ch) {
                if !breaks && ch == '\n' {
                    self.put_break()?;
                }
                self.write_break(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                self.write_char(ch)?;
                self.indention = false;
                spaces = false;
                breaks = false;
            }
        }
        self.whitespace = false;
        self.indention = false;
        if self.root_context {
            self.open_ended = 1;
        }
        Ok(())
    }

    fn write_single_quoted_scalar(
        &mut self,
        value: &str,
        allow_breaks: bool,
    ) -> Result<(), EmitterError> {
        self.write_indicator("'", true, false, false)?;
        let chars: Vec<char> = value.chars().collect();
        let mut spaces = false;
        let mut breaks = false;
        for (index, &ch) in chars.iter().enumerate() {
            if is_space(ch) {
                if allow_breaks
                    && !spaces
                    && self.column > self.best_width
                    && index != 0
                    && index + 1 < chars.len()
                    && !is_space(chars[index + 1])
                {
                    self.write_indent()?;
                } else {
                    self.write_char(ch)?;
                }
                spaces = true;
            } else if is_break(ch) {
                if !breaks && ch == '\n' {
                    self.put_break()?;
                }
                self.write_break(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                if ch == '\'' {
                    self.write_char('\'')?;
                }
                self.write_char(ch)?;
                self.indention = false;
                spaces = false;
                breaks = false;
            }
        }
        self.write_indicator("'", false, false, false)?;
        Ok(())
    }

    fn write_double_quoted_scalar(
        &mut self,
        value: &str,
        allow_breaks: bool,
    ) -> Result<(), EmitterError> {
        self.write_indicator("\"", true, false, false)?;
        let chars: Vec<char> = value.chars().collect();
        let mut spaces = false;
        for (index, &ch) in chars.iter().enumerate() {
            if needs_escape(ch) || ch == '"' || ch == '\\' || is_break(ch) {
                self.write_escaped_char(ch)?;
                spaces = false;
            } else if is_space(ch) {
                if allow_breaks
                    && !spaces
                    && self.column > self.best_width
                    && index != 0
                    && index + 1 < chars.len()
                {
                    self.write_indent()?;
                    if is_space(chars[index + 1]) {
                        self.write_char('\\')?;
                    }
                } else {
                    self.write_char(ch)?;
                }
                spaces = true;
            } else {
                self.write_char(ch)?;
                spaces = false;
            }
        }
        self.write_indicator("\"", false, false, false)?;
        Ok(())
    }

    fn write_escaped_char(&mut self, ch: char) -> Result<(), EmitterError> {
        let named = match ch {
            '\0' => Some('0'),
            '\x07' => Some('a'),
            '\x08' => Some('b'),
            '\t' => Some('t'),
            '\n' => Some('n'),
            '\x0B' => Some('v'),
            '\x0C' => Some('f'),
            '\r' => Some('r'),
            '\x1B' => Some('e'),
            '"' => Some('"'),
            '\\' => Some('\\'),
            '\u{0085}' => Some('N'),
            '\u{00A0}' => Some('_'),
            '\u{2028}' => Some('L'),
            '\u{2029}' => Some('P'),
            _ => None,
        };
        self.write_char('\\')?;
        match named {
            Some(named) => self.write_char(named)?,
            None => {
                let code = ch as u32;
                let escaped = if code <= 0xFF {
                    format!("x{code:02X}")
                } else if code <= 0xFFFF {
                    format!("u{code:04X}")
                } else {
                    format!("U{code:08X}")
                };
                self.write_string(&escaped)?;
            }
        }
        Ok(())
    }

    /// Write the indentation and chomping hints of a block scalar header.
    fn write_block_scalar_hints(&mut self, value: &str) -> Result<(), EmitterError> {
        let first = value.chars().next();
        if first.map_or(false, |ch| is_space(ch) || is_break(ch)) {
            let hint = self.best_indent.to_string();
            self.write_indicator(&hint, false, false, false)?;
        }
        self.open_ended = 0;
        let chars: Vec<char> = value.chars().collect();
        let chomp_hint = if chars.last().map_or(true, |&ch| !is_break(ch)) {
            Some("-")
        } else if chars.len() == 1 || chars[..chars.len() - 1].last().map_or(false, |&ch| is_break(ch)) {
            self.open_ended = 1;
            Some("+")
        } else {
            None
        };
        if let Some(chomp_hint) = chomp_hint {
            self.write_indicator(chomp_hint, false, false, false)?;
        }
        Ok(())
    }

    fn write_literal_scalar(&mut self, value: &str) -> Result<(), EmitterError> {
        self.write_indicator("|", true, false, false)?;
        self.write_block_scalar_hints(value)?;
        self.put_break()?;
        self.indention = true;
        self.whitespace = true;
        let mut breaks = true;
        for ch in value.chars() {
            if is_break(ch) {
                self.write_break(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                self.write_char(ch)?;
                self.indention = false;
                breaks = false;
            }
        }
        Ok(())
    }

    fn write_folded_scalar(&mut self, value: &str) -> Result<(), EmitterError> {
        self.write_indicator(">", true, false, false)?;
        self.write_block_scalar_hints(value)?;
        self.put_break()?;
        self.indention = true;
        self.whitespace = true;
        let chars: Vec<char> = value.chars().collect();
        let mut breaks = true;
        let mut leading_spaces = true;
        for (index, &ch) in chars.iter().enumerate() {
            if is_break(ch) {
                if !breaks && !leading_spaces && ch == '\n' {
                    // An extra break separates folded paragraphs.
                    let mut k = index;
                    while k < chars.len() && is_break(chars[k]) {
                        k += 1;
                    }
                    if k < chars.len() && !is_blank(chars[k]) {
                        self.put_break()?;
                    }
                }
                self.write_break(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                    leading_spaces = is_blank(ch);
                }
                if !breaks
                    && is_space(ch)
                    && index + 1 < chars.len()
                    && !is_space(chars[index + 1])
                    && self.column > self.best_width
                {
                    self.write_indent()?;
                } else {
                    self.write_char(ch)?;
                }
                self.indention = false;
                breaks = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit_events(events: Vec<Event>) -> String {
        let mut output = Vec::new();
        {
            let mut emitter = Emitter::new(&mut output);
            for event in events {
                emitter.emit(event).unwrap();
            }
        }
        String::from_utf8(output).unwrap()
    }

    fn doc(body: Vec<Event>) -> Vec<Event> {
        let mut events = vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, Vec::new(), true),
        ];
        events.extend(body);
        events.push(Event::document_end(true));
        events.push(Event::stream_end());
        events
    }

    fn plain(value: &str) -> Event {
        Event::scalar(None, None, value, true, false, ScalarStyle::Plain)
    }

    #[test]
    fn plain_scalar_document() {
        let text = emit_events(doc(vec![plain("hello")]));
        assert_eq!(text, "hello\n...\n");
    }

    #[test]
    fn block_mapping() {
        let text = emit_events(doc(vec![
            Event::mapping_start(None, None, true, CollectionStyle::Block),
            plain("a"),
            plain("1"),
            plain("b"),
            plain("2"),
            Event::mapping_end(),
        ]));
        assert_eq!(text, "a: 1\nb: 2\n");
    }

    #[test]
    fn block_sequence() {
        let text = emit_events(doc(vec![
            Event::sequence_start(None, None, true, CollectionStyle::Block),
            plain("one"),
            plain("two"),
            Event::sequence_end(),
        ]));
        assert_eq!(text, "- one\n- two\n");
    }

    #[test]
    fn flow_sequence() {
        let text = emit_events(doc(vec![
            Event::sequence_start(None, None, true, CollectionStyle::Flow),
            plain("1"),
            plain("2"),
            Event::sequence_end(),
        ]));
        assert_eq!(text, "[1, 2]\n");
    }

    #[test]
    fn empty_collections_fall_back_to_flow() {
        let text = emit_events(doc(vec![
            Event::mapping_start(None, None, true, CollectionStyle::Block),
            plain("a"),
            Event::sequence_start(None, None, true, CollectionStyle::Block),
            Event::sequence_end(),
            plain("b"),
            Event::mapping_start(None, None, true, CollectionStyle::Block),
            Event::mapping_end(),
            Event::mapping_end(),
        ]));
        assert_eq!(text, "a: []\nb: {}\n");
    }

    #[test]
    fn multiline_plain_becomes_single_quoted() {
        let text = emit_events(doc(vec![plain("1st non-empty\n2nd non-empty")]));
        assert_eq!(text, "'1st non-empty\n\n  2nd non-empty'\n");
    }

    #[test]
    fn document_marker_lookalikes_are_quoted() {
        let text = emit_events(doc(vec![plain("--- a")]));
        assert_eq!(text, "'--- a'\n");
        let text = emit_events(doc(vec![plain("... b")]));
        assert_eq!(text, "'... b'\n");
    }

    #[test]
    fn nested_block_collections() {
        let text = emit_events(doc(vec![
            Event::mapping_start(None, None, true, CollectionStyle::Block),
            plain("outer"),
            Event::sequence_start(None, None, true, CollectionStyle::Block),
            plain("x"),
            Event::sequence_end(),
            Event::mapping_end(),
        ]));
        assert_eq!(text, "outer:\n- x\n");
    }

    #[test]
    fn anchors_and_aliases_render() {
        let text = emit_events(doc(vec![
            Event::sequence_start(None, None, true, CollectionStyle::Block),
            Event::scalar(
                Some("id001".into()),
                None,
                "shared",
                true,
                false,
                ScalarStyle::Plain,
            ),
            Event::alias("id001"),
            Event::sequence_end(),
        ]));
        assert_eq!(text, "- &id001 shared\n- *id001\n");
    }

    #[test]
    fn explicit_tag_renders_with_secondary_handle() {
        let text = emit_events(doc(vec![Event::scalar(
            None,
            Some("tag:yaml.org,2002:int".into()),
            "3",
            false,
            false,
            ScalarStyle::Plain,
        )]));
        assert_eq!(text, "!!int '3'\n");
    }

    #[test]
    fn verbatim_tag_renders_angle_bracketed() {
        let text = emit_events(doc(vec![Event::scalar(
            None,
            Some("x-private:thing".into()),
            "3",
            false,
            false,
            ScalarStyle::Plain,
        )]));
        assert_eq!(text, "!<x-private:thing> '3'\n");
    }

    #[test]
    fn literal_scalar_with_clip() {
        let text = emit_events(doc(vec![Event::scalar(
            None,
            None,
            "line one\nline two\n",
            false,
            true,
            ScalarStyle::Literal,
        )]));
        assert_eq!(text, "|\n  line one\n  line two\n");
    }

    #[test]
    fn literal_scalar_strip_hint() {
        let text = emit_events(doc(vec![Event::scalar(
            None,
            None,
            "no trailing break",
            false,
            true,
            ScalarStyle::Literal,
        )]));
        assert_eq!(text, "|-\n  no trailing break\n");
    }

    #[test]
    fn literal_scalar_keep_hint() {
        let text = emit_events(doc(vec![Event::scalar(
            None,
            None,
            "text\n\n",
            false,
            true,
            ScalarStyle::Literal,
        )]));
        assert_eq!(text, "|+\n  text\n\n...\n");
    }

    #[test]
    fn double_quoted_escapes() {
        let text = emit_events(doc(vec![Event::scalar(
            None,
            None,
            "tab\there",
            false,
            true,
            ScalarStyle::DoubleQuoted,
        )]));
        assert_eq!(text, "\"tab\\there\"\n");
    }

    #[test]
    fn explicit_document_markers() {
        let mut events = vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, Vec::new(), false),
            plain("x"),
            Event::document_end(false),
            Event::stream_end(),
        ];
        let text = emit_events(std::mem::take(&mut events));
        assert_eq!(text, "--- x\n...\n");
    }

    #[test]
    fn version_directive_renders() {
        let text = emit_events(vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(
                Some(VersionDirective { major: 1, minor: 1 }),
                Vec::new(),
                true,
            ),
            plain("x"),
            Event::document_end(true),
            Event::stream_end(),
        ]);
        assert_eq!(text, "%YAML 1.1\n--- x\n...\n");
    }

    #[test]
    fn canonical_mode_quotes_and_tags() {
        let mut output = Vec::new();
        {
            let mut emitter = Emitter::new(&mut output);
            emitter.set_canonical(true);
            for event in doc(vec![Event::scalar(
                None,
                Some("tag:yaml.org,2002:str".into()),
                "hi",
                true,
                true,
                ScalarStyle::Any,
            )]) {
                emitter.emit(event).unwrap();
            }
        }
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("\"hi\""), "{text}");
        assert!(text.contains("---"), "{text}");
    }

    #[test]
    fn wide_flow_sequence_wraps() {
        let mut output = Vec::new();
        {
            let mut emitter = Emitter::new(&mut output);
            emitter.set_width(20);
            let mut events = vec![
                Event::stream_start(Encoding::Utf8),
                Event::document_start(None, Vec::new(), true),
                Event::sequence_start(None, None, true, CollectionStyle::Flow),
            ];
            for _ in 0..8 {
                events.push(plain("abcdef"));
            }
            events.push(Event::sequence_end());
            events.push(Event::document_end(true));
            events.push(Event::stream_end());
            for event in events {
                emitter.emit(event).unwrap();
            }
        }
        let text = String::from_utf8(output).unwrap();
        assert!(text.lines().count() > 1, "{text}");
        assert!(text.lines().all(|line| line.len() <= 28), "{text}");
    }

    #[test]
    fn windows_line_breaks() {
        let mut output = Vec::new();
        {
            let mut emitter = Emitter::new(&mut output);
            emitter.set_line_break(Break::CrLn);
            for event in doc(vec![
                Event::mapping_start(None, None, true, CollectionStyle::Block),
                plain("a"),
                plain("1"),
                Event::mapping_end(),
            ]) {
                emitter.emit(event).unwrap();
            }
        }
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text, "a: 1\r\n");
    }

    #[test]
    fn utf16le_output_carries_bom() {
        let mut output = Vec::new();
        {
            let mut emitter = Emitter::new(&mut output);
            emitter.set_encoding(Encoding::Utf16Le);
            for event in doc(vec![plain("a")]) {
                emitter.emit(event).unwrap();
            }
        }
        assert_eq!(&output[..2], &[0xFF, 0xFE]);
    }
}
