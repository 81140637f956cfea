use std::collections::VecDeque;
use std::io::Read;

use log::debug;

use crate::chars::{
    is_anchor_char, is_blank, is_blankz, is_break, is_breakz, is_flow_indicator, is_uri_char, is_z,
};
use crate::reader::Reader;
use crate::token::DirectiveValue;
use crate::{Encoding, Mark, ScalarStyle, ScannerError, Token, TokenData};

/// A simple key is a mapping key that fits on one line, letting the `:`
/// indicator appear after the key instead of a leading `?`. One candidate is
/// tracked per flow level.
#[derive(Copy, Clone, Default)]
struct SimpleKey {
    /// Is a simple key possible at this flow level?
    possible: bool,
    /// Must this candidate turn out to be a key?
    required: bool,
    /// Position in the token stream where the KEY token would be inserted.
    token_number: usize,
    /// Character index of the candidate, for the 1024-character window.
    index: usize,
    /// The position mark.
    mark: Mark,
}

/// Chomping policy for trailing breaks of a block scalar.
#[derive(Copy, Clone, PartialEq, Eq)]
enum Chomping {
    Strip,
    Clip,
    Keep,
}

/// The tokenizing stage: turns the reader's character stream into tokens,
/// tracking block indentation and simple-key eligibility.
pub struct Scanner<'r> {
    reader: Reader<'r>,
    /// Tokens scanned ahead of the parser.
    pub(crate) tokens: VecDeque<Token>,
    /// Count of tokens already handed to the parser.
    pub(crate) tokens_taken: usize,
    pub(crate) token_available: bool,
    stream_start_produced: bool,
    pub(crate) stream_end_produced: bool,
    /// The current block indentation column, -1 before the first node.
    indent: i32,
    /// Previous indentation levels.
    indents: Vec<i32>,
    /// Depth of nested flow collections; 0 means block context.
    flow_level: usize,
    /// One simple-key candidate per flow level.
    simple_keys: Vec<SimpleKey>,
    /// May a new simple key start at the current position?
    simple_key_allowed: bool,
}

impl<'r> Scanner<'r> {
    pub fn new() -> Scanner<'r> {
        Scanner {
            reader: Reader::new(),
            tokens: VecDeque::with_capacity(16),
            tokens_taken: 0,
            token_available: false,
            stream_start_produced: false,
            stream_end_produced: false,
            indent: -1,
            indents: Vec::with_capacity(16),
            flow_level: 0,
            simple_keys: Vec::with_capacity(16),
            simple_key_allowed: false,
        }
    }

    /// Set the input source. Must be called exactly once before scanning.
    pub fn set_input(&mut self, input: impl Read + 'r) {
        self.reader.set_input(input);
    }

    /// Override encoding detection.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.reader.set_encoding(encoding);
    }

    /// Scan the input stream and produce the next token.
    ///
    /// The first token is always STREAM-START and the last STREAM-END, after
    /// which the scanner keeps returning STREAM-END.
    pub fn scan(&mut self) -> Result<Token, ScannerError> {
        if self.stream_end_produced {
            return Ok(Token::new(
                TokenData::StreamEnd,
                self.reader.mark,
                self.reader.mark,
            ));
        }
        if !self.token_available {
            self.fetch_more_tokens()?;
        }
        let token = self
            .tokens
            .pop_front()
            .expect("token_available implies a queued token");
        self.token_available = false;
        self.tokens_taken += 1;
        if matches!(token.data, TokenData::StreamEnd) {
            self.stream_end_produced = true;
        }
        Ok(token)
    }

    fn error<T>(
        &self,
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
    ) -> Result<T, ScannerError> {
        Err(ScannerError::Problem {
            context,
            context_mark,
            problem,
            problem_mark: self.reader.mark,
        })
    }

    /// Fill the queue until the front token cannot be displaced by a
    /// retroactive KEY insertion.
    pub(crate) fn fetch_more_tokens(&mut self) -> Result<(), ScannerError> {
        loop {
            let mut need_more = self.tokens.is_empty();
            if !need_more {
                self.stale_simple_keys()?;
                for simple_key in &self.simple_keys {
                    if simple_key.possible && simple_key.token_number == self.tokens_taken {
                        need_more = true;
                        break;
                    }
                }
            }
            if !need_more {
                break;
            }
            self.fetch_next_token()?;
        }
        self.token_available = true;
        Ok(())
    }

    fn fetch_next_token(&mut self) -> Result<(), ScannerError> {
        self.reader.ensure(1)?;
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }
        self.scan_to_next_token()?;
        self.stale_simple_keys()?;
        self.unroll_indent(self.reader.mark.column as i32);
        self.reader.ensure(4)?;

        let ch = self.reader.peek(0);
        if is_z(ch) {
            return self.fetch_stream_end();
        }
        if self.reader.mark.column == 0 && ch == '%' {
            return self.fetch_directive();
        }
        if self.reader.mark.column == 0
            && self.reader.prefix(3) == "---"
            && is_blankz(self.reader.peek(3))
        {
            return self.fetch_document_indicator(TokenData::DocumentStart);
        }
        if self.reader.mark.column == 0
            && self.reader.prefix(3) == "..."
            && is_blankz(self.reader.peek(3))
        {
            return self.fetch_document_indicator(TokenData::DocumentEnd);
        }
        match ch {
            '[' => return self.fetch_flow_collection_start(TokenData::FlowSequenceStart),
            '{' => return self.fetch_flow_collection_start(TokenData::FlowMappingStart),
            ']' => return self.fetch_flow_collection_end(TokenData::FlowSequenceEnd),
            '}' => return self.fetch_flow_collection_end(TokenData::FlowMappingEnd),
            ',' => return self.fetch_flow_entry(),
            '-' if is_blankz(self.reader.peek(1)) => return self.fetch_block_entry(),
            '?' if self.flow_level > 0 || is_blankz(self.reader.peek(1)) => {
                return self.fetch_key();
            }
            ':' if self.flow_level > 0 || is_blankz(self.reader.peek(1)) => {
                return self.fetch_value();
            }
            '*' => return self.fetch_anchor(true),
            '&' => return self.fetch_anchor(false),
            '!' => return self.fetch_tag(),
            '|' if self.flow_level == 0 => return self.fetch_block_scalar(true),
            '>' if self.flow_level == 0 => return self.fetch_block_scalar(false),
            '\'' => return self.fetch_flow_scalar(true),
            '"' => return self.fetch_flow_scalar(false),
            _ => {}
        }
        if self.check_plain_start() {
            return self.fetch_plain_scalar();
        }
        self.error(
            "while scanning for the next token",
            self.reader.mark,
            "found character that cannot start any token",
        )
    }

    /// A plain scalar may start with any character that is not an indicator,
    /// or with `-`, `?` or `:` when they are not followed by a blank.
    fn check_plain_start(&self) -> bool {
        let ch = self.reader.peek(0);
        let indicator = is_blankz(ch)
            || matches!(
                ch,
                '-' | '?'
                    | ':'
                    | ','
                    | '['
                    | ']'
                    | '{'
                    | '}'
                    | '#'
                    | '&'
                    | '*'
                    | '!'
                    | '|'
                    | '>'
                    | '\''
                    | '"'
                    | '%'
                    | '@'
                    | '`'
            );
        if !indicator {
            return true;
        }
        if ch == '-' && !is_blankz(self.reader.peek(1)) {
            return true;
        }
        self.flow_level == 0
            && matches!(ch, '?' | ':')
            && !is_blankz(self.reader.peek(1))
    }

    /// Skip whitespace, comments and line breaks up to the next token start.
    fn scan_to_next_token(&mut self) -> Result<(), ScannerError> {
        loop {
            self.reader.ensure(1)?;
            if self.reader.index == 0 && self.reader.peek(0) == '\u{FEFF}' {
                self.reader.forward(1);
            }
            // Tabs are skipped only where they cannot introduce indentation.
            while self.reader.peek(0) == ' '
                || ((self.flow_level > 0 || !self.simple_key_allowed)
                    && self.reader.peek(0) == '\t')
            {
                self.reader.forward(1);
                self.reader.ensure(1)?;
            }
            if self.reader.peek(0) == '#' {
                while !is_breakz(self.reader.peek(0)) {
                    self.reader.forward(1);
                    self.reader.ensure(1)?;
                }
            }
            if is_break(self.reader.peek(0)) {
                self.reader.ensure(2)?;
                self.skip_line_break();
                if self.flow_level == 0 {
                    self.simple_key_allowed = true;
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Consume one line break, collapsing `\r\n`.
    fn skip_line_break(&mut self) {
        if self.reader.peek(0) == '\r' && self.reader.peek(1) == '\n' {
            self.reader.forward(2);
        } else {
            self.reader.forward(1);
        }
    }

    /// Consume one line break and return its normalized form: `\n` for ASCII
    /// and NEL breaks, the character itself for U+2028/U+2029.
    fn read_line_break(&mut self) -> char {
        let ch = self.reader.peek(0);
        self.skip_line_break();
        match ch {
            '\u{2028}' | '\u{2029}' => ch,
            _ => '\n',
        }
    }

    /// Discard simple-key candidates that can no longer be completed: the
    /// `:` must appear on the same line within 1024 characters.
    fn stale_simple_keys(&mut self) -> Result<(), ScannerError> {
        for simple_key in &mut self.simple_keys {
            if simple_key.possible
                && (simple_key.mark.line < self.reader.mark.line
                    || simple_key.index + 1024 < self.reader.index)
            {
                if simple_key.required {
                    let mark = simple_key.mark;
                    return Err(ScannerError::Problem {
                        context: "while scanning a simple key",
                        context_mark: mark,
                        problem: "could not find expected ':'",
                        problem_mark: self.reader.mark,
                    });
                }
                simple_key.possible = false;
            }
        }
        Ok(())
    }

    fn save_simple_key(&mut self) -> Result<(), ScannerError> {
        let required = self.flow_level == 0 && self.indent == self.reader.mark.column as i32;
        if self.simple_key_allowed {
            let simple_key = SimpleKey {
                possible: true,
                required,
                token_number: self.tokens_taken + self.tokens.len(),
                index: self.reader.index,
                mark: self.reader.mark,
            };
            self.remove_simple_key()?;
            *self.simple_keys.last_mut().expect("simple key stack") = simple_key;
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> Result<(), ScannerError> {
        let simple_key = self.simple_keys.last_mut().expect("simple key stack");
        if simple_key.possible && simple_key.required {
            let mark = simple_key.mark;
            return Err(ScannerError::Problem {
                context: "while scanning a simple key",
                context_mark: mark,
                problem: "could not find expected ':'",
                problem_mark: self.reader.mark,
            });
        }
        simple_key.possible = false;
        Ok(())
    }

    fn increase_flow_level(&mut self) {
        self.simple_keys.push(SimpleKey::default());
        self.flow_level += 1;
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level > 0 {
            self.flow_level -= 1;
            self.simple_keys.pop();
        }
    }

    /// Push the indentation level and emit a collection-start token, either at
    /// the back of the queue or retroactively at `number`.
    fn roll_indent(&mut self, column: i32, number: Option<usize>, data: TokenData, mark: Mark) {
        if self.flow_level > 0 {
            return;
        }
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            let token = Token::new(data, mark, mark);
            match number {
                Some(number) => self.tokens.insert(number - self.tokens_taken, token),
                None => self.tokens.push_back(token),
            }
        }
    }

    /// Pop indentation levels deeper than `column`, closing their blocks.
    fn unroll_indent(&mut self, column: i32) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > column {
            self.tokens.push_back(Token::new(
                TokenData::BlockEnd,
                self.reader.mark,
                self.reader.mark,
            ));
            self.indent = self.indents.pop().expect("indent stack underflow");
        }
    }

    fn fetch_stream_start(&mut self) {
        self.indent = -1;
        self.simple_keys.push(SimpleKey::default());
        self.simple_key_allowed = true;
        self.stream_start_produced = true;
        self.tokens.push_back(Token::new(
            TokenData::StreamStart {
                encoding: self.reader.encoding(),
            },
            self.reader.mark,
            self.reader.mark,
        ));
    }

    fn fetch_stream_end(&mut self) -> Result<(), ScannerError> {
        if self.reader.mark.column != 0 {
            self.reader.mark.bump_line();
        }
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        self.tokens.push_back(Token::new(
            TokenData::StreamEnd,
            self.reader.mark,
            self.reader.mark,
        ));
        Ok(())
    }

    fn fetch_directive(&mut self) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        if let Some(token) = self.scan_directive()? {
            self.tokens.push_back(token);
        }
        Ok(())
    }

    fn fetch_document_indicator(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let start_mark = self.reader.mark;
        self.reader.forward(3);
        self.tokens
            .push_back(Token::new(data, start_mark, self.reader.mark));
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.increase_flow_level();
        self.simple_key_allowed = true;
        let start_mark = self.reader.mark;
        self.reader.forward(1);
        self.tokens
            .push_back(Token::new(data, start_mark, self.reader.mark));
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.decrease_flow_level();
        self.simple_key_allowed = false;
        let start_mark = self.reader.mark;
        self.reader.forward(1);
        self.tokens
            .push_back(Token::new(data, start_mark, self.reader.mark));
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start_mark = self.reader.mark;
        self.reader.forward(1);
        self.tokens
            .push_back(Token::new(TokenData::FlowEntry, start_mark, self.reader.mark));
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return self.error(
                    "",
                    self.reader.mark,
                    "block sequence entries are not allowed in this context",
                );
            }
            self.roll_indent(
                self.reader.mark.column as i32,
                None,
                TokenData::BlockSequenceStart,
                self.reader.mark,
            );
        }
        // In flow context this is a grammar error the parser reports.
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start_mark = self.reader.mark;
        self.reader.forward(1);
        self.tokens.push_back(Token::new(
            TokenData::BlockEntry,
            start_mark,
            self.reader.mark,
        ));
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return self.error(
                    "",
                    self.reader.mark,
                    "mapping keys are not allowed in this context",
                );
            }
            self.roll_indent(
                self.reader.mark.column as i32,
                None,
                TokenData::BlockMappingStart,
                self.reader.mark,
            );
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = self.flow_level == 0;
        let start_mark = self.reader.mark;
        self.reader.forward(1);
        self.tokens
            .push_back(Token::new(TokenData::Key, start_mark, self.reader.mark));
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<(), ScannerError> {
        let simple_key = *self.simple_keys.last().expect("simple key stack");
        if simple_key.possible {
            // The recorded candidate retroactively becomes a key.
            let token = Token::new(TokenData::Key, simple_key.mark, simple_key.mark);
            self.tokens
                .insert(simple_key.token_number - self.tokens_taken, token);
            self.roll_indent(
                simple_key.mark.column as i32,
                Some(simple_key.token_number),
                TokenData::BlockMappingStart,
                simple_key.mark,
            );
            self.simple_keys.last_mut().expect("simple key stack").possible = false;
            self.simple_key_allowed = false;
        } else {
            if self.flow_level == 0 {
                if !self.simple_key_allowed {
                    return self.error(
                        "",
                        self.reader.mark,
                        "mapping values are not allowed in this context",
                    );
                }
                self.roll_indent(
                    self.reader.mark.column as i32,
                    None,
                    TokenData::BlockMappingStart,
                    self.reader.mark,
                );
            }
            self.simple_key_allowed = self.flow_level == 0;
        }
        let start_mark = self.reader.mark;
        self.reader.forward(1);
        self.tokens
            .push_back(Token::new(TokenData::Value, start_mark, self.reader.mark));
        Ok(())
    }

    fn fetch_anchor(&mut self, alias: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_anchor(alias)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_tag()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, literal: bool) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let token = self.scan_block_scalar(literal)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, single: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_flow_scalar(single)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_plain_scalar(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_plain_scalar()?;
        self.tokens.push_back(token);
        Ok(())
    }

    /// Scan a `%` directive. `%YAML` and `%TAG` produce tokens; unknown
    /// directives are scanned and dropped.
    fn scan_directive(&mut self) -> Result<Option<Token>, ScannerError> {
        let start_mark = self.reader.mark;
        self.reader.forward(1);
        let name = self.scan_directive_name(start_mark)?;
        let token = match name.as_str() {
            "YAML" => {
                let (major, minor) = self.scan_version_directive_value(start_mark)?;
                if major != 1 {
                    return self.error(
                        "while scanning a %YAML directive",
                        start_mark,
                        "found incompatible YAML document",
                    );
                }
                Some(Token::new(
                    TokenData::Directive {
                        value: DirectiveValue::Version { major, minor },
                    },
                    start_mark,
                    self.reader.mark,
                ))
            }
            "TAG" => {
                let (handle, prefix) = self.scan_tag_directive_value(start_mark)?;
                Some(Token::new(
                    TokenData::Directive {
                        value: DirectiveValue::Tag { handle, prefix },
                    },
                    start_mark,
                    self.reader.mark,
                ))
            }
            _ => {
                debug!("skipping unknown directive %{name}");
                loop {
                    self.reader.ensure(1)?;
                    if is_breakz(self.reader.peek(0)) {
                        break;
                    }
                    self.reader.forward(1);
                }
                None
            }
        };
        self.scan_directive_ignored_line(start_mark)?;
        Ok(token)
    }

    fn scan_directive_name(&mut self, start_mark: Mark) -> Result<String, ScannerError> {
        let mut name = String::new();
        self.reader.ensure(1)?;
        while is_anchor_char(self.reader.peek(0)) {
            name.push(self.reader.peek(0));
            self.reader.forward(1);
            self.reader.ensure(1)?;
        }
        if name.is_empty() {
            return self.error(
                "while scanning a directive",
                start_mark,
                "could not find expected directive name",
            );
        }
        if !is_blankz(self.reader.peek(0)) {
            return self.error(
                "while scanning a directive",
                start_mark,
                "found unexpected non-alphabetical character",
            );
        }
        Ok(name)
    }

    fn scan_version_directive_value(
        &mut self,
        start_mark: Mark,
    ) -> Result<(i32, i32), ScannerError> {
        self.skip_directive_blanks()?;
        let major = self.scan_version_directive_number(start_mark)?;
        if self.reader.peek(0) != '.' {
            return self.error(
                "while scanning a %YAML directive",
                start_mark,
                "did not find expected digit or '.' character",
            );
        }
        self.reader.forward(1);
        let minor = self.scan_version_directive_number(start_mark)?;
        Ok((major, minor))
    }

    fn scan_version_directive_number(&mut self, start_mark: Mark) -> Result<i32, ScannerError> {
        let mut value: i32 = 0;
        let mut length = 0;
        self.reader.ensure(1)?;
        while let Some(digit) = self.reader.peek(0).to_digit(10) {
            length += 1;
            if length > 9 {
                return self.error(
                    "while scanning a %YAML directive",
                    start_mark,
                    "found extremely long version number",
                );
            }
            value = value * 10 + digit as i32;
            self.reader.forward(1);
            self.reader.ensure(1)?;
        }
        if length == 0 {
            return self.error(
                "while scanning a %YAML directive",
                start_mark,
                "did not find expected version number",
            );
        }
        Ok(value)
    }

    fn scan_tag_directive_value(
        &mut self,
        start_mark: Mark,
    ) -> Result<(String, String), ScannerError> {
        self.skip_directive_blanks()?;
        let handle = self.scan_tag_handle(true, start_mark)?;
        self.reader.ensure(1)?;
        if !is_blank(self.reader.peek(0)) {
            return self.error(
                "while scanning a %TAG directive",
                start_mark,
                "did not find expected whitespace",
            );
        }
        self.skip_directive_blanks()?;
        let prefix = self.scan_tag_uri("while scanning a %TAG directive", start_mark)?;
        self.reader.ensure(1)?;
        if !is_blankz(self.reader.peek(0)) {
            return self.error(
                "while scanning a %TAG directive",
                start_mark,
                "did not find expected whitespace or line break",
            );
        }
        Ok((handle, prefix))
    }

    fn skip_directive_blanks(&mut self) -> Result<(), ScannerError> {
        self.reader.ensure(1)?;
        while is_blank(self.reader.peek(0)) {
            self.reader.forward(1);
            self.reader.ensure(1)?;
        }
        Ok(())
    }

    fn scan_directive_ignored_line(&mut self, start_mark: Mark) -> Result<(), ScannerError> {
        self.skip_directive_blanks()?;
        if self.reader.peek(0) == '#' {
            while !is_breakz(self.reader.peek(0)) {
                self.reader.forward(1);
                self.reader.ensure(1)?;
            }
        }
        if !is_breakz(self.reader.peek(0)) {
            return self.error(
                "while scanning a directive",
                start_mark,
                "did not find expected comment or line break",
            );
        }
        if is_break(self.reader.peek(0)) {
            self.reader.ensure(2)?;
            self.skip_line_break();
        }
        Ok(())
    }

    /// Scan `&anchor` or `*alias`.
    fn scan_anchor(&mut self, alias: bool) -> Result<Token, ScannerError> {
        let context = if alias {
            "while scanning an alias"
        } else {
            "while scanning an anchor"
        };
        let start_mark = self.reader.mark;
        self.reader.forward(1);
        let mut value = String::new();
        self.reader.ensure(1)?;
        while is_anchor_char(self.reader.peek(0)) {
            value.push(self.reader.peek(0));
            self.reader.forward(1);
            self.reader.ensure(1)?;
        }
        let ch = self.reader.peek(0);
        if value.is_empty()
            || !(is_blankz(ch) || matches!(ch, '?' | ':' | ',' | ']' | '}' | '%' | '@' | '`'))
        {
            return self.error(context, start_mark, "found unexpected character");
        }
        let data = if alias {
            TokenData::Alias { value }
        } else {
            TokenData::Anchor { value }
        };
        Ok(Token::new(data, start_mark, self.reader.mark))
    }

    /// Scan a tag property: `!<verbatim>`, `!handle!suffix`, `!suffix` or a
    /// bare `!`.
    fn scan_tag(&mut self) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark;
        self.reader.ensure(2)?;
        let handle;
        let suffix;
        if self.reader.peek(1) == '<' {
            // Verbatim tag.
            handle = String::new();
            self.reader.forward(2);
            suffix = self.scan_tag_uri("while scanning a tag", start_mark)?;
            if self.reader.peek(0) != '>' {
                return self.error(
                    "while scanning a tag",
                    start_mark,
                    "did not find expected '>'",
                );
            }
            self.reader.forward(1);
        } else if is_blankz(self.reader.peek(1)) {
            // The non-specific tag.
            handle = String::new();
            suffix = String::from("!");
            self.reader.forward(1);
        } else {
            // Look for a second '!' closing a named handle.
            let mut length = 1;
            let mut named = false;
            loop {
                self.reader.ensure(length + 1)?;
                let ch = self.reader.peek(length);
                if ch == '!' {
                    named = true;
                    break;
                }
                if is_blankz(ch) || is_flow_indicator(ch) {
                    break;
                }
                length += 1;
            }
            if named {
                handle = self.scan_tag_handle(false, start_mark)?;
            } else {
                self.reader.forward(1);
                handle = String::from("!");
            }
            suffix = self.scan_tag_uri("while scanning a tag", start_mark)?;
            if suffix.is_empty() {
                return self.error(
                    "while scanning a tag",
                    start_mark,
                    "did not find expected tag URI",
                );
            }
        }
        self.reader.ensure(1)?;
        if !is_blankz(self.reader.peek(0)) {
            return self.error(
                "while scanning a tag",
                start_mark,
                "did not find expected whitespace or line break",
            );
        }
        Ok(Token::new(
            TokenData::Tag { handle, suffix },
            start_mark,
            self.reader.mark,
        ))
    }

    /// Scan `!`, `!!` or `!word!`.
    fn scan_tag_handle(&mut self, directive: bool, start_mark: Mark) -> Result<String, ScannerError> {
        let context = if directive {
            "while scanning a %TAG directive"
        } else {
            "while scanning a tag"
        };
        self.reader.ensure(1)?;
        if self.reader.peek(0) != '!' {
            return self.error(context, start_mark, "did not find expected '!'");
        }
        let mut handle = String::from("!");
        self.reader.forward(1);
        self.reader.ensure(1)?;
        while is_anchor_char(self.reader.peek(0)) {
            handle.push(self.reader.peek(0));
            self.reader.forward(1);
            self.reader.ensure(1)?;
        }
        if self.reader.peek(0) == '!' {
            handle.push('!');
            self.reader.forward(1);
        } else if directive && handle != "!" {
            // A %TAG handle must be closed; the primary handle alone is fine.
            return self.error(context, start_mark, "did not find expected '!'");
        }
        Ok(handle)
    }

    /// Scan a tag URI, decoding `%HH` escapes.
    fn scan_tag_uri(
        &mut self,
        context: &'static str,
        start_mark: Mark,
    ) -> Result<String, ScannerError> {
        let mut uri = String::new();
        self.reader.ensure(1)?;
        while is_uri_char(self.reader.peek(0)) {
            if self.reader.peek(0) == '%' {
                uri.push_str(&self.scan_uri_escapes(context, start_mark)?);
            } else {
                uri.push(self.reader.peek(0));
                self.reader.forward(1);
            }
            self.reader.ensure(1)?;
        }
        Ok(uri)
    }

    /// Decode a run of `%HH` escapes into UTF-8 characters.
    fn scan_uri_escapes(
        &mut self,
        context: &'static str,
        start_mark: Mark,
    ) -> Result<String, ScannerError> {
        let mut bytes = Vec::new();
        while self.reader.peek(0) == '%' {
            self.reader.ensure(3)?;
            let high = self.reader.peek(1).to_digit(16);
            let low = self.reader.peek(2).to_digit(16);
            let (Some(high), Some(low)) = (high, low) else {
                return self.error(
                    context,
                    start_mark,
                    "did not find URI escaped octet",
                );
            };
            bytes.push((high * 16 + low) as u8);
            self.reader.forward(3);
            self.reader.ensure(1)?;
        }
        match String::from_utf8(bytes) {
            Ok(decoded) => Ok(decoded),
            Err(_) => self.error(context, start_mark, "found an incorrect UTF-8 byte sequence"),
        }
    }

    /// Scan a literal (`|`) or folded (`>`) block scalar.
    fn scan_block_scalar(&mut self, literal: bool) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark;
        self.reader.forward(1);
        let (chomping, increment) = self.scan_block_scalar_indicators(start_mark)?;
        self.scan_block_scalar_ignored_line(start_mark)?;

        let min_indent = (self.indent + 1).max(1);
        let mut string = String::new();
        let mut breaks;
        let mut end_mark;
        let indent;
        if let Some(increment) = increment {
            indent = min_indent + increment - 1;
            let (b, e) = self.scan_block_scalar_breaks(indent)?;
            breaks = b;
            end_mark = e;
        } else {
            let (b, max_indent, e) = self.scan_block_scalar_indentation()?;
            breaks = b;
            end_mark = e;
            indent = min_indent.max(max_indent);
        }

        let mut line_break = String::new();
        while self.reader.mark.column as i32 == indent && !is_z(self.reader.peek(0)) {
            string.push_str(&breaks);
            let leading_non_space = !is_blank(self.reader.peek(0));
            while !is_breakz(self.reader.peek(0)) {
                string.push(self.reader.peek(0));
                self.reader.forward(1);
                self.reader.ensure(1)?;
            }
            if is_z(self.reader.peek(0)) {
                line_break.clear();
                breaks.clear();
                end_mark = self.reader.mark;
                break;
            }
            self.reader.ensure(2)?;
            line_break.clear();
            line_break.push(self.read_line_break());
            let (b, e) = self.scan_block_scalar_breaks(indent)?;
            breaks = b;
            end_mark = e;
            if self.reader.mark.column as i32 == indent && !is_z(self.reader.peek(0)) {
                // Folding: a single break between two non-blank lines becomes
                // a space; literal style and indented lines keep the break.
                if !literal
                    && line_break == "\n"
                    && leading_non_space
                    && !is_blank(self.reader.peek(0))
                {
                    if breaks.is_empty() {
                        string.push(' ');
                    }
                } else {
                    string.push_str(&line_break);
                }
            } else {
                break;
            }
        }

        if chomping != Chomping::Strip {
            string.push_str(&line_break);
        }
        if chomping == Chomping::Keep {
            string.push_str(&breaks);
        }

        let style = if literal {
            ScalarStyle::Literal
        } else {
            ScalarStyle::Folded
        };
        Ok(Token::new(
            TokenData::Scalar {
                value: string,
                style,
            },
            start_mark,
            end_mark,
        ))
    }

    /// Scan the optional chomping (`+`/`-`) and 1..9 indentation indicators,
    /// in either order.
    fn scan_block_scalar_indicators(
        &mut self,
        start_mark: Mark,
    ) -> Result<(Chomping, Option<i32>), ScannerError> {
        let mut chomping = Chomping::Clip;
        let mut increment = None;
        self.reader.ensure(1)?;
        let ch = self.reader.peek(0);
        if ch == '+' || ch == '-' {
            chomping = if ch == '+' {
                Chomping::Keep
            } else {
                Chomping::Strip
            };
            self.reader.forward(1);
            self.reader.ensure(1)?;
            if let Some(digit) = self.reader.peek(0).to_digit(10) {
                if digit == 0 {
                    return self.error(
                        "while scanning a block scalar",
                        start_mark,
                        "found an indentation indicator equal to 0",
                    );
                }
                increment = Some(digit as i32);
                self.reader.forward(1);
            }
        } else if let Some(digit) = ch.to_digit(10) {
            if digit == 0 {
                return self.error(
                    "while scanning a block scalar",
                    start_mark,
                    "found an indentation indicator equal to 0",
                );
            }
            increment = Some(digit as i32);
            self.reader.forward(1);
            self.reader.ensure(1)?;
            let ch = self.reader.peek(0);
            if ch == '+' || ch == '-' {
                chomping = if ch == '+' {
                    Chomping::Keep
                } else {
                    Chomping::Strip
                };
                self.reader.forward(1);
            }
        }
        self.reader.ensure(1)?;
        if !is_blankz(self.reader.peek(0)) {
            return self.error(
                "while scanning a block scalar",
                start_mark,
                "expected chomping or indentation indicator",
            );
        }
        Ok((chomping, increment))
    }

    /// Skip blanks and an optional comment after the block scalar header.
    fn scan_block_scalar_ignored_line(&mut self, start_mark: Mark) -> Result<(), ScannerError> {
        self.reader.ensure(1)?;
        while is_blank(self.reader.peek(0)) {
            self.reader.forward(1);
            self.reader.ensure(1)?;
        }
        if self.reader.peek(0) == '#' {
            while !is_breakz(self.reader.peek(0)) {
                self.reader.forward(1);
                self.reader.ensure(1)?;
            }
        }
        if !is_breakz(self.reader.peek(0)) {
            return self.error(
                "while scanning a block scalar",
                start_mark,
                "expected a comment or a line break",
            );
        }
        if is_break(self.reader.peek(0)) {
            self.reader.ensure(2)?;
            self.skip_line_break();
        }
        Ok(())
    }

    /// For an auto-detected indentation, read leading empty lines and track
    /// the deepest column seen.
    fn scan_block_scalar_indentation(&mut self) -> Result<(String, i32, Mark), ScannerError> {
        let mut breaks = String::new();
        let mut max_indent = 0;
        let mut end_mark = self.reader.mark;
        self.reader.ensure(1)?;
        while is_blank(self.reader.peek(0)) || is_break(self.reader.peek(0)) {
            if is_break(self.reader.peek(0)) {
                self.reader.ensure(2)?;
                breaks.push(self.read_line_break());
                end_mark = self.reader.mark;
            } else {
                self.reader.forward(1);
            }
            if self.reader.mark.column as i32 > max_indent {
                max_indent = self.reader.mark.column as i32;
            }
            self.reader.ensure(1)?;
        }
        Ok((breaks, max_indent, end_mark))
    }

    /// Read empty lines and indentation up to `indent`.
    fn scan_block_scalar_breaks(&mut self, indent: i32) -> Result<(String, Mark), ScannerError> {
        let mut breaks = String::new();
        let mut end_mark = self.reader.mark;
        loop {
            self.reader.ensure(1)?;
            while (self.reader.mark.column as i32) < indent && self.reader.peek(0) == ' ' {
                self.reader.forward(1);
                self.reader.ensure(1)?;
            }
            if !is_break(self.reader.peek(0)) {
                break;
            }
            self.reader.ensure(2)?;
            breaks.push(self.read_line_break());
            end_mark = self.reader.mark;
        }
        Ok((breaks, end_mark))
    }

    /// Scan a single- or double-quoted flow scalar.
    fn scan_flow_scalar(&mut self, single: bool) -> Result<Token, ScannerError> {
        let context = if single {
            "while scanning a single-quoted scalar"
        } else {
            "while scanning a double-quoted scalar"
        };
        let start_mark = self.reader.mark;
        self.reader.forward(1);
        let mut string = String::new();
        loop {
            self.scan_flow_scalar_non_spaces(single, context, start_mark, &mut string)?;
            if self.reader.peek(0) == if single { '\'' } else { '"' } {
                break;
            }
            self.scan_flow_scalar_spaces(context, start_mark, &mut string)?;
        }
        self.reader.forward(1);
        let style = if single {
            ScalarStyle::SingleQuoted
        } else {
            ScalarStyle::DoubleQuoted
        };
        Ok(Token::new(
            TokenData::Scalar {
                value: string,
                style,
            },
            start_mark,
            self.reader.mark,
        ))
    }

    fn scan_flow_scalar_non_spaces(
        &mut self,
        single: bool,
        context: &'static str,
        start_mark: Mark,
        string: &mut String,
    ) -> Result<(), ScannerError> {
        loop {
            self.reader.ensure(2)?;
            let ch = self.reader.peek(0);
            if is_blankz(ch) || ch == '\'' || (!single && (ch == '"' || ch == '\\')) {
                // Blanks, breaks and quoting characters are handled below.
            } else {
                string.push(ch);
                self.reader.forward(1);
                continue;
            }
            if single && ch == '\'' && self.reader.peek(1) == '\'' {
                string.push('\'');
                self.reader.forward(2);
            } else if (single && ch == '"') || (!single && ch == '\'') {
                string.push(ch);
                self.reader.forward(1);
            } else if !single && ch == '\\' {
                self.scan_flow_scalar_escape(context, start_mark, string)?;
            } else {
                return Ok(());
            }
        }
    }

    fn scan_flow_scalar_escape(
        &mut self,
        context: &'static str,
        start_mark: Mark,
        string: &mut String,
    ) -> Result<(), ScannerError> {
        self.reader.forward(1);
        self.reader.ensure(1)?;
        let ch = self.reader.peek(0);
        let replacement = match ch {
            '0' => Some('\0'),
            'a' => Some('\x07'),
            'b' => Some('\x08'),
            't' | '\t' => Some('\t'),
            'n' => Some('\n'),
            'v' => Some('\x0B'),
            'f' => Some('\x0C'),
            'r' => Some('\r'),
            'e' => Some('\x1B'),
            ' ' => Some(' '),
            '"' => Some('"'),
            '\\' => Some('\\'),
            'N' => Some('\u{0085}'),
            '_' => Some('\u{00A0}'),
            'L' => Some('\u{2028}'),
            'P' => Some('\u{2029}'),
            _ => None,
        };
        if let Some(replacement) = replacement {
            string.push(replacement);
            self.reader.forward(1);
            return Ok(());
        }
        let code_length = match ch {
            'x' => 2,
            'u' => 4,
            'U' => 8,
            _ if is_break(ch) => {
                // An escaped line break is removed together with the
                // following indentation.
                self.reader.ensure(2)?;
                self.read_line_break();
                self.scan_flow_scalar_breaks(context, start_mark, string)?;
                return Ok(());
            }
            _ => {
                return self.error(context, start_mark, "found unknown escape character");
            }
        };
        self.reader.forward(1);
        self.reader.ensure(code_length)?;
        let mut value: u32 = 0;
        for k in 0..code_length {
            let Some(digit) = self.reader.peek(k).to_digit(16) else {
                return self.error(
                    context,
                    start_mark,
                    "expected hexadecimal digits in escape sequence",
                );
            };
            value = value * 16 + digit;
        }
        let Some(decoded) = char::from_u32(value) else {
            return self.error(
                context,
                start_mark,
                "found invalid Unicode character escape code",
            );
        };
        string.push(decoded);
        self.reader.forward(code_length);
        Ok(())
    }

    fn scan_flow_scalar_spaces(
        &mut self,
        context: &'static str,
        start_mark: Mark,
        string: &mut String,
    ) -> Result<(), ScannerError> {
        let mut whitespaces = String::new();
        loop {
            self.reader.ensure(1)?;
            if !is_blank(self.reader.peek(0)) {
                break;
            }
            whitespaces.push(self.reader.peek(0));
            self.reader.forward(1);
        }
        let ch = self.reader.peek(0);
        if is_z(ch) {
            return self.error(context, start_mark, "found unexpected end of stream");
        }
        if is_break(ch) {
            // Folding: a single break becomes a space, further breaks are
            // kept; surrounding blanks are trimmed.
            self.reader.ensure(2)?;
            let line_break = self.read_line_break();
            let mut breaks = String::new();
            self.scan_flow_scalar_breaks(context, start_mark, &mut breaks)?;
            if line_break != '\n' {
                string.push(line_break);
            } else if breaks.is_empty() {
                string.push(' ');
            }
            string.push_str(&breaks);
        } else {
            string.push_str(&whitespaces);
        }
        Ok(())
    }

    fn scan_flow_scalar_breaks(
        &mut self,
        context: &'static str,
        start_mark: Mark,
        breaks: &mut String,
    ) -> Result<(), ScannerError> {
        loop {
            self.reader.ensure(4)?;
            if (self.reader.prefix(3) == "---" || self.reader.prefix(3) == "...")
                && is_blankz(self.reader.peek(3))
            {
                return self.error(
                    context,
                    start_mark,
                    "found unexpected document separator",
                );
            }
            while is_blank(self.reader.peek(0)) {
                self.reader.forward(1);
                self.reader.ensure(1)?;
            }
            if is_break(self.reader.peek(0)) {
                self.reader.ensure(2)?;
                breaks.push(self.read_line_break());
            } else {
                return Ok(());
            }
        }
    }

    /// Scan a plain (unquoted) scalar.
    fn scan_plain_scalar(&mut self) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark;
        let mut end_mark = start_mark;
        let indent = self.indent + 1;
        let mut string = String::new();
        let mut spaces = String::new();
        loop {
            self.reader.ensure(1)?;
            if self.reader.peek(0) == '#' {
                break;
            }
            let mut length = 0;
            loop {
                self.reader.ensure(length + 2)?;
                let ch = self.reader.peek(length);
                if is_blankz(ch) {
                    break;
                }
                if ch == ':' {
                    let next = self.reader.peek(length + 1);
                    if is_blankz(next) || (self.flow_level > 0 && is_flow_indicator(next)) {
                        break;
                    }
                }
                if self.flow_level > 0 && (ch == '?' || is_flow_indicator(ch)) {
                    break;
                }
                length += 1;
            }
            if length == 0 {
                break;
            }
            self.simple_key_allowed = false;
            string.push_str(&spaces);
            string.push_str(&self.reader.prefix(length));
            self.reader.forward(length);
            end_mark = self.reader.mark;
            match self.scan_plain_scalar_spaces(indent)? {
                Some(next_spaces) => spaces = next_spaces,
                None => break,
            }
            if spaces.is_empty()
                || self.reader.peek(0) == '#'
                || (self.flow_level == 0 && (self.reader.mark.column as i32) < indent)
            {
                break;
            }
        }
        Ok(Token::new(
            TokenData::Scalar {
                value: string,
                style: ScalarStyle::Plain,
            },
            start_mark,
            end_mark,
        ))
    }

    /// Consume blanks and breaks between plain-scalar chunks, folding them.
    /// Returns `None` when a document indicator ends the scalar.
    fn scan_plain_scalar_spaces(&mut self, _indent: i32) -> Result<Option<String>, ScannerError> {
        let mut whitespaces = String::new();
        loop {
            self.reader.ensure(1)?;
            if self.reader.peek(0) != ' ' {
                break;
            }
            whitespaces.push(' ');
            self.reader.forward(1);
        }
        let ch = self.reader.peek(0);
        if !is_break(ch) {
            return Ok(Some(whitespaces));
        }

        self.reader.ensure(2)?;
        let line_break = self.read_line_break();
        self.simple_key_allowed = true;
        let at_document_indicator = |scanner: &Self| {
            (scanner.reader.prefix(3) == "---" || scanner.reader.prefix(3) == "...")
                && is_blankz(scanner.reader.peek(3))
        };
        self.reader.ensure(4)?;
        if at_document_indicator(self) {
            return Ok(None);
        }
        let mut breaks = String::new();
        loop {
            self.reader.ensure(1)?;
            let ch = self.reader.peek(0);
            if ch == ' ' {
                self.reader.forward(1);
            } else if is_break(ch) {
                self.reader.ensure(2)?;
                breaks.push(self.read_line_break());
                self.reader.ensure(4)?;
                if at_document_indicator(self) {
                    return Ok(None);
                }
            } else {
                break;
            }
        }
        let mut folded = String::new();
        if line_break != '\n' {
            folded.push(line_break);
        } else if breaks.is_empty() {
            folded.push(' ');
        }
        folded.push_str(&breaks);
        Ok(Some(folded))
    }
}

impl<'r> Default for Scanner<'r> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_of(input: &str) -> Vec<TokenData> {
        let mut scanner = Scanner::new();
        scanner.set_input(input.as_bytes());
        let mut tokens = Vec::new();
        loop {
            let token = scanner.scan().unwrap();
            let done = matches!(token.data, TokenData::StreamEnd);
            tokens.push(token.data);
            if done {
                break;
            }
        }
        tokens
    }

    fn scalar(value: &str, style: ScalarStyle) -> TokenData {
        TokenData::Scalar {
            value: value.into(),
            style,
        }
    }

    #[test]
    fn simple_mapping() {
        let tokens = tokens_of("key: value\n");
        assert_eq!(
            tokens[1..],
            [
                TokenData::BlockMappingStart,
                TokenData::Key,
                scalar("key", ScalarStyle::Plain),
                TokenData::Value,
                scalar("value", ScalarStyle::Plain),
                TokenData::BlockEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn block_sequence() {
        let tokens = tokens_of("- one\n- two\n");
        assert_eq!(
            tokens[1..],
            [
                TokenData::BlockSequenceStart,
                TokenData::BlockEntry,
                scalar("one", ScalarStyle::Plain),
                TokenData::BlockEntry,
                scalar("two", ScalarStyle::Plain),
                TokenData::BlockEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn nested_block_ends_balance() {
        let tokens = tokens_of("a:\n  b:\n    - 1\nc: 2\n");
        let mut depth = 0i32;
        let mut max_depth = 0;
        for token in &tokens {
            match token {
                TokenData::BlockMappingStart | TokenData::BlockSequenceStart => {
                    depth += 1;
                    max_depth = max_depth.max(depth);
                }
                TokenData::BlockEnd => depth -= 1,
                _ => {}
            }
        }
        assert_eq!(depth, 0);
        assert_eq!(max_depth, 3);
    }

    #[test]
    fn flow_collection() {
        let tokens = tokens_of("[a, {b: c}]");
        assert_eq!(
            tokens[1..],
            [
                TokenData::FlowSequenceStart,
                scalar("a", ScalarStyle::Plain),
                TokenData::FlowEntry,
                TokenData::FlowMappingStart,
                TokenData::Key,
                scalar("b", ScalarStyle::Plain),
                TokenData::Value,
                scalar("c", ScalarStyle::Plain),
                TokenData::FlowMappingEnd,
                TokenData::FlowSequenceEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn document_indicators() {
        let tokens = tokens_of("---\nfoo\n...\n");
        assert_eq!(
            tokens[1..],
            [
                TokenData::DocumentStart,
                scalar("foo", ScalarStyle::Plain),
                TokenData::DocumentEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn directives() {
        let tokens = tokens_of("%YAML 1.1\n%TAG !e! tag:example.com,2000:\n---\nx\n");
        assert_eq!(
            tokens[1],
            TokenData::Directive {
                value: DirectiveValue::Version { major: 1, minor: 1 }
            }
        );
        assert_eq!(
            tokens[2],
            TokenData::Directive {
                value: DirectiveValue::Tag {
                    handle: "!e!".into(),
                    prefix: "tag:example.com,2000:".into()
                }
            }
        );
    }

    #[test]
    fn unknown_directive_is_skipped() {
        let tokens = tokens_of("%FOO bar baz\n---\nx\n");
        assert_eq!(tokens[1], TokenData::DocumentStart);
    }

    #[test]
    fn yaml_2_directive_is_an_error() {
        let mut scanner = Scanner::new();
        scanner.set_input("%YAML 2.0\n---\nx\n".as_bytes());
        scanner.scan().unwrap();
        assert!(scanner.scan().is_err());
    }

    #[test]
    fn single_quoted_doubling() {
        let tokens = tokens_of("'it''s'");
        assert_eq!(tokens[1], scalar("it's", ScalarStyle::SingleQuoted));
    }

    #[test]
    fn double_quoted_escapes() {
        let tokens = tokens_of(r#""a\tb\u263A\x41\N""#);
        assert_eq!(
            tokens[1],
            scalar("a\tb\u{263A}A\u{0085}", ScalarStyle::DoubleQuoted)
        );
    }

    #[test]
    fn double_quoted_folding() {
        let tokens = tokens_of("\"one\ntwo\n\nthree\"");
        assert_eq!(
            tokens[1],
            scalar("one two\nthree", ScalarStyle::DoubleQuoted)
        );
    }

    #[test]
    fn plain_multiline_folds() {
        let tokens = tokens_of("a: one\n   two\n");
        assert_eq!(tokens[5], scalar("one two", ScalarStyle::Plain));
    }

    #[test]
    fn literal_block_scalar() {
        let tokens = tokens_of("|\n  line one\n  line two\n");
        assert_eq!(
            tokens[1],
            scalar("line one\nline two\n", ScalarStyle::Literal)
        );
    }

    #[test]
    fn folded_block_scalar() {
        let tokens = tokens_of(">\n  one\n  two\n\n  three\n");
        assert_eq!(tokens[1], scalar("one two\nthree\n", ScalarStyle::Folded));
    }

    #[test]
    fn block_scalar_chomping() {
        let tokens = tokens_of("strip: |-\n  text\n\nkeep: |+\n  text\n\nclip: |\n  text\n");
        let scalars: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t {
                TokenData::Scalar {
                    value,
                    style: ScalarStyle::Literal,
                } => Some(value.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(scalars, ["text", "text\n\n", "text\n"]);
    }

    #[test]
    fn block_scalar_explicit_indent() {
        let tokens = tokens_of("|2\n    indented\n");
        assert_eq!(tokens[1], scalar("  indented\n", ScalarStyle::Literal));
    }

    #[test]
    fn anchors_and_aliases() {
        let tokens = tokens_of("a: &x 1\nb: *x\n");
        assert!(tokens.contains(&TokenData::Anchor { value: "x".into() }));
        assert!(tokens.contains(&TokenData::Alias { value: "x".into() }));
    }

    #[test]
    fn tags() {
        let tokens = tokens_of("!!int 3");
        assert_eq!(
            tokens[1],
            TokenData::Tag {
                handle: "!!".into(),
                suffix: "int".into()
            }
        );
        let tokens = tokens_of("!<tag:example.com,2000:x> 3");
        assert_eq!(
            tokens[1],
            TokenData::Tag {
                handle: String::new(),
                suffix: "tag:example.com,2000:x".into()
            }
        );
    }

    #[test]
    fn required_simple_key_missing_colon() {
        let mut scanner = Scanner::new();
        scanner.set_input("a: 1\nb\nc: 3\n".as_bytes());
        let result = (0..20).try_for_each(|_| scanner.scan().map(drop));
        assert!(result.is_err());
    }

    #[test]
    fn explicit_key_tokens() {
        let tokens = tokens_of("? complex\n: value\n");
        assert_eq!(
            tokens[1..5],
            [
                TokenData::BlockMappingStart,
                TokenData::Key,
                scalar("complex", ScalarStyle::Plain),
                TokenData::Value,
            ]
        );
    }
}
