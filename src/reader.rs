use std::collections::VecDeque;
use std::io::Read;

use log::debug;

use crate::chars::{is_printable, SENTINEL};
use crate::{Encoding, Mark, ReaderError};

const RAW_CHUNK_SIZE: usize = 16384;

const BOM_UTF8: &[u8] = b"\xEF\xBB\xBF";
const BOM_UTF16LE: &[u8] = b"\xFF\xFE";
const BOM_UTF16BE: &[u8] = b"\xFE\xFF";
const BOM_UTF32LE: &[u8] = b"\xFF\xFE\x00\x00";
const BOM_UTF32BE: &[u8] = b"\x00\x00\xFE\xFF";

/// The decoding stage: turns a byte source into a sliding window of Unicode
/// scalar values with position tracking.
///
/// Once the source is exhausted a `'\0'` sentinel is appended to the decoded
/// buffer; every look-ahead past the end yields that sentinel.
pub(crate) struct Reader<'r> {
    input: Option<Box<dyn Read + 'r>>,
    /// Undecoded bytes pulled from the source.
    raw: VecDeque<u8>,
    /// Decoded characters not yet consumed by the scanner.
    buffer: VecDeque<char>,
    encoding: Encoding,
    eof: bool,
    sentinel_pushed: bool,
    /// The position of the front of `buffer` in the source.
    pub(crate) mark: Mark,
    /// Count of characters consumed, for simple-key distance bookkeeping.
    pub(crate) index: usize,
    /// Byte offset consumed from the source, for error reports.
    offset: usize,
}

impl<'r> Reader<'r> {
    pub(crate) fn new() -> Reader<'r> {
        Reader {
            input: None,
            raw: VecDeque::new(),
            buffer: VecDeque::new(),
            encoding: Encoding::Any,
            eof: false,
            sentinel_pushed: false,
            mark: Mark::default(),
            index: 0,
            offset: 0,
        }
    }

    pub(crate) fn set_input(&mut self, input: impl Read + 'r) {
        assert!(self.input.is_none(), "input already set");
        self.input = Some(Box::new(input));
    }

    pub(crate) fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
    }

    pub(crate) fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Return the k-th character ahead without consuming it.
    pub(crate) fn peek(&self, k: usize) -> char {
        self.buffer.get(k).copied().unwrap_or(SENTINEL)
    }

    /// Return the next `n` characters as a string, without consuming them.
    pub(crate) fn prefix(&self, n: usize) -> String {
        self.buffer.iter().take(n).collect()
    }

    /// Advance the window by `n` characters, updating line and column.
    ///
    /// `\r\n` counts as a single line break; a BOM character is zero width.
    pub(crate) fn forward(&mut self, n: usize) {
        for _ in 0..n {
            let Some(ch) = self.buffer.pop_front() else {
                break;
            };
            self.index += 1;
            match ch {
                '\n' | '\u{0085}' | '\u{2028}' | '\u{2029}' => self.mark.bump_line(),
                '\r' => {
                    if self.peek(0) != '\n' {
                        self.mark.bump_line();
                    }
                    // The following '\n' closes the break and bumps the line.
                }
                '\u{FEFF}' => {}
                _ => self.mark.bump_column(),
            }
        }
    }

    /// Make sure at least `length` characters (or the end sentinel) are
    /// decoded and available for peeking.
    pub(crate) fn ensure(&mut self, length: usize) -> Result<(), ReaderError> {
        if self.encoding == Encoding::Any {
            self.determine_encoding()?;
        }
        while self.buffer.len() < length {
            if self.eof && self.raw.is_empty() {
                if !self.sentinel_pushed {
                    self.buffer.push_back(SENTINEL);
                    self.sentinel_pushed = true;
                }
                return Ok(());
            }
            self.fill_raw()?;
            self.decode_available()?;
        }
        Ok(())
    }

    fn fill_raw(&mut self) -> Result<(), ReaderError> {
        if self.eof || self.raw.len() >= RAW_CHUNK_SIZE {
            return Ok(());
        }
        let mut chunk = [0u8; RAW_CHUNK_SIZE];
        let read = match &mut self.input {
            Some(input) => input.read(&mut chunk)?,
            None => 0,
        };
        if read == 0 {
            self.eof = true;
        } else {
            self.raw.extend(&chunk[..read]);
        }
        Ok(())
    }

    fn determine_encoding(&mut self) -> Result<(), ReaderError> {
        while !self.eof && self.raw.len() < 4 {
            self.fill_raw()?;
        }
        // UTF-32 BOMs share a prefix with UTF-16 ones, so test them first.
        if self.raw_starts_with(BOM_UTF32LE) {
            self.encoding = Encoding::Utf32Le;
            self.drop_raw(4);
        } else if self.raw_starts_with(BOM_UTF32BE) {
            self.encoding = Encoding::Utf32Be;
            self.drop_raw(4);
        } else if self.raw_starts_with(BOM_UTF16LE) {
            self.encoding = Encoding::Utf16Le;
            self.drop_raw(2);
        } else if self.raw_starts_with(BOM_UTF16BE) {
            self.encoding = Encoding::Utf16Be;
            self.drop_raw(2);
        } else if self.raw_starts_with(BOM_UTF8) {
            self.encoding = Encoding::Utf8;
            self.drop_raw(3);
        } else {
            self.encoding = Encoding::Utf8;
        }
        debug!("input encoding determined as {:?}", self.encoding);
        Ok(())
    }

    fn raw_starts_with(&self, needle: &[u8]) -> bool {
        self.raw.len() >= needle.len() && self.raw.iter().take(needle.len()).eq(needle.iter())
    }

    fn drop_raw(&mut self, n: usize) {
        self.raw.drain(..n);
        self.offset += n;
    }

    /// Decode as many complete characters from `raw` as possible.
    fn decode_available(&mut self) -> Result<(), ReaderError> {
        loop {
            let decoded = match self.encoding {
                Encoding::Utf8 => self.decode_utf8()?,
                Encoding::Utf16Le => self.decode_utf16(false)?,
                Encoding::Utf16Be => self.decode_utf16(true)?,
                Encoding::Utf32Le => self.decode_utf32(false)?,
                Encoding::Utf32Be => self.decode_utf32(true)?,
                Encoding::Any => unreachable!("encoding determined before decoding"),
            };
            match decoded {
                Some(ch) => self.push_char(ch)?,
                None => return Ok(()),
            }
        }
    }

    fn push_char(&mut self, ch: char) -> Result<(), ReaderError> {
        if !is_printable(ch) {
            return Err(ReaderError::NonPrintable {
                offset: self.offset,
                value: ch as u32,
            });
        }
        self.buffer.push_back(ch);
        Ok(())
    }

    fn decode_utf8(&mut self) -> Result<Option<char>, ReaderError> {
        let Some(&first) = self.raw.front() else {
            return Ok(None);
        };
        let (width, mut value) = match first {
            0x00..=0x7F => (1, first as u32),
            0xC0..=0xDF => (2, (first & 0x1F) as u32),
            0xE0..=0xEF => (3, (first & 0x0F) as u32),
            0xF0..=0xF7 => (4, (first & 0x07) as u32),
            _ => return Err(ReaderError::InvalidUtf8 {
                offset: self.offset,
            }),
        };
        if self.raw.len() < width {
            return self.incomplete("UTF-8");
        }
        for i in 1..width {
            let trailing = self.raw[i];
            if trailing & 0xC0 != 0x80 {
                return Err(ReaderError::InvalidUtf8 {
                    offset: self.offset + i,
                });
            }
            value = (value << 6) | (trailing & 0x3F) as u32;
        }
        let overlong = match width {
            2 => value < 0x80,
            3 => value < 0x800,
            4 => value < 0x10000,
            _ => false,
        };
        if overlong {
            return Err(ReaderError::InvalidUtf8 {
                offset: self.offset,
            });
        }
        match char::from_u32(value) {
            Some(ch) => {
                self.drop_raw(width);
                Ok(Some(ch))
            }
            None => Err(ReaderError::InvalidUtf8 {
                offset: self.offset,
            }),
        }
    }

    fn decode_utf16(&mut self, big_endian: bool) -> Result<Option<char>, ReaderError> {
        if self.raw.is_empty() {
            return Ok(None);
        }
        if self.raw.len() < 2 {
            return self.incomplete("UTF-16");
        }
        let unit = |bytes: [u8; 2]| {
            if big_endian {
                u16::from_be_bytes(bytes)
            } else {
                u16::from_le_bytes(bytes)
            }
        };
        let high = unit([self.raw[0], self.raw[1]]);
        if high & 0xFC00 == 0xDC00 {
            return Err(ReaderError::InvalidUtf16 {
                offset: self.offset,
                value: high,
            });
        }
        if high & 0xFC00 != 0xD800 {
            self.drop_raw(2);
            // Non-surrogate code units are scalar values already.
            return Ok(Some(char::from_u32(high as u32).expect("non-surrogate")));
        }
        if self.raw.len() < 4 {
            return self.incomplete("UTF-16");
        }
        let low = unit([self.raw[2], self.raw[3]]);
        if low & 0xFC00 != 0xDC00 {
            return Err(ReaderError::InvalidUtf16 {
                offset: self.offset + 2,
                value: low,
            });
        }
        let value = 0x10000 + (((high as u32 & 0x3FF) << 10) | (low as u32 & 0x3FF));
        self.drop_raw(4);
        Ok(Some(char::from_u32(value).expect("valid surrogate pair")))
    }

    fn decode_utf32(&mut self, big_endian: bool) -> Result<Option<char>, ReaderError> {
        if self.raw.is_empty() {
            return Ok(None);
        }
        if self.raw.len() < 4 {
            return self.incomplete("UTF-32");
        }
        let bytes = [self.raw[0], self.raw[1], self.raw[2], self.raw[3]];
        let value = if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        };
        match char::from_u32(value) {
            Some(ch) => {
                self.drop_raw(4);
                Ok(Some(ch))
            }
            None => Err(ReaderError::InvalidUtf32 {
                offset: self.offset,
                value,
            }),
        }
    }

    /// A truncated multi-byte character: fatal at end of stream, otherwise a
    /// request for more raw bytes.
    fn incomplete(&self, encoding: &'static str) -> Result<Option<char>, ReaderError> {
        if self.eof {
            Err(ReaderError::Incomplete {
                encoding,
                offset: self.offset,
            })
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader_over(bytes: &[u8]) -> Reader<'_> {
        let mut reader = Reader::new();
        reader.set_input(bytes);
        reader
    }

    #[test]
    fn utf8_default() {
        let mut reader = reader_over("key: value".as_bytes());
        reader.ensure(4).unwrap();
        assert_eq!(reader.encoding(), Encoding::Utf8);
        assert_eq!(reader.prefix(4), "key:");
    }

    #[test]
    fn utf16le_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "ok".encode_utf16() {
            bytes.extend(unit.to_le_bytes());
        }
        let mut reader = reader_over(&bytes);
        reader.ensure(2).unwrap();
        assert_eq!(reader.encoding(), Encoding::Utf16Le);
        assert_eq!(reader.prefix(2), "ok");
    }

    #[test]
    fn utf32be_bom_wins_over_utf16() {
        let mut bytes = vec![0x00, 0x00, 0xFE, 0xFF];
        bytes.extend([0x00, 0x00, 0x00, b'a']);
        let mut reader = reader_over(&bytes);
        reader.ensure(1).unwrap();
        assert_eq!(reader.encoding(), Encoding::Utf32Be);
        assert_eq!(reader.peek(0), 'a');
    }

    #[test]
    fn utf16_surrogate_pair_rejected_by_printable_check() {
        // U+1F600 decodes fine but falls outside the YAML 1.1 printable set.
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "\u{1F600}".encode_utf16() {
            bytes.extend(unit.to_le_bytes());
        }
        let mut reader = reader_over(&bytes);
        assert!(matches!(
            reader.ensure(1),
            Err(ReaderError::NonPrintable { .. })
        ));
    }

    #[test]
    fn odd_utf16_length_is_fatal() {
        let bytes = vec![0xFF, 0xFE, b'a'];
        let mut reader = reader_over(&bytes);
        assert!(matches!(
            reader.ensure(1),
            Err(ReaderError::Incomplete { .. })
        ));
    }

    #[test]
    fn control_character_rejected() {
        let mut reader = reader_over(b"a\x07b");
        assert!(matches!(
            reader.ensure(3),
            Err(ReaderError::NonPrintable { value: 7, .. })
        ));
    }

    #[test]
    fn sentinel_past_end() {
        let mut reader = reader_over(b"ab");
        reader.ensure(10).unwrap();
        assert_eq!(reader.peek(0), 'a');
        assert_eq!(reader.peek(2), SENTINEL);
        assert_eq!(reader.peek(100), SENTINEL);
        reader.forward(2);
        assert_eq!(reader.peek(0), SENTINEL);
    }

    #[test]
    fn crlf_counts_one_line() {
        let mut reader = reader_over(b"a\r\nb");
        reader.ensure(4).unwrap();
        reader.forward(3);
        assert_eq!(reader.mark.line, 1);
        assert_eq!(reader.mark.column, 0);
        assert_eq!(reader.peek(0), 'b');
    }

    #[test]
    fn bom_is_zero_width() {
        let mut reader = reader_over("a\u{FEFF}b".as_bytes());
        reader.ensure(3).unwrap();
        reader.forward(2);
        assert_eq!(reader.mark.column, 1);
        assert_eq!(reader.peek(0), 'b');
    }
}
