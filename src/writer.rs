use std::io::Write;

use crate::emitter::Emitter;
use crate::{Encoding, EmitterError, WriterError};

impl<W: Write> Emitter<W> {
    /// Queue the byte order mark for the output encoding. Called once at
    /// STREAM-START for non-UTF-8 encodings; the flush below encodes it.
    pub(crate) fn write_bom(&mut self) -> Result<(), EmitterError> {
        self.buffer.push('\u{FEFF}');
        Ok(())
    }

    /// Encode and write the accumulated characters to the output sink.
    pub fn flush(&mut self) -> Result<(), EmitterError> {
        assert_ne!(self.encoding, Encoding::Any, "encoding chosen at stream start");
        if self.buffer.is_empty() {
            return Ok(());
        }
        if self.encoding == Encoding::Utf8 {
            self.output
                .write_all(self.buffer.as_bytes())
                .map_err(WriterError::from)?;
            self.buffer.clear();
            return Ok(());
        }
        match self.encoding {
            Encoding::Utf16Le => {
                for unit in self.buffer.encode_utf16() {
                    self.raw_buffer.extend(unit.to_le_bytes());
                }
            }
            Encoding::Utf16Be => {
                for unit in self.buffer.encode_utf16() {
                    self.raw_buffer.extend(unit.to_be_bytes());
                }
            }
            Encoding::Utf32Le => {
                for ch in self.buffer.chars() {
                    self.raw_buffer.extend((ch as u32).to_le_bytes());
                }
            }
            Encoding::Utf32Be => {
                for ch in self.buffer.chars() {
                    self.raw_buffer.extend((ch as u32).to_be_bytes());
                }
            }
            Encoding::Utf8 | Encoding::Any => unreachable!(),
        }
        self.output
            .write_all(&self.raw_buffer)
            .map_err(WriterError::from)?;
        self.buffer.clear();
        self.raw_buffer.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Event, ScalarStyle};

    fn emit_with_encoding(encoding: Encoding) -> Vec<u8> {
        let mut output = Vec::new();
        {
            let mut emitter = Emitter::new(&mut output);
            emitter.set_encoding(encoding);
            for event in [
                Event::stream_start(encoding),
                Event::document_start(None, Vec::new(), true),
                Event::scalar(None, None, "ab", true, false, ScalarStyle::Plain),
                Event::document_end(false),
                Event::stream_end(),
            ] {
                emitter.emit(event).unwrap();
            }
        }
        output
    }

    #[test]
    fn utf8_has_no_bom() {
        let bytes = emit_with_encoding(Encoding::Utf8);
        assert_eq!(bytes, b"ab\n...\n");
    }

    #[test]
    fn utf16be_encodes_with_bom() {
        let bytes = emit_with_encoding(Encoding::Utf16Be);
        assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
        assert_eq!(&bytes[2..6], &[0x00, b'a', 0x00, b'b']);
    }

    #[test]
    fn utf32le_encodes_with_bom() {
        let bytes = emit_with_encoding(Encoding::Utf32Le);
        assert_eq!(&bytes[..4], &[0xFF, 0xFE, 0x00, 0x00]);
        assert_eq!(&bytes[4..8], &[b'a', 0x00, 0x00, 0x00]);
    }
}
