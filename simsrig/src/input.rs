//! Record readers shared by the character and mesh decoders.
//!
//! Both game formats come in a binary flavour (BCF/BMF) and a text flavour (CMX/SKN) with the
//! same logical record order, so the decoders are written once against [`RecordReader`].

use crate::Error;
use byteorder::{ByteOrder, LittleEndian};
use std::collections::VecDeque;

pub(crate) trait RecordReader {
    fn read_string(&mut self) -> Result<String, Error>;
    fn read_i32(&mut self) -> Result<i32, Error>;
    fn read_f32(&mut self) -> Result<f32, Error>;

    fn read_count(&mut self, what: &str) -> Result<usize, Error> {
        let v = self.read_i32()?;
        usize::try_from(v).map_err(|_| self.error(format!("negative {what} count {v}")))
    }

    fn read_index(&mut self, what: &str) -> Result<usize, Error> {
        let v = self.read_i32()?;
        usize::try_from(v).map_err(|_| self.error(format!("negative {what} {v}")))
    }

    fn read_flag(&mut self) -> Result<bool, Error> {
        Ok(self.read_i32()? != 0)
    }

    fn read_vec3(&mut self) -> Result<[f32; 3], Error> {
        Ok([self.read_f32()?, self.read_f32()?, self.read_f32()?])
    }

    fn read_vec4(&mut self) -> Result<[f32; 4], Error> {
        Ok([
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ])
    }

    /// Builds a format error annotated with the reader's current position.
    fn error(&self, message: String) -> Error;
}

#[derive(Clone, Debug)]
pub(crate) struct BinaryInput<'a> {
    format: &'static str,
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> BinaryInput<'a> {
    pub(crate) fn new(format: &'static str, bytes: &'a [u8]) -> Self {
        Self {
            format,
            bytes,
            cursor: 0,
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.cursor)
    }

    fn eof(&self, what: &str) -> Error {
        Error::format(
            self.format,
            format!("unexpected EOF reading {what} at offset {}", self.cursor),
        )
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, Error> {
        let b = *self.bytes.get(self.cursor).ok_or_else(|| self.eof("u8"))?;
        self.cursor += 1;
        Ok(b)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, Error> {
        if self.remaining() < 2 {
            return Err(self.eof("u16"));
        }
        let v = LittleEndian::read_u16(&self.bytes[self.cursor..self.cursor + 2]);
        self.cursor += 2;
        Ok(v)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < len {
            return Err(Error::format(
                self.format,
                format!(
                    "unexpected EOF while reading {len} bytes at offset {}",
                    self.cursor
                ),
            ));
        }
        let bytes = &self.bytes[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(bytes)
    }
}

impl RecordReader for BinaryInput<'_> {
    fn read_string(&mut self) -> Result<String, Error> {
        let len = self.read_u8()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    fn read_f32(&mut self) -> Result<f32, Error> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    fn error(&self, message: String) -> Error {
        Error::format(self.format, format!("{message} (offset {})", self.cursor))
    }
}

/// Line/token reader for the text flavours.
///
/// Strings take a whole line, which may be empty; numbers are whitespace separated and may
/// share a line. `//` comment lines and the `|` vector delimiters are skipped, and blank lines
/// are skipped between numbers.
pub(crate) struct TextInput<'a> {
    format: &'static str,
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    pending: VecDeque<&'a str>,
    line_no: usize,
}

impl<'a> TextInput<'a> {
    pub(crate) fn new(format: &'static str, text: &'a str) -> Self {
        Self {
            format,
            lines: text.lines().enumerate(),
            pending: VecDeque::new(),
            line_no: 0,
        }
    }

    /// Next non-comment line. Blank lines are skipped only when `skip_blank` is set, since a
    /// blank line in string position is an empty string.
    fn next_line(&mut self, skip_blank: bool) -> Result<&'a str, Error> {
        for (i, raw) in self.lines.by_ref() {
            let line = raw.trim();
            if line.starts_with("//") || (skip_blank && line.is_empty()) {
                continue;
            }
            self.line_no = i + 1;
            return Ok(line);
        }
        Err(Error::format(
            self.format,
            format!("unexpected end of text after line {}", self.line_no),
        ))
    }

    fn next_token(&mut self) -> Result<&'a str, Error> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }
            let line = self.next_line(true)?;
            self.pending.extend(
                line.split_whitespace()
                    .map(|t| t.trim_matches('|'))
                    .filter(|t| !t.is_empty()),
            );
        }
    }

    /// Consumes a `version <n>` header line, if the text has one.
    pub(crate) fn read_version(&mut self) -> Result<Option<i32>, Error> {
        let token = self.next_token()?;
        if !token.eq_ignore_ascii_case("version") {
            self.pending.push_front(token);
            return Ok(None);
        }
        Ok(Some(self.read_i32()?))
    }
}

impl RecordReader for TextInput<'_> {
    fn read_string(&mut self) -> Result<String, Error> {
        if !self.pending.is_empty() {
            let rest: Vec<&str> = self.pending.drain(..).collect();
            return Ok(rest.join(" "));
        }
        Ok(self.next_line(false)?.to_string())
    }

    fn read_i32(&mut self) -> Result<i32, Error> {
        let token = self.next_token()?;
        token
            .parse()
            .map_err(|_| self.error(format!("expected integer, got '{token}'")))
    }

    fn read_f32(&mut self) -> Result<f32, Error> {
        let token = self.next_token()?;
        token
            .parse()
            .map_err(|_| self.error(format!("expected number, got '{token}'")))
    }

    fn error(&self, message: String) -> Error {
        Error::format(self.format, format!("{message} (line {})", self.line_no))
    }
}

/// Text streams from the game are plain ASCII but occasionally carry Latin-1 bytes.
pub(crate) fn decode_text(bytes: &[u8]) -> std::borrow::Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes)
}
