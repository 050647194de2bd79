//! Line, token and tag tokenizers for text and pseudo-XML formats.
//!
//! All readers hold a position into a borrowed byte range and yield a
//! finite sequence for one decode; none of them can be rewound.

use std::borrow::Cow;
use std::str::FromStr;

use crate::error::{MeshIoError, Result};

/// Decode bytes as UTF-8, falling back to Windows-1252 for legacy headers.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded
        }
    }
}

// ============================================================================
// Lines
// ============================================================================

/// Yields trimmed lines split on `\n`.
pub struct LineReader<'a> {
    data: &'a [u8],
    pos: usize,
    skip_blank: bool,
    line_number: usize,
}

impl<'a> LineReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            skip_blank: false,
            line_number: 0,
        }
    }

    /// Skip lines that are empty after trimming.
    pub fn skip_blank(mut self, skip: bool) -> Self {
        self.skip_blank = skip;
        self
    }

    /// Byte offset of the next unread line.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Next line, or a `MalformedInput` error naming `what` at end of data.
    pub fn expect_line(&mut self, what: &str) -> Result<Cow<'a, str>> {
        self.next().ok_or_else(|| {
            MeshIoError::malformed(format!(
                "unexpected end of text after line {} while reading {}",
                self.line_number, what
            ))
        })
    }
}

impl<'a> Iterator for LineReader<'a> {
    type Item = Cow<'a, str>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.pos >= self.data.len() {
                return None;
            }
            let rest = &self.data[self.pos..];
            let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
            self.pos += (end + 1).min(rest.len());
            self.line_number += 1;
            let line = match decode_text(&rest[..end]) {
                Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
                Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
            };
            if self.skip_blank && line.is_empty() {
                continue;
            }
            return Some(line);
        }
    }
}

// ============================================================================
// Tokens
// ============================================================================

/// Whitespace- and comma-separated tokens of a text body.
pub struct Tokens<'a> {
    inner: Box<dyn Iterator<Item = &'a str> + 'a>,
    consumed: usize,
}

impl<'a> Tokens<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            inner: Box::new(
                text.split(|c: char| c.is_whitespace() || c == ',')
                    .filter(|t| !t.is_empty()),
            ),
            consumed: 0,
        }
    }

    /// Number of tokens consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn next_token(&mut self) -> Result<&'a str> {
        let t = self.inner.next().ok_or_else(|| {
            MeshIoError::malformed(format!("expected more than {} tokens", self.consumed))
        })?;
        self.consumed += 1;
        Ok(t)
    }

    /// Parse the next token as `T`.
    pub fn next_value<T: FromStr>(&mut self) -> Result<T> {
        let t = self.next_token()?;
        t.parse::<T>().map_err(|_| {
            MeshIoError::malformed(format!("invalid number '{}' at token {}", t, self.consumed))
        })
    }

    /// Parse `count` tokens as `f32`.
    pub fn next_f32s(&mut self, count: usize) -> Result<Vec<f32>> {
        (0..count).map(|_| self.next_value::<f32>()).collect()
    }

    /// Discard `count` tokens.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.next_token()?;
        }
        Ok(())
    }
}

/// Parse every whitespace/comma-separated token of `text` as `T`.
pub fn parse_numbers<T: FromStr>(text: &str) -> Result<Vec<T>> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<T>()
                .map_err(|_| MeshIoError::malformed(format!("invalid number '{}'", t)))
        })
        .collect()
}

// ============================================================================
// Tags
// ============================================================================

/// One `<...>` chunk of a pseudo-XML stream.
#[derive(Debug, Clone)]
pub struct Tag<'a> {
    /// Text between `<` and `>`.
    pub text: Cow<'a, str>,
    /// Offset of the `<`.
    pub start: usize,
    /// Offset just past the `>`.
    pub end: usize,
}

impl<'a> Tag<'a> {
    /// Element name without a leading `/` (`Shape` for `<Shape DEF="x">`).
    pub fn name(&self) -> &str {
        tag_name(&self.text)
    }

    /// `</name>` tags.
    pub fn is_closing(&self) -> bool {
        self.text.starts_with('/')
    }

    /// `<name ... />` tags.
    pub fn is_self_closing(&self) -> bool {
        self.text.trim_end().ends_with('/')
    }

    /// `<?...?>` and `<!...>` prologue, comment and doctype chunks.
    pub fn is_declaration(&self) -> bool {
        self.text.starts_with('?') || self.text.starts_with('!')
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        attribute(&self.text, name)
    }

    pub fn numeric_attribute<T: FromStr>(&self, name: &str) -> Option<T> {
        numeric_attribute(&self.text, name)
    }
}

/// Yields `<tag ...>` chunks and the content between them.
pub struct TagReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TagReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Continue reading at `pos`, e.g. after a binary block.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Raw bytes from the current position up to (not including) the next
    /// `</name` closing tag; the reader is left at that closing tag.
    pub fn content_until_close(&mut self, name: &str) -> Option<&'a [u8]> {
        let needle = format!("</{}", name);
        let start = self.pos;
        let end = crate::io::cursor::find_bytes(self.data, needle.as_bytes(), start)?;
        self.pos = end;
        Some(&self.data[start..end])
    }

    /// Next tag; comments are skipped whole.
    pub fn next_tag(&mut self) -> Option<Tag<'a>> {
        loop {
            let rest = self.data.get(self.pos..)?;
            let open = rest.iter().position(|&b| b == b'<')? + self.pos;
            if self.data[open..].starts_with(b"<!--") {
                let close = crate::io::cursor::find_bytes(self.data, b"-->", open + 4)?;
                self.pos = close + 3;
                continue;
            }
            let close = self.data[open..].iter().position(|&b| b == b'>')? + open;
            self.pos = close + 1;
            let text = match decode_text(&self.data[open + 1..close]) {
                Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
                Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
            };
            return Some(Tag {
                text,
                start: open,
                end: close + 1,
            });
        }
    }
}

impl<'a> Iterator for TagReader<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_tag()
    }
}

/// Element name of a tag body.
pub fn tag_name(tag: &str) -> &str {
    let t = tag.trim_start_matches('/');
    let end = t
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(t.len());
    &t[..end]
}

/// Value of `name="value"` (or single-quoted) inside a tag or line.
///
/// The attribute name must start the text or follow whitespace, so `Dim0`
/// never matches inside `ni_Dim0`.
pub fn attribute<'b>(text: &'b str, name: &str) -> Option<&'b str> {
    let mut from = 0;
    while let Some(rel) = text[from..].find(name) {
        let at = from + rel;
        from = at + name.len();
        let boundary = at == 0
            || text[..at]
                .chars()
                .next_back()
                .map_or(true, |c| c.is_whitespace() || c == '<');
        if !boundary {
            continue;
        }
        let after = text[from..].trim_start();
        let Some(after_eq) = after.strip_prefix('=') else {
            continue;
        };
        let value = after_eq.trim_start();
        let quote = value.chars().next()?;
        if quote != '"' && quote != '\'' {
            continue;
        }
        let inner = &value[1..];
        let end = inner.find(quote)?;
        return Some(&inner[..end]);
    }
    None
}

/// Attribute value parsed as `T`.
pub fn numeric_attribute<T: FromStr>(text: &str, name: &str) -> Option<T> {
    attribute(text, name)?.trim().parse::<T>().ok()
}
