//! Text buffers addressed by UTF-16 code unit offsets.
//!
//! Selections coming from text widgets are measured in UTF-16 code units, so
//! every span in this crate uses the same unit. [`TextBuffer`] keeps the
//! encoded form next to the `String` so slicing is a range lookup.

use serde::{Deserialize, Serialize};

use crate::errors::InvalidSpan;

/// A half-open `[start, end)` range of UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Validate a user-derived range against a buffer.
    ///
    /// Returns [`InvalidSpan`] instead of panicking, for ranges that come
    /// from selections rather than from code.
    pub fn checked(start: usize, end: usize, text: &TextBuffer) -> Result<Self, InvalidSpan> {
        let len = text.len_utf16();
        if start >= end || end > len {
            return Err(InvalidSpan { start, end, len });
        }
        Ok(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Two spans overlap iff they share at least one code unit.
    ///
    /// Touching spans (`[0,4)` and `[4,8)`) do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// True if this span lies within a buffer of `len` code units.
    pub fn fits(&self, len: usize) -> bool {
        self.start < self.end && self.end <= len
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// The source string under annotation.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct TextBuffer {
    text: String,
    units: Vec<u16>,
}

impl std::fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBuffer")
            .field("text", &self.text)
            .field("len_utf16", &self.units.len())
            .finish()
    }
}

impl TextBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let units = text.encode_utf16().collect();
        Self { text, units }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in UTF-16 code units.
    pub fn len_utf16(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Substring for a span, or `None` if the span falls outside the buffer.
    ///
    /// A span that cuts a surrogate pair decodes the dangling half as U+FFFD.
    pub fn slice(&self, span: Span) -> Option<String> {
        if span.start > span.end || span.end > self.units.len() {
            return None;
        }
        Some(String::from_utf16_lossy(&self.units[span.start..span.end]))
    }

    /// Replace the whole text, returning the previous one.
    pub fn replace(&mut self, text: impl Into<String>) -> TextBuffer {
        std::mem::replace(self, TextBuffer::new(text))
    }

    /// UTF-16 offset of the `nth` occurrence of `needle`, if any.
    pub fn find_utf16(&self, needle: &str, nth: usize) -> Option<Span> {
        let (byte_idx, _) = self.text.match_indices(needle).nth(nth)?;
        let start = self.text[..byte_idx].encode_utf16().count();
        Some(Span::new(start, start + needle.encode_utf16().count()))
    }
}

impl From<&str> for TextBuffer {
    fn from(text: &str) -> Self {
        TextBuffer::new(text)
    }
}

impl From<String> for TextBuffer {
    fn from(text: String) -> Self {
        TextBuffer::new(text)
    }
}

/// A single contiguous replacement: `[start, end)` becomes
/// `replacement_len` code units of new text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub replacement_len: usize,
}

impl TextEdit {
    pub fn new(start: usize, end: usize, replacement_len: usize) -> Self {
        Self {
            start,
            end,
            replacement_len,
        }
    }

    pub fn insert(at: usize, len: usize) -> Self {
        Self::new(at, at, len)
    }

    pub fn delete(start: usize, end: usize) -> Self {
        Self::new(start, end, 0)
    }

    /// Derive the smallest single edit that turns `old` into `new`.
    ///
    /// Strips the common UTF-16 prefix and suffix. Returns `None` when the
    /// texts are identical.
    pub fn between(old: &TextBuffer, new: &TextBuffer) -> Option<Self> {
        let (a, b) = (old.units(), new.units());
        if a == b {
            return None;
        }

        let prefix = a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count();
        let max_suffix = a.len().min(b.len()) - prefix;
        let suffix = a
            .iter()
            .rev()
            .zip(b.iter().rev())
            .take(max_suffix)
            .take_while(|(x, y)| x == y)
            .count();

        Some(Self {
            start: prefix,
            end: a.len() - suffix,
            replacement_len: b.len() - suffix - prefix,
        })
    }

    pub fn is_insertion(&self) -> bool {
        self.start == self.end
    }

    /// Signed change in buffer length.
    pub fn delta(&self) -> isize {
        self.replacement_len as isize - (self.end - self.start) as isize
    }

    pub fn replaced(&self) -> Span {
        Span::new(self.start, self.end)
    }
}
