//! UTF-16 indexed string helpers.
//!
//! Positions and lengths on the wire count UTF-16 code units, so a character
//! outside the Basic Multilingual Plane takes two. These helpers translate
//! unit indexes to byte offsets and clamp out of range indexes the way slice
//! operations on the wire format do. An index that falls between the two
//! halves of a surrogate pair is rounded down to the start of the character.

/// Number of UTF-16 code units in `s`.
pub fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

fn byte_offset(s: &str, unit_idx: usize) -> usize {
    let mut units = 0;
    for (b, ch) in s.char_indices() {
        units += ch.len_utf16();
        if units > unit_idx {
            return b;
        }
    }
    s.len()
}

/// Slice `s` between unit indexes `start` and `end`, clamped to the string.
pub fn slice(s: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let from = byte_offset(s, start);
    let to = byte_offset(s, end);
    &s[from..to.max(from)]
}

/// Everything from unit index `start` on.
pub fn slice_from(s: &str, start: usize) -> &str {
    &s[byte_offset(s, start)..]
}

/// Everything before unit index `end`.
pub fn slice_to(s: &str, end: usize) -> &str {
    &s[..byte_offset(s, end)]
}

/// Insert `text` into `s` at unit index `pos`.
pub fn insert_at(s: &str, pos: usize, text: &str) -> String {
    let at = byte_offset(s, pos);
    let mut out = String::with_capacity(s.len() + text.len());
    out.push_str(&s[..at]);
    out.push_str(text);
    out.push_str(&s[at..]);
    out
}

/// Remove `len` units from `s` starting at unit index `pos`.
pub fn remove_at(s: &str, pos: usize, len: usize) -> String {
    let from = byte_offset(s, pos);
    let to = byte_offset(s, pos + len).max(from);
    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..from]);
    out.push_str(&s[to..]);
    out
}

/// A document with a precomputed unit to byte table.
///
/// Validation slices the same text once per range, so the table keeps each
/// lookup constant time.
#[derive(Clone, Debug)]
pub struct IndexedText {
    text: String,
    /// Byte offset of every UTF-16 unit. The low half of a surrogate pair
    /// maps to the start of its character.
    offsets: Vec<usize>,
}

impl IndexedText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut offsets = Vec::with_capacity(text.len() + 1);
        for (b, ch) in text.char_indices() {
            offsets.extend(std::iter::repeat(b).take(ch.len_utf16()));
        }
        offsets.push(text.len());
        Self { text, offsets }
    }

    /// Join document lines with `\n`.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let joined = lines
            .iter()
            .map(|l| l.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        Self::new(joined)
    }

    /// Length in UTF-16 units.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Slice by unit indexes, clamped to the text.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        let len = self.len();
        let start = start.min(len);
        let end = end.min(len).max(start);
        &self.text[self.offsets[start]..self.offsets[end]]
    }
}

/// Live length of a document given as lines.
pub fn doc_length<S: AsRef<str>>(lines: &[S]) -> usize {
    if lines.is_empty() {
        return 0;
    }
    let newlines = lines.len() - 1;
    lines.iter().map(|l| utf16_len(l.as_ref())).sum::<usize>() + newlines
}
