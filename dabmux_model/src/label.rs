//! DAB labels: a 16-byte long label, a short-label character mask picking
//! out up to 8 visible characters, and an optional extended (UTF-8) form.

/// Long label (padded/truncated to 16 bytes) plus the bitmask of characters
/// that also appear in the 8-character short label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub long: String,
    /// Bitmask over `long`'s character positions (bit i set => character i
    /// is part of the short label). Must select exactly the characters of
    /// an 8-or-fewer character subsequence.
    pub short_mask: u16,
    pub extended: Option<ExtendedLabel>,
}

/// Extended (UTF-8, FIG 2/x) label with optional text-control attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedLabel {
    pub text: String,
    pub control: Vec<TextControl>,
}

/// A text-control run: a styling attribute over a byte range of `text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextControl {
    pub start: u8,
    pub len: u8,
    pub attribute: TextAttribute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAttribute {
    Bold,
    Italic,
    Underline,
}

impl Label {
    pub fn new(long: impl Into<String>) -> Self {
        let long = long.into();
        Self { long, short_mask: 0, extended: None }
    }

    /// Truncates `long` to 16 bytes (DAB's maximum) as required on emit.
    pub fn long_bytes(&self) -> &[u8] {
        let bytes = self.long.as_bytes();
        &bytes[..bytes.len().min(16)]
    }

    /// Number of bits set in the short-label mask; must not exceed 8.
    pub fn short_label_len(&self) -> u32 {
        self.short_mask.count_ones()
    }
}
