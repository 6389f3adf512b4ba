//! Options shared by the text readers

/// How fields on a line are separated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Any run of spaces or tabs
    Whitespace,
    /// A single ASCII byte such as `,` or `;`; empty fields between two
    /// delimiters are rejected
    Byte(u8),
}

/// Where the label sits on a labeled line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPosition {
    /// First field (SVMLight convention)
    First,
    /// Last field
    Last,
}

/// Options for line-oriented example readers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiReaderOptions {
    /// Field delimiter
    pub delimiter: Delimiter,

    /// Lines whose first non-blank character is this byte are skipped
    pub comment: Option<u8>,

    /// Whether blank lines are skipped (otherwise they decode as empty vectors)
    pub skip_empty_lines: bool,

    /// Where the label sits on labeled lines
    pub label_position: LabelPosition,

    /// Index of the first feature in sparse `index:value` pairs
    pub index_base: usize,
}

impl Default for AsciiReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::Whitespace,
            comment: Some(b'#'),
            skip_empty_lines: true,
            label_position: LabelPosition::First,
            index_base: 1,
        }
    }
}

impl AsciiReaderOptions {
    /// Comma separated values
    pub fn csv() -> Self {
        Self::default().with_delimiter(Delimiter::Byte(b','))
    }

    /// Set the field delimiter
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the comment byte
    #[must_use]
    pub fn with_comment(mut self, comment: Option<u8>) -> Self {
        self.comment = comment;
        self
    }

    /// Set where the label sits
    #[must_use]
    pub fn with_label_position(mut self, position: LabelPosition) -> Self {
        self.label_position = position;
        self
    }

    /// Set the index of the first sparse feature
    #[must_use]
    pub fn with_index_base(mut self, base: usize) -> Self {
        self.index_base = base;
        self
    }

    /// Set whether blank lines are skipped
    #[must_use]
    pub fn with_skip_empty_lines(mut self, skip: bool) -> Self {
        self.skip_empty_lines = skip;
        self
    }
}
