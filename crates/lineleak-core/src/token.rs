//! Token model consumed by the line classifier.

use serde::{Deserialize, Serialize};

/// Category of a lexical token.
///
/// Closed on purpose: the classifier only distinguishes these seven kinds,
/// whatever the tokenizer that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    /// Terminates a logical line (one statement).
    StatementEnd,
    /// A line break that does not end a statement: blank lines,
    /// comment-only lines, breaks inside brackets.
    LineBreak,
    /// A `#` comment, without its trailing line break.
    Comment,
    /// A string literal, prefix included.
    String,
    /// Synthetic marker after the last line of the file.
    EndMarker,
    /// An operator or delimiter.
    Operator,
    /// Anything else: names, numbers, stray characters.
    Other,
}

impl TokenKind {
    /// Whether a token of this kind may be blamed as the leak line.
    #[must_use]
    pub fn can_trigger_leak(self) -> bool {
        !matches!(self, Self::LineBreak | Self::Comment | Self::String)
    }
}

/// A position in source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column in characters (0-indexed).
    pub column: u32,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A single lexical token of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token category.
    pub kind: TokenKind,
    /// Raw lexeme.
    pub text: String,
    /// Where the token starts.
    pub start: Position,
    /// Where the token ends (exclusive column).
    pub end: Position,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub fn new(kind: TokenKind, text: impl Into<String>, start: Position, end: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            start,
            end,
        }
    }

    /// Whether this token is a string literal opened with a triple quote.
    ///
    /// Prefixed literals such as `r"""..."""` do not count.
    #[must_use]
    pub fn is_triple_quoted_string(&self) -> bool {
        self.kind == TokenKind::String
            && (self.text.starts_with("\"\"\"") || self.text.starts_with("'''"))
    }

    /// Number of physical lines the token spans.
    #[must_use]
    pub fn line_span(&self) -> u32 {
        self.end.line.saturating_sub(self.start.line) + 1
    }
}
