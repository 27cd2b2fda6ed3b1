//! Live code line classifier.
//!
//! A single forward pass over the tokens of one file that keeps two running
//! counters (logical and physical live lines) and latches the first line on
//! which the configured maximum is exceeded.
//!
//! The per-token rules run in a fixed order; changing it changes which token
//! gets blamed as the leak line:
//!
//! 1. a statement terminator adds one logical line;
//! 2. a line break on a fresh line, a comment or the end marker removes one
//!    physical line;
//! 3. a triple-quoted string not preceded by an operator is a docstring: it
//!    cancels the logical line its terminator will add and removes every
//!    physical line it spans;
//! 4. the limit is checked, unless already reached or the token is a line
//!    break, comment or string;
//! 5. the token becomes the "previous" token.

use serde::{Deserialize, Serialize};

use crate::token::{Position, Token, TokenKind};

/// Default maximum number of live code lines.
pub const DEFAULT_MAX_LINE_COUNT: u32 = 100;

/// Which count the limit is enforced against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountMode {
    /// Count statements, however many physical lines they span.
    Logical,
    /// Count raw source lines.
    #[default]
    Physical,
}

impl std::fmt::Display for CountMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logical => write!(f, "logical"),
            Self::Physical => write!(f, "physical"),
        }
    }
}

/// Immutable settings for one classification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Count the limit is enforced against.
    pub mode: CountMode,
    /// Largest allowed live line count.
    pub max_line_count: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            mode: CountMode::Physical,
            max_line_count: DEFAULT_MAX_LINE_COUNT,
        }
    }
}

impl ClassifierConfig {
    /// Creates a configuration with the defaults (physical, 100).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects logical (`true`) or physical (`false`) enforcement.
    #[must_use]
    pub fn logical(mut self, logical: bool) -> Self {
        self.mode = if logical {
            CountMode::Logical
        } else {
            CountMode::Physical
        };
        self
    }

    /// Sets the maximum; zero falls back to [`DEFAULT_MAX_LINE_COUNT`].
    #[must_use]
    pub fn max_line_count(mut self, max: u32) -> Self {
        self.max_line_count = if max == 0 {
            DEFAULT_MAX_LINE_COUNT
        } else {
            max
        };
        self
    }
}

/// Outcome of classifying one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// End line of the last token.
    pub last_line: u32,
    /// End column of the last token.
    pub last_column: u32,
    /// First line on which the limit was exceeded.
    pub leak_line: Option<u32>,
    /// Whether the limit was exceeded at all.
    pub limit_reached: bool,
    /// Logical live code lines.
    pub logical_count: i64,
    /// Physical live code lines.
    pub physical_count: i64,
}

/// Accumulator behind [`classify`].
///
/// Useful when tokens arrive one at a time; otherwise call [`classify`].
#[derive(Debug, Clone)]
pub struct Classifier<'c> {
    config: &'c ClassifierConfig,
    physical_deductions: i64,
    logical_count: i64,
    prev_line: Option<u32>,
    prev_kind: Option<TokenKind>,
    leak_line: Option<u32>,
    last: Position,
}

impl<'c> Classifier<'c> {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new(config: &'c ClassifierConfig) -> Self {
        Self {
            config,
            physical_deductions: 0,
            logical_count: 0,
            prev_line: None,
            prev_kind: None,
            leak_line: None,
            last: Position::default(),
        }
    }

    /// Feeds the next token in source order.
    pub fn push(&mut self, token: &Token) {
        let line = token.start.line;

        match token.kind {
            TokenKind::StatementEnd => self.logical_count += 1,
            TokenKind::LineBreak if self.prev_line != Some(line) => {
                self.physical_deductions += 1;
            }
            TokenKind::Comment | TokenKind::EndMarker => self.physical_deductions += 1,
            TokenKind::String
                if token.is_triple_quoted_string()
                    && self.prev_kind != Some(TokenKind::Operator) =>
            {
                self.logical_count -= 1;
                self.physical_deductions += i64::from(token.line_span());
            }
            _ => {}
        }

        if self.leak_line.is_none() && token.kind.can_trigger_leak() && self.exceeds_limit(line) {
            self.leak_line = Some(line);
        }

        self.prev_kind = Some(token.kind);
        self.prev_line = Some(line);
        self.last = token.end;
    }

    fn exceeds_limit(&self, line: u32) -> bool {
        let max = i64::from(self.config.max_line_count);
        match self.config.mode {
            CountMode::Logical => self.logical_count > max,
            CountMode::Physical => i64::from(line) - self.physical_deductions > max,
        }
    }

    /// Consumes the accumulator and produces the result.
    ///
    /// The running counts can dip below zero when one statement holds
    /// several docstring-like literals; the reported counts never do.
    #[must_use]
    pub fn finish(self) -> AnalysisResult {
        AnalysisResult {
            last_line: self.last.line,
            last_column: self.last.column,
            leak_line: self.leak_line,
            limit_reached: self.leak_line.is_some(),
            logical_count: self.logical_count.max(0),
            physical_count: (i64::from(self.last.line) - self.physical_deductions).max(0),
        }
    }
}

/// Classifies the complete token stream of one file.
///
/// Never fails: an empty stream yields zero counts and no leak.
#[must_use]
pub fn classify<'t, I>(tokens: I, config: &ClassifierConfig) -> AnalysisResult
where
    I: IntoIterator<Item = &'t Token>,
{
    tokens
        .into_iter()
        .fold(Classifier::new(config), |mut classifier, token| {
            classifier.push(token);
            classifier
        })
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hand-built token streams, one helper per kind of source line.
    #[derive(Default)]
    struct Stream {
        tokens: Vec<Token>,
    }

    impl Stream {
        fn push(&mut self, kind: TokenKind, text: &str, start: (u32, u32), end: (u32, u32)) {
            self.tokens.push(Token::new(
                kind,
                text,
                Position::new(start.0, start.1),
                Position::new(end.0, end.1),
            ));
        }

        /// `x = 1`
        fn statement(mut self, line: u32) -> Self {
            self.push(TokenKind::Other, "x", (line, 0), (line, 1));
            self.push(TokenKind::Operator, "=", (line, 2), (line, 3));
            self.push(TokenKind::Other, "1", (line, 4), (line, 5));
            self.push(TokenKind::StatementEnd, "\n", (line, 5), (line, 6));
            self
        }

        /// `x = (1,` / `     2)` spread over `line` and `line + 1`
        fn bracketed_statement(mut self, line: u32) -> Self {
            self.push(TokenKind::Other, "x", (line, 0), (line, 1));
            self.push(TokenKind::Operator, "=", (line, 2), (line, 3));
            self.push(TokenKind::Operator, "(", (line, 4), (line, 5));
            self.push(TokenKind::Other, "1", (line, 5), (line, 6));
            self.push(TokenKind::Operator, ",", (line, 6), (line, 7));
            self.push(TokenKind::LineBreak, "\n", (line, 7), (line, 8));
            self.push(TokenKind::Other, "2", (line + 1, 5), (line + 1, 6));
            self.push(TokenKind::Operator, ")", (line + 1, 6), (line + 1, 7));
            self.push(TokenKind::StatementEnd, "\n", (line + 1, 7), (line + 1, 8));
            self
        }

        fn blank(mut self, line: u32) -> Self {
            self.push(TokenKind::LineBreak, "\n", (line, 0), (line, 1));
            self
        }

        /// `# note`
        fn comment(mut self, line: u32) -> Self {
            self.push(TokenKind::Comment, "# note", (line, 0), (line, 6));
            self.push(TokenKind::LineBreak, "\n", (line, 6), (line, 7));
            self
        }

        /// `x = 1  # note`
        fn statement_with_comment(mut self, line: u32) -> Self {
            self.push(TokenKind::Other, "x", (line, 0), (line, 1));
            self.push(TokenKind::Operator, "=", (line, 2), (line, 3));
            self.push(TokenKind::Other, "1", (line, 4), (line, 5));
            self.push(TokenKind::Comment, "# note", (line, 7), (line, 13));
            self.push(TokenKind::StatementEnd, "\n", (line, 13), (line, 14));
            self
        }

        /// A docstring statement from `start` to `end`.
        fn docstring(mut self, start: u32, end: u32) -> Self {
            self.push(TokenKind::String, "\"\"\"doc\"\"\"", (start, 0), (end, 3));
            self.push(TokenKind::StatementEnd, "\n", (end, 3), (end, 4));
            self
        }

        /// `x = """value"""`
        fn assigned_triple_string(mut self, line: u32) -> Self {
            self.push(TokenKind::Other, "x", (line, 0), (line, 1));
            self.push(TokenKind::Operator, "=", (line, 2), (line, 3));
            self.push(TokenKind::String, "\"\"\"value\"\"\"", (line, 4), (line, 15));
            self.push(TokenKind::StatementEnd, "\n", (line, 15), (line, 16));
            self
        }

        fn statements(self, lines: std::ops::RangeInclusive<u32>) -> Self {
            lines.fold(self, Stream::statement)
        }

        fn end(mut self, line: u32) -> Vec<Token> {
            self.push(TokenKind::EndMarker, "", (line, 0), (line, 0));
            self.tokens
        }
    }

    fn physical() -> ClassifierConfig {
        ClassifierConfig::new()
    }

    fn logical() -> ClassifierConfig {
        ClassifierConfig::new().logical(true)
    }

    #[test]
    fn empty_stream_is_degenerate() {
        let result = classify(std::iter::empty(), &physical());
        assert_eq!(result, AnalysisResult::default());
    }

    #[test]
    fn short_file_has_no_leak() {
        let tokens = Stream::default().statements(1..=5).end(6);
        let result = classify(&tokens, &physical());

        assert_eq!(result.logical_count, 5);
        assert_eq!(result.physical_count, 5);
        assert!(!result.limit_reached);
        assert_eq!(result.leak_line, None);
        assert_eq!((result.last_line, result.last_column), (6, 0));
    }

    #[test]
    fn exactly_at_limit_is_not_a_leak() {
        let tokens = Stream::default().statements(1..=100).end(101);
        let result = classify(&tokens, &physical());

        assert_eq!(result.physical_count, 100);
        assert!(!result.limit_reached);
    }

    #[test]
    fn physical_leak_blames_first_line_over_limit() {
        let tokens = Stream::default().statements(1..=120).end(121);
        let result = classify(&tokens, &physical());

        assert!(result.limit_reached);
        assert_eq!(result.leak_line, Some(101));
        assert_eq!(result.physical_count, 120);
    }

    #[test]
    fn blank_lines_and_comments_are_not_live() {
        let tokens = Stream::default()
            .statement(1)
            .blank(2)
            .comment(3)
            .statement(4)
            .blank(5)
            .blank(6)
            .end(7);
        let result = classify(&tokens, &physical());

        assert_eq!(result.logical_count, 2);
        assert_eq!(result.physical_count, 2);
    }

    #[test]
    fn trailing_comment_removes_a_physical_line() {
        let tokens = Stream::default()
            .statement(1)
            .statement_with_comment(2)
            .end(3);
        let result = classify(&tokens, &physical());

        assert_eq!(result.logical_count, 2);
        assert_eq!(result.physical_count, 1);
    }

    #[test]
    fn break_inside_brackets_keeps_both_lines() {
        let tokens = Stream::default().bracketed_statement(1).end(3);
        let result = classify(&tokens, &physical());

        assert_eq!(result.logical_count, 1);
        assert_eq!(result.physical_count, 2);
    }

    #[test]
    fn lone_docstring_counts_nothing() {
        let tokens = Stream::default().docstring(1, 1).end(2);
        let result = classify(&tokens, &physical());

        assert_eq!(result.logical_count, 0);
        assert_eq!(result.physical_count, 0);
    }

    #[test]
    fn multi_line_docstring_removes_its_whole_span() {
        let tokens = Stream::default()
            .docstring(1, 4)
            .statement(5)
            .statement(6)
            .end(7);
        let result = classify(&tokens, &physical());

        assert_eq!(result.logical_count, 2);
        assert_eq!(result.physical_count, 2);
    }

    #[test]
    fn concatenated_docstrings_do_not_go_negative() {
        // """a""" """b"""
        let mut stream = Stream::default();
        stream.push(TokenKind::String, "\"\"\"a\"\"\"", (1, 0), (1, 7));
        stream.push(TokenKind::String, "\"\"\"b\"\"\"", (1, 8), (1, 15));
        stream.push(TokenKind::StatementEnd, "\n", (1, 15), (1, 16));
        let tokens = stream.end(2);
        let result = classify(&tokens, &physical());

        assert_eq!((result.logical_count, result.physical_count), (0, 0));
        assert!(!result.limit_reached);
    }

    #[test]
    fn negative_running_count_still_drives_the_limit() {
        let mut stream = Stream::default();
        stream.push(TokenKind::String, "\"\"\"a\"\"\"", (1, 0), (1, 7));
        stream.push(TokenKind::String, "\"\"\"b\"\"\"", (1, 8), (1, 15));
        stream.push(TokenKind::StatementEnd, "\n", (1, 15), (1, 16));
        let tokens = stream.statements(2..=3).end(4);
        let config = ClassifierConfig::new().logical(true).max_line_count(1);
        let result = classify(&tokens, &config);

        assert_eq!(result.logical_count, 1);
        assert!(!result.limit_reached);
    }

    #[test]
    fn triple_string_after_operator_is_code() {
        let tokens = Stream::default().assigned_triple_string(1).end(2);
        let result = classify(&tokens, &physical());

        assert_eq!(result.logical_count, 1);
        assert_eq!(result.physical_count, 1);
    }

    #[test]
    fn docstring_keeps_file_under_limit() {
        let tokens = Stream::default().docstring(1, 1).statements(2..=100).end(101);
        let result = classify(&tokens, &physical());

        assert_eq!(result.physical_count, 99);
        assert!(!result.limit_reached);
    }

    #[test]
    fn logical_leak_follows_statement_count() {
        let tokens = Stream::default()
            .statements(1..=100)
            .bracketed_statement(101)
            .end(103);
        let result = classify(&tokens, &logical());

        assert_eq!(result.logical_count, 101);
        assert_eq!(result.physical_count, 102);
        assert!(result.limit_reached);
        assert_eq!(result.leak_line, Some(102));
    }

    #[test]
    fn logical_mode_ignores_physical_overflow() {
        let tokens = (0..60)
            .fold(Stream::default(), |s, i| s.bracketed_statement(1 + 2 * i))
            .end(121);
        let result = classify(&tokens, &logical());

        assert_eq!(result.logical_count, 60);
        assert_eq!(result.physical_count, 120);
        assert!(!result.limit_reached);

        let result = classify(&tokens, &physical());
        assert_eq!(result.leak_line, Some(101));
    }

    #[test]
    fn logical_leak_lands_on_statement_end() {
        let mut stream = Stream::default().statements(1..=101);
        stream.push(TokenKind::Comment, "# tail", (102, 0), (102, 6));
        stream.push(TokenKind::LineBreak, "\n", (102, 6), (102, 7));
        let tokens = stream.end(103);

        let result = classify(&tokens, &logical());
        assert_eq!(result.leak_line, Some(101));
    }

    #[test]
    fn leak_line_is_latched() {
        let tokens = Stream::default().statements(1..=3).end(4);
        let config = ClassifierConfig::new().max_line_count(1);
        let result = classify(&tokens, &config);

        assert_eq!(result.leak_line, Some(2));
        assert!(result.limit_reached);
    }

    #[test]
    fn counts_do_not_depend_on_mode() {
        let tokens = Stream::default()
            .docstring(1, 3)
            .statement(4)
            .comment(5)
            .bracketed_statement(6)
            .blank(8)
            .end(9);
        let a = classify(&tokens, &physical());
        let b = classify(&tokens, &logical());

        assert_eq!(a.logical_count, b.logical_count);
        assert_eq!(a.physical_count, b.physical_count);
        assert_eq!((a.logical_count, a.physical_count), (2, 3));
    }

    #[test]
    fn classification_is_deterministic() {
        let tokens = Stream::default().statements(1..=150).end(151);
        let config = physical();
        assert_eq!(classify(&tokens, &config), classify(&tokens, &config));
    }

    #[test]
    fn zero_maximum_falls_back_to_default() {
        assert_eq!(
            ClassifierConfig::new().max_line_count(0).max_line_count,
            DEFAULT_MAX_LINE_COUNT
        );
    }

    #[test]
    fn accumulator_matches_fold() {
        let tokens = Stream::default().statements(1..=10).comment(11).end(12);
        let config = ClassifierConfig::new().max_line_count(5);

        let mut classifier = Classifier::new(&config);
        for token in &tokens {
            classifier.push(token);
        }
        assert_eq!(classifier.finish(), classify(&tokens, &config));
    }
}
