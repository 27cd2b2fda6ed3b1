//! Python tokenizer producing the classifier's token stream.
//!
//! Follows the line structure of CPython's `tokenize` module: a newline ends
//! a statement only outside brackets and after some code, a backslash joins
//! physical lines, and the stream always ends with an end marker placed on
//! the line after the last one.
//!
//! Indentation changes become zero-width [`TokenKind::Other`] tokens, like
//! CPython's INDENT and DEDENT. They never change a count but they do take
//! part in the limit check, so they decide which line a leak is blamed on.

use miette::{Diagnostic, SourceSpan};

use crate::token::{Position, Token, TokenKind};

/// Errors raised while lexing Python source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
pub enum TokenizeError {
    /// A single-quoted string runs into a line end or the end of input.
    #[error("unterminated string literal at {line}:{column}")]
    #[diagnostic(
        code(lineleak::tokenize::unterminated_string),
        help("close the string, or end the line with a backslash to continue it")
    )]
    UnterminatedString {
        /// Line of the opening quote.
        line: u32,
        /// Column of the opening quote.
        column: u32,
        /// Span of the literal's start.
        #[label("string starts here")]
        span: SourceSpan,
    },

    /// End of input inside a triple-quoted string.
    #[error("EOF in triple-quoted string starting at {line}:{column}")]
    #[diagnostic(code(lineleak::tokenize::unterminated_triple_quote))]
    UnterminatedTripleQuote {
        /// Line of the opening quotes.
        line: u32,
        /// Column of the opening quotes.
        column: u32,
        /// Span of the literal's start.
        #[label("string starts here")]
        span: SourceSpan,
    },

    /// End of input with a bracket still open.
    #[error("EOF in multi-line statement: '{bracket}' opened at {line}:{column} is never closed")]
    #[diagnostic(code(lineleak::tokenize::unclosed_bracket))]
    UnclosedBracket {
        /// The opening bracket.
        bracket: char,
        /// Line of the opening bracket.
        line: u32,
        /// Column of the opening bracket.
        column: u32,
        /// Span of the opening bracket.
        #[label("opened here")]
        span: SourceSpan,
    },

    /// A closing bracket without a matching opener.
    #[error("unmatched '{bracket}' at {line}:{column}")]
    #[diagnostic(code(lineleak::tokenize::unmatched_bracket))]
    UnmatchedBracket {
        /// The closing bracket.
        bracket: char,
        /// Line of the closing bracket.
        line: u32,
        /// Column of the closing bracket.
        column: u32,
        /// Span of the closing bracket.
        #[label("no matching opener")]
        span: SourceSpan,
    },

    /// A dedent to a width no enclosing block uses.
    #[error("unindent does not match any outer indentation level at {line}:{column}")]
    #[diagnostic(code(lineleak::tokenize::inconsistent_dedent))]
    InconsistentDedent {
        /// Line of the dedented statement.
        line: u32,
        /// Column of its first character.
        column: u32,
        /// Span of the line's indentation.
        #[label("dedented here")]
        span: SourceSpan,
    },

    /// A backslash continuation with nothing after it.
    #[error("EOF in multi-line statement: line continuation at {line}:{column}")]
    #[diagnostic(code(lineleak::tokenize::dangling_continuation))]
    DanglingContinuation {
        /// Line of the backslash.
        line: u32,
        /// Column of the backslash.
        column: u32,
        /// Span of the backslash.
        #[label("continues into end of file")]
        span: SourceSpan,
    },
}

impl TokenizeError {
    /// Position the error points at.
    #[must_use]
    pub fn position(&self) -> Position {
        match self {
            Self::UnterminatedString { line, column, .. }
            | Self::UnterminatedTripleQuote { line, column, .. }
            | Self::UnclosedBracket { line, column, .. }
            | Self::UnmatchedBracket { line, column, .. }
            | Self::InconsistentDedent { line, column, .. }
            | Self::DanglingContinuation { line, column, .. } => Position::new(*line, *column),
        }
    }
}

/// Operators and delimiters, longest first.
const THREE_CHAR_OPS: &[&str] = &["**=", "//=", ">>=", "<<=", "..."];

const TWO_CHAR_OPS: &[&str] = &[
    "**", "//", ">>", "<<", "<=", ">=", "==", "!=", "->", ":=", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "@=",
];

const ONE_CHAR_OPS: &str = "+-*/%@&|^~<>()[]{},:;.=";

/// Tab stops used when measuring indentation.
const TAB_SIZE: u32 = 8;

/// Case-insensitive string prefixes.
const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

/// Lexes a complete Python source file.
///
/// # Errors
///
/// Returns a [`TokenizeError`] for unterminated strings, unbalanced
/// brackets, or a line continuation at end of input.
pub fn tokenize(source: &str) -> Result<Vec<Token>, TokenizeError> {
    Tokenizer::new(source).run()
}

/// A point in the source, as both position and byte offset.
#[derive(Debug, Clone, Copy)]
struct Mark {
    position: Position,
    offset: usize,
}

impl Mark {
    fn span(self, len: usize) -> SourceSpan {
        SourceSpan::from((self.offset, len))
    }
}

struct Tokenizer {
    chars: Vec<char>,
    index: usize,
    offset: usize,
    line: u32,
    column: u32,
    /// Open brackets, innermost last.
    brackets: Vec<(char, Mark)>,
    /// The current logical line has produced code.
    statement_has_code: bool,
    /// The current physical line has any characters.
    line_has_text: bool,
    /// Pending backslash continuation.
    continued: Option<Mark>,
    /// Next character starts a logical line.
    at_line_start: bool,
    /// Widths of the open blocks, outermost first.
    indents: Vec<u32>,
    tokens: Vec<Token>,
}

impl Tokenizer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            offset: 0,
            line: 1,
            column: 0,
            brackets: Vec::new(),
            statement_has_code: false,
            line_has_text: false,
            continued: None,
            at_line_start: true,
            indents: vec![0],
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, TokenizeError> {
        while let Some(c) = self.peek(0) {
            if self.at_line_start {
                self.at_line_start = false;
                self.indentation()?;
                continue;
            }
            match c {
                ' ' | '\t' | '\x0c' => {
                    self.bump();
                }
                '\n' | '\r' => self.newline(),
                '#' => self.comment(),
                '\\' => self.backslash()?,
                '"' | '\'' => {
                    let start = self.mark();
                    self.string(start, String::new())?;
                }
                '.' if self.peek(1).is_some_and(|n| n.is_ascii_digit()) => self.number(),
                c if c.is_ascii_digit() => self.number(),
                c if is_identifier_start(c) => self.name_or_prefixed_string()?,
                _ => self.operator()?,
            }
        }
        self.finish()
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.index + ahead).copied()
    }

    fn mark(&self) -> Mark {
        Mark {
            position: Position::new(self.line, self.column),
            offset: self.offset,
        }
    }

    /// Consumes one character that is not a line break.
    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.index += 1;
        self.offset += c.len_utf8();
        self.column += 1;
        self.line_has_text = true;
        Some(c)
    }

    fn bump_into(&mut self, text: &mut String) {
        if let Some(c) = self.bump() {
            text.push(c);
        }
    }

    /// Consumes `\n`, `\r\n` or a lone `\r` and moves to the next line.
    fn bump_newline(&mut self) -> &'static str {
        let text = match (self.peek(0), self.peek(1)) {
            (Some('\r'), Some('\n')) => "\r\n",
            (Some('\r'), _) => "\r",
            _ => "\n",
        };
        self.index += text.len();
        self.offset += text.len();
        self.line += 1;
        self.column = 0;
        self.line_has_text = false;
        text
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>, start: Position) {
        let end = Position::new(self.line, self.column);
        self.push_with_end(kind, text, start, end);
    }

    fn push_with_end(
        &mut self,
        kind: TokenKind,
        text: impl Into<String>,
        start: Position,
        end: Position,
    ) {
        if !matches!(
            kind,
            TokenKind::Comment | TokenKind::LineBreak | TokenKind::StatementEnd
        ) {
            self.statement_has_code = true;
        }
        self.continued = None;
        self.tokens.push(Token::new(kind, text, start, end));
    }

    fn newline(&mut self) {
        let start = self.mark().position;
        let text = self.bump_newline();
        let kind = if self.brackets.is_empty() && self.statement_has_code {
            self.statement_has_code = false;
            TokenKind::StatementEnd
        } else {
            TokenKind::LineBreak
        };
        let width = if text == "\r\n" { 2 } else { 1 };
        let end = Position::new(start.line, start.column + width);
        self.push_with_end(kind, text, start, end);
        self.at_line_start = self.brackets.is_empty();
    }

    /// Measures the leading whitespace of a logical line and opens or
    /// closes blocks. Blank and comment-only lines leave the stack alone.
    fn indentation(&mut self) -> Result<(), TokenizeError> {
        let line_start = self.mark();
        let mut width = 0;
        while let Some(c) = self.peek(0) {
            match c {
                ' ' => width += 1,
                '\t' => width = (width / TAB_SIZE + 1) * TAB_SIZE,
                '\x0c' => width = 0,
                _ => break,
            }
            self.bump();
        }
        if matches!(self.peek(0), None | Some('#' | '\n' | '\r')) {
            return Ok(());
        }

        let here = self.mark();
        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            self.push_marker(Position::new(here.position.line, 0), here.position);
            return Ok(());
        }
        while self.indents.last().is_some_and(|&open| width < open) {
            self.indents.pop();
            self.push_marker(here.position, here.position);
        }
        if self.indents.last() != Some(&width) {
            return Err(TokenizeError::InconsistentDedent {
                line: here.position.line,
                column: here.position.column,
                span: line_start.span(here.offset - line_start.offset),
            });
        }
        Ok(())
    }

    /// Zero-width token standing for an indent or dedent.
    fn push_marker(&mut self, start: Position, end: Position) {
        self.tokens
            .push(Token::new(TokenKind::Other, String::new(), start, end));
    }

    fn comment(&mut self) {
        let start = self.mark().position;
        let mut text = String::new();
        while let Some(c) = self.peek(0) {
            if c == '\n' || c == '\r' {
                break;
            }
            self.bump_into(&mut text);
        }
        self.push(TokenKind::Comment, text, start);
    }

    fn backslash(&mut self) -> Result<(), TokenizeError> {
        let start = self.mark();
        match self.peek(1) {
            Some('\n' | '\r') => {
                self.bump();
                self.bump_newline();
                self.continued = Some(start);
            }
            None => {
                return Err(TokenizeError::DanglingContinuation {
                    line: start.position.line,
                    column: start.position.column,
                    span: start.span(1),
                });
            }
            Some(_) => {
                self.bump();
                self.push(TokenKind::Other, "\\", start.position);
            }
        }
        Ok(())
    }

    /// Lexes a string literal whose opening quote is the next character.
    /// `text` already holds any prefix, which started at `start`.
    fn string(&mut self, start: Mark, mut text: String) -> Result<(), TokenizeError> {
        let Some(quote) = self.bump() else {
            return Ok(());
        };
        text.push(quote);

        let triple = self.peek(0) == Some(quote) && self.peek(1) == Some(quote);
        if triple {
            self.bump_into(&mut text);
            self.bump_into(&mut text);
        }

        let opener_len = self.offset - start.offset;
        let unterminated = move || {
            let (line, column) = (start.position.line, start.position.column);
            let span = start.span(opener_len);
            if triple {
                TokenizeError::UnterminatedTripleQuote { line, column, span }
            } else {
                TokenizeError::UnterminatedString { line, column, span }
            }
        };

        loop {
            match self.peek(0) {
                None => return Err(unterminated()),
                Some('\\') => {
                    self.bump_into(&mut text);
                    match self.peek(0) {
                        Some('\n' | '\r') => text.push_str(self.bump_newline()),
                        Some(_) => self.bump_into(&mut text),
                        None => {}
                    }
                }
                Some('\n' | '\r') if triple => text.push_str(self.bump_newline()),
                Some('\n' | '\r') => return Err(unterminated()),
                Some(c) if c == quote => {
                    if !triple {
                        self.bump_into(&mut text);
                        break;
                    }
                    if self.peek(1) == Some(quote) && self.peek(2) == Some(quote) {
                        for _ in 0..3 {
                            self.bump_into(&mut text);
                        }
                        break;
                    }
                    self.bump_into(&mut text);
                }
                Some(_) => self.bump_into(&mut text),
            }
        }

        self.push(TokenKind::String, text, start.position);
        Ok(())
    }

    fn number(&mut self) {
        let start = self.mark().position;
        let mut text = String::new();
        loop {
            match self.peek(0) {
                Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '.' => {
                    self.bump_into(&mut text);
                }
                Some('+' | '-')
                    if text.ends_with(|c| c == 'e' || c == 'E')
                        && !is_hex_literal(&text)
                        && self.peek(1).is_some_and(|c| c.is_ascii_digit()) =>
                {
                    self.bump_into(&mut text);
                }
                _ => break,
            }
        }
        self.push(TokenKind::Other, text, start);
    }

    fn name_or_prefixed_string(&mut self) -> Result<(), TokenizeError> {
        let start = self.mark();
        let mut word = String::new();
        while let Some(c) = self.peek(0) {
            if !is_identifier_continue(c) {
                break;
            }
            self.bump_into(&mut word);
        }

        if matches!(self.peek(0), Some('"' | '\'')) && is_string_prefix(&word) {
            return self.string(start, word);
        }

        self.push(TokenKind::Other, word, start.position);
        Ok(())
    }

    fn operator(&mut self) -> Result<(), TokenizeError> {
        let start = self.mark();

        for (width, table) in [(3, THREE_CHAR_OPS), (2, TWO_CHAR_OPS)] {
            let candidate = self.lookahead(width);
            if table.contains(&candidate.as_str()) {
                for _ in 0..width {
                    self.bump();
                }
                self.push(TokenKind::Operator, candidate, start.position);
                return Ok(());
            }
        }

        let Some(c) = self.bump() else {
            return Ok(());
        };
        match c {
            '(' | '[' | '{' => self.brackets.push((c, start)),
            ')' | ']' | '}' => match self.brackets.pop() {
                Some((open, _)) if closer_for(open) == c => {}
                _ => {
                    return Err(TokenizeError::UnmatchedBracket {
                        bracket: c,
                        line: start.position.line,
                        column: start.position.column,
                        span: start.span(1),
                    });
                }
            },
            _ => {}
        }

        let kind = if ONE_CHAR_OPS.contains(c) {
            TokenKind::Operator
        } else {
            TokenKind::Other
        };
        self.push(kind, c, start.position);
        Ok(())
    }

    fn lookahead(&self, width: usize) -> String {
        self.chars
            .iter()
            .skip(self.index)
            .take(width)
            .collect()
    }

    fn finish(mut self) -> Result<Vec<Token>, TokenizeError> {
        if let Some(&(bracket, mark)) = self.brackets.last() {
            return Err(TokenizeError::UnclosedBracket {
                bracket,
                line: mark.position.line,
                column: mark.position.column,
                span: mark.span(1),
            });
        }
        if let Some(mark) = self.continued {
            return Err(TokenizeError::DanglingContinuation {
                line: mark.position.line,
                column: mark.position.column,
                span: mark.span(1),
            });
        }

        // Last line without a trailing newline still gets terminated.
        if self.line_has_text {
            let start = self.mark().position;
            let kind = if self.statement_has_code {
                TokenKind::StatementEnd
            } else {
                TokenKind::LineBreak
            };
            let end = Position::new(start.line, start.column + 1);
            self.push_with_end(kind, "", start, end);
            self.line += 1;
            self.column = 0;
        }

        let end = Position::new(self.line, 0);
        for _ in 1..self.indents.len() {
            self.push_marker(end, end);
        }
        self.push_with_end(TokenKind::EndMarker, "", end, end);
        Ok(self.tokens)
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_identifier_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn is_string_prefix(word: &str) -> bool {
    STRING_PREFIXES
        .iter()
        .any(|prefix| prefix.eq_ignore_ascii_case(word))
}

fn is_hex_literal(text: &str) -> bool {
    text.starts_with("0x") || text.starts_with("0X")
}

fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}
