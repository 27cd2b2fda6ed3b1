//! Rule trait for defining per-file checks.

use crate::context::FileContext;
use crate::token::Token;
use crate::types::{Severity, Violation};

/// A per-file rule working on the token stream of one source file.
///
/// Rules are shared across worker threads and must keep any per-file state
/// local to [`Rule::check`].
///
/// # Example
///
/// ```
/// use lineleak_core::{FileContext, Location, Rule, Severity, Token, TokenKind, Violation};
///
/// pub struct NoSemicolons;
///
/// impl Rule for NoSemicolons {
///     fn name(&self) -> &'static str { "no-semicolons" }
///     fn code(&self) -> &'static str { "LLX001" }
///
///     fn check(&self, ctx: &FileContext, tokens: &[Token]) -> Vec<Violation> {
///         tokens
///             .iter()
///             .filter(|t| t.kind == TokenKind::Operator && t.text == ";")
///             .map(|t| {
///                 Violation::new(
///                     self.code(),
///                     self.name(),
///                     self.default_severity(),
///                     Location::new(ctx.relative_path.clone(), t.start.line as usize, 1),
///                     "semicolon",
///                 )
///             })
///             .collect()
///     }
/// }
/// ```
pub trait Rule: Send + Sync {
    /// Returns the kebab-case name of this rule (e.g., "lineleak").
    fn name(&self) -> &'static str;

    /// Returns the rule code prefix (e.g., "LL").
    fn code(&self) -> &'static str;

    /// Returns a brief description of what this rule checks.
    fn description(&self) -> &'static str {
        ""
    }

    /// Returns the default severity for findings from this rule.
    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    /// Checks a single file and returns any findings.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Context about the file being checked
    /// * `tokens` - The complete token stream of the file
    fn check(&self, ctx: &FileContext, tokens: &[Token]) -> Vec<Violation>;
}

/// Type alias for boxed Rule trait objects.
pub type RuleBox = Box<dyn Rule>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;
    use std::path::Path;

    struct TokenCount;

    impl Rule for TokenCount {
        fn name(&self) -> &'static str {
            "token-count"
        }
        fn code(&self) -> &'static str {
            "TEST001"
        }

        fn check(&self, ctx: &FileContext, tokens: &[Token]) -> Vec<Violation> {
            vec![Violation::new(
                self.code(),
                self.name(),
                self.default_severity(),
                Location::new(ctx.relative_path.clone(), 1, 1),
                format!("{} tokens", tokens.len()),
            )]
        }
    }

    #[test]
    fn test_rule_trait() {
        let rule = TokenCount;
        assert_eq!(rule.name(), "token-count");
        assert_eq!(rule.description(), "");
        assert_eq!(rule.default_severity(), Severity::Warning);

        let tokens = crate::tokenize("x = 1\n").unwrap();
        let ctx = FileContext::new(Path::new("a.py"), "x = 1\n", Path::new("."));
        let violations = rule.check(&ctx, &tokens);
        assert_eq!(violations[0].message, "5 tokens");
    }
}
