//! Syntax errors for the backend query dialect.
//!
//! Both the lexer and the parser report a [`SyntaxError`] positioned by byte offset. The
//! public [`parse`](crate::parse) entry point wraps it in a [`QueryError`] that keeps the
//! query, so a mistyped analyst query can be shown back with a pointer under the problem.

use std::{error::Error, fmt};

/// A tokenizing or parsing failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SyntaxError {
    /// What went wrong.
    pub message: String,
    /// Byte offset of the offending input, `None` at end of input.
    pub position: Option<usize>,
}

impl SyntaxError {
    /// An error at a byte offset.
    pub fn at(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position: Some(position),
        }
    }

    /// An error at the end of the input.
    pub fn at_end(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
        }
    }
}

/// A query that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    /// The underlying syntax error.
    pub error: SyntaxError,
    /// The query as typed.
    pub query: String,
}

/// Hints keyed by a fragment of the error message.
const HINTS: &[(&str, &str)] = &[
    ("unclosed quote", "Add a closing quote (\") to complete the phrase"),
    (
        "unclosed range",
        "Ranges look like field:[low TO high]; use * for an open end",
    ),
    ("trailing backslash", "Escape a literal backslash as \\\\"),
    (
        "closing parenthesis",
        "Add a closing parenthesis ) to match the opening one",
    ),
    (
        "unexpected OR",
        "OR needs a clause on both sides, e.g. 'source\\:type:bro OR source\\:type:snort'",
    ),
    (
        "range must follow",
        "Ranges must follow a field, e.g. 'timestamp:[0 TO *]'",
    ),
];

impl QueryError {
    /// Attaches the query a syntax error was found in.
    pub fn new(error: SyntaxError, query: impl Into<String>) -> Self {
        Self {
            error,
            query: query.into(),
        }
    }

    /// The error message without the query or pointer.
    pub fn message(&self) -> &str {
        &self.error.message
    }

    /// Byte offset of the error, if known.
    pub fn position(&self) -> Option<usize> {
        self.error.position
    }

    /// A fix for common mistakes.
    pub fn suggestion(&self) -> Option<&'static str> {
        HINTS
            .iter()
            .find(|(fragment, _)| self.message().contains(fragment))
            .map(|(_, hint)| *hint)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "query syntax error: {}", self.message())?;
        writeln!(f, "  {}", self.query)?;
        let pointer = self.position().unwrap_or(self.query.len()).min(self.query.len());
        write!(f, "  {}^", " ".repeat(pointer))?;
        if let Some(hint) = self.suggestion() {
            write!(f, "\nhint: {hint}")?;
        }
        Ok(())
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_query_with_pointer_and_hint() {
        let err = QueryError::new(SyntaxError::at("unclosed quote", 12), "ip_src_addr:\"10.0");
        let display = err.to_string();

        assert!(display.starts_with("query syntax error: unclosed quote"));
        assert!(display.contains("  ip_src_addr:\"10.0\n"));
        assert!(display.contains(&format!("  {}^", " ".repeat(12))));
        assert!(display.ends_with("hint: Add a closing quote (\") to complete the phrase"));
    }

    #[test]
    fn end_of_input_points_past_the_query() {
        let err = QueryError::new(SyntaxError::at_end("unexpected end of query"), "bro AND");
        assert!(err.to_string().contains(&format!("  {}^", " ".repeat(7))));
        assert_eq!(err.position(), None);
    }

    #[test]
    fn position_is_clamped_to_query() {
        let err = QueryError::new(SyntaxError::at("unexpected token", 100), "a:");
        assert!(err.to_string().contains("    ^"));
    }

    #[test]
    fn unknown_messages_have_no_hint() {
        let err = QueryError::new(SyntaxError::at("something odd", 0), "x");
        assert_eq!(err.suggestion(), None);
        assert!(!err.to_string().contains("hint:"));
    }

    #[test]
    fn source_is_the_syntax_error() {
        let err = QueryError::new(SyntaxError::at("unexpected OR", 8), "bro AND OR snort");
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("unexpected OR"));
        assert!(err.suggestion().is_some_and(|h| h.contains("both sides")));
    }
}
