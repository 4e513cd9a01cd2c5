//! Error codes for `.api` diagnostics.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Lexer errors
//! - `E1xx` - Parser errors
//! - `E2xx` - Semantic errors (builder, resolver, validator)

use std::fmt;

/// Error codes for categorizing diagnostics.
///
/// The code doubles as the diagnostic *kind*: callers filter a diagnostic
/// list by code to find, say, every duplicate struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorCode {
    // =========================================================================
    // Lexer Errors (E0xx)
    // =========================================================================
    /// Unterminated string literal.
    ///
    /// A `"` string was opened but the line ended before it was closed.
    E001,

    /// Unexpected character.
    ///
    /// A character that starts no token of the language.
    E002,

    /// Unterminated block comment.
    ///
    /// A `/*` comment has no matching `*/`.
    E003,

    /// Unterminated raw string.
    ///
    /// A backtick tag was opened but the line ended before it was closed.
    E004,

    // =========================================================================
    // Parser Errors (E1xx)
    // =========================================================================
    /// Unexpected token.
    ///
    /// The parser found a token it did not expect at this position.
    E100,

    /// Incomplete input.
    ///
    /// The input ended, or a new declaration started, before a construct
    /// was complete. Typically a missing `}` or `)`.
    E101,

    // =========================================================================
    // Semantic Errors (E2xx)
    // =========================================================================
    /// Duplicate struct declaration.
    E200,

    /// Duplicate handler name.
    E201,

    /// Duplicate route (same method and path).
    E202,

    /// Duplicate field within one struct.
    E203,

    /// Unresolved type or handler reference.
    E204,

    /// Ambiguous reference.
    ///
    /// The referenced name is declared more than once, so the reference
    /// has no single target.
    E205,

    /// Unresolved import.
    ///
    /// The imported file does not exist or is not an `.api` file.
    E206,

    /// Invalid annotation value.
    ///
    /// A boolean annotation key holds something other than `true`/`false`.
    E207,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Lexer errors
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",
            // Parser errors
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            // Semantic errors
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            ErrorCode::E205 => "E205",
            ErrorCode::E206 => "E206",
            ErrorCode::E207 => "E207",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            // Lexer errors
            ErrorCode::E001 => "unterminated string literal",
            ErrorCode::E002 => "unexpected character",
            ErrorCode::E003 => "unterminated block comment",
            ErrorCode::E004 => "unterminated raw string",
            // Parser errors
            ErrorCode::E100 => "unexpected token",
            ErrorCode::E101 => "incomplete input",
            // Semantic errors
            ErrorCode::E200 => "duplicate struct",
            ErrorCode::E201 => "duplicate handler",
            ErrorCode::E202 => "duplicate route",
            ErrorCode::E203 => "duplicate field",
            ErrorCode::E204 => "unresolved reference",
            ErrorCode::E205 => "ambiguous reference",
            ErrorCode::E206 => "unresolved import",
            ErrorCode::E207 => "invalid annotation value",
        }
    }

    /// Returns `true` for codes produced by the lexer or the parser.
    pub fn is_syntax(&self) -> bool {
        matches!(
            self,
            ErrorCode::E001
                | ErrorCode::E002
                | ErrorCode::E003
                | ErrorCode::E004
                | ErrorCode::E100
                | ErrorCode::E101
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
