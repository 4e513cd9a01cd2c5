//! Labeled source spans for diagnostic messages.

use crate::span::Span;

/// A message attached to a span of the `.api` source.
///
/// A diagnostic usually carries one primary label (the offending node) and
/// any number of secondary labels, for example the other declarations of a
/// duplicated name:
///
/// ```text
/// error[E200]: duplicate struct `User`
///   --> demo.api:1:6
///    |
///  1 | type User { Name string }
///    |      ^^^^ declared here
///  2 | type User { Id int }
///    |      ---- also declared here
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    span: Span,
    message: String,
    is_primary: bool,
}

impl Label {
    /// Create a new primary label.
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            is_primary: true,
        }
    }

    /// Create a new secondary label.
    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            is_primary: false,
        }
    }

    /// Get the span this label applies to.
    pub fn span(&self) -> Span {
        self.span
    }

    /// Get the label message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check if this is a primary label.
    pub fn is_primary(&self) -> bool {
        self.is_primary
    }
}
