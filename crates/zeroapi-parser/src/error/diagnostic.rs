//! The core diagnostic type.
//!
//! A [`Diagnostic`] is the `(kind, message, span)` triple every phase
//! reports, enriched with severity, extra labels and help text.

use std::fmt;

use crate::{
    error::{Severity, error_code::ErrorCode, label::Label},
    span::Span,
};

/// A problem found in an `.api` source file.
///
/// Diagnostics are plain values: they are collected, sorted and returned,
/// never thrown. The error code is the diagnostic kind, the primary label
/// carries the span to underline.
///
/// # Example
///
/// ```text
/// error[E204]: cannot resolve `Bar`
///   --> demo.api:2:10
///    |
///  2 |   Friend Bar
///    |          ^^^ no struct named `Bar`
///    |
///    = help: declare `type Bar {}` or import the file that declares it
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    severity: Severity,
    code: Option<ErrorCode>,
    message: String,
    labels: Vec<Label>,
    help: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    ///
    /// # Example
    ///
    /// ```
    /// # use zeroapi_parser::error::{Diagnostic, ErrorCode};
    /// # use zeroapi_parser::Span;
    ///
    /// let diag = Diagnostic::error("cannot resolve `Foo`")
    ///     .with_code(ErrorCode::E204)
    ///     .with_label(Span::new(0..3), "not found")
    ///     .with_help("did you mean `Bar`?");
    /// assert_eq!(diag.span(), Span::new(0..3));
    /// ```
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Get the severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Get the error code, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    /// Get the primary message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get all labels attached to this diagnostic.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// The span of the first primary label.
    ///
    /// Falls back to the first label of any kind, then to an empty span at
    /// offset 0 for diagnostics that carry no location.
    pub fn span(&self) -> Span {
        self.labels
            .iter()
            .find(|label| label.is_primary())
            .or_else(|| self.labels.first())
            .map(Label::span)
            .unwrap_or_default()
    }

    /// Get the help text, if any.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Set the error code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Add a primary label to this diagnostic.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(span, message));
        self
    }

    /// Add a secondary label to this diagnostic.
    pub fn with_secondary_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(span, message));
        self
    }

    /// Set the help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            help: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: "error[E001]: message" or "error: message"
        write!(f, "{}", self.severity)?;
        if let Some(code) = self.code {
            write!(f, "[{}]", code)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for Diagnostic {}
