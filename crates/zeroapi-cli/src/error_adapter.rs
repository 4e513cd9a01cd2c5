//! Error adapter for rendering zeroapi diagnostics with miette.
//!
//! This module bridges the parser's [`Diagnostic`] type and the CLI's
//! error types to miette's graphical report handler. Every diagnostic is
//! rendered on its own, with all of its labels.

use std::fmt;

use miette::{
    Diagnostic as MietteDiagnostic, GraphicalReportHandler, LabeledSpan, Severity as MietteSeverity,
    SourceSpan,
};

use zeroapi::ZeroApiError;
use zeroapi_parser::{Diagnostic, Severity, Span};

use crate::CliError;

/// Adapter for a single diagnostic and the source it points into.
pub struct DiagnosticAdapter<'a> {
    diag: &'a Diagnostic,
    src: &'a str,
}

impl<'a> DiagnosticAdapter<'a> {
    pub fn new(diag: &'a Diagnostic, src: &'a str) -> Self {
        Self { diag, src }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.diag.message())
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .code()
            .map(|c| Box::new(c) as Box<dyn fmt::Display>)
    }

    fn severity(&self) -> Option<MietteSeverity> {
        Some(match self.diag.severity() {
            Severity::Error => MietteSeverity::Error,
            Severity::Warning => MietteSeverity::Warning,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = self.diag.labels();
        if labels.is_empty() {
            return None;
        }

        Some(Box::new(labels.iter().map(|label| {
            let span = span_to_miette(label.span());
            let message = Some(label.message().to_string());
            if label.is_primary() {
                LabeledSpan::new_primary_with_span(message, span)
            } else {
                LabeledSpan::new_with_span(message, span)
            }
        })))
    }
}

/// Adapter for errors without source locations.
pub struct ErrorAdapter<'a>(pub &'a CliError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(self.0)
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self.0 {
            CliError::ZeroApi(ZeroApiError::Io { .. }) => "zeroapi::io",
            CliError::ZeroApi(ZeroApiError::Check { .. }) => return None,
            CliError::Config(_) => "zeroapi::config",
            CliError::CheckFailed { .. } => "zeroapi::check",
            CliError::Output(_) => "zeroapi::output",
        };
        Some(Box::new(code))
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A rich diagnostic with source location information.
    Diagnostic(DiagnosticAdapter<'a>),
    /// A simple error without source location.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn severity(&self) -> Option<MietteSeverity> {
        match self {
            Reportable::Diagnostic(d) => d.severity(),
            Reportable::Error(e) => e.severity(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Diagnostic(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

/// Convert a [`CliError`] into a list of reportable errors.
///
/// A failed check yields one [`Reportable`] per diagnostic; every other
/// error yields a single one.
pub fn to_reportables(err: &CliError) -> Vec<Reportable<'_>> {
    match err {
        CliError::ZeroApi(ZeroApiError::Check { err, src, .. }) => err
            .diagnostics()
            .iter()
            .map(|d| Reportable::Diagnostic(DiagnosticAdapter::new(d, src)))
            .collect(),
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}

/// Render one report into a string.
pub fn render(handler: &GraphicalReportHandler, report: &dyn MietteDiagnostic) -> String {
    let mut out = String::new();
    if handler.render_report(&mut out, report).is_err() {
        // fall back to the one-line form
        out = format!("{report}\n");
    }
    out
}

/// Render one diagnostic against `src` into a string.
pub fn render_diagnostic(handler: &GraphicalReportHandler, diag: &Diagnostic, src: &str) -> String {
    render(handler, &DiagnosticAdapter::new(diag, src))
}

/// Convert a zeroapi [`Span`] to a miette [`SourceSpan`].
fn span_to_miette(span: Span) -> SourceSpan {
    SourceSpan::new(span.start().into(), span.len())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use miette::GraphicalTheme;
    use zeroapi_parser::{ErrorCode, error::ParseError};

    use super::*;

    fn plain_handler() -> GraphicalReportHandler {
        GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor())
    }

    #[test]
    fn test_check_error_yields_one_reportable_per_diagnostic() {
        let diags = vec![
            Diagnostic::error("duplicate struct `A`")
                .with_code(ErrorCode::E200)
                .with_label(Span::new(5..6), "struct declared here"),
            Diagnostic::warning("`signature` expects `true` or `false`, found `yes`")
                .with_code(ErrorCode::E207)
                .with_label(Span::new(10..13), "not a boolean"),
        ];
        let err = CliError::ZeroApi(ZeroApiError::new_check_error(
            ParseError::from(diags),
            "type A {}\nyes",
            "a.api",
        ));

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 2);
        assert_eq!(reportables[0].to_string(), "duplicate struct `A`");
        assert_eq!(reportables[1].severity(), Some(MietteSeverity::Warning));
    }

    #[test]
    fn test_plain_error() {
        let err = CliError::Config(crate::config::ConfigError::MissingFile(PathBuf::from(
            "x.toml",
        )));
        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);
        assert_eq!(
            reportables[0].code().map(|code| code.to_string()).as_deref(),
            Some("zeroapi::config")
        );
    }

    #[test]
    fn test_labels_keep_primary_flag() {
        let diag = Diagnostic::error("duplicate field `Name`")
            .with_label(Span::new(0..4), "field declared here")
            .with_secondary_label(Span::new(10..14), "also declared here");
        let adapter = DiagnosticAdapter::new(&diag, "Name x\n   Name y");

        let labels: Vec<_> = adapter.labels().expect("labels").collect();
        assert_eq!(labels.len(), 2);
        assert!(labels[0].primary());
        assert!(!labels[1].primary());
    }

    #[test]
    fn test_failed_check_renders_through_reportables() {
        let analyzer = zeroapi::Analyzer::default();
        let report = analyzer.check_document(analyzer.parse_source("type A {}\ntype A {}\n", "dup.api"));
        let err = CliError::from(report.into_result().expect_err("duplicate struct"));

        let rendered: Vec<_> = to_reportables(&err)
            .iter()
            .map(|reportable| render(&plain_handler(), reportable))
            .collect();
        assert_eq!(rendered.len(), 2);
        assert!(rendered.iter().all(|text| text.contains("E200")));
    }

    #[test]
    fn test_render_contains_code_and_label() {
        let diag = Diagnostic::error("unknown type `Usr`")
            .with_code(ErrorCode::E204)
            .with_label(Span::new(11..14), "not declared");
        let rendered = render_diagnostic(&plain_handler(), &diag, "type A {\n  Usr\n}\n");
        assert!(rendered.contains("E204"));
        assert!(rendered.contains("not declared"));
    }
}
