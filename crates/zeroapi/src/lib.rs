//! zeroapi - analysis of go-zero `.api` service descriptions.
//!
//! This crate wraps [`zeroapi_parser`] with what hosts need around it:
//! reading files, configuration, check reports that decide pass or fail,
//! symbol listings and goto-declaration.

pub mod config;

mod error;
mod naming;

pub use zeroapi_parser::{self as parser, DeclKind, Diagnostic, Document, NodeId, Span};

pub use error::ZeroApiError;
pub use naming::NamingStyle;

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use log::{debug, info};

use zeroapi_parser::{NodeKind, Resolution, Resolver, error::ParseError};

use config::AppConfig;

/// Kinds of symbols listed by [`Analyzer::symbols`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Struct,
    Handler,
    Route,
    Import,
    Service,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 5] = [
        SymbolKind::Import,
        SymbolKind::Struct,
        SymbolKind::Service,
        SymbolKind::Route,
        SymbolKind::Handler,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Struct => "struct",
            SymbolKind::Handler => "handler",
            SymbolKind::Route => "route",
            SymbolKind::Import => "import",
            SymbolKind::Service => "service",
        }
    }

    fn decl_kind(self) -> Option<DeclKind> {
        match self {
            SymbolKind::Struct => Some(DeclKind::Struct),
            SymbolKind::Handler => Some(DeclKind::Handler),
            SymbolKind::Route => Some(DeclKind::Route),
            SymbolKind::Import => Some(DeclKind::Import),
            SymbolKind::Service => None,
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declaration listed by [`Analyzer::symbols`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub span: Span,
    pub line: usize,
    pub column: usize,
    /// For handlers, the stem of the generated logic file.
    pub file_stem: Option<String>,
}

/// A position in some file, 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: PathBuf,
    pub span: Span,
    pub line: usize,
    pub column: usize,
}

impl Location {
    fn new(document: &Document, span: Span) -> Self {
        let (line, column) = document.line_col(span.start());
        Self {
            path: document.path().to_path_buf(),
            span,
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path.display(), self.line, self.column)
    }
}

/// Outcome of checking one file.
#[derive(Debug)]
pub struct CheckReport {
    document: Document,
    diagnostics: Vec<Diagnostic>,
    deny_warnings: bool,
}

impl CheckReport {
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Every diagnostic of the file, ordered by position.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity().is_error())
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.len() - self.error_count()
    }

    /// `false` on any error, or on any warning when warnings are denied.
    pub fn passed(&self) -> bool {
        self.error_count() == 0 && !(self.deny_warnings && self.warning_count() > 0)
    }

    /// `Err` with every diagnostic and the source when the check failed.
    pub fn into_result(self) -> Result<Self, ZeroApiError> {
        if self.passed() {
            return Ok(self);
        }
        Err(ZeroApiError::new_check_error(
            ParseError::new(self.diagnostics),
            self.document.source(),
            self.document.path(),
        ))
    }
}

/// Entry point for hosts: loads, checks and queries `.api` files.
///
/// # Examples
///
/// ```
/// use zeroapi::{Analyzer, DeclKind, SymbolKind, config::AppConfig};
///
/// let analyzer = Analyzer::new(AppConfig::default());
/// let document = analyzer.parse_source("type User {}\n", "user.api");
/// let symbols = analyzer.symbols(&document, Some(SymbolKind::Struct));
/// assert_eq!(symbols[0].name, "User");
/// ```
#[derive(Debug, Default)]
pub struct Analyzer {
    config: AppConfig,
}

impl Analyzer {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Read and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ZeroApiError::Io`] if the file cannot be read. Syntax
    /// problems are not errors here; they are in the document's diagnostics.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Document, ZeroApiError> {
        let path = path.as_ref();
        info!(path:% = path.display(); "Loading file");

        let source = fs::read_to_string(path).map_err(|source| ZeroApiError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.parse_source(&source, path))
    }

    /// Parse in-memory source, as an editor would for an unsaved buffer.
    pub fn parse_source(&self, source: &str, path: impl AsRef<Path>) -> Document {
        zeroapi_parser::parse(source, path)
    }

    /// Load, parse and validate the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ZeroApiError::Io`] if the file cannot be read. A file with
    /// errors still yields a report; use [`CheckReport::passed`] or
    /// [`CheckReport::into_result`] to decide.
    pub fn check(&self, path: impl AsRef<Path>) -> Result<CheckReport, ZeroApiError> {
        let document = self.load(path)?;
        Ok(self.check_document(document))
    }

    /// Validate an already parsed document.
    pub fn check_document(&self, document: Document) -> CheckReport {
        let diagnostics = zeroapi_parser::validate(&document);
        let report = CheckReport {
            document,
            diagnostics,
            deny_warnings: self.config.check().deny_warnings(),
        };
        info!(
            path:% = report.document.path().display(),
            errors = report.error_count(),
            warnings = report.warning_count();
            "Checked file"
        );
        report
    }

    /// Declarations of `document`, all kinds when `kind` is `None`.
    pub fn symbols(&self, document: &Document, kind: Option<SymbolKind>) -> Vec<Symbol> {
        let kinds = match kind {
            Some(kind) => vec![kind],
            None => SymbolKind::ALL.to_vec(),
        };

        let mut symbols: Vec<Symbol> = kinds
            .into_iter()
            .flat_map(|kind| {
                let ids = match kind.decl_kind() {
                    Some(decl_kind) => document.declarations_of_kind(decl_kind),
                    None => document.services(),
                };
                ids.into_iter()
                    .filter_map(move |id| self.symbol(document, id, kind))
            })
            .collect();
        symbols.sort_by_key(|symbol| symbol.span.start());
        symbols
    }

    fn symbol(&self, document: &Document, id: NodeId, kind: SymbolKind) -> Option<Symbol> {
        let node = document.node(id);
        let (name, span) = match node.kind() {
            NodeKind::Route(route) => (route.key(), route.method.span().union(route.path.span())),
            other => {
                let name = other.name()?;
                (name.inner().clone(), name.span())
            }
        };

        let file_stem = matches!(kind, SymbolKind::Handler).then(|| {
            let stem = name.strip_suffix("Handler").unwrap_or(&name);
            self.config.gen_config().style().format(stem)
        });
        let (line, column) = document.line_col(span.start());

        Some(Symbol {
            name,
            kind,
            span,
            line,
            column,
            file_stem,
        })
    }

    /// The declaration referred to at byte `offset`, reading imports from disk.
    ///
    /// Type references jump to their struct and import paths to the start
    /// of the imported file. Ambiguous and unresolved references yield
    /// `None`.
    pub fn goto(&self, document: &Document, offset: usize) -> Option<Location> {
        let reference = document.reference_at(offset)?;
        let mut resolver = Resolver::new(document);

        match resolver.resolve(reference) {
            Resolution::Resolved(target) => {
                let target_document = target.document(document);
                let span = match target.node() {
                    Some(node) => target_document
                        .node(node)
                        .kind()
                        .name()
                        .map_or(target_document.node(node).span(), |name| name.span()),
                    None => Span::empty(0),
                };
                Some(Location::new(target_document, span))
            }
            Resolution::Ambiguous(targets) => {
                debug!(candidates = targets.len(), offset; "Ambiguous goto target");
                None
            }
            Resolution::Unresolved => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CheckConfig, GenConfig};

    const SOURCE: &str = "type User {}\nservice a {\n  @handler GetUserHandler\n  get /user returns (User)\n}\n";

    #[test]
    fn test_symbols_in_source_order() {
        let analyzer = Analyzer::default();
        let document = analyzer.parse_source(SOURCE, "a.api");
        let symbols = analyzer.symbols(&document, None);
        let names: Vec<_> = symbols
            .iter()
            .map(|symbol| (symbol.kind, symbol.name.as_str()))
            .collect();
        assert_eq!(
            names,
            [
                (SymbolKind::Struct, "User"),
                (SymbolKind::Service, "a"),
                (SymbolKind::Handler, "GetUserHandler"),
                (SymbolKind::Route, "get /user"),
            ]
        );
        assert_eq!((symbols[0].line, symbols[0].column), (1, 6));
    }

    #[test]
    fn test_handler_file_stem_follows_style() {
        let config = AppConfig::new(GenConfig::new(NamingStyle::Snake), CheckConfig::default());
        let analyzer = Analyzer::new(config);
        let document = analyzer.parse_source(SOURCE, "a.api");
        let handlers = analyzer.symbols(&document, Some(SymbolKind::Handler));
        assert_eq!(handlers[0].file_stem.as_deref(), Some("get_user"));

        let lower = Analyzer::default().symbols(&document, Some(SymbolKind::Handler));
        assert_eq!(lower[0].file_stem.as_deref(), Some("getuser"));
    }

    #[test]
    fn test_goto_local_struct() {
        let analyzer = Analyzer::default();
        let document = analyzer.parse_source(SOURCE, "a.api");
        let offset = SOURCE.rfind("User").expect("reference");
        let location = analyzer.goto(&document, offset).expect("location");
        assert_eq!(location.span, Span::new(5..9));
        assert_eq!(location.to_string(), "a.api:1:6");
        assert!(analyzer.goto(&document, 0).is_none());
    }

    #[test]
    fn test_deny_warnings() {
        let source = "@server(\n  compact_handler: yes\n)\nservice a {\n}\n";
        let document = Analyzer::default().parse_source(source, "a.api");

        let lenient = Analyzer::default().check_document(document.clone());
        assert!(lenient.passed());
        assert_eq!(lenient.warning_count(), 1);

        let strict = Analyzer::new(AppConfig::new(GenConfig::default(), CheckConfig::new(true)))
            .check_document(document);
        assert!(!strict.passed());
        assert!(matches!(
            strict.into_result(),
            Err(ZeroApiError::Check { .. })
        ));
    }
}
