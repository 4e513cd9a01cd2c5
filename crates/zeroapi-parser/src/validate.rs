//! Semantic validation of a [`Document`].
//!
//! Each rule looks at the document independently and reports every
//! occurrence it finds. The document's own lexical, syntax and annotation
//! diagnostics are merged into the result, so one call returns everything
//! a host needs to show for the file.

use indexmap::IndexMap;
use log::debug;

use crate::{
    error::{Diagnostic, ErrorCode},
    index::DeclKind,
    model::{Document, NodeId, NodeKind},
    resolve::{FsLoader, Resolution, Resolver, SourceLoader, Target},
    span::Span,
};

/// Validate `document`, reading imports from the file system.
pub fn validate(document: &Document) -> Vec<Diagnostic> {
    validate_with(document, FsLoader)
}

/// Validate `document`, reading imports through `loader`.
///
/// The result is ordered by source position. Calling it twice on the same
/// document yields the same diagnostics.
pub fn validate_with<L: SourceLoader>(document: &Document, loader: L) -> Vec<Diagnostic> {
    let mut resolver = Resolver::with_loader(document, loader);
    let mut diagnostics = document.diagnostics().to_vec();

    duplicate_declarations(document, DeclKind::Struct, ErrorCode::E200, &mut diagnostics);
    duplicate_declarations(document, DeclKind::Handler, ErrorCode::E201, &mut diagnostics);
    duplicate_declarations(document, DeclKind::Route, ErrorCode::E202, &mut diagnostics);
    duplicate_fields(document, &mut diagnostics);
    references(document, &mut resolver, &mut diagnostics);
    imports(document, &mut resolver, &mut diagnostics);

    diagnostics.sort_by_key(|diagnostic| diagnostic.span().start());
    debug!(
        path:% = document.path().display(),
        diagnostics = diagnostics.len();
        "Validated document"
    );
    diagnostics
}

/// The span a duplicate diagnostic points at: the declared name, or
/// `method path` for routes.
fn declaration_span(document: &Document, id: NodeId) -> Span {
    let node = document.node(id);
    match node.kind() {
        NodeKind::Route(route) => route.method.span().union(route.path.span()),
        kind => kind.name().map_or(node.span(), |name| name.span()),
    }
}

fn duplicate_declarations(
    document: &Document,
    kind: DeclKind,
    code: ErrorCode,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, nodes) in document.index().duplicates(kind) {
        for &node in nodes {
            let mut diagnostic = Diagnostic::error(format!("duplicate {kind} `{name}`"))
                .with_code(code)
                .with_label(declaration_span(document, node), format!("{kind} declared here"));
            for &other in nodes.iter().filter(|&&other| other != node) {
                diagnostic = diagnostic
                    .with_secondary_label(declaration_span(document, other), "also declared here");
            }
            diagnostics.push(diagnostic.with_help(format!(
                "rename or remove one of the {} declarations",
                nodes.len()
            )));
        }
    }
}

fn duplicate_fields(document: &Document, diagnostics: &mut Vec<Diagnostic>) {
    for id in document.declarations_of_kind(DeclKind::Struct) {
        let mut by_name: IndexMap<&str, Vec<Span>> = IndexMap::new();
        for (_, field) in document.fields(id) {
            if !field.name.is_empty() {
                by_name
                    .entry(field.name.inner().as_str())
                    .or_default()
                    .push(field.name.span());
            }
        }

        for (name, spans) in by_name.iter().filter(|(_, spans)| spans.len() > 1) {
            for &span in spans {
                let mut diagnostic = Diagnostic::error(format!("duplicate field `{name}`"))
                    .with_code(ErrorCode::E203)
                    .with_label(span, "field declared here");
                for &other in spans.iter().filter(|&&other| other != span) {
                    diagnostic = diagnostic.with_secondary_label(other, "also declared here");
                }
                diagnostics.push(diagnostic);
            }
        }
    }
}

fn references<L: SourceLoader>(
    document: &Document,
    resolver: &mut Resolver<'_, L>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (id, node) in document.nodes() {
        let NodeKind::TypeRef(reference) = node.kind() else {
            continue;
        };
        let name = reference.name.inner();

        match resolver.resolve(id) {
            Resolution::Resolved(_) => {}
            Resolution::Unresolved => {
                let help = match reference.qualified() {
                    Some((qualifier, _)) => {
                        format!("import a `{qualifier}.api` file that declares the type")
                    }
                    None => "declare the type with `type` or fix the name".to_string(),
                };
                diagnostics.push(
                    Diagnostic::error(format!("unknown type `{name}`"))
                        .with_code(ErrorCode::E204)
                        .with_label(node.span(), "not declared")
                        .with_help(help),
                );
            }
            Resolution::Ambiguous(targets) => {
                let mut diagnostic = Diagnostic::error(format!(
                    "ambiguous type `{name}`: {} declarations",
                    targets.len()
                ))
                .with_code(ErrorCode::E205)
                .with_label(node.span(), "refers to more than one declaration");
                // only local candidates can be labelled in this file
                for target in &targets {
                    if let Target::Local(candidate) = target {
                        diagnostic = diagnostic.with_secondary_label(
                            declaration_span(document, *candidate),
                            "candidate",
                        );
                    }
                }
                diagnostics.push(diagnostic);
            }
        }
    }
}

fn imports<L: SourceLoader>(
    document: &Document,
    resolver: &mut Resolver<'_, L>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for id in document.declarations_of_kind(DeclKind::Import) {
        let NodeKind::Import(import) = document.node(id).kind() else {
            continue;
        };
        if import.path.is_empty() {
            continue;
        }
        if let Err(err) = resolver.import(import.path.inner()) {
            diagnostics.push(
                Diagnostic::error(format!("cannot resolve import `{}`", import.path.inner()))
                    .with_code(ErrorCode::E206)
                    .with_label(import.path.span(), err.to_string()),
            );
        }
    }
}
