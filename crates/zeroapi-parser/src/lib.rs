//! # zeroapi parser
//!
//! Parser and semantic model for the go-zero `.api` service description
//! language. The crate turns source text into a [`Document`]: an arena of
//! typed nodes with spans, a name index, and the diagnostics found on the
//! way. Nothing here fails hard; malformed input produces error nodes and
//! diagnostics next to everything that could still be understood.
//!
//! The pipeline is `tokenize -> parse -> build -> resolve -> validate`.
//!
//! ## Usage
//!
//! ```
//! # use zeroapi_parser::{parse, validate_with, MemoryLoader};
//!
//! let source = r#"
//! syntax = "v1"
//!
//! type User {
//!     Name string `json:"name"`
//! }
//!
//! service user-api {
//!     @handler getUser
//!     get /user (User) returns (User)
//! }
//! "#;
//!
//! let document = parse(source, "user.api");
//! let diagnostics = validate_with(&document, MemoryLoader::new());
//! assert!(diagnostics.is_empty());
//! ```

pub mod annotation;
mod builder;
mod builtin_types;
pub mod error;
mod index;
mod lexer;
pub mod model;
mod parser;
mod resolve;
mod span;
pub mod syntax;
pub mod tokens;
mod validate;

use std::path::Path;

use log::debug;

pub use builtin_types::{BUILTIN_TYPES, is_builtin};
pub use error::{Diagnostic, ErrorCode, Severity};
pub use index::{DeclKind, NameIndex, route_key};
pub use lexer::{Lexed, tokenize};
pub use model::{Document, Node, NodeId, NodeKind};
pub use parser::{is_http_method, parse_file};
pub use resolve::{
    FsLoader, ImportError, MemoryLoader, Resolution, Resolver, SourceLoader, Target, resolve,
};
pub use span::{Span, Spanned};
pub use validate::{validate, validate_with};

use builder::Builder;

/// Parse `.api` source into a [`Document`].
///
/// `path` names the file the source came from; imports are resolved
/// relative to its directory. The returned document always exists.
/// Lexical, syntax and annotation problems are available through
/// [`Document::diagnostics`], ordered by position.
pub fn parse(source: &str, path: impl AsRef<Path>) -> Document {
    let path = path.as_ref();

    let lexed = tokenize(source);
    let (file, syntax_diagnostics) = parse_file(source, &lexed.tokens);
    let built = Builder::new().build(&file);

    let mut diagnostics = lexed.diagnostics;
    diagnostics.extend(syntax_diagnostics);
    diagnostics.extend(built.diagnostics);
    diagnostics.sort_by_key(|diagnostic| diagnostic.span().start());

    debug!(
        path:% = path.display(),
        tokens = lexed.tokens.len(),
        nodes = built.nodes.len(),
        diagnostics = diagnostics.len();
        "Parsed document"
    );

    Document::new(
        path.to_path_buf(),
        source.to_string(),
        built.nodes,
        built.items,
        built.index,
        diagnostics,
    )
}
