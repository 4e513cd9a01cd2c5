//! Reference and import resolution.
//!
//! A [`Resolver`] answers "what does this node point at" for type
//! references, handlers and imports of one [`Document`]. Imported files are
//! read through a [`SourceLoader`], parsed once and cached inside the
//! resolver. Nothing is cached process-wide.

use std::{
    collections::HashMap,
    fs, io,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use log::{debug, trace};
use thiserror::Error;

use crate::{
    index::DeclKind,
    model::{Document, NodeId, NodeKind, TypeReference},
};

/// Where a resolved node points.
#[derive(Debug, Clone)]
pub enum Target {
    /// A node of the document being resolved.
    Local(NodeId),
    /// A node of an imported document.
    External {
        document: Arc<Document>,
        node: NodeId,
    },
    /// A whole imported document.
    Document(Arc<Document>),
}

impl Target {
    /// The target node, `None` for a whole document.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Target::Local(node) | Target::External { node, .. } => Some(*node),
            Target::Document(_) => None,
        }
    }

    /// The document the target lives in; `local` for [`Target::Local`].
    pub fn document<'a>(&'a self, local: &'a Document) -> &'a Document {
        match self {
            Target::Local(_) => local,
            Target::External { document, .. } | Target::Document(document) => document,
        }
    }
}

/// Outcome of resolving one node.
#[derive(Debug, Clone)]
pub enum Resolution {
    Resolved(Target),
    Unresolved,
    /// More than one candidate; none is preferred.
    Ambiguous(Vec<Target>),
}

impl Resolution {
    fn from_targets(mut targets: Vec<Target>) -> Self {
        match targets.len() {
            0 => Resolution::Unresolved,
            1 => Resolution::Resolved(targets.remove(0)),
            _ => Resolution::Ambiguous(targets),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    /// The single target, if resolved.
    pub fn target(&self) -> Option<&Target> {
        match self {
            Resolution::Resolved(target) => Some(target),
            _ => None,
        }
    }
}

/// Why an import could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("`{}` is not an `.api` file", path.display())]
    NotApi { path: PathBuf },

    #[error("cannot read `{}`: {kind}", path.display())]
    Unreadable { path: PathBuf, kind: io::ErrorKind },
}

/// Reads the source of imported files.
pub trait SourceLoader {
    fn load(&self, path: &Path) -> io::Result<String>;
}

impl<L: SourceLoader + ?Sized> SourceLoader for &L {
    fn load(&self, path: &Path) -> io::Result<String> {
        (**self).load(path)
    }
}

/// Loads sources from the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// Serves sources from memory, for editors holding unsaved buffers.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, source: impl Into<String>) {
        self.files.insert(normalize(path.as_ref()), source.into());
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no source for {}", path.display()),
            )
        })
    }
}

/// Lexically clean a path: drop `.` and fold `..` where possible.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let folded = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !folded {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Resolves the nodes of one document.
pub struct Resolver<'d, L = FsLoader> {
    document: &'d Document,
    loader: L,
    imports: HashMap<PathBuf, Result<Arc<Document>, ImportError>>,
}

impl<'d> Resolver<'d, FsLoader> {
    /// A resolver reading imports from the file system.
    pub fn new(document: &'d Document) -> Self {
        Self::with_loader(document, FsLoader)
    }
}

impl<'d, L: SourceLoader> Resolver<'d, L> {
    pub fn with_loader(document: &'d Document, loader: L) -> Self {
        Self {
            document,
            loader,
            imports: HashMap::new(),
        }
    }

    pub fn document(&self) -> &'d Document {
        self.document
    }

    /// Resolve `node`.
    ///
    /// Type references resolve to struct declarations, handlers to handler
    /// declarations and imports to the imported document. Every other node
    /// kind is [`Resolution::Unresolved`].
    pub fn resolve(&mut self, node: NodeId) -> Resolution {
        let document = self.document;
        let Some(node) = document.get(node) else {
            return Resolution::Unresolved;
        };

        match node.kind() {
            NodeKind::TypeRef(reference) => self.type_reference(reference),
            NodeKind::Handler(handler) => Resolution::from_targets(
                document
                    .index()
                    .lookup(DeclKind::Handler, handler.name.inner())
                    .iter()
                    .copied()
                    .map(Target::Local)
                    .collect(),
            ),
            NodeKind::Import(import) if import.path.is_empty() => Resolution::Unresolved,
            NodeKind::Import(import) => match self.import(import.path.inner()) {
                Ok(document) => Resolution::Resolved(Target::Document(document)),
                Err(_) => Resolution::Unresolved,
            },
            _ => Resolution::Unresolved,
        }
    }

    fn type_reference(&mut self, reference: &'d TypeReference) -> Resolution {
        let Some((qualifier, name)) = reference.qualified() else {
            return Resolution::from_targets(
                self.document
                    .index()
                    .lookup(DeclKind::Struct, reference.name.inner())
                    .iter()
                    .copied()
                    .map(Target::Local)
                    .collect(),
            );
        };

        // `pkg.Type` looks through imports named `pkg`, never locally
        let paths: Vec<String> = self
            .document
            .index()
            .entries(DeclKind::Import)
            .map(|(path, _)| path)
            .filter(|path| Path::new(path).file_stem().is_some_and(|stem| stem == qualifier))
            .map(str::to_string)
            .collect();

        let mut targets = Vec::new();
        for path in paths {
            let Ok(document) = self.import(&path) else {
                continue;
            };
            targets.extend(
                document
                    .index()
                    .lookup(DeclKind::Struct, name)
                    .iter()
                    .map(|&node| Target::External {
                        document: Arc::clone(&document),
                        node,
                    }),
            );
        }
        Resolution::from_targets(targets)
    }

    /// Load and parse the import written as `path`.
    ///
    /// The path is taken relative to the importing document's directory.
    /// Results, failures included, are cached per resolved path.
    pub fn import(&mut self, path: &str) -> Result<Arc<Document>, ImportError> {
        let base = self.document.path().parent().unwrap_or(Path::new(""));
        let full = normalize(&base.join(path));

        if let Some(cached) = self.imports.get(&full) {
            trace!(path:% = full.display(); "Import cache hit");
            return cached.clone();
        }

        let loaded = self.load(&full);
        match &loaded {
            Ok(document) => debug!(
                path:% = full.display(),
                nodes = document.len();
                "Loaded import"
            ),
            Err(err) => debug!(err:% = err; "Failed to load import"),
        }
        self.imports.insert(full, loaded.clone());
        loaded
    }

    fn load(&self, path: &Path) -> Result<Arc<Document>, ImportError> {
        if path.extension().is_none_or(|extension| extension != "api") {
            return Err(ImportError::NotApi {
                path: path.to_path_buf(),
            });
        }

        let source = self
            .loader
            .load(path)
            .map_err(|err| ImportError::Unreadable {
                path: path.to_path_buf(),
                kind: err.kind(),
            })?;
        Ok(Arc::new(crate::parse(&source, path)))
    }
}

/// Resolve one node of `document`, reading imports from the file system.
pub fn resolve(document: &Document, node: NodeId) -> Resolution {
    Resolver::new(document).resolve(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn typeref(document: &Document, name: &str) -> NodeId {
        document
            .nodes()
            .find(|(_, node)| match node.kind() {
                NodeKind::TypeRef(reference) => reference.name.inner() == name,
                _ => false,
            })
            .map(|(id, _)| id)
            .expect("type reference")
    }

    #[test]
    fn test_local_reference() {
        let document = parse("type A {\n  B B\n}\ntype B {}\n", "a.api");
        let resolution = resolve(&document, typeref(&document, "B"));
        let target = resolution.target().expect("resolved");
        assert_eq!(target.node(), Some(document.items()[1]));
    }

    #[test]
    fn test_unknown_and_ambiguous() {
        let document = parse("type A {\n  X Missing\n  Y B\n}\ntype B {}\ntype B {}\n", "a.api");
        assert!(matches!(
            resolve(&document, typeref(&document, "Missing")),
            Resolution::Unresolved
        ));
        match resolve(&document, typeref(&document, "B")) {
            Resolution::Ambiguous(targets) => assert_eq!(targets.len(), 2),
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn test_dotted_reference_through_import() {
        let loader = MemoryLoader::new().with_file("api/types.api", "type User {}\n");
        let document = parse(
            "import \"types.api\"\ntype A {\n  U types.User\n  V User\n}\n",
            "api/main.api",
        );
        let mut resolver = Resolver::with_loader(&document, &loader);

        let qualified = resolver.resolve(typeref(&document, "types.User"));
        let target = qualified.target().expect("resolved");
        assert!(matches!(target, Target::External { .. }));
        assert_eq!(target.document(&document).path(), Path::new("api/types.api"));

        // bare names never look into imports
        assert!(matches!(
            resolver.resolve(typeref(&document, "User")),
            Resolution::Unresolved
        ));
    }

    #[test]
    fn test_import_errors() {
        let document = parse("import \"types.go\"\nimport \"./gone.api\"\n", "main.api");
        let mut resolver = Resolver::with_loader(&document, MemoryLoader::new());

        assert!(matches!(
            resolver.import("types.go"),
            Err(ImportError::NotApi { .. })
        ));
        assert_eq!(
            resolver.import("./gone.api").err(),
            Some(ImportError::Unreadable {
                path: PathBuf::from("gone.api"),
                kind: io::ErrorKind::NotFound,
            })
        );
    }

    #[test]
    fn test_handler_resolution() {
        let source = "service a {\n  @handler ping\n  get /a\n  @handler ping\n  get /b\n  @handler pong\n  get /c\n}\n";
        let document = parse(source, "a.api");
        let handlers = document.declarations_of_kind(DeclKind::Handler);
        assert_eq!(handlers.len(), 3);
        assert!(matches!(
            resolve(&document, handlers[0]),
            Resolution::Ambiguous(_)
        ));
        assert!(resolve(&document, handlers[2]).is_resolved());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("a/./b/../c.api")), PathBuf::from("a/c.api"));
        assert_eq!(normalize(Path::new("../x.api")), PathBuf::from("../x.api"));
    }
}
