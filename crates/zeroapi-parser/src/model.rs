//! The semantic document model.
//!
//! A [`Document`] owns every node of one `.api` file in a single arena,
//! addressed by [`NodeId`]. Node kinds form a closed set ([`NodeKind`]), and
//! every node records its span, its parent and its children in source order.
//!
//! Spans nest: a child's span lies inside its parent's span and siblings
//! never overlap. Debug builds check this after every build.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;

use crate::{
    annotation::{Annotation, ServerOptions, Value},
    error::Diagnostic,
    index::{DeclKind, NameIndex, route_key},
    span::{Span, Spanned},
};

/// Handle of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        debug_assert!(u32::try_from(index).is_ok(), "node arena overflow");
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One node of the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    span: Span,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

impl Node {
    pub(crate) fn new(span: Span, parent: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            span,
            parent,
            children: Vec::new(),
            kind,
        }
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    pub(crate) fn push_child(&mut self, child: NodeId) {
        self.children.push(child);
    }
}

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Syntax(SyntaxDeclaration),
    Info(InfoDeclaration),
    Import(ImportDeclaration),
    Struct(StructDeclaration),
    Field(FieldDeclaration),
    EmbeddedField(EmbeddedField),
    Service(ServiceDeclaration),
    Route(RouteDeclaration),
    Handler(HandlerDeclaration),
    TypeRef(TypeReference),
    /// Source text skipped by parser recovery.
    Error(String),
}

impl NodeKind {
    /// Short lowercase name of the kind, for messages.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Syntax(_) => "syntax",
            NodeKind::Info(_) => "info",
            NodeKind::Import(_) => "import",
            NodeKind::Struct(_) => "struct",
            NodeKind::Field(_) => "field",
            NodeKind::EmbeddedField(_) => "embedded field",
            NodeKind::Service(_) => "service",
            NodeKind::Route(_) => "route",
            NodeKind::Handler(_) => "handler",
            NodeKind::TypeRef(_) => "type reference",
            NodeKind::Error(_) => "error",
        }
    }

    /// The name a node declares or refers to, with its span.
    pub fn name(&self) -> Option<&Spanned<String>> {
        match self {
            NodeKind::Import(import) => Some(&import.path),
            NodeKind::Struct(decl) => Some(&decl.name),
            NodeKind::Field(field) => Some(&field.name),
            NodeKind::Service(service) => Some(&service.name),
            NodeKind::Route(route) => Some(&route.path),
            NodeKind::Handler(handler) => Some(&handler.name),
            NodeKind::TypeRef(reference) => Some(&reference.name),
            NodeKind::Syntax(_)
            | NodeKind::Info(_)
            | NodeKind::EmbeddedField(_)
            | NodeKind::Error(_) => None,
        }
    }

    /// The name index kind this node is registered under.
    pub fn decl_kind(&self) -> Option<DeclKind> {
        match self {
            NodeKind::Struct(_) => Some(DeclKind::Struct),
            NodeKind::Handler(_) => Some(DeclKind::Handler),
            NodeKind::Route(_) => Some(DeclKind::Route),
            NodeKind::Import(_) => Some(DeclKind::Import),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxDeclaration {
    pub version: Spanned<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfoDeclaration {
    pub properties: IndexMap<String, Spanned<Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDeclaration {
    /// The path as written, relative to the importing file.
    pub path: Spanned<String>,
}

/// `type Name {}`. Members are the node's children.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDeclaration {
    pub name: Spanned<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDeclaration {
    pub name: Spanned<String>,
    pub ty: TypeShape,
    pub tag: Option<Spanned<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedField {
    pub pointer: bool,
    pub ty: TypeShape,
}

/// `service name {}`. Routes are the node's children.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDeclaration {
    pub name: Spanned<String>,
    pub annotations: Vec<Annotation>,
    pub options: ServerOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteDeclaration {
    pub method: Spanned<String>,
    pub path: Spanned<String>,
    pub handler: Option<NodeId>,
    pub request: Option<TypeShape>,
    pub response: Option<TypeShape>,
    /// `@doc "text"` or the `summary` of `@doc(...)`.
    pub doc: Option<String>,
    pub annotations: Vec<Annotation>,
}

impl RouteDeclaration {
    /// The name index key, `"<method> <path>"`.
    pub fn key(&self) -> String {
        route_key(self.method.inner(), self.path.inner())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandlerDeclaration {
    pub name: Spanned<String>,
}

/// Where a type reference occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceRole {
    FieldType,
    Embedded,
    Request,
    Response,
}

/// A use of a non-builtin type name: `User` or `pkg.User`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeReference {
    pub name: Spanned<String>,
    pub role: ReferenceRole,
}

impl TypeReference {
    /// Split `pkg.Type` into `("pkg", "Type")`.
    pub fn qualified(&self) -> Option<(&str, &str)> {
        self.name.split_once('.')
    }
}

/// The shape of a field, request or response type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape {
    Builtin(String),
    /// A [`TypeReference`] child node.
    Reference(NodeId),
    Pointer(Box<TypeShape>),
    Slice {
        len: Option<String>,
        elem: Box<TypeShape>,
    },
    Map {
        key: Box<TypeShape>,
        value: Box<TypeShape>,
    },
    Interface,
}

impl TypeShape {
    /// Type reference nodes inside this shape, in source order.
    pub fn references(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<NodeId>) {
        match self {
            TypeShape::Reference(id) => out.push(*id),
            TypeShape::Pointer(inner) => inner.collect_references(out),
            TypeShape::Slice { elem, .. } => elem.collect_references(out),
            TypeShape::Map { key, value } => {
                key.collect_references(out);
                value.collect_references(out);
            }
            TypeShape::Builtin(_) | TypeShape::Interface => {}
        }
    }
}

/// A parsed and indexed `.api` file.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    source: String,
    nodes: Vec<Node>,
    items: Vec<NodeId>,
    index: NameIndex,
    diagnostics: Vec<Diagnostic>,
}

impl Document {
    pub(crate) fn new(
        path: PathBuf,
        source: String,
        nodes: Vec<Node>,
        items: Vec<NodeId>,
        index: NameIndex,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let document = Self {
            path,
            source,
            nodes,
            items,
            index,
            diagnostics,
        };
        #[cfg(debug_assertions)]
        document.check_spans();
        document
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// All nodes with their ids, in creation (source) order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId::new(index), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level nodes in source order. Grouped imports and type blocks are
    /// flattened, one node per import path or struct.
    pub fn items(&self) -> &[NodeId] {
        &self.items
    }

    pub fn index(&self) -> &NameIndex {
        &self.index
    }

    /// Lexer, parser and builder diagnostics, ordered by position.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The source text under `span`.
    pub fn text(&self, span: Span) -> &str {
        self.source.get(span.range()).unwrap_or_default()
    }

    /// Every declaration of `kind`, in source order.
    pub fn declarations_of_kind(&self, kind: DeclKind) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, node)| node.kind.decl_kind() == Some(kind))
            .map(|(id, _)| id)
            .collect()
    }

    /// Every service declaration, in source order.
    pub fn services(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, node)| matches!(node.kind, NodeKind::Service(_)))
            .map(|(id, _)| id)
            .collect()
    }

    /// The type reference or import path at byte `offset`, if any.
    pub fn reference_at(&self, offset: usize) -> Option<NodeId> {
        self.nodes()
            .filter(|(_, node)| matches!(node.kind, NodeKind::TypeRef(_) | NodeKind::Import(_)))
            .find(|(_, node)| node.span.contains_offset(offset))
            .map(|(id, _)| id)
    }

    /// Fields of a struct node, embedded fields and error members excluded.
    pub fn fields(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &FieldDeclaration)> {
        self.node(id).children.iter().filter_map(|&child| {
            match &self.node(child).kind {
                NodeKind::Field(field) => Some((child, field)),
                _ => None,
            }
        })
    }

    /// 1-based line and column (in characters) of byte `offset`.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        let before = self.source.get(..offset).unwrap_or_default();
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |index| index + 1);
        let column = before[line_start..].chars().count() + 1;
        (line, column)
    }

    #[cfg(debug_assertions)]
    fn check_spans(&self) {
        let check_siblings = |siblings: &[NodeId]| {
            for pair in siblings.windows(2) {
                let (a, b) = (self.node(pair[0]).span, self.node(pair[1]).span);
                debug_assert!(
                    a.end() <= b.start(),
                    "sibling spans overlap: {a} and {b} in {}",
                    self.path.display()
                );
            }
        };

        check_siblings(&self.items);
        for node in &self.nodes {
            if let Some(parent) = node.parent {
                let parent_span = self.node(parent).span;
                debug_assert!(
                    parent_span.contains(node.span),
                    "child span {} escapes parent span {parent_span}",
                    node.span
                );
            }
            check_siblings(&node.children);
        }
    }
}
