//! Syntax tree produced by the [`parser`](crate::parser).
//!
//! The tree mirrors the surface grammar closely and keeps every span. Text
//! payloads are owned so the tree can outlive the token buffer. Malformed
//! input shows up as [`ErrorNode`]s at the level where recovery happened.

use crate::span::{Span, Spanned};

/// A whole `.api` file.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub items: Vec<Item>,
    pub span: Span,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Syntax(SyntaxDecl),
    Info(InfoDecl),
    Import(ImportDecl),
    Types(TypeDecl),
    Service(ServiceDecl),
    Error(ErrorNode),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Item::Syntax(decl) => decl.span,
            Item::Info(decl) => decl.span,
            Item::Import(decl) => decl.span,
            Item::Types(decl) => decl.span,
            Item::Service(decl) => decl.span,
            Item::Error(node) => node.span,
        }
    }
}

/// Tokens skipped during error recovery.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorNode {
    pub text: String,
    pub span: Span,
}

/// `syntax = "v1"`
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxDecl {
    pub version: Spanned<String>,
    pub span: Span,
}

/// `info ( key: value ... )`
#[derive(Debug, Clone, PartialEq)]
pub struct InfoDecl {
    pub entries: Vec<KeyValue>,
    pub span: Span,
}

/// `import "a.api"` or `import ( "a.api" "b.api" )`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub paths: Vec<Spanned<String>>,
    pub span: Span,
}

/// `type Name {}` or a grouped `type ( ... )` block.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub entries: Vec<TypeEntry>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeEntry {
    Struct(StructDef),
    Error(ErrorNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: Spanned<String>,
    pub members: Vec<Member>,
    pub span: Span,
}

/// One line of a struct body.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(FieldDef),
    Embedded(EmbeddedDef),
    Error(ErrorNode),
}

impl Member {
    pub fn span(&self) -> Span {
        match self {
            Member::Field(field) => field.span,
            Member::Embedded(embedded) => embedded.span,
            Member::Error(node) => node.span,
        }
    }
}

/// `Name Type `tag``
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: Spanned<String>,
    pub ty: TypeExpr,
    pub tag: Option<Spanned<String>>,
    pub span: Span,
}

/// An anonymous field: `Base`, `*Base` or `pkg.Base`.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedDef {
    pub pointer: bool,
    pub name: Spanned<String>,
    pub span: Span,
}

/// A type as written in a field or route signature.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// A builtin or user type name, possibly `pkg.Name`.
    Named(Spanned<String>),
    Pointer {
        inner: Box<TypeExpr>,
        span: Span,
    },
    /// `[]T` or `[N]T`.
    Slice {
        len: Option<Spanned<String>>,
        elem: Box<TypeExpr>,
        span: Span,
    },
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
        span: Span,
    },
    /// `interface{}`
    Interface(Span),
}

impl TypeExpr {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Named(name) => name.span(),
            TypeExpr::Pointer { span, .. }
            | TypeExpr::Slice { span, .. }
            | TypeExpr::Map { span, .. }
            | TypeExpr::Interface(span) => *span,
        }
    }
}

/// `@server(...) service name { routes }`
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDecl {
    pub annotations: Vec<Annotation>,
    pub name: Spanned<String>,
    pub routes: Vec<ServiceMember>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceMember {
    Route(RouteDef),
    Error(ErrorNode),
}

/// `@handler name` / `get /path (Req) returns (Resp)`
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDef {
    pub annotations: Vec<Annotation>,
    pub method: Spanned<String>,
    pub path: Spanned<String>,
    pub request: Option<TypeExpr>,
    pub response: Option<TypeExpr>,
    pub span: Span,
}

/// `@name`, `@name value` or `@name ( key: value ... )`
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub name: Spanned<String>,
    pub body: AnnotationBody,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationBody {
    Empty,
    Inline(AnnotationValue),
    Block(Vec<KeyValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub key: Spanned<String>,
    pub value: AnnotationValue,
    pub span: Span,
}

/// A comma separated list of value items. Empty when nothing follows the
/// key; the span is then empty too.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationValue {
    pub items: Vec<Spanned<ValueItem>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueItem {
    /// A string literal, escapes kept verbatim.
    Quoted(String),
    /// A run of tokens taken as written, e.g. `/v1/user` or `Auth`.
    Bare(String),
}

impl ValueItem {
    pub fn text(&self) -> &str {
        match self {
            ValueItem::Quoted(text) | ValueItem::Bare(text) => text,
        }
    }
}
