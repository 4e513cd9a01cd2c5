//! Builds the document model from the syntax tree.
//!
//! One traversal creates the arena nodes with their spans and parents,
//! canonicalizes annotations and fills the [`NameIndex`]. Colliding names
//! are appended to the index; duplicate reporting is left to the
//! validator.

use log::trace;

use crate::{
    annotation::{Annotation, ServerOptions, canonical_annotation, canonical_entries},
    builtin_types::is_builtin,
    error::{Diagnostic, DiagnosticCollector},
    index::{DeclKind, NameIndex},
    model::{
        EmbeddedField, FieldDeclaration, HandlerDeclaration, ImportDeclaration, InfoDeclaration,
        Node, NodeId, NodeKind, ReferenceRole, RouteDeclaration, ServiceDeclaration,
        StructDeclaration, SyntaxDeclaration, TypeReference, TypeShape,
    },
    span::{Span, Spanned},
    syntax::{
        self, File, Item, Member, RouteDef, ServiceDecl, ServiceMember, StructDef, TypeEntry,
        TypeExpr,
    },
};

/// Output of one build.
pub(crate) struct Built {
    pub nodes: Vec<Node>,
    pub items: Vec<NodeId>,
    pub index: NameIndex,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Default)]
pub(crate) struct Builder {
    nodes: Vec<Node>,
    items: Vec<NodeId>,
    index: NameIndex,
    diagnostics: DiagnosticCollector,
}

impl Builder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn build(mut self, file: &File) -> Built {
        for item in &file.items {
            self.item(item);
        }
        trace!(
            nodes = self.nodes.len(),
            names = self.index.len(),
            diagnostics = self.diagnostics.len();
            "Built document model"
        );

        Built {
            nodes: self.nodes,
            items: self.items,
            index: self.index,
            diagnostics: self.diagnostics.finish(),
        }
    }

    fn push(&mut self, span: Span, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node::new(span, parent, kind));
        match parent {
            Some(parent) => self.nodes[parent.index()].push_child(id),
            None => self.items.push(id),
        }
        id
    }

    fn register(&mut self, kind: DeclKind, name: &str, id: NodeId) {
        // Unnamed declarations only come out of error recovery
        if !name.is_empty() {
            self.index.insert(kind, name, id);
        }
    }

    fn item(&mut self, item: &Item) {
        match item {
            Item::Syntax(decl) => {
                self.push(
                    decl.span,
                    None,
                    NodeKind::Syntax(SyntaxDeclaration {
                        version: decl.version.clone(),
                    }),
                );
            }
            Item::Info(decl) => {
                let properties = canonical_entries(&decl.entries, &mut self.diagnostics);
                self.push(decl.span, None, NodeKind::Info(InfoDeclaration { properties }));
            }
            Item::Import(decl) => {
                for path in &decl.paths {
                    let id = self.push(
                        path.span(),
                        None,
                        NodeKind::Import(ImportDeclaration { path: path.clone() }),
                    );
                    self.register(DeclKind::Import, path.inner(), id);
                }
            }
            Item::Types(decl) => {
                for entry in &decl.entries {
                    match entry {
                        TypeEntry::Struct(def) => self.struct_def(def),
                        TypeEntry::Error(node) => self.error(node, None),
                    }
                }
            }
            Item::Service(decl) => self.service(decl),
            Item::Error(node) => self.error(node, None),
        }
    }

    fn error(&mut self, node: &syntax::ErrorNode, parent: Option<NodeId>) {
        self.push(node.span, parent, NodeKind::Error(node.text.clone()));
    }

    fn struct_def(&mut self, def: &StructDef) {
        let id = self.push(
            def.span,
            None,
            NodeKind::Struct(StructDeclaration {
                name: def.name.clone(),
            }),
        );
        self.register(DeclKind::Struct, def.name.inner(), id);

        for member in &def.members {
            match member {
                Member::Field(field) => {
                    let field_id = self.push(
                        field.span,
                        Some(id),
                        NodeKind::Field(FieldDeclaration {
                            name: field.name.clone(),
                            ty: TypeShape::Interface,
                            tag: field.tag.clone(),
                        }),
                    );
                    let shape = self.shape(&field.ty, field_id, ReferenceRole::FieldType);
                    if let NodeKind::Field(decl) = self.nodes[field_id.index()].kind_mut() {
                        decl.ty = shape;
                    }
                }
                Member::Embedded(embedded) => {
                    let embedded_id = self.push(
                        embedded.span,
                        Some(id),
                        NodeKind::EmbeddedField(EmbeddedField {
                            pointer: embedded.pointer,
                            ty: TypeShape::Interface,
                        }),
                    );
                    let shape = self.named(&embedded.name, embedded_id, ReferenceRole::Embedded);
                    if let NodeKind::EmbeddedField(decl) =
                        self.nodes[embedded_id.index()].kind_mut()
                    {
                        decl.ty = shape;
                    }
                }
                Member::Error(node) => self.error(node, Some(id)),
            }
        }
    }

    fn shape(&mut self, expr: &TypeExpr, parent: NodeId, role: ReferenceRole) -> TypeShape {
        match expr {
            TypeExpr::Named(name) => self.named(name, parent, role),
            TypeExpr::Pointer { inner, .. } => {
                TypeShape::Pointer(Box::new(self.shape(inner, parent, role)))
            }
            TypeExpr::Slice { len, elem, .. } => TypeShape::Slice {
                len: len.as_ref().map(|len| len.inner().clone()),
                elem: Box::new(self.shape(elem, parent, role)),
            },
            TypeExpr::Map { key, value, .. } => TypeShape::Map {
                key: Box::new(self.shape(key, parent, role)),
                value: Box::new(self.shape(value, parent, role)),
            },
            TypeExpr::Interface(_) => TypeShape::Interface,
        }
    }

    fn named(&mut self, name: &Spanned<String>, parent: NodeId, role: ReferenceRole) -> TypeShape {
        if is_builtin(name.inner()) {
            return TypeShape::Builtin(name.inner().clone());
        }
        let id = self.push(
            name.span(),
            Some(parent),
            NodeKind::TypeRef(TypeReference {
                name: name.clone(),
                role,
            }),
        );
        TypeShape::Reference(id)
    }

    fn annotations(&mut self, annotations: &[syntax::Annotation]) -> Vec<Annotation> {
        annotations
            .iter()
            .map(|annotation| canonical_annotation(annotation, &mut self.diagnostics))
            .collect()
    }

    fn service(&mut self, decl: &ServiceDecl) {
        let annotations = self.annotations(&decl.annotations);
        let options = ServerOptions::from_annotations(&annotations);
        let id = self.push(
            decl.span,
            None,
            NodeKind::Service(ServiceDeclaration {
                name: decl.name.clone(),
                annotations,
                options,
            }),
        );

        for member in &decl.routes {
            match member {
                ServiceMember::Route(route) => self.route(route, id),
                ServiceMember::Error(node) => self.error(node, Some(id)),
            }
        }
    }

    fn route(&mut self, route: &RouteDef, service: NodeId) {
        let annotations = self.annotations(&route.annotations);
        let doc = route_doc(&annotations);
        let handler = handler_name(&route.annotations);

        let id = self.push(
            route.span,
            Some(service),
            NodeKind::Route(RouteDeclaration {
                method: route.method.clone(),
                path: route.path.clone(),
                handler: None,
                request: None,
                response: None,
                doc,
                annotations,
            }),
        );

        let handler = handler.map(|name| {
            let handler_id = self.push(
                name.span(),
                Some(id),
                NodeKind::Handler(HandlerDeclaration { name: name.clone() }),
            );
            self.register(DeclKind::Handler, name.inner(), handler_id);
            handler_id
        });
        let request = route
            .request
            .as_ref()
            .map(|ty| self.shape(ty, id, ReferenceRole::Request));
        let response = route
            .response
            .as_ref()
            .map(|ty| self.shape(ty, id, ReferenceRole::Response));

        let key = match self.nodes[id.index()].kind_mut() {
            NodeKind::Route(decl) => {
                decl.handler = handler;
                decl.request = request;
                decl.response = response;
                decl.key()
            }
            _ => return,
        };
        self.register(DeclKind::Route, &key, id);
    }
}

/// The handler name from `@handler name`, if present and non-empty. Only
/// the first item of a value list names the handler.
fn handler_name(annotations: &[syntax::Annotation]) -> Option<Spanned<String>> {
    annotations
        .iter()
        .filter(|annotation| annotation.name.inner() == "handler")
        .find_map(|annotation| match &annotation.body {
            syntax::AnnotationBody::Inline(value) => value.items.first(),
            _ => None,
        })
        .filter(|item| !item.inner().text().is_empty())
        .map(|item| {
            let span = item.span();
            let span = match item.inner() {
                syntax::ValueItem::Quoted(_) => Span::new(span.start() + 1..span.end() - 1),
                syntax::ValueItem::Bare(_) => span,
            };
            Spanned::new(item.inner().text().to_string(), span)
        })
}

/// `@doc "text"` or `@doc(summary: "text")`.
fn route_doc(annotations: &[Annotation]) -> Option<String> {
    let doc = annotations
        .iter()
        .find(|annotation| annotation.name() == "doc")?;
    match &doc.value {
        Some(value) => Some(value.inner().to_string()),
        None => doc.get("summary").map(ToString::to_string),
    }
}

#[cfg(test)]
mod tests {
    use crate::{DeclKind, NodeKind, annotation::Value, model::TypeShape, parse};

    #[test]
    fn test_imports_are_flattened() {
        let document = parse("import (\n  \"a.api\"\n  \"b.api\"\n)\nimport \"c.api\"\n", "x.api");
        let imports = document.declarations_of_kind(DeclKind::Import);
        assert_eq!(imports.len(), 3);
        assert_eq!(document.items(), imports.as_slice());
    }

    #[test]
    fn test_route_children() {
        let source = "service a {\n  @doc \"fetch\"\n  @handler getUser\n  get /user (Req) returns ([]User)\n}\n";
        let document = parse(source, "a.api");
        let route_id = document.declarations_of_kind(DeclKind::Route)[0];
        let route = document.node(route_id);
        assert_eq!(route.children().len(), 3);

        let NodeKind::Route(decl) = route.kind() else {
            panic!("expected route");
        };
        assert_eq!(decl.key(), "get /user");
        assert_eq!(decl.doc.as_deref(), Some("fetch"));
        assert!(matches!(decl.response, Some(TypeShape::Slice { .. })));

        let handler = decl.handler.expect("handler");
        assert_eq!(document.text(document.node(handler).span()), "getUser");
        assert_eq!(document.index().lookup(DeclKind::Handler, "getUser"), &[handler]);
    }

    #[test]
    fn test_handler_span_covers_only_its_name() {
        let source = "service a {\n  @handler getUser, extra\n  get /user\n  @handler \"ping\"\n  get /ping\n}\n";
        let document = parse(source, "a.api");
        let handlers = document.declarations_of_kind(DeclKind::Handler);
        let texts: Vec<_> = handlers
            .iter()
            .map(|&id| document.text(document.node(id).span()))
            .collect();
        assert_eq!(texts, ["getUser", "ping"]);

        let NodeKind::Handler(decl) = document.node(handlers[0]).kind() else {
            panic!("expected handler");
        };
        assert_eq!(decl.name.inner(), "getUser");
    }

    #[test]
    fn test_builtin_types_are_not_references() {
        let document = parse("type A {\n  Name string\n  Ids []int64\n}\n", "a.api");
        let typerefs = document
            .nodes()
            .filter(|(_, node)| matches!(node.kind(), NodeKind::TypeRef(_)))
            .count();
        assert_eq!(typerefs, 0);
    }

    #[test]
    fn test_server_options_and_warning() {
        let source = "@server(\n  group: user\n  compact_handler: yes\n  signature: \"true\"\n)\nservice a {\n}\n";
        let document = parse(source, "a.api");
        let service = document.services()[0];
        let NodeKind::Service(decl) = document.node(service).kind() else {
            panic!("expected service");
        };
        assert_eq!(decl.options.group(), Some("user"));
        assert_eq!(decl.options.compact_handler(), None);
        assert_eq!(decl.options.get("signature"), Some(&Value::Bool(true)));

        assert_eq!(document.diagnostics().len(), 1);
        assert!(document.diagnostics()[0].severity().is_warning());
    }

    #[test]
    fn test_error_nodes_keep_text() {
        let document = parse("type A {\n  ??\n}\n", "a.api");
        let errors: Vec<_> = document
            .nodes()
            .filter_map(|(_, node)| match node.kind() {
                NodeKind::Error(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(errors, ["??"]);
    }
}
