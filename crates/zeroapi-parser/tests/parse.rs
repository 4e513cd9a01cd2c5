use zeroapi_parser::{
    DeclKind, ErrorCode, MemoryLoader, NodeKind, Resolution, model::TypeShape, parse,
    validate_with,
};

fn codes(diagnostics: &[zeroapi_parser::Diagnostic]) -> Vec<ErrorCode> {
    diagnostics.iter().filter_map(|d| d.code()).collect()
}

#[test]
fn test_duplicate_user_end_to_end() {
    let source = r#"type User { Name string }
type User { Id int }
service demo-api {
  @handler getUser
  get /user (User) returns (User)
}
"#;

    let document = parse(source, "demo.api");
    assert!(document.diagnostics().is_empty(), "{:?}", document.diagnostics());

    let diagnostics = validate_with(&document, MemoryLoader::new());
    let found = codes(&diagnostics);
    assert_eq!(found.iter().filter(|&&c| c == ErrorCode::E200).count(), 2);
    assert_eq!(found.iter().filter(|&&c| c == ErrorCode::E203).count(), 0);
    assert_eq!(found.iter().filter(|&&c| c == ErrorCode::E204).count(), 0);
    assert_eq!(found.iter().filter(|&&c| c == ErrorCode::E205).count(), 2);

    let positions: Vec<_> = diagnostics.iter().map(|d| d.span().start()).collect();
    assert!(positions.is_sorted());
}

#[test]
fn test_full_service_file() {
    let source = r#"syntax = "v1"

info (
    title: "user api"
    author: "zeroapi"
)

import (
    "base.api"
)

type (
    LoginReq {
        Username string `json:"username"`
        Password string `json:"password"`
    }

    LoginResp struct {
        base.Response
        Token   string            `json:"token"`
        Expires int64             `json:"expires"`
        Roles   []string          `json:"roles"`
        Extra   map[string]any    `json:"extra,optional"`
    }
)

@server (
    prefix: /v1/user
    group: user
    middleware: Auth, Log
    compact_handler: true
)
service user-api {
    @doc "log a user in"
    @handler login
    post /login (LoginReq) returns (LoginResp)

    @handler logout
    post /logout
}
"#;

    let loader = MemoryLoader::new().with_file("base.api", "type Response {\n  Code int\n}\n");
    let document = parse(source, "user.api");
    let diagnostics = validate_with(&document, &loader);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");

    assert_eq!(document.declarations_of_kind(DeclKind::Struct).len(), 2);
    assert_eq!(document.declarations_of_kind(DeclKind::Handler).len(), 2);
    assert_eq!(document.declarations_of_kind(DeclKind::Route).len(), 2);
    assert_eq!(document.declarations_of_kind(DeclKind::Import).len(), 1);

    let service = document.services()[0];
    let NodeKind::Service(decl) = document.node(service).kind() else {
        panic!("expected service");
    };
    assert_eq!(decl.name.inner(), "user-api");
    assert_eq!(decl.options.prefix(), Some("/v1/user"));
    assert_eq!(decl.options.middleware(), vec!["Auth", "Log"]);
    assert_eq!(decl.options.compact_handler(), Some(true));

    let info = document
        .nodes()
        .find_map(|(_, node)| match node.kind() {
            NodeKind::Info(info) => Some(info),
            _ => None,
        })
        .expect("info");
    assert_eq!(
        info.properties.get("title").map(|v| v.inner().to_string()),
        Some("user api".to_string())
    );

    let login = document.index().lookup(DeclKind::Route, "post /login")[0];
    let NodeKind::Route(route) = document.node(login).kind() else {
        panic!("expected route");
    };
    assert_eq!(route.doc.as_deref(), Some("log a user in"));
    assert!(matches!(route.request, Some(TypeShape::Reference(_))));
}

#[test]
fn test_dotted_reference_goes_through_import() {
    let source = "import \"base.api\"\ntype A {\n  R base.Response\n  M base.Missing\n}\n";
    let loader = MemoryLoader::new().with_file("base.api", "type Response {}\n");
    let document = parse(source, "a.api");

    let diagnostics = validate_with(&document, &loader);
    assert_eq!(codes(&diagnostics), [ErrorCode::E204]);
    assert_eq!(document.text(diagnostics[0].span()), "base.Missing");
}

#[test]
fn test_resolution_agrees_with_index() {
    let source = "type A {\n  B B\n  C C\n}\ntype B {}\ntype C {}\ntype C {}\n";
    let document = parse(source, "a.api");

    for (id, node) in document.nodes() {
        let NodeKind::TypeRef(reference) = node.kind() else {
            continue;
        };
        let declared = document
            .index()
            .lookup(DeclKind::Struct, reference.name.inner())
            .len();
        match zeroapi_parser::resolve(&document, id) {
            Resolution::Resolved(_) => assert_eq!(declared, 1),
            Resolution::Unresolved => assert_eq!(declared, 0),
            Resolution::Ambiguous(targets) => assert_eq!(targets.len(), declared),
        }
    }
}

#[test]
fn test_recovery_keeps_following_declarations() {
    let source = "type Broken {\n  Name\tstring oops more\n\nservice a {\n  @handler ping\n  get /ping\n}\n";
    let document = parse(source, "a.api");

    let found = codes(document.diagnostics());
    assert!(found.contains(&ErrorCode::E100));
    assert!(found.contains(&ErrorCode::E101));
    assert_eq!(document.services().len(), 1);
    assert_eq!(document.declarations_of_kind(DeclKind::Handler).len(), 1);
}

#[test]
fn test_documents_are_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<zeroapi_parser::Document>();

    let sources = ["type A {}\ntype A {}\n", "type B {\n  C Missing\n}\n"];
    let counts: Vec<usize> = std::thread::scope(|scope| {
        let handles: Vec<_> = sources
            .iter()
            .map(|source| scope.spawn(move || zeroapi_parser::validate(&parse(source, "t.api")).len()))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .collect()
    });
    assert_eq!(counts, [2, 1]);
}
