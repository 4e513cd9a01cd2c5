use std::fs;

use tempfile::tempdir;
use zeroapi_parser::{ErrorCode, Resolver, Target, parse, validate};

#[test]
fn test_imports_resolve_from_disk() {
    let dir = tempdir().expect("tempdir");
    fs::create_dir(dir.path().join("shared")).expect("mkdir");
    fs::write(
        dir.path().join("shared/base.api"),
        "type Response {\n  Code int\n}\n",
    )
    .expect("write base");

    let main = dir.path().join("main.api");
    let source = "import \"./shared/base.api\"\ntype Reply {\n  base.Response\n}\n";
    fs::write(&main, source).expect("write main");

    let document = parse(source, &main);
    assert!(validate(&document).is_empty());

    let import = document.items()[0];
    let mut resolver = Resolver::new(&document);
    match resolver.resolve(import).target() {
        Some(Target::Document(imported)) => {
            assert!(imported.path().ends_with("shared/base.api"));
            assert_eq!(imported.services().len(), 0);
        }
        other => panic!("expected imported document, got {other:?}"),
    }
}

#[test]
fn test_missing_and_foreign_imports() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("types.go"), "package types\n").expect("write");

    let source = "import (\n  \"types.go\"\n  \"nope.api\"\n)\n";
    let document = parse(source, dir.path().join("main.api"));
    let diagnostics = validate(&document);

    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics.iter().all(|d| d.code() == Some(ErrorCode::E206)));
    assert!(diagnostics[0].labels()[0].message().contains("not an `.api` file"));
}
