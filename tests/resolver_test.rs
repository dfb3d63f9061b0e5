use hexforge::error::Error;
use hexforge::options::{normalize, NormalizeSettings, NormalizedOptions, RawOptions};
use hexforge::renderer::RenderedTemplate;
use hexforge::resolver::{is_rendered_path_valid, is_template_file, resolve_path, resolve_paths};
use serde_json::json;

fn options(value: serde_json::Value) -> NormalizedOptions {
    let raw: RawOptions = serde_json::from_value(value).unwrap();
    normalize(&raw, &NormalizeSettings::default()).unwrap()
}

fn rendered(path: &str, content: &str) -> RenderedTemplate {
    RenderedTemplate {
        template_path: path.to_string(),
        path: path.to_string(),
        content: content.to_string(),
    }
}

#[test]
fn test_is_template_file() {
    assert!(is_template_file("controller.ts.j2"));
    assert!(is_template_file("__name__.module.ts.j2"));
    assert!(!is_template_file("regular.ts"));
    assert!(!is_template_file("file.j2ts"));
    assert!(!is_template_file("notes.j2"));
}

#[test]
fn test_is_rendered_path_valid() {
    assert!(!is_rendered_path_valid(""));
    assert!(!is_rendered_path_valid("output//filename.txt"));
    assert!(!is_rendered_path_valid("/filename.txt"));
    assert!(!is_rendered_path_valid("a/../b.txt"));
    assert!(is_rendered_path_valid("filename.txt"));
    assert!(is_rendered_path_valid("output/filename.txt"));
}

#[test]
fn test_name_token_and_destination() {
    let opts = options(json!({"name": "PaymentGateway", "path": "src"}));
    let (path, nested) = resolve_path("__name__/domain/__name__.entity.ts.j2", &opts).unwrap();
    assert_eq!(path, "src/payment-gateway/domain/payment-gateway.entity.ts");
    assert_eq!(path, nested);
}

#[test]
fn test_name_token_replaced_once_per_segment() {
    let opts = options(json!({"name": "orders"}));
    let (path, _) = resolve_path("__name__/__name____name__.ts", &opts).unwrap();
    assert_eq!(path, "orders/orders__name__.ts");
}

#[test]
fn test_empty_destination_has_no_leading_slash() {
    let opts = options(json!({"name": "orders"}));
    let (path, _) = resolve_path("__name__/main.ts.j2", &opts).unwrap();
    assert_eq!(path, "orders/main.ts");
}

#[test]
fn test_flat_collapses_grouping_directories() {
    let opts = options(json!({"name": "orders", "path": "src", "flat": true}));
    let (path, nested) = resolve_path(
        "__name__/infrastructure/persistence/oracle/__name__.oracle.adapter.ts.j2",
        &opts,
    )
    .unwrap();
    assert_eq!(path, "src/orders/orders.oracle.adapter.ts");
    assert_eq!(nested, "src/orders/infrastructure/persistence/oracle/orders.oracle.adapter.ts");

    let (path, _) = resolve_path("shared/util/helpers.ts", &opts).unwrap();
    assert_eq!(path, "src/helpers.ts");
}

#[test]
fn test_flat_collision() {
    let opts = options(json!({"name": "orders", "flat": true}));
    let result = resolve_paths(
        vec![
            rendered("__name__/http/index.ts", "a"),
            rendered("__name__/domain/index.ts", "b"),
        ],
        &opts,
    );
    match result {
        Err(Error::FlatCollision { path, first, second }) => {
            assert_eq!(path, "orders/index.ts");
            assert_eq!(first, "__name__/http/index.ts");
            assert_eq!(second, "__name__/domain/index.ts");
        }
        other => panic!("Expected FlatCollision, got {other:?}"),
    }
}

#[test]
fn test_flat_preserves_contents() {
    let templates = vec![
        rendered("__name__/http/__name__.controller.ts.j2", "controller"),
        rendered("__name__/domain/__name__.entity.ts.j2", "entity"),
    ];
    let nested = resolve_paths(templates.clone(), &options(json!({"name": "orders"}))).unwrap();
    let flat = resolve_paths(templates, &options(json!({"name": "orders", "flat": true}))).unwrap();

    let mut nested_contents: Vec<_> = nested.iter().map(|f| f.content.clone()).collect();
    let mut flat_contents: Vec<_> = flat.iter().map(|f| f.content.clone()).collect();
    nested_contents.sort();
    flat_contents.sort();
    assert_eq!(nested_contents, flat_contents);
    assert_eq!(flat[0].final_path, "orders/orders.controller.ts");
}

#[test]
fn test_rendered_path_escape() {
    let opts = options(json!({"name": "orders"}));
    assert!(matches!(
        resolve_path("__name__/../../etc/passwd", &opts),
        Err(Error::PathEscape { .. })
    ));
    assert!(matches!(resolve_path("a//b.ts", &opts), Err(Error::PathEscape { .. })));
}
