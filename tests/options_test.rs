use std::collections::BTreeSet;
use std::path::Path;

use hexforge::error::Error;
use hexforge::options::{
    normalize, normalize_destination, parse_operations, Auth, Crud, Database, Messaging,
    NameVariants, NormalizeSettings, Operation, RawOptions,
};
use serde_json::json;

fn raw(value: serde_json::Value) -> RawOptions {
    serde_json::from_value(value).unwrap()
}

fn module_settings(required: &[String]) -> NormalizeSettings<'_> {
    NormalizeSettings {
        required,
        default_path: "src",
        workspace_root: Some(Path::new("/workspace")),
    }
}

#[test]
fn test_name_variants() {
    let names = NameVariants::from_name("payment-gateway");
    assert_eq!(names.class, "PaymentGateway");
    assert_eq!(names.dash, "payment-gateway");
    assert_eq!(names.camel, "paymentGateway");
    assert_eq!(names.snake, "payment_gateway");
    assert_eq!(names.constant, "PAYMENT_GATEWAY");

    let names = NameVariants::from_name("PaymentGateway");
    assert_eq!(names.dash, "payment-gateway");
    assert_eq!(names.class, "PaymentGateway");
}

#[test]
fn test_defaults_for_omitted_fields() {
    let required = vec!["database".to_string()];
    let options = normalize(
        &raw(json!({"name": "payments", "database": "oracle"})),
        &module_settings(&required),
    )
    .unwrap();

    assert_eq!(options.name, "payments");
    assert_eq!(options.path, "src");
    assert_eq!(options.database, Database::Oracle);
    assert_eq!(options.messaging, Messaging::None);
    assert_eq!(options.auth, Auth::None);
    assert_eq!(options.crud, Crud::Orm);
    assert_eq!(options.operations, Operation::ALL.into_iter().collect::<BTreeSet<_>>());
    assert!(!options.skip_tests);
    assert!(!options.flat);
    assert!(!options.dry_run);
    assert!(!options.apply_migrations);
    assert!(!options.force);
}

#[test]
fn test_missing_name() {
    let result = normalize(&raw(json!({"database": "oracle"})), &NormalizeSettings::default());
    match result {
        Err(Error::InvalidOptions { field, .. }) => assert_eq!(field, "name"),
        other => panic!("Expected InvalidOptions, got {other:?}"),
    }
}

#[test]
fn test_missing_required_database() {
    let required = vec!["database".to_string()];
    for options in [json!({"name": "payments"}), json!({"name": "payments", "database": ""})] {
        match normalize(&raw(options), &module_settings(&required)) {
            Err(Error::InvalidOptions { field, .. }) => assert_eq!(field, "database"),
            other => panic!("Expected InvalidOptions, got {other:?}"),
        }
    }
}

#[test]
fn test_name_without_identifier_characters() {
    let result = normalize(&raw(json!({"name": "---"})), &NormalizeSettings::default());
    assert!(matches!(result, Err(Error::InvalidOptions { .. })));
}

#[test]
fn test_key_spellings_and_aliases() {
    let options = normalize(
        &raw(json!({
            "name": "orders",
            "kafka": "both",
            "authMode": "jwt",
            "crud-mode": "stored-proc",
            "skipTests": true,
            "apply_migrations": "yes",
            "dryRun": "false",
            "unexpected": 1
        })),
        &NormalizeSettings::default(),
    )
    .unwrap();

    assert_eq!(options.messaging, Messaging::Both);
    assert_eq!(options.auth, Auth::Jwt);
    assert_eq!(options.crud, Crud::StoredProc);
    assert!(options.skip_tests);
    assert!(options.apply_migrations);
    assert!(!options.dry_run);
}

#[test]
fn test_malformed_values() {
    let cases = [
        json!({"name": "a", "database": "postgres"}),
        json!({"name": "a", "auth": "basic"}),
        json!({"name": "a", "flat": "maybe"}),
        json!({"name": "a", "operations": "select,merge"}),
    ];
    for case in cases {
        let result = normalize(&raw(case.clone()), &NormalizeSettings::default());
        assert!(
            matches!(result, Err(Error::InvalidOptions { .. })),
            "{case} should be rejected"
        );
    }
}

#[test]
fn test_parse_operations() {
    let operations = parse_operations("select, insert,select").unwrap();
    assert_eq!(
        operations,
        [Operation::Select, Operation::Insert].into_iter().collect()
    );

    assert_eq!(parse_operations("").unwrap().len(), 4);
    assert_eq!(parse_operations(" , ").unwrap().len(), 4);

    match parse_operations("select,upsert") {
        Err(Error::InvalidOptions { field, message }) => {
            assert_eq!(field, "operations");
            assert!(message.contains("upsert"));
        }
        other => panic!("Expected InvalidOptions, got {other:?}"),
    }
}

#[test]
fn test_operations_as_json_list() {
    let options = normalize(
        &raw(json!({"name": "a", "operations": ["delete", "update"]})),
        &NormalizeSettings::default(),
    )
    .unwrap();
    assert_eq!(
        options.operations,
        [Operation::Update, Operation::Delete].into_iter().collect()
    );
}

#[test]
fn test_normalize_destination() {
    let root = Some(Path::new("/workspace"));
    assert_eq!(normalize_destination("my-service/src", root).unwrap(), "my-service/src");
    assert_eq!(normalize_destination("./my-service\\src/", root).unwrap(), "my-service/src");
    assert_eq!(normalize_destination("a/./b/../c", root).unwrap(), "a/c");
    assert_eq!(normalize_destination("", root).unwrap(), "");
    assert_eq!(normalize_destination("/workspace/apps/x", root).unwrap(), "apps/x");
    assert_eq!(normalize_destination("/workspace", root).unwrap(), "");
}

#[test]
fn test_destination_escapes() {
    let root = Some(Path::new("/workspace"));
    for path in ["..", "a/../../b", "/etc", "/workspace-other/x", "/workspace/../x"] {
        assert!(
            matches!(normalize_destination(path, root), Err(Error::PathEscape { .. })),
            "{path} should escape"
        );
    }
    assert!(matches!(
        normalize_destination("/workspace/x", None),
        Err(Error::PathEscape { .. })
    ));
}

#[test]
fn test_path_option_overrides_default() {
    let options = normalize(
        &raw(json!({"name": "agnostic", "path": "my-service/src"})),
        &module_settings(&[]),
    )
    .unwrap();
    assert_eq!(options.path, "my-service/src");
}

#[test]
fn test_absolute_destination_under_relative_root() {
    let cwd = std::env::current_dir().unwrap();
    let inside = cwd.join("apps").join("api");
    assert_eq!(
        normalize_destination(&inside.to_string_lossy(), Some(Path::new("."))).unwrap(),
        "apps/api"
    );
    assert_eq!(
        normalize_destination(&cwd.to_string_lossy(), Some(Path::new("./"))).unwrap(),
        ""
    );

    let outside = cwd.parent().unwrap().join("elsewhere");
    assert!(matches!(
        normalize_destination(&outside.to_string_lossy(), Some(Path::new("."))),
        Err(Error::PathEscape { .. })
    ));
}

#[test]
fn test_non_ascii_name() {
    let options = normalize(&raw(json!({"name": "日本"})), &NormalizeSettings::default()).unwrap();
    assert_eq!(options.name, "日本");
    assert!(!options.names.dash.is_empty());
    assert!(!options.names.class.is_empty());

    let options = normalize(&raw(json!({"name": "Ünïcode-Zähler"})), &NormalizeSettings::default()).unwrap();
    assert!(!options.names.snake.is_empty());
}
