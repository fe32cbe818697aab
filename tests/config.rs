mod common;

use common::TestWorkspace;
use sheet_store::{config::Config, error::StoreError};

#[test]
fn loads_and_validates_a_full_document() {
    let ws = TestWorkspace::new();
    let path = ws.write_orders_config("config.json");
    let config = Config::load(&path).expect("config loads");

    let mapping = config.table_mapping("orders").expect("orders mapping");
    assert_eq!(mapping.table, "orders");
    assert_eq!(
        mapping
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>(),
        vec!["order_id", "customer", "amount"]
    );
    assert_eq!(mapping.primary_keys, vec!["order_id".to_string()]);
    assert_eq!(config.db_config.batch_size, 1000);
}

#[test]
fn missing_file_is_a_config_error() {
    let ws = TestWorkspace::new();
    let err = Config::load(&ws.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, StoreError::Config(_)));
}

#[test]
fn malformed_json_is_a_config_error() {
    let ws = TestWorkspace::new();
    let path = ws.write("broken.json", "{ not json");
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, StoreError::Config(_)));
}

#[test]
fn primary_key_referencing_undeclared_column_is_rejected() {
    let ws = TestWorkspace::new();
    let doc = common::orders_config_json(&ws.db_path())
        .replace("\"PRIMARY KEY\": \"order_id\"", "\"PRIMARY KEY\": \"ghost\"");
    let path = ws.write("config.json", &doc);
    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn table_absent_from_db_config_is_rejected() {
    let ws = TestWorkspace::new();
    let doc = common::orders_config_json(&ws.db_path())
        .replace("\"table_name\": \"orders\"", "\"table_name\": \"invoices\"");
    let path = ws.write("config.json", &doc);
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, StoreError::Config(_)));
}

#[test]
fn view_mapping_round_trips_unchanged() {
    let ws = TestWorkspace::new();
    let original = common::orders_config_json(&ws.db_path());
    let path = ws.write("config.json", &original);
    let config = Config::load(&path).expect("config loads");

    let reserialized = serde_json::to_value(&config).expect("serialize config");
    let parsed: serde_json::Value = serde_json::from_str(&original).expect("parse original");
    assert_eq!(reserialized["view_mapping"], parsed["view_mapping"]);
    assert_eq!(reserialized["header_mapping"], parsed["header_mapping"]);
}
