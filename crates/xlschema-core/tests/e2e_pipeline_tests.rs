use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::tempdir;
use xlschema_core::model::DataType;
use xlschema_core::store;
use xlschema_core::workbook::InMemoryReader;
use xlschema_core::{AppConfig, Error, SchemaEngine, SilentReporter};

const INVENTORY: &[&[&str]] = &[
    &["Id", "Name", "Price"],
    &["1", "Widget", "9.99"],
    &["2", "Gadget", "14.5"],
];

const ORDERS: &[&[&str]] = &[
    &["Order", "Qty", "Paid"],
    &["A-1", "3", "1"],
    &["", "", ""],
    &["A-2", "5", "0"],
];

/// Layout:
///   sheets/
///     inventory.xlsx       (Items)
///     sub/orders.xlsx      (Orders)
///     ~$inventory.xlsx     lock file, never scanned
///     notes.txt            not a spreadsheet
///
/// The files on disk only carry bytes for fingerprinting; sheet content
/// comes from the in-memory reader.
fn create_test_folder(root: &Path) {
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("inventory.xlsx"), "inventory v1").unwrap();
    fs::write(root.join("sub/orders.xlsx"), "orders v1").unwrap();
    fs::write(root.join("~$inventory.xlsx"), "lock").unwrap();
    fs::write(root.join("notes.txt"), "ignore me").unwrap();
}

fn engine_for(root: &Path, inventory: &[&[&str]], orders: Option<&[&[&str]]>) -> SchemaEngine {
    let mut reader = InMemoryReader::new().with_sheet(root.join("inventory.xlsx"), "Items", inventory);
    if let Some(orders) = orders {
        reader = reader.with_sheet(root.join("sub/orders.xlsx"), "Orders", orders);
    }
    SchemaEngine::new(AppConfig::default()).with_reader(Arc::new(reader))
}

fn field_names(schema: &xlschema_core::model::SchemaDocument, file: &str, sheet: &str) -> Vec<String> {
    schema.file(file).unwrap().sheets[sheet]
        .data_class
        .iter()
        .map(|f| f.name.clone())
        .collect()
}

#[test]
fn test_generate_infers_types_and_skips_non_workbooks() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("sheets");
    create_test_folder(&root);

    let result = engine_for(&root, INVENTORY, Some(ORDERS))
        .generate_schema(&root, &SilentReporter)
        .unwrap();
    let schema = result.schema;

    assert_eq!(result.summary.added, 2);
    assert_eq!(
        schema.files.keys().cloned().collect::<Vec<_>>(),
        vec!["inventory.xlsx".to_string(), "sub/orders.xlsx".to_string()]
    );

    let items = &schema.file("inventory.xlsx").unwrap().sheets["Items"];
    assert_eq!(items.class_name, "Items");
    assert_eq!(items.offset_header, 1);
    assert_eq!(items.row_count, Some(2));
    let types: Vec<DataType> = items.data_class.iter().map(|f| f.data_type).collect();
    assert_eq!(types, vec![DataType::Int, DataType::String, DataType::Float]);

    let orders = &schema.file("sub/orders.xlsx").unwrap().sheets["Orders"];
    assert_eq!(orders.field("Paid").unwrap().data_type, DataType::Bool);
    assert_eq!(orders.field("Qty").unwrap().data_type, DataType::Int);
    assert_eq!(orders.row_count, Some(2));
}

#[test]
fn test_update_on_unchanged_folder_is_idempotent() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("sheets");
    create_test_folder(&root);
    let schema_path = tmp.path().join("out/schema.yml");

    let engine = engine_for(&root, INVENTORY, Some(ORDERS));
    let generated = engine.generate_schema(&root, &SilentReporter).unwrap().schema;
    store::save_schema(&generated, &schema_path).unwrap();

    let mut reloaded = store::load_schema(&schema_path).unwrap();
    let result = engine.update_schema(&mut reloaded, &root, &SilentReporter).unwrap();

    assert_eq!(result.summary.unchanged, 2);
    assert_eq!(result.summary.added + result.summary.updated + result.summary.removed, 0);

    let mut normalized = reloaded.clone();
    normalized.updated_at = generated.updated_at;
    assert_eq!(
        serde_yaml::to_string(&normalized).unwrap(),
        serde_yaml::to_string(&generated).unwrap()
    );
}

#[test]
fn test_update_keeps_curation_and_tracks_file_changes() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("sheets");
    create_test_folder(&root);

    let mut schema = engine_for(&root, INVENTORY, Some(ORDERS))
        .generate_schema(&root, &SilentReporter)
        .unwrap()
        .schema;

    {
        let items = schema
            .files
            .get_mut("inventory.xlsx")
            .unwrap()
            .sheets
            .get_mut("Items")
            .unwrap();
        items.class_name = "Product".to_string();
        let price = items.data_class.iter_mut().find(|f| f.name == "Price").unwrap();
        price.required = true;
        price.description = Some("Unit price in EUR".to_string());
    }

    // Name column dropped, Stock added, and every Price now reads as text.
    fs::write(root.join("inventory.xlsx"), "inventory v2").unwrap();
    fs::remove_file(root.join("sub/orders.xlsx")).unwrap();
    let edited: &[&[&str]] = &[
        &["Id", "Price", "Stock"],
        &["1", "n/a", "4"],
        &["2", "n/a", "7"],
    ];

    let engine = engine_for(&root, edited, None);
    let report = engine.detect_changes(&schema, &root).unwrap();
    assert_eq!(report.changed, vec!["inventory.xlsx".to_string()]);
    assert_eq!(report.removed, vec!["sub/orders.xlsx".to_string()]);

    let result = engine.update_schema(&mut schema, &root, &SilentReporter).unwrap();
    assert_eq!(result.summary.updated, 1);
    assert_eq!(result.summary.removed, 1);
    assert!(schema.file("sub/orders.xlsx").is_none());

    assert_eq!(field_names(&schema, "inventory.xlsx", "Items"), vec!["Id", "Price", "Stock"]);
    let items = &schema.file("inventory.xlsx").unwrap().sheets["Items"];
    assert_eq!(items.class_name, "Product");
    let price = items.field("Price").unwrap();
    assert_eq!(price.data_type, DataType::Float);
    assert!(price.required);
    assert_eq!(price.description.as_deref(), Some("Unit price in EUR"));
    assert_eq!(items.field("Stock").unwrap().data_type, DataType::Int);

    let after = engine.detect_changes(&schema, &root).unwrap();
    assert!(!after.has_changes());
}

#[test]
fn test_data_materializes_typed_records() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("sheets");
    create_test_folder(&root);
    let output_path = tmp.path().join("out/output.json");

    let engine = engine_for(&root, INVENTORY, Some(ORDERS));
    let schema = engine.generate_schema(&root, &SilentReporter).unwrap().schema;
    let output = engine.generate_data(&schema, &root, &SilentReporter).unwrap().output;

    let items: Vec<Value> = output.data["Items"].iter().cloned().map(Value::Object).collect();
    assert_eq!(
        items,
        vec![
            json!({"Id": 1, "Name": "Widget", "Price": 9.99}),
            json!({"Id": 2, "Name": "Gadget", "Price": 14.5}),
        ]
    );

    let orders: Vec<Value> = output.data["Orders"].iter().cloned().map(Value::Object).collect();
    assert_eq!(
        orders,
        vec![
            json!({"Id": 0, "Order": "A-1", "Qty": 3, "Paid": true}),
            json!({"Id": 1, "Order": "A-2", "Qty": 5, "Paid": false}),
        ]
    );
    let order_fields: Vec<&str> = output.schema["Orders"].iter().map(|f| f.name.as_str()).collect();
    assert_eq!(order_fields, vec!["Id", "Order", "Qty", "Paid"]);

    assert_eq!(output.metadata.file_count, 2);
    assert_eq!(output.metadata.record_count, 4);
    assert_eq!(output.metadata.schema_version, "1.0");

    store::save_output(&output, &output_path).unwrap();
    let text = fs::read_to_string(&output_path).unwrap();
    assert!(text.contains("\"dataType\": \"float\""));
    let reloaded = store::load_output(&output_path).unwrap();
    assert_eq!(reloaded.metadata.record_count, 4);
}

#[test]
fn test_unparseable_price_falls_back_to_raw_text() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("sheets");
    create_test_folder(&root);

    let schema = engine_for(&root, INVENTORY, Some(ORDERS))
        .generate_schema(&root, &SilentReporter)
        .unwrap()
        .schema;

    let edited: &[&[&str]] = &[
        &["Id", "Name", "Price"],
        &["1", "Widget", "free"],
        &["2", "Gadget", "14.5"],
    ];
    let output = engine_for(&root, edited, Some(ORDERS))
        .generate_data(&schema, &root, &SilentReporter)
        .unwrap()
        .output;

    assert_eq!(output.data["Items"][0]["Price"], json!("free"));
    assert_eq!(output.data["Items"][1]["Price"], json!(14.5));
}

#[test]
fn test_generate_on_folder_without_workbooks() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("readme.md"), "nothing here").unwrap();

    let result = engine_for(tmp.path(), INVENTORY, None).generate_schema(tmp.path(), &SilentReporter);
    assert!(matches!(result, Err(Error::NoWorkbooks { .. })));
}

#[test]
fn test_unreadable_workbook_is_skipped() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("sheets");
    create_test_folder(&root);

    // orders.xlsx exists on disk but the reader cannot open it.
    let result = engine_for(&root, INVENTORY, None)
        .generate_schema(&root, &SilentReporter)
        .unwrap();
    assert_eq!(result.summary.added, 1);
    assert_eq!(result.summary.skipped, 1);
    assert!(result.schema.file("sub/orders.xlsx").is_none());
}

#[test]
fn test_merge_and_validate_through_engine() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("sheets");
    create_test_folder(&root);

    let engine = engine_for(&root, INVENTORY, Some(ORDERS));
    let full = engine.generate_schema(&root, &SilentReporter).unwrap().schema;
    let mut partial = full.clone();
    partial.remove_file("sub/orders.xlsx");

    let merged = engine.merge_schemas(&partial, &full).unwrap();
    assert_eq!(merged.file_count(), 2);

    let stats = engine.validate(&merged).unwrap();
    assert_eq!(stats.file_count, 2);
    assert_eq!(stats.sheet_count, 2);
    assert_eq!(stats.field_count, 6);
    assert_eq!(stats.total_rows, 4);
    assert!(stats.validation_errors.is_empty());
}
