use super::schema::{DataType, FieldEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One materialized row: field name to typed JSON value, in field order.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    #[serde(rename = "dataType")]
    pub data_type: DataType,
}

impl From<&FieldEntry> for FieldInfo {
    fn from(field: &FieldEntry) -> Self {
        Self {
            name: field.name.clone(),
            data_type: field.data_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMetadata {
    pub generated_at: DateTime<Utc>,
    pub schema_version: String,
    pub generator: String,
    pub file_count: usize,
    pub record_count: usize,
}

/// Materialized dataset, grouped by class name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    pub metadata: OutputMetadata,
    pub schema: BTreeMap<String, Vec<FieldInfo>>,
    pub data: BTreeMap<String, Vec<Record>>,
}

impl OutputDocument {
    pub fn new(schema_version: impl Into<String>) -> Self {
        Self {
            metadata: OutputMetadata {
                generated_at: Utc::now(),
                schema_version: schema_version.into(),
                generator: format!("xlschema v{}", env!("CARGO_PKG_VERSION")),
                file_count: 0,
                record_count: 0,
            },
            schema: BTreeMap::new(),
            data: BTreeMap::new(),
        }
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.schema.contains_key(class_name)
    }

    /// Records the field layout for a class the first time it is seen;
    /// later registrations for the same class are ignored.
    pub fn register_class(&mut self, class_name: &str, fields: Vec<FieldInfo>) -> bool {
        if self.has_class(class_name) {
            return false;
        }
        self.schema.insert(class_name.to_string(), fields);
        true
    }

    /// Appends records to a class. Records from several sheets sharing a
    /// class name accumulate; nothing is deduplicated.
    pub fn append_records(&mut self, class_name: &str, records: Vec<Record>) {
        self.data
            .entry(class_name.to_string())
            .or_default()
            .extend(records);
    }

    pub fn class_count(&self) -> usize {
        self.schema.len()
    }

    pub fn total_record_count(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }
}
