use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const SCHEMA_VERSION: &str = "1.0";
pub const DEFAULT_HEADER_OFFSET: usize = 1;

/// Column type a field is materialized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum DataType {
    #[default]
    String,
    Int,
    Float,
    Bool,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Bool => "bool",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for DataType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "string" => Ok(DataType::String),
            "int" => Ok(DataType::Int),
            "float" => Ok(DataType::Float),
            "bool" => Ok(DataType::Bool),
            other => Err(format!(
                "unsupported data type '{}' (expected string, int, float or bool)",
                other
            )),
        }
    }
}

/// One column of a sheet. `required`, `default` and `description` are
/// curated by hand and survive reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub name: String,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldEntry {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            required: false,
            default: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub field: String,
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetEntry {
    #[serde(default = "default_header_offset")]
    pub offset_header: usize,
    #[serde(default)]
    pub class_name: String,
    pub sheet_name: String,
    #[serde(default)]
    pub data_class: Vec<FieldEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_rules: Vec<ValidationRule>,
}

impl SheetEntry {
    /// A fresh, uncurated sheet: class name mirrors the sheet name and the
    /// header sits on the first row.
    pub fn new(sheet_name: impl Into<String>) -> Self {
        let sheet_name = sheet_name.into();
        Self {
            offset_header: DEFAULT_HEADER_OFFSET,
            class_name: sheet_name.clone(),
            sheet_name,
            data_class: Vec::new(),
            row_count: None,
            validation_rules: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldEntry> {
        self.data_class.iter().find(|field| field.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub file_name: String,
    pub file_path: String,
    #[serde(default)]
    pub checksum: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub sheets: BTreeMap<String, SheetEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub schema_version: String,
}

impl Default for SchemaMetadata {
    fn default() -> Self {
        Self {
            description: "Generated spreadsheet schema for data conversion".to_string(),
            author: None,
            tags: Vec::new(),
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }
}

/// Root of a persisted schema, keyed by path relative to the scanned folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub metadata: SchemaMetadata,
    #[serde(default)]
    pub files: BTreeMap<String, FileEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for SchemaDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaDocument {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            version: SCHEMA_VERSION.to_string(),
            metadata: SchemaMetadata::default(),
            files: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn file(&self, relative_path: &str) -> Option<&FileEntry> {
        self.files.get(relative_path)
    }

    pub fn insert_file(&mut self, relative_path: impl Into<String>, entry: FileEntry) {
        self.files.insert(relative_path.into(), entry);
    }

    pub fn remove_file(&mut self, relative_path: &str) -> Option<FileEntry> {
        self.files.remove(relative_path)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn sheet_count(&self) -> usize {
        self.files.values().map(|file| file.sheets.len()).sum()
    }

    pub fn field_count(&self) -> usize {
        self.files
            .values()
            .flat_map(|file| file.sheets.values())
            .map(|sheet| sheet.data_class.len())
            .sum()
    }

    pub fn statistics(&self) -> SchemaStatistics {
        let total_rows = self
            .files
            .values()
            .flat_map(|file| file.sheets.values())
            .filter_map(|sheet| sheet.row_count)
            .sum();

        SchemaStatistics {
            file_count: self.file_count(),
            sheet_count: self.sheet_count(),
            field_count: self.field_count(),
            total_rows,
            last_updated: self.updated_at,
            validation_errors: crate::validate::validate_schema(self)
                .err()
                .map(|err| vec![err.to_string()])
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchemaStatistics {
    pub file_count: usize,
    pub sheet_count: usize,
    pub field_count: usize,
    pub total_rows: usize,
    pub last_updated: DateTime<Utc>,
    pub validation_errors: Vec<String>,
}

fn default_header_offset() -> usize {
    DEFAULT_HEADER_OFFSET
}

fn is_false(value: &bool) -> bool {
    !*value
}
