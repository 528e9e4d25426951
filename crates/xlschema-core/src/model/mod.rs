pub mod output;
pub mod schema;

pub use output::{FieldInfo, OutputDocument, OutputMetadata, Record};
pub use schema::{
    DataType, FieldEntry, FileEntry, SchemaDocument, SchemaMetadata, SchemaStatistics,
    SheetEntry, ValidationRule,
};
