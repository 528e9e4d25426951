use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "xlschema")]
#[command(version, about = "Spreadsheet folders to curated YAML schemas and typed JSON data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build a new schema from every spreadsheet in a folder
    Generate(FolderArgs),
    /// Rescan a folder and bring an existing schema up to date
    Update(FolderArgs),
    /// Show which spreadsheets are new, changed or removed since the schema was written
    Status(FolderArgs),
    /// Materialize typed JSON records using a schema
    Data {
        #[command(flatten)]
        folder: FolderArgs,
        /// Output JSON path (defaults to output_path from configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge two schema files into one
    Merge {
        /// Schema used as the starting point
        base: PathBuf,
        /// Schema whose files and sheets are merged in
        additional: PathBuf,
        /// Where to write the merged schema (defaults to schema_path from configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a schema for structural problems
    Validate(SchemaArgs),
    /// Print file, sheet, field and row counts for a schema
    Stats(SchemaArgs),
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Clone, Args)]
pub struct FolderArgs {
    /// Folder containing the spreadsheets (defaults to excel_folder from configuration)
    #[arg(short, long)]
    pub folder: Option<PathBuf>,
    /// Schema file path (defaults to schema_path from configuration)
    #[arg(short, long)]
    pub schema: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct SchemaArgs {
    /// Schema file path (defaults to schema_path from configuration)
    #[arg(short, long)]
    pub schema: Option<PathBuf>,
}
