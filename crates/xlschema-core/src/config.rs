use crate::error::Error;
use crate::infer::DEFAULT_SAMPLE_LIMIT;
use crate::sync::SyncOptions;
use crate::transform::IdPolicy;
use config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excel_folder: Option<PathBuf>,
    pub schema_path: PathBuf,
    pub output_path: PathBuf,
    pub ignore_patterns: Vec<String>,
    pub sample_limit: usize,
    pub missing_id: IdPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            excel_folder: None,
            schema_path: PathBuf::from("schema.yml"),
            output_path: PathBuf::from("output.json"),
            ignore_patterns: Vec::new(),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            missing_id: IdPolicy::default(),
            author: None,
        }
    }
}

impl AppConfig {
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            sample_limit: self.sample_limit,
            ignore_patterns: self.ignore_patterns.clone(),
        }
    }
}

/// Loads an optional `Config.*` file from the working directory, overlaid by
/// `XLSCHEMA_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, Error> {
    let settings = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(environment())
        .build()?;
    Ok(settings.try_deserialize::<AppConfig>()?)
}

/// Like [`load_configuration`] but reads the given file, which must exist.
pub fn load_configuration_from(path: &Path) -> Result<AppConfig, Error> {
    let settings = Config::builder()
        .add_source(ConfigFile::from(path).required(true))
        .add_source(environment())
        .build()?;
    Ok(settings.try_deserialize::<AppConfig>()?)
}

fn environment() -> Environment {
    Environment::with_prefix("XLSCHEMA")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("ignore_patterns")
}
