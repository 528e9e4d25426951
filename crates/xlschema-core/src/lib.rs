pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod infer;
pub mod materialize;
pub mod merge;
pub mod model;
pub mod progress;
pub mod reconcile;
pub mod scanner;
pub mod store;
pub mod sync;
pub mod transform;
pub mod validate;
pub mod workbook;

pub use cancel::CancellationToken;
pub use config::AppConfig;
pub use engine::{DataResult, GenerateResult, SchemaEngine, UpdateResult};
pub use error::Error;
pub use progress::{FileOutcome, Phase, ProgressReporter, SilentReporter};
pub use transform::IdPolicy;
