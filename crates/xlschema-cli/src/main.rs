mod commands;
mod logging;
mod progress;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, FolderArgs, SchemaArgs};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{error, info};
use xlschema_core::model::SchemaDocument;
use xlschema_core::sync::{ChangeReport, SyncSummary};
use xlschema_core::{store, AppConfig, SchemaEngine};

fn main() {
    dotenv().ok();

    let guard = logging::init_logger();

    let config = match xlschema_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            drop(guard);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let result = match args.command {
        Some(Commands::Generate(args)) => run_generate(&config, &args),
        Some(Commands::Update(args)) => run_update(&config, &args),
        Some(Commands::Status(args)) => run_status(&config, &args),
        Some(Commands::Data { folder, output }) => run_data(&config, &folder, output),
        Some(Commands::Merge {
            base,
            additional,
            output,
        }) => run_merge(&config, &base, &additional, output),
        Some(Commands::Validate(args)) => run_validate(&config, &args),
        Some(Commands::Stats(args)) => run_stats(&config, &args),
        Some(Commands::PrintConfig) => print_config(&config),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        drop(guard);
        process::exit(1);
    }
}

fn resolve_folder(config: &AppConfig, folder: &Option<PathBuf>) -> anyhow::Result<PathBuf> {
    folder
        .clone()
        .or_else(|| config.excel_folder.clone())
        .context("No spreadsheet folder given: pass --folder or set excel_folder in Config.toml")
}

fn resolve_schema(config: &AppConfig, schema: &Option<PathBuf>) -> PathBuf {
    schema.clone().unwrap_or_else(|| config.schema_path.clone())
}

fn load_schema(path: &Path) -> anyhow::Result<SchemaDocument> {
    store::load_schema(path).with_context(|| format!("Failed to load schema {}", path.display()))
}

fn run_generate(config: &AppConfig, args: &FolderArgs) -> anyhow::Result<()> {
    let folder = resolve_folder(config, &args.folder)?;
    let schema_path = resolve_schema(config, &args.schema);

    let engine = SchemaEngine::new(config.clone());
    let reporter = CliReporter::new();
    let result = engine.generate_schema(&folder, &reporter)?;
    store::save_schema(&result.schema, &schema_path)?;

    println!();
    print_sync_summary(&result.summary, result.duration.as_secs_f64());
    info!(
        "Schema with {} files and {} sheets written to {}",
        format!("{}", result.schema.file_count()).cyan(),
        format!("{}", result.schema.sheet_count()).cyan(),
        schema_path.display()
    );
    Ok(())
}

fn run_update(config: &AppConfig, args: &FolderArgs) -> anyhow::Result<()> {
    let folder = resolve_folder(config, &args.folder)?;
    let schema_path = resolve_schema(config, &args.schema);
    let mut schema = load_schema(&schema_path)?;

    let engine = SchemaEngine::new(config.clone());
    let reporter = CliReporter::new();
    let result = engine.update_schema(&mut schema, &folder, &reporter)?;
    store::save_schema(&schema, &schema_path)?;

    println!();
    print_sync_summary(&result.summary, result.duration.as_secs_f64());
    Ok(())
}

fn run_status(config: &AppConfig, args: &FolderArgs) -> anyhow::Result<()> {
    let folder = resolve_folder(config, &args.folder)?;
    let schema = load_schema(&resolve_schema(config, &args.schema))?;

    let engine = SchemaEngine::new(config.clone());
    let report = engine.detect_changes(&schema, &folder)?;
    print_change_report(&report);
    Ok(())
}

fn run_data(config: &AppConfig, args: &FolderArgs, output: Option<PathBuf>) -> anyhow::Result<()> {
    let folder = resolve_folder(config, &args.folder)?;
    let schema = load_schema(&resolve_schema(config, &args.schema))?;
    let output_path = output.unwrap_or_else(|| config.output_path.clone());

    let engine = SchemaEngine::new(config.clone());
    let reporter = CliReporter::new();
    let result = engine.generate_data(&schema, &folder, &reporter)?;
    store::save_output(&result.output, &output_path)?;

    println!();
    info!(
        "Data: {}, {} classes, {} records written to {}",
        format!("{:.2}s", result.duration.as_secs_f64()).green(),
        format!("{}", result.output.class_count()).cyan(),
        format!("{}", result.output.metadata.record_count).cyan(),
        output_path.display()
    );
    Ok(())
}

fn run_merge(
    config: &AppConfig,
    base: &Path,
    additional: &Path,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let base_schema = load_schema(base)?;
    let additional_schema = load_schema(additional)?;
    let output_path = output.unwrap_or_else(|| config.schema_path.clone());

    let engine = SchemaEngine::new(config.clone());
    let merged = engine.merge_schemas(&base_schema, &additional_schema)?;
    store::save_schema(&merged, &output_path)?;

    info!(
        "Merged schema with {} files written to {}",
        format!("{}", merged.file_count()).cyan(),
        output_path.display()
    );
    Ok(())
}

fn run_validate(config: &AppConfig, args: &SchemaArgs) -> anyhow::Result<()> {
    let schema_path = resolve_schema(config, &args.schema);
    let schema = load_schema(&schema_path)?;

    let engine = SchemaEngine::new(config.clone());
    let stats = engine.validate(&schema)?;
    println!(
        "{} {} ({} files, {} sheets, {} fields)",
        "✓".green(),
        format!("{} is valid", schema_path.display()).bold(),
        stats.file_count,
        stats.sheet_count,
        stats.field_count
    );
    Ok(())
}

fn run_stats(config: &AppConfig, args: &SchemaArgs) -> anyhow::Result<()> {
    let schema = load_schema(&resolve_schema(config, &args.schema))?;
    let stats = schema.statistics();

    println!("{:<14}{}", "Files:", stats.file_count.to_string().cyan());
    println!("{:<14}{}", "Sheets:", stats.sheet_count.to_string().cyan());
    println!("{:<14}{}", "Fields:", stats.field_count.to_string().cyan());
    println!("{:<14}{}", "Rows:", stats.total_rows.to_string().cyan());
    println!("{:<14}{}", "Last updated:", stats.last_updated.to_rfc3339());
    if stats.validation_errors.is_empty() {
        println!("{:<14}{}", "Validation:", "ok".green());
    } else {
        for message in &stats.validation_errors {
            println!("{:<14}{}", "Validation:", message.red());
        }
    }
    Ok(())
}

fn print_config(config: &AppConfig) -> anyhow::Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}

fn print_sync_summary(summary: &SyncSummary, duration_secs: f64) {
    info!(
        "Sync: {}, {} added, {} updated, {} unchanged, {} removed, {} skipped",
        format!("{:.2}s", duration_secs).green(),
        format!("{}", summary.added).green(),
        format!("{}", summary.updated).yellow(),
        format!("{}", summary.unchanged),
        format!("{}", summary.removed).red(),
        format!("{}", summary.skipped).red(),
    );
}

fn print_change_report(report: &ChangeReport) {
    for path in &report.new {
        println!("  {} {}", "new:    ".green(), path);
    }
    for path in &report.changed {
        println!("  {} {}", "changed:".yellow(), path);
    }
    for path in &report.removed {
        println!("  {} {}", "removed:".red(), path);
    }

    if report.has_changes() {
        println!(
            "{} new, {} changed, {} removed, {} unchanged",
            report.new.len(),
            report.changed.len(),
            report.removed.len(),
            report.unchanged.len()
        );
    } else {
        println!(
            "{} ({} files unchanged)",
            "Schema is up to date".green(),
            report.unchanged.len()
        );
    }
}
