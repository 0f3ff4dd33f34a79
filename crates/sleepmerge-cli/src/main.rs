//! sleepmerge CLI: convert device exports and merge them into the sleep history.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sleepmerge_core::config::{load_config_file, PipelineConfig, PublishConfig};
use sleepmerge_core::manifest::{PublishOutcome, RunManifest};
use sleepmerge_exec::{Engine, HistoryStore};
use sleepmerge_ops::audit::audit_history;
use sleepmerge_ops::convert::{convert_batch, ConvertOptions};
use sleepmerge_ops::TimestampKey;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "sleepmerge")]
#[command(about = "Convert sleep-stage exports and merge them into a de-duplicated history", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Location flags shared by the store-facing subcommands.
#[derive(Args, Debug, Default, Clone)]
struct PathArgs {
    /// YAML config file (applied over SLEEPMERGE_* environment variables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory with the raw export files
    #[arg(long)]
    input_dir: Option<String>,

    /// Directory receiving converted files and the combined batch
    #[arg(long)]
    converted_dir: Option<String>,

    /// Directory holding the delta output, history and archive snapshots
    #[arg(long)]
    store_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert, merge and publish in one pass
    Run {
        #[command(flatten)]
        paths: PathArgs,

        /// Copy the delta output into this directory after the run
        #[arg(long, conflicts_with_all = ["publish_cmd", "no_publish"])]
        publish_dir: Option<String>,

        /// Run this command with the delta output path appended
        #[arg(long, conflicts_with = "no_publish")]
        publish_cmd: Option<String>,

        /// Do not publish, whatever the config says
        #[arg(long)]
        no_publish: bool,

        /// Append the run manifest to this JSONL file
        #[arg(long)]
        run_log: Option<String>,

        /// Print the run manifest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert every export in a directory (no merge)
    Convert {
        /// Directory with the raw export files
        input_dir: PathBuf,

        /// Directory for converted files and the combined batch
        output_dir: PathBuf,

        /// File name of the combined batch
        #[arg(long, default_value = "combined.csv")]
        combined: String,
    },

    /// Merge an already converted batch into the history
    Merge {
        #[command(flatten)]
        paths: PathArgs,

        /// Batch file (defaults to <converted_dir>/<combined_name>)
        #[arg(long)]
        batch: Option<PathBuf>,

        /// Print the run manifest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a config file without touching any data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Summarize the stored history and check its invariants
    Inspect {
        #[command(flatten)]
        paths: PathArgs,

        /// Print the audit as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            paths,
            publish_dir,
            publish_cmd,
            no_publish,
            run_log,
            json,
        } => run_pipeline(&paths, publish_dir, publish_cmd, no_publish, run_log, json),
        Commands::Convert {
            input_dir,
            output_dir,
            combined,
        } => convert_only(input_dir, output_dir, combined),
        Commands::Merge { paths, batch, json } => merge_only(&paths, batch, json),
        Commands::Validate { config } => validate_config(&config),
        Commands::Inspect { paths, json } => inspect_history(&paths, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Defaults → environment → config file → flags.
fn resolve_config(paths: &PathArgs) -> CliResult<PipelineConfig> {
    let mut config = PipelineConfig::from_env();
    if let Some(path) = &paths.config {
        config.apply_file(&load_config_file(path)?);
    }
    apply_path_overrides(&mut config, paths);
    tracing::debug!(
        input = %config.input_dir,
        converted = %config.converted_dir,
        store = %config.store_dir,
        "resolved configuration"
    );
    Ok(config)
}

fn apply_path_overrides(cfg: &mut PipelineConfig, paths: &PathArgs) {
    if let Some(dir) = &paths.input_dir {
        cfg.input_dir = dir.clone();
    }
    if let Some(dir) = &paths.converted_dir {
        cfg.converted_dir = dir.clone();
    }
    if let Some(dir) = &paths.store_dir {
        cfg.store_dir = dir.clone();
    }
}

fn apply_publish_overrides(
    cfg: &mut PipelineConfig,
    publish_dir: Option<String>,
    publish_cmd: Option<String>,
    no_publish: bool,
) {
    if no_publish {
        cfg.publish = PublishConfig::None;
    } else if let Some(dir) = publish_dir {
        cfg.publish = PublishConfig::Directory { dir };
    } else if let Some(cmd) = publish_cmd {
        let mut words = cmd.split_whitespace().map(str::to_string);
        if let Some(program) = words.next() {
            cfg.publish = PublishConfig::Command {
                program,
                args: words.collect(),
            };
        }
    }
}

fn run_pipeline(
    paths: &PathArgs,
    publish_dir: Option<String>,
    publish_cmd: Option<String>,
    no_publish: bool,
    run_log: Option<String>,
    json: bool,
) -> CliResult<()> {
    let mut config = resolve_config(paths)?;
    apply_publish_overrides(&mut config, publish_dir, publish_cmd, no_publish);
    if let Some(log) = run_log {
        config.run_log = Some(log);
    }

    let manifest = Engine::new(config)?.run()?;
    print_manifest(&manifest, json)
}

fn convert_only(input_dir: PathBuf, output_dir: PathBuf, combined: String) -> CliResult<()> {
    let config = PipelineConfig::from_env();
    let opts = ConvertOptions {
        input_dir,
        output_dir,
        combined_name: combined,
        ..ConvertOptions::from_config(&config)
    };
    let report = convert_batch(&opts)?;
    let stats = report.stats();

    println!("✓ Converted {} file(s)", stats.files_processed);
    println!("  Rows: {}", stats.rows_converted);
    println!("  Skipped rows: {}", stats.rows_skipped);
    for failure in &report.failures {
        println!("  Failed: {} ({})", failure.input.display(), failure.error);
    }
    println!("  Combined: {}", report.combined_path.display());
    Ok(())
}

fn merge_only(paths: &PathArgs, batch: Option<PathBuf>, json: bool) -> CliResult<()> {
    let config = resolve_config(paths)?;
    let batch = batch.unwrap_or_else(|| config.layout().batch_path);
    let manifest = Engine::new(config)?.merge_only(&batch)?;
    print_manifest(&manifest, json)
}

fn validate_config(path: &Path) -> CliResult<()> {
    let mut config = PipelineConfig::from_env();
    config.apply_file(&load_config_file(path)?);
    config.validate()?;
    println!("✓ Config is valid");
    Ok(())
}

fn inspect_history(paths: &PathArgs, json: bool) -> CliResult<()> {
    let config = resolve_config(paths)?;
    config.validate()?;
    let store = HistoryStore::from_config(&config);
    let history_path = store.layout().history_path.clone();
    let Some(history) = store.load_history()? else {
        return Err(format!("no history at {}", history_path.display()).into());
    };
    let audit = audit_history(&history, &TimestampKey::from_config(&config));

    if json {
        println!("{}", serde_json::to_string_pretty(&audit)?);
    } else {
        println!("History: {}", history_path.display());
        println!("  Columns: {}", history.header.columns.join(", "));
        println!("  Rows: {}", audit.rows);
        if let (Some(first), Some(last)) = (&audit.first_timestamp, &audit.last_timestamp) {
            println!("  Range: {} .. {}", first, last);
        }
        println!("  Duplicate rows: {}", audit.duplicate_rows);
        println!("  Out-of-order pairs: {}", audit.out_of_order);
        println!("  Unparsable timestamps: {}", audit.unparsable_timestamps);
    }

    if !audit.is_healthy() {
        return Err("history violates its invariants".into());
    }
    Ok(())
}

fn print_manifest(manifest: &RunManifest, json: bool) -> CliResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(manifest)?);
        return Ok(());
    }

    println!("✓ Run {} finished", manifest.id.0);
    println!(
        "  Duration: {}ms",
        manifest.finished_ms.saturating_sub(manifest.started_ms)
    );
    if let Some(convert) = &manifest.convert {
        println!(
            "  Converted: {} file(s), {} row(s), {} skipped, {} failed file(s)",
            convert.files_processed, convert.rows_converted, convert.rows_skipped, convert.files_failed
        );
    }
    match &manifest.merge {
        Some(merge) => {
            println!(
                "  Merged: {} new row(s), history {} → {}",
                merge.delta_rows, merge.history_rows_before, merge.history_rows_after
            );
            if let Some(archive) = &manifest.archived_to {
                println!("  Archived previous delta: {}", archive);
            }
            if let Some(digest) = &manifest.history_digest {
                println!("  History digest: {}", digest);
            }
        }
        None => println!("  Merge skipped"),
    }
    match &manifest.publish {
        Some(PublishOutcome::Published { publisher, path }) => {
            println!("  Published {} via {}", path, publisher)
        }
        Some(PublishOutcome::Failed { publisher, error }) => {
            println!("  Publish via {} failed: {}", publisher, error)
        }
        Some(PublishOutcome::Skipped { reason }) => println!("  Publish skipped: {}", reason),
        None => {}
    }
    Ok(())
}
