use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use formeval_core::config_file::{self, ConfigFile};
use formeval_core::{BatchStats, Config, Lookup, classify, similarity_ratio};
use formeval_reporting::{ExportFormat, export_batch, export_report, write_report};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

mod output;
mod settings;

use output::ColorMode;

/// Form Extraction Evaluator - Score extracted form fields against ground truth
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare one extracted document against its ground truth
    Evaluate {
        /// Ground-truth JSON document
        #[arg(long)]
        expected: PathBuf,

        /// Extracted JSON document
        #[arg(long)]
        actual: PathBuf,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format: json, text, markdown or csv
        #[arg(long)]
        format: Option<String>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Exit with an error when total accuracy is below this percentage
        #[arg(long, value_name = "PCT")]
        fail_under: Option<f64>,
    },

    /// Evaluate every <stem>.expected.json / <stem>.actual.json pair in a directory
    Batch {
        /// Directory holding the document pairs
        dir: PathBuf,

        /// Where to write <stem>.evaluation.<ext> reports (default: the input directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Number of concurrent evaluations
        #[arg(long)]
        workers: Option<usize>,

        /// Report format: json, text, markdown or csv
        #[arg(long)]
        format: Option<String>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Print the similarity ratio of two strings and the status it earns
    Similarity {
        /// Extracted value
        actual: String,

        /// Ground-truth value
        expected: String,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the merged configuration
    Show,
    /// Print the platform config file path
    Path,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let file_config = config_file::load_config();

    match cli.command {
        Command::Evaluate {
            expected,
            actual,
            output,
            format,
            no_color,
            fail_under,
        } => {
            let format = settings::resolve_format(
                format.as_deref(),
                std::env::var(settings::FORMAT_ENV).ok(),
                &file_config,
            )?;
            let color = ColorMode(
                settings::resolve_color(no_color, &file_config) && std::io::stderr().is_terminal(),
            );
            evaluate(&expected, &actual, output, format, color, fail_under)
        }
        Command::Batch {
            dir,
            out_dir,
            workers,
            format,
            no_color,
        } => {
            let format = settings::resolve_format(
                format.as_deref(),
                std::env::var(settings::FORMAT_ENV).ok(),
                &file_config,
            )?;
            let num_workers = settings::resolve_workers(
                workers,
                std::env::var(settings::WORKERS_ENV).ok(),
                &file_config,
            )?;
            let out_dir = settings::resolve_out_dir(out_dir, &file_config, &dir);
            let color = ColorMode(
                settings::resolve_color(no_color, &file_config) && std::io::stdout().is_terminal(),
            );
            batch(&dir, &out_dir, num_workers, format, color).await
        }
        Command::Similarity { actual, expected } => similarity(&actual, &expected),
        Command::Config { action } => show_config(action, &file_config),
    }
}

fn evaluate(
    expected_path: &Path,
    actual_path: &Path,
    out_path: Option<PathBuf>,
    format: ExportFormat,
    color: ColorMode,
    fail_under: Option<f64>,
) -> anyhow::Result<()> {
    let expected = formeval_core::load_document(expected_path)?;
    let actual = formeval_core::load_document(actual_path)?;
    let report = formeval_core::compare(&expected, &actual);

    match out_path {
        Some(ref path) => {
            write_report(&report, format, path)?;
            let mut err = std::io::stderr();
            let title = format!("{} -> {}", actual_path.display(), path.display());
            output::print_summary(&mut err, &title, &report.summary_metrics, color)?;
            output::print_problems(&mut err, &report, color)?;
        }
        None => {
            let mut out = std::io::stdout();
            out.write_all(export_report(&report, format)?.as_bytes())?;
            out.flush()?;
        }
    }

    if let Some(threshold) = fail_under {
        let accuracy = report.summary_metrics.total_accuracy;
        if accuracy < threshold {
            anyhow::bail!("total accuracy {accuracy:.2}% is below the required {threshold:.2}%");
        }
    }
    Ok(())
}

async fn batch(
    dir: &Path,
    out_dir: &Path,
    num_workers: usize,
    format: ExportFormat,
    color: ColorMode,
) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let jobs = formeval_core::discover_pairs(dir)?;
    if jobs.is_empty() {
        println!(
            "No *.expected.json / *.actual.json pairs found in {}",
            dir.display()
        );
        return Ok(());
    }
    let total = jobs.len();

    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} {msg}")
            .context("invalid progress bar template")?
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    let progress_bar = bar.clone();
    let progress_cb = move |event: formeval_core::ProgressEvent| {
        if !matches!(event, formeval_core::ProgressEvent::Evaluating { .. }) {
            progress_bar.inc(1);
        }
        progress_bar.set_message(output::progress_message(&event));
    };

    let cancel = CancellationToken::new();

    // Set up Ctrl+C handler
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let outcomes =
        formeval_core::evaluate_batch(jobs, Config { num_workers }, progress_cb, cancel.clone())
            .await;
    bar.finish_and_clear();

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    for outcome in &outcomes {
        if let Ok(report) = &outcome.result {
            let path = out_dir.join(format!("{}.evaluation.{}", outcome.name, format.extension()));
            write_report(report, format, &path)
                .with_context(|| format!("writing report for {}", outcome.name))?;
        }
    }

    let summary_path = out_dir.join(format!("summary.{}", format.extension()));
    std::fs::write(&summary_path, export_batch(&outcomes, format)?)
        .with_context(|| format!("writing {}", summary_path.display()))?;

    let stats = BatchStats::from_outcomes(&outcomes);
    let mut out = std::io::stdout();
    output::print_batch_summary(&mut out, &outcomes, &stats, color)?;
    writeln!(out, "\nReports written to {}", out_dir.display())?;

    if cancel.is_cancelled() {
        tracing::warn!(done = outcomes.len(), total, "batch cancelled");
        anyhow::bail!("cancelled after {} of {} document pairs", outcomes.len(), total);
    }
    if stats.failed > 0 {
        anyhow::bail!("{} of {} document pairs failed", stats.failed, total);
    }
    Ok(())
}

fn similarity(actual: &str, expected: &str) -> anyhow::Result<()> {
    let ratio = similarity_ratio(actual, expected);
    let actual = Value::String(actual.to_string());
    let status = classify(&Value::String(expected.to_string()), Lookup::Present(&actual));
    println!("ratio:  {ratio:.4}");
    println!("status: {}", status.as_str());
    Ok(())
}

fn show_config(action: ConfigAction, file_config: &ConfigFile) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let text = config_file::to_toml(file_config)?;
            if text.trim().is_empty() {
                println!("# no configuration set");
            } else {
                print!("{text}");
            }
        }
        ConfigAction::Path => match config_file::config_path() {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("could not determine the platform config directory"),
        },
    }
    Ok(())
}
