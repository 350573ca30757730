#![forbid(unsafe_code)]

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;

use buildward_config::Settings;
use buildward_engine::{CiContext, FailedTask, PublishOptions, PublishSummary};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(
    name = "buildward",
    about = "Daemon-argument checks and CI report export for multi-project Gradle builds"
)]
#[command(version)]
struct Cli {
    /// Show debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fail if the daemon JVM arguments differ between property files
    Check {
        /// Build root holding buildward.toml (defaults to the current directory)
        #[arg(long)]
        root: Option<PathBuf>,
        /// Property to compare (defaults to org.gradle.jvmargs)
        #[arg(long)]
        key: Option<String>,
        /// Property file to compare; repeat for each file
        #[arg(long = "file", value_name = "FILE")]
        files: Vec<PathBuf>,
    },
    /// Export one report into the shared CI artifact directory
    Package {
        /// Name of the project that owns the report
        #[arg(long)]
        project: String,
        /// Report directory or file
        #[arg(long)]
        report: PathBuf,
        /// Destination directory (defaults to [reports] destination)
        #[arg(long)]
        dest: Option<PathBuf>,
        /// Build root holding buildward.toml (defaults to the current directory)
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Export the reports of failed reporting tasks when running on CI
    Publish {
        /// Build root holding buildward.toml (defaults to the current directory)
        #[arg(long)]
        root: Option<PathBuf>,
        /// A reporting task that failed; repeat for each task
        #[arg(long = "failed", value_name = "PROJECT:TASK")]
        failed: Vec<String>,
        /// Publish even when no CI environment is detected
        #[arg(long)]
        force: bool,
        /// Print the result as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Show the detected CI execution context
    Ci {
        /// Build root holding buildward.toml (defaults to the current directory)
        #[arg(long)]
        root: Option<PathBuf>,
        /// Print the context as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Check { root, key, files } => cmd_check(root, key, &files),
        Command::Package {
            project,
            report,
            dest,
            root,
        } => cmd_package(&project, &report, dest, root),
        Command::Publish {
            root,
            failed,
            force,
            json,
        } => cmd_publish(root, &failed, force, json),
        Command::Ci { root, json } => cmd_ci(root, json),
    };

    if let Err(msg) = result {
        eprintln!("error: {msg}");
        process::exit(1);
    }
}

/// Route `tracing` output to stderr; `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Resolve `--root`, defaulting to the current directory.
fn build_root(root: Option<PathBuf>) -> Result<PathBuf, Box<dyn Error>> {
    let cwd = std::env::current_dir()?;
    Ok(match root {
        Some(r) => cwd.join(r),
        None => cwd,
    })
}

fn cmd_check(root: Option<PathBuf>, key: Option<String>, files: &[PathBuf]) -> CliResult {
    let cwd = std::env::current_dir()?;
    let root = build_root(root)?;
    let settings = Settings::load(&root)?;
    let files: Vec<PathBuf> = files.iter().map(|f| cwd.join(f)).collect();
    check(&root, &settings, key, &files)
}

fn check(root: &Path, settings: &Settings, key: Option<String>, files: &[PathBuf]) -> CliResult {
    let mut daemon = settings.daemon.clone();
    if let Some(key) = key {
        daemon.key = key;
    }
    if !files.is_empty() {
        if files.len() < 2 {
            return Err("pass --file at least twice to compare property files".into());
        }
        daemon.files = files.to_vec();
    }

    let report = buildward_engine::check_same_daemon_args(root, &daemon)?;
    tracing::info!(
        key = %report.key,
        value = ?report.agreed_value(),
        files = report.observed.len(),
        "property files agree"
    );
    Ok(())
}

fn cmd_package(
    project: &str,
    report: &Path,
    dest: Option<PathBuf>,
    root: Option<PathBuf>,
) -> CliResult {
    let root = build_root(root)?;
    let cwd = std::env::current_dir()?;
    let destination = match dest {
        Some(d) => cwd.join(d),
        None => root.join(Settings::load(&root)?.reports.destination),
    };

    let artifact = buildward_engine::ReportArtifact::inspect(project, &cwd.join(report))?;
    let exported = buildward_engine::prepare_report_for_ci_publishing(&artifact, &destination)?;
    eprintln!("    Exported {}", exported.path.display());
    Ok(())
}

fn cmd_publish(root: Option<PathBuf>, failed: &[String], force: bool, json: bool) -> CliResult {
    let root = build_root(root)?;
    let settings = Settings::load(&root)?;
    let ci = CiContext::from_env(&settings.ci);
    publish(&root, &settings, ci, failed, force, json)
}

fn publish(
    root: &Path,
    settings: &Settings,
    ci: CiContext,
    failed: &[String],
    force: bool,
    json: bool,
) -> CliResult {
    let failed = failed
        .iter()
        .map(|spec| spec.parse::<FailedTask>())
        .collect::<Result<Vec<_>, _>>()?;
    let options = PublishOptions { force, failed };

    let summary = buildward_engine::publish_failed_reports(root, settings, ci, &options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    let report = match summary {
        PublishSummary::Skipped { reason } => {
            if !json {
                eprintln!("    Skipped report publishing: {reason}");
            }
            return Ok(());
        }
        PublishSummary::Ran(report) => report,
    };

    if !json {
        for exported in &report.exported {
            eprintln!(
                "    Exported {} ({})",
                exported.path.display(),
                exported.sha256.get(..12).unwrap_or(&exported.sha256)
            );
        }
        for skipped in &report.skipped {
            eprintln!(
                "    Skipped {}:{}: {} ({})",
                skipped.project,
                skipped.task,
                skipped.reason,
                skipped.path.display()
            );
        }
        for failure in &report.failed {
            eprintln!("  [!!] {}:{}: {}", failure.project, failure.task, failure.message);
        }
        eprintln!(
            "    Published {} report(s) to {}",
            report.exported.len(),
            report.destination.display()
        );
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(format!("{} report(s) could not be exported", report.failed.len()).into())
    }
}

fn cmd_ci(root: Option<PathBuf>, json: bool) -> CliResult {
    let root = build_root(root)?;
    let settings = Settings::load(&root)?;
    let ci = CiContext::from_env(&settings.ci);

    if json {
        println!("{}", serde_json::to_string_pretty(&ci)?);
        return Ok(());
    }

    if ci.is_ci {
        eprintln!("  [ok] CI server detected (${} is set)", settings.ci.marker);
    } else {
        eprintln!("  [--] Not on CI (${} is not set)", settings.ci.marker);
    }
    let quality = if ci.code_quality_enabled {
        "enabled"
    } else {
        "disabled"
    };
    eprintln!("  [--] Code quality checks: {quality}");
    Ok(())
}
