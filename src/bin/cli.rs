//! coursewatch CLI
//!
//! Local execution entry point, typically run from cron every few minutes.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use coursewatch::{
    error::Result,
    models::{Config, WatchEntry, active_entries},
    pipeline,
    storage::{LocalStorage, LogHistory},
    utils::console::Printer,
};
use log::LevelFilter;

/// coursewatch - LMS change monitor
#[derive(Parser, Debug)]
#[command(
    name = "coursewatch",
    version,
    about = "Watches Moodle courses and notifications for changes"
)]
struct Cli {
    /// Path to storage directory containing config, watch list and snapshots
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Config file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one monitoring pass and append it to the history
    Run,

    /// Structurally diff two JSON snapshot files
    Diff {
        old: PathBuf,
        new: PathBuf,

        /// Save the change records as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Extra exclusion pattern, e.g. `root['fetched_at']` or `grades.*.grade`
        #[arg(short = 'x', long = "exclude")]
        exclude: Vec<String>,
    },

    /// Report notifications present in NEW but not in OLD
    DiffNotifications {
        old: PathBuf,
        new: PathBuf,

        /// Save the change records as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Clean a raw course fetch into a comparable snapshot
    Clean { input: PathBuf, output: PathBuf },

    /// List enrolled courses
    Courses {
        /// Save the courses as the watch list (all active)
        #[arg(long)]
        write_watchlist: bool,
    },

    /// Show recent monitoring runs
    History {
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Validate configuration and watch list
    Validate,
}

/// Initialize logging before anything else can fail.
///
/// Returns whether the config file may still pick the level, which is the
/// case unless `--verbose` or `RUST_LOG` already did.
fn init_logging(verbose: bool) -> bool {
    let from_env = std::env::var_os("RUST_LOG").is_some();
    let configurable = !verbose && !from_env;
    // The filter stays open when the config decides; the max level gates instead.
    let default = if configurable { "trace" } else { "debug" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_secs()
        .init();
    if configurable {
        log::set_max_level(LevelFilter::Info);
    }
    configurable
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level_from_config = init_logging(cli.verbose);

    let loaded = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::load_or_default(cli.storage_dir.join("config.toml")),
    };
    let config = loaded.inspect_err(|e| log::error!("Config load failed: {}", e))?;
    if level_from_config {
        log::set_max_level(config.logging.level_filter());
    }
    let mut console = Printer::stdout();

    log::debug!("Storage directory: {}", cli.storage_dir.display());

    match cli.command {
        Command::Run => {
            config.validate()?;
            let report = pipeline::run_monitor(&config, &cli.storage_dir).await?;
            log::info!(
                "Recorded {} change(s) with {} diagnostic(s)",
                report.entry.change_count(),
                report.diagnostics.len()
            );
        }

        Command::Diff {
            old,
            new,
            output,
            exclude,
        } => {
            let report =
                pipeline::diff_files(&config, &old, &new, &exclude, output.as_deref()).await?;
            log::info!("{} change(s)", report.len());
        }

        Command::DiffNotifications { old, new, output } => {
            let report = pipeline::diff_notification_files(&old, &new, output.as_deref()).await?;
            log::info!("{} new notification(s)", report.len());
        }

        Command::Clean { input, output } => {
            pipeline::clean_file(&input, &output).await?;
        }

        Command::Courses { write_watchlist } => {
            pipeline::list_courses(&config, &cli.storage_dir, write_watchlist).await?;
        }

        Command::History { limit } => {
            let history = LogHistory::new(
                LocalStorage::new(&cli.storage_dir),
                config.paths.log_file.clone(),
                config.monitor.history_capacity,
            );
            let entries = history.recent(limit).await;
            if entries.is_empty() {
                console.info("No runs recorded yet.");
            }

            for entry in entries {
                console.rule();
                console.info(&format!(
                    "{} ({:.2}s)",
                    entry.timestamp, entry.duration_seconds
                ));
                if !entry.notifications_diff.is_empty() {
                    console.section("Notifications");
                    for line in &entry.notifications_diff {
                        console.item(line);
                    }
                }
                for (course, lines) in &entry.courses_diff {
                    console.section(&format!("Course {}", course));
                    for line in lines {
                        console.item(line);
                    }
                }
                if entry.change_count() == 0 {
                    console.item("No changes");
                }
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            console.success(&format!(
                "Config OK ({} exclusion pattern(s))",
                config.monitor.exclude_paths.len()
            ));
            for pattern in &config.monitor.exclude_paths {
                console.item(pattern.as_str());
            }
            if config.api.token.is_empty() {
                console.warn("api.token is not set; `run` and `courses` will fail");
            }

            let storage = LocalStorage::new(&cli.storage_dir);
            let watchlist: Vec<WatchEntry> =
                storage.read_json_or_default(&config.paths.watchlist_file).await;
            console.info(&format!(
                "Watch list: {} course(s), {} active",
                watchlist.len(),
                active_entries(&watchlist).len()
            ));
        }
    }

    Ok(())
}
