//! replisync - one-way periodic directory mirroring
//!
//! Keeps a replica directory identical to a source directory, re-checking at
//! a fixed interval and recording every change in an append-only log.

mod display;
mod prompt;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use replisync_config::{params::validate_source, Config, ConfigError, ConfigLoader, SyncParams};
use replisync_sync::{SyncEngine, SyncOptions};
use replisync_types::SyncInterval;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// replisync - one-way periodic directory mirroring
#[derive(Parser, Debug)]
#[command(
    name = "replisync",
    version = env!("CARGO_PKG_VERSION"),
    about = "One-way periodic directory mirroring",
    long_about = "replisync keeps a replica folder identical to a source folder.\n\
                  Files are compared by content hash; stale replica entries are removed,\n\
                  and every change is appended to a log file."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode - detailed output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mirror the source into the replica now and then at every interval
    Run(SyncArgs),
    /// Mirror the source into the replica once
    Once(SyncArgs),
    /// Show or write configuration
    Config {
        /// Use the built-in defaults instead of the loaded configuration
        #[arg(long)]
        default: bool,
        /// Write to this file instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
struct SyncArgs {
    /// Source folder
    source: Option<PathBuf>,
    /// Replica folder
    replica: Option<PathBuf>,
    /// Log file, or a folder to hold log.txt
    log_file: Option<PathBuf>,
    /// Seconds between the end of one run and the start of the next
    #[arg(short, long, conflicts_with = "interval_minutes")]
    interval: Option<u64>,
    /// Interval in minutes
    #[arg(short = 'm', long)]
    interval_minutes: Option<u64>,
    /// Answer yes to every confirmation
    #[arg(short, long)]
    yes: bool,
}

impl SyncArgs {
    /// Fold command-line values over the loaded configuration
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(source) = &self.source {
            config.sync.source = Some(source.clone());
        }
        if let Some(replica) = &self.replica {
            config.sync.replica = Some(replica.clone());
        }
        if let Some(log_file) = &self.log_file {
            config.sync.log_file = Some(log_file.clone());
        }

        let interval = match (self.interval, self.interval_minutes) {
            (Some(secs), _) => Some(SyncInterval::from_secs(secs)),
            (None, Some(minutes)) => Some(SyncInterval::from_minutes(minutes)),
            (None, None) => None,
        };
        if let Some(interval) = interval {
            config.sync.interval_secs = interval.map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;

    init_logging(cli.debug, cli.quiet, cli.verbose, &config.logging.level)?;
    if !config.logging.colored_output {
        console::set_colors_enabled(false);
    }

    info!("replisync v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run(args) => sync_command(config, &args, false, cli.quiet).await?,
        Commands::Once(args) => sync_command(config, &args, true, cli.quiet).await?,
        Commands::Config { default, output } => config_command(&config, default, output)?,
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ConfigLoader::load_default().context("Failed to load configuration")?,
    };
    Ok(config)
}

fn init_logging(debug: bool, quiet: bool, verbose: bool, configured: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        configured
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log filter")?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}

async fn sync_command(mut config: Config, args: &SyncArgs, once: bool, quiet: bool) -> Result<()> {
    args.apply(&mut config)?;

    let Some(params) = prepare_params(&config, args.yes)? else {
        display::print_aborted();
        return Ok(());
    };

    let options = SyncOptions::from_config(&config);
    debug!("Sync options: {:?}", options);
    if !quiet {
        display::print_banner(&params, once);
    }

    let token = CancellationToken::new();
    spawn_interrupt_handler(token.clone());

    let mut engine = SyncEngine::new(params, options);
    let aborted = if once {
        match engine.run_once(&token).await {
            Ok(summary) => {
                if !quiet {
                    display::print_run_details(&summary);
                }
                summary.interrupted
            }
            Err(replisync_types::Error::Cancelled) => true,
            Err(e) => return Err(e).context("Sync run failed"),
        }
    } else {
        let report = engine.run_periodic(token).await;
        if !quiet {
            display::print_report(&report);
        }
        report.stopped_by_cancel
    };

    if aborted {
        display::print_aborted();
    }
    Ok(())
}

/// Validate the configured roots, asking the operator where needed.
///
/// The source is checked before the replica is offered for creation so a bad
/// source never leaves a new, empty replica behind. `None` means declined.
fn prepare_params(config: &Config, assume_yes: bool) -> Result<Option<SyncParams>> {
    let source = config
        .sync
        .source
        .as_ref()
        .ok_or_else(|| ConfigError::missing_required("sync.source"))?;
    validate_source(source).context("Invalid sync parameters")?;

    let Some(replica) = config.sync.replica.as_ref() else {
        bail!("No replica folder given (argument or sync.replica)");
    };
    if !prompt::ensure_replica_exists(replica, assume_yes)? {
        return Ok(None);
    }

    let params = SyncParams::from_config(config).context("Invalid sync parameters")?;
    if !prompt::confirm_replica_overwrite(&params, assume_yes)? {
        return Ok(None);
    }
    Ok(Some(params))
}

/// Cancel `token` on Ctrl-C
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                debug!("Interrupt received");
                token.cancel();
            }
            Err(e) => tracing::warn!("Could not listen for Ctrl-C: {}", e),
        }
    });
}

fn config_command(config: &Config, default: bool, output: Option<PathBuf>) -> Result<()> {
    let config = if default {
        Config::default()
    } else {
        config.clone()
    };

    match output {
        Some(path) => {
            ConfigLoader::save_to_file(&config, &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            display::print_config_written(&path);
        }
        None => {
            display::print_config_header(default);
            print!("{}", serde_yaml::to_string(&config)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_positional_arguments() {
        let cli = Cli::try_parse_from([
            "replisync", "run", "src", "dst", "logs", "--interval", "30", "--yes",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.source, Some(PathBuf::from("src")));
        assert_eq!(args.replica, Some(PathBuf::from("dst")));
        assert_eq!(args.log_file, Some(PathBuf::from("logs")));
        assert_eq!(args.interval, Some(30));
        assert!(args.yes);
    }

    #[test]
    fn test_interval_flags_conflict() {
        let result = Cli::try_parse_from([
            "replisync", "once", "--interval", "30", "--interval-minutes", "1",
        ]);
        assert!(result.is_err());
    }

    #[rstest]
    #[case(Some(30), None, 30)]
    #[case(None, Some(2), 120)]
    #[case(None, None, 60)]
    fn test_interval_resolution(
        #[case] interval: Option<u64>,
        #[case] interval_minutes: Option<u64>,
        #[case] expected: u64,
    ) {
        let args = SyncArgs {
            interval,
            interval_minutes,
            ..SyncArgs::default()
        };
        let mut config = Config::default();
        args.apply(&mut config).unwrap();
        assert_eq!(config.sync.interval_secs.as_secs(), expected);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let args = SyncArgs {
            interval: Some(0),
            ..SyncArgs::default()
        };
        assert!(args.apply(&mut Config::default()).is_err());
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let missing = temp_dir.path().join("custom.yaml");

        let err = load_config(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("custom.yaml"));
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.yaml");
        std::fs::write(&path, "sync:\n  interval_secs: 15\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.sync.interval_secs.as_secs(), 15);
    }

    #[test]
    fn test_bad_source_leaves_no_replica_behind() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        let replica = temp_dir.path().join("replica");
        std::fs::create_dir_all(&source).unwrap();

        let mut config = Config::default();
        config.sync.source = Some(source);
        config.sync.replica = Some(replica.clone());
        config.sync.log_file = Some(temp_dir.path().to_path_buf());

        assert!(prepare_params(&config, true).is_err());
        assert!(!replica.exists());
    }

    #[test]
    fn test_prepare_params_creates_replica() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        let replica = temp_dir.path().join("replica");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("a.txt"), "a").unwrap();

        let mut config = Config::default();
        config.sync.source = Some(source);
        config.sync.replica = Some(replica.clone());
        config.sync.log_file = Some(temp_dir.path().to_path_buf());

        let params = prepare_params(&config, true).unwrap().unwrap();
        assert!(replica.is_dir());
        assert_eq!(params.replica, replica.canonicalize().unwrap());
    }

    #[test]
    fn test_arguments_override_config() {
        let mut config = Config::default();
        config.sync.source = Some(PathBuf::from("from-config"));
        let args = SyncArgs {
            source: Some(PathBuf::from("from-cli")),
            ..SyncArgs::default()
        };
        args.apply(&mut config).unwrap();
        assert_eq!(config.sync.source, Some(PathBuf::from("from-cli")));
    }
}
