use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use music_link_resolver as lib;
use lib::config::Config;
use lib::{Pipeline, ResolveOptions};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "music-link-resolver", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one link and print the result as JSON
    Resolve {
        url: String,
        /// Title to use when the link resolves to a single track
        #[arg(long)]
        title_hint: Option<String>,
        /// Maximum number of tracks (1-120)
        #[arg(long)]
        max_tracks: Option<usize>,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Resolve every link in a file (one per line), printing JSON lines
    Batch {
        file: PathBuf,
        #[arg(long)]
        max_tracks: Option<usize>,
    },
    /// Validate config file and exit
    ConfigValidate,
}

/// Explicit --config wins; otherwise the per-user config file if it
/// exists; otherwise built-in defaults.
fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => dirs::config_dir()
            .map(|d| d.join("music-link-resolver").join("config.toml"))
            .filter(|p| p.exists()),
    };
    let cfg = match path {
        Some(p) => Config::from_path(&p)
            .with_context(|| format!("loading config from {}", p.display()))?,
        None => Config::default(),
    };
    Ok(cfg.apply_env())
}

/// Logs go to stderr (stdout carries the JSON output) and, when a log
/// directory is configured, to a daily-rotated file.
fn init_logging(cfg: &Config) -> Result<Option<WorkerGuard>> {
    let _ = LogTracer::init();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &cfg.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "music-link-resolver.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(non_blocking)),
                Some(guard),
            )
        }
        None => (None, None),
    };
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer);
    tracing_subscriber_global::set_global_default(subscriber)
        .context("installing global tracing subscriber")?;
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::ConfigValidate = cli.command {
        match load_config(cli.config.as_deref()) {
            Ok(_) => println!("OK"),
            Err(e) => {
                eprintln!("Config validation failed: {:#}", e);
                std::process::exit(2);
            }
        }
        return Ok(());
    }

    let cfg = load_config(cli.config.as_deref())?;
    let _guard = init_logging(&cfg)?;
    let pipeline = Pipeline::new(&cfg);

    match cli.command {
        Commands::Resolve {
            url,
            title_hint,
            max_tracks,
            pretty,
        } => {
            let options = ResolveOptions {
                title_hint,
                max_tracks,
            };
            let result = pipeline.resolve_input(&url, &options).await;
            let out = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{}", out);
        }
        Commands::Batch { file, max_tracks } => {
            let f = std::fs::File::open(&file)
                .with_context(|| format!("opening {}", file.display()))?;
            let options = ResolveOptions {
                title_hint: None,
                max_tracks,
            };
            for line in std::io::BufReader::new(f).lines() {
                let line = line?;
                let input = line.trim();
                if input.is_empty() || input.starts_with('#') {
                    continue;
                }
                let result = pipeline.resolve_input(input, &options).await;
                let row = serde_json::json!({ "input": input, "result": result });
                println!("{}", row);
            }
        }
        Commands::ConfigValidate => {}
    }

    Ok(())
}
