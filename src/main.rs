use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use searchvol::config::{Config, LoggingConfig};

mod commands;

use commands::{LookupParams, OutputFormat, ServeParams};

#[derive(Parser)]
#[command(
    name = "searchvol",
    version,
    about = "Batch keyword search-volume lookups with related-term expansion",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP job API
    Serve {
        /// Address to listen on, overrides the configuration
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Look up a keyword list once and print or save the export
    Lookup {
        /// Keyword file, one per line ("-" or omitted reads stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Also fetch volumes for each keyword's related terms
        #[arg(long, default_value = "false")]
        related: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config file is reported by the command itself
    let logging = Config::load(cli.config.as_deref())
        .map(|c| c.logging)
        .unwrap_or_default();
    let format = cli.log_format.clone().unwrap_or(logging.format.clone());
    setup_tracing(&format, cli.verbose, &logging)?;

    match cli.command {
        Commands::Serve { bind } => {
            tracing::info!(bind = ?bind, config = ?cli.config, "Starting serve command");
            commands::serve(ServeParams {
                bind,
                config: cli.config,
            })
            .await?;
        }

        Commands::Lookup {
            input,
            related,
            format,
            output,
        } => {
            tracing::info!(
                input = ?input,
                related = %related,
                format = ?format,
                output = ?output,
                "Starting lookup command"
            );
            commands::lookup(LookupParams {
                input,
                related,
                format,
                output,
                config: cli.config,
            })
            .await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool, logging: &LoggingConfig) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            tracing_subscriber::EnvFilter::new("searchvol=debug,info")
        } else {
            tracing_subscriber::EnvFilter::new(format!("searchvol={},warn", logging.level))
        }
    });

    // Logs go to stderr so `lookup` output on stdout stays clean
    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
