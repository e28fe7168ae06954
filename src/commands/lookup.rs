use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use searchvol::cache::VolumeCache;
use searchvol::client::VolumeClient;
use searchvol::config::Config;
use searchvol::export;
use searchvol::jobs::JobRunner;
use searchvol::models::LookupOptions;
use searchvol::scheduler::SchedulerConfig;
use searchvol::utils::split_keyword_lines;

/// Output encoding for `lookup`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

/// Parameters for the `lookup` command
pub struct LookupParams {
    /// Keyword file, one per line; `None` or `-` reads stdin
    pub input: Option<PathBuf>,
    pub related: bool,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Run one job to completion in-process and write its export
pub async fn lookup(params: LookupParams) -> Result<()> {
    let config = Config::load(params.config.as_deref()).context("Failed to load configuration")?;
    config.validate()?;

    let keywords = split_keyword_lines(&read_input(params.input.as_ref()).await?);
    if keywords.is_empty() {
        bail!("No keywords given");
    }

    let client = VolumeClient::new(&config.api, Arc::new(VolumeCache::new()))?;
    let runner = JobRunner::with_lookup(Arc::new(client), SchedulerConfig::from(&config.lookup));

    let options = LookupOptions {
        include_related: params.related,
    };
    let id = runner.submit(&keywords, options);
    let view = runner.wait(&id).await?;
    let results = runner.results(&id)?;

    tracing::info!(
        job_id = %id,
        keywords = view.total,
        zero_volume = results.iter().filter(|v| v.is_zero()).count(),
        "Lookup finished"
    );

    let rows = export::flatten(&results);
    let body = match params.format {
        OutputFormat::Csv => export::to_csv(&rows),
        OutputFormat::Json => export::to_json(&rows)?,
    };

    match params.output {
        Some(path) => {
            tokio::fs::write(&path, &body)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), rows = rows.len(), "Export written");
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&body).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}

async fn read_input(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) if path.as_os_str() != "-" => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}
