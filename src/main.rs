mod config;
mod error;
mod fetch;
mod parser;
mod pipeline;
mod sentiment;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::parser::extract::Record;
use crate::parser::format::Escaping;
use crate::pipeline::{OutputOptions, ScanRequest, Source};
use crate::sentiment::{Classifier, ProcessBridge};

#[derive(Parser)]
#[command(name = "page_grep", about = "Find headings and links matching a pattern on a web page")]
struct Cli {
    /// Config file (default: ./page_grep.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OutputArgs {
    /// Escape href and text as HTML entities
    #[arg(long)]
    escape_html: bool,
    /// One JSON object per record instead of text lines
    #[arg(long)]
    json: bool,
}

impl OutputArgs {
    fn options(&self) -> OutputOptions {
        OutputOptions {
            escaping: if self.escape_html {
                Escaping::Html
            } else {
                Escaping::Verbatim
            },
            json: self.json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a page and report matching headings and links
    Scan {
        url: String,
        /// Regular expression searched in each heading/link text
        pattern: String,
        /// Label every record with the external sentiment classifier
        #[arg(long)]
        sentiment: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Same as scan, reading markup from a local file
    File {
        path: PathBuf,
        pattern: String,
        #[arg(long)]
        sentiment: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run the sentiment classifier on one text
    Classify { text: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let config = cli.config;

    let code = match cli.command {
        Commands::Scan {
            url,
            pattern,
            sentiment,
            output,
        } => {
            // Pattern errors are configuration errors: fail before any I/O.
            let request = ScanRequest::new(Source::Url(url.clone()), &pattern)?;
            let settings = Settings::load(config.as_deref())?;

            let spinner = fetch_spinner(&url)?;
            let result = request.run(&settings).await;
            spinner.finish_and_clear();

            finish_run(result, &settings, sentiment, output.options()).await?
        }
        Commands::File {
            path,
            pattern,
            sentiment,
            output,
        } => {
            let request = ScanRequest::new(Source::File(path), &pattern)?;
            let settings = Settings::load(config.as_deref())?;
            let result = request.run(&settings).await;
            finish_run(result, &settings, sentiment, output.options()).await?
        }
        Commands::Classify { text } => {
            let settings = Settings::load(config.as_deref())?;
            let bridge = ProcessBridge::from_settings(&settings);
            match bridge.classify(&text).await {
                Ok(result) => {
                    println!("Text: {}", result.text);
                    println!("Sentiment: {}", result.label);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Sentiment unavailable: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("Done in {}", format_duration(elapsed));
    }

    Ok(code)
}

async fn finish_run(
    result: Result<Vec<Record>, error::PipelineError>,
    settings: &Settings,
    sentiment: bool,
    options: OutputOptions,
) -> anyhow::Result<ExitCode> {
    let records = match result {
        Ok(records) => records,
        Err(e) => {
            pipeline::report_failure(&mut io::stderr(), &e)?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let bridge = sentiment.then(|| ProcessBridge::from_settings(settings));
    let summary = pipeline::report(&mut io::stdout().lock(), &records, options, bridge.as_ref())
        .await
        .context("Failed to write records")?;
    summary.print();
    Ok(ExitCode::SUCCESS)
}

fn fetch_spinner(url: &str) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Fetching {}", url));
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
