use clap::{Parser, ValueEnum};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use rusaavn::{
    DownloadConfig, DownloadOutcome, DownloadTask, ErrorKind, ProgressObserver, Quality, Saavnloader,
};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rusaavn-cli")]
#[command(about = "CLI for Rusaavn - JioSaavn Downloader", long_about = None)]
struct Cli {
    /// Album, artist, playlist or song URL (prompted for when omitted)
    url: Option<String>,

    /// Output directory for downloads
    #[arg(short, long, env = "RUSAAVN_OUTPUT")]
    output: Option<PathBuf>,

    /// Audio bitrate
    #[arg(short, long, value_enum)]
    quality: Option<Bitrate>,

    /// Number of simultaneous downloads
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Metadata request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Do not embed tags and cover art
    #[arg(long)]
    no_tags: bool,

    /// TOML config file
    #[arg(long, env = "RUSAAVN_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Bitrate {
    #[value(name = "96")]
    Kbps96,
    #[value(name = "160")]
    Kbps160,
    #[value(name = "320")]
    Kbps320,
}

impl From<Bitrate> for Quality {
    fn from(b: Bitrate) -> Self {
        match b {
            Bitrate::Kbps96 => Quality::Kbps96,
            Bitrate::Kbps160 => Quality::Kbps160,
            Bitrate::Kbps320 => Quality::Kbps320,
        }
    }
}

const BAR_TEMPLATE: &str =
    "{prefix:>30.cyan.bold} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} {msg}";

/// One progress bar per in-flight track.
struct BarObserver {
    multi: MultiProgress,
    style: ProgressStyle,
    bars: Mutex<HashMap<usize, ProgressBar>>,
}

impl BarObserver {
    fn new() -> Self {
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ ");
        Self {
            multi: MultiProgress::new(),
            style,
            bars: Mutex::new(HashMap::new()),
        }
    }
}

impl ProgressObserver for BarObserver {
    fn on_start(&self, task: &DownloadTask) {
        let bar = self.multi.add(ProgressBar::new(0));
        bar.set_style(self.style.clone());
        bar.set_prefix(task.track.title.chars().take(30).collect::<String>());
        if let Ok(mut bars) = self.bars.lock() {
            bars.insert(task.id, bar);
        }
    }

    fn on_progress(&self, task_id: usize, bytes_done: u64, bytes_total: u64) {
        if let Ok(bars) = self.bars.lock() {
            if let Some(bar) = bars.get(&task_id) {
                bar.set_length(bytes_total);
                bar.set_position(bytes_done);
            }
        }
    }

    fn on_finish(&self, outcome: &DownloadOutcome) {
        let bar = match self.bars.lock() {
            Ok(mut bars) => bars.remove(&outcome.task.id),
            Err(_) => None,
        };
        if let Some(bar) = bar {
            match &outcome.result {
                Ok(_) => bar.finish_with_message("done"),
                Err(e) => bar.abandon_with_message(format!("failed: {}", e)),
            }
        }
    }
}

fn prompt_for_url() -> io::Result<String> {
    print!("Please enter the URL: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "rusaavn=debug" } else { "rusaavn=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => DownloadConfig::load(path)?,
        None => DownloadConfig::default(),
    };
    if let Some(output) = cli.output {
        config.output_dir = output;
    }
    if let Some(quality) = cli.quality {
        config.quality = quality.into();
    }
    if let Some(concurrency) = cli.concurrency {
        config.max_concurrency = concurrency.max(1);
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout.max(1);
    }
    if cli.no_tags {
        config.embed_tags = false;
    }

    let url = match cli.url {
        Some(url) => url,
        None => prompt_for_url()?,
    };
    if url.is_empty() {
        return Err("no URL given".into());
    }

    let mut loader = Saavnloader::new(config)?;
    loader.set_observer(Arc::new(BarObserver::new()));

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling...");
            on_ctrl_c.cancel();
        }
    });

    let report = loader.download(&url, &cancel).await?;

    println!(
        "✅ {} '{}': {}/{} tracks downloaded",
        report.kind,
        report.name,
        report.result.successful().count(),
        report.total()
    );

    if !report.all_successful() {
        let mut by_kind: BTreeMap<ErrorKind, Vec<&DownloadOutcome>> = BTreeMap::new();
        for outcome in report.result.failed() {
            if let Some(err) = outcome.error() {
                by_kind.entry(err.kind()).or_default().push(outcome);
            }
        }

        println!("   Failed tracks:");
        for (kind, outcomes) in &by_kind {
            println!("   {} ({}):", kind, outcomes.len());
            for outcome in outcomes {
                if let Some(err) = outcome.error() {
                    println!("   - {}: {}", outcome.task.track.title, err);
                }
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
