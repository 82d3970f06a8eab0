mod pipeline;
mod report;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use drivesort_ai::{Cascade, GeminiClient};
use drivesort_core::OrganizerConfig;
use drivesort_drive::{DryRunStorage, GoogleDrive, Storage, read_local_text};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_FILE: &str = "drivesort.toml";

#[derive(Parser)]
#[command(name = "drivesort", version)]
#[command(about = "Sort the files in a Google Drive root into category folders")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    settings: Settings,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Classify every file in the Drive root and move it (the default)
    Organize,
    /// Classify a local file without touching Drive
    Classify {
        /// PDF or text file
        path: PathBuf,
    },
    /// List Gemini models usable for classification
    Models,
}

/// Overrides layered over the config file.
#[derive(Args, Default)]
struct Settings {
    /// TOML config file [default: drivesort.toml if present]
    #[arg(long, global = true, env = "DRIVESORT_CONFIG")]
    config: Option<PathBuf>,

    /// Minimum confidence (0-100) to accept a verdict
    #[arg(long, global = true)]
    threshold: Option<u8>,

    /// Characters of content sent to the classifiers
    #[arg(long, global = true)]
    max_text_length: Option<usize>,

    /// Ollama model name
    #[arg(long, global = true, env = "OLLAMA_MODEL")]
    model: Option<String>,

    /// Ollama server URL
    #[arg(long, global = true, env = "OLLAMA_HOST")]
    ollama_url: Option<String>,

    /// Gemini model name
    #[arg(long, global = true)]
    gemini_model: Option<String>,

    /// Report moves without performing them
    #[arg(
        long,
        global = true,
        env = "DRY_RUN",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    dry_run: bool,

    /// Seconds to wait before each file
    #[arg(long, global = true)]
    delay: Option<u64>,

    /// Local-model prompt audit log
    #[arg(long, global = true)]
    audit_log: Option<PathBuf>,

    /// Saved OAuth user token for Drive
    #[arg(long, global = true, default_value = "token.json")]
    credentials: PathBuf,
}

impl Settings {
    fn apply(&self, config: &mut OrganizerConfig) {
        if let Some(v) = self.threshold {
            config.confidence_threshold = v;
        }
        if let Some(v) = self.max_text_length {
            config.max_text_length = v;
        }
        if let Some(v) = &self.model {
            config.local_model = v.clone();
        }
        if let Some(v) = &self.ollama_url {
            config.ollama_url = with_scheme(v);
        }
        if let Some(v) = &self.gemini_model {
            config.gemini_model = v.clone();
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if let Some(v) = self.delay {
            config.request_delay = Duration::from_secs(v);
        }
        if let Some(v) = &self.audit_log {
            config.audit_log = v.clone();
        }
    }
}

/// `OLLAMA_HOST` is often given as bare `host:port`.
fn with_scheme(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

/// Defaults, then the config file, then command-line and environment overrides.
fn build_config(
    settings: &Settings,
    gemini_api_key: Option<String>,
) -> anyhow::Result<OrganizerConfig> {
    let mut config = match &settings.config {
        Some(path) => OrganizerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            OrganizerConfig::load(Path::new(DEFAULT_CONFIG_FILE))
                .with_context(|| format!("loading config from {DEFAULT_CONFIG_FILE}"))?
        }
        None => OrganizerConfig::default(),
    };

    settings.apply(&mut config);
    config.gemini_api_key = gemini_api_key.filter(|k| !k.trim().is_empty());
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_provider(config: &OrganizerConfig) {
    if config.cloud_enabled() {
        println!("[SYSTEM] LLM Provider: Gemini (Cloud) with fallback to Ollama");
    } else {
        println!("[SYSTEM] LLM Provider: Ollama ({} - Local)", config.local_model);
    }
    if config.dry_run {
        println!("[SYSTEM] Dry run: no files will be moved");
    }
}

async fn run_organize(settings: &Settings, config: &OrganizerConfig) -> anyhow::Result<()> {
    println!("Starting Google Drive organizer...");
    print_provider(config);

    let cascade = Cascade::from_config(config).context("building classification cascade")?;
    let drive = GoogleDrive::connect(&settings.credentials, config.request_timeout)
        .context("initializing Google Drive access")?;
    let storage: Box<dyn Storage> = if config.dry_run {
        Box::new(DryRunStorage::new(drive))
    } else {
        Box::new(drive)
    };

    let summary = pipeline::organize(storage.as_ref(), &cascade, config).await?;
    println!("\nOrganization complete.\n");
    print!("{summary}");
    Ok(())
}

async fn run_classify(path: &Path, config: &OrganizerConfig) -> anyhow::Result<()> {
    print_provider(config);
    let text = read_local_text(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let cascade = Cascade::from_config(config).context("building classification cascade")?;
    let result = cascade.classify(&name, &text).await;
    let (target, flagged) = pipeline::route(&result, config);

    println!(
        "{name}: {} (Confidence: {}%) [Method: {}]",
        result.category, result.confidence, result.method
    );
    if flagged {
        println!("  Low confidence (<{}). Would go to '{target}'.", config.confidence_threshold);
    }
    Ok(())
}

async fn run_models(config: &OrganizerConfig) -> anyhow::Result<()> {
    let Some(api_key) = config.gemini_api_key.as_deref() else {
        bail!("GEMINI_API_KEY is not set");
    };
    let client = GeminiClient::new(api_key, &config.gemini_model, config.request_timeout)?;
    let models = client.list_models().await.context("listing Gemini models")?;

    println!("Models supporting generateContent:");
    print!("{}", report::format_models(&models));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose);
    tracing::debug!("drivesort v{}", env!("CARGO_PKG_VERSION"));

    let config = build_config(&cli.settings, std::env::var("GEMINI_API_KEY").ok())?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command.unwrap_or(Command::Organize) {
        Command::Organize => run_organize(&cli.settings, &config).await,
        Command::Classify { path } => run_classify(&path, &config).await,
        Command::Models => run_models(&config).await,
    }
}
