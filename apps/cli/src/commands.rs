//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use webclip_core::{MiniJinjaRenderer, convert_to_markdown};
use webclip_extractor::{HttpExtractor, PageExtractor};
use webclip_server::AppState;
use webclip_shared::{AppConfig, Template, init_config, load_config, load_config_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// WebClip: turn web pages into Markdown notes.
#[derive(Parser)]
#[command(
    name = "webclip",
    version,
    about = "Convert web pages into Markdown notes with YAML frontmatter.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.webclip/webclip.toml.
    #[arg(long, global = true, env = "WEBCLIP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Start the HTTP conversion service.
    Serve {
        /// Address to bind (overrides config).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Convert a single URL using a template file.
    Convert {
        /// Page URL to clip.
        url: String,

        /// Template JSON file.
        #[arg(short, long)]
        template: PathBuf,

        /// Write the note here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "webclip=info",
        1 => "webclip=debug",
        _ => "webclip=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so `convert` output can be piped.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Serve { host, port } => cmd_serve(config_path.as_deref(), host, port).await,
        Command::Convert { url, template, out } => {
            cmd_convert(config_path.as_deref(), &url, &template, out.as_deref()).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

async fn cmd_serve(config_path: Option<&Path>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let state = AppState {
        extractor: Arc::new(HttpExtractor::new(&config.fetch)?),
        renderer: Arc::new(MiniJinjaRenderer::new()),
    };

    info!(
        host = %config.server.host,
        port = config.server.port,
        version = env!("CARGO_PKG_VERSION"),
        "starting webclip server"
    );

    webclip_server::serve(&config.server, state)
        .await
        .wrap_err_with(|| format!("server on {}:{} failed", config.server.host, config.server.port))
}

async fn cmd_convert(
    config_path: Option<&Path>,
    url: &str,
    template_path: &Path,
    out: Option<&Path>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let template = read_template(template_path)?;
    let url = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;

    let extractor = HttpExtractor::new(&config.fetch)?;
    let renderer = MiniJinjaRenderer::new();

    let spinner = spinner();
    spinner.set_message(format!("Fetching {url}"));
    let page = extractor.fetch_and_extract_page(&url).await;
    let page = match page {
        Ok(page) => page,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    spinner.set_message(format!("Rendering \"{}\"", page.title));
    let markdown = convert_to_markdown(&page, &template, &renderer).await;
    spinner.finish_and_clear();
    let markdown = markdown?;

    match out {
        Some(path) => {
            std::fs::write(path, &markdown)
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), words = page.word_count, "note written");
            eprintln!("Saved \"{}\" to {}", page.title, path.display());
        }
        None => print!("{markdown}"),
    }

    Ok(())
}

fn read_template(path: &Path) -> Result<Template> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read template {}", path.display()))?;
    serde_json::from_str(&raw)
        .wrap_err_with(|| format!("invalid template JSON in {}", path.display()))
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
