//! CLI command definitions, routing, and tracing setup.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use herdbook_core::{
    LoadReport, ProgressReporter, QueryEngine, QueryRequest, RegistryContext, SilentProgress,
};
use herdbook_shared::{AppConfig, init_config, init_config_at, load_config, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::present::{OutputFormat, render};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// herdbook — answer questions about a livestock registry extract.
#[derive(Parser)]
#[command(
    name = "herdbook",
    version,
    about = "Look up animals, ages, and breed statistics in a livestock registry extract.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.herdbook/herdbook.toml).
    #[arg(long, global = true, env = "HERDBOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the registry archive directory.
    #[arg(long, global = true)]
    pub archive_dir: Option<PathBuf>,

    /// Output format for query results.
    #[arg(long, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Show every registry row of an animal.
    Lookup {
        /// Animal identifier.
        identifier: Option<String>,
    },

    /// Age of an animal in whole months.
    Age {
        /// Animal identifier.
        identifier: Option<String>,
    },

    /// Breed distribution of a species.
    Breeds {
        /// Species name, case-insensitive.
        species: Option<String>,
    },

    /// List the species present in the registry.
    Species,

    /// Registry activity in a province.
    Region {
        /// Province abbreviation (e.g. MI).
        province: Option<String>,

        /// Narrow to one ISTAT municipality code.
        #[arg(long)]
        istat: Option<String>,
    },

    /// How a breed appears in the registry, including parentage.
    Breeding {
        /// Species code (e.g. 01).
        species_code: Option<String>,

        /// Breed code (leading zeros are ignored).
        breed_code: Option<String>,
    },

    /// Answer JSON-lines requests from stdin, one JSON outcome per line.
    Batch,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

impl Command {
    /// The query this command asks, if it is a query.
    fn request(&self) -> Option<QueryRequest> {
        Some(match self {
            Self::Lookup { identifier } => QueryRequest::Lookup {
                identifier: identifier.clone(),
            },
            Self::Age { identifier } => QueryRequest::Age {
                identifier: identifier.clone(),
            },
            Self::Breeds { species } => QueryRequest::BreedDistribution {
                species: species.clone(),
            },
            Self::Species => QueryRequest::ListSpecies,
            Self::Region { province, istat } => QueryRequest::Region {
                province: province.clone(),
                istat_code: istat.clone(),
            },
            Self::Breeding {
                species_code,
                breed_code,
            } => QueryRequest::Breeding {
                species_code: species_code.clone(),
                breed_code: breed_code.clone(),
            },
            Self::Batch | Self::Config { .. } => return None,
        })
    }
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

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries
/// query results only.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "herdbook=info",
        1 => "herdbook=debug",
        _ => "herdbook=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
pub(crate) fn run(cli: Cli) -> Result<()> {
    if let Command::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init => cmd_config_init(cli.config.as_deref()),
            ConfigAction::Show => cmd_config_show(&resolve_config(&cli)?),
        };
    }

    let config = resolve_config(&cli)?;
    let ctx = RegistryContext::from_config(&config)?;

    match cli.command.request() {
        Some(request) => cmd_query(&ctx, config.registry.cache, &request, cli.format),
        None => cmd_batch(&ctx),
    }
}

/// Load the config file and apply command-line overrides.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(dir) = &cli.archive_dir {
        config.registry.archive_dir = dir.to_string_lossy().to_string();
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_query(
    ctx: &RegistryContext,
    cache: bool,
    request: &QueryRequest,
    format: OutputFormat,
) -> Result<()> {
    info!(kind = request.kind(), dir = %ctx.archive_dir.display(), "answering query");

    let mut engine = if cache {
        QueryEngine::with_cache(ctx)
    } else {
        QueryEngine::new(ctx)
    };

    let outcome = if format == OutputFormat::Json {
        engine.execute(request, &SilentProgress)?
    } else {
        engine.execute(request, &CliProgress::new())?
    };

    println!("{}", render(&outcome, format)?);
    Ok(())
}

fn cmd_batch(ctx: &RegistryContext) -> Result<()> {
    let mut engine = QueryEngine::with_cache(ctx);
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    let mut answered = 0usize;

    for (n, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<QueryRequest>(&line) {
            Ok(request) => {
                let outcome = engine.execute(&request, &SilentProgress)?;
                answered += 1;
                serde_json::to_string(&outcome)?
            }
            Err(e) => {
                warn!(line = n + 1, error = %e, "invalid request");
                serde_json::json!({ "error": format!("invalid request on line {}: {e}", n + 1) })
                    .to_string()
            }
        };
        writeln!(stdout, "{reply}")?;
    }

    stdout.flush()?;
    info!(answered, "batch complete");
    Ok(())
}

fn cmd_config_init(target: Option<&Path>) -> Result<()> {
    let path = match target {
        Some(path) => {
            init_config_at(path)?;
            path.to_path_buf()
        }
        None => init_config()?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn archive_done(&self, path: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Read [{current}/{total}] {path}"));
    }

    fn done(&self, report: &LoadReport) {
        self.spinner.finish_and_clear();
        for (path, reason) in report.skipped() {
            eprintln!("  skipped {}: {reason}", path.display());
        }
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
