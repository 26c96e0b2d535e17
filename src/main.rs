//! SectorScout - multi-agent company screener for IDX, SGX and KLSE
//!
//! A CLI tool that asks a ranking agent for the top companies matching
//! the operator's criteria, then has a research agent summarise each one
//! using the Sectors API.
//!
//! Exit codes:
//!   0 - Success (some companies may have been skipped)
//!   1 - Fatal error (config, ranking, invalid input, API failure)

mod agent;
mod cli;
mod config;
mod error;
mod flow;
mod models;
mod report;
mod sectors;

use agent::{AgentRunner, OpenAiChat, SectorsTools};
use anyhow::{Context, Result};
use cli::Args;
use config::{Config, Credentials};
use flow::ResearchFlow;
use sectors::SectorsClient;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments (loads .env first)
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("SectorScout v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Research failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .sectorscout.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", config::CONFIG_FILE_NAME);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE_NAME);
    println!("   API keys are read from SECTORS_API_KEY and OPENAI_API_KEY.");
    Ok(())
}

/// Initialize logging based on verbosity settings. Logs go to stderr.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Ignoring {}: {:#}", config::CONFIG_FILE_NAME, e);
            Ok(Config::default())
        }
    }
}

/// Wire up the clients and run the research flow once.
async fn run(args: Args, config: Config) -> Result<()> {
    let credentials = Credentials::from_env();
    debug!("Credentials: {:?}", credentials);

    let fetcher = SectorsClient::new(&config.sectors, &credentials)
        .context("Failed to create Sectors API client")?;
    let tools = Arc::new(SectorsTools::new(
        Arc::new(fetcher),
        config.sectors.base_url.trim_end_matches('/'),
        config.sectors.top_n,
    ));

    let model = OpenAiChat::new(config.model.clone(), &credentials)
        .context("Failed to create chat client")?;
    let runner = AgentRunner::new(Arc::new(model), tools, config.model.max_iterations);

    let prompt = match args.prompt {
        Some(ref prompt) => prompt.clone(),
        None => read_prompt().context("Failed to read criteria from stdin")?,
    };

    let research_flow = ResearchFlow::new(Arc::new(runner), config.model.name.clone())
        .parallel(config.flow.parallel)
        .show_progress(!args.quiet);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let run_report = research_flow.run(&prompt, &mut out).await?;

    writeln!(out, "{}", report::console_summary(&run_report))?;

    if let Some(ref path) = args.output {
        report::save_report(&run_report, path, args.format)?;
        writeln!(out, "\n✅ Report saved to: {}", path.display())?;
    }

    if run_report.skipped_count() > 0 {
        warn!(
            "{} of {} companies were skipped",
            run_report.skipped_count(),
            run_report.tickers.len()
        );
    }

    Ok(())
}

/// Ask the operator for screening criteria.
fn read_prompt() -> Result<String> {
    print!("🤖: Give me criteria company you want explore? \n👧: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
