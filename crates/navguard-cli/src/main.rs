//! navguard command-line interface
//!
//! Evaluates URLs against a policy file without a browser attached.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use navguard_core::{Config, PolicyDocument};
use navguard_filter::{FilterEngine, RuleSet};

#[derive(Parser, Debug)]
#[command(name = "navguard", version, about = "Check URLs against a navigation policy")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the verdict for each URL
    Check {
        /// Policy file (JSON with core, global, user and deny lists)
        #[arg(short, long)]
        policy: PathBuf,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print one JSON object per URL
        #[arg(long)]
        json: bool,

        /// URLs to evaluate
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Print the mode a policy selects
    Mode {
        /// Policy file
        #[arg(short, long)]
        policy: PathBuf,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Check {
            policy,
            config,
            json,
            urls,
        } => check(&policy, config.as_deref(), json, &urls),
        Command::Mode { policy, config } => mode(&policy, config.as_deref()),
    }
}

fn init_logging(verbose: bool) {
    if verbose {
        use tracing_subscriber::{fmt, EnvFilter};

        fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        navguard_core::init_logging();
    }
}

fn load_engine(policy: &Path, config: Option<&Path>) -> Result<FilterEngine> {
    let config = match config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    let document = PolicyDocument::from_file(policy)
        .with_context(|| format!("Failed to load policy {}", policy.display()))?;
    let redirect_host = config.redirect_host()?;

    let rules = RuleSet::build(
        &document.core,
        &document.global,
        &document.user,
        &document.deny,
        Some(&redirect_host),
    );
    tracing::debug!(
        mode = %rules.mode(),
        core = rules.core_allow().len(),
        global = rules.global_allow().len(),
        user = rules.user_allow().len(),
        deny = rules.deny().len(),
        "Policy loaded"
    );

    Ok(FilterEngine::new(rules, config.scheme_exclusions()))
}

fn check(policy: &Path, config: Option<&Path>, json: bool, urls: &[String]) -> Result<()> {
    let engine = load_engine(policy, config)?;
    let mode = engine.mode();

    for url in urls {
        let verdict = engine.evaluate(url);
        if json {
            let line = serde_json::json!({
                "url": url,
                "verdict": verdict,
                "mode": mode,
            });
            println!("{}", line);
        } else {
            println!("{:<5} {}", verdict.as_str(), url);
        }
    }

    if !json {
        println!("mode: {}", mode);
    }
    Ok(())
}

fn mode(policy: &Path, config: Option<&Path>) -> Result<()> {
    let engine = load_engine(policy, config)?;
    let rules = engine.rules();
    let inert = [
        rules.core_allow(),
        rules.global_allow(),
        rules.user_allow(),
        rules.deny(),
    ]
    .iter()
    .flat_map(|tier| tier.iter())
    .filter(|rule| rule.is_inert())
    .count();

    println!("mode:   {}", engine.mode());
    println!("core:   {}", rules.core_allow().len());
    println!("global: {}", rules.global_allow().len());
    println!("user:   {}", rules.user_allow().len());
    println!("deny:   {}", rules.deny().len());
    if inert > 0 {
        println!("broken: {}", inert);
    }
    Ok(())
}
