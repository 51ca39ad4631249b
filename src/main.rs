use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wipsync::config::{load_repositories, ENV_LOG_FILE, ENV_REPOS_FILE};
use wipsync::health::CheckResult;
use wipsync::{
    Config, HealthCheck, NotificationSender, RepositoryInspector, RunLog, ShellRunner,
    SmtpMailer, SyncEngine,
};

const DOTENV_FILE: &str = ".env";

#[derive(Parser)]
#[command(name = "wipsync")]
#[command(about = "Commit, push and report on pending work across local git repositories")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Repository list file (JSON, or YAML by extension)
    #[arg(long, env = ENV_REPOS_FILE)]
    repos: Option<PathBuf>,

    /// Run log location
    #[arg(long, env = ENV_LOG_FILE)]
    log_file: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Commit and push pending work in every repository, then mail the log
    Run,

    /// Show what each repository needs without changing anything
    Status,

    /// System health check and diagnostics
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Variables already in the environment win over ./.env
    let dotenv = dotenvy::from_path(DOTENV_FILE);
    let cli = Cli::parse();

    init_logging(cli.verbose)?;
    info!("Starting wipsync v{}", env!("CARGO_PKG_VERSION"));

    match dotenv {
        Ok(()) => debug!("Loaded settings from {}", DOTENV_FILE),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring {}: {}", DOTENV_FILE, e),
    }

    let config = load_config(cli.repos, cli.log_file)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run(&config).await,
        Commands::Status => cmd_status(&config).await,
        Commands::Doctor => cmd_doctor(&config),
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

/// Build configuration from the environment, with command-line overrides
fn load_config(repos: Option<PathBuf>, log_file: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::from_env().context("Failed to read configuration")?;

    if let Some(repos) = repos {
        config.repos_file = repos;
    }
    if let Some(log_file) = log_file {
        config.log_file = log_file;
    }

    config.expand_paths()?;
    Ok(config)
}

/// Sync every configured repository and mail the run log
async fn cmd_run(config: &Config) -> Result<()> {
    let repos = load_repositories(&config.repos_file)?;
    let log = Arc::new(RunLog::init(&config.log_file)?);

    let notifier = NotificationSender::new(
        config.mail.clone(),
        Box::new(SmtpMailer::new(config.mail.clone())),
        log.clone(),
    );
    let engine = SyncEngine::new(Arc::new(ShellRunner::new()), notifier, log);

    let summary = engine.run(&repos).await;

    println!();
    println!("🎉 Run complete");
    println!("   📊 Total repositories: {}", summary.total_repositories());
    println!("   ✅ Committed or pushed: {}", summary.synced());
    println!("   💤 Nothing to do: {}", summary.unchanged());
    println!("   ❌ Failed: {}", summary.failed());
    println!(
        "   📧 Log mailed: {}",
        if summary.mail_sent { "yes" } else { "no" }
    );
    println!("   ⏱️  Duration: {:.2}s", summary.duration.as_secs_f64());

    if summary.failed() > 0 {
        println!("\n🔍 Failed repositories:");
        for (outcome, error) in summary.failures() {
            println!("   ❌ {} ({}): {}", outcome.name, outcome.path.display(), error);
        }
    }

    Ok(())
}

/// Inspect every repository without staging, committing, pushing or mailing
async fn cmd_status(config: &Config) -> Result<()> {
    let repos = load_repositories(&config.repos_file)?;
    let inspector = RepositoryInspector::new(Arc::new(ShellRunner::new()), Arc::new(RunLog::console()));

    println!("🔍 Inspecting {} repositories", repos.len());

    for repo in &repos {
        match inspector.inspect(repo).await {
            Ok(status) if status.is_clean() => {
                println!("   ✅ {} [{}]: clean", repo.name, status.branch);
            }
            Ok(status) => {
                let mut pending = Vec::new();
                if status.has_unstaged_changes {
                    pending.push("uncommitted changes");
                }
                if status.has_unpushed_commits {
                    pending.push("unpushed commits");
                }
                println!(
                    "   📤 {} [{}]: {}",
                    repo.name,
                    status.branch,
                    pending.join(", ")
                );
            }
            Err(e) => println!("   ❌ {}: {}", repo.name, e),
        }
    }

    Ok(())
}

/// System health check and diagnostics
fn cmd_doctor(config: &Config) -> Result<()> {
    let health = HealthCheck::run(config);
    print_health_report(&health);
    Ok(())
}

/// Print health check report to stdout
fn print_health_report(health: &HealthCheck) {
    fn print_check(name: &str, result: &CheckResult) {
        println!("{}:", name);
        let icon = if result.passed {
            if result.is_warning { "⚠️ " } else { "✅" }
        } else {
            "❌"
        };
        println!("  {} {}", icon, result.message);
        if let Some(details) = &result.details {
            for line in details.lines() {
                println!("     {}", line);
            }
        }
    }

    println!("🔍 wipsync System Diagnostics");
    println!();

    for (name, result) in health.all_checks() {
        print_check(name, result);
        println!();
    }

    let warnings = health.warnings().len();
    match (health.all_passed(), warnings) {
        (true, 0) => println!("✅ All checks passed"),
        (true, n) => println!("✅ All required checks passed ({} warning(s))", n),
        (false, _) => println!("❌ Some checks failed"),
    }
}
