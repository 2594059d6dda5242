mod clone;
mod config;
mod github;
mod reference;
mod resolve;

use clap::Parser;
use colored::Colorize;
use tracing::{error, info, info_span};
use tracing_subscriber::EnvFilter;

/// PR Resolver — CLI tool that resolves the transitive dependency closure of
/// GitHub Pull Requests declared through "Requires:"/"Tests:" annotation
/// lines, then hands each resolved PR URL to an external clone command.
#[derive(Parser, Debug)]
#[command(name = "pr-resolver", version, about)]
struct Cli {
    /// Pull request references: full URLs or short "org/repo#number" ids
    #[arg(required = true)]
    refs: Vec<String>,

    /// Resolve only directly declared dependencies (no transitive expansion)
    #[arg(long)]
    no_recursive: bool,

    /// Print the resolved closure without invoking the clone command
    #[arg(long)]
    dry_run: bool,

    /// Override the external clone command
    #[arg(long, value_name = "COMMAND")]
    clone_with: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let _main_span = info_span!("pr_resolve", refs = cli.refs.len()).entered();

    info!("loading configuration");
    let config = config::Config::load()?;

    let client = match &config.github.api_url {
        Some(api_url) => github::GitHubClient::with_api_url(api_url, config.github_token()),
        None => github::GitHubClient::new(config.github_token()),
    };

    info!("resolving dependency closure");
    let closure = resolve::resolve(&client, &cli.refs, !cli.no_recursive).await?;
    info!(dependencies = closure.len(), "resolution complete");

    if closure.is_empty() {
        println!("No dependencies found.");
        return Ok(());
    }

    let cloner = clone::CloneCommand::from_config(&config.clone, cli.clone_with.as_deref());
    if !cli.dry_run {
        info!(command = cloner.program(), "cloning resolved pull requests");
    }
    for pr in &closure {
        let url = pr.to_string();
        println!("{}", url);
        if cli.dry_run {
            continue;
        }
        // Clone invocations are independent: one failure does not stop the
        // remaining URLs from being attempted.
        match cloner.clone_pull_request(&url) {
            Ok(()) => println!("  {}", "cloned".green()),
            Err(e) => {
                error!(%url, error = %e, "clone failed");
                println!("  {}", "clone failed".red().bold());
            }
        }
    }

    Ok(())
}
