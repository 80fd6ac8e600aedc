//! 🚀 slax-cli: the front door, the bouncer, the maitre d' of slax.
//!
//! 🎬 *[narrator voice]* "It all started with a simple question: how late are we?"
//! 📦 This binary crate is the thin CLI wrapper that loads config, sets up logging,
//! runs one refresh (or one lookup), prints tables, and lets the library do the
//! heavy lifting. Like a manager. 🦆

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use slax::{AppConfig, Dashboard, SlaFilter, render};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "slax-cli")]
#[command(about = "SLA and daily operations report for a ticketing project")]
struct Cli {
    /// 📋 TOML config file. Missing file means environment variables only.
    #[arg(long, default_value = "slax.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 📊 Run one refresh cycle and print the report.
    Report {
        /// 🔘 Which tickets the table shows: all, within or breached.
        #[arg(long, default_value = "all")]
        filter: SlaFilter,

        /// 👤 Also print this assignee's active tickets.
        #[arg(long)]
        assignee: Option<String>,

        /// 🏁 Also print what this assignee closed today.
        #[arg(long)]
        closed_by: Option<String>,

        /// 🦆 Print the report as JSON instead of tables.
        #[arg(long)]
        json: bool,
    },
    /// 🔍 Look up a single ticket by id (`TKTS-1234` or just `1234`).
    Lookup {
        id: String,
    },
}

/// 🔧 Config path that exists, or `None` for environment-only.
fn resolve_config_path(path: &Path) -> Result<Option<&Path>> {
    let exists = path.try_exists().with_context(|| {
        format!(
            "💀 Couldn't check whether the config file exists. If it's a relative path, \
            try an absolute one. Was checking here: '{}'",
            path.display()
        )
    })?;
    Ok(exists.then_some(path))
}

async fn report(
    config: &AppConfig,
    filter: SlaFilter,
    assignee: Option<String>,
    closed_by: Option<String>,
    json: bool,
) -> Result<()> {
    let mut dashboard = Dashboard::from_config(config).context("💀 Could not build the dashboard")?;
    let report = dashboard.refresh().await.context("💀 The refresh cycle failed")?;

    if json {
        let rendered = serde_json::to_string_pretty(&report).context("💀 Could not serialize the report")?;
        println!("{rendered}");
        return Ok(());
    }

    println!("{}", render::render_report(&report, filter));
    if let Some(ref assignee) = assignee {
        println!("\n{}", render::render_assignee(&report, assignee));
    }
    if let Some(ref assignee) = closed_by {
        println!("\n{}", render::render_closed_by(&report, assignee));
    }
    Ok(())
}

async fn lookup(config: &AppConfig, id: &str) -> Result<()> {
    let mut dashboard = Dashboard::from_config(config).context("💀 Could not build the dashboard")?;

    // 🌀 so you know we didn't freeze. we're just waiting on Jira.
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Fetching details for {id}..."));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let details = dashboard.lookup(id).await;
    spinner.finish_and_clear();

    let details = details.with_context(|| format!("💀 Could not look up ticket '{id}'"))?;
    println!("{}", render::render_ticket(&details));
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = resolve_config_path(&cli.config)?;
    let config = slax::load_config(config_path).context(
        "💀 Couldn't load the configuration. Check the TOML file and the SLAX_* environment \
        variables; ticketing.base_url is required either way",
    )?;

    match cli.command {
        Command::Report {
            filter,
            assignee,
            closed_by,
            json,
        } => report(&config, filter, assignee, closed_by, json).await,
        Command::Lookup { id } => lookup(&config, &id).await,
    }
}

/// 🚀 main(): init tracing, parse args, run one command, and if it goes wrong, say why.
#[tokio::main]
async fn main() {
    // 📡 println! debugging is a lifestyle choice we're trying to move past
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion, one layer at a time
        let mut looks_like_connectivity = false;
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("transport error")
                || cause_str.contains("error sending request")
                || cause_str.contains("connection refused")
                || cause_str.contains("Connection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
            {
                looks_like_connectivity = true;
            }
        }

        if looks_like_connectivity {
            error!(
                "🔧 hint: the ticketing or mail API isn't reachable. Check ticketing.base_url, \
                your VPN, and whether the API is having a day. Even servers need a nudge sometimes. ☕"
            );
        }

        std::process::exit(1);
    }
}
