use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kream_trades::browser::ChromeSession;
use kream_trades::config::{default_config_path, Config};
use kream_trades::credentials::{prompt_credentials, Credentials};
use kream_trades::export::DelimitedExporter;
use kream_trades::location::NavigationTarget;
use kream_trades::scrape::{ScrapeReport, ScrapeSettings, SoftFailure, TradeHistoryScraper};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "kream-trades")]
#[command(about = "Export the trade history of a KREAM product")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Product page to scrape (defaults to site.default_product_url)
    #[arg(short, long, global = true)]
    product: Option<String>,

    /// Where to land after signing in (defaults to the product page)
    #[arg(long, global = true)]
    redirect: Option<String>,

    /// Account email; the password is still read from the configured backend or prompted
    #[arg(long, global = true)]
    email: Option<String>,

    /// Run Chrome without a window
    #[arg(long, global = true)]
    headless: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in, scrape the trade history and export it (default)
    Run {
        /// Output file (.csv or .tsv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sign in only and report whether it worked
    Login,
    /// Show the effective configuration
    Config,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,chromiumoxide=warn,chromiumoxide::conn=off,chromiumoxide::handler=off")
    });
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

/// Credentials from the configured backend, then the terminal.
async fn resolve_credentials(config: &Config, email: Option<&str>) -> Result<Credentials> {
    let store = config.credentials.build();
    match Credentials::load(store.as_ref()).await {
        Ok(Some(credentials)) if email.is_none() => {
            tracing::info!(backend = %store.describe(), "Using stored credentials");
            return Ok(credentials);
        }
        Ok(Some(credentials)) => {
            let email = email.unwrap_or_default();
            if credentials.email() == email {
                return Ok(credentials);
            }
            tracing::debug!("Stored credentials belong to another account");
        }
        Ok(None) => {
            tracing::debug!(backend = %store.describe(), "No stored credentials");
        }
        Err(e) => {
            tracing::warn!(backend = %store.describe(), error = %e, "Failed to read credentials");
        }
    }
    tokio::task::block_in_place(|| prompt_credentials(email))
}

fn print_warnings(warnings: &[SoftFailure]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

fn print_report(report: &ScrapeReport, output: &std::path::Path) {
    print_warnings(&report.warnings);
    if !report.authenticated {
        eprintln!("warning: continued without a confirmed sign-in");
    }
    println!(
        "{} records from {} rows after {} scrolls ({})",
        report.records.len(),
        report.rows_seen,
        report.scrolls,
        report.scraped_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
    );
    if report.exported > 0 {
        println!("Saved to {}", output.display());
    } else {
        println!("Nothing exported");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = Config::load_or_default(&cli.config)?;
    if cli.headless {
        config.browser.headless = true;
    }

    let command = cli.command.unwrap_or(Command::Run { output: None });
    if let Command::Config = command {
        println!("# {}", cli.config.display());
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let product = NavigationTarget::new(
        cli.product
            .clone()
            .unwrap_or_else(|| config.site.default_product_url.clone()),
    );
    let redirect = cli
        .redirect
        .as_deref()
        .map(NavigationTarget::new)
        .filter(|target| !target.is_blank());

    let credentials = resolve_credentials(&config, cli.email.as_deref()).await?;
    credentials.validate()?;

    let session = ChromeSession::launch(&config.browser)
        .await
        .context("Failed to start Chrome")?;
    let scraper = TradeHistoryScraper::new(session.driver(), ScrapeSettings::from_config(&config));

    let result = match command {
        Command::Run { output } => {
            let output = output.unwrap_or_else(|| config.export.output.clone());
            scraper
                .run_and_export(
                    &credentials,
                    &product,
                    redirect.as_ref(),
                    &DelimitedExporter,
                    &output,
                )
                .await
                .map(|report| print_report(&report, &output))
        }
        Command::Login => scraper
            .login(&credentials, redirect.as_ref())
            .await
            .map(|report| {
                print_warnings(&report.warnings);
                if report.session.is_authenticated() {
                    println!("Signed in; now at {}", report.session.location());
                } else {
                    println!("Not signed in; still at {}", report.session.location());
                }
            }),
        Command::Config => Ok(()),
    };

    session.close().await;
    result?;
    Ok(())
}
