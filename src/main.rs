// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments and load the config file
// 2. Crawl every configured site, one after the other
// 3. Print the results and notify someone if links are broken
// 4. Exit with proper code (0 = success, 1 = broken links, 2 = error)
//
// With a cron spec in the config (and no --now) steps 2-3 repeat on that
// schedule and the program never exits on its own.
// =============================================================================

mod checker; // src/checker/ - link extraction and HTTP checks
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - YAML config file
mod crawl; // src/crawl/ - concurrent site crawling
mod model; // src/model.rs - Link and SiteResult
mod notify; // src/notify.rs - notification providers
mod report; // src/report.rs - filtering and rendering results
mod schedule; // src/schedule.rs - cron schedule parsing

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, OutputFormat};
use config::Config;
use model::SiteResult;
use notify::Notifier;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = no broken links
//   Ok(1) = broken links found
//   Err   = config or setup problem (exit code 2)
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("could not load config '{}'", cli.config.display()))?;

    init_tracing(cli.verbose || config.verbose);

    let Some(cron_schedule) = config.schedule(cli.now)? else {
        return check_sites(&config, cli.format).await;
    };

    tracing::info!(cron = config.cron.as_deref().unwrap_or_default(), "started with cron");
    loop {
        let Some(wait) = schedule::until_next(&cron_schedule) else {
            tracing::warn!("cron schedule has no upcoming runs, stopping");
            return Ok(0);
        };
        tracing::info!(next_run_secs = wait.as_secs(), "waiting for next run");
        tokio::time::sleep(wait).await;

        // Failed runs are logged and the schedule carries on
        if let Err(e) = check_sites(&config, cli.format).await {
            let error = format!("{:#}", e);
            tracing::error!(%error, "scheduled check failed");
        }
    }
}

// One full pass over every configured site
async fn check_sites(config: &Config, format: OutputFormat) -> Result<i32> {
    let mut results = Vec::with_capacity(config.sites.len());
    for site in &config.sites {
        let result = crawl::check_site(site.url(), &config.crawl_options(site))
            .await
            .with_context(|| format!("failed to check site {}", site.url()))?;
        results.push(result);
    }

    print_results(&results, format)?;

    let broken = report::broken_sites(&results);
    let notified = notify_broken_sites(config, &broken).await;

    if notified {
        if let Some(url) = &config.health_check_url {
            notify::ping_health_check(url).await;
        }
    }

    if broken.is_empty() {
        tracing::info!("no broken links found");
        Ok(0)
    } else {
        Ok(1)
    }
}

// Logs go to stderr so they never mix with the results on stdout.
// RUST_LOG overrides the level picked by --verbose.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// Sends the broken sites to the configured provider, if any.
// Returns false only when a notification should have gone out and didn't.
async fn notify_broken_sites(config: &Config, broken: &[&SiteResult]) -> bool {
    let Some(notify_config) = &config.notify else {
        return true;
    };
    if broken.is_empty() {
        return true;
    }

    tracing::info!(
        sites = broken.len(),
        provider = %notify_config.provider,
        "sites with broken links found, sending notification"
    );

    let outcome = async {
        let notifier = Notifier::from_config(notify_config)?;
        let message = report::to_pretty_json(broken)?;
        notifier.send(&message).await?;
        anyhow::Ok(())
    }
    .await;

    match outcome {
        Ok(()) => true,
        Err(e) => {
            let error = format!("{:#}", e);
            tracing::error!(%error, "notifying user failed");
            false
        }
    }
}

// Prints the results either as JSON or as a table
fn print_results(results: &[SiteResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", report::to_pretty_json(results)?),
        OutputFormat::Table => print_table(results),
    }
    Ok(())
}

// Prints broken links as a human-readable table in the terminal
fn print_table(results: &[SiteResult]) {
    for result in results {
        println!("🔍 {}", result.site);

        if result.details.broken.is_empty() {
            println!("   ✅ No broken links\n");
            continue;
        }

        println!("   {:<60} {:<30} {:<40}", "URL", "STATUS", "FOUND ON");
        println!("   {}", "=".repeat(130));
        for link in &result.details.broken {
            let status = link.status.as_deref().unwrap_or("");
            let page = if link.page.is_empty() { "-" } else { link.page.as_str() };
            println!(
                "   {:<60} {:<30} {:<40}",
                truncate(&link.url, 57),
                truncate(status, 27),
                truncate(page, 37)
            );
        }
        println!();
    }

    let checked: usize = results.iter().map(|r| r.summary.urls_checked).sum();
    let broken: usize = results.iter().map(|r| r.summary.urls_broken).sum();

    println!("📊 Summary:");
    println!("   📋 Sites: {}", results.len());
    println!("   🌐 Checked: {}", checked);
    println!("   ❌ Broken: {}", broken);
}

// Shortens long values so the columns stay aligned
fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        let head: String = value.chars().take(max).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}
