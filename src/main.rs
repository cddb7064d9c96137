use std::{path::PathBuf, process::ExitCode, time::Duration};

use card_enricher::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_SAVE_INTERVAL, Dataset, FetchEnv, JobOptions, LoadFromEnv,
    RetryPolicy, ScrapingContext, SiteConfig, run_detail_job, run_fix_sets_job, run_listing_job,
    updated_sample,
};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use log::{LevelFilter, error, info};

/// Enrich a local cards.json from the online card catalog.
#[derive(Debug, Parser)]
#[command(name = "card_enricher", version, about)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Canonical dataset, rewritten in place.
    #[arg(long, global = true, default_value = "card_db/cards.json")]
    cards: PathBuf,
    /// Published copy kept identical to the dataset when it exists.
    #[arg(long, global = true, default_value = "docs/cards.json")]
    docs_cards: PathBuf,
    /// YAML site layout; the built-in catalog layout when omitted.
    #[arg(long, global = true)]
    site_config: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,
    /// Upper bound of the random jitter added to each backoff, in ms.
    #[arg(long, global = true, default_value_t = 100)]
    max_jitter_ms: u64,
    /// Checkpoint after this many updated cards.
    #[arg(long, global = true, default_value_t = DEFAULT_SAVE_INTERVAL)]
    save_interval: usize,
    /// Do everything except writing; print a few updated cards instead.
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fill set names and codes from listing tiles only.
    Listing {
        /// Seconds to pause after each request, also the backoff base.
        #[arg(long, default_value = "0.15", value_parser = parse_seconds)]
        delay: Duration,
        #[arg(long)]
        max_pages: Option<u32>,
    },
    /// Visit every card's detail page and fill all scraped fields.
    Detail {
        #[arg(long, default_value = "0.25", value_parser = parse_seconds)]
        delay: Duration,
        #[arg(long)]
        max_pages: Option<u32>,
        /// Skip detail pages that can't be fetched instead of aborting.
        #[arg(long)]
        skip_failed_details: bool,
    },
    /// Map set codes to names from the listing and name unnamed sets.
    FixSets {
        #[arg(long, default_value = "0.2", value_parser = parse_seconds)]
        delay: Duration,
        #[arg(long, default_value_t = 40)]
        max_pages: u32,
    },
}

impl Command {
    fn delay(&self) -> Duration {
        match self {
            Command::Listing { delay, .. }
            | Command::Detail { delay, .. }
            | Command::FixSets { delay, .. } => *delay,
        }
    }
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("expected a non-negative number of seconds, got {s}"));
    }
    Ok(Duration::from_millis((secs * 1000.0).round() as u64))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let common = &cli.common;
    let site = match &common.site_config {
        Some(path) => SiteConfig::load(path)?,
        None => SiteConfig::builtin()?,
    };
    let env = FetchEnv::load_from_env()?;
    let delay = cli.command.delay();
    let retry = RetryPolicy::new(
        delay,
        common.max_attempts,
        Duration::from_millis(common.max_jitter_ms),
    );
    let context = ScrapingContext::new(site, &env, retry, delay)?;
    info!(
        "scraping {} (delay {:?}, up to {} attempts per request)",
        context.site.base_url,
        delay,
        context.request_client.retry_policy().max_attempts
    );

    let mut dataset =
        Dataset::load(&common.cards)?.with_published_copy(Some(common.docs_cards.clone()));

    let mut options = JobOptions {
        save_interval: common.save_interval,
        dry_run: common.dry_run,
        ..JobOptions::default()
    };
    let state = match &cli.command {
        Command::Listing { max_pages, .. } => {
            options.max_pages = *max_pages;
            run_listing_job(&context, &context.parser, &mut dataset, &options).await?
        }
        Command::Detail {
            max_pages,
            skip_failed_details,
            ..
        } => {
            options.max_pages = *max_pages;
            options.skip_failed_details = *skip_failed_details;
            run_detail_job(&context, &context.parser, &mut dataset, &options).await?
        }
        Command::FixSets { max_pages, .. } => {
            options.max_pages = Some(*max_pages);
            run_fix_sets_job(&context, &context.parser, &mut dataset, &options).await?
        }
    };

    if common.dry_run {
        let sample = updated_sample(&dataset, &state, 3);
        println!("{}", serde_json::to_string_pretty(&sample)?);
    }
    println!("{}", state.summary());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
