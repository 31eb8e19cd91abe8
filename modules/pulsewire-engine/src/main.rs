use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pulsewire_common::{config, Config};
use pulsewire_engine::classifier::Classifier;
use pulsewire_engine::composer::Composer;
use pulsewire_engine::generator::{GenerationConfig, GenerationWorker};
use pulsewire_engine::personas::PersonaRegistry;
use pulsewire_engine::poller::{ClassificationPoller, PollerConfig};
use pulsewire_engine::schedule::Pacing;
use pulsewire_store::{NewPost, PgStore};

#[derive(Parser)]
#[command(
    name = "pulsewire",
    about = "Synthetic post generation and incident watching"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a real post
    Report {
        /// Post text
        #[arg(long)]
        text: String,
    },
    /// Fan a seed post out into synthetic posts
    Generate {
        /// Seed post id, or "latest" for the most recent real post
        #[arg(long, default_value = "latest")]
        seed: String,
        /// Posts to generate
        #[arg(long)]
        count: Option<usize>,
        /// Spread the job across this many minutes
        #[arg(long)]
        minutes: Option<f64>,
        /// Emit at this rate in posts per minute (overrides --minutes)
        #[arg(long)]
        rate: Option<f64>,
        /// Language weights, JSON or key=value pairs
        #[arg(long)]
        langs: Option<String>,
        /// Persona weights, JSON or key=value pairs
        #[arg(long)]
        personas: Option<String>,
        /// Hashtag pool, JSON array or comma separated
        #[arg(long)]
        tags: Option<String>,
    },
    /// Poll for unprocessed posts and record confirmed incidents
    Watch {
        /// Seconds between polling passes
        #[arg(long)]
        interval_secs: Option<u64>,
        /// Posts per polling pass
        #[arg(long)]
        limit: Option<i64>,
        /// Minimum confidence for a confirmed incident
        #[arg(long)]
        threshold: Option<u8>,
        /// Also classify synthetic posts
        #[arg(long)]
        include_synthetic: bool,
    },
    /// List recent posts
    Posts {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// List recent confirmed incidents
    Incidents {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

struct GenerateArgs {
    seed: String,
    count: Option<usize>,
    minutes: Option<f64>,
    rate: Option<f64>,
    langs: Option<String>,
    personas: Option<String>,
    tags: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulsewire=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Report { text } => {
            let store = connect(&Config::store_from_env()).await?;
            cmd_report(&store, &text).await
        }
        Command::Generate {
            seed,
            count,
            minutes,
            rate,
            langs,
            personas,
            tags,
        } => {
            let cfg = Config::from_env();
            let store = connect(&cfg).await?;
            cmd_generate(
                store,
                cfg,
                GenerateArgs {
                    seed,
                    count,
                    minutes,
                    rate,
                    langs,
                    personas,
                    tags,
                },
            )
            .await
        }
        Command::Watch {
            interval_secs,
            limit,
            threshold,
            include_synthetic,
        } => {
            let cfg = Config::from_env();
            let store = connect(&cfg).await?;
            cmd_watch(store, cfg, interval_secs, limit, threshold, include_synthetic).await
        }
        Command::Posts { limit } => {
            let store = connect(&Config::store_from_env()).await?;
            cmd_posts(&store, limit).await
        }
        Command::Incidents { limit } => {
            let store = connect(&Config::store_from_env()).await?;
            cmd_incidents(&store, limit).await
        }
    }
}

async fn connect(cfg: &Config) -> Result<PgStore> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cfg.database_url)
        .await?;
    let store = PgStore::new(pool);
    store.ensure_schema().await?;
    Ok(store)
}

async fn cmd_report(store: &PgStore, text: &str) -> Result<()> {
    let post = store.create_post(&NewPost::real(text)).await?;
    info!(post_id = post.id, "Report stored");
    println!("stored post #{}", post.id);
    Ok(())
}

async fn cmd_generate(store: PgStore, cfg: Config, args: GenerateArgs) -> Result<()> {
    let count = args.count.unwrap_or(cfg.gen_count);

    // An explicit flag beats the environment; rate beats window at each level.
    let pacing = match (args.rate.filter(|r| *r > 0.0), args.minutes) {
        (Some(per_minute), _) => Pacing::Rate(per_minute),
        (None, Some(minutes)) => Pacing::Window(minutes),
        (None, None) => match cfg.gen_rate_per_minute {
            Some(per_minute) => Pacing::Rate(per_minute),
            None => Pacing::Window(cfg.gen_window_minutes),
        },
    };

    let personas = override_weights(args.personas, cfg.gen_personas);
    let languages = override_weights(args.langs, cfg.gen_languages);
    let hashtag_pool = args
        .tags
        .map(|raw| config::parse_tags(&raw))
        .filter(|tags| !tags.is_empty())
        .unwrap_or(cfg.gen_tags);

    let seed_id = match args.seed.as_str() {
        "latest" => store
            .latest_real_post()
            .await?
            .map(|post| post.id)
            .ok_or_else(|| {
                anyhow!("no real posts in the store yet; add one with `pulsewire report`")
            })?,
        raw => raw
            .parse::<i64>()
            .map_err(|_| anyhow!("--seed must be a post id or \"latest\""))?,
    };

    let gen_config = GenerationConfig::builder()
        .count(count)
        .pacing(pacing)
        .personas(personas)
        .languages(languages)
        .hashtag_pool(hashtag_pool)
        .build();

    let worker = GenerationWorker::new(
        Arc::new(store),
        Arc::new(Composer::new(&cfg.openai_api_key)),
        Arc::new(PersonaRegistry::with_defaults()),
        gen_config,
    )?;

    let stats = worker.run_job(seed_id).await?;
    println!(
        "seed #{seed_id}: {} requested, {} persisted, {} failed",
        stats.requested, stats.persisted, stats.failed
    );
    Ok(())
}

fn override_weights(
    raw: Option<String>,
    fallback: HashMap<String, f64>,
) -> HashMap<String, f64> {
    raw.map(|raw| config::parse_weights(&raw))
        .filter(|weights| !weights.is_empty())
        .unwrap_or(fallback)
}

async fn cmd_watch(
    store: PgStore,
    cfg: Config,
    interval_secs: Option<u64>,
    limit: Option<i64>,
    threshold: Option<u8>,
    include_synthetic: bool,
) -> Result<()> {
    let poller_config = PollerConfig::builder()
        .interval(Duration::from_secs(
            interval_secs.unwrap_or(cfg.watch_interval_secs),
        ))
        .batch_limit(limit.unwrap_or(cfg.watch_batch_limit))
        .threshold(threshold.unwrap_or(cfg.watch_threshold))
        .include_synthetic(include_synthetic || cfg.watch_include_synthetic)
        .build();

    let poller = ClassificationPoller::new(
        Arc::new(store),
        Arc::new(Classifier::new(&cfg.openai_api_key)),
        poller_config,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { poller.run(shutdown_rx).await });

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, stopping watcher");
    let _ = shutdown_tx.send(true);
    handle.await?;

    Ok(())
}

async fn cmd_posts(store: &PgStore, limit: i64) -> Result<()> {
    let posts = store.recent_posts(limit).await?;
    if posts.is_empty() {
        println!("no posts yet");
        return Ok(());
    }
    for post in posts {
        let kind = if post.is_synthetic { "synthetic" } else { "real" };
        println!(
            "#{} [{kind}] {} processed={} {}",
            post.id,
            post.created_at.format("%Y-%m-%d %H:%M:%S"),
            post.processed,
            post.text
        );
    }
    Ok(())
}

async fn cmd_incidents(store: &PgStore, limit: i64) -> Result<()> {
    let incidents = store.recent_incidents(limit).await?;
    if incidents.is_empty() {
        println!("no confirmed incidents");
        return Ok(());
    }
    for incident in incidents {
        println!(
            "#{} post=#{} confidence={} type={} area={} {}",
            incident.id,
            incident.source_post_id,
            incident.confidence,
            incident.incident_type.as_deref().unwrap_or("-"),
            incident.location_area.as_deref().unwrap_or("-"),
            incident.summary.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
