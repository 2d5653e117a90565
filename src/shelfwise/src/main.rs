//! Shelfwise — personalised book recommendation engine.
//!
//! Demo entry point: seeds an in-memory dataset, derives preference vectors
//! from the reviews, fills every user's recommendations and then keeps them
//! fresh on a periodic schedule.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use shelfwise_core::config::AppConfig;
use shelfwise_engine::{PreferenceEngine, RecommendationScheduler, Recommender};
use shelfwise_store::MemoryStore;

#[derive(Parser, Debug)]
#[command(name = "shelfwise")]
#[command(about = "Personalised book recommendation engine")]
#[command(version)]
struct Cli {
    /// Seconds between refresh passes (overrides config)
    #[arg(long, env = "SHELFWISE__SCHEDULER__REFRESH_INTERVAL_SECS")]
    refresh_interval_secs: Option<u64>,

    /// Number of genres in the demo catalog
    #[arg(long, default_value_t = 20)]
    genres: usize,

    /// Number of books to seed
    #[arg(long, default_value_t = 200)]
    books: usize,

    /// Number of users to seed
    #[arg(long, default_value_t = 25)]
    users: usize,

    /// RNG seed for the demo dataset
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Run a single rebuild and refresh pass, then exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelfwise=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Shelfwise starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(secs) = cli.refresh_interval_secs {
        config.scheduler.refresh_interval_secs = secs;
    }

    info!(
        max_live = config.recommendations.max_live,
        live_ttl_days = config.recommendations.live_ttl_days,
        bad_rec_ttl_weeks = config.recommendations.bad_rec_ttl_weeks,
        refresh_interval_secs = config.scheduler.refresh_interval_secs,
        "Configuration loaded"
    );

    let store = Arc::new(MemoryStore::new(cli.genres));
    store.seed_demo(cli.books, cli.users, cli.seed);

    let preferences = Arc::new(PreferenceEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let recommender = Arc::new(Recommender::new(
        store.clone(),
        preferences.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        config.recommendations.clone(),
    ));
    let scheduler = Arc::new(RecommendationScheduler::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        preferences.clone(),
        recommender.clone(),
        config.recommendations.clone(),
    ));

    let rebuilt = preferences.rebuild_all();
    let refreshed = scheduler.refresh_all();
    info!(rebuilt, refreshed, "initial pass complete");

    log_sample(&store, &recommender);

    if cli.once {
        return Ok(());
    }

    let interval = std::time::Duration::from_secs(config.scheduler.refresh_interval_secs);
    let scheduler_for_loop = scheduler.clone();
    let preferences_for_loop = preferences.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; the initial pass above covered it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let rebuilt = preferences_for_loop.rebuild_all();
            let refreshed = scheduler_for_loop.refresh_all();
            info!(rebuilt, refreshed, "scheduled refresh pass complete");
        }
    });

    info!("Shelfwise is running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    Ok(())
}

/// Log one seeded user's ranked shelf so a demo run shows real output.
fn log_sample(store: &Arc<MemoryStore>, recommender: &Recommender) {
    use shelfwise_store::Catalog;

    let Some(user_id) = Catalog::users(&**store).first().copied() else {
        return;
    };
    match recommender.recommend(user_id) {
        Ok(ranked) => {
            for (position, scored) in ranked.iter().enumerate() {
                info!(
                    user_id = %user_id,
                    position = position + 1,
                    book_id = %scored.book_id,
                    match_percent = scored.match_percent(),
                    "sample recommendation"
                );
            }
        }
        Err(error) => warn!(user_id = %user_id, error = %error, "sample ranking failed"),
    }
}
