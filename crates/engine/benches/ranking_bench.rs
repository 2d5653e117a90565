//! Benchmark for catalog ranking.
//! Run with: cargo bench

use std::sync::Arc;

use shelfwise_core::config::RecommendationConfig;
use shelfwise_engine::{PreferenceEngine, Recommender};
use shelfwise_store::{Catalog, MemoryStore};

fn main() {
    let store = Arc::new(MemoryStore::new(20));
    store.seed_demo(2_000, 50, 7);

    let preferences = Arc::new(PreferenceEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let recommender = Recommender::new(
        store.clone(),
        preferences.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        RecommendationConfig::default(),
    );

    preferences.rebuild_all();
    let users = Catalog::users(&*store);

    // Warmup
    for user in &users {
        recommender.recommend(*user).unwrap();
    }

    // Benchmark
    let iterations = 200;
    let start = std::time::Instant::now();

    for _ in 0..iterations {
        for user in &users {
            let _ = recommender.recommend(*user).unwrap();
        }
    }

    let elapsed = start.elapsed();
    let calls = iterations * users.len() as u32;
    let per_call = elapsed / calls;

    println!("=== Ranking Benchmark ===");
    println!("Catalog size: 2000 books, 20 genres");
    println!("Calls:        {}", calls);
    println!("Total time:   {:?}", elapsed);
    println!("Per call:     {:?}", per_call);
    println!(
        "Throughput:   {:.0} rankings/sec",
        calls as f64 / elapsed.as_secs_f64()
    );
}
