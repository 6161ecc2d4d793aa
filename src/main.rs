//! netstash - offline-first HTTP fetch with rule-based cache routing.
//!
//! Every outgoing request is matched against an ordered rule list. Each rule
//! binds a URL pattern to a caching strategy (network-first, cache-first, or
//! stale-while-revalidate) and a durable storage namespace, so previously
//! fetched responses stay available when the network is slow or gone.

mod cache;
mod config;
mod error;
mod net;
mod router;
mod rules;
mod strategy;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cache::CacheManager;
use config::Config;
use net::{HttpBackend, NetworkBackend, OfflineBackend, Request};
use router::CacheRouter;
use rules::RuleSet;

/// Environment variable forcing offline mode
const OFFLINE_ENV: &str = "NETSTASH_OFFLINE";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn print_usage() {
    eprintln!("Usage: netstash [--offline] <url>   fetch a URL through the cache router");
    eprintln!("       netstash --ages              show per-cache entry counts and ages");
    eprintln!("       netstash --purge             delete all cached entries");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    let config = Config::load()?;
    let ruleset = RuleSet::compile(&config.rules).context("Invalid cache rules")?;
    debug!(rules = ruleset.len(), "Compiled cache rules");
    let cache = Arc::new(CacheManager::open(Config::cache_dir()?, &ruleset)?);

    if args.iter().any(|a| a == "--ages") {
        for ns in cache.stats().await {
            let age = ns.newest_age.unwrap_or_else(|| "never".to_string());
            println!("{:<12} {:>4} entries   {}", ns.name, ns.entries, age);
        }
        return Ok(());
    }

    if args.iter().any(|a| a == "--purge") {
        cache.purge().await?;
        println!("Cache purged");
        return Ok(());
    }

    let Some(url) = args.iter().skip(1).find(|a| !a.starts_with("--")) else {
        print_usage();
        std::process::exit(2);
    };

    let offline = args.iter().any(|a| a == "--offline") || std::env::var(OFFLINE_ENV).is_ok();
    let backend: Arc<dyn NetworkBackend> = if offline {
        Arc::new(OfflineBackend)
    } else {
        Arc::new(HttpBackend::new()?)
    };

    let router = CacheRouter::new(ruleset, Arc::clone(&cache), backend);

    info!(url = %url, offline, "netstash starting");
    let started = Instant::now();
    let result = router.handle(&Request::get(url.as_str())).await;

    router.shutdown().await?;
    info!("netstash shutting down");

    match result {
        Ok(routed) => {
            eprintln!(
                "{} {} ({} bytes, {} ms)",
                routed.status,
                routed.response.status,
                routed.response.body.len(),
                started.elapsed().as_millis()
            );
            io::stdout().write_all(&routed.response.body)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
