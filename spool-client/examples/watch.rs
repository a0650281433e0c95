//! Live Fleet Watcher Example
//!
//! Demonstrates the full sync engine against a running farm controller:
//! 1. Bootstrap the cache over HTTP
//! 2. Attach the push channel for live updates
//! 3. Render printers and the job queue from the local cache
//!
//! Run: cargo run --example watch -- http://localhost:5000 127.0.0.1:5055

use spool_client::{ClientConfig, FleetStore, HttpClient, PushConfig, PushSession, SyncEngine};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let base_url = args
        .next()
        .unwrap_or_else(|| "http://localhost:5000".to_string());
    let push_addr = args.next().unwrap_or_else(|| "127.0.0.1:5055".to_string());

    println!("\n🖨️  Spool Fleet Watcher");
    println!("   API:  {}", base_url);
    println!("   Push: {}\n", push_addr);

    let config = ClientConfig::new(&base_url).with_push_addr(&push_addr);
    let api = Arc::new(HttpClient::new(&config));
    let engine = SyncEngine::start(api, &config);

    engine.bootstrap().await;
    println!("✅ Cache bootstrapped\n");

    let session = PushSession::new(PushConfig::lan());
    engine.attach_push(&session);
    if let Some(addr) = &config.push_addr {
        session.connect(addr, "watch-example").await?;
        println!("✅ Push channel connected\n");
    }

    // Renders read the cache only; the engine keeps it converging.
    loop {
        tokio::time::sleep(Duration::from_secs(2)).await;
        render(engine.store(), session.is_connected());
    }
}

fn render(store: &FleetStore, live: bool) {
    println!(
        "━━━ printers ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━ {} ━━━",
        if live { "live" } else { "polling" }
    );
    for printer in store.printers() {
        println!(
            "  {:<14} {:<9} {}",
            printer.name,
            printer.stage(),
            printer.stage_detail()
        );
    }

    println!("━━━ queue ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for job in store.jobs() {
        println!(
            "  {:>3}. {:<28} {}/{}",
            job.priority + 1,
            job.display_name(),
            job.sent,
            job.quantity
        );
    }
    if let Some(stats) = store.stats() {
        println!(
            "  ∑ {:.1} kg filament, {} parts sent",
            stats.total_filament_kg, stats.total_sent
        );
    }
    println!();
}
