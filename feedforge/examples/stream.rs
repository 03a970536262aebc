//! Streaming demo: subscribe to a market channel and log trades to CSV.
//!
//! Run with: `cargo run --example stream -- <instrument_id> [...]`
//!
//! Without arguments, instrument ids are discovered from the venue's
//! metadata API.

use feedforge::prelude::*;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut instruments: Vec<String> = std::env::args().skip(1).collect();
    if instruments.is_empty() {
        println!("No instruments given, discovering active markets...");
        let markets = fetch_markets(DEFAULT_METADATA_URL, 5).await?;
        instruments = markets
            .iter()
            .flat_map(MarketInfo::instrument_ids)
            .take(4)
            .collect();
    }
    if instruments.is_empty() {
        return Err("no instruments to subscribe".into());
    }

    let file = File::create("trades.csv")?;
    let writer = Arc::new(Mutex::new(BufWriter::new(file)));
    writeln!(
        writer.lock(),
        "timestamp_recv,timestamp_exch,venue,instrument,price,size,side,best_bid,best_ask"
    )?;

    let sink = Arc::clone(&writer);
    let mut client = FeedClient::builder()
        .polymarket(FeedConfig::default())
        .event_callback(move |event| {
            let best_bid = event
                .best_bid
                .map_or(String::new(), |l| l.price.to_string());
            let best_ask = event
                .best_ask
                .map_or(String::new(), |l| l.price.to_string());
            let mut out = sink.lock();
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{},{},{}",
                event.timestamp_received,
                event.timestamp_exchange,
                event.venue,
                event.instrument_id,
                event.price,
                event.size,
                event.side,
                best_bid,
                best_ask
            );
            let _ = out.flush();
            println!(
                "[{}] {} {} {} @ {} (bid {} / ask {})",
                event.venue,
                event.instrument_id,
                event.side,
                event.size,
                event.price,
                best_bid,
                best_ask
            );
        })
        .build();

    for id in &instruments {
        client.subscribe(id);
    }
    client.connect().await?;
    println!(
        "Streaming {} instruments, press ctrl-c to stop",
        instruments.len()
    );

    tokio::signal::ctrl_c().await?;
    println!("Stopping...");
    client.stop().await;
    println!("Trades written to trades.csv");
    Ok(())
}
