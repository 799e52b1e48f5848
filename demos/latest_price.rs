//! # Example: latest_price
//!
//! A fast ticker publishes prices; consumers of different speeds only ever see
//! the latest one.
//!
//! Shows how to:
//! - Publish with [`ConflatedBroadcast::send`] without ever blocking.
//! - Read with a slow [`Subscription`] and observe conflation.
//! - Attach background observers through [`ObserverSet`].
//! - Register a close handler and cancel the channel.
//!
//! ## Flow
//! ```text
//! ticker ──► ConflatedBroadcast::send(price)
//!                 ├─► Subscription (slow reader, skips prices)
//!                 └─► ObserverSet ──► LogWriter.on_value()
//! ticker done ──► cancel("market closed") ──► close handler, readers see the cause
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example latest_price --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use conflated_broadcast::{
    BroadcastError, Cancelled, Config, ConflatedBroadcast, LogWriter, Observe, ObserverSet,
    Subscription,
};
use tracing_subscriber::EnvFilter;

async fn slow_reader(mut sub: Subscription<f64>) -> usize {
    let mut seen = 0;
    loop {
        match sub.recv().await {
            Ok(price) => {
                seen += 1;
                println!("[reader] price={price:.2}");
                tokio::time::sleep(Duration::from_millis(35)).await;
            }
            Err(BroadcastError::ClosedWithCause(cause)) => {
                println!("[reader] closed: {cause}");
                return seen;
            }
            Err(e) => {
                println!("[reader] stopped: {}", e.as_message());
                return seen;
            }
        }
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let prices = ConflatedBroadcast::with_config(Config::named("prices"));
    prices.invoke_on_close(|cause| {
        println!(
            "[handler] prices closed, cause={}",
            cause.map(|c| c.to_string()).unwrap_or_else(|| "none".into())
        );
    })?;

    let observers = ObserverSet::spawn(&prices, vec![Arc::new(LogWriter::new()) as Arc<dyn Observe<f64>>]);
    let reader = tokio::spawn(slow_reader(prices.subscribe()));

    let mut price = 100.0;
    for tick in 0..50u32 {
        price += f64::from(tick % 7) * 0.25 - 0.75;
        prices.send(price)?;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    prices.cancel(Some(Cancelled::new("market closed")));
    let seen = reader.await?;
    observers.join().await;

    println!("[main] sent 50 prices, slow reader saw {seen}");
    println!("[main] send after close: {:?}", prices.send(0.0).map_err(|e| e.as_label()));
    Ok(())
}
