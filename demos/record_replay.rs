//! Record a short counter session, save it, and play it back with a delay.
//!
//! Run with `RUST_LOG=dispatch_recorder=debug cargo run --example record_replay`
//! to see the recorder's own log lines.

use dispatch_recorder::bus::{DispatchBus, Dispatcher, Symbol};
use dispatch_recorder::core::Event;
use dispatch_recorder::recorder::Recorder;
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let bus = Arc::new(Dispatcher::new());
    let inc = bus.symbol_for("inc")?;
    let reset = bus.symbol_for("reset")?;

    // A store that reacts to the actions.
    let counter = Arc::new(AtomicI64::new(0));
    let store = Arc::clone(&counter);
    let (inc_key, reset_key) = (inc.clone(), reset.clone());
    bus.subscribe(Arc::new(move |event: &Event<Symbol>| {
        if event.action == inc_key {
            store.fetch_add(event.data.as_i64().unwrap_or(1), Ordering::SeqCst);
        } else if event.action == reset_key {
            store.store(0, Ordering::SeqCst);
        }
        Ok(())
    }));

    let mut recorder = Recorder::builder()
        .bus(Arc::clone(&bus))
        .pretty(true)
        .build()?;
    recorder.record();
    bus.dispatch(inc.clone(), json!(1))?;
    bus.dispatch(inc.clone(), json!(2))?;
    bus.dispatch(inc, json!(3))?;
    recorder.stop();
    info!(counter = counter.load(Ordering::SeqCst), "session recorded");

    let saved = recorder.serialize_events()?;
    println!("{saved}");

    bus.dispatch(reset, json!(null))?;
    info!(counter = counter.load(Ordering::SeqCst), "store reset");

    let mut replayer = Recorder::new(Arc::clone(&bus));
    replayer.load_events(&saved)?;

    let done_counter = Arc::clone(&counter);
    let replay = replayer.replay(
        Some(Duration::from_millis(200)),
        Some(Box::new(move || {
            info!(counter = done_counter.load(Ordering::SeqCst), "replay finished");
        })),
    )?;

    if let Some(handle) = replay.into_handle() {
        let outcome = handle.wait().await;
        info!(?outcome, "replay outcome");
    }

    Ok(())
}
