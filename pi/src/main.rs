mod bme68x;
mod oled;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use envmon_common::config::Config;
use envmon_common::monitor::Monitor;

/// Clears `running` once the process receives Ctrl-C.
///
/// The signal is awaited on a small single-threaded tokio runtime living in
/// its own thread, so the monitor loop itself stays synchronous.
fn stop_on_interrupt(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("interrupt".into())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        log::info!("Interrupted, shutting down");
                        running.store(false, Ordering::Relaxed);
                    }
                    Err(e) => log::error!("Cannot listen for Ctrl-C: {e}"),
                }
            })
        })?;

    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let running = Arc::new(AtomicBool::new(true));
    stop_on_interrupt(running.clone())?;

    let sensor = bme68x::Bme68x::open(&config.hardware)?;
    let display = oled::Oled::open(&config.hardware)?;

    let monitor = Monitor::new(config, display, running)?;
    println!("Press Ctrl-C to quit.");
    monitor.run(sensor)?;

    Ok(())
}
