//! The polling and plotting loop.
//!
//! Each cycle shows the newest readings, then the history curve of every
//! channel in turn. Readings are taken either by the loop itself or by a
//! background acquisition thread, see [`AcquisitionMode`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use envmon_model::{Channel, DataStore, Measurement, StoreError};

use crate::canvas::Canvas;
use crate::config::{AcquisitionMode, Config};
use crate::display::{DisplayError, MonoDisplay};
use crate::screens;
use crate::sensor::{EnvironmentSensor, SensorError};
use crate::{SharedHistory, ValueStore};

/// Longest stretch a pause sleeps without looking at the stop flag.
const PAUSE_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("sensor read failed: {0}")]
    Sensor(SensorError),

    #[error("display update failed: {0}")]
    Display(DisplayError),

    #[error("acquisition thread panicked")]
    AcquisitionPanicked,
}

/// Sleeps for `duration`, returning early once `running` is cleared.
///
/// Returns whether the monitor is still running.
pub fn pause(running: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    while running.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep((deadline - now).min(PAUSE_SLICE));
    }
    running.load(Ordering::Relaxed)
}

/// The reading the threaded readings screen shows: a fresh sample from the
/// producer if one arrived, otherwise the newest record in the history.
fn current_reading(
    latest: &ValueStore<Measurement>,
    history: &SharedHistory,
) -> Option<Measurement> {
    latest.take().or_else(|| history.latest())
}

/// Background thread sampling the sensor into the shared history.
pub struct Acquisition {
    handle: JoinHandle<()>,
}

impl Acquisition {
    /// Starts sampling `sensor` every `interval` until `running` is cleared.
    ///
    /// Every reading is appended to `history` and published to `latest`. Failed
    /// reads are logged and skipped.
    pub fn spawn<S>(
        mut sensor: S,
        history: SharedHistory,
        latest: ValueStore<Measurement>,
        interval: Duration,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<Self>
    where
        S: EnvironmentSensor + Send + 'static,
    {
        let handle = std::thread::Builder::new()
            .name("acquisition".into())
            .spawn(move || {
                while running.load(Ordering::Relaxed) {
                    match sensor.read() {
                        Ok(measurement) => {
                            log::info!("{measurement}");
                            history.push(measurement);
                            latest.set(measurement);
                        }
                        Err(e) => log::error!("Error reading sensor: {e}"),
                    }

                    pause(&running, interval);
                }
                log::debug!("Acquisition stopped");
            })?;

        Ok(Self { handle })
    }

    /// Waits for the thread to finish. Clear the stop flag first.
    pub fn join(self) -> Result<(), MonitorError> {
        self.handle
            .join()
            .map_err(|_| MonitorError::AcquisitionPanicked)
    }
}

/// Drives a display from a sensor and keeps the measurement history.
pub struct Monitor<D> {
    config: Config,
    display: D,
    store: DataStore,
    history: SharedHistory,
    canvas: Canvas,
    running: Arc<AtomicBool>,
    tick: usize,
}

impl<D: MonoDisplay> Monitor<D> {
    /// Creates a monitor, loading the stored history.
    ///
    /// The monitor runs until `running` is cleared, typically by an interrupt
    /// handler or the UI thread.
    pub fn new(config: Config, display: D, running: Arc<AtomicBool>) -> Result<Self, MonitorError> {
        let store = DataStore::new(config.datastore.clone());
        let history = SharedHistory::new(store.load(config.history_capacity)?);

        Ok(Self {
            config,
            display,
            store,
            history,
            canvas: Canvas::new(),
            running,
            tick: 0,
        })
    }

    /// The history this monitor records into.
    pub fn history(&self) -> &SharedHistory {
        &self.history
    }

    /// Runs the monitor until stopped, then blanks the display and saves the
    /// history.
    ///
    /// The shutdown steps also run when the loop fails; the loop's error takes
    /// precedence over a shutdown error.
    pub fn run<S>(mut self, sensor: S) -> Result<(), MonitorError>
    where
        S: EnvironmentSensor + Send + 'static,
    {
        log::info!(
            "Monitoring in {:?} mode, {} records in history",
            self.config.mode,
            self.history.len()
        );

        let outcome = match self.config.mode {
            AcquisitionMode::Inline => self.run_inline(sensor),
            AcquisitionMode::Threaded => self.run_threaded(sensor),
        };
        if let Err(e) = &outcome {
            log::error!("Monitor stopped: {e}");
            self.running.store(false, Ordering::Relaxed);
        }

        let shutdown = self.shutdown();
        outcome.and(shutdown)
    }

    fn run_inline<S: EnvironmentSensor>(&mut self, mut sensor: S) -> Result<(), MonitorError> {
        while self.running.load(Ordering::Relaxed) {
            self.begin_cycle();
            let measurement = sensor.read().map_err(MonitorError::Sensor)?;
            log::info!("{measurement}");
            self.history.push(measurement);
            self.show_cycle(Some(measurement))?;
        }
        Ok(())
    }

    fn run_threaded<S>(&mut self, sensor: S) -> Result<(), MonitorError>
    where
        S: EnvironmentSensor + Send + 'static,
    {
        let latest = ValueStore::default();
        let acquisition = Acquisition::spawn(
            sensor,
            self.history.clone(),
            latest.clone(),
            self.config.sample_interval(),
            self.running.clone(),
        )
        .map_err(|e| MonitorError::Sensor(e.into()))?;

        let mut outcome = Ok(());
        while self.running.load(Ordering::Relaxed) {
            self.begin_cycle();
            let measurement = current_reading(&latest, &self.history);
            if let Err(e) = self.show_cycle(measurement) {
                outcome = Err(e);
                break;
            }
        }

        self.running.store(false, Ordering::Relaxed);
        acquisition.join()?;
        outcome
    }

    fn begin_cycle(&mut self) {
        screens::heartbeat(&mut self.canvas, self.tick);
        self.canvas.clear_from_row(1);
    }

    /// Shows the readings screen followed by every curve screen.
    fn show_cycle(&mut self, measurement: Option<Measurement>) -> Result<(), MonitorError> {
        if let Some(measurement) = measurement {
            screens::draw_readings(&mut self.canvas, &measurement);
        }
        self.present()?;
        let still_running = pause(&self.running, self.config.reading_interval());
        self.tick = self.tick.wrapping_add(1);
        if !still_running {
            return Ok(());
        }

        for channel in Channel::ALL {
            let drawn = {
                let history = self.history.lock();
                screens::draw_channel_curve(&mut self.canvas, &history, channel)
            };
            if drawn {
                self.present()?;
            }
            if !pause(&self.running, self.config.curve_interval()) {
                break;
            }
        }
        Ok(())
    }

    fn present(&mut self) -> Result<(), MonitorError> {
        self.display
            .show(&self.canvas)
            .map_err(MonitorError::Display)
    }

    fn shutdown(&mut self) -> Result<(), MonitorError> {
        let cleared = self.display.clear().map_err(MonitorError::Display);
        let history = self.history.lock();
        self.store.save(&history)?;
        cleared
    }
}
