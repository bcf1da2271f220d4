// Prevent console window in addition to Slint window in Windows release builds when, e.g., starting the app via file manager. Ignored on other platforms.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

slint::include_modules!();

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use envmon_common::canvas::{Canvas, HEIGHT, WIDTH};
use envmon_common::config::Config;
use envmon_common::display::FrameSink;
use envmon_common::monitor::{Monitor, MonitorError};
use envmon_common::sensor::SimulatedSensor;
use envmon_common::{SharedHistory, ValueStore};

const LIT: slint::Rgb8Pixel = slint::Rgb8Pixel {
    r: 0x9c,
    g: 0xe0,
    b: 0xff,
};
const DARK: slint::Rgb8Pixel = slint::Rgb8Pixel { r: 0, g: 0, b: 0 };

/// Our App struct that holds the UI and the monitor running behind it.
///
/// The monitor runs in its own thread with a simulated sensor and renders
/// into a [`FrameSink`]. A timer on the UI thread picks up the newest frame
/// and shows it in the window.
struct App {
    ui: AppWindow,
    timer: slint::Timer,
    frames: ValueStore<Canvas>,
    history: SharedHistory,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<(), MonitorError>>>,
}

impl App {
    const TIMER_INTERVAL: std::time::Duration = std::time::Duration::from_millis(100);

    /// Create a new App struct and start the monitor thread.
    fn new() -> anyhow::Result<Self> {
        let ui = AppWindow::new()?;

        let config = Config::from_env()?;
        let running = Arc::new(AtomicBool::new(true));
        let frames = ValueStore::default();

        // The monitor loads the stored history right away.
        let monitor = Monitor::new(config, FrameSink::new(frames.clone()), running.clone())?;
        let history = monitor.history().clone();

        let worker = std::thread::Builder::new()
            .name("monitor".into())
            .spawn(move || monitor.run(SimulatedSensor::new()))?;

        Ok(Self {
            ui,
            timer: slint::Timer::default(),
            frames,
            history,
            running,
            worker: Some(worker),
        })
    }

    /// Run the App until the window is closed, then stop the monitor so it
    /// saves the history.
    fn run(&mut self) -> anyhow::Result<()> {
        let ui_handle = self.ui.as_weak();
        let frames = self.frames.clone();
        let history = self.history.clone();

        self.timer.start(
            slint::TimerMode::Repeated,
            Self::TIMER_INTERVAL,
            move || {
                let Some(ui) = ui_handle.upgrade() else {
                    return;
                };

                if let Some(frame) = frames.take() {
                    ui.set_screen(frame_to_image(&frame));
                    ui.set_status(
                        format!(
                            "{} samples, last frame {}",
                            history.len(),
                            chrono::Local::now().format("%H:%M:%S")
                        )
                        .into(),
                    );
                }
            },
        );

        let result = self.ui.run().map_err(anyhow::Error::from);
        self.stop()?;
        result
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| anyhow::anyhow!("monitor thread panicked"))??;
        }
        Ok(())
    }
}

/// Convert a framebuffer into an image the window can show.
fn frame_to_image(frame: &Canvas) -> slint::Image {
    let mut buffer = slint::SharedPixelBuffer::<slint::Rgb8Pixel>::new(WIDTH as u32, HEIGHT as u32);
    for (pixel, on) in buffer.make_mut_slice().iter_mut().zip(frame.pixels()) {
        *pixel = if on { LIT } else { DARK };
    }
    slint::Image::from_rgb8(buffer)
}

/// A minimal main function that initializes the App and runs it.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut app = App::new()?;

    app.run()
}

#[test]
fn test_frame_to_image() {
    let mut frame = Canvas::new();
    frame.set(0, 0, true);

    let size = frame_to_image(&frame).size();
    assert_eq!((size.width, size.height), (WIDTH as u32, HEIGHT as u32));
}
