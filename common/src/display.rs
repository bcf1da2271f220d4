use crate::canvas::Canvas;
use crate::ValueStore;

/// Error type reported by display drivers.
pub type DisplayError = Box<dyn std::error::Error + Send + Sync>;

/// A monochrome display the monitor renders its canvas to.
pub trait MonoDisplay {
    /// Replaces the display contents with `canvas`.
    fn show(&mut self, canvas: &Canvas) -> Result<(), DisplayError>;

    /// Blanks the display.
    fn clear(&mut self) -> Result<(), DisplayError>;
}

impl<D: MonoDisplay + ?Sized> MonoDisplay for Box<D> {
    fn show(&mut self, canvas: &Canvas) -> Result<(), DisplayError> {
        (**self).show(canvas)
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        (**self).clear()
    }
}

/// Display that publishes each frame into a [`ValueStore`], for a UI thread to
/// pick up the latest one.
#[derive(Clone, Debug, Default)]
pub struct FrameSink {
    frames: ValueStore<Canvas>,
}

impl FrameSink {
    pub fn new(frames: ValueStore<Canvas>) -> Self {
        Self { frames }
    }
}

impl MonoDisplay for FrameSink {
    fn show(&mut self, canvas: &Canvas) -> Result<(), DisplayError> {
        self.frames.set(canvas.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.frames.set(Canvas::new());
        Ok(())
    }
}

#[test]
fn test_frame_sink_keeps_last_frame() {
    let frames = ValueStore::default();
    let mut sink = FrameSink::new(frames.clone());

    let mut canvas = Canvas::new();
    canvas.set(1, 1, true);
    sink.show(&canvas).unwrap();
    canvas.set(2, 2, true);
    sink.show(&canvas).unwrap();

    let frame = frames.take().unwrap();
    assert!(frame.pixel(1, 1) && frame.pixel(2, 2));

    sink.clear().unwrap();
    assert_eq!(frames.take().map(|c| c.lit_count()), Some(0));
}
