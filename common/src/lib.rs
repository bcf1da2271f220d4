//! Runtime of the environmental monitor shared by the hardware binary and the
//! desktop simulator: configuration, the sensor and display seams, the
//! framebuffer with its screens, and the monitor loop driving them.

pub mod canvas;
pub mod config;
pub mod display;
pub mod monitor;
pub mod screens;
pub mod sensor;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use envmon_model::{History, Measurement};

/// Convenience helper for passing the last of a value between threads. For example from a thread
/// interfacing with a sensor to another one processing the data.
#[derive(Clone, Debug)]
pub struct ValueStore<T>(Arc<Mutex<Option<T>>>);

impl<T> Default for ValueStore<T> {
    fn default() -> Self {
        Self(Arc::default())
    }
}

impl<T: Clone> ValueStore<T> {
    /// Sets `value` as the last value, replacing one that was not taken yet.
    pub fn set(&self, value: T) {
        *self.lock() = Some(value);
    }

    /// Takes the stored value, leaving the store empty until the next `set`.
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    /// Clones the stored value without consuming it.
    pub fn peek(&self) -> Option<T> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Measurement history shared between the acquisition thread and the display loop.
#[derive(Clone, Debug, Default)]
pub struct SharedHistory(Arc<Mutex<History>>);

impl SharedHistory {
    pub fn new(history: History) -> Self {
        Self(Arc::new(Mutex::new(history)))
    }

    pub fn push(&self, measurement: Measurement) {
        self.lock().push(measurement);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn latest(&self) -> Option<Measurement> {
        self.lock().latest().copied()
    }

    /// Locks the history for a longer read, e.g. rendering or saving.
    ///
    /// A lock poisoned by a panicking holder is recovered, the history itself is
    /// always left consistent by [`History::push`].
    pub fn lock(&self) -> MutexGuard<'_, History> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_store_take_empties() {
        let store = ValueStore::default();
        assert_eq!(store.take(), None::<u32>);

        store.set(1);
        store.set(2);
        assert_eq!(store.peek(), Some(2));
        assert_eq!(store.take(), Some(2));
        assert_eq!(store.take(), None);
    }

    #[test]
    fn test_value_store_across_threads() {
        let store = ValueStore::default();
        let producer = store.clone();

        std::thread::spawn(move || producer.set(Measurement::default()))
            .join()
            .unwrap();

        assert_eq!(store.take(), Some(Measurement::default()));
    }

    #[test]
    fn test_shared_history_is_bounded() {
        let history = SharedHistory::new(History::with_capacity(2));
        let writer = history.clone();

        for i in 0..5 {
            writer.push(Measurement {
                temperature: i as f64,
                ..Default::default()
            });
        }

        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().map(|m| m.temperature), Some(4.0));
    }
}
