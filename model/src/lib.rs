//! Data model of the environmental monitor.
//!
//! A [`Measurement`] is one sensor sample, a [`History`] keeps a bounded
//! window of them and a [`DataStore`] persists that window as JSON between
//! runs.

mod datastore;
mod history;
mod measurement;

pub use datastore::{DataStore, StoreError, DEFAULT_DATASTORE};
pub use history::{History, DEFAULT_CAPACITY};
pub use measurement::{Channel, Measurement};
