use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::{History, Measurement};

/// File name the history is kept in, relative to the working directory.
pub const DEFAULT_DATASTORE: &str = "DATASTORE.$";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on data store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed data store {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON file holding the measurement history as an array of objects.
#[derive(Clone, Debug, PartialEq)]
pub struct DataStore {
    path: PathBuf,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new(DEFAULT_DATASTORE)
    }
}

impl DataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored history, keeping at most `capacity` records.
    ///
    /// A missing file is not an error and yields an empty history.
    pub fn load(&self, capacity: usize) -> Result<History, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No data store at {}, starting empty", self.path.display());
                return Ok(History::with_capacity(capacity));
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let records: Vec<Measurement> =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?;
        log::info!("{} elements read.", records.len());

        Ok(History::from_records(records, capacity))
    }

    /// Writes `history` to the store.
    ///
    /// The data goes to a sibling temporary file first which then replaces
    /// the store, so the previous contents survive a failed write.
    pub fn save(&self, history: &History) -> Result<(), StoreError> {
        let staging = self.staging_path();

        let file = File::create(&staging).map_err(|e| self.io_error(e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, history).map_err(|source| StoreError::Json {
            path: staging.clone(),
            source,
        })?;
        writer.flush().map_err(|e| self.io_error(e))?;
        drop(writer);

        std::fs::rename(&staging, &self.path).map_err(|e| self.io_error(e))?;
        log::info!(
            "Saved {} elements to {}",
            history.len(),
            self.path.display()
        );
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(i: usize) -> Measurement {
        Measurement {
            temperature: 20.0 + i as f64 / 10.0,
            pressure: 1013.0,
            humidity: 45.5,
            gas_resistance: 80_000.0 - i as f64,
        }
    }

    #[test]
    fn test_missing_file_is_empty_history() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path().join(DEFAULT_DATASTORE));

        let history = store.load(100).unwrap();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 100);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path().join(DEFAULT_DATASTORE));
        let history = History::from_records((0..25).map(sample).collect(), 100);

        store.save(&history).unwrap();
        let loaded = store.load(100).unwrap();

        assert_eq!(loaded, history);
        assert!(!dir.path().join("DATASTORE.$.tmp").exists());
    }

    #[test]
    fn test_floats_reload_exactly() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path().join(DEFAULT_DATASTORE));
        let mut history = History::with_capacity(10);
        history.push(Measurement {
            temperature: 21.837_914_200_381_52,
            pressure: 1017.249_644_449_711_9,
            humidity: 0.1 + 0.2,
            gas_resistance: 48_213.557_031_25,
        });

        store.save(&history).unwrap();
        let loaded = store.load(10).unwrap();

        assert_eq!(loaded, history);
        assert_eq!(loaded.latest().map(|m| m.pressure), Some(1017.2496444497119));
    }

    #[test]
    fn test_load_truncates_to_capacity() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path().join("store.json"));
        store
            .save(&History::from_records((0..10).map(sample).collect(), 10))
            .unwrap();

        let loaded = store.load(3).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.latest(), Some(&sample(9)));
    }

    #[test]
    fn test_load_file_with_extra_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_DATASTORE);
        std::fs::write(
            &path,
            r#"[{"sample_nr": 1, "temperature": 22.1, "pressure": 1002.3,
                 "humidity": 38.0, "gas_resistance": 15123.4, "gas_valid": 1}]"#,
        )
        .unwrap();

        let loaded = DataStore::new(&path).load(10).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.latest().map(|m| m.humidity), Some(38.0));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_DATASTORE);
        std::fs::write(&path, "[{\"temperature\": ").unwrap();

        let err = DataStore::new(&path).load(10).unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
    }

    #[test]
    fn test_unreadable_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be read as a store.
        let err = DataStore::new(dir.path()).load(10).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. } | StoreError::Json { .. }));
    }
}
