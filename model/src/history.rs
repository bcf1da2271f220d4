use std::collections::VecDeque;

use serde::{Serialize, Serializer};

use crate::{Channel, Measurement};

/// Number of measurements kept unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 100_000;

/// A bounded window of the most recent measurements, oldest first.
///
/// Pushing into a full history drops the oldest record, so `len()` never
/// exceeds `capacity()`.
#[derive(Clone, Debug, PartialEq)]
pub struct History {
    records: VecDeque<Measurement>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl History {
    /// Creates an empty history holding at most `capacity` records.
    ///
    /// # Panics
    ///
    /// If `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be positive");
        Self {
            // The full capacity is only reserved lazily by the deque.
            records: VecDeque::new(),
            capacity,
        }
    }

    /// Builds a history from `records` (oldest first), keeping only the most
    /// recent `capacity` of them.
    pub fn from_records(records: Vec<Measurement>, capacity: usize) -> Self {
        let mut history = Self::with_capacity(capacity);
        let skip = records.len().saturating_sub(capacity);
        history.records.extend(records.into_iter().skip(skip));
        history
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends `measurement`, evicting the oldest record when full.
    pub fn push(&mut self, measurement: Measurement) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(measurement);
    }

    pub fn latest(&self) -> Option<&Measurement> {
        self.records.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Measurement> + ExactSizeIterator {
        self.records.iter()
    }

    /// The most recent `n` records, oldest first.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &Measurement> {
        self.records.iter().skip(self.records.len().saturating_sub(n))
    }

    /// Values of `channel` over the most recent `n` records, oldest first.
    pub fn channel_tail(&self, channel: Channel, n: usize) -> Vec<f64> {
        self.tail(n).map(|m| channel.value(m)).collect()
    }
}

impl Serialize for History {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.records.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: usize) -> Measurement {
        Measurement {
            temperature: i as f64,
            pressure: 1000.0 + i as f64,
            humidity: 50.0,
            gas_resistance: 10_000.0,
        }
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut history = History::with_capacity(3);
        for i in 0..5 {
            history.push(sample(i));
            assert!(history.len() <= history.capacity());
        }

        let temperatures: Vec<f64> = history.iter().map(|m| m.temperature).collect();
        assert_eq!(temperatures, vec![2.0, 3.0, 4.0]);
        assert_eq!(history.latest(), Some(&sample(4)));
    }

    #[test]
    fn test_default_capacity_is_bounded() {
        let mut history = History::default();
        for i in 0..DEFAULT_CAPACITY + 10 {
            history.push(sample(i));
        }

        assert_eq!(history.len(), DEFAULT_CAPACITY);
        assert_eq!(history.iter().next(), Some(&sample(10)));
    }

    #[test]
    fn test_from_records_keeps_newest() {
        let records: Vec<Measurement> = (0..10).map(sample).collect();
        let history = History::from_records(records, 4);

        assert_eq!(history.len(), 4);
        assert_eq!(history.iter().next(), Some(&sample(6)));
        assert_eq!(history.latest(), Some(&sample(9)));
    }

    #[test]
    fn test_channel_tail() {
        let history = History::from_records((0..6).map(sample).collect(), 10);

        assert_eq!(
            history.channel_tail(Channel::Temperature, 3),
            vec![3.0, 4.0, 5.0]
        );
        // Asking for more than is stored returns everything.
        assert_eq!(history.channel_tail(Channel::Pressure, 100).len(), 6);
    }

    #[test]
    fn test_serializes_as_array() {
        let history = History::from_records(vec![sample(1), sample(2)], 10);
        let json = serde_json::to_value(&history).unwrap();

        assert_eq!(json.as_array().map(Vec::len), Some(2));
        assert_eq!(json[1]["temperature"], 2.0);
    }
}
