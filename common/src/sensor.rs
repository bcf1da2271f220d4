use envmon_model::Measurement;

/// Error type reported by sensor drivers.
pub type SensorError = Box<dyn std::error::Error + Send + Sync>;

/// A source of environmental measurements.
///
/// To be implemented for each platform. Implementations that are `Send` can be
/// moved into the background acquisition thread.
pub trait EnvironmentSensor {
    /// Takes one measurement, blocking until it is available.
    fn read(&mut self) -> Result<Measurement, SensorError>;
}

impl<S: EnvironmentSensor + ?Sized> EnvironmentSensor for Box<S> {
    fn read(&mut self) -> Result<Measurement, SensorError> {
        (**self).read()
    }
}

/// Sensor producing slowly drifting, plausible indoor readings.
///
/// The values only depend on the sample number, so a run is reproducible.
#[derive(Clone, Debug, Default)]
pub struct SimulatedSensor {
    sample: u64,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of measurements taken so far.
    #[cfg(test)]
    pub fn samples(&self) -> u64 {
        self.sample
    }
}

impl EnvironmentSensor for SimulatedSensor {
    fn read(&mut self) -> Result<Measurement, SensorError> {
        let n = self.sample as f64;
        self.sample += 1;

        Ok(Measurement {
            temperature: 21.0 + 2.5 * (n / 40.0).sin() + 0.3 * (n / 7.0).sin(),
            pressure: 1013.25 + 4.0 * (n / 150.0).cos(),
            humidity: 45.0 + 12.0 * (n / 60.0).sin(),
            gas_resistance: 60_000.0 + 25_000.0 * (n / 25.0).sin().abs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_sensor_is_deterministic() {
        let mut a = SimulatedSensor::new();
        let mut b = SimulatedSensor::new();

        for _ in 0..50 {
            assert_eq!(a.read().unwrap(), b.read().unwrap());
        }
        assert_eq!(a.samples(), 50);
    }

    #[test]
    fn test_simulated_readings_are_plausible() {
        let mut sensor: Box<dyn EnvironmentSensor> = Box::new(SimulatedSensor::new());

        for _ in 0..500 {
            let m = sensor.read().unwrap();
            assert!((15.0..30.0).contains(&m.temperature));
            assert!((1000.0..1030.0).contains(&m.pressure));
            assert!((0.0..=100.0).contains(&m.humidity));
            assert!(m.gas_resistance > 0.0);
        }
    }
}
