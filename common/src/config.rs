use std::path::PathBuf;
use std::time::Duration;

use envmon_model::{DEFAULT_CAPACITY, DEFAULT_DATASTORE};
use serde::Deserialize;

/// Prefix of all environment variables read by [`Config::from_env`].
pub const ENV_PREFIX: &str = "ENVMON_";

/// Longest accepted screen or sampling interval, one day.
pub const MAX_INTERVAL_SECS: f64 = 86_400.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Where sensor readings are taken.
///
/// Parsed case-insensitively, from the environment and from the config file alike.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(try_from = "String")]
pub enum AcquisitionMode {
    /// The display loop reads the sensor itself, once per cycle.
    #[default]
    Inline,
    /// A background thread samples the sensor while the display loop renders.
    Threaded,
}

impl std::str::FromStr for AcquisitionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "threaded" => Ok(Self::Threaded),
            other => Err(format!("expected `inline` or `threaded`, got `{other}`")),
        }
    }
}

impl TryFrom<String> for AcquisitionMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Bus and pin assignment of the sensor and the display.
///
/// Defaults match a Raspberry Pi carrying a Joy-IT Explorer 700 with a BME688
/// breakout on the I²C header.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct HardwareConfig {
    pub i2c_bus: PathBuf,
    /// 0x76 (primary) or 0x77 (secondary).
    pub sensor_address: u8,
    pub spi_device: PathBuf,
    pub gpio_chip: PathBuf,
    pub reset_pin: u32,
    pub dc_pin: u32,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            i2c_bus: "/dev/i2c-1".into(),
            sensor_address: 0x77,
            spi_device: "/dev/spidev0.0".into(),
            gpio_chip: "/dev/gpiochip0".into(),
            reset_pin: 19,
            dc_pin: 16,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub datastore: PathBuf,
    pub history_capacity: usize,
    /// How long the readings screen stays up.
    pub reading_interval_secs: f64,
    /// How long each history curve stays up.
    pub curve_interval_secs: f64,
    /// Sampling period of the background thread in threaded mode.
    pub sample_interval_secs: f64,
    pub mode: AcquisitionMode,
    pub hardware: HardwareConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            datastore: DEFAULT_DATASTORE.into(),
            history_capacity: DEFAULT_CAPACITY,
            reading_interval_secs: 7.0,
            curve_interval_secs: 4.0,
            sample_interval_secs: 7.0,
            mode: AcquisitionMode::default(),
            hardware: HardwareConfig::default(),
        }
    }
}

impl Config {
    /// Loads the configuration from the process environment.
    ///
    /// `ENVMON_CONFIG` may name a JSON file providing the base values; the
    /// other `ENVMON_*` variables override single settings.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        let mut config = match var("CONFIG") {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };

        if let Some(value) = var("DATASTORE") {
            config.datastore = value.into();
        }
        if let Some(value) = var("HISTORY_CAPACITY") {
            config.history_capacity = parse("HISTORY_CAPACITY", &value)?;
        }
        if let Some(value) = var("READING_INTERVAL_SECS") {
            config.reading_interval_secs = parse("READING_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = var("CURVE_INTERVAL_SECS") {
            config.curve_interval_secs = parse("CURVE_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = var("SAMPLE_INTERVAL_SECS") {
            config.sample_interval_secs = parse("SAMPLE_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = var("MODE") {
            config.mode = parse("MODE", &value)?;
        }
        if let Some(value) = var("I2C_BUS") {
            config.hardware.i2c_bus = value.into();
        }
        if let Some(value) = var("SENSOR_ADDRESS") {
            config.hardware.sensor_address = parse_address("SENSOR_ADDRESS", &value)?;
        }
        if let Some(value) = var("SPI_DEVICE") {
            config.hardware.spi_device = value.into();
        }
        if let Some(value) = var("GPIO_CHIP") {
            config.hardware.gpio_chip = value.into();
        }
        if let Some(value) = var("RESET_PIN") {
            config.hardware.reset_pin = parse("RESET_PIN", &value)?;
        }
        if let Some(value) = var("DC_PIN") {
            config.hardware.dc_pin = parse("DC_PIN", &value)?;
        }

        config.validate()?;
        log::debug!("Configuration: {config:?}");
        Ok(config)
    }

    /// Reads a JSON config file. Keys it leaves out keep their defaults.
    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(invalid("HISTORY_CAPACITY", "0", "must be positive"));
        }
        for (key, secs) in [
            ("READING_INTERVAL_SECS", self.reading_interval_secs),
            ("CURVE_INTERVAL_SECS", self.curve_interval_secs),
            ("SAMPLE_INTERVAL_SECS", self.sample_interval_secs),
        ] {
            if !(0.0..=MAX_INTERVAL_SECS).contains(&secs) {
                return Err(invalid(
                    key,
                    &secs.to_string(),
                    &format!("must be between 0 and {MAX_INTERVAL_SECS} seconds"),
                ));
            }
        }
        if !matches!(self.hardware.sensor_address, 0x76 | 0x77) {
            return Err(invalid(
                "SENSOR_ADDRESS",
                &format!("{:#04x}", self.hardware.sensor_address),
                "must be 0x76 or 0x77",
            ));
        }
        Ok(())
    }

    pub fn reading_interval(&self) -> Duration {
        interval(self.reading_interval_secs)
    }

    pub fn curve_interval(&self) -> Duration {
        interval(self.curve_interval_secs)
    }

    pub fn sample_interval(&self) -> Duration {
        interval(self.sample_interval_secs)
    }
}

/// Converts seconds into a duration, clamped to `0..=MAX_INTERVAL_SECS`.
/// NaN maps to the maximum.
fn interval(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.min(MAX_INTERVAL_SECS)).unwrap_or_default()
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: format!("{ENV_PREFIX}{key}"),
        value: value.into(),
        reason: reason.into(),
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}

/// Accepts decimal or `0x`-prefixed hexadecimal.
fn parse_address(key: &str, value: &str) -> Result<u8, ConfigError> {
    let trimmed = value.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => trimmed.parse(),
    };
    parsed.map_err(|e| invalid(key, value, &e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.datastore, PathBuf::from("DATASTORE.$"));
        assert_eq!(config.history_capacity, 100_000);
        assert_eq!(config.reading_interval(), Duration::from_secs(7));
        assert_eq!(config.curve_interval(), Duration::from_secs(4));
        assert_eq!(config.mode, AcquisitionMode::Inline);
        assert_eq!(config.hardware.sensor_address, 0x77);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("ENVMON_DATASTORE", "/var/lib/envmon/history.json"),
            ("ENVMON_HISTORY_CAPACITY", "500"),
            ("ENVMON_CURVE_INTERVAL_SECS", "0.5"),
            ("ENVMON_MODE", "Threaded"),
            ("ENVMON_SENSOR_ADDRESS", "0x76"),
            ("ENVMON_RESET_PIN", "25"),
        ]))
        .unwrap();

        assert_eq!(config.datastore, PathBuf::from("/var/lib/envmon/history.json"));
        assert_eq!(config.history_capacity, 500);
        assert_eq!(config.curve_interval(), Duration::from_millis(500));
        assert_eq!(config.mode, AcquisitionMode::Threaded);
        assert_eq!(config.hardware.sensor_address, 0x76);
        assert_eq!(config.hardware.reset_pin, 25);
        assert_eq!(config.hardware.dc_pin, 16);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for vars in [
            [("ENVMON_HISTORY_CAPACITY", "0")],
            [("ENVMON_HISTORY_CAPACITY", "lots")],
            [("ENVMON_READING_INTERVAL_SECS", "-1")],
            [("ENVMON_READING_INTERVAL_SECS", "1e20")],
            [("ENVMON_CURVE_INTERVAL_SECS", "inf")],
            [("ENVMON_SAMPLE_INTERVAL_SECS", "NaN")],
            [("ENVMON_MODE", "sometimes")],
            [("ENVMON_SENSOR_ADDRESS", "0x3c")],
        ] {
            let err = Config::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{vars:?}: {err}");
        }
    }

    #[test]
    fn test_config_file_with_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("envmon.json");
        std::fs::write(
            &path,
            r#"{ "mode": "threaded", "sample_interval_secs": 2.5,
                 "hardware": { "i2c_bus": "/dev/i2c-3" } }"#,
        )
        .unwrap();

        let path = path.to_string_lossy().into_owned();
        let config = Config::from_lookup(lookup(&[
            ("ENVMON_CONFIG", path.as_str()),
            ("ENVMON_SAMPLE_INTERVAL_SECS", "1"),
        ]))
        .unwrap();

        assert_eq!(config.mode, AcquisitionMode::Threaded);
        assert_eq!(config.sample_interval(), Duration::from_secs(1));
        assert_eq!(config.hardware.i2c_bus, PathBuf::from("/dev/i2c-3"));
        assert_eq!(config.hardware.spi_device, PathBuf::from("/dev/spidev0.0"));
    }

    #[test]
    fn test_intervals_never_overflow() {
        let config = Config {
            reading_interval_secs: 1e20,
            curve_interval_secs: -3.0,
            sample_interval_secs: f64::NAN,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let max = Duration::from_secs(MAX_INTERVAL_SECS as u64);
        assert_eq!(config.reading_interval(), max);
        assert_eq!(config.curve_interval(), Duration::ZERO);
        assert_eq!(config.sample_interval(), max);
    }

    #[test]
    fn test_mode_spelling_matches_env_and_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("envmon.json");
        std::fs::write(&path, r#"{ "mode": "Threaded" }"#).unwrap();

        let config = Config::from_file(path.clone()).unwrap();
        assert_eq!(config.mode, AcquisitionMode::Threaded);
        assert_eq!("THREADED".parse::<AcquisitionMode>(), Ok(AcquisitionMode::Threaded));

        std::fs::write(&path, r#"{ "mode": "sometimes" }"#).unwrap();
        let err = Config::from_file(path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_config_file() {
        let err = Config::from_lookup(lookup(&[("ENVMON_CONFIG", "/nonexistent/envmon.json")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
