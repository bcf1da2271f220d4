use serde::{Deserialize, Serialize};

/// One sample of the environmental sensor.
///
/// The field names are the keys of the JSON objects in the data store.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Measurement {
    /// Temperature in °C.
    pub temperature: f64,

    /// Barometric pressure in hPa.
    pub pressure: f64,

    /// Relative humidity in percent.
    pub humidity: f64,

    /// Resistance of the gas sensing layer in Ω.
    pub gas_resistance: f64,
}

/// The quantities a [`Measurement`] carries, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Temperature,
    Pressure,
    Humidity,
    GasResistance,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Temperature,
        Channel::Pressure,
        Channel::Humidity,
        Channel::GasResistance,
    ];

    /// Key of the channel in a serialized measurement.
    pub fn name(self) -> &'static str {
        match self {
            Channel::Temperature => "temperature",
            Channel::Pressure => "pressure",
            Channel::Humidity => "humidity",
            Channel::GasResistance => "gas_resistance",
        }
    }

    /// Single letter used on the readings screen.
    pub fn label(self) -> &'static str {
        match self {
            Channel::Temperature => "T",
            Channel::Pressure => "p",
            Channel::Humidity => "H",
            Channel::GasResistance => "R",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Channel::Temperature => "°C",
            Channel::Pressure => "hPa",
            Channel::Humidity => "%",
            Channel::GasResistance => "Ω",
        }
    }

    pub fn value(self, measurement: &Measurement) -> f64 {
        match self {
            Channel::Temperature => measurement.temperature,
            Channel::Pressure => measurement.pressure,
            Channel::Humidity => measurement.humidity,
            Channel::GasResistance => measurement.gas_resistance,
        }
    }
}

impl std::fmt::Display for Measurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, channel) in Channel::ALL.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{}: {:.2}{}",
                channel.name(),
                channel.value(self),
                channel.unit()
            )?;
        }
        Ok(())
    }
}
