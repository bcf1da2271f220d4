use std::time::Duration;

use anyhow::anyhow;
use bme680::{
    Bme680, I2CAddress, IIRFilterSize, OversamplingSetting, PowerMode, SettingsBuilder,
};
use envmon_common::config::HardwareConfig;
use envmon_common::sensor::{EnvironmentSensor, SensorError};
use envmon_model::Measurement;
use sensor_hal::{Delay, I2cdev};

/// BME680/BME688 on a Linux I2C bus.
///
/// The bus and delay come from `linux-embedded-hal` 0.3, whose blocking
/// embedded-hal 0.2 implementations the `bme680` driver is bound to.
pub struct Bme68x {
    sensor: Bme680<I2cdev, Delay>,
    delay: Delay,
}

impl Bme68x {
    pub fn open(hardware: &HardwareConfig) -> anyhow::Result<Self> {
        let i2c = I2cdev::new(&hardware.i2c_bus)
            .map_err(|e| anyhow!("cannot open {}: {e:?}", hardware.i2c_bus.display()))?;
        let address = match hardware.sensor_address {
            0x76 => I2CAddress::Primary,
            _ => I2CAddress::Secondary,
        };

        let mut delay = Delay;
        let mut sensor = Bme680::init(i2c, &mut delay, address)
            .map_err(|e| anyhow!("BME68x not responding at {:#04x}: {e:?}", hardware.sensor_address))?;

        let settings = SettingsBuilder::new()
            .with_humidity_oversampling(OversamplingSetting::OS2x)
            .with_pressure_oversampling(OversamplingSetting::OS4x)
            .with_temperature_oversampling(OversamplingSetting::OS8x)
            .with_temperature_filter(IIRFilterSize::Size3)
            .with_gas_measurement(Duration::from_millis(1500), 320, 25)
            .with_run_gas(true)
            .build();
        sensor
            .set_sensor_settings(&mut delay, settings)
            .map_err(|e| anyhow!("cannot configure BME68x: {e:?}"))?;

        log::info!(
            "BME68x ready on {} at {:#04x}",
            hardware.i2c_bus.display(),
            hardware.sensor_address
        );
        Ok(Self { sensor, delay })
    }
}

impl EnvironmentSensor for Bme68x {
    fn read(&mut self) -> Result<Measurement, SensorError> {
        // Forced mode runs a single measurement, then the sensor sleeps again.
        self.sensor
            .set_sensor_mode(&mut self.delay, PowerMode::ForcedMode)
            .map_err(|e| format!("cannot start BME68x measurement: {e:?}"))?;
        let (data, _condition) = self
            .sensor
            .get_sensor_data(&mut self.delay)
            .map_err(|e| format!("cannot read BME68x: {e:?}"))?;

        Ok(Measurement {
            temperature: data.temperature_celsius().into(),
            pressure: data.pressure_hpa().into(),
            humidity: data.humidity_percent().into(),
            gas_resistance: data.gas_resistance_ohm().into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linux_bus_fits_driver() {
        // Naming the driver methods checks the bus and delay bounds without hardware.
        let _init = Bme680::<I2cdev, Delay>::init;
        let _settings = Bme680::<I2cdev, Delay>::set_sensor_settings;
        let _read = Bme680::<I2cdev, Delay>::get_sensor_data;
    }
}
