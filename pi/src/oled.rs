use anyhow::anyhow;
use display_interface_spi::SPIInterface;
use envmon_common::canvas::{Canvas, WIDTH};
use envmon_common::config::HardwareConfig;
use envmon_common::display::{DisplayError, MonoDisplay};
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, Delay, SpidevDevice};
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::Ssd1306;

type Driver = Ssd1306<
    SPIInterface<SpidevDevice, CdevPin>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

/// SSD1306 128x64 OLED on SPI, as fitted to the Joy-IT Explorer 700.
pub struct Oled {
    driver: Driver,
    // Held so the reset line stays driven high.
    _reset: CdevPin,
}

impl Oled {
    pub fn open(hardware: &HardwareConfig) -> anyhow::Result<Self> {
        let mut spi = SpidevDevice::open(&hardware.spi_device)
            .map_err(|e| anyhow!("cannot open {}: {e:?}", hardware.spi_device.display()))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(8_000_000)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.0.configure(&options)?;

        let mut chip = Chip::new(&hardware.gpio_chip)?;
        let dc = output_pin(&mut chip, hardware.dc_pin, "envmon-dc")?;
        let mut reset = output_pin(&mut chip, hardware.reset_pin, "envmon-reset")?;

        let interface = SPIInterface::new(spi, dc);
        let mut driver = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        driver
            .reset(&mut reset, &mut Delay)
            .map_err(|e| anyhow!("OLED reset failed: {e:?}"))?;
        driver
            .init()
            .map_err(|e| anyhow!("OLED init failed: {e:?}"))?;

        let mut oled = Self {
            driver,
            _reset: reset,
        };
        oled.clear().map_err(|e| anyhow!(e))?;
        log::info!("OLED ready on {}", hardware.spi_device.display());
        Ok(oled)
    }
}

fn output_pin(chip: &mut Chip, line: u32, consumer: &str) -> anyhow::Result<CdevPin> {
    let handle = chip
        .get_line(line)?
        .request(LineRequestFlags::OUTPUT, 1, consumer)?;
    Ok(CdevPin::new(handle)?)
}

impl MonoDisplay for Oled {
    fn show(&mut self, canvas: &Canvas) -> Result<(), DisplayError> {
        self.driver.clear_buffer();
        for (i, on) in canvas.pixels().enumerate() {
            if on {
                self.driver
                    .set_pixel((i % WIDTH) as u32, (i / WIDTH) as u32, true);
            }
        }
        self.driver
            .flush()
            .map_err(|e| format!("OLED flush failed: {e:?}"))?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.driver.clear_buffer();
        self.driver
            .flush()
            .map_err(|e| format!("OLED flush failed: {e:?}"))?;
        Ok(())
    }
}
