//! Faces bus access over the Raspberry Pi I2C controller.
//!
//! The Faces firmware ignores register addresses and answers every read with
//! the next queued byte, or 0 when nothing is queued. When the interrupt line
//! is wired it is pulled low while data is waiting.

use rppal::gpio::{Gpio, InputPin};
use rppal::i2c::I2c;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{LinkError, PeripheralLink};

pub const DEFAULT_I2C_BUS: u8 = 1;
pub const DEFAULT_I2C_ADDRESS: u16 = 0x08;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct I2cSettings {
    pub bus: u8,
    pub address: u16,
    /// BCM number of the active-low "data ready" line, if connected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt_pin: Option<u8>,
}

impl Default for I2cSettings {
    fn default() -> Self {
        Self {
            bus: DEFAULT_I2C_BUS,
            address: DEFAULT_I2C_ADDRESS,
            interrupt_pin: None,
        }
    }
}

#[derive(Debug)]
pub struct I2cLink {
    i2c: I2c,
    interrupt: Option<InputPin>,
    settings: I2cSettings,
}

impl I2cLink {
    pub fn open(settings: I2cSettings) -> Result<Self, LinkError> {
        info!(
            "Opening Faces bus {} at address {:#04x}",
            settings.bus, settings.address
        );
        let mut i2c = I2c::with_bus(settings.bus)?;
        i2c.set_slave_address(settings.address)?;

        let interrupt = match settings.interrupt_pin {
            Some(pin) => {
                debug!("Using GPIO {} as data-ready line", pin);
                Some(Gpio::new()?.get(pin)?.into_input_pullup())
            }
            None => None,
        };

        Ok(Self {
            i2c,
            interrupt,
            settings,
        })
    }

    pub fn settings(&self) -> &I2cSettings {
        &self.settings
    }

    fn data_ready(&self) -> bool {
        self.interrupt.as_ref().map_or(true, InputPin::is_low)
    }

    fn read_register(&mut self) -> Result<u8, LinkError> {
        let mut buf = [0u8; 1];
        self.i2c.read(&mut buf)?;
        Ok(buf[0])
    }
}

impl PeripheralLink for I2cLink {
    fn probe(&mut self) -> Result<bool, LinkError> {
        // Any acknowledged write means something lives at the address.
        match self.i2c.write(&[0]) {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("No answer at {:#04x}: {}", self.settings.address, e);
                Ok(false)
            }
        }
    }

    fn poll_byte(&mut self) -> Result<Option<u8>, LinkError> {
        if !self.data_ready() {
            return Ok(None);
        }
        let value = self.read_register()?;
        Ok((value != 0).then_some(value))
    }

    fn poll_bitmask(&mut self) -> Result<Option<u8>, LinkError> {
        if self.interrupt.is_some() && !self.data_ready() {
            return Ok(None);
        }
        let value = self.read_register()?;
        Ok(decode_gamepad(value))
    }
}

/// Buttons are active-low on the wire; 0 means nothing was queued.
fn decode_gamepad(byte: u8) -> Option<u8> {
    (byte != 0).then_some(!byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_gamepad_read_is_no_sample() {
        assert_eq!(decode_gamepad(0x00), None);
    }

    #[test]
    fn test_gamepad_read_is_inverted() {
        assert_eq!(decode_gamepad(0xFE), Some(0x01));
        assert_eq!(decode_gamepad(0xFF), Some(0x00));
        assert_eq!(decode_gamepad(0x7F), Some(0x80));
    }

    #[test]
    fn test_settings_default_and_toml() {
        let settings: I2cSettings = toml::from_str("address = 9").unwrap();
        assert_eq!(settings.bus, DEFAULT_I2C_BUS);
        assert_eq!(settings.address, 9);
        assert_eq!(settings.interrupt_pin, None);
    }
}
