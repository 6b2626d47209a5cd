//! Wire formats matching the firmware.

use anyhow::{anyhow, Result};
use uuid::Uuid;

/// Device name (must match firmware)
pub const DEVICE_NAME: &str = "Pico2W-Sensor";

/// Environmental Sensing service
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x0000181a_0000_1000_8000_00805f9b34fb);

/// Sensor reading characteristic
pub const READING_UUID: Uuid = Uuid::from_u128(0x00002a6c_0000_1000_8000_00805f9b34fb);

/// Characteristic value length: f32 LE temperature + u8 humidity
pub const READING_LEN: usize = 5;

/// Ranges the synthetic sensor produces (the initial value is inside them)
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 20.0..=30.0;
pub const HUMIDITY_RANGE: std::ops::RangeInclusive<u8> = 40..=60;

/// Decoded characteristic value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature: f32,
    pub humidity: u8,
}

impl Reading {
    /// Decode a `[temperature: f32 LE][humidity: u8]` value.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != READING_LEN {
            return Err(anyhow!(
                "Expected {} byte reading, got {} bytes: {:02x?}",
                READING_LEN,
                data.len(),
                data
            ));
        }

        Ok(Self {
            temperature: f32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            humidity: data[4],
        })
    }

    /// Check the reading lies within the ranges the firmware publishes.
    pub fn check_range(&self) -> Result<()> {
        if !TEMPERATURE_RANGE.contains(&self.temperature) {
            return Err(anyhow!("Temperature {:.2} out of range", self.temperature));
        }
        if !HUMIDITY_RANGE.contains(&self.humidity) {
            return Err(anyhow!("Humidity {} out of range", self.humidity));
        }
        Ok(())
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}°C / {}%", self.temperature, self.humidity)
    }
}
