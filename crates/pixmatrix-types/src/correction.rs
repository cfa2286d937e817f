use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::{PixmatrixError, Result};

pub const BRIGHTNESS_RANGE: RangeInclusive<f64> = 0.0..=1.0;
pub const GAMMA_RANGE: RangeInclusive<f64> = 0.1..=3.0;
pub const GAIN_RANGE: RangeInclusive<f64> = 0.1..=2.0;

/// Per-channel multiplicative correction factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelGains {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl ChannelGains {
    pub const UNITY: ChannelGains = ChannelGains::new(1.0, 1.0, 1.0);

    pub const fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }
}

impl Default for ChannelGains {
    fn default() -> Self {
        Self::UNITY
    }
}

/// Photometric settings applied by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionParams {
    pub brightness: f64,
    pub gamma: f64,
    pub gains: ChannelGains,
}

impl Default for CorrectionParams {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            gamma: 1.0,
            gains: ChannelGains::UNITY,
        }
    }
}

fn clamp_into(value: f64, range: &RangeInclusive<f64>) -> f64 {
    if value.is_nan() {
        *range.start()
    } else {
        value.clamp(*range.start(), *range.end())
    }
}

impl CorrectionParams {
    /// Copy with every field forced into its documented range.
    ///
    /// The encoder treats its inputs as preconditions, so callers taking
    /// values from user input run them through this first.
    pub fn clamped(&self) -> Self {
        Self {
            brightness: clamp_into(self.brightness, &BRIGHTNESS_RANGE),
            gamma: clamp_into(self.gamma, &GAMMA_RANGE),
            gains: ChannelGains {
                red: clamp_into(self.gains.red, &GAIN_RANGE),
                green: clamp_into(self.gains.green, &GAIN_RANGE),
                blue: clamp_into(self.gains.blue, &GAIN_RANGE),
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !BRIGHTNESS_RANGE.contains(&self.brightness) {
            return Err(PixmatrixError::Configuration(
                "correction.brightness must be between 0.0 and 1.0".into(),
            ));
        }
        if !GAMMA_RANGE.contains(&self.gamma) {
            return Err(PixmatrixError::Configuration(
                "correction.gamma must be between 0.1 and 3.0".into(),
            ));
        }
        let gains = [
            ("red", self.gains.red),
            ("green", self.gains.green),
            ("blue", self.gains.blue),
        ];
        for (channel, gain) in gains {
            if !GAIN_RANGE.contains(&gain) {
                return Err(PixmatrixError::Configuration(format!(
                    "correction.gains.{channel} must be between 0.1 and 2.0"
                )));
            }
        }
        Ok(())
    }
}
