use serde::{Deserialize, Serialize};

use crate::color::Rgb;

/// Corrected, hardware-ordered bytes for one frame: consecutive R,G,B
/// triplets, one per LED, with no header or checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireFrame(Vec<u8>);

impl WireFrame {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn led_count(&self) -> usize {
        self.0.len() / 3
    }

    /// Color sent to the LED at physical position `led`.
    pub fn led(&self, led: usize) -> Option<Rgb> {
        let start = led.checked_mul(3)?;
        let bytes = self.0.get(start..start.checked_add(3)?)?;
        Some(Rgb::new(bytes[0], bytes[1], bytes[2]))
    }

    pub fn leds(&self) -> impl Iterator<Item = Rgb> + '_ {
        self.0
            .chunks_exact(3)
            .map(|rgb| Rgb::new(rgb[0], rgb[1], rgb[2]))
    }
}

impl AsRef<[u8]> for WireFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn led_triplets() {
        let wire = WireFrame::from_bytes(vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(wire.led_count(), 2);
        assert_eq!(wire.led(1), Some(Rgb::new(4, 5, 6)));
        assert_eq!(wire.led(2), None);
        assert_eq!(wire.leds().count(), 2);
        assert_eq!(wire.led(usize::MAX / 3), None);
    }
}
