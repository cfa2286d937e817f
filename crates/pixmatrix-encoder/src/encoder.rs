use pixmatrix_types::{
    correction::CorrectionParams,
    frame::{FrameBuffer, GridSize},
    wire::WireFrame,
};
use tracing::trace;

use crate::{correction::correct, mapping::AddressTable};

/// Encoder bound to one grid size, reusing its LED address table across calls.
#[derive(Debug, Clone)]
pub struct PixelEncoder {
    table: AddressTable,
}

impl PixelEncoder {
    pub fn new(size: GridSize) -> Self {
        Self {
            table: AddressTable::new(size),
        }
    }

    pub fn size(&self) -> GridSize {
        self.table.size()
    }

    /// Encode `frame` into hardware order with photometric correction.
    ///
    /// The frame must have the encoder's grid size; a mismatched frame is a
    /// caller bug and panics.
    pub fn encode(&self, frame: &FrameBuffer, params: &CorrectionParams) -> WireFrame {
        assert_eq!(
            frame.size(),
            self.table.size(),
            "frame dimensions do not match encoder"
        );

        let pixels = frame.pixels();
        let mut bytes = Vec::with_capacity(pixels.len() * 3);
        for &offset in self.table.offsets() {
            let rgb = correct(pixels[offset].rgb(), params.gamma, params.gains);
            bytes.push(dim(rgb.r, params.brightness));
            bytes.push(dim(rgb.g, params.brightness));
            bytes.push(dim(rgb.b, params.brightness));
        }
        trace!(bytes = bytes.len(), "encoded wire frame");
        WireFrame::from_bytes(bytes)
    }
}

fn dim(channel: u8, brightness: f64) -> u8 {
    (channel as f64 * brightness).floor().clamp(0.0, 255.0) as u8
}

/// One-shot encode for callers that do not keep a [`PixelEncoder`] around.
pub fn encode(frame: &FrameBuffer, params: &CorrectionParams) -> WireFrame {
    PixelEncoder::new(frame.size()).encode(frame, params)
}
