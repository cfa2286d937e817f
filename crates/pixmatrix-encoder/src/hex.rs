use std::fmt::Write;

use pixmatrix_types::frame::FrameBuffer;

/// Uncorrected `rrggbb` dump of a frame for previews and copy/paste.
///
/// Rows are walked top to bottom; even rows left-to-right and odd rows
/// right-to-left. This is the canvas preview order, not the LED wire order.
pub fn to_hex_string(frame: &FrameBuffer) -> String {
    let mut out = String::with_capacity(frame.pixels().len() * 6);
    for y in 0..frame.height() {
        let columns: Box<dyn Iterator<Item = u32>> = if y % 2 == 0 {
            Box::new(0..frame.width())
        } else {
            Box::new((0..frame.width()).rev())
        };
        for x in columns {
            let px = frame.pixel(x, y);
            // Writing into a String cannot fail.
            let _ = write!(out, "{:02x}{:02x}{:02x}", px.r, px.g, px.b);
        }
    }
    out
}
