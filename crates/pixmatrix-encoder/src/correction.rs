use pixmatrix_types::{color::Rgb, correction::ChannelGains};

/// Apply channel gains and gamma to one pixel.
///
/// Gains may shift the hue but never raise the channel sum above its
/// pre-gain value: when the gained sum grows, all three channels are scaled
/// back down proportionally. Gamma is applied afterwards on the normalised
/// value, and each channel is rounded and clamped to `0..=255`.
pub fn correct(rgb: Rgb, gamma: f64, gains: ChannelGains) -> Rgb {
    let before = rgb.sum() as f64;

    let mut red = rgb.r as f64 * gains.red;
    let mut green = rgb.g as f64 * gains.green;
    let mut blue = rgb.b as f64 * gains.blue;

    let after = red + green + blue;
    if after > before {
        let scale = before / after;
        red *= scale;
        green *= scale;
        blue *= scale;
    }

    Rgb::new(
        gamma_channel(red, gamma),
        gamma_channel(green, gamma),
        gamma_channel(blue, gamma),
    )
}

fn gamma_channel(value: f64, gamma: f64) -> u8 {
    let corrected = (255.0 * (value / 255.0).powf(gamma)).round();
    corrected.clamp(0.0, 255.0) as u8
}
