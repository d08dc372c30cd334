use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Colour of the peak markers and prominence lines.
pub const MARKER_RGB: [u8; 3] = [255, 127, 14];

/// Generates `n` visually distinct RGB colours using evenly spaced hues,
/// one per plotted column.
pub fn generate_palette(n: usize) -> Vec<[u8; 3]> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = 210.0 + (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            [
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            ]
        })
        .collect()
}
