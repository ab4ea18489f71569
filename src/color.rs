use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Blue → white → red ramp for values in `[-1, 1]`, used by the heatmap.
pub fn diverging(value: f64) -> Color32 {
    let t = value.clamp(-1.0, 1.0) as f32;
    let (hue, sat): (f32, f32) = if t < 0.0 { (220.0, -t) } else { (5.0, t) };
    let hsl = Hsl::new(hue, 0.7 * sat, 0.95 - 0.4 * sat);
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Color mapping: language → Color32
// ---------------------------------------------------------------------------

/// Maps every language of the loaded table to a distinct colour so all
/// charts agree on it.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new(languages: &BTreeSet<String>) -> Self {
        let palette = generate_palette(languages.len());
        let mapping = languages.iter().cloned().zip(palette).collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a language.
    pub fn color_for(&self, language: &str) -> Color32 {
        self.mapping
            .get(language)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_is_distinct() {
        let p = generate_palette(6);
        assert_eq!(p.len(), 6);
        for i in 0..p.len() {
            for j in i + 1..p.len() {
                assert_ne!(p[i], p[j]);
            }
        }
    }

    #[test]
    fn test_unknown_language_is_gray() {
        let langs: BTreeSet<String> = ["go", "py"].into_iter().map(String::from).collect();
        let cm = ColorMap::new(&langs);
        assert_ne!(cm.color_for("go"), cm.color_for("py"));
        assert_eq!(cm.color_for("cobol"), Color32::GRAY);
    }
}
