use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

use crate::data::model::UNCLASSIFIED_KEY;

// ---------------------------------------------------------------------------
// Continuous grade scale
// ---------------------------------------------------------------------------

/// Plasma control points, dark purple (low grade) to yellow (high grade).
const PLASMA: [(u8, u8, u8); 10] = [
    (0x0d, 0x08, 0x87),
    (0x46, 0x03, 0x9f),
    (0x72, 0x01, 0xa8),
    (0x9c, 0x17, 0x9e),
    (0xbd, 0x37, 0x86),
    (0xd8, 0x57, 0x6b),
    (0xed, 0x79, 0x53),
    (0xfb, 0x9f, 0x3a),
    (0xfd, 0xca, 0x26),
    (0xf0, 0xf9, 0x21),
];

/// Maps a grade to a Plasma color between fixed bounds.
///
/// The bounds come from the full cleaned dataset so a given grade keeps
/// its color however the filters change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    pub fn new(min: f64, max: f64) -> Self {
        ColorScale { min, max }
    }

    /// Position of `grade` on the scale, clamped to `[0, 1]`. A flat scale
    /// puts everything in the middle.
    pub fn normalize(&self, grade: f64) -> f32 {
        let span = self.max - self.min;
        if span.abs() < f64::EPSILON {
            return 0.5;
        }
        ((grade - self.min) / span).clamp(0.0, 1.0) as f32
    }

    pub fn color_for(&self, grade: f64) -> Color32 {
        plasma(self.normalize(grade))
    }
}

/// Sample the Plasma ramp at `t ∈ [0, 1]`, interpolating in linear RGB.
pub fn plasma(t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let scaled = t * (PLASMA.len() - 1) as f32;
    let lo = (scaled.floor() as usize).min(PLASMA.len() - 2);
    let frac = scaled - lo as f32;

    let a = linear(PLASMA[lo]);
    let b = linear(PLASMA[lo + 1]);
    let rgb: Srgb = a.mix(b, frac).into_color();
    to_color32(rgb)
}

fn linear((r, g, b): (u8, u8, u8)) -> LinSrgb {
    Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0).into_color()
}

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8,
    )
}

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
            to_color32(rgb)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Legend colours: class key → Color32
// ---------------------------------------------------------------------------

/// Maps class keys to distinct legend colours.
#[derive(Debug, Clone)]
pub struct ClassColors {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ClassColors {
    /// Assign a colour to every key, in the order given. The unclassified
    /// bucket keeps the default grey.
    pub fn new<'a>(keys: impl IntoIterator<Item = &'a String>) -> Self {
        let keys: Vec<&String> = keys
            .into_iter()
            .filter(|k| k.as_str() != UNCLASSIFIED_KEY)
            .collect();
        let palette = generate_palette(keys.len());
        let mapping = keys.into_iter().cloned().zip(palette).collect();
        ClassColors {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a class key; unknown keys are grey.
    pub fn color_for(&self, key: &str) -> Color32 {
        self.mapping.get(key).copied().unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plasma_endpoints_match_control_points() {
        assert_eq!(plasma(0.0), Color32::from_rgb(0x0d, 0x08, 0x87));
        assert_eq!(plasma(1.0), Color32::from_rgb(0xf0, 0xf9, 0x21));
        assert_eq!(plasma(-3.0), plasma(0.0));
        assert_eq!(plasma(7.0), plasma(1.0));
    }

    #[test]
    fn scale_is_stable_and_clamped() {
        let scale = ColorScale::new(0.0, 4.0);
        assert_eq!(scale.normalize(2.0), 0.5);
        assert_eq!(scale.normalize(-1.0), 0.0);
        assert_eq!(scale.normalize(10.0), 1.0);
        assert_eq!(scale.color_for(4.0), plasma(1.0));

        let flat = ColorScale::new(1.2, 1.2);
        assert_eq!(flat.normalize(1.2), 0.5);
    }

    #[test]
    fn class_colours_are_distinct() {
        let keys = vec![UNCLASSIFIED_KEY.to_string(), "ore".to_string(), "waste".to_string()];
        let colors = ClassColors::new(&keys);
        assert_ne!(colors.color_for("ore"), colors.color_for("waste"));
        assert_ne!(colors.color_for("ore"), Color32::GRAY);
        assert_eq!(colors.color_for(UNCLASSIFIED_KEY), Color32::GRAY);
        assert_eq!(colors.color_for("other"), Color32::GRAY);
    }
}
