//! The filter stage of the transform pipeline.
//!
//! Remaps lightness against the active scheme poles, then applies the
//! brightness / contrast / sepia / grayscale adjustments in that order,
//! clamping between steps so no adjustment compounds overflow from the
//! previous one.

use shadekit_color::Hsla;

use crate::tint::mix_hue;
use crate::{Mode, SchemeColors, ThemeConfig};

/// Hue that sepia rotates toward.
const SEPIA_HUE: f32 = 35.0;
/// Saturation added by a full-strength sepia.
const SEPIA_SATURATION_BOOST: f32 = 0.15;
/// How strongly near-pole colors take on the pole's saturation.
const POLE_PULL: f32 = 0.25;

/// Apply the mode branch and the four numeric filters to a normalized color.
///
/// `config` must already be clamped ([`ThemeConfig::clamped`]); the pipeline
/// assumes in-range percentages. Alpha passes through untouched.
pub fn apply_filters(color: Hsla, config: &ThemeConfig, scheme: &SchemeColors) -> Hsla {
    let mut out = remap_lightness(color, config.mode, scheme);

    // Brightness scales lightness.
    out.l = (out.l * config.brightness / 100.0).clamp(0.0, 1.0);

    // Contrast spreads lightness around the midpoint.
    out.l = (0.5 + (out.l - 0.5) * config.contrast / 100.0).clamp(0.0, 1.0);

    // Sepia rotates hue toward a fixed warm hue and boosts saturation.
    let sepia = config.sepia / 100.0;
    if sepia > 0.0 {
        out.h = mix_hue(out.h, SEPIA_HUE, sepia);
        out.s = (out.s + SEPIA_SATURATION_BOOST * sepia).clamp(0.0, 1.0);
    }

    // Grayscale pulls saturation toward zero.
    out.s = (out.s * (1.0 - config.grayscale / 100.0)).clamp(0.0, 1.0);

    out
}

/// The mode branch: interpolate lightness between the scheme poles.
///
/// Lightness maps linearly from the text pole (input l = 0) to the
/// background pole (input l = 1). With the dark scheme the background pole
/// is darker than the text pole, so the map inverts around the midpoint;
/// with the light scheme it dims monotonically. Saturation is pulled toward
/// the nearer pole in proportion to how background- or foreground-like the
/// input is.
fn remap_lightness(color: Hsla, mode: Mode, scheme: &SchemeColors) -> Hsla {
    let (background, text) = match mode {
        Mode::Dark => (scheme.dark_background, scheme.dark_text),
        Mode::Filter => (scheme.light_background, scheme.light_text),
    };

    let l = (text.l + (background.l - text.l) * color.l).clamp(0.0, 1.0);

    let pole = if color.l >= 0.5 { background } else { text };
    let weight = (color.l - 0.5).abs() * 2.0;
    let s = (color.s + (pole.s - color.s) * weight * POLE_PULL).clamp(0.0, 1.0);

    Hsla {
        h: color.h,
        s,
        l,
        a: color.a,
    }
}
