//! The tint stage of the transform pipeline.
//!
//! Blends a filtered color toward the configured tint color with fixed
//! per-channel weights, so hue shifts dominate while lightness stays close
//! to what the filter stage produced.

use shadekit_color::Hsla;

/// Fraction of the blend applied to hue.
const HUE_WEIGHT: f32 = 0.6;
/// Fraction of the blend applied to saturation.
const SATURATION_WEIGHT: f32 = 0.5;
/// Fraction of the blend applied to lightness.
const LIGHTNESS_WEIGHT: f32 = 0.2;

/// Blend `color` toward `tint` at `strength` percent.
///
/// Identity when `tint` is `None` or strength is zero. Hue moves along the
/// shorter arc of the hue circle, so a blend from 350 toward 10 passes
/// through 0 rather than sweeping backward through 180. Alpha passes
/// through untouched.
pub fn blend_tint(color: Hsla, tint: Option<Hsla>, strength: f32) -> Hsla {
    let Some(tint) = tint else {
        return color;
    };
    let s = strength / 100.0;
    if s <= 0.0 {
        return color;
    }

    Hsla {
        h: mix_hue(color.h, tint.h, s * HUE_WEIGHT),
        s: (color.s + (tint.s - color.s) * s * SATURATION_WEIGHT).clamp(0.0, 1.0),
        l: (color.l + (tint.l - color.l) * s * LIGHTNESS_WEIGHT).clamp(0.0, 1.0),
        a: color.a,
    }
}

/// Interpolate between two hues along the shorter arc, normalized to
/// `[0, 360)`.
pub(crate) fn mix_hue(from: f32, to: f32, t: f32) -> f32 {
    let mut delta = to - from;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta < -180.0 {
        delta += 360.0;
    }
    (from + delta * t).rem_euclid(360.0)
}
