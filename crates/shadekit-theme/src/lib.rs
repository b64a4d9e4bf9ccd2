//! # ShadeKit Theme
//!
//! Theme configuration, the color filter pipeline and the transform cache
//! for the ShadeKit theme engine.
//!
//! ## Design Goals
//!
//! 1. **Clamp, never reject**: Out-of-range config values are pulled into range
//! 2. **Fingerprinted**: Any config change produces a new cache fingerprint
//! 3. **Pure pipeline**: Filter and tint are pure functions over HSLA
//! 4. **Memoized**: One transform per distinct (color, fingerprint) pair

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::warn;

use shadekit_color::Hsla;

mod cache;
mod filter;
mod tint;
mod transform;

pub use cache::{TransformCache, TransformCacheStats};
pub use filter::apply_filters;
pub use tint::blend_tint;
pub use transform::Transformer;

/// How lightness is remapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Mode {
    /// Dim without inverting, against the light scheme poles.
    Filter = 0,
    /// Invert lightness against the dark scheme poles.
    #[default]
    Dark = 1,
}

/// Policy for scrollbar and selection colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum ColorPolicy {
    /// Leave the browser default alone.
    #[default]
    Unset,
    /// Derive from the active scheme colors.
    Auto,
    /// Use this exact color.
    Literal(String),
}

/// The bundle of settings controlling the color transform.
///
/// All numeric fields are percentages. [`ThemeConfig::clamped`] pulls every
/// field into its declared range; the engine clamps on `enable` so the rest
/// of the pipeline can assume in-range values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Lightness scale, `[50, 200]`.
    pub brightness: f32,
    /// Lightness spread around the midpoint, `[50, 200]`.
    pub contrast: f32,
    /// Warm hue rotation, `[0, 100]`.
    pub sepia: f32,
    /// Saturation reduction, `[0, 100]`.
    pub grayscale: f32,
    pub mode: Mode,
    /// Tint target; `None` (or an empty string) disables blending.
    pub tint_color: Option<String>,
    /// Tint blend strength, `[0, 100]`.
    pub tint_strength: f32,
    pub dark_background: String,
    pub dark_text: String,
    pub light_background: String,
    pub light_text: String,
    pub scrollbar_color: ColorPolicy,
    pub selection_color: ColorPolicy,
    /// Replace page fonts with `font_family`.
    pub use_font: bool,
    pub font_family: String,
    /// Text stroke width in pixels, `[0, 4]`.
    pub text_stroke: f32,
    /// Generate styling for form controls and other system widgets.
    pub style_system_controls: bool,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            sepia: 0.0,
            grayscale: 0.0,
            mode: Mode::Dark,
            tint_color: None,
            tint_strength: 0.0,
            dark_background: "#181a1b".to_string(),
            dark_text: "#e8e6e3".to_string(),
            light_background: "#dcdad7".to_string(),
            light_text: "#181a1b".to_string(),
            scrollbar_color: ColorPolicy::Unset,
            selection_color: ColorPolicy::Unset,
            use_font: false,
            font_family: String::new(),
            text_stroke: 0.0,
            style_system_controls: true,
        }
    }
}

impl ThemeConfig {
    /// Return a copy with every field pulled into its declared range.
    ///
    /// An empty tint color normalizes to `None` so blending is disabled
    /// regardless of strength.
    pub fn clamped(&self) -> Self {
        let mut c = self.clone();
        c.brightness = c.brightness.clamp(50.0, 200.0);
        c.contrast = c.contrast.clamp(50.0, 200.0);
        c.sepia = c.sepia.clamp(0.0, 100.0);
        c.grayscale = c.grayscale.clamp(0.0, 100.0);
        c.tint_strength = c.tint_strength.clamp(0.0, 100.0);
        c.text_stroke = c.text_stroke.clamp(0.0, 4.0);
        if matches!(c.tint_color.as_deref(), Some(s) if s.trim().is_empty()) {
            c.tint_color = None;
        }
        c
    }

    /// Compute the cache fingerprint of this config.
    ///
    /// Clamps first, so two configs that clamp to the same values share a
    /// fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.clamped())
    }
}

/// Deterministic serialization of a [`ThemeConfig`], used as the cache
/// invalidation key. Any field change produces a new fingerprint; entries
/// under old fingerprints simply become unreachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    hash: u64,
    repr: String,
}

impl Fingerprint {
    fn of(config: &ThemeConfig) -> Self {
        // serde_json keeps struct field order, so the repr is stable.
        let repr = serde_json::to_string(config).unwrap_or_else(|e| {
            warn!(error = %e, "config serialization failed, falling back to debug repr");
            format!("{:?}", config)
        });
        let mut hasher = DefaultHasher::new();
        repr.hash(&mut hasher);
        Self {
            hash: hasher.finish(),
            repr,
        }
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// The serialized config this fingerprint was computed from.
    pub fn repr(&self) -> &str {
        &self.repr
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.hash)
    }
}

/// Per-site exceptions layered on top of the generic transform.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FixRules {
    /// Selectors that get a fixed visual inversion instead of per-color
    /// transformation.
    pub invert: Vec<String>,
    /// Literal CSS appended after all generated rules. `${name}` placeholders
    /// are substituted from the active scheme colors.
    pub css: String,
    /// Selectors exempted from inline-style rewriting.
    pub ignore_inline_style: Vec<String>,
    /// Selectors exempted from image and background analysis.
    pub ignore_image_analysis: Vec<String>,
    /// Disable the stylesheet access proxy for this document.
    pub disable_style_sheet_proxy: bool,
}

/// The four scheme colors of a config, resolved to HSLA.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchemeColors {
    pub dark_background: Hsla,
    pub dark_text: Hsla,
    pub light_background: Hsla,
    pub light_text: Hsla,
}

impl SchemeColors {
    /// Resolve the scheme colors of a config, falling back to the built-in
    /// defaults for any unparseable field.
    pub fn resolve(config: &ThemeConfig) -> Self {
        let defaults = ThemeConfig::default();
        let resolve = |value: &str, fallback: &str| {
            shadekit_color::normalize(value).unwrap_or_else(|| {
                warn!(value, fallback, "unparseable scheme color");
                shadekit_color::normalize(fallback)
                    .unwrap_or(Hsla::new(0.0, 0.0, 0.0, 1.0))
            })
        };
        Self {
            dark_background: resolve(&config.dark_background, &defaults.dark_background),
            dark_text: resolve(&config.dark_text, &defaults.dark_text),
            light_background: resolve(&config.light_background, &defaults.light_background),
            light_text: resolve(&config.light_text, &defaults.light_text),
        }
    }
}
