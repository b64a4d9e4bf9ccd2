//! The full color transform: parse, filter, tint, serialize, memoize.

use std::sync::Arc;

use tracing::trace;

use shadekit_color::{Hsla, ParseCache};

use crate::cache::TransformCache;
use crate::filter::apply_filters;
use crate::tint::blend_tint;
use crate::{Fingerprint, SchemeColors, ThemeConfig};

/// A config bound to its resolved scheme, fingerprint and caches.
///
/// Build one per active config; it stays valid until the config changes,
/// at which point the engine constructs a fresh transformer (the shared
/// [`TransformCache`] carries over, keyed by fingerprint).
pub struct Transformer {
    config: ThemeConfig,
    scheme: SchemeColors,
    tint: Option<Hsla>,
    fingerprint: Fingerprint,
    cache: Arc<TransformCache>,
    parse_cache: Arc<ParseCache>,
}

impl Transformer {
    pub fn new(
        config: &ThemeConfig,
        cache: Arc<TransformCache>,
        parse_cache: Arc<ParseCache>,
    ) -> Self {
        let config = config.clamped();
        let scheme = SchemeColors::resolve(&config);
        let tint = config
            .tint_color
            .as_deref()
            .and_then(|value| parse_cache.normalize(value))
            .filter(|_| config.tint_strength > 0.0);
        let fingerprint = config.fingerprint();
        Self {
            config,
            scheme,
            tint,
            fingerprint,
            cache,
            parse_cache,
        }
    }

    /// The clamped config this transformer was built from.
    pub fn config(&self) -> &ThemeConfig {
        &self.config
    }

    pub fn scheme(&self) -> &SchemeColors {
        &self.scheme
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Transform a CSS color token into its themed serialization.
    ///
    /// `None` means the token is not a recognizable color (keywords like
    /// `currentcolor` among them) and must be left untouched.
    pub fn transform_value(&self, value: &str) -> Option<String> {
        if let Some(cached) = self.cache.get(value, self.fingerprint.hash()) {
            return Some(cached);
        }

        let color = self.parse_cache.normalize(value)?;
        let output = self.transform_hsla(color).to_css_string();
        trace!(input = value, output, "Transformed color");
        self.cache
            .put(value, self.fingerprint.hash(), output.clone());
        Some(output)
    }

    /// Run the filter and tint stages on an already-normalized color.
    pub fn transform_hsla(&self, color: Hsla) -> Hsla {
        let filtered = apply_filters(color, &self.config, &self.scheme);
        blend_tint(filtered, self.tint, self.config.tint_strength)
    }
}
