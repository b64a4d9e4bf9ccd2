//! # ShadeKit Color
//!
//! CSS color parsing and HSLA normalization for the ShadeKit theme engine.
//!
//! ## Design Goals
//!
//! 1. **Canonical form**: Every parseable color normalizes to one HSLA value
//! 2. **Lossless fallback**: Unparseable input is reported, never guessed
//! 3. **Parse once**: A theme-independent cache keyed by the literal string
//! 4. **Stable output**: Serialization is deterministic for cache keys

use std::collections::HashMap;
use std::sync::RwLock;
use tracing::trace;

/// An sRGB color with 8-bit channels and a fractional alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };
    pub const BLACK: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 1.0,
    };
    pub const WHITE: Rgba = Rgba {
        r: 255,
        g: 255,
        b: 255,
        a: 1.0,
    };

    pub fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }
}

/// A color in canonical HSLA form.
///
/// Hue is in degrees in `[0, 360)`; saturation, lightness and alpha are
/// fractions in `[0, 1]`. This is the working representation of the whole
/// transform pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsla {
    pub h: f32,
    pub s: f32,
    pub l: f32,
    pub a: f32,
}

impl Hsla {
    pub fn new(h: f32, s: f32, l: f32, a: f32) -> Self {
        Self {
            h: normalize_hue(h),
            s: s.clamp(0.0, 1.0),
            l: l.clamp(0.0, 1.0),
            a: a.clamp(0.0, 1.0),
        }
    }

    /// Convert an sRGB color into HSLA.
    pub fn from_rgba(c: Rgba) -> Self {
        let (h, s, l) = rgb_to_hsl(c.r, c.g, c.b);
        Self { h, s, l, a: c.a }
    }

    /// Convert back to sRGB.
    pub fn to_rgba(self) -> Rgba {
        let (r, g, b) = hsl_to_rgb(self.h, self.s, self.l);
        Rgba::new(r, g, b, self.a)
    }

    /// Serialize to a CSS color string.
    ///
    /// Opaque colors become lowercase `#rrggbb`; translucent colors become
    /// `rgba(r, g, b, a)`. The format is stable so transformed values can be
    /// compared and cached as strings.
    pub fn to_css_string(self) -> String {
        let c = self.to_rgba();
        if c.a >= 1.0 {
            format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b)
        } else {
            format!(
                "rgba({}, {}, {}, {})",
                c.r,
                c.g,
                c.b,
                format_alpha(c.a)
            )
        }
    }
}

fn normalize_hue(h: f32) -> f32 {
    let mut h = h % 360.0;
    if h < 0.0 {
        h += 360.0;
    }
    h
}

fn format_alpha(a: f32) -> String {
    // Two decimal places, trailing zeros trimmed.
    let s = format!("{:.2}", a);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Parse any supported CSS color syntax into an [`Rgba`].
///
/// Supports named colors, `transparent`, 3/4/6/8 digit hex, `rgb()`/`rgba()`
/// and `hsl()`/`hsla()` in both comma and space notation. Returns `None` for
/// anything else (including `currentcolor`, `inherit` and `var()` references,
/// which need context the normalizer does not have).
pub fn parse_color(value: &str) -> Option<Rgba> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let lower = value.to_ascii_lowercase();
    match lower.as_str() {
        "transparent" => return Some(Rgba::TRANSPARENT),
        // Context-dependent keywords - the caller keeps the original text.
        "currentcolor" | "inherit" | "initial" | "unset" | "revert" => return None,
        _ => {}
    }

    if let Some([r, g, b]) = named_color(&lower) {
        return Some(Rgba::from_rgb(r, g, b));
    }

    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }

    if lower.starts_with("rgb") {
        let inner = lower
            .trim_start_matches("rgba")
            .trim_start_matches("rgb")
            .trim()
            .strip_prefix('(')?
            .strip_suffix(')')?;
        let parts = split_args(inner);
        if parts.len() >= 3 {
            let r = parse_channel(&parts[0])?;
            let g = parse_channel(&parts[1])?;
            let b = parse_channel(&parts[2])?;
            let a = if parts.len() >= 4 {
                parse_alpha(&parts[3])?
            } else {
                1.0
            };
            return Some(Rgba::new(r, g, b, a));
        }
        return None;
    }

    if lower.starts_with("hsl") {
        let inner = lower
            .trim_start_matches("hsla")
            .trim_start_matches("hsl")
            .trim()
            .strip_prefix('(')?
            .strip_suffix(')')?;
        let parts = split_args(inner);
        if parts.len() >= 3 {
            let h = parts[0].trim_end_matches("deg").parse::<f32>().ok()?;
            let s = parse_percent(&parts[1])?;
            let l = parse_percent(&parts[2])?;
            let a = if parts.len() >= 4 {
                parse_alpha(&parts[3])?
            } else {
                1.0
            };
            let (r, g, b) = hsl_to_rgb(normalize_hue(h), s, l);
            return Some(Rgba::new(r, g, b, a));
        }
        return None;
    }

    None
}

/// Parse and normalize in one step.
pub fn normalize(value: &str) -> Option<Hsla> {
    parse_color(value).map(Hsla::from_rgba)
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let (r, g, b, a) = match hex.len() {
        3 => {
            let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
            (r, g, b, 1.0)
        }
        4 => {
            let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
            let a = u8::from_str_radix(&hex[3..4], 16).ok()? as f32 * 17.0 / 255.0;
            (r, g, b, a)
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            (r, g, b, 1.0)
        }
        8 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            let a = u8::from_str_radix(&hex[6..8], 16).ok()? as f32 / 255.0;
            (r, g, b, a)
        }
        _ => return None,
    };
    Some(Rgba::new(r, g, b, a))
}

/// Split a function argument list on commas, or on whitespace for the
/// space-separated notation (`rgb(0 0 0 / 0.5)`).
fn split_args(inner: &str) -> Vec<String> {
    if inner.contains(',') {
        inner.split(',').map(|p| p.trim().to_string()).collect()
    } else {
        inner
            .replace('/', " ")
            .split_whitespace()
            .map(|p| p.to_string())
            .collect()
    }
}

fn parse_channel(part: &str) -> Option<u8> {
    let part = part.trim();
    if let Some(pct) = part.strip_suffix('%') {
        let v = pct.trim().parse::<f32>().ok()?;
        return Some((v.clamp(0.0, 100.0) / 100.0 * 255.0).round() as u8);
    }
    // Fractional channel values appear in the wild; round them.
    let v = part.parse::<f32>().ok()?;
    Some(v.clamp(0.0, 255.0).round() as u8)
}

fn parse_alpha(part: &str) -> Option<f32> {
    let part = part.trim();
    if let Some(pct) = part.strip_suffix('%') {
        let v = pct.trim().parse::<f32>().ok()?;
        return Some((v / 100.0).clamp(0.0, 1.0));
    }
    let v = part.parse::<f32>().ok()?;
    Some(v.clamp(0.0, 1.0))
}

fn parse_percent(part: &str) -> Option<f32> {
    let v = part
        .trim()
        .trim_end_matches('%')
        .parse::<f32>()
        .ok()?;
    Some((v / 100.0).clamp(0.0, 1.0))
}

/// Convert HSL to RGB.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (u8, u8, u8) {
    if s == 0.0 {
        // Achromatic (gray)
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let h = h / 360.0;
    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }

    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

/// Convert RGB to HSL. Hue is in degrees in `[0, 360)`.
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (normalize_hue(h * 60.0), s, l)
}

/// Theme-independent cache of parse results, keyed by the literal input
/// string. Parsing never depends on the active theme, so entries stay valid
/// until the cache is cleared.
pub struct ParseCache {
    entries: RwLock<HashMap<String, Option<Hsla>>>,
}

impl ParseCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Normalize a color string through the cache.
    ///
    /// Failed parses are cached too; a document full of `var()` references
    /// would otherwise re-tokenize every pass.
    pub fn normalize(&self, value: &str) -> Option<Hsla> {
        if let Ok(entries) = self.entries.read() {
            if let Some(cached) = entries.get(value) {
                return *cached;
            }
        }

        let parsed = normalize(value);
        trace!(value, hit = false, parsed = parsed.is_some(), "color parse");
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(value.to_string(), parsed);
        }
        parsed
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new()
    }
}

fn named_color(name: &str) -> Option<[u8; 3]> {
    NAMED_COLORS
        .binary_search_by_key(&name, |(n, _)| n)
        .ok()
        .map(|i| NAMED_COLORS[i].1)
}

/// CSS named colors (Color Level 4), sorted for binary search.
static NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("aliceblue", [240, 248, 255]),
    ("antiquewhite", [250, 235, 215]),
    ("aqua", [0, 255, 255]),
    ("aquamarine", [127, 255, 212]),
    ("azure", [240, 255, 255]),
    ("beige", [245, 245, 220]),
    ("bisque", [255, 228, 196]),
    ("black", [0, 0, 0]),
    ("blanchedalmond", [255, 235, 205]),
    ("blue", [0, 0, 255]),
    ("blueviolet", [138, 43, 226]),
    ("brown", [165, 42, 42]),
    ("burlywood", [222, 184, 135]),
    ("cadetblue", [95, 158, 160]),
    ("chartreuse", [127, 255, 0]),
    ("chocolate", [210, 105, 30]),
    ("coral", [255, 127, 80]),
    ("cornflowerblue", [100, 149, 237]),
    ("cornsilk", [255, 248, 220]),
    ("crimson", [220, 20, 60]),
    ("cyan", [0, 255, 255]),
    ("darkblue", [0, 0, 139]),
    ("darkcyan", [0, 139, 139]),
    ("darkgoldenrod", [184, 134, 11]),
    ("darkgray", [169, 169, 169]),
    ("darkgreen", [0, 100, 0]),
    ("darkgrey", [169, 169, 169]),
    ("darkkhaki", [189, 183, 107]),
    ("darkmagenta", [139, 0, 139]),
    ("darkolivegreen", [85, 107, 47]),
    ("darkorange", [255, 140, 0]),
    ("darkorchid", [153, 50, 204]),
    ("darkred", [139, 0, 0]),
    ("darksalmon", [233, 150, 122]),
    ("darkseagreen", [143, 188, 143]),
    ("darkslateblue", [72, 61, 139]),
    ("darkslategray", [47, 79, 79]),
    ("darkslategrey", [47, 79, 79]),
    ("darkturquoise", [0, 206, 209]),
    ("darkviolet", [148, 0, 211]),
    ("deeppink", [255, 20, 147]),
    ("deepskyblue", [0, 191, 255]),
    ("dimgray", [105, 105, 105]),
    ("dimgrey", [105, 105, 105]),
    ("dodgerblue", [30, 144, 255]),
    ("firebrick", [178, 34, 34]),
    ("floralwhite", [255, 250, 240]),
    ("forestgreen", [34, 139, 34]),
    ("fuchsia", [255, 0, 255]),
    ("gainsboro", [220, 220, 220]),
    ("ghostwhite", [248, 248, 255]),
    ("gold", [255, 215, 0]),
    ("goldenrod", [218, 165, 32]),
    ("gray", [128, 128, 128]),
    ("green", [0, 128, 0]),
    ("greenyellow", [173, 255, 47]),
    ("grey", [128, 128, 128]),
    ("honeydew", [240, 255, 240]),
    ("hotpink", [255, 105, 180]),
    ("indianred", [205, 92, 92]),
    ("indigo", [75, 0, 130]),
    ("ivory", [255, 255, 240]),
    ("khaki", [240, 230, 140]),
    ("lavender", [230, 230, 250]),
    ("lavenderblush", [255, 240, 245]),
    ("lawngreen", [124, 252, 0]),
    ("lemonchiffon", [255, 250, 205]),
    ("lightblue", [173, 216, 230]),
    ("lightcoral", [240, 128, 128]),
    ("lightcyan", [224, 255, 255]),
    ("lightgoldenrodyellow", [250, 250, 210]),
    ("lightgray", [211, 211, 211]),
    ("lightgreen", [144, 238, 144]),
    ("lightgrey", [211, 211, 211]),
    ("lightpink", [255, 182, 193]),
    ("lightsalmon", [255, 160, 122]),
    ("lightseagreen", [32, 178, 170]),
    ("lightskyblue", [135, 206, 250]),
    ("lightslategray", [119, 136, 153]),
    ("lightslategrey", [119, 136, 153]),
    ("lightsteelblue", [176, 196, 222]),
    ("lightyellow", [255, 255, 224]),
    ("lime", [0, 255, 0]),
    ("limegreen", [50, 205, 50]),
    ("linen", [250, 240, 230]),
    ("magenta", [255, 0, 255]),
    ("maroon", [128, 0, 0]),
    ("mediumaquamarine", [102, 205, 170]),
    ("mediumblue", [0, 0, 205]),
    ("mediumorchid", [186, 85, 211]),
    ("mediumpurple", [147, 112, 219]),
    ("mediumseagreen", [60, 179, 113]),
    ("mediumslateblue", [123, 104, 238]),
    ("mediumspringgreen", [0, 250, 154]),
    ("mediumturquoise", [72, 209, 204]),
    ("mediumvioletred", [199, 21, 133]),
    ("midnightblue", [25, 25, 112]),
    ("mintcream", [245, 255, 250]),
    ("mistyrose", [255, 228, 225]),
    ("moccasin", [255, 228, 181]),
    ("navajowhite", [255, 222, 173]),
    ("navy", [0, 0, 128]),
    ("oldlace", [253, 245, 230]),
    ("olive", [128, 128, 0]),
    ("olivedrab", [107, 142, 35]),
    ("orange", [255, 165, 0]),
    ("orangered", [255, 69, 0]),
    ("orchid", [218, 112, 214]),
    ("palegoldenrod", [238, 232, 170]),
    ("palegreen", [152, 251, 152]),
    ("paleturquoise", [175, 238, 238]),
    ("palevioletred", [219, 112, 147]),
    ("papayawhip", [255, 239, 213]),
    ("peachpuff", [255, 218, 185]),
    ("peru", [205, 133, 63]),
    ("pink", [255, 192, 203]),
    ("plum", [221, 160, 221]),
    ("powderblue", [176, 224, 230]),
    ("purple", [128, 0, 128]),
    ("rebeccapurple", [102, 51, 153]),
    ("red", [255, 0, 0]),
    ("rosybrown", [188, 143, 143]),
    ("royalblue", [65, 105, 225]),
    ("saddlebrown", [139, 69, 19]),
    ("salmon", [250, 128, 114]),
    ("sandybrown", [244, 164, 96]),
    ("seagreen", [46, 139, 87]),
    ("seashell", [255, 245, 238]),
    ("sienna", [160, 82, 45]),
    ("silver", [192, 192, 192]),
    ("skyblue", [135, 206, 235]),
    ("slateblue", [106, 90, 205]),
    ("slategray", [112, 128, 144]),
    ("slategrey", [112, 128, 144]),
    ("snow", [255, 250, 250]),
    ("springgreen", [0, 255, 127]),
    ("steelblue", [70, 130, 180]),
    ("tan", [210, 180, 140]),
    ("teal", [0, 128, 128]),
    ("thistle", [216, 191, 216]),
    ("tomato", [255, 99, 71]),
    ("turquoise", [64, 224, 208]),
    ("violet", [238, 130, 238]),
    ("wheat", [245, 222, 179]),
    ("white", [255, 255, 255]),
    ("whitesmoke", [245, 245, 245]),
    ("yellow", [255, 255, 0]),
    ("yellowgreen", [154, 205, 50]),
];
