//! Generated CSS blocks: fix-rule output, scrollbar and selection
//! policies, font overrides and system-control styling.
//!
//! Everything here produces text appended after the per-source overrides
//! in `export_generated_css`, in a fixed order so the literal fix CSS
//! always lands last.

use shadekit_color::Hsla;
use shadekit_theme::{ColorPolicy, Mode, SchemeColors, ThemeConfig};
use tracing::warn;

/// The fixed inversion applied to `invert` fix-rule selectors.
const INVERT_FILTER: &str = "invert(100%) hue-rotate(180deg)";

/// Background and text poles of the active mode.
fn active_poles(mode: Mode, scheme: &SchemeColors) -> (Hsla, Hsla) {
    match mode {
        Mode::Dark => (scheme.dark_background, scheme.dark_text),
        Mode::Filter => (scheme.light_background, scheme.light_text),
    }
}

fn shift_lightness(color: Hsla, delta: f32) -> Hsla {
    Hsla {
        l: (color.l + delta).clamp(0.0, 1.0),
        ..color
    }
}

/// One rule applying the fixed inversion to every `invert` selector.
pub(crate) fn invert_css(selectors: &[String]) -> String {
    if selectors.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    out.push_str(&selectors.join(",\n"));
    out.push_str(" {\n  filter: ");
    out.push_str(INVERT_FILTER);
    out.push_str(" !important;\n}\n");
    out
}

/// Scrollbar and selection styling per the configured policies.
pub(crate) fn policy_css(config: &ThemeConfig, scheme: &SchemeColors) -> String {
    let (background, text) = active_poles(config.mode, scheme);
    let mut out = String::new();

    match &config.selection_color {
        ColorPolicy::Unset => {}
        ColorPolicy::Auto => {
            let highlight = shift_lightness(background, selection_shift(config.mode));
            push_selection(&mut out, &highlight.to_css_string(), &text.to_css_string());
        }
        ColorPolicy::Literal(color) => {
            push_selection(&mut out, color, &text.to_css_string());
        }
    }

    match &config.scrollbar_color {
        ColorPolicy::Unset => {}
        ColorPolicy::Auto => {
            let thumb = shift_lightness(background, scrollbar_shift(config.mode));
            let track = background;
            push_scrollbar(&mut out, &thumb.to_css_string(), &track.to_css_string());
        }
        ColorPolicy::Literal(color) => {
            push_scrollbar(&mut out, color, &background.to_css_string());
        }
    }

    out
}

// Derived accents move away from the background pole: lighter on a dark
// background, darker on a light one.
fn selection_shift(mode: Mode) -> f32 {
    match mode {
        Mode::Dark => 0.2,
        Mode::Filter => -0.2,
    }
}

fn scrollbar_shift(mode: Mode) -> f32 {
    match mode {
        Mode::Dark => 0.12,
        Mode::Filter => -0.12,
    }
}

fn push_selection(out: &mut String, background: &str, text: &str) {
    out.push_str("::selection {\n  background-color: ");
    out.push_str(background);
    out.push_str(" !important;\n  color: ");
    out.push_str(text);
    out.push_str(" !important;\n}\n");
}

fn push_scrollbar(out: &mut String, thumb: &str, track: &str) {
    out.push_str("* {\n  scrollbar-color: ");
    out.push_str(thumb);
    out.push(' ');
    out.push_str(track);
    out.push_str(" !important;\n}\n");
}

/// Font family replacement and text stroke, when configured.
pub(crate) fn font_css(config: &ThemeConfig) -> String {
    let mut out = String::new();
    if config.use_font && !config.font_family.trim().is_empty() {
        out.push_str("* {\n  font-family: ");
        out.push_str(config.font_family.trim());
        out.push_str(" !important;\n}\n");
    }
    if config.text_stroke > 0.0 {
        out.push_str(&format!(
            "* {{\n  -webkit-text-stroke: {:.2}px !important;\n}}\n",
            config.text_stroke
        ));
    }
    out
}

/// Styling for form controls and other system widgets.
pub(crate) fn system_controls_css(config: &ThemeConfig, scheme: &SchemeColors) -> String {
    if !config.style_system_controls {
        return String::new();
    }
    let (background, text) = active_poles(config.mode, scheme);
    let field = shift_lightness(background, field_shift(config.mode));
    let border = shift_lightness(background, border_shift(config.mode));
    format!(
        "input, textarea, select, button {{\n  \
         background-color: {} !important;\n  \
         color: {} !important;\n  \
         border-color: {} !important;\n}}\n",
        field.to_css_string(),
        text.to_css_string(),
        border.to_css_string()
    )
}

fn field_shift(mode: Mode) -> f32 {
    match mode {
        Mode::Dark => 0.05,
        Mode::Filter => -0.03,
    }
}

fn border_shift(mode: Mode) -> f32 {
    match mode {
        Mode::Dark => 0.15,
        Mode::Filter => -0.15,
    }
}

/// Substitute `${name}` placeholders in literal fix CSS from the active
/// scheme colors.
///
/// Supported names: the four scheme colors plus `background` and `text`,
/// which resolve against the active mode. Unknown placeholders are kept
/// verbatim.
pub(crate) fn substitute_template(css: &str, mode: Mode, scheme: &SchemeColors) -> String {
    let (background, text) = active_poles(mode, scheme);
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            warn!("unterminated placeholder in fix css");
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        let replacement = match name {
            "dark_background" => Some(scheme.dark_background),
            "dark_text" => Some(scheme.dark_text),
            "light_background" => Some(scheme.light_background),
            "light_text" => Some(scheme.light_text),
            "background" => Some(background),
            "text" => Some(text),
            _ => None,
        };
        match replacement {
            Some(color) => out.push_str(&color.to_css_string()),
            None => {
                warn!(name, "unknown placeholder in fix css");
                out.push_str(&rest[start..start + 2 + end + 1]);
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
