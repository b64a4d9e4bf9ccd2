//! # ShadeKit CSS
//!
//! Stylesheet model and CSS parsing for the ShadeKit theme engine.
//!
//! ## Design Goals
//!
//! 1. **Faithful structure**: Preserve rule order and nested conditional groups
//! 2. **Text in, text out**: Values stay as strings; the engine rewrites tokens
//! 3. **Color awareness**: Enumerate which properties can carry color values
//! 4. **Round-trip**: A parsed sheet serializes back to equivalent CSS

use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

mod parser;

pub use parser::parse_inline_style;

/// Errors that can occur in CSS operations.
#[derive(Error, Debug)]
pub enum CssError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// A CSS declaration (property: value).
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            important: false,
        }
    }
}

/// A style rule (selector + declarations).
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub selector: String,
    pub declarations: SmallVec<[Declaration; 8]>,
}

/// A conditional group rule (`@media`, `@supports`, ...) with nested items.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRule {
    /// Full prelude including the at-keyword, e.g. `@media (min-width: 600px)`.
    pub condition: String,
    pub items: Vec<CssItem>,
}

/// One item in a stylesheet's rule tree.
#[derive(Debug, Clone, PartialEq)]
pub enum CssItem {
    Style(Rule),
    Group(GroupRule),
    /// At-rules kept verbatim (`@import ...;`, `@font-face { ... }`,
    /// `@keyframes ... { ... }`). The rewriter passes these through.
    Raw(String),
}

/// A complete stylesheet.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Stylesheet {
    pub items: Vec<CssItem>,
}

impl Stylesheet {
    /// Create an empty stylesheet.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Parse a CSS string into a stylesheet.
    pub fn parse(css: &str) -> Result<Self, CssError> {
        debug!(len = css.len(), "Parsing CSS");
        let items = parser::parse_items(css)?;
        let sheet = Stylesheet { items };
        debug!(rule_count = sheet.rule_count(), "CSS parsed");
        Ok(sheet)
    }

    /// Number of style rules, counting through nested groups.
    pub fn rule_count(&self) -> usize {
        fn count(items: &[CssItem]) -> usize {
            items
                .iter()
                .map(|item| match item {
                    CssItem::Style(_) => 1,
                    CssItem::Group(g) => count(&g.items),
                    CssItem::Raw(_) => 0,
                })
                .sum()
        }
        count(&self.items)
    }

    /// Serialize back to CSS text.
    pub fn to_css_text(&self) -> String {
        let mut out = String::new();
        write_items(&mut out, &self.items, 0);
        out
    }
}

fn write_items(out: &mut String, items: &[CssItem], depth: usize) {
    let pad = "  ".repeat(depth);
    for item in items {
        match item {
            CssItem::Style(rule) => {
                out.push_str(&pad);
                out.push_str(&rule.selector);
                out.push_str(" {\n");
                for d in &rule.declarations {
                    out.push_str(&pad);
                    out.push_str("  ");
                    out.push_str(&d.property);
                    out.push_str(": ");
                    out.push_str(&d.value);
                    if d.important {
                        out.push_str(" !important");
                    }
                    out.push_str(";\n");
                }
                out.push_str(&pad);
                out.push_str("}\n");
            }
            CssItem::Group(group) => {
                out.push_str(&pad);
                out.push_str(&group.condition);
                out.push_str(" {\n");
                write_items(out, &group.items, depth + 1);
                out.push_str(&pad);
                out.push_str("}\n");
            }
            CssItem::Raw(text) => {
                out.push_str(&pad);
                out.push_str(text);
                if !text.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
    }
}

/// Serialize a declaration list as an inline style attribute value.
pub fn serialize_declarations(declarations: &[Declaration]) -> String {
    let mut out = String::new();
    for d in declarations {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&d.property);
        out.push_str(": ");
        out.push_str(&d.value);
        if d.important {
            out.push_str(" !important");
        }
        out.push(';');
    }
    out
}

/// Properties whose entire value is a single color.
const DIRECT_COLOR_PROPERTIES: &[&str] = &[
    "color",
    "background-color",
    "border-color",
    "border-top-color",
    "border-right-color",
    "border-bottom-color",
    "border-left-color",
    "outline-color",
    "text-decoration-color",
    "caret-color",
    "column-rule-color",
    "accent-color",
    "fill",
    "stroke",
    "stop-color",
    "flood-color",
    "lighting-color",
];

/// Shorthands and image properties whose value may embed color tokens
/// (shadow lists, gradient stops, border shorthands).
const EMBEDDED_COLOR_PROPERTIES: &[&str] = &[
    "background",
    "background-image",
    "border",
    "border-top",
    "border-right",
    "border-bottom",
    "border-left",
    "outline",
    "box-shadow",
    "text-shadow",
    "column-rule",
    "text-decoration",
    "scrollbar-color",
];

/// True if the property's whole value is one color.
pub fn is_direct_color_property(name: &str) -> bool {
    DIRECT_COLOR_PROPERTIES.contains(&name)
}

/// True if the property can carry color tokens anywhere in its value.
///
/// Custom properties (`--*`) qualify: their values are opaque until a
/// `var()` reference lands somewhere color-valued, so the rewriter probes
/// them for color tokens.
pub fn bears_color(name: &str) -> bool {
    is_direct_color_property(name)
        || EMBEDDED_COLOR_PROPERTIES.contains(&name)
        || name.starts_with("--")
}
