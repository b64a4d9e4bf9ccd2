//! The style rewriter: turns original CSS into override output.
//!
//! Walks rule trees including nested conditional groups and inline
//! declaration lists. Only declarations whose value actually changed make
//! it into the override, and override declarations are forced `!important`
//! so they win the cascade against the originals they shadow.

use shadekit_css::{
    bears_color, is_direct_color_property, parse_inline_style, CssError, CssItem, Declaration,
    GroupRule, Rule, Stylesheet,
};
use shadekit_theme::Transformer;
use smallvec::SmallVec;
use tracing::warn;

/// Rewrite a full sheet into its override text.
///
/// Rules with no color-bearing changes are dropped; groups survive only if
/// something under them changed. Raw at-rules (`@font-face`, `@keyframes`)
/// never need overrides.
pub(crate) fn rewrite_sheet_text(css: &str, t: &Transformer) -> Result<String, CssError> {
    let sheet = Stylesheet::parse(css)?;
    let items = rewrite_items(&sheet.items, t);
    Ok(Stylesheet { items }.to_css_text())
}

fn rewrite_items(items: &[CssItem], t: &Transformer) -> Vec<CssItem> {
    let mut out = Vec::new();
    for item in items {
        match item {
            CssItem::Style(rule) => {
                let mut declarations: SmallVec<[Declaration; 8]> = SmallVec::new();
                for d in &rule.declarations {
                    if let Some(value) = rewrite_value(&d.property, &d.value, t) {
                        declarations.push(Declaration {
                            property: d.property.clone(),
                            value,
                            important: true,
                        });
                    }
                }
                if !declarations.is_empty() {
                    out.push(CssItem::Style(Rule {
                        selector: rule.selector.clone(),
                        declarations,
                    }));
                }
            }
            CssItem::Group(group) => {
                let items = rewrite_items(&group.items, t);
                if !items.is_empty() {
                    out.push(CssItem::Group(GroupRule {
                        condition: group.condition.clone(),
                        items,
                    }));
                }
            }
            CssItem::Raw(_) => {}
        }
    }
    out
}

/// Rewrite a full sheet in place, keeping every rule and declaration.
///
/// Used when the access proxy is disabled by fix rules and the document
/// text itself is replaced. Importance flags are preserved; the rewritten
/// sheet occupies the original's cascade position. `None` when nothing in
/// the sheet changed.
pub(crate) fn rewrite_sheet_text_in_place(
    css: &str,
    t: &Transformer,
) -> Result<Option<String>, CssError> {
    let sheet = Stylesheet::parse(css)?;
    let mut changed = false;
    let items = rewrite_items_in_place(&sheet.items, t, &mut changed);
    if changed {
        Ok(Some(Stylesheet { items }.to_css_text()))
    } else {
        Ok(None)
    }
}

fn rewrite_items_in_place(
    items: &[CssItem],
    t: &Transformer,
    changed: &mut bool,
) -> Vec<CssItem> {
    items
        .iter()
        .map(|item| match item {
            CssItem::Style(rule) => {
                let declarations = rule
                    .declarations
                    .iter()
                    .map(|d| match rewrite_value(&d.property, &d.value, t) {
                        Some(value) => {
                            *changed = true;
                            Declaration {
                                property: d.property.clone(),
                                value,
                                important: d.important,
                            }
                        }
                        None => d.clone(),
                    })
                    .collect();
                CssItem::Style(Rule {
                    selector: rule.selector.clone(),
                    declarations,
                })
            }
            CssItem::Group(group) => CssItem::Group(GroupRule {
                condition: group.condition.clone(),
                items: rewrite_items_in_place(&group.items, t, changed),
            }),
            CssItem::Raw(text) => CssItem::Raw(text.clone()),
        })
        .collect()
}

/// Rewrite one declaration value, `None` when nothing changes.
pub(crate) fn rewrite_value(property: &str, value: &str, t: &Transformer) -> Option<String> {
    if !bears_color(property) {
        return None;
    }
    if is_direct_color_property(property) {
        let rewritten = t.transform_value(value.trim())?;
        if rewritten.eq_ignore_ascii_case(value.trim()) {
            return None;
        }
        return Some(rewritten);
    }
    // Shorthands, image properties and custom properties: scan for color
    // tokens embedded in the larger value.
    rewrite_color_tokens(value, t)
}

/// Rewrite an inline `style` attribute into its shadow declaration list.
///
/// The shadow replaces the whole attribute, so unchanged declarations are
/// carried over verbatim. `None` when no declaration changed.
pub(crate) fn rewrite_inline_declarations(
    style: &str,
    t: &Transformer,
) -> Option<Vec<Declaration>> {
    let declarations = parse_inline_style(style);
    let mut changed = false;
    let out: Vec<Declaration> = declarations
        .into_iter()
        .map(|d| match rewrite_value(&d.property, &d.value, t) {
            Some(value) => {
                changed = true;
                Declaration {
                    property: d.property,
                    value,
                    important: d.important,
                }
            }
            None => d,
        })
        .collect();
    changed.then_some(out)
}

/// The changed declarations of an inline `style` attribute, forced
/// `!important`.
///
/// Used in proxy mode, where overrides ride in the generated sheet and
/// must beat the still-present original attribute. `None` when no
/// declaration changed.
pub(crate) fn rewrite_inline_overrides(
    style: &str,
    t: &Transformer,
) -> Option<Vec<Declaration>> {
    let out: Vec<Declaration> = parse_inline_style(style)
        .into_iter()
        .filter_map(|d| {
            rewrite_value(&d.property, &d.value, t).map(|value| Declaration {
                property: d.property,
                value,
                important: true,
            })
        })
        .collect();
    (!out.is_empty()).then_some(out)
}

/// Scan a value for color tokens and transform each in place.
///
/// Recognizes hex literals, `rgb()`/`rgba()`/`hsl()`/`hsla()` calls and
/// named colors. `url(...)` spans are copied through untouched so data URLs
/// and file names never get mangled.
fn rewrite_color_tokens(value: &str, t: &Transformer) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = String::with_capacity(value.len());
    let mut changed = false;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c == b'#' {
            let end = scan_while(bytes, i + 1, |b| b.is_ascii_hexdigit());
            let token = &value[i..end];
            i = end;
            push_token(&mut out, token, t, &mut changed);
        } else if c.is_ascii_alphabetic() || c == b'-' {
            let end = scan_while(bytes, i, |b| {
                b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
            });
            let word = &value[i..end];
            if end < bytes.len() && bytes[end] == b'(' {
                let close = matching_paren(bytes, end);
                let call = &value[i..close];
                i = close;
                let lower = word.to_ascii_lowercase();
                if matches!(lower.as_str(), "rgb" | "rgba" | "hsl" | "hsla") {
                    push_token(&mut out, call, t, &mut changed);
                } else {
                    // url(), var(), gradient function names pass through;
                    // gradient arguments are scanned recursively.
                    if lower.ends_with("gradient") {
                        out.push_str(word);
                        let inner = &value[end..close];
                        match rewrite_color_tokens(inner, t) {
                            Some(rewritten) => {
                                out.push_str(&rewritten);
                                changed = true;
                            }
                            None => out.push_str(inner),
                        }
                    } else {
                        out.push_str(call);
                    }
                }
            } else {
                i = end;
                push_token(&mut out, word, t, &mut changed);
            }
        } else {
            out.push(c as char);
            i += 1;
        }
    }

    changed.then_some(out)
}

/// Append `token`, transformed when it parses as a color.
fn push_token(out: &mut String, token: &str, t: &Transformer, changed: &mut bool) {
    match t.transform_value(token) {
        Some(rewritten) if !rewritten.eq_ignore_ascii_case(token) => {
            out.push_str(&rewritten);
            *changed = true;
        }
        _ => out.push_str(token),
    }
}

fn scan_while(bytes: &[u8], from: usize, pred: impl Fn(u8) -> bool) -> usize {
    let mut i = from;
    while i < bytes.len() && pred(bytes[i]) {
        i += 1;
    }
    i
}

/// Index one past the `)` matching the `(` at `open`; the whole tail on
/// unbalanced input.
fn matching_paren(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0i32;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    warn!("unbalanced parentheses in css value");
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use shadekit_color::ParseCache;
    use shadekit_theme::{ThemeConfig, TransformCache};

    fn transformer() -> Transformer {
        Transformer::new(
            &ThemeConfig::default(),
            Arc::new(TransformCache::new()),
            Arc::new(ParseCache::new()),
        )
    }

    #[test]
    fn test_direct_property_rewritten() {
        let t = transformer();
        let out = rewrite_value("color", "#ffffff", &t).unwrap();
        assert_ne!(out, "#ffffff");
        assert!(out.starts_with('#'));
    }

    #[test]
    fn test_non_color_property_ignored() {
        let t = transformer();
        assert_eq!(rewrite_value("display", "block", &t), None);
        assert_eq!(rewrite_value("font-size", "14px", &t), None);
    }

    #[test]
    fn test_keyword_value_left_alone() {
        let t = transformer();
        assert_eq!(rewrite_value("color", "inherit", &t), None);
        assert_eq!(rewrite_value("color", "currentcolor", &t), None);
    }

    #[test]
    fn test_shadow_list_tokens() {
        let t = transformer();
        let out = rewrite_value("box-shadow", "0 1px 2px #000000, inset 0 0 4px red", &t)
            .unwrap();
        assert!(!out.contains("#000000"));
        assert!(!out.contains("red"));
        assert!(out.contains("inset"));
        assert!(out.contains("0 1px 2px"));
    }

    #[test]
    fn test_gradient_stops_rewritten_url_kept() {
        let t = transformer();
        let out = rewrite_value(
            "background",
            "url(bg-red.png) linear-gradient(to right, #ffffff, rgb(0, 0, 0))",
            &t,
        )
        .unwrap();
        assert!(out.contains("url(bg-red.png)"), "got {}", out);
        assert!(out.contains("linear-gradient(to right,"));
        assert!(!out.contains("#ffffff"));
        assert!(!out.contains("rgb(0, 0, 0)"));
    }

    #[test]
    fn test_custom_property_probed() {
        let t = transformer();
        assert!(rewrite_value("--accent", "#336699", &t).is_some());
        assert_eq!(rewrite_value("--spacing", "8px", &t), None);
    }

    #[test]
    fn test_sheet_override_keeps_only_changes() {
        let t = transformer();
        let css = r#"
            body { color: #ffffff; margin: 0; }
            .plain { display: flex; }
            @media (min-width: 600px) {
                p { background-color: black; }
            }
            @font-face { font-family: X; src: url("x.woff"); }
        "#;
        let out = rewrite_sheet_text(css, &t).unwrap();
        let sheet = Stylesheet::parse(&out).unwrap();
        assert_eq!(sheet.rule_count(), 2);
        assert!(!out.contains("margin"));
        assert!(!out.contains(".plain"));
        assert!(!out.contains("@font-face"));
        assert!(out.contains("@media (min-width: 600px)"));
        assert!(out.contains("!important"));
    }

    #[test]
    fn test_sheet_without_colors_is_empty_override() {
        let t = transformer();
        let out = rewrite_sheet_text(".a { display: none; }", &t).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_inline_shadow_carries_unchanged() {
        let t = transformer();
        let decls =
            rewrite_inline_declarations("color: white; padding: 4px", &t).unwrap();
        assert_eq!(decls.len(), 2);
        assert_ne!(decls[0].value, "white");
        assert_eq!(decls[1].value, "4px");
    }

    #[test]
    fn test_inline_without_colors_is_none() {
        let t = transformer();
        assert_eq!(rewrite_inline_declarations("padding: 4px", &t), None);
    }

    #[test]
    fn test_inline_overrides_changed_only() {
        let t = transformer();
        let decls = rewrite_inline_overrides("color: white; padding: 4px", &t).unwrap();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].property, "color");
        assert!(decls[0].important);
        assert_eq!(rewrite_inline_overrides("padding: 4px", &t), None);
    }

    #[test]
    fn test_in_place_rewrite_keeps_everything() {
        let t = transformer();
        let css = "body { color: #ffffff; margin: 0; }\n.plain { display: flex; }\n";
        let out = rewrite_sheet_text_in_place(css, &t).unwrap().unwrap();
        assert!(out.contains("margin: 0"));
        assert!(out.contains(".plain"));
        assert!(!out.contains("#ffffff"));
        assert!(!out.contains("!important"));
    }

    #[test]
    fn test_in_place_rewrite_none_when_colorless() {
        let t = transformer();
        let out = rewrite_sheet_text_in_place(".a { display: none; }", &t).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_rewrite_is_deterministic() {
        let t = transformer();
        let css = "body { color: #ffffff; background: linear-gradient(red, blue); }";
        assert_eq!(
            rewrite_sheet_text(css, &t).unwrap(),
            rewrite_sheet_text(css, &t).unwrap()
        );
    }
}
