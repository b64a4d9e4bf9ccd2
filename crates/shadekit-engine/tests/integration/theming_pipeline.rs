//! Theming pipeline integration tests
//!
//! These tests verify the full document -> generated CSS path: every
//! source kind contributes output, transformed values match the
//! reference transformation, fetch failures stay isolated and fix
//! rules land in the export.

use std::collections::HashMap;

use crate::support::{transform_one, TestTheme};

use shadekit_engine::EngineEvent;
use shadekit_theme::{ColorPolicy, FixRules, SchemeColors, ThemeConfig};

#[tokio::test]
async fn test_all_source_kinds_generate_output() {
    let mut theme = TestTheme::new();
    theme.enable_dark();

    let css = theme.engine().export_generated_css().await;
    assert!(css.contains("body"), "style block output missing: {}", css);
    assert!(css.contains(".banner"), "linked sheet output missing: {}", css);
    assert!(
        css.contains("[data-shadekit-inline=\""),
        "inline override missing: {}",
        css
    );
}

#[tokio::test]
async fn test_poles_map_to_distinct_values() {
    let config = ThemeConfig {
        tint_color: Some("#FF8C42".to_string()),
        tint_strength: 25.0,
        ..Default::default()
    };
    let mut theme = TestTheme::new();
    theme.enable(config.clone(), FixRules::default());

    let background = transform_one(&config, "#ffffff").unwrap();
    let text = transform_one(&config, "#000000").unwrap();
    assert_ne!(background, text, "poles must stay separated");

    let css = theme.engine().export_generated_css().await;
    assert!(css.contains(&background), "missing {} in {}", background, css);
    assert!(css.contains(&text), "missing {} in {}", text, css);
}

#[tokio::test]
async fn test_mutation_flows_into_export() {
    let config = ThemeConfig::default();
    let mut theme = TestTheme::new();
    theme.enable(config.clone(), FixRules::default());

    let style = theme.style;
    theme
        .engine_mut()
        .document_mut()
        .set_element_text(style, "body { color: #ff0000; }")
        .unwrap();
    theme.settle();

    let expected = transform_one(&config, "#ff0000").unwrap();
    let css = theme.engine().export_generated_css().await;
    assert!(css.contains(&expected), "missing {} in {}", expected, css);
}

#[tokio::test]
async fn test_fetch_failure_isolates_linked_sheet() {
    let mut theme = TestTheme::with_sheets(HashMap::new());
    theme.enable_dark();

    assert!(theme.engine().is_enabled());
    let events = theme.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, EngineEvent::FetchFailed { .. })));

    let link = theme.link;
    assert!(theme.engine().shadow_for_node(link).is_none());

    let css = theme.engine().export_generated_css().await;
    assert!(css.contains("body"), "style block should still theme: {}", css);
    assert!(!css.contains(".banner"));
}

#[tokio::test]
async fn test_fix_css_placeholders_resolved() {
    let config = ThemeConfig::default();
    let fixes = FixRules {
        css: ".masthead { background: ${background}; }".to_string(),
        ..Default::default()
    };
    let mut theme = TestTheme::new();
    theme.enable(config.clone(), fixes);

    let css = theme.engine().export_generated_css().await;
    let expected = SchemeColors::resolve(&config)
        .dark_background
        .to_css_string();
    assert!(css.contains(".masthead"));
    assert!(css.contains(&expected), "missing {} in {}", expected, css);
    assert!(!css.contains("${background}"));
}

#[tokio::test]
async fn test_invert_selectors_emitted() {
    let fixes = FixRules {
        invert: vec!["img.photo".to_string(), ".map".to_string()],
        ..Default::default()
    };
    let mut theme = TestTheme::new();
    theme.enable(ThemeConfig::default(), fixes);

    let css = theme.engine().export_generated_css().await;
    assert!(css.contains("img.photo"));
    assert!(css.contains("invert(100%) hue-rotate(180deg)"));
}

#[tokio::test]
async fn test_policy_font_and_control_blocks() {
    let config = ThemeConfig {
        selection_color: ColorPolicy::Auto,
        scrollbar_color: ColorPolicy::Auto,
        use_font: true,
        font_family: "Iosevka, monospace".to_string(),
        ..Default::default()
    };
    let mut theme = TestTheme::new();
    theme.enable(config, FixRules::default());

    let css = theme.engine().export_generated_css().await;
    assert!(css.contains("::selection"));
    assert!(css.contains("scrollbar-color"));
    assert!(css.contains("font-family: Iosevka, monospace"));
    assert!(css.contains("input, textarea, select, button"));
}

#[tokio::test]
async fn test_in_place_excludes_document_sources() {
    let fixes = FixRules {
        disable_style_sheet_proxy: true,
        ..Default::default()
    };
    let mut theme = TestTheme::new();
    theme.enable(ThemeConfig::default(), fixes);

    let css = theme.engine().export_generated_css().await;
    assert!(!css.contains("[data-shadekit-inline"));
    assert!(
        css.contains(".banner"),
        "linked sheets stay shadow-only in-place: {}",
        css
    );
}

#[tokio::test]
async fn test_data_url_sheet_loaded() {
    let mut theme = TestTheme::new();
    theme.enable_dark();

    let link = theme.link;
    theme
        .engine_mut()
        .document_mut()
        .set_attribute(
            link,
            "href",
            "data:text/css,.masthead%7Bcolor:%23112233;%7D",
        )
        .unwrap();
    theme.settle();

    let css = theme.engine().export_generated_css().await;
    assert!(css.contains(".masthead"), "data sheet missing: {}", css);
    assert!(!css.contains(".banner"), "old sheet should be replaced: {}", css);
}
