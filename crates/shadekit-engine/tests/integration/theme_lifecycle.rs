//! Theme lifecycle integration tests
//!
//! These tests verify that the engine:
//! - Enables and disables cleanly, restoring script-observable state
//! - Replaces its config wholesale on re-enable
//! - Degrades instead of double-claiming a document
//! - Follows the system color scheme in auto mode

use crate::support::{TestTheme, INLINE_CSS, STYLE_CSS};

use shadekit_dom::Document;
use shadekit_engine::{EngineEvent, ThemeEngine};
use shadekit_theme::{FixRules, ThemeConfig};

#[test]
fn test_enable_emits_event_and_themes() {
    let mut theme = TestTheme::new();
    theme.enable_dark();

    assert!(theme.engine().is_enabled());
    let events = theme.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, EngineEvent::Enabled)));
    assert!(events
        .iter()
        .any(|e| matches!(e, EngineEvent::SheetRewritten { .. })));
    assert_eq!(theme.engine().stats().sources, 3);
}

#[test]
fn test_originals_survive_theming() {
    let mut theme = TestTheme::new();
    theme.enable_dark();

    let style = theme.style;
    let card = theme.card;
    assert_eq!(
        theme.engine().visible_style_text(style).as_deref(),
        Some(STYLE_CSS)
    );
    assert_eq!(
        theme.engine().document().element_text(style),
        STYLE_CSS
    );
    assert_eq!(
        theme.engine().visible_style_text(card).as_deref(),
        Some(INLINE_CSS)
    );
}

#[test]
fn test_disable_restores_and_clears() {
    let mut theme = TestTheme::new();
    theme.enable_dark();

    let card = theme.card;
    assert!(theme
        .engine()
        .document()
        .attribute(card, "data-shadekit-inline")
        .is_some());

    theme.engine_mut().disable();
    assert!(!theme.engine().is_enabled());
    assert_eq!(theme.engine().stats().sources, 0);
    assert!(theme
        .engine()
        .document()
        .attribute(card, "data-shadekit-inline")
        .is_none());

    let events = theme.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, EngineEvent::Disabled)));
}

#[test]
fn test_reenable_replaces_config() {
    let mut theme = TestTheme::new();
    theme.enable_dark();
    let style = theme.style;
    let first = theme
        .engine()
        .shadow_for_node(style)
        .map(str::to_string)
        .unwrap();

    let brighter = ThemeConfig {
        brightness: 150.0,
        ..Default::default()
    };
    theme.enable(brighter, FixRules::default());
    let second = theme.engine().shadow_for_node(style).unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_claimed_document_degrades() {
    let mut doc = Document::new();
    let root = doc.root();
    doc.set_attribute(root, "data-shadekit-proxy", "1").unwrap();

    let mut engine = ThemeEngine::new(doc);
    let mut events = engine.take_event_receiver().unwrap();
    engine.enable(ThemeConfig::default(), FixRules::default());

    assert!(!engine.is_enabled());
    assert!(matches!(
        events.try_recv(),
        Ok(EngineEvent::ProxyDegraded { .. })
    ));
}

#[test]
fn test_auto_mode_follows_system_scheme() {
    let mut theme = TestTheme::new();
    theme.engine_mut().auto(Some(ThemeConfig::default()));
    assert!(!theme.engine().is_enabled());

    theme
        .engine_mut()
        .set_color_scheme(shadekit_engine::ColorScheme::Dark);
    theme.settle();
    assert!(theme.engine().is_enabled());

    theme
        .engine_mut()
        .set_color_scheme(shadekit_engine::ColorScheme::Light);
    theme.settle();
    assert!(!theme.engine().is_enabled());
}

#[test]
fn test_in_place_restores_on_disable() {
    let mut theme = TestTheme::new();
    let fixes = FixRules {
        disable_style_sheet_proxy: true,
        ..Default::default()
    };
    theme.enable(ThemeConfig::default(), fixes);

    let style = theme.style;
    let card = theme.card;
    assert_ne!(theme.engine().document().element_text(style), STYLE_CSS);
    assert_ne!(
        theme.engine().document().inline_style(card),
        Some(INLINE_CSS)
    );

    theme.engine_mut().disable();
    assert_eq!(theme.engine().document().element_text(style), STYLE_CSS);
    assert_eq!(
        theme.engine().document().inline_style(card),
        Some(INLINE_CSS)
    );
}

#[test]
fn test_transform_cache_reused_across_reenable() {
    let mut theme = TestTheme::new();
    theme.enable_dark();
    let before = theme.engine().stats().transform_cache;
    assert!(before.insertions > 0);

    theme.enable_dark();
    let after = theme.engine().stats().transform_cache;
    assert!(after.hits > before.hits, "rescan should hit the cache");
}
