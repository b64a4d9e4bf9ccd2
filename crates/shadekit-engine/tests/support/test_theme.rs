//! TestTheme - Engine wrapper around a fully stocked document.

use std::collections::HashMap;
use std::sync::Arc;

use shadekit_color::ParseCache;
use shadekit_dom::{Document, NodeId};
use shadekit_engine::{EngineEvent, SyncState, ThemeEngine};
use shadekit_net::NetError;
use shadekit_theme::{FixRules, ThemeConfig, TransformCache, Transformer};
use tokio::sync::mpsc;
use url::Url;

pub const SHEET_URL: &str = "https://sheets.test/site.css";

pub const STYLE_CSS: &str = "\
body { background: #ffffff; color: #000000; }\n\
h1 { color: #0066cc; }\n";

pub const LINKED_CSS: &str = ".banner { background: #f5f5f5; color: #222222; }\n";

pub const INLINE_CSS: &str = "color: #333333; padding: 4px";

/// Engine wrapper over a document carrying every source kind: a style
/// block, a linked sheet served from an in-memory map, and an element
/// with an inline style.
pub struct TestTheme {
    engine: ThemeEngine,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    pub style: NodeId,
    pub link: NodeId,
    pub card: NodeId,
}

impl TestTheme {
    /// Create a test theme serving the default linked sheet.
    pub fn new() -> Self {
        let mut sheets = HashMap::new();
        sheets.insert(SHEET_URL.to_string(), LINKED_CSS.to_string());
        Self::with_sheets(sheets)
    }

    /// Create a test theme serving `sheets`; URLs outside the map fail.
    pub fn with_sheets(sheets: HashMap<String, String>) -> Self {
        let mut doc = Document::new();
        let root = doc.root();

        let head = doc.create_element("head");
        doc.append_child(root, head).expect("append head");

        let style = doc.create_element("style");
        doc.append_child(head, style).expect("append style");
        doc.set_element_text(style, STYLE_CSS).expect("style text");

        let link = doc.create_element("link");
        doc.set_attribute(link, "rel", "stylesheet").expect("rel");
        doc.set_attribute(link, "href", SHEET_URL).expect("href");
        doc.append_child(head, link).expect("append link");

        let card = doc.create_element("div");
        doc.set_attribute(card, "class", "card").expect("class");
        doc.set_inline_style(card, INLINE_CSS).expect("inline");
        doc.append_child(root, card).expect("append card");

        let mut engine = ThemeEngine::new(doc);
        engine.set_fetch_method(Arc::new(move |url: &Url| {
            sheets
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| NetError::FetchFailed {
                    url: url.to_string(),
                    reason: "not in test sheet map".to_string(),
                })
        }));
        let events = engine
            .take_event_receiver()
            .expect("event receiver already taken");

        Self {
            engine,
            events,
            style,
            link,
            card,
        }
    }

    /// Enable with a default dark config and settle.
    pub fn enable_dark(&mut self) {
        self.enable(ThemeConfig::default(), FixRules::default());
    }

    /// Enable with `config` and `fixes`, then settle.
    pub fn enable(&mut self, config: ThemeConfig, fixes: FixRules) {
        self.engine.enable(config, fixes);
        self.settle();
    }

    /// Pump and tick until the sync loop goes idle.
    pub fn settle(&mut self) {
        for _ in 0..64 {
            self.engine.pump();
            self.engine.tick();
            if self.engine.sync_state() == SyncState::Idle {
                return;
            }
        }
        panic!("sync loop did not settle within 64 frames");
    }

    /// Drain every pending engine event.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    pub fn engine(&self) -> &ThemeEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ThemeEngine {
        &mut self.engine
    }
}

/// Transform a single color value with a fresh transformer built from
/// `config`. Mirrors what the engine computes for expected-value checks.
pub fn transform_one(config: &ThemeConfig, value: &str) -> Option<String> {
    let transformer = Transformer::new(
        config,
        Arc::new(TransformCache::new()),
        Arc::new(ParseCache::new()),
    );
    transformer.transform_value(value)
}
