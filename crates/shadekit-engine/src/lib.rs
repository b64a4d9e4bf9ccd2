//! # ShadeKit Engine
//!
//! Theme engine orchestration layer that ties the ShadeKit components
//! together: style source tracking, rewriting, the sync loop and the
//! host-facing API.
//!
//! ## Design Goals
//!
//! 1. **Per-document instances**: One engine themes one document
//! 2. **Host-driven**: `pump` delivers mutations, `tick` is the frame boundary
//! 3. **Shadow output**: Originals stay script-visible; overrides ride apart
//! 4. **Event coordination**: State changes surface as engine events

use std::sync::Arc;
use std::time::Instant;

use shadekit_color::ParseCache;
use shadekit_css::serialize_declarations;
use shadekit_dom::{Document, DomError, MutationRecord, NodeId};
use shadekit_net::{FetchMethod, NetError, SheetCacheStats, StylesheetLoader};
use shadekit_theme::{
    FixRules, ThemeConfig, TransformCache, TransformCacheStats, Transformer,
};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, info_span, warn};
use url::Url;

mod fixes;
mod proxy;
mod rewriter;
mod source;
mod sync;

pub use proxy::ProxyError;
pub use source::{SourceId, SourceKind, StyleSource};
pub use sync::SyncState;

/// Attribute addressing inline-style overrides in the generated sheet.
pub const INLINE_KEY: &str = "data-shadekit-inline";

/// Errors that can occur in the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Network error: {0}")]
    NetworkError(#[from] NetError),

    #[error("Document error: {0}")]
    DocumentError(#[from] DomError),

    #[error("CSS error: {0}")]
    CssError(#[from] shadekit_css::CssError),

    #[error("Proxy error: {0}")]
    ProxyError(#[from] ProxyError),
}

/// Engine events emitted to the host application.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The theme was enabled.
    Enabled,
    /// The theme was disabled and originals restored.
    Disabled,
    /// A source's shadow output was (re)built.
    SheetRewritten { source: SourceId },
    /// A linked sheet could not be loaded; the source is isolated.
    FetchFailed { url: Url, error: String },
    /// The access proxy could not be installed; the theme stayed off.
    ProxyDegraded { reason: String },
}

/// The host's reported system color-scheme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

/// Counters and cache statistics for debugging.
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub sources: usize,
    pub passes: u64,
    pub transform_cache: TransformCacheStats,
    pub sheet_cache: SheetCacheStats,
}

/// The theme engine for one document.
pub struct ThemeEngine {
    document: Document,
    mutations: Option<mpsc::UnboundedReceiver<MutationRecord>>,
    transformer: Option<Transformer>,
    fixes: FixRules,
    transform_cache: Arc<TransformCache>,
    parse_cache: Arc<ParseCache>,
    loader: Arc<StylesheetLoader>,
    sources: source::SourceRegistry,
    sync: sync::SyncLoop,
    proxy: proxy::AccessProxy,
    /// Rewrites land in the document itself (proxy disabled by fix rules).
    in_place: bool,
    enabled: bool,
    auto_config: Option<ThemeConfig>,
    scheme_tx: watch::Sender<ColorScheme>,
    scheme_rx: watch::Receiver<ColorScheme>,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<EngineEvent>>,
    passes: u64,
}

impl ThemeEngine {
    /// Create a disabled engine around `document`.
    pub fn new(mut document: Document) -> Self {
        info!("Initializing ShadeKit engine");
        let mutations = document.take_mutation_receiver();
        if mutations.is_none() {
            warn!("Document mutation receiver already taken, sync will be blind");
        }
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (scheme_tx, scheme_rx) = watch::channel(ColorScheme::default());
        Self {
            document,
            mutations,
            transformer: None,
            fixes: FixRules::default(),
            transform_cache: Arc::new(TransformCache::new()),
            parse_cache: Arc::new(ParseCache::new()),
            loader: Arc::new(StylesheetLoader::new()),
            sources: source::SourceRegistry::new(),
            sync: sync::SyncLoop::new(),
            proxy: proxy::AccessProxy::new(),
            in_place: false,
            enabled: false,
            auto_config: None,
            scheme_tx,
            scheme_rx,
            event_tx,
            event_rx: Some(event_rx),
            passes: 0,
        }
    }

    /// Take the event receiver. Can only be called once.
    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<EngineEvent>> {
        self.event_rx.take()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Override cross-origin stylesheet retrieval.
    pub fn set_fetch_method(&mut self, method: FetchMethod) {
        self.loader.set_fetch_method(method);
    }

    /// Enable the theme. Clamps the config, installs the proxy, schedules
    /// a full scan. Replaces any previous config wholesale.
    pub fn enable(&mut self, config: ThemeConfig, fixes: FixRules) {
        let span = info_span!("enable");
        let _guard = span.enter();

        if self.enabled {
            self.teardown();
        }

        let transformer = Transformer::new(
            &config,
            self.transform_cache.clone(),
            self.parse_cache.clone(),
        );
        self.transform_cache
            .prune_stale(transformer.fingerprint().hash());

        self.in_place = fixes.disable_style_sheet_proxy;
        if !self.in_place {
            if let Err(e) = self.proxy.install(&mut self.document) {
                warn!(error = %e, "Access proxy install failed, theme stays disabled");
                let _ = self.event_tx.send(EngineEvent::ProxyDegraded {
                    reason: e.to_string(),
                });
                return;
            }
        }

        info!(fingerprint = %transformer.fingerprint(), in_place = self.in_place, "Theme enabled");
        self.transformer = Some(transformer);
        self.fixes = fixes;
        self.enabled = true;

        let targets = self.style_bearing_nodes();
        self.sync.schedule_scan(targets);
        self.drain_self_mutations();
        let _ = self.event_tx.send(EngineEvent::Enabled);
    }

    /// Disable the theme and restore script-observable state.
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.teardown();
        info!("Theme disabled");
        let _ = self.event_tx.send(EngineEvent::Disabled);
    }

    /// Follow the system color scheme: enable with `config` when it turns
    /// dark, disable when it turns light. `None` stops following.
    pub fn auto(&mut self, config: Option<ThemeConfig>) {
        self.auto_config = config;
        if self.auto_config.is_some() {
            self.apply_auto();
        }
    }

    /// Report the system color-scheme preference.
    pub fn set_color_scheme(&mut self, scheme: ColorScheme) {
        let _ = self.scheme_tx.send(scheme);
    }

    /// Drain pending mutation records and the auto-mode signal.
    pub fn pump(&mut self) {
        if self.auto_config.is_some() && self.scheme_rx.has_changed().unwrap_or(false) {
            self.apply_auto();
        }

        let Some(rx) = self.mutations.as_mut() else {
            return;
        };
        let mut records = Vec::new();
        while let Ok(record) = rx.try_recv() {
            records.push(record);
        }
        for record in records {
            self.handle_mutation(record);
        }
    }

    /// Route one mutation record into the sync batch.
    pub fn handle_mutation(&mut self, record: MutationRecord) {
        if !self.enabled {
            return;
        }
        match record {
            MutationRecord::AttributeChanged { ref name, .. }
                if name.starts_with("data-shadekit") => {}
            MutationRecord::NodeAdded { node } => self.sync.mark_added(node),
            MutationRecord::NodeRemoved { node } => {
                if let Some(removed) = self.sources.remove_node(node) {
                    self.sync.forget_source(removed.id);
                }
            }
            MutationRecord::AttributeChanged { node, ref name } => match name.as_str() {
                "style" => self.mark_node(node),
                // href and rel edits can retarget or de-classify a linked
                // sheet; route through full reclassification.
                "href" | "rel" => self.sync.mark_added(node),
                _ => {}
            },
            MutationRecord::TextChanged { node } => {
                if self.document.tag(node) == Some("style") {
                    self.mark_node(node);
                }
            }
        }
    }

    /// The frame boundary: apply queued work under the tick budget.
    pub fn tick(&mut self) {
        if !self.enabled || !self.sync.has_work() {
            return;
        }
        let span = info_span!("apply_pass", pass = self.passes);
        let _guard = span.enter();

        self.sync.begin_apply();
        self.passes += 1;
        let start = Instant::now();
        while start.elapsed() < sync::TICK_BUDGET {
            if let Some(node) = self.sync.next_scan_node() {
                self.process_node(node);
            } else if let Some(node) = self.sync.next_added_node() {
                self.process_node(node);
            } else if let Some(id) = self.sync.next_dirty_source() {
                self.refresh_source(id);
            } else {
                break;
            }
        }
        self.drain_self_mutations();
        self.sync.end_apply();
    }

    /// Current sync-loop state.
    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    /// The style text a script observes for `node`.
    pub fn visible_style_text(&self, node: NodeId) -> Option<String> {
        self.proxy.visible_text(&self.document, &self.sources, node)
    }

    /// The shadow output of the source attached to `node`, if any.
    pub fn shadow_for_node(&self, node: NodeId) -> Option<&str> {
        let id = self.sources.for_node(node)?;
        self.sources.get(id)?.shadow.as_deref()
    }

    /// The full generated CSS: per-source overrides, fix-rule output,
    /// policies, font and system-control blocks, literal fix CSS last.
    pub async fn export_generated_css(&self) -> String {
        let (Some(transformer), true) = (&self.transformer, self.enabled) else {
            return String::new();
        };
        let config = transformer.config();
        let scheme = transformer.scheme();
        let mut out = String::new();

        for source in self.sources.iter_ordered() {
            let Some(shadow) = source.shadow.as_deref().filter(|s| !s.is_empty()) else {
                continue;
            };
            match &source.kind {
                SourceKind::InlineStyle => {
                    if !self.in_place {
                        out.push_str(&format!(
                            "[{}=\"{}\"] {{ {} }}\n",
                            INLINE_KEY,
                            source.id.raw(),
                            shadow
                        ));
                    }
                }
                SourceKind::StyleBlock => {
                    if !self.in_place {
                        out.push_str(shadow);
                    }
                }
                SourceKind::LinkedSheet { .. } => out.push_str(shadow),
            }
        }

        out.push_str(&fixes::invert_css(&self.fixes.invert));
        out.push_str(&fixes::policy_css(config, scheme));
        out.push_str(&fixes::font_css(config));
        out.push_str(&fixes::system_controls_css(config, scheme));
        if !self.fixes.css.trim().is_empty() {
            let fix = fixes::substitute_template(&self.fixes.css, config.mode, scheme);
            out.push_str(fix.trim_end());
            out.push('\n');
        }
        out
    }

    /// Get engine statistics.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            sources: self.sources.len(),
            passes: self.passes,
            transform_cache: self.transform_cache.stats(),
            sheet_cache: self.loader.stats(),
        }
    }

    fn apply_auto(&mut self) {
        let scheme = *self.scheme_rx.borrow_and_update();
        let Some(config) = self.auto_config.clone() else {
            return;
        };
        debug!(?scheme, "Auto mode following system scheme");
        match scheme {
            ColorScheme::Dark => self.enable(config, self.fixes.clone()),
            ColorScheme::Light => self.disable(),
        }
    }

    fn style_bearing_nodes(&self) -> Vec<NodeId> {
        self.document
            .descendants()
            .into_iter()
            .filter(|id| self.classify(*id).is_some())
            .collect()
    }

    /// What kind of source a node would register as, `None` for
    /// style-free nodes.
    fn classify(&self, node: NodeId) -> Option<SourceKind> {
        match self.document.tag(node)? {
            "style" => Some(SourceKind::StyleBlock),
            "link" => {
                let rel = self.document.attribute(node, "rel")?;
                if !rel.split_whitespace().any(|r| r == "stylesheet") {
                    return None;
                }
                let href = self.document.attribute(node, "href")?;
                match Url::parse(href) {
                    Ok(url) => Some(SourceKind::LinkedSheet { url }),
                    Err(e) => {
                        warn!(href, error = %e, "Unparseable stylesheet href");
                        None
                    }
                }
            }
            _ => {
                let style = self.document.inline_style(node)?;
                (!style.trim().is_empty()).then_some(SourceKind::InlineStyle)
            }
        }
    }

    fn mark_node(&mut self, node: NodeId) {
        match self.sources.for_node(node) {
            Some(id) => self.sync.mark_dirty(id),
            None => self.sync.mark_added(node),
        }
    }

    /// Classify a node and (re)build its source.
    fn process_node(&mut self, node: NodeId) {
        match self.classify(node) {
            Some(kind) => {
                // Attribute changes can swap a node's kind (href edits);
                // registration replaces any previous source.
                let reuse = self
                    .sources
                    .for_node(node)
                    .and_then(|id| self.sources.get(id))
                    .is_some_and(|s| s.kind == kind);
                let id = if reuse {
                    match self.sources.for_node(node) {
                        Some(id) => id,
                        None => return,
                    }
                } else {
                    self.sources.register(node, kind)
                };
                self.refresh_source(id);
            }
            None => {
                if let Some(removed) = self.sources.remove_node(node) {
                    self.sync.forget_source(removed.id);
                }
            }
        }
    }

    /// Re-read a source's original text and rebuild its shadow.
    fn refresh_source(&mut self, id: SourceId) {
        let Some((node, kind)) = self.sources.get(id).map(|s| (s.node, s.kind.clone())) else {
            return;
        };
        match kind {
            SourceKind::StyleBlock => self.refresh_style_block(id, node),
            SourceKind::InlineStyle => self.refresh_inline(id, node),
            SourceKind::LinkedSheet { url } => self.refresh_linked(id, &url),
        }
    }

    fn refresh_style_block(&mut self, id: SourceId, node: NodeId) {
        let Some(transformer) = self.transformer.as_ref() else {
            return;
        };
        let text = self.document.element_text(node);
        let previous_shadow = self.sources.get(id).and_then(|s| s.shadow.clone());

        if self.in_place {
            // Our own write comes back as a text mutation; converged.
            if previous_shadow.as_deref() == Some(text.as_str()) {
                return;
            }
            let rewritten = match rewriter::rewrite_sheet_text_in_place(&text, transformer) {
                Ok(r) => r,
                Err(e) => {
                    warn!(%id, error = %e, "Sheet parse failed, left untouched");
                    return;
                }
            };
            if let Some(source) = self.sources.get_mut(id) {
                source.original = text;
                source.shadow = rewritten.clone();
            }
            if let Some(rewritten) = rewritten {
                if self.document.set_element_text(node, &rewritten).is_ok() {
                    let _ = self.event_tx.send(EngineEvent::SheetRewritten { source: id });
                }
            }
        } else {
            let unchanged = self
                .sources
                .get(id)
                .is_some_and(|s| s.original == text && s.shadow.is_some());
            if unchanged {
                return;
            }
            let shadow = match rewriter::rewrite_sheet_text(&text, transformer) {
                Ok(s) => s,
                Err(e) => {
                    warn!(%id, error = %e, "Sheet parse failed, no override generated");
                    String::new()
                }
            };
            if let Some(source) = self.sources.get_mut(id) {
                source.original = text;
                source.shadow = Some(shadow);
            }
            let _ = self.event_tx.send(EngineEvent::SheetRewritten { source: id });
        }
    }

    fn refresh_inline(&mut self, id: SourceId, node: NodeId) {
        let Some(transformer) = self.transformer.as_ref() else {
            return;
        };
        let style = self
            .document
            .inline_style(node)
            .unwrap_or_default()
            .to_string();

        if self.in_place {
            let previous_shadow = self.sources.get(id).and_then(|s| s.shadow.clone());
            if previous_shadow.as_deref() == Some(style.as_str()) {
                return;
            }
            let rewritten = rewriter::rewrite_inline_declarations(&style, transformer)
                .map(|decls| serialize_declarations(&decls));
            if let Some(source) = self.sources.get_mut(id) {
                source.original = style;
                source.shadow = rewritten.clone();
            }
            if let Some(rewritten) = rewritten {
                if self.document.set_inline_style(node, &rewritten).is_ok() {
                    let _ = self.event_tx.send(EngineEvent::SheetRewritten { source: id });
                }
            }
        } else {
            let shadow = rewriter::rewrite_inline_overrides(&style, transformer)
                .map(|decls| serialize_declarations(&decls));
            let has_shadow = shadow.is_some();
            if let Some(source) = self.sources.get_mut(id) {
                source.original = style;
                source.shadow = shadow;
            }
            if has_shadow {
                let _ = self
                    .document
                    .set_attribute(node, INLINE_KEY, &id.raw().to_string());
                let _ = self.event_tx.send(EngineEvent::SheetRewritten { source: id });
            }
        }
    }

    fn refresh_linked(&mut self, id: SourceId, url: &Url) {
        let Some(transformer) = self.transformer.as_ref() else {
            return;
        };
        match self.loader.load(url) {
            Ok(text) => {
                let unchanged = self
                    .sources
                    .get(id)
                    .is_some_and(|s| s.original == text && s.shadow.is_some() && !s.failed);
                if unchanged {
                    return;
                }
                let shadow = match rewriter::rewrite_sheet_text(&text, transformer) {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(%id, %url, error = %e, "Linked sheet parse failed");
                        String::new()
                    }
                };
                if let Some(source) = self.sources.get_mut(id) {
                    source.original = text;
                    source.shadow = Some(shadow);
                    source.failed = false;
                }
                let _ = self.event_tx.send(EngineEvent::SheetRewritten { source: id });
            }
            Err(e) => {
                if let Some(source) = self.sources.get_mut(id) {
                    source.shadow = None;
                    source.failed = true;
                }
                let _ = self.event_tx.send(EngineEvent::FetchFailed {
                    url: url.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    /// Restore script-observable state and drop all theme output.
    fn teardown(&mut self) {
        self.sync.cancel();

        let sources: Vec<StyleSource> = self.sources.iter_ordered().cloned().collect();
        for source in sources {
            match source.kind {
                SourceKind::StyleBlock => {
                    if self.in_place && source.shadow.is_some() {
                        let _ = self
                            .document
                            .set_element_text(source.node, &source.original);
                    }
                }
                SourceKind::InlineStyle => {
                    if self.in_place && source.shadow.is_some() {
                        let _ = self
                            .document
                            .set_inline_style(source.node, &source.original);
                    } else {
                        let _ = self.document.remove_attribute(source.node, INLINE_KEY);
                    }
                }
                SourceKind::LinkedSheet { .. } => {}
            }
        }

        self.sources.clear();
        self.proxy.uninstall(&mut self.document);
        self.drain_self_mutations();
        self.transformer = None;
        self.enabled = false;
        self.in_place = false;
    }

    /// Drop mutation records produced by the engine's own writes so they
    /// do not re-schedule work.
    fn drain_self_mutations(&mut self) {
        if let Some(rx) = self.mutations.as_mut() {
            while rx.try_recv().is_ok() {}
        }
    }
}

/// Builder for [`ThemeEngine`].
pub struct ThemeEngineBuilder {
    document: Option<Document>,
    config: Option<ThemeConfig>,
    fixes: FixRules,
    fetch_method: Option<FetchMethod>,
}

impl ThemeEngineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            document: None,
            config: None,
            fixes: FixRules::default(),
            fetch_method: None,
        }
    }

    /// The document to theme. Defaults to an empty document.
    pub fn document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    /// Enable with this config as soon as the engine is built.
    pub fn config(mut self, config: ThemeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Fix rules applied on enable.
    pub fn fixes(mut self, fixes: FixRules) -> Self {
        self.fixes = fixes;
        self
    }

    /// Override cross-origin stylesheet retrieval.
    pub fn fetch_method(mut self, method: FetchMethod) -> Self {
        self.fetch_method = Some(method);
        self
    }

    /// Build the engine.
    pub fn build(self) -> ThemeEngine {
        let mut engine = ThemeEngine::new(self.document.unwrap_or_default());
        if let Some(method) = self.fetch_method {
            engine.set_fetch_method(method);
        }
        if let Some(config) = self.config {
            engine.enable(config, self.fixes);
        }
        engine
    }
}

impl Default for ThemeEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_style(css: &str) -> Document {
        let mut doc = Document::new();
        let head = doc.create_element("head");
        doc.append_child(doc.root(), head).unwrap();
        let style = doc.create_element("style");
        doc.append_child(head, style).unwrap();
        doc.set_element_text(style, css).unwrap();
        doc
    }

    fn settle(engine: &mut ThemeEngine) {
        // Scan chunks and converging writes need a few frames.
        for _ in 0..8 {
            engine.pump();
            engine.tick();
        }
    }

    #[test]
    fn test_builder_defaults_disabled() {
        let mut engine = ThemeEngineBuilder::new().build();
        assert!(!engine.is_enabled());
        assert!(engine.take_event_receiver().is_some());
        assert!(engine.take_event_receiver().is_none());
    }

    #[test]
    fn test_enable_scans_and_rewrites() {
        let doc = doc_with_style("body { color: #ffffff; }");
        let mut engine = ThemeEngine::new(doc);
        engine.enable(ThemeConfig::default(), FixRules::default());
        assert!(engine.is_enabled());
        settle(&mut engine);

        let style = engine.document().style_nodes()[0];
        let shadow = engine.shadow_for_node(style).unwrap();
        assert!(shadow.contains("color:"));
        assert!(!shadow.contains("#ffffff"));
        assert_eq!(engine.sync_state(), SyncState::Idle);
    }

    #[test]
    fn test_originals_stay_script_visible() {
        let doc = doc_with_style("body { color: #ffffff; }");
        let mut engine = ThemeEngine::new(doc);
        engine.enable(ThemeConfig::default(), FixRules::default());
        settle(&mut engine);

        let style = engine.document().style_nodes()[0];
        assert_eq!(
            engine.visible_style_text(style).unwrap(),
            "body { color: #ffffff; }"
        );
        assert_eq!(
            engine.document().element_text(style),
            "body { color: #ffffff; }"
        );
    }

    #[test]
    fn test_disable_restores_and_clears() {
        let doc = doc_with_style("body { color: #ffffff; }");
        let mut engine = ThemeEngine::new(doc);
        engine.enable(ThemeConfig::default(), FixRules::default());
        settle(&mut engine);

        engine.disable();
        assert!(!engine.is_enabled());
        assert_eq!(engine.stats().sources, 0);

        let style = engine.document().style_nodes()[0];
        assert_eq!(
            engine.document().element_text(style),
            "body { color: #ffffff; }"
        );
    }

    #[test]
    fn test_mutation_marks_source_dirty() {
        let doc = doc_with_style("body { color: #ffffff; }");
        let mut engine = ThemeEngine::new(doc);
        engine.enable(ThemeConfig::default(), FixRules::default());
        settle(&mut engine);

        let style = engine.document().style_nodes()[0];
        engine
            .document_mut()
            .set_element_text(style, "body { color: #ff0000; }")
            .unwrap();
        engine.pump();
        assert_eq!(engine.sync_state(), SyncState::Scheduled);
        settle(&mut engine);

        let shadow = engine.shadow_for_node(style).unwrap();
        assert!(!shadow.contains("#ff0000"));
    }

    #[test]
    fn test_repeat_mutations_collapse_per_frame() {
        let doc = doc_with_style("body { color: #ffffff; }");
        let mut engine = ThemeEngine::new(doc);
        engine.enable(ThemeConfig::default(), FixRules::default());
        settle(&mut engine);
        let passes_before = engine.stats().passes;

        let style = engine.document().style_nodes()[0];
        for i in 0..10 {
            engine
                .document_mut()
                .set_element_text(style, &format!("body {{ color: #fffff{}; }}", i % 10))
                .unwrap();
        }
        engine.pump();
        engine.tick();
        assert_eq!(engine.stats().passes, passes_before + 1);
        assert_eq!(engine.sync_state(), SyncState::Idle);
    }

    #[test]
    fn test_in_place_mode_rewrites_document() {
        let doc = doc_with_style("body { color: #ffffff; }");
        let mut engine = ThemeEngine::new(doc);
        let fixes = FixRules {
            disable_style_sheet_proxy: true,
            ..Default::default()
        };
        engine.enable(ThemeConfig::default(), fixes);
        settle(&mut engine);

        let style = engine.document().style_nodes()[0];
        let text = engine.document().element_text(style);
        assert!(!text.contains("#ffffff"), "got {}", text);

        engine.disable();
        assert_eq!(
            engine.document().element_text(style),
            "body { color: #ffffff; }"
        );
    }

    #[test]
    fn test_second_engine_degrades() {
        let mut first_doc = Document::new();
        let root = first_doc.root();
        first_doc
            .set_attribute(root, proxy::PROXY_MARKER, "1")
            .unwrap();

        let mut engine = ThemeEngine::new(first_doc);
        let mut events = engine.take_event_receiver().unwrap();
        engine.enable(ThemeConfig::default(), FixRules::default());
        assert!(!engine.is_enabled());
        assert!(matches!(
            events.try_recv(),
            Ok(EngineEvent::ProxyDegraded { .. })
        ));
    }

    #[test]
    fn test_auto_follows_scheme() {
        let doc = doc_with_style("body { color: #ffffff; }");
        let mut engine = ThemeEngine::new(doc);
        engine.auto(Some(ThemeConfig::default()));
        assert!(!engine.is_enabled(), "light scheme keeps theme off");

        engine.set_color_scheme(ColorScheme::Dark);
        engine.pump();
        assert!(engine.is_enabled());

        engine.set_color_scheme(ColorScheme::Light);
        engine.pump();
        assert!(!engine.is_enabled());

        engine.auto(None);
        engine.set_color_scheme(ColorScheme::Dark);
        engine.pump();
        assert!(!engine.is_enabled(), "auto(None) stops following");
    }

    #[test]
    fn test_removed_node_tears_down_source() {
        let doc = doc_with_style("body { color: #ffffff; }");
        let mut engine = ThemeEngine::new(doc);
        engine.enable(ThemeConfig::default(), FixRules::default());
        settle(&mut engine);
        assert_eq!(engine.stats().sources, 1);

        let style = engine.document().style_nodes()[0];
        engine.document_mut().remove_node(style).unwrap();
        settle(&mut engine);
        assert_eq!(engine.stats().sources, 0);
    }
}
