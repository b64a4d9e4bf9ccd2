//! Dusk Smoke Harness
//!
//! This harness exercises the ShadeKit theme engine with a scripted
//! document to validate theming stability. It builds a document with
//! every source kind, enables a theme, mutates the document mid-run and
//! reports the resulting state as JSON.

use std::sync::Arc;
use std::time::Instant;

use shadekit_dom::Document;
use shadekit_engine::{EngineEvent, SyncState, ThemeEngine, ThemeEngineBuilder};
use shadekit_net::{FetchMethod, NetError};
use shadekit_theme::{ColorPolicy, FixRules, Mode, ThemeConfig};
use serde_json::json;
use tracing::{info, warn};
use url::Url;

const SHEET_URL: &str = "https://cdn.dusk.example/site.css";

const LINKED_SHEET: &str = "\
.banner { background: #f5f5f5; color: #222222; }\n\
.banner a { color: #0066cc; }\n";

const STYLE_BLOCK: &str = "\
body { background: #ffffff; color: #000000; }\n\
a { color: #0066cc; }\n\
.card { background: rgb(240, 240, 240); border-color: #dddddd; }\n";

/// Parse command line arguments
struct Args {
    mode: Mode,
    tint: Option<String>,
    tint_strength: f32,
    brightness: f32,
    dump_css: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut mode = Mode::Dark;
        let mut tint = None;
        let mut tint_strength = 0.0f32;
        let mut brightness = 100.0f32;
        let mut dump_css = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--mode" => {
                    if let Some(val) = args.next() {
                        mode = match val.as_str() {
                            "filter" => Mode::Filter,
                            _ => Mode::Dark,
                        };
                    }
                }
                "--tint" => {
                    tint = args.next();
                }
                "--tint-strength" => {
                    if let Some(val) = args.next() {
                        tint_strength = val.parse().unwrap_or(0.0);
                    }
                }
                "--brightness" => {
                    if let Some(val) = args.next() {
                        brightness = val.parse().unwrap_or(100.0);
                    }
                }
                "--dump-css" => {
                    dump_css = args.next();
                }
                _ => {}
            }
        }

        Self {
            mode,
            tint,
            tint_strength,
            brightness,
            dump_css,
        }
    }
}

/// A document carrying all three source kinds: a style block, a linked
/// sheet and an inline-styled element.
fn build_document() -> Document {
    let mut doc = Document::new();
    let root = doc.root();

    let style = doc.create_element("style");
    let _ = doc.append_child(root, style);
    let _ = doc.set_element_text(style, STYLE_BLOCK);

    let link = doc.create_element("link");
    let _ = doc.set_attribute(link, "rel", "stylesheet");
    let _ = doc.set_attribute(link, "href", SHEET_URL);
    let _ = doc.append_child(root, link);

    let card = doc.create_element("div");
    let _ = doc.set_attribute(card, "class", "card");
    let _ = doc.set_inline_style(card, "color: #333333; padding: 4px");
    let _ = doc.append_child(root, card);

    doc
}

fn fetch_method() -> FetchMethod {
    Arc::new(|url: &Url| {
        if url.as_str() == SHEET_URL {
            Ok(LINKED_SHEET.to_string())
        } else {
            Err(NetError::FetchFailed {
                url: url.to_string(),
                reason: "unknown test host".to_string(),
            })
        }
    })
}

/// Pump and tick until the sync loop goes idle.
fn settle(engine: &mut ThemeEngine) -> u32 {
    let mut ticks = 0u32;
    loop {
        engine.pump();
        engine.tick();
        ticks += 1;
        if engine.sync_state() == SyncState::Idle || ticks >= 64 {
            break;
        }
    }
    ticks
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!(
        mode = ?args.mode,
        tint = ?args.tint,
        tint_strength = args.tint_strength,
        brightness = args.brightness,
        "Starting Dusk Smoke Harness"
    );

    let start = Instant::now();

    let config = ThemeConfig {
        mode: args.mode,
        brightness: args.brightness,
        tint_color: args.tint.clone(),
        tint_strength: args.tint_strength,
        selection_color: ColorPolicy::Auto,
        scrollbar_color: ColorPolicy::Auto,
        ..Default::default()
    };

    let mut engine = ThemeEngineBuilder::new()
        .document(build_document())
        .fetch_method(fetch_method())
        .config(config)
        .build();
    let mut events = engine
        .take_event_receiver()
        .expect("event receiver already taken");

    let enable_ticks = settle(&mut engine);
    info!(ticks = enable_ticks, "Initial theming settled");

    // Mid-run mutation: a page script rewrites the style block and
    // attaches a fresh styled element.
    let style = engine.document().style_nodes().first().copied();
    if let Some(style) = style {
        let _ = engine.document_mut().set_element_text(
            style,
            "body { background: #fafafa; color: #111111; }\n",
        );
    }
    let root = engine.document().root();
    let late = engine.document_mut().create_element("span");
    let _ = engine
        .document_mut()
        .set_inline_style(late, "background: #eeeeee");
    let _ = engine.document_mut().append_child(root, late);

    let mutate_ticks = settle(&mut engine);
    info!(ticks = mutate_ticks, "Mutation theming settled");

    let mut rewrites = 0u64;
    let mut fetch_failures = 0u64;
    let mut proxy_degraded = false;
    while let Ok(event) = events.try_recv() {
        match event {
            EngineEvent::SheetRewritten { .. } => rewrites += 1,
            EngineEvent::FetchFailed { url, error } => {
                warn!(%url, error, "Sheet fetch failed");
                fetch_failures += 1;
            }
            EngineEvent::ProxyDegraded { reason } => {
                warn!(reason, "Proxy degraded");
                proxy_degraded = true;
            }
            EngineEvent::Enabled | EngineEvent::Disabled => {}
        }
    }

    let css = engine.export_generated_css().await;
    let mut css_dumped = false;
    if let Some(ref path) = args.dump_css {
        match std::fs::write(path, &css) {
            Ok(()) => {
                info!(?path, "Generated CSS dumped to file");
                css_dumped = true;
            }
            Err(e) => warn!(?path, error = %e, "Failed to dump generated CSS"),
        }
    }

    let stats = engine.stats();
    let status = if engine.is_enabled() && !proxy_degraded && fetch_failures == 0 {
        "pass"
    } else {
        "fail"
    };
    let result = json!({
        "status": status,
        "elapsed_ms": start.elapsed().as_millis(),
        "enable_ticks": enable_ticks,
        "mutate_ticks": mutate_ticks,
        "sources": stats.sources,
        "passes": stats.passes,
        "rewrites": rewrites,
        "fetch_failures": fetch_failures,
        "transform_cache_hit_rate": stats.transform_cache.hit_rate(),
        "sheet_cache_hits": stats.sheet_cache.hits,
        "generated_css_bytes": css.len(),
        "css_dumped": css_dumped,
    });
    println!("{}", result);
}
