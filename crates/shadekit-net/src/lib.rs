//! # ShadeKit Net
//!
//! Stylesheet resource loading for the ShadeKit theme engine.
//!
//! ## Design Goals
//!
//! 1. **Pluggable**: The host supplies the actual fetch implementation
//! 2. **Self-sufficient for data URLs**: `data:` sheets decode without a host
//! 3. **Cached**: One fetch per URL while the cache lives
//! 4. **Isolated failures**: An unloadable sheet is an error value, nothing more

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;
use tracing::{debug, trace, warn};
use url::Url;

/// Errors that can occur while loading a stylesheet resource.
#[derive(Error, Debug, Clone)]
pub enum NetError {
    #[error("Fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("No fetch method registered for {0}")]
    NoFetchMethod(String),

    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),
}

/// Host-supplied stylesheet retrieval. Consulted for every non-`data:`
/// URL; the engine's `set_fetch_method` installs one of these.
pub type FetchMethod = Arc<dyn Fn(&Url) -> Result<String, NetError> + Send + Sync>;

/// Cache statistics.
#[derive(Debug, Clone, Default)]
pub struct SheetCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
}

impl SheetCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Loads stylesheet text by URL, caching successes.
///
/// Failures are not cached; a sheet that failed once is retried on the
/// next request so transient host errors heal on re-scan.
pub struct StylesheetLoader {
    method: RwLock<Option<FetchMethod>>,
    cache: RwLock<HashMap<String, String>>,
    stats: RwLock<SheetCacheStats>,
}

impl StylesheetLoader {
    pub fn new() -> Self {
        Self {
            method: RwLock::new(None),
            cache: RwLock::new(HashMap::new()),
            stats: RwLock::new(SheetCacheStats::default()),
        }
    }

    /// Install or replace the host fetch method.
    pub fn set_fetch_method(&self, method: FetchMethod) {
        if let Ok(mut slot) = self.method.write() {
            *slot = Some(method);
            debug!("Fetch method installed");
        }
    }

    /// Load the text of the stylesheet at `url`.
    pub fn load(&self, url: &Url) -> Result<String, NetError> {
        let key = url.to_string();
        if let Some(cached) = self
            .cache
            .read()
            .ok()
            .and_then(|cache| cache.get(&key).cloned())
        {
            if let Ok(mut stats) = self.stats.write() {
                stats.hits += 1;
            }
            trace!(url = %key, "Sheet cache hit");
            return Ok(cached);
        }
        if let Ok(mut stats) = self.stats.write() {
            stats.misses += 1;
        }

        let text = self.fetch(url).inspect_err(|error| {
            warn!(url = %key, %error, "Stylesheet load failed");
        })?;

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key.clone(), text.clone());
            if let Ok(mut stats) = self.stats.write() {
                stats.insertions += 1;
            }
        }
        debug!(url = %key, len = text.len(), "Stylesheet loaded");
        Ok(text)
    }

    fn fetch(&self, url: &Url) -> Result<String, NetError> {
        if url.scheme() == "data" {
            return decode_data_url(url);
        }
        let method = self
            .method
            .read()
            .ok()
            .and_then(|slot| slot.clone())
            .ok_or_else(|| NetError::NoFetchMethod(url.to_string()))?;
        method(url)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> SheetCacheStats {
        self.stats.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// Clear all cached sheets.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StylesheetLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a `data:` URL into its text payload.
///
/// Handles `data:[mediatype][;base64],payload` with percent-encoding in
/// the non-base64 form. The media type is not enforced; linked sheets are
/// CSS by construction.
pub fn decode_data_url(url: &Url) -> Result<String, NetError> {
    let raw = url.as_str();
    let body = raw
        .strip_prefix("data:")
        .ok_or_else(|| NetError::InvalidDataUrl(raw.to_string()))?;
    let (header, payload) = body
        .split_once(',')
        .ok_or_else(|| NetError::InvalidDataUrl(format!("{raw}: missing comma")))?;

    if header.ends_with(";base64") {
        let bytes = BASE64
            .decode(payload)
            .map_err(|e| NetError::InvalidDataUrl(format!("{raw}: {e}")))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    } else {
        Ok(percent_decode(payload))
    }
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&input[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
