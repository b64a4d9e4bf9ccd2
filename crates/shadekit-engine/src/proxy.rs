//! The stylesheet access proxy.
//!
//! While installed, scripts reading a themed container get the original
//! text back; the shadow output exists only in the engine's render-side
//! collection. Installation claims the document with a marker attribute,
//! so a second engine instance attaching to the same document fails to
//! install and degrades instead of fighting over the sheets.

use shadekit_dom::{Document, NodeId};
use thiserror::Error;
use tracing::{debug, warn};

use crate::source::{SourceKind, SourceRegistry};

/// Root attribute marking the document as proxied.
pub(crate) const PROXY_MARKER: &str = "data-shadekit-proxy";

/// Errors that can occur installing the proxy.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Proxy already installed on this document")]
    AlreadyInstalled,
}

#[derive(Debug, Default)]
pub(crate) struct AccessProxy {
    installed: bool,
}

impl AccessProxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Claim the document. Fails when another instance holds it.
    pub fn install(&mut self, document: &mut Document) -> Result<(), ProxyError> {
        let root = document.root();
        if document.attribute(root, PROXY_MARKER).is_some() {
            warn!("Access proxy marker already present");
            return Err(ProxyError::AlreadyInstalled);
        }
        if document.set_attribute(root, PROXY_MARKER, "1").is_err() {
            return Err(ProxyError::AlreadyInstalled);
        }
        self.installed = true;
        debug!("Access proxy installed");
        Ok(())
    }

    /// Release the document.
    pub fn uninstall(&mut self, document: &mut Document) {
        if self.installed {
            let root = document.root();
            let _ = document.remove_attribute(root, PROXY_MARKER);
            self.installed = false;
            debug!("Access proxy uninstalled");
        }
    }

    /// The style text a script observes for `node`.
    ///
    /// Installed: the registered original (linked sheets report their
    /// fetched text). Not installed: whatever the document holds, which in
    /// in-place mode is the rewritten text.
    pub fn visible_text(
        &self,
        document: &Document,
        registry: &SourceRegistry,
        node: NodeId,
    ) -> Option<String> {
        if self.installed {
            if let Some(source) = registry.for_node(node).and_then(|id| registry.get(id)) {
                return Some(source.original.clone());
            }
        }
        match registry.for_node(node).and_then(|id| registry.get(id)) {
            Some(source) if matches!(source.kind, SourceKind::InlineStyle) => {
                document.inline_style(node).map(str::to_string)
            }
            _ => {
                let text = document.element_text(node);
                if text.is_empty() && document.inline_style(node).is_some() {
                    document.inline_style(node).map(str::to_string)
                } else {
                    Some(text)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_claims_document() {
        let mut doc = Document::new();
        let mut proxy = AccessProxy::new();
        proxy.install(&mut doc).unwrap();
        assert!(proxy.is_installed());

        let mut second = AccessProxy::new();
        assert!(matches!(
            second.install(&mut doc),
            Err(ProxyError::AlreadyInstalled)
        ));
    }

    #[test]
    fn test_uninstall_releases_document() {
        let mut doc = Document::new();
        let mut proxy = AccessProxy::new();
        proxy.install(&mut doc).unwrap();
        proxy.uninstall(&mut doc);
        assert!(!proxy.is_installed());

        let mut second = AccessProxy::new();
        assert!(second.install(&mut doc).is_ok());
    }

    #[test]
    fn test_visible_text_returns_original_when_installed() {
        let mut doc = Document::new();
        let style = doc.create_element("style");
        doc.append_child(doc.root(), style).unwrap();
        doc.set_element_text(style, "body { color: red; }").unwrap();

        let mut registry = SourceRegistry::new();
        let id = registry.register(style, SourceKind::StyleBlock);
        registry.get_mut(id).unwrap().original = "body { color: red; }".to_string();
        registry.get_mut(id).unwrap().shadow = Some("body { color: #aaa; }".to_string());

        let mut proxy = AccessProxy::new();
        proxy.install(&mut doc).unwrap();
        assert_eq!(
            proxy.visible_text(&doc, &registry, style).unwrap(),
            "body { color: red; }"
        );
    }

    #[test]
    fn test_visible_text_reads_document_when_not_installed() {
        let mut doc = Document::new();
        let style = doc.create_element("style");
        doc.append_child(doc.root(), style).unwrap();
        doc.set_element_text(style, "body { color: #aaa; }").unwrap();

        let registry = SourceRegistry::new();
        let proxy = AccessProxy::new();
        assert_eq!(
            proxy.visible_text(&doc, &registry, style).unwrap(),
            "body { color: #aaa; }"
        );
    }
}
