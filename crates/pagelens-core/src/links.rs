//! Link resolution and internal/external classification.

use url::Url;

/// Whether a link stays on the crawled page's host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Internal,
    External,
}

/// Resolve an `href` attribute against the page URL.
///
/// Returns `None` when the reference cannot be resolved; callers skip such
/// links silently.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    base.join(href).ok()
}

/// Classify a resolved link relative to the page it was found on.
///
/// Hosts are compared as exact strings including any explicit port, so
/// `example.com:8080` and `example.com` are different hosts. A link without
/// a host (e.g. `mailto:`) counts as internal.
pub fn classify_link(link: &Url, base: &Url) -> LinkKind {
    match link.host_str() {
        None | Some("") => LinkKind::Internal,
        Some(host) if host == base.host_str().unwrap_or("") && link.port() == base.port() => {
            LinkKind::Internal
        }
        Some(_) => LinkKind::External,
    }
}
