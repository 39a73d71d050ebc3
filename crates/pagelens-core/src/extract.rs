//! Single-pass signal extraction over a parsed HTML tree.
//!
//! The document is walked once, depth-first and pre-order, using the tree's
//! own descendant iterator rather than recursion so deeply nested markup
//! cannot exhaust the stack. Every element is inspected for the title,
//! heading counts, hyperlinks and login forms in that same pass.

use scraper::node::Node;
use scraper::{ElementRef, Html};
use url::Url;

use crate::links::{LinkKind, classify_link, resolve_link};
use crate::models::HeadingCounts;

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Everything the crawler learns from one page's markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSignals {
    pub title: String,
    pub headings: HeadingCounts,
    pub internal_links: u32,
    pub external_links: u32,
    /// Resolved link targets in document order, duplicates included.
    pub links: Vec<String>,
    pub has_login_form: bool,
}

/// Parse a document with html5ever's error-tolerant rules.
///
/// Malformed markup never fails; it still produces a tree.
pub fn parse_document(body: &str) -> Html {
    Html::parse_document(body)
}

/// Collect page signals from a parsed document.
pub fn extract_signals(document: &Html, base: &Url) -> PageSignals {
    let mut visitor = SignalVisitor {
        base,
        signals: PageSignals::default(),
        title_seen: false,
    };
    for node in document.root_element().descendants() {
        if let Some(element) = ElementRef::wrap(node) {
            visitor.inspect(element);
        }
    }
    visitor.signals
}

struct SignalVisitor<'a> {
    base: &'a Url,
    signals: PageSignals,
    title_seen: bool,
}

impl SignalVisitor<'_> {
    fn inspect(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        match name {
            "title" => self.record_title(element),
            "a" => self.record_link(element),
            "form" => {
                if contains_password_input(element) {
                    self.signals.has_login_form = true;
                }
            }
            _ if HEADING_TAGS.contains(&name) => {
                *self.signals.headings.entry(name.to_string()).or_insert(0) += 1;
            }
            _ => {}
        }
    }

    fn record_title(&mut self, element: ElementRef<'_>) {
        if self.title_seen {
            return;
        }
        self.title_seen = true;

        if let Some(Node::Text(text)) = element.first_child().map(|child| child.value()) {
            let content: &str = text;
            self.signals.title = content.to_string();
        }
    }

    fn record_link(&mut self, element: ElementRef<'_>) {
        let Some(href) = element.value().attr("href") else {
            return;
        };
        let Some(resolved) = resolve_link(self.base, href) else {
            tracing::debug!(%href, "Skipping unresolvable link");
            return;
        };

        match classify_link(&resolved, self.base) {
            LinkKind::Internal => self.signals.internal_links += 1,
            LinkKind::External => self.signals.external_links += 1,
        }
        self.signals.links.push(resolved.into());
    }
}

/// True if any element below `form` is `<input type="password">`.
fn contains_password_input(form: ElementRef<'_>) -> bool {
    form.descendants()
        .filter_map(ElementRef::wrap)
        .any(|el| el.value().name() == "input" && el.value().attr("type") == Some("password"))
}
