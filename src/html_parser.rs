use select::document::Document;
use select::node::Node;
use select::predicate::{Name, Predicate};
use url::Url;

use crate::file_manager;
use crate::url_resolver;

/// Where a piece of CSS came from.
#[derive(Debug, Clone, PartialEq)]
pub enum CssSource {
    Linked { href: Url },
    Inline { text: String },
}

/// A fetched page and the CSS sources found in its head.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub title: Option<String>,
    pub sources: Vec<CssSource>,
    pub html: String,
}

impl Page {
    pub fn has_css(&self) -> bool {
        !self.sources.is_empty()
    }

    pub fn linked_sources(&self) -> Vec<&Url> {
        self.sources
            .iter()
            .filter_map(|source| match source {
                CssSource::Linked { href } => Some(href),
                CssSource::Inline { .. } => None,
            })
            .collect()
    }

    pub fn inline_sources(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter_map(|source| match source {
                CssSource::Inline { text } => Some(text.as_str()),
                CssSource::Linked { .. } => None,
            })
            .collect()
    }

    /// Name of the output folder for this page.
    pub fn folder_name(&self) -> String {
        file_manager::folder_name(self.title.as_deref())
    }
}

/// A `<link>` carries CSS when its `rel` lists `stylesheet` or its `type`
/// mentions `text/css`. Shared with the document assembler so that discovery
/// and removal agree on what counts as a stylesheet link.
pub fn is_stylesheet_link(tag: &str, rel: Option<&str>, content_type: Option<&str>) -> bool {
    if !tag.eq_ignore_ascii_case("link") {
        return false;
    }
    let rel_matches = rel
        .map(|rel| {
            rel.split_ascii_whitespace()
                .any(|token| token.eq_ignore_ascii_case("stylesheet"))
        })
        .unwrap_or(false);
    let type_matches = content_type
        .map(|content_type| content_type.contains("text/css"))
        .unwrap_or(false);

    rel_matches || type_matches
}

fn stylesheet_link(node: &Node) -> bool {
    node.name()
        .map(|name| is_stylesheet_link(name, node.attr("rel"), node.attr("type")))
        .unwrap_or(false)
}

fn css_element(node: &Node) -> bool {
    stylesheet_link(node) || node.name() == Some("style")
}

#[derive(Clone)]
pub struct HtmlParser {
    base_url: Url,
}

impl HtmlParser {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    /// Collects the title and CSS sources of `html`'s head, in document order.
    pub fn parse_page(&self, html: String) -> Page {
        let document = Document::from(html.as_str());

        let title = document
            .find(Name("head").descendant(Name("title")))
            .next()
            .map(|title| title.text().trim().to_string());

        let mut sources = Vec::new();
        for node in document.find(Name("head").descendant(css_element)) {
            if node.name() == Some("style") {
                sources.push(CssSource::Inline { text: node.text() });
                continue;
            }

            let Some(href) = node.attr("href") else {
                tracing::debug!("skipping stylesheet link without href");
                continue;
            };
            match url_resolver::resolve_relative(&self.base_url, href) {
                Ok(href) => sources.push(CssSource::Linked { href }),
                Err(e) => tracing::warn!(href, error = %e, "skipping unresolvable stylesheet link"),
            }
        }

        Page {
            url: self.base_url.clone(),
            title,
            sources,
            html,
        }
    }
}
