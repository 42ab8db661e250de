use anyhow::Result;
use colored::*;
use url::Url;

use crate::css_parser;
use crate::fetcher::{Fetch, FetchError};

/// Which kind of source an aggregated file was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CssOrigin {
    Linked,
    Inline,
}

impl CssOrigin {
    pub fn file_name(self) -> &'static str {
        match self {
            CssOrigin::Linked => "links.css",
            CssOrigin::Inline => "styles.css",
        }
    }

    pub fn tag_name(self) -> &'static str {
        match self {
            CssOrigin::Linked => "link",
            CssOrigin::Inline => "style",
        }
    }
}

/// Beautified CSS of one source, with the URL its references resolve against.
#[derive(Debug, Clone)]
pub struct CssSection {
    pub base: Url,
    pub text: String,
}

/// The content of one produced CSS file.
#[derive(Debug)]
pub struct AggregatedCss {
    pub origin: CssOrigin,
    pub sections: Vec<CssSection>,
    /// Set when a stylesheet answered with an HTTP error and aggregation
    /// stopped early.
    pub failure: Option<FetchError>,
}

impl AggregatedCss {
    fn new(origin: CssOrigin) -> Self {
        Self {
            origin,
            sections: Vec::new(),
            failure: None,
        }
    }

    pub fn file_name(&self) -> &'static str {
        self.origin.file_name()
    }

    pub fn source_count(&self) -> usize {
        self.sections.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    pub fn text(&self) -> String {
        self.sections
            .iter()
            .map(|section| section.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn report(&self) {
        match &self.failure {
            Some(FetchError::Status { code, reason, .. }) => {
                println!(
                    "{}",
                    format!("Something went wrong. Reason: {} {}", code, reason).red()
                );
            }
            Some(other) => println!("{}", format!("Something went wrong. Reason: {}", other).red()),
            None => println!(
                "Created {} from {} <{}> tag(s)",
                self.file_name().green(),
                self.source_count(),
                self.origin.tag_name()
            ),
        }
    }
}

/// Fetches and beautifies every linked stylesheet.
///
/// A stylesheet answering with an HTTP error status ends aggregation: the
/// error is reported and what was gathered so far is returned. Any other
/// fetch error propagates.
pub async fn aggregate_linked<F: Fetch>(fetcher: &F, hrefs: &[&Url]) -> Result<AggregatedCss> {
    let mut css = AggregatedCss::new(CssOrigin::Linked);

    for href in hrefs {
        match fetcher.fetch(href).await {
            Ok(content) => css.sections.push(CssSection {
                base: (*href).clone(),
                text: css_parser::beautify(&String::from_utf8_lossy(&content)),
            }),
            Err(e) if e.is_status() => {
                tracing::warn!(url = %href, error = %e, "stylesheet fetch failed");
                css.failure = Some(e);
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    css.report();
    Ok(css)
}

/// Beautifies every inline style block. References resolve against the page.
pub fn aggregate_inline(page_url: &Url, texts: &[&str]) -> AggregatedCss {
    let mut css = AggregatedCss::new(CssOrigin::Inline);
    css.sections = texts
        .iter()
        .map(|text| CssSection {
            base: page_url.clone(),
            text: css_parser::beautify(text),
        })
        .collect();

    css.report();
    css
}
