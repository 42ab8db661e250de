use anyhow::{Context, Result};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::aggregator::{self, AggregatedCss, CssOrigin};
use crate::assembler;
use crate::css_parser;
use crate::fetcher::Fetch;
use crate::file_manager::FileManager;
use crate::html_parser::{HtmlParser, Page};
use crate::resources;

/// Pause before fetching a page.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

/// A CSS file written by a run.
#[derive(Debug, Clone, PartialEq)]
pub struct CssFileSummary {
    pub path: PathBuf,
    pub source_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub root: PathBuf,
    pub css_files: Vec<CssFileSummary>,
    pub resources: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The head had neither stylesheet links nor style blocks. Nothing was written.
    NoCss,
    Localized(Summary),
}

pub struct StyleMirror<F> {
    fetcher: F,
    output_dir: PathBuf,
    delay: Duration,
}

impl<F: Fetch> StyleMirror<F> {
    pub fn new(fetcher: F, output_dir: &Path, delay: Duration) -> Self {
        Self {
            fetcher,
            output_dir: output_dir.to_path_buf(),
            delay,
        }
    }

    /// Fetches `url` and discovers its title and CSS sources.
    pub async fn load_page(&self, url: &str) -> Result<Page> {
        let page_url = Url::parse(url.trim())
            .with_context(|| format!("Failed to parse page URL: {}", url))?;

        tokio::time::sleep(self.delay).await;
        let content = self.fetcher.fetch(&page_url).await?;
        let html = String::from_utf8_lossy(&content).into_owned();

        Ok(HtmlParser::new(page_url).parse_page(html))
    }

    pub async fn run(&self, url: &str) -> Result<Outcome> {
        let page = self.load_page(url).await?;
        self.localize(&page).await
    }

    /// Writes the localized copy of `page` into `<output_dir>/<folder name>`.
    pub async fn localize(&self, page: &Page) -> Result<Outcome> {
        if !page.has_css() {
            println!("{}", "No CSS found.".yellow());
            return Ok(Outcome::NoCss);
        }

        if let Some(title) = &page.title {
            println!("Page title: {}", title.blue());
        }

        let file_manager = FileManager::new(&self.output_dir.join(page.folder_name()))?;
        tracing::info!(root = ?file_manager.root(), url = %page.url, "localizing page styles");

        let mut produced = Vec::new();
        let mut summary = Summary {
            root: file_manager.root().to_path_buf(),
            css_files: Vec::new(),
            resources: 0,
        };

        let linked = page.linked_sources();
        if !linked.is_empty() {
            let css = aggregator::aggregate_linked(&self.fetcher, &linked).await?;
            self.finish_css_file(&file_manager, &css, &mut summary).await?;
            produced.push(CssOrigin::Linked);
        }

        let inline = page.inline_sources();
        if !inline.is_empty() {
            let css = aggregator::aggregate_inline(&page.url, &inline);
            self.finish_css_file(&file_manager, &css, &mut summary).await?;
            produced.push(CssOrigin::Inline);
        }

        let index = assembler::write_index(&file_manager, &page.html, &produced)?;
        tracing::debug!(path = ?index, "wrote index");

        println!("📁 Output directory: {:?}", file_manager.root());
        Ok(Outcome::Localized(summary))
    }

    /// Writes one CSS file, downloads what it references, then points its
    /// references at the downloaded copies.
    async fn finish_css_file(
        &self,
        file_manager: &FileManager,
        css: &AggregatedCss,
        summary: &mut Summary,
    ) -> Result<()> {
        let path = file_manager.save_css_file(css.file_name(), css.text().as_bytes())?;

        let mut downloaded = 0;
        for section in &css.sections {
            let references: Vec<_> = css_parser::extract_references(&section.text).collect();
            downloaded +=
                resources::materialize(&self.fetcher, file_manager, &section.base, &references)
                    .await?;
        }
        if downloaded > 0 {
            println!("Created \"resources\" folder from {} links", downloaded);
        }

        css_parser::rewrite_file(&path)?;

        summary.resources += downloaded;
        summary.css_files.push(CssFileSummary {
            path,
            source_count: css.source_count(),
        });
        Ok(())
    }
}
