pub mod aggregator;
pub mod assembler;
pub mod cli;
pub mod css_parser;
pub mod fetcher;
pub mod file_manager;
pub mod html_parser;
pub mod logging;
pub mod mirror;
pub mod resources;
pub mod url_resolver;

// Re-export main types for convenience
pub use aggregator::{AggregatedCss, CssOrigin};
pub use css_parser::{extract_references, rewrite_references, ResourceReference};
pub use fetcher::{Fetch, FetchError, HttpFetcher};
pub use file_manager::FileManager;
pub use html_parser::{CssSource, HtmlParser, Page};
pub use mirror::{CssFileSummary, Outcome, StyleMirror, Summary};
