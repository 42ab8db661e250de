use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use url::Url;

use crate::css_parser::ResourceReference;
use crate::fetcher::{Fetch, FetchError};
use crate::file_manager::FileManager;
use crate::url_resolver;

/// Downloads every reference into `css/resources/<ext>/<basename>`.
///
/// References without a scheme are resolved against `base`. The first failed
/// download aborts the whole batch; files already written stay on disk.
/// Returns the number of references processed.
pub async fn materialize<F: Fetch>(
    fetcher: &F,
    file_manager: &FileManager,
    base: &Url,
    references: &[ResourceReference],
) -> Result<usize> {
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .context("Invalid progress template")?,
    );

    for reference in references {
        let url = url_resolver::resolve_relative(base, &reference.reference).map_err(|source| {
            FetchError::InvalidUrl {
                url: reference.reference.clone(),
                source,
            }
        })?;

        progress_bar.set_message(format!("Downloading: {}", url));
        let content = fetcher.fetch(&url).await?;

        let saved_path = file_manager.save_css_file(&reference.local_path(), &content)?;
        tracing::debug!(%url, path = ?saved_path, "saved resource");
    }

    progress_bar.finish_and_clear();
    Ok(references.len())
}
