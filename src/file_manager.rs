use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Folder name used when the page has no usable title.
pub const FALLBACK_FOLDER: &str = "website";

pub const CSS_DIR: &str = "css";
pub const INDEX_FILE: &str = "index.html";

/// Writes the output tree of one run. Every path is resolved against `root`;
/// nothing depends on the process working directory.
#[derive(Clone, Debug)]
pub struct FileManager {
    root: PathBuf,
}

impl FileManager {
    /// Creates `root` and its `css/` folder.
    pub fn new(root: &Path) -> Result<Self> {
        let root = root.to_path_buf();
        let css_dir = root.join(CSS_DIR);
        fs::create_dir_all(&css_dir)
            .with_context(|| format!("Failed to create output directory: {:?}", css_dir))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn css_dir(&self) -> PathBuf {
        self.root.join(CSS_DIR)
    }

    /// Writes `content` to `relative_path` under the root, creating parent
    /// folders on demand.
    pub fn save_file(&self, relative_path: &Path, content: &[u8]) -> Result<PathBuf> {
        write_file(self.root.join(relative_path), content)
    }

    /// Writes a file that lives in the `css/` folder, e.g. `links.css` or
    /// `resources/png/bg.png`.
    pub fn save_css_file(&self, relative_path: &str, content: &[u8]) -> Result<PathBuf> {
        write_file(self.css_dir().join(relative_path), content)
    }
}

fn write_file(file_path: PathBuf, content: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    fs::write(&file_path, content)
        .with_context(|| format!("Failed to write to file: {:?}", file_path))?;

    Ok(file_path)
}

/// Turns a page title into a filesystem-friendly folder name.
pub fn folder_name(title: Option<&str>) -> String {
    let slug = title.map(slugify).unwrap_or_default();
    if slug.is_empty() {
        FALLBACK_FOLDER.to_string()
    } else {
        slug
    }
}

/// ASCII-transliterates `text`, lower-cases it and joins its alphanumeric
/// runs with `-`.
pub fn slugify(text: &str) -> String {
    deunicode::deunicode(text)
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
