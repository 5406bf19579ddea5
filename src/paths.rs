//! Typed paths into a bot working directory.
//!
//! Every file the bot writes hangs off one explicit root; nothing reads the
//! process working directory.
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";
pub const PROGRESS_FILE: &str = "last_frame_uploaded";
pub const BEST_OF_QUEUE_FILE: &str = "bofc.json";

#[derive(Debug, Clone)]
pub struct WorkingPaths {
    root: PathBuf,
}

impl WorkingPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the `config.json` path.
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Return the progress file path.
    pub fn progress_path(&self) -> PathBuf {
        self.root.join(PROGRESS_FILE)
    }

    /// Return the `plugins/` directory path.
    pub fn plugins_dir(&self) -> PathBuf {
        self.root.join("plugins")
    }

    /// Return the best-of working directory for a title.
    pub fn best_of_dir(&self, title: &str) -> PathBuf {
        self.plugins_dir()
            .join("best-of")
            .join(slugify(&format!("Best of {title}")))
    }

    /// Absolute paths pass through; relative ones hang off the root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Files owned by the best-of reposter for one title.
#[derive(Debug, Clone)]
pub struct BestOfPaths {
    root: PathBuf,
}

impl BestOfPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the persisted review queue path.
    pub fn queue_path(&self) -> PathBuf {
        self.root.join(BEST_OF_QUEUE_FILE)
    }

    /// Return the holding directory for queued frame copies.
    pub fn holding_dir(&self) -> PathBuf {
        self.root.join("frames_to_check")
    }

    /// Return the local archive of promoted frames.
    pub fn album_dir(&self) -> PathBuf {
        self.root.join("album")
    }
}

/// Working directory from the CLI, or `<data dir>/framebot`.
pub fn resolve_working_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let data_dir = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow!("cannot determine a data directory; pass --directory"))?;
    Ok(data_dir.join("framebot"))
}

/// Lowercase ASCII slug with single dashes between words.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
