//! Frame discovery.
//!
//! Frames are files in one directory whose names match the configured
//! naming pattern. The catalog only holds frames that still need publishing,
//! sorted by number.
use crate::frame::Frame;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Marks the frame number inside `bot.frames_naming`.
pub const NUMBER_PLACEHOLDER: &str = "$N$";

#[derive(Debug, Clone)]
pub struct FrameNaming {
    pattern: String,
    ext: String,
    regex: Regex,
}

impl FrameNaming {
    /// Compile a naming pattern such as `frame_$N$` for files ending in `.ext`.
    /// Text around the placeholder is matched literally.
    pub fn new(pattern: &str, ext: &str) -> Result<Self> {
        let (prefix, suffix) = pattern.split_once(NUMBER_PLACEHOLDER).ok_or_else(|| {
            anyhow!("naming pattern {pattern:?} must contain {NUMBER_PLACEHOLDER}")
        })?;
        if suffix.contains(NUMBER_PLACEHOLDER) {
            return Err(anyhow!(
                "naming pattern {pattern:?} must contain {NUMBER_PLACEHOLDER} exactly once"
            ));
        }
        let expr = format!(
            r"^{}(\d+){}\.{}$",
            regex::escape(prefix),
            regex::escape(suffix),
            regex::escape(ext)
        );
        let regex = Regex::new(&expr).with_context(|| format!("compile {expr}"))?;
        Ok(Self {
            pattern: pattern.to_string(),
            ext: ext.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Frame number encoded in `file_name`, if it follows the pattern.
    pub fn number_of(&self, file_name: &str) -> Option<u64> {
        let caps = self.regex.captures(file_name)?;
        caps.get(1)?.as_str().parse().ok()
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.ext)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameCatalog {
    /// Frames left to publish, ascending by number.
    pub frames: Vec<Frame>,
    /// Highest frame number in the directory; shown as "of N" in captions.
    pub total: u64,
}

impl FrameCatalog {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// List frames in `dir`, skipping numbers at or below `after`.
///
/// Files with the right extension that do not follow the pattern are logged
/// and ignored. Two files with the same number are an error.
pub fn scan_frames(dir: &Path, naming: &FrameNaming, after: Option<u64>) -> Result<FrameCatalog> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("read frames directory {}", dir.display()))?;
    let mut found: BTreeMap<u64, PathBuf> = BTreeMap::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() || !naming.has_extension(&path) {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            tracing::warn!(path = %path.display(), "skipping frame with non UTF-8 name");
            continue;
        };
        let Some(number) = naming.number_of(file_name) else {
            tracing::warn!(
                file = file_name,
                pattern = naming.pattern(),
                "file does not match the frame naming pattern"
            );
            continue;
        };
        if let Some(existing) = found.insert(number, path.clone()) {
            return Err(anyhow!(
                "frames {} and {} both have number {number}",
                existing.display(),
                path.display()
            ));
        }
    }

    let total = found.keys().next_back().copied().unwrap_or(0);
    let frames = found
        .into_iter()
        .filter(|(number, _)| match after {
            Some(last) => *number > last,
            None => true,
        })
        .map(|(number, path)| Frame::new(number, path))
        .collect();
    Ok(FrameCatalog { frames, total })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"img").expect("write frame");
    }

    #[test]
    fn naming_matches_only_the_pattern() {
        let naming = FrameNaming::new("frame_$N$", "jpg").expect("naming");
        assert_eq!(naming.number_of("frame_12.jpg"), Some(12));
        assert_eq!(naming.number_of("frame_007.jpg"), Some(7));
        assert_eq!(naming.number_of("frame_.jpg"), None);
        assert_eq!(naming.number_of("frame_12.png"), None);
        assert_eq!(naming.number_of("xframe_12.jpg"), None);
        assert_eq!(naming.number_of("frame_12a.jpg"), None);
    }

    #[test]
    fn naming_treats_surrounding_text_literally() {
        let naming = FrameNaming::new("ep (1) $N$", "jpg").expect("naming");
        assert_eq!(naming.number_of("ep (1) 4.jpg"), Some(4));
        assert_eq!(naming.number_of("ep 1 4.jpg"), None);
    }

    #[test]
    fn naming_requires_a_single_placeholder() {
        let err = FrameNaming::new("frame", "jpg").expect_err("no placeholder");
        assert!(err.to_string().contains("$N$"));
        assert!(FrameNaming::new("$N$_$N$", "jpg").is_err());
    }

    #[test]
    fn scan_sorts_numerically_and_skips_published() {
        let dir = tempfile::tempdir().expect("create temp dir");
        for name in ["10.jpg", "2.jpg", "1.jpg", "notes.txt", "cover.jpg"] {
            touch(dir.path(), name);
        }
        fs::create_dir(dir.path().join("3.jpg")).expect("dir named like a frame");
        let naming = FrameNaming::new("$N$", "jpg").expect("naming");

        let catalog = scan_frames(dir.path(), &naming, None).expect("scan");
        let numbers: Vec<u64> = catalog.frames.iter().map(|f| f.number).collect();
        assert_eq!(numbers, vec![1, 2, 10]);
        assert_eq!(catalog.total, 10);
        assert!(catalog.frames.iter().all(|f| !f.is_posted()));

        let catalog = scan_frames(dir.path(), &naming, Some(2)).expect("scan");
        let numbers: Vec<u64> = catalog.frames.iter().map(|f| f.number).collect();
        assert_eq!(numbers, vec![10]);
        assert_eq!(catalog.total, 10);

        let catalog = scan_frames(dir.path(), &naming, Some(10)).expect("scan");
        assert!(catalog.is_empty());
    }

    #[test]
    fn scan_rejects_duplicate_numbers() {
        let dir = tempfile::tempdir().expect("create temp dir");
        touch(dir.path(), "1.jpg");
        touch(dir.path(), "01.jpg");
        let naming = FrameNaming::new("$N$", "jpg").expect("naming");
        let err = scan_frames(dir.path(), &naming, None).expect_err("duplicate");
        assert!(err.to_string().contains("number 1"));
    }

    #[test]
    fn scan_fails_on_missing_directory() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let naming = FrameNaming::new("$N$", "jpg").expect("naming");
        assert!(scan_frames(&dir.path().join("absent"), &naming, None).is_err());
    }
}
