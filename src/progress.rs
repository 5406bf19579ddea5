//! The durable "last published frame" marker.
//!
//! The file holds one decimal integer. A negative value means nothing has
//! been published yet; a missing file means the same.
use crate::persist::{remove_if_exists, write_atomic_text};
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

#[derive(Debug)]
pub struct ProgressState {
    path: PathBuf,
    last: Option<u64>,
}

impl ProgressState {
    pub fn load(path: PathBuf) -> Result<Self> {
        let last = match fs::read_to_string(&path) {
            Ok(text) => parse_progress(&text)
                .with_context(|| format!("parse progress file {}", path.display()))?,
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                return Err(err).with_context(|| format!("read progress file {}", path.display()))
            }
        };
        Ok(Self { path, last })
    }

    /// Number of the last frame known to be published.
    pub fn last(&self) -> Option<u64> {
        self.last
    }

    /// Persist `number` as the last published frame.
    pub fn record(&mut self, number: u64) -> Result<()> {
        if let Some(last) = self.last {
            if number < last {
                return Err(anyhow!(
                    "progress cannot move backwards (last {last}, got {number})"
                ));
            }
        }
        write_atomic_text(&self.path, &number.to_string())?;
        self.last = Some(number);
        Ok(())
    }

    /// Forget progress once every frame is out.
    pub fn clear(&mut self) -> Result<()> {
        remove_if_exists(&self.path)?;
        self.last = None;
        Ok(())
    }
}

fn parse_progress(text: &str) -> Result<Option<u64>> {
    let trimmed = text.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| anyhow!("expected an integer, found {trimmed:?}"))?;
    Ok(u64::try_from(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_negative_means_nothing_published() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("last_frame_uploaded");
        assert_eq!(ProgressState::load(path.clone()).expect("load").last(), None);

        fs::write(&path, "-1").expect("write");
        assert_eq!(ProgressState::load(path.clone()).expect("load").last(), None);

        fs::write(&path, "42\n").expect("write");
        assert_eq!(ProgressState::load(path).expect("load").last(), Some(42));
    }

    #[test]
    fn garbage_is_an_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("last_frame_uploaded");
        fs::write(&path, "frame 3").expect("write");
        assert!(ProgressState::load(path).is_err());
    }

    #[test]
    fn record_is_durable_and_monotonic() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("last_frame_uploaded");
        let mut progress = ProgressState::load(path.clone()).expect("load");
        progress.record(3).expect("record 3");
        progress.record(5).expect("record 5");
        assert_eq!(fs::read_to_string(&path).expect("read"), "5");
        assert!(progress.record(4).is_err());
        assert_eq!(progress.last(), Some(5));
        assert_eq!(ProgressState::load(path).expect("reload").last(), Some(5));
    }

    #[test]
    fn clear_removes_the_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("last_frame_uploaded");
        let mut progress = ProgressState::load(path.clone()).expect("load");
        progress.record(1).expect("record");
        progress.clear().expect("clear");
        assert!(!path.exists());
        assert_eq!(progress.last(), None);
        progress.clear().expect("clearing twice is fine");
    }
}
