//! One-time import of a legacy working directory.
//!
//! Legacy bots kept `bofc.json` as `{"list": [...]}` with naive local
//! timestamps, held frames under `frames/`, and the best-of archive under
//! `albums/Bestof_<title>/`. The import writes the current layout next to
//! `config.json`; nothing at runtime reads the legacy shape.
use crate::best_of::ReviewQueue;
use crate::bot::frame_caption;
use crate::catalog::{scan_frames, FrameNaming};
use crate::config::BotConfig;
use crate::frame::Frame;
use crate::paths::{BestOfPaths, WorkingPaths, BEST_OF_QUEUE_FILE, PROGRESS_FILE};
use crate::social::photo_url;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const BACKUP_DIR: &str = "migration_backup";

#[derive(Debug, Deserialize)]
struct LegacyQueue {
    list: Vec<LegacyRecord>,
}

#[derive(Debug, Deserialize)]
struct LegacyRecord {
    time: String,
    post_id: String,
    path: String,
    frame_number: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct MigrationReport {
    pub queued: usize,
    /// Records whose held frame was missing; they are still queued.
    pub missing_frames: usize,
    pub album_files: usize,
    pub frames_copied: usize,
    pub progress_copied: bool,
    pub backup: Option<PathBuf>,
}

pub fn migrate_legacy(
    legacy_root: &Path,
    paths: &WorkingPaths,
    config: &BotConfig,
) -> Result<MigrationReport> {
    let legacy_queue_path = legacy_root.join(BEST_OF_QUEUE_FILE);
    let bytes = fs::read(&legacy_queue_path)
        .with_context(|| format!("read legacy queue {}", legacy_queue_path.display()))?;
    let legacy: LegacyQueue = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse legacy queue {}", legacy_queue_path.display()))?;

    let best_of = BestOfPaths::new(paths.best_of_dir(&config.bot.title));
    if best_of.queue_path().exists() {
        return Err(anyhow!(
            "{} already exists; refusing to overwrite a migrated queue",
            best_of.queue_path().display()
        ));
    }

    let mut report = MigrationReport::default();
    if same_dir(legacy_root, paths.root())? {
        report.backup = Some(backup_legacy(legacy_root)?);
    } else {
        copy_working_files(legacy_root, paths, config, &mut report)?;
    }

    let legacy_frames = legacy_root.join("frames");
    let total = legacy_total(&legacy_frames, config, &legacy.list)?;
    fs::create_dir_all(best_of.holding_dir())
        .with_context(|| format!("create {}", best_of.holding_dir().display()))?;

    let mut records = Vec::with_capacity(legacy.list.len());
    for entry in &legacy.list {
        let file_name = Path::new(&entry.path).file_name().ok_or_else(|| {
            anyhow!(
                "legacy record for frame {} has no file name",
                entry.frame_number
            )
        })?;
        let source = legacy_frames.join(file_name);
        let held = best_of.holding_dir().join(file_name);
        if source.is_file() {
            fs::copy(&source, &held)
                .with_context(|| format!("copy {} to {}", source.display(), held.display()))?;
        } else {
            tracing::warn!(
                frame = entry.frame_number,
                file = %source.display(),
                "legacy frame missing; it will be retired without a best-of check"
            );
            report.missing_frames += 1;
        }
        let mut frame = Frame::new(entry.frame_number, held);
        // Legacy queues stored the photo id; the reaction lookup resolves the
        // page story from it.
        frame.photo_id = Some(entry.post_id.clone());
        frame.post_id = Some(entry.post_id.clone());
        frame.url = Some(photo_url(&entry.post_id));
        frame.text = Some(frame_caption(&config.bot.title, entry.frame_number, total));
        frame.post_time = Some(
            parse_legacy_time(&entry.time)
                .with_context(|| format!("frame {} time", entry.frame_number))?,
        );
        records.push(frame);
    }
    let queue = ReviewQueue::with_records(best_of.queue_path(), records)?;
    queue.persist()?;
    report.queued = queue.len();

    let legacy_album = legacy_root.join("albums").join(legacy_album_name(&config.bot.title));
    if legacy_album.is_dir() {
        report.album_files = copy_tree(&legacy_album, &best_of.album_dir())?;
    } else {
        fs::create_dir_all(best_of.album_dir())
            .with_context(|| format!("create {}", best_of.album_dir().display()))?;
        tracing::warn!(album = %legacy_album.display(), "no legacy best-of album found");
    }

    tracing::info!(
        queued = report.queued,
        missing = report.missing_frames,
        album_files = report.album_files,
        "legacy best-of queue migrated"
    );
    Ok(report)
}

fn same_dir(a: &Path, b: &Path) -> Result<bool> {
    let a = a
        .canonicalize()
        .with_context(|| format!("resolve {}", a.display()))?;
    let b = b
        .canonicalize()
        .with_context(|| format!("resolve {}", b.display()))?;
    Ok(a == b)
}

fn backup_legacy(root: &Path) -> Result<PathBuf> {
    let backup = root.join(BACKUP_DIR);
    if backup.exists() {
        return Err(anyhow!(
            "{} already exists; was this directory migrated before?",
            backup.display()
        ));
    }
    fs::create_dir_all(&backup).with_context(|| format!("create {}", backup.display()))?;
    fs::copy(root.join(BEST_OF_QUEUE_FILE), backup.join(BEST_OF_QUEUE_FILE))
        .with_context(|| format!("back up {}", root.join(BEST_OF_QUEUE_FILE).display()))?;
    let albums = root.join("albums");
    if albums.is_dir() {
        copy_tree(&albums, &backup.join("albums"))?;
    }
    tracing::info!(backup = %backup.display(), "backed up legacy files");
    Ok(backup)
}

fn copy_working_files(
    legacy_root: &Path,
    paths: &WorkingPaths,
    config: &BotConfig,
    report: &mut MigrationReport,
) -> Result<()> {
    let legacy_frames = legacy_root.join("frames");
    let frames_dir = config.bot.frames_dir(paths);
    if legacy_frames.is_dir() && !frames_dir.exists() {
        report.frames_copied = copy_tree(&legacy_frames, &frames_dir)?;
    }
    let legacy_progress = legacy_root.join(PROGRESS_FILE);
    if legacy_progress.is_file() && !paths.progress_path().exists() {
        fs::copy(&legacy_progress, paths.progress_path())
            .with_context(|| format!("copy {}", legacy_progress.display()))?;
        report.progress_copied = true;
    }
    Ok(())
}

/// "of N" for captions, from the legacy frames directory when it still exists.
fn legacy_total(frames_dir: &Path, config: &BotConfig, records: &[LegacyRecord]) -> Result<u64> {
    let from_records = records.iter().map(|r| r.frame_number).max().unwrap_or(0);
    if !frames_dir.is_dir() {
        return Ok(from_records);
    }
    let naming = FrameNaming::new(&config.bot.frames_naming, &config.bot.frames_ext)?;
    let catalog = scan_frames(frames_dir, &naming, None)?;
    Ok(catalog.total.max(from_records))
}

/// Legacy times are naive local timestamps, with either a space or `T`.
fn parse_legacy_time(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let naive = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| anyhow!("unrecognised timestamp {raw:?}"))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("timestamp {raw:?} does not exist in the local timezone"))
}

fn legacy_album_name(title: &str) -> String {
    format!("Bestof_{}", title.replace(std::path::MAIN_SEPARATOR, "-").replace(' ', "_"))
        .chars()
        .filter(|ch| ch.is_alphanumeric() || "._- ".contains(*ch))
        .collect()
}

/// Recursive copy; returns the number of files copied.
fn copy_tree(from: &Path, to: &Path) -> Result<usize> {
    fs::create_dir_all(to).with_context(|| format!("create {}", to.display()))?;
    let mut copied = 0;
    for entry in fs::read_dir(from).with_context(|| format!("read {}", from.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", from.display()))?;
        let source = entry.path();
        let target = to.join(entry.file_name());
        if source.is_dir() {
            copied += copy_tree(&source, &target)?;
        } else {
            fs::copy(&source, &target)
                .with_context(|| format!("copy {} to {}", source.display(), target.display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}
