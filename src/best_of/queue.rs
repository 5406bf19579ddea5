//! The persisted review queue.
//!
//! `bofc.json` holds a JSON array of posted frames, oldest post first. The
//! file is rewritten atomically after every change, so a crash leaves either
//! the previous queue or the next one.
use crate::frame::Frame;
use crate::persist::write_atomic_json;
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::collections::VecDeque;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

#[derive(Debug)]
pub struct ReviewQueue {
    path: PathBuf,
    records: VecDeque<Frame>,
}

impl ReviewQueue {
    /// An empty queue backed by `path`; nothing is read or written yet.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            records: VecDeque::new(),
        }
    }

    /// Read the queue at `path`; a missing file is an empty queue.
    pub fn load(path: PathBuf) -> Result<Self> {
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::new(path)),
            Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
        };
        let value: Value =
            serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
        if value.get("list").is_some() {
            return Err(anyhow!(
                "{} uses the legacy queue format; run `framebot migrate` first",
                path.display()
            ));
        }
        let records: Vec<Frame> =
            serde_json::from_value(value).with_context(|| format!("parse {}", path.display()))?;
        Self::with_records(path, records)
    }

    /// Build a queue from loose records, sorted by post time.
    pub fn with_records(path: PathBuf, mut records: Vec<Frame>) -> Result<Self> {
        for record in &records {
            check_record(record).with_context(|| format!("queue {}", path.display()))?;
        }
        records.sort_by_key(|record| record.post_time);
        Ok(Self {
            path,
            records: records.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn front(&self) -> Option<&Frame> {
        self.records.front()
    }

    pub fn front_mut(&mut self) -> Option<&mut Frame> {
        self.records.front_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.records.iter()
    }

    /// Insert `record` after every record posted at or before it, then persist.
    pub fn push(&mut self, record: Frame) -> Result<()> {
        check_record(&record)?;
        let at = self
            .records
            .partition_point(|queued| queued.post_time <= record.post_time);
        self.records.insert(at, record);
        self.persist()
    }

    /// Remove the oldest record, then persist.
    pub fn pop_front(&mut self) -> Result<Option<Frame>> {
        let popped = self.records.pop_front();
        if popped.is_some() {
            self.persist()?;
        }
        Ok(popped)
    }

    pub fn persist(&self) -> Result<()> {
        write_atomic_json(&self.path, &self.records)
    }
}

fn check_record(record: &Frame) -> Result<()> {
    if record.post_id.as_deref().unwrap_or_default().is_empty() {
        return Err(anyhow!("frame {} has no post_id", record.number));
    }
    if record.post_time.is_none() {
        return Err(anyhow!("frame {} has no post_time", record.number));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0)
            .single()
            .expect("valid time")
    }

    fn record(number: u64, minutes: i64) -> Frame {
        let mut frame = Frame::new(number, PathBuf::from(format!("{number}.jpg")));
        frame.post_id = Some(format!("page_{number}"));
        frame.photo_id = Some(format!("{number}"));
        frame.post_time = Some(base() + ChronoDuration::minutes(minutes));
        frame
    }

    fn numbers(queue: &ReviewQueue) -> Vec<u64> {
        queue.iter().map(|frame| frame.number).collect()
    }

    #[test]
    fn missing_file_is_an_empty_queue() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let queue = ReviewQueue::load(dir.path().join("bofc.json")).expect("load");
        assert!(queue.is_empty());
        assert!(!dir.path().join("bofc.json").exists());
    }

    #[test]
    fn load_orders_records_by_post_time() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("bofc.json");
        let records = [record(3, 30), record(1, 10), record(2, 20)];
        fs::write(&path, serde_json::to_vec(&records).expect("encode")).expect("write");

        let queue = ReviewQueue::load(path).expect("load");
        assert_eq!(numbers(&queue), vec![1, 2, 3]);
    }

    #[test]
    fn push_keeps_order_and_persists() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("bofc.json");
        let mut queue = ReviewQueue::new(path.clone());
        queue.push(record(1, 10)).expect("push");
        queue.push(record(3, 30)).expect("push");
        queue.push(record(2, 20)).expect("push");
        assert_eq!(numbers(&queue), vec![1, 2, 3]);

        let reloaded = ReviewQueue::load(path.clone()).expect("reload");
        assert_eq!(numbers(&reloaded), vec![1, 2, 3]);

        let popped = queue.pop_front().expect("pop").expect("record");
        assert_eq!(popped.number, 1);
        let reloaded = ReviewQueue::load(path).expect("reload");
        assert_eq!(numbers(&reloaded), vec![2, 3]);
    }

    #[test]
    fn records_without_identifiers_are_rejected() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut queue = ReviewQueue::new(dir.path().join("bofc.json"));
        let mut unposted = record(1, 0);
        unposted.post_id = None;
        assert!(queue.push(unposted).is_err());

        let mut untimed = record(2, 0);
        untimed.post_time = None;
        let path = dir.path().join("bofc.json");
        fs::write(&path, serde_json::to_vec(&[untimed]).expect("encode")).expect("write");
        let err = ReviewQueue::load(path).expect_err("no post_time");
        assert!(format!("{err:#}").contains("post_time"));
    }

    #[test]
    fn legacy_shape_points_at_migrate() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("bofc.json");
        fs::write(&path, r#"{"list": []}"#).expect("write");
        let err = ReviewQueue::load(path).expect_err("legacy");
        assert!(err.to_string().contains("framebot migrate"));
    }
}
