//! Deferred best-of reposting.
//!
//! Every published frame is copied into a holding directory and queued. Once
//! a queued post is older than the cooldown its reactions are fetched; posts
//! above the threshold are reposted to the best-of album. Either way the
//! record and its held copy are retired.
use crate::clock::{elapsed_since, Clock};
use crate::config::BestOfSettings;
use crate::frame::{Frame, RemoteValue};
use crate::hooks::LifecycleHook;
use crate::paths::BestOfPaths;
use crate::persist::remove_if_exists;
use crate::social::{SocialClient, SocialError};
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

mod queue;

pub use queue::ReviewQueue;

/// What happened to the record at the head of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    /// Still inside the cooldown; nothing behind it is due either.
    TooEarly,
    Promoted,
    NotEligible,
    MissingFile,
}

pub struct BestOfReposter {
    client: Rc<dyn SocialClient>,
    clock: Rc<dyn Clock>,
    paths: BestOfPaths,
    queue: ReviewQueue,
    album_id: String,
    reactions_threshold: u64,
    cooldown: Duration,
    poll_interval: Duration,
    store_best_ofs: bool,
    /// Head frame whose check keeps failing, with the number of failed passes.
    stuck_head: Option<(u64, u32)>,
}

impl BestOfReposter {
    pub fn new(
        settings: &BestOfSettings,
        paths: BestOfPaths,
        client: Rc<dyn SocialClient>,
        clock: Rc<dyn Clock>,
    ) -> Result<Self> {
        for dir in [paths.root().to_path_buf(), paths.holding_dir(), paths.album_dir()] {
            fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        }
        tracing::info!(
            album_id = %settings.album_id,
            threshold = settings.reactions_threshold,
            wait_hours = settings.wait_hours,
            store_best_ofs = settings.store_best_ofs,
            dir = %paths.root().display(),
            "best-of reposter enabled"
        );
        Ok(Self {
            client,
            clock,
            queue: ReviewQueue::new(paths.queue_path()),
            paths,
            album_id: settings.album_id.clone(),
            reactions_threshold: settings.reactions_threshold,
            cooldown: settings.cooldown(),
            poll_interval: settings.poll_interval(),
            store_best_ofs: settings.store_best_ofs,
            stuck_head: None,
        })
    }

    /// Review due records from the head of the queue.
    ///
    /// Stops at the first record still inside the cooldown. A remote failure
    /// also stops the pass and leaves that record queued for the next one.
    /// Returns the number of retired records.
    pub fn advance(&mut self) -> Result<usize> {
        let mut retired = 0;
        loop {
            let verdict = match self.review_head() {
                Ok(Some(Verdict::TooEarly)) | Ok(None) => break,
                Ok(Some(verdict)) => verdict,
                Err(err) => {
                    let frame = self.queue.front().map(|frame| frame.number).unwrap_or_default();
                    let attempts = self.note_head_failure(frame);
                    tracing::warn!(
                        frame,
                        attempts,
                        queued_behind = self.queue.len().saturating_sub(1),
                        error = %err,
                        "best-of check failed; the frame stays queued and blocks the ones behind it"
                    );
                    break;
                }
            };
            self.stuck_head = None;
            if let Some(frame) = self.queue.pop_front()? {
                tracing::info!(frame = frame.number, ?verdict, "best-of check done");
            }
            retired += 1;
        }
        Ok(retired)
    }

    fn note_head_failure(&mut self, frame: u64) -> u32 {
        let attempts = match self.stuck_head {
            Some((stuck, attempts)) if stuck == frame => attempts + 1,
            _ => 1,
        };
        self.stuck_head = Some((frame, attempts));
        attempts
    }

    fn review_head(&mut self) -> Result<Option<Verdict>, SocialError> {
        let now = self.clock.now();
        let Some(head) = self.queue.front_mut() else {
            return Ok(None);
        };
        let Some(post_time) = head.post_time else {
            return Ok(Some(Verdict::TooEarly));
        };
        let elapsed = elapsed_since(post_time, now);
        if elapsed < self.cooldown {
            return Ok(Some(Verdict::TooEarly));
        }
        if !head.local_file.is_file() {
            tracing::warn!(
                frame = head.number,
                file = %head.local_file.display(),
                "held frame is missing; retiring without a best-of check"
            );
            return Ok(Some(Verdict::MissingFile));
        }

        let reactions = head.refresh_reactions(self.client.as_ref(), self.clock.as_ref())?;
        let verdict = if reactions > self.reactions_threshold {
            let caption = promotion_caption(elapsed, reactions, head);
            let posted = self
                .client
                .post_photo(&head.local_file, &caption, Some(self.album_id.as_str()))?;
            tracing::info!(
                frame = head.number,
                reactions,
                photo_id = %posted.photo_id,
                "frame promoted to the best-of album"
            );
            if self.store_best_ofs {
                let archived = self.paths.album_dir().join(archive_name(head, reactions));
                if let Err(err) = fs::copy(&head.local_file, &archived) {
                    tracing::warn!(
                        frame = head.number,
                        error = %err,
                        path = %archived.display(),
                        "could not archive promoted frame"
                    );
                }
            }
            Verdict::Promoted
        } else {
            tracing::debug!(
                frame = head.number,
                reactions = ?head.reactions.value(),
                fetched_at = ?head.reactions.fetched_at(),
                "below the best-of threshold"
            );
            Verdict::NotEligible
        };
        if let Err(err) = remove_if_exists(&head.local_file) {
            tracing::warn!(frame = head.number, error = %err, "could not delete held frame");
        }
        Ok(Some(verdict))
    }

    /// Copy a freshly posted frame into the holding directory and queue it.
    pub fn enqueue(&mut self, frame: &Frame) -> Result<()> {
        if !frame.is_posted() {
            return Err(anyhow!("frame {} has not been posted", frame.number));
        }
        let file_name = frame
            .local_file
            .file_name()
            .ok_or_else(|| anyhow!("frame path {} has no file name", frame.local_file.display()))?;
        let held = self.paths.holding_dir().join(file_name);
        fs::copy(&frame.local_file, &held).with_context(|| {
            format!(
                "copy {} to {}",
                frame.local_file.display(),
                held.display()
            )
        })?;
        let mut record = frame.clone();
        record.local_file = held;
        record.reactions = RemoteValue::NotFetched;
        self.queue
            .push(record)
            .with_context(|| format!("queue frame {} for best-of", frame.number))?;
        tracing::debug!(frame = frame.number, queued = self.queue.len(), "queued for best-of");
        Ok(())
    }

    /// Review everything left, at half the cooldown, sleeping between passes.
    pub fn drain(&mut self) -> Result<()> {
        self.cooldown /= 2;
        tracing::info!(
            queued = self.queue.len(),
            cooldown_hours = self.cooldown.as_secs_f64() / 3600.0,
            "draining the best-of queue"
        );
        loop {
            self.advance()?;
            if self.queue.is_empty() {
                break;
            }
            tracing::info!(
                queued = self.queue.len(),
                stuck_frame = ?self.stuck_head.map(|(frame, _)| frame),
                failed_checks = self.stuck_head.map(|(_, attempts)| attempts).unwrap_or_default(),
                sleep_minutes = self.poll_interval.as_secs() / 60,
                "frames still waiting for their best-of check"
            );
            self.clock.sleep(self.poll_interval);
        }
        tracing::info!("best-of queue drained");
        Ok(())
    }
}

impl LifecycleHook for BestOfReposter {
    fn name(&self) -> &'static str {
        "best-of"
    }

    fn before_upload_loop(&mut self) -> Result<()> {
        self.queue = ReviewQueue::load(self.paths.queue_path())?;
        tracing::info!(queued = self.queue.len(), "loaded best-of queue");
        Ok(())
    }

    fn before_frame_upload(&mut self, _frame: &Frame) -> Result<()> {
        self.advance().map(|_| ())
    }

    fn after_frame_upload(&mut self, frame: &Frame) -> Result<()> {
        self.enqueue(frame)
    }

    fn after_upload_loop(&mut self) -> Result<()> {
        self.drain()
    }
}

fn promotion_caption(elapsed: Duration, reactions: u64, frame: &Frame) -> String {
    format!(
        "Reactions after {} hours: {}.\nOriginal post: {}\n\n{}",
        elapsed.as_secs() / 3600,
        reactions,
        frame.url.as_deref().unwrap_or_default(),
        frame.text.as_deref().unwrap_or_default()
    )
}

fn archive_name(frame: &Frame, reactions: u64) -> PathBuf {
    let ext = frame
        .local_file
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("jpg");
    PathBuf::from(format!(
        "Frame {} post_id {} photo_id {} reactions {}.{}",
        frame.number,
        frame.post_id.as_deref().unwrap_or_default(),
        frame.photo_id.as_deref().unwrap_or_default(),
        reactions,
        ext
    ))
}

#[cfg(test)]
#[path = "best_of_tests.rs"]
mod tests;
