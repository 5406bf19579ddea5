//! The publish loop.
use crate::catalog::FrameCatalog;
use crate::clock::{self, Clock};
use crate::frame::Frame;
use crate::hooks::LifecycleHook;
use crate::progress::ProgressState;
use crate::social::SocialClient;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BotOptions {
    pub title: String,
    pub name: String,
    pub upload_interval: Duration,
    pub delete_files: bool,
}

/// Caption for a feed post.
pub fn frame_caption(title: &str, number: u64, total: u64) -> String {
    format!("{title}\nFrame {number} of {total}")
}

pub struct FrameBot {
    options: BotOptions,
    catalog: FrameCatalog,
    progress: ProgressState,
    client: Rc<dyn SocialClient>,
    clock: Rc<dyn Clock>,
    hooks: Vec<Box<dyn LifecycleHook>>,
}

impl FrameBot {
    pub fn new(
        options: BotOptions,
        catalog: FrameCatalog,
        progress: ProgressState,
        client: Rc<dyn SocialClient>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        Self {
            options,
            catalog,
            progress,
            client,
            clock,
            hooks: Vec::new(),
        }
    }

    pub fn register_hook(&mut self, hook: Box<dyn LifecycleHook>) {
        tracing::debug!(hook = hook.name(), "registered hook");
        self.hooks.push(hook);
    }

    /// Publish every pending frame, then let hooks finish their work.
    pub fn start(&mut self) -> Result<()> {
        tracing::info!(
            bot = %self.options.name,
            title = %self.options.title,
            pending = self.catalog.frames.len(),
            total = self.catalog.total,
            last_published = ?self.progress.last(),
            interval_secs = self.options.upload_interval.as_secs(),
            delete_files = self.options.delete_files,
            "starting"
        );
        if self.catalog.is_empty() {
            tracing::info!("no frames left to publish");
        }
        for hook in self.hooks.iter_mut() {
            hook.before_upload_loop()
                .with_context(|| format!("{} before the upload loop", hook.name()))?;
        }
        self.upload_loop()?;
        for hook in self.hooks.iter_mut() {
            hook.after_upload_loop()
                .with_context(|| format!("{} after the upload loop", hook.name()))?;
        }
        self.progress.clear()?;
        tracing::info!(title = %self.options.title, "all frames published");
        Ok(())
    }

    fn upload_loop(&mut self) -> Result<()> {
        let frames = std::mem::take(&mut self.catalog.frames);
        let count = frames.len();
        for (index, mut frame) in frames.into_iter().enumerate() {
            for hook in self.hooks.iter_mut() {
                hook.before_frame_upload(&frame).with_context(|| {
                    format!("{} before frame {}", hook.name(), frame.number)
                })?;
            }
            let posted_at = self.upload_frame(&mut frame)?;
            for hook in self.hooks.iter_mut() {
                hook.after_frame_upload(&frame).with_context(|| {
                    format!("{} after frame {}", hook.name(), frame.number)
                })?;
            }
            if self.options.delete_files {
                fs::remove_file(&frame.local_file)
                    .with_context(|| format!("delete {}", frame.local_file.display()))?;
            }
            if index + 1 < count {
                let pause =
                    clock::remaining(posted_at, self.options.upload_interval, self.clock.now());
                tracing::info!(wait_secs = pause.as_secs(), "waiting before the next frame");
                self.clock.sleep(pause);
            }
        }
        Ok(())
    }

    fn upload_frame(&mut self, frame: &mut Frame) -> Result<DateTime<Utc>> {
        let caption = frame_caption(&self.options.title, frame.number, self.catalog.total);
        tracing::info!(
            frame = frame.number,
            total = self.catalog.total,
            "uploading frame"
        );
        let posted = self
            .client
            .post_photo(&frame.local_file, &caption, None)
            .with_context(|| format!("publish frame {}", frame.number))?;
        let posted_at = self.clock.now();
        frame.mark_posted(posted, caption, posted_at)?;
        self.progress.record(frame.number)?;
        tracing::info!(
            frame = frame.number,
            post_id = frame.post_id.as_deref().unwrap_or_default(),
            url = frame.url.as_deref().unwrap_or_default(),
            "frame published"
        );
        Ok(posted_at)
    }
}

#[cfg(test)]
#[path = "bot_tests.rs"]
mod tests;
