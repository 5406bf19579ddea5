//! Comments an alternate rendition of each frame under its post.
//!
//! The alternate shares the frame's file name and lives in its own directory.
use crate::config::AlternateFramesSettings;
use crate::frame::Frame;
use crate::hooks::LifecycleHook;
use crate::paths::WorkingPaths;
use crate::social::SocialClient;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

pub struct AlternateFrameCommentPoster {
    client: Rc<dyn SocialClient>,
    directory: PathBuf,
    comment_text: Option<String>,
    delete_files: bool,
}

impl AlternateFrameCommentPoster {
    pub fn new(
        settings: &AlternateFramesSettings,
        paths: &WorkingPaths,
        client: Rc<dyn SocialClient>,
    ) -> Result<Self> {
        let directory = paths.resolve(&settings.directory);
        if !directory.is_dir() {
            return Err(anyhow!(
                "alternate frames directory {} does not exist",
                directory.display()
            ));
        }
        tracing::info!(dir = %directory.display(), "alternate frame comments enabled");
        Ok(Self {
            client,
            directory,
            comment_text: settings.comment_text.clone(),
            delete_files: settings.delete_files,
        })
    }
}

impl LifecycleHook for AlternateFrameCommentPoster {
    fn name(&self) -> &'static str {
        "alternate-frames"
    }

    fn after_frame_upload(&mut self, frame: &Frame) -> Result<()> {
        let file_name = frame
            .local_file
            .file_name()
            .ok_or_else(|| anyhow!("frame path {} has no file name", frame.local_file.display()))?;
        let alternate = self.directory.join(file_name);
        if !alternate.is_file() {
            return Err(anyhow!(
                "alternate for frame {} not found at {}",
                frame.number,
                alternate.display()
            ));
        }
        let target = frame
            .photo_id
            .as_deref()
            .ok_or_else(|| anyhow!("frame {} has no photo id to comment on", frame.number))?;
        let caption = self.comment_text.as_deref().or(frame.text.as_deref());
        let comment_id = self
            .client
            .post_comment(target, caption, Some(&alternate))
            .with_context(|| format!("comment alternate for frame {}", frame.number))?;
        tracing::info!(frame = frame.number, comment_id = %comment_id, "alternate frame commented");
        if self.delete_files {
            fs::remove_file(&alternate)
                .with_context(|| format!("delete {}", alternate.display()))?;
        }
        Ok(())
    }
}
