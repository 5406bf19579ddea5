//! The unit of publishing.
use crate::clock::Clock;
use crate::social::{photo_url, PostedPhoto, SocialClient, SocialError};
use anyhow::{ensure, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// A value that lives on the remote side and is only known once fetched.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RemoteValue<T> {
    #[default]
    NotFetched,
    Fetched { value: T, fetched_at: DateTime<Utc> },
}

impl<T: Copy> RemoteValue<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            RemoteValue::NotFetched => None,
            RemoteValue::Fetched { value, .. } => Some(*value),
        }
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RemoteValue::NotFetched => None,
            RemoteValue::Fetched { fetched_at, .. } => Some(*fetched_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub number: u64,
    pub local_file: PathBuf,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo_id: Option<String>,
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub post_time: Option<DateTime<Utc>>,
    /// Refreshed on demand; never persisted.
    #[serde(skip)]
    pub reactions: RemoteValue<u64>,
    /// Fields written by other versions, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Frame {
    pub fn new(number: u64, local_file: PathBuf) -> Self {
        Self {
            number,
            local_file,
            text: None,
            photo_id: None,
            post_id: None,
            url: None,
            post_time: None,
            reactions: RemoteValue::NotFetched,
            extra: Map::new(),
        }
    }

    pub fn is_posted(&self) -> bool {
        self.post_id.is_some() && self.post_time.is_some()
    }

    /// Record the outcome of the one publish this frame gets.
    pub fn mark_posted(
        &mut self,
        posted: PostedPhoto,
        text: String,
        posted_at: DateTime<Utc>,
    ) -> Result<()> {
        ensure!(
            self.post_id.is_none(),
            "frame {} was already posted as {}",
            self.number,
            self.post_id.as_deref().unwrap_or_default()
        );
        self.url = Some(photo_url(&posted.photo_id));
        self.photo_id = Some(posted.photo_id);
        self.post_id = Some(posted.post_id);
        self.text = Some(text);
        self.post_time = Some(posted_at);
        Ok(())
    }

    /// Fetch the current reaction total and remember when it was taken.
    pub fn refresh_reactions(
        &mut self,
        client: &dyn SocialClient,
        clock: &dyn Clock,
    ) -> Result<u64, SocialError> {
        let post_id = self.post_id.as_deref().ok_or_else(|| {
            SocialError::InvalidRequest(format!("frame {} has no post id", self.number))
        })?;
        let value = client.reaction_count(post_id)?;
        self.reactions = RemoteValue::Fetched {
            value,
            fetched_at: clock.now(),
        };
        Ok(value)
    }
}
