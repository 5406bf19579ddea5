//! Remote platform boundary.
//!
//! The publish loop and the best-of reposter only see [`SocialClient`]; the
//! Graph API implementation, its retry policy, and its error mapping live in
//! the submodules.
use std::path::Path;

mod error;
mod graph;
mod retry;

pub use error::SocialError;
pub use graph::GraphClient;
pub use retry::RetryPolicy;

/// Identifiers returned by a successful photo post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedPhoto {
    /// The media object.
    pub photo_id: String,
    /// The feed story, used for engagement queries.
    pub post_id: String,
}

pub trait SocialClient {
    /// Post `image` with `caption` to `target` (an album id), or to the page feed.
    fn post_photo(
        &self,
        image: &Path,
        caption: &str,
        target: Option<&str>,
    ) -> Result<PostedPhoto, SocialError>;

    /// Comment on `target`; at least one of `caption` and `image` is required.
    fn post_comment(
        &self,
        target: &str,
        caption: Option<&str>,
        image: Option<&Path>,
    ) -> Result<String, SocialError>;

    /// Total reactions on a previously made post.
    fn reaction_count(&self, post_id: &str) -> Result<u64, SocialError>;
}

/// Public link for a posted photo.
pub fn photo_url(photo_id: &str) -> String {
    format!("https://facebook.com/{photo_id}")
}
