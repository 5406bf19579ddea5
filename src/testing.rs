//! Test doubles for the clock and the social platform.
use crate::clock::Clock;
use crate::social::{PostedPhoto, SocialClient, SocialError};
use chrono::{DateTime, TimeZone, Utc};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return everything it logged.
pub(crate) fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buf.0.lock().expect("log buffer")).into_owned();
    (value, logs)
}

/// Manual clock; `sleep` records the duration and moves time forward.
pub(crate) struct FakeClock {
    now: Cell<DateTime<Utc>>,
    sleeps: RefCell<Vec<Duration>>,
}

impl FakeClock {
    pub(crate) fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .single()
            .expect("valid start time");
        Self::at(start)
    }

    pub(crate) fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(now),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn advance(&self, duration: Duration) {
        let step = chrono::Duration::from_std(duration).expect("duration in range");
        self.now.set(self.now.get() + step);
    }

    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    PostPhoto {
        image: PathBuf,
        caption: String,
        target: Option<String>,
    },
    PostComment {
        target: String,
        caption: Option<String>,
        image: Option<PathBuf>,
    },
    Reactions {
        post_id: String,
    },
}

/// In-memory platform that records every call.
pub(crate) struct RecordingClient {
    calls: RefCell<Vec<Call>>,
    reactions: RefCell<VecDeque<Result<u64, SocialError>>>,
    fail_posts_from: Cell<Option<usize>>,
    next_id: Cell<u64>,
}

impl RecordingClient {
    pub(crate) fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            reactions: RefCell::new(VecDeque::new()),
            fail_posts_from: Cell::new(None),
            next_id: Cell::new(1),
        }
    }

    /// Queue the result of the next reaction lookup; unscripted lookups return 0.
    pub(crate) fn push_reactions(&self, result: Result<u64, SocialError>) {
        self.reactions.borrow_mut().push_back(result);
    }

    /// Photo posts starting at the `n`-th (1-based) fail with an expired token.
    pub(crate) fn fail_posts_from(&self, n: usize) {
        self.fail_posts_from.set(Some(n));
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub(crate) fn photo_posts(&self) -> Vec<(PathBuf, String, Option<String>)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::PostPhoto {
                    image,
                    caption,
                    target,
                } => Some((image.clone(), caption.clone(), target.clone())),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn reaction_calls(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, Call::Reactions { .. }))
            .count()
    }
}

impl SocialClient for RecordingClient {
    fn post_photo(
        &self,
        image: &Path,
        caption: &str,
        target: Option<&str>,
    ) -> Result<PostedPhoto, SocialError> {
        self.calls.borrow_mut().push(Call::PostPhoto {
            image: image.to_path_buf(),
            caption: caption.to_string(),
            target: target.map(str::to_string),
        });
        let attempt = self.photo_posts().len();
        if self
            .fail_posts_from
            .get()
            .is_some_and(|from| attempt >= from)
        {
            return Err(SocialError::AuthExpired {
                code: 190,
                message: "Session has expired".to_string(),
            });
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Ok(PostedPhoto {
            photo_id: format!("photo{id}"),
            post_id: format!("page_photo{id}"),
        })
    }

    fn post_comment(
        &self,
        target: &str,
        caption: Option<&str>,
        image: Option<&Path>,
    ) -> Result<String, SocialError> {
        self.calls.borrow_mut().push(Call::PostComment {
            target: target.to_string(),
            caption: caption.map(str::to_string),
            image: image.map(Path::to_path_buf),
        });
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Ok(format!("comment{id}"))
    }

    fn reaction_count(&self, post_id: &str) -> Result<u64, SocialError> {
        self.calls.borrow_mut().push(Call::Reactions {
            post_id: post_id.to_string(),
        });
        self.reactions.borrow_mut().pop_front().unwrap_or(Ok(0))
    }
}
