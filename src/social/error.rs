use std::path::PathBuf;

/// Graph error codes that mean "slow down" rather than "stop".
const THROTTLE_CODES: [i64; 6] = [4, 17, 32, 341, 368, 613];
/// Graph error code for an expired or revoked access token.
pub(crate) const AUTH_EXPIRED_CODE: i64 = 190;
/// Graph error code for a field requested on the wrong object type.
pub(crate) const NONEXISTING_FIELD_CODE: i64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    #[error("access token expired or revoked (graph code {code}): {message}")]
    AuthExpired { code: i64, message: String },

    #[error("graph api error {code}{} (http {status}): {message}", subcode_suffix(.subcode))]
    Api {
        status: u16,
        code: i64,
        subcode: Option<i64>,
        message: String,
        transient: bool,
    },

    #[error("http {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<SocialError>,
    },
}

/// How the retry loop should treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retry {
    Never,
    Transient,
    Throttled,
}

impl SocialError {
    pub fn retry(&self) -> Retry {
        match self {
            SocialError::Api {
                status,
                code,
                message,
                transient,
                ..
            } => {
                if THROTTLE_CODES.contains(code) || mentions_throttling(message) {
                    Retry::Throttled
                } else if *transient || *status >= 500 {
                    Retry::Transient
                } else {
                    Retry::Never
                }
            }
            SocialError::Http { status, .. } if *status == 429 => Retry::Throttled,
            SocialError::Http { status, .. } if *status >= 500 => Retry::Transient,
            SocialError::Transport(_) => Retry::Transient,
            _ => Retry::Never,
        }
    }

    pub fn graph_code(&self) -> Option<i64> {
        match self {
            SocialError::AuthExpired { code, .. } | SocialError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, SocialError::AuthExpired { .. })
    }
}

fn subcode_suffix(subcode: &Option<i64>) -> String {
    subcode.map(|subcode| format!("/{subcode}")).unwrap_or_default()
}

fn mentions_throttling(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("spam") || lower.contains("rate limit")
}
