use thiserror::Error;

/// Error code VK returns when the long-poll `ts`/`pts` pair is no longer valid.
pub const CURSOR_EXPIRED: i64 = 10;

/// An error reported by the VK API inside an otherwise well-formed response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("VK API error {code}: {message}")]
pub struct ApiError {
    pub code: i64,
    pub message: String,
}

impl ApiError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_cursor_expired(&self) -> bool {
        self.code == CURSOR_EXPIRED
    }
}

/// Outcome of a failed VK API call.
///
/// `Transport`, `Http` and `Decode` never carry a usable answer from VK and
/// are worth retrying; `Api` is a definite answer and is not.
#[derive(Error, Debug)]
pub enum CallError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Http(u16),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CallError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, CallError::Api(_))
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            CallError::Api(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CallError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            CallError::Decode(e.to_string())
        } else {
            CallError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for CallError {
    fn from(e: serde_json::Error) -> Self {
        CallError::Decode(e.to_string())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid command name '{0}': must be non-empty and contain no whitespace")]
    InvalidName(String),
}
