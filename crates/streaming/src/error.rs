/// Failure talking to a backend collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Non-success HTTP status. `message` is the backend's own error text.
    Http { status: u16, message: String },
    /// The request never produced a response (connect, timeout, TLS).
    Transport(String),
    /// The response body did not match the expected shape.
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Http { status, message } => write!(f, "HTTP {status}: {message}"),
            ApiError::Transport(msg) => write!(f, "request failed: {msg}"),
            ApiError::Decode(msg) => write!(f, "unexpected response: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}
