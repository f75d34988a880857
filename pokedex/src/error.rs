use std::sync::Arc;

/// A failed fetch from the remote API, after retries.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("request failed: {0}")]
    RequestFailed(Arc<reqwest::Error>),
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("malformed response: {0}")]
    Decode(Arc<serde_json::Error>),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl Error {
    /// Server errors, throttling and transport failures are worth retrying.
    /// Any other client error is final for that resource.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(error) => {
                error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
            }
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Decode(_) | Self::InvalidRecord(_) => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return Self::Status {
                url: error
                    .url()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                status: status.as_u16(),
            };
        }

        Self::RequestFailed(Arc::new(error))
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(Arc::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> Error {
        Error::Status {
            url: "https://pokeapi.co/api/v2/pokemon/1".to_owned(),
            status,
        }
    }

    #[test]
    fn server_errors_are_retryable() {
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
    }

    #[test]
    fn client_errors_are_final() {
        assert!(!status(404).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!Error::InvalidRecord("no types".to_owned()).is_retryable());
    }
}
