use thiserror::Error;

/// Transport-level failure. Surfaced by the fetcher; adapters catch it and move
/// on to the next candidate or item.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out requesting {0}")]
    Timeout(String),
    #[error("could not connect to {url}: {message}")]
    Connect { url: String, message: String },
    #[error("network error requesting {url}: {message}")]
    Network { url: String, message: String },
    #[error("invalid url '{0}'")]
    InvalidUrl(String),
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(url.to_string())
        } else if err.is_connect() {
            FetchError::Connect {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else if err.is_builder() {
            FetchError::InvalidUrl(url.to_string())
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Why a response was turned into an empty outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("http status {0}")]
    Status(u16),
    #[error("anti-bot challenge page")]
    Challenge,
    #[error("response too short ({0} bytes)")]
    TooShort(usize),
    #[error("blocking indicators found: {0:?}")]
    Blocked(Vec<&'static str>),
}

/// Failure while turning one listed item into a result. Always a skip, never
/// an abort of the batch.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Transport(#[from] FetchError),
    #[error("detail page rejected: {0}")]
    Blocked(Rejection),
    #[error("no {0} found")]
    Miss(&'static str),
}
