use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Stream error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Trigger evaluation error: {0}")]
    Trigger(String),
}

/// Failure modes of a historical-series fetch. All of them are recoverable
/// at the acquirer level via the synthetic fallback.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Provider quota exceeded")]
    QuotaExceeded,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Empty series returned")]
    Empty,
}
