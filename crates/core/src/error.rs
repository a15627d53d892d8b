use thiserror::Error;

pub type TrackResult<T> = Result<T, TrackError>;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Collector is not present on the page")]
    CollectorUnavailable,

    #[error("Collector error: {0}")]
    Collector(String),

    #[error("Missing page element: {0}")]
    MissingElement(String),

    #[error("Malformed payload: {0}")]
    Payload(String),

    #[error("Event name {0:?} is empty after sanitization")]
    EmptyEventName(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}
