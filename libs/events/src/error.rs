use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("event type '{0}' is not part of the mission or pilot catalogue")]
    UnknownEventType(String),

    /// Builder finished without a required field.
    #[error("envelope is missing '{0}'")]
    MissingField(&'static str),

    #[error("payload does not match its event type: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EventError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
