use thiserror::Error;

#[derive(Error, Debug)]
pub enum CastPlaybackError {
    // La session existe mais le receiver ne répond plus (réseau instable)
    #[error("Transient network disconnection: {0}")]
    TransientDisconnection(String),
    #[error("No connection to the cast device")]
    NoConnection,
    #[error("Invalid mediaId {0}")]
    InvalidMediaId(String),
    #[error("{0} cannot be called in the absence of mediaId.")]
    MissingMediaId(String),
    #[error("Cannot encode cast payload: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Chromecast Error: {0}")]
    Cast(String),
    #[error("Config Error: {0}")]
    Config(String),
}

impl CastPlaybackError {
    pub fn transient(message: &str) -> Self {
        CastPlaybackError::TransientDisconnection(message.to_string())
    }

    pub fn invalid_media_id(media_id: &str) -> Self {
        CastPlaybackError::InvalidMediaId(media_id.to_string())
    }

    pub fn missing_media_id(operation: &str) -> Self {
        CastPlaybackError::MissingMediaId(operation.to_string())
    }

    pub fn cast(message: &str) -> Self {
        CastPlaybackError::Cast(message.to_string())
    }

    /// True for the two connectivity kinds that read-only queries degrade on.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            CastPlaybackError::TransientDisconnection(_) | CastPlaybackError::NoConnection
        )
    }
}
