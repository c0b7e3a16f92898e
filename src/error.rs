use thiserror::Error;

use crate::NotifyEvent;

#[derive(Debug, Error)]
pub enum Error {
    // Token flow errors
    #[error("must use a physical device for push notifications")]
    IneligibleDevice,
    #[error("notification permission was not granted")]
    PermissionDenied,
    #[error("{0}")]
    TokenIssuance(String),

    // Listener and screen lifecycle errors
    #[error("no subscription with id {0}")]
    UnknownSubscription(String),
    #[error("the notification handler was already set")]
    HandlerAlreadySet,
    #[error("the screen is already active")]
    AlreadyActive,

    // Configuration errors
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Common errors
    #[error(transparent)]
    TokioSend(#[from] tokio::sync::mpsc::error::SendError<NotifyEvent>),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Other error: {0}")]
    Other(String),
}
