use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Input rejected before any remote call was issued.
    Validation(String),
    /// The remote store answered with an error it described itself.
    RemoteRejected {
        /// HTTP status returned by the remote store.
        status: u16,
        /// Message taken from the `error` field of the response body.
        message: String,
    },
    /// Network failure or an unreadable/unsuccessful response with no usable message.
    Transport(String),
    /// Internal error.
    Internal(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// True for failures that came from talking to the remote store.
    pub fn is_transport(&self) -> bool {
        match self {
            AppError::RemoteRejected { .. } | AppError::Transport(_) => true,
            AppError::WithContext { source, .. } => source.is_transport(),
            _ => false,
        }
    }

    /// True for input rejected locally.
    pub fn is_validation(&self) -> bool {
        match self {
            AppError::Validation(_) => true,
            AppError::WithContext { source, .. } => source.is_validation(),
            _ => false,
        }
    }

    /// The message a user should see for this failure.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::RemoteRejected { message, .. } => message.clone(),
            AppError::Transport(_) => "Could not reach the property registry".to_string(),
            AppError::Internal(_) => "Internal error".to_string(),
            AppError::WithContext { source, .. } => source.user_message(),
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::RemoteRejected { status, message } => {
                write!(f, "Remote store rejected request ({}): {}", status, message)
            }
            AppError::Transport(msg) => write!(f, "Transport error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Validation failures are the caller's fault and map to 400; anything the
    /// remote store caused maps to 502 and carries the server message when one
    /// was provided.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::RemoteRejected { status, message } => {
                tracing::warn!("Remote store rejected request ({}): {}", status, message);
                (StatusCode::BAD_GATEWAY, message.clone())
            }
            AppError::Transport(msg) => {
                tracing::error!("Transport error: {}", msg);
                (StatusCode::BAD_GATEWAY, self.user_message())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                return (**source).clone().into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
