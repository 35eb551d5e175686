//! Bus tracker errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the authentication collaborator.
///
/// Each variant is user-correctable and maps to a distinct user-facing message.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthError {
    #[error("code: auth/invalid-email, description: invalid email address format")]
    InvalidEmail,

    #[error("code: auth/user-disabled, description: account disabled")]
    UserDisabled,

    #[error("code: auth/user-not-found, description: no such account")]
    UserNotFound,

    #[error("code: auth/wrong-password, description: wrong password")]
    WrongPassword,

    #[error("code: auth/failed, description: {0}")]
    Failed(String),
}

impl AuthError {
    /// Maps a provider error code (e.g. `auth/invalid-email`) onto an error kind.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "auth/invalid-email" => Self::InvalidEmail,
            "auth/user-disabled" => Self::UserDisabled,
            "auth/user-not-found" => Self::UserNotFound,
            "auth/wrong-password" => Self::WrongPassword,
            other => Self::Failed(other.to_string()),
        }
    }

    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::InvalidEmail => "auth/invalid-email",
            Self::UserDisabled => "auth/user-disabled",
            Self::UserNotFound => "auth/user-not-found",
            Self::WrongPassword => "auth/wrong-password",
            Self::Failed(_) => "auth/failed",
        }
    }

    /// Short message shown to the user.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "Invalid email address format.",
            Self::UserDisabled => "This account has been disabled.",
            Self::UserNotFound => "No account found with this email.",
            Self::WrongPassword => "Incorrect password.",
            Self::Failed(_) => "Failed to sign in. Please try again.",
        }
    }
}

/// Errors raised while sampling the device position.
///
/// A sample error terminates a continuous sample stream.
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SampleError {
    #[error("code: permission_denied, description: location permission denied")]
    PermissionDenied,

    #[error("code: position_unavailable, description: position unavailable")]
    PositionUnavailable,

    #[error("code: timeout, description: no position within the configured timeout")]
    Timeout,

    #[error("code: unsupported, description: geolocation is not supported on this platform")]
    Unsupported,
}

impl SampleError {
    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::PositionUnavailable => "position_unavailable",
            Self::Timeout => "timeout",
            Self::Unsupported => "unsupported",
        }
    }

    /// Short message shown to the user.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Unsupported => "Geolocation is not supported by this browser",
            Self::PermissionDenied | Self::PositionUnavailable | Self::Timeout => {
                "Unable to get location."
            }
        }
    }
}

/// Errors raised by the document store, for writes and subscriptions alike.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StoreError {
    #[error("code: unauthenticated, description: request is not authenticated")]
    Unauthenticated,

    #[error("code: permission_denied, description: permission denied")]
    PermissionDenied,

    #[error("code: unavailable, description: store unavailable")]
    Unavailable,

    #[error("code: unknown, description: {0}")]
    Unknown(String),
}

impl StoreError {
    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::PermissionDenied => "permission_denied",
            Self::Unavailable => "unavailable",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Short message shown to the user.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "Please sign in again.",
            Self::PermissionDenied => "You do not have permission to do that.",
            Self::Unavailable => "Service unavailable. Please try again later.",
            Self::Unknown(_) => "Something went wrong. Please try again.",
        }
    }
}

/// A failed point write (upsert or delete).
pub type WriteError = StoreError;

/// A failed live subscription.
pub type SubscribeError = StoreError;

/// Workspace level error type.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Error {
    /// The request is invalid or missing required fields.
    #[error("code: bad_request, description: {0}")]
    BadRequest(String),

    /// The requested resource could not be found.
    #[error("code: not_found, description: {0}")]
    NotFound(String),

    /// A stored document could not be decoded.
    #[error("code: invalid_format, description: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A non recoverable internal error occurred.
    #[error("code: internal, description: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the stable error code associated with the variant.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::InvalidFormat(_) => "invalid_format",
            Self::Auth(e) => e.code(),
            Self::Sample(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::Internal(_) => "internal",
        }
    }

    /// Returns the error description.
    #[must_use]
    pub fn description(&self) -> String {
        self.to_string()
    }

    /// Short message shown to the user.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Auth(e) => e.message(),
            Self::Sample(e) => e.message(),
            Self::Store(e) => e.message(),
            Self::BadRequest(_) | Self::NotFound(_) | Self::InvalidFormat(_) | Self::Internal(_) => {
                "Something went wrong. Please try again."
            }
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        let chain = err.chain().map(ToString::to_string).collect::<Vec<_>>().join(" -> ");

        // keep domain errors, adding the context to free-form variants only
        if let Some(inner) = err.downcast_ref::<Self>() {
            tracing::debug!("Error: {err}, caused by: {inner}");

            return match inner {
                Self::BadRequest(_) => Self::BadRequest(chain),
                Self::NotFound(_) => Self::NotFound(chain),
                Self::InvalidFormat(_) => Self::InvalidFormat(chain),
                Self::Internal(_) => Self::Internal(chain),
                Self::Auth(e) => Self::Auth(e.clone()),
                Self::Sample(e) => Self::Sample(*e),
                Self::Store(e) => Self::Store(e.clone()),
            };
        }
        if let Some(inner) = err.downcast_ref::<StoreError>() {
            return Self::Store(inner.clone());
        }
        if let Some(inner) = err.downcast_ref::<SampleError>() {
            return Self::Sample(*inner);
        }
        if let Some(inner) = err.downcast_ref::<AuthError>() {
            return Self::Auth(inner.clone());
        }

        // otherwise, return an Internal error
        Self::Internal(chain)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}

#[macro_export]
macro_rules! bad_request {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::BadRequest(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::BadRequest(format!($err))
    };
}

#[macro_export]
macro_rules! not_found {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::NotFound(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::NotFound(format!($err))
    };
}

#[cfg(test)]
mod tests {
    use anyhow::{Context, anyhow};
    use serde_json::Value;

    use super::{AuthError, Error, SampleError, StoreError};

    #[test]
    fn error_display() {
        let err = Error::BadRequest("bus id is empty".to_string());
        assert_eq!(format!("{err}"), "code: bad_request, description: bus id is empty");
    }

    #[test]
    fn with_context() {
        let context_error = || -> Result<(), Error> {
            Err(Error::NotFound("bus 7".to_string()))
                .context("resolving bus")
                .context("loading dashboard")?;
            Ok(())
        };

        assert_eq!(
            context_error().unwrap_err(),
            Error::NotFound(
                "loading dashboard -> resolving bus -> code: not_found, description: bus 7"
                    .to_string()
            )
        );
    }

    #[test]
    fn store_error_survives_context() {
        let result = Err::<(), StoreError>(StoreError::Unavailable).context("publishing");
        let err: Error = result.unwrap_err().into();

        assert_eq!(err, Error::Store(StoreError::Unavailable));
        assert_eq!(err.code(), "unavailable");
    }

    #[test]
    fn anyhow_context() {
        let result = Err::<(), anyhow::Error>(anyhow!("one-off error")).context("error context");
        let err: Error = result.unwrap_err().into();

        assert_eq!(err.to_string(), "code: internal, description: error context -> one-off error");
    }

    #[test]
    fn serde_error() {
        let err: Error = serde_json::from_str::<Value>(r#"{"foo": "bar""#).unwrap_err().into();
        assert_eq!(err.code(), "invalid_format");
    }

    #[test]
    fn auth_codes() {
        assert_eq!(AuthError::from_code("auth/invalid-email"), AuthError::InvalidEmail);
        assert_eq!(AuthError::from_code("auth/user-disabled"), AuthError::UserDisabled);
        assert_eq!(AuthError::from_code("auth/user-not-found"), AuthError::UserNotFound);
        assert_eq!(AuthError::from_code("auth/wrong-password"), AuthError::WrongPassword);
        assert_eq!(
            AuthError::from_code("auth/network-request-failed"),
            AuthError::Failed("auth/network-request-failed".to_string())
        );
    }

    #[test]
    fn auth_messages_are_distinct() {
        let messages = [
            AuthError::InvalidEmail.message(),
            AuthError::UserDisabled.message(),
            AuthError::UserNotFound.message(),
            AuthError::WrongPassword.message(),
            AuthError::Failed(String::new()).message(),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn unsupported_message() {
        assert_eq!(
            Error::from(SampleError::Unsupported).message(),
            "Geolocation is not supported by this browser"
        );
    }
}
