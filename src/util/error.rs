//! Error classification for logging and retry decisions.
use anyhow::Error;
use reqwest::StatusCode;
use sqlx::Error as SqlxError;

use crate::clients::SourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// Transient: timeouts, dropped connections, overloaded upstreams.
    Retryable,
    /// Bad input or missing rows; retrying will not help.
    NonRetryable,
    /// Credentials, quota or configuration problems that need an operator.
    Fatal,
}

impl ErrorKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Retryable => "retryable",
            ErrorKind::NonRetryable => "non_retryable",
            ErrorKind::Fatal => "fatal",
        }
    }
}

fn classify_status(status: StatusCode) -> Option<ErrorKind> {
    match status {
        StatusCode::TOO_MANY_REQUESTS => Some(ErrorKind::Retryable),
        s if s.is_server_error() => Some(ErrorKind::Retryable),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Some(ErrorKind::Fatal),
        s if s.is_client_error() => Some(ErrorKind::NonRetryable),
        _ => None,
    }
}

#[must_use]
pub(crate) fn classify_error(error: &Error) -> ErrorKind {
    if let Some(source_err) = error.downcast_ref::<SourceError>() {
        return match source_err {
            SourceError::QuotaExhausted { .. } | SourceError::Config(_) => ErrorKind::Fatal,
            SourceError::Status { status, .. } => {
                classify_status(*status).unwrap_or(ErrorKind::NonRetryable)
            }
            SourceError::Request(inner) if inner.is_timeout() || inner.is_connect() => {
                ErrorKind::Retryable
            }
            SourceError::Request(_) | SourceError::Decode(_) => ErrorKind::NonRetryable,
        };
    }

    if let Some(reqwest_err) = error.downcast_ref::<reqwest::Error>() {
        if reqwest_err.is_timeout() || reqwest_err.is_connect() {
            return ErrorKind::Retryable;
        }
        if let Some(kind) = reqwest_err.status().and_then(classify_status) {
            return kind;
        }
    }

    if let Some(sqlx_err) = error.downcast_ref::<SqlxError>() {
        match sqlx_err {
            SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) => {
                return ErrorKind::Retryable;
            }
            SqlxError::RowNotFound => return ErrorKind::NonRetryable,
            SqlxError::Configuration(_) => return ErrorKind::Fatal,
            _ => {}
        }
    }

    ErrorKind::NonRetryable
}
