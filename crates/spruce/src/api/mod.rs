//! Contract with the remote server.
//!
//! The core only ever talks to [`ApiClient`]. Each call returns a typed
//! success or a typed failure; transient failures are retried with a small
//! bound, permanent ones are terminal for that single item.

pub mod http;

use crate::model::{ManagedObject, ObjectType};
use thiserror::Error;

pub use http::JamfClient;

/// Version string reported as `ClientLibraryVersion` in the interchange
/// document.
pub const CLIENT_LIBRARY_VERSION: &str = "classic-api-0.9.0";

/// Total attempts for a transient-failing call (1 initial + 2 retries).
pub const RETRY_ATTEMPTS: u32 = 3;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("transient server failure: {0}")]
    Transient(String),

    #[error("object does not exist")]
    NotFound,

    #[error("operation not supported by this server: {0}")]
    Unsupported(String),

    #[error("request failed: {0}")]
    Permanent(String),
}

impl ApiError {
    /// Worth another attempt. Everything else is terminal for the item.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transient(_) | ApiError::Connection(_))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// A lightweight `(id, name)` row from a list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub id: u32,
    pub name: String,
}

/// The transport interface the core needs, nothing more.
///
/// `Sync` so fetches can fan out over a bounded worker pool.
pub trait ApiClient: Sync {
    /// Server identity, as reported in the interchange document.
    fn server(&self) -> &str;

    /// API account the run is authenticated as.
    fn username(&self) -> &str;

    /// One cheap authenticated round-trip, called before any work starts.
    fn probe(&self) -> ApiResult<()>;

    fn list_objects(&self, kind: ObjectType) -> ApiResult<Vec<ObjectRef>>;

    fn fetch_detail(&self, kind: ObjectType, id: u32) -> ApiResult<ManagedObject>;

    fn delete_object(&self, kind: ObjectType, id: u32) -> ApiResult<()>;
}

/// Run `op`, retrying transient failures up to [`RETRY_ATTEMPTS`] total
/// attempts.
pub fn with_retries<T, F>(mut op: F) -> ApiResult<T>
where
    F: FnMut() -> ApiResult<T>,
{
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < RETRY_ATTEMPTS => {
                log::warn!("transient failure on attempt {}: {}", attempt, err);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_transient_then_succeeds() {
        let mut calls = 0;
        let result = with_retries(|| {
            calls += 1;
            if calls < 3 {
                Err(ApiError::Transient("flap".into()))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn test_transient_exhausts_after_bound() {
        let mut calls = 0;
        let result: ApiResult<()> = with_retries(|| {
            calls += 1;
            Err(ApiError::Transient("down".into()))
        });
        assert_eq!(calls, RETRY_ATTEMPTS);
        assert!(matches!(result, Err(ApiError::Transient(_))));
    }

    #[test]
    fn test_permanent_is_not_retried() {
        let mut calls = 0;
        let result: ApiResult<()> = with_retries(|| {
            calls += 1;
            Err(ApiError::Unsupported("no mdm".into()))
        });
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(ApiError::Unsupported(_))));
    }
}
