use smm_common::remote::RemoteApiError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Could not initialize HTTP client: {0}")]
pub struct ClientInitError(pub String);

/// Timeouts, refused connections and TLS failures all end up here. They are always worth retrying.
pub(crate) fn transport_error(e: reqwest::Error) -> RemoteApiError {
    if e.is_decode() {
        RemoteApiError::InvalidResponse(e.to_string())
    } else {
        RemoteApiError::Transport(e.to_string())
    }
}
