use reqwest::StatusCode;

/// A request that never produced a usable response.
///
/// A response whose `success` field is false is not an error; it reaches the
/// caller as a regular [`crate::model::CommandResponse`].
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Request(String),

    #[error("endpoint answered {0}")]
    Status(StatusCode),

    #[error("response body is not JSON: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ControlError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ControlError::Timeout
        } else if let Some(status) = e.status() {
            ControlError::Status(status)
        } else if e.is_decode() {
            ControlError::Decode(e.to_string())
        } else {
            ControlError::Request(e.to_string())
        }
    }
}
