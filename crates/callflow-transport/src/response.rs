//! Shared response handling for the HTTP clients.

use serde::de::DeserializeOwned;

use callflow_policy::TransportError;

pub(crate) fn request_error(err: reqwest::Error) -> TransportError {
    TransportError::Request {
        message: err.to_string(),
    }
}

/// Read a JSON body, mapping non-2xx statuses to
/// [`TransportError::Status`] with the body as the message.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, TransportError> {
    let status = response.status();
    let body = response.text().await.map_err(request_error)?;
    if !status.is_success() {
        return Err(TransportError::Status {
            status: status.as_u16(),
            message: body,
        });
    }
    serde_json::from_str(&body).map_err(|e| TransportError::Decode {
        message: e.to_string(),
    })
}

/// Discard the body of a response that only signals success.
pub(crate) async fn expect_success(response: reqwest::Response) -> Result<(), TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status {
        status: status.as_u16(),
        message: body,
    })
}
