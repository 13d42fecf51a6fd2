// Small helpers around the blocking reqwest client shared by the NASA and
// Bluesky clients.

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, Result};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client used for every call in a run.
pub fn build_client() -> anyhow::Result<Client> {
    use anyhow::Context;

    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// Error document returned by XRPC endpoints.
#[derive(Debug, Deserialize)]
struct XrpcError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Best-effort human readable message from an error response body.
pub(crate) fn error_message(body: &str) -> String {
    match serde_json::from_str::<XrpcError>(body) {
        Ok(XrpcError {
            message: Some(message),
            ..
        }) => message,
        Ok(XrpcError {
            error: Some(error),
            message: None,
        }) => error,
        _ => body.trim().to_string(),
    }
}

/// Pass successful responses through; turn anything else into
/// `Error::Status` carrying the remote message.
pub(crate) fn ensure_success(res: Response, operation: &'static str) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    Err(Error::Status {
        operation,
        status,
        message: read_error_body(res),
    })
}

pub(crate) fn read_error_body(res: Response) -> String {
    let txt = res.text().unwrap_or_default();
    error_message(&txt)
}

/// Read the body as text and decode it, keeping transport and shape
/// failures apart.
pub(crate) fn decode_json<T: DeserializeOwned>(res: Response, operation: &'static str) -> Result<T> {
    let body = res.text().map_err(Error::network(operation))?;
    serde_json::from_str(&body).map_err(Error::decode(operation))
}

pub(crate) fn is_bad_request(status: StatusCode) -> bool {
    status == StatusCode::BAD_REQUEST
}
