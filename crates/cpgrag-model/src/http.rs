//! Shared blocking HTTP plumbing for the remote providers.

use std::time::Duration;

use reqwest::blocking::{Client, Response};

use crate::error::{ModelError, ModelResult};

/// Build a blocking client with the given request timeout.
pub(crate) fn build_client(provider: &str, timeout_secs: u64) -> ModelResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ModelError::ProviderNotAvailable {
            provider: provider.to_string(),
            reason: format!("failed to build HTTP client: {e}"),
        })
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Map a transport failure onto the error the caller can act on.
pub(crate) fn transport_error(err: reqwest::Error, endpoint: &str, timeout_secs: u64) -> ModelError {
    if err.is_timeout() {
        ModelError::Timeout {
            endpoint: endpoint.to_string(),
            seconds: timeout_secs,
        }
    } else {
        ModelError::Unreachable {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }
}

/// Turn a non-success status into [`ModelError::Api`], keeping the body.
pub(crate) fn check_status(provider: &str, response: Response) -> ModelResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(ModelError::Api {
        provider: provider.to_string(),
        status: status.as_u16(),
        body,
    })
}
