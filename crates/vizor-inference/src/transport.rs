//! Shared request plumbing for provider clients.

use std::time::Duration;

use tracing::warn;

use vizor_core::{Error, Result};

/// Send `request` and return the response body of a 2xx answer.
///
/// Connection failures and non-2xx statuses become [`Error::Transport`].
pub(crate) async fn send_for_text(
    label: &str,
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<String> {
    let response = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| Error::Transport(format!("{} request failed: {}", label, e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Transport(format!("{} response unreadable: {}", label, e)))?;

    if !status.is_success() {
        warn!(
            subsystem = "inference",
            component = "transport",
            provider = label,
            status = status.as_u16(),
            "Provider returned an error status"
        );
        return Err(Error::Transport(format!(
            "{} API returned {}: {}",
            label,
            status,
            error_message(&body)
        )));
    }

    Ok(body)
}

/// Pull `error.message` out of a Google-style error body, else the raw body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}
