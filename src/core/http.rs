use std::time::Duration;

use reqwest::{
    header::{
        ACCEPT,
        USER_AGENT,
    },
    Client,
    Response,
    StatusCode,
};
use serde::de::DeserializeOwned;

use crate::core::StudioError;

pub fn http_client() -> Result<Client, StudioError> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| StudioError::Custom(format!("HTTP client build failed: {e}")))
}

/// GET a JSON document. A 404 is reported as `Ok(None)` so callers can pick a
/// fallback; every other non-success status is an error.
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
) -> Result<Option<T>, StudioError> {
    let resp = client
        .get(url)
        .header(USER_AGENT, "g2p-studio/0.1 (+reqwest)")
        .header(ACCEPT, "application/json")
        .send()
        .await?;

    if resp.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    ensure_success(&resp)?;
    Ok(Some(resp.json::<T>().await?))
}

fn ensure_success(resp: &Response) -> Result<(), StudioError> {
    if !resp.status().is_success() {
        return Err(StudioError::Custom(format!(
            "HTTP error {} from {}",
            resp.status(),
            resp.url()
        )));
    }
    Ok(())
}
