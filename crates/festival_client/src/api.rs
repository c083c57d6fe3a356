use client_logging::{client_debug, client_warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::stream::{build_client, map_reqwest_error};
use crate::{FailureKind, StreamError, StreamSettings};

/// Plain request/response calls against the analysis server.
#[derive(Debug, Clone)]
pub(crate) struct JsonApi {
    settings: StreamSettings,
    client: reqwest::Client,
}

impl JsonApi {
    pub(crate) fn new(settings: StreamSettings) -> Result<Self, StreamError> {
        let client = build_client(&settings)?;
        Ok(Self { settings, client })
    }

    pub(crate) fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, StreamError> {
        let url = self.settings.endpoint_url(endpoint)?;
        client_debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(endpoint, response).await
    }

    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<T, StreamError> {
        let url = self.settings.endpoint_url(endpoint)?;
        client_debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(endpoint, response).await
    }
}

async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<T, StreamError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;

    if !status.is_success() {
        client_warn!("{} failed with status {}", endpoint, status);
        let message = error_detail(&bytes).unwrap_or_else(|| status.to_string());
        return Err(StreamError::new(
            FailureKind::HttpStatus(status.as_u16()),
            message,
        ));
    }

    serde_json::from_slice(&bytes).map_err(|err| {
        StreamError::new(
            FailureKind::Protocol,
            format!("unexpected response from {endpoint}: {err}"),
        )
    })
}

/// The server explains rejected requests as `{"detail": "..."}`.
fn error_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
        _ => None,
    }
}
