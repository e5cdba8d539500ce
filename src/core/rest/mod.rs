//! REST calls against the EVI API.
//!
//! Only the listing endpoints are wrapped. Pagination parameters are passed
//! through untouched.

mod models;

pub use models::{ChatSummary, ChatsPage, ConfigRef, ConfigSummary, ConfigsPage};

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::core::evi::{AuthScheme, EviError, EviResult};

/// HTTP client for the EVI REST endpoints.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    auth_scheme: AuthScheme,
}

impl RestClient {
    /// Create a client with its own connection pool.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        auth_scheme: AuthScheme,
        request_timeout: Duration,
    ) -> EviResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| EviError::InvalidConfiguration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            auth_scheme,
        })
    }

    pub fn from_config(config: &ClientConfig) -> EviResult<Self> {
        Self::new(
            config.api_key.clone(),
            config.base_url.clone(),
            config.auth_scheme,
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `GET {base}/evi/configs`.
    pub async fn list_configs(
        &self,
        page_number: Option<u32>,
        page_size: Option<u32>,
    ) -> EviResult<ConfigsPage> {
        let mut query = Vec::new();
        push_param(&mut query, "page_number", page_number);
        push_param(&mut query, "page_size", page_size);

        self.get_json("/evi/configs", &query).await
    }

    /// `GET {base}/evi/chats`.
    pub async fn list_chats(
        &self,
        page_number: Option<u32>,
        page_size: Option<u32>,
        ascending_order: Option<bool>,
    ) -> EviResult<ChatsPage> {
        let mut query = Vec::new();
        push_param(&mut query, "page_number", page_number);
        push_param(&mut query, "page_size", page_size);
        push_param(&mut query, "ascending_order", ascending_order);

        self.get_json("/evi/chats", &query).await
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> EviResult<T> {
        let url = self.endpoint(path);
        debug!("GET {url}");

        let mut request = self
            .http
            .get(&url)
            .query(query)
            .header("Accept", "application/json");
        for (name, value) in self.auth_scheme.headers(&self.api_key) {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                EviError::Timeout(format!("GET {path}: {e}"))
            } else {
                EviError::Request(format!("GET {path}: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EviError::Request(format!("reading {path} response: {e}")))?;

        if status != StatusCode::OK {
            warn!("GET {path} failed: status={status}");
            return Err(EviError::Http {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| EviError::Decode(format!("{path}: {e}")))
    }
}

fn push_param<T: ToString>(query: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<T>) {
    if let Some(value) = value {
        query.push((key, value.to_string()));
    }
}
