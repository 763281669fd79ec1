//! REUC company registry client

use std::sync::Arc;
use std::time::Duration;

use log::info;
use serde_json::Value;

use super::constants::params;
use super::error::FetchError;
use super::transport::{HttpSettings, ReqwestTransport, Transport};
use crate::config::ReucConfig;
use crate::table::Table;

/// Client for the registry's coordinated-companies endpoint.
///
/// The key travels as the `user_key` query parameter and is never logged.
#[derive(Clone)]
pub struct ReucClient {
    transport: Arc<dyn Transport>,
    url: String,
    api_key: String,
}

impl std::fmt::Debug for ReucClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReucClient")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ReucClient {
    pub fn new(transport: Arc<dyn Transport>, url: &str, api_key: String) -> Self {
        Self {
            transport,
            url: url.to_string(),
            api_key,
        }
    }

    pub fn from_config(
        config: &ReucConfig,
        api_key: Option<String>,
        accept_invalid_certs: bool,
    ) -> Result<Self, FetchError> {
        let api_key = api_key.ok_or(FetchError::MissingApiKey)?;
        let transport = ReqwestTransport::new(&HttpSettings {
            accept_invalid_certs,
            timeout: Some(Duration::from_secs(config.timeout_secs)),
        })?;
        Ok(Self::new(Arc::new(transport), &config.base_url, api_key))
    }

    /// Every registered company as raw JSON records
    pub async fn fetch_agents(&self) -> Result<Vec<Value>, FetchError> {
        let query = [(params::USER_KEY, self.api_key.clone())];
        let value = self
            .transport
            .get(&self.url, &query)
            .await?
            .into_json(&self.url)?;
        let records = match value {
            Value::Array(records) => records,
            record @ Value::Object(_) => vec![record],
            _ => {
                return Err(FetchError::Envelope {
                    url: self.url.clone(),
                    reason: "expected a JSON array of companies".to_string(),
                });
            }
        };
        info!("Fetched {} companies from the REUC registry", records.len());
        Ok(records)
    }

    /// Registry flattened to a table, nested fields joined with `.`
    pub async fn agents_table(&self) -> Result<Table, FetchError> {
        Ok(Table::from_json_records(&self.fetch_agents().await?))
    }
}
