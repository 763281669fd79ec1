//! Infotécnica API client
//!
//! Thin wrapper over a `Transport` that knows the API root, how listings are
//! shaped and how to walk paginated resources.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use serde_json::Value;

use super::constants::{Resource, params};
use super::error::FetchError;
use super::pagination::{PageEnvelope, page_count};
use super::transport::{HttpSettings, ReqwestTransport, Transport};
use crate::config::ApiConfig;
use crate::table::Table;

#[derive(Clone)]
pub struct InfotecnicaClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    page_size: usize,
}

impl InfotecnicaClient {
    pub fn new(transport: Arc<dyn Transport>, base_url: &str, page_size: usize) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: page_size.max(1),
        }
    }

    /// Build a client with a reqwest transport from the `[api]` settings
    pub fn from_config(config: &ApiConfig) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new(&HttpSettings {
            accept_invalid_certs: config.accept_invalid_certs,
            timeout: config.timeout_secs.map(Duration::from_secs),
        })?;
        Ok(Self::new(
            Arc::new(transport),
            &config.base_url,
            config.page_size,
        ))
    }

    /// Absolute URL for a path relative to the API root
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let url = self.url(path);
        self.transport.get(&url, query).await?.into_json(&url)
    }

    /// Unpaginated listing: the body is a JSON array of records.
    ///
    /// A `{"results": [...]}` envelope is accepted as well.
    pub async fn fetch_list(&self, resource: Resource) -> Result<Vec<Value>, FetchError> {
        let url = self.url(resource.path());
        let value = self.get_json(resource.path(), &[]).await?;
        let records = match value {
            Value::Array(records) => records,
            Value::Object(mut map) => match map.remove("results") {
                Some(Value::Array(records)) => records,
                _ => {
                    return Err(FetchError::Envelope {
                        url,
                        reason: "expected a JSON array of records".to_string(),
                    });
                }
            },
            _ => {
                return Err(FetchError::Envelope {
                    url,
                    reason: "expected a JSON array of records".to_string(),
                });
            }
        };
        info!("Fetched {} records from {}", records.len(), resource);
        Ok(records)
    }

    /// Walk every page of a paginated listing.
    ///
    /// The first page gives the total `count`; the remaining pages are
    /// fetched in order. Any failing page fails the whole listing.
    pub async fn fetch_paginated(&self, resource: Resource) -> Result<Vec<Value>, FetchError> {
        let url = self.url(resource.path());
        let first = PageEnvelope::parse(&url, self.get_page(resource, 1).await?)?;
        let pages = page_count(first.count, self.page_size);
        debug!("{}: {} records over {} pages", resource, first.count, pages);

        let mut records = first.results;
        records.reserve(first.count.saturating_sub(records.len()));
        for page in 2..=pages {
            let envelope = PageEnvelope::parse(&url, self.get_page(resource, page).await?)?;
            records.extend(envelope.results);
        }

        info!("Fetched {} records from {}", records.len(), resource);
        Ok(records)
    }

    async fn get_page(&self, resource: Resource, page: usize) -> Result<Value, FetchError> {
        let query = [
            (params::PAGE, page.to_string()),
            (params::PAGE_SIZE, self.page_size.to_string()),
        ];
        self.get_json(resource.path(), &query).await
    }

    pub async fn list_table(&self, resource: Resource) -> Result<Table, FetchError> {
        Ok(Table::from_json_records(&self.fetch_list(resource).await?))
    }

    pub async fn paginated_table(&self, resource: Resource) -> Result<Table, FetchError> {
        Ok(Table::from_json_records(
            &self.fetch_paginated(resource).await?,
        ))
    }

    /// One entity's technical sheet
    pub async fn get_ficha(
        &self,
        resource: Resource,
        id: &str,
        ficha: &str,
    ) -> Result<Value, FetchError> {
        self.get_json(&resource.ficha_path(id, ficha), &[]).await
    }
}
