//! Page envelope of paginated listings

use serde::Deserialize;
use serde_json::Value;

use super::error::FetchError;

/// `{"count": N, "results": [...]}` as returned by paginated resources
#[derive(Debug, Clone, Deserialize)]
pub struct PageEnvelope {
    pub count: usize,
    #[serde(default)]
    pub results: Vec<Value>,
}

impl PageEnvelope {
    pub fn parse(url: &str, value: Value) -> Result<Self, FetchError> {
        serde_json::from_value(value).map_err(|e| FetchError::Envelope {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Number of pages needed for `count` records at `page_size` per page
pub fn page_count(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1))
}
