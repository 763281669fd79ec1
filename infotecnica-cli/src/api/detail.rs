//! Parallel technical-sheet fetcher
//!
//! One GET per entity ID against its ficha, capped by a `ConcurrencyLimiter`.
//! Results come back in input order whatever the worker count, and a failing
//! ID becomes a row of nulls instead of aborting the batch.

use std::time::{Duration, Instant};

use futures::future::join_all;
use log::{debug, info, warn};
use serde_json::Value;

use super::client::InfotecnicaClient;
use super::constants::Resource;
use super::error::FetchError;
use super::resilience::ConcurrencyLimiter;
use crate::table::{Cell, Result, Table};

/// Field inside each category object holding the displayed value
const VALUE_FIELD: &str = "valor_texto";

/// Column holding the entity ID in a detail table
pub const ID_COLUMN: &str = "id";

/// What to fetch for every ID
#[derive(Debug, Clone)]
pub struct DetailRequest<'a> {
    pub resource: Resource,
    /// Ficha slug, e.g. `general` or `limites-termicos`
    pub ficha: &'a str,
    /// Category keys to extract, in output column order
    pub categories: &'a [&'a str],
    /// Category key to column name; unmapped keys keep their key
    pub rename: &'a [(&'a str, &'a str)],
    pub workers: usize,
}

/// An ID whose ficha could not be fetched
#[derive(Debug, Clone, PartialEq)]
pub struct DetailFailure {
    pub id: Cell,
    pub status: Option<u16>,
    pub reason: String,
}

/// Result of one detail fetch
#[derive(Debug)]
pub struct DetailBatch {
    /// `id` plus one column per category, one row per input ID in input order
    pub table: Table,
    pub elapsed: Duration,
    pub failures: Vec<DetailFailure>,
}

impl DetailRequest<'_> {
    fn column_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.categories.len() + 1);
        names.push(ID_COLUMN.to_string());
        for category in self.categories {
            let name = self
                .rename
                .iter()
                .find(|(key, _)| key == category)
                .map_or(*category, |(_, name)| *name);
            names.push(name.to_string());
        }
        names
    }
}

/// Pull the requested categories out of a ficha body.
///
/// Missing categories and JSON null values become `Null`; non-string scalars
/// keep their textual form.
pub fn extract_attributes(body: &Value, categories: &[&str]) -> Vec<Cell> {
    categories
        .iter()
        .map(|category| {
            match body.get(*category).and_then(|entry| entry.get(VALUE_FIELD)) {
                None | Some(Value::Null) => Cell::Null,
                Some(Value::String(text)) => Cell::Text(text.clone()),
                Some(other) => Cell::Text(other.to_string()),
            }
        })
        .collect()
}

pub async fn fetch_details(
    client: &InfotecnicaClient,
    ids: &[Cell],
    request: &DetailRequest<'_>,
) -> Result<DetailBatch> {
    let limiter = ConcurrencyLimiter::with_workers(request.workers);
    let started = Instant::now();

    let fetches = ids.iter().map(|id| {
        let limiter = limiter.clone();
        async move {
            let Some(key) = id.key() else {
                return Err(DetailFailure {
                    id: id.clone(),
                    status: None,
                    reason: "empty id".to_string(),
                });
            };
            let _permit = limiter.acquire().await;
            client
                .get_ficha(request.resource, &key, request.ficha)
                .await
                .map_err(|e: FetchError| DetailFailure {
                    id: id.clone(),
                    status: e.status(),
                    reason: e.to_string(),
                })
        }
    });
    let responses = join_all(fetches).await;

    let mut rows = Vec::with_capacity(ids.len());
    let mut failures = Vec::new();
    for (id, response) in ids.iter().zip(responses) {
        let attributes = match response {
            Ok(body) => extract_attributes(&body, request.categories),
            Err(failure) => {
                match failure.status {
                    Some(status) => warn!("Error: HTTP {} for {} id {}", status, request.resource, id),
                    None => warn!("Error fetching {} id {}: {}", request.resource, id, failure.reason),
                }
                failures.push(failure);
                vec![Cell::Null; request.categories.len()]
            }
        };
        let mut row = Vec::with_capacity(attributes.len() + 1);
        row.push(id.clone());
        row.extend(attributes);
        rows.push(row);
    }
    let batch = DetailBatch {
        table: Table::from_rows(request.column_names().as_slice(), rows)?,
        elapsed: started.elapsed(),
        failures,
    };

    info!(
        "Fetched {} fichas ({}) for {} IDs in {:.2}s with {} workers, {} failed",
        request.ficha,
        request.resource,
        ids.len(),
        batch.elapsed.as_secs_f64(),
        limiter.max_concurrent_requests(),
        batch.failures.len()
    );
    let stats = limiter.stats();
    debug!(
        "{} requests, {:.0}% waited for a free worker",
        stats.requests_acquired,
        stats.wait_rate() * 100.0
    );

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::constants::fichas;
    use crate::api::transport::testing::StaticTransport;
    use serde_json::json;
    use std::sync::Arc;

    const CATEGORIES: &[&str] = &["5895", "1005"];
    const RENAME: &[(&str, &str)] = &[("5895", "Tensión nominal (kV)")];

    fn ficha_url(id: i64) -> String {
        format!(
            "https://api.test/v1/secciones-tramos/{}/fichas-tecnicas/general/",
            id
        )
    }

    fn transport(ids: &[i64], failing: Option<i64>) -> StaticTransport {
        let mut transport = StaticTransport::new();
        for &id in ids {
            if Some(id) == failing {
                transport = transport.route(&ficha_url(id), 500, json!({}));
            } else {
                transport = transport.route(
                    &ficha_url(id),
                    200,
                    json!({
                        "5895": {"valor_texto": format!("{}", id * 10)},
                        "1005": {"valor_texto": null},
                    }),
                );
            }
        }
        transport
    }

    fn request(workers: usize) -> DetailRequest<'static> {
        DetailRequest {
            resource: Resource::SectionSegments,
            ficha: fichas::GENERAL,
            categories: CATEGORIES,
            rename: RENAME,
            workers,
        }
    }

    #[test]
    fn test_extract_attributes() {
        let body = json!({
            "458": {"valor_texto": "600/5"},
            "6177": {"valor_texto": 0.6},
        });
        assert_eq!(
            extract_attributes(&body, &["458", "6177", "999"]),
            vec![Cell::text("600/5"), Cell::text("0.6"), Cell::Null]
        );
    }

    #[tokio::test]
    async fn test_order_preserved_for_any_worker_count() {
        let ids: Vec<i64> = (1..=25).collect();
        let cells: Vec<Cell> = ids.iter().map(|&id| Cell::Int(id)).collect();
        let client =
            InfotecnicaClient::new(Arc::new(transport(&ids, None)), "https://api.test/v1/", 1000);

        for workers in [1, 3, 40] {
            let batch = fetch_details(&client, &cells, &request(workers)).await.unwrap();
            assert!(batch.failures.is_empty());
            assert_eq!(batch.table.len(), ids.len());
            assert_eq!(
                batch.table.columns(),
                &["id", "Tensión nominal (kV)", "1005"]
            );
            for (row, id) in batch.table.rows().zip(&ids) {
                assert_eq!(row.get("id"), &Cell::Int(*id));
                assert_eq!(row.get("Tensión nominal (kV)"), &Cell::text((id * 10).to_string()));
                assert_eq!(row.get("1005"), &Cell::Null);
            }
        }
    }

    #[tokio::test]
    async fn test_failed_id_yields_null_row() {
        let ids = [1, 2, 3];
        let cells: Vec<Cell> = ids.iter().map(|&id| Cell::Int(id)).collect();
        let client = InfotecnicaClient::new(
            Arc::new(transport(&ids, Some(2))),
            "https://api.test/v1/",
            1000,
        );

        let batch = fetch_details(&client, &cells, &request(2)).await.unwrap();
        assert_eq!(batch.table.len(), 3);
        let failed = batch.table.row(1).unwrap();
        assert_eq!(failed.get("id"), &Cell::Int(2));
        assert_eq!(failed.get("Tensión nominal (kV)"), &Cell::Null);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].id, Cell::Int(2));
        assert_eq!(batch.failures[0].status, Some(500));
        assert_eq!(
            batch.table.row(2).unwrap().get("Tensión nominal (kV)"),
            &Cell::text("30")
        );
    }

    #[tokio::test]
    async fn test_float_ids_use_integer_key() {
        let client =
            InfotecnicaClient::new(Arc::new(transport(&[7], None)), "https://api.test/v1/", 1000);
        let batch = fetch_details(&client, &[Cell::Float(7.0)], &request(1)).await.unwrap();
        assert!(batch.failures.is_empty());
        assert_eq!(
            batch.table.row(0).unwrap().get("Tensión nominal (kV)"),
            &Cell::text("70")
        );
    }

    #[tokio::test]
    async fn test_empty_id_is_failure() {
        let client = InfotecnicaClient::new(
            Arc::new(StaticTransport::new()),
            "https://api.test/v1/",
            1000,
        );
        let batch = fetch_details(&client, &[Cell::Null], &request(1)).await.unwrap();
        assert_eq!(batch.table.len(), 1);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].status, None);
    }
}
