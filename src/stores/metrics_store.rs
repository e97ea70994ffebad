use super::StoreError;
use crate::types::MetricSnapshot;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Last 15 minutes, newest-first, capped at 100 rows.
const QUERY_WINDOW_SECS: u64 = 15 * 60;
const QUERY_ROW_LIMIT: u32 = 100;

#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn recent_metrics(&self, unit: &str, site: u32) -> Result<MetricSnapshot, StoreError>;
}

pub struct HttpMetricsStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpMetricsStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build metrics store HTTP client");
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MetricsStore for HttpMetricsStore {
    async fn recent_metrics(&self, unit: &str, site: u32) -> Result<MetricSnapshot, StoreError> {
        let resp = self
            .http
            .get(format!("{}/query", self.base_url))
            .query(&[
                ("equipmentId", unit.to_string()),
                ("siteId", site.to_string()),
                ("windowSecs", QUERY_WINDOW_SECS.to_string()),
                ("limit", QUERY_ROW_LIMIT.to_string()),
                ("order", "desc".to_string()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(StoreError::ServerError(resp.status()));
        }

        let rows: Vec<HashMap<String, serde_json::Value>> = resp.json().await?;
        let numeric_rows: Vec<HashMap<String, f64>> = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .filter_map(|(name, value)| value.as_f64().map(|v| (name, v)))
                    .collect()
            })
            .collect();

        Ok(MetricSnapshot::flatten(unit, &numeric_rows))
    }
}

/// Test fake: returns whatever snapshot was seeded for a unit, or an empty
/// one if none was seeded.
#[derive(Default)]
pub struct InMemoryMetricsStore {
    seeded: dashmap::DashMap<String, MetricSnapshot>,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, unit: &str, snapshot: MetricSnapshot) {
        self.seeded.insert(unit.to_string(), snapshot);
    }
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn recent_metrics(&self, unit: &str, _site: u32) -> Result<MetricSnapshot, StoreError> {
        Ok(self
            .seeded
            .get(unit)
            .map(|entry| entry.clone())
            .unwrap_or_else(|| MetricSnapshot::empty(unit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_returns_empty_snapshot_when_unseeded() {
        let store = InMemoryMetricsStore::new();
        let snap = store.recent_metrics("fc-1", 1).await.unwrap();
        assert!(snap.fields.is_empty());
    }

    #[tokio::test]
    async fn in_memory_store_returns_seeded_snapshot() {
        let store = InMemoryMetricsStore::new();
        let mut snap = MetricSnapshot::empty("fc-1");
        snap.fields.insert("roomTemp".to_string(), 74.0);
        store.seed("fc-1", snap);
        let fetched = store.recent_metrics("fc-1", 1).await.unwrap();
        assert_eq!(fetched.get("roomTemp"), Some(74.0));
    }
}
