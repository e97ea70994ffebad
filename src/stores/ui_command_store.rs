use super::StoreError;
use async_trait::async_trait;
use std::time::Duration;

/// Last 5 minutes, capped at 5 rows, boolean-only.
const QUERY_WINDOW_SECS: u64 = 5 * 60;
const QUERY_ROW_LIMIT: u32 = 5;

#[async_trait]
pub trait UiCommandStore: Send + Sync {
    async fn has_recent(&self, unit: &str) -> Result<bool, StoreError>;
}

pub struct HttpUiCommandStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpUiCommandStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build UI command store HTTP client");
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl UiCommandStore for HttpUiCommandStore {
    async fn has_recent(&self, unit: &str) -> Result<bool, StoreError> {
        let resp = self
            .http
            .get(format!("{}/query", self.base_url))
            .query(&[
                ("equipmentId", unit.to_string()),
                ("source", "ui".to_string()),
                ("windowSecs", QUERY_WINDOW_SECS.to_string()),
                ("limit", QUERY_ROW_LIMIT.to_string()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(StoreError::ServerError(resp.status()));
        }

        #[derive(serde::Deserialize)]
        struct Row {}
        let rows: Vec<Row> = resp.json().await?;
        Ok(!rows.is_empty())
    }
}

/// Test fake: a set of unit ids with a "recent UI command" flag.
#[derive(Default)]
pub struct InMemoryUiCommandStore {
    recent: dashmap::DashSet<String>,
}

impl InMemoryUiCommandStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_recent(&self, unit: &str) {
        self.recent.insert(unit.to_string());
    }

    pub fn clear(&self, unit: &str) {
        self.recent.remove(unit);
    }
}

#[async_trait]
impl UiCommandStore for InMemoryUiCommandStore {
    async fn has_recent(&self, unit: &str) -> Result<bool, StoreError> {
        Ok(self.recent.contains(unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_false_until_marked() {
        let store = InMemoryUiCommandStore::new();
        assert!(!store.has_recent("fc-1").await.unwrap());
        store.mark_recent("fc-1");
        assert!(store.has_recent("fc-1").await.unwrap());
    }
}
