//! Writer & Command Extraction: turns algorithm outputs into
//! durable, timestamped command records, filtered through a closed
//! per-kind allowlist.

mod allowlist;

pub use allowlist::actionable_commands;

use crate::logic::ResultRecord;
use crate::types::{CommandRecord, EquipmentKind};
use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("writer store returned status {0}")]
    ServerError(reqwest::StatusCode),
}

#[async_trait]
pub trait CommandWriter: Send + Sync {
    async fn write_batch(&self, commands: &[CommandRecord]) -> Result<(), WriterError>;
}

/// Filters a Logic Host's raw output through the kind's actionable-command
/// allowlist and stamps each surviving pair into a [`CommandRecord`].
pub fn extract_commands(
    equipment_id: &str,
    site_id: u32,
    kind: EquipmentKind,
    results: &[ResultRecord],
) -> Vec<CommandRecord> {
    let allowlist = actionable_commands(kind);
    let emitted_at_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    results
        .iter()
        .filter(|r| allowlist.contains(&r.command_name.as_str()))
        .map(|r| {
            CommandRecord::new(
                equipment_id,
                site_id,
                kind,
                &r.command_name,
                r.value.clone(),
                emitted_at_nanos,
            )
        })
        .collect()
}

pub struct HttpCommandWriter {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCommandWriter {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build command writer HTTP client");
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CommandWriter for HttpCommandWriter {
    async fn write_batch(&self, commands: &[CommandRecord]) -> Result<(), WriterError> {
        if commands.is_empty() {
            return Ok(());
        }
        let resp = self
            .http
            .post(format!("{}/commands/batch", self.base_url))
            .json(commands)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(WriterError::ServerError(resp.status()))
        }
    }
}

/// Test fake: records every batch it was handed, in order.
#[derive(Default)]
pub struct InMemoryCommandWriter {
    batches: std::sync::Mutex<Vec<Vec<CommandRecord>>>,
}

impl InMemoryCommandWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Vec<CommandRecord>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandWriter for InMemoryCommandWriter {
    async fn write_batch(&self, commands: &[CommandRecord]) -> Result<(), WriterError> {
        self.batches.lock().unwrap().push(commands.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CommandValue;

    #[test]
    fn extract_commands_drops_non_allowlisted_names() {
        let results = vec![
            ResultRecord::new("coolingEnable", CommandValue::Bool(true)),
            ResultRecord::new("notActionable", CommandValue::Number(1.0)),
        ];
        let records = extract_commands("fc-1", 1, EquipmentKind::FanCoil, &results);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].command_type, "coolingEnable");
    }

    #[tokio::test]
    async fn in_memory_writer_records_batches_in_order() {
        let writer = InMemoryCommandWriter::new();
        let batch = vec![CommandRecord::new(
            "fc-1",
            1,
            EquipmentKind::FanCoil,
            "coolingEnable",
            CommandValue::Bool(true),
            0,
        )];
        writer.write_batch(&batch).await.unwrap();
        assert_eq!(writer.batches().len(), 1);
    }
}
