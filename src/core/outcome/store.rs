//! Persistence boundary for call logs and orders.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::records::{CallOutcome, Order};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Receives one record per finished call.
#[async_trait]
pub trait CallLogStore: Send + Sync {
    async fn save_call(&self, outcome: &CallOutcome) -> Result<(), StoreError>;
}

/// Receives orders created by transactional reports.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn save_order(&self, order: &Order) -> Result<(), StoreError>;
}

/// In-memory store for both record kinds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    calls: Mutex<Vec<CallOutcome>>,
    orders: Mutex<Vec<Order>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<CallOutcome> {
        self.calls.lock().clone()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.lock().clone()
    }
}

#[async_trait]
impl CallLogStore for MemoryStore {
    async fn save_call(&self, outcome: &CallOutcome) -> Result<(), StoreError> {
        self.calls.lock().push(outcome.clone());
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        self.orders.lock().push(order.clone());
        Ok(())
    }
}

/// Append-only JSON lines file. One instance per file.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonLinesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append<T: Serialize + Sync>(&self, record: &T) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        debug!(path = %self.path.display(), "Appended record");
        Ok(())
    }
}

#[async_trait]
impl CallLogStore for JsonLinesStore {
    async fn save_call(&self, outcome: &CallOutcome) -> Result<(), StoreError> {
        self.append(outcome).await
    }
}

#[async_trait]
impl OrderStore for JsonLinesStore {
    async fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        self.append(order).await
    }
}
