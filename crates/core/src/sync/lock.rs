//! Run locks
//!
//! [`LocalRunLock`] guards overlapping runs inside one process.
//! [`LayeredRunLock`] stacks it with locks that span processes (the Postgres
//! advisory lock lives in infra).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dealsync_domain::{DealSyncError, Result};
use tracing::warn;

use super::ports::RunLock;

/// In-process single-flight lock keyed by job name.
#[derive(Debug, Default)]
pub struct LocalRunLock {
    held: Mutex<HashSet<String>>,
}

impl LocalRunLock {
    /// An empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is currently held
    pub fn is_held(&self, key: &str) -> bool {
        self.held.lock().map(|held| held.contains(key)).unwrap_or(false)
    }
}

#[async_trait]
impl RunLock for LocalRunLock {
    async fn try_acquire(&self, key: &str) -> Result<bool> {
        let mut held = self
            .held
            .lock()
            .map_err(|_| DealSyncError::Internal("run lock state poisoned".into()))?;
        Ok(held.insert(key.to_string()))
    }

    async fn release(&self, key: &str) -> Result<()> {
        let mut held = self
            .held
            .lock()
            .map_err(|_| DealSyncError::Internal("run lock state poisoned".into()))?;
        held.remove(key);
        Ok(())
    }
}

/// Acquires several locks in order; all or none are held.
pub struct LayeredRunLock {
    layers: Vec<Arc<dyn RunLock>>,
}

impl LayeredRunLock {
    /// Layers are acquired first to last and released in reverse.
    pub fn new(layers: Vec<Arc<dyn RunLock>>) -> Self {
        Self { layers }
    }

    async fn release_layers(layers: &[Arc<dyn RunLock>], key: &str) -> Result<()> {
        let mut first_error = None;
        for layer in layers.iter().rev() {
            if let Err(err) = layer.release(key).await {
                warn!(key, error = %err, "Failed to release run lock layer");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl RunLock for LayeredRunLock {
    async fn try_acquire(&self, key: &str) -> Result<bool> {
        for (index, layer) in self.layers.iter().enumerate() {
            let acquired = match layer.try_acquire(key).await {
                Ok(acquired) => acquired,
                Err(err) => {
                    let _ = Self::release_layers(&self.layers[..index], key).await;
                    return Err(err);
                }
            };
            if !acquired {
                Self::release_layers(&self.layers[..index], key).await?;
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn release(&self, key: &str) -> Result<()> {
        Self::release_layers(&self.layers, key).await
    }
}
