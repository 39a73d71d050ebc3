use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::error::AppError;
use crate::models::CrawlResult;
use crate::traits::ResultStore;

/// A process-local [`ResultStore`] for runs that do not need a database.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<Uuid, CrawlResult>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record, oldest first.
    pub fn all(&self) -> Result<Vec<CrawlResult>, AppError> {
        let records = self.records.read().map_err(poisoned)?;
        let mut all: Vec<CrawlResult> = records.values().cloned().collect();
        all.sort_by_key(|r| r.created_at);
        Ok(all)
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> AppError {
    AppError::Generic("memory store lock poisoned".to_string())
}

impl ResultStore for MemoryStore {
    async fn create(&self, result: &CrawlResult) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        let mut record = result.clone();
        record.id = id;
        self.records.write().map_err(poisoned)?.insert(id, record);
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<CrawlResult, AppError> {
        self.records
            .read()
            .map_err(poisoned)?
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("crawl result {id}")))
    }

    async fn update(&self, result: &CrawlResult) -> Result<(), AppError> {
        let mut records = self.records.write().map_err(poisoned)?;
        match records.get_mut(&result.id) {
            Some(slot) => {
                *slot = result.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("crawl result {}", result.id))),
        }
    }
}
