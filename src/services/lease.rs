use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use crate::{
    errors::{AppError, AppResult},
    models::domain::TaskKind,
};

type LeaseKey = (String, TaskKind);

/// Allows at most one in-flight run per (document, task kind) in this process.
#[derive(Clone, Default)]
pub struct LeaseRegistry {
    held: Arc<Mutex<HashSet<LeaseKey>>>,
}

/// Releases its lease when dropped, whether the run succeeded or not.
#[derive(Debug)]
pub struct LeaseGuard {
    key: LeaseKey,
    held: Arc<Mutex<HashSet<LeaseKey>>>,
}

impl LeaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, document_id: &str, kind: TaskKind) -> AppResult<LeaseGuard> {
        let key = (document_id.to_string(), kind);
        let mut held = self
            .held
            .lock()
            .map_err(|_| AppError::InternalError("Lease registry lock poisoned".to_string()))?;

        if !held.insert(key.clone()) {
            log::warn!("Rejected concurrent {} run for document {}", kind, document_id);
            return Err(AppError::Conflict(format!(
                "A {} run is already in progress for document {}",
                kind, document_id
            )));
        }

        Ok(LeaseGuard {
            key,
            held: Arc::clone(&self.held),
        })
    }

    pub fn is_held(&self, document_id: &str, kind: TaskKind) -> bool {
        self.held
            .lock()
            .map(|held| held.contains(&(document_id.to_string(), kind)))
            .unwrap_or(false)
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if let Ok(mut held) = self.held.lock() {
            held.remove(&self.key);
        }
    }
}
