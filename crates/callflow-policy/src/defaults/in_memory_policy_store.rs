//! In-memory policy store for tests and short-lived processes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::TransportError;
use crate::traits::PolicyStore;
use crate::types::PolicyDocument;

/// In-memory implementation of [`PolicyStore`]. Assigns numeric ids the
/// way the remote engine does, on first create.
pub struct InMemoryPolicyStore {
    documents: Arc<RwLock<BTreeMap<u64, PolicyDocument>>>,
    next_id: AtomicU64,
    fail_writes: AtomicBool,
    create_count: AtomicUsize,
    update_count: AtomicUsize,
    delete_count: AtomicUsize,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: AtomicU64::new(100),
            fail_writes: AtomicBool::new(false),
            create_count: AtomicUsize::new(0),
            update_count: AtomicUsize::new(0),
            delete_count: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent write fail with a server error.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub async fn stored(&self, policy_id: u64) -> Option<PolicyDocument> {
        self.documents.read().await.get(&policy_id).cloned()
    }

    pub fn create_calls(&self) -> usize {
        self.create_count.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_count.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_count.load(Ordering::SeqCst)
    }

    fn check_failure(&self, what: &str) -> Result<(), TransportError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(TransportError::Status {
                status: 500,
                message: format!("injected {what} failure"),
            })
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn create(&self, document: &PolicyDocument) -> Result<PolicyDocument, TransportError> {
        self.create_count.fetch_add(1, Ordering::SeqCst);
        self.check_failure("create")?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut stored = document.clone();
        stored.id = Some(id);
        self.documents.write().await.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        policy_id: u64,
        document: &PolicyDocument,
    ) -> Result<PolicyDocument, TransportError> {
        self.update_count.fetch_add(1, Ordering::SeqCst);
        self.check_failure("update")?;
        let mut map = self.documents.write().await;
        if !map.contains_key(&policy_id) {
            return Err(TransportError::Status {
                status: 404,
                message: format!("policy not found: {policy_id}"),
            });
        }
        let mut stored = document.clone();
        stored.id = Some(policy_id);
        map.insert(policy_id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, policy_id: u64) -> Result<(), TransportError> {
        self.delete_count.fetch_add(1, Ordering::SeqCst);
        self.check_failure("delete")?;
        self.documents
            .write()
            .await
            .remove(&policy_id)
            .map(|_| ())
            .ok_or(TransportError::Status {
                status: 404,
                message: format!("policy not found: {policy_id}"),
            })
    }
}
