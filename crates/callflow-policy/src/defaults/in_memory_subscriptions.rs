//! In-memory subscription service with call counters and per-item failure
//! injection, built for exercising the reconciliation engine.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::errors::TransportError;
use crate::traits::SubscriptionService;
use crate::types::{EventSubscription, SubscriptionDraft, SubscriptionUpdate};

/// Which calls should fail, keyed the way a test injects them.
#[derive(Default)]
struct Failures {
    list: bool,
    create_names: HashSet<String>,
    update_ids: HashSet<String>,
    delete_ids: HashSet<String>,
}

/// In-memory implementation of [`SubscriptionService`].
///
/// Uses `BTreeMap` for deterministic iteration order (project convention).
pub struct InMemorySubscriptionService {
    subscriptions: Arc<RwLock<BTreeMap<String, EventSubscription>>>,
    failures: Arc<RwLock<Failures>>,
    next_id: AtomicU64,
    list_count: AtomicUsize,
    create_count: AtomicUsize,
    update_count: AtomicUsize,
    delete_count: AtomicUsize,
}

impl InMemorySubscriptionService {
    pub fn new() -> Self {
        Self {
            subscriptions: Arc::new(RwLock::new(BTreeMap::new())),
            failures: Arc::new(RwLock::new(Failures::default())),
            next_id: AtomicU64::new(1),
            list_count: AtomicUsize::new(0),
            create_count: AtomicUsize::new(0),
            update_count: AtomicUsize::new(0),
            delete_count: AtomicUsize::new(0),
        }
    }

    /// Place a pre-existing subscription, as if an earlier save created it.
    pub async fn seed(&self, policy_id: u64, id: &str, name: &str, event_type: &str) {
        let sub = EventSubscription {
            id: id.to_string(),
            name: name.to_string(),
            event_type: event_type.to_string(),
            policy_id,
            enabled: true,
            config: serde_json::Value::Null,
            organization_id: "org-test".to_string(),
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        self.subscriptions.write().await.insert(id.to_string(), sub);
    }

    /// Everything stored for a policy, in id order.
    pub async fn stored(&self, policy_id: u64) -> Vec<EventSubscription> {
        self.subscriptions
            .read()
            .await
            .values()
            .filter(|s| s.policy_id == policy_id)
            .cloned()
            .collect()
    }

    pub async fn fail_list(&self) {
        self.failures.write().await.list = true;
    }

    pub async fn fail_create_named(&self, name: &str) {
        self.failures.write().await.create_names.insert(name.to_string());
    }

    pub async fn fail_update(&self, subscription_id: &str) {
        self.failures
            .write()
            .await
            .update_ids
            .insert(subscription_id.to_string());
    }

    pub async fn fail_delete(&self, subscription_id: &str) {
        self.failures
            .write()
            .await
            .delete_ids
            .insert(subscription_id.to_string());
    }

    pub async fn clear_failures(&self) {
        *self.failures.write().await = Failures::default();
    }

    pub fn list_calls(&self) -> usize {
        self.list_count.load(Ordering::SeqCst)
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

    fn server_error(what: &str) -> TransportError {
        TransportError::Status {
            status: 500,
            message: format!("injected {what} failure"),
        }
    }
}

impl Default for InMemorySubscriptionService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionService for InMemorySubscriptionService {
    async fn list(&self, policy_id: u64) -> Result<Vec<EventSubscription>, TransportError> {
        self.list_count.fetch_add(1, Ordering::SeqCst);
        if self.failures.read().await.list {
            return Err(Self::server_error("list"));
        }
        Ok(self.stored(policy_id).await)
    }

    async fn create(&self, draft: &SubscriptionDraft) -> Result<EventSubscription, TransportError> {
        self.create_count.fetch_add(1, Ordering::SeqCst);
        if self.failures.read().await.create_names.contains(&draft.name) {
            return Err(Self::server_error("create"));
        }
        let id = format!("sub-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let sub = EventSubscription {
            id: id.clone(),
            name: draft.name.clone(),
            event_type: draft.event_type.clone(),
            policy_id: draft.policy_id,
            enabled: draft.enabled,
            config: draft.config.clone(),
            organization_id: "org-test".to_string(),
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        self.subscriptions.write().await.insert(id, sub.clone());
        Ok(sub)
    }

    async fn update(
        &self,
        subscription_id: &str,
        changes: &SubscriptionUpdate,
    ) -> Result<EventSubscription, TransportError> {
        self.update_count.fetch_add(1, Ordering::SeqCst);
        if self
            .failures
            .read()
            .await
            .update_ids
            .contains(subscription_id)
        {
            return Err(Self::server_error("update"));
        }
        let mut map = self.subscriptions.write().await;
        let sub = map.get_mut(subscription_id).ok_or(TransportError::Status {
            status: 404,
            message: format!("subscription not found: {subscription_id}"),
        })?;
        sub.name = changes.name.clone();
        sub.event_type = changes.event_type.clone();
        sub.enabled = changes.enabled;
        if let Some(ref config) = changes.config {
            sub.config = config.clone();
        }
        sub.updated_at = Some(Utc::now());
        Ok(sub.clone())
    }

    async fn delete(&self, subscription_id: &str) -> Result<(), TransportError> {
        self.delete_count.fetch_add(1, Ordering::SeqCst);
        if self
            .failures
            .read()
            .await
            .delete_ids
            .contains(subscription_id)
        {
            return Err(Self::server_error("delete"));
        }
        self.subscriptions
            .write()
            .await
            .remove(subscription_id)
            .map(|_| ())
            .ok_or(TransportError::Status {
                status: 404,
                message: format!("subscription not found: {subscription_id}"),
            })
    }
}
