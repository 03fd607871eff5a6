//! Event-subscription reconciliation engine.
//!
//! Drives the remote subscription set for a policy toward the graph's
//! desired event-node set: update linked items, create unlinked ones,
//! delete orphans. There is no multi-item transaction and no rollback;
//! each item's outcome is independent, and a failed item is simply retried
//! on the next pass (typically the next policy save). The only hard
//! ordering dependency is that the existing set must be fetched before any
//! write, because both the update matching and the orphan set derive from
//! it.

use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::ReconcileError;
use crate::traits::SubscriptionService;
use crate::types::{DesiredEventNode, EventSubscription};

/// One reconciliation pass per call; holds no state between passes.
pub struct SubscriptionReconciler {
    service: Arc<dyn SubscriptionService>,
}

impl SubscriptionReconciler {
    pub fn new(service: Arc<dyn SubscriptionService>) -> Self {
        Self { service }
    }

    /// Converge the remote subscription set for `policy_id` toward
    /// `desired`.
    ///
    /// Returns the subscriptions now active for the policy: every
    /// successful update and create of this pass. Orphan deletions are
    /// never part of the result. Item failures are logged and skipped; the
    /// only hard failure is the initial fetch, without which neither the
    /// update matching nor the orphan set can be computed.
    pub async fn reconcile(
        &self,
        policy_id: u64,
        desired: &[DesiredEventNode],
    ) -> Result<Vec<EventSubscription>, ReconcileError> {
        let existing = self
            .service
            .list(policy_id)
            .await
            .map_err(|source| ReconcileError::Fetch { policy_id, source })?;

        let mut active = Vec::new();

        // Linked items route to update, never back to create.
        for node in desired.iter().filter(|n| n.subscription_id.is_some()) {
            let subscription_id = node.subscription_id.as_deref().unwrap_or_default();
            match self
                .service
                .update(subscription_id, &node.to_update())
                .await
            {
                Ok(updated) => active.push(updated),
                Err(err) => {
                    // Soft failure: the next pass re-issues the update.
                    tracing::warn!(
                        policy_id,
                        subscription_id,
                        node_id = %node.node_id,
                        error = %err,
                        "subscription update failed, deferring to next pass"
                    );
                }
            }
        }

        // Unlinked items route to create. A failed create leaves the item
        // unlinked; the next pass tries again.
        for node in desired.iter().filter(|n| n.subscription_id.is_none()) {
            match self.service.create(&node.to_draft(policy_id)).await {
                Ok(created) => active.push(created),
                Err(err) => {
                    tracing::warn!(
                        policy_id,
                        node_id = %node.node_id,
                        error = %err,
                        "subscription create failed, deferring to next pass"
                    );
                }
            }
        }

        // Orphans: remote subscriptions no desired item claims. A failed
        // delete leaves the orphan in place for the next pass.
        let claimed: HashSet<&str> = desired
            .iter()
            .filter_map(|n| n.subscription_id.as_deref())
            .collect();
        for orphan in existing.iter().filter(|s| !claimed.contains(s.id.as_str())) {
            if let Err(err) = self.service.delete(&orphan.id).await {
                tracing::warn!(
                    policy_id,
                    subscription_id = %orphan.id,
                    error = %err,
                    "orphan subscription delete failed, deferring to next pass"
                );
            }
        }

        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::InMemorySubscriptionService;
    use serde_json::json;

    fn unlinked(node_id: &str, name: &str, event_type: &str) -> DesiredEventNode {
        DesiredEventNode {
            node_id: node_id.to_string(),
            name: name.to_string(),
            event_type: event_type.to_string(),
            enabled: true,
            config: json!({ "nodeId": node_id }),
            subscription_id: None,
        }
    }

    fn linked(node_id: &str, name: &str, event_type: &str, sub_id: &str) -> DesiredEventNode {
        DesiredEventNode {
            subscription_id: Some(sub_id.to_string()),
            ..unlinked(node_id, name, event_type)
        }
    }

    #[tokio::test]
    async fn creates_all_unlinked_items() {
        let service = Arc::new(InMemorySubscriptionService::new());
        let reconciler = SubscriptionReconciler::new(service.clone());

        let desired = vec![
            unlinked("node-1", "Event 1", "salesforce"),
            unlinked("node-2", "Event 2", "webhook"),
        ];
        let active = reconciler.reconcile(100, &desired).await.unwrap();

        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|s| !s.id.is_empty()));
        assert_eq!(service.stored(100).await.len(), 2);
        assert_eq!(service.create_calls(), 2);
        assert_eq!(service.delete_calls(), 0);
    }

    #[tokio::test]
    async fn second_pass_with_linked_ids_is_idempotent() {
        let service = Arc::new(InMemorySubscriptionService::new());
        let reconciler = SubscriptionReconciler::new(service.clone());

        let desired = vec![
            unlinked("node-1", "Event 1", "salesforce"),
            unlinked("node-2", "Event 2", "webhook"),
        ];
        let first = reconciler.reconcile(100, &desired).await.unwrap();
        let snapshot = |subs: &[EventSubscription]| -> Vec<(String, String, String, bool)> {
            subs.iter()
                .map(|s| (s.id.clone(), s.name.clone(), s.event_type.clone(), s.enabled))
                .collect()
        };
        let after_first = snapshot(&service.stored(100).await);

        // The caller persists returned ids; the next pass sees linked items.
        let desired: Vec<DesiredEventNode> = desired
            .iter()
            .zip(&first)
            .map(|(node, sub)| linked(&node.node_id, &node.name, &node.event_type, &sub.id))
            .collect();
        let second = reconciler.reconcile(100, &desired).await.unwrap();

        assert_eq!(second.len(), 2);
        assert_eq!(service.create_calls(), 2, "no further creates");
        assert_eq!(service.delete_calls(), 0, "no further deletes");
        assert_eq!(
            snapshot(&service.stored(100).await),
            after_first,
            "remote state unchanged"
        );
    }

    #[tokio::test]
    async fn failed_create_skipped_without_aborting_the_rest() {
        // First create fails with a server error, second succeeds; the
        // result is exactly the one created subscription.
        let service = Arc::new(InMemorySubscriptionService::new());
        service.fail_create_named("Event 1").await;
        let reconciler = SubscriptionReconciler::new(service.clone());

        let desired = vec![
            unlinked("node-1", "Event 1", "salesforce"),
            unlinked("node-2", "Event 2", "webhook"),
        ];
        let active = reconciler.reconcile(100, &desired).await.unwrap();

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Event 2");
        assert_eq!(active[0].event_type, "webhook");
        assert_eq!(service.create_calls(), 2, "both creates attempted");
    }

    #[tokio::test]
    async fn empty_desired_set_deletes_every_orphan() {
        let service = Arc::new(InMemorySubscriptionService::new());
        service.seed(100, "sub-orphan-1", "Old 1", "salesforce").await;
        service.seed(100, "sub-orphan-2", "Old 2", "webhook").await;
        let reconciler = SubscriptionReconciler::new(service.clone());

        let active = reconciler.reconcile(100, &[]).await.unwrap();

        assert!(active.is_empty());
        assert_eq!(service.delete_calls(), 2);
        assert!(service.stored(100).await.is_empty());
    }

    #[tokio::test]
    async fn failed_orphan_delete_leaves_it_for_the_next_pass() {
        let service = Arc::new(InMemorySubscriptionService::new());
        service.seed(100, "sub-orphan-1", "Old 1", "salesforce").await;
        service.seed(100, "sub-orphan-2", "Old 2", "webhook").await;
        service.fail_delete("sub-orphan-1").await;
        let reconciler = SubscriptionReconciler::new(service.clone());

        let active = reconciler.reconcile(100, &[]).await.unwrap();
        assert!(active.is_empty());
        // Both deletes attempted regardless of the first one's outcome.
        assert_eq!(service.delete_calls(), 2);
        let remaining = service.stored(100).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "sub-orphan-1");

        // Next pass converges.
        service.clear_failures().await;
        reconciler.reconcile(100, &[]).await.unwrap();
        assert!(service.stored(100).await.is_empty());
    }

    #[tokio::test]
    async fn linked_items_route_to_update_and_orphans_are_removed() {
        let service = Arc::new(InMemorySubscriptionService::new());
        service.seed(100, "sub-1", "Stale name", "salesforce").await;
        service.seed(100, "sub-gone", "Removed from graph", "webhook").await;
        let reconciler = SubscriptionReconciler::new(service.clone());

        let desired = vec![linked("node-1", "Fresh name", "salesforce", "sub-1")];
        let active = reconciler.reconcile(100, &desired).await.unwrap();

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "sub-1");
        assert_eq!(active[0].name, "Fresh name");
        assert_eq!(service.create_calls(), 0);
        assert_eq!(service.update_calls(), 1);

        let remaining = service.stored(100).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "sub-1");
        assert_eq!(remaining[0].name, "Fresh name");
    }

    #[tokio::test]
    async fn failed_update_is_soft_and_excluded_from_result() {
        let service = Arc::new(InMemorySubscriptionService::new());
        service.seed(100, "sub-1", "Old", "salesforce").await;
        service.seed(100, "sub-2", "Old too", "webhook").await;
        service.fail_update("sub-1").await;
        let reconciler = SubscriptionReconciler::new(service.clone());

        let desired = vec![
            linked("node-1", "New", "salesforce", "sub-1"),
            linked("node-2", "New too", "webhook", "sub-2"),
        ];
        let active = reconciler.reconcile(100, &desired).await.unwrap();

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "sub-2");
        // The failed update did not delete anything: sub-1 is still
        // claimed by a desired node, so it is not an orphan.
        assert_eq!(service.stored(100).await.len(), 2);
        assert_eq!(service.delete_calls(), 0);
    }

    #[tokio::test]
    async fn orphans_after_successful_pass_all_claimed() {
        let service = Arc::new(InMemorySubscriptionService::new());
        service.seed(100, "sub-1", "Keep", "salesforce").await;
        service.seed(100, "sub-old-a", "Drop", "webhook").await;
        service.seed(100, "sub-old-b", "Drop too", "webhook").await;
        let reconciler = SubscriptionReconciler::new(service.clone());

        let desired = vec![
            linked("node-1", "Keep", "salesforce", "sub-1"),
            unlinked("node-2", "New", "webhook"),
        ];
        reconciler.reconcile(100, &desired).await.unwrap();

        // Everything left is claimed by some desired node's subscription
        // id or was just created for one.
        let remaining = service.stored(100).await;
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().any(|s| s.id == "sub-1"));
        assert!(remaining.iter().any(|s| s.name == "New"));
    }

    #[tokio::test]
    async fn fetch_failure_is_a_hard_error() {
        let service = Arc::new(InMemorySubscriptionService::new());
        service.fail_list().await;
        let reconciler = SubscriptionReconciler::new(service.clone());

        let err = reconciler
            .reconcile(100, &[unlinked("node-1", "Event 1", "salesforce")])
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Fetch { policy_id: 100, .. }));
        // No writes were attempted without the remote set.
        assert_eq!(service.create_calls(), 0);
        assert_eq!(service.delete_calls(), 0);
    }
}
