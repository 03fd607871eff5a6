//! Policy persistence protocol: create-or-update on save, cascade on
//! delete.
//!
//! A save is two steps with different failure contracts. The document
//! write is a single synchronous full overwrite; any failure there is
//! fatal and surfaced to the caller, who presents it and leaves the graph
//! unsaved. The reconciliation pass that follows is soft: drift it leaves
//! behind is resolved opportunistically by the next save, so its failures
//! are logged, never raised.

use std::sync::Arc;

use crate::errors::{ReconcileError, SaveError, TransportError};
use crate::reconcile::SubscriptionReconciler;
use crate::traits::{ExtensionDirectory, PolicyStore, SubscriptionService};
use crate::transform::serialize_graph;
use crate::types::{PolicyDocument, PolicyGraph};
use crate::validate::validate_graph;

/// Publishes policy graphs to the two remote systems.
pub struct PolicyPublisher {
    store: Arc<dyn PolicyStore>,
    reconciler: SubscriptionReconciler,
}

impl PolicyPublisher {
    pub fn new(store: Arc<dyn PolicyStore>, subscriptions: Arc<dyn SubscriptionService>) -> Self {
        Self {
            store,
            reconciler: SubscriptionReconciler::new(subscriptions),
        }
    }

    /// Validate, serialize, and write the graph; then run one
    /// reconciliation pass over its event nodes.
    ///
    /// The first successful save writes the assigned policy id back onto
    /// the graph so subsequent saves update rather than create. Created
    /// subscription ids are likewise linked back onto their owning child
    /// items, so the next pass routes them to update.
    pub async fn save(
        &self,
        graph: &mut PolicyGraph,
        directory: &dyn ExtensionDirectory,
    ) -> Result<PolicyDocument, SaveError> {
        validate_graph(graph, directory).map_err(SaveError::Invalid)?;

        let document = serialize_graph(graph)?;
        let saved = match graph.policy_id {
            None => self.store.create(&document).await?,
            Some(policy_id) => self.store.update(policy_id, &document).await?,
        };
        let policy_id = saved.id.ok_or_else(|| {
            SaveError::Transport(TransportError::Decode {
                message: "policy engine response carried no id".to_string(),
            })
        })?;
        graph.policy_id = Some(policy_id);

        let desired = graph.desired_event_nodes();
        match self.reconciler.reconcile(policy_id, &desired).await {
            Ok(active) => {
                for subscription in &active {
                    if let Some(item_id) = subscription.node_id() {
                        graph.link_subscription(item_id, &subscription.id);
                    }
                }
            }
            Err(err) => {
                // The document is saved; subscription drift heals on the
                // next save.
                tracing::warn!(policy_id, error = %err, "subscription reconciliation skipped");
            }
        }

        Ok(saved)
    }

    /// Delete a policy and its event subscriptions.
    ///
    /// Subscriptions go first: deleting them is retry-safe, while deleting
    /// the document first could orphan subscriptions with no owning policy
    /// if the cascade then failed. A reconciliation fetch failure
    /// therefore aborts before the document is touched.
    pub async fn delete(&self, policy_id: u64) -> Result<(), SaveError> {
        self.reconciler
            .reconcile(policy_id, &[])
            .await
            .map_err(|err| match err {
                ReconcileError::Fetch { source, .. } => SaveError::Transport(source),
            })?;
        self.store.delete(policy_id).await?;
        Ok(())
    }
}
