//! Event-subscription wire types and the desired-state view the
//! reconciliation engine consumes.
//!
//! An [`EventSubscription`] is a remote entity, never locally owned: its
//! existence is always a derived projection of the graph's event-triggering
//! child items. Only the reconciliation engine creates, updates, or deletes
//! subscriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A subscription as the remote service returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubscription {
    /// Server-assigned, opaque.
    pub id: String,
    pub name: String,
    pub event_type: String,
    pub policy_id: u64,
    pub enabled: bool,
    /// Opaque to this core; carries the owning item id under `nodeId`.
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl EventSubscription {
    /// The graph item this subscription projects, when the config names it.
    pub fn node_id(&self) -> Option<&str> {
        self.config.get("nodeId").and_then(Value::as_str)
    }
}

/// Create request: a subscription without a server id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDraft {
    pub name: String,
    pub event_type: String,
    pub policy_id: u64,
    pub enabled: bool,
    #[serde(default)]
    pub config: Value,
}

/// Partial-fields update request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionUpdate {
    pub name: String,
    pub event_type: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

/// One event-triggering child item as the reconciliation engine sees it:
/// the desired remote state, plus the link back to the owning item.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredEventNode {
    /// Id of the owning child item in the graph.
    pub node_id: String,
    pub name: String,
    pub event_type: String,
    pub enabled: bool,
    pub config: Value,
    /// Present once a create has succeeded for this item. Routes the item
    /// to update on every subsequent pass, never back to create.
    pub subscription_id: Option<String>,
}

impl DesiredEventNode {
    /// The create request for an unlinked item.
    pub fn to_draft(&self, policy_id: u64) -> SubscriptionDraft {
        SubscriptionDraft {
            name: self.name.clone(),
            event_type: self.event_type.clone(),
            policy_id,
            enabled: self.enabled,
            config: self.config.clone(),
        }
    }

    /// The update request for a linked item.
    pub fn to_update(&self) -> SubscriptionUpdate {
        SubscriptionUpdate {
            name: self.name.clone(),
            event_type: self.event_type.clone(),
            enabled: self.enabled,
            config: Some(self.config.clone()),
        }
    }
}
