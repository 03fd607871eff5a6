//! Collaborator trait seams.
//!
//! The two remote services are consumed through narrow async contracts;
//! HTTP implementations live in `callflow-transport`, in-memory defaults in
//! [`defaults`](crate::defaults). Organization scoping is an implementation
//! concern: a client is constructed for one organization with one explicit
//! credential, so the contracts here carry no ambient identity.

use async_trait::async_trait;

use crate::errors::TransportError;
use crate::types::{EventSubscription, PolicyDocument, SubscriptionDraft, SubscriptionUpdate};

/// The policy-execution engine: stores a whole policy graph as one nested
/// document under a numeric id. There is no partial update; `update`
/// fully overwrites the stored document.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Create a new policy document. The returned document carries the
    /// server-assigned id.
    async fn create(&self, document: &PolicyDocument) -> Result<PolicyDocument, TransportError>;

    /// Overwrite the document stored under `policy_id`.
    async fn update(
        &self,
        policy_id: u64,
        document: &PolicyDocument,
    ) -> Result<PolicyDocument, TransportError>;

    /// Delete the document stored under `policy_id`.
    async fn delete(&self, policy_id: u64) -> Result<(), TransportError>;
}

/// The event-subscription service. Written to only by the reconciliation
/// engine, never directly by the editor.
#[async_trait]
pub trait SubscriptionService: Send + Sync {
    /// All subscriptions currently registered for `policy_id`.
    async fn list(&self, policy_id: u64) -> Result<Vec<EventSubscription>, TransportError>;

    /// Register a new subscription. The returned subscription carries the
    /// server-assigned id.
    async fn create(&self, draft: &SubscriptionDraft) -> Result<EventSubscription, TransportError>;

    /// Update an existing subscription's fields.
    async fn update(
        &self,
        subscription_id: &str,
        changes: &SubscriptionUpdate,
    ) -> Result<EventSubscription, TransportError>;

    /// Delete a subscription.
    async fn delete(&self, subscription_id: &str) -> Result<(), TransportError>;
}

/// External predicate over the organization's extension-number pool,
/// supplied by a CRM/identity adapter. Consulted by graph validation; the
/// adapter itself is out of scope here.
pub trait ExtensionDirectory: Send + Sync {
    fn is_extension_available(&self, extension: u32) -> bool;
}
