//! Error types for the policy core, one enum per concern.
//!
//! `TransportError` is deliberately transport-agnostic: the HTTP clients in
//! `callflow-transport` map their own failures into it, so this crate never
//! depends on an HTTP stack.

use thiserror::Error;

/// Errors from [`PolicyGraph`](crate::types::PolicyGraph) mutation
/// operations. These are rejected synchronously; a graph never holds a
/// dangling edge or a sparse child order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("node not found: {id}")]
    NodeNotFound { id: String },
    #[error("duplicate node id: {id}")]
    DuplicateNode { id: String },
    #[error("edge not found: {id}")]
    EdgeNotFound { id: String },
    #[error("duplicate edge id: {id}")]
    DuplicateEdge { id: String },
    #[error("edge {edge_id} references unknown node: {node_id}")]
    DanglingEdge { edge_id: String, node_id: String },
    #[error("node {node_id} already has a default outgoing edge")]
    DuplicateDefaultEdge { node_id: String },
    #[error("node {node_id} is not a container and cannot own child items")]
    NotAContainer { node_id: String },
    #[error("child item not found on node {node_id}: {item_id}")]
    ChildNotFound { node_id: String, item_id: String },
    #[error("duplicate child item id on node {node_id}: {item_id}")]
    DuplicateChild { node_id: String, item_id: String },
    #[error("child index {index} out of range for node {node_id} ({len} items)")]
    IndexOutOfRange {
        node_id: String,
        index: usize,
        len: usize,
    },
}

/// A structural violation found by
/// [`validate_graph`](crate::validate::validate_graph). Violations block a
/// save locally and are never sent to a remote collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("graph has no entry-point node")]
    MissingEntryPoint,
    #[error("no terminal node (finish or toPolicy) is reachable from an entry point")]
    NoReachableTerminal,
    #[error("edge {edge_id} references unknown node: {node_id}")]
    DanglingEdge { edge_id: String, node_id: String },
    #[error("node {node_id}: extension {extension} outside allowed range {min}..={max}")]
    ExtensionOutOfRange {
        node_id: String,
        extension: u32,
        min: u32,
        max: u32,
    },
    #[error("extension {extension} used by more than one node")]
    DuplicateExtension { extension: u32 },
    #[error("node {node_id}: extension {extension} is not available")]
    ExtensionUnavailable { node_id: String, extension: u32 },
    #[error("node {node_id}: entry point has no extension configured")]
    MissingExtension { node_id: String },
}

/// A remote call failed. Surfaced verbatim for document-level operations
/// (no silent retry); wrapped and logged for per-item reconciliation work.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {message}")]
    Request { message: String },
    #[error("remote returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("failed to decode response: {message}")]
    Decode { message: String },
    #[error("api credential expired at {expired_at}")]
    CredentialExpired { expired_at: String },
}

/// Errors from the legacy document transform.
#[derive(Debug, Error)]
pub enum LegacyError {
    #[error("unknown templateId: {template_id}")]
    UnknownTemplate { template_id: String },
    #[error("malformed legacy document: {message}")]
    Decode { message: String },
}

/// Errors from [`PolicyPublisher`](crate::persist::PolicyPublisher)
/// save/delete. Reconciliation item failures never appear here; they are
/// soft and self-healing on the next save.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("graph failed validation ({} violation(s))", .0.len())]
    Invalid(Vec<ValidationError>),
    #[error("legacy transform failed: {0}")]
    Transform(#[from] LegacyError),
    #[error("policy engine call failed: {0}")]
    Transport(#[from] TransportError),
    #[error("cannot update or delete a policy that was never saved")]
    NotPersisted,
}

/// A whole reconciliation pass failed before any item work could start.
/// Item-level failures inside a pass are logged and skipped, never raised.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to fetch existing subscriptions for policy {policy_id}: {source}")]
    Fetch {
        policy_id: u64,
        #[source]
        source: TransportError,
    },
}
