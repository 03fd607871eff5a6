//! Call-routing policy core: the policy graph model and the two protocols
//! that keep remote state consistent with local edits.
//!
//! An operator assembles a routing policy as a graph of typed nodes; on
//! save the graph is flattened into the legacy nested document the policy
//! engine stores under a numeric id, and a reconciliation pass converges
//! the event-subscription service on the graph's event-triggering child
//! items, creating, updating, and orphan-deleting with per-item failure
//! isolation.
//!
//! The crate is transport-free: remote collaborators are consumed through
//! the async traits in [`traits`], with HTTP implementations in
//! `callflow-transport` and in-memory defaults in [`defaults`].

pub mod defaults;
pub mod errors;
pub mod persist;
pub mod reconcile;
pub mod traits;
pub mod transform;
pub mod types;
pub mod validate;

// Re-export the public surface at the crate level.

// defaults
pub use defaults::{InMemoryPolicyStore, InMemorySubscriptionService, StaticExtensionDirectory};

// errors
pub use errors::{
    GraphError, LegacyError, ReconcileError, SaveError, TransportError, ValidationError,
};

// persist
pub use persist::PolicyPublisher;

// reconcile
pub use reconcile::SubscriptionReconciler;

// traits
pub use traits::{ExtensionDirectory, PolicyStore, SubscriptionService};

// transform
pub use transform::{parse_document, serialize_graph};

// types
pub use types::{
    ActionConfig, AiAgentConfig, CallQueueConfig, ChildItem, ChildKind, ConnectCallConfig,
    DesiredEventNode, DigitalConfig, DocumentItem, DocumentSubItem, Edge, EdgeKind,
    EventSubscription, ExtensionNumberConfig, FinishConfig, FromPolicyConfig, GetInfoConfig,
    HuntGroupConfig, InboundMessageConfig, InboundNumberConfig, InvokableDestinationConfig,
    NatterboxAiConfig, Node, NodeKind, NotifyConfig, OmniChannelFlowConfig, PolicyDocument,
    PolicyGraph, Position, RecordCallConfig, RouteConfig, RuleConfig, SipTrunkConfig, SpeakConfig,
    SubscriptionDraft, SubscriptionUpdate, SwitchBoardConfig, SwitchItemConfig, ToPolicyConfig,
    VoicemailConfig, MAX_EXTENSION, MIN_EXTENSION,
};

// validate
pub use validate::validate_graph;
