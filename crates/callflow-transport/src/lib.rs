//! Authenticated HTTP clients for the two remote collaborators of the
//! policy core: the policy-execution engine and the event-subscription
//! service.
//!
//! Each client is constructed for one organization with an explicit
//! [`ApiCredential`] and implements the corresponding trait seam from
//! `callflow-policy`, so the core stays free of transport concerns.

pub mod credential;
pub mod policy_engine;
mod response;
pub mod subscriptions;

pub use credential::ApiCredential;
pub use policy_engine::PolicyEngineClient;
pub use subscriptions::EventSubscriptionClient;
