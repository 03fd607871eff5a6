//! Foundational types for the policy graph and its wire formats.
//!
//! Every type here is `Serialize + Deserialize + Debug + Clone`. Wire-facing
//! types use `camelCase` field names because both remote collaborators (the
//! legacy policy engine and the event-subscription service) speak camelCase
//! JSON. All map fields use `BTreeMap`, never `HashMap`, so serialization is
//! deterministic.

pub mod document;
pub mod graph;
pub mod subscription;

pub use document::*;
pub use graph::*;
pub use subscription::*;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Lowest extension number an entry point may claim (inclusive).
pub const MIN_EXTENSION: u32 = 2000;

/// Highest extension number an entry point may claim (inclusive).
pub const MAX_EXTENSION: u32 = 7999;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Canvas coordinates of a node. Presentation-only: persistence and
/// reconciliation ignore it, transforms carry it through opaquely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
