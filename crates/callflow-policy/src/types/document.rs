//! The nested document shape the legacy policy engine persists and returns.
//!
//! The document is written and read as a whole; the engine has no partial
//! update primitive, an update fully overwrites `items`. Fields the typed
//! shape does not name are preserved in flattened passthrough bags rather
//! than dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A complete policy as the remote engine stores it, keyed by a numeric id
/// assigned on first create.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(rename = "type", default)]
    pub policy_type: String,
    #[serde(default)]
    pub items: Vec<DocumentItem>,
}

/// A flattened container node within the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentItem {
    pub id: String,
    pub name: String,
    pub template_id: String,
    pub template_class: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_items: Vec<DocumentSubItem>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A child item within a document item. `destinationNumber` has a
/// dedicated slot in the legacy shape; every other config field rides in
/// the passthrough bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSubItem {
    pub id: String,
    pub name: String,
    pub template_id: String,
    pub template_class: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_number: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}
