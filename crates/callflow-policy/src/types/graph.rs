//! Policy graph schema: the contract between the editor UI and the
//! synchronization protocols.
//!
//! Node and child-item kinds are closed tagged enums with one typed config
//! payload per variant, so adding a kind is a compile-time-checked change
//! (exhaustive matches in the template mapping break if a variant is
//! missed). Each payload carries a flattened passthrough bag for platform
//! fields the typed model does not name; those survive serialization
//! round-trips untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::subscription::DesiredEventNode;
use super::Position;
use crate::errors::GraphError;

// ---------------------------------------------------------------------------
// Node kinds
// ---------------------------------------------------------------------------

/// Every node type the editor can place, tagged the way the wire format
/// spells them. Containers own an ordered list of child items and expose a
/// single default next-hop edge; entry points are how a call or message
/// enters the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    // Containers
    Action(ActionConfig),
    SwitchBoard(SwitchBoardConfig),
    #[serde(rename = "natterboxAI")]
    NatterboxAi(NatterboxAiConfig),
    Finish(FinishConfig),
    ToPolicy(ToPolicyConfig),
    OmniChannelFlow(OmniChannelFlowConfig),
    // Entry points
    InboundNumber(InboundNumberConfig),
    ExtensionNumber(ExtensionNumberConfig),
    SipTrunk(SipTrunkConfig),
    InboundMessage(InboundMessageConfig),
    Digital(DigitalConfig),
    FromPolicy(FromPolicyConfig),
    InvokableDestination(InvokableDestinationConfig),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionConfig {
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchBoardConfig {
    /// Variable whose value selects the outgoing branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NatterboxAiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishConfig {
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToPolicyConfig {
    /// Remote id of the policy control is handed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<u64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmniChannelFlowConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundNumberConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionNumberConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<u32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SipTrunkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trunk: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitalConfig {
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FromPolicyConfig {
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokableDestinationConfig {
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl NodeKind {
    /// Container kinds own child items and appear in the legacy document.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            NodeKind::Action(_)
                | NodeKind::SwitchBoard(_)
                | NodeKind::NatterboxAi(_)
                | NodeKind::Finish(_)
                | NodeKind::ToPolicy(_)
                | NodeKind::OmniChannelFlow(_)
        )
    }

    /// Entry-point kinds are how a call or message enters the graph.
    pub fn is_entry_point(&self) -> bool {
        matches!(
            self,
            NodeKind::InboundNumber(_)
                | NodeKind::ExtensionNumber(_)
                | NodeKind::SipTrunk(_)
                | NodeKind::InboundMessage(_)
                | NodeKind::Digital(_)
                | NodeKind::FromPolicy(_)
                | NodeKind::InvokableDestination(_)
        )
    }

    /// Terminal kinds end the flow: `finish` stops it, `toPolicy` hands
    /// control to another policy.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeKind::Finish(_) | NodeKind::ToPolicy(_))
    }

    /// The `templateId` tag the legacy document uses for this kind.
    /// Identical to the serde tag so the transform can reuse serde.
    pub fn template_id(&self) -> &'static str {
        match self {
            NodeKind::Action(_) => "action",
            NodeKind::SwitchBoard(_) => "switchBoard",
            NodeKind::NatterboxAi(_) => "natterboxAI",
            NodeKind::Finish(_) => "finish",
            NodeKind::ToPolicy(_) => "toPolicy",
            NodeKind::OmniChannelFlow(_) => "omniChannelFlow",
            NodeKind::InboundNumber(_) => "inboundNumber",
            NodeKind::ExtensionNumber(_) => "extensionNumber",
            NodeKind::SipTrunk(_) => "sipTrunk",
            NodeKind::InboundMessage(_) => "inboundMessage",
            NodeKind::Digital(_) => "digital",
            NodeKind::FromPolicy(_) => "fromPolicy",
            NodeKind::InvokableDestination(_) => "invokableDestination",
        }
    }

    /// The `templateClass` tag the legacy document pairs with
    /// [`template_id`](Self::template_id).
    pub fn template_class(&self) -> &'static str {
        if self.is_container() {
            "container"
        } else {
            "entryPoint"
        }
    }

    /// The configured extension number, for entry points that have one.
    pub fn extension(&self) -> Option<u32> {
        match self {
            NodeKind::ExtensionNumber(cfg) => cfg.extension,
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Child item kinds
// ---------------------------------------------------------------------------

/// Every child-item type a container can own. `notify` and `aiAgent` are
/// the event-triggering kinds: they project to a remote event subscription
/// and are the only kinds that ever carry a `subscriptionId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChildKind {
    Speak(SpeakConfig),
    CallQueue(CallQueueConfig),
    HuntGroup(HuntGroupConfig),
    Voicemail(VoicemailConfig),
    Rule(RuleConfig),
    ConnectCall(ConnectCallConfig),
    RecordCall(RecordCallConfig),
    Notify(NotifyConfig),
    SwitchItem(SwitchItemConfig),
    GetInfo(GetInfoConfig),
    Route(RouteConfig),
    AiAgent(AiAgentConfig),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakConfig {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallQueueConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_on_hold: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuntGroupConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ring_time_secs: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoicemailConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailbox: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectCallConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_number: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCallConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stereo: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyConfig {
    /// Remote event source this item subscribes to, e.g. `salesforce`
    /// or `webhook`.
    pub event_type: String,
    /// Desired `enabled` state of the remote subscription.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchItemConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_value: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInfoConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digits: Option<u32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_number: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAgentConfig {
    /// Remote event source that invokes the agent.
    pub event_type: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_true() -> bool {
    true
}

impl ChildKind {
    /// The `templateId` tag the legacy document uses for this kind.
    /// Identical to the serde tag so the transform can reuse serde.
    pub fn template_id(&self) -> &'static str {
        match self {
            ChildKind::Speak(_) => "speak",
            ChildKind::CallQueue(_) => "callQueue",
            ChildKind::HuntGroup(_) => "huntGroup",
            ChildKind::Voicemail(_) => "voicemail",
            ChildKind::Rule(_) => "rule",
            ChildKind::ConnectCall(_) => "connectCall",
            ChildKind::RecordCall(_) => "recordCall",
            ChildKind::Notify(_) => "notify",
            ChildKind::SwitchItem(_) => "switchItem",
            ChildKind::GetInfo(_) => "getInfo",
            ChildKind::Route(_) => "route",
            ChildKind::AiAgent(_) => "aiAgent",
        }
    }

    /// The `templateClass` category tag paired with
    /// [`template_id`](Self::template_id) in the legacy document.
    pub fn template_class(&self) -> &'static str {
        match self {
            ChildKind::Speak(_) => "media",
            ChildKind::CallQueue(_)
            | ChildKind::HuntGroup(_)
            | ChildKind::ConnectCall(_)
            | ChildKind::Route(_)
            | ChildKind::SwitchItem(_) => "routing",
            ChildKind::Voicemail(_) | ChildKind::RecordCall(_) => "recording",
            ChildKind::Rule(_) | ChildKind::GetInfo(_) => "logic",
            ChildKind::Notify(_) => "integration",
            ChildKind::AiAgent(_) => "ai",
        }
    }

    /// Whether this kind projects to a remote event subscription.
    pub fn is_event_trigger(&self) -> bool {
        matches!(self, ChildKind::Notify(_) | ChildKind::AiAgent(_))
    }

    /// The remote event source, for event-triggering kinds.
    pub fn event_type(&self) -> Option<&str> {
        match self {
            ChildKind::Notify(cfg) => Some(&cfg.event_type),
            ChildKind::AiAgent(cfg) => Some(&cfg.event_type),
            _ => None,
        }
    }

    /// Desired `enabled` state of the remote subscription, for
    /// event-triggering kinds.
    pub fn event_enabled(&self) -> Option<bool> {
        match self {
            ChildKind::Notify(cfg) => Some(cfg.enabled),
            ChildKind::AiAgent(cfg) => Some(cfg.enabled),
            _ => None,
        }
    }

    /// The destination number, for kinds that dial one. Lifted into a
    /// dedicated field of the legacy document shape.
    pub fn destination_number(&self) -> Option<&str> {
        match self {
            ChildKind::ConnectCall(cfg) => cfg.destination_number.as_deref(),
            ChildKind::Route(cfg) => cfg.destination_number.as_deref(),
            _ => None,
        }
    }

    /// This kind's config as a JSON object, without the type tag.
    pub fn config_object(&self) -> BTreeMap<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map
                .into_iter()
                .filter(|(k, _)| k != "type")
                .collect(),
            _ => BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Child items
// ---------------------------------------------------------------------------

/// An ordered action owned by a container node. Never referenced by id
/// from elsewhere; deleting the parent deletes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildItem {
    pub id: String,
    pub name: String,
    /// Priority within the parent container. Kept dense and zero-based by
    /// the graph mutation operations.
    #[serde(default)]
    pub order: u32,
    #[serde(flatten)]
    pub kind: ChildKind,
    /// Remote subscription id, present only after the reconciliation
    /// engine has created one for this item. Once set it is never cleared;
    /// subsequent reconciliations route to update, never to create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

impl ChildItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ChildKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            order: 0,
            kind,
            subscription_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// How an edge leaves its source node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    /// The single next-hop transition. At most one per source node.
    Default,
    /// A named branch outcome, e.g. a switchboard case.
    Output(String),
}

/// A directed transition between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn default_hop(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::Default,
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes and the graph
// ---------------------------------------------------------------------------

/// A placed node: identity, display name, typed configuration, canvas
/// position, and (for containers) the ordered child items it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ChildItem>,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            position: Position::default(),
            items: Vec::new(),
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }
}

/// The in-memory routing policy the editor mutates and the protocols
/// synchronize. Node ids are the stable identity across edits and
/// serialization round-trips; `nodes` is a `BTreeMap` so iteration is
/// deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyGraph {
    /// Remote document id. `None` until the first successful save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<u64>,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_policy_type", rename = "type")]
    pub policy_type: String,
    #[serde(default)]
    pub nodes: BTreeMap<String, Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

fn default_policy_type() -> String {
    "voice".to_string()
}

impl PolicyGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            policy_id: None,
            name: name.into(),
            enabled: true,
            policy_type: default_policy_type(),
            nodes: BTreeMap::new(),
            edges: Vec::new(),
        }
    }

    // -- node operations ----------------------------------------------------

    /// Add a node. Rejects duplicate ids.
    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode { id: node.id });
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Remove a node and every edge referencing it. Child items are owned
    /// by the node and die with it.
    pub fn remove_node(&mut self, node_id: &str) -> Result<Node, GraphError> {
        let node = self
            .nodes
            .remove(node_id)
            .ok_or_else(|| GraphError::NodeNotFound {
                id: node_id.to_string(),
            })?;
        self.edges
            .retain(|e| e.source != node_id && e.target != node_id);
        Ok(node)
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub fn node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(node_id)
    }

    // -- edge operations ----------------------------------------------------

    /// Add an edge. Rejects dangling endpoints, duplicate edge ids, and a
    /// second `Default` edge leaving the same node.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if self.edges.iter().any(|e| e.id == edge.id) {
            return Err(GraphError::DuplicateEdge { id: edge.id });
        }
        for endpoint in [&edge.source, &edge.target] {
            if !self.nodes.contains_key(endpoint) {
                return Err(GraphError::DanglingEdge {
                    edge_id: edge.id,
                    node_id: endpoint.clone(),
                });
            }
        }
        if edge.kind == EdgeKind::Default
            && self
                .edges
                .iter()
                .any(|e| e.source == edge.source && e.kind == EdgeKind::Default)
        {
            return Err(GraphError::DuplicateDefaultEdge {
                node_id: edge.source,
            });
        }
        self.edges.push(edge);
        Ok(())
    }

    pub fn remove_edge(&mut self, edge_id: &str) -> Result<Edge, GraphError> {
        let idx = self
            .edges
            .iter()
            .position(|e| e.id == edge_id)
            .ok_or_else(|| GraphError::EdgeNotFound {
                id: edge_id.to_string(),
            })?;
        Ok(self.edges.remove(idx))
    }

    // -- child item operations ----------------------------------------------

    /// Append a child item to a container. The item's `order` is assigned;
    /// whatever the caller set is ignored.
    pub fn add_child_item(&mut self, node_id: &str, mut item: ChildItem) -> Result<(), GraphError> {
        let node = self.container_mut(node_id)?;
        if node.items.iter().any(|i| i.id == item.id) {
            return Err(GraphError::DuplicateChild {
                node_id: node_id.to_string(),
                item_id: item.id,
            });
        }
        item.order = node.items.len() as u32;
        node.items.push(item);
        Ok(())
    }

    /// Remove a child item and renumber its siblings so `order` stays
    /// dense and zero-based.
    pub fn remove_child_item(&mut self, node_id: &str, item_id: &str) -> Result<ChildItem, GraphError> {
        let node = self.container_mut(node_id)?;
        let idx = node
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| GraphError::ChildNotFound {
                node_id: node_id.to_string(),
                item_id: item_id.to_string(),
            })?;
        let removed = node.items.remove(idx);
        renumber(&mut node.items);
        Ok(removed)
    }

    /// Move a child item to `new_index` and renumber the sibling sequence.
    /// A purely local operation with no remote side effect until save.
    pub fn reorder_child_item(
        &mut self,
        node_id: &str,
        item_id: &str,
        new_index: usize,
    ) -> Result<(), GraphError> {
        let node = self.container_mut(node_id)?;
        let len = node.items.len();
        if new_index >= len {
            return Err(GraphError::IndexOutOfRange {
                node_id: node_id.to_string(),
                index: new_index,
                len,
            });
        }
        let idx = node
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| GraphError::ChildNotFound {
                node_id: node_id.to_string(),
                item_id: item_id.to_string(),
            })?;
        let item = node.items.remove(idx);
        node.items.insert(new_index, item);
        renumber(&mut node.items);
        Ok(())
    }

    fn container_mut(&mut self, node_id: &str) -> Result<&mut Node, GraphError> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| GraphError::NodeNotFound {
                id: node_id.to_string(),
            })?;
        if !node.kind.is_container() {
            return Err(GraphError::NotAContainer {
                node_id: node_id.to_string(),
            });
        }
        Ok(node)
    }

    // -- reconciliation support ---------------------------------------------

    /// Extract the desired-state view of every event-triggering child item,
    /// the input to a reconciliation pass. The draft config carries the
    /// owning item id so created subscriptions can be linked back.
    pub fn desired_event_nodes(&self) -> Vec<DesiredEventNode> {
        let mut desired = Vec::new();
        for node in self.nodes.values() {
            for item in &node.items {
                if !item.kind.is_event_trigger() {
                    continue;
                }
                let mut config = item.kind.config_object();
                config.insert("nodeId".to_string(), Value::String(item.id.clone()));
                desired.push(DesiredEventNode {
                    node_id: item.id.clone(),
                    name: item.name.clone(),
                    event_type: item.kind.event_type().unwrap_or_default().to_string(),
                    enabled: item.kind.event_enabled().unwrap_or(true),
                    config: Value::Object(config.into_iter().collect()),
                    subscription_id: item.subscription_id.clone(),
                });
            }
        }
        desired
    }

    /// Record a created subscription id on the owning child item. Returns
    /// `false` if no event-triggering item with that id exists. An id that
    /// is already set is left alone; there is no transition back to
    /// unlinked.
    pub fn link_subscription(&mut self, item_id: &str, subscription_id: &str) -> bool {
        for node in self.nodes.values_mut() {
            for item in &mut node.items {
                if item.id == item_id && item.kind.is_event_trigger() {
                    if item.subscription_id.is_none() {
                        item.subscription_id = Some(subscription_id.to_string());
                    }
                    return true;
                }
            }
        }
        false
    }
}

fn renumber(items: &mut [ChildItem]) {
    for (i, item) in items.iter_mut().enumerate() {
        item.order = i as u32;
    }
}
