//! Bidirectional mapping between the policy graph and the legacy nested
//! document the policy engine persists.
//!
//! The document format is narrower than the graph: it has no positions, no
//! entry points, and no explicit edges; containers execute in sequence.
//! Serialization flattens containers in default-edge chain order; parsing
//! synthesizes positions and chains consecutive items back together with
//! default edges. Config fields the document shape does not name ride in
//! passthrough bags, so a round-trip preserves every child config key.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::errors::LegacyError;
use crate::types::{
    ChildItem, ChildKind, DocumentItem, DocumentSubItem, Edge, EdgeKind, Node, NodeKind,
    PolicyDocument, PolicyGraph, Position,
};

/// `templateId` values the legacy document may carry on an item.
const NODE_TEMPLATE_IDS: [&str; 13] = [
    "action",
    "switchBoard",
    "natterboxAI",
    "finish",
    "toPolicy",
    "omniChannelFlow",
    "inboundNumber",
    "extensionNumber",
    "sipTrunk",
    "inboundMessage",
    "digital",
    "fromPolicy",
    "invokableDestination",
];

/// `templateId` values the legacy document may carry on a sub item.
const CHILD_TEMPLATE_IDS: [&str; 12] = [
    "speak",
    "callQueue",
    "huntGroup",
    "voicemail",
    "rule",
    "connectCall",
    "recordCall",
    "notify",
    "switchItem",
    "getInfo",
    "route",
    "aiAgent",
];

// ---------------------------------------------------------------------------
// Graph -> document
// ---------------------------------------------------------------------------

/// Flatten a graph into the legacy document shape.
///
/// Containers are emitted in chain order: seeds are containers with no
/// incoming default edge from another container (id order), each followed
/// along its default-edge successors; anything left (cycle members) is
/// appended in id order.
pub fn serialize_graph(graph: &PolicyGraph) -> Result<PolicyDocument, LegacyError> {
    let mut items = Vec::new();
    for node_id in container_order(graph) {
        let node = &graph.nodes[&node_id];
        items.push(item_from_node(node));
    }

    Ok(PolicyDocument {
        id: graph.policy_id,
        name: graph.name.clone(),
        enabled: graph.enabled,
        policy_type: graph.policy_type.clone(),
        items,
    })
}

fn container_order(graph: &PolicyGraph) -> Vec<String> {
    let containers: HashSet<&str> = graph
        .nodes
        .values()
        .filter(|n| n.kind.is_container())
        .map(|n| n.id.as_str())
        .collect();

    // Default-edge successor per container, and which containers another
    // container already points at.
    let mut successor: BTreeMap<&str, &str> = BTreeMap::new();
    let mut has_container_predecessor: HashSet<&str> = HashSet::new();
    for edge in &graph.edges {
        if edge.kind != EdgeKind::Default || !containers.contains(edge.target.as_str()) {
            continue;
        }
        if containers.contains(edge.source.as_str()) {
            successor.insert(edge.source.as_str(), edge.target.as_str());
            has_container_predecessor.insert(edge.target.as_str());
        }
    }

    let mut order = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut seeds: Vec<&str> = containers
        .iter()
        .copied()
        .filter(|id| !has_container_predecessor.contains(id))
        .collect();
    seeds.sort_unstable();

    for seed in seeds {
        let mut current = Some(seed);
        while let Some(id) = current {
            if !visited.insert(id) {
                break;
            }
            order.push(id.to_string());
            current = successor.get(id).copied();
        }
    }

    // Cycle members have no seed; append them deterministically.
    let mut rest: Vec<&str> = containers.difference(&visited).copied().collect();
    rest.sort_unstable();
    order.extend(rest.iter().map(|id| id.to_string()));
    order
}

fn item_from_node(node: &Node) -> DocumentItem {
    DocumentItem {
        id: node.id.clone(),
        name: node.name.clone(),
        template_id: node.kind.template_id().to_string(),
        template_class: node.kind.template_class().to_string(),
        sub_items: node.items.iter().map(sub_item_from_child).collect(),
        extra: kind_config(&node.kind),
    }
}

fn kind_config(kind: &NodeKind) -> BTreeMap<String, Value> {
    match serde_json::to_value(kind) {
        Ok(Value::Object(map)) => map.into_iter().filter(|(k, _)| k != "type").collect(),
        _ => BTreeMap::new(),
    }
}

fn sub_item_from_child(child: &ChildItem) -> DocumentSubItem {
    let mut extra = child.kind.config_object();
    let destination_number = match extra.remove("destinationNumber") {
        Some(Value::String(s)) => Some(s),
        _ => None,
    };
    if let Some(ref sid) = child.subscription_id {
        extra.insert("subscriptionId".to_string(), Value::String(sid.clone()));
    }

    DocumentSubItem {
        id: child.id.clone(),
        name: child.name.clone(),
        template_id: child.kind.template_id().to_string(),
        template_class: child.kind.template_class().to_string(),
        order: child.order,
        destination_number,
        extra,
    }
}

// ---------------------------------------------------------------------------
// Document -> graph
// ---------------------------------------------------------------------------

/// Rebuild a graph from the legacy document shape.
///
/// Positions are synthesized on a horizontal grid (the document carries
/// none) and consecutive items are chained with default edges, matching
/// the sequential execution order of the legacy engine.
pub fn parse_document(doc: &PolicyDocument) -> Result<PolicyGraph, LegacyError> {
    let mut graph = PolicyGraph::new(doc.name.clone());
    graph.policy_id = doc.id;
    graph.enabled = doc.enabled;
    graph.policy_type = doc.policy_type.clone();

    let mut previous: Option<String> = None;
    for (index, item) in doc.items.iter().enumerate() {
        let node = node_from_item(item, index)?;
        let node_id = node.id.clone();
        graph
            .add_node(node)
            .map_err(|e| LegacyError::Decode { message: e.to_string() })?;

        if let Some(prev) = previous {
            graph
                .add_edge(Edge {
                    id: format!("edge-{prev}-{node_id}"),
                    source: prev,
                    target: node_id.clone(),
                    kind: EdgeKind::Default,
                })
                .map_err(|e| LegacyError::Decode { message: e.to_string() })?;
        }
        previous = Some(node_id);
    }

    Ok(graph)
}

fn node_from_item(item: &DocumentItem, index: usize) -> Result<Node, LegacyError> {
    if !NODE_TEMPLATE_IDS.contains(&item.template_id.as_str()) {
        return Err(LegacyError::UnknownTemplate {
            template_id: item.template_id.clone(),
        });
    }

    let kind: NodeKind = from_tagged(&item.template_id, item.extra.clone())?;

    let mut items = Vec::new();
    for sub in &item.sub_items {
        items.push(child_from_sub_item(sub)?);
    }
    items.sort_by_key(|c| c.order);
    for (i, child) in items.iter_mut().enumerate() {
        child.order = i as u32;
    }

    Ok(Node {
        id: item.id.clone(),
        name: item.name.clone(),
        kind,
        position: Position::new(120.0 + 280.0 * index as f64, 200.0),
        items,
    })
}

fn child_from_sub_item(sub: &DocumentSubItem) -> Result<ChildItem, LegacyError> {
    if !CHILD_TEMPLATE_IDS.contains(&sub.template_id.as_str()) {
        return Err(LegacyError::UnknownTemplate {
            template_id: sub.template_id.clone(),
        });
    }

    let mut config = sub.extra.clone();
    let subscription_id = match config.remove("subscriptionId") {
        Some(Value::String(s)) => Some(s),
        _ => None,
    };
    if let Some(ref dn) = sub.destination_number {
        config.insert("destinationNumber".to_string(), Value::String(dn.clone()));
    }

    let kind: ChildKind = from_tagged(&sub.template_id, config)?;

    Ok(ChildItem {
        id: sub.id.clone(),
        name: sub.name.clone(),
        order: sub.order,
        kind,
        subscription_id,
    })
}

/// Deserialize an internally-tagged enum from a template id plus its
/// config fields. Works because the template ids are the serde tags.
fn from_tagged<T: serde::de::DeserializeOwned>(
    tag: &str,
    config: BTreeMap<String, Value>,
) -> Result<T, LegacyError> {
    let mut map = serde_json::Map::new();
    map.insert("type".to_string(), Value::String(tag.to_string()));
    map.extend(config);
    serde_json::from_value(Value::Object(map)).map_err(|e| LegacyError::Decode {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ActionConfig, ConnectCallConfig, FinishConfig, InboundNumberConfig, NotifyConfig,
        SpeakConfig,
    };
    use serde_json::json;

    fn sample_graph() -> PolicyGraph {
        let mut g = PolicyGraph::new("Main IVR");
        g.add_node(Node::new(
            "in",
            "Inbound",
            NodeKind::InboundNumber(InboundNumberConfig {
                number: Some("+441230000000".into()),
                extra: Default::default(),
            }),
        ))
        .unwrap();
        g.add_node(Node::new("z-greet", "Greeting", NodeKind::Action(ActionConfig::default())))
            .unwrap();
        g.add_node(Node::new("a-route", "Routing", NodeKind::Action(ActionConfig::default())))
            .unwrap();
        g.add_node(Node::new("m-end", "End", NodeKind::Finish(FinishConfig::default())))
            .unwrap();
        g.add_edge(Edge::default_hop("e1", "in", "z-greet")).unwrap();
        g.add_edge(Edge::default_hop("e2", "z-greet", "a-route")).unwrap();
        g.add_edge(Edge::default_hop("e3", "a-route", "m-end")).unwrap();

        g.add_child_item(
            "z-greet",
            ChildItem::new(
                "s1",
                "Welcome",
                ChildKind::Speak(SpeakConfig {
                    text: "Welcome".into(),
                    voice: Some("amy".into()),
                    extra: [("rate".to_string(), json!(1.2))].into_iter().collect(),
                }),
            ),
        )
        .unwrap();
        g.add_child_item(
            "a-route",
            ChildItem::new(
                "c1",
                "Reception",
                ChildKind::ConnectCall(ConnectCallConfig {
                    destination_number: Some("2001".into()),
                    extra: [("ringTimeout".to_string(), json!(30))].into_iter().collect(),
                }),
            ),
        )
        .unwrap();
        let mut notify = ChildItem::new(
            "n1",
            "CRM Event",
            ChildKind::Notify(NotifyConfig {
                event_type: "salesforce".into(),
                enabled: true,
                target: Some("case".into()),
                extra: Default::default(),
            }),
        );
        notify.subscription_id = Some("sub-9".into());
        g.add_child_item("a-route", notify).unwrap();
        g
    }

    #[test]
    fn items_follow_default_edge_chain() {
        let g = sample_graph();
        let doc = serialize_graph(&g).unwrap();
        let ids: Vec<&str> = doc.items.iter().map(|i| i.id.as_str()).collect();
        // Chain order, not BTreeMap id order ("a-route" < "m-end" < "z-greet").
        assert_eq!(ids, vec!["z-greet", "a-route", "m-end"]);
    }

    #[test]
    fn destination_number_lifted_to_dedicated_field() {
        let doc = serialize_graph(&sample_graph()).unwrap();
        let routing = &doc.items[1];
        let connect = &routing.sub_items[0];
        assert_eq!(connect.destination_number.as_deref(), Some("2001"));
        assert!(!connect.extra.contains_key("destinationNumber"));
        assert_eq!(connect.extra["ringTimeout"], json!(30));
    }

    #[test]
    fn round_trip_preserves_child_config() {
        let g = sample_graph();
        let doc = serialize_graph(&g).unwrap();
        let parsed = parse_document(&doc).unwrap();

        for node in g.nodes.values().filter(|n| n.kind.is_container()) {
            let back = parsed.node(&node.id).unwrap_or_else(|| panic!("missing {}", node.id));
            assert_eq!(back.name, node.name);
            assert_eq!(back.items.len(), node.items.len(), "node {}", node.id);
            for (a, b) in node.items.iter().zip(&back.items) {
                assert_eq!(a.id, b.id);
                assert_eq!(a.kind, b.kind, "child {} config drifted", a.id);
                assert_eq!(a.subscription_id, b.subscription_id);
            }
        }
    }

    #[test]
    fn double_round_trip_is_stable() {
        let g = sample_graph();
        let doc = serialize_graph(&g).unwrap();
        let doc2 = serialize_graph(&parse_document(&doc).unwrap()).unwrap();
        assert_eq!(doc.items, doc2.items);
    }

    #[test]
    fn parse_synthesizes_positions_and_chain_edges() {
        let doc = serialize_graph(&sample_graph()).unwrap();
        let parsed = parse_document(&doc).unwrap();

        assert_eq!(parsed.edges.len(), 2);
        assert!(parsed.edges.iter().all(|e| e.kind == EdgeKind::Default));
        assert_eq!(parsed.edges[0].source, "z-greet");
        assert_eq!(parsed.edges[0].target, "a-route");

        let xs: Vec<f64> = doc
            .items
            .iter()
            .map(|i| parsed.node(&i.id).unwrap().position.x)
            .collect();
        assert!(xs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn parse_carries_document_identity() {
        let mut doc = serialize_graph(&sample_graph()).unwrap();
        doc.id = Some(42);
        let parsed = parse_document(&doc).unwrap();
        assert_eq!(parsed.policy_id, Some(42));
        assert_eq!(parsed.name, "Main IVR");
        assert!(parsed.enabled);
    }

    #[test]
    fn unknown_template_id_rejected() {
        let mut doc = serialize_graph(&sample_graph()).unwrap();
        doc.items[0].template_id = "teleporter".into();
        let err = parse_document(&doc).unwrap_err();
        assert!(matches!(err, LegacyError::UnknownTemplate { template_id } if template_id == "teleporter"));
    }

    #[test]
    fn unknown_sub_item_template_rejected() {
        let mut doc = serialize_graph(&sample_graph()).unwrap();
        doc.items[0].sub_items[0].template_id = "hologram".into();
        let err = parse_document(&doc).unwrap_err();
        assert!(matches!(err, LegacyError::UnknownTemplate { .. }));
    }

    #[test]
    fn sparse_sub_item_order_renumbered() {
        let mut doc = serialize_graph(&sample_graph()).unwrap();
        // Routing has two sub items; make their order sparse and reversed.
        doc.items[1].sub_items[0].order = 7;
        doc.items[1].sub_items[1].order = 3;
        let parsed = parse_document(&doc).unwrap();
        let items = &parsed.node("a-route").unwrap().items;
        assert_eq!(items[0].id, "n1");
        assert_eq!(items[1].id, "c1");
        assert_eq!(items[0].order, 0);
        assert_eq!(items[1].order, 1);
    }
}
