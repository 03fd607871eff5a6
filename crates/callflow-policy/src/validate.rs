//! Structural validation of a [`PolicyGraph`] before save.
//!
//! Violations are collected, not first-error, and block the save locally;
//! an invalid graph never reaches a remote collaborator.

use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::errors::ValidationError;
use crate::traits::ExtensionDirectory;
use crate::types::{PolicyGraph, MAX_EXTENSION, MIN_EXTENSION};

/// Validate a graph for structural correctness.
///
/// Returns `Ok(())` if the graph is valid, or `Err` with every violation
/// found.
pub fn validate_graph(
    graph: &PolicyGraph,
    directory: &dyn ExtensionDirectory,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // 1. At least one entry point.
    let entry_ids: Vec<&str> = graph
        .nodes
        .values()
        .filter(|n| n.kind.is_entry_point())
        .map(|n| n.id.as_str())
        .collect();
    if entry_ids.is_empty() {
        errors.push(ValidationError::MissingEntryPoint);
    }

    // 2. Every edge endpoint exists. The mutation operations already
    //    enforce this; a deserialized graph may not have gone through them.
    let node_ids: HashSet<&str> = graph.nodes.keys().map(String::as_str).collect();
    for edge in &graph.edges {
        for endpoint in [&edge.source, &edge.target] {
            if !node_ids.contains(endpoint.as_str()) {
                errors.push(ValidationError::DanglingEdge {
                    edge_id: edge.id.clone(),
                    node_id: endpoint.clone(),
                });
            }
        }
    }

    // 3. A terminal node (finish or toPolicy) is reachable from an entry
    //    point.
    if !entry_ids.is_empty() && !terminal_reachable(graph, &entry_ids) {
        errors.push(ValidationError::NoReachableTerminal);
    }

    // 4. Extension numbers: present, in range, unique in the graph, and
    //    available per the external directory.
    let mut by_extension: BTreeMap<u32, usize> = BTreeMap::new();
    for node in graph.nodes.values() {
        if !matches!(node.kind, crate::types::NodeKind::ExtensionNumber(_)) {
            continue;
        }
        let Some(extension) = node.kind.extension() else {
            errors.push(ValidationError::MissingExtension {
                node_id: node.id.clone(),
            });
            continue;
        };
        if !(MIN_EXTENSION..=MAX_EXTENSION).contains(&extension) {
            errors.push(ValidationError::ExtensionOutOfRange {
                node_id: node.id.clone(),
                extension,
                min: MIN_EXTENSION,
                max: MAX_EXTENSION,
            });
            continue;
        }
        *by_extension.entry(extension).or_default() += 1;
        if !directory.is_extension_available(extension) {
            errors.push(ValidationError::ExtensionUnavailable {
                node_id: node.id.clone(),
                extension,
            });
        }
    }
    for (extension, count) in by_extension {
        if count > 1 {
            errors.push(ValidationError::DuplicateExtension { extension });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// BFS over edges from the entry points, looking for a terminal node.
fn terminal_reachable(graph: &PolicyGraph, entry_ids: &[&str]) -> bool {
    let mut outgoing: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for edge in &graph.edges {
        outgoing
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = entry_ids.iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        if let Some(node) = graph.nodes.get(id) {
            if node.kind.is_terminal() {
                return true;
            }
        }
        if let Some(next) = outgoing.get(id) {
            queue.extend(next.iter().copied());
        }
    }
    false
}
