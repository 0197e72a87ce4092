//! Relationship resolution over the static catalog.
//!
//! The resolver answers one question: given a node, what is its full
//! transitive upstream or downstream set over the *catalog* (not just
//! the live in-graph subset)? Per node, references come from three
//! sources, in priority order, using the first source that yields at
//! least one resolved node:
//!
//! 1. explicit upstream/downstream reference lists in metadata
//! 2. column-level lineage entries (the table prefix of each column
//!    reference is resolved as a table reference)
//! 3. static catalog edges
//!
//! Textual references resolve by exact id, then exact fully-qualified
//! name, then exact label. References that resolve to nothing are
//! dropped, never raised; when [`ResolverConfig::surface_unresolved`] is
//! set the caller can surface them as per-node data-quality warnings.
//!
//! Traversal is a depth-first closure with a visited-set guard: cycles
//! in the metadata (A references B, B references A) are tolerated, not
//! rejected.

use crate::domain::{Catalog, Edge, ExpandDirection, Node, NodeId};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Configuration for the resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolverConfig {
    /// When set, unresolved references are reported back to the caller
    /// (and written to node metadata by the refresh operations) instead
    /// of being silently dropped. Resolution misses are never errors
    /// either way.
    pub surface_unresolved: bool,
}

/// Result of a direct or transitive resolution.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Resolved catalog node ids
    pub nodes: BTreeSet<NodeId>,

    /// Textual references that resolved to no catalog node
    pub unresolved: Vec<String>,
}

/// Nodes and edges an expansion would introduce.
#[derive(Debug, Clone, Default)]
pub struct ExpansionPlan {
    /// Catalog nodes not currently in the live graph, in id order
    pub nodes: Vec<Node>,

    /// Catalog edges connecting the pivot and the discovered nodes
    pub edges: Vec<Edge>,

    /// Textual references that resolved to no catalog node
    pub unresolved: Vec<String>,
}

/// Resolves textual references and transitive relationship sets over a
/// read-only catalog.
///
/// Constructed once and passed to the graph engine (no global instance),
/// so multiple independent graphs can coexist in one process.
pub struct RelationshipResolver {
    catalog: Catalog,
    by_qualified_name: HashMap<String, NodeId>,
    by_label: HashMap<String, NodeId>,
    /// Static catalog edges as a petgraph for the fallback source
    edge_graph: DiGraph<NodeId, ()>,
    node_indices: HashMap<NodeId, NodeIndex>,
    config: ResolverConfig,
}

impl RelationshipResolver {
    /// Build a resolver over the given catalog.
    ///
    /// Lookup maps are keyed on exact qualified name and exact label;
    /// when several catalog nodes share a name, the first in id order
    /// wins. Static edges whose endpoints are unknown to the catalog
    /// are skipped.
    #[must_use]
    pub fn new(catalog: Catalog, config: ResolverConfig) -> Self {
        let mut by_qualified_name = HashMap::new();
        let mut by_label = HashMap::new();
        let mut edge_graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        // BTreeMap iteration gives id order, so first-wins is stable.
        for (id, node) in &catalog.nodes {
            by_qualified_name
                .entry(node.qualified_name.clone())
                .or_insert_with(|| id.clone());
            by_label
                .entry(node.label.clone())
                .or_insert_with(|| id.clone());
            let index = edge_graph.add_node(id.clone());
            node_indices.insert(id.clone(), index);
        }

        for edge in &catalog.edges {
            match (
                node_indices.get(&edge.source),
                node_indices.get(&edge.target),
            ) {
                (Some(&source), Some(&target)) => {
                    edge_graph.add_edge(source, target, ());
                }
                _ => {
                    debug!(
                        edge = %edge.id,
                        "skipping static edge with unknown endpoint"
                    );
                }
            }
        }

        Self {
            catalog,
            by_qualified_name,
            by_label,
            edge_graph,
            node_indices,
            config,
        }
    }

    /// The resolver's configuration.
    #[must_use]
    pub fn config(&self) -> ResolverConfig {
        self.config
    }

    /// The catalog this resolver was built over.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Resolve a textual reference to a catalog node id.
    ///
    /// Tries, in order: exact id match, exact fully-qualified-name
    /// match, exact label match. Returns `None` when nothing matches.
    #[must_use]
    pub fn resolve_reference(&self, reference: &str) -> Option<&NodeId> {
        let as_id = NodeId::new(reference);
        if let Some((id, _)) = self.catalog.nodes.get_key_value(&as_id) {
            return Some(id);
        }
        if let Some(id) = self.by_qualified_name.get(reference) {
            return Some(id);
        }
        self.by_label.get(reference)
    }

    /// Direct neighbors of a node in one direction.
    ///
    /// Uses the first of the three sources that yields at least one
    /// resolved node; unresolved references from the attempted sources
    /// are reported in the result.
    #[must_use]
    pub fn direct_neighbors(&self, node: &Node, direction: ExpandDirection) -> Resolution {
        let mut unresolved = Vec::new();

        // Source 1: explicit reference lists in metadata.
        let refs = match direction {
            ExpandDirection::Upstream => &node.metadata.upstream_refs,
            ExpandDirection::Downstream => &node.metadata.downstream_refs,
        };
        let resolved = self.resolve_all(refs, &mut unresolved);
        if !resolved.is_empty() {
            return Resolution {
                nodes: resolved,
                unresolved,
            };
        }

        // Source 2: column-level lineage table prefixes.
        let column_refs: Vec<String> = node
            .metadata
            .column_lineage
            .values()
            .flat_map(|entry| match direction {
                ExpandDirection::Upstream => entry.upstream.iter(),
                ExpandDirection::Downstream => entry.downstream.iter(),
            })
            .filter_map(|column_ref| table_reference(column_ref))
            .collect();
        let resolved = self.resolve_all(&column_refs, &mut unresolved);
        if !resolved.is_empty() {
            return Resolution {
                nodes: resolved,
                unresolved,
            };
        }

        // Source 3: static catalog edges.
        let mut nodes = BTreeSet::new();
        if let Some(&index) = self.node_indices.get(&node.id) {
            let petgraph_direction = match direction {
                ExpandDirection::Upstream => Direction::Incoming,
                ExpandDirection::Downstream => Direction::Outgoing,
            };
            for neighbor in self.edge_graph.neighbors_directed(index, petgraph_direction) {
                nodes.insert(self.edge_graph[neighbor].clone());
            }
        }

        Resolution { nodes, unresolved }
    }

    /// Full transitive closure in one direction, excluding the pivot.
    ///
    /// Depth-first over the per-node sources, with a visited-set guard:
    /// a node already visited is not re-expanded, so cyclic metadata is
    /// tolerated. The pivot's own (possibly live-updated) metadata is
    /// used for the first hop; catalog metadata is used for the rest.
    /// Deterministic for a fixed catalog and node.
    #[must_use]
    pub fn closure(&self, node: &Node, direction: ExpandDirection) -> Resolution {
        let mut visited: BTreeSet<NodeId> = BTreeSet::new();
        let mut unresolved = Vec::new();
        visited.insert(node.id.clone());

        let first_hop = self.direct_neighbors(node, direction);
        unresolved.extend(first_hop.unresolved);
        let mut stack: Vec<NodeId> = first_hop.nodes.into_iter().collect();

        while let Some(id) = stack.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            let Some(catalog_node) = self.catalog.node(&id) else {
                continue;
            };
            let hop = self.direct_neighbors(catalog_node, direction);
            unresolved.extend(hop.unresolved);
            for next in hop.nodes {
                if !visited.contains(&next) {
                    stack.push(next);
                }
            }
        }

        visited.remove(&node.id);
        Resolution {
            nodes: visited,
            unresolved,
        }
    }

    /// Plan an expansion: the nodes and edges to add for one pivot.
    ///
    /// Nodes to add are the transitive set minus ids already live.
    /// Edges to add are catalog edges whose endpoints are both within
    /// the transitive set plus the pivot, where at least one endpoint is
    /// the pivot or both endpoints are newly discovered.
    #[must_use]
    pub fn plan_expansion(
        &self,
        node: &Node,
        direction: ExpandDirection,
        live_ids: &BTreeSet<NodeId>,
    ) -> ExpansionPlan {
        let resolution = self.closure(node, direction);

        let new_ids: BTreeSet<NodeId> = resolution
            .nodes
            .iter()
            .filter(|id| !live_ids.contains(*id))
            .cloned()
            .collect();

        let mut universe = resolution.nodes.clone();
        universe.insert(node.id.clone());

        let edges = self
            .catalog
            .edges
            .iter()
            .filter(|edge| {
                let endpoints_known =
                    universe.contains(&edge.source) && universe.contains(&edge.target);
                let touches_pivot = edge.source == node.id || edge.target == node.id;
                let both_new = new_ids.contains(&edge.source) && new_ids.contains(&edge.target);
                endpoints_known && (touches_pivot || both_new)
            })
            .cloned()
            .collect();

        let nodes = new_ids
            .iter()
            .filter_map(|id| self.catalog.node(id).cloned())
            .collect();

        ExpansionPlan {
            nodes,
            edges,
            unresolved: resolution.unresolved,
        }
    }

    /// Resolve a batch of references, reporting misses.
    fn resolve_all(&self, references: &[String], unresolved: &mut Vec<String>) -> BTreeSet<NodeId> {
        let mut resolved = BTreeSet::new();
        for reference in references {
            match self.resolve_reference(reference) {
                Some(id) => {
                    resolved.insert(id.clone());
                }
                None => {
                    debug!(reference = %reference, "dropping unresolved reference");
                    unresolved.push(reference.clone());
                }
            }
        }
        resolved
    }
}

/// The table reference carried by a column reference.
///
/// Column references use `database.schema.table.column` syntax; the
/// first three segments identify the table. Shorter references keep
/// everything but the trailing column segment.
#[must_use]
pub fn table_reference(column_reference: &str) -> Option<String> {
    let segments: Vec<&str> = column_reference.split('.').collect();
    if segments.len() < 2 {
        return None;
    }
    let keep = segments.len().min(4) - 1;
    Some(segments[..keep].join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColumnLineage, ObjectType};
    use std::collections::BTreeMap;

    fn table(id: &str, qualified_name: &str) -> Node {
        Node::new(id, id.to_uppercase(), qualified_name, ObjectType::Table)
    }

    /// Catalog fixture:
    ///   a: metadata upstream ref -> "b"
    ///   b: no metadata; static edge c -> b
    ///   c: no relationships
    ///   d: column lineage upstream -> analytics.core.c (table "c")
    fn fixture_catalog() -> Catalog {
        let mut nodes = BTreeMap::new();

        let mut a = table("a", "analytics.core.a");
        a.metadata.upstream_refs = vec!["b".to_string()];
        nodes.insert(a.id.clone(), a);

        let b = table("b", "analytics.core.b");
        nodes.insert(b.id.clone(), b);

        let c = table("c", "analytics.core.c");
        nodes.insert(c.id.clone(), c);

        let mut d = table("d", "analytics.core.d");
        d.metadata.column_lineage.insert(
            "amount".to_string(),
            ColumnLineage {
                upstream: vec!["analytics.core.c.amount".to_string()],
                downstream: vec![],
            },
        );
        nodes.insert(d.id.clone(), d);

        let edges = vec![Edge::new("e-cb", "c", "b", "static")];
        Catalog::new(nodes, edges)
    }

    fn resolver() -> RelationshipResolver {
        RelationshipResolver::new(fixture_catalog(), ResolverConfig::default())
    }

    #[test]
    fn resolves_by_id_then_qualified_name_then_label() {
        let resolver = resolver();
        assert_eq!(resolver.resolve_reference("a"), Some(&NodeId::new("a")));
        assert_eq!(
            resolver.resolve_reference("analytics.core.b"),
            Some(&NodeId::new("b"))
        );
        assert_eq!(resolver.resolve_reference("C"), Some(&NodeId::new("c")));
        assert_eq!(resolver.resolve_reference("nope"), None);
    }

    #[test]
    fn metadata_source_takes_priority_over_static_edges() {
        let resolver = resolver();
        let catalog = resolver.catalog().clone();

        // a's metadata names b; the static edge c -> b must not leak
        // into a's direct set.
        let a = catalog.node(&NodeId::new("a")).unwrap();
        let direct = resolver.direct_neighbors(a, ExpandDirection::Upstream);
        assert_eq!(direct.nodes, BTreeSet::from([NodeId::new("b")]));

        // b has no metadata references, so the static edge applies.
        let b = catalog.node(&NodeId::new("b")).unwrap();
        let direct = resolver.direct_neighbors(b, ExpandDirection::Upstream);
        assert_eq!(direct.nodes, BTreeSet::from([NodeId::new("c")]));
    }

    #[test]
    fn column_lineage_is_second_priority() {
        let resolver = resolver();
        let catalog = resolver.catalog().clone();

        let d = catalog.node(&NodeId::new("d")).unwrap();
        let direct = resolver.direct_neighbors(d, ExpandDirection::Upstream);
        assert_eq!(direct.nodes, BTreeSet::from([NodeId::new("c")]));
    }

    #[test]
    fn closure_is_transitive_and_excludes_pivot() {
        let resolver = resolver();
        let catalog = resolver.catalog().clone();

        // a -> b (metadata), b -> c (static edge fallback)
        let a = catalog.node(&NodeId::new("a")).unwrap();
        let closure = resolver.closure(a, ExpandDirection::Upstream);
        assert_eq!(
            closure.nodes,
            BTreeSet::from([NodeId::new("b"), NodeId::new("c")])
        );
        assert!(!closure.nodes.contains(&NodeId::new("a")));
    }

    #[test]
    fn cyclic_references_are_tolerated() {
        let mut nodes = BTreeMap::new();
        let mut x = table("x", "db.s.x");
        x.metadata.upstream_refs = vec!["y".to_string()];
        let mut y = table("y", "db.s.y");
        y.metadata.upstream_refs = vec!["x".to_string()];
        nodes.insert(x.id.clone(), x.clone());
        nodes.insert(y.id.clone(), y);
        let resolver =
            RelationshipResolver::new(Catalog::new(nodes, vec![]), ResolverConfig::default());

        let closure = resolver.closure(&x, ExpandDirection::Upstream);
        // x reaches y, and the cycle back to x does not recurse forever
        // or put x in its own closure.
        assert_eq!(closure.nodes, BTreeSet::from([NodeId::new("y")]));
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let resolver = resolver();
        let catalog = resolver.catalog().clone();
        let a = catalog.node(&NodeId::new("a")).unwrap();

        let first = resolver.closure(a, ExpandDirection::Upstream);
        for _ in 0..5 {
            let again = resolver.closure(a, ExpandDirection::Upstream);
            assert_eq!(again.nodes, first.nodes);
        }
    }

    #[test]
    fn dangling_references_are_dropped_and_reported() {
        let mut node = table("z", "db.s.z");
        node.metadata.upstream_refs = vec!["ghost".to_string(), "b".to_string()];
        let resolver = resolver();

        let direct = resolver.direct_neighbors(&node, ExpandDirection::Upstream);
        assert_eq!(direct.nodes, BTreeSet::from([NodeId::new("b")]));
        assert_eq!(direct.unresolved, vec!["ghost".to_string()]);
    }

    #[test]
    fn all_dangling_references_fall_through_to_next_source() {
        // b has a static upstream edge from c; give a live copy of b
        // metadata refs that resolve to nothing. The resolver must fall
        // through to the static edge source.
        let resolver = resolver();
        let mut b = resolver.catalog().node(&NodeId::new("b")).unwrap().clone();
        b.metadata.upstream_refs = vec!["ghost".to_string()];

        let direct = resolver.direct_neighbors(&b, ExpandDirection::Upstream);
        assert_eq!(direct.nodes, BTreeSet::from([NodeId::new("c")]));
        assert_eq!(direct.unresolved, vec!["ghost".to_string()]);
    }

    #[test]
    fn plan_excludes_live_nodes() {
        let resolver = resolver();
        let catalog = resolver.catalog().clone();
        let a = catalog.node(&NodeId::new("a")).unwrap();

        let live = BTreeSet::from([NodeId::new("a"), NodeId::new("b")]);
        let plan = resolver.plan_expansion(a, ExpandDirection::Upstream, &live);

        let planned: Vec<&str> = plan.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(planned, vec!["c"]);
    }

    #[test]
    fn plan_edges_require_pivot_or_two_new_endpoints() {
        let resolver = resolver();
        let catalog = resolver.catalog().clone();
        let a = catalog.node(&NodeId::new("a")).unwrap();

        // Nothing live but the pivot: b and c are both new, so the
        // static edge c -> b qualifies (both endpoints newly discovered).
        let live = BTreeSet::from([NodeId::new("a")]);
        let plan = resolver.plan_expansion(a, ExpandDirection::Upstream, &live);
        let edge_ids: Vec<&str> = plan.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(edge_ids, vec!["e-cb"]);

        // With b and c already live, the edge has no new endpoint and
        // does not touch the pivot, so it is not re-introduced.
        let live = BTreeSet::from([NodeId::new("a"), NodeId::new("b"), NodeId::new("c")]);
        let plan = resolver.plan_expansion(a, ExpandDirection::Upstream, &live);
        assert!(plan.nodes.is_empty());
        assert!(plan.edges.is_empty());
    }

    #[test]
    fn table_reference_strips_column_segment() {
        assert_eq!(
            table_reference("analytics.core.orders.amount").as_deref(),
            Some("analytics.core.orders")
        );
        assert_eq!(
            table_reference("core.orders.amount").as_deref(),
            Some("core.orders")
        );
        assert_eq!(table_reference("orders.amount").as_deref(), Some("orders"));
        assert_eq!(table_reference("orders"), None);
    }
}
