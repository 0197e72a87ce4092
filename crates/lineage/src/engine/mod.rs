//! The graph state store.
//!
//! [`GraphEngine`] owns the authoritative [`GraphState`] and exposes the
//! command interface consumed by the presentation layer: add/remove,
//! expand/collapse with provenance tracking, group-node lifecycle,
//! selection and focus, filtering, and metadata updates with explicit
//! relationship refresh.
//!
//! The engine is single-threaded and synchronous: every command runs to
//! completion before returning, and callers are expected to invoke it
//! from a single event-processing thread. Operations on absent ids are
//! no-ops, never errors.
//!
//! The relationship resolver is injected at construction, so multiple
//! independent graphs (and tests) can coexist in one process.

use crate::domain::{
    Edge, EdgeId, EdgeState, ExpandDirection, FilterCriteria, FilterOptions, GraphState,
    GroupInfo, Node, NodeId, NodeMetadataPatch, NodeState, ObjectType, Position, Viewport,
};
use crate::resolver::RelationshipResolver;
use chrono::Utc;
use std::collections::BTreeSet;
use tracing::debug;

/// Horizontal offset between a pivot and nodes added by expansion.
/// Upstream nodes go to negative x, downstream to positive x.
const EXPANSION_X_OFFSET: f64 = 320.0;

/// Vertical stagger between sibling nodes added by one expansion.
const EXPANSION_Y_STEP: f64 = 140.0;

/// The graph state store and command interface.
pub struct GraphEngine {
    state: GraphState,
    resolver: RelationshipResolver,
}

impl GraphEngine {
    /// Create an engine with an empty graph over the given resolver.
    #[must_use]
    pub fn new(resolver: RelationshipResolver) -> Self {
        Self {
            state: GraphState::new("untitled"),
            resolver,
        }
    }

    /// Read access to the current state.
    #[must_use]
    pub fn state(&self) -> &GraphState {
        &self.state
    }

    /// An owned snapshot of the current state, for history or saving.
    #[must_use]
    pub fn snapshot(&self) -> GraphState {
        self.state.clone()
    }

    /// Replace the whole state (load, import, undo, redo).
    pub fn restore(&mut self, state: GraphState) {
        self.state = state;
    }

    /// The injected resolver.
    #[must_use]
    pub fn resolver(&self) -> &RelationshipResolver {
        &self.resolver
    }

    // ========== Node and edge lifecycle ==========

    /// Insert a node at the given position.
    ///
    /// The node enters with state `{in-graph, visible}` and its
    /// relationship caches populated from the resolver. Inserting an id
    /// that already exists overwrites the previous node.
    pub fn add_node(&mut self, node: Node, position: Position) {
        self.insert_node(node, position);
        self.touch();
    }

    /// Remove a node, cascading to its edges.
    ///
    /// All edges touching the node are removed, and the node is purged
    /// from selection, focus, and the expansion provenance ledger.
    /// No-op if the id is absent.
    pub fn remove_node(&mut self, id: &NodeId) {
        if self.state.nodes.remove(id).is_none() {
            return;
        }

        let touching: Vec<EdgeId> = self
            .state
            .edges
            .values()
            .filter(|edge| edge.source == *id || edge.target == *id)
            .map(|edge| edge.id.clone())
            .collect();
        for edge_id in &touching {
            self.state.edges.remove(edge_id);
            self.purge_edge_references(edge_id);
        }

        self.purge_node_references(id);
        self.touch();
    }

    /// Insert an edge.
    ///
    /// Ignored unless both endpoints are present nodes.
    pub fn add_edge(&mut self, mut edge: Edge) {
        if !self.state.nodes.contains_key(&edge.source)
            || !self.state.nodes.contains_key(&edge.target)
        {
            debug!(edge = %edge.id, "ignoring edge with absent endpoint");
            return;
        }
        edge.states = BTreeSet::from([EdgeState::InGraph, EdgeState::Visible]);
        self.state.edges.insert(edge.id.clone(), edge);
        self.touch();
    }

    /// Remove an edge. No-op if absent.
    pub fn remove_edge(&mut self, id: &EdgeId) {
        if self.state.edges.remove(id).is_none() {
            return;
        }
        self.purge_edge_references(id);
        self.touch();
    }

    // ========== Expansion and collapse ==========

    /// Expand the pivot's upstream neighborhood.
    pub fn expand_upstream(&mut self, id: &NodeId) {
        self.expand(id, ExpandDirection::Upstream);
    }

    /// Expand the pivot's downstream neighborhood.
    pub fn expand_downstream(&mut self, id: &NodeId) {
        self.expand(id, ExpandDirection::Downstream);
    }

    /// Collapse the pivot's upstream expansion.
    pub fn collapse_upstream(&mut self, id: &NodeId) {
        self.collapse(id, ExpandDirection::Upstream);
    }

    /// Collapse the pivot's downstream expansion.
    pub fn collapse_downstream(&mut self, id: &NodeId) {
        self.collapse(id, ExpandDirection::Downstream);
    }

    fn expand(&mut self, id: &NodeId, direction: ExpandDirection) {
        let Some(pivot) = self.state.nodes.get(id).cloned() else {
            return;
        };

        let live_ids: BTreeSet<NodeId> = self.state.nodes.keys().cloned().collect();
        let closure = self.resolver.closure(&pivot, direction);
        let plan = self.resolver.plan_expansion(&pivot, direction, &live_ids);

        let introduced: BTreeSet<NodeId> =
            plan.nodes.iter().map(|node| node.id.clone()).collect();

        // Nodes this expansion reveals that an earlier expansion already
        // introduced are recorded here too: they stay until the last
        // referencing pivot collapses. Manually added nodes are never
        // recorded, so no collapse can remove them.
        let expansion_owned: BTreeSet<NodeId> = self
            .state
            .expansions
            .values()
            .flat_map(|record| record.upstream.iter().chain(record.downstream.iter()))
            .cloned()
            .collect();
        let referenced: BTreeSet<NodeId> = introduced
            .iter()
            .cloned()
            .chain(
                closure
                    .nodes
                    .iter()
                    .filter(|id| expansion_owned.contains(*id))
                    .cloned(),
            )
            .collect();
        debug!(
            pivot = %id,
            ?direction,
            introduced = introduced.len(),
            "expanding"
        );

        let x_offset = match direction {
            ExpandDirection::Upstream => -EXPANSION_X_OFFSET,
            ExpandDirection::Downstream => EXPANSION_X_OFFSET,
        };
        let spread = (plan.nodes.len().saturating_sub(1)) as f64 * EXPANSION_Y_STEP / 2.0;
        for (index, node) in plan.nodes.into_iter().enumerate() {
            let position = Position::new(
                pivot.position.x + x_offset,
                pivot.position.y + (index as f64) * EXPANSION_Y_STEP - spread,
            );
            self.insert_node(node, position);
        }

        for edge in plan.edges {
            if !self.state.edges.contains_key(&edge.id) {
                self.add_edge(edge);
            }
        }

        if let Some(pivot) = self.state.nodes.get_mut(id) {
            pivot.states.insert(match direction {
                ExpandDirection::Upstream => NodeState::ExpandedUpstream,
                ExpandDirection::Downstream => NodeState::ExpandedDownstream,
            });
        }

        // Union rather than replace: re-expanding without collapsing
        // introduces nothing new and must not forget earlier provenance.
        // An expansion that reveals nothing leaves no record behind.
        if !referenced.is_empty() {
            let record = self.state.expansions.entry(id.clone()).or_default();
            match direction {
                ExpandDirection::Upstream => record.upstream.extend(referenced),
                ExpandDirection::Downstream => record.downstream.extend(referenced),
            }
        }

        self.touch();
    }

    fn collapse(&mut self, id: &NodeId, direction: ExpandDirection) {
        if !self.state.nodes.contains_key(id) {
            return;
        }

        let recorded = match self.state.expansions.get_mut(id) {
            Some(record) => match direction {
                ExpandDirection::Upstream => std::mem::take(&mut record.upstream),
                ExpandDirection::Downstream => std::mem::take(&mut record.downstream),
            },
            None => BTreeSet::new(),
        };
        self.state
            .expansions
            .retain(|_, record| !record.is_empty());

        // A recorded node stays if any other still-active expansion
        // also introduced it.
        let mut still_required: BTreeSet<NodeId> = BTreeSet::new();
        for record in self.state.expansions.values() {
            still_required.extend(record.upstream.iter().cloned());
            still_required.extend(record.downstream.iter().cloned());
        }

        for node_id in &recorded {
            if !still_required.contains(node_id) {
                self.remove_node(node_id);
            }
        }

        if let Some(pivot) = self.state.nodes.get_mut(id) {
            pivot.states.remove(&match direction {
                ExpandDirection::Upstream => NodeState::ExpandedUpstream,
                ExpandDirection::Downstream => NodeState::ExpandedDownstream,
            });
        }

        self.touch();
    }

    // ========== Group nodes ==========

    /// Insert a synthetic group node bundling the given members.
    ///
    /// Members currently in the graph are removed; the member list is
    /// carried in the group node's metadata so removal can restore them.
    pub fn add_group_node(
        &mut self,
        group_id: impl Into<NodeId>,
        parent: NodeId,
        direction: ExpandDirection,
        members: Vec<NodeId>,
        position: Position,
    ) {
        let group_id = group_id.into();
        let mut node = Node::new(
            group_id.clone(),
            format!("{} grouped nodes", members.len()),
            group_id.as_str(),
            ObjectType::Group,
        );
        node.metadata.group = Some(GroupInfo {
            parent,
            direction,
            members: members.clone(),
        });

        for member in &members {
            self.remove_node(member);
        }

        self.insert_node(node, position);
        if let Some(group) = self.state.nodes.get_mut(&group_id) {
            group.states.insert(NodeState::GroupNode);
        }
        self.touch();
    }

    /// Remove a group node, restoring its members from the catalog.
    ///
    /// Each member not already present is re-added at a neutral
    /// position; repositioning is left to the presentation layer.
    /// No-op if the id is absent or not a group node.
    pub fn remove_group_node(&mut self, id: &NodeId) {
        let Some(node) = self.state.nodes.get(id) else {
            return;
        };
        if !node.is_group() {
            return;
        }
        let members = node
            .metadata
            .group
            .as_ref()
            .map(|group| group.members.clone())
            .unwrap_or_default();

        for member in members {
            if self.state.nodes.contains_key(&member) {
                continue;
            }
            if let Some(catalog_node) = self.resolver.catalog().node(&member).cloned() {
                self.insert_node(catalog_node, Position::default());
            }
        }

        self.remove_node(id);
    }

    // ========== Selection and focus ==========

    /// Add a node to the selection. No-op if absent.
    pub fn select_node(&mut self, id: &NodeId) {
        if let Some(node) = self.state.nodes.get_mut(id) {
            node.states.insert(NodeState::Selected);
            self.state.selected_nodes.insert(id.clone());
            self.touch();
        }
    }

    /// Remove a node from the selection. No-op if absent.
    pub fn deselect_node(&mut self, id: &NodeId) {
        if self.state.selected_nodes.remove(id) {
            if let Some(node) = self.state.nodes.get_mut(id) {
                node.states.remove(&NodeState::Selected);
            }
            self.touch();
        }
    }

    /// Add several nodes to the selection; absent ids are skipped.
    pub fn select_nodes(&mut self, ids: &[NodeId]) {
        for id in ids {
            if let Some(node) = self.state.nodes.get_mut(id) {
                node.states.insert(NodeState::Selected);
                self.state.selected_nodes.insert(id.clone());
            }
        }
        self.touch();
    }

    /// Add an edge to the selection. No-op if absent.
    pub fn select_edge(&mut self, id: &EdgeId) {
        if let Some(edge) = self.state.edges.get_mut(id) {
            edge.states.insert(EdgeState::Selected);
            self.state.selected_edges.insert(id.clone());
            self.touch();
        }
    }

    /// Remove an edge from the selection. No-op if absent.
    pub fn deselect_edge(&mut self, id: &EdgeId) {
        if self.state.selected_edges.remove(id) {
            if let Some(edge) = self.state.edges.get_mut(id) {
                edge.states.remove(&EdgeState::Selected);
            }
            self.touch();
        }
    }

    /// Clear node and edge selection.
    pub fn clear_selection(&mut self) {
        let selected_nodes = std::mem::take(&mut self.state.selected_nodes);
        for id in &selected_nodes {
            if let Some(node) = self.state.nodes.get_mut(id) {
                node.states.remove(&NodeState::Selected);
            }
        }
        let selected_edges = std::mem::take(&mut self.state.selected_edges);
        for id in &selected_edges {
            if let Some(edge) = self.state.edges.get_mut(id) {
                edge.states.remove(&EdgeState::Selected);
            }
        }
        self.touch();
    }

    /// Focus a node. The focus slot holds at most one node; focusing a
    /// new node unfocuses the previous one. No-op if absent.
    pub fn focus_node(&mut self, id: &NodeId) {
        if !self.state.nodes.contains_key(id) {
            return;
        }
        if let Some(previous) = self.state.focused_node.take() {
            if let Some(node) = self.state.nodes.get_mut(&previous) {
                node.states.remove(&NodeState::Focused);
            }
        }
        if let Some(node) = self.state.nodes.get_mut(id) {
            node.states.insert(NodeState::Focused);
        }
        self.state.focused_node = Some(id.clone());
        self.touch();
    }

    /// Clear the node focus slot.
    pub fn unfocus_node(&mut self) {
        if let Some(previous) = self.state.focused_node.take() {
            if let Some(node) = self.state.nodes.get_mut(&previous) {
                node.states.remove(&NodeState::Focused);
            }
            self.touch();
        }
    }

    /// Focus an edge. Same single-slot semantics as node focus.
    pub fn focus_edge(&mut self, id: &EdgeId) {
        if !self.state.edges.contains_key(id) {
            return;
        }
        if let Some(previous) = self.state.focused_edge.take() {
            if let Some(edge) = self.state.edges.get_mut(&previous) {
                edge.states.remove(&EdgeState::Focused);
            }
        }
        if let Some(edge) = self.state.edges.get_mut(id) {
            edge.states.insert(EdgeState::Focused);
        }
        self.state.focused_edge = Some(id.clone());
        self.touch();
    }

    /// Clear the edge focus slot.
    pub fn unfocus_edge(&mut self) {
        if let Some(previous) = self.state.focused_edge.take() {
            if let Some(edge) = self.state.edges.get_mut(&previous) {
                edge.states.remove(&EdgeState::Focused);
            }
            self.touch();
        }
    }

    // ========== Visibility ==========

    /// Mark a node hidden. No-op if absent.
    pub fn hide_node(&mut self, id: &NodeId) {
        if let Some(node) = self.state.nodes.get_mut(id) {
            node.states.remove(&NodeState::Visible);
            node.states.insert(NodeState::Hidden);
            self.touch();
        }
    }

    /// Mark a node visible again. No-op if absent.
    pub fn show_node(&mut self, id: &NodeId) {
        if let Some(node) = self.state.nodes.get_mut(id) {
            node.states.remove(&NodeState::Hidden);
            node.states.insert(NodeState::Visible);
            self.touch();
        }
    }

    // ========== Metadata and relationships ==========

    /// Apply a metadata patch to a node. Only fields present in the
    /// patch are modified.
    ///
    /// Relationship caches are *not* invalidated here; call
    /// [`refresh_node_relationships`](Self::refresh_node_relationships)
    /// after changing reference lists.
    pub fn update_node_metadata(&mut self, id: &NodeId, patch: NodeMetadataPatch) {
        let Some(node) = self.state.nodes.get_mut(id) else {
            return;
        };
        if let Some(quality_score) = patch.quality_score {
            node.metadata.quality_score = Some(quality_score);
        }
        if let Some(freshness) = patch.freshness {
            node.metadata.freshness = Some(freshness);
        }
        if let Some(certification) = patch.certification {
            node.metadata.certification = Some(certification);
        }
        if let Some(tags) = patch.tags {
            node.metadata.tags = tags;
        }
        if let Some(upstream_refs) = patch.upstream_refs {
            node.metadata.upstream_refs = upstream_refs;
        }
        if let Some(downstream_refs) = patch.downstream_refs {
            node.metadata.downstream_refs = downstream_refs;
        }
        if let Some(column_lineage) = patch.column_lineage {
            node.metadata.column_lineage = column_lineage;
        }
        self.touch();
    }

    /// Re-run the resolver for one node's caches. No-op if absent.
    pub fn refresh_node_relationships(&mut self, id: &NodeId) {
        let Some(mut node) = self.state.nodes.get(id).cloned() else {
            return;
        };
        self.populate_caches(&mut node);
        self.state.nodes.insert(id.clone(), node);
        self.touch();
    }

    /// Re-run the resolver for every node's caches.
    pub fn refresh_all_relationships(&mut self) {
        let ids: Vec<NodeId> = self.state.nodes.keys().cloned().collect();
        for id in ids {
            let mut node = self.state.nodes[&id].clone();
            self.populate_caches(&mut node);
            self.state.nodes.insert(id, node);
        }
        self.touch();
    }

    /// Overwrite a node's position (layout-oracle write-back channel).
    pub fn update_node_position(&mut self, id: &NodeId, position: Position) {
        if let Some(node) = self.state.nodes.get_mut(id) {
            node.position = position;
            self.touch();
        }
    }

    // ========== Viewport and naming ==========

    /// Set the camera.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.state.viewport = viewport;
        self.touch();
    }

    /// Rename the graph.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.state.meta.name = name.into();
        self.touch();
    }

    // ========== Filtering ==========

    /// Record the active filters and return the ids of visible nodes
    /// satisfying all supplied predicates (conjunctive). An absent
    /// predicate imposes no constraint.
    pub fn apply_filters(&mut self, criteria: FilterCriteria) -> Vec<NodeId> {
        let matching = self.matching_nodes(&criteria);
        self.state.active_filters = criteria;
        self.touch();
        matching
    }

    /// Visible node ids satisfying all predicates, without recording
    /// the criteria as active.
    #[must_use]
    pub fn matching_nodes(&self, criteria: &FilterCriteria) -> Vec<NodeId> {
        self.state
            .nodes
            .values()
            .filter(|node| node.is_visible() && node_matches(node, criteria))
            .map(|node| node.id.clone())
            .collect()
    }

    /// Distinct values present in the currently visible nodes, for
    /// populating filter UIs.
    #[must_use]
    pub fn get_filter_options(&self) -> FilterOptions {
        let mut options = FilterOptions::default();
        for node in self.state.nodes.values().filter(|node| node.is_visible()) {
            options.node_types.insert(node.object_type);
            if let Some(schema) = node.schema() {
                options.schemas.insert(schema.to_string());
            }
            if let Some(database) = node.database() {
                options.databases.insert(database.to_string());
            }
            if let Some(score) = node.metadata.quality_score {
                options.quality_min =
                    Some(options.quality_min.map_or(score, |min: f64| min.min(score)));
                options.quality_max =
                    Some(options.quality_max.map_or(score, |max: f64| max.max(score)));
            }
        }
        options
    }

    // ========== Internals ==========

    /// Insert a node with fresh in-graph state and resolver caches.
    ///
    /// An overwrite of a selected or focused id keeps the node-level
    /// flags in lockstep with the graph-level selection and focus sets.
    fn insert_node(&mut self, mut node: Node, position: Position) {
        node.position = position;
        let group_flag = node.states.contains(&NodeState::GroupNode);
        node.states = BTreeSet::from([NodeState::InGraph, NodeState::Visible]);
        if group_flag || node.object_type == ObjectType::Group {
            node.states.insert(NodeState::GroupNode);
        }
        if self.state.selected_nodes.contains(&node.id) {
            node.states.insert(NodeState::Selected);
        }
        if self.state.focused_node.as_ref() == Some(&node.id) {
            node.states.insert(NodeState::Focused);
        }
        self.populate_caches(&mut node);
        self.state.nodes.insert(node.id.clone(), node);
    }

    /// Recompute a node's upstream/downstream caches from the resolver.
    fn populate_caches(&self, node: &mut Node) {
        let upstream = self
            .resolver
            .direct_neighbors(node, ExpandDirection::Upstream);
        let downstream = self
            .resolver
            .direct_neighbors(node, ExpandDirection::Downstream);
        node.upstream = upstream.nodes;
        node.downstream = downstream.nodes;

        if self.resolver.config().surface_unresolved {
            let mut unresolved = upstream.unresolved;
            unresolved.extend(downstream.unresolved);
            node.metadata.unresolved_refs = unresolved;
        } else {
            node.metadata.unresolved_refs.clear();
        }
    }

    /// Purge a removed node from selection, focus, and provenance.
    fn purge_node_references(&mut self, id: &NodeId) {
        self.state.selected_nodes.remove(id);
        if self.state.focused_node.as_ref() == Some(id) {
            self.state.focused_node = None;
        }
        self.state.expansions.remove(id);
        for record in self.state.expansions.values_mut() {
            record.upstream.remove(id);
            record.downstream.remove(id);
        }
        self.state
            .expansions
            .retain(|_, record| !record.is_empty());
    }

    /// Purge a removed edge from selection and focus.
    fn purge_edge_references(&mut self, id: &EdgeId) {
        self.state.selected_edges.remove(id);
        if self.state.focused_edge.as_ref() == Some(id) {
            self.state.focused_edge = None;
        }
    }

    fn touch(&mut self) {
        self.state.meta.updated_at = Utc::now();
    }
}

/// Whether a node satisfies all supplied predicates.
fn node_matches(node: &Node, criteria: &FilterCriteria) -> bool {
    if let Some(search) = &criteria.search {
        let needle = search.to_lowercase();
        let in_label = node.label.to_lowercase().contains(&needle);
        let in_name = node.qualified_name.to_lowercase().contains(&needle);
        if !in_label && !in_name {
            return false;
        }
    }
    if let Some(node_types) = &criteria.node_types {
        if !node_types.contains(&node.object_type) {
            return false;
        }
    }
    if let Some(schemas) = &criteria.schemas {
        let matches = node
            .schema()
            .is_some_and(|schema| schemas.iter().any(|s| s == schema));
        if !matches {
            return false;
        }
    }
    if let Some(databases) = &criteria.databases {
        let matches = node
            .database()
            .is_some_and(|database| databases.iter().any(|d| d == database));
        if !matches {
            return false;
        }
    }
    if let Some((min, max)) = criteria.quality {
        let in_range = node
            .metadata
            .quality_score
            .is_some_and(|score| score >= min && score <= max);
        if !in_range {
            return false;
        }
    }
    true
}
