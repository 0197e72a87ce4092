//! Domain types for the lineage graph.
//!
//! This module contains the core data model: node/edge identities, the
//! closed object-type tag set, state flags, metadata, filters, and the
//! whole-graph [`GraphState`] value that the engine owns and the
//! persistence codec round-trips.
//!
//! Sets are `BTreeSet` and mappings are `BTreeMap` throughout, so the
//! wire encoding is deterministic: sets become ordered sequences and
//! mappings become key/value records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Unique identifier for a node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a new node ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for an edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub String);

impl EdgeId {
    /// Create a new edge ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EdgeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EdgeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Object-type tag for a node.
///
/// A closed set; the engine treats the tag as opaque and only uses it
/// for filter matching. Rendering decisions driven by the tag belong to
/// the presentation layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectType {
    /// Warehouse table
    Table,

    /// Warehouse view
    View,

    /// Staging relation
    Stage,

    /// Logical dataset
    Dataset,

    /// Transformation model
    Model,

    /// External source
    External,

    /// Synthetic group node bundling other nodes
    Group,

    /// Documentation note
    Documentation,

    /// Free-floating sticky note
    StickyNote,

    /// Empty placeholder card
    EmptyCard,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Table => "table",
            Self::View => "view",
            Self::Stage => "stage",
            Self::Dataset => "dataset",
            Self::Model => "model",
            Self::External => "external",
            Self::Group => "group",
            Self::Documentation => "documentation",
            Self::StickyNote => "sticky-note",
            Self::EmptyCard => "empty-card",
        };
        write!(f, "{tag}")
    }
}

/// Per-node state flags.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum NodeState {
    /// Node is part of the live graph
    InGraph,

    /// Node is rendered
    Visible,

    /// Node is present but not rendered
    Hidden,

    /// Node is in the selection set
    Selected,

    /// Node holds the single focus slot
    Focused,

    /// Node's upstream neighborhood has been expanded
    ExpandedUpstream,

    /// Node's downstream neighborhood has been expanded
    ExpandedDownstream,

    /// Node is a synthetic group node
    GroupNode,
}

/// Per-edge state flags.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeState {
    /// Edge is part of the live graph
    InGraph,

    /// Edge is rendered
    Visible,

    /// Edge is present but not rendered
    Hidden,

    /// Edge is in the selection set
    Selected,

    /// Edge holds the single focus slot
    Focused,
}

/// A 2-D position in graph space.
///
/// Positions are geometry hints only; the external layout oracle may
/// overwrite them through `update_node_position`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate
    pub x: f64,

    /// Vertical coordinate
    pub y: f64,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The camera over the graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Horizontal pan offset
    pub x: f64,

    /// Vertical pan offset
    pub y: f64,

    /// Zoom factor (1.0 = 100%)
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// Direction of an expansion or group bundle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExpandDirection {
    /// Toward dependencies (data sources)
    Upstream,

    /// Toward dependents (data consumers)
    Downstream,
}

/// Column-level lineage entry for a single column.
///
/// References use `database.schema.table.column` syntax; the first three
/// dot-separated segments identify the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLineage {
    /// Upstream column references
    #[serde(default)]
    pub upstream: Vec<String>,

    /// Downstream column references
    #[serde(default)]
    pub downstream: Vec<String>,
}

/// Group-node fields carried in metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    /// The node this group was bundled from
    pub parent: NodeId,

    /// Which side of the parent the bundle represents
    pub direction: ExpandDirection,

    /// Member node ids carried by the bundle
    pub members: Vec<NodeId>,
}

/// Optional per-node metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Data quality score, typically 0.0 - 1.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,

    /// Freshness descriptor (e.g., "hourly", "2h ago")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freshness: Option<String>,

    /// Certification label, if the object is certified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification: Option<String>,

    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Explicit upstream references (ids, qualified names, or labels)
    #[serde(default)]
    pub upstream_refs: Vec<String>,

    /// Explicit downstream references (ids, qualified names, or labels)
    #[serde(default)]
    pub downstream_refs: Vec<String>,

    /// Column-level lineage, keyed by column name
    #[serde(default)]
    pub column_lineage: BTreeMap<String, ColumnLineage>,

    /// Group-node fields, present only on group nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupInfo>,

    /// References that failed to resolve during the last refresh.
    ///
    /// Populated only when the resolver is configured to surface
    /// unresolved references; empty otherwise.
    #[serde(default)]
    pub unresolved_refs: Vec<String>,
}

/// A node in the lineage graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,

    /// Display label
    pub label: String,

    /// Fully-qualified name (`database.schema.name`)
    pub qualified_name: String,

    /// Object-type tag
    pub object_type: ObjectType,

    /// Position in graph space
    #[serde(default)]
    pub position: Position,

    /// State flags
    #[serde(default)]
    pub states: BTreeSet<NodeState>,

    /// Cached upstream neighbor ids (resolver output, not authoritative)
    #[serde(default)]
    pub upstream: BTreeSet<NodeId>,

    /// Cached downstream neighbor ids (resolver output, not authoritative)
    #[serde(default)]
    pub downstream: BTreeSet<NodeId>,

    /// Optional metadata
    #[serde(default)]
    pub metadata: NodeMetadata,
}

impl Node {
    /// Create a node with empty state and metadata.
    pub fn new(
        id: impl Into<NodeId>,
        label: impl Into<String>,
        qualified_name: impl Into<String>,
        object_type: ObjectType,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            qualified_name: qualified_name.into(),
            object_type,
            position: Position::default(),
            states: BTreeSet::new(),
            upstream: BTreeSet::new(),
            downstream: BTreeSet::new(),
            metadata: NodeMetadata::default(),
        }
    }

    /// The database segment of the qualified name, when present.
    ///
    /// Qualified names follow `database.schema.name`; shorter names have
    /// no database segment.
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        let mut parts = self.qualified_name.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(db), Some(_), Some(_)) => Some(db),
            _ => None,
        }
    }

    /// The schema segment of the qualified name, when present.
    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        let parts: Vec<&str> = self.qualified_name.split('.').collect();
        match parts.len() {
            3.. => Some(parts[1]),
            2 => Some(parts[0]),
            _ => None,
        }
    }

    /// Whether the node carries the `Visible` flag.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.states.contains(&NodeState::Visible)
    }

    /// Whether the node is a synthetic group node.
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.states.contains(&NodeState::GroupNode) || self.object_type == ObjectType::Group
    }
}

/// A directional dependency edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier
    pub id: EdgeId,

    /// Source node id (upstream end)
    pub source: NodeId,

    /// Target node id (downstream end)
    pub target: NodeId,

    /// Relation tag, free-form, used only for display categorization
    #[serde(default)]
    pub relation: String,

    /// State flags
    #[serde(default)]
    pub states: BTreeSet<EdgeState>,
}

impl Edge {
    /// Create an edge with empty state.
    pub fn new(
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            relation: relation.into(),
            states: BTreeSet::new(),
        }
    }
}

/// Graph-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMeta {
    /// Human-readable graph name
    pub name: String,

    /// Schema version of the persisted form
    pub version: u32,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last-modified timestamp, updated by every mutation
    pub updated_at: DateTime<Utc>,
}

/// Current persisted-form schema version.
pub const GRAPH_SCHEMA_VERSION: u32 = 1;

impl GraphMeta {
    /// Create metadata stamped with the current time.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            version: GRAPH_SCHEMA_VERSION,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Record of which node ids a pivot's expansions introduced.
///
/// Collapse removes exactly these ids (minus ids still required by other
/// active expansions), which keeps collapse symmetric and prevents it
/// from removing nodes the pivot did not introduce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpansionRecord {
    /// Ids introduced by the most recent upstream expansion
    #[serde(default)]
    pub upstream: BTreeSet<NodeId>,

    /// Ids introduced by the most recent downstream expansion
    #[serde(default)]
    pub downstream: BTreeSet<NodeId>,
}

impl ExpansionRecord {
    /// Whether both direction sets are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upstream.is_empty() && self.downstream.is_empty()
    }

    /// The set recorded for one direction.
    #[must_use]
    pub fn direction(&self, direction: ExpandDirection) -> &BTreeSet<NodeId> {
        match direction {
            ExpandDirection::Upstream => &self.upstream,
            ExpandDirection::Downstream => &self.downstream,
        }
    }
}

/// Filter predicates over visible nodes.
///
/// Predicates are conjunctive: a node must satisfy all supplied
/// predicates. An absent predicate imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Case-insensitive substring match over label and qualified name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    /// Accepted object types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_types: Option<Vec<ObjectType>>,

    /// Accepted schema names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schemas: Option<Vec<String>>,

    /// Accepted database names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub databases: Option<Vec<String>>,

    /// Inclusive quality-score range (min, max)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<(f64, f64)>,
}

impl FilterCriteria {
    /// Whether no predicate is supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.node_types.is_none()
            && self.schemas.is_none()
            && self.databases.is_none()
            && self.quality.is_none()
    }
}

/// Distinct values present in the visible graph, for populating filter UIs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Object types present
    pub node_types: BTreeSet<ObjectType>,

    /// Schema names present
    pub schemas: BTreeSet<String>,

    /// Database names present
    pub databases: BTreeSet<String>,

    /// Smallest quality score observed
    pub quality_min: Option<f64>,

    /// Largest quality score observed
    pub quality_max: Option<f64>,
}

/// Patch for updating node metadata.
///
/// Only fields present are modified. Relationship caches are not
/// invalidated by a patch; call the refresh operations after changing
/// reference lists.
#[derive(Debug, Clone, Default)]
pub struct NodeMetadataPatch {
    /// New quality score (if updating)
    pub quality_score: Option<f64>,

    /// New freshness descriptor (if updating)
    pub freshness: Option<String>,

    /// New certification label (if updating)
    pub certification: Option<String>,

    /// New tags (if updating)
    pub tags: Option<Vec<String>>,

    /// New upstream references (if updating)
    pub upstream_refs: Option<Vec<String>>,

    /// New downstream references (if updating)
    pub downstream_refs: Option<Vec<String>>,

    /// New column lineage (if updating)
    pub column_lineage: Option<BTreeMap<String, ColumnLineage>>,
}

/// The whole authoritative graph state.
///
/// Invariants maintained by the engine:
/// - every id in the selection sets and focus slots references a present
///   node/edge; removal purges them in the same operation
/// - both endpoints of every edge are present nodes
/// - node upstream/downstream sets are resolver-output caches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    /// Nodes by id
    pub nodes: BTreeMap<NodeId, Node>,

    /// Edges by id
    pub edges: BTreeMap<EdgeId, Edge>,

    /// Graph-level metadata
    pub meta: GraphMeta,

    /// Camera position
    #[serde(default)]
    pub viewport: Viewport,

    /// Selected node ids
    #[serde(default)]
    pub selected_nodes: BTreeSet<NodeId>,

    /// Selected edge ids
    #[serde(default)]
    pub selected_edges: BTreeSet<EdgeId>,

    /// The focused node, at most one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused_node: Option<NodeId>,

    /// The focused edge, at most one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused_edge: Option<EdgeId>,

    /// Active filter predicates
    #[serde(default)]
    pub active_filters: FilterCriteria,

    /// Expansion provenance ledger, keyed by pivot id
    #[serde(default)]
    pub expansions: BTreeMap<NodeId, ExpansionRecord>,
}

impl GraphState {
    /// Create an empty graph state with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            meta: GraphMeta::new(name),
            viewport: Viewport::default(),
            selected_nodes: BTreeSet::new(),
            selected_edges: BTreeSet::new(),
            focused_node: None,
            focused_edge: None,
            active_filters: FilterCriteria::default(),
            expansions: BTreeMap::new(),
        }
    }
}

/// The full, static universe of nodes and edges available for expansion.
///
/// Supplied once at engine construction and never mutated by the engine.
/// Distinct from the live, mutable in-graph subset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// All known nodes, by id
    pub nodes: BTreeMap<NodeId, Node>,

    /// Static edges, in catalog order
    pub edges: Vec<Edge>,
}

impl Catalog {
    /// Create a catalog from nodes and static edges.
    #[must_use]
    pub fn new(nodes: BTreeMap<NodeId, Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Look up a catalog node by id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_and_schema_from_qualified_name() {
        let node = Node::new("n1", "orders", "analytics.core.orders", ObjectType::Table);
        assert_eq!(node.database(), Some("analytics"));
        assert_eq!(node.schema(), Some("core"));
    }

    #[test]
    fn short_qualified_names_degrade_gracefully() {
        let two = Node::new("n1", "orders", "core.orders", ObjectType::Table);
        assert_eq!(two.database(), None);
        assert_eq!(two.schema(), Some("core"));

        let one = Node::new("n2", "note", "note", ObjectType::Documentation);
        assert_eq!(one.database(), None);
        assert_eq!(one.schema(), None);
    }

    #[test]
    fn object_type_uses_kebab_case_on_the_wire() {
        let json = serde_json::to_string(&ObjectType::StickyNote).unwrap();
        assert_eq!(json, r#""sticky-note""#);

        let back: ObjectType = serde_json::from_str(r#""empty-card""#).unwrap();
        assert_eq!(back, ObjectType::EmptyCard);
    }

    #[test]
    fn node_id_works_as_map_key_on_the_wire() {
        let mut nodes: BTreeMap<NodeId, Node> = BTreeMap::new();
        nodes.insert(
            NodeId::new("a"),
            Node::new("a", "A", "db.s.a", ObjectType::Table),
        );
        let json = serde_json::to_string(&nodes).unwrap();
        let back: BTreeMap<NodeId, Node> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert!(back.contains_key(&NodeId::new("a")));
    }

    #[test]
    fn filter_criteria_default_is_empty() {
        assert!(FilterCriteria::default().is_empty());
        let with_search = FilterCriteria {
            search: Some("orders".to_string()),
            ..Default::default()
        };
        assert!(!with_search.is_empty());
    }

    #[test]
    fn expansion_record_direction_accessor() {
        let mut record = ExpansionRecord::default();
        record.upstream.insert(NodeId::new("u1"));
        assert_eq!(record.direction(ExpandDirection::Upstream).len(), 1);
        assert!(record.direction(ExpandDirection::Downstream).is_empty());
        assert!(!record.is_empty());
    }
}
