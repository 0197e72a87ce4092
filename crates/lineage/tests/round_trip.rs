//! Round-trip tests for the persistence codec.
//!
//! The wire format must reproduce the full state, including the
//! container types with no native JSON shape (ordered sets, ordered
//! maps, the provenance ledger) and graphs with cyclic relationships.

mod common;

use common::{add_from_catalog, engine, table};
use lineage::domain::{
    Catalog, Edge, FilterCriteria, GraphState, NodeId, Position, Viewport,
};
use lineage::engine::GraphEngine;
use lineage::persistence;
use lineage::resolver::{RelationshipResolver, ResolverConfig};
use std::collections::BTreeMap;

fn round_trip(state: &GraphState) -> GraphState {
    let text = persistence::export_text(state).expect("export");
    persistence::import_text(&text).expect("import")
}

#[test]
fn empty_state_round_trips() {
    let state = GraphState::new("empty");
    assert_eq!(round_trip(&state), state);
}

#[test]
fn single_node_state_round_trips() {
    let mut engine = engine();
    add_from_catalog(&mut engine, "orders");
    let state = engine.snapshot();
    assert_eq!(round_trip(&state), state);
}

#[test]
fn cyclic_graph_round_trips() {
    let mut nodes = BTreeMap::new();
    let mut x = table("x", "db.s.x");
    x.metadata.upstream_refs = vec!["y".to_string()];
    let mut y = table("y", "db.s.y");
    y.metadata.upstream_refs = vec!["x".to_string()];
    nodes.insert(x.id.clone(), x);
    nodes.insert(y.id.clone(), y);
    let catalog = Catalog::new(
        nodes,
        vec![
            Edge::new("e-xy", "x", "y", "cycle"),
            Edge::new("e-yx", "y", "x", "cycle"),
        ],
    );

    let mut engine = GraphEngine::new(RelationshipResolver::new(
        catalog.clone(),
        ResolverConfig::default(),
    ));
    engine.add_node(catalog.node(&NodeId::new("x")).unwrap().clone(), Position::default());
    engine.expand_upstream(&NodeId::new("x"));

    let state = engine.snapshot();
    assert!(state.nodes.contains_key(&NodeId::new("y")));
    assert_eq!(round_trip(&state), state);
}

#[test]
fn full_session_state_round_trips() {
    let mut engine = engine();
    add_from_catalog(&mut engine, "orders");
    engine.expand_upstream(&NodeId::new("orders"));
    engine.select_node(&NodeId::new("stg_orders"));
    engine.focus_node(&NodeId::new("orders"));
    engine.set_viewport(Viewport {
        x: -50.0,
        y: 20.0,
        zoom: 0.75,
    });
    engine.apply_filters(FilterCriteria {
        search: Some("orders".to_string()),
        ..Default::default()
    });

    let state = engine.snapshot();
    let decoded = round_trip(&state);

    assert_eq!(decoded, state);
    // The pieces a lossy codec would be most likely to drop:
    assert_eq!(decoded.selected_nodes, state.selected_nodes);
    assert_eq!(decoded.focused_node, state.focused_node);
    assert_eq!(decoded.active_filters, state.active_filters);
    assert_eq!(decoded.expansions, state.expansions);
}

#[test]
fn collapse_stays_symmetric_after_round_trip() {
    let mut engine = engine();
    add_from_catalog(&mut engine, "orders");
    engine.expand_upstream(&NodeId::new("orders"));

    // Move the state through the codec, as a save/load would.
    let restored = round_trip(&engine.snapshot());
    let mut engine = GraphEngine::new(RelationshipResolver::new(
        common::catalog(),
        ResolverConfig::default(),
    ));
    engine.restore(restored);

    engine.collapse_upstream(&NodeId::new("orders"));
    let ids: Vec<&str> = engine.state().nodes.keys().map(NodeId::as_str).collect();
    assert_eq!(ids, vec!["orders"]);
}

#[test]
fn failed_import_leaves_caller_state_untouched() {
    let mut engine = engine();
    add_from_catalog(&mut engine, "orders");
    let before = engine.snapshot();

    // The caller only restores on Ok, so a failed decode cannot
    // partially apply.
    let result = persistence::import_text("{\"nodes\": [not json");
    assert!(result.is_err());
    assert_eq!(engine.snapshot(), before);
}

#[test]
fn share_locator_reproduces_session_state() {
    let mut engine = engine();
    add_from_catalog(&mut engine, "orders");
    engine.expand_upstream(&NodeId::new("orders"));
    let state = engine.snapshot();

    let locator =
        persistence::share_locator("https://example.com/lineage", &state).expect("share");
    let decoded = persistence::state_from_locator(&locator).expect("decode");
    assert_eq!(decoded, state);
}
