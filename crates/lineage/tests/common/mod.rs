//! Shared fixtures for integration tests.
//!
//! Not every test binary uses every helper.
#![allow(dead_code)]

use lineage::domain::{Catalog, Edge, Node, NodeId, ObjectType, Position};
use lineage::engine::GraphEngine;
use lineage::resolver::{RelationshipResolver, ResolverConfig};
use std::collections::BTreeMap;

/// A small warehouse catalog:
///
/// ```text
/// raw_orders -> stg_orders -> orders -> revenue -> dashboard
///                 (metadata refs)      ^
///                            fx_rates -+   (metadata refs)
/// audit -> orders                          (static edge only)
/// ```
#[must_use]
pub fn catalog() -> Catalog {
    let mut nodes = BTreeMap::new();

    let raw_orders = table("raw_orders", "warehouse.raw.orders");
    nodes.insert(raw_orders.id.clone(), raw_orders);

    let mut stg_orders = table("stg_orders", "warehouse.staging.orders");
    stg_orders.metadata.upstream_refs = vec!["raw_orders".to_string()];
    stg_orders.metadata.downstream_refs = vec!["orders".to_string()];
    nodes.insert(stg_orders.id.clone(), stg_orders);

    let mut orders = table("orders", "analytics.core.orders");
    orders.metadata.upstream_refs = vec!["stg_orders".to_string()];
    orders.metadata.downstream_refs = vec!["revenue".to_string()];
    nodes.insert(orders.id.clone(), orders);

    let mut fx_rates = table("fx_rates", "analytics.core.fx_rates");
    fx_rates.metadata.downstream_refs = vec!["revenue".to_string()];
    nodes.insert(fx_rates.id.clone(), fx_rates);

    let mut revenue = table("revenue", "analytics.mart.revenue");
    revenue.metadata.upstream_refs = vec!["orders".to_string(), "fx_rates".to_string()];
    revenue.metadata.downstream_refs = vec!["dashboard".to_string()];
    nodes.insert(revenue.id.clone(), revenue);

    let mut dashboard = table("dashboard", "analytics.mart.dashboard");
    dashboard.metadata.upstream_refs = vec!["revenue".to_string()];
    nodes.insert(dashboard.id.clone(), dashboard);

    // audit relates to orders through a static edge only; orders has
    // metadata references, so audit must never appear via resolution
    // on orders.
    let audit = table("audit", "warehouse.audit.orders_audit");
    nodes.insert(audit.id.clone(), audit);

    let edges = vec![Edge::new("e-audit-orders", "audit", "orders", "static")];
    Catalog::new(nodes, edges)
}

#[must_use]
pub fn table(id: &str, qualified_name: &str) -> Node {
    Node::new(id, id.to_uppercase(), qualified_name, ObjectType::Table)
}

#[must_use]
pub fn engine() -> GraphEngine {
    GraphEngine::new(RelationshipResolver::new(
        catalog(),
        ResolverConfig::default(),
    ))
}

/// Add a catalog node to the engine at the origin.
pub fn add_from_catalog(engine: &mut GraphEngine, id: &str) {
    let node = engine
        .resolver()
        .catalog()
        .node(&NodeId::new(id))
        .expect("fixture node exists")
        .clone();
    engine.add_node(node, Position::default());
}
