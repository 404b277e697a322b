//! In-process graph backend over petgraph.
//!
//! State lives only for the process lifetime. Used by tests and as a
//! zero-dependency development backend; implements the same capability
//! trait as the remote store, including the unique `name` index.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction as PetDirection;
use serde_json::Value;

use crate::client::GraphClient;
use crate::schema::SchemaDescriptor;
use crate::types::{
    Direction, Edge, EdgeId, Path, PathItem, PropertyMap, Vertex, VertexId, Walk, WalkStart,
};
use souschef_core::{Error, Result};

#[derive(Debug, Clone)]
struct StoredVertex {
    label: String,
    properties: PropertyMap,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    label: String,
    properties: PropertyMap,
}

struct State {
    graph: DiGraph<StoredVertex, StoredEdge>,
    /// Unique index on `name`, scoped by label.
    by_label_name: HashMap<(String, String), NodeIndex>,
    schema: Option<SchemaDescriptor>,
}

/// Thread-safe in-memory property graph.
pub struct MemoryGraph {
    inner: RwLock<State>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(State {
                graph: DiGraph::new(),
                by_label_name: HashMap::new(),
                schema: None,
            }),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.inner.read().graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.read().graph.edge_count()
    }
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

fn materialize_vertex(index: NodeIndex, stored: &StoredVertex) -> Vertex {
    Vertex {
        id: VertexId(index.index() as i64),
        label: stored.label.clone(),
        properties: stored.properties.clone(),
    }
}

fn materialize_edge(
    index: EdgeIndex,
    graph: &DiGraph<StoredVertex, StoredEdge>,
) -> Edge {
    let (source, target) = graph.edge_endpoints(index).expect("edge endpoints");
    let stored = &graph[index];
    Edge {
        id: EdgeId(index.index().to_string()),
        label: stored.label.clone(),
        out_v: VertexId(source.index() as i64),
        in_v: VertexId(target.index() as i64),
        properties: stored.properties.clone(),
    }
}

fn node_index(id: VertexId) -> NodeIndex {
    NodeIndex::new(id.0 as usize)
}

#[async_trait]
impl GraphClient for MemoryGraph {
    async fn schema(&self) -> Result<Option<SchemaDescriptor>> {
        Ok(self.inner.read().schema.clone())
    }

    async fn define_schema(&self, schema: &SchemaDescriptor) -> Result<SchemaDescriptor> {
        let mut state = self.inner.write();
        state.schema = Some(schema.clone());
        Ok(schema.clone())
    }

    async fn find_vertices(
        &self,
        label: &str,
        property: &str,
        value: &str,
    ) -> Result<Vec<Vertex>> {
        let state = self.inner.read();
        if property == "name" {
            let key = (label.to_string(), value.to_string());
            return Ok(state
                .by_label_name
                .get(&key)
                .map(|&idx| materialize_vertex(idx, &state.graph[idx]))
                .into_iter()
                .collect());
        }
        Ok(state
            .graph
            .node_indices()
            .filter(|&idx| {
                let v = &state.graph[idx];
                v.label == label && v.properties.get(property).and_then(Value::as_str) == Some(value)
            })
            .map(|idx| materialize_vertex(idx, &state.graph[idx]))
            .collect())
    }

    async fn create_vertex(&self, label: &str, properties: PropertyMap) -> Result<Vertex> {
        let mut state = self.inner.write();
        let name = properties.get("name").and_then(Value::as_str).map(str::to_string);
        if let Some(name) = &name {
            let key = (label.to_string(), name.clone());
            if state.by_label_name.contains_key(&key) {
                return Err(Error::Graph(format!(
                    "unique index violation: {} vertex named '{}' already exists",
                    label, name
                )));
            }
        }
        let idx = state.graph.add_node(StoredVertex {
            label: label.to_string(),
            properties,
        });
        if let Some(name) = name {
            state.by_label_name.insert((label.to_string(), name), idx);
        }
        Ok(materialize_vertex(idx, &state.graph[idx]))
    }

    async fn create_edge(
        &self,
        label: &str,
        out_v: VertexId,
        in_v: VertexId,
        properties: PropertyMap,
    ) -> Result<Edge> {
        let mut state = self.inner.write();
        let (from, to) = (node_index(out_v), node_index(in_v));
        if state.graph.node_weight(from).is_none() || state.graph.node_weight(to).is_none() {
            return Err(Error::Graph(format!(
                "cannot create edge {} -> {}: unknown vertex",
                out_v, in_v
            )));
        }
        let idx = state.graph.add_edge(
            from,
            to,
            StoredEdge {
                label: label.to_string(),
                properties,
            },
        );
        Ok(materialize_edge(idx, &state.graph))
    }

    async fn update_edge(&self, edge: &Edge) -> Result<()> {
        let mut state = self.inner.write();
        let idx = edge
            .id
            .0
            .parse::<usize>()
            .map(EdgeIndex::new)
            .map_err(|_| Error::Graph(format!("unknown edge id {}", edge.id)))?;
        match state.graph.edge_weight_mut(idx) {
            Some(stored) => {
                stored.properties = edge.properties.clone();
                Ok(())
            }
            None => Err(Error::Graph(format!("unknown edge id {}", edge.id))),
        }
    }

    async fn traverse(&self, walk: &Walk) -> Result<Vec<Path>> {
        let state = self.inner.read();
        let graph = &state.graph;

        // Seed the frontier from the walk start.
        let mut paths: Vec<Path> = match &walk.start {
            WalkStart::Vertex(id) => graph
                .node_weight(node_index(*id))
                .map(|stored| Path {
                    items: vec![PathItem::Vertex(materialize_vertex(node_index(*id), stored))],
                })
                .into_iter()
                .collect(),
            WalkStart::Lookup {
                label,
                property,
                value,
            } => {
                let mut seeds = Vec::new();
                if property == "name" {
                    if let Some(&idx) =
                        state.by_label_name.get(&(label.clone(), value.clone()))
                    {
                        seeds.push(idx);
                    }
                } else {
                    seeds.extend(graph.node_indices().filter(|&idx| {
                        let v = &graph[idx];
                        v.label == *label
                            && v.properties.get(property).and_then(Value::as_str) == Some(value)
                    }));
                }
                seeds
                    .into_iter()
                    .map(|idx| Path {
                        items: vec![PathItem::Vertex(materialize_vertex(idx, &graph[idx]))],
                    })
                    .collect()
            }
        };

        for step in &walk.steps {
            // Expand every frontier path across matching edges.
            let mut candidates: Vec<(Path, EdgeIndex, NodeIndex)> = Vec::new();
            for path in &paths {
                let last = match path.last_vertex() {
                    Some(v) => node_index(v.id),
                    None => continue,
                };
                let direction = match step.direction {
                    Direction::Out => PetDirection::Outgoing,
                    Direction::In => PetDirection::Incoming,
                };
                for edge_ref in graph.edges_directed(last, direction) {
                    let stored = edge_ref.weight();
                    if let Some(label) = &step.edge_label {
                        if stored.label != *label {
                            continue;
                        }
                    }
                    if !step.edge_filters.iter().all(|f| f.matches(&stored.properties)) {
                        continue;
                    }
                    let target = match step.direction {
                        Direction::Out => edge_ref.target(),
                        Direction::In => edge_ref.source(),
                    };
                    candidates.push((path.clone(), edge_ref.id(), target));
                }
            }

            // Global ordering over the traversal stream, like an order()
            // barrier in the remote query language.
            if let Some(property) = &step.order_edges_desc {
                candidates.sort_by_key(|(_, edge_idx, _)| {
                    std::cmp::Reverse(
                        graph[*edge_idx]
                            .properties
                            .get(property)
                            .and_then(Value::as_i64)
                            .unwrap_or(0),
                    )
                });
            }

            // Land on targets passing the vertex filters.
            let mut next = Vec::new();
            for (mut path, edge_idx, target) in candidates {
                if let Some(id) = step.target_id {
                    if target != node_index(id) {
                        continue;
                    }
                }
                let stored = &graph[target];
                if let Some(label) = &step.target_label {
                    if stored.label != *label {
                        continue;
                    }
                }
                if !step.target_filters.iter().all(|f| f.matches(&stored.properties)) {
                    continue;
                }
                path.items.push(PathItem::Edge(materialize_edge(edge_idx, graph)));
                path.items.push(PathItem::Vertex(materialize_vertex(target, stored)));
                next.push(path);
            }
            paths = next;
        }

        if let Some(limit) = walk.limit {
            paths.truncate(limit);
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PropertyFilter, WalkStep};
    use serde_json::json;

    fn props(pairs: &[(&str, Value)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn unique_index_rejects_duplicates() {
        let graph = MemoryGraph::new();
        graph
            .create_vertex("person", props(&[("name", json!("U1"))]))
            .await
            .unwrap();
        let err = graph
            .create_vertex("person", props(&[("name", json!("U1"))]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Graph(_)));
    }

    #[tokio::test]
    async fn walk_orders_by_edge_property() {
        let graph = MemoryGraph::new();
        let person = graph
            .create_vertex("person", props(&[("name", json!("U1"))]))
            .await
            .unwrap();
        for (name, count) in [("r1", 3), ("r2", 1), ("r3", 5)] {
            let recipe = graph
                .create_vertex(
                    "recipe",
                    props(&[("name", json!(name)), ("title", json!(name))]),
                )
                .await
                .unwrap();
            graph
                .create_edge(
                    "selects",
                    person.id,
                    recipe.id,
                    props(&[("count", json!(count))]),
                )
                .await
                .unwrap();
        }

        let walk = Walk::from_vertex(person.id)
            .step(
                WalkStep::outgoing()
                    .order_edges_desc("count")
                    .to_label("recipe"),
            )
            .limit(10);
        let paths = graph.traverse(&walk).await.unwrap();
        let names: Vec<&str> = paths
            .iter()
            .map(|p| p.last_vertex().unwrap().name())
            .collect();
        assert_eq!(names, vec!["r3", "r1", "r2"]);
    }

    #[tokio::test]
    async fn walk_filters_exclude_vertices() {
        let graph = MemoryGraph::new();
        let anchor = graph
            .create_vertex("ingredient", props(&[("name", json!("onion"))]))
            .await
            .unwrap();
        for user in ["U1", "U2"] {
            let person = graph
                .create_vertex("person", props(&[("name", json!(user))]))
                .await
                .unwrap();
            graph
                .create_edge("selects", person.id, anchor.id, props(&[("count", json!(1))]))
                .await
                .unwrap();
        }

        let walk = Walk::from_lookup("ingredient", "name", "onion").step(
            WalkStep::incoming()
                .to_label("person")
                .filter_target(PropertyFilter::neq("name", "U1")),
        );
        let paths = graph.traverse(&walk).await.unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].last_vertex().unwrap().name(), "U2");
    }
}
