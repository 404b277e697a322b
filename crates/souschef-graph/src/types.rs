//! Property-graph values and the typed traversal description.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flat property map for a vertex or edge.
pub type PropertyMap = serde_json::Map<String, Value>;

/// Store-assigned vertex identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexId(pub i64);

impl std::fmt::Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned edge identifier. Kept as a string: some stores hand out
/// non-numeric edge ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub String);

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A labeled vertex with its flattened properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub id: VertexId,
    pub label: String,
    pub properties: PropertyMap,
}

impl Vertex {
    /// String property accessor; absent or non-string properties read as `None`.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }

    /// The unique `name` property, empty if unset.
    pub fn name(&self) -> &str {
        self.property("name").unwrap_or("")
    }
}

/// A directed, labeled edge between two vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub label: String,
    pub out_v: VertexId,
    pub in_v: VertexId,
    pub properties: PropertyMap,
}

impl Edge {
    /// The access counter; absent reads as 0.
    pub fn count(&self) -> i64 {
        self.properties.get("count").and_then(Value::as_i64).unwrap_or(0)
    }
}

/// One element of a materialized traversal path.
#[derive(Debug, Clone)]
pub enum PathItem {
    Vertex(Vertex),
    Edge(Edge),
}

/// A materialized path: vertices and edges in traversal order.
#[derive(Debug, Clone, Default)]
pub struct Path {
    pub items: Vec<PathItem>,
}

impl Path {
    /// The vertices along the path, in order.
    pub fn vertices(&self) -> Vec<&Vertex> {
        self.items
            .iter()
            .filter_map(|item| match item {
                PathItem::Vertex(v) => Some(v),
                PathItem::Edge(_) => None,
            })
            .collect()
    }

    /// The edges along the path, in order.
    pub fn edges(&self) -> Vec<&Edge> {
        self.items
            .iter()
            .filter_map(|item| match item {
                PathItem::Edge(e) => Some(e),
                PathItem::Vertex(_) => None,
            })
            .collect()
    }

    /// The vertex the path currently ends on.
    pub fn last_vertex(&self) -> Option<&Vertex> {
        self.items.iter().rev().find_map(|item| match item {
            PathItem::Vertex(v) => Some(v),
            PathItem::Edge(_) => None,
        })
    }
}

// ---------------------------------------------------------------
// Traversal description
// ---------------------------------------------------------------

/// Where a walk begins.
#[derive(Debug, Clone)]
pub enum WalkStart {
    /// A known vertex id.
    Vertex(VertexId),
    /// Point lookup by label and property value.
    Lookup {
        label: String,
        property: String,
        value: String,
    },
}

/// Edge direction relative to the current vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow an outgoing edge forward to its head.
    Out,
    /// Follow an incoming edge backward to its tail.
    In,
}

/// Comparison operator for property filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Neq,
    Gt,
}

/// A property predicate applied to a vertex or edge along the walk.
#[derive(Debug, Clone)]
pub struct PropertyFilter {
    pub property: String,
    pub comparison: Comparison,
    pub value: Value,
}

impl PropertyFilter {
    pub fn eq(property: &str, value: impl Into<Value>) -> Self {
        Self {
            property: property.to_string(),
            comparison: Comparison::Eq,
            value: value.into(),
        }
    }

    pub fn neq(property: &str, value: impl Into<Value>) -> Self {
        Self {
            property: property.to_string(),
            comparison: Comparison::Neq,
            value: value.into(),
        }
    }

    pub fn gt(property: &str, value: impl Into<Value>) -> Self {
        Self {
            property: property.to_string(),
            comparison: Comparison::Gt,
            value: value.into(),
        }
    }

    /// Evaluate the predicate against a flat property map.
    pub fn matches(&self, properties: &PropertyMap) -> bool {
        let actual = properties.get(&self.property);
        match self.comparison {
            Comparison::Eq => actual == Some(&self.value),
            Comparison::Neq => actual != Some(&self.value),
            Comparison::Gt => match (actual.and_then(Value::as_i64), self.value.as_i64()) {
                (Some(a), Some(b)) => a > b,
                _ => false,
            },
        }
    }
}

/// One hop of a walk: cross an edge in a direction, land on a vertex.
#[derive(Debug, Clone)]
pub struct WalkStep {
    pub direction: Direction,
    pub edge_label: Option<String>,
    pub edge_filters: Vec<PropertyFilter>,
    /// Order the traversal stream by this edge property, descending, before
    /// landing on the target vertices.
    pub order_edges_desc: Option<String>,
    pub target_label: Option<String>,
    pub target_filters: Vec<PropertyFilter>,
    pub target_id: Option<VertexId>,
}

impl WalkStep {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            edge_label: None,
            edge_filters: Vec::new(),
            order_edges_desc: None,
            target_label: None,
            target_filters: Vec::new(),
            target_id: None,
        }
    }

    pub fn outgoing() -> Self {
        Self::new(Direction::Out)
    }

    pub fn incoming() -> Self {
        Self::new(Direction::In)
    }

    pub fn edge_label(mut self, label: &str) -> Self {
        self.edge_label = Some(label.to_string());
        self
    }

    pub fn filter_edge(mut self, filter: PropertyFilter) -> Self {
        self.edge_filters.push(filter);
        self
    }

    pub fn order_edges_desc(mut self, property: &str) -> Self {
        self.order_edges_desc = Some(property.to_string());
        self
    }

    pub fn to_label(mut self, label: &str) -> Self {
        self.target_label = Some(label.to_string());
        self
    }

    pub fn filter_target(mut self, filter: PropertyFilter) -> Self {
        self.target_filters.push(filter);
        self
    }

    pub fn to_vertex(mut self, id: VertexId) -> Self {
        self.target_id = Some(id);
        self
    }
}

/// A directed N-hop walk with label and property filters, ordering by an
/// edge property, and a result-count limit.
#[derive(Debug, Clone)]
pub struct Walk {
    pub start: WalkStart,
    pub steps: Vec<WalkStep>,
    pub limit: Option<usize>,
}

impl Walk {
    pub fn from_vertex(id: VertexId) -> Self {
        Self {
            start: WalkStart::Vertex(id),
            steps: Vec::new(),
            limit: None,
        }
    }

    pub fn from_lookup(label: &str, property: &str, value: &str) -> Self {
        Self {
            start: WalkStart::Lookup {
                label: label.to_string(),
                property: property.to_string(),
                value: value.to_string(),
            },
            steps: Vec::new(),
            limit: None,
        }
    }

    pub fn step(mut self, step: WalkStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
