//! The graph-store capability trait.
//!
//! Everything above this trait depends only on this capability set, not on
//! any particular query language or wire protocol.

use async_trait::async_trait;
use souschef_core::Result;

use crate::schema::SchemaDescriptor;
use crate::types::{Edge, Path, PropertyMap, Vertex, VertexId, Walk};

#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Read the registered schema, if any.
    async fn schema(&self) -> Result<Option<SchemaDescriptor>>;

    /// Register a schema and return the store's view of it.
    async fn define_schema(&self, schema: &SchemaDescriptor) -> Result<SchemaDescriptor>;

    /// Point lookup: all vertices with the given label whose property
    /// equals `value`.
    async fn find_vertices(&self, label: &str, property: &str, value: &str)
        -> Result<Vec<Vertex>>;

    /// Create a vertex. Duplicate unique-key creation is the store's
    /// responsibility to reject.
    async fn create_vertex(&self, label: &str, properties: PropertyMap) -> Result<Vertex>;

    /// Create a directed edge.
    async fn create_edge(
        &self,
        label: &str,
        out_v: VertexId,
        in_v: VertexId,
        properties: PropertyMap,
    ) -> Result<Edge>;

    /// Replace an edge's properties by id.
    async fn update_edge(&self, edge: &Edge) -> Result<()>;

    /// Execute a typed N-hop walk, returning materialized paths.
    async fn traverse(&self, walk: &Walk) -> Result<Vec<Path>>;
}
