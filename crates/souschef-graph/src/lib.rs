//! SousChef Graph — the graph-backed recommendation and bookkeeping layer.
//!
//! A [`GraphClient`] capability trait with two backends (Gremlin-over-HTTP
//! and in-memory), an idempotent schema manager, and the [`RecipeGraph`]
//! store: vertex upserts, weighted `selects` edges, favorites and two-hop
//! recommendation queries.

pub mod client;
pub mod gremlin;
pub mod memory;
pub mod schema;
pub mod store;
pub mod types;

pub use client::GraphClient;
pub use gremlin::GremlinGraph;
pub use memory::MemoryGraph;
pub use schema::{ensure_schema, recipe_schema, SchemaDescriptor};
pub use store::RecipeGraph;
pub use types::{Edge, EdgeId, Path, PropertyMap, Vertex, VertexId, Walk, WalkStep};
