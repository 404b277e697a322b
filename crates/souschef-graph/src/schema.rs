//! Logical graph schema and the idempotent schema manager.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::GraphClient;
use souschef_core::{Error, Result};

pub const PERSON: &str = "person";
pub const INGREDIENT: &str = "ingredient";
pub const CUISINE: &str = "cuisine";
pub const RECIPE: &str = "recipe";
pub const SELECTS: &str = "selects";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyKeyDef {
    pub name: String,
    #[serde(rename = "dataType")]
    pub data_type: String,
    pub cardinality: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelDef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    #[serde(rename = "propertyKeys")]
    pub property_keys: Vec<String>,
    pub composite: bool,
    pub unique: bool,
}

/// The logical schema registered with the graph store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    #[serde(rename = "propertyKeys", default)]
    pub property_keys: Vec<PropertyKeyDef>,
    #[serde(rename = "vertexLabels", default)]
    pub vertex_labels: Vec<LabelDef>,
    #[serde(rename = "edgeLabels", default)]
    pub edge_labels: Vec<LabelDef>,
    #[serde(rename = "vertexIndexes", default)]
    pub vertex_indexes: Vec<IndexDef>,
    #[serde(rename = "edgeIndexes", default)]
    pub edge_indexes: Vec<IndexDef>,
}

impl SchemaDescriptor {
    /// A schema counts as registered once it carries at least one property key.
    pub fn is_defined(&self) -> bool {
        !self.property_keys.is_empty()
    }
}

fn string_key(name: &str) -> PropertyKeyDef {
    PropertyKeyDef {
        name: name.to_string(),
        data_type: "String".to_string(),
        cardinality: "SINGLE".to_string(),
    }
}

fn label(name: &str) -> LabelDef {
    LabelDef {
        name: name.to_string(),
    }
}

/// The full recipe-graph schema: three string property keys, four vertex
/// labels, the `selects` edge label, and a composite unique index on `name`.
pub fn recipe_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        property_keys: vec![string_key("name"), string_key("title"), string_key("detail")],
        vertex_labels: vec![
            label(PERSON),
            label(INGREDIENT),
            label(CUISINE),
            label(RECIPE),
        ],
        edge_labels: vec![label(SELECTS)],
        vertex_indexes: vec![IndexDef {
            name: "vertexByName".to_string(),
            property_keys: vec!["name".to_string()],
            composite: true,
            unique: true,
        }],
        edge_indexes: Vec::new(),
    }
}

/// Ensure the recipe schema exists. Idempotent; must complete before any
/// other graph operation is issued. Failure here is fatal to startup.
pub async fn ensure_schema(client: &dyn GraphClient) -> Result<SchemaDescriptor> {
    match client.schema().await? {
        Some(existing) if existing.is_defined() => {
            debug!("graph schema already registered");
            Ok(existing)
        }
        _ => {
            info!("registering graph schema");
            client
                .define_schema(&recipe_schema())
                .await
                .map_err(|e| Error::Schema(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let graph = MemoryGraph::new();
        let first = ensure_schema(&graph).await.unwrap();
        assert!(first.is_defined());
        assert_eq!(first.vertex_labels.len(), 4);
        assert_eq!(first.edge_labels.len(), 1);
        assert!(first.vertex_indexes[0].unique);

        let second = ensure_schema(&graph).await.unwrap();
        assert_eq!(second.property_keys.len(), first.property_keys.len());
    }
}
