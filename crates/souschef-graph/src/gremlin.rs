//! Remote graph backend speaking an IBM-Graph-style REST surface.
//!
//! Walks compile to Gremlin traversal text posted to `/gremlin`; vertices
//! and edges go through `/vertices` and `/edges`. Vertex properties arrive
//! GraphSON-style (`{"name": [{"value": ...}]}`) and are flattened here so
//! nothing above this module sees the wire shape.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::client::GraphClient;
use crate::schema::SchemaDescriptor;
use crate::types::{
    Comparison, Direction, Edge, EdgeId, Path, PathItem, PropertyMap, Vertex, VertexId, Walk,
    WalkStart,
};
use souschef_core::{Error, GremlinConfig, Result};

pub struct GremlinGraph {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl GremlinGraph {
    pub fn new(config: &GremlinConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: format!(
                "{}/{}",
                config.api_url.trim_end_matches('/'),
                config.graph_id
            ),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|e| Error::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus(status.as_u16()));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| Error::Http(e.to_string()))
    }

    /// The `result.data` array of a response envelope.
    fn result_data(envelope: &Value) -> &[Value] {
        envelope["result"]["data"].as_array().map(Vec::as_slice).unwrap_or(&[])
    }

    async fn run_gremlin(&self, traversal: &str) -> Result<Value> {
        debug!(traversal, "running gremlin traversal");
        let body = json!({ "gremlin": format!("def g = graph.traversal(); {}", traversal) });
        self.request(reqwest::Method::POST, "/gremlin", Some(&body)).await
    }
}

// ---------------------------------------------------------------
// Walk compilation
// ---------------------------------------------------------------

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        other => other.to_string(),
    }
}

fn predicate(comparison: Comparison, value: &Value) -> String {
    match comparison {
        Comparison::Eq => literal(value),
        Comparison::Neq => format!("neq({})", literal(value)),
        Comparison::Gt => format!("gt({})", literal(value)),
    }
}

fn compile(walk: &Walk) -> String {
    let mut query = match &walk.start {
        WalkStart::Vertex(id) => format!("g.V({})", id),
        WalkStart::Lookup {
            label,
            property,
            value,
        } => format!(
            "g.V().hasLabel({}).has({}, {})",
            quote(label),
            quote(property),
            quote(value)
        ),
    };
    for step in &walk.steps {
        query.push_str(match step.direction {
            Direction::Out => ".outE()",
            Direction::In => ".inE()",
        });
        if let Some(label) = &step.edge_label {
            query.push_str(&format!(".hasLabel({})", quote(label)));
        }
        for filter in &step.edge_filters {
            query.push_str(&format!(
                ".has({}, {})",
                quote(&filter.property),
                predicate(filter.comparison, &filter.value)
            ));
        }
        if let Some(property) = &step.order_edges_desc {
            query.push_str(&format!(".order().by({}, decr)", quote(property)));
        }
        query.push_str(match step.direction {
            Direction::Out => ".inV()",
            Direction::In => ".outV()",
        });
        if let Some(id) = step.target_id {
            query.push_str(&format!(".hasId({})", id));
        }
        if let Some(label) = &step.target_label {
            query.push_str(&format!(".hasLabel({})", quote(label)));
        }
        for filter in &step.target_filters {
            query.push_str(&format!(
                ".has({}, {})",
                quote(&filter.property),
                predicate(filter.comparison, &filter.value)
            ));
        }
    }
    if let Some(limit) = walk.limit {
        query.push_str(&format!(".limit({})", limit));
    }
    query.push_str(".path()");
    query
}

// ---------------------------------------------------------------
// Wire parsing
// ---------------------------------------------------------------

fn parse_id(value: &Value) -> Result<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| Error::Graph(format!("unparseable graph id: {}", value)))
}

/// Flatten GraphSON-style property lists into a flat map.
fn flatten_properties(value: &Value) -> PropertyMap {
    let mut flat = PropertyMap::new();
    if let Some(map) = value.as_object() {
        for (key, entry) in map {
            let flattened = match entry {
                Value::Array(values) => values.first().map(|first| {
                    first.get("value").cloned().unwrap_or_else(|| first.clone())
                }),
                other => Some(other.clone()),
            };
            if let Some(v) = flattened {
                flat.insert(key.clone(), v);
            }
        }
    }
    flat
}

fn parse_vertex(value: &Value) -> Result<Vertex> {
    Ok(Vertex {
        id: VertexId(parse_id(&value["id"])?),
        label: value["label"].as_str().unwrap_or_default().to_string(),
        properties: flatten_properties(&value["properties"]),
    })
}

fn parse_edge(value: &Value) -> Result<Edge> {
    let id = match &value["id"] {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(Edge {
        id: EdgeId(id),
        label: value["label"].as_str().unwrap_or_default().to_string(),
        out_v: VertexId(parse_id(&value["outV"])?),
        in_v: VertexId(parse_id(&value["inV"])?),
        properties: flatten_properties(&value["properties"]),
    })
}

fn parse_path(value: &Value) -> Result<Path> {
    let objects = value["objects"]
        .as_array()
        .ok_or_else(|| Error::Graph(format!("traversal result is not a path: {}", value)))?;
    let mut items = Vec::with_capacity(objects.len());
    for object in objects {
        let item = match object["type"].as_str() {
            Some("edge") => PathItem::Edge(parse_edge(object)?),
            Some("vertex") => PathItem::Vertex(parse_vertex(object)?),
            // Some servers omit the discriminator; edges carry outV/inV.
            _ if object.get("outV").is_some() => PathItem::Edge(parse_edge(object)?),
            _ => PathItem::Vertex(parse_vertex(object)?),
        };
        items.push(item);
    }
    Ok(Path { items })
}

#[async_trait]
impl GraphClient for GremlinGraph {
    async fn schema(&self) -> Result<Option<SchemaDescriptor>> {
        let envelope = self.request(reqwest::Method::GET, "/schema", None).await?;
        match Self::result_data(&envelope).first() {
            Some(raw) => Ok(Some(serde_json::from_value(raw.clone())?)),
            None => Ok(None),
        }
    }

    async fn define_schema(&self, schema: &SchemaDescriptor) -> Result<SchemaDescriptor> {
        let body = serde_json::to_value(schema)?;
        let envelope = self
            .request(reqwest::Method::POST, "/schema", Some(&body))
            .await?;
        match Self::result_data(&envelope).first() {
            Some(raw) => Ok(serde_json::from_value(raw.clone())?),
            None => Ok(schema.clone()),
        }
    }

    async fn find_vertices(
        &self,
        label: &str,
        property: &str,
        value: &str,
    ) -> Result<Vec<Vertex>> {
        let traversal = format!(
            "g.V().hasLabel({}).has({}, {})",
            quote(label),
            quote(property),
            quote(value)
        );
        let envelope = self.run_gremlin(&traversal).await?;
        Self::result_data(&envelope).iter().map(parse_vertex).collect()
    }

    async fn create_vertex(&self, label: &str, properties: PropertyMap) -> Result<Vertex> {
        let mut body = serde_json::Map::new();
        body.insert("label".to_string(), json!(label));
        for (key, value) in properties {
            body.insert(key, value);
        }
        let envelope = self
            .request(reqwest::Method::POST, "/vertices", Some(&Value::Object(body)))
            .await?;
        Self::result_data(&envelope)
            .first()
            .ok_or_else(|| Error::Graph("vertex creation returned no data".to_string()))
            .and_then(parse_vertex)
    }

    async fn create_edge(
        &self,
        label: &str,
        out_v: VertexId,
        in_v: VertexId,
        properties: PropertyMap,
    ) -> Result<Edge> {
        let body = json!({
            "label": label,
            "outV": out_v.0,
            "inV": in_v.0,
            "properties": properties,
        });
        let envelope = self
            .request(reqwest::Method::POST, "/edges", Some(&body))
            .await?;
        Self::result_data(&envelope)
            .first()
            .ok_or_else(|| Error::Graph("edge creation returned no data".to_string()))
            .and_then(parse_edge)
    }

    async fn update_edge(&self, edge: &Edge) -> Result<()> {
        let body = json!({
            "label": edge.label,
            "outV": edge.out_v.0,
            "inV": edge.in_v.0,
            "properties": edge.properties,
        });
        let path = format!("/edges/{}", edge.id);
        self.request(reqwest::Method::PUT, &path, Some(&body)).await?;
        Ok(())
    }

    async fn traverse(&self, walk: &Walk) -> Result<Vec<Path>> {
        let envelope = self.run_gremlin(&compile(walk)).await?;
        Self::result_data(&envelope).iter().map(parse_path).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PropertyFilter, WalkStep};

    #[test]
    fn compiles_recommendation_walk() {
        let walk = Walk::from_lookup("ingredient", "name", "onion,tomato")
            .step(
                WalkStep::incoming()
                    .to_label("person")
                    .filter_target(PropertyFilter::neq("name", "U1")),
            )
            .step(
                WalkStep::outgoing()
                    .filter_edge(PropertyFilter::gt("count", 1))
                    .order_edges_desc("count")
                    .to_label("recipe"),
            )
            .step(
                WalkStep::incoming()
                    .to_label("ingredient")
                    .filter_target(PropertyFilter::eq("name", "onion,tomato")),
            );

        assert_eq!(
            compile(&walk),
            "g.V().hasLabel(\"ingredient\").has(\"name\", \"onion,tomato\")\
             .inE().outV().hasLabel(\"person\").has(\"name\", neq(\"U1\"))\
             .outE().has(\"count\", gt(1)).order().by(\"count\", decr).inV().hasLabel(\"recipe\")\
             .inE().outV().hasLabel(\"ingredient\").has(\"name\", \"onion,tomato\")\
             .path()"
        );
    }

    #[test]
    fn compiles_edge_lookup_between_vertices() {
        let walk =
            Walk::from_vertex(VertexId(4)).step(WalkStep::outgoing().to_vertex(VertexId(9)));
        assert_eq!(compile(&walk), "g.V(4).outE().inV().hasId(9).path()");
    }

    #[test]
    fn quotes_and_escapes_literals() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("o\"hara"), "\"o\\\"hara\"");
    }

    #[test]
    fn flattens_graphson_properties() {
        let raw = serde_json::json!({
            "name": [{"id": "abc", "value": "onion"}],
            "detail": [{"id": "def", "value": "[]"}],
        });
        let flat = flatten_properties(&raw);
        assert_eq!(flat.get("name").unwrap(), "onion");
        assert_eq!(flat.get("detail").unwrap(), "[]");
    }

    #[test]
    fn parses_paths_with_mixed_items() {
        let raw = serde_json::json!({
            "labels": [[], [], []],
            "objects": [
                {"id": 1, "label": "person", "type": "vertex",
                 "properties": {"name": [{"value": "U1"}]}},
                {"id": "e-1", "label": "selects", "type": "edge",
                 "outV": 1, "inV": 2, "properties": {"count": 2}},
                {"id": 2, "label": "recipe", "type": "vertex",
                 "properties": {"name": [{"value": "77"}], "title": [{"value": "Soup"}]}},
            ],
        });
        let path = parse_path(&raw).unwrap();
        assert_eq!(path.vertices().len(), 2);
        assert_eq!(path.edges()[0].count(), 2);
        assert_eq!(path.last_vertex().unwrap().property("title"), Some("Soup"));
    }
}
