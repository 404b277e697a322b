//! The recipe graph store: vertex upserts, weighted `selects` edges, and
//! the favorites / recommendation queries.
//!
//! Vertices are created lazily on first reference and never deleted. Edge
//! counters start at 1 and grow by 1 per repeat interaction. `detail`
//! snapshots are write-once: a cached match list is reused on every later
//! lookup, even if the external catalog has changed since.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::client::GraphClient;
use crate::schema::{CUISINE, INGREDIENT, PERSON, RECIPE, SELECTS};
use crate::types::{
    PathItem, PropertyFilter, PropertyMap, Vertex, VertexId, Walk, WalkStep,
};
use souschef_core::{Error, RecipeSummary, RecommendedRecipe, Result};

/// Canonical ingredient key: trim each comma-separated term, lowercase,
/// sort ascending, join with `,`. Order-and-case invariant.
pub fn ingredient_key(text: &str) -> String {
    let mut terms: Vec<String> = text
        .trim()
        .to_lowercase()
        .split(',')
        .map(|term| term.trim().to_string())
        .collect();
    terms.sort();
    terms.join(",")
}

/// Canonical cuisine key: trimmed lowercase.
pub fn cuisine_key(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Canonical recipe key: trimmed lowercase string form of the catalog id.
pub fn recipe_key(recipe_id: &str) -> String {
    recipe_id.trim().to_lowercase()
}

fn summary_of(vertex: &Vertex) -> RecipeSummary {
    RecipeSummary {
        id: vertex.name().to_string(),
        title: vertex.property("title").unwrap_or_default().to_string(),
    }
}

/// Graph-backed recommendation and bookkeeping layer.
#[derive(Clone)]
pub struct RecipeGraph {
    client: Arc<dyn GraphClient>,
}

impl RecipeGraph {
    pub fn new(client: Arc<dyn GraphClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<dyn GraphClient> {
        &self.client
    }

    // ---------------------------------------------------------------
    // Vertex repository
    // ---------------------------------------------------------------

    /// Upsert-if-absent. An existing vertex is returned unchanged: no
    /// attribute overwrite, first-write-wins for `detail`.
    pub async fn add_vertex_if_absent(
        &self,
        label: &str,
        unique_property: &str,
        properties: PropertyMap,
    ) -> Result<Vertex> {
        let value = properties
            .get(unique_property)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::Graph(format!("vertex is missing unique property '{}'", unique_property))
            })?
            .to_string();
        if let Some(existing) = self
            .client
            .find_vertices(label, unique_property, &value)
            .await?
            .into_iter()
            .next()
        {
            debug!("returning {} vertex where {}={}", label, unique_property, value);
            return Ok(existing);
        }
        debug!("creating {} vertex where {}={}", label, unique_property, value);
        self.client.create_vertex(label, properties).await
    }

    // ---------------------------------------------------------------
    // Edge counter
    // ---------------------------------------------------------------

    /// Create a `selects` edge with `count = 1`, or increment the existing
    /// edge's counter by 1.
    ///
    /// This is a read-modify-write without compare-and-swap: concurrent
    /// turns touching the same pair can lose an increment. Counts are
    /// best-effort popularity signals, never authoritative.
    pub async fn record_selection(&self, from: VertexId, to: VertexId) -> Result<()> {
        let walk = Walk::from_vertex(from).step(WalkStep::outgoing().to_vertex(to));
        let existing = self
            .client
            .traverse(&walk)
            .await?
            .into_iter()
            .next()
            .and_then(|path| {
                path.items.into_iter().find_map(|item| match item {
                    PathItem::Edge(edge) => Some(edge),
                    PathItem::Vertex(_) => None,
                })
            });

        match existing {
            Some(mut edge) => {
                let count = edge.count();
                edge.properties.insert("count".to_string(), json!(count + 1));
                self.client.update_edge(&edge).await
            }
            None => {
                let mut properties = PropertyMap::new();
                properties.insert("count".to_string(), json!(1));
                self.client
                    .create_edge(SELECTS, from, to, properties)
                    .await
                    .map(|_| ())
            }
        }
    }

    // ---------------------------------------------------------------
    // People
    // ---------------------------------------------------------------

    /// Add a person vertex for the chat user id if absent.
    pub async fn add_user(&self, user_id: &str) -> Result<Vertex> {
        let mut properties = PropertyMap::new();
        properties.insert("name".to_string(), json!(user_id));
        self.add_vertex_if_absent(PERSON, "name", properties).await
    }

    pub async fn find_user(&self, user_id: &str) -> Result<Option<Vertex>> {
        Ok(self
            .client
            .find_vertices(PERSON, "name", user_id)
            .await?
            .into_iter()
            .next())
    }

    // ---------------------------------------------------------------
    // Ingredients
    // ---------------------------------------------------------------

    pub async fn find_ingredient(&self, text: &str) -> Result<Option<Vertex>> {
        Ok(self
            .client
            .find_vertices(INGREDIENT, "name", &ingredient_key(text))
            .await?
            .into_iter()
            .next())
    }

    /// Add an ingredient vertex carrying the match-list snapshot, and
    /// record the user's request against it.
    pub async fn add_ingredient(
        &self,
        text: &str,
        matches: &[RecipeSummary],
        user: &Vertex,
    ) -> Result<Vertex> {
        let mut properties = PropertyMap::new();
        properties.insert("name".to_string(), json!(ingredient_key(text)));
        properties.insert("detail".to_string(), json!(serde_json::to_string(matches)?));
        let vertex = self.add_vertex_if_absent(INGREDIENT, "name", properties).await?;
        self.record_selection(user.id, vertex.id).await?;
        Ok(vertex)
    }

    pub async fn record_ingredient_request(
        &self,
        ingredient: &Vertex,
        user: &Vertex,
    ) -> Result<()> {
        self.record_selection(user.id, ingredient.id).await
    }

    // ---------------------------------------------------------------
    // Cuisine
    // ---------------------------------------------------------------

    pub async fn find_cuisine(&self, text: &str) -> Result<Option<Vertex>> {
        Ok(self
            .client
            .find_vertices(CUISINE, "name", &cuisine_key(text))
            .await?
            .into_iter()
            .next())
    }

    pub async fn add_cuisine(
        &self,
        text: &str,
        matches: &[RecipeSummary],
        user: &Vertex,
    ) -> Result<Vertex> {
        let mut properties = PropertyMap::new();
        properties.insert("name".to_string(), json!(cuisine_key(text)));
        properties.insert("detail".to_string(), json!(serde_json::to_string(matches)?));
        let vertex = self.add_vertex_if_absent(CUISINE, "name", properties).await?;
        self.record_selection(user.id, vertex.id).await?;
        Ok(vertex)
    }

    pub async fn record_cuisine_request(&self, cuisine: &Vertex, user: &Vertex) -> Result<()> {
        self.record_selection(user.id, cuisine.id).await
    }

    /// The match-list snapshot cached on an ingredient or cuisine vertex.
    pub fn cached_matches(&self, vertex: &Vertex) -> Result<Vec<RecipeSummary>> {
        match vertex.property("detail") {
            Some(detail) => Ok(serde_json::from_str(detail)?),
            None => Ok(Vec::new()),
        }
    }

    // ---------------------------------------------------------------
    // Recipes
    // ---------------------------------------------------------------

    pub async fn find_recipe(&self, recipe_id: &str) -> Result<Option<Vertex>> {
        Ok(self
            .client
            .find_vertices(RECIPE, "name", &recipe_key(recipe_id))
            .await?
            .into_iter()
            .next())
    }

    /// Add a recipe vertex with its formatted instructions, then record
    /// edges from the user and from the anchoring ingredient/cuisine.
    pub async fn add_recipe(
        &self,
        recipe_id: &str,
        title: &str,
        detail: &str,
        anchor: Option<&Vertex>,
        user: &Vertex,
    ) -> Result<Vertex> {
        let mut properties = PropertyMap::new();
        properties.insert("name".to_string(), json!(recipe_key(recipe_id)));
        properties.insert("title".to_string(), json!(title.trim()));
        properties.insert("detail".to_string(), json!(detail));
        let vertex = self.add_vertex_if_absent(RECIPE, "name", properties).await?;
        self.record_recipe_request(&vertex, anchor, user).await?;
        Ok(vertex)
    }

    /// Record a recipe access: user -> recipe always, anchor -> recipe when
    /// a prior ingredient/cuisine search led here.
    pub async fn record_recipe_request(
        &self,
        recipe: &Vertex,
        anchor: Option<&Vertex>,
        user: &Vertex,
    ) -> Result<()> {
        self.record_selection(user.id, recipe.id).await?;
        if let Some(anchor) = anchor {
            self.record_selection(anchor.id, recipe.id).await?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// The user's most-selected recipes, ordered by edge counter descending.
    /// Empty when the user has no recipe edges yet.
    pub async fn favorite_recipes(&self, user: &Vertex, limit: usize) -> Result<Vec<RecipeSummary>> {
        let walk = Walk::from_lookup(PERSON, "name", user.name())
            .step(WalkStep::outgoing().order_edges_desc("count").to_label(RECIPE))
            .limit(limit);
        let paths = self.client.traverse(&walk).await?;
        Ok(paths
            .iter()
            .filter_map(|path| path.last_vertex())
            .map(summary_of)
            .collect())
    }

    /// Two-hop "other users liked" recommendation from an ingredient or
    /// cuisine anchor.
    ///
    /// Walks backward to other persons who selected the anchor (excluding
    /// the requesting user), forward along their repeat selections
    /// (`count > 1`, strongest first) to recipes, and closes the loop back
    /// to the same anchor so only relevant recipes qualify. Paths folding
    /// onto an already-collected recipe increment its
    /// `recommended_user_count` instead of adding a duplicate; the `limit`
    /// caps distinct recipes only.
    pub async fn recommended_recipes(
        &self,
        anchor: &Vertex,
        user: &Vertex,
        limit: usize,
    ) -> Result<Vec<RecommendedRecipe>> {
        let walk = Walk::from_lookup(&anchor.label, "name", anchor.name())
            .step(
                WalkStep::incoming()
                    .to_label(PERSON)
                    .filter_target(PropertyFilter::neq("name", user.name())),
            )
            .step(
                WalkStep::outgoing()
                    .filter_edge(PropertyFilter::gt("count", 1))
                    .order_edges_desc("count")
                    .to_label(RECIPE),
            )
            .step(
                WalkStep::incoming()
                    .to_label(&anchor.label)
                    .filter_target(PropertyFilter::eq("name", anchor.name())),
            );
        let paths = self.client.traverse(&walk).await?;

        let mut recipes: Vec<RecommendedRecipe> = Vec::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();
        for path in &paths {
            let vertices = path.vertices();
            // Path shape: anchor, person, recipe, anchor.
            let recipe = match vertices.get(2) {
                Some(vertex) => *vertex,
                None => continue,
            };
            let id = recipe.name().to_string();
            match by_id.get(&id) {
                Some(&slot) => recipes[slot].recommended_user_count += 1,
                None => {
                    if recipes.len() >= limit {
                        continue;
                    }
                    by_id.insert(id.clone(), recipes.len());
                    recipes.push(RecommendedRecipe {
                        id,
                        title: recipe.property("title").unwrap_or_default().to_string(),
                        recommended_user_count: 1,
                    });
                }
            }
        }
        Ok(recipes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;

    fn store() -> (RecipeGraph, Arc<MemoryGraph>) {
        let client = Arc::new(MemoryGraph::new());
        (RecipeGraph::new(client.clone()), client)
    }

    fn matches(entries: &[(&str, &str)]) -> Vec<RecipeSummary> {
        entries
            .iter()
            .map(|(id, title)| RecipeSummary {
                id: id.to_string(),
                title: title.to_string(),
            })
            .collect()
    }

    #[test]
    fn ingredient_key_is_order_and_case_invariant() {
        assert_eq!(ingredient_key("Tomato, Onion"), "onion,tomato");
        assert_eq!(ingredient_key(" onion , tomato"), "onion,tomato");
        assert_eq!(
            ingredient_key("Tomato, Onion"),
            ingredient_key(" onion , tomato")
        );
    }

    #[test]
    fn cuisine_and_recipe_keys_normalize() {
        assert_eq!(cuisine_key("  Thai "), "thai");
        assert_eq!(recipe_key(" 262682 "), "262682");
    }

    #[tokio::test]
    async fn vertex_upsert_is_idempotent_and_preserves_detail() {
        let (graph, _) = store();
        let user = graph.add_user("U1").await.unwrap();

        let first = graph
            .add_ingredient("onion,tomato", &matches(&[("1", "Soup")]), &user)
            .await
            .unwrap();
        let second = graph
            .add_ingredient("Tomato, Onion", &matches(&[("9", "Different")]), &user)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        // First write wins: the snapshot from the initial call survives.
        let cached = graph.cached_matches(&second).unwrap();
        assert_eq!(cached, matches(&[("1", "Soup")]));
    }

    #[tokio::test]
    async fn add_user_twice_returns_same_vertex() {
        let (graph, client) = store();
        let first = graph.add_user("U1").await.unwrap();
        let second = graph.add_user("U1").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(client.vertex_count(), 1);
    }

    #[tokio::test]
    async fn edge_counter_is_monotonic() {
        let (graph, client) = store();
        let user = graph.add_user("U1").await.unwrap();
        let ingredient = graph
            .add_ingredient("onion", &matches(&[("1", "Soup")]), &user)
            .await
            .unwrap();

        // add_ingredient already recorded one selection.
        graph.record_selection(user.id, ingredient.id).await.unwrap();
        graph.record_selection(user.id, ingredient.id).await.unwrap();

        let walk = Walk::from_vertex(user.id).step(WalkStep::outgoing().to_vertex(ingredient.id));
        let paths = client.traverse(&walk).await.unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].edges()[0].count(), 3);
        assert_eq!(client.edge_count(), 1);
    }

    #[tokio::test]
    async fn favorites_are_ordered_by_count_descending() {
        let (graph, _) = store();
        let user = graph.add_user("U1").await.unwrap();

        for (id, title, count) in [("10", "Three", 3), ("11", "One", 1), ("12", "Five", 5)] {
            let recipe = graph
                .add_recipe(id, title, "steps", None, &user)
                .await
                .unwrap();
            for _ in 1..count {
                graph.record_selection(user.id, recipe.id).await.unwrap();
            }
        }

        let favorites = graph.favorite_recipes(&user, 5).await.unwrap();
        let titles: Vec<&str> = favorites.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Five", "Three", "One"]);
    }

    #[tokio::test]
    async fn favorites_without_history_is_empty_not_an_error() {
        let (graph, _) = store();
        let user = graph.add_user("U1").await.unwrap();
        let favorites = graph.favorite_recipes(&user, 5).await.unwrap();
        assert!(favorites.is_empty());
    }

    #[tokio::test]
    async fn favorites_ignore_ingredient_edges() {
        let (graph, _) = store();
        let user = graph.add_user("U1").await.unwrap();
        graph
            .add_ingredient("onion", &matches(&[("1", "Soup")]), &user)
            .await
            .unwrap();
        let recipe = graph
            .add_recipe("55", "Stew", "steps", None, &user)
            .await
            .unwrap();
        graph.record_selection(user.id, recipe.id).await.unwrap();

        let favorites = graph.favorite_recipes(&user, 5).await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, "55");
    }

    /// Seed one anchor searched by `requester` plus `others`, where every
    /// other user repeat-selected the given recipe after that search.
    async fn seed_recommendation(
        graph: &RecipeGraph,
        requester: &Vertex,
        others: &[&str],
        recipe_id: &str,
    ) -> Vertex {
        let snapshot = matches(&[(recipe_id, "Shared")]);
        let anchor = graph
            .add_ingredient("onion", &snapshot, requester)
            .await
            .unwrap();
        for other in others {
            let person = graph.add_user(other).await.unwrap();
            graph.record_ingredient_request(&anchor, &person).await.unwrap();
            let recipe = graph
                .add_recipe(recipe_id, "Shared", "steps", Some(&anchor), &person)
                .await
                .unwrap();
            // Repeat selection pushes the person->recipe counter past 1.
            graph
                .record_recipe_request(&recipe, Some(&anchor), &person)
                .await
                .unwrap();
        }
        anchor
    }

    #[tokio::test]
    async fn recommendation_excludes_the_requesting_user() {
        let (graph, _) = store();
        let requester = graph.add_user("U1").await.unwrap();
        let anchor = seed_recommendation(&graph, &requester, &[], "70").await;

        // The requester's own repeat selections must never surface.
        let recipe = graph
            .add_recipe("70", "Shared", "steps", Some(&anchor), &requester)
            .await
            .unwrap();
        graph
            .record_recipe_request(&recipe, Some(&anchor), &requester)
            .await
            .unwrap();

        let recommended = graph
            .recommended_recipes(&anchor, &requester, 5)
            .await
            .unwrap();
        assert!(recommended.is_empty());
    }

    #[tokio::test]
    async fn recommendation_dedups_and_counts_contributing_users() {
        let (graph, _) = store();
        let requester = graph.add_user("U1").await.unwrap();
        let anchor = seed_recommendation(&graph, &requester, &["U2", "U3"], "70").await;

        let recommended = graph
            .recommended_recipes(&anchor, &requester, 5)
            .await
            .unwrap();
        assert_eq!(recommended.len(), 1);
        assert_eq!(recommended[0].id, "70");
        assert_eq!(recommended[0].recommended_user_count, 2);
    }

    #[tokio::test]
    async fn recommendation_requires_repeat_selection() {
        let (graph, _) = store();
        let requester = graph.add_user("U1").await.unwrap();
        let snapshot = matches(&[("70", "Shared")]);
        let anchor = graph.add_ingredient("onion", &snapshot, &requester).await.unwrap();

        // A one-off selection (count == 1) is not a recommendation signal.
        let other = graph.add_user("U2").await.unwrap();
        graph.record_ingredient_request(&anchor, &other).await.unwrap();
        graph
            .add_recipe("70", "Shared", "steps", Some(&anchor), &other)
            .await
            .unwrap();

        let recommended = graph
            .recommended_recipes(&anchor, &requester, 5)
            .await
            .unwrap();
        assert!(recommended.is_empty());
    }

    #[tokio::test]
    async fn recommendation_requires_loop_closure_to_the_anchor() {
        let (graph, _) = store();
        let requester = graph.add_user("U1").await.unwrap();
        let snapshot = matches(&[("70", "Shared")]);
        let anchor = graph.add_ingredient("onion", &snapshot, &requester).await.unwrap();

        // Another user repeat-selects a recipe reached through a different
        // anchor, so there is no edge from this anchor to the recipe.
        let other = graph.add_user("U2").await.unwrap();
        graph.record_ingredient_request(&anchor, &other).await.unwrap();
        let recipe = graph
            .add_recipe("70", "Shared", "steps", None, &other)
            .await
            .unwrap();
        graph.record_recipe_request(&recipe, None, &other).await.unwrap();

        let recommended = graph
            .recommended_recipes(&anchor, &requester, 5)
            .await
            .unwrap();
        assert!(recommended.is_empty());
    }

    #[tokio::test]
    async fn recommendation_limit_caps_distinct_recipes_only() {
        let (graph, _) = store();
        let requester = graph.add_user("U1").await.unwrap();
        let snapshot = matches(&[("70", "A"), ("71", "B")]);
        let anchor = graph.add_ingredient("onion", &snapshot, &requester).await.unwrap();

        // U2 selects recipe 70 three times and 71 twice; U3 selects 70
        // twice. Counts are distinct so 70 leads the ordered stream.
        for (other, recipes) in [("U2", vec![("70", 3), ("71", 2)]), ("U3", vec![("70", 2)])] {
            let person = graph.add_user(other).await.unwrap();
            graph.record_ingredient_request(&anchor, &person).await.unwrap();
            for (id, count) in recipes {
                let recipe = graph
                    .add_recipe(id, "Title", "steps", Some(&anchor), &person)
                    .await
                    .unwrap();
                for _ in 1..count {
                    graph
                        .record_recipe_request(&recipe, Some(&anchor), &person)
                        .await
                        .unwrap();
                }
            }
        }

        // With limit 1, only one distinct recipe is collected, but later
        // paths still fold into its contributing-user counter.
        let recommended = graph
            .recommended_recipes(&anchor, &requester, 1)
            .await
            .unwrap();
        assert_eq!(recommended.len(), 1);
        assert_eq!(recommended[0].id, "70");
        assert_eq!(recommended[0].recommended_user_count, 2);
    }
}
