//! HTTP client for the hosted recipe catalog.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{CatalogRecipe, InstructionBlock, RecipeInfo, RecipeStep, SearchResults};
use souschef_core::{Error, Result};

/// Number of recipes requested per search.
const SEARCH_LIMIT: u32 = 5;

/// Recipe catalog operations used by the turn handler. Behind a trait so
/// tests can substitute a fake.
#[async_trait]
pub trait RecipeCatalog: Send + Sync {
    /// Recipes matching an ingredient list.
    async fn find_by_ingredients(&self, ingredients: &str) -> Result<Vec<CatalogRecipe>>;

    /// Recipes matching a cuisine.
    async fn find_by_cuisine(&self, cuisine: &str) -> Result<Vec<CatalogRecipe>>;

    /// Summary information for a recipe.
    async fn recipe_info(&self, recipe_id: &str) -> Result<RecipeInfo>;

    /// Instruction steps for a recipe. An empty or malformed instructions
    /// payload degrades to an empty list, not an error.
    async fn recipe_steps(&self, recipe_id: &str) -> Result<Vec<RecipeStep>>;
}

pub struct HttpRecipeCatalog {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpRecipeCatalog {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "catalog request");
        let response = self
            .http
            .get(&url)
            .query(query)
            .header("X-Mashape-Key", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus(status.as_u16()));
        }
        response.json().await.map_err(|e| Error::Catalog(e.to_string()))
    }
}

#[async_trait]
impl RecipeCatalog for HttpRecipeCatalog {
    async fn find_by_ingredients(&self, ingredients: &str) -> Result<Vec<CatalogRecipe>> {
        let number = SEARCH_LIMIT.to_string();
        self.get(
            "/recipes/findByIngredients",
            &[
                ("fillIngredients", "false"),
                ("ingredients", ingredients),
                ("limitLicense", "false"),
                ("number", number.as_str()),
                ("ranking", "1"),
            ],
        )
        .await
    }

    async fn find_by_cuisine(&self, cuisine: &str) -> Result<Vec<CatalogRecipe>> {
        let number = SEARCH_LIMIT.to_string();
        let results: SearchResults = self
            .get(
                "/recipes/search",
                &[("number", number.as_str()), ("query", "+"), ("cuisine", cuisine)],
            )
            .await?;
        Ok(results.results)
    }

    async fn recipe_info(&self, recipe_id: &str) -> Result<RecipeInfo> {
        self.get(
            &format!("/recipes/{}/information", recipe_id),
            &[("includeNutrition", "false")],
        )
        .await
    }

    async fn recipe_steps(&self, recipe_id: &str) -> Result<Vec<RecipeStep>> {
        let blocks: Vec<InstructionBlock> = self
            .get(&format!("/recipes/{}/analyzedInstructions", recipe_id), &[])
            .await?;
        Ok(blocks.into_iter().next().map(|block| block.steps).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_blocks_tolerate_missing_steps() {
        let blocks: Vec<InstructionBlock> = serde_json::from_str("[]").unwrap();
        assert!(blocks.into_iter().next().map(|b| b.steps).unwrap_or_default().is_empty());

        let blocks: Vec<InstructionBlock> = serde_json::from_str(r#"[{}]"#).unwrap();
        assert!(blocks.into_iter().next().map(|b| b.steps).unwrap_or_default().is_empty());
    }

    #[test]
    fn search_results_decode() {
        let raw = r#"{"results": [{"id": 262682, "title": "Thai Sweet Potato Veggie Burgers"}]}"#;
        let results: SearchResults = serde_json::from_str(raw).unwrap();
        assert_eq!(results.results.len(), 1);
        assert_eq!(results.results[0].id, 262682);
    }

    #[test]
    fn steps_decode_with_equipment() {
        let raw = r#"[{"steps": [
            {"step": "Chop the onion.", "equipment": [{"name": "knife"}]},
            {"step": "Simmer.", "equipment": []}
        ]}]"#;
        let blocks: Vec<InstructionBlock> = serde_json::from_str(raw).unwrap();
        let steps = &blocks[0].steps;
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].equipment[0].name, "knife");
        assert!(steps[1].equipment.is_empty());
    }
}
