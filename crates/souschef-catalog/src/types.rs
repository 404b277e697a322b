//! Catalog wire types.

use serde::Deserialize;

/// A recipe as returned by catalog search.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogRecipe {
    pub id: i64,
    pub title: String,
}

/// Summary information for a single recipe.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeInfo {
    pub title: String,
    #[serde(rename = "readyInMinutes")]
    pub ready_in_minutes: u32,
    pub servings: u32,
}

/// One piece of equipment referenced by an instruction step.
#[derive(Debug, Clone, Deserialize)]
pub struct Equipment {
    pub name: String,
}

/// One instruction step.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeStep {
    pub step: String,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
}

/// Envelope for cuisine search responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchResults {
    #[serde(default)]
    pub results: Vec<CatalogRecipe>,
}

/// Envelope for analyzed instructions: a list of instruction blocks, the
/// first of which carries the steps.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InstructionBlock {
    #[serde(default)]
    pub steps: Vec<RecipeStep>,
}
