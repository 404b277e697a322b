//! Recipe types shared between the graph layer and the turn handler.

use serde::{Deserialize, Serialize};

/// A recipe reference as shown to the user: external catalog id plus title.
///
/// This is also the shape cached on ingredient/cuisine vertices as the
/// match-list snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: String,
    pub title: String,
}

/// A recipe surfaced by the two-hop recommendation traversal, with the
/// number of distinct contributing users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedRecipe {
    pub id: String,
    pub title: String,
    #[serde(rename = "recommendedUserCount")]
    pub recommended_user_count: u32,
}
