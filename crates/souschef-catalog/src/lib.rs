//! Recipe catalog client.
//!
//! Thin wrapper over the hosted recipe API: ingredient and cuisine search,
//! recipe info, and step-by-step instructions. Non-2xx responses surface as
//! errors carrying the status code, never the body.

pub mod client;
pub mod types;

pub use client::{HttpRecipeCatalog, RecipeCatalog};
pub use types::{CatalogRecipe, Equipment, RecipeInfo, RecipeStep};
