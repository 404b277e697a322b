//! SousChef Core — error taxonomy, configuration, shared recipe types.

pub mod config;
pub mod error;
pub mod types;

pub use config::{BotConfig, GraphBackend, GremlinConfig, NluConfig, NotifyConfig};
pub use error::{Error, Result};
pub use types::{RecipeSummary, RecommendedRecipe};
