//! Environment-driven configuration.

use crate::error::{Error, Result};

pub const DEFAULT_NLU_URL: &str = "https://gateway.watsonplatform.net/conversation/api";
pub const DEFAULT_CATALOG_URL: &str =
    "https://spoonacular-recipe-food-nutrition-v1.p.mashape.com";

/// Credentials for the hosted dialogue/NLU service.
#[derive(Debug, Clone)]
pub struct NluConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub workspace_id: String,
}

/// Connection settings for a Gremlin-over-HTTP graph store.
#[derive(Debug, Clone)]
pub struct GremlinConfig {
    pub api_url: String,
    pub username: String,
    pub password: String,
    pub graph_id: String,
}

/// Which graph backend to run against.
#[derive(Debug, Clone)]
pub enum GraphBackend {
    /// Remote property graph spoken to over its REST/Gremlin endpoints.
    Gremlin(GremlinConfig),
    /// In-process graph, state lost on restart. Intended for local development.
    Memory,
}

/// Optional notification sink endpoint.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub url: String,
    pub api_key: String,
}

/// Top-level SousChef configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub slack_bot_token: String,
    pub nlu: NluConfig,
    pub catalog_url: String,
    pub catalog_api_key: String,
    pub graph: GraphBackend,
    /// `None` disables the notification sink entirely.
    pub notify: Option<NotifyConfig>,
    /// HTTP server port.
    pub port: u16,
    /// Idle sessions are evicted after this many seconds.
    pub session_ttl_secs: u64,
    /// Per-request timeout applied to every outbound HTTP call.
    pub request_timeout_secs: u64,
}

impl BotConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let graph = match optional("GRAPH_BACKEND")
            .unwrap_or_else(|| "gremlin".to_string())
            .as_str()
        {
            "memory" => GraphBackend::Memory,
            "gremlin" => GraphBackend::Gremlin(GremlinConfig {
                api_url: required("GRAPH_API_URL")?,
                username: required("GRAPH_USERNAME")?,
                password: required("GRAPH_PASSWORD")?,
                graph_id: required("GRAPH_ID")?,
            }),
            other => {
                return Err(Error::Config(format!("unknown GRAPH_BACKEND: {}", other)));
            }
        };

        let notify = optional("NOTIFY_API_URL").map(|url| NotifyConfig {
            url,
            api_key: optional("NOTIFY_API_KEY").unwrap_or_default(),
        });

        Ok(Self {
            slack_bot_token: required("SLACK_BOT_TOKEN")?,
            nlu: NluConfig {
                url: optional("NLU_URL").unwrap_or_else(|| DEFAULT_NLU_URL.to_string()),
                username: required("NLU_USERNAME")?,
                password: required("NLU_PASSWORD")?,
                workspace_id: required("NLU_WORKSPACE_ID")?,
            },
            catalog_url: optional("CATALOG_URL")
                .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string()),
            catalog_api_key: required("CATALOG_API_KEY")?,
            graph,
            notify,
            port: parsed_or("PORT", 3000)?,
            session_ttl_secs: parsed_or("SESSION_TTL_SECS", 3600)?,
            request_timeout_secs: parsed_or("REQUEST_TIMEOUT_SECS", 30)?,
        })
    }
}

fn required(name: &str) -> Result<String> {
    optional(name).ok_or_else(|| Error::Config(format!("missing {} in the environment", name)))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match optional(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("invalid value for {}: {}", name, raw))),
        None => Ok(default),
    }
}
