//! SousChef — conversational recipe-recommendation bot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use souschef_bot::{start_sweeper, SessionStore, SousChef};
use souschef_catalog::HttpRecipeCatalog;
use souschef_chat::{SlackClient, SlackConnection};
use souschef_core::{BotConfig, GraphBackend};
use souschef_graph::{ensure_schema, GraphClient, GremlinGraph, MemoryGraph, RecipeGraph};
use souschef_nlu::WatsonDialogue;
use souschef_notify::NotificationClient;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BotConfig::from_env()?;
    let timeout = Duration::from_secs(config.request_timeout_secs);

    // Graph backend selection
    let (graph_client, backend): (Arc<dyn GraphClient>, &'static str) = match &config.graph {
        GraphBackend::Gremlin(gremlin) => {
            info!("using remote graph store at {}", gremlin.api_url);
            (Arc::new(GremlinGraph::new(gremlin, timeout)?), "gremlin")
        }
        GraphBackend::Memory => {
            info!("using in-memory graph store");
            (Arc::new(MemoryGraph::new()), "memory")
        }
    };

    // The schema must be in place before any other graph operation;
    // failure here aborts startup.
    ensure_schema(graph_client.as_ref())
        .await
        .map_err(|e| anyhow::anyhow!("graph schema initialization failed: {}", e))?;

    let sessions = Arc::new(SessionStore::new(Duration::from_secs(config.session_ttl_secs)));
    start_sweeper(sessions.clone());

    let chef = Arc::new(SousChef::new(
        RecipeGraph::new(graph_client.clone()),
        Arc::new(HttpRecipeCatalog::new(
            &config.catalog_url,
            &config.catalog_api_key,
            timeout,
        )?),
        Arc::new(WatsonDialogue::new(&config.nlu, timeout)?),
        NotificationClient::new(config.notify.as_ref(), timeout)?,
        sessions.clone(),
    ));

    // Slack event loop
    let slack = Arc::new(SlackClient::new(&config.slack_bot_token, timeout)?);
    let connection = slack.connect().await?;
    tokio::spawn(dispatch_messages(connection, slack, chef));

    // HTTP surface
    let app = routes::build_router(Arc::new(AppState {
        sessions,
        graph: graph_client,
        backend,
        started_at: Instant::now(),
    }));
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("souschef listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Fan inbound direct messages out to per-message tasks. Turns for the
/// same user still serialize on the session mutex.
async fn dispatch_messages(
    mut connection: SlackConnection,
    slack: Arc<SlackClient>,
    chef: Arc<SousChef>,
) {
    while let Some(message) = connection.events.recv().await {
        let slack = slack.clone();
        let chef = chef.clone();
        tokio::spawn(async move {
            let reply = chef.handle_message(&message.user, &message.text).await;
            if reply.is_empty() {
                return;
            }
            if let Err(e) = slack.post_message(&message.channel, &reply).await {
                warn!("failed to post reply to {}: {}", message.channel, e);
            }
        });
    }
    warn!("Slack event stream ended; no further messages will be handled");
}
