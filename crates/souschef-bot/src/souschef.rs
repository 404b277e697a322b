//! The dialogue turn handler.
//!
//! One inbound message is one turn: classify the dialogue signal, run the
//! matching graph/catalog work, compose the reply. Every failure is
//! recovered at the turn boundary with a generic reply and a session reset.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error};

use souschef_catalog::{CatalogRecipe, RecipeCatalog, RecipeInfo, RecipeStep};
use souschef_core::{RecipeSummary, RecommendedRecipe, Result};
use souschef_graph::schema::{CUISINE, INGREDIENT};
use souschef_graph::{RecipeGraph, Vertex};
use souschef_nlu::{DialogueResponse, DialogueService, TurnSignal};
use souschef_notify::{AnchorRef, NotificationClient};

use crate::session::{Session, SessionStore};

/// Upper bound on the numbered list shown to the user.
pub const DISPLAY_LIMIT: usize = 5;

const GENERIC_FAILURE_REPLY: &str =
    "Sorry, I ran into a problem on my end. Say anything to start over...";
const INVALID_SELECTION_REPLY: &str =
    "Invalid selection! Say anything to see your choices again...";

/// One display entry: recommendation-sourced entries carry the number of
/// contributing users.
#[derive(Debug, Clone)]
struct DisplayRecipe {
    summary: RecipeSummary,
    recommended_user_count: Option<u32>,
}

pub struct SousChef {
    graph: RecipeGraph,
    catalog: Arc<dyn RecipeCatalog>,
    dialogue: Arc<dyn DialogueService>,
    notify: NotificationClient,
    sessions: Arc<SessionStore>,
}

impl SousChef {
    pub fn new(
        graph: RecipeGraph,
        catalog: Arc<dyn RecipeCatalog>,
        dialogue: Arc<dyn DialogueService>,
        notify: NotificationClient,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            graph,
            catalog,
            dialogue,
            notify,
            sessions,
        }
    }

    /// Process one inbound message and produce the reply text.
    pub async fn handle_message(&self, user_id: &str, text: &str) -> String {
        let handle = self.sessions.get_or_create(user_id);
        handle.touch();
        // Serializes turns per user.
        let mut session = handle.turn.lock().await;

        match self.process_turn(&mut session, text).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("turn failed for {}: {}", user_id, e);
                session.reset();
                GENERIC_FAILURE_REPLY.to_string()
            }
        }
    }

    async fn process_turn(&self, session: &mut Session, text: &str) -> Result<String> {
        let response = self
            .dialogue
            .message(text, session.nlu_context.as_ref())
            .await?;
        session.nlu_context = Some(response.context.clone());

        match TurnSignal::classify(&response) {
            TurnSignal::Favorites => self.handle_favorites(session).await,
            TurnSignal::Ingredients => self.handle_ingredients(session, text).await,
            TurnSignal::Cuisine(cuisine) => self.handle_cuisine(session, &cuisine).await,
            TurnSignal::Selection(selection) => self.handle_selection(session, selection).await,
            TurnSignal::StartOver => self.handle_start(session, &response).await,
        }
    }

    async fn ensure_user(&self, session: &mut Session) -> Result<Vertex> {
        if let Some(vertex) = &session.user_vertex {
            return Ok(vertex.clone());
        }
        let vertex = self.graph.add_user(&session.user_id).await?;
        session.user_vertex = Some(vertex.clone());
        Ok(vertex)
    }

    async fn handle_start(
        &self,
        session: &mut Session,
        response: &DialogueResponse,
    ) -> Result<String> {
        self.ensure_user(session).await?;
        self.notify.start(&session.user_id).await;
        Ok(response.output.text.join("\n"))
    }

    async fn handle_favorites(&self, session: &mut Session) -> Result<String> {
        let user = self.ensure_user(session).await?;
        let favorites = self.graph.favorite_recipes(&user, DISPLAY_LIMIT).await?;

        session.anchor_vertex = None;
        session.recipes = favorites.clone();
        self.notify.favorites(&session.user_id).await;

        let display: Vec<DisplayRecipe> = favorites
            .into_iter()
            .map(|summary| DisplayRecipe {
                summary,
                recommended_user_count: None,
            })
            .collect();
        Ok(format_recipe_list(&display))
    }

    async fn handle_ingredients(&self, session: &mut Session, text: &str) -> Result<String> {
        let user = self.ensure_user(session).await?;
        let vertex = match self.graph.find_ingredient(text).await? {
            Some(vertex) => {
                debug!("ingredient snapshot exists for '{}'", text);
                self.graph.record_ingredient_request(&vertex, &user).await?;
                vertex
            }
            None => {
                debug!("no snapshot for '{}', querying the catalog", text);
                let matches = summaries(self.catalog.find_by_ingredients(text).await?);
                self.graph.add_ingredient(text, &matches, &user).await?
            }
        };

        let reply = self.compose_match_reply(session, &vertex, &user).await?;
        self.notify
            .ingredient(&session.user_id, anchor_ref(Some(&vertex)), text)
            .await;
        Ok(reply)
    }

    async fn handle_cuisine(&self, session: &mut Session, cuisine: &str) -> Result<String> {
        let user = self.ensure_user(session).await?;
        let vertex = match self.graph.find_cuisine(cuisine).await? {
            Some(vertex) => {
                debug!("cuisine snapshot exists for '{}'", cuisine);
                self.graph.record_cuisine_request(&vertex, &user).await?;
                vertex
            }
            None => {
                debug!("no snapshot for '{}', querying the catalog", cuisine);
                let matches = summaries(self.catalog.find_by_cuisine(cuisine).await?);
                self.graph.add_cuisine(cuisine, &matches, &user).await?
            }
        };

        let reply = self.compose_match_reply(session, &vertex, &user).await?;
        self.notify
            .cuisine(&session.user_id, anchor_ref(Some(&vertex)), cuisine)
            .await;
        Ok(reply)
    }

    /// Merge recommendations over the cached snapshot, remember the shown
    /// list, and format the reply.
    async fn compose_match_reply(
        &self,
        session: &mut Session,
        vertex: &Vertex,
        user: &Vertex,
    ) -> Result<String> {
        let cached = self.graph.cached_matches(vertex)?;
        let recommended = self
            .graph
            .recommended_recipes(vertex, user, DISPLAY_LIMIT)
            .await?;
        let display = merge_ranked(recommended, cached, DISPLAY_LIMIT);

        session.recipes = display.iter().map(|entry| entry.summary.clone()).collect();
        session.anchor_vertex = Some(vertex.clone());
        Ok(format_recipe_list(&display))
    }

    async fn handle_selection(&self, session: &mut Session, selection: i64) -> Result<String> {
        let valid = selection >= 1 && (selection as usize) <= session.recipes.len();
        if !valid {
            session.reset();
            return Ok(INVALID_SELECTION_REPLY.to_string());
        }

        let summary = session.recipes[(selection - 1) as usize].clone();
        let user = self.ensure_user(session).await?;
        let anchor = session.anchor_vertex.clone();

        let recipe = match self.graph.find_recipe(&summary.id).await? {
            Some(recipe) => {
                debug!("recipe {} cached, recording the access", summary.id);
                self.graph
                    .record_recipe_request(&recipe, anchor.as_ref(), &user)
                    .await?;
                recipe
            }
            None => {
                debug!("no cached recipe {}, querying the catalog", summary.id);
                let info = self.catalog.recipe_info(&summary.id).await?;
                let steps = self.catalog.recipe_steps(&summary.id).await?;
                let detail = format_instructions(&info, &steps);
                self.graph
                    .add_recipe(&summary.id, &info.title, &detail, anchor.as_ref(), &user)
                    .await?
            }
        };

        let reply = recipe.property("detail").unwrap_or_default().to_string();
        self.notify
            .recipe(
                &session.user_id,
                anchor_ref(anchor.as_ref()),
                &summary.id,
                recipe.property("title").unwrap_or(&summary.title),
            )
            .await;
        session.reset();
        Ok(reply)
    }
}

fn summaries(recipes: Vec<CatalogRecipe>) -> Vec<RecipeSummary> {
    recipes
        .into_iter()
        .map(|recipe| RecipeSummary {
            id: recipe.id.to_string(),
            title: recipe.title,
        })
        .collect()
}

fn anchor_ref(vertex: Option<&Vertex>) -> AnchorRef<'_> {
    match vertex {
        Some(vertex) if vertex.label == INGREDIENT => AnchorRef {
            ingredient: Some(vertex.name()),
            cuisine: None,
        },
        Some(vertex) if vertex.label == CUISINE => AnchorRef {
            ingredient: None,
            cuisine: Some(vertex.name()),
        },
        _ => AnchorRef::default(),
    }
}

/// Recommendations first (flagged), then the cached match list, skipping
/// recipes already included, up to the overall display limit.
fn merge_ranked(
    recommended: Vec<RecommendedRecipe>,
    cached: Vec<RecipeSummary>,
    limit: usize,
) -> Vec<DisplayRecipe> {
    let mut entries: Vec<DisplayRecipe> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for recipe in recommended.into_iter().take(limit) {
        seen.insert(recipe.id.clone());
        entries.push(DisplayRecipe {
            summary: RecipeSummary {
                id: recipe.id,
                title: recipe.title,
            },
            recommended_user_count: Some(recipe.recommended_user_count),
        });
    }
    for summary in cached {
        if entries.len() >= limit {
            break;
        }
        if !seen.insert(summary.id.clone()) {
            continue;
        }
        entries.push(DisplayRecipe {
            summary,
            recommended_user_count: None,
        });
    }
    entries
}

fn format_recipe_list(entries: &[DisplayRecipe]) -> String {
    let mut text = String::from("Let's see here...\nI've found these recipes:\n");
    for (index, entry) in entries.iter().enumerate() {
        match entry.recommended_user_count {
            Some(1) => {
                text.push_str(&format!(
                    "{}. {} (recommended by 1 user)\n",
                    index + 1,
                    entry.summary.title
                ));
            }
            Some(count) => {
                text.push_str(&format!(
                    "{}. {} (recommended by {} users)\n",
                    index + 1,
                    entry.summary.title,
                    count
                ));
            }
            None => {
                text.push_str(&format!("{}. {}\n", index + 1, entry.summary.title));
            }
        }
    }
    text.push_str("\nPlease enter the corresponding number of your choice.");
    text
}

fn format_instructions(info: &RecipeInfo, steps: &[RecipeStep]) -> String {
    let mut text = format!(
        "Ok, it takes *{}* minutes to make *{}* servings of *{}*. Here are the steps:\n\n",
        info.ready_in_minutes, info.servings, info.title
    );
    if steps.is_empty() {
        text.push_str("_No instructions available for this recipe._\n\n");
    } else {
        for (index, step) in steps.iter().enumerate() {
            let equipment = if step.equipment.is_empty() {
                "None".to_string()
            } else {
                step.equipment
                    .iter()
                    .map(|e| e.name.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            };
            text.push_str(&format!(
                "*Step {}*:\n_Equipment_: {}\n_Action_: {}\n\n",
                index + 1,
                equipment,
                step.step
            ));
        }
    }
    text.push_str("*Say anything to me to start over...*");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use souschef_catalog::Equipment;

    fn summary(id: &str, title: &str) -> RecipeSummary {
        RecipeSummary {
            id: id.to_string(),
            title: title.to_string(),
        }
    }

    fn recommended(id: &str, title: &str, count: u32) -> RecommendedRecipe {
        RecommendedRecipe {
            id: id.to_string(),
            title: title.to_string(),
            recommended_user_count: count,
        }
    }

    #[test]
    fn merge_puts_recommendations_first_and_skips_duplicates() {
        let display = merge_ranked(
            vec![recommended("2", "B", 3)],
            vec![summary("1", "A"), summary("2", "B"), summary("3", "C")],
            5,
        );
        let ids: Vec<&str> = display.iter().map(|d| d.summary.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
        assert_eq!(display[0].recommended_user_count, Some(3));
        assert_eq!(display[1].recommended_user_count, None);
    }

    #[test]
    fn merge_respects_the_display_limit() {
        let cached: Vec<RecipeSummary> = (1..=6)
            .map(|i| summary(&i.to_string(), &format!("R{}", i)))
            .collect();
        let display = merge_ranked(vec![recommended("9", "Popular", 2)], cached, 5);
        assert_eq!(display.len(), 5);
        assert_eq!(display[0].summary.id, "9");
        assert_eq!(display[4].summary.id, "4");
    }

    #[test]
    fn recipe_list_flags_recommended_entries() {
        let text = format_recipe_list(&[
            DisplayRecipe {
                summary: summary("2", "Popular Stew"),
                recommended_user_count: Some(2),
            },
            DisplayRecipe {
                summary: summary("1", "Plain Soup"),
                recommended_user_count: None,
            },
        ]);
        assert!(text.contains("1. Popular Stew (recommended by 2 users)"));
        assert!(text.contains("2. Plain Soup\n"));
        assert!(text.ends_with("Please enter the corresponding number of your choice."));
    }

    #[test]
    fn empty_recipe_list_still_prompts_for_a_number() {
        let text = format_recipe_list(&[]);
        assert!(text.contains("I've found these recipes:"));
        assert!(text.ends_with("Please enter the corresponding number of your choice."));
    }

    #[test]
    fn instructions_join_equipment_or_say_none() {
        let info = RecipeInfo {
            title: "Tomato Soup".to_string(),
            ready_in_minutes: 30,
            servings: 4,
        };
        let steps = vec![
            RecipeStep {
                step: "Chop everything.".to_string(),
                equipment: vec![
                    Equipment {
                        name: "knife".to_string(),
                    },
                    Equipment {
                        name: "board".to_string(),
                    },
                ],
            },
            RecipeStep {
                step: "Simmer.".to_string(),
                equipment: vec![],
            },
        ];
        let text = format_instructions(&info, &steps);
        assert!(text.contains("*30* minutes to make *4* servings of *Tomato Soup*"));
        assert!(text.contains("*Step 1*:\n_Equipment_: knife,board\n_Action_: Chop everything."));
        assert!(text.contains("*Step 2*:\n_Equipment_: None\n_Action_: Simmer."));
    }

    #[test]
    fn missing_instructions_degrade_gracefully() {
        let info = RecipeInfo {
            title: "Mystery Dish".to_string(),
            ready_in_minutes: 10,
            servings: 1,
        };
        let text = format_instructions(&info, &[]);
        assert!(text.contains("_No instructions available for this recipe._"));
    }
}
