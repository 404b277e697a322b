//! Dialogue service wire types and turn-signal classification.

use serde::Deserialize;
use serde_json::Value;

/// Response from one dialogue turn.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DialogueResponse {
    /// Opaque conversation context, echoed back on the next turn.
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub output: DialogueOutput,
    #[serde(default)]
    pub entities: Vec<DialogueEntity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DialogueOutput {
    #[serde(default)]
    pub text: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DialogueEntity {
    pub entity: String,
    pub value: String,
}

/// What the classified context asks the turn handler to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnSignal {
    Favorites,
    Ingredients,
    Cuisine(String),
    /// Numeric selection from the previously shown list. Unparseable
    /// selections surface as -1 and fail validation downstream.
    Selection(i64),
    StartOver,
}

fn context_flag(context: &Value, name: &str) -> bool {
    context.get(name).and_then(Value::as_bool).unwrap_or(false)
}

fn context_selection(context: &Value) -> i64 {
    match context.get("selection") {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(-1),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(-1),
        _ => -1,
    }
}

impl TurnSignal {
    /// Classify a dialogue response into the turn signal, in the service's
    /// precedence order: favorites, ingredients, cuisine entity, selection,
    /// then start-over as the default.
    pub fn classify(response: &DialogueResponse) -> TurnSignal {
        let context = &response.context;
        if context_flag(context, "is_favorites") {
            TurnSignal::Favorites
        } else if context_flag(context, "is_ingredients") {
            TurnSignal::Ingredients
        } else if let Some(entity) = response
            .entities
            .first()
            .filter(|entity| entity.entity == "cuisine")
        {
            TurnSignal::Cuisine(entity.value.clone())
        } else if context_flag(context, "is_selection") {
            TurnSignal::Selection(context_selection(context))
        } else {
            TurnSignal::StartOver
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(context: Value, entities: Vec<DialogueEntity>) -> DialogueResponse {
        DialogueResponse {
            context,
            output: DialogueOutput::default(),
            entities,
        }
    }

    #[test]
    fn classifies_in_precedence_order() {
        let r = response(json!({"is_favorites": true, "is_selection": true}), vec![]);
        assert_eq!(TurnSignal::classify(&r), TurnSignal::Favorites);

        let r = response(json!({"is_ingredients": true}), vec![]);
        assert_eq!(TurnSignal::classify(&r), TurnSignal::Ingredients);

        let r = response(
            json!({}),
            vec![DialogueEntity {
                entity: "cuisine".to_string(),
                value: "thai".to_string(),
            }],
        );
        assert_eq!(TurnSignal::classify(&r), TurnSignal::Cuisine("thai".to_string()));

        let r = response(json!({"is_selection": true, "selection": "3"}), vec![]);
        assert_eq!(TurnSignal::classify(&r), TurnSignal::Selection(3));

        let r = response(json!({}), vec![]);
        assert_eq!(TurnSignal::classify(&r), TurnSignal::StartOver);
    }

    #[test]
    fn selection_parses_numbers_and_strings() {
        let r = response(json!({"is_selection": true, "selection": 2}), vec![]);
        assert_eq!(TurnSignal::classify(&r), TurnSignal::Selection(2));

        let r = response(json!({"is_selection": true, "selection": "nope"}), vec![]);
        assert_eq!(TurnSignal::classify(&r), TurnSignal::Selection(-1));

        let r = response(json!({"is_selection": true}), vec![]);
        assert_eq!(TurnSignal::classify(&r), TurnSignal::Selection(-1));
    }
}
