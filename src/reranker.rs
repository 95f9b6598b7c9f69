//! Optional completion-service reranker. Sends the top-scored shortlist
//! for one slot out for a pick-one judgment and validates the reply hard:
//! anything that is not a choice from the offered candidates is a format
//! failure, and the planner falls back to the deterministic top score.

use crate::cache::{TtlCache, fingerprint};
use crate::clients::CompletionPort;
use crate::config::RerankConfig;
use crate::error::{PlanError, Result};
use crate::models::{ConstraintSet, MealSlot, ScoredCandidate};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const RERANK_SYSTEM: &str = "You are a meal-planning assistant. You pick the single best recipe \
for a meal slot from a provided shortlist. You must only choose from the provided candidates; \
never invent a recipe. Respond with JSON only, in exactly this shape: \
{\"selected_id\": \"<id>\", \"backup_id\": \"<id or null>\", \"reasons\": [\"...\"], \"confidence\": 0.0}";

/// Validated outcome of one rerank call.
#[derive(Debug, Clone)]
pub struct RerankChoice {
    pub recipe_id: String,
    pub reasons: Vec<String>,
    pub confidence: Option<f64>,
}

pub struct Reranker {
    completion: Arc<dyn CompletionPort>,
    cache: TtlCache<(String, Vec<String>, Option<f64>)>,
}

impl Reranker {
    pub fn new(config: &RerankConfig, completion: Arc<dyn CompletionPort>) -> Self {
        Self {
            completion,
            cache: TtlCache::new(
                config.cache_max_entries,
                Duration::from_secs(config.cache_ttl_secs),
            ),
        }
    }

    /// Ask the completion service to pick from the shortlist. Errors here
    /// are advisory; the caller keeps its deterministic choice on failure.
    pub async fn rerank(
        &self,
        slot: MealSlot,
        shortlist: &[ScoredCandidate],
        constraints: &ConstraintSet,
        recent_names: &[String],
    ) -> Result<RerankChoice> {
        if shortlist.is_empty() {
            return Err(PlanError::Internal {
                message: "rerank called with empty shortlist".to_string(),
            });
        }
        let key = choice_fingerprint(slot, shortlist, constraints, recent_names);
        if let Some((recipe_id, reasons, confidence)) = self.cache.get(&key) {
            tracing::debug!(slot_day = slot.day, slot_meal = %slot.meal_type, "rerank cache hit");
            return Ok(RerankChoice {
                recipe_id,
                reasons,
                confidence,
            });
        }

        let prompt = build_prompt(slot, shortlist, constraints, recent_names);
        let reply = self.completion.complete_json(RERANK_SYSTEM, &prompt).await?;
        let choice = validate_choice(&reply, shortlist)?;

        self.cache.put(
            &key,
            (
                choice.recipe_id.clone(),
                choice.reasons.clone(),
                choice.confidence,
            ),
        );
        Ok(choice)
    }
}

/// Normalize raw scores to a 0-100 scale within the shortlist so the
/// prompt reads the same regardless of absolute score magnitudes.
fn score_to_100(shortlist: &[ScoredCandidate]) -> Vec<u32> {
    let min = shortlist.iter().map(|c| c.score).fold(f64::INFINITY, f64::min);
    let max = shortlist
        .iter()
        .map(|c| c.score)
        .fold(f64::NEG_INFINITY, f64::max);
    shortlist
        .iter()
        .map(|c| {
            if (max - min).abs() < f64::EPSILON {
                100
            } else {
                (((c.score - min) / (max - min)) * 100.0).round() as u32
            }
        })
        .collect()
}

fn build_prompt(
    slot: MealSlot,
    shortlist: &[ScoredCandidate],
    constraints: &ConstraintSet,
    recent_names: &[String],
) -> String {
    let normalized = score_to_100(shortlist);
    let candidates: Vec<Value> = shortlist
        .iter()
        .zip(normalized)
        .map(|(c, score)| {
            serde_json::json!({
                "id": c.recipe.id,
                "name": c.recipe.name,
                "dish_types": c.recipe.dish_types,
                "ingredients": c.recipe.ingredients,
                "nutrition": c.recipe.nutrition,
                "prep_time_minutes": c.recipe.prep_time_minutes,
                "match_score": score,
            })
        })
        .collect();
    let payload = serde_json::json!({
        "slot": { "day": slot.day, "meal_type": slot.meal_type },
        "constraints": {
            "diets": constraints.diets,
            "exclusions": constraints.exclusions,
            "preferences": constraints.preferences,
            "calorie_target": constraints.calorie_target,
        },
        "recent_selections": recent_names,
        "candidates": candidates,
    });
    format!(
        "Pick the best candidate for this meal slot. Favor variety against recent_selections \
and fit with the stated preferences.\n{payload}"
    )
}

/// Accept `selected_id` when it names an offered candidate; fall back to
/// `backup_id` when only the backup is valid. Anything else is a format
/// failure.
fn validate_choice(reply: &Value, shortlist: &[ScoredCandidate]) -> Result<RerankChoice> {
    let offered = |id: &str| shortlist.iter().any(|c| c.recipe.id == id);
    let selected = reply.get("selected_id").and_then(|v| v.as_str());
    let backup = reply.get("backup_id").and_then(|v| v.as_str());

    let recipe_id = match (selected, backup) {
        (Some(id), _) if offered(id) => id.to_string(),
        (Some(foreign), Some(id)) if offered(id) => {
            tracing::warn!(
                selected = foreign,
                backup = id,
                "rerank selected a recipe outside the shortlist, using backup"
            );
            id.to_string()
        }
        _ => {
            return Err(PlanError::Format {
                message: format!("rerank reply did not choose an offered candidate: {reply}"),
            });
        }
    };

    let reasons = reply
        .get("reasons")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let confidence = reply.get("confidence").and_then(|v| v.as_f64());

    Ok(RerankChoice {
        recipe_id,
        reasons,
        confidence,
    })
}

/// Cache key over the slot, the offered candidate set, the constraint
/// fields that shape the prompt, and the recent-selection context.
fn choice_fingerprint(
    slot: MealSlot,
    shortlist: &[ScoredCandidate],
    constraints: &ConstraintSet,
    recent_names: &[String],
) -> String {
    let mut ids: Vec<&str> = shortlist.iter().map(|c| c.recipe.id.as_str()).collect();
    ids.sort_unstable();
    let mut diets = constraints.diets.clone();
    diets.sort_unstable();
    let mut prefs = constraints.preferences.clone();
    prefs.sort_unstable();
    fingerprint(&[
        &slot.day.to_string(),
        slot.meal_type.as_str(),
        &ids.join(","),
        &diets.join(","),
        &prefs.join(","),
        &recent_names.join(","),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MealType, Recipe, SourceId};
    use serde_json::json;

    fn candidate(id: &str, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            recipe: Recipe {
                id: id.to_string(),
                name: format!("Recipe {id}"),
                source: SourceId::Local,
                diet_tags: vec![],
                dish_types: vec!["dinner".to_string()],
                ingredients: vec!["rice".to_string()],
                nutrition: None,
                prep_time_minutes: Some(20),
                instructions: vec![],
            },
            score,
            rationale: None,
        }
    }

    #[test]
    fn test_validate_accepts_offered_selection() {
        let shortlist = vec![candidate("a", 3.0), candidate("b", 2.0)];
        let reply = json!({
            "selected_id": "b",
            "backup_id": "a",
            "reasons": ["more variety"],
            "confidence": 0.8
        });
        let choice = validate_choice(&reply, &shortlist).unwrap();
        assert_eq!(choice.recipe_id, "b");
        assert_eq!(choice.reasons, vec!["more variety"]);
        assert_eq!(choice.confidence, Some(0.8));
    }

    #[test]
    fn test_validate_falls_back_to_backup_on_foreign_selection() {
        let shortlist = vec![candidate("a", 3.0), candidate("b", 2.0)];
        let reply = json!({
            "selected_id": "made_up_id",
            "backup_id": "a",
            "reasons": []
        });
        let choice = validate_choice(&reply, &shortlist).unwrap();
        assert_eq!(choice.recipe_id, "a");
    }

    #[test]
    fn test_validate_rejects_fully_foreign_reply() {
        let shortlist = vec![candidate("a", 3.0)];
        let reply = json!({ "selected_id": "x", "backup_id": "y" });
        let err = validate_choice(&reply, &shortlist).unwrap_err();
        assert_eq!(err.kind(), "format");
    }

    #[test]
    fn test_validate_rejects_freeform_text_reply() {
        let shortlist = vec![candidate("a", 3.0)];
        let reply = json!("I would suggest the first recipe.");
        assert!(validate_choice(&reply, &shortlist).is_err());
    }

    #[test]
    fn test_score_normalization_spans_0_to_100() {
        let shortlist = vec![candidate("a", 4.0), candidate("b", 2.0), candidate("c", 3.0)];
        assert_eq!(score_to_100(&shortlist), vec![100, 0, 50]);
        let flat = vec![candidate("a", 1.0), candidate("b", 1.0)];
        assert_eq!(score_to_100(&flat), vec![100, 100]);
    }

    #[test]
    fn test_fingerprint_ignores_shortlist_order() {
        let slot = MealSlot {
            day: 1,
            meal_type: MealType::Dinner,
        };
        let constraints = ConstraintSet::default();
        let ab = choice_fingerprint(
            slot,
            &[candidate("a", 2.0), candidate("b", 1.0)],
            &constraints,
            &[],
        );
        let ba = choice_fingerprint(
            slot,
            &[candidate("b", 1.0), candidate("a", 2.0)],
            &constraints,
            &[],
        );
        assert_eq!(ab, ba);
    }
}
