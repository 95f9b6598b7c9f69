//! Deterministic candidate scoring. Pure function of (recipe, slot,
//! selection history, constraints); same inputs always produce the same
//! score, and ties keep input order so planning is reproducible.

use crate::config::ScoringConfig;
use crate::models::{ConstraintSet, MealSlot, MealType, Recipe, ScoredCandidate};
use once_cell::sync::Lazy;
use regex::Regex;

// Component weights. Tuned by hand against the embedded dataset.
const DIET_FIT_WEIGHT: f64 = 0.5;
const PREFERENCE_MATCH_BOOST: f64 = 1.0;
const MACRO_BOOST_CAP: f64 = 2.5;
const MACRO_BOOST_DIVISOR: f64 = 20.0;
const SLOT_FIT_BONUS: f64 = 1.5;
const SLOT_MISMATCH_PENALTY: f64 = 0.75;
const DIVERSITY_PENALTY: f64 = 2.0;
const BUDGET_INGREDIENT_PIVOT: f64 = 6.0;
const BUDGET_WEIGHT: f64 = 0.2;
const QUICK_PENALTY_DIVISOR: f64 = 10.0;
const DEFAULT_QUICK_THRESHOLD: u32 = 20;
const CALORIE_BALANCE_WEIGHT: f64 = 1.0;
const PREP_TIME_BONUS_CAP: f64 = 0.5;

static UNDER_MINUTES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"under[-\s](\d+)[-\s]*min").expect("valid regex"));

pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Score every candidate for a slot and return them best-first. Sorting
    /// is stable, so equal scores keep the retriever's merge order.
    pub fn rank(
        &self,
        candidates: &[Recipe],
        slot: MealSlot,
        history: &[Recipe],
        constraints: &ConstraintSet,
    ) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = candidates
            .iter()
            .map(|recipe| ScoredCandidate {
                recipe: recipe.clone(),
                score: self.score(recipe, slot, history, constraints),
                rationale: None,
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }

    /// Composite score for one recipe in one slot.
    pub fn score(
        &self,
        recipe: &Recipe,
        slot: MealSlot,
        history: &[Recipe],
        constraints: &ConstraintSet,
    ) -> f64 {
        let mut score = 0.0;
        score += diet_fit_component(recipe, &constraints.diets);
        score += preference_component(recipe, &constraints.preferences);
        score += slot_fit_component(recipe, slot.meal_type);
        score += self.diversity_component(recipe, history);
        score += calorie_balance_component(recipe, constraints);
        score += prep_time_component(recipe);
        score
    }

    /// Penalize recipes selected within the lookback window, scaled by how
    /// recent the repeat is.
    fn diversity_component(&self, recipe: &Recipe, history: &[Recipe]) -> f64 {
        let window = self.config.lookback_window;
        let recent = history.iter().rev().take(window);
        for (age, past) in recent.enumerate() {
            if past.id == recipe.id {
                let recency = (window - age) as f64 / window as f64;
                return -DIVERSITY_PENALTY * recency;
            }
        }
        0.0
    }
}

/// Graded diet fit. The retriever's hard filter already removed
/// non-compliant recipes, so this rewards explicit tagging over
/// best-effort passes from loosely-tagged sources.
fn diet_fit_component(recipe: &Recipe, diets: &[String]) -> f64 {
    if diets.is_empty() {
        return 0.0;
    }
    let matched = diets
        .iter()
        .filter(|diet| crate::sources::local::matches_diet(&recipe.diet_tags, diet))
        .count();
    DIET_FIT_WEIGHT * matched as f64 / diets.len() as f64
}

/// Preference boosts: free-text matches against the recipe surface, plus
/// the structured preferences (high-protein, low-carb, quick, budget).
fn preference_component(recipe: &Recipe, preferences: &[String]) -> f64 {
    if preferences.is_empty() {
        return 0.0;
    }
    let surface = format!(
        "{} {} {}",
        recipe.name.to_lowercase(),
        recipe.diet_tags.join(" "),
        recipe.ingredients.join(" ").to_lowercase()
    );
    let mut score = 0.0;
    for pref in preferences {
        let pref = pref.to_lowercase();
        match pref.as_str() {
            "high-protein" => {
                if let Some(n) = &recipe.nutrition {
                    score += (n.protein_g as f64 / MACRO_BOOST_DIVISOR).min(MACRO_BOOST_CAP);
                }
            }
            "low-carb" => {
                if let Some(n) = &recipe.nutrition {
                    score -= (n.carbs_g as f64 / MACRO_BOOST_DIVISOR).min(MACRO_BOOST_CAP);
                }
            }
            "budget" | "budget-friendly" => {
                let count = recipe.ingredients.len() as f64;
                score += (BUDGET_INGREDIENT_PIVOT - count).max(0.0) * BUDGET_WEIGHT;
            }
            _ if pref == "quick" || UNDER_MINUTES_RE.is_match(&pref) => {
                let threshold = UNDER_MINUTES_RE
                    .captures(&pref)
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .unwrap_or(DEFAULT_QUICK_THRESHOLD);
                if let Some(prep) = recipe.prep_time_minutes {
                    if prep > threshold {
                        score -= (prep - threshold) as f64 / QUICK_PENALTY_DIVISOR;
                    } else {
                        score += PREFERENCE_MATCH_BOOST;
                    }
                }
            }
            _ => {
                if surface.contains(&pref) {
                    score += PREFERENCE_MATCH_BOOST;
                }
            }
        }
    }
    score
}

/// Dish-type fit for the slot. Untyped recipes sit between a declared fit
/// and a declared mismatch.
fn slot_fit_component(recipe: &Recipe, meal_type: MealType) -> f64 {
    if recipe.dish_types.is_empty() {
        return 0.0;
    }
    let wanted = meal_type.as_str();
    let fits = recipe.dish_types.iter().any(|d| {
        let d = d.to_lowercase();
        d.contains(wanted)
            || (meal_type == MealType::Dinner && (d.contains("main") || d.contains("entree")))
            || (meal_type == MealType::Lunch && d.contains("main"))
    });
    if fits {
        SLOT_FIT_BONUS
    } else {
        -SLOT_MISMATCH_PENALTY
    }
}

/// Penalize macro imbalance against the per-meal calorie target: the
/// further from target, the larger the deduction, capped at one weight.
fn calorie_balance_component(recipe: &Recipe, constraints: &ConstraintSet) -> f64 {
    let (Some(target), Some(nutrition)) = (constraints.calorie_target, &recipe.nutrition) else {
        return 0.0;
    };
    let per_meal = target as f64 / constraints.meals_per_day.max(1) as f64;
    if per_meal <= 0.0 {
        return 0.0;
    }
    let deviation = ((nutrition.calories as f64 - per_meal) / per_meal).abs();
    -(deviation.min(1.0)) * CALORIE_BALANCE_WEIGHT
}

/// Small bonus for faster recipes so ties break toward less kitchen time.
fn prep_time_component(recipe: &Recipe) -> f64 {
    match recipe.prep_time_minutes {
        Some(prep) if prep > 0 => (PREP_TIME_BONUS_CAP * (30.0 - prep as f64) / 30.0)
            .clamp(-PREP_TIME_BONUS_CAP, PREP_TIME_BONUS_CAP),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Nutrition, NutritionProvenance, SourceId};

    fn recipe(id: &str, name: &str, dish_types: &[&str], protein: u32, carbs: u32) -> Recipe {
        Recipe {
            id: id.to_string(),
            name: name.to_string(),
            source: SourceId::Local,
            diet_tags: vec![],
            dish_types: dish_types.iter().map(|s| s.to_string()).collect(),
            ingredients: vec!["1 cup rice".to_string(), "200g tofu".to_string()],
            nutrition: Some(Nutrition {
                calories: 450,
                protein_g: protein,
                carbs_g: carbs,
                fat_g: 15,
                provenance: NutritionProvenance::Reported,
            }),
            prep_time_minutes: Some(20),
            instructions: vec![],
        }
    }

    fn slot(meal_type: MealType) -> MealSlot {
        MealSlot { day: 1, meal_type }
    }

    fn scorer() -> Scorer {
        Scorer::new(ScoringConfig { lookback_window: 3 })
    }

    #[test]
    fn test_score_is_deterministic() {
        let r = recipe("a", "Tofu Bowl", &["dinner"], 25, 40);
        let constraints = ConstraintSet {
            preferences: vec!["high-protein".to_string()],
            calorie_target: Some(1800),
            ..Default::default()
        };
        let s = scorer();
        let first = s.score(&r, slot(MealType::Dinner), &[], &constraints);
        let second = s.score(&r, slot(MealType::Dinner), &[], &constraints);
        assert_eq!(first, second);
    }

    #[test]
    fn test_explicitly_tagged_recipe_outscores_untagged() {
        let mut tagged = recipe("a", "Tagged Bowl", &["dinner"], 20, 30);
        tagged.diet_tags = vec!["vegetarian".to_string()];
        let untagged = recipe("b", "Untagged Bowl", &["dinner"], 20, 30);
        let constraints = ConstraintSet {
            diets: vec!["vegetarian".to_string()],
            ..Default::default()
        };
        let s = scorer();
        assert!(
            s.score(&tagged, slot(MealType::Dinner), &[], &constraints)
                > s.score(&untagged, slot(MealType::Dinner), &[], &constraints)
        );
    }

    #[test]
    fn test_high_protein_preference_boosts_protein_rich() {
        let lean = recipe("a", "Chicken Bowl", &["dinner"], 45, 20);
        let starchy = recipe("b", "Plain Pasta", &["dinner"], 8, 70);
        let constraints = ConstraintSet {
            preferences: vec!["high-protein".to_string()],
            ..Default::default()
        };
        let s = scorer();
        let la = s.score(&lean, slot(MealType::Dinner), &[], &constraints);
        let lb = s.score(&starchy, slot(MealType::Dinner), &[], &constraints);
        assert!(la > lb);
    }

    #[test]
    fn test_slot_fit_prefers_breakfast_recipe_at_breakfast() {
        let oats = recipe("a", "Oats", &["breakfast"], 12, 50);
        let stew = recipe("b", "Stew", &["dinner"], 20, 30);
        let constraints = ConstraintSet::default();
        let s = scorer();
        assert!(
            s.score(&oats, slot(MealType::Breakfast), &[], &constraints)
                > s.score(&stew, slot(MealType::Breakfast), &[], &constraints)
        );
    }

    #[test]
    fn test_main_course_fits_dinner_slot() {
        let remote = recipe("a", "Curry", &["main course"], 20, 30);
        assert!(slot_fit_component(&remote, MealType::Dinner) > 0.0);
        assert!(slot_fit_component(&remote, MealType::Breakfast) < 0.0);
    }

    #[test]
    fn test_recent_repeat_is_penalized_by_recency() {
        let r = recipe("a", "Tacos", &["dinner"], 15, 40);
        let other = recipe("b", "Soup", &["dinner"], 15, 40);
        let constraints = ConstraintSet::default();
        let s = scorer();
        let fresh = s.score(&r, slot(MealType::Dinner), &[], &constraints);
        let just_used = s.score(
            &r,
            slot(MealType::Dinner),
            &[other.clone(), r.clone()],
            &constraints,
        );
        let used_earlier = s.score(
            &r,
            slot(MealType::Dinner),
            &[r.clone(), other.clone(), other.clone()],
            &constraints,
        );
        assert!(just_used < used_earlier);
        assert!(used_earlier < fresh);
    }

    #[test]
    fn test_repeat_outside_lookback_window_not_penalized() {
        let r = recipe("a", "Tacos", &["dinner"], 15, 40);
        let other = recipe("b", "Soup", &["dinner"], 15, 40);
        let history = vec![r.clone(), other.clone(), other.clone(), other.clone()];
        let constraints = ConstraintSet::default();
        let s = scorer();
        assert_eq!(
            s.score(&r, slot(MealType::Dinner), &history, &constraints),
            s.score(&r, slot(MealType::Dinner), &[], &constraints)
        );
    }

    #[test]
    fn test_under_minutes_preference_penalizes_slow_recipes() {
        let mut slow = recipe("a", "Braise", &["dinner"], 20, 30);
        slow.prep_time_minutes = Some(60);
        let mut fast = recipe("b", "Stir Fry", &["dinner"], 20, 30);
        fast.prep_time_minutes = Some(15);
        let constraints = ConstraintSet {
            preferences: vec!["under 30 minutes".to_string()],
            ..Default::default()
        };
        let s = scorer();
        assert!(
            s.score(&fast, slot(MealType::Dinner), &[], &constraints)
                > s.score(&slow, slot(MealType::Dinner), &[], &constraints)
        );
    }

    #[test]
    fn test_rank_is_stable_for_equal_scores() {
        let a = recipe("a", "Bowl One", &["dinner"], 20, 30);
        let b = recipe("b", "Bowl Two", &["dinner"], 20, 30);
        let ranked = scorer().rank(
            &[a, b],
            slot(MealType::Dinner),
            &[],
            &ConstraintSet::default(),
        );
        assert_eq!(ranked[0].recipe.id, "a");
        assert_eq!(ranked[1].recipe.id, "b");
    }
}
