//! Turns the planner's slot selections into the final dated plan document.

use crate::models::{ConstraintSet, DayPlan, Meal, MealPlan, PlanSummary};
use crate::nutrition::heuristic_nutrition;
use crate::planner::PlanDraft;
use crate::sources::local::matches_diet;
use chrono::{Days, NaiveDate, Utc};
use uuid::Uuid;

/// Not computed from real pricing data.
const ESTIMATED_COST_PLACEHOLDER: &str = "$45-60";

/// Assemble the final plan starting from `start_date`. Day numbering is
/// 1-based and dates run consecutively from the start.
pub fn assemble(
    draft: &PlanDraft,
    constraints: &ConstraintSet,
    start_date: NaiveDate,
) -> MealPlan {
    let mut days: Vec<DayPlan> = (1..=constraints.duration_days)
        .map(|day| DayPlan {
            day,
            date: start_date
                .checked_add_days(Days::new(u64::from(day - 1)))
                .unwrap_or(start_date),
            meals: Vec::new(),
        })
        .collect();

    for selection in &draft.selections {
        let recipe = &selection.candidate.recipe;
        let nutrition = recipe
            .nutrition
            .clone()
            .unwrap_or_else(|| heuristic_nutrition(&recipe.ingredients));
        let meal = Meal {
            meal_type: selection.slot.meal_type,
            recipe_id: recipe.id.clone(),
            recipe_name: recipe.name.clone(),
            source: recipe.source,
            ingredients: recipe.ingredients.clone(),
            nutrition,
            prep_time_minutes: recipe.prep_time_minutes,
            instructions: recipe.instructions.clone(),
            rationale: selection.candidate.rationale.clone(),
        };
        if let Some(day) = days.get_mut(selection.slot.day as usize - 1) {
            day.meals.push(meal);
        }
    }

    MealPlan {
        id: Uuid::new_v4(),
        duration_days: constraints.duration_days,
        generated_at: Utc::now(),
        clarified_intent: constraints.clarified_intent.clone(),
        summary: summarize(draft, constraints),
        days,
    }
}

/// Convenience wrapper: plans start tomorrow.
pub fn assemble_from_tomorrow(draft: &PlanDraft, constraints: &ConstraintSet) -> MealPlan {
    let start = Utc::now()
        .date_naive()
        .checked_add_days(Days::new(1))
        .unwrap_or_else(|| Utc::now().date_naive());
    assemble(draft, constraints, start)
}

/// Compliance is recomputed from the final selections, not echoed from the
/// request: a diet only appears when every selected recipe satisfies it.
fn summarize(draft: &PlanDraft, constraints: &ConstraintSet) -> PlanSummary {
    let dietary_compliance: Vec<String> = constraints
        .diets
        .iter()
        .filter(|diet| {
            !draft.selections.is_empty()
                && draft
                    .selections
                    .iter()
                    .all(|s| matches_diet(&s.candidate.recipe.diet_tags, diet))
        })
        .cloned()
        .collect();

    let known_preps: Vec<u32> = draft
        .selections
        .iter()
        .filter_map(|s| s.candidate.recipe.prep_time_minutes)
        .collect();
    let avg_prep_time_minutes = if known_preps.is_empty() {
        None
    } else {
        Some(known_preps.iter().sum::<u32>() / known_preps.len() as u32)
    };

    PlanSummary {
        total_meals: draft.selections.len() as u32,
        dietary_compliance,
        estimated_cost: ESTIMATED_COST_PLACEHOLDER.to_string(),
        avg_prep_time_minutes,
        repeated_selections: draft.repeated_selections,
    }
}
