//! Core data model for the request-to-plan pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Meal slot types in fixed per-day template order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }

    /// Per-day slot template for a given meals-per-day count. Three meals is
    /// the base; a fourth slot is a snack.
    pub fn template(meals_per_day: u32) -> Vec<MealType> {
        let mut slots = vec![MealType::Breakfast, MealType::Lunch, MealType::Dinner];
        if meals_per_day >= 4 {
            slots.push(MealType::Snack);
        }
        slots
    }
}

impl std::fmt::Display for MealType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of recipe sources. New sources get a variant here plus a
/// `RecipeFetcher` impl; the retriever's merge logic never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Local,
    MealDb,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Local => "local",
            SourceId::MealDb => "mealdb",
        }
    }
}

impl std::str::FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(SourceId::Local),
            "mealdb" => Ok(SourceId::MealDb),
            other => Err(format!("unknown recipe source '{other}'")),
        }
    }
}

/// Where a recipe's macro numbers came from. Absence of real data is
/// explicit, never a silent zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NutritionProvenance {
    /// Reported by the recipe source itself.
    Reported,
    /// Computed from a nutrition reference lookup over the ingredients.
    Reference,
    /// Estimated from ingredient count/type after lookups failed.
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: u32,
    pub protein_g: u32,
    pub carbs_g: u32,
    pub fat_g: u32,
    pub provenance: NutritionProvenance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique within its source.
    pub id: String,
    pub name: String,
    pub source: SourceId,
    #[serde(default)]
    pub diet_tags: Vec<String>,
    #[serde(default)]
    pub dish_types: Vec<String>,
    pub ingredients: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<u32>,
    #[serde(default)]
    pub instructions: Vec<String>,
}

/// Normalized structured representation of a natural-language request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSet {
    pub duration_days: u32,
    pub diets: Vec<String>,
    pub exclusions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calorie_target: Option<u32>,
    pub preferences: Vec<String>,
    pub meals_per_day: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarified_intent: Option<String>,
    pub ambiguity_flag: bool,
    /// Fraction of expected fields the rule-based parser matched, in [0,1].
    pub confidence: f32,
}

impl Default for ConstraintSet {
    fn default() -> Self {
        Self {
            duration_days: 3,
            diets: Vec::new(),
            exclusions: Vec::new(),
            calorie_target: None,
            preferences: Vec::new(),
            meals_per_day: 3,
            clarified_intent: None,
            ambiguity_flag: false,
            confidence: 0.0,
        }
    }
}

/// One position in the plan grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MealSlot {
    /// 1-based day index.
    pub day: u32,
    pub meal_type: MealType,
}

/// Ephemeral per-slot scoring result. Not persisted.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub recipe: Recipe,
    pub score: f64,
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    pub meal_type: MealType,
    pub recipe_id: String,
    pub recipe_name: String,
    pub source: SourceId,
    pub ingredients: Vec<String>,
    pub nutrition: Nutrition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<u32>,
    pub instructions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: u32,
    pub date: NaiveDate,
    pub meals: Vec<Meal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSummary {
    pub total_meals: u32,
    /// Requested diets actually satisfied by every selected recipe,
    /// recomputed from the final selections.
    pub dietary_compliance: Vec<String>,
    /// Placeholder; not computed from real pricing data.
    pub estimated_cost: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_prep_time_minutes: Option<u32>,
    /// Slots filled by re-using an already-selected recipe because the
    /// eligible pool ran out. Diversity degradation, not an error.
    pub repeated_selections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: Uuid,
    pub duration_days: u32,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarified_intent: Option<String>,
    pub days: Vec<DayPlan>,
    pub summary: PlanSummary,
}
