//! Local recipe source backed by a JSON file, with an embedded default
//! dataset so the pipeline works with zero external configuration.

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::models::{ConstraintSet, Nutrition, NutritionProvenance, Recipe, SourceId};
use crate::rules::exclusion_terms;
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_RECIPES: &str = include_str!("../../data/recipes.json");

#[derive(Debug, Deserialize)]
struct LocalMacros {
    calories: u32,
    protein: u32,
    carbs: u32,
    fat: u32,
}

#[derive(Debug, Deserialize)]
struct LocalRecipe {
    id: String,
    name: String,
    #[serde(default)]
    diets: Vec<String>,
    #[serde(default)]
    dish_types: Vec<String>,
    ingredients: Vec<String>,
    #[serde(default)]
    nutrition: Option<LocalMacros>,
    #[serde(default)]
    ready_in_minutes: Option<u32>,
    #[serde(default)]
    instructions: Vec<String>,
}

pub struct LocalSource {
    recipes: Vec<Recipe>,
    fetch_cap: usize,
}

impl LocalSource {
    pub fn from_runtime(runtime: &RuntimeConfig, fetch_cap: usize) -> Self {
        let raw = match &runtime.local_recipes_path {
            Some(path) => match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "local recipe file unreadable, using embedded dataset");
                    DEFAULT_RECIPES.to_string()
                }
            },
            None => DEFAULT_RECIPES.to_string(),
        };
        Self::from_json(&raw, fetch_cap)
    }

    pub fn from_json(raw: &str, fetch_cap: usize) -> Self {
        let parsed: Vec<LocalRecipe> = match serde_json::from_str(raw) {
            Ok(recipes) => recipes,
            Err(err) => {
                tracing::warn!(error = %err, "failed to decode local recipes, source will be empty");
                Vec::new()
            }
        };
        let recipes = parsed.into_iter().map(adapt).collect();
        Self { recipes, fetch_cap }
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

fn adapt(raw: LocalRecipe) -> Recipe {
    Recipe {
        id: raw.id,
        name: raw.name,
        source: SourceId::Local,
        diet_tags: raw.diets.iter().map(|d| d.to_lowercase()).collect(),
        dish_types: raw.dish_types.iter().map(|d| d.to_lowercase()).collect(),
        nutrition: raw.nutrition.map(|n| Nutrition {
            calories: n.calories,
            protein_g: n.protein,
            carbs_g: n.carbs,
            fat_g: n.fat,
            provenance: NutritionProvenance::Reported,
        }),
        prep_time_minutes: raw.ready_in_minutes,
        ingredients: raw.ingredients,
        instructions: raw.instructions,
    }
}

/// Diet tag match with one hierarchy rule: vegan satisfies vegetarian.
pub(crate) fn matches_diet(diet_tags: &[String], requested: &str) -> bool {
    let requested = requested.to_lowercase().replace('-', " ");
    let tags: Vec<String> = diet_tags
        .iter()
        .map(|t| t.to_lowercase().replace('-', " "))
        .collect();
    if tags.iter().any(|t| *t == requested) {
        return true;
    }
    requested == "vegetarian" && tags.iter().any(|t| t == "vegan")
}

pub(crate) fn contains_excluded(recipe: &Recipe, exclusions: &[String]) -> bool {
    let surface = format!(
        "{} {}",
        recipe.name.to_lowercase(),
        recipe.ingredients.join(" ").to_lowercase()
    );
    exclusions.iter().any(|key| {
        exclusion_terms(&key.to_lowercase())
            .iter()
            .any(|term| surface.contains(term))
    })
}

#[async_trait]
impl super::RecipeFetcher for LocalSource {
    fn id(&self) -> SourceId {
        SourceId::Local
    }

    async fn fetch(&self, constraints: &ConstraintSet) -> Result<Vec<Recipe>> {
        let matched: Vec<Recipe> = self
            .recipes
            .iter()
            .filter(|r| {
                constraints
                    .diets
                    .iter()
                    .all(|diet| matches_diet(&r.diet_tags, diet))
            })
            .filter(|r| !contains_excluded(r, &constraints.exclusions))
            .take(self.fetch_cap)
            .cloned()
            .collect();
        tracing::debug!(
            total = self.recipes.len(),
            matched = matched.len(),
            "local source filtered"
        );
        Ok(matched)
    }
}
