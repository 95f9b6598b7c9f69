//! Candidate retriever: fans out to the configured recipe sources, merges
//! Local-first, dedupes across sources by normalized name, applies the hard
//! constraint filters, and enriches missing nutrition/prep-time so every
//! returned recipe is complete. Results are cached by constraints
//! fingerprint for a short TTL.

use crate::cache::{TtlCache, fingerprint};
use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::models::{ConstraintSet, Recipe, SourceId};
use crate::nutrition::{NutritionLookup, heuristic_nutrition, nutrition_from_reference};
use crate::rules::DIET_DEFINITIONS;
use crate::sources::RecipeFetcher;
use crate::utils::{estimate_prep_time, normalize_name};
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Proportional tolerance band around the per-meal calorie target.
/// A recipe passes when its calories are within this fraction of target.
pub const CALORIE_TOLERANCE_RATIO: f64 = 0.25;

pub struct Retriever {
    config: RetrievalConfig,
    sources: HashMap<SourceId, Arc<dyn RecipeFetcher>>,
    nutrition: Option<Arc<dyn NutritionLookup>>,
    cache: TtlCache<Vec<Recipe>>,
}

impl Retriever {
    pub fn new(
        config: RetrievalConfig,
        sources: HashMap<SourceId, Arc<dyn RecipeFetcher>>,
        nutrition: Option<Arc<dyn NutritionLookup>>,
    ) -> Self {
        let cache = TtlCache::new(
            config.cache_max_entries,
            Duration::from_secs(config.cache_ttl_secs),
        );
        Self {
            config,
            sources,
            nutrition,
            cache,
        }
    }

    /// Retrieve the candidate pool for a constraint set from the requested
    /// sources. Source failures degrade to whatever the other sources
    /// returned; a fully-empty pool is the caller's problem to handle.
    pub async fn retrieve(
        &self,
        constraints: &ConstraintSet,
        source_ids: &[SourceId],
    ) -> Result<Vec<Recipe>> {
        let mut requested: Vec<SourceId> = source_ids.to_vec();
        // Local-first is the tie-break for source priority.
        requested.sort_unstable();
        requested.dedup();

        let key = pool_fingerprint(constraints, &requested);
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(key = %key, size = cached.len(), "retrieval cache hit");
            return Ok(cached);
        }

        let fetches = requested.iter().filter_map(|id| {
            self.sources
                .get(id)
                .map(|source| async move { (*id, source.fetch(constraints).await) })
        });
        let mut merged: Vec<Recipe> = Vec::new();
        for (id, outcome) in join_all(fetches).await {
            match outcome {
                Ok(recipes) => merged.extend(recipes),
                Err(err) => {
                    tracing::warn!(source = id.as_str(), error = %err, "source fetch failed, continuing without it");
                }
            }
        }

        let deduped = self.dedupe(merged);
        let filtered: Vec<Recipe> = deduped
            .into_iter()
            .filter(|r| satisfies_diets(r, constraints))
            .filter(|r| !crate::sources::local::contains_excluded(r, &constraints.exclusions))
            .collect();

        let enriched = self.enrich(filtered).await;
        let pool: Vec<Recipe> = enriched
            .into_iter()
            .filter(|r| self.calorie_compatible(r, constraints))
            .collect();

        tracing::info!(
            size = pool.len(),
            sources = requested.len(),
            "candidate pool assembled"
        );
        self.cache.put(&key, pool.clone());
        Ok(pool)
    }

    /// Cross-source dedupe on normalized names, with a similarity guard for
    /// near-identical titles. First occurrence (Local-first order) wins.
    fn dedupe(&self, recipes: Vec<Recipe>) -> Vec<Recipe> {
        let mut kept: Vec<Recipe> = Vec::new();
        let mut kept_names: Vec<String> = Vec::new();
        for recipe in recipes {
            let name = normalize_name(&recipe.name);
            let duplicate = kept_names.iter().any(|existing| {
                *existing == name
                    || strsim::jaro_winkler(existing, &name) >= self.config.dedupe_similarity
            });
            if duplicate {
                tracing::debug!(name = %recipe.name, source = recipe.source.as_str(), "dropping cross-source duplicate");
                continue;
            }
            kept_names.push(name);
            kept.push(recipe);
        }
        kept
    }

    /// Fill missing nutrition (reference lookup, then heuristic) and missing
    /// prep time (instruction-text estimate). Absence never survives here.
    async fn enrich(&self, recipes: Vec<Recipe>) -> Vec<Recipe> {
        let mut enriched = Vec::with_capacity(recipes.len());
        for mut recipe in recipes {
            if recipe.nutrition.is_none() {
                if let Some(lookup) = &self.nutrition {
                    recipe.nutrition =
                        nutrition_from_reference(&recipe.ingredients, lookup.as_ref()).await;
                }
                if recipe.nutrition.is_none() {
                    tracing::debug!(recipe = %recipe.name, "falling back to heuristic nutrition");
                    recipe.nutrition = Some(heuristic_nutrition(&recipe.ingredients));
                }
            }
            if recipe.prep_time_minutes.is_none() {
                recipe.prep_time_minutes = Some(estimate_prep_time(
                    &recipe.ingredients,
                    &recipe.instructions,
                ));
            }
            enriched.push(recipe);
        }
        enriched
    }

    fn calorie_compatible(&self, recipe: &Recipe, constraints: &ConstraintSet) -> bool {
        let Some(target) = constraints.calorie_target else {
            return true;
        };
        let Some(nutrition) = &recipe.nutrition else {
            return true;
        };
        let per_meal = target as f64 / constraints.meals_per_day.max(1) as f64;
        let tolerance = per_meal * self.config.calorie_tolerance_ratio;
        (nutrition.calories as f64 - per_meal).abs() <= tolerance
    }
}

/// Stable cache key over the retrieval-relevant constraint fields and the
/// requested source list.
fn pool_fingerprint(constraints: &ConstraintSet, sources: &[SourceId]) -> String {
    let mut diets = constraints.diets.clone();
    diets.sort_unstable();
    let mut exclusions = constraints.exclusions.clone();
    exclusions.sort_unstable();
    let sources: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();
    let calories = constraints
        .calorie_target
        .map(|c| c.to_string())
        .unwrap_or_default();
    fingerprint(&[
        &diets.join(","),
        &exclusions.join(","),
        &calories,
        &constraints.meals_per_day.to_string(),
        &sources.join(","),
    ])
}

/// Strict tag matching when the recipe carries real diet metadata (Local
/// source, or any tag from the diet vocabulary); best-effort ingredient
/// screening otherwise. Remote recipes pick up incidental free-form tags
/// ("stew", "spicy") that must not be mistaken for diet declarations.
fn satisfies_diets(recipe: &Recipe, constraints: &ConstraintSet) -> bool {
    if constraints.diets.is_empty() {
        return true;
    }
    let strict = recipe.source == SourceId::Local || has_declared_diets(&recipe.diet_tags);
    let surface = recipe.ingredients.join(" ").to_lowercase();
    constraints.diets.iter().all(|diet| {
        if crate::sources::local::matches_diet(&recipe.diet_tags, diet) {
            return true;
        }
        if strict {
            return false;
        }
        match DIET_DEFINITIONS.get(diet.as_str()) {
            Some(rule) => !rule
                .forbidden_ingredients
                .iter()
                .any(|banned| surface.contains(banned)),
            // Unknown diet names can't be screened; let scoring sort it out.
            None => true,
        }
    })
}

/// Tags count as diet metadata only when at least one is a name from the
/// diet vocabulary.
fn has_declared_diets(diet_tags: &[String]) -> bool {
    diet_tags.iter().any(|tag| {
        let tag = tag.to_lowercase().replace(' ', "-");
        DIET_DEFINITIONS.contains_key(tag.as_str())
    })
}
