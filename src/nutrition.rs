//! Nutrition reference port and enrichment math. Reference lookups are
//! per-100g macro profiles keyed by ingredient name; failures fall back to
//! a deterministic heuristic so a returned recipe never carries null
//! nutrition.

use crate::cache::TtlCache;
use crate::config::RuntimeConfig;
use crate::error::{PlanError, Result};
use crate::models::{Nutrition, NutritionProvenance};
use crate::utils::parse_ingredient;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Macros per 100 grams of a single ingredient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroProfile {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// Port to the external nutrition reference service.
#[async_trait]
pub trait NutritionLookup: Send + Sync {
    /// `Ok(None)` means the reference has no entry for this ingredient;
    /// `Err` means the service itself was unavailable.
    async fn per_100g(&self, ingredient: &str) -> Result<Option<MacroProfile>>;
}

/// USDA FoodData Central style client with an in-memory TTL cache.
pub struct UsdaClient {
    endpoint: String,
    api_key: String,
    client: Client,
    cache: TtlCache<Option<MacroProfile>>,
}

const PREFERRED_DATA_TYPES: &[&str] = &["Foundation", "SR Legacy", "Survey (FNDDS)", "Branded"];
const LOOKUP_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
const LOOKUP_CACHE_MAX: usize = 2048;

impl UsdaClient {
    /// `Ok(None)` when no API key is set; lookups then fall back to the
    /// heuristic estimate.
    pub fn from_runtime(runtime: &RuntimeConfig) -> Result<Option<Self>> {
        let Some(api_key) = runtime.usda_api_key.clone() else {
            return Ok(None);
        };
        let client = Client::builder()
            .timeout(Duration::from_millis(runtime.nutrition_timeout_ms))
            .build()
            .map_err(|e| PlanError::Config {
                message: format!("failed to build nutrition HTTP client: {e}"),
            })?;
        Ok(Some(Self {
            endpoint: runtime.nutrition_endpoint.clone(),
            api_key,
            client,
            cache: TtlCache::new(
                LOOKUP_CACHE_MAX,
                Duration::from_secs(LOOKUP_CACHE_TTL_SECS),
            ),
        }))
    }

    fn pick_best_food(foods: &[Value]) -> Option<&Value> {
        foods.iter().min_by_key(|item| {
            let data_type = item.get("dataType").and_then(|v| v.as_str()).unwrap_or("");
            PREFERRED_DATA_TYPES
                .iter()
                .position(|t| *t == data_type)
                .unwrap_or(PREFERRED_DATA_TYPES.len() + 1)
        })
    }

    fn extract_macros(food_nutrients: &[Value]) -> Option<MacroProfile> {
        let mut profile = MacroProfile {
            calories: 0.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
        };
        for nutrient in food_nutrients {
            let name = nutrient.get("nutrientName").and_then(|v| v.as_str());
            let value = nutrient.get("value").and_then(|v| v.as_f64());
            let unit = nutrient
                .get("unitName")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let (Some(name), Some(mut value)) = (name, value) else {
                continue;
            };
            match name {
                "Energy" => {
                    if unit.eq_ignore_ascii_case("kj") {
                        value /= 4.184;
                    }
                    profile.calories = value;
                }
                "Protein" => profile.protein = value,
                "Carbohydrate, by difference" => profile.carbs = value,
                "Total lipid (fat)" => profile.fat = value,
                _ => {}
            }
        }
        let all_zero = profile.calories == 0.0
            && profile.protein == 0.0
            && profile.carbs == 0.0
            && profile.fat == 0.0;
        if all_zero { None } else { Some(profile) }
    }
}

#[async_trait]
impl NutritionLookup for UsdaClient {
    async fn per_100g(&self, ingredient: &str) -> Result<Option<MacroProfile>> {
        if ingredient.is_empty() {
            return Ok(None);
        }
        let key = ingredient.to_lowercase();
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(ingredient = %key, "nutrition cache hit");
            return Ok(cached);
        }

        let res = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("query", ingredient),
                ("pageSize", "5"),
            ])
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(PlanError::Upstream {
                service: "nutrition".to_string(),
                message: format!("nutrition reference returned {}", res.status()),
            });
        }
        let payload: Value = res.json().await?;
        let foods = payload
            .get("foods")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let profile = Self::pick_best_food(&foods).and_then(|food| {
            food.get("foodNutrients")
                .and_then(|v| v.as_array())
                .and_then(|n| Self::extract_macros(n))
        });

        self.cache.put(&key, profile);
        Ok(profile)
    }
}

/// Sum per-100g reference profiles over a recipe's ingredient list, weighted
/// by parsed gram quantities (100g assumed when no quantity parses). Returns
/// None when every single lookup came back empty or failed.
pub async fn nutrition_from_reference(
    ingredients: &[String],
    lookup: &dyn NutritionLookup,
) -> Option<Nutrition> {
    if ingredients.is_empty() {
        return None;
    }
    let mut totals = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    let mut missing = 0usize;

    for item in ingredients {
        let (name, grams) = parse_ingredient(item);
        let profile = match lookup.per_100g(&name).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                missing += 1;
                continue;
            }
            Err(err) => {
                tracing::warn!(ingredient = %name, error = %err, "nutrition lookup failed");
                missing += 1;
                continue;
            }
        };
        let factor = grams.unwrap_or(100.0) / 100.0;
        totals.0 += profile.calories * factor;
        totals.1 += profile.protein * factor;
        totals.2 += profile.carbs * factor;
        totals.3 += profile.fat * factor;
    }

    if missing == ingredients.len() {
        return None;
    }
    Some(Nutrition {
        calories: totals.0.round() as u32,
        protein_g: totals.1.round() as u32,
        carbs_g: totals.2.round() as u32,
        fat_g: totals.3.round() as u32,
        provenance: NutritionProvenance::Reference,
    })
}

const PROTEIN_TOKENS: &[&str] = &[
    "chicken", "beef", "pork", "fish", "salmon", "tuna", "egg", "tofu", "tempeh", "lentil",
    "bean", "chickpea", "yogurt", "cheese", "shrimp", "turkey", "lamb",
];
const CARB_TOKENS: &[&str] = &[
    "rice", "pasta", "bread", "potato", "oat", "quinoa", "noodle", "tortilla", "flour", "sugar",
    "corn",
];

/// Deterministic macro estimate from ingredient count and type, used when
/// the reference lookup yields nothing. Never returns zeros.
pub fn heuristic_nutrition(ingredients: &[String]) -> Nutrition {
    let count = ingredients.len().max(1) as u32;
    let text = ingredients.join(" ").to_lowercase();
    let protein_hits = PROTEIN_TOKENS.iter().filter(|t| text.contains(*t)).count() as u32;
    let carb_hits = CARB_TOKENS.iter().filter(|t| text.contains(*t)).count() as u32;

    let calories = (220 + count * 45).clamp(250, 900);
    let protein_g = (8 + protein_hits * 12).min(60);
    let carbs_g = (20 + carb_hits * 18 + count * 2).min(110);
    let fat_g = (8 + count * 2).min(45);

    Nutrition {
        calories,
        protein_g,
        carbs_g,
        fat_g,
        provenance: NutritionProvenance::Heuristic,
    }
}
