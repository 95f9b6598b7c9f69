//! Constraint parser: deterministic pattern rules first, with an optional
//! completion-service escalation for ambiguous queries. Never fails; the
//! worst case is a default ConstraintSet with the ambiguity flag set.

use crate::clients::CompletionPort;
use crate::config::{ParserConfig, PlanConfig};
use crate::models::ConstraintSet;
use crate::rules::DIET_DEFINITIONS;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*-?\s*day").expect("valid regex"));
static EXCLUSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:no|exclude|without)\s+([a-z]+)").expect("valid regex"));
static FREE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z]+)-free").expect("valid regex"));
static CALORIES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:cal|kcal|calories)").expect("valid regex"));
static HIGH_PROTEIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bhigh[- ]protein\b").expect("valid regex"));
static LOW_CARB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\blow[- ]carb\b").expect("valid regex"));
static BUDGET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bbudget(-friendly)?\b").expect("valid regex"));
static QUICK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bquick\b|\bfast\b").expect("valid regex"));
static UNDER_MINUTES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"under\s+(\d+)\s*(?:minutes|mins|min)\b").expect("valid regex"));

/// Number of independently extracted fields that feed the confidence score:
/// duration, diets, exclusions, calories, preferences.
const EXPECTED_FIELDS: f32 = 5.0;

/// Exclusion keys recognized from "-free" suffix patterns.
const FREE_SUFFIX_KEYS: &[&str] = &["gluten", "dairy", "nut", "sugar"];

pub struct ConstraintParser {
    plan: PlanConfig,
    parser: ParserConfig,
    completion: Option<Arc<dyn CompletionPort>>,
}

impl ConstraintParser {
    pub fn new(
        plan: PlanConfig,
        parser: ParserConfig,
        completion: Option<Arc<dyn CompletionPort>>,
    ) -> Self {
        Self {
            plan,
            parser,
            completion,
        }
    }

    /// Parse a natural-language query into a ConstraintSet. Deterministic
    /// for unambiguous text; zero external calls when confidence clears
    /// the ambiguity threshold.
    pub async fn parse(&self, query: &str) -> ConstraintSet {
        let mut constraints = self.parse_rules(query);

        if constraints.ambiguity_flag
            && let Some(completion) = &self.completion
        {
            let text = query.to_lowercase();
            let duration_explicit = extract_duration(&text).is_some();
            let snack_explicit = text.contains("snack");
            match enhance(completion.as_ref(), query, &constraints).await {
                Some(delta) => {
                    merge_enhancement(&mut constraints, &delta, duration_explicit, snack_explicit)
                }
                None => {
                    tracing::warn!("query enhancement unavailable, using rule-only parse");
                }
            }
        }

        constraints
    }

    /// Rule-only extraction pass. Pure; exposed for tests.
    pub fn parse_rules(&self, query: &str) -> ConstraintSet {
        let text = query.to_lowercase();

        let explicit_duration = extract_duration(&text);
        let diets = extract_diets(&text);
        let exclusions = extract_exclusions(&text);
        let calorie_target = extract_calories(&text);
        let preferences = extract_preferences(&text);
        let meals_per_day = extract_meals_per_day(&text);

        let matched = [
            explicit_duration.is_some(),
            !diets.is_empty(),
            !exclusions.is_empty(),
            calorie_target.is_some(),
            !preferences.is_empty(),
        ]
        .iter()
        .filter(|m| **m)
        .count() as f32;
        let confidence = matched / EXPECTED_FIELDS;
        let ambiguity_flag = confidence < self.parser.ambiguity_threshold;

        ConstraintSet {
            duration_days: explicit_duration.unwrap_or(self.plan.default_days),
            diets,
            exclusions,
            calorie_target,
            preferences,
            meals_per_day,
            clarified_intent: None,
            ambiguity_flag,
            confidence,
        }
    }
}

fn extract_duration(text: &str) -> Option<u32> {
    if let Some(caps) = DURATION_RE.captures(text) {
        let val: u32 = caps[1].parse().unwrap_or(1);
        return Some(val.max(1));
    }
    if text.contains("week") {
        return Some(7);
    }
    None
}

fn extract_diets(text: &str) -> Vec<String> {
    // Sorted for a stable extraction order; HashMap iteration is not.
    let mut keys: Vec<&str> = DIET_DEFINITIONS.keys().copied().collect();
    keys.sort_unstable();
    keys.into_iter()
        .filter(|diet| text.contains(*diet))
        // "vegan" is a substring of nothing, but "vegetarian" contains no
        // other key; the only overlap is low-carb vs keto-style phrasing,
        // which are distinct literals, so plain contains() is enough.
        .map(|d| d.to_string())
        .collect()
}

fn extract_exclusions(text: &str) -> Vec<String> {
    let mut exclusions: Vec<String> = Vec::new();
    for caps in EXCLUSION_RE.captures_iter(text) {
        let key = caps[1].to_string();
        if !exclusions.contains(&key) {
            exclusions.push(key);
        }
    }
    for caps in FREE_RE.captures_iter(text) {
        let key = caps[1].to_string();
        if FREE_SUFFIX_KEYS.contains(&key.as_str()) && !exclusions.contains(&key) {
            exclusions.push(key);
        }
    }
    exclusions
}

fn extract_calories(text: &str) -> Option<u32> {
    CALORIES_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

fn extract_meals_per_day(text: &str) -> u32 {
    if text.contains("snack") { 4 } else { 3 }
}

fn extract_preferences(text: &str) -> Vec<String> {
    let mut preferences: Vec<String> = Vec::new();
    let mut push = |pref: String| {
        if !preferences.contains(&pref) {
            preferences.push(pref);
        }
    };
    if HIGH_PROTEIN_RE.is_match(text) {
        push("high-protein".to_string());
    }
    if LOW_CARB_RE.is_match(text) {
        push("low-carb".to_string());
    }
    if BUDGET_RE.is_match(text) {
        push("budget-friendly".to_string());
    }
    if QUICK_RE.is_match(text) {
        push("quick".to_string());
    }
    if let Some(caps) = UNDER_MINUTES_RE.captures(text) {
        push("quick".to_string());
        push(format!("under-{}-minutes", &caps[1]));
    }
    if text.contains("healthy") {
        push("healthy".to_string());
    }
    preferences
}

const ENHANCE_SYSTEM: &str =
    "You are a precise data extraction assistant. Always return valid JSON.";

fn enhance_prompt(query: &str, partial: &ConstraintSet) -> String {
    let partial_json = serde_json::to_string(partial).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Extract structured meal-plan constraints from the user's query.\n\
         \n\
         User query: \"{query}\"\n\
         Partial rule-based parse: {partial_json}\n\
         \n\
         Return a JSON object with this exact shape:\n\
         {{\n\
           \"clarified_intent\": \"<one sentence explaining what the user wants>\",\n\
           \"duration_days\": <number 1-7 or null>,\n\
           \"diets\": [\"vegetarian\", ...],\n\
           \"preferences\": [\"high-protein\", ...],\n\
           \"exclusions\": [\"dairy\", ...],\n\
           \"calories\": <daily target number or null>,\n\
           \"meals_per_day\": <number or null>,\n\
           \"override\": <true only when a rule-extracted value is wrong and must be replaced>\n\
         }}\n\
         Use null for unknown numbers and [] for empty lists. No prose outside JSON."
    )
}

async fn enhance(
    completion: &dyn CompletionPort,
    query: &str,
    partial: &ConstraintSet,
) -> Option<Value> {
    match completion
        .complete_json(ENHANCE_SYSTEM, &enhance_prompt(query, partial))
        .await
    {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => {
            tracing::warn!("enhancement response was not a JSON object, discarding");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "query enhancement call failed");
            None
        }
    }
}

/// Merge an enhancement delta into the rule-based parse. Enhancement fills
/// unset fields and unions list fields; it only replaces rule-extracted
/// values when the service set the explicit override flag.
fn merge_enhancement(
    constraints: &mut ConstraintSet,
    delta: &Value,
    duration_explicit: bool,
    snack_explicit: bool,
) {
    let override_rules = delta
        .get("override")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    if let Some(days) = delta.get("duration_days").and_then(|v| v.as_u64()) {
        let days = days as u32;
        if override_rules || !duration_explicit {
            constraints.duration_days = days.max(1);
        }
    }
    if let Some(calories) = delta.get("calories").and_then(|v| v.as_u64()) {
        if override_rules || constraints.calorie_target.is_none() {
            constraints.calorie_target = Some(calories as u32);
        }
    }
    if let Some(meals) = delta.get("meals_per_day").and_then(|v| v.as_u64())
        && (override_rules || !snack_explicit)
    {
        constraints.meals_per_day = (meals as u32).clamp(1, 5);
    }
    merge_list(&mut constraints.diets, delta.get("diets"), override_rules);
    merge_list(
        &mut constraints.exclusions,
        delta.get("exclusions"),
        override_rules,
    );
    merge_list(
        &mut constraints.preferences,
        delta.get("preferences"),
        override_rules,
    );
    if let Some(intent) = delta.get("clarified_intent").and_then(|v| v.as_str())
        && !intent.trim().is_empty()
    {
        constraints.clarified_intent = Some(intent.trim().to_string());
    }
}

fn merge_list(target: &mut Vec<String>, delta: Option<&Value>, override_rules: bool) {
    let Some(items) = delta.and_then(|v| v.as_array()) else {
        return;
    };
    let incoming: Vec<String> = items
        .iter()
        .filter_map(|v| v.as_str())
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if override_rules && !incoming.is_empty() {
        target.clear();
    }
    for item in incoming {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn parser() -> ConstraintParser {
        let config = Config::default();
        ConstraintParser::new(config.plan, config.parser, None)
    }

    #[tokio::test]
    async fn test_basic_query_extraction() {
        let c = parser().parse("Create a 3-day vegetarian meal plan").await;
        assert_eq!(c.duration_days, 3);
        assert_eq!(c.diets, vec!["vegetarian"]);
        assert!(!c.ambiguity_flag);
    }

    #[tokio::test]
    async fn test_duration_default_when_absent() {
        let c = parser().parse("vegan meals without dairy").await;
        assert_eq!(c.duration_days, 3);
        assert_eq!(c.diets, vec!["vegan"]);
        assert_eq!(c.exclusions, vec!["dairy"]);
    }

    #[tokio::test]
    async fn test_week_maps_to_seven_days() {
        let c = parser().parse("meal plan for next week, keto").await;
        assert_eq!(c.duration_days, 7);
        assert_eq!(c.diets, vec!["keto"]);
    }

    #[tokio::test]
    async fn test_over_limit_duration_passes_through_to_resolver() {
        let c = parser().parse("10-day vegan keto plan").await;
        assert_eq!(c.duration_days, 10);
        assert_eq!(c.diets, vec!["keto", "vegan"]);
    }

    #[tokio::test]
    async fn test_calories_and_preferences() {
        let c = parser()
            .parse("5 day high-protein plan under 2000 calories, quick meals")
            .await;
        assert_eq!(c.duration_days, 5);
        assert_eq!(c.calorie_target, Some(2000));
        assert!(c.preferences.contains(&"high-protein".to_string()));
        assert!(c.preferences.contains(&"quick".to_string()));
    }

    #[tokio::test]
    async fn test_under_minutes_preference() {
        let c = parser().parse("3 day plan, meals under 30 minutes").await;
        assert!(c.preferences.contains(&"under-30-minutes".to_string()));
        assert!(c.preferences.contains(&"quick".to_string()));
    }

    #[tokio::test]
    async fn test_gluten_free_is_diet_and_exclusion() {
        let c = parser().parse("4 day gluten-free plan").await;
        assert!(c.diets.contains(&"gluten-free".to_string()));
        assert!(c.exclusions.contains(&"gluten".to_string()));
    }

    #[tokio::test]
    async fn test_snack_bumps_meals_per_day() {
        let c = parser().parse("2 day vegetarian plan with snacks").await;
        assert_eq!(c.meals_per_day, 4);
    }

    #[tokio::test]
    async fn test_vague_query_sets_ambiguity_flag() {
        let c = parser().parse("something healthy I guess").await;
        assert!(c.ambiguity_flag);
        assert!(c.confidence < 0.25);
    }

    #[tokio::test]
    async fn test_parse_is_deterministic_for_unambiguous_queries() {
        let p = parser();
        let a = p.parse("Create a 3-day vegetarian meal plan").await;
        let b = p.parse("Create a 3-day vegetarian meal plan").await;
        assert_eq!(a, b);
    }

    #[test]
    fn test_merge_fills_unset_without_override() {
        let mut c = parser().parse_rules("3-day vegetarian plan");
        merge_enhancement(
            &mut c,
            &serde_json::json!({
                "diets": ["vegan"],
                "calories": 1800,
                "duration_days": 5,
                "clarified_intent": "A vegetarian plan"
            }),
            true,
            false,
        );
        // Rule-extracted duration kept, lists unioned, unset calories filled.
        assert_eq!(c.duration_days, 3);
        assert_eq!(c.diets, vec!["vegetarian", "vegan"]);
        assert_eq!(c.calorie_target, Some(1800));
        assert_eq!(c.clarified_intent.as_deref(), Some("A vegetarian plan"));
    }

    #[test]
    fn test_merge_override_replaces_rule_values() {
        let mut c = parser().parse_rules("3-day vegetarian plan");
        merge_enhancement(
            &mut c,
            &serde_json::json!({
                "diets": ["pescatarian"],
                "duration_days": 5,
                "override": true
            }),
            true,
            false,
        );
        assert_eq!(c.duration_days, 5);
        assert_eq!(c.diets, vec!["pescatarian"]);
    }

    #[test]
    fn test_merge_keeps_snack_detected_meals_without_override() {
        let mut c = parser().parse_rules("meals and snacks please");
        assert_eq!(c.meals_per_day, 4);
        merge_enhancement(&mut c, &serde_json::json!({ "meals_per_day": 3 }), false, true);
        assert_eq!(c.meals_per_day, 4);
        merge_enhancement(
            &mut c,
            &serde_json::json!({ "meals_per_day": 3, "override": true }),
            false,
            true,
        );
        assert_eq!(c.meals_per_day, 3);
    }
}
