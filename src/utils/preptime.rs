//! Deterministic prep-time estimation for sources that do not report one.
//! Combines explicit durations found in instruction text with cook-verb
//! buckets and long-wait penalties, clamped to a sane range.

use once_cell::sync::Lazy;
use regex::Regex;

const MIN_TOTAL_MINUTES: u32 = 5;
const MAX_TOTAL_MINUTES: u32 = 180;

static MINUTES_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*-\s*(\d+)\s*(?:minutes|mins|min)\b").expect("valid regex"));
static MINUTES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:minutes|mins|min)\b").expect("valid regex"));
static HOURS_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*-\s*(\d+)\s*(?:hours|hour|hrs|hr)\b").expect("valid regex"));
static HOURS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:hours|hour|hrs|hr)\b").expect("valid regex"));

/// Estimate total time in minutes from ingredients and instruction steps.
pub fn estimate_prep_time(ingredients: &[String], instructions: &[String]) -> u32 {
    let ingredient_count = ingredients.iter().filter(|i| !i.trim().is_empty()).count();
    let steps: Vec<&str> = instructions
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    let text = steps.join(" ").to_lowercase();

    let explicit_minutes = sum_explicit_minutes(&text) + sum_explicit_hours(&text) * 60;

    let mut prep_minutes = 5.0 + (ingredient_count.saturating_sub(5)) as f64 * 0.5;
    prep_minutes += (steps.len().saturating_sub(3)) as f64 * 1.5;

    let cook_minutes = if explicit_minutes > 0 {
        explicit_minutes as f64
    } else {
        keyword_cook_minutes(&text) as f64
    };
    let wait_minutes = wait_penalty_minutes(&text, explicit_minutes > 0) as f64;

    let total = (prep_minutes + cook_minutes + wait_minutes).round() as u32;
    total.clamp(MIN_TOTAL_MINUTES, MAX_TOTAL_MINUTES)
}

fn sum_explicit_minutes(text: &str) -> u32 {
    let mut total = 0;
    for caps in MINUTES_RANGE_RE.captures_iter(text) {
        total += caps[2].parse::<u32>().unwrap_or(0);
    }
    let stripped = MINUTES_RANGE_RE.replace_all(text, "");
    for caps in MINUTES_RE.captures_iter(&stripped) {
        total += caps[1].parse::<u32>().unwrap_or(0);
    }
    total
}

fn sum_explicit_hours(text: &str) -> u32 {
    let mut total = 0;
    for caps in HOURS_RANGE_RE.captures_iter(text) {
        total += caps[2].parse::<u32>().unwrap_or(0);
    }
    let stripped = HOURS_RANGE_RE.replace_all(text, "");
    for caps in HOURS_RE.captures_iter(&stripped) {
        total += caps[1].parse::<u32>().unwrap_or(0);
    }
    total
}

fn keyword_cook_minutes(text: &str) -> u32 {
    if text.is_empty() {
        return 8;
    }
    let buckets: [(u32, &[&str]); 5] = [
        (30, &["slow cook", "slow-cook", "slow cooker", "slow-cooker"]),
        (25, &["pressure cook", "pressure-cook", "instant pot"]),
        (20, &["bake", "roast", "braise", "stew", "casserole"]),
        (15, &["boil", "simmer", "poach", "steam"]),
        (12, &["saute", "stir fry", "stir-fry", "fry", "grill", "sear"]),
    ];
    let mut best = 8;
    for (minutes, keywords) in buckets {
        if keywords.iter().any(|k| text.contains(k)) {
            best = best.max(minutes);
        }
    }
    best
}

fn wait_penalty_minutes(text: &str, has_explicit: bool) -> u32 {
    if text.contains("overnight") {
        return 480;
    }
    if has_explicit {
        return 0;
    }
    [
        ("marinate", 60),
        ("chill", 30),
        ("refrigerate", 30),
        ("rest", 10),
        ("proof", 60),
        ("rise", 60),
    ]
    .iter()
    .filter(|(k, _)| text.contains(k))
    .map(|(_, v)| *v)
    .max()
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_explicit_minutes_dominate() {
        let est = estimate_prep_time(
            &strings(&["pasta", "sauce"]),
            &strings(&["Boil pasta for 10 minutes.", "Simmer sauce for 15 minutes."]),
        );
        // 5 prep base + 25 explicit
        assert_eq!(est, 30);
    }

    #[test]
    fn test_range_uses_upper_bound() {
        let est = estimate_prep_time(&strings(&["rice"]), &strings(&["Cook 15-20 minutes."]));
        assert_eq!(est, 25);
    }

    #[test]
    fn test_overnight_clamps_to_max() {
        let est = estimate_prep_time(
            &strings(&["beans"]),
            &strings(&["Soak overnight.", "Boil until tender."]),
        );
        assert_eq!(est, MAX_TOTAL_MINUTES);
    }

    #[test]
    fn test_keyword_fallback_when_no_explicit_time() {
        let est = estimate_prep_time(&strings(&["egg"]), &strings(&["Fry the egg."]));
        // 5 prep base + 12 fry bucket
        assert_eq!(est, 17);
    }

    #[test]
    fn test_minimum_floor() {
        assert_eq!(estimate_prep_time(&[], &[]), 13);
        assert!(estimate_prep_time(&[], &[]) >= MIN_TOTAL_MINUTES);
    }
}
