//! Ingredient string parsing: splits "2 tbsp olive oil" into a normalized
//! name and a grams estimate for nutrition-reference weighting.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static UNIT_TO_GRAMS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for (unit, grams) in [
        ("g", 1.0),
        ("gram", 1.0),
        ("grams", 1.0),
        ("kg", 1000.0),
        ("kilogram", 1000.0),
        ("kilograms", 1000.0),
        ("oz", 28.3495),
        ("ounce", 28.3495),
        ("ounces", 28.3495),
        ("lb", 453.592),
        ("pound", 453.592),
        ("pounds", 453.592),
        // Liquid measures treated as water-density grams.
        ("ml", 1.0),
        ("milliliter", 1.0),
        ("milliliters", 1.0),
        ("l", 1000.0),
        ("liter", 1000.0),
        ("liters", 1000.0),
        ("tsp", 5.0),
        ("teaspoon", 5.0),
        ("teaspoons", 5.0),
        ("tbsp", 15.0),
        ("tblsp", 15.0),
        ("tbs", 15.0),
        ("tablespoon", 15.0),
        ("tablespoons", 15.0),
        ("cup", 240.0),
        ("cups", 240.0),
        ("clove", 3.0),
        ("cloves", 3.0),
    ] {
        m.insert(unit, grams);
    }
    m
});

static PAREN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^)]*)\)").expect("valid regex"));
static QUANTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+\s+\d+/\d+|\d+/\d+|\d+(?:\.\d+)?\s*-\s*\d+(?:\.\d+)?|\d+(?:\.\d+)?)")
        .expect("valid regex")
});
static COMPACT_GRAMS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)([a-zA-Z]+)$").expect("valid regex"));

/// Parse an ingredient string into a normalized name and grams estimate.
/// Returns `None` grams when no quantity/unit could be resolved.
pub fn parse_ingredient(ingredient: &str) -> (String, Option<f64>) {
    let text = ingredient.trim().to_lowercase();

    // A parenthesized measure like "chicken (200g)" wins over the prefix.
    if let Some(caps) = PAREN_RE.captures(&text) {
        let inner = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        if let Some(grams) = grams_from_text(inner) {
            return (normalize(&strip_parens(&text)), Some(grams));
        }
    }

    let text = strip_parens(&text);
    let text = text.trim();
    let (quantity, rest) = match parse_quantity(text) {
        (Some(q), rest) => (q, rest),
        (None, _) => return (normalize(text), None),
    };

    let (unit, name) = parse_unit(rest);
    let name = normalize(&name);
    match unit.and_then(|u| UNIT_TO_GRAMS.get(u)) {
        Some(grams_per_unit) => (name, Some(quantity * grams_per_unit)),
        None => (name, None),
    }
}

fn parse_quantity(text: &str) -> (Option<f64>, &str) {
    let Some(caps) = QUANTITY_RE.captures(text) else {
        return (None, text);
    };
    let raw = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let rest = text[caps.get(0).map(|m| m.end()).unwrap_or(0)..].trim_start();

    if raw.contains('-') {
        // Range like "2-3": average the endpoints.
        let values: Vec<f64> = raw
            .split('-')
            .filter_map(|p| parse_number(p.trim()))
            .collect();
        if values.is_empty() {
            return (None, rest);
        }
        return (Some(values.iter().sum::<f64>() / values.len() as f64), rest);
    }

    (parse_number(raw), rest)
}

fn parse_number(raw: &str) -> Option<f64> {
    if let Some((whole, frac)) = raw.split_once(' ') {
        // Mixed fraction "1 1/2".
        let base = parse_number(whole.trim());
        let extra = parse_number(frac.trim());
        return match (base, extra) {
            (Some(b), Some(e)) => Some(b + e),
            (b, e) => b.or(e),
        };
    }
    if let Some((num, den)) = raw.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den == 0.0 {
            return None;
        }
        return Some(num / den);
    }
    raw.parse().ok()
}

fn parse_unit(text: &str) -> (Option<&str>, String) {
    let mut parts = text.split_whitespace();
    let Some(first) = parts.next() else {
        return (None, text.to_string());
    };
    let unit = first.trim_end_matches(['.', ',']);
    if UNIT_TO_GRAMS.contains_key(unit) {
        let rest = parts.collect::<Vec<_>>().join(" ");
        let rest = rest.strip_prefix("of ").unwrap_or(&rest).to_string();
        // Can't return the trimmed borrow, so find the matching static key.
        let key = UNIT_TO_GRAMS
            .keys()
            .find(|k| **k == unit)
            .copied();
        return (key, rest);
    }
    (None, text.to_string())
}

fn grams_from_text(text: &str) -> Option<f64> {
    let (quantity, rest) = parse_quantity(text);
    if let Some(q) = quantity {
        let (unit, _) = parse_unit(rest);
        if let Some(grams_per_unit) = unit.and_then(|u| UNIT_TO_GRAMS.get(u)) {
            return Some(q * grams_per_unit);
        }
    }
    // Compact form like "200g".
    let caps = COMPACT_GRAMS_RE.captures(text)?;
    let quantity = parse_number(caps.get(1)?.as_str())?;
    let grams_per_unit = UNIT_TO_GRAMS.get(caps.get(2)?.as_str().to_lowercase().as_str())?;
    Some(quantity * grams_per_unit)
}

fn strip_parens(text: &str) -> String {
    PAREN_RE.replace_all(text, "").to_string()
}

fn normalize(text: &str) -> String {
    crate::utils::normalize_name(text)
}
