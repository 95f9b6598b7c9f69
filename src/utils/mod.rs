//! Utility functions shared across the codebase

pub mod ingredient;
pub mod preptime;

pub use ingredient::parse_ingredient;
pub use preptime::estimate_prep_time;

/// Lowercase and strip everything but letters, digits, spaces and hyphens.
pub fn normalize_name(text: &str) -> String {
    let lowered = text.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == ' ' {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
