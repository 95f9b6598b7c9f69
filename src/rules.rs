//! Static business rules: diet vocabulary, exclusion synonyms, and
//! incompatible-diet pairs. These tables are pure data consumed by the
//! parser, resolver and retriever; no I/O happens here.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Forbidden ingredients and tags for a named diet.
#[derive(Debug, Clone)]
pub struct DietRule {
    pub forbidden_ingredients: &'static [&'static str],
    pub forbidden_tags: &'static [&'static str],
    /// Ingredient classes this diet depends on. Excluding one of these
    /// makes the diet unsatisfiable and is rejected by the resolver.
    pub staple_classes: &'static [&'static str],
}

/// Diet vocabulary keyed by the name users type in queries.
pub static DIET_DEFINITIONS: Lazy<HashMap<&'static str, DietRule>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        "vegan",
        DietRule {
            forbidden_ingredients: &[
                "meat", "chicken", "fish", "egg", "dairy", "milk", "cheese", "butter", "honey",
                "seafood", "beef", "pork",
            ],
            forbidden_tags: &["non-vegan"],
            staple_classes: &["vegetables", "vegetable", "legumes", "grains"],
        },
    );
    m.insert(
        "vegetarian",
        DietRule {
            forbidden_ingredients: &["meat", "chicken", "fish", "seafood", "beef", "pork"],
            forbidden_tags: &["non-vegetarian"],
            staple_classes: &["vegetables", "vegetable"],
        },
    );
    m.insert(
        "pescatarian",
        DietRule {
            forbidden_ingredients: &["meat", "chicken", "beef", "pork"],
            forbidden_tags: &["meat", "chicken"],
            staple_classes: &["fish", "seafood"],
        },
    );
    m.insert(
        "dairy-free",
        DietRule {
            forbidden_ingredients: &[
                "milk", "cheese", "butter", "cream", "yogurt", "whey", "casein", "ghee",
            ],
            forbidden_tags: &["dairy"],
            staple_classes: &[],
        },
    );
    m.insert(
        "nut-free",
        DietRule {
            forbidden_ingredients: &[
                "nut", "almond", "peanut", "cashew", "walnut", "pecan", "pistachio", "hazelnut",
            ],
            forbidden_tags: &["nuts"],
            staple_classes: &[],
        },
    );
    m.insert(
        "soy-free",
        DietRule {
            forbidden_ingredients: &[
                "soy", "tofu", "tempeh", "edamame", "soy sauce", "tamari", "miso",
            ],
            forbidden_tags: &["soy"],
            staple_classes: &[],
        },
    );
    m.insert(
        "gluten-free",
        DietRule {
            forbidden_ingredients: &[
                "wheat", "flour", "barley", "rye", "bread", "pasta", "soy sauce",
            ],
            forbidden_tags: &["gluten"],
            staple_classes: &[],
        },
    );
    m.insert(
        "low-carb",
        DietRule {
            forbidden_ingredients: &[
                "sugar", "bread", "pasta", "rice", "potato", "corn", "flour", "tortilla",
            ],
            forbidden_tags: &["high-carb"],
            staple_classes: &[],
        },
    );
    m.insert(
        "keto",
        DietRule {
            forbidden_ingredients: &["sugar", "bread", "pasta", "rice", "potato", "corn", "flour"],
            forbidden_tags: &["high-carb"],
            staple_classes: &["meat", "fat", "dairy"],
        },
    );
    m.insert(
        "paleo",
        DietRule {
            forbidden_ingredients: &[
                "sugar", "dairy", "cheese", "milk", "butter", "bean", "legume", "grain", "rice",
                "bread", "pasta",
            ],
            forbidden_tags: &["processed"],
            staple_classes: &["meat"],
        },
    );
    m.insert(
        "halal",
        DietRule {
            forbidden_ingredients: &[
                "pork", "bacon", "ham", "lard", "gelatin", "wine", "beer", "rum", "vodka",
                "whiskey", "whisky", "brandy",
            ],
            forbidden_tags: &["pork", "alcohol"],
            staple_classes: &[],
        },
    );
    m.insert(
        "kosher",
        DietRule {
            forbidden_ingredients: &[
                "pork", "bacon", "ham", "lard", "gelatin", "shrimp", "crab", "lobster", "clam",
                "mussel", "oyster", "squid", "octopus",
            ],
            forbidden_tags: &["shellfish", "pork"],
            staple_classes: &[],
        },
    );
    m.insert(
        "mediterranean",
        DietRule {
            forbidden_ingredients: &[
                "bacon", "sausage", "pepperoni", "salami", "hot dog", "lard", "shortening",
            ],
            forbidden_tags: &["processed"],
            staple_classes: &[],
        },
    );
    m.insert(
        "dash",
        DietRule {
            forbidden_ingredients: &[
                "bacon", "ham", "sausage", "hot dog", "pepperoni", "salami", "processed", "deli",
                "pickles", "soy sauce",
            ],
            forbidden_tags: &["processed"],
            staple_classes: &[],
        },
    );
    m
});

/// Maps a user exclusion key to the concrete ingredient terms it covers.
pub static INGREDIENT_SYNONYMS: Lazy<HashMap<&'static str, &'static [&'static str]>> =
    Lazy::new(|| {
        let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        m.insert(
            "dairy",
            &["milk", "cheese", "butter", "cream", "yogurt", "whey", "casein"],
        );
        m.insert("nut", &["nut", "almond", "peanut", "cashew", "walnut", "pecan"]);
        m.insert("egg", &["egg", "eggs", "albumin"]);
        m.insert("soy", &["soy", "tofu", "tempeh", "edamame"]);
        m.insert(
            "shellfish",
            &["shrimp", "crab", "lobster", "clam", "mussel", "oyster"],
        );
        m.insert("fish", &["fish", "salmon", "tuna", "cod", "tilapia"]);
        m.insert(
            "meat",
            &["meat", "beef", "pork", "chicken", "lamb", "steak", "bacon", "ham"],
        );
        m.insert("gluten", &["wheat", "barley", "rye", "malt", "flour", "bread"]);
        m
    });

/// Diet pairs that cannot be satisfied simultaneously.
pub static INCOMPATIBLE_DIETS: &[(&str, &str)] = &[
    ("vegan", "pescatarian"),
    ("vegan", "keto"),
    ("vegetarian", "paleo"),
];

/// Expand an exclusion key into all ingredient terms it should match.
/// Plural keys ("nuts") fall back to their singular synonym entry.
pub fn exclusion_terms(key: &str) -> Vec<&str> {
    let mut terms = vec![key];
    let synonyms = INGREDIENT_SYNONYMS.get(key).or_else(|| {
        key.strip_suffix('s')
            .and_then(|singular| INGREDIENT_SYNONYMS.get(singular))
    });
    if let Some(extra) = synonyms {
        terms.extend(extra.iter().copied());
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diet_vocabulary_contains_core_diets() {
        for diet in ["vegan", "vegetarian", "keto", "gluten-free"] {
            assert!(DIET_DEFINITIONS.contains_key(diet), "missing {diet}");
        }
    }

    #[test]
    fn test_exclusion_terms_expand_synonyms() {
        let terms = exclusion_terms("dairy");
        assert!(terms.contains(&"dairy"));
        assert!(terms.contains(&"cheese"));
        assert!(terms.contains(&"whey"));
    }

    #[test]
    fn test_exclusion_terms_handle_plural_keys() {
        let terms = exclusion_terms("nuts");
        assert!(terms.contains(&"nuts"));
        assert!(terms.contains(&"peanut"));
    }

    #[test]
    fn test_exclusion_terms_pass_through_unknown_keys() {
        assert_eq!(exclusion_terms("cilantro"), vec!["cilantro"]);
    }
}
