//! Configuration loaded from platewise.toml and environment variables.
//! All core knobs are injected from here; core logic never hard-codes them.

use serde::{Deserialize, Serialize};

/// Main configuration structure loaded from platewise.toml and environment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub plan: PlanConfig,
    pub retrieval: RetrievalConfig,
    pub scoring: ScoringConfig,
    pub rerank: RerankConfig,
    pub parser: ParserConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Plan-shape bounds and defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlanConfig {
    pub min_days: u32,
    pub max_days: u32,
    pub default_days: u32,
}

/// Retrieval and candidate-pool behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Capped fetch size per recipe source.
    pub per_source_fetch_cap: usize,
    /// Proportional calorie tolerance band around the per-meal target.
    pub calorie_tolerance_ratio: f64,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    /// Jaro-Winkler threshold above which two normalized recipe names are
    /// treated as the same recipe across sources.
    pub dedupe_similarity: f64,
}

/// Scorer weights context
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringConfig {
    /// How many recent selections the diversity penalty looks back over.
    pub lookback_window: usize,
}

/// Rerank granularity: how often the shortlist goes out to the
/// completion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RerankMode {
    PerMeal,
    PerDay,
    PerPlan,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RerankConfig {
    pub enable: bool,
    pub top_k: usize,
    pub mode: RerankMode,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParserConfig {
    /// Confidence below which the parser escalates to the completion
    /// service (when one is configured).
    pub ambiguity_threshold: f32,
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub openai_api_key: Option<String>,
    pub usda_api_key: Option<String>,
    pub completion_endpoint: String,
    pub completion_model: String,
    pub completion_timeout_ms: u64,
    pub nutrition_endpoint: String,
    pub nutrition_timeout_ms: u64,
    pub source_timeout_ms: u64,
    pub local_recipes_path: Option<String>,
    pub mealdb_base_url: String,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            usda_api_key: None,
            completion_endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            completion_model: "gpt-4o-mini".to_string(),
            completion_timeout_ms: 15_000,
            nutrition_endpoint: "https://api.nal.usda.gov/fdc/v1/foods/search".to_string(),
            nutrition_timeout_ms: 10_000,
            source_timeout_ms: 10_000,
            local_recipes_path: None,
            mealdb_base_url: "https://www.themealdb.com/api/json/v1/1".to_string(),
            log_level: "platewise=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        let defaults = Self::default();
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            usda_api_key: std::env::var("USDA_API_KEY").ok(),
            completion_endpoint: std::env::var("PW_COMPLETION_ENDPOINT")
                .unwrap_or(defaults.completion_endpoint),
            completion_model: std::env::var("PW_COMPLETION_MODEL")
                .unwrap_or(defaults.completion_model),
            completion_timeout_ms: std::env::var("PW_COMPLETION_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.completion_timeout_ms),
            nutrition_endpoint: std::env::var("PW_NUTRITION_ENDPOINT")
                .unwrap_or(defaults.nutrition_endpoint),
            nutrition_timeout_ms: std::env::var("PW_NUTRITION_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.nutrition_timeout_ms),
            source_timeout_ms: std::env::var("PW_SOURCE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.source_timeout_ms),
            local_recipes_path: std::env::var("PW_LOCAL_RECIPES").ok(),
            mealdb_base_url: std::env::var("PW_MEALDB_BASE_URL")
                .unwrap_or(defaults.mealdb_base_url),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses PLATEWISE_CONFIG or defaults to "platewise.toml".
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let config_path =
            std::env::var("PLATEWISE_CONFIG").unwrap_or_else(|_| "platewise.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Validate and clamp suspicious values rather than failing hard.
    pub fn validate(&mut self) -> anyhow::Result<()> {
        if self.plan.min_days < 1 {
            tracing::warn!("plan.min_days {} below 1, clamping", self.plan.min_days);
            self.plan.min_days = 1;
        }
        if self.plan.max_days < self.plan.min_days {
            anyhow::bail!(
                "plan.max_days {} below plan.min_days {}",
                self.plan.max_days,
                self.plan.min_days
            );
        }
        if !(self.plan.min_days..=self.plan.max_days).contains(&self.plan.default_days) {
            tracing::warn!(
                "plan.default_days {} outside [{}, {}], clamping",
                self.plan.default_days,
                self.plan.min_days,
                self.plan.max_days
            );
            self.plan.default_days = self.plan.default_days.clamp(self.plan.min_days, self.plan.max_days);
        }
        if !(0.0..=1.0).contains(&self.retrieval.calorie_tolerance_ratio) {
            anyhow::bail!("retrieval.calorie_tolerance_ratio must be between 0.0 and 1.0");
        }
        if !(0.0..=1.0).contains(&self.retrieval.dedupe_similarity) {
            anyhow::bail!("retrieval.dedupe_similarity must be between 0.0 and 1.0");
        }
        if self.rerank.top_k == 0 {
            tracing::warn!("rerank.top_k 0 invalid, clamping to 1");
            self.rerank.top_k = 1;
        }
        if self.rerank.top_k > 10 {
            tracing::warn!("rerank.top_k {} exceeds max 10, clamping", self.rerank.top_k);
            self.rerank.top_k = 10;
        }
        if !(0.0..=1.0).contains(&self.parser.ambiguity_threshold) {
            anyhow::bail!("parser.ambiguity_threshold must be between 0.0 and 1.0");
        }
        if self.scoring.lookback_window == 0 {
            tracing::warn!("scoring.lookback_window 0 disables diversity, clamping to 1");
            self.scoring.lookback_window = 1;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plan: PlanConfig {
                min_days: 1,
                max_days: 7,
                default_days: 3,
            },
            retrieval: RetrievalConfig {
                per_source_fetch_cap: 10,
                calorie_tolerance_ratio: crate::retriever::CALORIE_TOLERANCE_RATIO,
                cache_ttl_secs: 300,
                cache_max_entries: 256,
                dedupe_similarity: 0.92,
            },
            scoring: ScoringConfig { lookback_window: 3 },
            rerank: RerankConfig {
                enable: true,
                top_k: 3,
                mode: RerankMode::PerMeal,
                cache_ttl_secs: 86_400,
                cache_max_entries: 512,
            },
            parser: ParserConfig {
                ambiguity_threshold: 0.25,
            },
            runtime: RuntimeConfig::default(),
        }
    }
}
