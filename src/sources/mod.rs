//! Recipe source adapters. Sources form a closed set ([`SourceId`]) behind
//! one capability trait so the retriever's merge logic never changes when a
//! source is added.

pub mod local;
pub mod mealdb;

use crate::config::Config;
use crate::error::Result;
use crate::models::{ConstraintSet, Recipe, SourceId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

pub use local::LocalSource;
pub use mealdb::MealDbSource;

/// Capability every recipe source exposes. Filtering inside `fetch` is
/// best-effort; the retriever re-checks hard constraints on the merged pool.
#[async_trait]
pub trait RecipeFetcher: Send + Sync {
    fn id(&self) -> SourceId;
    async fn fetch(&self, constraints: &ConstraintSet) -> Result<Vec<Recipe>>;
}

/// Build the default source registry from config. Local is always present;
/// remote sources are added when their endpoints are configured.
pub fn default_registry(config: &Config) -> Result<HashMap<SourceId, Arc<dyn RecipeFetcher>>> {
    let cap = config.retrieval.per_source_fetch_cap;
    let mut registry: HashMap<SourceId, Arc<dyn RecipeFetcher>> = HashMap::new();
    registry.insert(
        SourceId::Local,
        Arc::new(LocalSource::from_runtime(&config.runtime, cap)),
    );
    registry.insert(
        SourceId::MealDb,
        Arc::new(MealDbSource::new(&config.runtime, cap)?),
    );
    Ok(registry)
}
