//! Top-level plan service: owns the configuration, the source registry and
//! the optional external ports, and drives one request through parse,
//! conflict resolution, retrieval, planning and assembly.

use crate::assembler::assemble_from_tomorrow;
use crate::clients::{CompletionPort, OpenAiClient};
use crate::config::Config;
use crate::error::{PlanError, Result};
use crate::models::{ConstraintSet, MealPlan, SourceId};
use crate::nutrition::{NutritionLookup, UsdaClient};
use crate::parser::ConstraintParser;
use crate::planner::Planner;
use crate::reranker::Reranker;
use crate::resolver::ConflictResolver;
use crate::retriever::Retriever;
use crate::scoring::Scorer;
use crate::sources::{RecipeFetcher, default_registry};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-request options layered over the service configuration.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Sources to draw candidates from. Empty means all registered sources.
    pub sources: Vec<SourceId>,
    /// Force-disable reranking for this request.
    pub skip_rerank: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            skip_rerank: false,
        }
    }
}

pub struct PlanService {
    config: Config,
    parser: ConstraintParser,
    resolver: ConflictResolver,
    retriever: Retriever,
    scorer: Scorer,
    reranker: Option<Reranker>,
    registered_sources: Vec<SourceId>,
}

impl PlanService {
    /// Build the service with the default source registry and whatever
    /// external ports the runtime config enables. Fully offline when no
    /// API keys are set; fails only when an HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let completion: Option<Arc<dyn CompletionPort>> =
            OpenAiClient::from_runtime(&config.runtime)?
                .map(|c| Arc::new(c) as Arc<dyn CompletionPort>);
        let nutrition: Option<Arc<dyn NutritionLookup>> =
            UsdaClient::from_runtime(&config.runtime)?
                .map(|c| Arc::new(c) as Arc<dyn NutritionLookup>);
        let sources = default_registry(&config)?;
        Ok(Self::with_ports(config, sources, completion, nutrition))
    }

    /// Fully-injected constructor. Tests use this with stub ports and
    /// in-memory sources.
    pub fn with_ports(
        config: Config,
        sources: HashMap<SourceId, Arc<dyn RecipeFetcher>>,
        completion: Option<Arc<dyn CompletionPort>>,
        nutrition: Option<Arc<dyn NutritionLookup>>,
    ) -> Self {
        let mut registered_sources: Vec<SourceId> = sources.keys().copied().collect();
        registered_sources.sort_unstable();

        let parser = ConstraintParser::new(
            config.plan.clone(),
            config.parser.clone(),
            completion.clone(),
        );
        let resolver = ConflictResolver::new(config.plan.clone());
        let retriever = Retriever::new(config.retrieval.clone(), sources, nutrition);
        let scorer = Scorer::new(config.scoring.clone());
        let reranker = match (&completion, config.rerank.enable) {
            (Some(port), true) => Some(Reranker::new(&config.rerank, Arc::clone(port))),
            _ => None,
        };

        Self {
            config,
            parser,
            resolver,
            retriever,
            scorer,
            reranker,
            registered_sources,
        }
    }

    /// Run the full pipeline for one natural-language request.
    pub async fn generate_plan(&self, query: &str, options: &PlanOptions) -> Result<MealPlan> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PlanError::Validation {
                message: "query must not be empty".to_string(),
            });
        }

        let constraints = self.parser.parse(query).await;
        tracing::info!(
            duration_days = constraints.duration_days,
            diets = ?constraints.diets,
            exclusions = ?constraints.exclusions,
            confidence = constraints.confidence,
            ambiguous = constraints.ambiguity_flag,
            "parsed constraints"
        );
        let constraints = self.resolver.resolve(constraints)?;

        let plan = self.plan_from_constraints(&constraints, options).await?;
        tracing::info!(
            plan_id = %plan.id,
            total_meals = plan.summary.total_meals,
            repeated = plan.summary.repeated_selections,
            "plan generated"
        );
        Ok(plan)
    }

    /// Plan directly from an already-validated constraint set.
    pub async fn plan_from_constraints(
        &self,
        constraints: &ConstraintSet,
        options: &PlanOptions,
    ) -> Result<MealPlan> {
        let sources = if options.sources.is_empty() {
            self.registered_sources.clone()
        } else {
            options.sources.clone()
        };

        let pool = self.retriever.retrieve(constraints, &sources).await?;
        if pool.is_empty() {
            return Err(PlanError::Validation {
                message: "no recipes satisfy the requested constraints; \
                          relax an exclusion or diet and retry"
                    .to_string(),
            });
        }

        let reranker = if options.skip_rerank {
            None
        } else {
            self.reranker.as_ref()
        };
        let planner = Planner::new(&self.scorer, reranker, &self.config.rerank);
        let draft = planner.plan(&pool, constraints).await;

        Ok(assemble_from_tomorrow(&draft, constraints))
    }
}
