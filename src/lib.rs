//! platewise: natural-language meal plan requests into validated, scored
//! multi-day plans.
//!
//! The pipeline runs parse -> resolve -> retrieve -> plan -> assemble.
//! External services (completion, nutrition reference, remote recipe
//! sources) sit behind capability traits and every one of them is
//! optional; with nothing configured the whole pipeline runs offline
//! against the embedded recipe dataset.

pub mod assembler;
pub mod cache;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod nutrition;
pub mod parser;
pub mod planner;
pub mod reranker;
pub mod resolver;
pub mod retriever;
pub mod rules;
pub mod scoring;
pub mod service;
pub mod sources;
pub mod utils;

pub use config::Config;
pub use error::{PlanError, Result};
pub use models::{ConstraintSet, MealPlan, Recipe, SourceId};
pub use service::{PlanOptions, PlanService};
