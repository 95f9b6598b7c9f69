//! Conflict resolver: pure, total validation of a ConstraintSet against
//! static business rules. Runs before any retrieval cost is incurred.
//! Rules are checked in a fixed order and the first failure wins.

use crate::config::PlanConfig;
use crate::error::{PlanError, Result};
use crate::models::ConstraintSet;
use crate::rules::{DIET_DEFINITIONS, INCOMPATIBLE_DIETS};

pub struct ConflictResolver {
    plan: PlanConfig,
}

impl ConflictResolver {
    pub fn new(plan: PlanConfig) -> Self {
        Self { plan }
    }

    /// Validate a constraint set. Passing sets come back unchanged.
    /// Order: duration max, duration min, incompatible diet pair,
    /// exclusion that removes a diet's staple ingredient class.
    pub fn resolve(&self, constraints: ConstraintSet) -> Result<ConstraintSet> {
        if constraints.duration_days > self.plan.max_days {
            return Err(PlanError::Conflict {
                message: format!(
                    "duration exceeds maximum: {} days requested, at most {} supported",
                    constraints.duration_days, self.plan.max_days
                ),
            });
        }
        if constraints.duration_days < self.plan.min_days {
            return Err(PlanError::Conflict {
                message: format!(
                    "duration below minimum: {} days requested, at least {} required",
                    constraints.duration_days, self.plan.min_days
                ),
            });
        }

        for (a, b) in INCOMPATIBLE_DIETS {
            let has_a = constraints.diets.iter().any(|d| d == a);
            let has_b = constraints.diets.iter().any(|d| d == b);
            if has_a && has_b {
                return Err(PlanError::Conflict {
                    message: format!(
                        "conflicting diets requested: {a} and {b} cannot be combined; \
                         choose one or the other"
                    ),
                });
            }
        }

        for diet in &constraints.diets {
            let Some(rule) = DIET_DEFINITIONS.get(diet.as_str()) else {
                continue;
            };
            for exclusion in &constraints.exclusions {
                let exclusion = exclusion.to_lowercase();
                if rule
                    .staple_classes
                    .iter()
                    .any(|staple| *staple == exclusion)
                {
                    return Err(PlanError::Conflict {
                        message: format!(
                            "excluding '{exclusion}' leaves no viable ingredients for a \
                             {diet} diet"
                        ),
                    });
                }
            }
        }

        Ok(constraints)
    }
}
