//! Greedy slot-by-slot planner. Each slot moves through an explicit state
//! machine (scoring, optional reranking, selected) so the fallback path on
//! rerank failure is the same deterministic choice the scorer already made.

use crate::config::{RerankConfig, RerankMode};
use crate::models::{ConstraintSet, MealSlot, MealType, Recipe, ScoredCandidate};
use crate::reranker::Reranker;
use crate::scoring::Scorer;
use std::collections::HashSet;

/// One filled slot.
#[derive(Debug, Clone)]
pub struct Selection {
    pub slot: MealSlot,
    pub candidate: ScoredCandidate,
}

/// Planner output before assembly.
#[derive(Debug, Clone)]
pub struct PlanDraft {
    pub selections: Vec<Selection>,
    /// Slots filled by re-using an already-selected recipe because the
    /// unused pool ran out.
    pub repeated_selections: u32,
}

enum SlotState {
    Scoring,
    Reranking { shortlist: Vec<ScoredCandidate> },
    Selected { choice: ScoredCandidate },
}

pub struct Planner<'a> {
    scorer: &'a Scorer,
    reranker: Option<&'a Reranker>,
    rerank: &'a RerankConfig,
}

impl<'a> Planner<'a> {
    pub fn new(
        scorer: &'a Scorer,
        reranker: Option<&'a Reranker>,
        rerank: &'a RerankConfig,
    ) -> Self {
        Self {
            scorer,
            reranker,
            rerank,
        }
    }

    /// Fill every slot of the plan grid greedily, in day order then slot
    /// template order.
    pub async fn plan(&self, pool: &[Recipe], constraints: &ConstraintSet) -> PlanDraft {
        let template = MealType::template(constraints.meals_per_day);
        let mut selections: Vec<Selection> = Vec::new();
        let mut history: Vec<Recipe> = Vec::new();
        let mut used_ids: HashSet<String> = HashSet::new();
        let mut repeated_selections = 0u32;

        for day in 1..=constraints.duration_days {
            for meal_type in &template {
                let slot = MealSlot {
                    day,
                    meal_type: *meal_type,
                };
                let Some((choice, repeated)) = self
                    .fill_slot(slot, pool, &history, &used_ids, constraints)
                    .await
                else {
                    tracing::warn!(day, meal = %meal_type, "no candidates at all for slot, leaving it unfilled");
                    continue;
                };
                if repeated {
                    repeated_selections += 1;
                }
                used_ids.insert(choice.recipe.id.clone());
                history.push(choice.recipe.clone());
                selections.push(Selection {
                    slot,
                    candidate: choice,
                });
            }
        }

        PlanDraft {
            selections,
            repeated_selections,
        }
    }

    /// Drive one slot through its states. Returns the selection and whether
    /// it re-used an already-selected recipe.
    async fn fill_slot(
        &self,
        slot: MealSlot,
        pool: &[Recipe],
        history: &[Recipe],
        used_ids: &HashSet<String>,
        constraints: &ConstraintSet,
    ) -> Option<(ScoredCandidate, bool)> {
        let mut repeated = false;
        let mut state = SlotState::Scoring;
        loop {
            state = match state {
                SlotState::Scoring => {
                    let unused: Vec<Recipe> = pool
                        .iter()
                        .filter(|r| !used_ids.contains(&r.id))
                        .cloned()
                        .collect();
                    let eligible = if unused.is_empty() {
                        if pool.is_empty() {
                            return None;
                        }
                        // Pool exhausted; repeat rather than fail the plan.
                        repeated = true;
                        tracing::warn!(
                            day = slot.day,
                            meal = %slot.meal_type,
                            "candidate pool exhausted, repeating an earlier selection"
                        );
                        pool.to_vec()
                    } else {
                        unused
                    };
                    let ranked = self.scorer.rank(&eligible, slot, history, constraints);
                    let shortlist: Vec<ScoredCandidate> =
                        ranked.into_iter().take(self.rerank.top_k.max(1)).collect();
                    if self.should_rerank(slot) && shortlist.len() > 1 {
                        SlotState::Reranking { shortlist }
                    } else {
                        SlotState::Selected {
                            choice: shortlist.into_iter().next()?,
                        }
                    }
                }
                SlotState::Reranking { shortlist } => {
                    let choice = self
                        .apply_rerank(slot, shortlist, history, constraints)
                        .await?;
                    SlotState::Selected { choice }
                }
                SlotState::Selected { choice } => return Some((choice, repeated)),
            };
        }
    }

    fn should_rerank(&self, slot: MealSlot) -> bool {
        if !self.rerank.enable || self.reranker.is_none() {
            return false;
        }
        match self.rerank.mode {
            RerankMode::PerMeal => true,
            // One call per day, on the dinner slot.
            RerankMode::PerDay => slot.meal_type == MealType::Dinner,
            // A single call for the whole plan.
            RerankMode::PerPlan => slot.day == 1 && slot.meal_type == MealType::Dinner,
        }
    }

    /// Rerank the shortlist; any failure keeps the top-scored candidate.
    /// Callers guarantee the shortlist is non-empty.
    async fn apply_rerank(
        &self,
        slot: MealSlot,
        shortlist: Vec<ScoredCandidate>,
        history: &[Recipe],
        constraints: &ConstraintSet,
    ) -> Option<ScoredCandidate> {
        let fallback = shortlist.first().cloned()?;
        let Some(reranker) = self.reranker else {
            return Some(fallback);
        };
        let recent_names: Vec<String> = history.iter().map(|r| r.name.clone()).collect();
        match reranker
            .rerank(slot, &shortlist, constraints, &recent_names)
            .await
        {
            Ok(choice) => {
                let picked = shortlist
                    .iter()
                    .find(|c| c.recipe.id == choice.recipe_id)
                    .cloned();
                Some(match picked {
                    Some(mut candidate) => {
                        if !choice.reasons.is_empty() {
                            candidate.rationale = Some(choice.reasons.join("; "));
                        }
                        candidate
                    }
                    // Validated against the shortlist already.
                    None => fallback,
                })
            }
            Err(err) => {
                tracing::warn!(
                    day = slot.day,
                    meal = %slot.meal_type,
                    error = %err,
                    "rerank failed, keeping top-scored candidate"
                );
                Some(fallback)
            }
        }
    }
}
