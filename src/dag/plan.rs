// src/dag/plan.rs

//! Week-bucketed study plan derived from a validated curriculum.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PlannerSection;
use crate::dag::graph::StructuralViolation;
use crate::dag::order::topological_order;
use crate::model::{Curriculum, TopicSpec};

pub const PLAN_SCHEMA_VERSION: u32 = 1;
pub const PLAN_VERSION: u32 = 1;

/// One mastery check to hand in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliverable {
    pub node_id: String,
    pub task: String,
    pub pass_criteria: String,
}

/// Review injected at a week boundary, revisiting everything learned so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingReview {
    pub covers_weeks: Vec<u32>,
    pub mastery_checks: Vec<Deliverable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekPlan {
    pub week: u32,
    pub nodes: Vec<String>,
    pub allocated_minutes: f64,
    pub deliverables: Vec<Deliverable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<RollingReview>,
}

/// Derived schedule. Identity is `(curriculum_hash, plan_version)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub schema_version: u32,
    pub topic: String,
    pub curriculum_hash: String,
    pub plan_version: u32,
    pub duration_weeks: u32,
    pub weekly_budget_minutes: f64,
    pub total_estimated_minutes: f64,
    pub topological_order: Vec<String>,
    pub weeks: Vec<WeekPlan>,
}

/// Number of weeks to start with, before packing.
///
/// `ceil(total / budget)` clamped to the configured range; the minimum when
/// there is nothing to schedule, the maximum when there is no usable budget.
pub fn derive_week_count(total_minutes: f64, weekly_budget: f64, bounds: &PlannerSection) -> u32 {
    if weekly_budget <= 0.0 {
        return bounds.max_weeks;
    }
    if total_minutes <= 0.0 {
        return bounds.min_weeks;
    }
    let required = (total_minutes / weekly_budget).ceil() as u32;
    required.clamp(bounds.min_weeks, bounds.max_weeks)
}

/// Pack nodes into weeks, in topological order.
///
/// A node that would overflow the current week moves on to the next one
/// (creating it if needed) as long as the configured maximum allows; in the
/// last allowed week capacity is relaxed so no node is ever dropped.
pub fn build_plan(
    spec: &TopicSpec,
    curriculum: &Curriculum,
    bounds: &PlannerSection,
) -> Result<Plan, StructuralViolation> {
    let ordered = topological_order(curriculum)?;
    let index = curriculum.index();

    let total_minutes = curriculum.total_minutes();
    let weekly_budget = spec.constraints.weekly_budget_minutes();
    let initial_weeks = derive_week_count(total_minutes, weekly_budget, bounds);

    let capacity = if weekly_budget > 0.0 {
        weekly_budget
    } else {
        total_minutes / initial_weeks as f64
    }
    .max(1.0);

    let mut weeks: Vec<WeekPlan> = (1..=initial_weeks).map(empty_week).collect();
    let mut current = 0usize;

    for id in &ordered {
        let Some(node) = index.get(id.as_str()) else { continue };
        let estimate = node.estimate_minutes;

        let week = &weeks[current];
        let overflows = week.allocated_minutes + estimate > capacity;
        if overflows && !week.nodes.is_empty() && current + 1 < bounds.max_weeks as usize {
            current += 1;
            if current == weeks.len() {
                weeks.push(empty_week(current as u32 + 1));
            }
        }

        let week = &mut weeks[current];
        week.nodes.push(node.id.clone());
        week.allocated_minutes += estimate;
        week.deliverables.push(Deliverable {
            node_id: node.id.clone(),
            task: node.mastery_check.task.clone(),
            pass_criteria: node.mastery_check.pass_criteria.clone(),
        });
    }

    for k in 1..weeks.len() {
        let mastery_checks: Vec<Deliverable> = weeks[..k]
            .iter()
            .flat_map(|w| w.deliverables.iter().cloned())
            .collect();
        let covers_weeks = (1..=k as u32).collect();
        weeks[k].review = Some(RollingReview {
            covers_weeks,
            mastery_checks,
        });
    }

    debug!(
        weeks = weeks.len(),
        total_minutes, weekly_budget, "plan built"
    );

    Ok(Plan {
        schema_version: PLAN_SCHEMA_VERSION,
        topic: curriculum.topic.clone(),
        curriculum_hash: curriculum.content_hash(),
        plan_version: PLAN_VERSION,
        duration_weeks: weeks.len() as u32,
        weekly_budget_minutes: weekly_budget,
        total_estimated_minutes: total_minutes,
        topological_order: ordered,
        weeks,
    })
}

fn empty_week(week: u32) -> WeekPlan {
    WeekPlan {
        week,
        nodes: Vec::new(),
        allocated_minutes: 0.0,
        deliverables: Vec::new(),
        review: None,
    }
}
