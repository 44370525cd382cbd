//! Budget rollup, burn curve and completion forecast.
//!
//! Planned figures come straight from the verified unit counts (one unit is
//! one planned hour in budget context); actuals come from the logged
//! `actual_hours`. The burn curve is a simulated nine-point interpolation
//! used for presentation, not a schedule derived from time-stamped logs.

use serde::Serialize;

use crate::calc::compute_metrics;
use crate::fields::BudgetHealth;
use crate::settings::Settings;
use crate::task::Task;

/// Planned-versus-actual figures for one task.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TaskBudget {
    pub planned_hours: f64,
    pub planned_cost: f64,
    pub actual_hours: f64,
    pub actual_cost: f64,
    pub variance: f64,
    pub variance_percent: f64,
}

/// Project-level planned-versus-actual rollup.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BudgetRollup {
    pub total_planned_hours: f64,
    pub total_planned_cost: f64,
    pub total_actual_hours: f64,
    pub total_actual_cost: f64,
    pub total_variance: f64,
    pub total_variance_percent: f64,
    pub health: BudgetHealth,
}

/// One week on the simulated burn curve.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BurnPoint {
    pub week: u32,
    pub cumulative_planned: f64,
    pub cumulative_actual: f64,
}

/// Compute planned/actual cost figures for one task.
pub fn task_budget(task: &Task, settings: &Settings) -> TaskBudget {
    let planned_hours = compute_metrics(task, settings).verified_units;
    let planned_cost = planned_hours * settings.hourly_rate;
    let actual_hours = task.actual_hours.unwrap_or(0.0);
    let actual_cost = actual_hours * settings.hourly_rate;
    let variance = actual_cost - planned_cost;
    let variance_percent = if planned_cost > 0.0 {
        (variance / planned_cost) * 100.0
    } else {
        0.0
    };
    TaskBudget {
        planned_hours,
        planned_cost,
        actual_hours,
        actual_cost,
        variance,
        variance_percent,
    }
}

/// Classify a variance percentage. Thresholds at 5 and 15 partition the
/// range with no overlap or gap.
pub fn classify_budget(variance_percent: f64) -> BudgetHealth {
    if variance_percent <= 5.0 {
        BudgetHealth::OnTrack
    } else if variance_percent <= 15.0 {
        BudgetHealth::Warning
    } else {
        BudgetHealth::Critical
    }
}

/// Roll per-task budgets up into project totals.
pub fn compute_budget_rollup(tasks: &[Task], settings: &Settings) -> BudgetRollup {
    let mut total_planned_hours = 0.0;
    let mut total_planned_cost = 0.0;
    let mut total_actual_hours = 0.0;
    let mut total_actual_cost = 0.0;
    for task in tasks {
        let b = task_budget(task, settings);
        total_planned_hours += b.planned_hours;
        total_planned_cost += b.planned_cost;
        total_actual_hours += b.actual_hours;
        total_actual_cost += b.actual_cost;
    }
    let total_variance = total_actual_cost - total_planned_cost;
    let total_variance_percent = if total_planned_cost > 0.0 {
        (total_variance / total_planned_cost) * 100.0
    } else {
        0.0
    };
    BudgetRollup {
        total_planned_hours,
        total_planned_cost,
        total_actual_hours,
        total_actual_cost,
        total_variance,
        total_variance_percent,
        health: classify_budget(total_variance_percent),
    }
}

/// Simulated nine-point burn curve over weeks 0–8.
///
/// Planned spend accrues linearly. Actual spend follows a two-piece linear
/// model: an 80%-speed ramp for the first four weeks, full speed after,
/// capped at the total actual cost.
pub fn burn_curve(rollup: &BudgetRollup) -> Vec<BurnPoint> {
    let weekly_actual = rollup.total_actual_cost / 8.0;
    (0..=8u32)
        .map(|week| {
            let cumulative_planned = rollup.total_planned_cost * week as f64 / 8.0;
            let w = week as f64;
            let raw_actual = if week <= 4 {
                w * weekly_actual * 0.8
            } else {
                4.0 * weekly_actual * 0.8 + (w - 4.0) * weekly_actual
            };
            BurnPoint {
                week,
                cumulative_planned,
                cumulative_actual: raw_actual.min(rollup.total_actual_cost),
            }
        })
        .collect()
}

/// Forecast spend at completion from the current burn rate.
///
/// `actual / (progress/100)` extrapolates today's spend to 100% progress;
/// with no progress recorded the planned total is the best available answer.
pub fn forecast_at_completion(tasks: &[Task], rollup: &BudgetRollup) -> f64 {
    if tasks.is_empty() {
        return rollup.total_planned_cost;
    }
    let avg_progress = tasks.iter().map(|t| t.progress).sum::<f64>() / tasks.len() as f64;
    if avg_progress == 0.0 {
        rollup.total_planned_cost
    } else {
        rollup.total_actual_cost / (avg_progress / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn task(units: f64, actual_hours: Option<f64>, progress: f64) -> Task {
        let mut t = Task::new(1, "t".into(), 0);
        // Default factors give a positive PCI, so any unit count round-trips.
        t.ai_verified_units = units;
        t.actual_hours = actual_hours;
        t.progress = progress;
        t
    }

    #[test]
    fn per_task_variance() {
        let settings = Settings::default(); // 100/hour
        let b = task_budget(&task(10.0, Some(12.0), 0.0), &settings);
        assert!((b.planned_cost - 1000.0).abs() < 1e-6);
        assert!((b.actual_cost - 1200.0).abs() < 1e-6);
        assert!((b.variance - 200.0).abs() < 1e-6);
        assert!((b.variance_percent - 20.0).abs() < 1e-6);
    }

    #[test]
    fn zero_planned_cost_guards_variance_percent() {
        let settings = Settings::default();
        let b = task_budget(&task(0.0, Some(5.0), 0.0), &settings);
        assert_eq!(b.variance_percent, 0.0);
    }

    #[test]
    fn health_thresholds_partition_cleanly() {
        assert_eq!(classify_budget(-50.0), BudgetHealth::OnTrack);
        assert_eq!(classify_budget(5.0), BudgetHealth::OnTrack);
        assert_eq!(classify_budget(5.000001), BudgetHealth::Warning);
        assert_eq!(classify_budget(15.0), BudgetHealth::Warning);
        assert_eq!(classify_budget(15.000001), BudgetHealth::Critical);
    }

    #[test]
    fn rollup_sums_tasks() {
        let settings = Settings::default();
        let tasks = vec![
            task(10.0, Some(8.0), 50.0),
            task(20.0, Some(30.0), 50.0),
        ];
        let r = compute_budget_rollup(&tasks, &settings);
        assert!((r.total_planned_hours - 30.0).abs() < 1e-6);
        assert!((r.total_planned_cost - 3000.0).abs() < 1e-6);
        assert!((r.total_actual_cost - 3800.0).abs() < 1e-6);
        assert!((r.total_variance - 800.0).abs() < 1e-6);
        assert_eq!(r.health, BudgetHealth::Critical);
    }

    #[test]
    fn burn_curve_shape() {
        let settings = Settings::default();
        let tasks = vec![task(80.0, Some(80.0), 50.0)];
        let r = compute_budget_rollup(&tasks, &settings);
        let curve = burn_curve(&r);
        assert_eq!(curve.len(), 9);
        assert_eq!(curve[0].cumulative_planned, 0.0);
        assert_eq!(curve[0].cumulative_actual, 0.0);
        assert!((curve[8].cumulative_planned - r.total_planned_cost).abs() < 1e-6);
        // Ramp weeks run at 80% of the nominal weekly rate.
        let weekly = r.total_actual_cost / 8.0;
        assert!((curve[1].cumulative_actual - weekly * 0.8).abs() < 1e-6);
        assert!((curve[5].cumulative_actual - (4.0 * weekly * 0.8 + weekly)).abs() < 1e-6);
        // Monotone non-decreasing and capped.
        for pair in curve.windows(2) {
            assert!(pair[1].cumulative_actual >= pair[0].cumulative_actual);
        }
        assert!(curve[8].cumulative_actual <= r.total_actual_cost + 1e-9);
    }

    #[test]
    fn forecast_defaults_to_planned_without_progress() {
        let settings = Settings::default();
        let tasks = vec![task(10.0, Some(5.0), 0.0)];
        let r = compute_budget_rollup(&tasks, &settings);
        assert!((forecast_at_completion(&tasks, &r) - r.total_planned_cost).abs() < 1e-9);
    }

    #[test]
    fn forecast_extrapolates_burn_rate() {
        let settings = Settings::default();
        let tasks = vec![task(10.0, Some(5.0), 50.0)];
        let r = compute_budget_rollup(&tasks, &settings);
        // 500 spent at 50% progress forecasts 1000 at completion.
        assert!((forecast_at_completion(&tasks, &r) - 1000.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn health_is_total_and_ordered(v in -200.0..200.0f64) {
            // Every variance lands in exactly one band.
            let h = classify_budget(v);
            match h {
                BudgetHealth::OnTrack => prop_assert!(v <= 5.0),
                BudgetHealth::Warning => prop_assert!(v > 5.0 && v <= 15.0),
                BudgetHealth::Critical => prop_assert!(v > 15.0),
            }
        }
    }
}
