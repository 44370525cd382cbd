//! Margin and vendor-cost layer.
//!
//! Sits on top of the verified unit counts: three configurable hourly rates
//! (internal, vendor, sales), sparse per-task vendor-rate overrides, margin
//! health classification, and a lock snapshot that records margin history
//! without enforcing anything.
//!
//! Quirk carried over from the original model: task hours are derived as
//! `ai_verified_units / internal_rate`, treating the unit count as already
//! hour-equivalent at the internal rate. Internal cost therefore equals the
//! verified unit count. Flagged for product clarification in DESIGN.md;
//! preserved as observed behaviour.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fields::MarginHealth;
use crate::task::Task;

/// Per-project margin configuration and lock state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginData {
    /// Hourly cost of internal delivery.
    #[serde(default = "default_internal_rate")]
    pub internal_rate: f64,
    /// Default hourly vendor rate; overridable per task.
    #[serde(default = "default_vendor_rate")]
    pub vendor_rate: f64,
    /// Hourly rate charged to the customer.
    #[serde(default = "default_sales_rate")]
    pub sales_rate: f64,
    /// Sparse task-id → vendor-rate overrides.
    #[serde(default)]
    pub task_vendor_rates: BTreeMap<u64, f64>,
    /// Margin percentage below which an alert is raised.
    #[serde(default = "default_min_margin_percent")]
    pub min_margin_percent: f64,
    #[serde(default)]
    pub is_locked: bool,
    pub locked_margin_percent: Option<f64>,
    pub locked_margin_amount: Option<f64>,
}

impl Default for MarginData {
    fn default() -> Self {
        MarginData {
            internal_rate: default_internal_rate(),
            vendor_rate: default_vendor_rate(),
            sales_rate: default_sales_rate(),
            task_vendor_rates: BTreeMap::new(),
            min_margin_percent: default_min_margin_percent(),
            is_locked: false,
            locked_margin_percent: None,
            locked_margin_amount: None,
        }
    }
}

fn default_internal_rate() -> f64 {
    100.0
}

fn default_vendor_rate() -> f64 {
    75.0
}

fn default_sales_rate() -> f64 {
    150.0
}

fn default_min_margin_percent() -> f64 {
    20.0
}

impl MarginData {
    /// The vendor rate that applies to a task: its override, or the default.
    pub fn vendor_rate_for(&self, task_id: u64) -> f64 {
        self.task_vendor_rates
            .get(&task_id)
            .copied()
            .unwrap_or(self.vendor_rate)
    }

    /// Snapshot the current project margin. Recording history only: rate
    /// edits remain possible while locked.
    pub fn lock(&mut self, summary: &MarginSummary) {
        self.is_locked = true;
        self.locked_margin_percent = Some(summary.margin_percent);
        self.locked_margin_amount = Some(summary.total_margin);
    }

    /// Clear the lock flag. The snapshot values are kept as history and
    /// prior rates are not restored.
    pub fn unlock(&mut self) {
        self.is_locked = false;
    }
}

/// Margin breakdown for a single task.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TaskMargin {
    pub hours: f64,
    pub internal_cost: f64,
    pub vendor_rate: f64,
    pub vendor_cost: f64,
    pub sales_price: f64,
    pub margin: f64,
    pub margin_percent: f64,
}

/// Project-level margin aggregate.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MarginSummary {
    pub total_hours: f64,
    pub total_internal_cost: f64,
    pub total_vendor_cost: f64,
    pub total_sales_price: f64,
    pub total_margin: f64,
    pub margin_percent: f64,
    pub avg_vendor_rate: f64,
}

/// Compute the margin breakdown for one task.
pub fn task_margin(task: &Task, data: &MarginData) -> TaskMargin {
    let hours = if data.internal_rate > 0.0 {
        task.ai_verified_units / data.internal_rate
    } else {
        0.0
    };
    let internal_cost = hours * data.internal_rate;
    let vendor_rate = data.vendor_rate_for(task.id);
    let vendor_cost = hours * vendor_rate;
    let sales_price = hours * data.sales_rate;
    let margin = sales_price - vendor_cost;
    let margin_percent = if sales_price > 0.0 {
        (margin / sales_price) * 100.0
    } else {
        0.0
    };
    TaskMargin {
        hours,
        internal_cost,
        vendor_rate,
        vendor_cost,
        sales_price,
        margin,
        margin_percent,
    }
}

/// Aggregate margins across all tasks in a project.
pub fn compute_margins(tasks: &[Task], data: &MarginData) -> MarginSummary {
    let mut total_hours = 0.0;
    let mut total_internal_cost = 0.0;
    let mut total_vendor_cost = 0.0;
    let mut total_sales_price = 0.0;
    for task in tasks {
        let m = task_margin(task, data);
        total_hours += m.hours;
        total_internal_cost += m.internal_cost;
        total_vendor_cost += m.vendor_cost;
        total_sales_price += m.sales_price;
    }
    let total_margin = total_sales_price - total_vendor_cost;
    let margin_percent = if total_sales_price > 0.0 {
        (total_margin / total_sales_price) * 100.0
    } else {
        0.0
    };
    let avg_vendor_rate = if total_hours > 0.0 {
        total_vendor_cost / total_hours
    } else {
        data.vendor_rate
    };
    MarginSummary {
        total_hours,
        total_internal_cost,
        total_vendor_cost,
        total_sales_price,
        total_margin,
        margin_percent,
        avg_vendor_rate,
    }
}

/// Classify a margin percentage into a health band. First match wins.
pub fn classify_margin(margin_percent: f64) -> MarginHealth {
    if margin_percent >= 40.0 {
        MarginHealth::Excellent
    } else if margin_percent >= 30.0 {
        MarginHealth::Good
    } else if margin_percent >= 20.0 {
        MarginHealth::Fair
    } else {
        MarginHealth::AtRisk
    }
}

/// Whether a margin falls under the project's configured alert threshold.
/// Independent of [`classify_margin`]; the two signals need not agree.
pub fn below_min_margin(margin_percent: f64, data: &MarginData) -> bool {
    margin_percent < data.min_margin_percent
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn task_with_units(id: u64, units: f64) -> Task {
        let mut t = Task::new(id, format!("task {id}"), 0);
        t.ai_verified_units = units;
        t
    }

    #[test]
    fn worked_margin_example() {
        let data = MarginData {
            internal_rate: 66.0,
            vendor_rate: 40.0,
            sales_rate: 99.0,
            ..MarginData::default()
        };
        let t = task_with_units(1, 66.0);
        let m = task_margin(&t, &data);
        assert!((m.hours - 1.0).abs() < 1e-9);
        assert!((m.internal_cost - 66.0).abs() < 1e-9);
        assert!((m.vendor_cost - 40.0).abs() < 1e-9);
        assert!((m.sales_price - 99.0).abs() < 1e-9);
        assert!((m.margin - 59.0).abs() < 1e-9);
        assert!((m.margin_percent - 59.0 / 99.0 * 100.0).abs() < 1e-9);
        assert_eq!(classify_margin(m.margin_percent), MarginHealth::Excellent);
    }

    #[test]
    fn internal_cost_equals_verified_units() {
        // Algebraic identity of the units-as-hour-equivalents quirk.
        let data = MarginData::default();
        let t = task_with_units(1, 123.4);
        let m = task_margin(&t, &data);
        assert!((m.internal_cost - 123.4).abs() < 1e-9);
    }

    #[test]
    fn task_override_beats_default_vendor_rate() {
        let mut data = MarginData::default();
        data.task_vendor_rates.insert(2, 10.0);
        assert_eq!(data.vendor_rate_for(2), 10.0);
        assert_eq!(data.vendor_rate_for(3), data.vendor_rate);

        let t = task_with_units(2, 100.0);
        let m = task_margin(&t, &data);
        assert!((m.vendor_cost - 10.0).abs() < 1e-9);
    }

    #[test]
    fn classification_thresholds() {
        assert_eq!(classify_margin(40.0), MarginHealth::Excellent);
        assert_eq!(classify_margin(39.9), MarginHealth::Good);
        assert_eq!(classify_margin(30.0), MarginHealth::Good);
        assert_eq!(classify_margin(29.9), MarginHealth::Fair);
        assert_eq!(classify_margin(20.0), MarginHealth::Fair);
        assert_eq!(classify_margin(19.9), MarginHealth::AtRisk);
        assert_eq!(classify_margin(-10.0), MarginHealth::AtRisk);
    }

    #[test]
    fn empty_project_falls_back_to_default_vendor_rate() {
        let data = MarginData::default();
        let summary = compute_margins(&[], &data);
        assert_eq!(summary.total_hours, 0.0);
        assert_eq!(summary.margin_percent, 0.0);
        assert_eq!(summary.avg_vendor_rate, data.vendor_rate);
    }

    #[test]
    fn average_vendor_rate_blends_overrides() {
        let mut data = MarginData {
            internal_rate: 1.0, // 1 unit == 1 hour
            vendor_rate: 40.0,
            ..MarginData::default()
        };
        data.task_vendor_rates.insert(2, 80.0);
        let tasks = vec![task_with_units(1, 1.0), task_with_units(2, 1.0)];
        let summary = compute_margins(&tasks, &data);
        assert!((summary.avg_vendor_rate - 60.0).abs() < 1e-9);
    }

    #[test]
    fn lock_snapshots_without_freezing_rates() {
        let mut data = MarginData::default();
        let tasks = vec![task_with_units(1, 100.0)];
        let summary = compute_margins(&tasks, &data);
        data.lock(&summary);
        assert!(data.is_locked);
        assert_eq!(data.locked_margin_amount, Some(summary.total_margin));
        assert_eq!(data.locked_margin_percent, Some(summary.margin_percent));

        // Rates stay editable while locked.
        data.sales_rate += 25.0;
        let after = compute_margins(&tasks, &data);
        assert!(after.total_margin > summary.total_margin);

        // Unlock keeps the snapshot as history.
        data.unlock();
        assert!(!data.is_locked);
        assert_eq!(data.locked_margin_amount, Some(summary.total_margin));
    }

    proptest! {
        #[test]
        fn margin_percent_monotone_in_sales_rate(
            units in 1.0..500.0f64,
            sales_a in 1.0..200.0f64,
            bump in 0.0..100.0f64,
        ) {
            let base = MarginData {
                internal_rate: 50.0,
                vendor_rate: 40.0,
                sales_rate: sales_a,
                ..MarginData::default()
            };
            let raised = MarginData { sales_rate: sales_a + bump, ..base.clone() };
            let tasks = vec![task_with_units(1, units)];
            let low = compute_margins(&tasks, &base).margin_percent;
            let high = compute_margins(&tasks, &raised).margin_percent;
            prop_assert!(high >= low - 1e-9);
        }
    }
}
