//! Task data structure and the eleven-factor complexity model.
//!
//! This module defines the core `Task` struct that represents a single
//! estimated work item, together with its weighting factors, scheduling
//! fields, audit workflow record, and decorative element breakdown.
//!
//! Derived values (complexity index, accuracy score, verified units/cost)
//! are deliberately never stored on the task. They are recomputed from the
//! stored factors and settings on every read so a factor edit can never
//! leave a stale score behind.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::{AuditStatus, Status};

/// The eleven named weighting factors of the complexity model.
///
/// Values are plain reals with no enforced bounds; the CLI suggests the
/// usual 1.0–2.0 working range but out-of-range values are accepted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Factors {
    /// Integration/system reach.
    pub isr: f64,
    /// Complexity factor.
    pub cf: f64,
    /// User-experience intensity.
    pub uxi: f64,
    /// Requirements clarity factor.
    pub rcf: f64,
    /// Architecture/engineering effort premium.
    pub aep: f64,
    /// Leverage discount (subtracts from the requirements term).
    pub l: f64,
    /// Multi-layer work weight.
    pub mlw: f64,
    /// Cross-group coordination weight.
    pub cgw: f64,
    /// Rework factor.
    pub rf: f64,
    /// Scale factor.
    pub s: f64,
    /// Governance/legal/regulatory intensity.
    pub glri: f64,
}

impl Default for Factors {
    fn default() -> Self {
        Factors {
            isr: 1.0,
            cf: 1.0,
            uxi: 1.0,
            rcf: 1.0,
            aep: 1.0,
            l: 1.0,
            mlw: 1.0,
            cgw: 1.0,
            rf: 1.0,
            s: 1.0,
            glri: 1.0,
        }
    }
}

/// A reviewer's verdict on a task estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub status: AuditStatus,
    /// Who approved or rejected the estimate.
    pub reviewer: String,
    pub at_utc: i64,
    /// Approval notes or rejection reason.
    pub notes: Option<String>,
}

/// A decorative sub-item on a task (scope breakdown for proposals).
///
/// Elements carry no weight in the arithmetic; they exist so exported
/// proposals can list what an estimate covers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskElement {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// A single estimated work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    /// Display label, e.g. "TASK-003".
    pub reference: Option<String>,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub factors: Factors,
    /// Externally supplied or AI-estimated "ground truth" unit count used
    /// to audit the modelled complexity index.
    #[serde(default)]
    pub ai_verified_units: f64,
    pub actual_hours: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    /// Delivery progress, 0–100.
    #[serde(default)]
    pub progress: f64,
    pub status: Status,
    pub audit: Option<AuditRecord>,
    #[serde(default)]
    pub elements: Vec<TaskElement>,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

impl Task {
    /// Create a task with default factors and bookkeeping timestamps.
    pub fn new(id: u64, title: String, now_utc: i64) -> Self {
        Task {
            id,
            reference: None,
            title,
            description: None,
            factors: Factors::default(),
            ai_verified_units: 0.0,
            actual_hours: None,
            start_date: None,
            completion_date: None,
            progress: 0.0,
            status: Status::NotStarted,
            audit: None,
            elements: Vec::new(),
            created_at_utc: now_utc,
            updated_at_utc: now_utc,
        }
    }

    /// Next available element id within this task.
    pub fn next_element_id(&self) -> u64 {
        self.elements.iter().map(|e| e.id).max().unwrap_or(0) + 1
    }
}
