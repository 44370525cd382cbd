//! Enumerations and field types for estimation tasks.
//!
//! This module defines the structured data types used to categorise tasks
//! and classify calculation results: task status, audit workflow states,
//! reverse-calculation targets, and the margin/budget health bands.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task delivery status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    NotStarted,
    InProgress,
    Completed,
    OnHold,
}

/// Review state in the estimate audit workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AuditStatus {
    Pending,
    Approved,
    Rejected,
}

/// Which observable metric a reverse calculation aims at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TargetMetric {
    /// Target the complexity index directly.
    Pci,
    /// Target the verified unit count.
    VerifiedUnits,
    /// Target the verified dollar cost.
    Cost,
}

/// Margin health bands, best to worst.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MarginHealth {
    Excellent,
    Good,
    Fair,
    AtRisk,
}

/// Budget health bands derived from cost variance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetHealth {
    OnTrack,
    Warning,
    Critical,
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    Pci,
    Aas,
    Cost,
    Id,
}
