//! Database operations and display helpers for estimation projects.
//!
//! This module provides the `Database` struct that stores a project's tasks
//! together with its settings and margin configuration, plus formatting
//! utilities shared by the table and detail views.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calc::{compute_metrics, is_low_accuracy};
use crate::fields::{AuditStatus, BudgetHealth, MarginHealth, Status};
use crate::margin::MarginData;
use crate::settings::Settings;
use crate::task::Task;

/// In-memory database for one estimation project.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub settings: Settings,
    /// Created on first use of the margin commands.
    #[serde(default)]
    pub margin: Option<MarginData>,
}

impl Database {
    /// Load database from JSON file, creating a new empty database if file doesn't exist.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Database::default();
        }
        let mut buf = String::new();
        match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(db) => db,
                Err(e) => {
                    eprintln!("Error parsing DB, starting fresh: {e}");
                    Database::default()
                }
            },
            Err(e) => {
                eprintln!("Error reading DB, starting fresh: {e}");
                Database::default()
            }
        }
    }

    /// Save database to JSON file using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        // Atomic-ish write via temp + rename.
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(self).unwrap();
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Generate the next available task ID.
    pub fn next_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Get a task by ID.
    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Get a mutable reference to a task by ID.
    pub fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        let idx = self.tasks.iter().position(|t| t.id == id)?;
        self.tasks.get_mut(idx)
    }

    /// Remove a task and any vendor-rate override attached to it.
    pub fn remove(&mut self, id: u64) {
        self.tasks.retain(|t| t.id != id);
        if let Some(margin) = self.margin.as_mut() {
            margin.task_vendor_rates.remove(&id);
        }
    }

    /// Margin configuration, created with defaults on first access.
    pub fn margin_mut(&mut self) -> &mut MarginData {
        self.margin.get_or_insert_with(MarginData::default)
    }
}

/// Resolve a task identifier (either ID, reference label, or title) to a task ID.
/// Returns an error if the name has multiple matches and suggests using ID instead.
pub fn resolve_task_identifier(identifier: &str, db: &Database) -> Result<u64, String> {
    // Try parsing as ID first
    if let Ok(id) = identifier.parse::<u64>() {
        if db.get(id).is_some() {
            return Ok(id);
        } else {
            return Err(format!("Task with ID {} not found", id));
        }
    }

    // Then as a reference label ("TASK-003"), then by title (case-insensitive)
    let matches: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|task| {
            task.reference
                .as_deref()
                .is_some_and(|r| r.eq_ignore_ascii_case(identifier))
                || task.title.to_lowercase() == identifier.to_lowercase()
        })
        .collect();

    match matches.len() {
        0 => Err(format!("No task found matching '{}'", identifier)),
        1 => Ok(matches[0].id),
        _ => {
            let mut error_msg = format!("Multiple tasks found matching '{}':\n", identifier);
            for task in matches {
                error_msg.push_str(&format!("  ID {}: {}", task.id, task.title));
                if let Some(ref reference) = task.reference {
                    error_msg.push_str(&format!(" [{}]", reference));
                }
                error_msg.push('\n');
            }
            error_msg.push_str("Please use the specific ID instead.");
            Err(error_msg)
        }
    }
}

/// Format a task status for display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::NotStarted => "Not Started",
        Status::InProgress => "In Progress",
        Status::Completed => "Completed",
        Status::OnHold => "On Hold",
    }
}

/// Format an audit status for display.
pub fn format_audit_status(s: Option<AuditStatus>) -> &'static str {
    match s {
        Some(AuditStatus::Pending) => "Pending",
        Some(AuditStatus::Approved) => "Approved",
        Some(AuditStatus::Rejected) => "Rejected",
        None => "-",
    }
}

/// Format a margin health band for display.
pub fn format_margin_health(h: MarginHealth) -> &'static str {
    match h {
        MarginHealth::Excellent => "Excellent",
        MarginHealth::Good => "Good",
        MarginHealth::Fair => "Fair",
        MarginHealth::AtRisk => "At Risk",
    }
}

/// Format a budget health band for display.
pub fn format_budget_health(h: BudgetHealth) -> &'static str {
    match h {
        BudgetHealth::OnTrack => "On Track",
        BudgetHealth::Warning => "Warning",
        BudgetHealth::Critical => "Critical",
    }
}

/// Format a currency amount with the project's currency code.
pub fn format_money(amount: f64, settings: &Settings) -> String {
    format!("{} {:.2}", settings.currency, amount)
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Print tasks in a formatted metrics table.
pub fn print_metrics_table(tasks: &[&Task], settings: &Settings) {
    // Header.
    println!(
        "{:<5} {:<10} {:<12} {:>8} {:>9} {:>8} {:>12}  {}",
        "ID", "Ref", "Status", "PCI", "AAS%", "Units", "Cost", "Title"
    );
    for t in tasks {
        let m = compute_metrics(t, settings);
        // Low-accuracy estimates get a review marker next to the score.
        let aas = if is_low_accuracy(m.aas) {
            format!("{:.1}!", m.aas)
        } else {
            format!("{:.1}", m.aas)
        };
        let reference = t.reference.clone().unwrap_or_else(|| "-".into());
        println!(
            "{:<5} {:<10} {:<12} {:>8.2} {:>9} {:>8.2} {:>12.2}  {}",
            t.id,
            truncate(&reference, 10),
            format_status(t.status),
            m.pci,
            aas,
            m.verified_units,
            m.verified_cost,
            t.title
        );
    }
}
