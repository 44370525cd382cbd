//! Command implementations for the CLI interface.
//!
//! This module contains all the command handlers that implement the various
//! subcommands available in the CLI, from task CRUD and the metrics table to
//! the reverse-calculation, margin, budget and audit workflows.

use clap::Subcommand;
use clap_complete::{generate, Shell};

use std::fs;
use std::path::Path;

use chrono::{Local, NaiveDate, TimeZone, Utc};

use crate::budget::{burn_curve, compute_budget_rollup, forecast_at_completion, task_budget};
use crate::calc::{compute_metrics, is_low_accuracy, LOW_ACCURACY_THRESHOLD};
use crate::db::*;
use crate::fields::*;
use crate::margin::{below_min_margin, classify_margin, compute_margins, task_margin};
use crate::project::{create_project, discover_projects};
use crate::reverse::apply_reverse_target;
use crate::task::{AuditRecord, Factors, Task, TaskElement};

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task to the estimate.
    Add {
        /// Short title for the task.
        title: String,
        /// Reference label, e.g. TASK-003.
        #[arg(long)]
        reference: Option<String>,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Integration/system reach factor.
        #[arg(long, default_value_t = 1.0)]
        isr: f64,
        /// Complexity factor.
        #[arg(long, default_value_t = 1.0)]
        cf: f64,
        /// User-experience intensity factor.
        #[arg(long, default_value_t = 1.0)]
        uxi: f64,
        /// Requirements clarity factor.
        #[arg(long, default_value_t = 1.0)]
        rcf: f64,
        /// Architecture/engineering effort premium.
        #[arg(long, default_value_t = 1.0)]
        aep: f64,
        /// Leverage discount.
        #[arg(long, default_value_t = 1.0)]
        l: f64,
        /// Multi-layer work weight.
        #[arg(long, default_value_t = 1.0)]
        mlw: f64,
        /// Cross-group coordination weight.
        #[arg(long, default_value_t = 1.0)]
        cgw: f64,
        /// Rework factor.
        #[arg(long, default_value_t = 1.0)]
        rf: f64,
        /// Scale factor.
        #[arg(long, default_value_t = 1.0)]
        s: f64,
        /// Governance/legal/regulatory intensity.
        #[arg(long, default_value_t = 1.0)]
        glri: f64,
        /// AI/human-verified unit count.
        #[arg(long, default_value_t = 0.0)]
        units: f64,
        /// Status: not-started | in-progress | completed | on-hold.
        #[arg(long, value_enum, default_value_t = Status::NotStarted)]
        status: Status,
        /// Start date (YYYY-MM-DD or "today").
        #[arg(long)]
        start: Option<String>,
    },

    /// List tasks with their computed metrics.
    List {
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Only tasks flagged for low accuracy (AAS below 85%).
        #[arg(long)]
        low_accuracy: bool,
        /// Filter by audit status.
        #[arg(long, value_enum)]
        audit: Option<AuditStatus>,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Id)]
        sort: SortKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a single task by ID, reference or title.
    View {
        /// Task ID, reference or title to view
        id: String,
    },

    /// Update fields on a task.
    Update {
        /// Task ID, reference or title to update
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        reference: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long)]
        isr: Option<f64>,
        #[arg(long)]
        cf: Option<f64>,
        #[arg(long)]
        uxi: Option<f64>,
        #[arg(long)]
        rcf: Option<f64>,
        #[arg(long)]
        aep: Option<f64>,
        #[arg(long)]
        l: Option<f64>,
        #[arg(long)]
        mlw: Option<f64>,
        #[arg(long)]
        cgw: Option<f64>,
        #[arg(long)]
        rf: Option<f64>,
        #[arg(long)]
        s: Option<f64>,
        #[arg(long)]
        glri: Option<f64>,
        /// AI/human-verified unit count.
        #[arg(long)]
        units: Option<f64>,
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Logged delivery hours.
        #[arg(long)]
        actual_hours: Option<f64>,
        /// Delivery progress percentage (0-100).
        #[arg(long)]
        progress: Option<f64>,
        /// Start date (YYYY-MM-DD or "today").
        #[arg(long)]
        start: Option<String>,
        /// Completion date (YYYY-MM-DD or "today").
        #[arg(long)]
        completion: Option<String>,
    },

    /// Delete a task by ID, reference or title.
    Delete {
        /// Task ID, reference or title to delete
        id: String,
    },

    /// Back-solve factor values so a task hits a target metric.
    Reverse {
        /// Task ID, reference or title to adjust
        id: String,
        /// Which metric the target applies to.
        #[arg(long, value_enum)]
        metric: TargetMetric,
        /// Target value (index, units, or cost depending on --metric).
        #[arg(long)]
        target: f64,
        /// Print the adjusted factors without saving them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Margin and vendor-cost reporting.
    Margin {
        #[command(subcommand)]
        action: MarginAction,
    },

    /// Planned-versus-actual budget rollup.
    Budget {
        /// Print the simulated 9-week burn curve.
        #[arg(long)]
        burn: bool,
        /// Print the forecast spend at completion.
        #[arg(long)]
        forecast: bool,
    },

    /// Estimate audit workflow.
    Audit {
        #[command(subcommand)]
        action: AuditAction,
    },

    /// Manage decorative scope elements on a task.
    Element {
        #[command(subcommand)]
        action: ElementAction,
    },

    /// Show or change project rate settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Export tasks with computed metrics to CSV.
    Export {
        /// Output file path (default: estimates.csv)
        #[arg(long, short)]
        output: Option<String>,
        /// Only tasks flagged for low accuracy.
        #[arg(long)]
        low_accuracy: bool,
    },

    /// Create a timestamped backup of the current project file.
    Backup,

    /// List or create estimation projects.
    Projects {
        /// Create a new project with this name.
        #[arg(long)]
        new: Option<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum MarginAction {
    /// Per-task margin table and project summary.
    Show,
    /// Set the project-wide hourly rates.
    SetRates {
        /// Internal delivery rate per hour.
        #[arg(long)]
        internal: Option<f64>,
        /// Default vendor rate per hour.
        #[arg(long)]
        vendor: Option<f64>,
        /// Sales rate per hour.
        #[arg(long)]
        sales: Option<f64>,
        /// Margin alert threshold percentage.
        #[arg(long)]
        min_margin: Option<f64>,
    },
    /// Override the vendor rate for one task.
    SetTaskRate {
        /// Task ID, reference or title
        id: String,
        /// Vendor rate per hour for this task.
        rate: f64,
    },
    /// Remove a task's vendor-rate override.
    ClearTaskRate {
        /// Task ID, reference or title
        id: String,
    },
    /// Snapshot the current margin into the lock record.
    Lock,
    /// Clear the lock flag (the snapshot is kept as history).
    Unlock,
}

#[derive(Subcommand)]
pub enum AuditAction {
    /// Approve a task estimate.
    Approve {
        /// Task ID, reference or title
        id: String,
        /// Reviewer identity.
        #[arg(long)]
        by: String,
        /// Approval notes.
        #[arg(long)]
        notes: Option<String>,
    },
    /// Reject a task estimate.
    Reject {
        /// Task ID, reference or title
        id: String,
        /// Reviewer identity.
        #[arg(long)]
        by: String,
        /// Rejection reason.
        #[arg(long)]
        reason: Option<String>,
    },
    /// Put a task estimate back into the pending state.
    Reset {
        /// Task ID, reference or title
        id: String,
        /// Reviewer identity.
        #[arg(long)]
        by: String,
    },
    /// List tasks awaiting review (pending or unreviewed).
    Pending,
}

#[derive(Subcommand)]
pub enum ElementAction {
    /// Add a scope element to a task.
    Add {
        /// Task ID, reference or title
        task: String,
        /// Element title.
        title: String,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// List a task's scope elements.
    List {
        /// Task ID, reference or title
        task: String,
    },
    /// Delete a scope element by its ID.
    Delete {
        /// Task ID, reference or title
        task: String,
        /// Element ID to remove.
        element_id: u64,
    },
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the current settings.
    Show,
    /// Change one or more settings.
    Set {
        /// Billing rate per hour.
        #[arg(long)]
        hourly_rate: Option<f64>,
        /// Verified-units to hours conversion ratio.
        #[arg(long)]
        unit_hour_ratio: Option<f64>,
        /// ISO currency code for display.
        #[arg(long)]
        currency: Option<String>,
    },
}

/// Parse a date input: "today" or YYYY-MM-DD.
fn parse_date_input(s: &str) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();
    if s == "today" {
        return Some(Local::now().date_naive());
    }
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

fn resolve_or_exit(identifier: &str, db: &Database) -> u64 {
    match resolve_task_identifier(identifier, db) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error resolving task: {}", e);
            std::process::exit(1);
        }
    }
}

fn save_or_exit(db: &Database, db_path: &Path) {
    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save DB: {e}");
        std::process::exit(1);
    }
}

/// Add a new task to the database.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    db: &mut Database,
    db_path: &Path,
    title: String,
    reference: Option<String>,
    desc: Option<String>,
    factors: Factors,
    units: f64,
    status: Status,
    start: Option<String>,
) {
    let now_utc = Utc::now().timestamp();
    let id = db.next_id();

    let start_date = match start {
        Some(s) => match parse_date_input(&s) {
            Some(d) => Some(d),
            None => {
                eprintln!("Unrecognised start date. Use YYYY-MM-DD or 'today'.");
                std::process::exit(1);
            }
        },
        None => None,
    };

    let mut task = Task::new(id, title, now_utc);
    task.reference = reference.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    task.description = desc;
    task.factors = factors;
    task.ai_verified_units = units;
    task.status = status;
    task.start_date = start_date;

    let metrics = compute_metrics(&task, &db.settings);
    db.tasks.push(task);
    save_or_exit(db, db_path);
    println!(
        "Added task {} (PCI {:.2}, AAS {:.1}%)",
        id, metrics.pci, metrics.aas
    );
    if is_low_accuracy(metrics.aas) {
        println!("Note: AAS under {LOW_ACCURACY_THRESHOLD}%, estimate flagged for review.");
    }
}

/// List tasks with computed metrics, optional filtering and sorting.
pub fn cmd_list(
    db: &Database,
    status: Option<Status>,
    low_accuracy: bool,
    audit: Option<AuditStatus>,
    sort: SortKey,
    limit: Option<usize>,
) {
    let settings = &db.settings;
    let mut filtered: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|t| {
            if let Some(s) = status {
                if t.status != s {
                    return false;
                }
            }
            if low_accuracy && !is_low_accuracy(compute_metrics(t, settings).aas) {
                return false;
            }
            if let Some(a) = audit {
                if t.audit.as_ref().map(|r| r.status) != Some(a) {
                    return false;
                }
            }
            true
        })
        .collect();

    // Metric sorts go highest-first; cost and complexity drive review order.
    match sort {
        SortKey::Pci => filtered.sort_by(|a, b| {
            let pa = compute_metrics(a, settings).pci;
            let pb = compute_metrics(b, settings).pci;
            pb.total_cmp(&pa).then(a.id.cmp(&b.id))
        }),
        SortKey::Aas => filtered.sort_by(|a, b| {
            let aa = compute_metrics(a, settings).aas;
            let ab = compute_metrics(b, settings).aas;
            aa.total_cmp(&ab).then(a.id.cmp(&b.id))
        }),
        SortKey::Cost => filtered.sort_by(|a, b| {
            let ca = compute_metrics(a, settings).verified_cost;
            let cb = compute_metrics(b, settings).verified_cost;
            cb.total_cmp(&ca).then(a.id.cmp(&b.id))
        }),
        SortKey::Id => filtered.sort_by_key(|t| t.id),
    }

    if let Some(n) = limit {
        filtered.truncate(n);
    }

    print_metrics_table(&filtered, settings);
}

/// View detailed information about a specific task.
pub fn cmd_view(db: &Database, id: String) {
    let task_id = resolve_or_exit(&id, db);
    let Some(task) = db.get(task_id).cloned() else {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    };
    let settings = &db.settings;
    let m = compute_metrics(&task, settings);
    let f = &task.factors;

    println!("ID:             {}", task.id);
    println!("Reference:      {}", task.reference.clone().unwrap_or_else(|| "-".into()));
    println!("Title:          {}", task.title);
    println!("Status:         {}", format_status(task.status));
    println!("Start:          {}", task.start_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()));
    println!("Completion:     {}", task.completion_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()));
    println!("Progress:       {:.0}%", task.progress);
    println!("Actual hours:   {}", task.actual_hours.map(|h| format!("{h:.1}")).unwrap_or_else(|| "-".into()));
    println!();
    println!("Factors:        ISR {:.1}  CF {:.1}  UXI {:.1}  RCF {:.1}  AEP {:.1}  L {:.1}", f.isr, f.cf, f.uxi, f.rcf, f.aep, f.l);
    println!("                MLW {:.1}  CGW {:.1}  RF {:.1}  S {:.1}  GLRI {:.1}", f.mlw, f.cgw, f.rf, f.s, f.glri);
    println!("Verified units: {:.2}", task.ai_verified_units);
    println!();
    println!("PCI:            {:.2}", m.pci);
    print!("AAS:            {:.1}%", m.aas);
    if is_low_accuracy(m.aas) {
        print!("  (below {LOW_ACCURACY_THRESHOLD}%, needs review)");
    }
    println!();
    println!("Verified cost:  {}", format_money(m.verified_cost, settings));
    println!("Hours:          {:.2}", m.hours);

    if let Some(margin_data) = db.margin.as_ref() {
        let tm = task_margin(&task, margin_data);
        println!();
        println!(
            "Margin:         {} ({:.1}%, {})",
            format_money(tm.margin, settings),
            tm.margin_percent,
            format_margin_health(classify_margin(tm.margin_percent))
        );
    }

    println!();
    match task.audit.as_ref() {
        Some(record) => {
            println!(
                "Audit:          {} by {} at {}",
                format_audit_status(Some(record.status)),
                record.reviewer,
                Utc.timestamp_opt(record.at_utc, 0).single().map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into())
            );
            if let Some(notes) = record.notes.as_ref() {
                println!("Audit notes:    {}", notes);
            }
        }
        None => println!("Audit:          -"),
    }

    if !task.elements.is_empty() {
        println!("Elements:");
        for e in &task.elements {
            let category = e.category.as_deref().unwrap_or("-");
            println!("  {} [{}] {}", e.id, category, e.title);
        }
    }

    println!();
    println!("Description:\n{}", task.description.unwrap_or_else(|| "-".into()));
}

/// Update an existing task's fields.
#[allow(clippy::too_many_arguments)]
pub fn cmd_update(
    db: &mut Database,
    db_path: &Path,
    id: String,
    title: Option<String>,
    reference: Option<String>,
    desc: Option<String>,
    factor_edits: [Option<f64>; 11],
    units: Option<f64>,
    status: Option<Status>,
    actual_hours: Option<f64>,
    progress: Option<f64>,
    start: Option<String>,
    completion: Option<String>,
) {
    let task_id = resolve_or_exit(&id, db);
    let settings = db.settings.clone();
    let Some(t) = db.get_mut(task_id) else {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    };

    if let Some(s) = title {
        t.title = s;
    }
    if let Some(r) = reference {
        t.reference = if r.trim().is_empty() { None } else { Some(r.trim().to_string()) };
    }
    if let Some(d) = desc {
        t.description = if d.is_empty() { None } else { Some(d) };
    }

    let [isr, cf, uxi, rcf, aep, l, mlw, cgw, rf, s, glri] = factor_edits;
    if let Some(v) = isr { t.factors.isr = v; }
    if let Some(v) = cf { t.factors.cf = v; }
    if let Some(v) = uxi { t.factors.uxi = v; }
    if let Some(v) = rcf { t.factors.rcf = v; }
    if let Some(v) = aep { t.factors.aep = v; }
    if let Some(v) = l { t.factors.l = v; }
    if let Some(v) = mlw { t.factors.mlw = v; }
    if let Some(v) = cgw { t.factors.cgw = v; }
    if let Some(v) = rf { t.factors.rf = v; }
    if let Some(v) = s { t.factors.s = v; }
    if let Some(v) = glri { t.factors.glri = v; }

    if let Some(u) = units {
        t.ai_verified_units = u;
    }
    if let Some(st) = status {
        t.status = st;
    }
    if let Some(h) = actual_hours {
        t.actual_hours = Some(h);
    }
    if let Some(p) = progress {
        t.progress = p.clamp(0.0, 100.0);
    }
    if let Some(ds) = start {
        match parse_date_input(&ds) {
            Some(d) => t.start_date = Some(d),
            None => {
                eprintln!("Unrecognised start date. Use YYYY-MM-DD or 'today'.");
                std::process::exit(1);
            }
        }
    }
    if let Some(ds) = completion {
        match parse_date_input(&ds) {
            Some(d) => t.completion_date = Some(d),
            None => {
                eprintln!("Unrecognised completion date. Use YYYY-MM-DD or 'today'.");
                std::process::exit(1);
            }
        }
    }

    t.updated_at_utc = Utc::now().timestamp();
    let metrics = compute_metrics(t, &settings);
    save_or_exit(db, db_path);
    println!(
        "Updated task {} (PCI {:.2}, AAS {:.1}%)",
        task_id, metrics.pci, metrics.aas
    );
}

/// Delete a task.
pub fn cmd_delete(db: &mut Database, db_path: &Path, id: String) {
    let task_id = resolve_or_exit(&id, db);
    if db.get(task_id).is_none() {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    }
    db.remove(task_id);
    save_or_exit(db, db_path);
    println!("Deleted task {}", task_id);
}

/// Run the reverse calculation against a task and persist the result.
pub fn cmd_reverse(
    db: &mut Database,
    db_path: &Path,
    id: String,
    metric: TargetMetric,
    target: f64,
    dry_run: bool,
) {
    let task_id = resolve_or_exit(&id, db);
    let Some(task) = db.get(task_id).cloned() else {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    };
    let settings = db.settings.clone();

    let before = compute_metrics(&task, &settings);
    let updated = match apply_reverse_target(&task, metric, target, &settings) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Reverse calculation failed: {e}");
            std::process::exit(1);
        }
    };
    let after = compute_metrics(&updated, &settings);

    println!("Task {}:", task_id);
    println!(
        "  PCI    {:>10.2} -> {:>10.2}",
        before.pci, after.pci
    );
    println!(
        "  AAS    {:>9.1}% -> {:>9.1}%",
        before.aas, after.aas
    );
    println!(
        "  Units  {:>10.2} -> {:>10.2}",
        before.verified_units, after.verified_units
    );
    println!(
        "  Cost   {:>10.2} -> {:>10.2}",
        before.verified_cost, after.verified_cost
    );
    println!(
        "  ISR {:.1} -> {:.1}, CF {:.1} -> {:.1}, UXI {:.1} -> {:.1}, AEP {:.1} -> {:.1}",
        task.factors.isr,
        updated.factors.isr,
        task.factors.cf,
        updated.factors.cf,
        task.factors.uxi,
        updated.factors.uxi,
        task.factors.aep,
        updated.factors.aep
    );
    // Per-factor rounding means the achieved value sits near the target,
    // not exactly on it.
    println!("  (heuristic adjustment; expect small drift from the target)");

    if dry_run {
        println!("Dry run: nothing saved.");
        return;
    }

    let Some(t) = db.get_mut(task_id) else {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    };
    *t = updated;
    save_or_exit(db, db_path);
    println!("Saved.");
}

/// Handle margin subcommands.
pub fn cmd_margin(db: &mut Database, db_path: &Path, action: MarginAction) {
    match action {
        MarginAction::Show => {
            let settings = db.settings.clone();
            let created = db.margin.is_none();
            let data = db.margin_mut().clone();
            if created {
                // First open of the margin tool creates and persists defaults.
                save_or_exit(db, db_path);
            }
            println!(
                "Rates: internal {:.2}, vendor {:.2}, sales {:.2} ({}/hour)",
                data.internal_rate, data.vendor_rate, data.sales_rate, settings.currency
            );
            println!(
                "{:<5} {:>8} {:>10} {:>10} {:>10} {:>10} {:>8}  {}",
                "ID", "Hours", "Internal", "Vendor", "Sales", "Margin", "Pct", "Health"
            );
            for t in &db.tasks {
                let m = task_margin(t, &data);
                let mut health = format_margin_health(classify_margin(m.margin_percent)).to_string();
                if below_min_margin(m.margin_percent, &data) {
                    health.push_str(" (below threshold)");
                }
                println!(
                    "{:<5} {:>8.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>7.1}%  {}",
                    t.id,
                    m.hours,
                    m.internal_cost,
                    m.vendor_cost,
                    m.sales_price,
                    m.margin,
                    m.margin_percent,
                    health
                );
            }
            let summary = compute_margins(&db.tasks, &data);
            println!();
            println!(
                "Totals: hours {:.2}, internal {}, vendor {}, sales {}",
                summary.total_hours,
                format_money(summary.total_internal_cost, &settings),
                format_money(summary.total_vendor_cost, &settings),
                format_money(summary.total_sales_price, &settings)
            );
            let mut health = format_margin_health(classify_margin(summary.margin_percent)).to_string();
            if below_min_margin(summary.margin_percent, &data) {
                health.push_str(&format!(
                    " (below the {:.0}% alert threshold)",
                    data.min_margin_percent
                ));
            }
            println!(
                "Margin: {} ({:.1}%, {}); avg vendor rate {:.2}",
                format_money(summary.total_margin, &settings),
                summary.margin_percent,
                health,
                summary.avg_vendor_rate
            );
            if data.is_locked {
                println!(
                    "Locked snapshot: {} at {:.1}%",
                    data.locked_margin_amount
                        .map(|a| format_money(a, &settings))
                        .unwrap_or_else(|| "-".into()),
                    data.locked_margin_percent.unwrap_or(0.0)
                );
            }
        }
        MarginAction::SetRates { internal, vendor, sales, min_margin } => {
            let data = db.margin_mut();
            if let Some(r) = internal {
                data.internal_rate = r;
            }
            if let Some(r) = vendor {
                data.vendor_rate = r;
            }
            if let Some(r) = sales {
                data.sales_rate = r;
            }
            if let Some(p) = min_margin {
                data.min_margin_percent = p;
            }
            if data.is_locked {
                println!("Note: margin is locked; the snapshot records history and does not freeze rates.");
            }
            save_or_exit(db, db_path);
            println!("Updated margin rates.");
        }
        MarginAction::SetTaskRate { id, rate } => {
            let task_id = resolve_or_exit(&id, db);
            db.margin_mut().task_vendor_rates.insert(task_id, rate);
            save_or_exit(db, db_path);
            println!("Set vendor rate {:.2} for task {}", rate, task_id);
        }
        MarginAction::ClearTaskRate { id } => {
            let task_id = resolve_or_exit(&id, db);
            if db.margin_mut().task_vendor_rates.remove(&task_id).is_none() {
                println!("Task {} had no vendor-rate override.", task_id);
                return;
            }
            save_or_exit(db, db_path);
            println!("Cleared vendor-rate override for task {}", task_id);
        }
        MarginAction::Lock => {
            let data = db.margin_mut().clone();
            let summary = compute_margins(&db.tasks, &data);
            db.margin_mut().lock(&summary);
            save_or_exit(db, db_path);
            println!(
                "Locked margin snapshot: {:.2} at {:.1}%",
                summary.total_margin, summary.margin_percent
            );
        }
        MarginAction::Unlock => {
            db.margin_mut().unlock();
            save_or_exit(db, db_path);
            println!("Unlocked. Snapshot values kept as history.");
        }
    }
}

/// Print the budget rollup, optionally with burn curve and forecast.
pub fn cmd_budget(db: &Database, burn: bool, forecast: bool) {
    let settings = &db.settings;
    println!(
        "{:<5} {:>10} {:>12} {:>10} {:>12} {:>12} {:>9}",
        "ID", "Plan hrs", "Plan cost", "Act hrs", "Act cost", "Variance", "Var%"
    );
    for t in &db.tasks {
        let b = task_budget(t, settings);
        println!(
            "{:<5} {:>10.2} {:>12.2} {:>10.2} {:>12.2} {:>+12.2} {:>+8.1}%",
            t.id,
            b.planned_hours,
            b.planned_cost,
            b.actual_hours,
            b.actual_cost,
            b.variance,
            b.variance_percent
        );
    }
    let rollup = compute_budget_rollup(&db.tasks, settings);
    println!();
    println!(
        "Planned: {:.2} hrs / {}   Actual: {:.2} hrs / {}",
        rollup.total_planned_hours,
        format_money(rollup.total_planned_cost, settings),
        rollup.total_actual_hours,
        format_money(rollup.total_actual_cost, settings)
    );
    println!(
        "Variance: {} ({:+.1}%) {}",
        format_money(rollup.total_variance, settings),
        rollup.total_variance_percent,
        format_budget_health(rollup.health)
    );

    if burn {
        println!();
        println!("{:<6} {:>14} {:>14}", "Week", "Planned", "Actual");
        for point in burn_curve(&rollup) {
            println!(
                "{:<6} {:>14.2} {:>14.2}",
                point.week, point.cumulative_planned, point.cumulative_actual
            );
        }
        println!("(simulated interpolation, not measured from time logs)");
    }

    if forecast {
        let fac = forecast_at_completion(&db.tasks, &rollup);
        println!();
        println!("Forecast at completion: {}", format_money(fac, settings));
    }
}

/// Handle audit workflow subcommands.
pub fn cmd_audit(db: &mut Database, db_path: &Path, action: AuditAction) {
    match action {
        AuditAction::Approve { id, by, notes } => {
            set_audit(db, db_path, &id, AuditStatus::Approved, by, notes);
        }
        AuditAction::Reject { id, by, reason } => {
            set_audit(db, db_path, &id, AuditStatus::Rejected, by, reason);
        }
        AuditAction::Reset { id, by } => {
            set_audit(db, db_path, &id, AuditStatus::Pending, by, None);
        }
        AuditAction::Pending => {
            let pending: Vec<&Task> = db
                .tasks
                .iter()
                .filter(|t| {
                    t.audit
                        .as_ref()
                        .map(|r| r.status == AuditStatus::Pending)
                        .unwrap_or(true)
                })
                .collect();
            if pending.is_empty() {
                println!("No tasks awaiting review.");
                return;
            }
            print_metrics_table(&pending, &db.settings);
        }
    }
}

fn set_audit(
    db: &mut Database,
    db_path: &Path,
    id: &str,
    status: AuditStatus,
    reviewer: String,
    notes: Option<String>,
) {
    let task_id = resolve_or_exit(id, db);
    let now_utc = Utc::now().timestamp();
    let Some(t) = db.get_mut(task_id) else {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    };
    t.audit = Some(AuditRecord {
        status,
        reviewer,
        at_utc: now_utc,
        notes,
    });
    t.updated_at_utc = now_utc;
    save_or_exit(db, db_path);
    println!(
        "Task {} marked {}.",
        task_id,
        format_audit_status(Some(status))
    );
}

/// Handle scope element subcommands.
pub fn cmd_element(db: &mut Database, db_path: &Path, action: ElementAction) {
    match action {
        ElementAction::Add { task, title, desc, category } => {
            let task_id = resolve_or_exit(&task, db);
            let Some(t) = db.get_mut(task_id) else {
                eprintln!("Task {} not found.", task_id);
                std::process::exit(1);
            };
            let element_id = t.next_element_id();
            t.elements.push(TaskElement {
                id: element_id,
                title,
                description: desc,
                category,
            });
            t.updated_at_utc = Utc::now().timestamp();
            save_or_exit(db, db_path);
            println!("Added element {} to task {}", element_id, task_id);
        }
        ElementAction::List { task } => {
            let task_id = resolve_or_exit(&task, db);
            let Some(t) = db.get(task_id) else {
                eprintln!("Task {} not found.", task_id);
                std::process::exit(1);
            };
            if t.elements.is_empty() {
                println!("Task {} has no elements.", task_id);
                return;
            }
            println!("{:<5} {:<14} {}", "ID", "Category", "Title");
            for e in &t.elements {
                println!(
                    "{:<5} {:<14} {}",
                    e.id,
                    truncate(e.category.as_deref().unwrap_or("-"), 14),
                    e.title
                );
            }
        }
        ElementAction::Delete { task, element_id } => {
            let task_id = resolve_or_exit(&task, db);
            let Some(t) = db.get_mut(task_id) else {
                eprintln!("Task {} not found.", task_id);
                std::process::exit(1);
            };
            let before = t.elements.len();
            t.elements.retain(|e| e.id != element_id);
            if t.elements.len() == before {
                eprintln!("Element {} not found on task {}.", element_id, task_id);
                std::process::exit(1);
            }
            t.updated_at_utc = Utc::now().timestamp();
            save_or_exit(db, db_path);
            println!("Deleted element {} from task {}", element_id, task_id);
        }
    }
}

/// Show or change project settings.
pub fn cmd_settings(db: &mut Database, db_path: &Path, action: SettingsAction) {
    match action {
        SettingsAction::Show => {
            println!("Hourly rate:        {:.2} {}", db.settings.hourly_rate, db.settings.currency);
            println!("Unit-to-hour ratio: {:.2}", db.settings.unit_to_hour_ratio);
            println!("Currency:           {}", db.settings.currency);
        }
        SettingsAction::Set { hourly_rate, unit_hour_ratio, currency } => {
            if let Some(r) = hourly_rate {
                db.settings.hourly_rate = r;
            }
            if let Some(r) = unit_hour_ratio {
                db.settings.unit_to_hour_ratio = r;
            }
            if let Some(c) = currency {
                db.settings.currency = c.trim().to_uppercase();
            }
            save_or_exit(db, db_path);
            println!("Updated settings.");
        }
    }
}

/// Export tasks with computed metrics to CSV for proposals and reporting.
pub fn cmd_export(db: &Database, output: Option<String>, low_accuracy: bool) {
    let output_path = output.unwrap_or_else(|| "estimates.csv".to_string());
    let settings = &db.settings;

    let tasks: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|t| !low_accuracy || is_low_accuracy(compute_metrics(t, settings).aas))
        .collect();

    let mut csv_content = String::new();
    csv_content.push_str(
        "ID,Reference,Title,Status,ISR,CF,UXI,RCF,AEP,L,MLW,CGW,RF,S,GLRI,\
         AIVerifiedUnits,PCI,AAS,VerifiedUnits,VerifiedCost,Hours,LowAccuracy,AuditStatus\n",
    );

    // Escape CSV fields that contain commas or quotes
    let escape_csv = |s: &str| {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    };

    for task in &tasks {
        let m = compute_metrics(task, settings);
        let f = &task.factors;
        csv_content.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{:.4},{:.4},{:.4},{:.4},{:.4},{},{}\n",
            task.id,
            escape_csv(task.reference.as_deref().unwrap_or("-")),
            escape_csv(&task.title),
            format_status(task.status),
            f.isr,
            f.cf,
            f.uxi,
            f.rcf,
            f.aep,
            f.l,
            f.mlw,
            f.cgw,
            f.rf,
            f.s,
            f.glri,
            task.ai_verified_units,
            m.pci,
            m.aas,
            m.verified_units,
            m.verified_cost,
            m.hours,
            is_low_accuracy(m.aas),
            format_audit_status(task.audit.as_ref().map(|r| r.status)),
        ));
    }

    match fs::write(&output_path, csv_content) {
        Ok(_) => println!("Exported {} task(s) to {}", tasks.len(), output_path),
        Err(e) => {
            eprintln!("Failed to write {}: {}", output_path, e);
            std::process::exit(1);
        }
    }
}

/// Create a timestamped backup copy of the project file.
pub fn cmd_backup(db_path: &Path) {
    if !db_path.exists() {
        eprintln!("Nothing to back up: {} does not exist.", db_path.display());
        std::process::exit(1);
    }
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let stem = db_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("project");
    let backup_name = format!("{}_backup_{}.json", stem, stamp);
    let backup_path = db_path.with_file_name(&backup_name);
    match fs::copy(db_path, &backup_path) {
        Ok(_) => println!("Backed up to {}", backup_path.display()),
        Err(e) => {
            eprintln!("Backup failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// List existing projects or create a new one.
pub fn cmd_projects(pe_dir: &Path, new: Option<String>) {
    if let Some(name) = new {
        match create_project(&name, pe_dir) {
            Ok(project) => {
                println!("Created project '{}' at {}", project.display_name, project.file_path.display());
            }
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    match discover_projects(pe_dir) {
        Ok(projects) if !projects.is_empty() => {
            println!("{:<24} {}", "Project", "File");
            for p in projects {
                println!("{:<24} {}", truncate(&p.display_name, 24), p.file_path.display());
            }
        }
        Ok(_) => println!("No projects found in {}.", pe_dir.display()),
        Err(e) => {
            eprintln!("Failed to list projects: {}", e);
            std::process::exit(1);
        }
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;

    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}
