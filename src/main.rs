//! # PE - Project Estimation CLI
//!
//! A command-line project estimation and proposal tool built around a
//! weighted complexity model.
//!
//! ## Key Features
//!
//! - **Eleven-Factor Complexity Model**: every task is scored with the PCI
//!   formula from its stored weighting factors
//! - **Accuracy Auditing**: modelled scores are checked against AI/human
//!   verified unit counts (AAS); estimates under 85% are flagged for review
//! - **Reverse Calculation**: back-solve factor values from a target index,
//!   unit count or budget
//! - **Margin & Budget Reporting**: vendor-cost margins with per-task rate
//!   overrides and lock snapshots, plus planned-vs-actual budget rollups
//!   with a simulated burn curve
//! - **Multi-Project Support**: each project is a local JSON file with CSV
//!   export and backup functionality
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task with factors and a verified unit count
//! pe add "Implement checkout flow" --isr 2.0 --cf 1.5 --uxi 2.0 --units 10
//!
//! # List tasks with computed metrics
//! pe list
//!
//! # Hit a target budget by adjusting factors
//! pe reverse "Implement checkout flow" --metric cost --target 1500
//!
//! # Margin and budget reports
//! pe margin show
//! pe budget --burn --forecast
//! ```
//!
//! Data is stored locally in `~/.pe/` with each project as a separate JSON
//! file. Derived figures (PCI, AAS, verified units/cost) are never stored;
//! they are recomputed from the task factors and settings on every read.

use std::path::PathBuf;

use clap::Parser;

pub mod budget;
pub mod calc;
pub mod cli;
pub mod cmd;
pub mod db;
pub mod fields;
pub mod margin;
pub mod project;
pub mod reverse;
pub mod settings;
pub mod task;

use cli::Cli;
use cmd::*;
use db::Database;
use project::{get_most_recent_project, Project};

fn main() {
    let cli = Cli::parse();

    // Determine PE directory
    let pe_dir = if let Some(db_path) = cli.db.as_ref() {
        db_path
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .to_path_buf()
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let pe_dir = PathBuf::from(home).join(".pe");
        if let Err(e) = std::fs::create_dir_all(&pe_dir) {
            eprintln!("Failed to create pe directory {}: {}", pe_dir.display(), e);
            std::process::exit(1);
        }
        pe_dir
    };

    // Handle commands that don't need a loaded database first
    match &cli.command {
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            return;
        }
        Commands::Projects { new } => {
            cmd_projects(&pe_dir, new.clone());
            return;
        }
        _ => {}
    }

    // For all other commands, determine the database file to use
    let db_path = cli.db.unwrap_or_else(|| {
        match get_most_recent_project(&pe_dir) {
            Ok(Some(project)) => project.file_path,
            _ => {
                // Create a default project
                let default_project = Project::new("Default", &pe_dir);
                if let Err(e) = default_project.create_if_not_exists() {
                    eprintln!("Failed to create default project: {}", e);
                    std::process::exit(1);
                }
                default_project.file_path
            }
        }
    });

    let mut db = Database::load(&db_path);

    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),
        Commands::Projects { .. } => unreachable!("projects handled above"),

        Commands::Add {
            title, reference, desc, isr, cf, uxi, rcf, aep, l, mlw, cgw, rf, s, glri,
            units, status, start,
        } => {
            let factors = task::Factors {
                isr, cf, uxi, rcf, aep, l, mlw, cgw, rf, s, glri,
            };
            cmd_add(&mut db, &db_path, title, reference, desc, factors, units, status, start)
        }

        Commands::List { status, low_accuracy, audit, sort, limit } =>
            cmd_list(&db, status, low_accuracy, audit, sort, limit),

        Commands::View { id } => cmd_view(&db, id),

        Commands::Update {
            id, title, reference, desc, isr, cf, uxi, rcf, aep, l, mlw, cgw, rf, s, glri,
            units, status, actual_hours, progress, start, completion,
        } => cmd_update(
            &mut db,
            &db_path,
            id,
            title,
            reference,
            desc,
            [isr, cf, uxi, rcf, aep, l, mlw, cgw, rf, s, glri],
            units,
            status,
            actual_hours,
            progress,
            start,
            completion,
        ),

        Commands::Delete { id } => cmd_delete(&mut db, &db_path, id),

        Commands::Reverse { id, metric, target, dry_run } =>
            cmd_reverse(&mut db, &db_path, id, metric, target, dry_run),

        Commands::Margin { action } => cmd_margin(&mut db, &db_path, action),

        Commands::Budget { burn, forecast } => cmd_budget(&db, burn, forecast),

        Commands::Audit { action } => cmd_audit(&mut db, &db_path, action),

        Commands::Element { action } => cmd_element(&mut db, &db_path, action),

        Commands::Settings { action } => cmd_settings(&mut db, &db_path, action),

        Commands::Export { output, low_accuracy } => cmd_export(&db, output, low_accuracy),

        Commands::Backup => cmd_backup(&db_path),
    }
}
