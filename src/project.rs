//! Project management functionality for multi-project support.
//!
//! This module handles project discovery, naming conventions, and
//! project-specific database file management. Projects are stored as
//! individual JSON files with the naming convention:
//! `<project_name>_estimates.json`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::db::Database;

/// Represents a project with its name and database file path.
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub display_name: String,
    pub file_path: PathBuf,
}

impl Project {
    /// Create a new project with the given display name.
    pub fn new(display_name: &str, pe_dir: &Path) -> Self {
        let name = sanitize_project_name(display_name);
        let file_path = pe_dir.join(format!("{}_estimates.json", name));

        Project {
            name,
            display_name: display_name.to_string(),
            file_path,
        }
    }

    /// Load a project from an existing database file.
    pub fn from_file(file_path: PathBuf) -> Option<Self> {
        let file_name = file_path.file_stem()?.to_str()?;

        if !file_name.ends_with("_estimates") {
            return None;
        }

        let name = file_name.strip_suffix("_estimates")?;
        let display_name = name.replace('_', " ");

        Some(Project {
            name: name.to_string(),
            display_name,
            file_path,
        })
    }

    /// Create the database file for this project if it doesn't exist.
    pub fn create_if_not_exists(&self) -> Result<(), std::io::Error> {
        if !self.file_path.exists() {
            let db = Database::default();
            db.save(&self.file_path)?;
        }
        Ok(())
    }
}

/// Convert a display name to a safe project name for file naming.
/// Converts to lowercase and replaces spaces with underscores.
pub fn sanitize_project_name(display_name: &str) -> String {
    display_name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Discover all existing projects in the PE directory.
pub fn discover_projects(pe_dir: &Path) -> Result<Vec<Project>, std::io::Error> {
    let mut projects = Vec::new();

    if !pe_dir.exists() {
        return Ok(projects);
    }

    for entry in fs::read_dir(pe_dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            if let Some(project) = Project::from_file(path) {
                projects.push(project);
            }
        }
    }

    // Sort projects by display name
    projects.sort_by(|a, b| a.display_name.cmp(&b.display_name));

    Ok(projects)
}

/// Create a new project with the given name.
pub fn create_project(display_name: &str, pe_dir: &Path) -> Result<Project, String> {
    if display_name.trim().is_empty() {
        return Err("Project name cannot be empty".into());
    }

    let project = Project::new(display_name, pe_dir);

    if project.file_path.exists() {
        return Err(format!("Project '{}' already exists", display_name));
    }

    project
        .create_if_not_exists()
        .map_err(|e| format!("Failed to create project file: {e}"))?;

    Ok(project)
}

/// Find the most recently modified project in the PE directory.
pub fn get_most_recent_project(pe_dir: &Path) -> Result<Option<Project>, std::io::Error> {
    let projects = discover_projects(pe_dir)?;

    if projects.is_empty() {
        return Ok(None);
    }

    // Find the project with the most recent modification time
    let mut most_recent: Option<(Project, std::time::SystemTime)> = None;

    for project in projects {
        if let Ok(metadata) = fs::metadata(&project.file_path) {
            if let Ok(modified) = metadata.modified() {
                match most_recent {
                    None => most_recent = Some((project, modified)),
                    Some((_, current_time)) => {
                        if modified > current_time {
                            most_recent = Some((project, modified));
                        }
                    }
                }
            }
        }
    }

    Ok(most_recent.map(|(project, _)| project))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_project_name() {
        assert_eq!(sanitize_project_name("My Project"), "my_project");
        assert_eq!(sanitize_project_name("Acme-Proposal_2024"), "acme_proposal_2024");
        assert_eq!(sanitize_project_name("Special!@#$%Characters"), "special_characters");
        assert_eq!(sanitize_project_name("  Multiple   Spaces  "), "multiple_spaces");
        assert_eq!(sanitize_project_name(""), "");
    }

    #[test]
    fn test_project_file_round_trip() {
        let p = Project::new("Acme Proposal", Path::new("/tmp/pe"));
        assert!(p.file_path.ends_with("acme_proposal_estimates.json"));
        let back = Project::from_file(p.file_path.clone()).unwrap();
        assert_eq!(back.name, "acme_proposal");
        assert_eq!(back.display_name, "acme proposal");
    }
}
