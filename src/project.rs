//! Multi-project support.
//!
//! Each project is one JSON file in the data directory, named
//! `<project_name>_timeline.json`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::store::JsonStore;

const FILE_SUFFIX: &str = "_timeline";
/// File name used when a display name has nothing usable in it.
const DEFAULT_NAME: &str = "default";

/// A project with its name and database file path.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub name: String,
    pub display_name: String,
    pub file_path: PathBuf,
}

impl Project {
    /// Create a new project with the given display name.
    pub fn new(display_name: &str, dir: &Path) -> Self {
        let mut name = sanitize_project_name(display_name);
        if name.is_empty() {
            name = DEFAULT_NAME.to_string();
        }
        let file_path = dir.join(format!("{}{}.json", name, FILE_SUFFIX));

        Project {
            name,
            display_name: display_name.trim().to_string(),
            file_path,
        }
    }

    /// Recognise a project from its database file.
    pub fn from_file(file_path: PathBuf) -> Option<Self> {
        if file_path.extension()? != "json" {
            return None;
        }
        let stem = file_path.file_stem()?.to_str()?;
        let name = stem.strip_suffix(FILE_SUFFIX)?;
        if name.is_empty() {
            return None;
        }
        Some(Project {
            name: name.to_string(),
            display_name: name.replace('_', " "),
            file_path,
        })
    }

    /// Open the task store for this project.
    pub fn open_store(&self) -> Result<JsonStore, StoreError> {
        JsonStore::open(&self.file_path)
    }
}

/// Convert a display name to a safe file name: lowercase alphanumerics joined by `_`.
pub fn sanitize_project_name(display_name: &str) -> String {
    display_name
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// All projects in `dir`, sorted by display name.
pub fn discover_projects(dir: &Path) -> Result<Vec<Project>, std::io::Error> {
    let mut projects = Vec::new();

    if !dir.exists() {
        return Ok(projects);
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            if let Some(project) = Project::from_file(path) {
                projects.push(project);
            }
        }
    }

    projects.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    Ok(projects)
}

/// The most recently modified project in `dir`.
pub fn most_recent_project(dir: &Path) -> Result<Option<Project>, std::io::Error> {
    let mut best: Option<(Project, std::time::SystemTime)> = None;
    for project in discover_projects(dir)? {
        let Ok(modified) = fs::metadata(&project.file_path).and_then(|m| m.modified()) else {
            continue;
        };
        if best.as_ref().map_or(true, |(_, t)| modified > *t) {
            best = Some((project, modified));
        }
    }
    Ok(best.map(|(project, _)| project))
}

/// The project to open: an explicit name, else the configured one, else the most
/// recently modified, else "Default".
pub fn select_project(
    dir: &Path,
    explicit: Option<&str>,
    configured: Option<&str>,
) -> Result<Project, std::io::Error> {
    if let Some(name) = explicit.or(configured).filter(|n| !n.trim().is_empty()) {
        return Ok(Project::new(name, dir));
    }
    Ok(most_recent_project(dir)?.unwrap_or_else(|| Project::new("Default", dir)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_project_name() {
        assert_eq!(sanitize_project_name("My Project"), "my_project");
        assert_eq!(sanitize_project_name("Test-Project_123"), "test_project_123");
        assert_eq!(sanitize_project_name("Special!@#$%Characters"), "special_characters");
        assert_eq!(sanitize_project_name("  Multiple   Spaces  "), "multiple_spaces");
        assert_eq!(sanitize_project_name(""), "");
    }

    #[test]
    fn test_from_file_requires_suffix() {
        let p = Project::from_file(PathBuf::from("/d/web_relaunch_timeline.json")).unwrap();
        assert_eq!(p.name, "web_relaunch");
        assert_eq!(p.display_name, "web relaunch");
        assert!(Project::from_file(PathBuf::from("/d/notes.json")).is_none());
        assert!(Project::from_file(PathBuf::from("/d/x_timeline.toml")).is_none());
        assert!(Project::from_file(PathBuf::from("/d/_timeline.json")).is_none());
    }

    #[test]
    fn test_unusable_name_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new("!!!", dir.path());
        assert_eq!(project.name, "default");
        assert_eq!(project.file_path, dir.path().join("default_timeline.json"));

        fs::write(&project.file_path, "{}").unwrap();
        let found = discover_projects(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_path, project.file_path);
    }

    #[test]
    fn test_discover_and_select() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(select_project(dir.path(), None, None).unwrap().name, "default");

        fs::write(dir.path().join("beta_timeline.json"), "{}").unwrap();
        fs::write(dir.path().join("alpha_timeline.json"), "{}").unwrap();
        fs::write(dir.path().join("config.toml"), "").unwrap();

        let names: Vec<_> = discover_projects(dir.path()).unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(select_project(dir.path(), Some("Gamma Ray"), Some("beta")).unwrap().name, "gamma_ray");
        assert_eq!(select_project(dir.path(), None, Some("beta")).unwrap().name, "beta");
        assert!(select_project(dir.path(), None, None).is_ok());
    }
}
