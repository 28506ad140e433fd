use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use super::models::{ManifestEntry, PathRecord, PathsManifest, ProjectPaths};

/// Storage for planned paths, keyed by project and segment index.
pub trait PathStore: Send + Sync {
    /// Replaces every stored path of `project_id` with `records`.
    fn save_paths(&self, project_id: &str, records: &[PathRecord]) -> Result<(), String>;

    /// Paths of `project_id` in segment order; empty when nothing is stored.
    fn load_paths(&self, project_id: &str) -> Result<Vec<PathRecord>, String>;

    /// Returns whether anything was stored for `project_id`.
    fn delete_paths(&self, project_id: &str) -> Result<bool, String>;
}

pub fn validate_project_id(project_id: &str) -> Result<(), String> {
    if project_id.is_empty() {
        return Err("project_id cannot be empty".to_string());
    }
    if project_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Ok(());
    }
    Err("project_id contains unsupported characters".to_string())
}

#[derive(Debug, Default)]
pub struct MemoryPathStore {
    projects: Mutex<HashMap<String, Vec<PathRecord>>>,
}

impl MemoryPathStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PathStore for MemoryPathStore {
    fn save_paths(&self, project_id: &str, records: &[PathRecord]) -> Result<(), String> {
        validate_project_id(project_id)?;
        let mut projects = self
            .projects
            .lock()
            .map_err(|_| "Path store lock poisoned".to_string())?;
        projects.insert(project_id.to_string(), records.to_vec());
        Ok(())
    }

    fn load_paths(&self, project_id: &str) -> Result<Vec<PathRecord>, String> {
        validate_project_id(project_id)?;
        let projects = self
            .projects
            .lock()
            .map_err(|_| "Path store lock poisoned".to_string())?;
        Ok(projects.get(project_id).cloned().unwrap_or_default())
    }

    fn delete_paths(&self, project_id: &str) -> Result<bool, String> {
        validate_project_id(project_id)?;
        let mut projects = self
            .projects
            .lock()
            .map_err(|_| "Path store lock poisoned".to_string())?;
        Ok(projects.remove(project_id).is_some())
    }
}

/// JSON documents on disk:
/// `<root>/projects/<id>/paths.json` plus `<root>/paths_manifest.json`.
#[derive(Debug)]
pub struct FilePathStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FilePathStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, String> {
        let store = Self {
            root: root.into(),
            lock: Mutex::new(()),
        };
        store.ensure_layout()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Manifest entries, most recently modified first.
    pub fn list_projects(&self) -> Result<Vec<ManifestEntry>, String> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| "Path store lock poisoned".to_string())?;
        let mut manifest = self.read_manifest()?;
        manifest
            .projects
            .sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(manifest.projects)
    }

    fn projects_root(&self) -> PathBuf {
        self.root.join("projects")
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join("paths_manifest.json")
    }

    fn project_doc_path(&self, project_id: &str) -> Result<PathBuf, String> {
        validate_project_id(project_id)?;
        Ok(self.projects_root().join(project_id).join("paths.json"))
    }

    fn ensure_layout(&self) -> Result<(), String> {
        fs::create_dir_all(&self.root).map_err(|err| format!("Could not create root dir: {err}"))?;
        fs::create_dir_all(self.projects_root())
            .map_err(|err| format!("Could not create projects dir: {err}"))?;

        let manifest = self.manifest_path();
        if !manifest.exists() {
            let initial = serde_json::to_string_pretty(&PathsManifest::default())
                .map_err(|err| format!("Could not serialize initial manifest: {err}"))?;
            fs::write(manifest, initial).map_err(|err| format!("Could not create manifest: {err}"))?;
        }

        Ok(())
    }

    fn read_manifest(&self) -> Result<PathsManifest, String> {
        self.ensure_layout()?;
        let raw = fs::read_to_string(self.manifest_path()).map_err(|err| err.to_string())?;
        serde_json::from_str::<PathsManifest>(&raw).map_err(|err| err.to_string())
    }

    fn write_manifest(&self, manifest: &PathsManifest) -> Result<(), String> {
        let payload = serde_json::to_string_pretty(manifest).map_err(|err| err.to_string())?;
        write_atomic(&self.manifest_path(), payload.as_bytes())
    }
}

impl PathStore for FilePathStore {
    fn save_paths(&self, project_id: &str, records: &[PathRecord]) -> Result<(), String> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| "Path store lock poisoned".to_string())?;
        self.ensure_layout()?;

        let doc_path = self.project_doc_path(project_id)?;
        // An unreadable manifest aborts the save before anything is written.
        let mut manifest = self.read_manifest()?;

        if let Some(parent) = doc_path.parent() {
            fs::create_dir_all(parent).map_err(|err| err.to_string())?;
        }
        let document = ProjectPaths {
            project_id: project_id.to_string(),
            last_modified: now_timestamp(),
            paths: records.to_vec(),
        };
        let payload = serde_json::to_string_pretty(&document).map_err(|err| err.to_string())?;
        write_atomic(&doc_path, payload.as_bytes())?;

        let next_entry = ManifestEntry {
            project_id: project_id.to_string(),
            segment_count: records.len(),
            last_modified: document.last_modified,
        };
        if let Some(existing) = manifest
            .projects
            .iter_mut()
            .find(|item| item.project_id == project_id)
        {
            *existing = next_entry;
        } else {
            manifest.projects.push(next_entry);
        }

        self.write_manifest(&manifest)
    }

    fn load_paths(&self, project_id: &str) -> Result<Vec<PathRecord>, String> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| "Path store lock poisoned".to_string())?;

        let doc_path = self.project_doc_path(project_id)?;
        if !doc_path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(doc_path).map_err(|err| err.to_string())?;
        let document =
            serde_json::from_str::<ProjectPaths>(&raw).map_err(|err| err.to_string())?;
        Ok(document.paths)
    }

    fn delete_paths(&self, project_id: &str) -> Result<bool, String> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| "Path store lock poisoned".to_string())?;

        let doc_path = self.project_doc_path(project_id)?;
        let existed = doc_path.exists();
        if let Some(project_dir) = doc_path.parent().filter(|dir| dir.exists()) {
            fs::remove_dir_all(project_dir).map_err(|err| err.to_string())?;
        }

        let mut manifest = self.read_manifest()?;
        let before = manifest.projects.len();
        manifest.projects.retain(|item| item.project_id != project_id);
        if manifest.projects.len() != before {
            self.write_manifest(&manifest)?;
        }

        Ok(existed)
    }
}

fn now_timestamp() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0);
    millis.to_string()
}

/// Writes through a sibling temp file so readers never see a partial document.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), String> {
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("snapstitch-write"),
        now_timestamp()
    );
    let temp_path = path.with_file_name(temp_name);
    fs::write(&temp_path, contents).map_err(|err| err.to_string())?;

    fs::rename(&temp_path, path).or_else(|rename_err| {
        if path.exists() {
            fs::remove_file(path).map_err(|err| err.to_string())?;
            fs::rename(&temp_path, path).map_err(|err| err.to_string())
        } else {
            Err(rename_err.to_string())
        }
    })
}
