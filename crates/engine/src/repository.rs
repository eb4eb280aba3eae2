//! Workflow definition storage.
//!
//! Definitions live in one YAML document keyed by workflow name. The
//! engine itself only needs `get`; the rest of the trait covers the
//! listing, saving, and deleting a hosting surface performs. The
//! file-backed store re-reads the document on every call so edits made
//! outside the process are picked up immediately.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use baton_types::WorkflowDefinition;
use baton_types::workflow::validation::validate_definition_shape;

/// Storage failures surfaced to the caller.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No workflow is stored under the requested name.
    #[error("workflow '{0}' not found")]
    NotFound(String),
    /// The definition fails shape validation and was not stored.
    #[error("invalid workflow definition: {0}")]
    InvalidDefinition(String),
    /// The workflows document could not be read or written.
    #[error("failed to access workflows file: {0}")]
    Io(#[from] std::io::Error),
    /// The workflows document is not valid YAML.
    #[error("invalid YAML in workflows file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A multi-workflow document: definitions keyed by name, author order
/// preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowBundle {
    /// Stored workflows by name.
    #[serde(default)]
    pub workflows: IndexMap<String, WorkflowDefinition>,
}

/// Listing entry describing one stored workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowSummary {
    pub name: String,
    pub description: Option<String>,
    /// Declared input names, in authoring order.
    pub inputs: Vec<String>,
    pub steps_count: usize,
}

/// Load/list/save/delete of workflow definitions by name.
pub trait WorkflowRepository {
    /// Fetch one definition; `NotFound` when the name is absent.
    fn get(&self, name: &str) -> Result<WorkflowDefinition, RepositoryError>;
    /// Summaries of every stored workflow.
    fn list(&self) -> Result<Vec<WorkflowSummary>, RepositoryError>;
    /// Create or replace the definition stored under `definition.name`.
    fn save(&self, definition: &WorkflowDefinition) -> Result<(), RepositoryError>;
    /// Remove a definition; returns whether one existed.
    fn delete(&self, name: &str) -> Result<bool, RepositoryError>;
}

/// YAML-file-backed repository. Every operation reads the document fresh
/// from disk.
#[derive(Debug, Clone)]
pub struct YamlWorkflowStore {
    path: PathBuf,
}

impl YamlWorkflowStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole document; a missing file is an empty bundle.
    pub fn load_bundle(&self) -> Result<WorkflowBundle, RepositoryError> {
        if !self.path.exists() {
            return Ok(WorkflowBundle::default());
        }
        let text = fs::read_to_string(&self.path)?;
        let mut bundle: WorkflowBundle = serde_yaml::from_str(&text)?;
        for (name, definition) in &mut bundle.workflows {
            definition.name = name.clone();
        }
        Ok(bundle)
    }

    fn save_bundle(&self, bundle: &WorkflowBundle) -> Result<(), RepositoryError> {
        let text = serde_yaml::to_string(bundle)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

impl WorkflowRepository for YamlWorkflowStore {
    fn get(&self, name: &str) -> Result<WorkflowDefinition, RepositoryError> {
        let bundle = self.load_bundle()?;
        bundle
            .workflows
            .get(name)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(name.to_string()))
    }

    fn list(&self) -> Result<Vec<WorkflowSummary>, RepositoryError> {
        let bundle = self.load_bundle()?;
        Ok(bundle
            .workflows
            .values()
            .map(|definition| WorkflowSummary {
                name: definition.name.clone(),
                description: definition.description.clone(),
                inputs: definition.inputs.iter().map(|input| input.name.clone()).collect(),
                steps_count: definition.steps.len(),
            })
            .collect())
    }

    fn save(&self, definition: &WorkflowDefinition) -> Result<(), RepositoryError> {
        validate_definition_shape(definition).map_err(RepositoryError::InvalidDefinition)?;
        let mut bundle = self.load_bundle()?;
        bundle.workflows.insert(definition.name.clone(), definition.clone());
        self.save_bundle(&bundle)
    }

    fn delete(&self, name: &str) -> Result<bool, RepositoryError> {
        let mut bundle = self.load_bundle()?;
        if bundle.workflows.shift_remove(name).is_none() {
            return Ok(false);
        }
        self.save_bundle(&bundle)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_types::{InputSpec, StepSpec};
    use indexmap::IndexMap as ParamMap;

    fn sample_definition(name: &str) -> WorkflowDefinition {
        WorkflowDefinition {
            name: name.to_string(),
            description: Some("sample".to_string()),
            inputs: vec![InputSpec {
                name: "duration".to_string(),
                default: Some(serde_json::json!(25)),
                required: false,
            }],
            steps: vec![StepSpec {
                action: "notify".to_string(),
                params: ParamMap::new(),
                delay: None,
                time_after: None,
                time_before: None,
                days: None,
                r#if: None,
            }],
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> YamlWorkflowStore {
        YamlWorkflowStore::new(dir.path().join("workflows.yaml"))
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.list().unwrap().is_empty());
        assert!(matches!(store.get("anything"), Err(RepositoryError::NotFound(_))));
    }

    #[test]
    fn save_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let definition = sample_definition("focus-session");

        store.save(&definition).expect("save");
        let loaded = store.get("focus-session").expect("get");
        assert_eq!(loaded, definition);
    }

    #[test]
    fn list_summarizes_stored_workflows() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&sample_definition("one")).unwrap();
        store.save(&sample_definition("two")).unwrap();

        let summaries = store.list().expect("list");
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "one");
        assert_eq!(summaries[0].inputs, vec!["duration"]);
        assert_eq!(summaries[0].steps_count, 1);
    }

    #[test]
    fn delete_reports_presence() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&sample_definition("gone-soon")).unwrap();

        assert!(store.delete("gone-soon").expect("delete"));
        assert!(!store.delete("gone-soon").expect("second delete"));
        assert!(matches!(store.get("gone-soon"), Err(RepositoryError::NotFound(_))));
    }

    #[test]
    fn save_rejects_invalid_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let mut definition = sample_definition("ok-name");
        definition.name = "Not A Slug".to_string();

        let error = store.save(&definition).expect_err("should reject");
        assert!(matches!(error, RepositoryError::InvalidDefinition(_)));
        assert!(!store.path().exists(), "rejected save must not create the file");
    }

    #[test]
    fn bundle_keys_win_over_embedded_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflows.yaml");
        fs::write(
            &path,
            r#"
workflows:
  from-key:
    description: key names the workflow
    steps:
      - action: notify
"#,
        )
        .unwrap();

        let store = YamlWorkflowStore::new(&path);
        let definition = store.get("from-key").expect("get");
        assert_eq!(definition.name, "from-key");
    }
}
