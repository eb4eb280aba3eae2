//! # Baton Engine
//!
//! The Baton engine validates and executes declarative automation
//! workflows: named, ordered step sequences run against a set of
//! host-provided actions (open an application, send a notification,
//! capture a screenshot, and so on).
//!
//! ## Key Features
//!
//! - **Workflow Parsing**: single- and multi-workflow YAML documents
//! - **Template Interpolation**: dynamic value substitution using
//!   `{{ ... }}` syntax against inputs, prior step outputs, and the run
//!   clock
//! - **Gated Execution**: per-step `if` conditions, time windows, weekday
//!   sets, and pre-dispatch delays
//! - **Continue-on-error Runs**: a failing step is recorded and the run
//!   proceeds, so partial automations still deliver value
//!
//! ## Usage
//!
//! ```rust
//! use baton_engine::{EchoProvider, execute_workflow};
//! use indexmap::IndexMap;
//!
//! let workflow: baton_types::WorkflowDefinition = serde_yaml::from_str(r#"
//! name: screenshot-note
//! steps:
//!   - action: capture_screenshot
//!   - action: notify
//!     params:
//!       text: "captured at {{ time }}"
//! "#)?;
//!
//! let report = execute_workflow(&workflow, &IndexMap::new(), &EchoProvider)?;
//! assert_eq!(report.steps_executed, 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`resolve`**: the run context and `{{ ... }}` template resolution
//! - **`condition`**: the `if` comparison AST, parsed once at plan time
//! - **`gate`**: per-step run/skip/wait decisions
//! - **`plan`**: structural validation ahead of any side effect
//! - **`provider`**: the action capability registry boundary
//! - **`executor`** / **`runner`**: the sequential orchestrator, in
//!   blocking and async flavors
//! - **`repository`**: named definition storage backed by one YAML file

use std::{fs, path::Path};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

use baton_types::WorkflowDefinition;

pub mod condition;
pub mod error;
pub mod executor;
pub mod gate;
pub mod plan;
pub mod provider;
pub mod repository;
pub mod resolve;
pub mod runner;

// Re-export commonly used types for convenience
pub use error::EngineError;
pub use executor::{RunReport, StepReport, StepStatus, execute_workflow, execute_workflow_at};
pub use gate::Gate;
pub use plan::{Plan, PreparedStep, prepare_plan};
pub use provider::{ActionProvider, ActionRegistry, EchoProvider};
pub use repository::{
    RepositoryError, WorkflowBundle, WorkflowRepository, WorkflowSummary, YamlWorkflowStore,
};
pub use resolve::{ResolveError, RunContext, TemplateExpr, resolve_params, resolve_value};
pub use runner::{drive_workflow, drive_workflow_at};

/// Loads a workflow file from the filesystem.
///
/// The file may be a multi-workflow document (definitions under a
/// `workflows:` key) or a single workflow specification. The multi
/// document is attempted first so bundles are never accepted as
/// single-workflow specs with their `workflows` key silently ignored.
///
/// # Errors
///
/// Returns an error when the file cannot be read or matches neither
/// document shape.
///
/// # Examples
///
/// ```rust
/// use baton_engine::parse_workflow_file;
///
/// let temp_dir = tempfile::tempdir()?;
/// let workflow_path = temp_dir.path().join("workflows.yaml");
/// std::fs::write(&workflow_path, r#"
/// name: morning-focus
/// steps:
///   - action: open_app
///     params: { app: "Spotify" }
/// "#)?;
///
/// let bundle = parse_workflow_file(&workflow_path)?;
/// assert!(bundle.workflows.contains_key("morning-focus"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse_workflow_file(file_path: impl AsRef<Path>) -> Result<WorkflowBundle> {
    let file_path = file_path.as_ref();
    let content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read workflow file: {}", file_path.display()))?;

    #[derive(Deserialize)]
    struct MultiWorkflowDocument {
        workflows: IndexMap<String, WorkflowDefinition>,
    }

    if let Ok(document) = serde_yaml::from_str::<MultiWorkflowDocument>(&content) {
        let mut workflows = document.workflows;
        for (name, definition) in &mut workflows {
            definition.name = name.clone();
        }
        return Ok(WorkflowBundle { workflows });
    }

    if let Ok(definition) = serde_yaml::from_str::<WorkflowDefinition>(&content) {
        let name = if definition.name.is_empty() {
            "default".to_string()
        } else {
            definition.name.clone()
        };
        let mut workflows = IndexMap::new();
        workflows.insert(name, definition);
        return Ok(WorkflowBundle { workflows });
    }

    anyhow::bail!(
        "Unsupported workflow document format. Expected one of:\n\
         - Single workflow specification with 'name', 'inputs', and 'steps' fields\n\
         - Multi-workflow document with workflows under 'workflows' key\n\
         "
    );
}
