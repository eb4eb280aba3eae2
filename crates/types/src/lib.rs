//! Shared type definitions for the Baton workflow engine.
//!
//! This crate holds the types that cross crate boundaries: the workflow
//! document model deserialized from YAML/JSON, the declarative shape
//! validation applied before a definition is stored, and the typed error
//! surface exchanged with action providers.

pub mod action;
pub mod workflow;

pub use action::{ActionError, ActionErrorKind, ResultFields};
pub use workflow::{InputSpec, StepSpec, Weekday, WorkflowDefinition};
