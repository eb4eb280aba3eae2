//! Action provider boundary.
//!
//! An action provider is the capability registry the engine dispatches
//! steps against: a name maps to a callable that performs one concrete
//! side effect and returns a flat field map, or fails with a typed
//! [`ActionError`]. The engine validates action names against
//! [`ActionProvider::contains`] at plan time and calls
//! [`ActionProvider::invoke`] at dispatch time; it never knows how an
//! action is implemented.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use baton_types::{ActionError, ResultFields};

/// Capability registry consumed by the engine.
///
/// Implementations may call out to OS automation, HTTP backends, or
/// anything else. The default implementations below cover in-process
/// registration and side-effect-free previews.
pub trait ActionProvider {
    /// Whether an action with this name is registered.
    fn contains(&self, action: &str) -> bool;

    /// Invoke the named action with fully resolved parameters.
    fn invoke(
        &self,
        action: &str,
        params: &IndexMap<String, Value>,
    ) -> Result<ResultFields, ActionError>;
}

type ActionFn = Box<dyn Fn(&IndexMap<String, Value>) -> Result<ResultFields, ActionError> + Send + Sync>;

/// In-process action registry mapping names to callables.
#[derive(Default)]
pub struct ActionRegistry {
    actions: IndexMap<String, ActionFn>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action under a name, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, action: F)
    where
        F: Fn(&IndexMap<String, Value>) -> Result<ResultFields, ActionError> + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Box::new(action));
    }

    /// Registered action names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ActionProvider for ActionRegistry {
    fn contains(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    fn invoke(
        &self,
        action: &str,
        params: &IndexMap<String, Value>,
    ) -> Result<ResultFields, ActionError> {
        debug!(action = %action, param_count = params.len(), "invoking registered action");
        let callable = self
            .actions
            .get(action)
            .ok_or_else(|| ActionError::unavailable(format!("action '{action}' is not registered")))?;
        callable(params)
    }
}

/// A provider that accepts any action and echoes its invocation back as
/// the result fields. Useful for previews and tests that need no side
/// effects.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoProvider;

impl ActionProvider for EchoProvider {
    fn contains(&self, _action: &str) -> bool {
        true
    }

    fn invoke(
        &self,
        action: &str,
        params: &IndexMap<String, Value>,
    ) -> Result<ResultFields, ActionError> {
        let mut fields = ResultFields::new();
        fields.insert("action".to_string(), Value::String(action.to_string()));
        for (key, value) in params {
            fields.insert(key.clone(), value.clone());
        }
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_types::ActionErrorKind;
    use serde_json::json;

    #[test]
    fn registry_dispatches_to_registered_callable() {
        let mut registry = ActionRegistry::new();
        registry.register("greet", |params| {
            let mut fields = ResultFields::new();
            let name = params.get("name").cloned().unwrap_or(json!("world"));
            fields.insert("message".to_string(), json!(format!("hello {}", name.as_str().unwrap_or("?"))));
            Ok(fields)
        });

        assert!(registry.contains("greet"));
        assert!(!registry.contains("wave"));

        let mut params = IndexMap::new();
        params.insert("name".to_string(), json!("baton"));
        let fields = registry.invoke("greet", &params).expect("invoke");
        assert_eq!(fields.get("message"), Some(&json!("hello baton")));
    }

    #[test]
    fn unregistered_action_reports_unavailable() {
        let registry = ActionRegistry::new();
        let error = registry.invoke("ghost", &IndexMap::new()).expect_err("should fail");
        assert_eq!(error.kind, ActionErrorKind::Unavailable);
    }

    #[test]
    fn echo_provider_reflects_its_invocation() {
        let mut params = IndexMap::new();
        params.insert("app".to_string(), json!("Spotify"));
        let fields = EchoProvider.invoke("open_app", &params).expect("invoke");
        assert_eq!(fields.get("action"), Some(&json!("open_app")));
        assert_eq!(fields.get("app"), Some(&json!("Spotify")));
    }
}
