use std::collections::HashMap;

/// A minimal stand-in for an ambient request context: a bag of string values
/// a caller can thread through a wrapped call and that conditional hooks can
/// inspect via [`crate::hooks::context_value_equals`]. An empty context is
/// used whenever a wrapped call has no context parameter.
#[derive(Clone, Debug, Default)]
pub struct HookContext {
    values: HashMap<String, String>,
}

impl HookContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }
}
