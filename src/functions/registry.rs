//! Function registry
//!
//! Holds every function the agent may call. Built once and read-only
//! afterwards, so it can be shared behind an `Arc` without locking.

use std::collections::BTreeMap;

use super::catalog::standard_registrations;
use super::registration::{FunctionName, FunctionRegistration, ToolDefinition};

/// Registry of callable functions
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<FunctionName, FunctionRegistration>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the full dashboard catalog
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for registration in standard_registrations() {
            registry.register(registration);
        }
        registry
    }

    /// Register a function, replacing any previous registration of the name
    pub fn register(&mut self, registration: FunctionRegistration) {
        tracing::debug!("[FunctionRegistry] Registering function '{}'", registration.name);
        self.functions.insert(registration.name, registration);
    }

    /// Look up a function by the name the caller sent
    pub fn get(&self, name: &str) -> Option<&FunctionRegistration> {
        FunctionName::parse(name).and_then(|n| self.functions.get(&n))
    }

    /// Tool definitions for the LLM caller, ordered by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.functions.values().map(|r| r.definition()).collect()
    }

    /// Names of all registered functions
    pub fn names(&self) -> Vec<FunctionName> {
        self.functions.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
