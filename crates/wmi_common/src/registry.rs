//! Command registry.
//!
//! A trait seam with an in-memory default, so a future plugin loader can
//! substitute its own implementation without touching the dispatcher.

use std::collections::HashMap;

use crate::error::RegistryError;
use crate::spec::CommandSpec;

pub trait CommandRegistry: Send + Sync {
    fn lookup(&self, name: &str) -> Option<&CommandSpec>;
    fn names(&self) -> Vec<&'static str>;
}

/// Default registry: a HashMap populated once at startup.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    specs: HashMap<&'static str, CommandSpec>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: CommandSpec) -> Result<(), RegistryError> {
        if self.specs.contains_key(spec.name) {
            return Err(RegistryError::DuplicateCommand(spec.name.to_string()));
        }
        self.specs.insert(spec.name, spec);
        Ok(())
    }
}

impl CommandRegistry for InMemoryRegistry {
    fn lookup(&self, name: &str) -> Option<&CommandSpec> {
        self.specs.get(name)
    }

    fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.specs.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
