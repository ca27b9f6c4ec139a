//! Command registry
//!
//! The complete command table, built once at startup and injected into the
//! dispatcher. Immutable afterwards; lookups are exact and case-sensitive.

use super::{string, ttl, txn, vector, Command};
use std::collections::HashMap;
use std::sync::Arc;

pub struct CommandRegistry {
    commands: HashMap<&'static str, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Build the registry with every known command.
    pub fn new() -> Self {
        let mut registry = CommandRegistry {
            commands: HashMap::new(),
        };

        registry.register(Arc::new(string::SetCommand));
        registry.register(Arc::new(string::GetCommand));
        registry.register(Arc::new(ttl::ExpireCommand));
        registry.register(Arc::new(vector::VecSetCommand));
        registry.register(Arc::new(vector::VecSimCommand));

        // Transaction control; dispatched specially, registered for
        // completeness.
        registry.register(Arc::new(txn::MultiCommand));
        registry.register(Arc::new(txn::ExecCommand));
        registry.register(Arc::new(txn::DiscardCommand));

        registry
    }

    fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.insert(command.name(), command);
    }

    /// Exact-match lookup.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
