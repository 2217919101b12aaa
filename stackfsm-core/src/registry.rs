//! Named cache of compiled machines.

use crate::ast::RuleStatement;
use crate::config::EngineConfig;
use crate::definition::CompiledMachine;
use crate::error::FsmError;
use crate::machine::Machine;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Compiled machines by name, shareable across threads.
#[derive(Debug, Default)]
pub struct MachineRegistry {
    machines: DashMap<String, Arc<CompiledMachine>>,
}

impl MachineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles and stores rules under `name`.
    ///
    /// Returns the checksum and whether a new entry was created.
    /// Registering identical rules again is a no-op.
    pub fn register(
        &self,
        name: &str,
        statements: &[RuleStatement],
    ) -> Result<(String, bool), FsmError> {
        let definition = CompiledMachine::compile(statements)?;

        match self.machines.entry(name.to_string()) {
            Entry::Occupied(existing) => {
                if existing.get().checksum == definition.checksum {
                    Ok((definition.checksum, false))
                } else {
                    Err(FsmError::MachineExists {
                        name: name.to_string(),
                    })
                }
            }
            Entry::Vacant(slot) => {
                let checksum = definition.checksum.clone();
                slot.insert(Arc::new(definition));
                tracing::info!(machine = name, checksum = %checksum, "registered machine");
                Ok((checksum, true))
            }
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<CompiledMachine>, FsmError> {
        self.machines
            .get(name)
            .map(|r| r.clone())
            .ok_or_else(|| FsmError::MachineNotFound {
                name: name.to_string(),
            })
    }

    /// Starts a new machine over the named definition.
    pub fn spawn(&self, name: &str, config: EngineConfig) -> Result<Machine, FsmError> {
        Ok(Machine::with_config(self.get(name)?, config))
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.machines.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Drops a definition. Running machines keep their copy.
    pub fn remove(&self, name: &str) -> bool {
        self.machines.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}
