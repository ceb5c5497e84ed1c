//! The saved conditions collection.

use std::io;
use std::path::Path;

use colloquy_core::{Condition, LoadError};
use tracing::warn;

use crate::persistence::{load_conditions, save_conditions};

/// Ordered collection of reusable conditions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConditionLibrary {
    conditions: Vec<Condition>,
}

impl ConditionLibrary {
    /// Wrap an existing list.
    #[must_use]
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    /// Load from `path`. A missing file yields an empty library.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        match load_conditions(path) {
            Ok(conditions) => Ok(Self::new(conditions)),
            Err(e) if e.is_not_found() => {
                warn!(?path, "no saved conditions found");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Write the library to `path`.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        save_conditions(path, &self.conditions)
    }

    /// Saved conditions in order.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Condition at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Condition> {
        self.conditions.get(index)
    }

    /// First condition named `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.name() == name)
    }

    /// Append a condition and return its index.
    pub fn add(&mut self, condition: Condition) -> usize {
        self.conditions.push(condition);
        self.conditions.len() - 1
    }

    /// Number of saved conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Whether the library is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}
