//! Builds the alias table of a factory from scanned functions.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FactoryError, FactoryResult};
use crate::function::Function;
use crate::scanner::Tagged;

/// What to do when two scanned functions claim the same alias.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// The function scanned last replaces the earlier one.
    #[default]
    LastWins,
    /// Construction fails with [`FactoryError::DuplicateAlias`].
    Reject,
}

/// Alias to function table, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entries: Vec<(String, Function)>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Builds the table from `scanned`, applying `policy` to repeated aliases.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::DuplicateAlias`] under [`CollisionPolicy::Reject`].
    pub fn build(group: &str, scanned: Vec<Tagged>, policy: CollisionPolicy) -> FactoryResult<Self> {
        let mut entries: Vec<(String, Function)> = Vec::with_capacity(scanned.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(scanned.len());
        for Tagged { function, tag } in scanned {
            let alias = tag.alias();
            match index.entry(alias.to_owned()) {
                Entry::Occupied(_) if policy == CollisionPolicy::Reject => {
                    return Err(FactoryError::DuplicateAlias {
                        alias: alias.to_owned(),
                        group: group.to_owned(),
                    });
                }
                Entry::Occupied(slot) => {
                    let slot = &mut entries[*slot.get()].1;
                    debug!(group, alias, replaced = %slot.id(), by = %function.id(), "alias replaced");
                    *slot = function;
                }
                Entry::Vacant(slot) => {
                    slot.insert(entries.len());
                    entries.push((alias.to_owned(), function));
                }
            }
        }
        Ok(Self { entries, index })
    }

    /// Function registered under `alias`.
    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&Function> {
        self.index.get(alias).map(|&position| &self.entries[position].1)
    }

    /// Aliases in insertion order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(alias, _)| alias.as_str())
    }

    /// Alias and function pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Function)> {
        self.entries
            .iter()
            .map(|(alias, function)| (alias.as_str(), function))
    }

    /// Number of aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
