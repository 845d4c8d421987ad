//! Finds the members of a set of namespaces tagged for one group.

use tracing::debug;

use crate::function::Function;
use crate::namespace::Namespace;
use crate::tag::{self, Tag};

/// Function selected by the scanner together with the tag that selected it.
#[derive(Clone, Debug)]
pub struct Tagged {
    /// Selected function.
    pub function: Function,
    /// Tag attached for the scanned group.
    pub tag: Tag,
}

/// Returns the members tagged for `group`, in namespace order and then member
/// order. Untagged members are skipped.
#[must_use]
pub fn scan(group: &str, namespaces: &[Namespace]) -> Vec<Tagged> {
    let key = tag::record_key(group);
    let found: Vec<Tagged> = namespaces
        .iter()
        .flat_map(Namespace::members)
        .filter_map(|function| {
            tag::lookup(function.id(), &key).map(|tag| Tagged {
                function: function.clone(),
                tag,
            })
        })
        .collect();

    debug!(
        group,
        namespaces = namespaces.len(),
        matched = found.len(),
        "scanned namespaces"
    );
    found
}
