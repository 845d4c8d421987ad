//! Registration tags and the operation that attaches them to functions.
//!
//! Tags are not stored on the function itself. A process-wide side-table maps
//! each [`FunctionId`] to its attachments, keyed by [`record_key`], so a
//! function can carry one tag per group without the groups interfering.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{LazyLock, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{FactoryError, FactoryResult};
use crate::function::{Function, FunctionId};
use crate::namespace::Registration;

/// Group used when registration or a factory does not name one.
pub const DEFAULT_GROUP: &str = "DEFAULT";

const RECORD_PREFIX: &str = "__RECORD_OF_";

type Attachments = HashMap<FunctionId, BTreeMap<String, Tag>>;

static ATTACHMENTS: LazyLock<RwLock<Attachments>> = LazyLock::new(RwLock::default);

static GROUPS: LazyLock<RwLock<BTreeSet<String>>> = LazyLock::new(RwLock::default);

/// Group and alias attached to a registered function.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    group: String,
    alias: String,
}

impl Tag {
    /// Creates a tag value.
    #[must_use]
    pub fn new(group: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            alias: alias.into(),
        }
    }

    /// Group the function was registered into.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Alias the function is looked up by.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }
}

/// Attachment key under which a group's tag is stored.
#[must_use]
pub fn record_key(group: &str) -> String {
    format!("{RECORD_PREFIX}{group}")
}

/// Every group name used for registration in this process, sorted.
///
/// Covers tags attached with [`Register::apply`] and every `#[register]`
/// function linked into the binary, whether or not its module was collected.
#[must_use]
pub fn known_groups() -> Vec<String> {
    let mut groups = GROUPS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    groups.extend(
        inventory::iter::<Registration>
            .into_iter()
            .map(|registration| registration.group().to_owned()),
    );
    groups.into_iter().collect()
}

/// Tag attachment operation.
///
/// ```
/// use func_factory::{Arguments, Function, Register};
///
/// let add = Function::new("add", |mut args: Arguments| {
///     let a: i64 = args.take(0, "a")?;
///     let b: i64 = args.take(1, "b")?;
///     Ok((a + b).into())
/// });
/// let add = Register::new().alias("sum").group("math").apply(add).unwrap();
/// assert_eq!(add.tag("math").unwrap().alias(), "sum");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Register {
    alias: Option<String>,
    group: String,
}

impl Default for Register {
    fn default() -> Self {
        Self {
            alias: None,
            group: DEFAULT_GROUP.to_owned(),
        }
    }
}

impl Register {
    /// Registration into [`DEFAULT_GROUP`] under the function's own name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the alias instead of defaulting to the function name.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the group.
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Attaches the tag to `function` and hands the same function back.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::InvalidTag`] for an empty alias or group and
    /// [`FactoryError::DuplicateTag`] when `function` already carries a tag
    /// for this group. An existing tag is never overwritten.
    pub fn apply(&self, function: Function) -> FactoryResult<Function> {
        if self.group.trim().is_empty() {
            return Err(FactoryError::invalid_tag("group cannot be empty"));
        }
        GROUPS
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(self.group.clone());

        let alias = self
            .alias
            .clone()
            .unwrap_or_else(|| function.name().to_owned());
        if alias.trim().is_empty() {
            return Err(FactoryError::invalid_tag(format!(
                "alias for function `{}` cannot be empty",
                function.name()
            )));
        }

        let key = record_key(&self.group);
        let mut table = ATTACHMENTS.write().unwrap_or_else(PoisonError::into_inner);
        let slots = table.entry(function.id()).or_default();
        if slots.contains_key(&key) {
            return Err(FactoryError::DuplicateTag {
                function: function.name().to_owned(),
                key,
            });
        }

        trace!(function = function.name(), id = %function.id(), group = %self.group, %alias, "tag attached");
        slots.insert(key, Tag::new(self.group.clone(), alias));
        drop(table);
        Ok(function)
    }
}

pub(crate) fn lookup(id: FunctionId, key: &str) -> Option<Tag> {
    ATTACHMENTS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .and_then(|slots| slots.get(key))
        .cloned()
}

pub(crate) fn attached(id: FunctionId) -> Vec<Tag> {
    ATTACHMENTS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .map(|slots| slots.values().cloned().collect())
        .unwrap_or_default()
}

pub(crate) fn forget(id: FunctionId) {
    ATTACHMENTS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&id);
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::Value;

    fn noop(name: &str) -> Function {
        Function::new(name, |_| Ok(Value::Null))
    }

    #[test]
    fn alias_defaults_to_function_name() {
        let ping = Register::new().apply(noop("ping")).unwrap();
        let tag = ping.tag(DEFAULT_GROUP).expect("tagged");
        assert_eq!(tag.alias(), "ping");
        assert_eq!(tag.group(), DEFAULT_GROUP);
    }

    #[test]
    fn second_tag_for_same_group_errors() {
        let f = Register::new().alias("first").apply(noop("f")).unwrap();
        let err = Register::new()
            .alias("second")
            .apply(f.clone())
            .expect_err("duplicate tag should fail");

        assert!(
            matches!(err, FactoryError::DuplicateTag { ref function, ref key } if function == "f" && key == "__RECORD_OF_DEFAULT")
        );
        assert_eq!(f.tag(DEFAULT_GROUP).unwrap().alias(), "first");
    }

    #[test]
    fn tags_for_distinct_groups_coexist() {
        let f = Register::new()
            .group("tag-test-a")
            .alias("one")
            .apply(noop("f"))
            .and_then(|f| Register::new().group("tag-test-b").alias("two").apply(f))
            .unwrap();

        assert_eq!(f.tag("tag-test-a").unwrap().alias(), "one");
        assert_eq!(f.tag("tag-test-b").unwrap().alias(), "two");
        assert_eq!(f.tags().len(), 2);
        assert!(known_groups().contains(&"tag-test-a".to_owned()));
    }

    #[test]
    fn empty_alias_or_group_rejected() {
        let err = Register::new()
            .group(" ")
            .apply(noop("f"))
            .expect_err("blank group should fail");
        assert!(matches!(err, FactoryError::InvalidTag { .. }));

        let err = Register::new()
            .apply(noop(""))
            .expect_err("empty name without alias should fail");
        assert!(matches!(err, FactoryError::InvalidTag { .. }));
    }

    #[test]
    fn tags_are_forgotten_with_the_function() {
        let f = Register::new().group("tag-test-drop").apply(noop("f")).unwrap();
        let id = f.id();
        assert!(lookup(id, &record_key("tag-test-drop")).is_some());
        drop(f);
        assert!(lookup(id, &record_key("tag-test-drop")).is_none());
    }

    inventory::submit! {
        Registration::new("tag-test::uncollected", "hidden", "tag.rs:1:1", None, "tag-test-uncollected", |_| Ok(Value::Null))
    }

    #[test]
    fn known_groups_include_uncollected_registrations() {
        let groups = known_groups();
        assert!(groups.contains(&"tag-test-uncollected".to_owned()));
        assert!(groups.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn record_keys_are_group_qualified() {
        assert_eq!(record_key("math"), "__RECORD_OF_math");
        assert_ne!(record_key("a"), record_key("b"));
    }
}
