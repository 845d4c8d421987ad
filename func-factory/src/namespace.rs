//! Namespaces: explicit, ordered collections of functions a factory can scan.

use std::collections::{BTreeMap, HashMap};
use std::sync::{LazyLock, Mutex, PoisonError};

use serde_json::Value;
use tracing::debug;

use crate::error::FactoryResult;
use crate::function::{Arguments, Function};
use crate::tag::Register;

/// Definition-site registration emitted by `#[register]`.
///
/// Values are gathered with [`inventory`] and turned into [`Function`]s by
/// [`Namespace::collect`].
#[derive(Debug)]
pub struct Registration {
    module: &'static str,
    name: &'static str,
    site: &'static str,
    alias: Option<&'static str>,
    group: &'static str,
    call: fn(Arguments) -> anyhow::Result<Value>,
}

impl Registration {
    #[doc(hidden)]
    #[must_use]
    pub const fn new(
        module: &'static str,
        name: &'static str,
        site: &'static str,
        alias: Option<&'static str>,
        group: &'static str,
        call: fn(Arguments) -> anyhow::Result<Value>,
    ) -> Self {
        Self {
            module,
            name,
            site,
            alias,
            group,
            call,
        }
    }

    /// Module path the function was defined in.
    #[must_use]
    pub const fn module(&self) -> &'static str {
        self.module
    }

    /// Declared function name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Source location of the function item, `file:line:column`.
    ///
    /// Every `#[register]` on one item reports the same site, so it tells
    /// apart same-named functions nested in different bodies of one module.
    #[must_use]
    pub const fn site(&self) -> &'static str {
        self.site
    }

    /// Explicit alias, if one was given.
    #[must_use]
    pub const fn alias(&self) -> Option<&'static str> {
        self.alias
    }

    /// Group the function registers into.
    #[must_use]
    pub const fn group(&self) -> &'static str {
        self.group
    }

    fn register(&self) -> Register {
        let register = Register::new().group(self.group);
        match self.alias {
            Some(alias) => register.alias(alias),
            None => register,
        }
    }
}

inventory::collect!(Registration);

// Functions materialized from registrations, per module path. Kept for the
// process lifetime so repeated collection yields the same identities.
static COLLECTED: LazyLock<Mutex<HashMap<String, Vec<Function>>>> =
    LazyLock::new(Mutex::default);

/// Named, ordered list of functions.
///
/// Only [`Function`] handles can be members, so types, methods bound to a
/// receiver and plain values never reach the scanner.
#[derive(Clone, Debug)]
pub struct Namespace {
    name: String,
    members: Vec<Function>,
}

impl Namespace {
    /// Creates an empty namespace.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Adds `function` as a member and returns the namespace.
    #[must_use]
    pub fn with(mut self, function: Function) -> Self {
        self.export(function);
        self
    }

    /// Adds `function` as a member. Exporting the same function twice keeps
    /// a single entry.
    pub fn export(&mut self, function: Function) {
        if !self.members.contains(&function) {
            self.members.push(function);
        }
    }

    /// Builds the namespace of every `#[register]` function defined directly
    /// in `module` (child modules are not included).
    ///
    /// Registrations sharing a definition site become one function carrying
    /// all their tags. Members are ordered by function name, then by site.
    /// Each function is materialized
    /// once per process; later calls return the same handles.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::DuplicateTag`](crate::FactoryError::DuplicateTag)
    /// when one function is registered twice for the same group.
    pub fn collect(module: &str) -> FactoryResult<Self> {
        let mut collected = COLLECTED.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(members) = collected.get(module) {
            return Ok(Self {
                name: module.to_owned(),
                members: members.clone(),
            });
        }

        let mut by_item: BTreeMap<(&'static str, &'static str), Vec<&'static Registration>> =
            BTreeMap::new();
        for registration in inventory::iter::<Registration> {
            if registration.module == module {
                by_item
                    .entry((registration.name, registration.site))
                    .or_default()
                    .push(registration);
            }
        }

        let mut members = Vec::with_capacity(by_item.len());
        for ((name, _), registrations) in by_item {
            let call = registrations[0].call;
            let mut function = Function::new(name, move |args| call(args));
            for registration in registrations {
                function = registration.register().apply(function)?;
            }
            members.push(function);
        }

        debug!(module, functions = members.len(), "collected registered functions");
        collected.insert(module.to_owned(), members.clone());
        Ok(Self {
            name: module.to_owned(),
            members,
        })
    }

    /// Namespace name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in natural order.
    #[must_use]
    pub fn members(&self) -> &[Function] {
        &self.members
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` when the namespace has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Collects the calling module's `#[register]` functions into a [`Namespace`].
///
/// Expands to `Namespace::collect(module_path!())`.
#[macro_export]
macro_rules! namespace {
    () => {
        $crate::Namespace::collect(::core::module_path!())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::FactoryError;
    use serde_json::json;

    inventory::submit! {
        Registration::new("namespace-test::plain", "beta", "plain.rs:1:1", None, "ns-test", |_| Ok(Value::Null))
    }

    inventory::submit! {
        Registration::new("namespace-test::plain", "alpha", "plain.rs:2:1", Some("first"), "ns-test", |_| Ok(Value::Null))
    }

    inventory::submit! {
        Registration::new("namespace-test::plain::child", "gamma", "child.rs:1:1", None, "ns-test", |_| Ok(Value::Null))
    }

    inventory::submit! {
        Registration::new("namespace-test::twice", "dup", "twice.rs:1:1", Some("a"), "ns-test", |_| Ok(Value::Null))
    }

    inventory::submit! {
        Registration::new("namespace-test::twice", "dup", "twice.rs:1:1", Some("b"), "ns-test", |_| Ok(Value::Null))
    }

    inventory::submit! {
        Registration::new("namespace-test::nested", "helper", "nested.rs:3:8", None, "ns-test", |_| Ok(json!(1)))
    }

    inventory::submit! {
        Registration::new("namespace-test::nested", "helper", "nested.rs:9:8", None, "ns-test-b", |_| Ok(json!(2)))
    }

    #[test]
    fn export_keeps_one_entry_per_function() {
        let f = Function::new("one", |_| Ok(json!(1)));
        let ns = Namespace::new("ns").with(f.clone()).with(f.clone());
        assert_eq!(ns.len(), 1);
        assert_eq!(ns.members()[0], f);
    }

    #[test]
    fn collect_orders_by_name_and_ignores_children() {
        let ns = Namespace::collect("namespace-test::plain").unwrap();
        let names: Vec<_> = ns.members().iter().map(Function::name).collect();
        assert_eq!(names, ["alpha", "beta"]);
        assert_eq!(ns.members()[0].tag("ns-test").unwrap().alias(), "first");
        assert_eq!(ns.members()[1].tag("ns-test").unwrap().alias(), "beta");
    }

    #[test]
    fn collect_reuses_function_identity() {
        let first = Namespace::collect("namespace-test::plain").unwrap();
        let second = Namespace::collect("namespace-test::plain").unwrap();
        assert_eq!(first.members(), second.members());
    }

    #[test]
    fn same_name_at_different_sites_stays_apart() {
        let ns = Namespace::collect("namespace-test::nested").unwrap();
        assert_eq!(ns.len(), 2);

        let [first, second] = ns.members() else {
            panic!("expected two members");
        };
        assert_ne!(first, second);
        assert_eq!(first.call(Arguments::new()).unwrap(), json!(1));
        assert!(first.tag("ns-test").is_some());
        assert!(first.tag("ns-test-b").is_none());
        assert_eq!(second.call(Arguments::new()).unwrap(), json!(2));
        assert!(second.tag("ns-test-b").is_some());
    }

    #[test]
    fn collect_unknown_module_is_empty() {
        let ns = Namespace::collect("namespace-test::nowhere").unwrap();
        assert!(ns.is_empty());
        assert_eq!(ns.name(), "namespace-test::nowhere");
    }

    #[test]
    fn collect_rejects_double_registration() {
        let err = Namespace::collect("namespace-test::twice").expect_err("duplicate tag");
        assert!(matches!(err, FactoryError::DuplicateTag { ref function, .. } if function == "dup"));
    }
}
