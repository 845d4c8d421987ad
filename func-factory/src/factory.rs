//! The factory facade: scan once, then look up and invoke by alias.

use std::fmt::{self, Display, Formatter};

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::FactoryConfig;
use crate::error::{FactoryError, FactoryResult};
use crate::function::{Arguments, Function};
use crate::namespace::Namespace;
use crate::registry::{CollisionPolicy, Registry};
use crate::scanner;
use crate::tag::{self, DEFAULT_GROUP};

/// Advisory findings recorded while building a factory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Diagnostic {
    /// No function in the scanned namespaces is tagged for the group.
    EmptyRegistry {
        /// Group the factory was built for.
        group: String,
        /// Scanned namespace names.
        namespaces: Vec<String>,
        /// Groups registered anywhere in the process at build time.
        known_groups: Vec<String>,
    },
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRegistry {
                group,
                namespaces,
                known_groups,
            } => write!(
                f,
                "factory for group `{group}` registered no functions from {namespaces:?}. \
                 If this is unintentional, check that: the factory group matches the group \
                 used at registration (known groups: {known_groups:?}); the namespaces holding \
                 the registered functions are passed to the factory; the functions are actually \
                 registered with `#[register]` or `Register::apply`; and neither side silently \
                 fell back to the `{DEFAULT_GROUP}` group."
            ),
        }
    }
}

/// Dispatch table for one group, built from an ordered list of namespaces.
///
/// The table is fixed at construction, so shared references can be used
/// from many threads at once.
pub struct FuncFactory {
    group: String,
    namespaces: Vec<Namespace>,
    registry: Registry,
    diagnostics: Vec<Diagnostic>,
}

impl fmt::Debug for FuncFactory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let namespaces: Vec<_> = self.namespaces.iter().map(Namespace::name).collect();
        f.debug_struct("FuncFactory")
            .field("group", &self.group)
            .field("namespaces", &namespaces)
            .field("registered", &self.registered_aliases())
            .finish()
    }
}

impl FuncFactory {
    /// Builds a factory for [`DEFAULT_GROUP`].
    ///
    /// # Errors
    ///
    /// Never fails under the default collision policy; the signature matches
    /// [`FuncFactoryBuilder::build`].
    pub fn new(namespaces: impl IntoIterator<Item = Namespace>) -> FactoryResult<Self> {
        Self::builder().namespaces(namespaces).build()
    }

    /// Builds a factory for `group`.
    ///
    /// # Errors
    ///
    /// See [`FuncFactory::new`].
    pub fn with_group(
        namespaces: impl IntoIterator<Item = Namespace>,
        group: impl Into<String>,
    ) -> FactoryResult<Self> {
        Self::builder().group(group).namespaces(namespaces).build()
    }

    /// Starts configuring a factory.
    #[must_use]
    pub fn builder() -> FuncFactoryBuilder {
        FuncFactoryBuilder::new()
    }

    /// Group this factory collects.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Scanned namespaces, in scan order.
    #[must_use]
    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    /// Every registered alias, in insertion order.
    #[must_use]
    pub fn registered_aliases(&self) -> Vec<String> {
        self.registry.aliases().map(str::to_owned).collect()
    }

    /// Returns `true` if `alias` is registered.
    #[must_use]
    pub fn contains(&self, alias: &str) -> bool {
        self.registry.get(alias).is_some()
    }

    /// Number of registered aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns `true` when nothing was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Alias and function pairs, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Function)> {
        self.registry.iter()
    }

    /// Findings recorded at construction.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns the function registered under `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::UnknownAlias`] when `alias` is not registered.
    pub fn get(&self, alias: &str) -> FactoryResult<&Function> {
        self.registry
            .get(alias)
            .ok_or_else(|| FactoryError::UnknownAlias {
                alias: alias.to_owned(),
                group: self.group.clone(),
            })
    }

    /// Invokes the function registered under `alias` with `args`.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::UnknownAlias`] before invoking anything when
    /// `alias` is not registered, and [`FactoryError::Invocation`] holding the
    /// function's own error when the call fails.
    pub fn execute(&self, alias: &str, args: Arguments) -> FactoryResult<Value> {
        let function = self.get(alias)?;
        function.call(args).map_err(FactoryError::Invocation)
    }
}

/// Builder for [`FuncFactory`].
#[derive(Clone, Debug)]
pub struct FuncFactoryBuilder {
    group: String,
    namespaces: Vec<Namespace>,
    collision: CollisionPolicy,
    warn_if_empty: bool,
}

impl Default for FuncFactoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FuncFactoryBuilder {
    /// Creates a builder for [`DEFAULT_GROUP`] with no namespaces.
    #[must_use]
    pub fn new() -> Self {
        Self {
            group: DEFAULT_GROUP.to_owned(),
            namespaces: Vec::new(),
            collision: CollisionPolicy::default(),
            warn_if_empty: true,
        }
    }

    /// Prepares a builder from `config`, collecting each configured module.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::InvalidConfig`] for an invalid configuration and
    /// propagates [`FactoryError::DuplicateTag`] from collection.
    pub fn from_config(config: &FactoryConfig) -> FactoryResult<Self> {
        config.validate()?;
        let namespaces = config
            .namespaces
            .iter()
            .map(|path| Namespace::collect(path))
            .collect::<FactoryResult<Vec<_>>>()?;

        Ok(Self::new()
            .group(config.group.clone())
            .namespaces(namespaces)
            .collision(config.collision)
            .warn_if_empty(config.warn_if_empty))
    }

    /// Sets the group to collect.
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Appends one namespace to the scan list.
    #[must_use]
    pub fn namespace(mut self, namespace: Namespace) -> Self {
        self.namespaces.push(namespace);
        self
    }

    /// Appends namespaces to the scan list, preserving their order.
    #[must_use]
    pub fn namespaces(mut self, namespaces: impl IntoIterator<Item = Namespace>) -> Self {
        self.namespaces.extend(namespaces);
        self
    }

    /// Sets how repeated aliases are handled.
    #[must_use]
    pub fn collision(mut self, collision: CollisionPolicy) -> Self {
        self.collision = collision;
        self
    }

    /// Enables or disables the empty-registry warning.
    #[must_use]
    pub fn warn_if_empty(mut self, warn_if_empty: bool) -> Self {
        self.warn_if_empty = warn_if_empty;
        self
    }

    /// Scans the namespaces and builds the factory.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::DuplicateAlias`] when the collision policy is
    /// [`CollisionPolicy::Reject`] and two functions share an alias.
    pub fn build(self) -> FactoryResult<FuncFactory> {
        let Self {
            group,
            namespaces,
            collision,
            warn_if_empty,
        } = self;

        let scanned = scanner::scan(&group, &namespaces);
        let registry = Registry::build(&group, scanned, collision)?;
        debug!(group = %group, functions = registry.len(), "factory ready");

        let mut diagnostics = Vec::new();
        if registry.is_empty() {
            let diagnostic = Diagnostic::EmptyRegistry {
                group: group.clone(),
                namespaces: namespaces.iter().map(|ns| ns.name().to_owned()).collect(),
                known_groups: tag::known_groups(),
            };
            if warn_if_empty {
                warn!("{diagnostic}");
            }
            diagnostics.push(diagnostic);
        }

        Ok(FuncFactory {
            group,
            namespaces,
            registry,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::Register;
    use serde_json::json;

    fn add() -> Function {
        Function::new("add", |mut args: Arguments| {
            let a: i64 = args.take(0, "a")?;
            let b: i64 = args.take(1, "b")?;
            Ok(json!(a + b))
        })
    }

    #[test]
    fn execute_registered_alias() {
        let add = Register::new()
            .alias("sum")
            .group("factory-math")
            .apply(add())
            .unwrap();
        let factory =
            FuncFactory::with_group([Namespace::new("ops").with(add.clone())], "factory-math")
                .unwrap();

        assert_eq!(factory.registered_aliases(), ["sum"]);
        assert_eq!(factory.get("sum").unwrap(), &add);
        let out = factory
            .execute("sum", Arguments::new().arg(2).arg(3))
            .unwrap();
        assert_eq!(out, json!(5));
        assert!(factory.diagnostics().is_empty());
    }

    #[test]
    fn unknown_alias_does_not_invoke() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let counted = Function::new("counted", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        });
        let counted = Register::new().group("factory-count").apply(counted).unwrap();
        let factory =
            FuncFactory::with_group([Namespace::new("ops").with(counted)], "factory-count")
                .unwrap();

        let err = factory.get("missing").expect_err("unknown alias");
        assert!(err.is_unknown_alias());
        let err = factory
            .execute("missing", Arguments::new())
            .expect_err("unknown alias");
        assert!(
            matches!(err, FactoryError::UnknownAlias { alias, group } if alias == "missing" && group == "factory-count")
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        factory.execute("counted", Arguments::new()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_registry_records_diagnostic() {
        let factory = FuncFactory::builder()
            .group("factory-nothing")
            .namespace(Namespace::new("ops").with(add()))
            .warn_if_empty(false)
            .build()
            .unwrap();

        assert!(factory.is_empty());
        assert!(factory.registered_aliases().is_empty());
        let [Diagnostic::EmptyRegistry { group, namespaces, .. }] = factory.diagnostics() else {
            panic!("expected one empty-registry diagnostic");
        };
        assert_eq!(group, "factory-nothing");
        assert_eq!(namespaces, &["ops"]);
    }

    #[test]
    fn invocation_error_is_passed_through() {
        #[derive(Debug, thiserror::Error)]
        #[error("boom")]
        struct Boom;

        let failing = Function::new("fail", |_| Err(Boom.into()));
        let failing = Register::new().group("factory-fail").apply(failing).unwrap();
        let factory =
            FuncFactory::with_group([Namespace::new("ops").with(failing)], "factory-fail")
                .unwrap();

        let err = factory
            .execute("fail", Arguments::new())
            .expect_err("function fails");
        assert_eq!(err.to_string(), "boom");
        let FactoryError::Invocation(inner) = err else {
            panic!("expected invocation error");
        };
        assert!(inner.downcast_ref::<Boom>().is_some());
    }

    #[test]
    fn debug_lists_aliases() {
        let ping = Register::new()
            .group("factory-debug")
            .apply(Function::new("ping", |_| Ok(json!("pong"))))
            .unwrap();
        let factory =
            FuncFactory::with_group([Namespace::new("ops").with(ping)], "factory-debug").unwrap();
        let rendered = format!("{factory:?}");
        assert!(rendered.contains("ping"));
        assert!(rendered.contains("factory-debug"));
    }
}
