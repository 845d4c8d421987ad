//! Callable handles and the arguments passed to them.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, anyhow, bail};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::tag::{self, Tag};

/// Signature every registered function is adapted to.
pub type FunctionBody = dyn Fn(Arguments) -> anyhow::Result<Value> + Send + Sync;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Function`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct FunctionId(u64);

impl FunctionId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for FunctionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "fn#{}", self.0)
    }
}

/// Shared handle to a callable unit.
///
/// Cloning is cheap and preserves identity: two handles compare equal only if
/// they were cloned from the same [`Function::new`] call. Tags attached to a
/// function live in a side-table keyed by its [`FunctionId`] and are dropped
/// together with the last handle.
#[derive(Clone)]
pub struct Function {
    inner: Arc<Inner>,
}

struct Inner {
    id: FunctionId,
    name: String,
    body: Box<FunctionBody>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        tag::forget(self.id);
    }
}

impl Function {
    /// Wraps `body` as a callable declared under `name`.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Arguments) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                id: FunctionId::next(),
                name: name.into(),
                body: Box::new(body),
            }),
        }
    }

    /// Returns the identity of this function.
    #[must_use]
    pub fn id(&self) -> FunctionId {
        self.inner.id
    }

    /// Returns the declared name, used as the alias when none is given.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Invokes the function.
    ///
    /// # Errors
    ///
    /// Returns whatever error the function body produces.
    pub fn call(&self, args: Arguments) -> anyhow::Result<Value> {
        (self.inner.body)(args)
    }

    /// Returns the tag attached for `group`, if any.
    #[must_use]
    pub fn tag(&self, group: &str) -> Option<Tag> {
        tag::lookup(self.id(), &tag::record_key(group))
    }

    /// Returns every tag attached to this function, ordered by group.
    #[must_use]
    pub fn tags(&self) -> Vec<Tag> {
        tag::attached(self.id())
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Function {}

impl std::hash::Hash for Function {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

/// Positional and keyword arguments for a [`Function`] call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arguments {
    positional: Vec<Value>,
    keyword: Map<String, Value>,
}

impl Arguments {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a keyword argument, replacing an earlier value with the same name.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    /// Positional values in call order.
    #[must_use]
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// Keyword values by name.
    #[must_use]
    pub fn keyword(&self) -> &Map<String, Value> {
        &self.keyword
    }

    /// Total number of supplied arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    /// Returns `true` when no arguments were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Removes and decodes the parameter declared at `index` under `name`.
    ///
    /// The keyword form wins when present; an empty `name` only matches
    /// positionally.
    ///
    /// # Errors
    ///
    /// Fails when the argument is missing, supplied both ways, or cannot be
    /// decoded into `T`.
    pub fn take<T: DeserializeOwned>(&mut self, index: usize, name: &str) -> anyhow::Result<T> {
        let keyword = if name.is_empty() {
            None
        } else {
            self.keyword.remove(name)
        };
        let value = match keyword {
            Some(_) if index < self.positional.len() => {
                bail!("got multiple values for argument `{name}`")
            }
            Some(value) => value,
            None => match self.positional.get_mut(index) {
                Some(slot) => std::mem::take(slot),
                // Parameters that accept null, such as `Option<T>`, may be omitted.
                None => {
                    return serde_json::from_value(Value::Null).map_err(|_| {
                        anyhow!("missing required argument `{name}` (position {index})")
                    });
                }
            },
        };

        serde_json::from_value(value)
            .with_context(|| format!("argument `{name}` (position {index}) has an unexpected type"))
    }

    /// Verifies that nothing beyond the first `arity` parameters was supplied.
    ///
    /// # Errors
    ///
    /// Fails on surplus positional values or unconsumed keyword arguments.
    pub fn finish(self, arity: usize) -> anyhow::Result<()> {
        if self.positional.len() > arity {
            bail!(
                "takes {arity} positional argument(s) but {} were given",
                self.positional.len()
            );
        }
        if let Some(name) = self.keyword.keys().next() {
            bail!("got an unexpected keyword argument `{name}`");
        }
        Ok(())
    }
}

impl<V: Into<Value>> FromIterator<V> for Arguments {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            positional: iter.into_iter().map(Into::into).collect(),
            keyword: Map::new(),
        }
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(positional: Vec<Value>) -> Self {
        Self {
            positional,
            keyword: Map::new(),
        }
    }
}
