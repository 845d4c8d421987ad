//! Tag functions where they are defined, then discover and dispatch them by alias.
//!
//! A function is tagged with a group and an alias, either explicitly with
//! [`Register`] or with the `#[register]` attribute. A [`FuncFactory`] built
//! for one group over an ordered list of [`Namespace`]s collects every function
//! tagged for that group and exposes it for lookup and invocation by alias.
//!
//! ```
//! use func_factory::{Arguments, FuncFactory, Function, Namespace, Register};
//!
//! let add = Function::new("add", |mut args: Arguments| {
//!     let a: i64 = args.take(0, "a")?;
//!     let b: i64 = args.take(1, "b")?;
//!     Ok((a + b).into())
//! });
//! let ops = Namespace::new("ops").with(Register::new().alias("sum").group("math").apply(add)?);
//!
//! let factory = FuncFactory::with_group([ops], "math")?;
//! let out = factory.execute("sum", Arguments::new().arg(2).arg(3))?;
//! assert_eq!(out, 5);
//! # Ok::<(), func_factory::FactoryError>(())
//! ```

#![warn(missing_docs, clippy::pedantic)]

extern crate self as func_factory;

mod config;
mod error;
mod factory;
mod function;
mod namespace;
mod registry;
mod scanner;
mod tag;

pub use config::FactoryConfig;
pub use error::{FactoryError, FactoryResult};
pub use factory::{Diagnostic, FuncFactory, FuncFactoryBuilder};
pub use function::{Arguments, Function, FunctionBody, FunctionId};
pub use namespace::{Namespace, Registration};
pub use registry::{CollisionPolicy, Registry};
pub use scanner::{Tagged, scan};
pub use tag::{DEFAULT_GROUP, Register, Tag, known_groups, record_key};

/// Attribute that registers a free function for discovery.
///
/// See the `func-factory-macros` crate for the accepted arguments.
#[cfg(feature = "macros")]
pub use func_factory_macros::register;

#[doc(hidden)]
pub mod __private {
    pub use anyhow;
    pub use inventory;
    pub use serde_json;
}
