//! Command-line calculator whose operations are discovered from two modules.
//!
//! ```text
//! calculator sum 2 3
//! calculator --group text upper '"hello"'
//! calculator --list
//! ```

use anyhow::Result;
use clap::Parser;
use func_factory::{Arguments, FuncFactory, Namespace};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod basic {
    use func_factory::register;

    #[register(alias = "sum", group = "calc")]
    pub fn add(a: f64, b: f64) -> f64 {
        a + b
    }

    #[register(alias = "sub", group = "calc")]
    pub fn subtract(a: f64, b: f64) -> f64 {
        a - b
    }

    #[register(alias = "mul", group = "calc")]
    pub fn multiply(a: f64, b: f64) -> f64 {
        a * b
    }

    #[register(alias = "div", group = "calc")]
    pub fn divide(a: f64, b: f64) -> anyhow::Result<f64> {
        if b == 0.0 {
            anyhow::bail!("cannot divide {a} by zero");
        }
        Ok(a / b)
    }

    #[register(group = "text")]
    pub fn upper(text: String) -> String {
        text.to_uppercase()
    }
}

mod extended {
    use func_factory::register;

    #[register(alias = "pow", group = "calc")]
    pub fn power(base: f64, exponent: i32) -> f64 {
        base.powi(exponent)
    }

    /// Shadows `basic::divide` because this module is scanned last.
    #[register(alias = "div", group = "calc")]
    pub fn checked_divide(a: f64, b: f64) -> anyhow::Result<f64> {
        if b == 0.0 {
            anyhow::bail!("division by zero (dividend {a})");
        }
        Ok(a / b)
    }

    #[register(group = "text")]
    pub fn words(text: String) -> Vec<String> {
        text.split_whitespace().map(str::to_owned).collect()
    }
}

/// Dispatch an operation by alias.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Group to build the factory for.
    #[arg(long, default_value = "calc")]
    group: String,

    /// Print the registered aliases and exit.
    #[arg(long)]
    list: bool,

    /// Alias of the operation to run.
    #[arg(required_unless_present = "list")]
    alias: Option<String>,

    /// Arguments, parsed as JSON and falling back to plain strings.
    args: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let namespaces = [
        Namespace::collect(concat!(module_path!(), "::basic"))?,
        Namespace::collect(concat!(module_path!(), "::extended"))?,
    ];
    let factory = FuncFactory::with_group(namespaces, cli.group)?;

    if cli.list {
        for alias in factory.registered_aliases() {
            println!("{alias}");
        }
        return Ok(());
    }

    let Some(alias) = cli.alias else {
        return Ok(());
    };
    let args: Arguments = cli.args.iter().map(|raw| parse_arg(raw)).collect();
    info!(%alias, args = args.len(), "executing");

    let output = factory.execute(&alias, args)?;
    println!("{output}");
    Ok(())
}

fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}
