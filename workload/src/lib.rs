//! Converts logic descriptors to actual map and reduce code.
//!
//! Workers never execute user-supplied code. A job names one registered
//! map transform and one registered reduce transform, optionally with
//! arguments, and the worker looks them up here.
//!
//! # Example
//!
//! ```
//! # use anyhow::Result;
//! use serde_json::json;
//! use common::LogicDescriptor;
//! # fn main() -> Result<()> {
//! let map = workload::Descriptor::from_logic(&LogicDescriptor(json!({"name": "wc"})))?;
//! let pairs = workload::run_map(&map, "a b a")?;
//! assert_eq!(pairs["a"].len(), 2);
//! # Ok(())
//! # }
//! ```

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use common::protocol::{JobResult, KeyValues};
use common::LogicDescriptor;

pub mod aggregate;
pub mod grep;
pub mod length;
pub mod wc;

/////////////////////////////////////////////////////////////////////////////
// Transform types
/////////////////////////////////////////////////////////////////////////////

/// A single emitted key-value pair.
#[derive(Clone, PartialEq, Debug)]
pub struct KeyValue {
    /// The key.
    pub key: String,

    /// The value.
    pub value: Value,
}

impl KeyValue {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The output of a map transform.
///
/// There are 2 layers of [`anyhow::Result`]s here. The outer layer
/// accounts for errors that arise while creating the iterator.
/// The inner layer accounts for errors that occur during iteration.
///
/// Map transforms emit atomic values (one per occurrence), never
/// pre-aggregated counts.
pub type MapOutput<'a> = Result<Box<dyn Iterator<Item = Result<KeyValue>> + 'a>>;

/// A map transform takes the text of one split and its arguments.
pub type MapFn = for<'a> fn(text: &'a str, args: &'a [String]) -> MapOutput<'a>;

/// A reduce transform folds every value seen for `key` into one value.
pub type ReduceFn =
    fn(key: &str, values: Box<dyn Iterator<Item = &Value> + '_>, args: &[String]) -> Result<Value>;

/////////////////////////////////////////////////////////////////////////////
// Registry
/////////////////////////////////////////////////////////////////////////////

/// Gets the map transform named `name`.
///
/// Returns [`None`] if no transform with the given name was found.
pub fn try_map_named(name: &str) -> Option<MapFn> {
    match name {
        "wc" => Some(wc::map),
        "grep" => Some(grep::map),
        "length" => Some(length::map),
        _ => None,
    }
}

/// Gets the reduce transform named `name`.
///
/// Returns [`None`] if no transform with the given name was found.
pub fn try_reduce_named(name: &str) -> Option<ReduceFn> {
    match name {
        "sum" => Some(aggregate::sum),
        "count" => Some(aggregate::count),
        "max" => Some(aggregate::max),
        "min" => Some(aggregate::min),
        _ => None,
    }
}

/// Gets the map transform named `name`, or an error naming it.
pub fn map_named(name: &str) -> Result<MapFn> {
    match try_map_named(name) {
        Some(f) => Ok(f),
        None => bail!("No map transform named `{}` found.", name),
    }
}

/// Gets the reduce transform named `name`, or an error naming it.
pub fn reduce_named(name: &str) -> Result<ReduceFn> {
    match try_reduce_named(name) {
        Some(f) => Ok(f),
        None => bail!("No reduce transform named `{}` found.", name),
    }
}

/////////////////////////////////////////////////////////////////////////////
// Descriptors
/////////////////////////////////////////////////////////////////////////////

/// The worker-side reading of a [`LogicDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Registered transform name.
    pub name: String,

    /// Arguments handed to the transform.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Descriptor {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Interpret an opaque descriptor received over the wire.
    pub fn from_logic(logic: &LogicDescriptor) -> Result<Self> {
        serde_json::from_value(logic.0.clone())
            .map_err(|e| anyhow!("invalid logic descriptor {}: {}", logic.0, e))
    }

    pub fn to_logic(&self) -> LogicDescriptor {
        LogicDescriptor(serde_json::json!({ "name": self.name, "args": self.args }))
    }
}

/// Run a map descriptor over the text of one split and group what it
/// emits by key.
pub fn run_map(descriptor: &Descriptor, text: &str) -> Result<KeyValues> {
    let map_fn = map_named(&descriptor.name)?;

    let mut grouped = KeyValues::new();
    for kv in map_fn(text, &descriptor.args)? {
        let kv = kv?;
        grouped.entry(kv.key).or_default().push(kv.value);
    }
    Ok(grouped)
}

/// Run a reduce descriptor over every key of a partition.
pub fn run_reduce(descriptor: &Descriptor, data: &KeyValues) -> Result<JobResult> {
    let reduce_fn = reduce_named(&descriptor.name)?;

    data.iter()
        .map(|(key, values)| {
            let reduced = reduce_fn(key, Box::new(values.iter()), &descriptor.args)
                .with_context(|| format!("reducing key `{}`", key))?;
            Ok((key.clone(), reduced))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_names_are_rejected() {
        assert!(try_map_named("exec").is_none());
        assert!(reduce_named("eval").is_err());
    }

    #[test]
    fn descriptor_args_default_to_empty() {
        let d = Descriptor::from_logic(&LogicDescriptor(json!({"name": "sum"}))).unwrap();
        assert_eq!(d, Descriptor::new("sum", vec![]));
    }

    #[test]
    fn descriptor_must_be_an_object() {
        assert!(Descriptor::from_logic(&LogicDescriptor(json!("def map_fn(x): ..."))).is_err());
    }

    #[test]
    fn word_count_end_to_end() {
        let map = Descriptor::new("wc", vec![]);
        let reduce = Descriptor::new("sum", vec![]);

        let grouped = run_map(&map, "a b a").unwrap();
        assert_eq!(grouped["a"], vec![json!(1), json!(1)]);

        let result = run_reduce(&reduce, &grouped).unwrap();
        assert_eq!(result["a"], json!(2));
        assert_eq!(result["b"], json!(1));
    }
}
