//! Numeric reduce transforms.

use anyhow::{anyhow, bail, Result};
use serde_json::Value;

fn number(key: &str, value: &Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| anyhow!("value {} for key `{}` is not a number", value, key))
}

/// Sums the values. Stays integral while every value is an integer.
pub fn sum(
    key: &str,
    values: Box<dyn Iterator<Item = &Value> + '_>,
    _args: &[String],
) -> Result<Value> {
    let mut int_total: Option<i64> = Some(0);
    let mut float_total = 0.0;

    for value in values {
        float_total += number(key, value)?;
        int_total = match (int_total, value.as_i64()) {
            (Some(total), Some(v)) => total.checked_add(v),
            _ => None,
        };
    }

    Ok(match int_total {
        Some(total) => Value::from(total),
        None => Value::from(float_total),
    })
}

/// Number of values, whatever they are.
pub fn count(
    _key: &str,
    values: Box<dyn Iterator<Item = &Value> + '_>,
    _args: &[String],
) -> Result<Value> {
    Ok(Value::from(values.count()))
}

fn extreme<'v>(
    key: &str,
    values: Box<dyn Iterator<Item = &'v Value> + '_>,
    keep: fn(f64, f64) -> bool,
) -> Result<Value> {
    let mut best: Option<(f64, &Value)> = None;
    for value in values {
        let n = number(key, value)?;
        match best {
            Some((current, _)) if !keep(n, current) => {}
            _ => best = Some((n, value)),
        }
    }

    match best {
        Some((_, value)) => Ok(value.clone()),
        None => bail!("no values for key `{}`", key),
    }
}

pub fn max(
    key: &str,
    values: Box<dyn Iterator<Item = &Value> + '_>,
    _args: &[String],
) -> Result<Value> {
    extreme(key, values, |candidate, current| candidate > current)
}

pub fn min(
    key: &str,
    values: Box<dyn Iterator<Item = &Value> + '_>,
    _args: &[String],
) -> Result<Value> {
    extreme(key, values, |candidate, current| candidate < current)
}
