//! Word count: one `1` per token.

use crate::{KeyValue, MapOutput};

pub fn map<'a>(text: &'a str, _args: &'a [String]) -> MapOutput<'a> {
    let iter = text
        .split_whitespace()
        .map(|word| Ok(KeyValue::new(word.to_lowercase(), 1)));
    Ok(Box::new(iter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_one_marker_per_occurrence() {
        let out: Vec<KeyValue> = map("To be or NOT to be", &[])
            .unwrap()
            .collect::<anyhow::Result<_>>()
            .unwrap();
        assert_eq!(out.len(), 6);
        assert_eq!(out.iter().filter(|kv| kv.key == "to").count(), 2);
        assert!(out.iter().all(|kv| kv.value == serde_json::json!(1)));
    }
}
