//! Histogram of token lengths, keyed by the length in characters.

use crate::{KeyValue, MapOutput};

pub fn map<'a>(text: &'a str, _args: &'a [String]) -> MapOutput<'a> {
    let iter = text
        .split_whitespace()
        .map(|word| Ok(KeyValue::new(word.chars().count().to_string(), 1)));
    Ok(Box::new(iter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_lengths() {
        let keys: Vec<String> = map("a bb ccc ñu", &[])
            .unwrap()
            .map(|kv| kv.unwrap().key)
            .collect();
        assert_eq!(keys, vec!["1", "2", "3", "2"]);
    }
}
