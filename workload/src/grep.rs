//! Counts the tokens that contain a search term.

use clap::Parser;

use crate::{KeyValue, MapOutput};

#[derive(Parser, Debug)]
#[clap(no_binary_name = true)]
struct Args {
    /// Substring a token must contain.
    term: String,

    /// Only match tokens equal to the term.
    #[clap(long)]
    exact: bool,
}

pub fn map<'a>(text: &'a str, args: &'a [String]) -> MapOutput<'a> {
    let args = Args::try_parse_from(args)?;
    let term = args.term.to_lowercase();
    let exact = args.exact;

    let iter = text
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(move |word| {
            if exact {
                *word == term
            } else {
                word.contains(term.as_str())
            }
        })
        .map(|word| Ok(KeyValue::new(word, 1)));
    Ok(Box::new(iter))
}
