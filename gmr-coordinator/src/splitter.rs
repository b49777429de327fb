use crate::error::SubmitError;

/// One fragment of a job's input, bound for a single map task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// Position in the input; also the task id suffix.
    pub index: usize,

    /// Lowercased tokens joined by single spaces.
    pub text: String,
}

impl Split {
    pub fn split_id(&self) -> String {
        format!("split_{}", self.index)
    }
}

/// Lowercase `text`, tokenize it on whitespace and group the tokens into
/// fragments of `fragment_size` tokens. The last fragment holds the
/// remainder; empty input yields no fragments.
pub fn split(text: &str, fragment_size: usize) -> Result<Vec<Split>, SubmitError> {
    if fragment_size == 0 {
        return Err(SubmitError::InvalidSplitSize(0));
    }

    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();

    Ok(tokens
        .chunks(fragment_size)
        .enumerate()
        .map(|(index, chunk)| Split {
            index,
            text: chunk.join(" "),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(splits: &[Split]) -> Vec<String> {
        splits
            .iter()
            .flat_map(|s| s.text.split(' ').map(str::to_string))
            .collect()
    }

    #[test]
    fn chunk_count_is_ceiling() {
        for (n, size, expected) in [(0, 3, 0), (1, 3, 1), (3, 3, 1), (4, 3, 2), (300, 100, 3)] {
            let text = vec!["w"; n].join(" ");
            assert_eq!(split(&text, size).unwrap().len(), expected, "n={} size={}", n, size);
        }
    }

    #[test]
    fn concatenation_rebuilds_lowercased_tokens() {
        let text = "The  quick\tBrown\nfox JUMPS over the lazy dog";
        let splits = split(text, 4).unwrap();
        let expected: Vec<String> = text
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        assert_eq!(tokens(&splits), expected);
        assert_eq!(splits[2].text, "dog");
    }

    #[test]
    fn indices_are_sequential() {
        let splits = split("a b c d e", 2).unwrap();
        let ids: Vec<String> = splits.iter().map(Split::split_id).collect();
        assert_eq!(ids, vec!["split_0", "split_1", "split_2"]);
    }

    #[test]
    fn zero_fragment_size_is_rejected() {
        assert_eq!(split("a b", 0), Err(SubmitError::InvalidSplitSize(0)));
    }

    #[test]
    fn whitespace_only_input_has_no_fragments() {
        assert!(split(" \n\t ", 10).unwrap().is_empty());
    }
}
