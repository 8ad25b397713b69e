//! Transcript cleanup before submission

use std::sync::LazyLock;

use regex::Regex;

/// Repeats of one sentence kept in a row
pub const MAX_REPEATS: usize = 2;

/// Sentence body followed by its terminal punctuation, if any
static SENTENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]*").expect("valid regex"));

/// Collapse runs of the same sentence to at most `max_repeats`
///
/// Recognizers sometimes loop on one phrase; comparison is case-insensitive.
#[must_use]
pub fn dedupe_repetitions(text: &str, max_repeats: usize) -> String {
    let mut runs: Vec<(&str, usize)> = Vec::new();

    for sentence in SENTENCE_REGEX.find_iter(text) {
        let sentence = sentence.as_str().trim();
        if sentence.is_empty() {
            continue;
        }
        match runs.last_mut() {
            Some((last, count)) if last.to_lowercase() == sentence.to_lowercase() => *count += 1,
            _ => runs.push((sentence, 1)),
        }
    }

    runs.into_iter()
        .flat_map(|(sentence, count)| std::iter::repeat_n(sentence, count.min(max_repeats)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a transcript for submission
#[must_use]
pub fn prepare_submission(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    dedupe_repetitions(&collapsed, MAX_REPEATS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_long_runs() {
        assert_eq!(
            dedupe_repetitions("Thank you. Thank you. thank you. Thank you.", 2),
            "Thank you. Thank you."
        );
    }

    #[test]
    fn keeps_distinct_sentences() {
        assert_eq!(
            dedupe_repetitions("Turn on the lights. Thanks! Turn on the lights.", 2),
            "Turn on the lights. Thanks! Turn on the lights."
        );
    }

    #[test]
    fn trailing_fragment_without_punctuation() {
        assert_eq!(dedupe_repetitions("Hi. Hi. Hi. what now", 1), "Hi. what now");
    }

    #[test]
    fn prepare_collapses_whitespace() {
        assert_eq!(prepare_submission("  hello   world \n"), "hello world");
        assert_eq!(prepare_submission("   "), "");
    }
}
