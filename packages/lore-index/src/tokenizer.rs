use std::{collections::HashSet, sync::LazyLock};

/// Tokens shorter than this are noise (stray letters from punctuation
/// splits); two characters keeps product codes and abbreviations intact.
const MIN_TOKEN_CHARS: usize = 2;

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
	[
		"a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
		"it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
		"these", "they", "this", "to", "was", "will", "with",
	]
	.into_iter()
	.collect()
});

/// Case-folds, strips punctuation, and splits on word boundaries. No
/// stemming, so exact abbreviations and product codes stay matchable.
pub fn tokenize(text: &str) -> Vec<String> {
	let mut tokens = Vec::new();
	let mut current = String::new();

	for ch in text.chars() {
		if ch.is_alphanumeric() {
			for lower in ch.to_lowercase() {
				current.push(lower);
			}
		} else {
			flush(&mut tokens, &mut current);
		}
	}

	flush(&mut tokens, &mut current);

	tokens
}

fn flush(tokens: &mut Vec<String>, current: &mut String) {
	if current.chars().count() >= MIN_TOKEN_CHARS && !STOP_WORDS.contains(current.as_str()) {
		tokens.push(std::mem::take(current));
	} else {
		current.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn folds_case_and_strips_punctuation() {
		let tokens = tokenize("PTO policy: 15 days/year!");

		assert_eq!(tokens, vec!["pto", "policy", "15", "days", "year"]);
	}

	#[test]
	fn drops_stop_words_and_single_chars() {
		let tokens = tokenize("the quick brown fox in a box");

		assert!(!tokens.contains(&"the".to_string()));
		assert!(!tokens.contains(&"a".to_string()));
		assert!(tokens.contains(&"quick".to_string()));
	}

	#[test]
	fn keeps_abbreviations_unstemmed() {
		let tokens = tokenize("Submit the HR-240B form");

		assert!(tokens.contains(&"hr".to_string()));
		assert!(tokens.contains(&"240b".to_string()));
	}

	#[test]
	fn all_stopword_text_yields_no_tokens() {
		assert!(tokenize("the of and").is_empty());
		assert!(tokenize("").is_empty());
	}
}
