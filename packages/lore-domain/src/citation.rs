use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use uuid::Uuid;

static CITATION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"\[\[([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})\]\]",
	)
	.expect("Citation marker pattern must compile.")
});

/// Renders the inline marker the generation backend is instructed to emit.
pub fn citation_marker(id: Uuid) -> String {
	format!("[[{id}]]")
}

/// Removes citation markers that reference passages outside the supplied
/// context and returns the surviving citations in order of first appearance.
///
/// A marker pointing at an unknown passage is a hallucinated citation; it is
/// stripped from the text rather than trusted verbatim.
pub fn sanitize_citations(text: &str, allowed: &HashSet<Uuid>) -> (String, Vec<Uuid>) {
	let mut cited = Vec::new();
	let mut seen = HashSet::new();
	let cleaned = CITATION_MARKER.replace_all(text, |caps: &regex::Captures<'_>| {
		match Uuid::parse_str(&caps[1]) {
			Ok(id) if allowed.contains(&id) => {
				if seen.insert(id) {
					cited.push(id);
				}

				caps[0].to_string()
			},
			_ => String::new(),
		}
	});

	(cleaned.into_owned(), cited)
}
