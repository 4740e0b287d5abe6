use ahash::AHashMap;
use uuid::Uuid;

use lore_domain::RankedCandidate;

use crate::tokenizer::tokenize;

const BM25_K1: f32 = 1.2;
const BM25_B: f32 = 0.75;

#[derive(Debug, Clone, Copy)]
struct Posting {
	passage_id: Uuid,
	term_frequency: u32,
}

/// Term-frequency inverted index over tokenized passage text, scored with
/// BM25 saturation and length normalization.
#[derive(Debug, Default)]
pub(crate) struct InvertedIndex {
	postings: AHashMap<String, Vec<Posting>>,
	doc_lengths: AHashMap<Uuid, u32>,
	total_tokens: u64,
}

impl InvertedIndex {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn clear(&mut self) {
		self.postings.clear();
		self.doc_lengths.clear();
		self.total_tokens = 0;
	}

	/// Indexes one passage. The caller removes any previous entry for the
	/// same identifier first.
	pub(crate) fn insert(&mut self, passage_id: Uuid, text: &str) {
		let tokens = tokenize(text);
		let mut frequencies: AHashMap<&str, u32> = AHashMap::new();

		for token in &tokens {
			*frequencies.entry(token.as_str()).or_insert(0) += 1;
		}

		self.doc_lengths.insert(passage_id, tokens.len() as u32);
		self.total_tokens += tokens.len() as u64;

		for (term, term_frequency) in frequencies {
			self.postings
				.entry(term.to_string())
				.or_default()
				.push(Posting { passage_id, term_frequency });
		}
	}

	pub(crate) fn remove(&mut self, passage_id: Uuid) {
		let Some(length) = self.doc_lengths.remove(&passage_id) else {
			return;
		};

		self.total_tokens -= u64::from(length);
		self.postings.retain(|_, postings| {
			postings.retain(|posting| posting.passage_id != passage_id);

			!postings.is_empty()
		});
	}

	pub(crate) fn doc_count(&self) -> usize {
		self.doc_lengths.len()
	}

	fn average_doc_length(&self) -> f32 {
		if self.doc_lengths.is_empty() {
			return 0.0;
		}

		self.total_tokens as f32 / self.doc_lengths.len() as f32
	}

	/// Ranked BM25 matches, best first. Zero-score passages are excluded, so
	/// an empty or all-stopword query yields an empty result, not an error.
	pub(crate) fn search(&self, query: &str, limit: usize) -> Vec<RankedCandidate> {
		let query_tokens = tokenize(query);

		if query_tokens.is_empty() || self.doc_lengths.is_empty() || limit == 0 {
			return Vec::new();
		}

		let average_length = self.average_doc_length();
		let corpus_size = self.doc_lengths.len() as f32;
		let mut scores: AHashMap<Uuid, f32> = AHashMap::new();

		for token in &query_tokens {
			let Some(postings) = self.postings.get(token.as_str()) else {
				continue;
			};
			let document_frequency = postings.len() as f32;
			let idf =
				((corpus_size - document_frequency + 0.5) / (document_frequency + 0.5) + 1.0).ln();

			for posting in postings {
				let length = self
					.doc_lengths
					.get(&posting.passage_id)
					.copied()
					.unwrap_or_default() as f32;
				let term_frequency = posting.term_frequency as f32;
				let saturated = (term_frequency * (BM25_K1 + 1.0))
					/ (term_frequency
						+ BM25_K1 * (1.0 - BM25_B + BM25_B * length / average_length));

				*scores.entry(posting.passage_id).or_insert(0.0) += idf * saturated;
			}
		}

		let mut ranked: Vec<(Uuid, f32)> =
			scores.into_iter().filter(|(_, score)| *score > 0.0).collect();

		ranked.sort_by(|a, b| {
			b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0))
		});
		ranked.truncate(limit);
		ranked
			.into_iter()
			.enumerate()
			.map(|(index, (passage_id, score))| RankedCandidate {
				passage_id,
				score,
				rank: index as u32 + 1,
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn id(byte: u8) -> Uuid {
		Uuid::from_bytes([byte; 16])
	}

	fn sample_index() -> InvertedIndex {
		let mut index = InvertedIndex::new();

		index.insert(id(1), "PTO accrues at fifteen days per year");
		index.insert(id(2), "Paid time off requests go through the portal");
		index.insert(id(3), "Expense reports are due monthly");

		index
	}

	#[test]
	fn scores_are_non_increasing() {
		let mut index = InvertedIndex::new();

		index.insert(id(1), "pto pto pto");
		index.insert(id(2), "pto policy details");
		index.insert(id(3), "pto");

		let results = index.search("pto", 10);

		assert!(results.len() >= 2);
		for pair in results.windows(2) {
			assert!(pair[0].score >= pair[1].score);
		}
		for (index, candidate) in results.iter().enumerate() {
			assert_eq!(candidate.rank, index as u32 + 1);
		}
	}

	#[test]
	fn literal_abbreviation_matches_only_the_literal_passage() {
		let index = sample_index();
		let results = index.search("PTO", 10);

		assert_eq!(results.len(), 1);
		assert_eq!(results[0].passage_id, id(1));
	}

	#[test]
	fn empty_and_stopword_queries_yield_empty_results() {
		let index = sample_index();

		assert!(index.search("", 10).is_empty());
		assert!(index.search("the of and", 10).is_empty());
	}

	#[test]
	fn unmatched_query_yields_no_zero_score_padding() {
		let index = sample_index();

		assert!(index.search("kubernetes", 10).is_empty());
	}

	#[test]
	fn remove_drops_postings_and_lengths() {
		let mut index = sample_index();

		index.remove(id(1));

		assert_eq!(index.doc_count(), 2);
		assert!(index.search("PTO", 10).is_empty());

		// Removing twice is a no-op.
		index.remove(id(1));
		assert_eq!(index.doc_count(), 2);
	}

	#[test]
	fn limit_truncates_after_ranking() {
		let mut index = InvertedIndex::new();

		for byte in 1..=5 {
			index.insert(id(byte), "quarterly planning notes");
		}

		let results = index.search("planning", 2);

		assert_eq!(results.len(), 2);
	}
}
