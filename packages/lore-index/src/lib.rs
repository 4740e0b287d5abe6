mod inverted;
pub mod tokenizer;

use std::sync::{Arc, RwLock};

use ahash::AHashMap;
use uuid::Uuid;

use lore_domain::{Passage, RankedCandidate};

use crate::inverted::InvertedIndex;

/// In-memory passage corpus with a lexical index over it.
///
/// Shared between the ingestion surface (upsert/delete) and the retrieval
/// engine (search, read-by-id); interior locking keeps both safe from
/// concurrent requests.
#[derive(Debug, Default)]
pub struct Corpus {
	inner: RwLock<CorpusInner>,
}

#[derive(Debug, Default)]
struct CorpusInner {
	passages: AHashMap<Uuid, Arc<Passage>>,
	index: InvertedIndex,
}

impl Corpus {
	pub fn new() -> Self {
		Self::default()
	}

	/// Full replace of the corpus. Not incremental; callers that want
	/// incremental maintenance use [`Corpus::upsert`] and [`Corpus::delete`].
	pub fn build(&self, passages: Vec<Passage>) {
		let mut inner = self.inner.write().unwrap_or_else(|err| err.into_inner());

		inner.passages.clear();
		inner.index.clear();

		for passage in passages {
			inner.index.insert(passage.id, &passage.text);
			inner.passages.insert(passage.id, Arc::new(passage));
		}
	}

	/// Inserts or replaces passages. Re-upserting identical content is a
	/// no-op. Returns the number of passages actually (re)indexed.
	pub fn upsert(&self, passages: Vec<Passage>) -> usize {
		let mut inner = self.inner.write().unwrap_or_else(|err| err.into_inner());
		let mut changed = 0;

		for passage in passages {
			if inner.passages.get(&passage.id).is_some_and(|existing| **existing == passage) {
				continue;
			}

			inner.index.remove(passage.id);
			inner.index.insert(passage.id, &passage.text);
			inner.passages.insert(passage.id, Arc::new(passage));

			changed += 1;
		}

		changed
	}

	/// Removes passages by identifier. Unknown identifiers are ignored.
	/// Returns the number of passages removed.
	pub fn delete(&self, ids: &[Uuid]) -> usize {
		let mut inner = self.inner.write().unwrap_or_else(|err| err.into_inner());
		let mut removed = 0;

		for id in ids {
			if inner.passages.remove(id).is_some() {
				inner.index.remove(*id);

				removed += 1;
			}
		}

		removed
	}

	pub fn get(&self, id: Uuid) -> Option<Arc<Passage>> {
		let inner = self.inner.read().unwrap_or_else(|err| err.into_inner());

		inner.passages.get(&id).cloned()
	}

	pub fn search(&self, query: &str, limit: usize) -> Vec<RankedCandidate> {
		let inner = self.inner.read().unwrap_or_else(|err| err.into_inner());

		inner.index.search(query, limit)
	}

	pub fn len(&self) -> usize {
		let inner = self.inner.read().unwrap_or_else(|err| err.into_inner());

		inner.passages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use time::OffsetDateTime;

	use lore_domain::PassageKind;

	use super::*;

	fn passage(byte: u8, text: &str) -> Passage {
		Passage {
			id: Uuid::from_bytes([byte; 16]),
			document_id: Uuid::from_bytes([0xAA; 16]),
			text: text.to_string(),
			token_count: text.split_whitespace().count() as u32,
			kind: PassageKind::Prose,
			position: u32::from(byte),
			last_modified: OffsetDateTime::UNIX_EPOCH,
			tags: BTreeMap::new(),
		}
	}

	#[test]
	fn build_replaces_previous_contents() {
		let corpus = Corpus::new();

		corpus.build(vec![passage(1, "onboarding checklist")]);
		corpus.build(vec![passage(2, "security training")]);

		assert_eq!(corpus.len(), 1);
		assert!(corpus.get(Uuid::from_bytes([1; 16])).is_none());
		assert!(corpus.search("onboarding", 10).is_empty());
		assert_eq!(corpus.search("security", 10).len(), 1);
	}

	#[test]
	fn upsert_with_identical_content_is_a_no_op() {
		let corpus = Corpus::new();

		assert_eq!(corpus.upsert(vec![passage(1, "travel policy")]), 1);
		assert_eq!(corpus.upsert(vec![passage(1, "travel policy")]), 0);
		assert_eq!(corpus.upsert(vec![passage(1, "updated travel policy")]), 1);
		assert_eq!(corpus.len(), 1);
	}

	#[test]
	fn delete_is_idempotent() {
		let corpus = Corpus::new();
		let id = Uuid::from_bytes([1; 16]);

		corpus.upsert(vec![passage(1, "old guidance")]);

		assert_eq!(corpus.delete(&[id]), 1);
		assert_eq!(corpus.delete(&[id]), 0);
		assert!(corpus.get(id).is_none());
	}

	#[test]
	fn search_reflects_upserted_text() {
		let corpus = Corpus::new();

		corpus.upsert(vec![
			passage(1, "PTO accrual schedule"),
			passage(2, "paid time off request form"),
		]);

		let results = corpus.search("PTO", 10);

		assert_eq!(results.len(), 1);
		assert_eq!(results[0].passage_id, Uuid::from_bytes([1; 16]));
	}
}
