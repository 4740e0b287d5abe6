use std::collections::BTreeMap;

use time::OffsetDateTime;
use uuid::Uuid;

/// Structural type of a passage, as produced by the upstream indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassageKind {
	Prose,
	Table,
	Code,
}

/// An immutable unit of retrievable text. Created at ingestion time; the
/// engine only ever reads it by identifier.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Passage {
	pub id: Uuid,
	pub document_id: Uuid,
	pub text: String,
	pub token_count: u32,
	pub kind: PassageKind,
	/// Ordinal position within the owning document.
	pub position: u32,
	#[serde(with = "crate::time_serde")]
	pub last_modified: OffsetDateTime,
	/// Categorical tags (topic, audience, document kind) for optional
	/// request-side filtering.
	#[serde(default)]
	pub tags: BTreeMap<String, String>,
}

impl Passage {
	/// A passage matches when every requested tag is present with the same
	/// value. An empty filter map matches everything.
	pub fn matches_tags(&self, filters: &BTreeMap<String, String>) -> bool {
		filters.iter().all(|(key, value)| self.tags.get(key) == Some(value))
	}
}

/// One ranking source's view of a passage: score on the source's own scale
/// plus the 1-based rank within that source. Ephemeral, per-query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedCandidate {
	pub passage_id: Uuid,
	pub score: f32,
	pub rank: u32,
}
