use std::{collections::HashSet, time::Instant};

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use lore_domain::{citation, evidence_is_stale};

use crate::{Engine, search::ScoredPassage};

/// The fixed reply for queries the knowledge base cannot support. The
/// generation prompt instructs the backend to emit exactly this text, and
/// the assembler returns it directly when no passage clears the relevance
/// floor.
pub const NOT_FOUND_ANSWER: &str = "Not found in knowledge base.";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Answer {
	pub text: String,
	/// Passage identifiers actually cited, in order of first appearance.
	pub citations: Vec<Uuid>,
	pub warnings: Vec<String>,
}

impl Engine {
	/// Builds the bounded, citation-bearing answer from the ranked permitted
	/// passages. Returns `None` only when the generation backend failed or
	/// timed out; the caller degrades the response instead of fabricating
	/// an answer.
	pub(crate) async fn assemble(
		&self,
		query: &str,
		ranked: &[ScoredPassage],
		deadline: Instant,
	) -> Option<Answer> {
		let cfg = self.config();

		if !clears_relevance_floor(ranked, cfg.answer.min_relevance) {
			return Some(not_found());
		}

		let context = select_context(ranked, cfg.answer.context_token_budget);

		if context.is_empty() {
			return Some(not_found());
		}

		let prompt = build_answer_prompt(query, &context);
		let remaining = deadline.saturating_duration_since(Instant::now());
		let generated = match tokio::time::timeout(
			remaining,
			self.providers.generation.generate(&cfg.providers.generation, &prompt),
		)
		.await
		{
			Ok(Ok(text)) => text,
			Ok(Err(err)) => {
				tracing::warn!(error = %err, "Generation backend failed; returning results without an answer.");

				return None;
			},
			Err(_) => {
				tracing::warn!(
					"Generation backend hit the request deadline; returning results without an \
					 answer."
				);

				return None;
			},
		};
		let allowed: HashSet<Uuid> = context.iter().map(|scored| scored.passage.id).collect();
		let (text, citations) = citation::sanitize_citations(&generated, &allowed);
		let mut warnings = Vec::new();
		let cited_stamps: Vec<OffsetDateTime> = context
			.iter()
			.filter(|scored| citations.contains(&scored.passage.id))
			.map(|scored| scored.passage.last_modified)
			.collect();
		let now = OffsetDateTime::now_utc();

		if evidence_is_stale(&cited_stamps, now, cfg.answer.staleness_max_age_days) {
			let newest = cited_stamps
				.iter()
				.max()
				.and_then(|stamp| stamp.format(&Rfc3339).ok())
				.unwrap_or_else(|| "an unknown date".to_string());

			warnings.push(format!(
				"The best supporting evidence was last modified {newest} and may be out of date."
			));
		}

		Some(Answer { text, citations, warnings })
	}
}

fn not_found() -> Answer {
	Answer { text: NOT_FOUND_ANSWER.to_string(), citations: Vec::new(), warnings: Vec::new() }
}

fn clears_relevance_floor(ranked: &[ScoredPassage], min_relevance: f32) -> bool {
	ranked.first().is_some_and(|top| top.score >= min_relevance)
}

/// Keeps the best-ranked passages that fit the context budget whole.
/// Lowest-ranked passages are dropped first; a passage is never split.
fn select_context(ranked: &[ScoredPassage], token_budget: u32) -> Vec<&ScoredPassage> {
	let mut selected = Vec::new();
	let mut used = 0u32;

	for scored in ranked {
		let Some(next) = used.checked_add(scored.passage.token_count) else {
			break;
		};

		if next > token_budget {
			break;
		}

		used = next;
		selected.push(scored);
	}

	selected
}

fn build_answer_prompt(query: &str, context: &[&ScoredPassage]) -> String {
	let mut prompt = String::from(
		"You are the answer engine for an internal knowledge base. Answer the question using \
		 only the passages below. Cite every claim with the marker of the passage that supports \
		 it, exactly as written, e.g. [[00000000-0000-0000-0000-000000000000]]. If the passages \
		 do not contain the answer, reply exactly \"Not found in knowledge base.\" Do not use \
		 outside knowledge.\n",
	);

	for scored in context {
		let modified = scored
			.passage
			.last_modified
			.format(&Rfc3339)
			.unwrap_or_else(|_| "unknown".to_string());

		prompt.push_str(&format!(
			"\nPassage {} (last modified {modified}):\n{}\n",
			citation::citation_marker(scored.passage.id),
			scored.passage.text,
		));
	}

	prompt.push_str(&format!("\nQuestion: {query}\n"));

	prompt
}

#[cfg(test)]
mod tests {
	use std::{collections::BTreeMap, sync::Arc};

	use lore_domain::{Passage, PassageKind};

	use super::*;

	fn scored(byte: u8, token_count: u32, score: f32) -> ScoredPassage {
		ScoredPassage {
			passage: Arc::new(Passage {
				id: Uuid::from_bytes([byte; 16]),
				document_id: Uuid::from_bytes([0xAA; 16]),
				text: format!("passage {byte}"),
				token_count,
				kind: PassageKind::Prose,
				position: u32::from(byte),
				last_modified: OffsetDateTime::UNIX_EPOCH,
				tags: BTreeMap::new(),
			}),
			score,
		}
	}

	#[test]
	fn context_selection_never_splits_a_passage() {
		let ranked = vec![scored(1, 400, 0.9), scored(2, 400, 0.8), scored(3, 400, 0.7)];
		let context = select_context(&ranked, 900);

		assert_eq!(context.len(), 2);
		assert_eq!(context[0].passage.id, Uuid::from_bytes([1; 16]));
	}

	#[test]
	fn oversized_top_passage_yields_empty_context() {
		let ranked = vec![scored(1, 5_000, 0.9)];

		assert!(select_context(&ranked, 900).is_empty());
	}

	#[test]
	fn relevance_floor_rejects_weak_top_candidates() {
		let ranked = vec![scored(1, 10, 0.01)];

		assert!(clears_relevance_floor(&ranked, 0.0));
		assert!(!clears_relevance_floor(&ranked, 0.5));
		assert!(!clears_relevance_floor(&[], 0.0));
	}

	#[test]
	fn prompt_carries_markers_and_question() {
		let ranked = vec![scored(1, 10, 0.9)];
		let context = select_context(&ranked, 100);
		let prompt = build_answer_prompt("How much PTO do I get?", &context);

		assert!(prompt.contains(&citation::citation_marker(Uuid::from_bytes([1; 16]))));
		assert!(prompt.contains("Question: How much PTO do I get?"));
		assert!(prompt.contains("Not found in knowledge base."));
	}
}
