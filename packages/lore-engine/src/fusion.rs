use std::cmp::Ordering;

use ahash::AHashMap;
use uuid::Uuid;

use lore_domain::RankedCandidate;

/// One ranking source's contribution to fusion: its candidates in rank
/// order and its configured weight.
#[derive(Debug, Clone)]
pub struct SourceRanking {
	pub name: &'static str,
	pub weight: f32,
	pub candidates: Vec<RankedCandidate>,
}

/// A passage's fused standing across all sources. Ordering is fused score
/// descending; ties prefer the passage some source found earliest, then
/// the smaller identifier for determinism.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedCandidate {
	pub passage_id: Uuid,
	pub score: f32,
	pub best_rank: u32,
}

/// Reciprocal Rank Fusion across any number of sources.
///
/// A passage at 1-based rank `r` in a source contributes `w / (k + r)`,
/// which only depends on rank, never on the source's raw score scale.
/// Weights are renormalized to sum to one, so scaling every weight by the
/// same factor changes nothing. The output is the full fused ranking;
/// truncation is the caller's job and happens after permission filtering.
pub fn reciprocal_rank_fusion(sources: &[SourceRanking], k: u32) -> Vec<FusedCandidate> {
	let total_weight: f32 = sources.iter().map(|source| source.weight).sum();

	if total_weight <= 0.0 {
		return Vec::new();
	}

	let mut fused: AHashMap<Uuid, FusedCandidate> = AHashMap::new();

	for source in sources {
		let weight = source.weight / total_weight;

		if weight <= 0.0 {
			continue;
		}

		for candidate in &source.candidates {
			let contribution = weight / (k as f32 + candidate.rank as f32);
			let entry = fused.entry(candidate.passage_id).or_insert(FusedCandidate {
				passage_id: candidate.passage_id,
				score: 0.0,
				best_rank: u32::MAX,
			});

			entry.score += contribution;
			entry.best_rank = entry.best_rank.min(candidate.rank);
		}
	}

	let mut ranking: Vec<FusedCandidate> = fused.into_values().collect();

	ranking.sort_by(|a, b| {
		b.score
			.partial_cmp(&a.score)
			.unwrap_or(Ordering::Equal)
			.then_with(|| a.best_rank.cmp(&b.best_rank))
			.then_with(|| a.passage_id.cmp(&b.passage_id))
	});

	ranking
}

#[cfg(test)]
mod tests {
	use super::*;

	fn id(byte: u8) -> Uuid {
		Uuid::from_bytes([byte; 16])
	}

	fn ranking(name: &'static str, weight: f32, ids: &[u8]) -> SourceRanking {
		let candidates = ids
			.iter()
			.enumerate()
			.map(|(index, byte)| RankedCandidate {
				passage_id: id(*byte),
				score: 1.0 / (index as f32 + 1.0),
				rank: index as u32 + 1,
			})
			.collect();

		SourceRanking { name, weight, candidates }
	}

	#[test]
	fn single_source_reduces_to_its_own_order() {
		let source = ranking("lexical", 1.0, &[3, 1, 2]);
		let fused = reciprocal_rank_fusion(&[source], 60);
		let order: Vec<Uuid> = fused.iter().map(|candidate| candidate.passage_id).collect();

		assert_eq!(order, vec![id(3), id(1), id(2)]);
	}

	#[test]
	fn passage_in_both_top_threes_beats_either_sources_favourite() {
		let lexical = ranking("lexical", 1.0, &[1, 5, 2]);
		let semantic = ranking("semantic", 1.0, &[3, 5, 4]);
		let fused = reciprocal_rank_fusion(&[lexical, semantic], 60);

		assert_eq!(fused[0].passage_id, id(5));
	}

	#[test]
	fn dominance_in_every_source_is_preserved() {
		// Passage 1 outranks passage 2 in both sources.
		let lexical = ranking("lexical", 1.0, &[1, 2, 3]);
		let semantic = ranking("semantic", 1.0, &[3, 1, 2]);
		let fused = reciprocal_rank_fusion(&[lexical, semantic], 60);
		let position = |target: Uuid| {
			fused.iter().position(|candidate| candidate.passage_id == target).expect("present")
		};

		assert!(position(id(1)) < position(id(2)));
	}

	#[test]
	fn weight_scaling_does_not_change_ordering() {
		let small = [ranking("lexical", 0.5, &[1, 2]), ranking("semantic", 0.25, &[2, 3])];
		let large = [ranking("lexical", 2.0, &[1, 2]), ranking("semantic", 1.0, &[2, 3])];
		let order = |sources: &[SourceRanking]| {
			reciprocal_rank_fusion(sources, 60)
				.into_iter()
				.map(|candidate| candidate.passage_id)
				.collect::<Vec<_>>()
		};

		assert_eq!(order(&small), order(&large));
	}

	#[test]
	fn ties_break_on_best_rank_then_identifier() {
		// Passages 1 and 2 each appear in exactly one source at rank 2, so
		// their fused scores are identical and the identifier decides.
		let lexical = ranking("lexical", 1.0, &[3, 1]);
		let semantic = ranking("semantic", 1.0, &[3, 2]);
		let fused = reciprocal_rank_fusion(&[lexical, semantic], 60);

		assert_eq!(fused[0].passage_id, id(3));
		assert_eq!(fused[1].passage_id, id(1));
		assert_eq!(fused[2].passage_id, id(2));
	}

	#[test]
	fn zero_total_weight_yields_empty_ranking() {
		let source = ranking("lexical", 0.0, &[1, 2]);

		assert!(reciprocal_rank_fusion(&[source], 60).is_empty());
	}

	#[test]
	fn absent_sources_contribute_nothing() {
		let lexical = ranking("lexical", 1.0, &[1]);
		let semantic = ranking("semantic", 1.0, &[]);
		let fused = reciprocal_rank_fusion(&[lexical, semantic], 60);

		assert_eq!(fused.len(), 1);
		// Half the normalized weight at rank one.
		assert!((fused[0].score - 0.5 / 61.0).abs() < 1e-6);
	}
}
