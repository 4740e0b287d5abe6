use std::time::Instant;

use crate::{Engine, search::ScoredPassage};

impl Engine {
	/// Reorders the already-permission-filtered candidates with the pairwise
	/// relevance backend and truncates to `limit`. The reranker never sees
	/// content the identity was denied, and a backend failure keeps the
	/// fused order unchanged instead of failing the request.
	///
	/// Returns the (possibly re-ordered) candidates and whether the
	/// reranker actually ran.
	pub(crate) async fn apply_rerank(
		&self,
		query: &str,
		ranked: Vec<ScoredPassage>,
		limit: usize,
		deadline: Instant,
	) -> (Vec<ScoredPassage>, bool) {
		let cfg = self.config();
		let remaining = deadline.saturating_duration_since(Instant::now());
		let docs: Vec<String> =
			ranked.iter().map(|scored| scored.passage.text.clone()).collect();
		let outcome = tokio::time::timeout(
			remaining,
			self.providers.rerank.rerank(&cfg.providers.rerank, query, &docs),
		)
		.await;
		let scores = match outcome {
			Ok(Ok(scores)) if scores.len() == ranked.len() => scores,
			Ok(Ok(scores)) => {
				tracing::warn!(
					expected = ranked.len(),
					received = scores.len(),
					"Rerank provider returned mismatched score count; keeping fused order."
				);

				return (truncated(ranked, limit), false);
			},
			Ok(Err(err)) => {
				tracing::warn!(error = %err, "Rerank provider failed; keeping fused order.");

				return (truncated(ranked, limit), false);
			},
			Err(_) => {
				tracing::warn!("Rerank provider hit the request deadline; keeping fused order.");

				return (truncated(ranked, limit), false);
			},
		};
		let mut rescored: Vec<ScoredPassage> = ranked
			.into_iter()
			.zip(scores)
			.map(|(scored, score)| ScoredPassage { passage: scored.passage, score })
			.collect();

		// Stable sort: equal rerank scores keep the fused order.
		rescored.sort_by(|a, b| {
			b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal)
		});
		rescored.truncate(limit);

		(rescored, true)
	}
}

fn truncated(mut ranked: Vec<ScoredPassage>, limit: usize) -> Vec<ScoredPassage> {
	ranked.truncate(limit);

	ranked
}
