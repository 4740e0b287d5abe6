use std::sync::Arc;

use lore_config::Config;
use lore_domain::RankedCandidate;
use lore_index::Corpus;

use crate::{BoxFuture, EmbeddingProvider, Error, Result, SemanticProvider};

/// Any backend that can produce a ranked candidate list for a query. Rank
/// fusion only sees this capability, so sources stay interchangeable and
/// testable with fakes.
pub trait RankingSource
where
	Self: Send + Sync,
{
	fn name(&self) -> &'static str;

	fn search<'a>(
		&'a self,
		query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<RankedCandidate>>>;
}

/// The in-process BM25 index.
pub struct LexicalBackend {
	corpus: Arc<Corpus>,
}
impl LexicalBackend {
	pub fn new(corpus: Arc<Corpus>) -> Self {
		Self { corpus }
	}
}
impl RankingSource for LexicalBackend {
	fn name(&self) -> &'static str {
		"lexical"
	}

	fn search<'a>(
		&'a self,
		query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<RankedCandidate>>> {
		let candidates = self.corpus.search(query, limit as usize);

		Box::pin(async move { Ok(candidates) })
	}
}

/// The remote vector service, reached as embed-then-search. Both hops run
/// under the providers' own timeouts; failures surface to the orchestrator,
/// which degrades to the other source rather than failing the request.
pub struct SemanticBackend {
	cfg: Arc<Config>,
	embedding: Arc<dyn EmbeddingProvider>,
	semantic: Arc<dyn SemanticProvider>,
}
impl SemanticBackend {
	pub fn new(
		cfg: Arc<Config>,
		embedding: Arc<dyn EmbeddingProvider>,
		semantic: Arc<dyn SemanticProvider>,
	) -> Self {
		Self { cfg, embedding, semantic }
	}
}
impl RankingSource for SemanticBackend {
	fn name(&self) -> &'static str {
		"semantic"
	}

	fn search<'a>(
		&'a self,
		query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<RankedCandidate>>> {
		Box::pin(async move {
			let texts = [query.to_string()];
			let vectors = self.embedding.embed(&self.cfg.providers.embedding, &texts).await?;
			let vector = vectors.into_iter().next().ok_or_else(|| Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			})?;

			if vector.len() != self.cfg.providers.embedding.dimensions as usize {
				return Err(Error::Provider {
					message: "Embedding vector dimension mismatch.".to_string(),
				});
			}

			let hits = self.semantic.search(&self.cfg.providers.semantic, &vector, limit).await?;

			Ok(hits
				.into_iter()
				.enumerate()
				.map(|(index, hit)| RankedCandidate {
					passage_id: hit.passage_id,
					score: hit.score,
					rank: index as u32 + 1,
				})
				.collect())
		})
	}
}
