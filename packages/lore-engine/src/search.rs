use std::{
	collections::BTreeMap,
	sync::Arc,
	time::{Duration, Instant},
};

use time::OffsetDateTime;
use uuid::Uuid;

use lore_domain::{Passage, PassageKind, RankedCandidate};

use crate::{
	Engine, Error, Result,
	answer::Answer,
	backends::RankingSource,
	fusion::{FusedCandidate, SourceRanking, reciprocal_rank_fusion},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
	Lexical,
	Semantic,
	Hybrid,
}
impl SearchMethod {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Lexical => "lexical",
			Self::Semantic => "semantic",
			Self::Hybrid => "hybrid",
		}
	}

	fn from_config(raw: &str) -> Self {
		match raw {
			"lexical" => Self::Lexical,
			"semantic" => Self::Semantic,
			_ => Self::Hybrid,
		}
	}
}

/// Per-request options. Every field is explicit and defaulted from config;
/// nothing ambient is read mid-request.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SearchOptions {
	pub top_k: Option<u32>,
	pub method: Option<SearchMethod>,
	pub include_answer: Option<bool>,
	#[serde(default)]
	pub filters: BTreeMap<String, String>,
	pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchRequest {
	pub query: String,
	pub identity: String,
	#[serde(default)]
	pub options: SearchOptions,
}

/// Milestones of one request's pipeline. The response carries the last
/// milestone that completed, so a degraded response says where it stopped
/// instead of relying on an exception for early return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
	Received,
	FannedOut,
	Fused,
	Filtered,
	Reranked,
	Assembled,
	Returned,
	Failed,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchItem {
	pub passage_id: Uuid,
	pub document_id: Uuid,
	pub text: String,
	pub kind: PassageKind,
	pub position: u32,
	#[serde(with = "lore_domain::time_serde")]
	pub last_modified: OffsetDateTime,
	pub tags: BTreeMap<String, String>,
	pub score: f32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchResponse {
	pub results: Vec<SearchItem>,
	pub answer: Option<Answer>,
	pub took_ms: u64,
	pub degraded: bool,
	pub method: SearchMethod,
	pub stage: PipelineStage,
}

/// A permitted passage carrying its current pipeline score (fused RRF
/// score, replaced by the rerank score when the reranker runs).
#[derive(Debug, Clone)]
pub(crate) struct ScoredPassage {
	pub(crate) passage: Arc<Passage>,
	pub(crate) score: f32,
}

impl Engine {
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let started = Instant::now();
		let query = req.query.trim().to_string();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query is required.".to_string() });
		}

		let identity = req.identity.trim().to_string();

		if identity.is_empty() {
			return Err(Error::InvalidRequest { message: "identity is required.".to_string() });
		}

		let cfg = self.config();
		let top_k = req.options.top_k.unwrap_or(cfg.search.top_k).max(1);
		let candidate_k = cfg.search.candidate_k.max(top_k);
		let method =
			req.options.method.unwrap_or_else(|| SearchMethod::from_config(&cfg.search.method));
		let include_answer = req.options.include_answer.unwrap_or(true);
		let timeout_ms = req.options.timeout_ms.unwrap_or(cfg.search.request_timeout_ms);
		let deadline = started + Duration::from_millis(timeout_ms);
		let mut stage = PipelineStage::Received;
		let mut degraded = false;

		let (sources, fan_out_degraded) =
			self.fan_out(&query, method, candidate_k, deadline).await.inspect_err(|err| {
				tracing::error!(error = %err, method = method.as_str(), "Retrieval failed.");
			})?;

		degraded |= fan_out_degraded;
		stage = advance(stage, PipelineStage::FannedOut);

		let fused = reciprocal_rank_fusion(&sources, cfg.search.rrf_k);

		stage = advance(stage, PipelineStage::Fused);

		let fused = self.resolve_and_filter_tags(fused, &req.options.filters);
		let permitted = self.permissions.filter(&identity, fused).await;

		stage = advance(stage, PipelineStage::Filtered);

		let mut ranked: Vec<ScoredPassage> = permitted
			.into_iter()
			.filter_map(|candidate| {
				self.corpus()
					.get(candidate.passage_id)
					.map(|passage| ScoredPassage { passage, score: candidate.score })
			})
			.collect();

		if cfg.search.rerank_enabled && !ranked.is_empty() && Instant::now() < deadline {
			let (reranked, ran) =
				self.apply_rerank(&query, ranked, top_k as usize, deadline).await;

			ranked = reranked;

			if ran {
				stage = advance(stage, PipelineStage::Reranked);
			}
		} else {
			ranked.truncate(top_k as usize);
		}

		let results: Vec<SearchItem> = ranked
			.iter()
			.map(|scored| SearchItem {
				passage_id: scored.passage.id,
				document_id: scored.passage.document_id,
				text: scored.passage.text.clone(),
				kind: scored.passage.kind,
				position: scored.passage.position,
				last_modified: scored.passage.last_modified,
				tags: scored.passage.tags.clone(),
				score: scored.score,
			})
			.collect();
		let mut answer = None;

		if include_answer {
			if Instant::now() >= deadline {
				degraded = true;

				tracing::warn!(
					"Request deadline exceeded before answer assembly; returning ranked results \
					 only."
				);
			} else {
				match self.assemble(&query, &ranked, deadline).await {
					Some(assembled) => {
						answer = Some(assembled);
						stage = advance(stage, PipelineStage::Assembled);
					},
					None => degraded = true,
				}
			}
		}
		if answer.is_some() || !include_answer {
			stage = advance(stage, PipelineStage::Returned);
		}

		let took_ms = started.elapsed().as_millis() as u64;

		tracing::info!(
			method = method.as_str(),
			results = results.len(),
			degraded,
			took_ms,
			"Search completed."
		);

		Ok(SearchResponse { results, answer, took_ms, degraded, method, stage })
	}

	/// Runs the requested ranking sources concurrently and waits for both
	/// or the deadline, whichever comes first. One failed source degrades
	/// the response; all sources failing fails the request.
	async fn fan_out(
		&self,
		query: &str,
		method: SearchMethod,
		limit: u32,
		deadline: Instant,
	) -> Result<(Vec<SourceRanking>, bool)> {
		let cfg = self.config();
		let remaining = deadline.saturating_duration_since(Instant::now());

		match method {
			SearchMethod::Lexical =>
				self.single_source(&*self.lexical, query, limit, remaining).await,
			SearchMethod::Semantic =>
				self.single_source(&*self.semantic, query, limit, remaining).await,
			SearchMethod::Hybrid => {
				let lexical_task = spawn_source(self.lexical.clone(), query.to_string(), limit);
				let semantic_task = spawn_source(self.semantic.clone(), query.to_string(), limit);
				let lexical_abort = lexical_task.abort_handle();
				let semantic_abort = semantic_task.abort_handle();
				let joined = tokio::time::timeout(remaining, async {
					tokio::join!(lexical_task, semantic_task)
				})
				.await;
				let Ok((lexical_joined, semantic_joined)) = joined else {
					lexical_abort.abort();
					semantic_abort.abort();
					tracing::warn!(
						"Ranking fan-out hit the request deadline; returning best-effort \
						 results."
					);

					return Ok((Vec::new(), true));
				};

				match (flatten(lexical_joined), flatten(semantic_joined)) {
					(Ok(lexical), Ok(semantic)) => Ok((
						vec![
							SourceRanking {
								name: "lexical",
								weight: cfg.search.lexical_weight,
								candidates: lexical,
							},
							SourceRanking {
								name: "semantic",
								weight: cfg.search.semantic_weight,
								candidates: semantic,
							},
						],
						false,
					)),
					(Ok(lexical), Err(err)) => {
						tracing::warn!(
							error = %err,
							"Semantic source failed; degrading to lexical-only results."
						);

						Ok((
							vec![SourceRanking {
								name: "lexical",
								weight: cfg.search.lexical_weight,
								candidates: lexical,
							}],
							true,
						))
					},
					(Err(err), Ok(semantic)) => {
						tracing::warn!(
							error = %err,
							"Lexical source failed; degrading to semantic-only results."
						);

						Ok((
							vec![SourceRanking {
								name: "semantic",
								weight: cfg.search.semantic_weight,
								candidates: semantic,
							}],
							true,
						))
					},
					(Err(lexical_err), Err(semantic_err)) => Err(Error::RetrievalUnavailable {
						message: format!(
							"Both ranking sources failed: {lexical_err}; {semantic_err}"
						),
					}),
				}
			},
		}
	}

	async fn single_source(
		&self,
		source: &dyn RankingSource,
		query: &str,
		limit: u32,
		remaining: Duration,
	) -> Result<(Vec<SourceRanking>, bool)> {
		match tokio::time::timeout(remaining, source.search(query, limit)).await {
			Ok(Ok(candidates)) =>
				Ok((vec![SourceRanking { name: source.name(), weight: 1.0, candidates }], false)),
			Ok(Err(err)) => Err(Error::RetrievalUnavailable {
				message: format!("The {} source failed: {err}", source.name()),
			}),
			Err(_) => {
				tracing::warn!(
					source = source.name(),
					"Ranking source hit the request deadline; returning best-effort results."
				);

				Ok((Vec::new(), true))
			},
		}
	}

	/// Resolves fused candidates against the corpus and applies the
	/// request's tag filters. Identifiers the corpus no longer knows (e.g.
	/// deleted passages still present in the remote vector index) drop out
	/// here.
	fn resolve_and_filter_tags(
		&self,
		fused: Vec<FusedCandidate>,
		filters: &BTreeMap<String, String>,
	) -> Vec<FusedCandidate> {
		fused
			.into_iter()
			.filter(|candidate| {
				self.corpus()
					.get(candidate.passage_id)
					.is_some_and(|passage| passage.matches_tags(filters))
			})
			.collect()
	}
}

fn advance(from: PipelineStage, to: PipelineStage) -> PipelineStage {
	tracing::debug!(from = ?from, to = ?to, "Pipeline stage advanced.");

	to
}

fn spawn_source(
	source: Arc<dyn RankingSource>,
	query: String,
	limit: u32,
) -> tokio::task::JoinHandle<Result<Vec<RankedCandidate>>> {
	tokio::spawn(async move { source.search(&query, limit).await })
}

fn flatten(
	joined: std::result::Result<Result<Vec<RankedCandidate>>, tokio::task::JoinError>,
) -> Result<Vec<RankedCandidate>> {
	match joined {
		Ok(result) => result,
		Err(err) => Err(Error::Provider { message: format!("Ranking task failed: {err}") }),
	}
}
