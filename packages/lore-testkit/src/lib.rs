//! Test fixtures shared across the workspace: a canned configuration,
//! deterministic passage builders, and fake providers for every backend the
//! engine reaches.

use std::{
	collections::{BTreeMap, HashSet},
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use serde_json::Map;
use time::OffsetDateTime;
use uuid::Uuid;

use lore_config::{
	Answer, AuthzProviderConfig, Config, EmbeddingProviderConfig, GenerationProviderConfig,
	Permissions, ProviderConfig, Providers as ProvidersConfig, Search, SemanticProviderConfig,
	Service,
};
use lore_domain::{Passage, PassageKind};
use lore_engine::{
	AuthorizationProvider, BoxFuture, EmbeddingProvider, GenerationProvider, NOT_FOUND_ANSWER,
	Providers, RerankProvider, SemanticProvider,
};
use lore_providers::SemanticHit;

pub fn passage_id(byte: u8) -> Uuid {
	Uuid::from_bytes([byte; 16])
}

pub fn passage(byte: u8, text: &str) -> Passage {
	Passage {
		id: passage_id(byte),
		document_id: Uuid::from_bytes([0xD0, byte, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
		text: text.to_string(),
		token_count: text.split_whitespace().count() as u32,
		kind: PassageKind::Prose,
		position: u32::from(byte),
		last_modified: OffsetDateTime::now_utc(),
		tags: BTreeMap::new(),
	}
}

pub fn passage_aged(byte: u8, text: &str, age_days: i64) -> Passage {
	let mut built = passage(byte, text);

	built.last_modified = OffsetDateTime::now_utc() - time::Duration::days(age_days);

	built
}

pub fn passage_tagged(byte: u8, text: &str, tags: &[(&str, &str)]) -> Passage {
	let mut built = passage(byte, text);

	built.tags = tags.iter().map(|(key, value)| (key.to_string(), value.to_string())).collect();

	built
}

pub fn sample_config() -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		search: Search {
			method: "hybrid".to_string(),
			top_k: 5,
			candidate_k: 50,
			rrf_k: 60,
			lexical_weight: 1.0,
			semantic_weight: 1.0,
			rerank_enabled: false,
			request_timeout_ms: 5_000,
		},
		permissions: Permissions { ttl_secs: 300, max_concurrent_checks: 4 },
		answer: Answer {
			context_token_budget: 4_000,
			staleness_max_age_days: 180,
			min_relevance: 0.0,
		},
		providers: ProvidersConfig {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://localhost".to_string(),
				api_key: "key".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "test-embed".to_string(),
				dimensions: 4,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			semantic: SemanticProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://localhost".to_string(),
				api_key: "key".to_string(),
				path: "/v1/points/query".to_string(),
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			rerank: ProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://localhost".to_string(),
				api_key: "key".to_string(),
				path: "/v1/rerank".to_string(),
				model: "test-rerank".to_string(),
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			generation: GenerationProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://localhost".to_string(),
				api_key: "key".to_string(),
				path: "/v1/completions".to_string(),
				model: "test-llm".to_string(),
				temperature: 0.0,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			authorization: AuthzProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://localhost".to_string(),
				api_key: "key".to_string(),
				path: "/v1/can_access".to_string(),
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
	}
}

fn provider_error(message: &str) -> lore_providers::Error {
	lore_providers::Error::InvalidResponse { message: message.to_string() }
}

pub struct DummyEmbedding;
impl EmbeddingProvider for DummyEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, lore_providers::Result<Vec<Vec<f32>>>> {
		let dim = (cfg.dimensions as usize).max(1);
		let vector = vec![0.0; dim];

		Box::pin(async move { Ok(vec![vector; texts.len()]) })
	}
}

pub struct FailingEmbedding;
impl EmbeddingProvider for FailingEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_texts: &'a [String],
	) -> BoxFuture<'a, lore_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Err(provider_error("embedding backend offline")) })
	}
}

/// Returns a fixed hit list regardless of the query vector, truncated to
/// the requested limit.
pub struct StaticSemantic {
	pub hits: Vec<SemanticHit>,
}
impl SemanticProvider for StaticSemantic {
	fn search<'a>(
		&'a self,
		_cfg: &'a SemanticProviderConfig,
		_embedding: &'a [f32],
		limit: u32,
	) -> BoxFuture<'a, lore_providers::Result<Vec<SemanticHit>>> {
		let hits: Vec<SemanticHit> = self.hits.iter().copied().take(limit as usize).collect();

		Box::pin(async move { Ok(hits) })
	}
}

pub struct FailingSemantic;
impl SemanticProvider for FailingSemantic {
	fn search<'a>(
		&'a self,
		_cfg: &'a SemanticProviderConfig,
		_embedding: &'a [f32],
		_limit: u32,
	) -> BoxFuture<'a, lore_providers::Result<Vec<SemanticHit>>> {
		Box::pin(async move { Err(provider_error("vector service offline")) })
	}
}

/// Scores every document zero, which keeps the fused order under the
/// engine's stable sort.
pub struct DummyRerank;
impl RerankProvider for DummyRerank {
	fn rerank<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		_query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, lore_providers::Result<Vec<f32>>> {
		let scores = vec![0.0; docs.len()];

		Box::pin(async move { Ok(scores) })
	}
}

/// Scores documents by position from the supplied list; missing positions
/// score zero.
pub struct ScriptedRerank {
	pub scores: Vec<f32>,
}
impl RerankProvider for ScriptedRerank {
	fn rerank<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		_query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, lore_providers::Result<Vec<f32>>> {
		let scores: Vec<f32> = (0..docs.len())
			.map(|index| self.scores.get(index).copied().unwrap_or(0.0))
			.collect();

		Box::pin(async move { Ok(scores) })
	}
}

pub struct FailingRerank;
impl RerankProvider for FailingRerank {
	fn rerank<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		_query: &'a str,
		_docs: &'a [String],
	) -> BoxFuture<'a, lore_providers::Result<Vec<f32>>> {
		Box::pin(async move { Err(provider_error("rerank backend offline")) })
	}
}

pub struct CannedGeneration {
	pub text: String,
}
impl GenerationProvider for CannedGeneration {
	fn generate<'a>(
		&'a self,
		_cfg: &'a GenerationProviderConfig,
		_prompt: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<String>> {
		let text = self.text.clone();

		Box::pin(async move { Ok(text) })
	}
}

pub struct SlowGeneration {
	pub delay_ms: u64,
	pub text: String,
}
impl GenerationProvider for SlowGeneration {
	fn generate<'a>(
		&'a self,
		_cfg: &'a GenerationProviderConfig,
		_prompt: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<String>> {
		let delay = Duration::from_millis(self.delay_ms);
		let text = self.text.clone();

		Box::pin(async move {
			tokio::time::sleep(delay).await;

			Ok(text)
		})
	}
}

pub struct FailingGeneration;
impl GenerationProvider for FailingGeneration {
	fn generate<'a>(
		&'a self,
		_cfg: &'a GenerationProviderConfig,
		_prompt: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<String>> {
		Box::pin(async move { Err(provider_error("generation backend offline")) })
	}
}

pub struct AllowAll {
	pub calls: Arc<AtomicUsize>,
}
impl AllowAll {
	pub fn new() -> Self {
		Self { calls: Arc::new(AtomicUsize::new(0)) }
	}
}
impl Default for AllowAll {
	fn default() -> Self {
		Self::new()
	}
}
impl AuthorizationProvider for AllowAll {
	fn can_access<'a>(
		&'a self,
		_cfg: &'a AuthzProviderConfig,
		_identity: &'a str,
		_passage_id: Uuid,
	) -> BoxFuture<'a, lore_providers::Result<bool>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move { Ok(true) })
	}
}

pub struct DenyAll;
impl AuthorizationProvider for DenyAll {
	fn can_access<'a>(
		&'a self,
		_cfg: &'a AuthzProviderConfig,
		_identity: &'a str,
		_passage_id: Uuid,
	) -> BoxFuture<'a, lore_providers::Result<bool>> {
		Box::pin(async move { Ok(false) })
	}
}

/// Allows exactly the listed passages, for any identity, and counts live
/// calls so cache behaviour is observable.
pub struct ScriptedAuthorization {
	pub allowed: HashSet<Uuid>,
	pub calls: Arc<AtomicUsize>,
}
impl ScriptedAuthorization {
	pub fn new(allowed: impl IntoIterator<Item = Uuid>) -> Self {
		Self { allowed: allowed.into_iter().collect(), calls: Arc::new(AtomicUsize::new(0)) }
	}
}
impl AuthorizationProvider for ScriptedAuthorization {
	fn can_access<'a>(
		&'a self,
		_cfg: &'a AuthzProviderConfig,
		_identity: &'a str,
		passage_id: Uuid,
	) -> BoxFuture<'a, lore_providers::Result<bool>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let allowed = self.allowed.contains(&passage_id);

		Box::pin(async move { Ok(allowed) })
	}
}

pub struct FailingAuthorization;
impl AuthorizationProvider for FailingAuthorization {
	fn can_access<'a>(
		&'a self,
		_cfg: &'a AuthzProviderConfig,
		_identity: &'a str,
		_passage_id: Uuid,
	) -> BoxFuture<'a, lore_providers::Result<bool>> {
		Box::pin(async move { Err(provider_error("authorization backend offline")) })
	}
}

/// Benign defaults: zero-vector embeddings, no semantic hits, order-keeping
/// rerank, a fixed generation reply, and allow-all authorization. Tests
/// swap individual fields for the behaviour under test.
pub fn fake_providers() -> Providers {
	Providers {
		embedding: Arc::new(DummyEmbedding),
		semantic: Arc::new(StaticSemantic { hits: Vec::new() }),
		rerank: Arc::new(DummyRerank),
		generation: Arc::new(CannedGeneration { text: NOT_FOUND_ANSWER.to_string() }),
		authorization: Arc::new(AllowAll::new()),
	}
}
