pub mod answer;
pub mod backends;
pub mod fusion;
pub mod permission;
pub mod rerank;
pub mod search;

mod error;

pub use answer::{Answer, NOT_FOUND_ANSWER};
pub use error::{Error, Result};
pub use fusion::{FusedCandidate, SourceRanking, reciprocal_rank_fusion};
pub use permission::PermissionFilter;
pub use search::{
	PipelineStage, SearchItem, SearchMethod, SearchOptions, SearchRequest, SearchResponse,
};

use std::{future::Future, pin::Pin, sync::Arc};

use uuid::Uuid;

use lore_config::{
	AuthzProviderConfig, Config, EmbeddingProviderConfig, GenerationProviderConfig, ProviderConfig,
	SemanticProviderConfig,
};
use lore_index::Corpus;
use lore_providers::SemanticHit;

use crate::backends::{LexicalBackend, SemanticBackend};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, lore_providers::Result<Vec<Vec<f32>>>>;
}

pub trait SemanticProvider
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		cfg: &'a SemanticProviderConfig,
		embedding: &'a [f32],
		limit: u32,
	) -> BoxFuture<'a, lore_providers::Result<Vec<SemanticHit>>>;
}

pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, lore_providers::Result<Vec<f32>>>;
}

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<String>>;
}

pub trait AuthorizationProvider
where
	Self: Send + Sync,
{
	fn can_access<'a>(
		&'a self,
		cfg: &'a AuthzProviderConfig,
		identity: &'a str,
		passage_id: Uuid,
	) -> BoxFuture<'a, lore_providers::Result<bool>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub semantic: Arc<dyn SemanticProvider>,
	pub rerank: Arc<dyn RerankProvider>,
	pub generation: Arc<dyn GenerationProvider>,
	pub authorization: Arc<dyn AuthorizationProvider>,
}
impl Providers {
	/// Providers backed by the real HTTP adapters.
	pub fn http() -> Self {
		let default = Arc::new(DefaultProviders);

		Self {
			embedding: default.clone(),
			semantic: default.clone(),
			rerank: default.clone(),
			generation: default.clone(),
			authorization: default,
		}
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, lore_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(lore_providers::embedding::embed(cfg, texts))
	}
}
impl SemanticProvider for DefaultProviders {
	fn search<'a>(
		&'a self,
		cfg: &'a SemanticProviderConfig,
		embedding: &'a [f32],
		limit: u32,
	) -> BoxFuture<'a, lore_providers::Result<Vec<SemanticHit>>> {
		Box::pin(lore_providers::semantic::search(cfg, embedding, limit))
	}
}
impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, lore_providers::Result<Vec<f32>>> {
		Box::pin(lore_providers::rerank::rerank(cfg, query, docs))
	}
}
impl GenerationProvider for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, lore_providers::Result<String>> {
		Box::pin(lore_providers::generation::generate(cfg, prompt))
	}
}
impl AuthorizationProvider for DefaultProviders {
	fn can_access<'a>(
		&'a self,
		cfg: &'a AuthzProviderConfig,
		identity: &'a str,
		passage_id: Uuid,
	) -> BoxFuture<'a, lore_providers::Result<bool>> {
		Box::pin(lore_providers::authorization::can_access(cfg, identity, passage_id))
	}
}

/// The retrieval orchestrator plus everything it coordinates: ranking
/// backends, rank fusion, the permission filter, and answer assembly.
pub struct Engine {
	cfg: Arc<Config>,
	corpus: Arc<Corpus>,
	providers: Providers,
	permissions: PermissionFilter,
	lexical: Arc<LexicalBackend>,
	semantic: Arc<SemanticBackend>,
}
impl Engine {
	pub fn new(cfg: Config, corpus: Arc<Corpus>, providers: Providers) -> Self {
		let cfg = Arc::new(cfg);
		let permissions = PermissionFilter::new(
			providers.authorization.clone(),
			cfg.providers.authorization.clone(),
			&cfg.permissions,
		);
		let lexical = Arc::new(LexicalBackend::new(corpus.clone()));
		let semantic = Arc::new(SemanticBackend::new(
			cfg.clone(),
			providers.embedding.clone(),
			providers.semantic.clone(),
		));

		Self { cfg, corpus, providers, permissions, lexical, semantic }
	}

	pub fn config(&self) -> &Config {
		&self.cfg
	}

	pub fn corpus(&self) -> &Arc<Corpus> {
		&self.corpus
	}

	pub fn permissions(&self) -> &PermissionFilter {
		&self.permissions
	}
}
