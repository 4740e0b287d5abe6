use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub search: Search,
	pub permissions: Permissions,
	pub answer: Answer,
	pub providers: Providers,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	/// Default search method for requests that do not pick one. One of
	/// "lexical", "semantic", or "hybrid".
	pub method: String,
	pub top_k: u32,
	pub candidate_k: u32,
	#[serde(default = "default_rrf_k")]
	pub rrf_k: u32,
	#[serde(default = "default_source_weight")]
	pub lexical_weight: f32,
	#[serde(default = "default_source_weight")]
	pub semantic_weight: f32,
	pub rerank_enabled: bool,
	pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Permissions {
	#[serde(default = "default_permission_ttl_secs")]
	pub ttl_secs: u64,
	#[serde(default = "default_max_concurrent_checks")]
	pub max_concurrent_checks: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Answer {
	pub context_token_budget: u32,
	#[serde(default = "default_staleness_max_age_days")]
	pub staleness_max_age_days: i64,
	#[serde(default)]
	pub min_relevance: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub semantic: SemanticProviderConfig,
	pub rerank: ProviderConfig,
	pub generation: GenerationProviderConfig,
	pub authorization: AuthzProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SemanticProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthzProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

fn default_rrf_k() -> u32 {
	60
}

fn default_source_weight() -> f32 {
	1.0
}

fn default_permission_ttl_secs() -> u64 {
	300
}

fn default_max_concurrent_checks() -> u32 {
	8
}

fn default_staleness_max_age_days() -> i64 {
	180
}
