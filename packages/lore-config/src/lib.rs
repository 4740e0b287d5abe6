mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Answer, AuthzProviderConfig, Config, EmbeddingProviderConfig, GenerationProviderConfig,
	Permissions, ProviderConfig, Providers, Search, SemanticProviderConfig, Service,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.admin_bind must be non-empty.".to_string(),
		});
	}
	if !matches!(cfg.search.method.as_str(), "lexical" | "semantic" | "hybrid") {
		return Err(Error::Validation {
			message: "search.method must be one of lexical, semantic, or hybrid.".to_string(),
		});
	}
	if cfg.search.top_k == 0 {
		return Err(Error::Validation {
			message: "search.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.search.candidate_k == 0 {
		return Err(Error::Validation {
			message: "search.candidate_k must be greater than zero.".to_string(),
		});
	}
	if cfg.search.rrf_k == 0 {
		return Err(Error::Validation {
			message: "search.rrf_k must be greater than zero.".to_string(),
		});
	}
	if !cfg.search.lexical_weight.is_finite() || cfg.search.lexical_weight < 0.0 {
		return Err(Error::Validation {
			message: "search.lexical_weight must be a finite number, zero or greater.".to_string(),
		});
	}
	if !cfg.search.semantic_weight.is_finite() || cfg.search.semantic_weight < 0.0 {
		return Err(Error::Validation {
			message: "search.semantic_weight must be a finite number, zero or greater.".to_string(),
		});
	}
	if cfg.search.lexical_weight + cfg.search.semantic_weight <= 0.0 {
		return Err(Error::Validation {
			message: "At least one of search.lexical_weight and search.semantic_weight must be \
			          positive."
				.to_string(),
		});
	}
	if cfg.search.request_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search.request_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.permissions.max_concurrent_checks == 0 {
		return Err(Error::Validation {
			message: "permissions.max_concurrent_checks must be greater than zero.".to_string(),
		});
	}
	if cfg.answer.context_token_budget == 0 {
		return Err(Error::Validation {
			message: "answer.context_token_budget must be greater than zero.".to_string(),
		});
	}
	if cfg.answer.staleness_max_age_days <= 0 {
		return Err(Error::Validation {
			message: "answer.staleness_max_age_days must be greater than zero.".to_string(),
		});
	}
	if !cfg.answer.min_relevance.is_finite() {
		return Err(Error::Validation {
			message: "answer.min_relevance must be a finite number.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.search.method = cfg.search.method.trim().to_lowercase();
	cfg.service.http_bind = cfg.service.http_bind.trim().to_string();
	cfg.service.admin_bind = cfg.service.admin_bind.trim().to_string();
}
