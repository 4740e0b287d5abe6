use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use uuid::Uuid;

use crate::{Error, Result};

/// One similarity match from the remote vector service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticHit {
	pub passage_id: Uuid,
	pub score: f32,
}

/// Nearest-neighbour query against the vector similarity service. The
/// service owns its index; this adapter only speaks its query surface.
pub async fn search(
	cfg: &lore_config::SemanticProviderConfig,
	embedding: &[f32],
	limit: u32,
) -> Result<Vec<SemanticHit>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"vector": embedding,
		"limit": limit,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_search_response(json)
}

fn parse_search_response(json: Value) -> Result<Vec<SemanticHit>> {
	let result = json
		.get("result")
		.or_else(|| json.get("results"))
		.and_then(|value| value.as_array())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Semantic search response is missing result array.".to_string(),
		})?;
	let mut hits = Vec::with_capacity(result.len());

	for item in result {
		let id = item
			.get("id")
			.and_then(|value| value.as_str())
			.and_then(|raw| Uuid::parse_str(raw).ok())
			.ok_or_else(|| Error::InvalidResponse {
				message: "Semantic search hit is missing a UUID id.".to_string(),
			})?;
		let score = item.get("score").and_then(|value| value.as_f64()).ok_or_else(|| {
			Error::InvalidResponse {
				message: "Semantic search hit is missing a numeric score.".to_string(),
			}
		})?;

		hits.push(SemanticHit { passage_id: id, score: score as f32 });
	}

	Ok(hits)
}
