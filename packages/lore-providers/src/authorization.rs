use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use uuid::Uuid;

use crate::{Error, Result};

/// Asks the authorization service whether an identity may read a passage.
/// Errors and timeouts surface to the caller, which treats them as denial.
pub async fn can_access(
	cfg: &lore_config::AuthzProviderConfig,
	identity: &str,
	passage_id: Uuid,
) -> Result<bool> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "identity": identity, "passage_id": passage_id });
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_decision_response(json)
}

fn parse_decision_response(json: Value) -> Result<bool> {
	json.get("allow")
		.or_else(|| json.get("allowed"))
		.and_then(|value| value.as_bool())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Authorization response is missing allow flag.".to_string(),
		})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_allow_flag() {
		assert!(parse_decision_response(serde_json::json!({ "allow": true })).unwrap());
		assert!(!parse_decision_response(serde_json::json!({ "allowed": false })).unwrap());
	}

	#[test]
	fn missing_flag_is_an_error_not_a_grant() {
		assert!(parse_decision_response(serde_json::json!({})).is_err());
	}
}
