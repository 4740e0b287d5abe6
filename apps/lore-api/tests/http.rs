use axum::{
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use lore_api::{routes, state::AppState};
use lore_testkit::{fake_providers, passage, passage_id, sample_config};

fn test_state() -> AppState {
	AppState::with_providers(sample_config(), fake_providers())
}

fn json_request(uri: &str, payload: Value) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", "application/json")
		.body(Body::from(payload.to_string()))
		.expect("request must build")
}

async fn json_body(response: axum::response::Response) -> Value {
	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("body must be readable");

	serde_json::from_slice(&bytes).expect("body must be JSON")
}

#[tokio::test]
async fn health_ok() {
	let app = routes::router(test_state());
	let response = app
		.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
		.await
		.expect("request must succeed");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn upsert_then_search_round_trip() {
	let state = test_state();
	let app = routes::router(state);
	let passages = vec![
		passage(1, "PTO accrues at fifteen days per year."),
		passage(2, "Paid time off requests go through the portal."),
	];
	let response = app
		.clone()
		.oneshot(json_request(
			"/v1/index/upsert",
			json!({ "passages": serde_json::to_value(&passages).expect("serialize") }),
		))
		.await
		.expect("upsert must succeed");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(json_body(response).await["upserted"], json!(2));

	let response = app
		.clone()
		.oneshot(json_request(
			"/v1/search",
			json!({
				"query": "PTO",
				"identity": "alice",
				"options": { "method": "lexical", "include_answer": false },
			}),
		))
		.await
		.expect("search must succeed");

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_body(response).await;

	assert_eq!(body["results"][0]["passage_id"], json!(passage_id(1).to_string()));
	assert_eq!(body["degraded"], json!(false));

	let response = app
		.oneshot(json_request(
			"/v1/index/delete",
			json!({ "passage_ids": [passage_id(1).to_string(), passage_id(2).to_string()] }),
		))
		.await
		.expect("delete must succeed");

	assert_eq!(json_body(response).await["deleted"], json!(2));
}

#[tokio::test]
async fn blank_query_is_a_bad_request() {
	let app = routes::router(test_state());
	let response = app
		.oneshot(json_request("/v1/search", json!({ "query": " ", "identity": "alice" })))
		.await
		.expect("request must complete");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let body = json_body(response).await;

	assert_eq!(body["error_code"], json!("invalid_request"));
}

#[tokio::test]
async fn admin_invalidate_reports_dropped_entries() {
	let app = routes::admin_router(test_state());
	let response = app
		.oneshot(json_request("/v1/admin/invalidate", json!({ "identity": "alice" })))
		.await
		.expect("invalidate must succeed");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(json_body(response).await["invalidated"], json!(0));
}
