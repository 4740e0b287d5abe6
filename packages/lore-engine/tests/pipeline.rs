use std::{collections::BTreeMap, sync::Arc};

use lore_domain::citation;
use lore_engine::{
	Engine, Error, NOT_FOUND_ANSWER, PipelineStage, SearchMethod, SearchOptions, SearchRequest,
};
use lore_index::Corpus;
use lore_providers::SemanticHit;
use lore_testkit::{
	CannedGeneration, DenyAll, FailingAuthorization, FailingRerank, FailingSemantic,
	ScriptedRerank, SlowGeneration, StaticSemantic, fake_providers, passage, passage_aged,
	passage_id, passage_tagged, sample_config,
};
use uuid::Uuid;

fn request(query: &str) -> SearchRequest {
	SearchRequest {
		query: query.to_string(),
		identity: "alice".to_string(),
		options: SearchOptions::default(),
	}
}

fn ranking_request(query: &str, method: SearchMethod) -> SearchRequest {
	SearchRequest {
		query: query.to_string(),
		identity: "alice".to_string(),
		options: SearchOptions {
			method: Some(method),
			include_answer: Some(false),
			..SearchOptions::default()
		},
	}
}

fn pto_corpus() -> Arc<Corpus> {
	let corpus = Arc::new(Corpus::new());

	corpus.build(vec![
		passage(1, "PTO accrues at fifteen days per year for full-time staff."),
		passage(2, "Paid time off requests are filed through the people portal."),
		passage(3, "Expense reports are reimbursed within two weeks."),
	]);

	corpus
}

#[tokio::test]
async fn lexical_only_query_ranks_the_literal_match_first() {
	let mut providers = fake_providers();

	providers.semantic = Arc::new(FailingSemantic);

	let engine = Engine::new(sample_config(), pto_corpus(), providers);
	let response = engine
		.search(ranking_request("PTO", SearchMethod::Lexical))
		.await
		.expect("lexical search must succeed");

	assert!(!response.degraded);
	assert_eq!(response.results.len(), 1);
	assert_eq!(response.results[0].passage_id, passage_id(1));
	assert_eq!(response.stage, PipelineStage::Returned);
}

#[tokio::test]
async fn semantic_outage_degrades_hybrid_to_lexical_results() {
	let mut providers = fake_providers();

	providers.semantic = Arc::new(FailingSemantic);

	let engine = Engine::new(sample_config(), pto_corpus(), providers);
	let response = engine
		.search(ranking_request("PTO", SearchMethod::Hybrid))
		.await
		.expect("degraded hybrid search must succeed");

	assert!(response.degraded);
	assert_eq!(response.results[0].passage_id, passage_id(1));
}

#[tokio::test]
async fn all_sources_down_fails_the_request() {
	let mut providers = fake_providers();

	providers.semantic = Arc::new(FailingSemantic);

	let engine = Engine::new(sample_config(), pto_corpus(), providers);
	let outcome = engine.search(ranking_request("PTO", SearchMethod::Semantic)).await;

	assert!(matches!(outcome, Err(Error::RetrievalUnavailable { .. })));
}

#[tokio::test]
async fn passage_in_both_top_threes_wins_the_fusion() {
	let corpus = Arc::new(Corpus::new());

	corpus.build(vec![
		passage(1, "release checklist release checklist for the platform"),
		passage(3, "deployment runbook overview"),
		passage(5, "release checklist summary"),
	]);

	let mut providers = fake_providers();

	// Semantic favours 3 then 5; lexically 1 outranks 5. Passage 5 is the
	// only one in both top threes.
	providers.semantic = Arc::new(StaticSemantic {
		hits: vec![
			SemanticHit { passage_id: passage_id(3), score: 0.91 },
			SemanticHit { passage_id: passage_id(5), score: 0.88 },
		],
	});

	let engine = Engine::new(sample_config(), corpus, providers);
	let response = engine
		.search(ranking_request("release checklist", SearchMethod::Hybrid))
		.await
		.expect("hybrid search must succeed");

	assert!(!response.degraded);
	assert_eq!(response.results[0].passage_id, passage_id(5));
}

#[tokio::test]
async fn identity_without_grants_gets_empty_results_and_not_found() {
	let mut providers = fake_providers();

	providers.authorization = Arc::new(DenyAll);

	let engine = Engine::new(sample_config(), pto_corpus(), providers);
	let response = engine.search(request("PTO")).await.expect("search must succeed");
	let answer = response.answer.expect("answer requested");

	assert!(response.results.is_empty());
	assert_eq!(answer.text, NOT_FOUND_ANSWER);
	assert!(answer.citations.is_empty());
	assert_eq!(response.stage, PipelineStage::Returned);
}

#[tokio::test]
async fn authorization_outage_fails_closed_without_failing_the_request() {
	let mut providers = fake_providers();

	providers.authorization = Arc::new(FailingAuthorization);

	let engine = Engine::new(sample_config(), pto_corpus(), providers);
	let response = engine
		.search(ranking_request("PTO", SearchMethod::Lexical))
		.await
		.expect("request must still succeed");

	assert!(response.results.is_empty());
}

#[tokio::test]
async fn deadline_shorter_than_generation_drops_the_answer() {
	let mut providers = fake_providers();

	providers.generation =
		Arc::new(SlowGeneration { delay_ms: 5_000, text: "too late".to_string() });

	let engine = Engine::new(sample_config(), pto_corpus(), providers);
	let mut req = request("PTO");

	req.options.timeout_ms = Some(250);

	let response = engine.search(req).await.expect("degraded search must succeed");

	assert!(response.degraded);
	assert!(response.answer.is_none());
	assert!(!response.results.is_empty());
}

#[tokio::test]
async fn hallucinated_citations_are_stripped_from_the_answer() {
	let bogus = Uuid::new_v4();
	let mut providers = fake_providers();

	providers.generation = Arc::new(CannedGeneration {
		text: format!(
			"PTO accrues at fifteen days per year {}. Carry-over is unlimited {}.",
			citation::citation_marker(passage_id(1)),
			citation::citation_marker(bogus),
		),
	});

	let engine = Engine::new(sample_config(), pto_corpus(), providers);
	let response = engine.search(request("PTO")).await.expect("search must succeed");
	let answer = response.answer.expect("answer requested");

	assert_eq!(answer.citations, vec![passage_id(1)]);
	assert!(!answer.text.contains(&bogus.to_string()));
	assert!(answer.text.contains(&passage_id(1).to_string()));
}

#[tokio::test]
async fn stale_evidence_attaches_a_warning() {
	let corpus = Arc::new(Corpus::new());

	corpus.build(vec![passage_aged(1, "The VPN migration finished in March.", 400)]);

	let mut providers = fake_providers();

	providers.generation = Arc::new(CannedGeneration {
		text: format!(
			"The VPN migration finished in March {}.",
			citation::citation_marker(passage_id(1))
		),
	});

	let engine = Engine::new(sample_config(), corpus, providers);
	let response = engine.search(request("VPN migration")).await.expect("search must succeed");
	let answer = response.answer.expect("answer requested");

	assert_eq!(answer.citations, vec![passage_id(1)]);
	assert_eq!(answer.warnings.len(), 1);
	assert!(answer.warnings[0].contains("out of date"));
}

#[tokio::test]
async fn fresh_evidence_attaches_no_warning() {
	let mut providers = fake_providers();

	providers.generation = Arc::new(CannedGeneration {
		text: format!("Fifteen days {}.", citation::citation_marker(passage_id(1))),
	});

	let engine = Engine::new(sample_config(), pto_corpus(), providers);
	let response = engine.search(request("PTO")).await.expect("search must succeed");
	let answer = response.answer.expect("answer requested");

	assert!(answer.warnings.is_empty());
}

#[tokio::test]
async fn reranker_reorders_the_permitted_set() {
	let corpus = Arc::new(Corpus::new());

	corpus.build(vec![
		passage(1, "incident response steps incident response"),
		passage(2, "incident response contact sheet"),
	]);

	let mut cfg = sample_config();

	cfg.search.rerank_enabled = true;

	let mut providers = fake_providers();

	// The fused runner-up gets the highest pairwise score.
	providers.rerank = Arc::new(ScriptedRerank { scores: vec![0.1, 0.9] });

	let engine = Engine::new(cfg, corpus, providers);
	let response = engine
		.search(ranking_request("incident response", SearchMethod::Lexical))
		.await
		.expect("search must succeed");

	assert_eq!(response.results[0].passage_id, passage_id(2));
	assert_eq!(response.results[1].passage_id, passage_id(1));
}

#[tokio::test]
async fn rerank_outage_keeps_the_fused_order() {
	let mut cfg = sample_config();

	cfg.search.rerank_enabled = true;

	let mut providers = fake_providers();

	providers.rerank = Arc::new(FailingRerank);

	let engine = Engine::new(cfg, pto_corpus(), providers);
	let response = engine
		.search(ranking_request("PTO", SearchMethod::Lexical))
		.await
		.expect("search must succeed despite rerank outage");

	assert!(!response.degraded);
	assert_eq!(response.results[0].passage_id, passage_id(1));
}

#[tokio::test]
async fn tag_filters_restrict_the_fused_candidates() {
	let corpus = Arc::new(Corpus::new());

	corpus.build(vec![
		passage_tagged(1, "quarterly budget review", &[("topic", "finance")]),
		passage_tagged(2, "quarterly budget headcount", &[("topic", "hr")]),
	]);

	let engine = Engine::new(sample_config(), corpus, fake_providers());
	let mut req = ranking_request("quarterly budget", SearchMethod::Lexical);

	req.options.filters =
		BTreeMap::from([("topic".to_string(), "finance".to_string())]);

	let response = engine.search(req).await.expect("search must succeed");

	assert_eq!(response.results.len(), 1);
	assert_eq!(response.results[0].passage_id, passage_id(1));
}

#[tokio::test]
async fn blank_queries_are_rejected() {
	let engine = Engine::new(sample_config(), pto_corpus(), fake_providers());

	assert!(matches!(
		engine.search(request("   ")).await,
		Err(Error::InvalidRequest { .. })
	));
	assert!(matches!(
		engine
			.search(SearchRequest {
				query: "PTO".to_string(),
				identity: String::new(),
				options: SearchOptions::default(),
			})
			.await,
		Err(Error::InvalidRequest { .. })
	));
}
