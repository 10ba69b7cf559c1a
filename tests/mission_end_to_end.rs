//! End-to-end integration test for the Mission Controller.
//!
//! Verifies the complete flow from mission creation through planning,
//! initial exploration, structured research, and writing, using mock
//! adapters throughout (no network, no live LLM provider).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use maestro_core::adapters::embeddings::DeterministicEmbeddingProvider;
use maestro_core::adapters::sqlite::{
    create_migrated_test_pool, SqliteChunkRepository, SqliteExecutionLogRepository, SqliteMissionRepository, SqliteNoteRepository, SqliteReportVersionRepository,
};
use maestro_core::adapters::substrates::MockLlmSubstrate;
use maestro_core::domain::errors::SubstrateError;
use maestro_core::domain::models::{MissionOptions, MissionStatus, ModelTier, Page, ResearchConfig};
use maestro_core::domain::ports::{ChunkRepository, FetchOptions, FetchedPage, Fetcher, LlmSubstrate, NoteRepository, Searcher, WebSearchResult};
use maestro_core::services::{
    CircuitBreakerRegistry, ConcurrencyGovernor, CostMeter, HybridRetriever, MissionController, NoteAssignment, NoteStore, PlanningAgent, ReflectionAgent,
    ResearchAgent, RetryPolicy, WebCollector, WritingAgent,
};

const SECTION_ID: &str = "33333333-3333-3333-3333-333333333333";
const SOURCE_URL: &str = "https://example.test/e2e-source";

struct StubSearcher;

#[async_trait]
impl Searcher for StubSearcher {
    fn provider_id(&self) -> &str {
        "stub"
    }
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<WebSearchResult>, SubstrateError> {
        Ok(vec![WebSearchResult { url: SOURCE_URL.to_string(), title: "Source".to_string(), snippet: "snippet".to_string(), rank: 0 }])
    }
}

struct StubFetcher;

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration, _options: FetchOptions) -> Result<FetchedPage, SubstrateError> {
        Ok(FetchedPage { url: url.to_string(), title: None, content_markdown: "fetched content".to_string(), links: None, images: None })
    }
}

async fn build_controller(substrate: Arc<MockLlmSubstrate>, config: ResearchConfig) -> Arc<MissionController> {
    let pool = create_migrated_test_pool().await.expect("failed to create test pool");
    let mission_repository = Arc::new(SqliteMissionRepository::new(pool.clone()));
    let log_repository = Arc::new(SqliteExecutionLogRepository::new(pool.clone()));
    let report_repository = Arc::new(SqliteReportVersionRepository::new(pool.clone()));
    let note_repository: Arc<dyn NoteRepository> = Arc::new(SqliteNoteRepository::new(pool.clone()));
    let note_store = Arc::new(NoteStore::new(Arc::clone(&note_repository)));
    let chunk_repository: Arc<dyn ChunkRepository> = Arc::new(SqliteChunkRepository::new(pool));
    let embedding_provider = Arc::new(DeterministicEmbeddingProvider::new(16, 64));
    let retriever = Arc::new(HybridRetriever::new(Arc::clone(&chunk_repository), Arc::clone(&embedding_provider) as Arc<_>));
    let web = Arc::new(WebCollector::new(Arc::new(StubSearcher), Arc::new(StubFetcher)));
    let note_assignment = Arc::new(NoteAssignment::new(embedding_provider as Arc<_>));

    let llm: Arc<dyn LlmSubstrate> = substrate;
    MissionController::new(
        mission_repository,
        log_repository,
        report_repository,
        note_store,
        retriever,
        web,
        note_assignment,
        Arc::new(PlanningAgent::new(Arc::clone(&llm), ModelTier::Intelligent)),
        Arc::new(ResearchAgent::new(Arc::clone(&llm), ModelTier::Fast)),
        Arc::new(ReflectionAgent::new(Arc::clone(&llm), ModelTier::Intelligent)),
        Arc::new(WritingAgent::new(llm, ModelTier::Intelligent)),
        ConcurrencyGovernor::new(config.max_concurrent_requests),
        CostMeter::new(),
        CircuitBreakerRegistry::new(Default::default()),
        RetryPolicy::default(),
        config,
    )
}

fn plan_response() -> String {
    serde_json::json!({
        "type": "plan",
        "outline": {
            "sections": [{
                "id": SECTION_ID,
                "title": "Overview",
                "description": "an overview section",
                "research_strategy": "survey",
                "subsections": [],
            }],
            "revision_notes": null,
        },
        "question_tree": [{"id": Uuid::new_v4(), "question": "what is the overview?", "children": []}],
    })
    .to_string()
}

fn notes_response() -> String {
    serde_json::json!({
        "type": "notes",
        "notes": [{
            "content": format!("a finding worth citing. {SOURCE_URL}"),
            "source_ref": {"kind": "web", "url": SOURCE_URL},
            "tags": [],
        }],
    })
    .to_string()
}

fn query_decomposition_response() -> String {
    serde_json::json!({"type": "query_decomposition", "queries": ["overview query"]}).to_string()
}

fn critique_no_gaps() -> String {
    serde_json::json!({"type": "critique", "gaps": [], "new_goals": [], "new_thoughts": [], "sections_needing_revision": [], "trigger_replan": false}).to_string()
}

fn draft_response() -> String {
    serde_json::json!({"type": "draft", "section_id": SECTION_ID, "content_markdown": "## Overview\nA cited finding."}).to_string()
}

async fn wait_until_terminal(controller: &Arc<MissionController>, mission_id: Uuid) -> MissionStatus {
    for _ in 0..200 {
        let status = controller.get_status(mission_id).await.unwrap();
        if matches!(status, MissionStatus::Completed | MissionStatus::Failed | MissionStatus::Stopped) {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    controller.get_status(mission_id).await.unwrap()
}

#[tokio::test]
async fn full_mission_runs_through_every_phase_and_drafts_a_report() {
    let substrate = Arc::new(MockLlmSubstrate::new(notes_response()));
    substrate.push_response("plan", plan_response()).await;
    substrate.push_response("notes", notes_response()).await;
    substrate.push_response("notes", notes_response()).await;
    substrate.push_response("query_decomposition", query_decomposition_response()).await;
    substrate.push_response("critique", critique_no_gaps()).await;
    substrate.push_response("critique", critique_no_gaps()).await;
    substrate.push_response("draft", draft_response()).await;

    let mut config = ResearchConfig::default();
    config.structured_research_rounds = 1;
    config.writing_passes = 1;
    config.max_research_cycles_per_section = 1;

    let controller = build_controller(substrate, config).await;
    let options = MissionOptions { use_web: true, ..Default::default() };
    let mission_id = controller.create_mission(Uuid::new_v4(), "investigate the overview topic", options).await.unwrap();

    controller.start(mission_id).await.unwrap();
    let status = wait_until_terminal(&controller, mission_id).await;
    assert_eq!(status, MissionStatus::Completed);

    let draft = controller.get_draft(mission_id).await.unwrap().expect("a report version should have been written");
    assert!(draft.content_markdown.contains("Overview"));

    let notes = controller.get_notes(mission_id, Page::new(0, 100)).await.unwrap();
    assert!(!notes.is_empty());

    let stats = controller.get_stats(mission_id).await;
    assert!(stats.call_count > 0);
}

#[tokio::test]
async fn stop_requests_cancel_a_running_mission() {
    let substrate = Arc::new(MockLlmSubstrate::new(notes_response()));
    substrate.push_response("plan", plan_response()).await;

    let config = ResearchConfig::default();
    let controller = build_controller(substrate, config).await;
    let options = MissionOptions { use_web: true, ..Default::default() };
    let mission_id = controller.create_mission(Uuid::new_v4(), "a mission to cancel", options).await.unwrap();

    controller.start(mission_id).await.unwrap();
    controller.stop(mission_id).await.unwrap();
    let status = wait_until_terminal(&controller, mission_id).await;
    assert_eq!(status, MissionStatus::Stopped);
}

#[tokio::test]
async fn create_mission_without_any_source_is_rejected() {
    let substrate = Arc::new(MockLlmSubstrate::new("{}"));
    let controller = build_controller(substrate, ResearchConfig::default()).await;
    let result = controller.create_mission(Uuid::new_v4(), "no sources configured", MissionOptions::default()).await;
    assert!(result.is_err());
}
