//! Smoke-test binary: wires every mock/deterministic adapter together and
//! drives one mission end to end. Stands in for a CLI wrapper only insofar
//! as the library needs a runnable example (§1 Non-goals exclude a real
//! CLI/web surface).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use uuid::Uuid;

use maestro_core::adapters::embeddings::DeterministicEmbeddingProvider;
use maestro_core::adapters::sqlite::{
    initialize_database, SqliteChunkRepository, SqliteExecutionLogRepository, SqliteMissionRepository, SqliteNoteRepository, SqliteReportVersionRepository,
};
use maestro_core::adapters::substrates::MockLlmSubstrate;
use maestro_core::domain::errors::SubstrateError;
use maestro_core::domain::models::{MissionOptions, MissionStatus, ModelTier, Page};
use maestro_core::domain::ports::{ChunkRepository, FetchOptions, FetchedPage, Fetcher, NoteRepository, Searcher, WebSearchResult};
use maestro_core::infrastructure::config::ConfigLoader;
use maestro_core::infrastructure::logging::{LoggerImpl, LoggingConfig};
use maestro_core::services::{
    CircuitBreakerRegistry, ConcurrencyGovernor, CostMeter, HybridRetriever, MissionController, NoteAssignment, NoteStore, PlanningAgent, ReflectionAgent,
    ResearchAgent, RetryPolicy, WebCollector, WritingAgent,
};

const SECTION_ID: &str = "11111111-1111-1111-1111-111111111111";
const QUESTION_ID: &str = "22222222-2222-2222-2222-222222222222";
const SOURCE_URL: &str = "https://example.test/background";

/// A searcher that never leaves the process: returns one canned hit for
/// any query, so the mission has something to cite without a network call.
struct CannedSearcher;

#[async_trait]
impl Searcher for CannedSearcher {
    fn provider_id(&self) -> &str {
        "canned"
    }

    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<WebSearchResult>, SubstrateError> {
        Ok(vec![WebSearchResult { url: SOURCE_URL.to_string(), title: "Background".to_string(), snippet: "an overview of the topic".to_string(), rank: 0 }])
    }
}

struct CannedFetcher;

#[async_trait]
impl Fetcher for CannedFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration, _options: FetchOptions) -> Result<FetchedPage, SubstrateError> {
        Ok(FetchedPage {
            url: url.to_string(),
            title: Some("Background".to_string()),
            content_markdown: "The topic has a well-documented history.".to_string(),
            links: None,
            images: None,
        })
    }
}

fn plan_response() -> String {
    serde_json::json!({
        "type": "plan",
        "outline": {
            "sections": [{
                "id": SECTION_ID,
                "title": "Background",
                "description": "history and context of the topic",
                "research_strategy": "survey",
                "subsections": [],
            }],
            "revision_notes": null,
        },
        "question_tree": [{
            "id": QUESTION_ID,
            "question": "What is the background of the topic?",
            "children": [],
        }],
    })
    .to_string()
}

fn notes_response() -> String {
    serde_json::json!({
        "type": "notes",
        "notes": [{
            "content": format!("The topic has a well-documented history. {SOURCE_URL}"),
            "source_ref": {"kind": "web", "url": SOURCE_URL},
            "tags": ["phase=initial"],
        }],
    })
    .to_string()
}

fn query_decomposition_response() -> String {
    serde_json::json!({"type": "query_decomposition", "queries": ["background of the topic"]}).to_string()
}

fn critique_response_no_gaps() -> String {
    serde_json::json!({"type": "critique", "gaps": [], "new_goals": [], "new_thoughts": [], "sections_needing_revision": [], "trigger_replan": false}).to_string()
}

fn draft_response() -> String {
    serde_json::json!({
        "type": "draft",
        "section_id": SECTION_ID,
        "content_markdown": "## Background\nThe topic has a well-documented history, drawn from one cited source.",
    })
    .to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    let _logger = LoggerImpl::init(&LoggingConfig::default()).context("failed to initialize logging")?;

    let pool = initialize_database("sqlite::memory:").await.context("failed to initialize database")?;

    let mission_repository = Arc::new(SqliteMissionRepository::new(pool.clone()));
    let log_repository = Arc::new(SqliteExecutionLogRepository::new(pool.clone()));
    let report_repository = Arc::new(SqliteReportVersionRepository::new(pool.clone()));
    let note_repository: Arc<dyn NoteRepository> = Arc::new(SqliteNoteRepository::new(pool.clone()));
    let note_store = Arc::new(NoteStore::new(Arc::clone(&note_repository)));
    let chunk_repository: Arc<dyn ChunkRepository> = Arc::new(SqliteChunkRepository::new(pool));
    let embedding_provider = Arc::new(DeterministicEmbeddingProvider::new(config.rag.dense_dim, config.rag.sparse_vocab_size));
    let retriever = Arc::new(HybridRetriever::new(Arc::clone(&chunk_repository), Arc::clone(&embedding_provider) as Arc<_>));
    let web = Arc::new(WebCollector::new(Arc::new(CannedSearcher), Arc::new(CannedFetcher)));
    let note_assignment = Arc::new(NoteAssignment::new(embedding_provider as Arc<_>));

    let substrate = Arc::new(MockLlmSubstrate::new(notes_response()));
    substrate.push_response("plan", plan_response()).await;
    substrate.push_response("notes", notes_response()).await;
    substrate.push_response("notes", notes_response()).await;
    substrate.push_response("query_decomposition", query_decomposition_response()).await;
    substrate.push_response("critique", critique_response_no_gaps()).await;
    substrate.push_response("critique", critique_response_no_gaps()).await;
    substrate.push_response("draft", draft_response()).await;
    let llm: Arc<dyn maestro_core::domain::ports::LlmSubstrate> = substrate;

    let mut research_config = config.clone();
    research_config.structured_research_rounds = 1;
    research_config.writing_passes = 1;
    research_config.max_research_cycles_per_section = 1;

    let controller = MissionController::new(
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
        ConcurrencyGovernor::new(research_config.max_concurrent_requests),
        CostMeter::new(),
        CircuitBreakerRegistry::new(Default::default()),
        RetryPolicy::default(),
        research_config,
    );

    let chat_id = Uuid::new_v4();
    let options = MissionOptions { use_web: true, ..Default::default() };
    let mission_id = controller.create_mission(chat_id, "Summarize the background of the topic", options).await.context("failed to create mission")?;
    tracing::info!(%mission_id, "mission created");

    controller.start(mission_id).await.context("failed to start mission")?;

    for _ in 0..200 {
        let status = controller.get_status(mission_id).await?;
        if matches!(status, MissionStatus::Completed | MissionStatus::Failed | MissionStatus::Stopped) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let status = controller.get_status(mission_id).await?;
    let stats = controller.get_stats(mission_id).await;
    let draft = controller.get_draft(mission_id).await?;
    let logs = controller.get_logs(mission_id, Page::new(0, 100)).await?;

    println!("mission {mission_id} finished with status {status:?}");
    println!("tokens: {}, cost: ${:.4}, calls: {}", stats.total_tokens, stats.total_cost_usd, stats.call_count);
    println!("execution log entries: {}", logs.len());
    if let Some(report) = draft {
        println!("--- report v{} ---\n{}", report.version, report.content_markdown);
    } else {
        println!("no report was drafted");
    }

    Ok(())
}
