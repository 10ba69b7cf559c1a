//! `ResearchConfig`: every tunable enumerated in §6, with defaults and a
//! `validate()` pass. Layered via `figment` (see
//! `infrastructure::config::loader`).

use serde::{Deserialize, Serialize};

/// LLM provider tiers (§6 Providers). The core treats these as opaque
/// capability handles — it never knows a concrete vendor or model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Fast,
    Mid,
    Intelligent,
    Verifier,
}

impl ModelTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Mid => "mid",
            Self::Intelligent => "intelligent",
            Self::Verifier => "verifier",
        }
    }
}

/// Hybrid retrieval fusion weights (§4.2, §6). Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HybridWeights {
    pub dense_w: f32,
    pub sparse_w: f32,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self { dense_w: 0.5, sparse_w: 0.5 }
    }
}

impl HybridWeights {
    pub fn is_valid(&self) -> bool {
        (self.dense_w + self.sparse_w - 1.0).abs() < 1e-3 && self.dense_w >= 0.0 && self.sparse_w >= 0.0
    }
}

/// ANN index construction parameters (§6 RAG).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AnnParams {
    pub m: u32,
    pub ef_construction: u32,
}

impl Default for AnnParams {
    fn default() -> Self {
        Self { m: 16, ef_construction: 200 }
    }
}

/// Chunking window/stride (§3, §4.3 step 6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChunkWindow {
    pub window_paragraphs: usize,
    pub stride_paragraphs: usize,
}

impl Default for ChunkWindow {
    fn default() -> Self {
        Self { window_paragraphs: 2, stride_paragraphs: 1 }
    }
}

/// RAG-specific tunables (§6 RAG).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct RagConfig {
    #[serde(default = "default_dense_dim")]
    pub dense_dim: usize,
    #[serde(default = "default_sparse_vocab_size")]
    pub sparse_vocab_size: usize,
    #[serde(default)]
    pub hybrid_weights: HybridWeights,
    #[serde(default)]
    pub ann: AnnParams,
    #[serde(default)]
    pub chunk_window: ChunkWindow,
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: u64,
    #[serde(default = "default_metadata_extraction_chars")]
    pub metadata_extraction_chars: usize,
    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,
}

fn default_dense_dim() -> usize {
    1024
}
fn default_sparse_vocab_size() -> usize {
    30_000
}
fn default_max_document_bytes() -> u64 {
    100 * 1024 * 1024
}
fn default_metadata_extraction_chars() -> usize {
    8_000
}
fn default_embedding_batch_size() -> usize {
    32
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            dense_dim: default_dense_dim(),
            sparse_vocab_size: default_sparse_vocab_size(),
            hybrid_weights: HybridWeights::default(),
            ann: AnnParams::default(),
            chunk_window: ChunkWindow::default(),
            max_document_bytes: default_max_document_bytes(),
            metadata_extraction_chars: default_metadata_extraction_chars(),
            embedding_batch_size: default_embedding_batch_size(),
        }
    }
}

/// Every research/writing tunable enumerated in §6.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ResearchConfig {
    #[serde(default = "default_initial_research_max_depth")]
    pub initial_research_max_depth: usize,
    #[serde(default = "default_initial_research_max_questions")]
    pub initial_research_max_questions: usize,
    #[serde(default = "default_structured_research_rounds")]
    pub structured_research_rounds: usize,
    #[serde(default = "default_writing_passes")]
    pub writing_passes: usize,
    #[serde(default = "default_initial_exploration_doc_results")]
    pub initial_exploration_doc_results: usize,
    #[serde(default = "default_initial_exploration_web_results")]
    pub initial_exploration_web_results: usize,
    #[serde(default = "default_main_research_doc_results")]
    pub main_research_doc_results: usize,
    #[serde(default = "default_main_research_web_results")]
    pub main_research_web_results: usize,
    #[serde(default = "default_max_research_cycles_per_section")]
    pub max_research_cycles_per_section: usize,
    #[serde(default = "default_max_total_iterations")]
    pub max_total_iterations: usize,
    #[serde(default = "default_max_total_depth")]
    pub max_total_depth: usize,
    #[serde(default = "default_max_decomposed_queries")]
    pub max_decomposed_queries: usize,
    #[serde(default = "default_max_notes_for_assignment_reranking")]
    pub max_notes_for_assignment_reranking: usize,
    #[serde(default = "default_min_notes_per_section_assignment")]
    pub min_notes_per_section_assignment: usize,
    #[serde(default = "default_max_notes_per_section_assignment")]
    pub max_notes_per_section_assignment: usize,
    #[serde(default = "default_thought_pad_context_limit")]
    pub thought_pad_context_limit: usize,
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default)]
    pub skip_final_replanning: bool,
    #[serde(default)]
    pub auto_optimize_params: bool,
    #[serde(default = "default_writing_previous_content_preview_chars")]
    pub writing_previous_content_preview_chars: usize,
    #[serde(default = "default_writing_agent_max_context_chars")]
    pub writing_agent_max_context_chars: usize,
    #[serde(default = "default_research_note_content_limit")]
    pub research_note_content_limit: usize,
    #[serde(default = "default_max_planning_context_chars")]
    pub max_planning_context_chars: usize,
    /// §7 `ContextOverflow` recovery: entries dropped from the oldest end
    /// of `thought_pad` before the one-shot retry.
    #[serde(default = "default_context_overflow_trim_entries")]
    pub context_overflow_trim_entries: usize,
    #[serde(default = "default_graceful_shutdown_seconds")]
    pub graceful_shutdown_seconds: u64,
    #[serde(default = "default_embedding_queue_capacity")]
    pub embedding_queue_capacity: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub rag: RagConfig,
}

fn default_initial_research_max_depth() -> usize {
    3
}
fn default_initial_research_max_questions() -> usize {
    12
}
fn default_structured_research_rounds() -> usize {
    2
}
fn default_writing_passes() -> usize {
    2
}
fn default_initial_exploration_doc_results() -> usize {
    5
}
fn default_initial_exploration_web_results() -> usize {
    5
}
fn default_main_research_doc_results() -> usize {
    8
}
fn default_main_research_web_results() -> usize {
    8
}
fn default_max_research_cycles_per_section() -> usize {
    3
}
fn default_max_total_iterations() -> usize {
    100
}
fn default_max_total_depth() -> usize {
    4
}
fn default_max_decomposed_queries() -> usize {
    5
}
fn default_max_notes_for_assignment_reranking() -> usize {
    50
}
fn default_min_notes_per_section_assignment() -> usize {
    2
}
fn default_max_notes_per_section_assignment() -> usize {
    15
}
fn default_thought_pad_context_limit() -> usize {
    50
}
fn default_max_concurrent_requests() -> usize {
    10
}
fn default_writing_previous_content_preview_chars() -> usize {
    2_000
}
fn default_writing_agent_max_context_chars() -> usize {
    40_000
}
fn default_research_note_content_limit() -> usize {
    1_500
}
fn default_max_planning_context_chars() -> usize {
    20_000
}
fn default_context_overflow_trim_entries() -> usize {
    5
}
fn default_graceful_shutdown_seconds() -> u64 {
    30
}
fn default_embedding_queue_capacity() -> usize {
    256
}
fn default_max_retries() -> u32 {
    3
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            initial_research_max_depth: default_initial_research_max_depth(),
            initial_research_max_questions: default_initial_research_max_questions(),
            structured_research_rounds: default_structured_research_rounds(),
            writing_passes: default_writing_passes(),
            initial_exploration_doc_results: default_initial_exploration_doc_results(),
            initial_exploration_web_results: default_initial_exploration_web_results(),
            main_research_doc_results: default_main_research_doc_results(),
            main_research_web_results: default_main_research_web_results(),
            max_research_cycles_per_section: default_max_research_cycles_per_section(),
            max_total_iterations: default_max_total_iterations(),
            max_total_depth: default_max_total_depth(),
            max_decomposed_queries: default_max_decomposed_queries(),
            max_notes_for_assignment_reranking: default_max_notes_for_assignment_reranking(),
            min_notes_per_section_assignment: default_min_notes_per_section_assignment(),
            max_notes_per_section_assignment: default_max_notes_per_section_assignment(),
            thought_pad_context_limit: default_thought_pad_context_limit(),
            max_concurrent_requests: default_max_concurrent_requests(),
            skip_final_replanning: false,
            auto_optimize_params: false,
            writing_previous_content_preview_chars: default_writing_previous_content_preview_chars(),
            writing_agent_max_context_chars: default_writing_agent_max_context_chars(),
            research_note_content_limit: default_research_note_content_limit(),
            max_planning_context_chars: default_max_planning_context_chars(),
            context_overflow_trim_entries: default_context_overflow_trim_entries(),
            graceful_shutdown_seconds: default_graceful_shutdown_seconds(),
            embedding_queue_capacity: default_embedding_queue_capacity(),
            max_retries: default_max_retries(),
            rag: RagConfig::default(),
        }
    }
}

/// Errors from validating a loaded `ResearchConfig`.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("max_concurrent_requests must be at least 10 to avoid agent-on-agent deadlock, got {0}")]
    MaxConcurrentRequestsTooLow(usize),
    #[error("hybrid weights must sum to 1.0: dense_w={dense_w}, sparse_w={sparse_w}")]
    InvalidHybridWeights { dense_w: f32, sparse_w: f32 },
    #[error("min_notes_per_section_assignment ({min}) must not exceed max_notes_per_section_assignment ({max})")]
    NoteAssignmentBoundsInverted { min: usize, max: usize },
    #[error("structured_research_rounds must be at least 1")]
    ZeroResearchRounds,
    #[error("writing_passes must be at least 1")]
    ZeroWritingPasses,
}

impl ResearchConfig {
    /// Enforces §6's constraints (`max_concurrent_requests >= 10`,
    /// `dense_w + sparse_w == 1`, non-zero phase counts, sane note bounds).
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_concurrent_requests < 10 {
            return Err(ConfigValidationError::MaxConcurrentRequestsTooLow(self.max_concurrent_requests));
        }
        if !self.rag.hybrid_weights.is_valid() {
            return Err(ConfigValidationError::InvalidHybridWeights {
                dense_w: self.rag.hybrid_weights.dense_w,
                sparse_w: self.rag.hybrid_weights.sparse_w,
            });
        }
        if self.min_notes_per_section_assignment > self.max_notes_per_section_assignment {
            return Err(ConfigValidationError::NoteAssignmentBoundsInverted {
                min: self.min_notes_per_section_assignment,
                max: self.max_notes_per_section_assignment,
            });
        }
        if self.structured_research_rounds == 0 {
            return Err(ConfigValidationError::ZeroResearchRounds);
        }
        if self.writing_passes == 0 {
            return Err(ConfigValidationError::ZeroWritingPasses);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ResearchConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_low_concurrency_floor() {
        let mut cfg = ResearchConfig::default();
        cfg.max_concurrent_requests = 4;
        assert_eq!(cfg.validate(), Err(ConfigValidationError::MaxConcurrentRequestsTooLow(4)));
    }

    #[test]
    fn rejects_unbalanced_hybrid_weights() {
        let mut cfg = ResearchConfig::default();
        cfg.rag.hybrid_weights = HybridWeights { dense_w: 0.8, sparse_w: 0.8 };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inverted_note_bounds() {
        let mut cfg = ResearchConfig::default();
        cfg.min_notes_per_section_assignment = 20;
        cfg.max_notes_per_section_assignment = 5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn pure_dense_and_pure_sparse_weights_are_valid() {
        assert!(HybridWeights { dense_w: 1.0, sparse_w: 0.0 }.is_valid());
        assert!(HybridWeights { dense_w: 0.0, sparse_w: 1.0 }.is_valid());
    }
}
