//! ExecutionLog domain model (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Success,
    Failure,
    Warning,
    Running,
}

impl LogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Warning => "warning",
            Self::Running => "running",
        }
    }
}

/// Prompt/completion/native token counts for one invocation (§3).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenCounts {
    pub prompt: u64,
    pub completion: u64,
    pub native: Option<u64>,
}

impl TokenCounts {
    pub fn total(&self) -> u64 {
        self.prompt + self.completion
    }
}

/// A single tool invocation made during an agent call, recorded for
/// post-mortem debugging (§3 `tool_calls[]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub input_summary: String,
    pub output_summary: String,
}

/// One append-only execution record (§3). Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionLog {
    pub id: Uuid,
    pub mission_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub agent_name: String,
    pub action: String,
    pub status: LogStatus,
    pub input_summary: String,
    pub output_summary: String,
    pub error_message: Option<String>,
    pub model_details: Option<String>,
    pub token_counts: TokenCounts,
    pub cost_decimal: f64,
    pub tool_calls: Vec<ToolCallRecord>,
}

impl ExecutionLog {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mission_id: Uuid,
        agent_name: impl Into<String>,
        action: impl Into<String>,
        status: LogStatus,
        input_summary: impl Into<String>,
        output_summary: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            mission_id,
            timestamp: Utc::now(),
            agent_name: agent_name.into(),
            action: action.into(),
            status,
            input_summary: input_summary.into(),
            output_summary: output_summary.into(),
            error_message: None,
            model_details: None,
            token_counts: TokenCounts::default(),
            cost_decimal: 0.0,
            tool_calls: Vec::new(),
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_tokens(mut self, tokens: TokenCounts, cost: f64) -> Self {
        self.token_counts = tokens;
        self.cost_decimal = cost;
        self
    }

    pub fn with_model_details(mut self, model_details: impl Into<String>) -> Self {
        self.model_details = Some(model_details.into());
        self
    }
}

/// Pagination parameters shared by log/note listing operations (§4.1, §4.5).
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit: limit.max(1) }
    }
}
