//! ReportVersion domain model (§3, §8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable snapshot of the generated report; at most one per mission
/// has `is_current = true` (§8 invariant).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportVersion {
    pub version: u32,
    pub title: Option<String>,
    pub content_markdown: String,
    pub is_current: bool,
    pub revision_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ReportVersion {
    /// Builds the next version in sequence given the prior versions for a
    /// mission (numbered `1..N`, no gaps — §8 invariant).
    pub fn next(prior: &[ReportVersion], content_markdown: impl Into<String>, title: Option<String>, revision_notes: Option<String>) -> Self {
        let version = prior.iter().map(|v| v.version).max().unwrap_or(0) + 1;
        Self {
            version,
            title,
            content_markdown: content_markdown.into(),
            is_current: true,
            revision_notes,
            created_at: Utc::now(),
        }
    }
}

/// Demotes all prior versions' `is_current` flag; call before persisting a
/// new current version so exactly one stays current (§8).
pub fn demote_current(versions: &mut [ReportVersion]) {
    for v in versions.iter_mut() {
        v.is_current = false;
    }
}
