//! Chat request lifecycle stages, for tracing.

use std::fmt;

/// Where a chat request is in its lifecycle.
///
/// `Received → SessionResolved → (Enriched | Skipped) → Assembled →
/// Completed | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatStage {
    Received,
    SessionResolved,
    Enriched,
    Skipped,
    Assembled,
    Completed,
    Failed,
}

impl ChatStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::SessionResolved => "session_resolved",
            Self::Enriched => "enriched",
            Self::Skipped => "skipped",
            Self::Assembled => "assembled",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ChatStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(ChatStage::Completed.is_terminal());
        assert!(ChatStage::Failed.is_terminal());
        assert!(!ChatStage::Enriched.is_terminal());
        assert_eq!(ChatStage::SessionResolved.to_string(), "session_resolved");
    }
}
