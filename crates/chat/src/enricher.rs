//! Context enrichment from the caller's record data.
//!
//! At most one lookup per request. Lookup failures never abort a chat: they
//! are logged and the prompt goes out without an enrichment turn.

use averygate_core::message::Turn;
use averygate_records::{RecordsClient, UserProgress};
use tracing::{debug, warn};

/// Produces the transient `system` turn that summarizes a user's progress.
#[derive(Clone)]
pub struct ContextEnricher {
    records: RecordsClient,
}

impl ContextEnricher {
    pub fn new(records: RecordsClient) -> Self {
        Self { records }
    }

    /// Look up `email` and format a summary turn. `None` when no email was
    /// given, no record matched, or the lookup failed.
    pub async fn enrich(&self, email: Option<&str>) -> Option<Turn> {
        let email = email.map(str::trim).filter(|e| !e.is_empty())?;

        match self.records.user_progress(email).await {
            Ok(Some(progress)) => Some(Turn::system(format_user_data(&progress))),
            Ok(None) => {
                debug!(store = self.records.store_name(), "No record for enrichment");
                None
            }
            Err(e) => {
                warn!(store = self.records.store_name(), error = %e, "Enrichment lookup failed");
                None
            }
        }
    }
}

/// `User data: name=…, stage=…, currentModule=…, totalPoints=….`
pub fn format_user_data(progress: &UserProgress) -> String {
    format!(
        "User data: name={}, stage={}, currentModule={}, totalPoints={}.",
        progress.name.as_deref().unwrap_or("unknown"),
        progress.stage.as_deref().unwrap_or("unknown"),
        progress.current_module.as_deref().unwrap_or("unknown"),
        progress.total_points,
    )
}
