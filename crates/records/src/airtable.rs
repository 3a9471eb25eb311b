//! Airtable implementation of the record store.
//!
//! `GET {api_url}/{base_id}/{table}` with `filterByFormula`, `fields[]`,
//! `maxRecords` and `offset` query parameters. Responses are pages of
//! `{"records": [{"id", "fields"}], "offset"}`; pages are followed until the
//! service stops returning an offset or `max_records` is satisfied.

use async_trait::async_trait;
use averygate_core::error::RecordError;
use averygate_core::records::{FieldMap, RecordStore, TableQuery};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Upper bound on pages followed for one query.
const MAX_PAGES: usize = 50;

/// A record store backed by the Airtable REST API.
pub struct AirtableStore {
    api_url: reqwest::Url,
    api_key: Option<String>,
    base_id: Option<String>,
    client: reqwest::Client,
}

impl AirtableStore {
    /// Create a store. Credentials may be absent; queries then fail with
    /// [`RecordError::NotConfigured`] instead of the server refusing to start.
    pub fn new(
        api_url: &str,
        api_key: Option<String>,
        base_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RecordError> {
        let api_url = reqwest::Url::parse(api_url)
            .map_err(|e| RecordError::InvalidRequest(format!("invalid api_url '{api_url}': {e}")))?;
        if api_url.cannot_be_a_base() {
            return Err(RecordError::InvalidRequest(format!(
                "api_url '{api_url}' cannot carry a path"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RecordError::InvalidRequest(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_url,
            api_key,
            base_id,
            client,
        })
    }

    /// Build from the `[records]` configuration section.
    pub fn from_config(config: &averygate_config::RecordsConfig) -> Result<Self, RecordError> {
        Self::new(
            &config.api_url,
            config.api_key.clone(),
            config.base_id.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// `{api_url}/{base_id}/{table}` with each segment percent-encoded.
    fn table_url(&self, base_id: &str, table: &str) -> Result<reqwest::Url, RecordError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| RecordError::InvalidRequest("api_url cannot carry a path".into()))?
            .pop_if_empty()
            .push(base_id)
            .push(table);
        Ok(url)
    }

    fn query_params(query: &TableQuery, offset: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(formula) = query.formula() {
            params.push(("filterByFormula", formula));
        }
        for field in &query.fields {
            params.push(("fields[]", field.clone()));
        }
        if let Some(max) = query.max_records {
            params.push(("maxRecords", max.to_string()));
        }
        if let Some(offset) = offset {
            params.push(("offset", offset.to_string()));
        }
        params
    }
}

fn transport_error(e: reqwest::Error) -> RecordError {
    if e.is_timeout() {
        RecordError::Timeout(e.to_string())
    } else {
        RecordError::Network(e.to_string())
    }
}

#[async_trait]
impl RecordStore for AirtableStore {
    fn name(&self) -> &str {
        "airtable"
    }

    async fn query(&self, query: &TableQuery) -> Result<Vec<FieldMap>, RecordError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RecordError::NotConfigured("AIRTABLE_API_KEY".into()))?;
        let base_id = self
            .base_id
            .as_deref()
            .ok_or_else(|| RecordError::NotConfigured("AIRTABLE_BASE_ID".into()))?;
        let url = self.table_url(base_id, &query.table)?;

        let mut records: Vec<FieldMap> = Vec::new();
        let mut offset: Option<String> = None;

        for page in 0..MAX_PAGES {
            debug!(table = %query.table, page, "Querying records");

            let response = self
                .client
                .get(url.clone())
                .bearer_auth(api_key)
                .query(&Self::query_params(query, offset.as_deref()))
                .send()
                .await
                .map_err(transport_error)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                error!(status = status.as_u16(), table = %query.table, body = %body, "Records service error");
                return Err(RecordError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let page: ListResponse = response.json().await.map_err(|e| {
                if e.is_timeout() {
                    RecordError::Timeout(e.to_string())
                } else {
                    RecordError::Decode(e.to_string())
                }
            })?;

            records.extend(page.records.into_iter().map(|r| r.fields));

            let satisfied = query
                .max_records
                .is_some_and(|max| records.len() >= max as usize);

            match page.offset {
                Some(next) if !satisfied => offset = Some(next),
                _ => {
                    if let Some(max) = query.max_records {
                        records.truncate(max as usize);
                    }
                    return Ok(records);
                }
            }
        }

        warn!(table = %query.table, pages = MAX_PAGES, "Page limit reached, returning partial listing");
        Ok(records)
    }
}

// --- Airtable API types (internal) ---

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<ApiRecord>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    #[serde(default)]
    fields: FieldMap,
}
