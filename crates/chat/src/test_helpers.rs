//! Shared test doubles for the chat flow.

use async_trait::async_trait;
use averygate_core::error::{CompletionError, RecordError};
use averygate_core::message::Prompt;
use averygate_core::provider::{Completion, CompletionRequest, Provider};
use averygate_core::records::{FieldMap, Filter, RecordStore, TableQuery};
use std::sync::Mutex;

/// A record store answering from a fixed set of `(table, fields)` rows.
pub struct FixtureStore {
    rows: Vec<(String, FieldMap)>,
    fail: bool,
    queries: Mutex<usize>,
}

impl FixtureStore {
    pub fn new(rows: Vec<(&str, serde_json::Value)>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|(t, v)| (t.to_string(), v.as_object().cloned().unwrap()))
                .collect(),
            fail: false,
            queries: Mutex::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// A store whose every query fails with a 500.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::empty()
        }
    }

    pub fn query_count(&self) -> usize {
        *self.queries.lock().unwrap()
    }
}

#[async_trait]
impl RecordStore for FixtureStore {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn query(&self, query: &TableQuery) -> Result<Vec<FieldMap>, RecordError> {
        *self.queries.lock().unwrap() += 1;
        if self.fail {
            return Err(RecordError::Api {
                status: 500,
                message: "boom".into(),
            });
        }

        let matches = |fields: &FieldMap| match &query.filter {
            Some(Filter::Equals { field, value }) => {
                fields.get(field).and_then(|v| v.as_str()) == Some(value.as_str())
            }
            _ => true,
        };

        let mut out: Vec<FieldMap> = self
            .rows
            .iter()
            .filter(|(table, fields)| *table == query.table && matches(fields))
            .map(|(_, fields)| fields.clone())
            .collect();
        if let Some(max) = query.max_records {
            out.truncate(max as usize);
        }
        Ok(out)
    }
}

/// One scripted provider outcome.
#[derive(Clone)]
pub enum Script {
    Reply(&'static str),
    Fail(CompletionError),
}

/// A provider that plays back scripted outcomes in order and keeps every
/// prompt it was sent. Repeats the last outcome once the script runs out.
pub struct ScriptedProvider {
    script: Vec<Script>,
    configured: bool,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Script>) -> Self {
        Self {
            script,
            configured: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &'static str) -> Self {
        Self::new(vec![Script::Reply(text)])
    }

    pub fn failing(error: CompletionError) -> Self {
        Self::new(vec![Script::Fail(error)])
    }

    /// A provider with no credential.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::replying("unused")
        }
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn ensure_configured(&self) -> Result<(), CompletionError> {
        if self.configured {
            Ok(())
        } else {
            Err(CompletionError::NotConfigured("OPENAI_API_KEY".into()))
        }
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, CompletionError> {
        let mut prompts = self.prompts.lock().unwrap();
        let step = self.script[prompts.len().min(self.script.len() - 1)].clone();
        prompts.push(request.prompt.clone());
        match step {
            Script::Reply(text) => Ok(Completion::text(text)),
            Script::Fail(e) => Err(e),
        }
    }
}
