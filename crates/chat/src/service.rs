//! The chat service: one request, one pass through the pipeline.

use std::sync::Arc;

use averygate_config::DEFAULT_SYSTEM_PROMPT;
use averygate_core::error::Error;
use averygate_core::message::{SessionId, Turn};
use averygate_core::provider::{CompletionRequest, ModelParams, Provider};
use averygate_core::session::SessionStore;
use averygate_records::RecordsClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::assembler::assemble;
use crate::enricher::ContextEnricher;
use crate::stage::ChatStage;

/// Inbound chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            email: None,
            session_id: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// The reply and the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub session_id: String,
}

/// Orchestrates session resolution, enrichment, assembly, completion and the
/// session update for each chat request.
pub struct ChatService {
    provider: Arc<dyn Provider>,
    sessions: Arc<dyn SessionStore>,
    enricher: ContextEnricher,
    system_prompt: String,
    params: ModelParams,
}

impl ChatService {
    pub fn new(
        provider: Arc<dyn Provider>,
        sessions: Arc<dyn SessionStore>,
        records: RecordsClient,
    ) -> Self {
        Self {
            provider,
            sessions,
            enricher: ContextEnricher::new(records),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            params: ModelParams::default(),
        }
    }

    /// Set the instruction turn that opens every prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the fixed generation parameters.
    pub fn with_model_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn trace(stage: ChatStage, session_id: Option<&SessionId>) {
        match session_id {
            Some(id) => debug!(stage = %stage, session_id = %id, "Chat stage"),
            None => debug!(stage = %stage, "Chat stage"),
        }
    }

    /// Handle one chat message.
    ///
    /// The user turn is recorded whether or not the completion succeeds; the
    /// assistant turn only when the reply is non-empty. A missing completion
    /// credential fails before anything is recorded.
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatReply, Error> {
        Self::trace(ChatStage::Received, None);
        self.provider.ensure_configured()?;

        // A blank id would key one history shared by every such caller.
        let requested = request
            .session_id
            .filter(|id| !id.trim().is_empty())
            .map(SessionId::from);
        let snapshot = self.sessions.get_or_create(requested).await?;
        let session_id = snapshot.id;
        Self::trace(ChatStage::SessionResolved, Some(&session_id));

        let enrichment = self.enricher.enrich(request.email.as_deref()).await;
        Self::trace(
            if enrichment.is_some() {
                ChatStage::Enriched
            } else {
                ChatStage::Skipped
            },
            Some(&session_id),
        );

        let prompt = assemble(
            &self.system_prompt,
            enrichment,
            &snapshot.history,
            &request.message,
        );
        Self::trace(ChatStage::Assembled, Some(&session_id));

        let outcome = self
            .provider
            .complete(CompletionRequest {
                prompt: &prompt,
                params: &self.params,
            })
            .await;

        let mut turns = vec![Turn::user(request.message)];
        if let Ok(completion) = &outcome {
            if !completion.is_empty() {
                turns.push(Turn::assistant(completion.text.clone()));
            }
        }
        let committed = self.sessions.append_all(&session_id, turns).await;

        match outcome {
            Ok(completion) => {
                let stored = committed?;
                Self::trace(ChatStage::Completed, Some(&session_id));
                info!(
                    session_id = %session_id,
                    provider = self.provider.name(),
                    stored,
                    empty_reply = completion.is_empty(),
                    "Chat completed"
                );
                Ok(ChatReply {
                    reply: completion.text,
                    session_id: session_id.into_string(),
                })
            }
            Err(e) => {
                if let Err(store_err) = committed {
                    warn!(session_id = %session_id, error = %store_err, "Failed to record user turn");
                }
                Self::trace(ChatStage::Failed, Some(&session_id));
                error!(session_id = %session_id, error = %e, "Chat completion failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FixtureStore, Script, ScriptedProvider};
    use averygate_core::error::CompletionError;
    use averygate_core::message::Role;
    use averygate_records::tables;
    use averygate_session::InMemorySessionStore;
    use serde_json::json;

    struct Harness {
        provider: Arc<ScriptedProvider>,
        sessions: Arc<InMemorySessionStore>,
        records: Arc<FixtureStore>,
        service: ChatService,
    }

    fn harness(provider: ScriptedProvider, records: FixtureStore) -> Harness {
        let provider = Arc::new(provider);
        let sessions = Arc::new(InMemorySessionStore::with_window(20));
        let records = Arc::new(records);
        let service = ChatService::new(
            provider.clone(),
            sessions.clone(),
            RecordsClient::new(records.clone()),
        );
        Harness {
            provider,
            sessions,
            records,
            service,
        }
    }

    fn ada() -> FixtureStore {
        FixtureStore::new(vec![(
            tables::SIGNUPS,
            json!({
                "Name": "Ada",
                "Email": "ada@example.com",
                "Major Focuss": "Ideation",
                "User_TotalPoints": 40,
            }),
        )])
    }

    #[tokio::test]
    async fn first_message_creates_session_with_both_turns() {
        let h = harness(ScriptedProvider::replying("hello"), FixtureStore::empty());

        let reply = h.service.handle(ChatRequest::new("hi")).await.unwrap();

        assert_eq!(reply.reply, "hello");
        assert!(!reply.session_id.is_empty());
        let history = h
            .sessions
            .history(&SessionId::from(reply.session_id.as_str()))
            .await
            .unwrap();
        assert_eq!(history, vec![Turn::user("hi"), Turn::assistant("hello")]);
    }

    #[tokio::test]
    async fn prompt_starts_with_configured_instruction() {
        let provider = ScriptedProvider::replying("ok");
        let h = harness(provider, FixtureStore::empty());
        let service = ChatService::new(
            h.provider.clone(),
            h.sessions.clone(),
            RecordsClient::new(h.records.clone()),
        )
        .with_system_prompt("Speak like a pirate.");

        service.handle(ChatRequest::new("hi")).await.unwrap();

        let prompt = &h.provider.prompts()[0];
        assert_eq!(prompt.turns()[0], Turn::system("Speak like a pirate."));
        assert_eq!(prompt.turns().last().unwrap(), &Turn::user("hi"));
    }

    #[tokio::test]
    async fn default_instruction_is_avery() {
        let h = harness(ScriptedProvider::replying("ok"), FixtureStore::empty());
        h.service.handle(ChatRequest::new("hi")).await.unwrap();
        assert_eq!(
            h.provider.prompts()[0].turns()[0].content(),
            DEFAULT_SYSTEM_PROMPT
        );
    }

    #[tokio::test]
    async fn follow_up_sees_prior_history() {
        let h = harness(
            ScriptedProvider::new(vec![Script::Reply("first"), Script::Reply("second")]),
            FixtureStore::empty(),
        );

        let one = h.service.handle(ChatRequest::new("q1")).await.unwrap();
        let two = h
            .service
            .handle(ChatRequest::new("q2").with_session(one.session_id.clone()))
            .await
            .unwrap();

        assert_eq!(two.session_id, one.session_id);
        assert_eq!(two.reply, "second");
        let contents: Vec<String> = h.provider.prompts()[1]
            .turns()
            .iter()
            .map(|t| t.content().to_string())
            .collect();
        assert_eq!(contents[1..], ["q1", "first", "q2"]);
    }

    #[tokio::test]
    async fn unknown_session_id_is_kept() {
        let h = harness(ScriptedProvider::replying("hello"), FixtureStore::empty());
        let reply = h
            .service
            .handle(ChatRequest::new("hi").with_session("my-session"))
            .await
            .unwrap();
        assert_eq!(reply.session_id, "my-session");
        assert_eq!(h.provider.prompts()[0].len(), 2);
    }

    #[tokio::test]
    async fn blank_session_ids_get_fresh_sessions() {
        let h = harness(
            ScriptedProvider::new(vec![Script::Reply("hello"), Script::Reply("hi bob")]),
            FixtureStore::empty(),
        );

        let a = h
            .service
            .handle(ChatRequest::new("alice secret").with_session(""))
            .await
            .unwrap();
        let b = h
            .service
            .handle(ChatRequest::new("bob here").with_session("   "))
            .await
            .unwrap();

        assert_eq!(a.session_id.len(), 36);
        assert_eq!(b.session_id.len(), 36);
        assert_ne!(a.session_id, b.session_id);
        let bob_prompt = &h.provider.prompts()[1];
        assert_eq!(bob_prompt.len(), 2);
        assert_eq!(bob_prompt.turns()[1], Turn::user("bob here"));
        assert_eq!(h.sessions.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn enrichment_is_sent_but_never_stored() {
        let h = harness(ScriptedProvider::replying("hey Ada"), ada());

        let reply = h
            .service
            .handle(ChatRequest::new("hi").with_email("ada@example.com"))
            .await
            .unwrap();

        let prompt = &h.provider.prompts()[0];
        assert_eq!(prompt.len(), 3);
        assert_eq!(prompt.turns()[1].role(), Role::System);
        assert_eq!(
            prompt.turns()[1].content(),
            "User data: name=Ada, stage=Ideation, currentModule=unknown, totalPoints=40."
        );

        let history = h
            .sessions
            .history(&SessionId::from(reply.session_id.as_str()))
            .await
            .unwrap();
        assert!(history.iter().all(|t| t.role() != Role::System));
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn no_record_means_no_enrichment() {
        let h = harness(ScriptedProvider::replying("hello"), ada());
        h.service
            .handle(ChatRequest::new("hi").with_email("nobody@example.com"))
            .await
            .unwrap();
        assert_eq!(h.records.query_count(), 1);
        assert_eq!(h.provider.prompts()[0].len(), 2);
    }

    #[tokio::test]
    async fn record_failure_does_not_abort_chat() {
        let h = harness(ScriptedProvider::replying("hello"), FixtureStore::failing());
        let reply = h
            .service
            .handle(ChatRequest::new("hi").with_email("ada@example.com"))
            .await
            .unwrap();
        assert_eq!(reply.reply, "hello");
    }

    #[tokio::test]
    async fn completion_failure_keeps_user_turn_only() {
        let h = harness(
            ScriptedProvider::failing(CompletionError::Upstream {
                status: 429,
                body: "slow down".into(),
            }),
            FixtureStore::empty(),
        );

        let err = h
            .service
            .handle(ChatRequest::new("hi").with_session("s1"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Completion(CompletionError::Upstream { status: 429, .. })
        ));
        let history = h.sessions.history(&SessionId::from("s1")).await.unwrap();
        assert_eq!(history, vec![Turn::user("hi")]);
    }

    #[tokio::test]
    async fn empty_reply_stores_user_turn_only() {
        let h = harness(ScriptedProvider::replying(""), FixtureStore::empty());
        let reply = h
            .service
            .handle(ChatRequest::new("hi").with_session("s1"))
            .await
            .unwrap();
        assert_eq!(reply.reply, "");
        let history = h.sessions.history(&SessionId::from("s1")).await.unwrap();
        assert_eq!(history, vec![Turn::user("hi")]);
    }

    #[tokio::test]
    async fn missing_credential_records_nothing() {
        let h = harness(ScriptedProvider::unconfigured(), FixtureStore::empty());
        let err = h
            .service
            .handle(ChatRequest::new("hi").with_session("s1"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Completion(CompletionError::NotConfigured(_))
        ));
        assert_eq!(h.sessions.count().await.unwrap(), 0);
        assert!(h.provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn long_conversation_is_trimmed_to_window() {
        // 13 exchanges store 26 turns; only the last 20 survive.
        let h = harness(ScriptedProvider::replying("ok"), FixtureStore::empty());
        for i in 1..=13 {
            h.service
                .handle(ChatRequest::new(format!("m{i}")).with_session("long"))
                .await
                .unwrap();
        }

        let history = h.sessions.history(&SessionId::from("long")).await.unwrap();
        assert_eq!(history.len(), 20);
        assert_eq!(history[0], Turn::user("m4"));
        assert_eq!(history.last().unwrap(), &Turn::assistant("ok"));
        // The 13th prompt carried the 20 retained turns plus instruction and message.
        assert_eq!(h.provider.prompts()[12].len(), 22);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_keep_pairs_adjacent() {
        let provider = Arc::new(ScriptedProvider::replying("ack"));
        let sessions = Arc::new(InMemorySessionStore::with_window(100));
        let service = Arc::new(ChatService::new(
            provider,
            sessions.clone(),
            RecordsClient::new(Arc::new(FixtureStore::empty())),
        ));

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .handle(ChatRequest::new(format!("q{i}")).with_session("shared"))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }

        let history = sessions.history(&SessionId::from("shared")).await.unwrap();
        assert_eq!(history.len(), 40);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role(), Role::User);
            assert_eq!(pair[1], Turn::assistant("ack"));
        }
    }
}
