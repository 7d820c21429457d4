//! Chat turn orchestration: turn user input into one generate-copy call and fold the
//! reply back into the session's message log.
//!
//! Every session is single-flight. While a call is outstanding, further `send` and
//! `regenerate` calls are rejected (not queued). Failures never surface as errors; they
//! become a fixed fallback reply in the log.

use crate::conversation::{ConversationStore, Message, Role};
use crate::llm::{GenerateRequest, Generator, DEFAULT_MAX_TOKENS};
use crate::scope::{ClientScope, ScopeSelector};
use crate::templates::TemplateId;
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Assistant reply used when generation fails.
pub const FALLBACK_REPLY: &str =
    "Lo siento, ha ocurrido un error al generar el contenido. Por favor, inténtalo de nuevo.";

/// Why an operation did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// Input was empty after trimming.
    EmptyInput,
    /// Another call is in flight for this session.
    Busy,
    /// Regenerate target is not an assistant reply to a user message.
    InvalidIndex,
    /// The conversation was reset while the call was in flight; the reply was dropped.
    Reset,
}

/// What a `send`/`regenerate` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "camelCase")]
pub enum Outcome {
    /// The backend answered and the reply is in the log.
    Generated,
    /// The backend failed; the fallback reply is in the log.
    Fallback,
    Skipped(SkipReason),
}

/// Read-only view of a session for rendering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSnapshot {
    pub template_id: TemplateId,
    pub messages: Vec<Message>,
    pub in_flight: bool,
    pub client_scope: Option<ClientScope>,
    pub input: String,
    pub suggestions_visible: bool,
}

struct State {
    template: TemplateId,
    log: ConversationStore,
    scope: ScopeSelector,
    input: String,
    /// Bumped on every reset so replies to a discarded conversation are dropped.
    epoch: u64,
}

/// Holds the in-flight flag for as long as it lives.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One chat session: template, message log, client scope and pending input.
pub struct ChatSession {
    state: RwLock<State>,
    in_flight: AtomicBool,
    generator: Arc<dyn Generator>,
    max_tokens: u32,
}

impl ChatSession {
    pub fn new(template: TemplateId, generator: Arc<dyn Generator>) -> Self {
        Self::with_max_tokens(template, generator, DEFAULT_MAX_TOKENS)
    }

    pub fn with_max_tokens(
        template: TemplateId,
        generator: Arc<dyn Generator>,
        max_tokens: u32,
    ) -> Self {
        Self {
            state: RwLock::new(State {
                template,
                log: ConversationStore::new(template),
                scope: ScopeSelector::default(),
                input: template.config().default_input.to_string(),
                epoch: 0,
            }),
            in_flight: AtomicBool::new(false),
            generator,
            max_tokens,
        }
    }

    /// Send `input` as the next user message.
    pub async fn send(&self, input: &str) -> Outcome {
        self.send_inner(input, false).await
    }

    /// Send the pending input buffer. The buffer is cleared only if the send is accepted.
    pub async fn submit(&self) -> Outcome {
        let input = self.state.read().await.input.clone();
        self.send_inner(&input, true).await
    }

    async fn send_inner(&self, input: &str, clear_input: bool) -> Outcome {
        let prompt = input.trim();
        if prompt.is_empty() {
            log::debug!("chat: ignoring empty input");
            return Outcome::Skipped(SkipReason::EmptyInput);
        }
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            log::debug!("chat: send rejected, a call is already in flight");
            return Outcome::Skipped(SkipReason::Busy);
        };

        let (request, epoch) = {
            let mut state = self.state.write().await;
            state.log.append(Message::user(prompt));
            if clear_input {
                state.input.clear();
            }
            let request = GenerateRequest {
                prompt: prompt.to_string(),
                template: state.template,
                max_tokens: self.max_tokens,
                conversation_history: state.log.history(),
                client_id: state.scope.client_id().map(str::to_string),
            };
            (request, state.epoch)
        };

        let (content, outcome) = self.generate(request).await;

        let mut state = self.state.write().await;
        if state.epoch != epoch {
            log::debug!("chat: conversation was reset during send, dropping reply");
            return Outcome::Skipped(SkipReason::Reset);
        }
        state.log.append(Message::assistant(content));
        outcome
    }

    /// Regenerate the assistant reply at `index` in place, re-asking the user message
    /// right before it with the history up to that point.
    pub async fn regenerate(&self, index: usize) -> Outcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            log::debug!("chat: regenerate rejected, a call is already in flight");
            return Outcome::Skipped(SkipReason::Busy);
        };

        let (request, epoch) = {
            let state = self.state.read().await;
            let target = state.log.get(index);
            let previous = index.checked_sub(1).and_then(|i| state.log.get(i));
            let prompt = match (target, previous) {
                (Some(t), Some(p))
                    if t.role == Role::Assistant && !t.is_welcome() && p.role == Role::User =>
                {
                    p.content.clone()
                }
                _ => {
                    log::debug!("chat: regenerate ignored, index {} is not a reply", index);
                    return Outcome::Skipped(SkipReason::InvalidIndex);
                }
            };
            let request = GenerateRequest {
                prompt,
                template: state.template,
                max_tokens: self.max_tokens,
                conversation_history: state.log.history_before(index),
                client_id: state.scope.client_id().map(str::to_string),
            };
            (request, state.epoch)
        };

        let (content, outcome) = self.generate(request).await;

        let mut state = self.state.write().await;
        if state.epoch != epoch {
            log::debug!("chat: conversation was reset during regenerate, dropping reply");
            return Outcome::Skipped(SkipReason::Reset);
        }
        if !state.log.replace_at(index, content, Utc::now()) {
            log::debug!("chat: regenerate target {} is no longer a reply, reply dropped", index);
        }
        outcome
    }

    /// Start a new conversation with `template`: welcome message only, input re-seeded.
    pub async fn reset_conversation(&self, template: TemplateId) {
        let mut state = self.state.write().await;
        state.template = template;
        state.log.reset(template);
        state.input = template.config().default_input.to_string();
        state.epoch += 1;
    }

    async fn generate(&self, request: GenerateRequest) -> (String, Outcome) {
        log::info!(
            "chat: generating with template {} ({} history messages, client {})",
            request.template,
            request.conversation_history.len(),
            request.client_id.as_deref().unwrap_or("none")
        );
        match self.generator.generate(request).await {
            Ok(res) => {
                log::info!(
                    "chat: reply received, api {}",
                    res.api_variant.as_deref().unwrap_or("unknown")
                );
                if let Some(usage) = &res.usage {
                    log::debug!(
                        "chat: usage prompt={} completion={} total={}",
                        usage.prompt_tokens,
                        usage.completion_tokens,
                        usage.total_tokens
                    );
                }
                (res.text, Outcome::Generated)
            }
            Err(e) => {
                log::error!("chat: generation failed: {}", e);
                (FALLBACK_REPLY.to_string(), Outcome::Fallback)
            }
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.log.messages().to_vec()
    }

    pub async fn template(&self) -> TemplateId {
        self.state.read().await.template
    }

    pub async fn client_scope(&self) -> Option<ClientScope> {
        self.state.read().await.scope.current().cloned()
    }

    /// Select a client (or clear with `None`). History is kept.
    pub async fn set_client_scope(&self, scope: Option<ClientScope>) {
        self.state.write().await.scope.select(scope);
    }

    /// Select `scope`, or deselect it if it is already selected.
    pub async fn toggle_client_scope(&self, scope: ClientScope) {
        self.state.write().await.scope.toggle(scope);
    }

    /// Drop the selection if it refers to `client_id`.
    pub async fn forget_client(&self, client_id: &str) -> bool {
        self.state.write().await.scope.clear_if(client_id)
    }

    pub async fn input(&self) -> String {
        self.state.read().await.input.clone()
    }

    pub async fn set_input(&self, input: impl Into<String>) {
        self.state.write().await.input = input.into();
    }

    /// Copy suggestion `index` of the active template into the input buffer.
    pub async fn apply_suggestion(&self, index: usize) -> bool {
        let mut state = self.state.write().await;
        match state.template.config().suggestions.get(index) {
            Some(s) => {
                state.input = s.to_string();
                true
            }
            None => false,
        }
    }

    /// Suggestions are offered until the first user message.
    pub async fn suggestions_visible(&self) -> bool {
        self.state.read().await.log.len() == 1
    }

    pub async fn snapshot(&self) -> ChatSnapshot {
        let state = self.state.read().await;
        ChatSnapshot {
            template_id: state.template,
            messages: state.log.messages().to_vec(),
            in_flight: self.is_in_flight(),
            client_scope: state.scope.current().cloned(),
            input: state.input.clone(),
            suggestions_visible: state.log.len() == 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GenerateResponse, LlmError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with canned texts in order; `Err` entries become api errors.
    #[derive(Default)]
    struct Scripted {
        replies: Mutex<Vec<Result<String, String>>>,
        requests: Mutex<Vec<GenerateRequest>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
            let replies = replies
                .into_iter()
                .rev()
                .map(|r| r.map(str::to_string).map_err(str::to_string))
                .collect();
            Arc::new(Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<GenerateRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generator for Scripted {
        async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            match self.replies.lock().unwrap().pop() {
                Some(Ok(text)) => Ok(GenerateResponse::text(text)),
                Some(Err(e)) => Err(LlmError::Api(e)),
                None => Err(LlmError::Api("no scripted reply".to_string())),
            }
        }
    }

    fn session(gen: &Arc<Scripted>) -> ChatSession {
        ChatSession::new(TemplateId::Linkedin, gen.clone())
    }

    #[tokio::test]
    async fn new_session_is_seeded_from_template() {
        let gen = Scripted::new(vec![]);
        let s = session(&gen);
        let messages = s.messages().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_welcome());
        assert_eq!(s.input().await, "Quiero mi post");
        assert!(s.suggestions_visible().await);
    }

    #[tokio::test]
    async fn empty_input_is_ignored() {
        let gen = Scripted::new(vec![Ok("nunca")]);
        let s = session(&gen);
        assert_eq!(s.send("").await, Outcome::Skipped(SkipReason::EmptyInput));
        assert_eq!(s.send("  \n\t ").await, Outcome::Skipped(SkipReason::EmptyInput));
        assert_eq!(s.messages().await.len(), 1);
        assert!(gen.requests().is_empty());
    }

    #[tokio::test]
    async fn send_appends_user_then_reply() {
        let gen = Scripted::new(vec![Ok("Post generado.")]);
        let s = session(&gen);
        assert_eq!(s.send("  Quiero mi post  ").await, Outcome::Generated);

        let messages = s.messages().await;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "Quiero mi post");
        assert_eq!(messages[2].content, "Post generado.");
        assert!(!s.is_in_flight());

        let req = &gen.requests()[0];
        assert_eq!(req.prompt, "Quiero mi post");
        assert_eq!(req.max_tokens, 2000);
        assert_eq!(req.conversation_history.len(), 1);
        assert_eq!(req.conversation_history[0].content, "Quiero mi post");
    }

    #[tokio::test]
    async fn failure_appends_fallback_and_keeps_user_message() {
        let gen = Scripted::new(vec![Err("500 boom")]);
        let s = session(&gen);
        assert_eq!(s.send("hola").await, Outcome::Fallback);
        let messages = s.messages().await;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, "hola");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[2].content, FALLBACK_REPLY);
        assert!(!s.is_in_flight());
    }

    #[tokio::test]
    async fn regenerate_rewrites_in_place() {
        let gen = Scripted::new(vec![Ok("primera"), Ok("segunda")]);
        let s = session(&gen);
        s.send("pide algo").await;
        let before = s.messages().await;

        assert_eq!(s.regenerate(2).await, Outcome::Generated);
        let after = s.messages().await;
        assert_eq!(after.len(), before.len());
        assert_eq!(after[2].content, "segunda");
        assert_eq!(after[2].id, before[2].id);
        assert_eq!(after[1], before[1]);

        let req = &gen.requests()[1];
        assert_eq!(req.prompt, "pide algo");
        assert_eq!(req.conversation_history.len(), 1);
    }

    #[tokio::test]
    async fn regenerate_rejects_invalid_targets() {
        let gen = Scripted::new(vec![Ok("r")]);
        let s = session(&gen);
        s.send("p").await;
        for i in [0, 1, 3, 99] {
            assert_eq!(s.regenerate(i).await, Outcome::Skipped(SkipReason::InvalidIndex));
        }
        assert_eq!(gen.requests().len(), 1);
        assert!(!s.is_in_flight());
    }

    #[tokio::test]
    async fn regenerate_failure_replaces_with_fallback() {
        let gen = Scripted::new(vec![Ok("buena"), Err("timeout")]);
        let s = session(&gen);
        s.send("p").await;
        assert_eq!(s.regenerate(2).await, Outcome::Fallback);
        let messages = s.messages().await;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].content, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn reset_restores_welcome_and_seed_input() {
        let gen = Scripted::new(vec![Ok("r")]);
        let s = session(&gen);
        s.send("p").await;
        s.set_input("borrador").await;
        s.reset_conversation(TemplateId::SalesLetter).await;

        let messages = s.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].content,
            TemplateId::SalesLetter.config().welcome_message
        );
        assert_eq!(s.input().await, "");
        assert_eq!(s.template().await, TemplateId::SalesLetter);
    }

    #[tokio::test]
    async fn submit_clears_input_only_when_accepted() {
        let gen = Scripted::new(vec![Ok("r")]);
        let s = session(&gen);
        assert!(s.apply_suggestion(1).await);
        assert_eq!(s.input().await, "Quiero mi post para el martes");
        assert!(!s.apply_suggestion(42).await);

        assert_eq!(s.submit().await, Outcome::Generated);
        assert_eq!(s.input().await, "");
        assert_eq!(s.messages().await[1].content, "Quiero mi post para el martes");
        assert!(!s.suggestions_visible().await);

        s.set_input("   ").await;
        assert_eq!(s.submit().await, Outcome::Skipped(SkipReason::EmptyInput));
        assert_eq!(s.input().await, "   ");
    }

    #[tokio::test]
    async fn client_scope_is_forwarded_and_independent_of_history() {
        let gen = Scripted::new(vec![Ok("a"), Ok("b")]);
        let s = session(&gen);
        s.send("uno").await;
        s.set_client_scope(Some(ClientScope::named("c-7", "Acme"))).await;
        assert_eq!(s.messages().await.len(), 3);
        s.send("dos").await;

        let reqs = gen.requests();
        assert_eq!(reqs[0].client_id, None);
        assert_eq!(reqs[1].client_id.as_deref(), Some("c-7"));
        assert_eq!(reqs[1].conversation_history.len(), 3);

        assert!(s.forget_client("c-7").await);
        assert_eq!(s.client_scope().await, None);
    }

    #[test]
    fn guard_releases_flag_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _g = InFlightGuard::acquire(&flag).unwrap();
            assert!(InFlightGuard::acquire(&flag).is_none());
        }
        assert!(!flag.load(Ordering::Acquire));
        assert!(InFlightGuard::acquire(&flag).is_some());
    }
}
