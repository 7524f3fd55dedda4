//! Completion gateway: the external language-model collaborator.
//!
//! The orchestrator only sees the [`CompletionGateway`] trait; the concrete
//! service behind it is swappable. [`GeminiGateway`] talks to the Gemini REST
//! API; [`MockGateway`] returns canned replies for tests and for running
//! without an API key.
//!
//! The gateway's output is treated as opaque text: it is never parsed and no
//! structured shape is required from it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use pawdesk_core::config::GatewayConfig;
use pawdesk_core::types::{ConversationContext, Message, Role};

use crate::error::ChatError;

/// System instruction sent with every completion request.
const SYSTEM_PROMPT: &str = "You are a friendly, professional veterinary assistant chatbot for a veterinary clinic. Your role is to:\n\
\n\
1. Answer ONLY veterinary-related questions about:\n\
   - Pet health, symptoms, and diseases\n\
   - Pet nutrition and diet\n\
   - Vaccinations and preventive care\n\
   - Pet behavior and training\n\
   - Emergency signs that require immediate vet attention\n\
   - General pet care advice (dogs, cats, birds, rabbits, fish, reptiles, etc.)\n\
   - Appointment booking for veterinary services\n\
\n\
2. For NON-veterinary questions, politely respond: \"I'm specialized in veterinary topics only. I can help you with pet health questions, care advice, or booking an appointment. Is there something pet-related I can assist you with?\"\n\
\n\
3. Always be warm, empathetic, and reassuring — pet owners are often worried about their animals.\n\
\n\
4. If a pet seems to have a medical emergency (difficulty breathing, seizures, heavy bleeding, collapse), always advise seeking immediate emergency vet care.\n\
\n\
5. Keep responses concise but thorough. Use simple language, avoid excessive medical jargon.";

/// External completion service.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Produce a free-form reply to `message` given prior conversation
    /// `history` (oldest first, already windowed by the caller's contract to
    /// exclude the message itself) and session `context`.
    async fn complete(
        &self,
        history: &[Message],
        message: &str,
        context: &ConversationContext,
    ) -> Result<String, ChatError>;
}

/// Single-line identity prefix so the model can personalize replies without
/// the orchestrator inspecting its output.
fn context_prefix(context: &ConversationContext) -> String {
    let mut prefix = String::new();
    if let Some(name) = &context.user_name {
        prefix.push_str(&format!("[User: {}] ", name));
    }
    if let Some(pet) = &context.pet_name {
        prefix.push_str(&format!("[Pet: {}] ", pet));
    }
    prefix
}

/// At most the last `max` messages of history.
fn window(history: &[Message], max: usize) -> &[Message] {
    &history[history.len().saturating_sub(max)..]
}

// =============================================================================
// Gemini REST implementation
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Gateway backed by the Gemini `generateContent` REST endpoint.
pub struct GeminiGateway {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_history: usize,
}

impl GeminiGateway {
    /// Build a gateway from configuration.
    ///
    /// The request timeout is enforced by the HTTP client; a stalled call
    /// surfaces as [`ChatError::GatewayUnavailable`].
    pub fn new(config: &GatewayConfig, api_key: String) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            max_history: config.max_history,
        })
    }

    fn role_name(role: Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Bot => "model",
        }
    }
}

#[async_trait]
impl CompletionGateway for GeminiGateway {
    async fn complete(
        &self,
        history: &[Message],
        message: &str,
        context: &ConversationContext,
    ) -> Result<String, ChatError> {
        let mut contents: Vec<Content> = window(history, self.max_history)
            .iter()
            .map(|msg| Content {
                role: Some(Self::role_name(msg.role).to_string()),
                parts: vec![Part {
                    text: msg.content.clone(),
                }],
            })
            .collect();

        contents.push(Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: format!("{}{}", context_prefix(context), message),
            }],
        });

        let request = GenerateContentRequest {
            contents,
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_PROMPT.to_string(),
                }],
            },
        };

        let url = format!(
            "{}/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Completion request failed");
                ChatError::GatewayUnavailable(format!("request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(status = %status, "Completion service returned an error");
            return Err(ChatError::GatewayUnavailable(format!(
                "service returned {}",
                status
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ChatError::GatewayUnavailable(format!("unreadable response: {}", e)))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ChatError::GatewayUnavailable(
                "empty completion response".to_string(),
            ));
        }

        Ok(text)
    }
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Gateway that returns a canned reply (or a forced failure).
///
/// Used by tests, and as the production fallback when no API key is
/// configured.
pub struct MockGateway {
    reply: String,
    fail: bool,
    calls: AtomicUsize,
}

impl MockGateway {
    /// A gateway that always replies with `reply`.
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A gateway whose every call fails with `GatewayUnavailable`.
    pub fn failing() -> Self {
        Self {
            reply: String::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `complete` calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionGateway for MockGateway {
    async fn complete(
        &self,
        _history: &[Message],
        _message: &str,
        _context: &ConversationContext,
    ) -> Result<String, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ChatError::GatewayUnavailable(
                "mock gateway failure".to_string(),
            ));
        }
        Ok(self.reply.clone())
    }
}
