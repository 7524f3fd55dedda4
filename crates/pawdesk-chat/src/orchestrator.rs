//! Chat orchestrator: central coordinator wiring intent detection, the
//! booking workflow, the completion gateway, and persistence.
//!
//! One `handle` call is one turn: load the conversation, route the message,
//! apply the state transition, persist once, return the reply. Turns on the
//! same session are serialized through a per-session lock; distinct sessions
//! never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use tokio::sync::Mutex as TokioMutex;

use pawdesk_core::config::ChatConfig;
use pawdesk_core::types::{
    Appointment, BookingData, BookingState, BookingStep, Conversation, ConversationContext,
    Message, Role,
};
use pawdesk_storage::{ConversationRepository, Database};

use crate::error::ChatError;
use crate::gateway::CompletionGateway;
use crate::intent::IntentDetector;
use crate::workflow::{self, Outcome};

/// Result of one orchestrated turn.
#[derive(Clone, Debug)]
pub struct TurnOutput {
    /// The bot's reply for this turn.
    pub reply: String,
    /// The appointment record, when this turn confirmed a booking.
    pub appointment_created: Option<Appointment>,
    /// Whether a booking workflow is active after this turn.
    pub booking_active: bool,
}

/// Central per-session conversation orchestrator.
pub struct ChatOrchestrator {
    conversations: ConversationRepository,
    gateway: Arc<dyn CompletionGateway>,
    detector: IntentDetector,
    max_message_length: usize,
    session_locks: StdMutex<HashMap<String, Arc<TokioMutex<()>>>>,
}

impl ChatOrchestrator {
    /// Create a new orchestrator over the given database and gateway.
    pub fn new(db: Arc<Database>, gateway: Arc<dyn CompletionGateway>, config: &ChatConfig) -> Self {
        Self {
            conversations: ConversationRepository::new(db),
            gateway,
            detector: IntentDetector,
            max_message_length: config.max_message_length,
            session_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Handle one inbound message for a session.
    ///
    /// Branches in order: continue an active workflow, start one on detected
    /// intent (emitting the opening prompt in the same turn), or fall through
    /// to the completion gateway. The conversation is persisted exactly once
    /// per turn; a confirmed booking's appointment commits in the same
    /// transaction.
    pub async fn handle(
        &self,
        session_id: &str,
        message: &str,
        caller_context: Option<&ConversationContext>,
    ) -> Result<TurnOutput, ChatError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(ChatError::EmptySession);
        }
        let text = message.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.len() > self.max_message_length {
            return Err(ChatError::MessageTooLong(self.max_message_length));
        }

        // Serialize turns per session; concurrent calls against the same
        // session would otherwise race on the read-modify-write below.
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let mut conversation = self
            .conversations
            .find(session_id)?
            .unwrap_or_else(|| Conversation::new(session_id));

        // Caller-supplied context fields are authoritative.
        if let Some(ctx) = caller_context {
            conversation.context.merge(ctx);
        }

        let user_msg = Message::now(Role::User, text);
        conversation.messages.push(user_msg.clone());

        let mut appointment: Option<Appointment> = None;

        let reply = match conversation.booking.clone() {
            BookingState::Active { step, data } => {
                let transition = workflow::advance(Some(step), text, &data, &conversation.context);
                let mut data = data;
                data.merge(&transition.patch);

                match transition.outcome {
                    Outcome::Continue => {
                        let next = transition.next_step.unwrap_or(step);
                        conversation.booking = BookingState::Active { step: next, data };
                    }
                    Outcome::Confirmed => {
                        // Per-step validation means the data is complete here;
                        // checked again before the record is created.
                        let apt = data.to_appointment(&conversation.session_id).ok_or_else(|| {
                            ChatError::Internal(
                                "booking confirmed with incomplete data".to_string(),
                            )
                        })?;
                        tracing::info!(
                            session_id = %conversation.session_id,
                            appointment_id = %apt.id,
                            "Appointment confirmed"
                        );
                        conversation.appointment_id = Some(apt.id);
                        conversation.booking = BookingState::Inactive;
                        appointment = Some(apt);
                    }
                    Outcome::Cancelled => {
                        tracing::info!(session_id = %conversation.session_id, "Booking cancelled");
                        conversation.booking = BookingState::Inactive;
                    }
                }
                transition.reply
            }

            BookingState::Inactive => {
                if self.detector.detect(text) {
                    // Detection and first-step prompting happen in one turn.
                    let transition =
                        workflow::advance(None, text, &BookingData::default(), &conversation.context);
                    let step = transition.next_step.unwrap_or(BookingStep::OwnerName);
                    conversation.booking = BookingState::Active {
                        step,
                        data: transition.patch.clone(),
                    };
                    tracing::debug!(session_id = %conversation.session_id, "Booking workflow started");
                    transition.reply
                } else {
                    // Prior history excludes the message just appended.
                    let history = &conversation.messages[..conversation.messages.len() - 1];
                    match self
                        .gateway
                        .complete(history, text, &conversation.context)
                        .await
                    {
                        Ok(reply) => reply,
                        Err(err) => {
                            // The user's message is still recorded as sent;
                            // no bot reply is persisted on hard failure.
                            conversation.updated_at = Utc::now();
                            self.conversations.save_turn(
                                &conversation,
                                std::slice::from_ref(&user_msg),
                                None,
                            )?;
                            return Err(err);
                        }
                    }
                }
            }
        };

        let bot_msg = Message::now(Role::Bot, reply.clone());
        conversation.messages.push(bot_msg.clone());
        conversation.updated_at = Utc::now();

        self.conversations
            .save_turn(&conversation, &[user_msg, bot_msg], appointment.as_ref())?;

        Ok(TurnOutput {
            reply,
            appointment_created: appointment,
            booking_active: conversation.booking.is_active(),
        })
    }

    // -- Private helpers --

    fn session_lock(&self, session_id: &str) -> Arc<TokioMutex<()>> {
        let mut locks = self
            .session_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(TokioMutex::new(())))
            .clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
