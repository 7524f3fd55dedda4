//! Route handler functions for all API endpoints.
//!
//! Each handler extracts body/path parameters via axum extractors, interacts
//! with AppState services, and returns JSON responses. Wire field names are
//! camelCase for the embeddable chat widget.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pawdesk_core::types::{Appointment, AppointmentStatus, ConversationContext, Message};
use pawdesk_storage::{AppointmentRepository, ConversationRepository};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub session_id: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub context: Option<ConversationContext>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub session_id: Option<String>,
    pub owner_name: Option<String>,
    pub pet_name: Option<String>,
    pub phone: Option<String>,
    pub date_time: Option<String>,
}

// =============================================================================
// Response types
// =============================================================================

/// Compact appointment view returned alongside a confirming turn.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSummary {
    pub id: Uuid,
    pub owner_name: String,
    pub pet_name: String,
    pub date_time: String,
    pub status: AppointmentStatus,
}

impl From<&Appointment> for AppointmentSummary {
    fn from(apt: &Appointment) -> Self {
        Self {
            id: apt.id,
            owner_name: apt.owner_name.clone(),
            pet_name: apt.pet_name.clone(),
            date_time: apt.date_time.clone(),
            status: apt.status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub session_id: String,
    pub message: String,
    pub appointment_created: Option<AppointmentSummary>,
    pub booking_active: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub session_id: String,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ConversationContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub total_conversations: u64,
    pub total_appointments: u64,
}

// =============================================================================
// Handler functions
// =============================================================================

/// POST /api/messages - run one conversational turn.
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let session_id = req
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let message = req.message.as_deref().filter(|m| !m.trim().is_empty());

    let (Some(session_id), Some(message)) = (session_id, message) else {
        return Err(ApiError::BadRequest(
            "sessionId and message are required".to_string(),
        ));
    };

    let output = state
        .orchestrator
        .handle(session_id, message, req.context.as_ref())
        .await?;

    Ok(Json(SendMessageResponse {
        session_id: session_id.to_string(),
        message: output.reply,
        appointment_created: output
            .appointment_created
            .as_ref()
            .map(AppointmentSummary::from),
        booking_active: output.booking_active,
        timestamp: Utc::now(),
    }))
}

/// GET /api/history/{session_id} - full conversation history.
///
/// An unknown session returns an empty-messages shape, never 404.
pub async fn history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let conversations = ConversationRepository::new(Arc::clone(&state.database));

    let response = match conversations.find(&session_id)? {
        Some(conv) => HistoryResponse {
            session_id: conv.session_id,
            messages: conv.messages,
            context: Some(conv.context),
            appointment_id: conv.appointment_id,
        },
        None => HistoryResponse {
            session_id,
            messages: Vec::new(),
            context: None,
            appointment_id: None,
        },
    };

    Ok(Json(response))
}

/// POST /api/appointments - create an appointment directly, bypassing the
/// conversational workflow. All fields are required.
pub async fn create_appointment(
    State(state): State<AppState>,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let field = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let (Some(session_id), Some(owner_name), Some(pet_name), Some(phone), Some(date_time)) = (
        field(&req.session_id),
        field(&req.owner_name),
        field(&req.pet_name),
        field(&req.phone),
        field(&req.date_time),
    ) else {
        return Err(ApiError::BadRequest("All fields are required".to_string()));
    };

    let appointment = Appointment::new(session_id, owner_name, pet_name, phone, date_time);
    AppointmentRepository::new(Arc::clone(&state.database)).create(&appointment)?;

    tracing::info!(appointment_id = %appointment.id, "Appointment created directly");

    Ok((StatusCode::CREATED, Json(appointment)))
}

/// GET /api/appointments/{session_id} - all appointments for a session.
pub async fn list_appointments(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let appointments =
        AppointmentRepository::new(Arc::clone(&state.database)).find_by_session(&session_id)?;
    Ok(Json(appointments))
}

/// GET /health - service liveness and basic counters.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let total_conversations = ConversationRepository::new(Arc::clone(&state.database)).count()?;
    let total_appointments = AppointmentRepository::new(Arc::clone(&state.database)).count()?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        total_conversations,
        total_appointments,
    }))
}
