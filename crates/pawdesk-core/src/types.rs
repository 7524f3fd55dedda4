use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Author of a conversation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Message sent by the pet owner.
    User,
    /// Message emitted by the assistant.
    Bot,
}

impl Role {
    /// Stable string form used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "bot" => Some(Role::Bot),
            _ => None,
        }
    }
}

/// One step of the appointment-booking workflow, in strict order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStep {
    /// Collect the owner's full name.
    OwnerName,
    /// Collect the pet's name and species.
    PetName,
    /// Collect a contact phone number.
    Phone,
    /// Collect the preferred date and time.
    #[serde(rename = "datetime")]
    DateTime,
    /// Await an explicit confirm or cancel.
    Confirm,
}

impl BookingStep {
    /// Stable string form used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStep::OwnerName => "owner_name",
            BookingStep::PetName => "pet_name",
            BookingStep::Phone => "phone",
            BookingStep::DateTime => "datetime",
            BookingStep::Confirm => "confirm",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner_name" => Some(BookingStep::OwnerName),
            "pet_name" => Some(BookingStep::PetName),
            "phone" => Some(BookingStep::Phone),
            "datetime" => Some(BookingStep::DateTime),
            "confirm" => Some(BookingStep::Confirm),
            _ => None,
        }
    }
}

/// Lifecycle status of an appointment record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Stable string form used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "completed" => Some(AppointmentStatus::Completed),
            _ => None,
        }
    }
}

// =============================================================================
// Conversation aggregate
// =============================================================================

/// A single conversation message. Messages are append-only: once stored they
/// are never edited or reordered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Caller-supplied identity hints attached to a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_name: Option<String>,
}

impl ConversationContext {
    /// Merge caller-supplied fields into this context.
    ///
    /// Non-empty fields from `other` overwrite; absent fields are kept.
    pub fn merge(&mut self, other: &ConversationContext) {
        if other.user_id.is_some() {
            self.user_id = other.user_id.clone();
        }
        if other.user_name.is_some() {
            self.user_name = other.user_name.clone();
        }
        if other.pet_name.is_some() {
            self.pet_name = other.pet_name.clone();
        }
    }

    /// True if no field is set.
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.user_name.is_none() && self.pet_name.is_none()
    }
}

/// Data collected step by step during the booking workflow.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
}

impl BookingData {
    /// True when all four required fields have been collected.
    pub fn is_complete(&self) -> bool {
        self.owner_name.is_some()
            && self.pet_name.is_some()
            && self.phone.is_some()
            && self.date_time.is_some()
    }

    /// Merge a partial patch into this data; set fields of `patch` overwrite.
    pub fn merge(&mut self, patch: &BookingData) {
        if patch.owner_name.is_some() {
            self.owner_name = patch.owner_name.clone();
        }
        if patch.pet_name.is_some() {
            self.pet_name = patch.pet_name.clone();
        }
        if patch.phone.is_some() {
            self.phone = patch.phone.clone();
        }
        if patch.date_time.is_some() {
            self.date_time = patch.date_time.clone();
        }
    }

    /// Build a confirmed appointment from fully collected data.
    ///
    /// Returns `None` if any required field is still missing.
    pub fn to_appointment(&self, session_id: &str) -> Option<Appointment> {
        Some(Appointment::new(
            session_id,
            self.owner_name.as_deref()?,
            self.pet_name.as_deref()?,
            self.phone.as_deref()?,
            self.date_time.as_deref()?,
        ))
    }
}

/// Workflow state of a conversation.
///
/// Modeled as a tagged sum so that an inactive workflow cannot carry stale
/// step or data: the `Inactive` variant has neither.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BookingState {
    /// No workflow in progress.
    #[default]
    Inactive,
    /// Workflow in progress at `step` with the data collected so far.
    Active { step: BookingStep, data: BookingData },
}

impl BookingState {
    pub fn is_active(&self) -> bool {
        matches!(self, BookingState::Active { .. })
    }
}

/// The per-session conversation aggregate.
///
/// Owned by the session store and mutated only by the orchestrator, one turn
/// at a time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub session_id: String,
    pub messages: Vec<Message>,
    pub context: ConversationContext,
    pub booking: BookingState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create an empty conversation for a session.
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            context: ConversationContext::default(),
            booking: BookingState::Inactive,
            appointment_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Appointment aggregate
// =============================================================================

/// A booked appointment. Created exactly once per confirmed workflow (or via
/// the direct creation endpoint); immutable afterwards except for `status`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub session_id: String,
    pub owner_name: String,
    pub pet_name: String,
    pub phone: String,
    pub date_time: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Create a confirmed appointment stamped with the current time.
    pub fn new(
        session_id: impl Into<String>,
        owner_name: impl Into<String>,
        pet_name: impl Into<String>,
        phone: impl Into<String>,
        date_time: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            owner_name: owner_name.into(),
            pet_name: pet_name.into(),
            phone: phone.into(),
            date_time: date_time.into(),
            status: AppointmentStatus::Confirmed,
            created_at: Utc::now(),
        }
    }
}
