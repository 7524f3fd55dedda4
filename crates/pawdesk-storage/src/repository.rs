//! Repository implementations for SQLite-backed persistence.
//!
//! Provides ConversationRepository and AppointmentRepository that operate on
//! the Database struct using raw SQL. A conversation turn is persisted as a
//! single transaction so the appointment insert, the conversation update, and
//! the appended messages commit together.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use pawdesk_core::error::PawdeskError;
use pawdesk_core::types::{
    Appointment, AppointmentStatus, BookingData, BookingState, BookingStep, Conversation,
    ConversationContext, Message, Role,
};

use crate::db::Database;

/// Repository for the per-session conversation aggregate.
pub struct ConversationRepository {
    db: Arc<Database>,
}

impl ConversationRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Load a conversation with its full message history, oldest first.
    pub fn find(&self, session_id: &str) -> Result<Option<Conversation>, PawdeskError> {
        self.db.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT user_id, user_name, pet_name, booking_active, booking_step,
                            booking_owner_name, booking_pet_name, booking_phone,
                            booking_date_time, appointment_id, created_at, updated_at
                     FROM conversations WHERE session_id = ?1",
                    rusqlite::params![session_id],
                    |row| {
                        Ok((
                            row.get::<_, Option<String>>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, i64>(3)?,
                            row.get::<_, Option<String>>(4)?,
                            row.get::<_, Option<String>>(5)?,
                            row.get::<_, Option<String>>(6)?,
                            row.get::<_, Option<String>>(7)?,
                            row.get::<_, Option<String>>(8)?,
                            row.get::<_, Option<String>>(9)?,
                            row.get::<_, i64>(10)?,
                            row.get::<_, i64>(11)?,
                        ))
                    },
                )
                .optional()
                .map_err(|e| PawdeskError::Storage(e.to_string()))?;

            let Some((
                user_id,
                user_name,
                pet_name,
                booking_active,
                booking_step,
                booking_owner_name,
                booking_pet_name,
                booking_phone,
                booking_date_time,
                appointment_id,
                created_at,
                updated_at,
            )) = row
            else {
                return Ok(None);
            };

            let booking = if booking_active != 0 {
                let step = booking_step
                    .as_deref()
                    .and_then(BookingStep::parse)
                    .ok_or_else(|| {
                        PawdeskError::Storage(format!(
                            "Corrupt booking step for session {}",
                            session_id
                        ))
                    })?;
                BookingState::Active {
                    step,
                    data: BookingData {
                        owner_name: booking_owner_name,
                        pet_name: booking_pet_name,
                        phone: booking_phone,
                        date_time: booking_date_time,
                    },
                }
            } else {
                BookingState::Inactive
            };

            let appointment_id = appointment_id
                .map(|s| {
                    Uuid::parse_str(&s).map_err(|e| {
                        PawdeskError::Storage(format!("Corrupt appointment id: {}", e))
                    })
                })
                .transpose()?;

            Ok(Some(Conversation {
                session_id: session_id.to_string(),
                messages: load_messages(conn, session_id)?,
                context: ConversationContext {
                    user_id,
                    user_name,
                    pet_name,
                },
                booking,
                appointment_id,
                created_at: epoch_to_utc(created_at),
                updated_at: epoch_to_utc(updated_at),
            }))
        })
    }

    /// Persist one turn's changes atomically.
    ///
    /// Upserts the conversation row, appends only the turn's new messages,
    /// and inserts the appointment if the turn produced one. All writes share
    /// a single transaction.
    pub fn save_turn(
        &self,
        conversation: &Conversation,
        new_messages: &[Message],
        appointment: Option<&Appointment>,
    ) -> Result<(), PawdeskError> {
        self.db.with_tx(|conn| {
            if let Some(apt) = appointment {
                insert_appointment(conn, apt)?;
            }

            let (active, step, data) = match &conversation.booking {
                BookingState::Inactive => (0i64, None, BookingData::default()),
                BookingState::Active { step, data } => (1i64, Some(step.as_str()), data.clone()),
            };

            conn.execute(
                "INSERT INTO conversations (session_id, user_id, user_name, pet_name,
                        booking_active, booking_step, booking_owner_name, booking_pet_name,
                        booking_phone, booking_date_time, appointment_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 ON CONFLICT(session_id) DO UPDATE SET
                        user_id = excluded.user_id,
                        user_name = excluded.user_name,
                        pet_name = excluded.pet_name,
                        booking_active = excluded.booking_active,
                        booking_step = excluded.booking_step,
                        booking_owner_name = excluded.booking_owner_name,
                        booking_pet_name = excluded.booking_pet_name,
                        booking_phone = excluded.booking_phone,
                        booking_date_time = excluded.booking_date_time,
                        appointment_id = excluded.appointment_id,
                        updated_at = excluded.updated_at",
                rusqlite::params![
                    conversation.session_id,
                    conversation.context.user_id,
                    conversation.context.user_name,
                    conversation.context.pet_name,
                    active,
                    step,
                    data.owner_name,
                    data.pet_name,
                    data.phone,
                    data.date_time,
                    conversation.appointment_id.map(|id| id.to_string()),
                    conversation.created_at.timestamp(),
                    conversation.updated_at.timestamp(),
                ],
            )
            .map_err(|e| PawdeskError::Storage(format!("Failed to save conversation: {}", e)))?;

            for msg in new_messages {
                conn.execute(
                    "INSERT INTO messages (session_id, role, content, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![
                        conversation.session_id,
                        msg.role.as_str(),
                        msg.content,
                        msg.timestamp.timestamp(),
                    ],
                )
                .map_err(|e| PawdeskError::Storage(format!("Failed to append message: {}", e)))?;
            }

            Ok(())
        })
    }

    /// Count all conversations.
    pub fn count(&self) -> Result<u64, PawdeskError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))
                .map_err(|e| PawdeskError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

/// Repository for appointment records.
pub struct AppointmentRepository {
    db: Arc<Database>,
}

impl AppointmentRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a new appointment.
    pub fn create(&self, appointment: &Appointment) -> Result<(), PawdeskError> {
        self.db.with_conn(|conn| insert_appointment(conn, appointment))
    }

    /// All appointments booked from a session, oldest first.
    pub fn find_by_session(&self, session_id: &str) -> Result<Vec<Appointment>, PawdeskError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, session_id, owner_name, pet_name, phone, date_time, status, created_at
                     FROM appointments WHERE session_id = ?1
                     ORDER BY created_at ASC, id ASC",
                )
                .map_err(|e| PawdeskError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![session_id], row_to_appointment_parts)
                .map_err(|e| PawdeskError::Storage(e.to_string()))?;

            let mut appointments = Vec::new();
            for row in rows {
                let parts = row.map_err(|e| PawdeskError::Storage(e.to_string()))?;
                appointments.push(parts_to_appointment(parts)?);
            }
            Ok(appointments)
        })
    }

    /// Count all appointments.
    pub fn count(&self) -> Result<u64, PawdeskError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))
                .map_err(|e| PawdeskError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

// -----------------------------------------------------------------
// Connection-level helpers
// -----------------------------------------------------------------

fn insert_appointment(conn: &Connection, apt: &Appointment) -> Result<(), PawdeskError> {
    conn.execute(
        "INSERT INTO appointments (id, session_id, owner_name, pet_name, phone, date_time, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            apt.id.to_string(),
            apt.session_id,
            apt.owner_name,
            apt.pet_name,
            apt.phone,
            apt.date_time,
            apt.status.as_str(),
            apt.created_at.timestamp(),
        ],
    )
    .map_err(|e| PawdeskError::Storage(format!("Failed to save appointment: {}", e)))?;
    Ok(())
}

fn load_messages(conn: &Connection, session_id: &str) -> Result<Vec<Message>, PawdeskError> {
    let mut stmt = conn
        .prepare(
            "SELECT role, content, created_at FROM messages
             WHERE session_id = ?1 ORDER BY id ASC",
        )
        .map_err(|e| PawdeskError::Storage(e.to_string()))?;

    let rows = stmt
        .query_map(rusqlite::params![session_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })
        .map_err(|e| PawdeskError::Storage(e.to_string()))?;

    let mut messages = Vec::new();
    for row in rows {
        let (role, content, created_at) = row.map_err(|e| PawdeskError::Storage(e.to_string()))?;
        let role = Role::parse(&role)
            .ok_or_else(|| PawdeskError::Storage(format!("Corrupt message role: {}", role)))?;
        messages.push(Message {
            role,
            content,
            timestamp: epoch_to_utc(created_at),
        });
    }
    Ok(messages)
}

type AppointmentParts = (String, String, String, String, String, String, String, i64);

fn row_to_appointment_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppointmentParts> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn parts_to_appointment(parts: AppointmentParts) -> Result<Appointment, PawdeskError> {
    let (id, session_id, owner_name, pet_name, phone, date_time, status, created_at) = parts;
    Ok(Appointment {
        id: Uuid::parse_str(&id)
            .map_err(|e| PawdeskError::Storage(format!("Corrupt appointment id: {}", e)))?,
        session_id,
        owner_name,
        pet_name,
        phone,
        date_time,
        status: AppointmentStatus::parse(&status)
            .ok_or_else(|| PawdeskError::Storage(format!("Corrupt appointment status: {}", status)))?,
        created_at: epoch_to_utc(created_at),
    })
}

/// Convert stored epoch seconds back to UTC.
fn epoch_to_utc(epoch: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(epoch, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}
