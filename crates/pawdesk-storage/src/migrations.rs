//! Database schema migrations.
//!
//! Applies the initial schema: conversations, messages, appointments, and
//! the schema_migrations tracking table.

use rusqlite::Connection;
use tracing::info;

use pawdesk_core::error::PawdeskError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental changes.
pub fn run_migrations(conn: &Connection) -> Result<(), PawdeskError> {
    // Create the migrations tracking table first.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| PawdeskError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| PawdeskError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), PawdeskError> {
    conn.execute_batch(
        "
        -- One row per chat session. Booking workflow state is flattened into
        -- columns; booking_step is NULL whenever booking_active is 0.
        CREATE TABLE IF NOT EXISTS conversations (
            session_id          TEXT PRIMARY KEY NOT NULL,
            user_id             TEXT,
            user_name           TEXT,
            pet_name            TEXT,
            booking_active      INTEGER NOT NULL DEFAULT 0,
            booking_step        TEXT
                                CHECK (booking_step IS NULL OR booking_step IN
                                       ('owner_name', 'pet_name', 'phone', 'datetime', 'confirm')),
            booking_owner_name  TEXT,
            booking_pet_name    TEXT,
            booking_phone       TEXT,
            booking_date_time   TEXT,
            appointment_id      TEXT,
            created_at          INTEGER NOT NULL,
            updated_at          INTEGER NOT NULL
        );

        -- Append-only message log; insertion order is the conversation order.
        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id  TEXT NOT NULL,
            role        TEXT NOT NULL
                        CHECK (role IN ('user', 'bot')),
            content     TEXT NOT NULL,
            created_at  INTEGER NOT NULL,
            FOREIGN KEY (session_id) REFERENCES conversations(session_id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_messages_session
            ON messages (session_id, id ASC);

        CREATE TABLE IF NOT EXISTS appointments (
            id          TEXT PRIMARY KEY NOT NULL,
            session_id  TEXT NOT NULL,
            owner_name  TEXT NOT NULL,
            pet_name    TEXT NOT NULL,
            phone       TEXT NOT NULL,
            date_time   TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'confirmed'
                        CHECK (status IN ('confirmed', 'cancelled', 'completed')),
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_appointments_session
            ON appointments (session_id, created_at ASC);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| PawdeskError::Storage(format!("Failed to apply v1 migration: {}", e)))?;

    Ok(())
}
