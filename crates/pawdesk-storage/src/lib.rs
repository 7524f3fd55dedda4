//! Pawdesk storage crate - SQLite persistence for conversations and
//! appointments.
//!
//! Provides a WAL-mode SQLite database with migrations and repository
//! implementations for the conversation and appointment aggregates. Turn
//! persistence is transactional: a confirmed booking's appointment insert
//! and conversation update commit together.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{AppointmentRepository, ConversationRepository};
