//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with PostgreSQL,
//! following the Repository pattern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries & transactional invariants)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Transactions
//!
//! Repositories that only read may run on a plain pool connection. The two
//! operations with cross-row invariants - booking admission and the
//! event-cancel cascade - always begin their own transaction and take the
//! event's row lock, so callers cannot accidentally weaken them.
//!
//! # Migrations
//!
//! Database migrations are managed by SQLx and located in the `migrations/`
//! directory. [`crate::migrator`] provides access to the migrator and is run
//! automatically on startup.

pub mod errors;
pub mod handlers;
pub mod models;
