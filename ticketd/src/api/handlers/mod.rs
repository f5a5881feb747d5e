//! HTTP request handlers.
//!
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Authentication/authorization via the extractors in [`crate::auth`]
//! - Delegating to the repositories in [`crate::db::handlers`]
//! - Response serialization
//!
//! Handlers never hold business state; every decision that must be atomic
//! (admission, cascade) lives inside a repository transaction.

pub mod bookings;
pub mod events;
pub mod users;
