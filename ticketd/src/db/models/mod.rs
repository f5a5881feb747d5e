//! Database record structures matching table schemas.
//!
//! Each entity has three flavours of struct, following the
//! `*DBRequest`/`*DBResponse` convention:
//!
//! - `*CreateDBRequest`: what a repository needs to insert a row
//! - `*UpdateDBRequest`: partial updates, `None` meaning "leave unchanged"
//! - `*DBResponse`: what a repository hands back to the API layer
//!
//! These are deliberately distinct from the API models in
//! [`crate::api::models`]: the API layer decides what is exposed on the wire,
//! the DB layer decides what is stored.

pub mod bookings;
pub mod events;
pub mod users;
