//! API request and response models.
//!
//! This module contains the data structures used for HTTP request
//! deserialization and response serialization. These models define the public
//! API contract and are kept separate from the database records in
//! [`crate::db::models`]; each response model has a `From` conversion from
//! its DB counterpart.

pub mod bookings;
pub mod events;
pub mod pagination;
pub mod users;
