//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection (or transaction), provides
//! strongly-typed operations for one entity, and returns the models from
//! [`crate::db::models`]. Multi-row mutations (admission, the event-cancel
//! cascade) open their own transactions so their guarantees hold no matter
//! which connection they are given.
//!
//! # Available Repositories
//!
//! - [`Users`]: user accounts resolved from the identity proxy
//! - [`Events`]: events and their derived availability (the capacity ledger)
//! - [`Bookings`]: booking admission, cancellation and reporting

pub mod bookings;
pub mod events;
pub mod repository;
pub mod users;

pub use bookings::Bookings;
pub use events::Events;
pub use repository::Repository;
pub use users::Users;
