//! Database models for events.

use crate::api::models::events::{EventCreate, EventStatus, EventUpdate};
use crate::types::EventId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Database request for creating a new event
#[derive(Debug, Clone)]
pub struct EventCreateDBRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub capacity: i32,
    pub price: Decimal,
}

impl From<EventCreate> for EventCreateDBRequest {
    fn from(api: EventCreate) -> Self {
        Self {
            title: api.title,
            description: api.description,
            location: api.location,
            starts_at: api.date,
            capacity: api.capacity,
            price: api.price,
        }
    }
}

/// Database request for a partial event update.
///
/// A `None` field leaves the stored value untouched. A capacity change is
/// validated against the confirmed booking quantity inside the repository.
#[derive(Debug, Clone, Default)]
pub struct EventUpdateDBRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
    pub price: Option<Decimal>,
}

impl From<EventUpdate> for EventUpdateDBRequest {
    fn from(api: EventUpdate) -> Self {
        Self {
            title: api.title,
            description: api.description,
            location: api.location,
            starts_at: api.date,
            capacity: api.capacity,
            price: api.price,
        }
    }
}

/// Database response for an event
#[derive(Debug, Clone)]
pub struct EventDBResponse {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub capacity: i32,
    pub price: Decimal,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An event together with its derived availability.
///
/// `available_spots` is always `capacity - confirmed_count`, floored at zero;
/// it is computed per read and never persisted.
#[derive(Debug, Clone)]
pub struct EventWithSpotsDBResponse {
    pub event: EventDBResponse,
    pub confirmed_count: i64,
    pub available_spots: i64,
}
