//! API request/response models for events.

use super::pagination::Pagination;
use crate::db::models::events::{EventDBResponse, EventWithSpotsDBResponse};
use crate::types::EventId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Event lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Cancelled,
}

/// Request body for publishing an event
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventCreate {
    pub title: String,
    pub description: String,
    pub location: String,
    /// Event start date and time; must be in the future
    pub date: DateTime<Utc>,
    /// Maximum number of tickets; fixed ceiling for admissions
    pub capacity: i32,
    /// Ticket price; snapshotted into each booking at admission time
    pub price: Decimal,
}

/// Partial update for an event. Capacity may never drop below the quantity
/// already confirmed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
    pub price: Option<Decimal>,
}

/// Event response with derived availability
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub capacity: i32,
    pub price: Decimal,
    pub status: EventStatus,
    /// capacity minus confirmed tickets, never negative
    pub available_spots: i64,
    pub confirmed_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventWithSpotsDBResponse> for EventResponse {
    fn from(db: EventWithSpotsDBResponse) -> Self {
        Self {
            id: db.event.id,
            title: db.event.title,
            description: db.event.description,
            location: db.event.location,
            date: db.event.starts_at,
            capacity: db.event.capacity,
            price: db.event.price,
            status: db.event.status,
            available_spots: db.available_spots,
            confirmed_count: db.confirmed_count,
            created_at: db.event.created_at,
            updated_at: db.event.updated_at,
        }
    }
}

/// Event projection embedded in booking responses (no derived availability)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub price: Decimal,
    pub status: EventStatus,
}

impl From<EventDBResponse> for EventSummary {
    fn from(db: EventDBResponse) -> Self {
        Self {
            id: db.id,
            title: db.title,
            description: db.description,
            location: db.location,
            date: db.starts_at,
            price: db.price,
            status: db.status,
        }
    }
}

/// Query parameters for listing events
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListEventsQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Earliest start date to include (inclusive)
    pub min_date: Option<DateTime<Utc>>,

    /// Latest start date to include (inclusive)
    pub max_date: Option<DateTime<Utc>>,

    /// Filter by lifecycle status
    pub status: Option<EventStatus>,

    /// Search query matched against title, description and location
    /// (case-insensitive substring match)
    pub q: Option<String>,
}
