//! API request/response models for bookings.

use super::events::EventSummary;
use super::pagination::Pagination;
use super::users::UserSummary;
use crate::db::models::bookings::{
    BookingDBResponse, BookingDetailDBResponse, BookingStatsDBResponse, BookingWithEventDBResponse,
};
use crate::types::{BookingId, EventId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Booking lifecycle status. `confirmed -> cancelled` is the only transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

fn default_quantity() -> i32 {
    1
}

/// Request body for reserving tickets
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingCreate {
    #[schema(value_type = String, format = "uuid")]
    pub event_id: EventId,

    /// Number of tickets (default 1)
    #[serde(default = "default_quantity")]
    #[schema(default = 1, minimum = 1)]
    pub quantity: i32,
}

/// Booking response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: BookingId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub event_id: EventId,
    pub quantity: i32,
    /// Price snapshot taken at admission; never recomputed
    pub total_amount: Decimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BookingDBResponse> for BookingResponse {
    fn from(db: BookingDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            event_id: db.event_id,
            quantity: db.quantity,
            total_amount: db.total_amount,
            status: db.status,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// A booking joined with its event (customer listings)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingWithEventResponse {
    #[serde(flatten)]
    #[schema(inline)]
    pub booking: BookingResponse,
    pub event: EventSummary,
}

impl From<BookingWithEventDBResponse> for BookingWithEventResponse {
    fn from(db: BookingWithEventDBResponse) -> Self {
        Self {
            booking: BookingResponse::from(db.booking),
            event: EventSummary::from(db.event),
        }
    }
}

/// A booking joined with its owner and event (admin listings)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingDetailResponse {
    #[serde(flatten)]
    #[schema(inline)]
    pub booking: BookingResponse,
    pub user: UserSummary,
    pub event: EventSummary,
}

impl From<BookingDetailDBResponse> for BookingDetailResponse {
    fn from(db: BookingDetailDBResponse) -> Self {
        Self {
            booking: BookingResponse::from(db.booking),
            user: UserSummary::from(db.user),
            event: EventSummary::from(db.event),
        }
    }
}

/// Aggregates over the filtered booking population
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingStats {
    pub confirmed: i64,
    pub cancelled: i64,
    /// Confirmed bookings whose event has not started yet
    #[serde(rename = "upComing")]
    pub up_coming: i64,
    /// Sum of confirmed totals; 0 when the population is empty
    pub revenue: Decimal,
}

impl From<BookingStatsDBResponse> for BookingStats {
    fn from(db: BookingStatsDBResponse) -> Self {
        Self {
            confirmed: db.confirmed,
            cancelled: db.cancelled,
            up_coming: db.up_coming,
            revenue: db.revenue,
        }
    }
}

/// Query parameters for the admin booking listing
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListBookingsQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Filter by owning user. Non-admin callers are always constrained to
    /// their own bookings regardless of this value.
    #[schema(value_type = String, format = "uuid")]
    #[param(value_type = String, format = "uuid")]
    pub user_id: Option<UserId>,

    /// Filter by event
    #[schema(value_type = String, format = "uuid")]
    #[param(value_type = String, format = "uuid")]
    pub event_id: Option<EventId>,

    /// Filter the returned rows by status (stats still cover both statuses)
    pub status: Option<BookingStatus>,

    /// Search query matched against the owner's name/email and the event's
    /// title/description/location
    pub q: Option<String>,

    /// Include aggregate statistics computed over the same filter
    pub show_stats: Option<bool>,
}

/// Paginated booking listing with optional aggregate block
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookingListResponse {
    pub data: Vec<BookingDetailResponse>,
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<BookingStats>,
}
