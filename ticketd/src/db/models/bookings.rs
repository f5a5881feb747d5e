//! Database models for bookings.

use crate::db::models::events::EventDBResponse;
use crate::db::models::users::UserSummaryDBResponse;
use crate::api::models::bookings::BookingStatus;
use crate::types::{BookingId, EventId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Database request for creating a booking through the admission protocol.
///
/// The total amount is not part of the request: it is snapshotted from the
/// event's current price inside the admission transaction.
#[derive(Debug, Clone)]
pub struct BookingCreateDBRequest {
    pub user_id: UserId,
    pub event_id: EventId,
    pub quantity: i32,
}

/// Database response for a booking
#[derive(Debug, Clone)]
pub struct BookingDBResponse {
    pub id: BookingId,
    pub user_id: UserId,
    pub event_id: EventId,
    pub quantity: i32,
    pub total_amount: Decimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A booking joined with its event (customer-facing listings)
#[derive(Debug, Clone)]
pub struct BookingWithEventDBResponse {
    pub booking: BookingDBResponse,
    pub event: EventDBResponse,
}

/// A booking joined with its owner and event (admin listings)
#[derive(Debug, Clone)]
pub struct BookingDetailDBResponse {
    pub booking: BookingDBResponse,
    pub user: UserSummaryDBResponse,
    pub event: EventDBResponse,
}

/// Aggregates over a filtered booking population.
///
/// All four numbers are computed against the same predicate in a single
/// query, so one stats response is internally consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingStatsDBResponse {
    pub confirmed: i64,
    pub cancelled: i64,
    pub up_coming: i64,
    pub revenue: Decimal,
}
