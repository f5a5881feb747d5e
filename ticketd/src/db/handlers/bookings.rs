//! Database repository for bookings: admission, cancellation and listings.
//!
//! Admission is the one critical section in the system. Each attempt runs in
//! its own transaction that first takes a `FOR UPDATE` row lock on the event,
//! then recomputes availability live and inserts the booking. Two concurrent
//! admissions on the same event therefore serialize on the row lock and can
//! never both pass the capacity check against stale data; admissions on
//! different events proceed in parallel. The event-cancel cascade in
//! [`crate::db::handlers::events::Events::cancel`] takes the same lock, so an
//! admission can never slip a confirmed booking onto an event that is being
//! cancelled.

use crate::api::models::bookings::BookingStatus;
use crate::api::models::events::EventStatus;
use crate::db::{
    errors::{DbError, Result},
    handlers::events::confirmed_quantity,
    models::{
        bookings::{
            BookingCreateDBRequest, BookingDBResponse, BookingDetailDBResponse, BookingStatsDBResponse,
            BookingWithEventDBResponse,
        },
        events::EventDBResponse,
        users::UserSummaryDBResponse,
    },
};
use crate::types::{BookingId, EventId, UserId, abbrev_uuid};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Connection, FromRow, PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

/// Bounded retry budget for admission attempts that hit a transient
/// concurrency-control conflict (deadlock, lock timeout). Nothing else is
/// retried.
const ADMISSION_RETRY_ATTEMPTS: u32 = 3;

/// Filter for listing bookings (admin view)
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub skip: i64,
    pub limit: i64,
    pub user_id: Option<UserId>,
    pub event_id: Option<EventId>,
    pub status: Option<BookingStatus>,
    pub search: Option<String>,
}

impl BookingFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }
}

/// Outcome of an admission attempt
#[derive(Debug)]
pub enum AdmissionDecision {
    Admitted(BookingDBResponse),
    EventCancelled,
    PastEvent,
    /// Requested quantity exceeds what is left; `remaining` is exact at the
    /// instant of the decision (the event row was locked).
    InsufficientCapacity { remaining: i64 },
}

/// Outcome of a cancellation attempt
#[derive(Debug)]
pub enum CancelDecision {
    Cancelled(BookingDBResponse),
    NotOwner,
    AlreadyCancelled,
    PastEvent,
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub event_id: EventId,
    pub quantity: i32,
    pub total_amount: Decimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingDBResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            user_id: booking.user_id,
            event_id: booking.event_id,
            quantity: booking.quantity,
            total_amount: booking.total_amount,
            status: booking.status,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

// Event columns needed by the admission decision, fetched under the row lock
#[derive(Debug, FromRow)]
struct AdmissionEvent {
    pub starts_at: DateTime<Utc>,
    pub capacity: i32,
    pub price: Decimal,
    pub status: EventStatus,
}

// Booking joined with its event
#[derive(Debug, FromRow)]
struct BookingEventRow {
    pub id: BookingId,
    pub user_id: UserId,
    pub event_id: EventId,
    pub quantity: i32,
    pub total_amount: Decimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub event_title: String,
    pub event_description: String,
    pub event_location: String,
    pub event_starts_at: DateTime<Utc>,
    pub event_capacity: i32,
    pub event_price: Decimal,
    pub event_status: EventStatus,
    pub event_created_at: DateTime<Utc>,
    pub event_updated_at: DateTime<Utc>,
}

impl BookingEventRow {
    fn split(self) -> (BookingDBResponse, EventDBResponse) {
        let booking = BookingDBResponse {
            id: self.id,
            user_id: self.user_id,
            event_id: self.event_id,
            quantity: self.quantity,
            total_amount: self.total_amount,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        let event = EventDBResponse {
            id: booking.event_id,
            title: self.event_title,
            description: self.event_description,
            location: self.event_location,
            starts_at: self.event_starts_at,
            capacity: self.event_capacity,
            price: self.event_price,
            status: self.event_status,
            created_at: self.event_created_at,
            updated_at: self.event_updated_at,
        };
        (booking, event)
    }
}

impl From<BookingEventRow> for BookingWithEventDBResponse {
    fn from(row: BookingEventRow) -> Self {
        let (booking, event) = row.split();
        Self { booking, event }
    }
}

// Booking joined with owner and event (admin listings)
#[derive(Debug, FromRow)]
struct BookingDetailRow {
    #[sqlx(flatten)]
    base: BookingEventRow,
    pub user_email: String,
    pub user_first_name: String,
    pub user_last_name: String,
}

impl From<BookingDetailRow> for BookingDetailDBResponse {
    fn from(row: BookingDetailRow) -> Self {
        let user = UserSummaryDBResponse {
            id: row.base.user_id,
            email: row.user_email,
            first_name: row.user_first_name,
            last_name: row.user_last_name,
        };
        let (booking, event) = row.base.split();
        Self { booking, user, event }
    }
}

const BOOKING_EVENT_COLUMNS: &str = r#"
    b.id, b.user_id, b.event_id, b.quantity, b.total_amount, b.status, b.created_at, b.updated_at,
    e.title AS event_title, e.description AS event_description, e.location AS event_location,
    e.starts_at AS event_starts_at, e.capacity AS event_capacity, e.price AS event_price,
    e.status AS event_status, e.created_at AS event_created_at, e.updated_at AS event_updated_at
"#;

pub struct Bookings<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Bookings<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Admit a booking against the event's capacity.
    ///
    /// Retries the whole transaction on [`DbError::TransientConflict`], a
    /// bounded number of times; every other error kind surfaces immediately.
    #[instrument(skip(self, request), fields(event_id = %abbrev_uuid(&request.event_id), quantity = request.quantity), err)]
    pub async fn create(&mut self, request: &BookingCreateDBRequest) -> Result<AdmissionDecision> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_admit(request).await {
                Err(DbError::TransientConflict { code, message }) if attempt < ADMISSION_RETRY_ATTEMPTS => {
                    tracing::warn!(attempt, %code, %message, "admission transaction conflicted, retrying");
                }
                other => return other,
            }
        }
    }

    /// One admission attempt: lock, check, snapshot, insert - all in a single
    /// transaction.
    async fn try_admit(&mut self, request: &BookingCreateDBRequest) -> Result<AdmissionDecision> {
        let mut tx = self.db.begin().await?;

        // The row lock is the per-event critical section. Everything after
        // this point runs serialized against other admissions and the cancel
        // cascade for this event.
        let event = sqlx::query_as::<_, AdmissionEvent>(
            "SELECT starts_at, capacity, price, status FROM events WHERE id = $1 FOR UPDATE",
        )
        .bind(request.event_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        if event.status == EventStatus::Cancelled {
            return Ok(AdmissionDecision::EventCancelled);
        }

        // A start time at this exact instant counts as past
        if event.starts_at <= Utc::now() {
            return Ok(AdmissionDecision::PastEvent);
        }

        // Availability is recomputed live inside the transaction, never read
        // from a field carried over from an earlier fetch.
        let confirmed = confirmed_quantity(&mut tx, request.event_id).await?;
        let available = i64::from(event.capacity) - confirmed;
        if available < i64::from(request.quantity) {
            return Ok(AdmissionDecision::InsufficientCapacity {
                remaining: available.max(0),
            });
        }

        // Price snapshot: the total never changes if the event is repriced later
        let total_amount = event.price * Decimal::from(request.quantity);

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (user_id, event_id, quantity, total_amount)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, event_id, quantity, total_amount, status, created_at, updated_at
            "#,
        )
        .bind(request.user_id)
        .bind(request.event_id)
        .bind(request.quantity)
        .bind(total_amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AdmissionDecision::Admitted(BookingDBResponse::from(booking)))
    }

    /// Cancel a booking on behalf of `user_id`. Owner-only; cancelled is a
    /// terminal state.
    #[instrument(skip(self), fields(booking_id = %abbrev_uuid(&id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn cancel(&mut self, id: BookingId, user_id: UserId) -> Result<CancelDecision> {
        let mut tx = self.db.begin().await?;

        // Lock the booking row so the already-cancelled guard cannot race
        // with a concurrent cancellation of the same booking.
        let row = sqlx::query_as::<_, BookingEventRow>(&format!(
            r#"
            SELECT {BOOKING_EVENT_COLUMNS}
            FROM bookings b
            JOIN events e ON e.id = b.event_id
            WHERE b.id = $1
            FOR UPDATE OF b
            "#,
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        if row.user_id != user_id {
            return Ok(CancelDecision::NotOwner);
        }

        if row.status == BookingStatus::Cancelled {
            return Ok(CancelDecision::AlreadyCancelled);
        }

        if row.event_starts_at <= Utc::now() {
            return Ok(CancelDecision::PastEvent);
        }

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings SET status = 'cancelled', updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, event_id, quantity, total_amount, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CancelDecision::Cancelled(BookingDBResponse::from(booking)))
    }

    /// All bookings owned by a user, newest first, each joined with its event
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn list_for_user(&mut self, user_id: UserId) -> Result<Vec<BookingWithEventDBResponse>> {
        let rows = sqlx::query_as::<_, BookingEventRow>(&format!(
            r#"
            SELECT {BOOKING_EVENT_COLUMNS}
            FROM bookings b
            JOIN events e ON e.id = b.event_id
            WHERE b.user_id = $1
            ORDER BY b.created_at DESC
            "#,
        ))
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(rows.into_iter().map(BookingWithEventDBResponse::from).collect())
    }

    /// Paginated admin listing joined with owner and event
    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &BookingFilter) -> Result<Vec<BookingDetailDBResponse>> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            r#"
            SELECT {BOOKING_EVENT_COLUMNS},
                   u.email AS user_email, u.first_name AS user_first_name, u.last_name AS user_last_name
            FROM bookings b
            JOIN users u ON u.id = b.user_id
            JOIN events e ON e.id = b.event_id
            WHERE 1=1
            "#,
        ));
        push_filters(&mut query, filter, true);

        query.push(" ORDER BY b.created_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let rows = query.build_query_as::<BookingDetailRow>().fetch_all(&mut *self.db).await?;

        Ok(rows.into_iter().map(BookingDetailDBResponse::from).collect())
    }

    /// Count bookings matching the given filter (without pagination)
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &BookingFilter) -> Result<i64> {
        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT COUNT(*)
            FROM bookings b
            JOIN users u ON u.id = b.user_id
            JOIN events e ON e.id = b.event_id
            WHERE 1=1
            "#,
        );
        push_filters(&mut query, filter, true);

        let count = query.build_query_scalar::<i64>().fetch_one(&mut *self.db).await?;

        Ok(count)
    }

    /// Aggregate statistics over the filtered population.
    ///
    /// The caller's status filter is deliberately ignored here: the stats
    /// break the whole filtered population down by status, each aggregate
    /// applying its own status predicate. All four numbers come from one
    /// query, so a single response is internally consistent.
    #[instrument(skip(self, filter), err)]
    pub async fn stats(&mut self, filter: &BookingFilter) -> Result<BookingStatsDBResponse> {
        #[derive(FromRow)]
        struct StatsRow {
            confirmed: i64,
            cancelled: i64,
            up_coming: i64,
            revenue: Decimal,
        }

        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT COUNT(*) FILTER (WHERE b.status = 'confirmed')::BIGINT AS confirmed,
                   COUNT(*) FILTER (WHERE b.status = 'cancelled')::BIGINT AS cancelled,
                   COUNT(*) FILTER (WHERE b.status = 'confirmed' AND e.starts_at >= NOW())::BIGINT AS up_coming,
                   COALESCE(SUM(b.total_amount) FILTER (WHERE b.status = 'confirmed'), 0) AS revenue
            FROM bookings b
            JOIN users u ON u.id = b.user_id
            JOIN events e ON e.id = b.event_id
            WHERE 1=1
            "#,
        );
        push_filters(&mut query, filter, false);

        let row = query.build_query_as::<StatsRow>().fetch_one(&mut *self.db).await?;

        Ok(BookingStatsDBResponse {
            confirmed: row.confirmed,
            cancelled: row.cancelled,
            up_coming: row.up_coming,
            revenue: row.revenue,
        })
    }
}

/// Shared predicate builder for the admin listing, its count and its stats.
///
/// The free-text disjunction is appended as one parenthesized term AND-ed
/// onto the required filters, so every search disjunct carries the full base
/// conjunction. `include_status` is false for stats, which substitute their
/// own status predicates.
fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &BookingFilter, include_status: bool) {
    if let Some(user_id) = filter.user_id {
        query.push(" AND b.user_id = ");
        query.push_bind(user_id);
    }

    if let Some(event_id) = filter.event_id {
        query.push(" AND b.event_id = ");
        query.push_bind(event_id);
    }

    if include_status && let Some(status) = filter.status {
        query.push(" AND b.status = ");
        query.push_bind(status);
    }

    if let Some(ref search) = filter.search {
        let pattern = format!("%{search}%");
        query.push(" AND (u.first_name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR u.last_name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR u.email ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR e.title ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR e.description ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR e.location ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }
}
