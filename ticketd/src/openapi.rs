//! OpenAPI documentation for the `/api/v1` surface, served with a Scalar UI
//! at `/docs`.

use crate::api::models::{
    bookings::{
        BookingCreate, BookingDetailResponse, BookingListResponse, BookingResponse, BookingStats, BookingStatus,
        BookingWithEventResponse,
    },
    events::{EventCreate, EventResponse, EventStatus, EventSummary, EventUpdate},
    pagination::{PaginatedResponse, Pagination},
    users::{Role, UserResponse, UserSummary},
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ticketd",
        description = "Event ticketing service with capacity-safe reservations",
    ),
    paths(
        crate::api::handlers::events::create_event,
        crate::api::handlers::events::get_event,
        crate::api::handlers::events::list_events,
        crate::api::handlers::events::update_event,
        crate::api::handlers::events::delete_event,
        crate::api::handlers::bookings::create_booking,
        crate::api::handlers::bookings::cancel_booking,
        crate::api::handlers::bookings::list_my_bookings,
        crate::api::handlers::bookings::list_bookings,
        crate::api::handlers::users::get_me,
        crate::api::handlers::users::list_users,
    ),
    components(schemas(
        Role,
        EventStatus,
        BookingStatus,
        EventCreate,
        EventUpdate,
        EventResponse,
        EventSummary,
        BookingCreate,
        BookingResponse,
        BookingWithEventResponse,
        BookingDetailResponse,
        BookingStats,
        BookingListResponse,
        UserResponse,
        UserSummary,
        Pagination,
        PaginatedResponse<EventResponse>,
        PaginatedResponse<UserResponse>,
    )),
    tags(
        (name = "events", description = "Event publishing and availability"),
        (name = "bookings", description = "Ticket reservations and reporting"),
        (name = "users", description = "User accounts"),
    )
)]
pub struct ApiDoc;
