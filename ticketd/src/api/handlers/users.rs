//! HTTP handlers for user endpoints.

use crate::{
    AppState,
    api::models::{
        pagination::{PaginatedResponse, Pagination},
        users::{CurrentUser, UserResponse},
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::handlers::{Repository, Users, users::UserFilter},
    errors::{Error, Result},
};
use axum::{
    extract::{Query, State},
    response::Json,
};

/// Echo the authenticated caller's account
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    summary = "Current user",
    description = "Return the account the identity proxy resolved for this request",
    responses(
        (status = 200, description = "The caller's account", body = UserResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_me(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    let user = repo
        .get_by_id(current_user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
            id: current_user.id.to_string(),
        })?;

    Ok(Json(UserResponse::from(user)))
}

/// List user accounts
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    summary = "List users",
    description = "Paginated user listing (admin only)",
    params(Pagination),
    responses(
        (status = 200, description = "Paginated users", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin role"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    _perm: RequiresPermission<resource::Users, operation::ReadAll>,
) -> Result<Json<PaginatedResponse<UserResponse>>> {
    let (skip, limit) = pagination.params();

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    let users = repo.list(&UserFilter::new(skip, limit)).await?;
    let total_count = repo.count().await?;

    let data = users.into_iter().map(UserResponse::from).collect();

    Ok(Json(PaginatedResponse::new(data, total_count, skip, limit)))
}
