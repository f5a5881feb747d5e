//! Extractor resolving the trusted proxy header to an authenticated user.

use crate::{
    AppState,
    api::models::users::CurrentUser,
    db::{
        errors::DbError,
        handlers::{Repository, Users},
        models::users::UserCreateDBRequest,
    },
    errors::{Error, Result},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::PgPool;
use tracing::{debug, instrument};

/// Extract user from the proxy-supplied identity header if present.
/// Returns:
/// - None: header absent
/// - Some(Ok(user)): header present and resolved to an active user
/// - Some(Err(error)): header present but lookup/creation failed
#[instrument(skip(parts, config, db))]
async fn try_proxy_header_auth(
    parts: &Parts,
    config: &crate::config::Config,
    db: &PgPool,
) -> Option<Result<CurrentUser>> {
    let user_email = match parts
        .headers
        .get(&config.auth.proxy_header.header_name)
        .and_then(|h| h.to_str().ok())
    {
        Some(email) => email,
        None => return None,
    };

    let mut conn = match db.acquire().await {
        Ok(conn) => conn,
        Err(e) => return Some(Err(DbError::from(e).into())),
    };
    let mut user_repo = Users::new(&mut conn);

    let user = match user_repo.get_by_email(user_email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            if !config.auth.proxy_header.auto_create_users {
                return Some(Err(Error::Unauthenticated {
                    message: Some(format!("Unknown user {user_email}")),
                }));
            }

            debug!(email = %user_email, "auto-provisioning user from proxy header");

            // The proxy only vouches for the email; derive a display name
            // from its local part until the user record is edited.
            let first_name = user_email.split('@').next().unwrap_or(user_email).to_string();
            let create_request = UserCreateDBRequest {
                email: user_email.to_string(),
                first_name,
                last_name: String::new(),
                role: config.auth.proxy_header.default_role,
            };

            match user_repo.create(&create_request).await {
                Ok(user) => user,
                Err(e) => return Some(Err(Error::Database(e))),
            }
        }
        Err(e) => return Some(Err(Error::Database(e))),
    };

    if !user.is_active {
        return Some(Err(Error::Unauthenticated {
            message: Some("User account is inactive".to_string()),
        }));
    }

    Some(Ok(CurrentUser::from(user)))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match try_proxy_header_auth(parts, &state.config, &state.db).await {
            Some(result) => result,
            None => Err(Error::Unauthenticated { message: None }),
        }
    }
}
