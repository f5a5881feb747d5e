//! Role-based permission checks and the typed route-guard extractor.

use crate::{
    AppState,
    api::models::users::CurrentUser,
    errors::Error,
    types::{Operation, Permission, Resource},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

/// Check whether `user` holds `operation` on `resource`.
///
/// Admins hold everything. Customers hold read access to events and own-only
/// access to their bookings and account.
pub fn has_permission(user: &CurrentUser, resource: Resource, operation: Operation) -> bool {
    if user.is_admin() {
        return true;
    }

    matches!(
        (resource, operation),
        (Resource::Events, Operation::ReadAll | Operation::ReadOwn)
            | (Resource::Bookings, Operation::CreateOwn | Operation::ReadOwn | Operation::UpdateOwn)
            | (Resource::Users, Operation::ReadOwn)
    )
}

/// Marker types naming a [`Resource`] at the type level
pub mod resource {
    pub struct Events;
    pub struct Users;
}

/// Marker types naming an [`Operation`] at the type level
pub mod operation {
    pub struct CreateAll;
    pub struct ReadAll;
    pub struct UpdateAll;
    pub struct DeleteAll;
}

pub trait ResourceMarker {
    const RESOURCE: Resource;
}

pub trait OperationMarker {
    const OPERATION: Operation;
}

impl ResourceMarker for resource::Events {
    const RESOURCE: Resource = Resource::Events;
}

impl ResourceMarker for resource::Users {
    const RESOURCE: Resource = Resource::Users;
}

impl OperationMarker for operation::CreateAll {
    const OPERATION: Operation = Operation::CreateAll;
}

impl OperationMarker for operation::ReadAll {
    const OPERATION: Operation = Operation::ReadAll;
}

impl OperationMarker for operation::UpdateAll {
    const OPERATION: Operation = Operation::UpdateAll;
}

impl OperationMarker for operation::DeleteAll {
    const OPERATION: Operation = Operation::DeleteAll;
}

/// Extractor that authenticates the caller and requires a permission,
/// rejecting with 403 otherwise.
///
/// ```ignore
/// async fn create_event(
///     _perm: RequiresPermission<resource::Events, operation::CreateAll>,
/// ) { ... }
/// ```
pub struct RequiresPermission<R, O> {
    pub user: CurrentUser,
    _markers: PhantomData<fn() -> (R, O)>,
}

impl<R, O> FromRequestParts<AppState> for RequiresPermission<R, O>
where
    R: ResourceMarker,
    O: OperationMarker,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        if has_permission(&user, R::RESOURCE, O::OPERATION) {
            Ok(Self {
                user,
                _markers: PhantomData,
            })
        } else {
            Err(Error::InsufficientPermissions {
                required: Permission::Allow(R::RESOURCE, O::OPERATION),
                action: O::OPERATION,
                resource: format!("{:?}", R::RESOURCE),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use uuid::Uuid;

    fn user_with_role(role: Role) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role,
        }
    }

    #[test]
    fn test_admin_holds_everything() {
        let admin = user_with_role(Role::Admin);
        for resource in [Resource::Users, Resource::Events, Resource::Bookings] {
            assert!(has_permission(&admin, resource, Operation::DeleteAll));
        }
    }

    #[test]
    fn test_customer_is_scoped_to_own_bookings() {
        let customer = user_with_role(Role::Customer);
        assert!(has_permission(&customer, Resource::Bookings, Operation::CreateOwn));
        assert!(has_permission(&customer, Resource::Bookings, Operation::ReadOwn));
        assert!(has_permission(&customer, Resource::Events, Operation::ReadAll));
        assert!(!has_permission(&customer, Resource::Bookings, Operation::ReadAll));
        assert!(!has_permission(&customer, Resource::Events, Operation::CreateAll));
        assert!(!has_permission(&customer, Resource::Users, Operation::ReadAll));
    }
}
