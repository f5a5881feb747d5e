//! Identity and authorization plumbing.
//!
//! The service does not authenticate anyone itself: it sits behind an
//! authenticating proxy (SSO gateway, ingress auth filter) that is trusted to
//! place the caller's email in a configurable request header. This module
//! resolves that identity to a platform user and enforces role checks.
//!
//! # Modules
//!
//! - [`current_user`]: Extractor resolving the trusted header to a [`crate::api::models::users::CurrentUser`]
//! - [`permissions`]: Role checks and the typed [`permissions::RequiresPermission`] extractor
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use ticketd::api::models::users::CurrentUser;
//! use ticketd::auth::permissions::{RequiresPermission, operation, resource};
//!
//! async fn mine(current_user: CurrentUser) { /* caller is authenticated */ }
//!
//! async fn admin_only(_perm: RequiresPermission<resource::Events, operation::CreateAll>) {
//!     // caller holds Events/CreateAll
//! }
//! ```

pub mod current_user;
pub mod permissions;
