//! Composable permission predicates.
//!
//! A [`Permission`] decides whether a request may proceed. Predicates compose
//! with [`And`] and [`Or`], which are predicates themselves, so compositions
//! nest arbitrarily.
//!
//! Both combinators evaluate sequentially, left first:
//!
//! | Combinator | Left | Right evaluated? | Result |
//! |---|---|---|---|
//! | `and` | fails | no | left's failure |
//! | `and` | succeeds | yes | right's outcome |
//! | `or` | succeeds | no | success |
//! | `or` | fails | yes | right's outcome (left's failure is dropped) |
//!
//! # Example
//!
//! ```
//! use callstack_core::permission::{authenticated, has_role, Permission, PermissionExt};
//! use callstack_core::request::{AuthenticatedUser, RequestInfo};
//!
//! # tokio_test::block_on(async {
//! let admin_only = authenticated().and(has_role("admin"));
//!
//! let request = RequestInfo::new(http::Method::DELETE, "/users/1")
//!     .with_user(AuthenticatedUser::new("u1").with_role("admin"));
//! assert!(admin_only.check(&request).await.is_ok());
//! # });
//! ```

use crate::error::ApiError;
use crate::request::RequestInfo;
use futures::future::BoxFuture;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Message used when a predicate needs a user and there is none.
pub const NO_USER_FOUND: &str = "No user found";

/// An asynchronous access-control check.
///
/// Returns a boxed future so predicates stay object-safe and can be stored as
/// [`BoxedPermission`].
pub trait Permission: Send + Sync {
    /// Decide whether `request` may proceed.
    ///
    /// # Errors
    ///
    /// Returns the typed error to report, conventionally
    /// [`ApiError::Unauthorized`] or [`ApiError::Forbidden`].
    fn check<'a>(&'a self, request: &'a RequestInfo) -> BoxFuture<'a, Result<(), ApiError>>;
}

/// Type-erased, shareable permission.
pub type BoxedPermission = Arc<dyn Permission>;

impl<P: Permission + ?Sized> Permission for Arc<P> {
    fn check<'a>(&'a self, request: &'a RequestInfo) -> BoxFuture<'a, Result<(), ApiError>> {
        (**self).check(request)
    }
}

impl<P: Permission + ?Sized> Permission for Box<P> {
    fn check<'a>(&'a self, request: &'a RequestInfo) -> BoxFuture<'a, Result<(), ApiError>> {
        (**self).check(request)
    }
}

/// Fluent composition for every [`Permission`].
pub trait PermissionExt: Permission + Sized {
    /// Both `self` and `other` must succeed.
    fn and<Q: Permission>(self, other: Q) -> And<Self, Q> {
        And::new(self, other)
    }

    /// Either `self` or `other` must succeed.
    fn or<Q: Permission>(self, other: Q) -> Or<Self, Q> {
        Or::new(self, other)
    }

    /// Erase the concrete type.
    fn boxed(self) -> BoxedPermission
    where
        Self: 'static,
    {
        Arc::new(self)
    }
}

impl<P: Permission> PermissionExt for P {}

/// Succeeds iff `left` and then `right` succeed.
#[derive(Debug, Clone)]
pub struct And<P, Q> {
    left: P,
    right: Q,
}

impl<P, Q> And<P, Q> {
    /// Compose two predicates.
    pub const fn new(left: P, right: Q) -> Self {
        Self { left, right }
    }
}

impl<P: Permission, Q: Permission> Permission for And<P, Q> {
    fn check<'a>(&'a self, request: &'a RequestInfo) -> BoxFuture<'a, Result<(), ApiError>> {
        Box::pin(async move {
            self.left.check(request).await?;
            self.right.check(request).await
        })
    }
}

/// Succeeds if `left` succeeds, otherwise defers to `right`.
///
/// When both fail only `right`'s failure is reported.
#[derive(Debug, Clone)]
pub struct Or<P, Q> {
    left: P,
    right: Q,
}

impl<P, Q> Or<P, Q> {
    /// Compose two predicates.
    pub const fn new(left: P, right: Q) -> Self {
        Self { left, right }
    }
}

impl<P: Permission, Q: Permission> Permission for Or<P, Q> {
    fn check<'a>(&'a self, request: &'a RequestInfo) -> BoxFuture<'a, Result<(), ApiError>> {
        Box::pin(async move {
            match self.left.check(request).await {
                Ok(()) => Ok(()),
                Err(discarded) => {
                    tracing::debug!(error = %discarded, "Left permission failed, trying right");
                    self.right.check(request).await
                }
            }
        })
    }
}

/// Requires an authenticated user.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

impl Permission for Authenticated {
    fn check<'a>(&'a self, request: &'a RequestInfo) -> BoxFuture<'a, Result<(), ApiError>> {
        Box::pin(async move {
            request
                .user
                .as_ref()
                .map(|_| ())
                .ok_or_else(|| ApiError::unauthorized(NO_USER_FOUND))
        })
    }
}

/// How a [`RolesPermission`] matches its role set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleMatch {
    /// At least one of the roles.
    #[default]
    Any,
    /// Every role.
    All,
}

/// Requires the user to hold some or all of a set of roles.
#[derive(Debug, Clone)]
pub struct RolesPermission {
    roles: BTreeSet<String>,
    mode: RoleMatch,
}

impl RolesPermission {
    /// Create a roles check.
    pub fn new<I, S>(roles: I, mode: RoleMatch) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            mode,
        }
    }

    /// The configured roles.
    #[must_use]
    pub const fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// The configured match mode.
    #[must_use]
    pub const fn mode(&self) -> RoleMatch {
        self.mode
    }
}

impl Permission for RolesPermission {
    fn check<'a>(&'a self, request: &'a RequestInfo) -> BoxFuture<'a, Result<(), ApiError>> {
        Box::pin(async move {
            let user = request
                .user
                .as_ref()
                .ok_or_else(|| ApiError::unauthorized(NO_USER_FOUND))?;

            let missing: Vec<&str> = self
                .roles
                .iter()
                .filter(|role| !user.has_role(role))
                .map(String::as_str)
                .collect();

            let allowed = match self.mode {
                RoleMatch::Any => self.roles.is_empty() || missing.len() < self.roles.len(),
                RoleMatch::All => missing.is_empty(),
            };

            if allowed {
                Ok(())
            } else {
                Err(ApiError::forbidden(format!(
                    "user {} lacks roles [{}]",
                    user.id,
                    missing.join(", ")
                )))
            }
        })
    }
}

/// Always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Permission for AllowAll {
    fn check<'a>(&'a self, _request: &'a RequestInfo) -> BoxFuture<'a, Result<(), ApiError>> {
        Box::pin(async { Ok(()) })
    }
}

/// Always fails with Forbidden.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl Permission for DenyAll {
    fn check<'a>(&'a self, _request: &'a RequestInfo) -> BoxFuture<'a, Result<(), ApiError>> {
        Box::pin(async { Err(ApiError::forbidden("access denied for everyone")) })
    }
}

/// A predicate built from a plain closure.
pub struct FnPermission<F> {
    name: &'static str,
    f: F,
}

impl<F> fmt::Debug for FnPermission<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPermission").field("name", &self.name).finish()
    }
}

impl<F> Permission for FnPermission<F>
where
    F: Fn(&RequestInfo) -> Result<(), ApiError> + Send + Sync,
{
    fn check<'a>(&'a self, request: &'a RequestInfo) -> BoxFuture<'a, Result<(), ApiError>> {
        Box::pin(async move { (self.f)(request) })
    }
}

/// Requires an authenticated user.
#[must_use]
pub const fn authenticated() -> Authenticated {
    Authenticated
}

/// Requires one specific role.
#[must_use]
pub fn has_role(role: impl Into<String>) -> RolesPermission {
    RolesPermission::new([role.into()], RoleMatch::Any)
}

/// Requires at least one of `roles`.
pub fn has_any_role<I, S>(roles: I) -> RolesPermission
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    RolesPermission::new(roles, RoleMatch::Any)
}

/// Requires all of `roles`.
pub fn has_all_roles<I, S>(roles: I) -> RolesPermission
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    RolesPermission::new(roles, RoleMatch::All)
}

/// Build a synchronous predicate from a closure.
pub const fn from_fn<F>(name: &'static str, f: F) -> FnPermission<F>
where
    F: Fn(&RequestInfo) -> Result<(), ApiError> + Send + Sync,
{
    FnPermission { name, f }
}
