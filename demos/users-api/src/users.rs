//! User endpoints.
//!
//! Each handler configures its [`Callstack`] (permission gate, steps,
//! response mode) and lets the responder shape the reply. Steps run LIFO, so
//! they are pushed in reverse order of execution.

use axum::{
    extract::{Path, State},
    response::Response,
};
use callstack_core::error::ApiError;
use callstack_core::pagination::PageResponse;
use callstack_core::permission::{PermissionExt, authenticated, from_fn, has_any_role, has_role};
use callstack_core::step::step;
use callstack_postgres::PgTransaction;
use callstack_web::Callstack;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Store key for the validated creation payload.
const NEW_USER: &str = "new_user";

/// A stored user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identifier
    pub id: u64,
    /// Unique email address
    pub email: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Creation payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    /// Email address, must contain `@`
    pub email: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default)]
struct Users {
    next_id: u64,
    by_id: BTreeMap<u64, User>,
}

/// In-memory user storage.
#[derive(Debug, Default)]
pub struct UserRepository {
    inner: RwLock<Users>,
}

impl UserRepository {
    /// Empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user.
    ///
    /// # Errors
    ///
    /// Returns the "Email already taken" domain error on a duplicate email.
    pub async fn insert(&self, new_user: NewUser) -> Result<User, ApiError> {
        let mut users = self.inner.write().await;
        if users.by_id.values().any(|u| u.email == new_user.email) {
            return Err(ApiError::email_already_taken());
        }

        users.next_id += 1;
        let user = User {
            id: users.next_id,
            email: new_user.email,
            name: new_user.name,
        };
        users.by_id.insert(user.id, user.clone());
        Ok(user)
    }

    /// One user by id.
    pub async fn get(&self, id: u64) -> Option<User> {
        self.inner.read().await.by_id.get(&id).cloned()
    }

    /// `take` users after skipping `skip`, ordered by id, plus the total count.
    pub async fn page(&self, skip: u64, take: u64) -> (Vec<User>, u64) {
        let users = self.inner.read().await;
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let take = usize::try_from(take).unwrap_or(usize::MAX);
        let page = users.by_id.values().skip(skip).take(take).cloned().collect();
        (page, users.by_id.len() as u64)
    }

    /// Remove a user, returning whether it existed.
    pub async fn remove(&self, id: u64) -> bool {
        self.inner.write().await.by_id.remove(&id).is_some()
    }
}

/// `GET /users`: paginated listing for any authenticated user.
pub async fn list_users(State(users): State<Arc<UserRepository>>, mut cs: Callstack) -> Response {
    cs.set_permission(authenticated());
    cs.push(step("list_users", move |scope| {
        Box::pin(async move {
            let (skip, take) = scope.pagination().window()?;
            let (page, total) = users.page(skip, take).await;

            let mut meta = PageResponse::with_total(total);
            if scope.pagination().is_page_mode() {
                meta = meta
                    .field("page", scope.pagination().page()?)
                    .field("pageSize", take);
            } else {
                meta = meta.field("limit", take).field("offset", skip);
            }
            scope.set_page_response_object(meta);

            Ok(Some(serde_json::to_value(page)?))
        })
    }));
    cs.respond().await
}

/// `GET /users/:id`: one user.
pub async fn get_user(
    State(users): State<Arc<UserRepository>>,
    Path(id): Path<u64>,
    mut cs: Callstack,
) -> Response {
    cs.set_permission(authenticated());
    cs.push(step("find_user", move |_scope| {
        Box::pin(async move {
            let user = users
                .get(id)
                .await
                .ok_or_else(|| ApiError::not_found(format!("user {id}")))?;
            Ok(Some(serde_json::to_value(user)?))
        })
    }));
    cs.respond().await
}

/// `POST /users`: create a user, answering `201` without a body.
///
/// Staff or admins only. Validation and insertion are separate steps that
/// hand the payload over through the shared store.
pub async fn create_user(State(users): State<Arc<UserRepository>>, mut cs: Callstack) -> Response {
    cs.set_permission(authenticated().and(has_any_role(["staff", "admin"])));
    cs.created_serializer();

    cs.push(step("insert_user", move |scope| {
        Box::pin(async move {
            let new_user: NewUser = scope.get_object_as(NEW_USER)?;
            let user = users.insert(new_user).await?;

            if let Some(tx) = scope.transaction_mut::<PgTransaction>() {
                if let Err(error) = record_created(tx, user.id).await {
                    // The transaction rolls back; the in-memory insert must too.
                    users.remove(user.id).await;
                    return Err(error.into());
                }
            }

            tracing::info!(user_id = user.id, "User created");
            Ok(Some(serde_json::to_value(user)?))
        })
    }));
    cs.push(step("validate_user", |scope| {
        Box::pin(async move {
            let new_user: NewUser = serde_json::from_value(scope.request().body.clone())
                .map_err(|e| ApiError::bad_request(format!("Invalid user: {e}")))?;
            if !new_user.email.contains('@') {
                return Err(ApiError::bad_request("Invalid email address").into());
            }
            scope.add_or_update_serialized(NEW_USER, &new_user)?;
            Ok(None)
        })
    }));

    cs.respond().await
}

/// Audit row for a created user, inside the request transaction.
async fn record_created(tx: &mut PgTransaction, user_id: u64) -> Result<(), sqlx::Error> {
    let user_id = i64::try_from(user_id).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    sqlx::query("INSERT INTO user_audit (user_id, action) VALUES ($1, 'created')")
        .bind(user_id)
        .execute(tx.connection())
        .await?;
    Ok(())
}

/// `DELETE /users/:id`: remove a user, answering `204`.
///
/// Admins may delete anyone; a user may delete themselves.
pub async fn delete_user(
    State(users): State<Arc<UserRepository>>,
    Path(id): Path<u64>,
    mut cs: Callstack,
) -> Response {
    let own_id = id.to_string();
    let is_self = from_fn("self", move |request| match &request.user {
        Some(user) if user.id == own_id => Ok(()),
        _ => Err(ApiError::forbidden("not your account")),
    });
    cs.set_permission(authenticated().and(has_role("admin").or(is_self)));
    cs.empty_response_serializer();

    cs.push(step("delete_user", move |_scope| {
        Box::pin(async move {
            if !users.remove(id).await {
                return Err(ApiError::not_found(format!("user {id}")).into());
            }
            tracing::info!(user_id = id, "User deleted");
            Ok(None)
        })
    }));

    cs.respond().await
}
