//! Demo users service.
//!
//! A small HTTP API where every endpoint runs through a callstack execution
//! context:
//!
//! | Route | Permission | Success |
//! |---|---|---|
//! | `GET /api/users` | authenticated | `200 { total, ..., results }` |
//! | `GET /api/users/:id` | authenticated | `200` user |
//! | `POST /api/users` | staff or admin | `201`, no body |
//! | `DELETE /api/users/:id` | admin, or the user themselves | `204` |
//!
//! Identity comes from the `X-User-Id` / `X-User-Roles` headers (see [`auth`]).

pub mod auth;
pub mod config;
pub mod routes;
pub mod state;
pub mod users;

pub use config::{ConfigError, ServerConfig};
pub use routes::build_router;
pub use state::AppState;
pub use users::{NewUser, User, UserRepository};
