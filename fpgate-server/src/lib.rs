//! Fingerprint trust-gate HTTP service.
//!
//! Three endpoints compose the primitives from `fpgate-core`:
//!
//! - `POST /api/fingerprint/register` — origin-gated fingerprint
//!   registration; mints the `fp_session` cookie.
//! - `POST /api/third-party/relay` — origin- and session-gated forwarder
//!   to the internal notification endpoint.
//! - `POST /api/notify` — shared-secret-gated Telegram notification.

pub mod config;
pub mod cookies;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::{Config, SESSION_SECRET_ENV};
pub use errors::{AppError, AppResult};
pub use routes::create_router;
pub use state::AppState;
