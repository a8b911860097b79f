//! Pluggable session-management middleware for axum.
//!
//! Sessions are opaque records keyed by an unguessable session key. A
//! [`backend::SessionBackend`] persists records with TTL semantics, a
//! [`frontend::SessionFrontend`] moves the key across the client boundary
//! (signed cookies), a [`verification::SessionVerifier`] judges loaded
//! records, and the [`middleware::SessionManager`] orchestrates all three
//! per request.

pub mod backend;
pub mod config;
pub mod error;
pub mod frontend;
pub mod middleware;
pub mod models;
pub mod verification;

pub use backend::{MemoryBackend, RedisHashBackend, SessionBackend};
pub use config::{BackendKind, SessionConfig};
pub use error::{BackendError, FrontendError, SessionError};
pub use frontend::{CookieFrontend, SessionFrontend, SessionIds};
pub use middleware::{session_middleware, Session, SessionManager};
pub use models::{CookieParameters, SameSite, SessionRecord, UserSession};
pub use verification::{BasicVerifier, SessionVerifier};
