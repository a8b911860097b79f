//! Session coordinator: the per-request middleware tying backend,
//! frontend, and verification policy together.
//!
//! Per request: resolve the session key from the frontend (or mint a
//! fresh session), load the record, run the verification policy, renew
//! the TTL, expose the record to the handler through [`Session`], and
//! write the signed key back into the response headers.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::Extensions;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::backend::{MemoryBackend, RedisHashBackend, SessionBackend};
use crate::config::{BackendKind, SessionConfig};
use crate::error::{BackendError, SessionError};
use crate::frontend::{CookieFrontend, SessionFrontend, SessionIds};
use crate::models::SessionRecord;
use crate::verification::{BasicVerifier, SessionVerifier};

/// The session record exposed to downstream handlers. `None` means the
/// request carried no usable session (the response still receives a
/// replacement token).
#[derive(Debug, Clone)]
pub struct Session<R>(pub Option<R>);

impl<S, R> FromRequestParts<S> for Session<R>
where
    R: SessionRecord,
    S: Send + Sync,
{
    type Rejection = SessionError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session<R>>().cloned().ok_or_else(|| {
            SessionError::Internal("session middleware is not installed on this route".to_string())
        })
    }
}

/// Coordinates session lifecycle per request. Cheap to clone; hand a
/// clone to `axum::middleware::from_fn_with_state`.
pub struct SessionManager<R: SessionRecord> {
    backend: Arc<dyn SessionBackend<R>>,
    frontend: Arc<dyn SessionFrontend>,
    verifier: Arc<dyn SessionVerifier<R>>,
    renew_on_access: bool,
    renewal_ttl: Option<u64>,
}

impl<R: SessionRecord> Clone for SessionManager<R> {
    fn clone(&self) -> Self {
        SessionManager {
            backend: self.backend.clone(),
            frontend: self.frontend.clone(),
            verifier: self.verifier.clone(),
            renew_on_access: self.renew_on_access,
            renewal_ttl: self.renewal_ttl,
        }
    }
}

impl<R: SessionRecord> SessionManager<R> {
    pub fn new(
        backend: Arc<dyn SessionBackend<R>>,
        frontend: Arc<dyn SessionFrontend>,
        verifier: Arc<dyn SessionVerifier<R>>,
        renew_on_access: bool,
        renewal_ttl: Option<u64>,
    ) -> Self {
        SessionManager {
            backend,
            frontend,
            verifier,
            renew_on_access,
            renewal_ttl,
        }
    }

    /// Wire up a manager from configuration: backend selection, cookie
    /// frontend, and the basic verifier sharing the backend.
    pub async fn from_config(config: &SessionConfig) -> Result<Self, SessionError> {
        let backend: Arc<dyn SessionBackend<R>> = match config.backend {
            BackendKind::Memory => Arc::new(
                MemoryBackend::new(config.default_ttl_secs)
                    .with_key_byte_size(config.key_byte_size),
            ),
            BackendKind::Redis => {
                let redis_url = config.redis_url.as_deref().ok_or_else(|| {
                    SessionError::Internal(
                        "Redis backend selected but REDIS_URL is not set".to_string(),
                    )
                })?;
                Arc::new(
                    RedisHashBackend::connect(
                        redis_url,
                        config.default_ttl_secs,
                        config.expire_on_delete,
                    )
                    .await?,
                )
            }
        };

        let frontend = Arc::new(CookieFrontend::new(
            config.cookie_name.clone(),
            config.identifier.clone(),
            &config.secret_key,
            &config.salt,
            config.cookie_params.clone(),
        ));

        let verifier = Arc::new(BasicVerifier::new(
            config.identifier.clone(),
            backend.clone(),
        ));

        Ok(SessionManager::new(
            backend,
            frontend,
            verifier,
            config.renew_on_access,
            config.renewal_ttl_secs,
        ))
    }

    pub fn backend(&self) -> &Arc<dyn SessionBackend<R>> {
        &self.backend
    }

    pub fn frontend(&self) -> &Arc<dyn SessionFrontend> {
        &self.frontend
    }

    pub fn verifier(&self) -> &Arc<dyn SessionVerifier<R>> {
        &self.verifier
    }

    /// Mint a session: generate a key, create the record, stash the key
    /// in the side channel so verifiers see fresh sessions too.
    async fn start_session(&self, extensions: &mut Extensions) -> Result<String, BackendError> {
        let key = self.backend.generate_session_key().await?;
        let session = R::new(key.clone());
        self.backend.create(&key, &session, None).await?;

        SessionIds::insert(extensions, self.frontend.identifier(), key.clone());
        tracing::debug!(session_key = %key, "Created new session");
        Ok(key)
    }
}

/// The session middleware. Install with
/// `axum::middleware::from_fn_with_state(manager, session_middleware::<R>)`.
pub async fn session_middleware<R: SessionRecord>(
    State(manager): State<SessionManager<R>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    // RESOLVING: a missing or invalid client token is never fatal; it
    // degrades to a fresh session.
    let session_key = match manager
        .frontend
        .resolve(&parts.headers, &mut parts.extensions)
    {
        Ok(key) => key,
        Err(err) => {
            tracing::debug!(error = %err, "No usable session token; starting a new session");
            match manager.start_session(&mut parts.extensions).await {
                Ok(key) => key,
                Err(err) => return SessionError::from(err).into_response(),
            }
        }
    };

    // LOADING: a stale key (client holds a token for a session the
    // backend no longer knows) marks the token for replacement.
    let mut replace_token = false;
    let mut session: Option<R> = match manager.backend.load(&session_key).await {
        Ok(session) => Some(session),
        Err(BackendError::NotFound(_)) => {
            replace_token = true;
            None
        }
        Err(err) => return SessionError::from(err).into_response(),
    };

    // VALIDATING: policy rejection nulls the session and forces token
    // replacement, indistinguishable from a stale key downstream.
    if let Some(record) = &session {
        if !manager.verifier.verify(record) {
            tracing::debug!(session_key = %session_key, "Verification policy rejected session");
            replace_token = true;
            session = None;
        }
    }

    // RENEWING: only meaningful while a valid session is held. Failure
    // here is fatal; continuing silently would break the TTL contract
    // without detection.
    if manager.renew_on_access && session.is_some() {
        if let Err(err) = manager.backend.renew(&session_key, manager.renewal_ttl).await {
            tracing::error!(error = %err, session_key = %session_key, "Session renewal failed");
            return SessionError::Internal("session could not be renewed".to_string())
                .into_response();
        }
    }

    // A replaced token points at a newly created session; the handler
    // still observes the absent session for this request.
    let response_key = if replace_token {
        match manager.start_session(&mut parts.extensions).await {
            Ok(key) => Some(key),
            Err(err) => return SessionError::from(err).into_response(),
        }
    } else {
        session.is_some().then(|| session_key.clone())
    };

    // DISPATCHING
    parts.extensions.insert(Session(session));
    let request = Request::from_parts(parts, body);
    let mut response = next.run(request).await;

    // RESPONDING: write the token on every response, not just mutating
    // ones; renewal must refresh the client-side timestamp too.
    if let Some(key) = response_key {
        manager.frontend.open_session(&key, response.headers_mut());
    }

    response
}
