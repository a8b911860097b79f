//! Verification policies: deciding whether a loaded session record is
//! acceptable for the current request.

pub mod basic;

use async_trait::async_trait;
use axum::http::Extensions;

use crate::backend::SessionBackend;
use crate::error::{BackendError, SessionError};
use crate::frontend::SessionIds;
use crate::models::SessionRecord;

pub use basic::BasicVerifier;

/// Contract for session verification policies.
#[async_trait]
pub trait SessionVerifier<R: SessionRecord>: Send + Sync {
    /// Side-channel identifier this verifier reads its session key from.
    /// Must match the identifier of the frontend that resolved the key.
    fn identifier(&self) -> &str;

    /// Backend the policy loads records from.
    fn backend(&self) -> &dyn SessionBackend<R>;

    /// Pure policy decision over a loaded record. Returning false means
    /// the policy rejects the session; "not found" is a backend-level
    /// condition and never reaches this method.
    fn verify(&self, session: &R) -> bool;

    /// Full resolution flow: side channel -> load -> verify.
    ///
    /// A missing side-channel entry is a wiring defect (the frontend must
    /// run before the verifier) and surfaces as an internal error. Load
    /// failure and policy rejection collapse into the uniform
    /// [`SessionError::Invalid`] so clients cannot tell them apart.
    async fn resolve_and_verify(&self, extensions: &Extensions) -> Result<R, SessionError> {
        let session_key =
            SessionIds::get(extensions, self.identifier()).ok_or_else(|| {
                SessionError::Internal(format!(
                    "no session key for identifier {:?} in request state; \
                     frontend must run before verification",
                    self.identifier()
                ))
            })?;

        let session = match self.backend().load(&session_key).await {
            Ok(session) => session,
            Err(BackendError::NotFound(_)) => return Err(SessionError::Invalid),
            Err(err) => return Err(err.into()),
        };

        if !self.verify(&session) {
            return Err(SessionError::Invalid);
        }

        Ok(session)
    }
}
