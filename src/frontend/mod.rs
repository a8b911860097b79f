//! Session frontends: moving the session key across the client boundary.

pub mod cookie;

use std::collections::HashMap;

use axum::http::{Extensions, HeaderMap};

use crate::error::FrontendError;

pub use cookie::CookieFrontend;

/// Per-request side channel mapping a frontend/verifier identifier to the
/// session key it resolved. Lives in the request's `Extensions`; a
/// verifier running later in the same request reads the key from here
/// instead of re-parsing the token.
#[derive(Debug, Clone, Default)]
pub struct SessionIds(HashMap<String, String>);

impl SessionIds {
    /// Record a resolved session key under `identifier`.
    pub fn insert(extensions: &mut Extensions, identifier: &str, session_key: String) {
        if let Some(ids) = extensions.get_mut::<SessionIds>() {
            ids.0.insert(identifier.to_string(), session_key);
        } else {
            let mut ids = SessionIds::default();
            ids.0.insert(identifier.to_string(), session_key);
            extensions.insert(ids);
        }
    }

    /// Look up the session key resolved under `identifier`, if any.
    pub fn get(extensions: &Extensions, identifier: &str) -> Option<String> {
        extensions
            .get::<SessionIds>()
            .and_then(|ids| ids.0.get(identifier).cloned())
    }
}

/// Contract for session frontends.
///
/// A frontend extracts a signed session key from inbound request headers
/// and writes a signed session key into outbound response headers.
pub trait SessionFrontend: Send + Sync {
    /// Key under which this frontend stashes resolved session keys in the
    /// per-request [`SessionIds`] side channel.
    fn identifier(&self) -> &str;

    /// Extract and validate the session key from the request.
    ///
    /// Fails with `NotSet` when no token is present and `InvalidToken`
    /// when the signature or timestamp check fails; callers treat both as
    /// "need a new session". On success the key is also recorded in the
    /// side channel under [`Self::identifier`].
    fn resolve(
        &self,
        headers: &HeaderMap,
        extensions: &mut Extensions,
    ) -> Result<String, FrontendError>;

    /// Append the signed session key to the response headers.
    ///
    /// Safe to call more than once per response; each call appends a
    /// fresh header and the client keeps the last one. Callers that
    /// switch keys mid-response should be aware both tokens go out on
    /// the wire.
    fn open_session(&self, session_key: &str, headers: &mut HeaderMap);

    /// Instruct the client to drop its session token.
    fn remove_session(&self, headers: &mut HeaderMap);
}
