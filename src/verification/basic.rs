//! Basic verification: accept any session the backend knows about.

use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::SessionBackend;
use crate::models::SessionRecord;

use super::SessionVerifier;

/// Verification policy that accepts every record that exists and parses
/// to the expected schema. Stricter policies (role checks and the like)
/// implement [`SessionVerifier`] themselves.
pub struct BasicVerifier<R: SessionRecord> {
    identifier: String,
    backend: Arc<dyn SessionBackend<R>>,
}

impl<R: SessionRecord> BasicVerifier<R> {
    pub fn new(identifier: impl Into<String>, backend: Arc<dyn SessionBackend<R>>) -> Self {
        BasicVerifier {
            identifier: identifier.into(),
            backend,
        }
    }
}

#[async_trait]
impl<R: SessionRecord> SessionVerifier<R> for BasicVerifier<R> {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn backend(&self) -> &dyn SessionBackend<R> {
        self.backend.as_ref()
    }

    fn verify(&self, _session: &R) -> bool {
        true
    }
}
