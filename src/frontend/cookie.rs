//! Signed-cookie session frontend.
//!
//! The token is `payload.timestamp.signature`, each part URL-safe base64,
//! with `signature = HMAC-SHA256(derived_key, payload || "." || timestamp)`
//! and `derived_key = HMAC-SHA256(secret_key, salt)`. A token older than
//! the cookie's max-age is rejected exactly like a bad signature.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{Extensions, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::FrontendError;
use crate::models::CookieParameters;

use super::{SessionFrontend, SessionIds};

type HmacSha256 = Hmac<Sha256>;

/// Session frontend that carries the session key in a signed cookie.
pub struct CookieFrontend {
    cookie_name: String,
    identifier: String,
    derived_key: [u8; 32],
    cookie_params: CookieParameters,
}

impl CookieFrontend {
    pub fn new(
        cookie_name: impl Into<String>,
        identifier: impl Into<String>,
        secret_key: &str,
        salt: &str,
        cookie_params: CookieParameters,
    ) -> Self {
        // Salt-scoped key derivation: tokens signed under one salt never
        // verify under another, even with a shared secret
        let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(salt.as_bytes());
        let derived_key: [u8; 32] = mac.finalize().into_bytes().into();

        CookieFrontend {
            cookie_name: cookie_name.into(),
            identifier: identifier.into(),
            derived_key,
            cookie_params,
        }
    }

    /// Produce the signed token for a session key.
    fn sign(&self, session_key: &str) -> String {
        let timestamp = unix_now();
        self.sign_at(session_key, timestamp)
    }

    fn sign_at(&self, session_key: &str, timestamp: u64) -> String {
        let payload = URL_SAFE_NO_PAD.encode(session_key.as_bytes());
        let ts = URL_SAFE_NO_PAD.encode(timestamp.to_be_bytes());
        let signed_part = format!("{}.{}", payload, ts);

        let mut mac = HmacSha256::new_from_slice(&self.derived_key)
            .expect("HMAC can take key of any size");
        mac.update(signed_part.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signed_part, signature)
    }

    /// Validate a token and recover the session key.
    fn unsign(&self, token: &str) -> Result<String, FrontendError> {
        let mut parts = token.splitn(3, '.');
        let (Some(payload), Some(ts), Some(signature)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(FrontendError::InvalidToken);
        };

        let mut mac = HmacSha256::new_from_slice(&self.derived_key)
            .expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        mac.update(b".");
        mac.update(ts.as_bytes());

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| FrontendError::InvalidToken)?;
        // Constant-time comparison
        mac.verify_slice(&signature)
            .map_err(|_| FrontendError::InvalidToken)?;

        let ts_bytes: [u8; 8] = URL_SAFE_NO_PAD
            .decode(ts)
            .map_err(|_| FrontendError::InvalidToken)?
            .try_into()
            .map_err(|_| FrontendError::InvalidToken)?;
        let timestamp = u64::from_be_bytes(ts_bytes);

        // An expired token is indistinguishable from a tampered one
        if unix_now().saturating_sub(timestamp) > self.cookie_params.max_age {
            return Err(FrontendError::InvalidToken);
        }

        let key = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| FrontendError::InvalidToken)?;
        String::from_utf8(key).map_err(|_| FrontendError::InvalidToken)
    }

    /// Find this frontend's cookie in the request headers.
    fn cookie_value(&self, headers: &HeaderMap) -> Option<String> {
        for header in headers.get_all(COOKIE) {
            let Ok(header) = header.to_str() else {
                continue;
            };
            for pair in header.split(';') {
                if let Some((name, value)) = pair.trim().split_once('=') {
                    if name == self.cookie_name {
                        return Some(value.to_string());
                    }
                }
            }
        }
        None
    }

    fn set_cookie(&self, headers: &mut HeaderMap, value: &str, max_age: u64) {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}; SameSite={}",
            self.cookie_name, value, self.cookie_params.path, max_age, self.cookie_params.same_site
        );
        if let Some(domain) = &self.cookie_params.domain {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }

        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(err) => {
                tracing::error!(error = %err, "Session cookie contains invalid header characters");
            }
        }
    }
}

impl SessionFrontend for CookieFrontend {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn resolve(
        &self,
        headers: &HeaderMap,
        extensions: &mut Extensions,
    ) -> Result<String, FrontendError> {
        let signed = self.cookie_value(headers).ok_or(FrontendError::NotSet)?;
        let session_key = self.unsign(&signed)?;

        SessionIds::insert(extensions, &self.identifier, session_key.clone());
        Ok(session_key)
    }

    fn open_session(&self, session_key: &str, headers: &mut HeaderMap) {
        let token = self.sign(session_key);
        self.set_cookie(headers, &token, self.cookie_params.max_age);
    }

    fn remove_session(&self, headers: &mut HeaderMap) {
        self.set_cookie(headers, "", 0);
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
