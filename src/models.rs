//! Record schema trait, the default session record, and cookie parameters.
//!
//! All models use serde for serialization/deserialization. A backend only
//! ever stores value-copies of records; structural equality is required so
//! tests and callers can compare a loaded copy against the original.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Schema contract for session records.
///
/// A record always carries its own session key in a `session_id` field,
/// and that field always equals the storage key. Applications add extra
/// fields by defining their own record type.
pub trait SessionRecord:
    Clone + PartialEq + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Build a fresh record for a newly generated session key.
    fn new(session_id: String) -> Self;

    /// The session key this record is stored under.
    fn session_id(&self) -> &str;
}

/// Minimal session record: just the session key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub session_id: String,
}

impl SessionRecord for UserSession {
    fn new(session_id: String) -> Self {
        UserSession { session_id }
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// `SameSite` attribute for the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

impl std::fmt::Display for SameSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SameSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lax" => Ok(SameSite::Lax),
            "strict" => Ok(SameSite::Strict),
            "none" => Ok(SameSite::None),
            _ => Err(format!("Invalid SameSite value: {}", s)),
        }
    }
}

/// Cookie attributes applied to every `Set-Cookie` the frontend writes.
///
/// `max_age` doubles as the maximum accepted age of a signed token: a
/// token older than `max_age` seconds is rejected as invalid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieParameters {
    pub path: String,
    pub max_age: u64,
    pub same_site: SameSite,
    pub domain: Option<String>,
}

impl Default for CookieParameters {
    fn default() -> Self {
        CookieParameters {
            path: "/".to_string(),
            max_age: 3600,
            same_site: SameSite::Lax,
            domain: None,
        }
    }
}
