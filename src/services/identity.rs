//! Opaque random identities for sessions and visitors.
//!
//! Session ids live only as long as the process; visitor ids are handed to
//! browsers in a long-lived cookie and come back on every location report.

use std::fmt::Write;

use rand::Rng;

/// Longest visitor id accepted back from a client.
pub const MAX_VISITOR_ID_LEN: usize = 64;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Identity of one live websocket connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a random 8-byte hex session id.
    #[must_use]
    pub fn generate() -> Self {
        let bytes: [u8; 8] = rand::rng().random();
        Self(bytes_to_hex(&bytes))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Durable identity of a browser, carried in the `visitor_id` cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisitorId(String);

impl VisitorId {
    /// Generate a random 16-byte hex visitor id.
    #[must_use]
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::rng().random();
        Self(bytes_to_hex(&bytes))
    }

    /// Accept a client-supplied id if it is 1-64 ASCII hex characters.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = !raw.is_empty() && raw.len() <= MAX_VISITOR_ID_LEN && raw.chars().all(|c| c.is_ascii_hexdigit());
        valid.then(|| Self(raw.to_ascii_lowercase()))
    }

    /// Reuse the cookie value when well-formed, otherwise mint a new id.
    /// The flag reports whether a new id was generated.
    #[must_use]
    pub fn from_cookie_or_generate(raw: Option<&str>) -> (Self, bool) {
        match raw.and_then(Self::parse) {
            Some(id) => (id, false),
            None => (Self::generate(), true),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VisitorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
