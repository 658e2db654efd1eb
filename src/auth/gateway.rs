//! Identity handed over by the upstream auth proxy.
//!
//! The proxy authenticates the user and forwards `X-Auth-User-Id` and
//! `X-Auth-Email`. When a gateway secret is configured the proxy must also
//! send it in `X-Gateway-Secret`; requests with a wrong secret are ignored.

use actix_web::http::header::HeaderMap;

use super::identity::Identity;

pub const USER_ID_HEADER: &str = "x-auth-user-id";
pub const EMAIL_HEADER: &str = "x-auth-email";
pub const SECRET_HEADER: &str = "x-gateway-secret";

#[derive(Debug, Clone, Default)]
pub struct Gateway {
    secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayIdentity {
    /// No identity headers on the request.
    Absent,
    Trusted(Identity),
    /// Identity headers present but the secret did not match.
    Rejected,
}

impl Gateway {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn read(&self, headers: &HeaderMap) -> GatewayIdentity {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let Some(id) = header(USER_ID_HEADER) else {
            return GatewayIdentity::Absent;
        };

        if let Some(expected) = &self.secret {
            let submitted = header(SECRET_HEADER).unwrap_or("");
            if !constant_time_eq(expected, submitted) {
                return GatewayIdentity::Rejected;
            }
        }

        GatewayIdentity::Trusted(Identity::new(id, header(EMAIL_HEADER).unwrap_or("")))
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
