use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chadempire_core::GameError;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{error::AppError, AppState};

type HmacSha256 = Hmac<Sha256>;

pub trait SessionResolver: Send + Sync {
    fn resolve(&self, token: &str, now: DateTime<Utc>) -> Option<String>;
}

/// Tokens of the form `wallet.expiresUnix.signatureHex`, signed with
/// HMAC-SHA256 over `wallet.expiresUnix`.
#[derive(Clone)]
pub struct HmacSessions {
    secret: Vec<u8>,
}

impl HmacSessions {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, payload: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC key");
        mac.update(payload.as_bytes());
        mac
    }

    pub fn issue(&self, wallet: &str, expires_at: DateTime<Utc>) -> String {
        let payload = format!("{wallet}.{}", expires_at.timestamp());
        let sig = hex::encode(self.mac(&payload).finalize().into_bytes());
        format!("{payload}.{sig}")
    }
}

impl SessionResolver for HmacSessions {
    fn resolve(&self, token: &str, now: DateTime<Utc>) -> Option<String> {
        let mut parts = token.rsplitn(3, '.');
        let sig = parts.next()?;
        let expires = parts.next()?;
        let wallet = parts.next()?;
        if wallet.is_empty() {
            return None;
        }
        let expires_at: i64 = expires.parse().ok()?;
        if expires_at <= now.timestamp() {
            return None;
        }
        let sig = hex::decode(sig).ok()?;
        self.mac(&format!("{wallet}.{expires}"))
            .verify_slice(&sig)
            .ok()?;
        Some(wallet.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Wallet(pub String);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Wallet {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| GameError::Unauthenticated)?;
        state
            .sessions
            .resolve(bearer.token(), state.clock.now())
            .map(Wallet)
            .ok_or_else(|| GameError::Unauthenticated.into())
    }
}

/// Admin routes require the configured API key as the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct Admin;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Admin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| GameError::Unauthenticated)?;
        if bearer.token() != state.config.api_key {
            return Err(GameError::Unauthenticated.into());
        }
        Ok(Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn issued_token_resolves_to_wallet() {
        let sessions = HmacSessions::new("secret");
        let now = Utc::now();
        let token = sessions.issue("7xKXtg2CW87d97TX", now + Duration::hours(1));
        assert_eq!(sessions.resolve(&token, now).as_deref(), Some("7xKXtg2CW87d97TX"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let sessions = HmacSessions::new("secret");
        let now = Utc::now();
        let token = sessions.issue("wallet", now - Duration::seconds(1));
        assert_eq!(sessions.resolve(&token, now), None);
    }

    #[test]
    fn tampered_or_foreign_tokens_are_rejected() {
        let sessions = HmacSessions::new("secret");
        let now = Utc::now();
        let token = sessions.issue("wallet", now + Duration::hours(1));
        let forged = token.replacen("wallet", "attacker", 1);
        assert_eq!(sessions.resolve(&forged, now), None);
        assert_eq!(HmacSessions::new("other").resolve(&token, now), None);
        assert_eq!(sessions.resolve("chadempire_auth_wallet", now), None);
        assert_eq!(sessions.resolve("", now), None);
    }
}
