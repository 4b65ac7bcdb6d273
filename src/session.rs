//! Session handle, identity provider seam and transient notifications.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::SessionError;

/// Text form of the anonymous principal.
pub const ANONYMOUS_PRINCIPAL: &str = "2vxsx-fae";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub principal: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// The caller identity handed to anything that talks to the service on the
/// user's behalf.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated(Identity),
}

impl Session {
    pub fn principal(&self) -> &str {
        match self {
            Session::Anonymous => ANONYMOUS_PRINCIPAL,
            Session::Authenticated(id) => &id.principal,
        }
    }

    pub fn bearer(&self) -> Option<&str> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated(id) => Some(&id.token),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated(_))
    }
}

#[derive(Debug, Deserialize)]
struct IdentityClaims {
    sub: String,
    exp: i64,
}

/// Decode an identity token. Without a shared secret only the expiry is
/// checked; the provider remains the authority on validity.
pub fn identity_from_token(token: &str, secret: Option<&str>) -> Result<Identity, SessionError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let key = match secret {
        Some(s) => DecodingKey::from_secret(s.as_bytes()),
        None => {
            validation.insecure_disable_signature_validation();
            DecodingKey::from_secret(&[])
        }
    };
    let claims = decode::<IdentityClaims>(token, &key, &validation)?.claims;
    if claims.sub.trim().is_empty() {
        return Err(SessionError::InvalidToken("empty subject".into()));
    }
    let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
        .ok_or_else(|| SessionError::InvalidToken("expiry out of range".into()))?;
    Ok(Identity { principal: claims.sub, token: token.to_string(), expires_at })
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Restore a session the provider still holds for this client, if any.
    async fn restore(&self) -> Result<Option<Identity>, SessionError>;
    /// Where to send the browser to log in.
    fn authorize_url(&self, return_to: &str, state: &str) -> Result<String, SessionError>;
    /// Validate the token handed back on the callback leg.
    async fn complete_login(&self, token: &str) -> Result<Identity, SessionError>;
    async fn logout(&self, identity: &Identity) -> Result<(), SessionError>;
}

/// Used when no identity provider is configured: browsing stays anonymous.
#[derive(Clone, Default)]
pub struct DisabledIdentityProvider;

#[async_trait]
impl IdentityProvider for DisabledIdentityProvider {
    async fn restore(&self) -> Result<Option<Identity>, SessionError> { Ok(None) }
    fn authorize_url(&self, _return_to: &str, _state: &str) -> Result<String, SessionError> { Err(SessionError::Unavailable) }
    async fn complete_login(&self, _token: &str) -> Result<Identity, SessionError> { Err(SessionError::Unavailable) }
    async fn logout(&self, _identity: &Identity) -> Result<(), SessionError> { Ok(()) }
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base: String,
    secret: Option<String>,
}

impl HttpIdentityProvider {
    pub fn new(base: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
            secret,
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn restore(&self) -> Result<Option<Identity>, SessionError> {
        let resp = self
            .client
            .post(format!("{}/api/session/restore", self.base))
            .send()
            .await?;
        match resp.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let body = resp.json::<TokenResponse>().await?;
                identity_from_token(&body.token, self.secret.as_deref()).map(Some)
            }
            s => Err(SessionError::Provider(format!("restore answered {s}"))),
        }
    }

    fn authorize_url(&self, return_to: &str, state: &str) -> Result<String, SessionError> {
        Ok(format!(
            "{}/authorize?redirect_uri={}&state={}",
            self.base,
            urlencoding::encode(return_to),
            urlencoding::encode(state)
        ))
    }

    async fn complete_login(&self, token: &str) -> Result<Identity, SessionError> {
        let identity = identity_from_token(token, self.secret.as_deref())?;
        let resp = self
            .client
            .get(format!("{}/api/session", self.base))
            .bearer_auth(token)
            .send()
            .await?;
        match resp.status() {
            s if s.is_success() => Ok(identity),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SessionError::Rejected("token not recognised".into())),
            s => Err(SessionError::Provider(format!("session check answered {s}"))),
        }
    }

    async fn logout(&self, identity: &Identity) -> Result<(), SessionError> {
        self.client
            .post(format!("{}/api/session/revoke", self.base))
            .bearer_auth(&identity.token)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// A short-lived message shown in the page chrome.
#[derive(Debug, Clone)]
pub struct Notice {
    pub id: Uuid,
    pub message: String,
    raised_at: Instant,
}

const MAX_NOTICES: usize = 8;

/// Self-dismissing notifications: anything older than the TTL is dropped
/// the next time the active set is read.
#[derive(Debug)]
pub struct Notifications {
    ttl: Duration,
    items: VecDeque<Notice>,
}

impl Notifications {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, items: VecDeque::new() }
    }

    pub fn push(&mut self, message: impl Into<String>) -> Uuid {
        self.push_at(message, Instant::now())
    }

    pub fn push_at(&mut self, message: impl Into<String>, now: Instant) -> Uuid {
        let id = Uuid::new_v4();
        self.items.push_back(Notice { id, message: message.into(), raised_at: now });
        while self.items.len() > MAX_NOTICES {
            self.items.pop_front();
        }
        id
    }

    pub fn active(&mut self) -> Vec<Notice> {
        self.active_at(Instant::now())
    }

    pub fn active_at(&mut self, now: Instant) -> Vec<Notice> {
        let ttl = self.ttl;
        self.items.retain(|n| now.saturating_duration_since(n.raised_at) < ttl);
        self.items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        exp: i64,
    }

    fn token(sub: &str, exp: i64, secret: &str) -> String {
        encode(&Header::default(), &TestClaims { sub, exp }, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    const SECRET: &str = "identity-secret-that-is-32-bytes!!";

    #[test]
    fn anonymous_session_uses_anonymous_principal() {
        let s = Session::default();
        assert_eq!(s.principal(), ANONYMOUS_PRINCIPAL);
        assert!(s.bearer().is_none());
        assert!(!s.is_authenticated());
    }

    #[test]
    fn verified_token_yields_identity() {
        let exp = Utc::now().timestamp() + 3600;
        let t = token("aaaaa-aa", exp, SECRET);
        let id = identity_from_token(&t, Some(SECRET)).unwrap();
        assert_eq!(id.principal, "aaaaa-aa");
        assert_eq!(id.expires_at.timestamp(), exp);
    }

    #[test]
    fn wrong_secret_is_rejected_but_unverified_mode_accepts() {
        let t = token("aaaaa-aa", Utc::now().timestamp() + 3600, SECRET);
        assert!(matches!(
            identity_from_token(&t, Some("another-secret-also-32-bytes-long!")),
            Err(SessionError::InvalidToken(_))
        ));
        assert!(identity_from_token(&t, None).is_ok());
    }

    #[test]
    fn expired_token_is_rejected() {
        let t = token("aaaaa-aa", Utc::now().timestamp() - 3600, SECRET);
        assert!(identity_from_token(&t, None).is_err());
    }

    #[test]
    fn notices_expire_after_ttl() {
        let mut n = Notifications::new(Duration::from_secs(5));
        let start = Instant::now();
        n.push_at("Login failed", start);
        assert_eq!(n.active_at(start + Duration::from_secs(1)).len(), 1);
        assert!(n.active_at(start + Duration::from_secs(6)).is_empty());
    }

    #[test]
    fn notices_are_capped() {
        let mut n = Notifications::new(Duration::from_secs(60));
        let now = Instant::now();
        for i in 0..20 {
            n.push_at(format!("n{i}"), now);
        }
        let active = n.active_at(now);
        assert_eq!(active.len(), MAX_NOTICES);
        assert_eq!(active.last().unwrap().message, "n19");
    }
}
