//! Session and refresh token issuing/verification (HS256 JWT).

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use taskboard_core::UserId;

use crate::{Actor, AuthError, RefreshClaims, SessionClaims, TokenError, check_expiry};

/// Session tokens live for one day.
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Refresh tokens live for seven days.
pub const REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Which signing secret a token is checked against.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SecretKind {
    Session,
    Refresh,
}

impl core::fmt::Display for SecretKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SecretKind::Session => f.write_str("session"),
            SecretKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// A decoded, verified token payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    Session(SessionClaims),
    Refresh(RefreshClaims),
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn new(kind: SecretKind, secret: &[u8]) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret(kind));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        })
    }
}

/// Mints and verifies session/refresh tokens, each kind with its own secret.
pub struct TokenIssuer {
    session: Keys,
    refresh: Keys,
    validation: Validation,
}

impl core::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(session_secret: &[u8], refresh_secret: &[u8]) -> Result<Self, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against an explicit clock in `verify_*_at`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = ["exp", "sub"].into_iter().map(String::from).collect();

        Ok(Self {
            session: Keys::new(SecretKind::Session, session_secret)?,
            refresh: Keys::new(SecretKind::Refresh, refresh_secret)?,
            validation,
        })
    }

    pub fn issue_session(&self, actor: &Actor) -> Result<String, TokenError> {
        self.issue_session_at(actor, Utc::now())
    }

    /// Same input and same `now` give the same token.
    pub fn issue_session_at(&self, actor: &Actor, now: DateTime<Utc>) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let claims = SessionClaims {
            sub: actor.id,
            role: actor.role,
            iat,
            exp: iat + SESSION_TTL_SECS,
        };
        sign(&self.session, &claims)
    }

    pub fn issue_refresh(&self, id: UserId) -> Result<String, TokenError> {
        self.issue_refresh_at(id, Utc::now())
    }

    pub fn issue_refresh_at(&self, id: UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = RefreshClaims {
            sub: id,
            exp: now.timestamp() + REFRESH_TTL_SECS,
        };
        sign(&self.refresh, &claims)
    }

    /// Verify a token against the secret of `kind`. Pure: no renewal.
    pub fn verify(&self, token: &str, kind: SecretKind) -> Result<Claim, AuthError> {
        let now = Utc::now();
        match kind {
            SecretKind::Session => self.verify_session_at(token, now).map(Claim::Session),
            SecretKind::Refresh => self.verify_refresh_at(token, now).map(Claim::Refresh),
        }
    }

    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.verify_session_at(token, Utc::now())
    }

    pub fn verify_session_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
        let claims: SessionClaims = self.decode_with(&self.session, token)?;
        check_expiry(claims.exp, now)?;
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        self.verify_refresh_at(token, Utc::now())
    }

    pub fn verify_refresh_at(&self, token: &str, now: DateTime<Utc>) -> Result<RefreshClaims, AuthError> {
        let claims: RefreshClaims = self.decode_with(&self.refresh, token)?;
        check_expiry(claims.exp, now)?;
        Ok(claims)
    }

    fn decode_with<T: DeserializeOwned>(&self, keys: &Keys, token: &str) -> Result<T, AuthError> {
        decode::<T>(token, &keys.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(kind = ?e.kind(), "token rejected");
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::TokenInvalid,
                }
            })
    }
}

fn sign<T: Serialize>(keys: &Keys, claims: &T) -> Result<String, TokenError> {
    encode(&Header::new(Algorithm::HS256), claims, &keys.encoding)
        .map_err(|e| TokenError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::Duration;
    use proptest::prelude::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"session-secret", b"refresh-secret").unwrap()
    }

    #[test]
    fn empty_secret_is_a_configuration_error() {
        let err = TokenIssuer::new(b"", b"refresh").unwrap_err();
        assert_eq!(err, TokenError::MissingSecret(SecretKind::Session));
        let err = TokenIssuer::new(b"session", b"").unwrap_err();
        assert_eq!(err, TokenError::MissingSecret(SecretKind::Refresh));
    }

    #[test]
    fn session_expires_after_one_day() {
        let issuer = issuer();
        let actor = Actor::new(UserId::new(), Role::Manager);
        let now = Utc::now();
        let token = issuer.issue_session_at(&actor, now).unwrap();

        let claims = issuer.verify_session_at(&token, now).unwrap();
        assert_eq!(claims.exp - claims.iat, SESSION_TTL_SECS);

        let later = now + Duration::seconds(SESSION_TTL_SECS - 1);
        assert!(issuer.verify_session_at(&token, later).is_ok());

        let expired = now + Duration::seconds(SESSION_TTL_SECS);
        assert_eq!(
            issuer.verify_session_at(&token, expired),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn refresh_expires_after_seven_days() {
        let issuer = issuer();
        let now = Utc::now();
        let token = issuer.issue_refresh_at(UserId::new(), now).unwrap();

        assert!(issuer.verify_refresh_at(&token, now + Duration::days(6)).is_ok());
        assert_eq!(
            issuer.verify_refresh_at(&token, now + Duration::days(7)),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn issuing_is_deterministic_for_fixed_time() {
        let issuer = issuer();
        let actor = Actor::new(UserId::new(), Role::Member);
        let now = Utc::now();
        assert_eq!(
            issuer.issue_session_at(&actor, now).unwrap(),
            issuer.issue_session_at(&actor, now).unwrap()
        );
    }

    #[test]
    fn tokens_are_not_interchangeable() {
        let issuer = issuer();
        let actor = Actor::new(UserId::new(), Role::Admin);
        let session = issuer.issue_session(&actor).unwrap();
        let refresh = issuer.issue_refresh(actor.id).unwrap();

        assert_eq!(
            issuer.verify(&session, SecretKind::Refresh),
            Err(AuthError::TokenInvalid)
        );
        assert_eq!(
            issuer.verify(&refresh, SecretKind::Session),
            Err(AuthError::TokenInvalid)
        );
    }

    #[test]
    fn shared_secret_still_separates_kinds() {
        let issuer = TokenIssuer::new(b"same", b"same").unwrap();
        let actor = Actor::new(UserId::new(), Role::Member);
        let session = issuer.issue_session(&actor).unwrap();
        let refresh = issuer.issue_refresh(actor.id).unwrap();

        assert_eq!(issuer.verify_refresh(&session), Err(AuthError::TokenInvalid));
        assert_eq!(issuer.verify_session(&refresh), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn garbage_and_tampered_tokens_are_invalid() {
        let issuer = issuer();
        assert_eq!(issuer.verify_session("abc.def.ghi"), Err(AuthError::TokenInvalid));
        assert_eq!(issuer.verify_session(""), Err(AuthError::TokenInvalid));

        let other = TokenIssuer::new(b"another-secret", b"refresh-secret").unwrap();
        let forged = other
            .issue_session(&Actor::new(UserId::new(), Role::Admin))
            .unwrap();
        assert_eq!(issuer.verify_session(&forged), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn verify_reports_claim_kind() {
        let issuer = issuer();
        let id = UserId::new();
        let refresh = issuer.issue_refresh(id).unwrap();
        match issuer.verify(&refresh, SecretKind::Refresh).unwrap() {
            Claim::Refresh(claims) => assert_eq!(claims.sub, id),
            other => panic!("expected refresh claim, got {other:?}"),
        }
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Admin), Just(Role::Manager), Just(Role::Member)]
    }

    proptest! {
        #[test]
        fn session_round_trip_preserves_identity_and_role(bits in any::<u128>(), role in any_role()) {
            let issuer = issuer();
            let actor = Actor::new(UserId::from_uuid(uuid::Uuid::from_u128(bits)), role);
            let token = issuer.issue_session(&actor).unwrap();
            match issuer.verify(&token, SecretKind::Session).unwrap() {
                Claim::Session(claims) => {
                    prop_assert_eq!(claims.sub, actor.id);
                    prop_assert_eq!(claims.role, actor.role);
                    prop_assert_eq!(Actor::from(&claims), actor);
                }
                other => prop_assert!(false, "unexpected claim {:?}", other),
            }
        }
    }
}
