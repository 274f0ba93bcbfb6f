use anyhow::Context;
use jsonwebtoken::{
    decode, decode_header,
    jwk::{Jwk, JwkSet},
    Algorithm, DecodingKey, Validation,
};
use tracing::{debug, info};

use super::claims::SessionClaims;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("invalid auth scheme")]
    InvalidScheme,
    #[error("invalid or expired token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("no signing key matches token kid {0:?}")]
    UnknownKey(Option<String>),
    #[error("token has no subject")]
    MissingSubject,
}

struct VerificationKey {
    kid: Option<String>,
    key: DecodingKey,
}

/// Stateless session token verification against a fixed key set.
pub struct SessionVerifier {
    keys: Vec<VerificationKey>,
    validation: Validation,
}

impl SessionVerifier {
    fn new(keys: Vec<VerificationKey>, algorithm: Algorithm, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
        }
        Self { keys, validation }
    }

    /// Offline verification with the instance's PEM public key.
    pub fn from_rsa_pem(pem: &str, issuer: Option<&str>) -> anyhow::Result<Self> {
        let key = DecodingKey::from_rsa_pem(pem.as_bytes()).context("parse CLERK_JWT_KEY")?;
        Ok(Self::new(
            vec![VerificationKey { kid: None, key }],
            Algorithm::RS256,
            issuer,
        ))
    }

    pub fn from_jwks(set: &JwkSet, issuer: Option<&str>) -> anyhow::Result<Self> {
        let keys = set
            .keys
            .iter()
            .map(|jwk: &Jwk| {
                Ok(VerificationKey {
                    kid: jwk.common.key_id.clone(),
                    key: DecodingKey::from_jwk(jwk).context("decode jwk")?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        if keys.is_empty() {
            anyhow::bail!("JWKS contains no keys");
        }
        Ok(Self::new(keys, Algorithm::RS256, issuer))
    }

    /// Shared-secret variant, used where no provider key is available (tests).
    pub fn from_secret(secret: &[u8], issuer: Option<&str>) -> Self {
        Self::new(
            vec![VerificationKey {
                kid: None,
                key: DecodingKey::from_secret(secret),
            }],
            Algorithm::HS256,
            issuer,
        )
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let header = decode_header(token)?;
        let key = self.key_for(header.kid.as_deref())?;
        let data = decode::<SessionClaims>(token, key, &self.validation)?;
        if data.claims.sub.is_empty() {
            return Err(AuthError::MissingSubject);
        }
        debug!(sub = %data.claims.sub, sid = ?data.claims.sid, "session verified");
        Ok(data.claims)
    }

    fn key_for(&self, kid: Option<&str>) -> Result<&DecodingKey, AuthError> {
        let found = match kid {
            Some(kid) => self
                .keys
                .iter()
                .find(|k| k.kid.as_deref() == Some(kid))
                .or_else(|| self.keys.iter().find(|k| k.kid.is_none())),
            None if self.keys.len() == 1 => self.keys.first(),
            None => None,
        };
        found
            .map(|k| &k.key)
            .ok_or_else(|| AuthError::UnknownKey(kid.map(str::to_owned)))
    }
}

/// Fetch the instance JWKS from the backend API using the secret key.
pub async fn fetch_jwks(api_url: &str, secret_key: &str) -> anyhow::Result<JwkSet> {
    let url = format!("{}/jwks", api_url.trim_end_matches('/'));
    let set = reqwest::Client::new()
        .get(&url)
        .bearer_auth(secret_key)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .context("JWKS request rejected")?
        .json::<JwkSet>()
        .await
        .context("decode JWKS")?;
    info!(keys = set.keys.len(), "fetched session JWKS");
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::OffsetDateTime;

    const SECRET: &[u8] = b"session-test-secret";

    fn token(sub: &str, exp_offset: i64, iss: Option<&str>) -> String {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = SessionClaims {
            sub: sub.into(),
            exp: (now + exp_offset) as usize,
            iat: Some(now as usize),
            nbf: Some((now - 5) as usize),
            iss: iss.map(str::to_owned),
            sid: Some("sess_123".into()),
            azp: None,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    #[test]
    fn verifies_valid_token() {
        let verifier = SessionVerifier::from_secret(SECRET, None);
        let claims = verifier.verify(&token("user_abc", 300, None)).expect("valid");
        assert_eq!(claims.sub, "user_abc");
        assert_eq!(claims.sid.as_deref(), Some("sess_123"));
    }

    #[test]
    fn rejects_expired_token() {
        let verifier = SessionVerifier::from_secret(SECRET, None);
        let err = verifier.verify(&token("user_abc", -600, None)).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn rejects_wrong_signature() {
        let verifier = SessionVerifier::from_secret(b"another-secret", None);
        assert!(verifier.verify(&token("user_abc", 300, None)).is_err());
    }

    #[test]
    fn enforces_issuer_when_configured() {
        let verifier = SessionVerifier::from_secret(SECRET, Some("https://clerk.example.com"));
        assert!(verifier
            .verify(&token("user_abc", 300, Some("https://clerk.example.com")))
            .is_ok());
        assert!(verifier
            .verify(&token("user_abc", 300, Some("https://evil.example.com")))
            .is_err());
    }

    #[test]
    fn rejects_empty_subject() {
        let verifier = SessionVerifier::from_secret(SECRET, None);
        let err = verifier.verify(&token("", 300, None)).unwrap_err();
        assert!(matches!(err, AuthError::MissingSubject));
    }

    #[test]
    fn rejects_garbage() {
        let verifier = SessionVerifier::from_secret(SECRET, None);
        assert!(verifier.verify("not-a-jwt").is_err());
    }
}
