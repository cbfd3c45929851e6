//! Access token signing and verification
//!
//! Access tokens are HMAC-signed JWTs. New tokens are always signed with the
//! active secret; verification also accepts retired secrets so that a secret
//! can be rotated without cutting off tokens that are still inside their TTL.

use crate::config::AuthConfig;
use crate::models::AccessTokenClaims;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey,
    Header, Validation,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token signature does not match")]
    SignatureMismatch,

    #[error("token has expired")]
    Expired,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("unexpected signing algorithm {0}")]
    UnexpectedAlgorithm(String),

    #[error("unable to sign token: {0}")]
    Signing(String),
}

/// Ordered HMAC key material: the active key first, then retired keys
struct SigningKeys {
    encoding: EncodingKey,
    decoding: Vec<DecodingKey>,
}

impl SigningKeys {
    fn new(active: &str, previous: &[String]) -> Self {
        let decoding = std::iter::once(active)
            .chain(previous.iter().map(String::as_str))
            .map(|secret| DecodingKey::from_secret(secret.as_bytes()))
            .collect();

        Self {
            encoding: EncodingKey::from_secret(active.as_bytes()),
            decoding,
        }
    }
}

/// Creates and verifies signed access tokens
pub struct TokenSigner {
    keys: SigningKeys,
    issuer: String,
    access_ttl: Duration,
}

impl TokenSigner {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            keys: SigningKeys::new(&config.jwt_secret, &config.jwt_previous_secrets),
            issuer: config.jwt_issuer.clone(),
            access_ttl: Duration::seconds(config.access_token_expiration),
        }
    }

    /// Lifetime of the tokens this signer issues
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Issue an access token valid from `now` until `now + access TTL`
    pub fn issue(
        &self,
        user_id: Uuid,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let iat = now.timestamp();

        let claims = AccessTokenClaims {
            user_id,
            username: username.to_string(),
            iat,
            nbf: iat,
            exp: (now + self.access_ttl).timestamp(),
            iss: self.issuer.clone(),
            sub: user_id.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, issuer and lifetime of a token as seen at `now`
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AccessTokenClaims, TokenError> {
        let header = decode_header(token).map_err(|_| TokenError::Malformed)?;

        if !matches!(
            header.alg,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(TokenError::UnexpectedAlgorithm(format!("{:?}", header.alg)));
        }

        let mut validation = Validation::new(header.alg);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "iss", "sub"]);
        // nbf is compared with the caller's clock below
        validation.validate_nbf = false;

        let claims = self.decode_with_any_key(token, &validation)?;

        let now_ts = now.timestamp();
        if now_ts >= claims.exp {
            return Err(TokenError::Expired);
        }
        if now_ts < claims.nbf {
            return Err(TokenError::NotYetValid);
        }
        if claims.sub != claims.user_id.to_string() {
            return Err(TokenError::Malformed);
        }

        Ok(claims)
    }

    fn decode_with_any_key(
        &self,
        token: &str,
        validation: &Validation,
    ) -> Result<AccessTokenClaims, TokenError> {
        for key in &self.keys.decoding {
            match decode::<AccessTokenClaims>(token, key, validation) {
                Ok(data) => return Ok(data.claims),
                Err(e) => match e.kind() {
                    ErrorKind::InvalidSignature => continue,
                    ErrorKind::ExpiredSignature => return Err(TokenError::Expired),
                    ErrorKind::InvalidAlgorithm => {
                        return Err(TokenError::UnexpectedAlgorithm(format!(
                            "{:?}",
                            validation.algorithms
                        )))
                    }
                    _ => return Err(TokenError::Malformed),
                },
            }
        }

        Err(TokenError::SignatureMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn signer() -> TokenSigner {
        TokenSigner::new(&AuthConfig::new(SECRET))
    }

    fn flip_signature_byte(token: &str) -> String {
        let (head, signature) = token.rsplit_once('.').unwrap();
        let mut sig: Vec<char> = signature.chars().collect();
        sig[0] = if sig[0] == 'A' { 'B' } else { 'A' };
        format!("{}.{}", head, sig.into_iter().collect::<String>())
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let signer = signer();
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let token = signer.issue(user_id, "alice", now).unwrap();
        let claims = signer
            .verify(&token, now + Duration::seconds(60))
            .unwrap();

        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.iss, crate::config::DEFAULT_ISSUER);
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.nbf, now.timestamp());
        assert_eq!(claims.exp, (now + signer.access_ttl()).timestamp());
    }

    #[test]
    fn test_expired_at_exact_ttl() {
        let signer = signer();
        let now = Utc::now();
        let token = signer.issue(Uuid::new_v4(), "alice", now).unwrap();

        let last_valid = now + signer.access_ttl() - Duration::seconds(1);
        assert!(signer.verify(&token, last_valid).is_ok());

        assert_eq!(
            signer.verify(&token, now + signer.access_ttl()).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_wall_clock_expiry_also_rejects() {
        let signer = signer();
        let issued = Utc::now() - Duration::hours(2);
        let token = signer.issue(Uuid::new_v4(), "alice", issued).unwrap();

        // Caller clock says valid, the parser's clock does not
        let result = signer.verify(&token, issued + Duration::seconds(1));
        assert_eq!(result.unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_not_yet_valid() {
        let signer = signer();
        let now = Utc::now();
        let token = signer.issue(Uuid::new_v4(), "alice", now).unwrap();

        assert_eq!(
            signer.verify(&token, now - Duration::seconds(5)).unwrap_err(),
            TokenError::NotYetValid
        );
    }

    #[test]
    fn test_tampered_signature() {
        let signer = signer();
        let now = Utc::now();
        let token = signer.issue(Uuid::new_v4(), "alice", now).unwrap();

        let result = signer.verify(&flip_signature_byte(&token), now);
        assert!(matches!(
            result,
            Err(TokenError::SignatureMismatch) | Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let now = Utc::now();
        let token = signer().issue(Uuid::new_v4(), "alice", now).unwrap();
        let other = TokenSigner::new(&AuthConfig::new("f".repeat(32)));

        assert_eq!(
            other.verify(&token, now).unwrap_err(),
            TokenError::SignatureMismatch
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert_eq!(
            signer().verify("garbage", Utc::now()).unwrap_err(),
            TokenError::Malformed
        );
    }

    #[test]
    fn test_rejects_non_hmac_algorithm() {
        let signer = signer();
        let now = Utc::now();
        let token = signer.issue(Uuid::new_v4(), "alice", now).unwrap();

        // Same payload and signature under an RS256 header
        let (_, rest) = token.split_once('.').unwrap();
        let forged = format!("eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.{}", rest);

        assert!(matches!(
            signer.verify(&forged, now),
            Err(TokenError::UnexpectedAlgorithm(_))
        ));
    }

    #[test]
    fn test_wrong_issuer() {
        let now = Utc::now();
        let mut config = AuthConfig::new(SECRET);
        config.jwt_issuer = "someone-else".to_string();
        let token = TokenSigner::new(&config)
            .issue(Uuid::new_v4(), "alice", now)
            .unwrap();

        assert_eq!(
            signer().verify(&token, now).unwrap_err(),
            TokenError::Malformed
        );
    }

    #[test]
    fn test_retired_secret_still_verifies() {
        let now = Utc::now();
        let old_secret = "o".repeat(32);
        let old_token = TokenSigner::new(&AuthConfig::new(old_secret.clone()))
            .issue(Uuid::new_v4(), "alice", now)
            .unwrap();

        let mut rotated = AuthConfig::new(SECRET);
        rotated.jwt_previous_secrets = vec![old_secret];
        let signer = TokenSigner::new(&rotated);

        assert!(signer.verify(&old_token, now).is_ok());

        // New tokens are signed with the active secret only
        let fresh = signer.issue(Uuid::new_v4(), "bob", now).unwrap();
        assert!(TokenSigner::new(&AuthConfig::new(SECRET))
            .verify(&fresh, now)
            .is_ok());
    }
}
