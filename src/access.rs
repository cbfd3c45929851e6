//! Access checks for downstream authorization
//!
//! Yes/no answer plus identity. Every validation failure becomes a plain
//! denial; callers that need to tell an expired token from a forged one use
//! [`AuthService::validate_token`] instead.

use crate::models::AccessDecision;
use crate::service::AuthService;

use std::sync::Arc;

#[derive(Clone)]
pub struct AccessChecker {
    auth: Arc<AuthService>,
}

impl AccessChecker {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }

    pub fn check(&self, access_token: &str) -> AccessDecision {
        match self.auth.validate_token(access_token) {
            Ok(claims) => AccessDecision::granted(claims.user_id),
            Err(e) => {
                tracing::debug!(reason = %e, "Access denied");
                AccessDecision::denied()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::{add_user, fixture};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_valid_token_is_granted() {
        let fx = fixture();
        let alice = add_user(&fx, "alice", "pw").await;
        let pair = fx.auth.login("alice", "pw").await.unwrap();

        let decision = AccessChecker::new(fx.auth.clone()).check(&pair.access_token);

        assert!(decision.is_valid);
        assert_eq!(decision.user_id, alice.id.to_string());
    }

    #[tokio::test]
    async fn test_garbage_is_denied() {
        let fx = fixture();
        let checker = AccessChecker::new(fx.auth.clone());

        assert_eq!(checker.check("garbage"), AccessDecision::denied());
        assert_eq!(checker.check(""), AccessDecision::denied());
    }

    #[tokio::test]
    async fn test_expired_token_is_denied() {
        let fx = fixture();
        let signer = crate::token::TokenSigner::new(fx.auth.config());
        let stale = signer
            .issue(Uuid::new_v4(), "alice", Utc::now() - Duration::hours(1))
            .unwrap();

        let decision = AccessChecker::new(fx.auth.clone()).check(&stale);
        assert_eq!(decision, AccessDecision::denied());
    }
}
