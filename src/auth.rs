use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    error::{AuthError, DatabaseError},
    password::{HashCost, PasswordHasher},
    token::TokenIssuer,
    types::{
        CredentialRecord, HashedPassword, InsertOutcome, LoginOutcome, TokenStatus, UserID,
        UserView, Username,
    },
};

#[async_trait]
pub trait UserDatabase: Send + Sync + 'static {
    /// Store the record unless a user with the same username already exists.
    /// Must be atomic: two concurrent inserts for one username yield exactly
    /// one `Inserted`.
    async fn insert_user_if_absent(
        &self,
        record: &CredentialRecord,
    ) -> Result<InsertOutcome, DatabaseError>;

    /// Look up the user with the specified username.
    async fn find_user(&self, username: &Username)
        -> Result<Option<CredentialRecord>, DatabaseError>;
}

#[derive(Clone)]
pub struct AuthConfig {
    /// The issuer for auth tokens. We will validate that all auth tokens match the given issuer.
    pub auth_token_issuer: String,
    /// The secret used to sign JWT authorization tokens.
    /// If the secret changes, all currently authenticated sessions will be terminated.
    pub auth_token_secret: String,
    /// How long auth tokens should remain valid for. After this interval, the client will have to re-login.
    pub auth_token_lifetime: Duration,
    /// Argon2 work factor for newly stored passwords.
    pub password_hash_cost: HashCost,
    pub database_connection: Arc<dyn UserDatabase>,
}

struct AuthInternal {
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    token_lifetime: Duration,
    database: Arc<dyn UserDatabase>,
}

/// The authentication service. Cheap to clone; all clones share one
/// immutable state.
#[derive(Clone)]
pub struct Auth {
    internal: Arc<AuthInternal>,
}

impl Auth {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            internal: Arc::new(AuthInternal {
                hasher: PasswordHasher::new(config.password_hash_cost),
                tokens: TokenIssuer::new(
                    config.auth_token_secret.as_bytes(),
                    config.auth_token_issuer,
                ),
                token_lifetime: config.auth_token_lifetime,
                database: config.database_connection,
            }),
        }
    }

    #[instrument(skip_all, fields(username = %username))]
    pub async fn register(&self, username: &str, password: &str) -> Result<UserView, AuthError> {
        if username.is_empty() {
            return Err(AuthError::MissingInput("username"));
        }
        if password.is_empty() {
            return Err(AuthError::MissingInput("password"));
        }

        let username = Username(username.to_owned());
        if self.internal.database.find_user(&username).await?.is_some() {
            debug!("username already taken");
            return Err(AuthError::AlreadyExists);
        }

        let record = CredentialRecord {
            user_id: UserID(Uuid::new_v4().to_string()),
            username,
            password_hash: self.hash(password).await?,
        };

        // The lookup above is only a fast path; the store's answer is final.
        match self.internal.database.insert_user_if_absent(&record).await? {
            InsertOutcome::Inserted => {
                info!(user_id = %record.user_id.0, "user registered");
                Ok(UserView::from(&record))
            }
            InsertOutcome::AlreadyExists => {
                debug!("username taken by a concurrent registration");
                Err(AuthError::AlreadyExists)
            }
        }
    }

    #[instrument(skip_all, fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let record = self
            .internal
            .database
            .find_user(&Username(username.to_owned()))
            .await?
            .ok_or(AuthError::NotFound)?;

        if !self.verify_hash(password, &record.password_hash).await? {
            info!("login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self
            .internal
            .tokens
            .issue(&record.username.0, self.internal.token_lifetime)?;

        info!("user logged in");
        Ok(LoginOutcome {
            user: UserView::from(&record),
            token,
        })
    }

    /// Check a token supplied in a request body. Every rejection reason
    /// collapses into [`AuthError::InvalidToken`].
    pub async fn verify_token(&self, token: &str) -> Result<TokenStatus, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingInput("token"));
        }

        let claims = self.internal.tokens.verify(token).map_err(|reason| {
            debug!(%reason, "token rejected");
            AuthError::InvalidToken
        })?;

        Ok(TokenStatus {
            remaining_minutes: self.internal.tokens.remaining_minutes(&claims),
            username: claims.username(),
        })
    }

    /// Gate for protected operations: yields the username the bearer token
    /// was issued to.
    pub async fn authenticate_request(&self, token: Option<&str>) -> Result<Username, AuthError> {
        let token = token
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingInput("bearer token"))?;

        let claims = self.internal.tokens.verify(token).map_err(|reason| {
            debug!(%reason, "bearer token rejected");
            AuthError::Unauthenticated
        })?;

        Ok(claims.username())
    }

    #[instrument(skip_all, fields(username = %username.0))]
    pub async fn get_details(&self, username: &Username) -> Result<UserView, AuthError> {
        let record = self
            .internal
            .database
            .find_user(username)
            .await?
            .ok_or(AuthError::NotFound)?;

        Ok(UserView::from(&record))
    }

    // argon2 is deliberately slow; keep it off the async workers.
    async fn hash(&self, password: &str) -> Result<HashedPassword, AuthError> {
        let hasher = self.internal.hasher;
        let password = password.to_owned();

        Ok(tokio::task::spawn_blocking(move || hasher.hash(&password)).await??)
    }

    async fn verify_hash(&self, password: &str, hash: &HashedPassword) -> Result<bool, AuthError> {
        let hasher = self.internal.hasher;
        let password = password.to_owned();
        let hash = hash.clone();

        Ok(tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryUserDatabase;

    fn service() -> Auth {
        service_with_lifetime(Duration::from_secs(60 * 60))
    }

    fn service_with_lifetime(lifetime: Duration) -> Auth {
        Auth::new(AuthConfig {
            auth_token_issuer: "user_auth-tests".into(),
            auth_token_secret: "this secret is only used by unit tests".into(),
            auth_token_lifetime: lifetime,
            password_hash_cost: HashCost {
                time_cost: 1,
                mem_cost_kib: 64,
                lanes: 1,
            },
            database_connection: Arc::new(InMemoryUserDatabase::new()),
        })
    }

    #[tokio::test]
    async fn full_scenario() {
        let auth = service();

        let created = auth.register("alice", "pw1").await.unwrap();
        assert_eq!(created.username.0, "alice");

        assert!(matches!(
            auth.register("alice", "pw2").await,
            Err(AuthError::AlreadyExists)
        ));
        assert!(matches!(
            auth.login("alice", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));

        let login = auth.login("alice", "pw1").await.unwrap();
        assert_eq!(login.user, created);

        let status = auth.verify_token(&login.token).await.unwrap();
        assert_eq!(status.username.0, "alice");
        assert!((59..=60).contains(&status.remaining_minutes));

        let username = auth.authenticate_request(Some(&login.token)).await.unwrap();
        assert_eq!(username.0, "alice");

        let details = auth.get_details(&username).await.unwrap();
        assert_eq!(details, created);
    }

    #[tokio::test]
    async fn login_unknown_user_is_not_found() {
        let auth = service();

        assert!(matches!(
            auth.login("nobody", "pw").await,
            Err(AuthError::NotFound)
        ));
    }

    #[tokio::test]
    async fn register_requires_username_and_password() {
        let auth = service();

        assert!(matches!(
            auth.register("", "pw").await,
            Err(AuthError::MissingInput("username"))
        ));
        assert!(matches!(
            auth.register("alice", "").await,
            Err(AuthError::MissingInput("password"))
        ));
    }

    #[tokio::test]
    async fn stored_hash_is_not_the_password() {
        let database = Arc::new(InMemoryUserDatabase::new());
        let auth = Auth::new(AuthConfig {
            auth_token_issuer: "user_auth-tests".into(),
            auth_token_secret: "this secret is only used by unit tests".into(),
            auth_token_lifetime: Duration::from_secs(60),
            password_hash_cost: HashCost {
                time_cost: 1,
                mem_cost_kib: 64,
                lanes: 1,
            },
            database_connection: database.clone(),
        });

        auth.register("alice", "pw1").await.unwrap();

        let record = database
            .find_user(&Username("alice".into()))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(record.password_hash.0, "pw1");
        assert!(!record.password_hash.0.contains("pw1"));
    }

    #[tokio::test]
    async fn concurrent_registrations_resolve_to_one_winner() {
        let auth = service();

        let (first, second) = tokio::join!(
            auth.register("bob", "pw1"),
            auth.register("bob", "pw2"),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|outcome| matches!(outcome, Err(AuthError::AlreadyExists)))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn verify_token_hides_the_rejection_reason() {
        let auth = service();
        auth.register("alice", "pw1").await.unwrap();
        let token = auth.login("alice", "pw1").await.unwrap().token;

        let mut tampered = token.clone();
        tampered.push('x');

        assert!(matches!(
            auth.verify_token(&tampered).await,
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            auth.verify_token("garbage").await,
            Err(AuthError::InvalidToken)
        ));

        let expiring = service_with_lifetime(Duration::ZERO);
        expiring.register("alice", "pw1").await.unwrap();
        let expired = expiring.login("alice", "pw1").await.unwrap().token;
        assert!(matches!(
            expiring.verify_token(&expired).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn verify_token_requires_a_token() {
        assert!(matches!(
            service().verify_token("").await,
            Err(AuthError::MissingInput(_))
        ));
    }

    #[tokio::test]
    async fn authenticate_request_distinguishes_missing_from_invalid() {
        let auth = service();

        assert!(matches!(
            auth.authenticate_request(None).await,
            Err(AuthError::MissingInput(_))
        ));
        assert!(matches!(
            auth.authenticate_request(Some("")).await,
            Err(AuthError::MissingInput(_))
        ));
        assert!(matches!(
            auth.authenticate_request(Some("fake token")).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn details_for_unknown_user_is_not_found() {
        assert!(matches!(
            service().get_details(&Username("ghost".into())).await,
            Err(AuthError::NotFound)
        ));
    }
}
