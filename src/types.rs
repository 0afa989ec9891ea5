use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[repr(transparent)]
pub struct UserID(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[repr(transparent)]
pub struct Username(pub String);

/// PHC-encoded argon2 hash. Deliberately not `Serialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct HashedPassword(pub String);

/// A stored user, as held by a [`crate::UserDatabase`].
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub user_id: UserID,
    pub username: Username,
    pub password_hash: HashedPassword,
}

/// The only shape of a user that leaves the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserView {
    pub id: UserID,
    pub username: Username,
}

impl From<&CredentialRecord> for UserView {
    fn from(record: &CredentialRecord) -> Self {
        Self {
            id: record.user_id.clone(),
            username: record.username.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
    pub iss: String,
}

impl Claims {
    pub fn username(&self) -> Username {
        Username(self.sub.clone())
    }
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserView,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatus {
    pub username: Username,
    pub remaining_minutes: u64,
}

/// Result of an insert-if-absent against the credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_view_never_carries_the_hash() {
        let record = CredentialRecord {
            user_id: UserID("id-1".into()),
            username: Username("alice".into()),
            password_hash: HashedPassword("$argon2id$secret-material".into()),
        };

        let json = serde_json::to_string(&UserView::from(&record)).unwrap();

        assert_eq!(json, r#"{"id":"id-1","username":"alice"}"#);
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn token_status_uses_camel_case() {
        let status = TokenStatus {
            username: Username("alice".into()),
            remaining_minutes: 42,
        };

        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            serde_json::json!({"username": "alice", "remainingMinutes": 42})
        );
    }
}
