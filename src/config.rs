//! Service configuration, read from the environment.

use std::{fmt, net::SocketAddr, sync::Arc, time::Duration};

use crate::{auth::AuthConfig, password::HashCost, UserDatabase};

pub const BIND_ADDR_VAR: &str = "AUTH_BIND_ADDR";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const TOKEN_SECRET_VAR: &str = "AUTH_TOKEN_SECRET";
pub const TOKEN_ISSUER_VAR: &str = "AUTH_TOKEN_ISSUER";
pub const TOKEN_TTL_VAR: &str = "AUTH_TOKEN_TTL_SECS";
pub const HASH_TIME_COST_VAR: &str = "AUTH_HASH_TIME_COST";
pub const HASH_MEM_KIB_VAR: &str = "AUTH_HASH_MEM_KIB";

const MIN_SECRET_LEN: usize = 32;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has an invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("{} must be at least {} bytes", TOKEN_SECRET_VAR, MIN_SECRET_LEN)]
    WeakSecret,
}

#[derive(Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub token_secret: String,
    pub token_issuer: String,
    pub token_lifetime: Duration,
    pub hash_cost: HashCost,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token_secret = lookup(TOKEN_SECRET_VAR)
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::Missing(TOKEN_SECRET_VAR))?;
        if token_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }

        let defaults = HashCost::default();
        let default_addr = SocketAddr::from(([127, 0, 0, 1], 3300));

        Ok(Self {
            bind_addr: parse_or(&lookup, BIND_ADDR_VAR, default_addr)?,
            database_url: lookup(DATABASE_URL_VAR).unwrap_or_else(|| "memory://".to_string()),
            token_secret,
            token_issuer: lookup(TOKEN_ISSUER_VAR).unwrap_or_else(|| "user_auth".to_string()),
            token_lifetime: Duration::from_secs(parse_or(&lookup, TOKEN_TTL_VAR, 60 * 60)?),
            hash_cost: HashCost {
                time_cost: parse_or(&lookup, HASH_TIME_COST_VAR, defaults.time_cost)?,
                mem_cost_kib: parse_or(&lookup, HASH_MEM_KIB_VAR, defaults.mem_cost_kib)?,
                ..defaults
            },
        })
    }

    pub fn auth_config(&self, database_connection: Arc<dyn UserDatabase>) -> AuthConfig {
        AuthConfig {
            auth_token_issuer: self.token_issuer.clone(),
            auth_token_secret: self.token_secret.clone(),
            auth_token_lifetime: self.token_lifetime,
            password_hash_cost: self.hash_cost,
            database_connection,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &redact_url(&self.database_url))
            .field("token_secret", &"<redacted>")
            .field("token_issuer", &self.token_issuer)
            .field("token_lifetime", &self.token_lifetime)
            .field("hash_cost", &self.hash_cost)
            .finish()
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(parsed),
            Err(_) => Err(ConfigError::Invalid { var, value }),
        },
        None => Ok(default),
    }
}

// Connection strings often embed a password: keep only the scheme and host.
fn redact_url(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            let host = rest.rsplit_once('@').map_or(rest, |(_, host)| host);
            format!("{scheme}://{host}")
        }
        None => url.to_string(),
    }
}
