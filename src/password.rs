use argon2::{Variant, Version};

use crate::types::HashedPassword;

const SALT_LEN: usize = 16;

/// Argon2 work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    /// Number of passes over memory.
    pub time_cost: u32,
    /// Memory in KiB.
    pub mem_cost_kib: u32,
    pub lanes: u32,
}

impl Default for HashCost {
    /// Argon2id, t=2, m=19 MiB, p=1. Tens of milliseconds on commodity hardware.
    fn default() -> Self {
        Self {
            time_cost: 2,
            mem_cost_kib: 19 * 1024,
            lanes: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher {
    cost: HashCost,
}

impl PasswordHasher {
    pub fn new(cost: HashCost) -> Self {
        Self { cost }
    }

    /// Hash with a fresh random salt. Only fails if the configured cost is
    /// out of range for argon2.
    pub fn hash(&self, password: &str) -> Result<HashedPassword, argon2::Error> {
        let salt: [u8; SALT_LEN] = rand::random();
        let encoded = argon2::hash_encoded(password.as_bytes(), &salt, &self.config())?;

        Ok(HashedPassword(encoded))
    }

    /// Parameters and salt are read back from the encoded hash, so hashes made
    /// under an older cost still verify. Unparseable hash text is a mismatch.
    pub fn verify(&self, password: &str, hash: &HashedPassword) -> bool {
        argon2::verify_encoded(&hash.0, password.as_bytes()).unwrap_or(false)
    }

    fn config(&self) -> argon2::Config<'static> {
        argon2::Config {
            variant: Variant::Argon2id,
            version: Version::Version13,
            mem_cost: self.cost.mem_cost_kib,
            time_cost: self.cost.time_cost,
            lanes: self.cost.lanes,
            ..argon2::Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordHasher {
        PasswordHasher::new(HashCost {
            time_cost: 1,
            mem_cost_kib: 64,
            lanes: 1,
        })
    }

    #[test]
    fn correct_password_verifies() {
        let hasher = cheap();
        let hash = hasher.hash("correct horse").unwrap();

        assert!(hasher.verify("correct horse", &hash));
        assert!(hash.0.starts_with("$argon2id$"));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let hasher = cheap();
        let hash = hasher.hash("pw1").unwrap();

        assert!(!hasher.verify("pw2", &hash));
        assert!(!hasher.verify("", &hash));
    }

    #[test]
    fn repeated_hashes_are_salted() {
        let hasher = cheap();
        let first = hasher.hash("same").unwrap();
        let second = hasher.hash("same").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("same", &first));
        assert!(hasher.verify("same", &second));
    }

    #[test]
    fn malformed_hash_is_a_mismatch() {
        let hasher = cheap();

        assert!(!hasher.verify("pw", &HashedPassword("not a hash".into())));
        assert!(!hasher.verify("pw", &HashedPassword(String::new())));
    }

    #[test]
    fn hash_from_a_different_cost_still_verifies() {
        let old = cheap().hash("pw").unwrap();
        let newer = PasswordHasher::new(HashCost {
            time_cost: 2,
            mem_cost_kib: 128,
            lanes: 1,
        });

        assert!(newer.verify("pw", &old));
    }

    #[test]
    fn invalid_cost_is_an_error() {
        let hasher = PasswordHasher::new(HashCost {
            time_cost: 0,
            mem_cost_kib: 64,
            lanes: 1,
        });

        assert!(hasher.hash("pw").is_err());
    }
}
