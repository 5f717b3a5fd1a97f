//! Salted, iterated password hashing (PBKDF2-HMAC-SHA256).

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::store::StoreError;

type HmacSha256 = Hmac<Sha256>;

const SALT_LEN: usize = 32;
const HASH_LEN: usize = 32;

/// Stored form of a password: the parameters needed to re-derive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub iterations: u32,
    pub salt: Vec<u8>,
    pub hash: [u8; HASH_LEN],
}

/// Produces credentials with a fixed iteration count.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ITERATIONS)
    }
}

impl PasswordHasher {
    pub const DEFAULT_ITERATIONS: u32 = 100_000;

    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash `password` under a new random salt.
    pub fn hash(&self, password: &str) -> Result<Credential, StoreError> {
        let mut salt = vec![0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let hash = pbkdf2_sha256(password.as_bytes(), &salt, self.iterations)?;
        Ok(Credential {
            iterations: self.iterations,
            salt,
            hash,
        })
    }
}

impl Credential {
    pub fn verify(&self, password: &str) -> Result<bool, StoreError> {
        let candidate = pbkdf2_sha256(password.as_bytes(), &self.salt, self.iterations)?;
        Ok(constant_time_eq(&candidate, &self.hash))
    }

    /// `iterations:salt_hex:hash_hex`
    pub fn to_record(&self) -> String {
        format!(
            "{}:{}:{}",
            self.iterations,
            hex::encode(&self.salt),
            hex::encode(self.hash)
        )
    }

    pub fn from_record(record: &str) -> Option<Self> {
        let mut parts = record.split(':');
        let iterations = parts.next()?.parse::<u32>().ok().filter(|n| *n > 0)?;
        let salt = hex::decode(parts.next()?).ok()?;
        let hash_vec = hex::decode(parts.next()?).ok()?;
        if parts.next().is_some() || salt.is_empty() {
            return None;
        }
        let hash: [u8; HASH_LEN] = hash_vec.try_into().ok()?;
        Some(Self {
            iterations,
            salt,
            hash,
        })
    }
}

/// PBKDF2 with a single output block (dkLen = 32 = SHA-256 output).
fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; HASH_LEN], StoreError> {
    let prf = HmacSha256::new_from_slice(password).map_err(|_| StoreError::Internal("hmac key"))?;

    let mut mac = prf.clone();
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut u = [0u8; HASH_LEN];
    u.copy_from_slice(&mac.finalize().into_bytes());
    let mut out = u;

    for _ in 1..iterations {
        let mut mac = prf.clone();
        mac.update(&u);
        u.copy_from_slice(&mac.finalize().into_bytes());
        for (o, b) in out.iter_mut().zip(u.iter()) {
            *o ^= b;
        }
    }
    Ok(out)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn matches_known_pbkdf2_vectors() {
        let one = pbkdf2_sha256(b"password", b"salt", 1).unwrap();
        assert_eq!(
            hex::encode(one),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
        );
        let many = pbkdf2_sha256(b"password", b"salt", 4096).unwrap();
        assert_eq!(
            hex::encode(many),
            "c5e478d59288c841aa530db6845c4c8d962893a001ce4e11a4963873aa98134a"
        );
    }

    #[test]
    fn each_hash_gets_its_own_salt() {
        let hasher = PasswordHasher::new(10);
        let a = hasher.hash("hunter2").unwrap();
        let b = hasher.hash("hunter2").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
        assert!(a.verify("hunter2").unwrap());
        assert!(!a.verify("hunter3").unwrap());
    }

    #[test]
    fn record_round_trip_keeps_iterations() {
        let cred = PasswordHasher::new(7).hash("pw").unwrap();
        let parsed = Credential::from_record(&cred.to_record()).unwrap();
        assert_eq!(parsed, cred);
        assert_eq!(parsed.iterations, 7);
    }

    #[test]
    fn malformed_records_are_rejected() {
        assert!(Credential::from_record("").is_none());
        assert!(Credential::from_record("0:00:00").is_none());
        assert!(Credential::from_record("5:zz:00").is_none());
        assert!(Credential::from_record("5:00:0011").is_none()); // short hash
    }
}
