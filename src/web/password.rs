// Password hashing — PBKDF2-HMAC-SHA256 with a random per-user salt.
//
// Stored format: pbkdf2-sha256${iterations}${salt_hex}${hash_hex}
// The iteration count travels with the hash so it can be raised later
// without invalidating existing accounts.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use super::auth::constant_time_eq;

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "pbkdf2-sha256";
const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Hash a password for storage.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    let hash = pbkdf2_sha256(password.as_bytes(), &salt, ITERATIONS);
    format!(
        "{SCHEME}${ITERATIONS}${}${}",
        hex::encode(salt),
        hex::encode(hash)
    )
}

/// Check a password against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    let [scheme, iterations, salt_hex, hash_hex] = parts.as_slice() else {
        return false;
    };
    if *scheme != SCHEME {
        return false;
    }
    let (Ok(iterations), Ok(salt)) = (iterations.parse::<u32>(), hex::decode(salt_hex)) else {
        return false;
    };
    if iterations == 0 {
        return false;
    }

    let computed = hex::encode(pbkdf2_sha256(password.as_bytes(), &salt, iterations));
    constant_time_eq(&computed, hash_hex)
}

/// PBKDF2 (RFC 8018) with HMAC-SHA256, producing a single 32-byte block.
fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32) -> [u8; HASH_LEN] {
    let prf = <HmacSha256 as Mac>::new_from_slice(password)
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));

    // U1 = PRF(password, salt || INT(1))
    let mut mac = prf.clone();
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut u: [u8; HASH_LEN] = mac.finalize().into_bytes().into();
    let mut out = u;

    for _ in 1..iterations {
        let mut mac = prf.clone();
        mac.update(&u);
        u = mac.finalize().into_bytes().into();
        for (o, b) in out.iter_mut().zip(u.iter()) {
            *o ^= b;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc7914_vector() {
        // PBKDF2-HMAC-SHA256 test vector from RFC 7914 section 11
        let out = pbkdf2_sha256(b"passwd", b"salt", 1);
        assert_eq!(
            hex::encode(&out[..16]),
            "55ac046e56e3089fec1691c22544b605"
        );
    }

    #[test]
    fn test_hash_then_verify() {
        let stored = hash_password("correct horse");
        assert!(stored.starts_with("pbkdf2-sha256$100000$"));
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("wrong horse", &stored));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "plaintext"));
        assert!(!verify_password("x", "bcrypt$10$abcd$ef"));
        assert!(!verify_password("x", "pbkdf2-sha256$0$00$00"));
    }
}
