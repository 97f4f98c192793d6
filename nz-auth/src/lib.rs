//! Salted password authentication for the NPS connection protocol.
//!
//! The server selects one of four authentication methods by sending a
//! 32-bit code during phase 3 of the handshake (see `nz-handshake`). This
//! crate only computes the credential bytes the client must send back; it
//! has no notion of the wire framing around them.

use base64::Engine;
use sha2::Digest;

/// Authentication method requested by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Code 0: already authenticated, no credential exchange needed.
    None,
    /// Code 3: cleartext password.
    Plain,
    /// Code 5: salted MD5.
    Md5,
    /// Code 6: salted SHA-256.
    Sha256,
}

impl AuthMethod {
    /// Map a server-supplied authentication code to a method, or `None` if
    /// the code is outside `{0, 3, 5, 6}`.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(AuthMethod::None),
            3 => Some(AuthMethod::Plain),
            5 => Some(AuthMethod::Md5),
            6 => Some(AuthMethod::Sha256),
            _ => None,
        }
    }
}

/// The two salt bytes a salted-auth challenge carries.
pub type Salt = [u8; 2];

/// Compute `base64(MD5(salt ∥ password))` with trailing `=` padding stripped.
pub fn md5_digest(salt: &Salt, password: &str) -> String {
    let mut input = Vec::with_capacity(salt.len() + password.len());
    input.extend_from_slice(salt);
    input.extend_from_slice(password.as_bytes());
    let digest = md5::compute(&input);
    encode_stripped(&digest.0)
}

/// Compute `base64(SHA-256(salt ∥ password))` with trailing `=` padding stripped.
pub fn sha256_digest(salt: &Salt, password: &str) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    encode_stripped(&hasher.finalize())
}

fn encode_stripped(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD
        .encode(bytes)
        .trim_end_matches('=')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repad(s: &str) -> String {
        let mut padded = s.to_string();
        while padded.len() % 4 != 0 {
            padded.push('=');
        }
        padded
    }

    #[test]
    fn auth_method_maps_known_codes() {
        assert_eq!(AuthMethod::from_code(0), Some(AuthMethod::None));
        assert_eq!(AuthMethod::from_code(3), Some(AuthMethod::Plain));
        assert_eq!(AuthMethod::from_code(5), Some(AuthMethod::Md5));
        assert_eq!(AuthMethod::from_code(6), Some(AuthMethod::Sha256));
    }

    #[test]
    fn auth_method_rejects_unknown_codes() {
        for code in [1, 2, 4, 7, 10, -1] {
            assert_eq!(AuthMethod::from_code(code), None);
        }
    }

    #[test]
    fn md5_digest_strips_exactly_the_padding() {
        let salt: Salt = [0xAB, 0xCD];
        let encoded = md5_digest(&salt, "secret");
        assert!(!encoded.ends_with('='));

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(repad(&encoded))
            .unwrap();

        let mut input = Vec::new();
        input.extend_from_slice(&salt);
        input.extend_from_slice(b"secret");
        let expected = md5::compute(&input).0;
        assert_eq!(decoded, expected);
    }

    #[test]
    fn sha256_digest_strips_exactly_the_padding() {
        let salt: Salt = [0x01, 0x02];
        let encoded = sha256_digest(&salt, "hunter2");
        assert!(!encoded.ends_with('='));

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(repad(&encoded))
            .unwrap();

        let mut hasher = sha2::Sha256::new();
        hasher.update(salt);
        hasher.update(b"hunter2");
        let expected = hasher.finalize().to_vec();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn digest_changes_with_salt() {
        let a = md5_digest(&[0, 0], "password");
        let b = md5_digest(&[0, 1], "password");
        assert_ne!(a, b);
    }

    #[test]
    fn digest_is_deterministic() {
        let salt: Salt = [9, 9];
        assert_eq!(md5_digest(&salt, "x"), md5_digest(&salt, "x"));
        assert_eq!(sha256_digest(&salt, "x"), sha256_digest(&salt, "x"));
    }
}
