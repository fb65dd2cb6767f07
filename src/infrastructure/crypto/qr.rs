//! Check-in credentials for reservations
//!
//! A credential is `PKQR-<reservation prefix>-<digest>` where the digest is
//! a SHA-256 over the reservation, its owner and 16 random bytes. It is
//! stored on the reservation and compared verbatim at check-in.

use rand::Rng;
use sha2::{Digest, Sha256};

const QR_PREFIX: &str = "PKQR-";

pub fn issue_qr_code(reservation_id: &str, user_id: &str) -> String {
    let nonce: [u8; 16] = rand::thread_rng().gen();

    let mut hasher = Sha256::new();
    hasher.update(reservation_id.as_bytes());
    hasher.update(b"|");
    hasher.update(user_id.as_bytes());
    hasher.update(nonce);
    let digest = hex::encode(hasher.finalize());

    let short_id: String = reservation_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect();
    format!("{}{}-{}", QR_PREFIX, short_id.to_uppercase(), &digest[..24])
}

/// Whether `code` has the shape produced by [`issue_qr_code`].
pub fn is_well_formed(code: &str) -> bool {
    let Some(rest) = code.strip_prefix(QR_PREFIX) else {
        return false;
    };
    match rest.split_once('-') {
        Some((id, digest)) => {
            !id.is_empty()
                && digest.len() == 24
                && digest.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique_and_well_formed() {
        let a = issue_qr_code("3f2a9c1e-0000-4000-8000-000000000001", "u1");
        let b = issue_qr_code("3f2a9c1e-0000-4000-8000-000000000001", "u1");
        assert_ne!(a, b);
        assert!(a.starts_with("PKQR-3F2A9C1E-"));
        assert!(is_well_formed(&a));
    }

    #[test]
    fn malformed_codes_are_detected() {
        assert!(!is_well_formed("nope"));
        assert!(!is_well_formed("PKQR-ABC-xyz"));
        assert!(!is_well_formed("PKQR-ABC"));
    }
}
