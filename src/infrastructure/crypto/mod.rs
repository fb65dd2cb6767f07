//! Token signing, password hashing and check-in credentials

pub mod jwt;
pub mod password;
pub mod qr;

pub use jwt::{create_token, verify_token, JwtConfig, TokenClaims};
pub use password::{hash_password, verify_password};
pub use qr::issue_qr_code;
