/// Authentication module
///
/// Credential verification, token minting/decoding, the refresh-token family
/// tracker, the rotation protocol and administrative revocation.

mod claims;
mod credentials;
pub(crate) mod family;
mod jwt;
mod password;
mod revocation;
mod rotation;

pub use claims::{AccessClaims, RefreshClaims, TokenType};
pub use credentials::CredentialVerifier;
pub use family::FamilyTracker;
pub use jwt::{Decoded, TokenCodec};
pub use password::{hash_password, hash_password_with_cost, verify_password};
pub use revocation::{require_authority, RevocationService};
pub use rotation::{RotationService, TokenPair, REASON_REUSE_DETECTED, REASON_ROTATED};
