/// Token claim sets
///
/// On the wire every token carries `exp` and a `type` discriminator next to
/// the claims below. Refresh tokens additionally carry `jti` (one per minted
/// token) and `fam` (shared by every token descended from one login).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims of a short-lived access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Username
    pub sub: String,
}

/// Claims of a rotating refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Username
    pub sub: String,
    /// Token id
    pub jti: String,
    /// Family (lineage) id
    pub fam: String,
}

impl RefreshClaims {
    /// Every field must be present and non-empty for the token to take part in rotation.
    pub fn is_complete(&self) -> bool {
        !self.sub.is_empty() && !self.jti.is_empty() && !self.fam.is_empty()
    }
}

/// Outgoing payload: claims plus `exp` and `type`.
#[derive(Serialize)]
pub(crate) struct MintEnvelope<'a, C> {
    #[serde(flatten)]
    pub claims: &'a C,
    pub exp: i64,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

/// Incoming payload.
#[derive(Deserialize)]
pub(crate) struct DecodeEnvelope<C> {
    #[serde(flatten)]
    pub claims: C,
    pub exp: i64,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}
