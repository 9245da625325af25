use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token flavours minted by the storefront's auth service. The cart only
/// honours access tokens; refresh tokens share the signing key and must be
/// recognised so they can be turned away.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[serde(alias = "Access")]
    Access,
    #[serde(alias = "Refresh")]
    Refresh,
}

impl TokenKind {
    pub fn grants_cart_access(self) -> bool {
        matches!(self, TokenKind::Access)
    }
}

/// Bearer token payload. `sub` is the customer who owns the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}
