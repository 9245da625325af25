//! Bearer-token identity for the cart routes. Issuing tokens belongs to the
//! storefront's auth service; this module only verifies them.

mod claims;
mod extractors;
mod keys;

pub use claims::{Claims, TokenKind};
pub use extractors::AuthUser;
pub use keys::JwtKeys;
