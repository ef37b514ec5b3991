//! Token adapters.

mod jwt;

pub use jwt::JwtTokenService;
