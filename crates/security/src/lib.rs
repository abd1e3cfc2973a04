//! Inbound token validation for RagBridge.
//!
//! Provides:
//! - **JWKS validation**: OpenID discovery → key set → `kid` match →
//!   signature and expiry → issuer prefix (and audience when an app id is set)
//! - **Local-test allowance**: requests without a token pass only when
//!   explicitly enabled outside production
//! - **Trusted caller**: an accept-all validator for in-process use

pub mod jwks;
pub mod trusted;

pub use jwks::JwksTokenValidator;
pub use trusted::TrustedCaller;
