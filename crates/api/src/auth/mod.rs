//! Authentication primitives.
//!
//! Sessions are issued by an external identity provider; the API only
//! validates the signed session token it receives.
//!
//! - [`jwt`] -- JWT validation (plus token minting for tests and local tooling).

pub mod jwt;
