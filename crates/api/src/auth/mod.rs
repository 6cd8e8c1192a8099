//! Authentication primitives.
//!
//! Tokens are issued by the external identity provider; this service only
//! verifies them.
//!
//! - [`jwt`] -- JWT access-token validation (and generation for tests and tooling).

pub mod jwt;
