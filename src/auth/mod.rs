//! # Authentication Module
//!
//! OAuth 2.0 authorization-code exchange against the configured identity
//! provider. The exchanger is a pure client: it performs a single token
//! request and returns the result; storing the obtained token in the token
//! cache is the caller's job.

pub mod oauth;
