//! Bearer token codec.
//!
//! Two separate concerns live here:
//!
//! - **Unverified decoding** ([`decode_unverified`], [`signature_segment`]) used on
//!   every request to read the expiry and derive the profile cache key.
//! - **Verification** ([`KeySet::verify`]) against the ES384 public key of the
//!   token class, used only where identity must be proven (login exchange).
//!
//! Decoding a token says nothing about its authenticity. The gateway relies on
//! the upstream API to reject forged tokens when the raw token is presented as
//! a bearer credential during the profile fetch.

mod claims;
mod error;
mod keys;

pub use claims::{Claims, decode_unverified, is_expired, seconds_until, signature_segment, unix_now};
pub use error::Error;
pub use keys::{ApiKey, KeyClass, KeySet, TOKEN_ALGORITHM};

#[cfg(test)]
pub(crate) use keys::fixtures;
