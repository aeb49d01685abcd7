//! Signature verification for access and refresh tokens.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use std::{fmt, fs, path::Path};
use tracing::debug;

use super::Error;

/// Signing algorithm used by the upstream API for both token classes.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::ES384;

/// Which public key a token is checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyClass {
    Access,
    Refresh,
}

/// Key document published by the upstream API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    #[serde(default)]
    pub created: String,
    pub pubkey: String,
    #[serde(default)]
    pub signature: String,
}

#[derive(Deserialize)]
struct Subject {
    sub: String,
}

#[derive(Clone)]
pub struct KeySet {
    access: DecodingKey,
    refresh: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet")
            .field("algorithm", &TOKEN_ALGORITHM)
            .finish_non_exhaustive()
    }
}

impl KeySet {
    /// Build a key set from two PEM encoded EC public keys.
    ///
    /// # Errors
    /// Returns an error if either key is not a valid EC public key.
    pub fn from_pem(access_pem: &[u8], refresh_pem: &[u8]) -> Result<Self, Error> {
        let access = DecodingKey::from_ec_pem(access_pem).map_err(Error::KeyParse)?;
        let refresh = DecodingKey::from_ec_pem(refresh_pem).map_err(Error::KeyParse)?;

        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.leeway = 0;
        validation.validate_aud = false;

        Ok(Self {
            access,
            refresh,
            validation,
        })
    }

    /// Load both key documents from disk.
    ///
    /// # Errors
    /// Returns an error if a file cannot be read, is not a key document, or
    /// holds an invalid key.
    pub fn load(access_path: &Path, refresh_path: &Path) -> Result<Self, Error> {
        let access = read_key_document(access_path)?;
        let refresh = read_key_document(refresh_path)?;
        debug!(
            access_created = %access.created,
            refresh_created = %refresh.created,
            "loaded token keys"
        );
        Self::from_pem(access.pubkey.as_bytes(), refresh.pubkey.as_bytes())
    }

    /// Verify signature, algorithm and expiry; return the subject.
    #[must_use]
    pub fn verify(&self, token: &str, class: KeyClass) -> Option<String> {
        let key = match class {
            KeyClass::Access => &self.access,
            KeyClass::Refresh => &self.refresh,
        };
        match decode::<Subject>(token, key, &self.validation) {
            Ok(data) => Some(data.claims.sub),
            Err(err) => {
                debug!(?class, "token rejected: {err}");
                None
            }
        }
    }
}

fn read_key_document(path: &Path) -> Result<ApiKey, Error> {
    let raw = fs::read_to_string(path).map_err(|source| Error::KeyFile {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}
