//! Short-lived CDP bearer tokens.
//!
//! Tokens are compact JWS strings signed with the CDP API key (Ed25519).
//! The `uri` claim pins a token to one method and URL.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};

use crate::error::RebalancerError;

/// Request the issued tokens authorize: onramp session token creation.
pub const ONRAMP_TOKEN_URI: &str = "POST https://api.developer.coinbase.com/onramp/v1/token";

/// Seconds between `nbf` and `exp`.
pub const JWT_LIFETIME_SECS: i64 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
    pub typ: String,
    pub alg: String,
    pub kid: String,
    pub nonce: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub iss: String,
    pub nbf: i64,
    pub exp: i64,
    pub sub: String,
    pub uri: String,
}

/// Signs CDP JWTs for one API key.
pub struct CdpJwtSigner {
    key_name: String,
    signing_key: SigningKey,
}

impl CdpJwtSigner {
    /// `secret` is base64 of either a 32-byte seed or a 64-byte
    /// seed-plus-public-key pair (libsodium layout).
    pub fn new(key_name: &str, secret: &str) -> Result<Self, RebalancerError> {
        let invalid = || RebalancerError::configuration("CDP_API_KEY_SECRET is not a valid Ed25519 key");
        let bytes = STANDARD.decode(secret.trim()).map_err(|_| invalid())?;
        let signing_key = match bytes.len() {
            32 => {
                let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| invalid())?;
                SigningKey::from_bytes(&seed)
            }
            64 => {
                let pair: [u8; 64] = bytes.as_slice().try_into().map_err(|_| invalid())?;
                SigningKey::from_keypair_bytes(&pair).map_err(|_| invalid())?
            }
            _ => return Err(invalid()),
        };
        Ok(Self {
            key_name: key_name.to_string(),
            signing_key,
        })
    }

    pub fn verifying_key(&self) -> ed25519_dalek::VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Sign a token for `uri`, valid from `now` for [`JWT_LIFETIME_SECS`].
    pub fn sign(&self, uri: &str, now: i64) -> Result<String, RebalancerError> {
        let header = JwtHeader {
            typ: "JWT".to_string(),
            alg: "EdDSA".to_string(),
            kid: self.key_name.clone(),
            nonce: hex::encode(rand::random::<[u8; 16]>()),
        };
        let claims = JwtClaims {
            iss: "cdp".to_string(),
            nbf: now,
            exp: now + JWT_LIFETIME_SECS,
            sub: self.key_name.clone(),
            uri: uri.to_string(),
        };

        let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(&claims)?);
        let signature = self.signing_key.sign(signing_input.as_bytes());
        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, RebalancerError> {
    let json = serde_json::to_vec(value)
        .map_err(|e| RebalancerError::configuration(format!("Failed to encode JWT: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}
