use ed25519_dalek::{Signature, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthInputError {
    #[error("missing required header `{0}`")]
    MissingHeader(&'static str),
    #[error("public key is not configured")]
    MissingPublicKey,
    #[error("public key is invalid: {0}")]
    InvalidPublicKey(String),
}

/// Header values exactly as received; `None` when the header was absent.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignatureHeaders<'a> {
    pub signature: Option<&'a str>,
    pub timestamp: Option<&'a str>,
}

/// Ed25519 check over `timestamp ++ raw_body`.
#[derive(Clone, Debug)]
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    pub fn from_hex(public_key: &str) -> Result<Self, AuthInputError> {
        let public_key = public_key.trim();
        if public_key.is_empty() {
            return Err(AuthInputError::MissingPublicKey);
        }
        let bytes = hex::decode(public_key)
            .map_err(|error| AuthInputError::InvalidPublicKey(error.to_string()))?;
        let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            AuthInputError::InvalidPublicKey(format!(
                "expected {PUBLIC_KEY_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|error| AuthInputError::InvalidPublicKey(error.to_string()))?;
        Ok(Self { key })
    }

    /// `Ok(false)` for any signature that does not match, including one that
    /// is not valid hex. Errors only when a header is missing.
    pub fn is_verified(
        &self,
        headers: SignatureHeaders<'_>,
        raw_body: &[u8],
    ) -> Result<bool, AuthInputError> {
        let signature = headers.signature.ok_or(AuthInputError::MissingHeader(SIGNATURE_HEADER))?;
        let timestamp = headers.timestamp.ok_or(AuthInputError::MissingHeader(TIMESTAMP_HEADER))?;

        let Some(signature) = parse_signature(signature) else {
            return Ok(false);
        };

        let mut message = Vec::with_capacity(timestamp.len() + raw_body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(raw_body);

        Ok(self.key.verify(&message, &signature).is_ok())
    }
}

fn parse_signature(signature: &str) -> Option<Signature> {
    let bytes: [u8; SIGNATURE_LENGTH] = hex::decode(signature.trim()).ok()?.try_into().ok()?;
    Some(Signature::from_bytes(&bytes))
}

/// One-shot form of [`SignatureVerifier::is_verified`].
pub fn is_verified(
    headers: SignatureHeaders<'_>,
    raw_body: &[u8],
    public_key: Option<&str>,
) -> Result<bool, AuthInputError> {
    let public_key = public_key.ok_or(AuthInputError::MissingPublicKey)?;
    SignatureVerifier::from_hex(public_key)?.is_verified(headers, raw_body)
}
