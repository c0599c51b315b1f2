//! Three-part `salt-nonce-payload` envelope codec.
//!
//! Segment lengths are deliberately not checked here; the service and cipher
//! layers reject salts and nonces of the wrong size.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Separator between the hex-encoded envelope segments.
pub const DELIMITER: char = '-';

/// Number of segments in a well-formed envelope.
const SEGMENTS: usize = 3;

/// Errors produced while parsing an envelope string.
///
/// All variants surface to callers as the same "malformed envelope" category;
/// the detail is for logs only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed envelope: expected {SEGMENTS} segments, got {0}")]
    SegmentCount(usize),

    #[error("malformed envelope: empty segment")]
    EmptySegment,

    #[error("malformed envelope: invalid hex")]
    InvalidHex,
}

/// A decoded envelope: the salt, nonce/IV, and cipher payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub salt: Vec<u8>,
    pub nonce: Vec<u8>,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn new(salt: impl Into<Vec<u8>>, nonce: impl Into<Vec<u8>>, payload: Vec<u8>) -> Self {
        Self {
            salt: salt.into(),
            nonce: nonce.into(),
            payload,
        }
    }

    /// Encode to the `hex(salt)-hex(nonce)-hex(payload)` transport string.
    pub fn encode(&self) -> String {
        format!(
            "{}{DELIMITER}{}{DELIMITER}{}",
            hex::encode(&self.salt),
            hex::encode(&self.nonce),
            hex::encode(&self.payload),
        )
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Envelope {
    type Err = CodecError;

    /// Parse a transport string back into an [`Envelope`].
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] unless the string splits into exactly three
    /// non-empty, valid hex segments.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(DELIMITER).collect();
        if parts.len() != SEGMENTS {
            return Err(CodecError::SegmentCount(parts.len()));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CodecError::EmptySegment);
        }

        let decode = |seg: &str| hex::decode(seg).map_err(|_| CodecError::InvalidHex);
        Ok(Self {
            salt: decode(parts[0])?,
            nonce: decode(parts[1])?,
            payload: decode(parts[2])?,
        })
    }
}
