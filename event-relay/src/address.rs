//! # Address Codec
//!
//! Node addresses arrive from the chain as bech32 text under the chain's own prefix. The relay
//! decodes them into their raw 20-byte form and re-encodes them under the destination network's
//! prefix, which is not necessarily the prefix they arrived with.
//!
//! Node public keys arrive as hex and are decoded into an Ed25519 [`VerifyingKey`].

use std::fmt;
use std::str::FromStr;

use bech32::{Bech32, Hrp};
use ed25519_dalek::{VerifyingKey, PUBLIC_KEY_LENGTH};
use snafu::{ResultExt, Snafu};

/// Length in bytes of a binary node address.
pub const ADDRESS_LENGTH: usize = 20;

/// Amino registration prefix of an Ed25519 public key, followed by its length byte.
pub const AMINO_ED25519_PUBKEY_PREFIX: [u8; 5] = [0x16, 0x24, 0xde, 0x64, 0x20];

/// Errors raised while decoding or encoding addresses and keys.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CodecError {
    /// The text is not valid bech32.
    #[snafu(display("invalid bech32 address {address:?}: {source}"))]
    InvalidAddressEncoding {
        /// The text that failed to decode.
        address: String,
        /// The underlying bech32 error.
        source: bech32::DecodeError,
    },

    /// The bech32 text decoded to a payload that is not an address.
    #[snafu(display("address {address:?} holds {length} bytes, expected {ADDRESS_LENGTH}"))]
    InvalidAddressLength {
        /// The text that was decoded.
        address: String,
        /// Length of the decoded payload.
        length: usize,
    },

    /// The binary address cannot be expressed as bech32.
    #[snafu(display("cannot encode a {length}-byte address as bech32"))]
    EncodingError {
        /// Length of the binary address.
        length: usize,
    },

    /// The bech32 encoder rejected the input.
    #[snafu(display("bech32 encoding failed: {source}"))]
    Bech32Encode {
        /// The underlying bech32 error.
        source: bech32::EncodeError,
    },

    /// The address prefix is not a valid bech32 human readable part.
    #[snafu(display("invalid address prefix {prefix:?}: {reason}"))]
    InvalidPrefix {
        /// The rejected prefix.
        prefix: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The public key text is not hex.
    #[snafu(display("public key is not valid hex: {source}"))]
    InvalidHex {
        /// The underlying hex error.
        source: hex::FromHexError,
    },

    /// The decoded bytes are not an Ed25519 public key.
    #[snafu(display("invalid ed25519 public key encoding: {reason}"))]
    InvalidKeyEncoding {
        /// Why the bytes were rejected.
        reason: String,
    },
}

/// A bech32 human readable part used when re-encoding addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPrefix(Hrp);

impl AddressPrefix {
    /// Returns the underlying human readable part.
    pub fn hrp(&self) -> Hrp {
        self.0
    }
}

impl FromStr for AddressPrefix {
    type Err = CodecError;

    fn from_str(prefix: &str) -> Result<Self, Self::Err> {
        Hrp::parse(prefix)
            .map(AddressPrefix)
            .map_err(|e| CodecError::InvalidPrefix {
                prefix: prefix.to_string(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for AddressPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw form of a node address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Wraps raw address bytes.
    pub fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns the raw address bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Encodes this address as bech32 under `prefix`.
    pub fn to_bech32(&self, prefix: AddressPrefix) -> Result<String, CodecError> {
        encode_address(&self.0, prefix)
    }
}

/// Decodes bech32 `text` into a binary address, whatever prefix it carries.
///
/// # Errors
/// - [`CodecError::InvalidAddressEncoding`] if `text` is not valid bech32.
/// - [`CodecError::InvalidAddressLength`] if the payload is not [`ADDRESS_LENGTH`] bytes.
pub fn decode_address(text: &str) -> Result<Address, CodecError> {
    let (_hrp, data) = bech32::decode(text).context(InvalidAddressEncodingSnafu {
        address: text.to_string(),
    })?;

    let bytes: [u8; ADDRESS_LENGTH] =
        data.try_into()
            .map_err(|data: Vec<u8>| CodecError::InvalidAddressLength {
                address: text.to_string(),
                length: data.len(),
            })?;

    Ok(Address(bytes))
}

/// Encodes a binary address as bech32 under `prefix`.
///
/// # Errors
/// - [`CodecError::EncodingError`] if `bytes` is not [`ADDRESS_LENGTH`] long.
pub fn encode_address(bytes: &[u8], prefix: AddressPrefix) -> Result<String, CodecError> {
    if bytes.len() != ADDRESS_LENGTH {
        return EncodingSnafu {
            length: bytes.len(),
        }
        .fail();
    }

    bech32::encode::<Bech32>(prefix.hrp(), bytes).context(Bech32EncodeSnafu)
}

/// Decodes `text` as bech32 and re-encodes it under `prefix`.
pub fn translate_address(text: &str, prefix: AddressPrefix) -> Result<String, CodecError> {
    decode_address(text)?.to_bech32(prefix)
}

/// Decodes a hex encoded Ed25519 public key.
///
/// Both the raw 32-byte key and its amino encoding ([`AMINO_ED25519_PUBKEY_PREFIX`] followed by the
/// key) are accepted.
///
/// # Errors
/// - [`CodecError::InvalidHex`] if `text` is not hex.
/// - [`CodecError::InvalidKeyEncoding`] if the bytes are not an Ed25519 public key.
pub fn decode_public_key(text: &str) -> Result<VerifyingKey, CodecError> {
    let bytes = hex::decode(text).context(InvalidHexSnafu)?;
    let raw = match bytes.strip_prefix(&AMINO_ED25519_PUBKEY_PREFIX[..]) {
        Some(key) if key.len() == PUBLIC_KEY_LENGTH => key,
        _ => &bytes[..],
    };

    let key: &[u8; PUBLIC_KEY_LENGTH] =
        raw.try_into()
            .map_err(|_| CodecError::InvalidKeyEncoding {
                reason: format!(
                    "expected {PUBLIC_KEY_LENGTH} key bytes, got {}",
                    raw.len()
                ),
            })?;

    VerifyingKey::from_bytes(key).map_err(|e| CodecError::InvalidKeyEncoding {
        reason: e.to_string(),
    })
}

/// Hex encodes the raw bytes of a public key.
pub fn encode_public_key(key: &VerifyingKey) -> String {
    hex::encode(key.as_bytes())
}
