//! Conversions between KMS output and the Casper wire formats.
//!
//! The KMS hands back DER encoded ECDSA signatures and DER/PEM
//! SubjectPublicKeyInfo public keys. Casper wants a `02`-tagged 64-byte
//! `r ‖ s` signature with a low `s`, and a compressed secp256k1 point.
//! Everything here is a pure function.

pub mod der;
pub mod low_s;
pub mod public_key;
pub mod signature;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

pub use low_s::{HALF_ORDER, ORDER, normalize_s, normalize_s_hex};
pub use public_key::{
    casper_public_key_hex, compress_point, ec_point_from_der, ec_point_from_pem,
    public_key_hex_from_pem,
};
pub use signature::{compact_signature_from_base64, compact_signature_from_der};

/// Casper's algorithm tag for secp256k1 keys and signatures.
pub const SECP256K1_TAG: u8 = 0x02;

/// Width of `r`, `s` and of a curve coordinate.
pub const SCALAR_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("signature too short: {len} bytes, at least {min} expected")]
    TooShort { len: usize, min: usize },
    #[error("invalid ASN.1 sequence: {0}")]
    InvalidSequence(String),
    #[error("reassembled signature is {actual} hex characters, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("invalid secp256k1 public key format: {0}")]
    InvalidPublicKeyFormat(String),
    #[error("expected secp256k1 public key, got empty input")]
    EmptyInput,
}

/// Standard alphabet, tolerant of missing or short `=` padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// Decode base64 the way the KMS clients produce it, ignoring whitespace
/// and whatever `=` padding is present.
pub(crate) fn decode_base64(input: &str) -> Result<Vec<u8>, CodecError> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    LENIENT_BASE64
        .decode(compact.trim_end_matches('='))
        .map_err(|e| CodecError::MalformedInput(format!("invalid base64: {e}")))
}
