use alloy_primitives::{U256, uint};

use super::{CodecError, SCALAR_LEN};

/// Order of the secp256k1 group.
pub const ORDER: U256 =
    uint!(0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141_U256);

/// `ORDER >> 1`, the largest `s` a canonical signature may carry.
pub const HALF_ORDER: U256 =
    uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

/// Canonicalize `s` to the lower of `s` and `ORDER - s` (BIP-62 low S).
///
/// Values at or above `ORDER` are reduced first, so the result is at most
/// `HALF_ORDER` for every input.
pub fn normalize_s(s: &[u8; SCALAR_LEN]) -> [u8; SCALAR_LEN] {
    let mut value = U256::from_be_bytes(*s);
    if value >= ORDER {
        value -= ORDER;
    }
    if value > HALF_ORDER {
        value = ORDER - value;
    }
    value.to_be_bytes::<SCALAR_LEN>()
}

/// Hex front end for [`normalize_s`]; accepts up to 64 hex characters and
/// always returns 64 lowercase ones.
pub fn normalize_s_hex(s: &str) -> Result<String, CodecError> {
    let digits = s.trim();
    if digits.is_empty() || digits.len() > SCALAR_LEN * 2 {
        return Err(CodecError::MalformedInput(format!(
            "expected 1 to {} hex characters for s, got {}",
            SCALAR_LEN * 2,
            digits.len()
        )));
    }
    let padded = format!("{digits:0>width$}", width = SCALAR_LEN * 2);
    let mut bytes = [0u8; SCALAR_LEN];
    hex::decode_to_slice(&padded, &mut bytes)
        .map_err(|e| CodecError::MalformedInput(format!("invalid hex for s: {e}")))?;
    Ok(hex::encode(normalize_s(&bytes)))
}
