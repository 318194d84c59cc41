use super::der::{self, DerError, TAG_INTEGER, TAG_SEQUENCE};
use super::low_s::normalize_s;
use super::{CodecError, SCALAR_LEN, SECP256K1_TAG, decode_base64};

/// `r ‖ s` in hex, before the algorithm tag is prepended.
const COMPONENTS_HEX_LEN: usize = SCALAR_LEN * 2 * 2;

/// Convert a base64 DER ECDSA signature into Casper's compact form:
/// `02 ‖ r ‖ low-s`, lowercase hex.
pub fn compact_signature_from_base64(signature_der_b64: &str) -> Result<String, CodecError> {
    let der = decode_base64(signature_der_b64)?;
    compact_signature_from_der(&der)
}

/// Byte-level variant of [`compact_signature_from_base64`].
///
/// A payload whose length is a multiple of 32 carries no DER framing and is
/// returned as-is (hex, no tag).
pub fn compact_signature_from_der(der: &[u8]) -> Result<String, CodecError> {
    if der.is_empty() {
        return Err(CodecError::MalformedInput(
            "no signature data provided".to_string(),
        ));
    }
    let min = SCALAR_LEN * 2;
    if der.len() < min {
        return Err(CodecError::TooShort { len: der.len(), min });
    }
    if der.len() % SCALAR_LEN == 0 {
        return Ok(hex::encode(der));
    }

    let (r, s) = split_sequence(der)?;

    let r_hex = component_hex(r);
    let s_hex = match fixed_width(&component_hex(s)) {
        Some(s) => hex::encode(normalize_s(&s)),
        None => component_hex(s),
    };

    let actual = r_hex.len() + s_hex.len();
    if actual != COMPONENTS_HEX_LEN {
        return Err(CodecError::LengthMismatch {
            expected: COMPONENTS_HEX_LEN,
            actual,
        });
    }

    Ok(format!("{}{r_hex}{s_hex}", hex::encode([SECP256K1_TAG])))
}

fn split_sequence(der: &[u8]) -> Result<(&[u8], &[u8]), CodecError> {
    let invalid = |e: DerError| CodecError::InvalidSequence(e.to_string());

    let sequence = der::parse_single(der, TAG_SEQUENCE).map_err(invalid)?;
    let elements = sequence.children().read_all().map_err(invalid)?;

    match elements.as_slice() {
        [r, s] if r.tag == TAG_INTEGER && s.tag == TAG_INTEGER => Ok((r.value, s.value)),
        [_, _] => Err(CodecError::InvalidSequence(
            "sequence elements are not both INTEGER".to_string(),
        )),
        other => Err(CodecError::InvalidSequence(format!(
            "expected 2 elements, found {}",
            other.len()
        ))),
    }
}

/// Hex of one INTEGER: drop the sign byte of a 33-byte value, left-pad
/// shorter ones to 32 bytes. Anything else is left long and caught by the
/// length check.
fn component_hex(value: &[u8]) -> String {
    let width = SCALAR_LEN * 2;
    let mut digits = hex::encode(value);
    if digits.len() > width && digits.starts_with("00") {
        digits.replace_range(..2, "");
    }
    format!("{digits:0>width$}")
}

fn fixed_width(digits: &str) -> Option<[u8; SCALAR_LEN]> {
    let mut bytes = [0u8; SCALAR_LEN];
    hex::decode_to_slice(digits, &mut bytes).ok()?;
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_s_signature_converts_unchanged() {
        let result = compact_signature_from_base64(
            "MEQCICTfgzylgrlhiNEK/bXgz48fv828is9OdQxN2pkDPolsAiBP92yyQCQwSSCUTx09JAw00M3wWXMfnGLO+y4Gds2cXA=",
        )
        .unwrap();
        assert_eq!(
            result,
            "0224df833ca582b96188d10afdb5e0cf8f1fbfcdbc8acf4e750c4dda99033e896c\
             4ff76cb24024304920944f1d3d240c34d0cdf059731f9c62cefb2e0676cd9c5c"
        );
    }

    #[test]
    fn high_s_with_sign_byte_is_normalized() {
        let result = compact_signature_from_base64(
            "MEUCIASKOyv1PF6jyESy1sl5/OYzwVBegblC/bTX0+1kUdJ9AiEA/Pnlsqj6lR5Qbmm1T0vYaPHJO4XuABHuyexccISYWF4=",
        )
        .unwrap();
        assert_eq!(
            result,
            "02048a3b2bf53c5ea3c844b2d6c979fce633c1505e81b942fdb4d7d3ed6451d27d\
             03061a4d57056ae1af91964ab0b42795c8e5a160c1488e4cf5e6021c4b9de8e3"
        );
    }

    #[test]
    fn high_r_keeps_r_and_drops_sign_byte() {
        let result = compact_signature_from_base64(
            "MEUCIQDysG64gheI8JxYfS+RmO6ppPVYZacx0aVGRF++Amnj1gIgdfIzEdpfakpaMvDwMEfrAYqYLiUWXt372Lvrqc8mohk=",
        )
        .unwrap();
        assert_eq!(
            result,
            "02f2b06eb8821788f09c587d2f9198eea9a4f55865a731d1a546445fbe0269e3d6\
             75f23311da5f6a4a5a32f0f03047eb018a982e25165eddfbd8bbeba9cf26a219"
        );
    }

    #[test]
    fn high_r_and_high_s() {
        let result = compact_signature_from_base64(
            "MEYCIQCAf2B+txlyCj7uxuSr5DefJ7cZsmC1ZaJJfYUpb/sk9wIhAM/f2mVwgHf+6FkGghXmxzFfmaWPWPVu2Wq0QMs4+mgo",
        )
        .unwrap();
        assert_eq!(
            result,
            "02807f607eb719720a3eeec6e4abe4379f27b719b260b565a2497d85296ffb24f7\
             3020259a8f7f880117a6f97dea1938cd5b15375756533162551e1dc1973bd919"
        );
    }

    #[test]
    fn high_s_without_sign_byte_is_normalized() {
        // s = 7fff..ff fits in 32 bytes without a sign byte but is above
        // HALF_ORDER, so it still gets flipped.
        let result = compact_signature_from_base64(
            "MEQCICQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkAiB//////////////////////////////////////////w==",
        )
        .unwrap();
        assert_eq!(
            result,
            format!(
                "02{}{}",
                "24".repeat(32),
                "7ffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364142"
            )
        );
    }

    #[test]
    fn short_components_are_left_padded() {
        // 31-byte r and s.
        let mut der = vec![0x30, 0x42, 0x02, 0x1f];
        der.extend([0x22; 31]);
        der.extend([0x02, 0x1f]);
        der.extend([0x11; 31]);
        assert_eq!(der.len(), 68);

        let result = compact_signature_from_der(&der).unwrap();
        assert_eq!(
            result,
            format!("0200{}00{}", "22".repeat(31), "11".repeat(31))
        );
    }

    #[test]
    fn output_width_is_fixed() {
        for b64 in [
            "MEQCICTfgzylgrlhiNEK/bXgz48fv828is9OdQxN2pkDPolsAiBP92yyQCQwSSCUTx09JAw00M3wWXMfnGLO+y4Gds2cXA=",
            "MEUCIASKOyv1PF6jyESy1sl5/OYzwVBegblC/bTX0+1kUdJ9AiEA/Pnlsqj6lR5Qbmm1T0vYaPHJO4XuABHuyexccISYWF4=",
            "MEYCIQCAf2B+txlyCj7uxuSr5DefJ7cZsmC1ZaJJfYUpb/sk9wIhAM/f2mVwgHf+6FkGghXmxzFfmaWPWPVu2Wq0QMs4+mgo",
        ] {
            let result = compact_signature_from_base64(b64).unwrap();
            assert_eq!(result.len(), 130);
            assert!(result.starts_with("02"));
        }
    }

    #[test]
    fn already_compact_payload_is_returned_as_is() {
        let raw = [0x5a; 64];
        assert_eq!(compact_signature_from_der(&raw).unwrap(), hex::encode(raw));
    }

    #[test]
    fn empty_payload_is_malformed() {
        assert!(matches!(
            compact_signature_from_base64(""),
            Err(CodecError::MalformedInput(_))
        ));
    }

    #[test]
    fn short_payload_is_rejected() {
        assert_eq!(
            compact_signature_from_der(&[0x30; 40]),
            Err(CodecError::TooShort { len: 40, min: 64 })
        );
    }

    #[test]
    fn three_element_sequence_is_rejected() {
        let mut der = vec![0x30, 0x45, 0x02, 0x20];
        der.extend([0x11; 32]);
        der.extend([0x02, 0x1e]);
        der.extend([0x22; 30]);
        der.extend([0x02, 0x01, 0x01]);
        assert_eq!(der.len(), 71);
        assert!(matches!(
            compact_signature_from_der(&der),
            Err(CodecError::InvalidSequence(_))
        ));
    }

    #[test]
    fn non_sequence_is_rejected() {
        let mut der = vec![0x31, 0x42];
        der.extend([0x00; 0x42]);
        assert!(matches!(
            compact_signature_from_der(&der),
            Err(CodecError::InvalidSequence(_))
        ));
    }

    #[test]
    fn oversized_component_is_a_length_mismatch() {
        // 33-byte r that does not start with a sign byte.
        let mut der = vec![0x30, 0x45, 0x02, 0x21];
        der.extend([0x11; 33]);
        der.extend([0x02, 0x20]);
        der.extend([0x22; 32]);
        assert_eq!(
            compact_signature_from_der(&der),
            Err(CodecError::LengthMismatch { expected: 128, actual: 130 })
        );
    }
}
