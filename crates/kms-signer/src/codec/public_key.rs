use k256::PublicKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::pkcs8::der::Document;
use k256::pkcs8::der::pem::PemLabel;
use k256::pkcs8::{SubjectPublicKeyInfoRef, spki};

use super::{CodecError, SCALAR_LEN, SECP256K1_TAG, decode_base64};

const COMPRESSED_LEN: usize = 1 + SCALAR_LEN;
const UNCOMPRESSED_LEN: usize = 1 + 2 * SCALAR_LEN;

/// Raw EC point (`04 ‖ x ‖ y`) from a PEM armored, or bare base64,
/// SubjectPublicKeyInfo.
pub fn ec_point_from_pem(pem: &str) -> Result<Vec<u8>, CodecError> {
    let pem = pem.trim();
    if pem.is_empty() {
        return Err(CodecError::MalformedInput("empty PEM body".to_string()));
    }
    if !pem.starts_with("-----BEGIN") {
        return ec_point_from_der(&decode_base64(pem)?);
    }

    let (label, document) = Document::from_pem(pem)
        .map_err(|e| CodecError::MalformedInput(format!("PEM: {e}")))?;
    SubjectPublicKeyInfoRef::validate_pem_label(label)
        .map_err(|_| CodecError::MalformedInput(format!("unexpected PEM label {label}")))?;
    ec_point_from_der(document.as_bytes())
}

/// Lowercase hex of [`ec_point_from_pem`].
pub fn public_key_hex_from_pem(pem: &str) -> Result<String, CodecError> {
    ec_point_from_pem(pem).map(hex::encode)
}

/// Uncompressed EC point from a DER SubjectPublicKeyInfo. The algorithm must
/// be id-ecPublicKey over secp256k1 and the point must lie on the curve.
pub fn ec_point_from_der(der: &[u8]) -> Result<Vec<u8>, CodecError> {
    let info = SubjectPublicKeyInfoRef::try_from(der)
        .map_err(|e| CodecError::MalformedInput(format!("SubjectPublicKeyInfo: {e}")))?;
    let key = PublicKey::try_from(info).map_err(invalid_key)?;
    Ok(key.to_encoded_point(false).as_bytes().to_vec())
}

fn invalid_key(error: spki::Error) -> CodecError {
    match error {
        spki::Error::OidUnknown { oid } => {
            CodecError::InvalidPublicKeyFormat(format!("{oid} is not id-ecPublicKey over secp256k1"))
        }
        other => CodecError::InvalidPublicKeyFormat(other.to_string()),
    }
}

/// Compress a secp256k1 point to `02|03 ‖ x`. Already compressed points are
/// returned unchanged.
pub fn compress_point(point: &[u8]) -> Result<[u8; COMPRESSED_LEN], CodecError> {
    match point {
        [] => Err(CodecError::EmptyInput),
        [0x02 | 0x03, ..] if point.len() == COMPRESSED_LEN => {
            let mut compressed = [0u8; COMPRESSED_LEN];
            compressed.copy_from_slice(point);
            Ok(compressed)
        }
        [0x04, coordinates @ ..] if point.len() == UNCOMPRESSED_LEN => {
            let (x, y) = coordinates.split_at(SCALAR_LEN);
            let mut compressed = [0u8; COMPRESSED_LEN];
            compressed[0] = if y[SCALAR_LEN - 1] & 1 == 0 { 0x02 } else { 0x03 };
            compressed[1..].copy_from_slice(x);
            Ok(compressed)
        }
        _ => Err(CodecError::InvalidPublicKeyFormat(format!(
            "{} bytes with prefix 0x{:02x}",
            point.len(),
            point[0]
        ))),
    }
}

/// Casper account key: secp256k1 tag followed by the compressed point.
pub fn casper_public_key_hex(compressed: &[u8; COMPRESSED_LEN]) -> String {
    let mut tagged = Vec::with_capacity(1 + COMPRESSED_LEN);
    tagged.push(SECP256K1_TAG);
    tagged.extend_from_slice(compressed);
    hex::encode(tagged)
}
