//! Parameter checks and approval handling for Casper deploys.
//!
//! Deploys are kept as opaque JSON; only `hash` and `approvals` are read or
//! written.

use serde_json::{Value, json};

/// Largest serialized deploy accepted (1 MiB).
pub const MAX_DEPLOY_SIZE: usize = 1024 * 1024;

const DEPLOY_HASH_LEN: usize = 32;
const ED25519_TAG: u8 = 0x01;
const SECP256K1_TAG: u8 = crate::codec::SECP256K1_TAG;
const SIGNATURE_LEN: usize = 1 + 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeployError {
    #[error("deploy is not a JSON object")]
    NotAnObject,
    #[error("deploy has no hash")]
    MissingHash,
    #[error("invalid deploy hash: {0}")]
    InvalidDeployHash(String),
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("deploy approvals are not a list")]
    MalformedApprovals,
    #[error("deploy is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },
}

pub fn validate_deploy_hash(deploy_hash: &str) -> Result<(), DeployError> {
    let bytes = hex::decode(deploy_hash)
        .map_err(|e| DeployError::InvalidDeployHash(e.to_string()))?;
    if bytes.len() != DEPLOY_HASH_LEN {
        return Err(DeployError::InvalidDeployHash(format!(
            "expected {DEPLOY_HASH_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(())
}

/// Tagged Casper public key: `01` + 32 bytes (ed25519) or `02` + 33 bytes
/// (secp256k1).
pub fn validate_public_key(public_key: &str) -> Result<(), DeployError> {
    let bytes =
        hex::decode(public_key).map_err(|e| DeployError::InvalidPublicKey(e.to_string()))?;
    match bytes.split_first() {
        Some((&ED25519_TAG, key)) if key.len() == 32 => Ok(()),
        Some((&SECP256K1_TAG, key)) if key.len() == 33 && matches!(key[0], 0x02 | 0x03) => Ok(()),
        Some((tag, key)) => Err(DeployError::InvalidPublicKey(format!(
            "tag 0x{tag:02x} with {} key bytes",
            key.len()
        ))),
        None => Err(DeployError::InvalidPublicKey("empty".to_string())),
    }
}

pub fn validate_signature(signature: &str) -> Result<(), DeployError> {
    let bytes =
        hex::decode(signature).map_err(|e| DeployError::InvalidSignature(e.to_string()))?;
    if bytes.len() != SIGNATURE_LEN {
        return Err(DeployError::InvalidSignature(format!(
            "expected {SIGNATURE_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    if !matches!(bytes[0], ED25519_TAG | SECP256K1_TAG) {
        return Err(DeployError::InvalidSignature(format!(
            "unknown algorithm tag 0x{:02x}",
            bytes[0]
        )));
    }
    Ok(())
}

/// The deploy's `hash` field, validated.
pub fn deploy_hash(deploy: &Value) -> Result<&str, DeployError> {
    let hash = deploy
        .as_object()
        .ok_or(DeployError::NotAnObject)?
        .get("hash")
        .and_then(Value::as_str)
        .ok_or(DeployError::MissingHash)?;
    validate_deploy_hash(hash)?;
    Ok(hash)
}

/// Append `{signer, signature}` to the deploy's approvals.
///
/// An identical approval already present is not duplicated.
pub fn add_signature(
    mut deploy: Value,
    public_key: &str,
    signature: &str,
) -> Result<Value, DeployError> {
    deploy_hash(&deploy)?;
    validate_public_key(public_key)?;
    validate_signature(signature)?;

    let approval = json!({ "signer": public_key, "signature": signature });
    let object = deploy.as_object_mut().ok_or(DeployError::NotAnObject)?;
    let approvals = object
        .entry("approvals")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or(DeployError::MalformedApprovals)?;
    if !approvals.contains(&approval) {
        approvals.push(approval);
    }

    check_size(&deploy)?;
    Ok(deploy)
}

pub fn check_size(deploy: &Value) -> Result<(), DeployError> {
    let size = deploy.to_string().len();
    if size > MAX_DEPLOY_SIZE {
        return Err(DeployError::TooLarge {
            size,
            max: MAX_DEPLOY_SIZE,
        });
    }
    Ok(())
}
