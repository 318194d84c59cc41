use std::sync::Arc;

use serde_json::Value;

use crate::codec;
use crate::deploy;
use crate::error::SignerServerError;
use crate::kms::{KeyManagementService, alias_for};

/// Key generation and signing on top of a [`KeyManagementService`].
///
/// Keys are addressed by their Casper public key: every key created here is
/// aliased as `alias/<public key>` in the KMS.
#[derive(Clone)]
pub struct KeysService {
    kms: Arc<dyn KeyManagementService>,
}

impl KeysService {
    pub fn new(kms: Arc<dyn KeyManagementService>) -> Self {
        Self { kms }
    }

    pub fn backend(&self) -> &str {
        self.kms.name()
    }

    /// Create a key in the KMS and return its Casper public key hex.
    pub async fn generate_keypair(&self) -> Result<String, SignerServerError> {
        let key_id = self.kms.create_key().await?;
        tracing::debug!(%key_id, backend = self.backend(), "key created");

        let spki = self.kms.get_public_key(&key_id).await?;
        let point = codec::ec_point_from_der(&spki)?;
        let compressed = codec::compress_point(&point)?;
        let public_key = codec::casper_public_key_hex(&compressed);

        self.kms
            .create_alias(&alias_for(&public_key), &key_id)
            .await?;
        tracing::debug!(%public_key, "public key retrieved and aliased");

        Ok(public_key)
    }

    /// Sign a deploy hash with the key registered for `public_key`.
    pub async fn sign_deploy_hash(
        &self,
        deploy_hash: &str,
        public_key: &str,
    ) -> Result<String, SignerServerError> {
        deploy::validate_deploy_hash(deploy_hash)?;
        deploy::validate_public_key(public_key)?;
        tracing::debug!(%deploy_hash, %public_key, "signing deploy hash");

        let key_id = self.kms.resolve_alias(&alias_for(public_key)).await?;
        let message = hex::decode(deploy_hash)
            .map_err(|e| SignerServerError::BadRequest(format!("deploy hash: {e}")))?;

        let der = self.kms.sign(&key_id, &message).await?;
        let signature = codec::compact_signature_from_der(&der)?;
        tracing::debug!(%signature, "deploy hash signed");

        Ok(signature)
    }

    /// Sign a whole deploy and return it with the new approval added.
    pub async fn sign_deploy(
        &self,
        deploy: Value,
        public_key: &str,
    ) -> Result<Value, SignerServerError> {
        let deploy_hash = deploy::deploy_hash(&deploy)?.to_string();
        let signature = self.sign_deploy_hash(&deploy_hash, public_key).await?;
        Ok(deploy::add_signature(deploy, public_key, &signature)?)
    }
}
