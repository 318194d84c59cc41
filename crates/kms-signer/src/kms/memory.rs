use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use futures::FutureExt;
use futures::future::BoxFuture;
use k256::ecdsa::{Signature, SigningKey, signature::Signer};
use k256::pkcs8::EncodePublicKey;
use sha2::{Digest, Sha256};

use super::{KeyManagementService, KmsError, KmsResult};

#[derive(Default)]
struct Keys {
    created: u64,
    by_id: HashMap<String, SigningKey>,
    aliases: HashMap<String, String>,
}

/// In-process stand-in for the KMS, used in mock testing mode and tests.
///
/// Keys are derived from `SHA-256(seed ‖ counter)`, so a given seed always
/// produces the same sequence of keys. Nothing survives a restart.
pub struct InMemoryKms {
    seed: String,
    keys: Mutex<Keys>,
}

impl InMemoryKms {
    pub fn new(seed: impl Into<String>) -> Self {
        tracing::warn!("in-memory key management service active, all keys are lost on restart");
        Self {
            seed: seed.into(),
            keys: Mutex::new(Keys::default()),
        }
    }

    fn lock(&self, operation: &'static str) -> KmsResult<MutexGuard<'_, Keys>> {
        self.keys.lock().map_err(|_| KmsError::Service {
            operation,
            message: "key table mutex was poisoned".to_string(),
        })
    }

    fn signing_key(&self, operation: &'static str, key_id: &str) -> KmsResult<SigningKey> {
        self.lock(operation)?
            .by_id
            .get(key_id)
            .cloned()
            .ok_or_else(|| KmsError::NotFound(key_id.to_string()))
    }

    fn derive_key(&self, counter: u64) -> KmsResult<(String, SigningKey)> {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.as_bytes());
        hasher.update(counter.to_be_bytes());
        let secret = hasher.finalize();

        let signing_key = SigningKey::from_bytes(&secret).map_err(|e| KmsError::Service {
            operation: "CreateKey",
            message: format!("derived secret is not a valid scalar: {e}"),
        })?;
        let key_id = hex::encode(&Sha256::digest(secret)[..16]);
        Ok((key_id, signing_key))
    }
}

impl KeyManagementService for InMemoryKms {
    fn create_key(&self) -> BoxFuture<'_, KmsResult<String>> {
        async move {
            let mut keys = self.lock("CreateKey")?;
            keys.created += 1;
            let (key_id, signing_key) = self.derive_key(keys.created)?;
            keys.by_id.insert(key_id.clone(), signing_key);
            tracing::debug!(%key_id, "created in-memory key");
            Ok(key_id)
        }
        .boxed()
    }

    fn get_public_key<'a>(&'a self, key_id: &'a str) -> BoxFuture<'a, KmsResult<Vec<u8>>> {
        async move {
            let signing_key = self.signing_key("GetPublicKey", key_id)?;
            let der = signing_key
                .verifying_key()
                .to_public_key_der()
                .map_err(|e| KmsError::Service {
                    operation: "GetPublicKey",
                    message: e.to_string(),
                })?;
            Ok(der.into_vec())
        }
        .boxed()
    }

    fn create_alias<'a>(&'a self, alias: &'a str, key_id: &'a str) -> BoxFuture<'a, KmsResult<()>> {
        async move {
            let mut keys = self.lock("CreateAlias")?;
            if !keys.by_id.contains_key(key_id) {
                return Err(KmsError::NotFound(key_id.to_string()));
            }
            if keys.aliases.contains_key(alias) {
                return Err(KmsError::Service {
                    operation: "CreateAlias",
                    message: format!("{alias} already exists"),
                });
            }
            keys.aliases.insert(alias.to_string(), key_id.to_string());
            Ok(())
        }
        .boxed()
    }

    fn resolve_alias<'a>(&'a self, alias: &'a str) -> BoxFuture<'a, KmsResult<String>> {
        async move {
            self.lock("DescribeKey")?
                .aliases
                .get(alias)
                .cloned()
                .ok_or_else(|| KmsError::NotFound(alias.to_string()))
        }
        .boxed()
    }

    fn sign<'a>(&'a self, key_id: &'a str, message: &'a [u8]) -> BoxFuture<'a, KmsResult<Vec<u8>>> {
        async move {
            let signing_key = self.signing_key("Sign", key_id)?;
            let signature: Signature = signing_key.sign(message);
            Ok(signature.to_der().as_bytes().to_vec())
        }
        .boxed()
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
