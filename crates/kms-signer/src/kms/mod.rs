mod http;
mod memory;

pub use http::HttpKms;
pub use memory::InMemoryKms;

use futures::future::BoxFuture;

/// Key spec requested for every key the service creates.
pub const KEY_SPEC: &str = "ECC_SECG_P256K1";
/// Signing algorithm used for deploy hashes.
pub const SIGNING_ALGORITHM: &str = "ECDSA_SHA_256";

#[derive(Debug, thiserror::Error)]
pub enum KmsError {
    #[error("key not found: {0}")]
    NotFound(String),
    #[error("key management service rejected {operation}: {message}")]
    Service { operation: &'static str, message: String },
    #[error("key management service unreachable: {0}")]
    Transport(String),
    #[error("unexpected key management service response: {0}")]
    InvalidResponse(String),
}

pub type KmsResult<T> = Result<T, KmsError>;

/// A remote key store that creates secp256k1 keys and signs with them
/// without ever releasing the private key.
///
/// Methods return boxed futures so the service can hold any backend behind
/// an `Arc<dyn KeyManagementService>`.
pub trait KeyManagementService: Send + Sync {
    /// Create a new secp256k1 signing key and return its id.
    fn create_key(&self) -> BoxFuture<'_, KmsResult<String>>;

    /// DER SubjectPublicKeyInfo of `key_id`.
    fn get_public_key<'a>(&'a self, key_id: &'a str) -> BoxFuture<'a, KmsResult<Vec<u8>>>;

    /// Point `alias` (e.g. `alias/<public key>`) at `key_id`.
    fn create_alias<'a>(&'a self, alias: &'a str, key_id: &'a str) -> BoxFuture<'a, KmsResult<()>>;

    /// Key id behind `alias`.
    fn resolve_alias<'a>(&'a self, alias: &'a str) -> BoxFuture<'a, KmsResult<String>>;

    /// ECDSA-SHA256 over the raw `message`, DER encoded.
    fn sign<'a>(&'a self, key_id: &'a str, message: &'a [u8]) -> BoxFuture<'a, KmsResult<Vec<u8>>>;

    /// Backend name for logs (e.g. "aws-kms").
    fn name(&self) -> &str;
}

/// Alias under which a key is registered, derived from its Casper public key.
pub fn alias_for(public_key: &str) -> String {
    format!("alias/{public_key}")
}
