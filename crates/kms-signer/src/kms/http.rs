use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::{KEY_SPEC, KeyManagementService, KmsError, KmsResult, SIGNING_ALGORITHM};

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "TrentService";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateKeyRequest<'a> {
    description: &'a str,
    key_usage: &'a str,
    origin: &'a str,
    key_spec: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct KeyIdRequest<'a> {
    key_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateAliasRequest<'a> {
    alias_name: &'a str,
    target_key_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SignRequest<'a> {
    key_id: &'a str,
    message: String,
    message_type: &'a str,
    signing_algorithm: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KeyMetadataResponse {
    key_metadata: KeyMetadata,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KeyMetadata {
    key_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PublicKeyResponse {
    public_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignResponse {
    signature: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(rename = "__type", default)]
    kind: String,
    #[serde(alias = "Message", default)]
    message: String,
}

#[derive(Deserialize)]
struct Empty {}

/// Client for a KMS speaking the AWS JSON 1.1 protocol (`TrentService`).
///
/// Requests are not signed; point it at an emulator or an authenticating
/// proxy.
pub struct HttpKms {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpKms {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Regional AWS endpoint, e.g. `https://kms.eu-west-1.amazonaws.com`.
    pub fn for_region(region: &str) -> Self {
        Self::new(format!("https://kms.{region}.amazonaws.com"))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<B, R>(&self, operation: &'static str, body: &B) -> KmsResult<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{operation}"))
            .json(body)
            .send()
            .await
            .map_err(|e| KmsError::Transport(format!("{operation}: {e}")))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| KmsError::Transport(format!("{operation}: {e}")))?;

        if !status.is_success() {
            let error: ErrorResponse = serde_json::from_slice(&bytes).unwrap_or(ErrorResponse {
                kind: String::new(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
            tracing::error!(operation, %status, kind = %error.kind, "KMS call failed");
            if error.kind.ends_with("NotFoundException") {
                return Err(KmsError::NotFound(error.message));
            }
            return Err(KmsError::Service {
                operation,
                message: format!("{status} {} {}", error.kind, error.message),
            });
        }

        // Operations without output (CreateAlias) may answer with no body.
        let body: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
        serde_json::from_slice(body)
            .map_err(|e| KmsError::InvalidResponse(format!("{operation}: {e}")))
    }
}

fn decode_blob(operation: &str, blob: &str) -> KmsResult<Vec<u8>> {
    STANDARD
        .decode(blob)
        .map_err(|e| KmsError::InvalidResponse(format!("{operation}: invalid base64: {e}")))
}

impl KeyManagementService for HttpKms {
    fn create_key(&self) -> BoxFuture<'_, KmsResult<String>> {
        async move {
            let request = CreateKeyRequest {
                description: "SECP256K1 Key",
                key_usage: "SIGN_VERIFY",
                origin: "AWS_KMS",
                key_spec: KEY_SPEC,
            };
            let response: KeyMetadataResponse = self.call("CreateKey", &request).await?;
            Ok(response.key_metadata.key_id)
        }
        .boxed()
    }

    fn get_public_key<'a>(&'a self, key_id: &'a str) -> BoxFuture<'a, KmsResult<Vec<u8>>> {
        async move {
            let response: PublicKeyResponse =
                self.call("GetPublicKey", &KeyIdRequest { key_id }).await?;
            decode_blob("GetPublicKey", &response.public_key)
        }
        .boxed()
    }

    fn create_alias<'a>(&'a self, alias: &'a str, key_id: &'a str) -> BoxFuture<'a, KmsResult<()>> {
        async move {
            let request = CreateAliasRequest {
                alias_name: alias,
                target_key_id: key_id,
            };
            let _: Empty = self.call("CreateAlias", &request).await?;
            Ok(())
        }
        .boxed()
    }

    fn resolve_alias<'a>(&'a self, alias: &'a str) -> BoxFuture<'a, KmsResult<String>> {
        async move {
            let response: KeyMetadataResponse = self
                .call("DescribeKey", &KeyIdRequest { key_id: alias })
                .await?;
            Ok(response.key_metadata.key_id)
        }
        .boxed()
    }

    fn sign<'a>(&'a self, key_id: &'a str, message: &'a [u8]) -> BoxFuture<'a, KmsResult<Vec<u8>>> {
        async move {
            let request = SignRequest {
                key_id,
                message: STANDARD.encode(message),
                message_type: "RAW",
                signing_algorithm: SIGNING_ALGORITHM,
            };
            let response: SignResponse = self.call("Sign", &request).await?;
            decode_blob("Sign", &response.signature)
        }
        .boxed()
    }

    fn name(&self) -> &str {
        "aws-kms"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_use_pascal_case() {
        let request = SignRequest {
            key_id: "key",
            message: STANDARD.encode([1, 2, 3]),
            message_type: "RAW",
            signing_algorithm: SIGNING_ALGORITHM,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "KeyId": "key",
                "Message": "AQID",
                "MessageType": "RAW",
                "SigningAlgorithm": "ECDSA_SHA_256",
            })
        );
    }

    #[test]
    fn key_metadata_ignores_extra_fields() {
        let response: KeyMetadataResponse = serde_json::from_value(json!({
            "KeyMetadata": {"KeyId": "1234abcd", "KeySpec": "ECC_SECG_P256K1", "Enabled": true}
        }))
        .unwrap();
        assert_eq!(response.key_metadata.key_id, "1234abcd");
    }

    #[test]
    fn error_body_accepts_either_message_casing() {
        let upper: ErrorResponse = serde_json::from_value(json!({
            "__type": "NotFoundException", "Message": "Alias not found"
        }))
        .unwrap();
        let lower: ErrorResponse = serde_json::from_value(json!({
            "__type": "ValidationException", "message": "bad"
        }))
        .unwrap();
        assert_eq!(upper.message, "Alias not found");
        assert_eq!(lower.kind, "ValidationException");
        assert_eq!(lower.message, "bad");
    }

    #[test]
    fn regional_endpoint() {
        assert_eq!(
            HttpKms::for_region("eu-west-1").endpoint(),
            "https://kms.eu-west-1.amazonaws.com"
        );
    }
}
