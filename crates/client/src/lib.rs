use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to signer failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("signer answered {status}: {message}")]
    Rejected { status: StatusCode, message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Thin client for the signer's HTTP API.
#[derive(Debug, Clone)]
pub struct SignerClient {
    http: Client,
    base_url: String,
}

impl SignerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    pub async fn hello(&self) -> ClientResult<String> {
        text(self.http.get(self.url(""))).await
    }

    /// Create a key in the signer's KMS and return its Casper public key.
    pub async fn generate_keypair(&self) -> ClientResult<String> {
        text(self.http.post(self.url("generateKeypair"))).await
    }

    pub async fn sign_deploy_hash(&self, deploy_hash: &str, public_key: &str) -> ClientResult<String> {
        let request = self
            .http
            .get(self.url("signDeployHash"))
            .query(&[("deploy_hash", deploy_hash), ("public_key", public_key)]);
        text(request).await
    }

    pub async fn sign_deploy(&self, deploy: &Value, public_key: &str) -> ClientResult<Value> {
        let request = self
            .http
            .post(self.url("signDeploy"))
            .query(&[("public_key", public_key)])
            .json(&json!({ "deploy": deploy }));
        deploy_json(request).await
    }

    pub async fn add_signature(
        &self,
        deploy: &Value,
        public_key: &str,
        signature: &str,
    ) -> ClientResult<Value> {
        let request = self
            .http
            .post(self.url("addSignature"))
            .query(&[("public_key", public_key), ("signature", signature)])
            .json(&json!({ "deploy": deploy }));
        deploy_json(request).await
    }
}

async fn checked(request: RequestBuilder) -> ClientResult<reqwest::Response> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ClientError::Rejected { status, message });
    }
    Ok(response)
}

async fn text(request: RequestBuilder) -> ClientResult<String> {
    Ok(checked(request).await?.text().await?)
}

async fn deploy_json(request: RequestBuilder) -> ClientResult<Value> {
    Ok(checked(request).await?.json().await?)
}
