use anyhow::{Context, Result};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::Value;

use crate::deploy;
use crate::error::SignerServerError;
use crate::keys::KeysService;

/// Request bodies carrying a deploy are capped at 2 MiB.
pub const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Which of the non-production modes the service runs in.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceMode {
    pub dev_mode: bool,
    pub mock_testing_mode: bool,
}

impl ServiceMode {
    pub fn greeting(&self) -> String {
        let message = if self.dev_mode {
            "KMS DEV_MODE"
        } else if self.mock_testing_mode {
            "KMS MOCK_TESTING_MODE"
        } else {
            "KMS"
        };
        format!("Hello {message}!")
    }
}

#[derive(Clone)]
pub struct AppState {
    pub keys: KeysService,
    pub mode: ServiceMode,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello_handler))
        .route("/healthcheck", get(|| async move { (StatusCode::OK, "Ok").into_response() }))
        .route("/generateKeypair", post(generate_keypair_handler))
        .route("/signDeployHash", get(sign_deploy_hash_handler))
        .route("/signDeploy", post(sign_deploy_handler))
        .route("/addSignature", post(add_signature_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

pub async fn run(host: String, port: u16, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("binding {host}:{port}"))?;
    serve(listener, state).await
}

/// Serve the API on an already bound listener.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> Result<()> {
    tracing::info!(address = %listener.local_addr()?, backend = state.keys.backend(), "listening");

    axum::serve(listener, router(state))
        .await
        .context("serving HTTP")?;

    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct SignDeployHashQuery {
    pub deploy_hash: String,
    pub public_key: String,
}

#[derive(Debug, Deserialize)]
pub struct PublicKeyQuery {
    pub public_key: String,
}

#[derive(Debug, Deserialize)]
pub struct AddSignatureQuery {
    pub public_key: String,
    pub signature: String,
}

/// `{"deploy": ...}` where the deploy is an object or a string of JSON.
#[derive(Debug, Deserialize)]
pub struct DeployBody {
    pub deploy: Option<Value>,
}

impl DeployBody {
    fn into_deploy(self) -> Result<Value, SignerServerError> {
        match self.deploy {
            None | Some(Value::Null) => Err(SignerServerError::BadRequest("empty deploy".to_string())),
            Some(Value::String(raw)) => serde_json::from_str(&raw)
                .map_err(|e| SignerServerError::BadRequest(format!("deploy is not valid JSON: {e}"))),
            Some(deploy) => Ok(deploy),
        }
    }
}

async fn hello_handler(State(state): State<AppState>) -> String {
    state.mode.greeting()
}

async fn generate_keypair_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, SignerServerError> {
    let public_key = state.keys.generate_keypair().await?;
    Ok((StatusCode::CREATED, public_key))
}

async fn sign_deploy_hash_handler(
    State(state): State<AppState>,
    Query(params): Query<SignDeployHashQuery>,
) -> Result<String, SignerServerError> {
    state
        .keys
        .sign_deploy_hash(&params.deploy_hash, &params.public_key)
        .await
}

async fn sign_deploy_handler(
    State(state): State<AppState>,
    Query(params): Query<PublicKeyQuery>,
    Json(body): Json<DeployBody>,
) -> Result<impl IntoResponse, SignerServerError> {
    let deploy = body.into_deploy()?;
    let signed = state.keys.sign_deploy(deploy, &params.public_key).await?;
    Ok((StatusCode::CREATED, Json(signed)))
}

async fn add_signature_handler(
    Query(params): Query<AddSignatureQuery>,
    Json(body): Json<DeployBody>,
) -> Result<impl IntoResponse, SignerServerError> {
    let deploy = body.into_deploy()?;
    tracing::debug!(public_key = %params.public_key, "adding signature to deploy");
    let signed = deploy::add_signature(deploy, &params.public_key, &params.signature)?;
    Ok((StatusCode::CREATED, Json(signed)))
}
