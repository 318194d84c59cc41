use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use k256::ecdsa::{Signature, SigningKey, signature::Signer, signature::Verifier};
use k256::pkcs8::EncodePublicKey;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use casper_kms_signer::kms::{KmsError, SIGNING_ALGORITHM};
use casper_kms_signer::{HttpKms, KeyManagementService, codec};

const KEY_ID: &str = "1234abcd-12ab-34cd-56ef-1234567890ab";

fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&Sha256::digest(b"http-kms")).unwrap()
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, body.to_string()).into_response()
}

/// Answers the subset of the TrentService API the signer uses.
async fn trent(headers: HeaderMap, body: Bytes) -> Response {
    assert_eq!(headers[header::CONTENT_TYPE], "application/x-amz-json-1.1");
    let target = headers["x-amz-target"].to_str().unwrap().to_string();
    let request: Value = serde_json::from_slice(&body).unwrap();

    match target.as_str() {
        "TrentService.CreateKey" => {
            assert_eq!(request["KeySpec"], "ECC_SECG_P256K1");
            assert_eq!(request["KeyUsage"], "SIGN_VERIFY");
            reply(StatusCode::OK, json!({ "KeyMetadata": { "KeyId": KEY_ID } }))
        }
        "TrentService.GetPublicKey" => {
            let spki = signing_key().verifying_key().to_public_key_der().unwrap();
            reply(
                StatusCode::OK,
                json!({ "KeyId": KEY_ID, "PublicKey": STANDARD.encode(spki.as_bytes()) }),
            )
        }
        "TrentService.CreateAlias" => (StatusCode::OK, "").into_response(),
        "TrentService.DescribeKey" if request["KeyId"] == "alias/missing" => reply(
            StatusCode::BAD_REQUEST,
            json!({
                "__type": "com.amazonaws.kms#NotFoundException",
                "message": "Alias alias/missing is not found.",
            }),
        ),
        "TrentService.DescribeKey" => {
            reply(StatusCode::OK, json!({ "KeyMetadata": { "KeyId": KEY_ID } }))
        }
        "TrentService.Sign" if request["KeyId"] == "disabled" => reply(
            StatusCode::BAD_REQUEST,
            json!({ "__type": "KMSInvalidStateException", "message": "key is disabled" }),
        ),
        "TrentService.Sign" => {
            assert_eq!(request["MessageType"], "RAW");
            assert_eq!(request["SigningAlgorithm"], SIGNING_ALGORITHM);
            let message = STANDARD.decode(request["Message"].as_str().unwrap()).unwrap();
            let signature: Signature = signing_key().sign(&message);
            reply(
                StatusCode::OK,
                json!({ "KeyId": KEY_ID, "Signature": STANDARD.encode(signature.to_der().as_bytes()) }),
            )
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "no JSON here").into_response(),
    }
}

async fn spawn_kms() -> HttpKms {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let app = Router::new().route("/", post(trent));
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    HttpKms::new(format!("http://{address}/"))
}

#[tokio::test]
async fn create_key_returns_key_id() {
    let kms = spawn_kms().await;
    assert_eq!(kms.create_key().await.unwrap(), KEY_ID);
}

#[tokio::test]
async fn public_key_blob_is_decoded() {
    let kms = spawn_kms().await;
    let spki = kms.get_public_key(KEY_ID).await.unwrap();
    let point = codec::ec_point_from_der(&spki).unwrap();
    assert_eq!(
        point.as_slice(),
        signing_key().verifying_key().to_encoded_point(false).as_bytes()
    );
}

#[tokio::test]
async fn create_alias_accepts_empty_body() {
    let kms = spawn_kms().await;
    kms.create_alias("alias/020203", KEY_ID).await.unwrap();
}

#[tokio::test]
async fn resolve_alias_returns_target() {
    let kms = spawn_kms().await;
    assert_eq!(kms.resolve_alias("alias/020203").await.unwrap(), KEY_ID);
}

#[tokio::test]
async fn not_found_exception_maps_to_not_found() {
    let kms = spawn_kms().await;
    let error = kms.resolve_alias("alias/missing").await.unwrap_err();
    assert!(matches!(error, KmsError::NotFound(message) if message.contains("alias/missing")));
}

#[tokio::test]
async fn signature_blob_is_decoded_and_verifies() {
    let kms = spawn_kms().await;
    let message = [0x5au8; 32];
    let der = kms.sign(KEY_ID, &message).await.unwrap();

    let signature = Signature::from_der(&der).unwrap();
    signing_key()
        .verifying_key()
        .verify(&message, &signature)
        .unwrap();
}

#[tokio::test]
async fn other_service_errors_keep_operation_and_type() {
    let kms = spawn_kms().await;
    let error = kms.sign("disabled", b"message").await.unwrap_err();
    match error {
        KmsError::Service { operation, message } => {
            assert_eq!(operation, "Sign");
            assert!(message.contains("KMSInvalidStateException"));
            assert!(message.contains("key is disabled"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let kms = HttpKms::new(format!("http://{address}/"));
    assert!(matches!(kms.create_key().await, Err(KmsError::Transport(_))));
}
