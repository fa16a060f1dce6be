mod common;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use sha1::Sha1;

use common::{CERT, Harness};
use qz_signer::signing::CertificateInfo;

fn verify_against_certificate(certificate: &str, payload: &str, signature_b64: &str) {
    let public_key = CertificateInfo::from_pem(certificate)
        .unwrap()
        .public_key
        .expect("fixture certificate carries an RSA key");
    let signature_bytes = STANDARD.decode(signature_b64).unwrap();
    let signature = Signature::try_from(signature_bytes.as_slice()).unwrap();
    VerifyingKey::<Sha1>::new(public_key)
        .verify(payload.as_bytes(), &signature)
        .unwrap();
}

#[tokio::test]
async fn end_to_end_certificate_and_signature() {
    let harness = Harness::complete();

    let (status, envelope) = harness.get_certificate().await;
    assert_eq!(status, 200);
    assert!(envelope.success);
    let certificate = envelope.certificate.unwrap();
    assert_eq!(certificate, CERT);

    let (status, envelope) = harness.sign(r#"{"data":"hello"}"#).await;
    assert_eq!(status, 200);
    assert!(envelope.success);
    verify_against_certificate(&certificate, "hello", &envelope.signature.unwrap());

    let (status, envelope) = harness.sign("{}").await;
    assert_eq!(status, 422);
    assert!(!envelope.success);
}

#[tokio::test]
async fn signature_matches_openssl_for_hello() {
    let harness = Harness::complete();
    let (_, envelope) = harness.sign(r#"{"data":"hello"}"#).await;
    let expected = include_str!("fixtures/hello.sha1.b64").trim();
    assert_eq!(envelope.signature.as_deref(), Some(expected));
}

#[tokio::test]
async fn agent_style_payloads_verify() {
    let harness = Harness::complete();
    let long = "0123456789abcdef".repeat(4096);
    let payloads: [&str; 4] = [
        "a",
        "{\"call\":\"printers.find\",\"params\":{},\"timestamp\":1700000000000,\"uid\":\"x1y2z3\"}",
        "multi\nline\tpayload with unicode: ünïcødé ✓",
        long.as_str(),
    ];

    for payload in payloads {
        let body = serde_json::json!({ "data": payload }).to_string();
        let (status, envelope) = harness.sign(&body).await;
        assert_eq!(status, 200, "payload of {} bytes", payload.len());
        verify_against_certificate(CERT, payload, &envelope.signature.unwrap());
    }
}

#[tokio::test]
async fn repeated_signing_is_deterministic() {
    let harness = Harness::complete();
    let (_, first) = harness.sign(r#"{"data":"same payload"}"#).await;
    let (_, second) = harness.sign(r#"{"data":"same payload"}"#).await;
    assert!(first.signature.is_some());
    assert_eq!(first.signature, second.signature);

    let (_, other) = harness.sign(r#"{"data":"other payload"}"#).await;
    assert_ne!(first.signature, other.signature);
}

#[tokio::test]
async fn certificate_is_stable_for_process_lifetime() {
    let harness = Harness::complete();
    let (_, first) = harness.get_certificate().await;

    std::fs::write(harness.dir.path().join("certs/cert.pem"), "rotated").unwrap();
    let (_, second) = harness.get_certificate().await;

    assert_eq!(first.certificate, second.certificate);
    assert_eq!(first.certificate.as_deref(), Some(CERT));
}

#[tokio::test]
async fn concurrent_first_requests_return_the_same_signature() {
    let harness = Harness::complete();
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let app = harness.app.clone();
        tasks.push(tokio::spawn(async move {
            use tower::ServiceExt;
            let response = app
                .oneshot(common::sign_request(common::ALLOWED_ORIGIN, r#"{"data":"race"}"#))
                .await
                .unwrap();
            common::envelope(response).await
        }));
    }

    let mut signatures = Vec::new();
    for task in tasks {
        let (status, envelope) = task.await.unwrap();
        assert_eq!(status, 200);
        signatures.push(envelope.signature.unwrap());
    }
    signatures.dedup();
    assert_eq!(signatures.len(), 1);
}
