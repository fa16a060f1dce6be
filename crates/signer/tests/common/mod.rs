#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use http_body_util::BodyExt;
use qz_signer::signing::Envelope;
use qz_signer::{AppState, KeyStore, RouterOptions, TrustPolicy, router};
use tempfile::TempDir;
use tower::ServiceExt;

pub const KEY: &str = include_str!("../fixtures/key.pem");
pub const CERT: &str = include_str!("../fixtures/cert.pem");
pub const ALLOWED_ORIGIN: &str = "http://localhost:5173";

/// A key store over a temp directory, optionally seeded with the fixture pair.
pub struct Harness {
    pub dir: TempDir,
    pub key_store: Arc<KeyStore>,
    pub app: Router,
}

impl Harness {
    pub fn with_files(key: Option<&str>, cert: Option<&str>) -> Self {
        Self::with_policy(key, cert, local_policy())
    }

    pub fn with_policy(key: Option<&str>, cert: Option<&str>, policy: TrustPolicy) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let certs = dir.path().join("certs");
        std::fs::create_dir_all(&certs).unwrap();
        if let Some(key) = key {
            std::fs::write(certs.join("key.pem"), key).unwrap();
        }
        if let Some(cert) = cert {
            std::fs::write(certs.join("cert.pem"), cert).unwrap();
        }

        let key_store = Arc::new(store_in(dir.path()));
        let app = router(
            AppState {
                key_store: key_store.clone(),
                policy: Arc::new(policy),
            },
            &RouterOptions::default(),
        );
        Self { dir, key_store, app }
    }

    pub fn complete() -> Self {
        Self::with_files(Some(KEY), Some(CERT))
    }

    pub async fn get_certificate(&self) -> (u16, Envelope) {
        let request = Request::builder()
            .uri("/api/qz-tray/certificate")
            .header(header::ORIGIN, ALLOWED_ORIGIN)
            .body(Body::empty())
            .unwrap();
        envelope(self.send(request).await).await
    }

    pub async fn sign(&self, body: &str) -> (u16, Envelope) {
        envelope(self.send(sign_request(ALLOWED_ORIGIN, body)).await).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }
}

pub fn store_in(dir: &Path) -> KeyStore {
    KeyStore::new(dir.join("certs/key.pem"), dir.join("certs/cert.pem"))
}

pub fn local_policy() -> TrustPolicy {
    TrustPolicy::builder().origin(ALLOWED_ORIGIN).build().unwrap()
}

pub fn sign_request(origin: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/qz-tray/sign")
        .header(header::ORIGIN, origin)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn envelope(response: Response<Body>) -> (u16, Envelope) {
    let status = response.status().as_u16();
    let body = body_text(response).await;
    (status, serde_json::from_str(&body).unwrap())
}
