//! Authenticated HTTP access to the upstream feeds.
//!
//! Every call makes exactly one request. Non-2xx statuses, timeouts and
//! connection errors all come back as [`FetchError`]; recovery is left to
//! the credential rotator.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Url};
use serde::Serialize;
use tracing::debug;

use crate::error::FetchError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Issues a `GET` and returns the body of a successful response.
#[tracing::instrument(skip(client), fields(url = %url))]
pub async fn fetch_bytes<C: HttpClient>(
    client: &C,
    url: &Url,
    timeout: Duration,
) -> Result<Bytes, FetchError> {
    let mut req = Request::new(Method::GET, url.clone());
    *req.timeout_mut() = Some(timeout);
    send(client, req).await
}

/// Issues a `POST` with a JSON body and returns the raw response body.
#[tracing::instrument(skip(client, body), fields(url = %url))]
pub async fn post_json<C: HttpClient, B: Serialize + ?Sized>(
    client: &C,
    url: &Url,
    body: &B,
    timeout: Duration,
) -> Result<Bytes, FetchError> {
    let payload = serde_json::to_vec(body).map_err(|_| FetchError::InvalidBody {
        url: url.to_string(),
    })?;

    let mut req = Request::new(Method::POST, url.clone());
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(payload.into());
    *req.timeout_mut() = Some(timeout);
    send(client, req).await
}

async fn send<C: HttpClient>(client: &C, req: Request) -> Result<Bytes, FetchError> {
    let url = req.url().to_string();

    let resp = client
        .execute(req)
        .await
        .map_err(|e| classify(e, &url))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url,
        });
    }

    let bytes = resp.bytes().await.map_err(|e| classify(e, &url))?;
    debug!(bytes = bytes.len(), "Upstream response received");
    Ok(bytes)
}

fn classify(err: reqwest::Error, url: &str) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Request(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        status: u16,
        seen: Mutex<Vec<(Method, Option<Duration>, Option<String>)>>,
    }

    impl Recorder {
        fn new(status: u16) -> Self {
            Self {
                status,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for Recorder {
        async fn execute(&self, req: Request) -> reqwest::Result<reqwest::Response> {
            let content_type = req
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            self.seen
                .lock()
                .unwrap()
                .push((req.method().clone(), req.timeout().copied(), content_type));
            let resp = http::Response::builder()
                .status(self.status)
                .body("payload")
                .unwrap();
            Ok(resp.into())
        }
    }

    fn url() -> Url {
        Url::parse("https://example.test/feed").unwrap()
    }

    #[tokio::test]
    async fn test_fetch_bytes_returns_body_and_sets_timeout() {
        let client = Recorder::new(200);
        let body = fetch_bytes(&client, &url(), DEFAULT_TIMEOUT).await.unwrap();

        assert_eq!(&body[..], b"payload");
        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].0, Method::GET);
        assert_eq!(seen[0].1, Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let client = Recorder::new(503);
        let err = fetch_bytes(&client, &url(), DEFAULT_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_post_json_sets_content_type() {
        let client = Recorder::new(200);
        post_json(&client, &url(), &serde_json::json!({"query": "1192"}), DEFAULT_TIMEOUT)
            .await
            .unwrap();

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].0, Method::POST);
        assert_eq!(seen[0].2.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_silent_upstream_is_a_timeout() {
        // Connections land in the backlog but nothing ever answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = Url::parse(&format!("http://{addr}/feed")).unwrap();

        let client = BasicClient::new().unwrap();
        let err = fetch_bytes(&client, &url, Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout { .. }), "{err:?}");
        drop(listener);
    }

    #[tokio::test]
    async fn test_refused_connection_is_a_request_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = Url::parse(&format!("http://{addr}/feed")).unwrap();

        let client = BasicClient::new().unwrap();
        let err = fetch_bytes(&client, &url, DEFAULT_TIMEOUT)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Request(_)), "{err:?}");
    }
}
