use super::client::HttpClient;
use async_trait::async_trait;

/// Plain `reqwest` transport. Authentication is layered on top with
/// [`ApiKey`](super::auth::ApiKey).
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dublin_bus_rtpi/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
