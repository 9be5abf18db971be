use std::future::Future;
use std::pin::Pin;

use crate::model::Heartbeat;

/// Raw result of one submission, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpResult {
    Completed { status: u16, body: String },
    /// No response reached us at all.
    Unreachable,
}

pub trait Transport: Send + Sync + 'static {
    type SendFuture: Future<Output = HttpResult> + Send + 'static;

    /// Starts one submission. The returned future owns everything it needs,
    /// so the caller can spawn it and move on.
    fn send(&self, heartbeat: &Heartbeat, api_key: &str) -> Self::SendFuture;
}

pub mod http {
    use super::*;
    use crate::config::Settings;
    use anyhow::{Context as _, Result};
    use reqwest::{Client, Url};

    #[derive(Clone)]
    pub struct HttpTransport {
        client: Client,
        endpoint: Url,
    }

    impl HttpTransport {
        pub fn new(settings: &Settings) -> Result<Self> {
            let endpoint = settings
                .ingestion_url()
                .context("failed to resolve heartbeat endpoint")?;

            let client = Client::builder()
                .timeout(settings.request_timeout)
                .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                .build()
                .context("failed to create http client")?;

            Ok(Self { client, endpoint })
        }

        pub fn endpoint(&self) -> &Url {
            &self.endpoint
        }
    }

    impl Transport for HttpTransport {
        type SendFuture = Pin<Box<dyn Future<Output = HttpResult> + Send + 'static>>;

        fn send(&self, heartbeat: &Heartbeat, api_key: &str) -> Self::SendFuture {
            let request = self
                .client
                .post(self.endpoint.clone())
                .query(&[("api_key", api_key)])
                .json(heartbeat);

            Box::pin(async move {
                let response = match request.send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::debug!("heartbeat request failed: {}", e);
                        return HttpResult::Unreachable;
                    }
                };

                let status = response.status().as_u16();

                match response.text().await {
                    Ok(body) => HttpResult::Completed { status, body },
                    Err(e) => {
                        tracing::debug!(status, "failed to read heartbeat response: {}", e);
                        HttpResult::Unreachable
                    }
                }
            })
        }
    }
}
