//! HTTP GET abstraction used by the feature query pipeline.
//!
//! Native builds fetch through `reqwest`; wasm builds go through the browser
//! `fetch` via `gloo-net`. Both hand back the raw status and body so the
//! pipeline owns the status policy.

use std::fmt;

use futures_util::future::LocalBoxFuture;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request never produced a response (DNS, refused, CORS, timeout).
    Transport(String),
    /// A response arrived but its body could not be read.
    Body(String),
    Client(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "request failed: {msg}"),
            FetchError::Body(msg) => write!(f, "failed to read response: {msg}"),
            FetchError::Client(msg) => write!(f, "http client unavailable: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Single-threaded HTTP GET.
///
/// The returned future owns everything it needs so it can be spawned on the
/// UI event loop.
pub trait Fetch {
    fn get(&self, url: &str) -> LocalBoxFuture<'static, Result<FetchResponse, FetchError>>;
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::HttpFetcher;

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserFetcher;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::time::Duration;

    use futures_util::FutureExt as _;
    use futures_util::future::LocalBoxFuture;

    use super::{Fetch, FetchError, FetchResponse};

    #[derive(Debug, Clone, Default)]
    pub struct HttpFetcher {
        client: reqwest::Client,
    }

    impl HttpFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fetcher whose requests fail with `Transport` after `timeout`.
        pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| FetchError::Client(e.to_string()))?;
            Ok(Self { client })
        }
    }

    impl Fetch for HttpFetcher {
        fn get(&self, url: &str) -> LocalBoxFuture<'static, Result<FetchResponse, FetchError>> {
            let client = self.client.clone();
            let url = url.to_string();
            async move {
                let resp = client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| FetchError::Transport(e.to_string()))?;
                let status = resp.status().as_u16();
                let body = resp
                    .text()
                    .await
                    .map_err(|e| FetchError::Body(e.to_string()))?;
                Ok(FetchResponse { status, body })
            }
            .boxed_local()
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use futures_util::FutureExt as _;
    use futures_util::future::LocalBoxFuture;
    use gloo_net::http::Request;

    use super::{Fetch, FetchError, FetchResponse};

    /// `window.fetch` through gloo-net. No timeout: the browser's own applies.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct BrowserFetcher;

    impl Fetch for BrowserFetcher {
        fn get(&self, url: &str) -> LocalBoxFuture<'static, Result<FetchResponse, FetchError>> {
            let url = url.to_string();
            async move {
                let resp = Request::get(&url)
                    .send()
                    .await
                    .map_err(|e| FetchError::Transport(e.to_string()))?;
                let status = resp.status();
                let body = resp
                    .text()
                    .await
                    .map_err(|e| FetchError::Body(e.to_string()))?;
                Ok(FetchResponse { status, body })
            }
            .boxed_local()
        }
    }
}
