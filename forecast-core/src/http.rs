//! Minimal HTTP GET primitive: build a URL from a base and query items, issue
//! the request, and classify the outcome.

use std::collections::HashMap;

use reqwest::{Client, StatusCode, header::HeaderMap};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::dispatch::CompletionQueue;

/// Status line and headers of a response, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseMeta {
    fn of(res: &reqwest::Response) -> Self {
        Self {
            status: res.status(),
            headers: res.headers().clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    /// The base URL and query items do not form a valid URL. No request was sent.
    #[error("Malformed request URL: {0}")]
    MalformedRequest(#[source] url::ParseError),

    /// DNS, connection, TLS or timeout failure before a response arrived.
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered with a status outside `200..=299`.
    #[error("Request failed with status {}", .0.status)]
    Status(ResponseMeta),

    /// A response head arrived but no body could be read from it.
    #[error("Request returned no usable data (status {})", .meta.status)]
    Unknown {
        meta: ResponseMeta,
        #[source]
        source: reqwest::Error,
    },
}

impl HttpError {
    /// Status code of the response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status(meta) | HttpError::Unknown { meta, .. } => Some(meta.status),
            HttpError::MalformedRequest(_) | HttpError::Transport(_) => None,
        }
    }
}

/// Append `query` to `base`. Pairs are written in key order so the same
/// inputs always produce the same URL.
pub fn build_url(base: &str, query: &HashMap<String, String>) -> Result<Url, HttpError> {
    let mut url = Url::parse(base).map_err(HttpError::MalformedRequest)?;

    if !query.is_empty() {
        let mut pairs: Vec<_> = query.iter().collect();
        pairs.sort();
        url.query_pairs_mut().extend_pairs(pairs);
    }

    Ok(url)
}

#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    http: Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a single GET and return the body of a 2xx response.
    pub async fn request(
        &self,
        url: &str,
        query: &HashMap<String, String>,
    ) -> Result<Vec<u8>, HttpError> {
        let url = build_url(url, query)?;
        self.get(url).await
    }

    /// Callback form of [`HttpClient::request`], callable from any thread. The
    /// request runs on the queue's runtime and `completion` runs exactly once on
    /// whichever thread drives the queue's pump, unless that pump is dropped
    /// before the result arrives.
    pub fn request_with<F>(
        &self,
        url: &str,
        query: &HashMap<String, String>,
        queue: &CompletionQueue,
        completion: F,
    ) where
        F: FnOnce(Result<Vec<u8>, HttpError>) + Send + 'static,
    {
        let url = match build_url(url, query) {
            Ok(url) => url,
            Err(err) => {
                queue.post(move || completion(Err(err)));
                return;
            }
        };

        let this = self.clone();
        let posted = queue.clone();
        queue.spawn(async move {
            let result = this.get(url).await;
            posted.post(move || completion(result));
        });
    }

    // The path and query may carry credentials, so neither is logged or kept
    // in transport errors.
    async fn get(&self, url: Url) -> Result<Vec<u8>, HttpError> {
        debug!(host = url.host_str().unwrap_or_default(), "GET");

        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| HttpError::Transport(e.without_url()))?;

        let meta = ResponseMeta::of(&res);
        if !meta.status.is_success() {
            return Err(HttpError::Status(meta));
        }

        let body = res
            .bytes()
            .await
            .map_err(|e| HttpError::Unknown {
                meta,
                source: e.without_url(),
            })?;

        Ok(body.to_vec())
    }
}
