use std::{collections::HashMap, fmt};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    http::{HttpClient, HttpError},
    model::{Forecast, decode_forecast},
    provider::ForecastProvider,
};

pub const DEFAULT_BASE_URL: &str = "https://api.darksky.net";

/// Sections of the response the model never reads.
const EXCLUDED_BLOCKS: &str = "minutely,flags";

/// Longest body excerpt rendered into an error message.
const MAX_BODY_EXCERPT: usize = 2000;

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error(
        "Forecast client is not configured: {0}.\n\
         Hint: run `forecast configure` or pass --secret-key."
    )]
    Configuration(String),

    #[error(transparent)]
    Http(#[from] HttpError),

    /// The body arrived but does not match the forecast schema. Carries the
    /// raw body so a changed provider schema can be told apart from garbage.
    #[error(
        "The request returned data in an unexpected format: {source}\n{}",
        render_body(.body)
    )]
    UnexpectedResult {
        body: Vec<u8>,
        #[source]
        source: serde_json::Error,
    },
}

/// Best-effort human-readable rendering of a body that failed to decode.
fn render_body(body: &[u8]) -> String {
    let text = match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(json) => serde_json::to_string_pretty(&json).unwrap_or_default(),
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    };

    truncate(text)
}

fn truncate(mut text: String) -> String {
    if text.len() > MAX_BODY_EXCERPT {
        let mut end = MAX_BODY_EXCERPT;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.push_str("...");
    }
    text
}

/// Stands in for the secret key wherever a request is shown.
const REDACTED: &str = "***";

/// Client for a DarkSky-compatible forecast endpoint.
#[derive(Clone)]
pub struct ForecastClient {
    http: HttpClient,
    secret_key: String,
    base_url: String,
}

impl ForecastClient {
    pub fn new(secret_key: impl Into<String>) -> Result<Self, ForecastError> {
        let secret_key = secret_key.into();
        if secret_key.trim().is_empty() {
            return Err(ForecastError::Configuration("secret key is empty".into()));
        }
        // The key is a single path segment.
        if !secret_key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
            || secret_key == "."
            || secret_key == ".."
        {
            return Err(ForecastError::Configuration(
                "secret key may only contain letters, digits, '-', '_', '.' and '~'".into(),
            ));
        }

        Ok(Self {
            http: HttpClient::new(),
            secret_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at another host, e.g. a compatible mirror.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `<base>/forecast/<key>/<lat>,<lon>`
    pub fn forecast_url(&self, coordinate: &Coordinate) -> String {
        self.url_with_key(&self.secret_key, coordinate)
    }

    fn url_with_key(&self, key: &str, coordinate: &Coordinate) -> String {
        format!(
            "{}/forecast/{}/{},{}",
            self.base_url, key, coordinate.latitude, coordinate.longitude
        )
    }

    fn default_query() -> HashMap<String, String> {
        HashMap::from([("exclude".to_string(), EXCLUDED_BLOCKS.to_string())])
    }

    pub async fn request_forecast(&self, coordinate: &Coordinate) -> Result<Forecast, ForecastError> {
        debug!(url = %self.url_with_key(REDACTED, coordinate), "Requesting forecast");

        let body = self
            .http
            .request(&self.forecast_url(coordinate), &Self::default_query())
            .await?;

        decode_forecast(&body).map_err(|source| {
            warn!(error = %source, bytes = body.len(), "Forecast body did not decode");
            ForecastError::UnexpectedResult { body, source }
        })
    }
}

impl fmt::Debug for ForecastClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForecastClient")
            .field("http", &self.http)
            .field("secret_key", &REDACTED)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl ForecastProvider for ForecastClient {
    async fn request_forecast(&self, coordinate: &Coordinate) -> Result<Forecast, ForecastError> {
        ForecastClient::request_forecast(self, coordinate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_key_is_a_configuration_error() {
        let err = ForecastClient::new("   ").unwrap_err();

        assert!(matches!(err, ForecastError::Configuration(_)));
        assert!(err.to_string().contains("forecast configure"));
    }

    #[test]
    fn secret_key_that_would_change_the_path_is_rejected() {
        for key in ["a/b", "key?x=1", "key#frag", "has space", "..", "ключ"] {
            let err = ForecastClient::new(key).unwrap_err();
            assert!(matches!(err, ForecastError::Configuration(_)), "accepted {key:?}");
        }

        assert!(ForecastClient::new("0123abcdef-_.~").is_ok());
    }

    #[test]
    fn debug_output_redacts_secret_key() {
        let client = ForecastClient::new("TOPSECRETKEY").unwrap();
        let provider: Box<dyn ForecastProvider> = Box::new(client.clone());

        for shown in [format!("{client:?}"), format!("{provider:?}")] {
            assert!(!shown.contains("TOPSECRETKEY"), "{shown}");
            assert!(shown.contains("***"));
        }
    }

    #[test]
    fn forecast_url_embeds_key_and_coordinate() {
        let client = ForecastClient::new("SECRET").unwrap();
        let url = client.forecast_url(&Coordinate::new(37.8267, -122.4233));

        assert_eq!(url, "https://api.darksky.net/forecast/SECRET/37.8267,-122.4233");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ForecastClient::new("K")
            .unwrap()
            .with_base_url("http://localhost:8080/");

        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(
            client.forecast_url(&Coordinate::new(1.5, 2.0)),
            "http://localhost:8080/forecast/K/1.5,2"
        );
    }

    #[test]
    fn default_query_excludes_unused_blocks() {
        let query = ForecastClient::default_query();

        assert_eq!(query.len(), 1);
        assert_eq!(query.get("exclude").map(String::as_str), Some("minutely,flags"));
    }

    #[test]
    fn unexpected_result_renders_json_body_and_cause() {
        let body = br#"{"code":400,"error":"poorly formatted request"}"#.to_vec();
        let source = decode_forecast(&body).unwrap_err();
        let err = ForecastError::UnexpectedResult { body, source };

        let msg = err.to_string();
        assert!(msg.contains("unexpected format"));
        assert!(msg.contains("missing field"));
        assert!(msg.contains("\"error\": \"poorly formatted request\""));
    }

    #[test]
    fn unexpected_result_renders_non_json_body_as_text() {
        let body = b"<html>Bad Gateway</html>".to_vec();
        let source = decode_forecast(&body).unwrap_err();
        let err = ForecastError::UnexpectedResult { body, source };

        assert!(err.to_string().contains("<html>Bad Gateway</html>"));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let text = truncate("é".repeat(MAX_BODY_EXCERPT));

        assert!(text.ends_with("..."));
        assert!(text.len() <= MAX_BODY_EXCERPT + 3);
    }
}
