use std::fmt::Debug;

use async_trait::async_trait;

use crate::{
    Config,
    client::{Coordinate, ForecastClient, ForecastError},
    model::Forecast,
};

/// Anything that can produce a [`Forecast`] for a coordinate.
#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    async fn request_forecast(&self, coordinate: &Coordinate) -> Result<Forecast, ForecastError>;
}

/// Construct a provider from config. A missing secret key is reported as
/// [`ForecastError::Configuration`] rather than aborting.
pub fn provider_from_config(config: &Config) -> Result<Box<dyn ForecastProvider>, ForecastError> {
    Ok(Box::new(client_from_config(config)?))
}

pub fn client_from_config(config: &Config) -> Result<ForecastClient, ForecastError> {
    let key = config
        .secret_key()
        .ok_or_else(|| ForecastError::Configuration("no secret key set".into()))?;

    let client = ForecastClient::new(key)?;

    Ok(match config.base_url.as_deref() {
        Some(base_url) => client.with_base_url(base_url),
        None => client,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn provider_from_config_errors_when_missing_secret_key() {
        let cfg = Config::default();
        let err = provider_from_config(&cfg).unwrap_err();

        assert!(matches!(err, ForecastError::Configuration(_)));
        assert!(err.to_string().contains("no secret key set"));
    }

    #[test]
    fn provider_from_config_works_when_configured() {
        let mut cfg = Config::default();
        cfg.set_secret_key("KEY");

        assert!(provider_from_config(&cfg).is_ok());
    }

    #[test]
    fn client_from_config_uses_configured_base_url() {
        let mut cfg = Config::default();
        cfg.set_secret_key("KEY");
        cfg.base_url = Some("https://mirror.example.com/".into());

        let client = client_from_config(&cfg).unwrap();
        assert_eq!(client.base_url(), "https://mirror.example.com");
    }
}
