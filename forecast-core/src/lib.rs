//! Core library for the `forecast` CLI.
//!
//! This crate defines:
//! - A small HTTP GET primitive with status classification
//! - The forecast data model and its lenient decoder
//! - A client for DarkSky-compatible forecast endpoints
//! - Completion delivery on a single designated context
//! - Configuration & credentials handling
//!
//! It is used by `forecast-cli`, but can also be reused by other binaries or services.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod model;
pub mod provider;

pub use client::{Coordinate, ForecastClient, ForecastError};
pub use config::Config;
pub use dispatch::{CompletionPump, CompletionQueue, completion_queue, request_forecast_with};
pub use http::{HttpClient, HttpError, ResponseMeta};
pub use model::{
    AverageCondition, Condition, Forecast, Icon, MomentaryCondition, PrecipitationType,
    WeatherCondition, decode_forecast,
};
pub use provider::{ForecastProvider, client_from_config, provider_from_config};
