use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use forecast_core::{Config, Coordinate, client_from_config};
use inquire::{Password, PasswordDisplayMode, Text};
use tracing::info;
use url::Url;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Weather forecast CLI")]
pub struct Cli {
    /// Secret key for the forecast provider; overrides the saved one.
    #[arg(long, global = true, env = "DARKSKY_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Save the provider secret key (and optionally a default location).
    Configure,

    /// Show the forecast for a coordinate.
    #[command(allow_negative_numbers = true)]
    Show {
        /// Latitude in decimal degrees.
        #[arg(requires = "longitude")]
        latitude: Option<f64>,

        /// Longitude in decimal degrees.
        longitude: Option<f64>,

        /// Number of hourly entries to print.
        #[arg(long, default_value_t = 12)]
        hours: usize,

        /// Number of daily entries to print.
        #[arg(long, default_value_t = 7)]
        days: usize,

        /// Print the decoded forecast as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure()?,
            Command::Show { latitude, longitude, hours, days, json } => {
                let mut config = Config::load()?;
                if let Some(key) = self.secret_key {
                    config.set_secret_key(key);
                }

                let coordinate = match (latitude, longitude) {
                    (Some(latitude), Some(longitude)) => Coordinate::new(latitude, longitude),
                    _ => config.default_location.ok_or_else(|| {
                        anyhow!(
                            "No coordinate given and no default location configured.\n\
                             Hint: run `forecast show <LAT> <LON>` or `forecast configure`."
                        )
                    })?,
                };

                let client = client_from_config(&config)?;
                let forecast = client.request_forecast(&coordinate).await?;

                if json {
                    let out = serde_json::to_string_pretty(&forecast)
                        .context("Failed to serialize forecast")?;
                    println!("{out}");
                } else {
                    print!("{}", render::ForecastView::new(&forecast, hours, days));
                }
            }
        }

        Ok(())
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let key_prompt = if config.is_configured() {
        "Secret key (empty to keep the current one):"
    } else {
        "Secret key:"
    };
    let key = Password::new(key_prompt)
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read secret key")?;
    if !key.trim().is_empty() {
        config.set_secret_key(key.trim());
    }
    if !config.is_configured() {
        return Err(anyhow!("A secret key is required."));
    }

    let base_url = Text::new("Provider base URL (empty for the default):")
        .with_initial_value(config.base_url.as_deref().unwrap_or_default())
        .prompt()
        .context("Failed to read base URL")?;
    config.base_url = parse_base_url(&base_url)?;

    let location = Text::new("Default location as `lat,lon` (empty to skip):")
        .prompt()
        .context("Failed to read default location")?;
    if !location.trim().is_empty() {
        config.default_location = Some(parse_coordinate(&location)?);
    }

    config.save()?;
    info!(path = %Config::config_file_path()?.display(), "Saved configuration");
    println!("Configuration saved.");

    Ok(())
}

/// Empty input clears the override.
fn parse_base_url(input: &str) -> Result<Option<String>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let url = Url::parse(input).with_context(|| format!("Invalid base URL '{input}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!("Base URL must use http or https, got '{input}'"));
    }

    Ok(Some(input.trim_end_matches('/').to_string()))
}

fn parse_coordinate(input: &str) -> Result<Coordinate> {
    let (lat, lon) = input
        .split_once(',')
        .ok_or_else(|| anyhow!("Expected `lat,lon`, got '{input}'"))?;

    let latitude: f64 = lat.trim().parse().with_context(|| format!("Invalid latitude '{lat}'"))?;
    let longitude: f64 = lon.trim().parse().with_context(|| format!("Invalid longitude '{lon}'"))?;

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(anyhow!("Coordinate out of range: {latitude},{longitude}"));
    }

    Ok(Coordinate::new(latitude, longitude))
}
