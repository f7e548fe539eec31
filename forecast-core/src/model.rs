//! Domain model for a DarkSky-style forecast and the rules for decoding it.
//!
//! The provider is a third party, so decoding is deliberately lenient: required
//! fields that are missing fail the whole forecast, while optional fields fall
//! back to documented defaults and never surface as errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};

/// Visibility reported by the provider when nothing limits it, in miles.
pub const UNLIMITED_VISIBILITY: f64 = 10.0;

/// The current and upcoming weather for one requested coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawForecast")]
pub struct Forecast {
    /// The requested latitude.
    pub latitude: f64,

    /// The requested longitude.
    pub longitude: f64,

    /// IANA timezone name of the location, e.g. `America/Los_Angeles`.
    pub timezone: String,

    pub currently: MomentaryCondition,

    /// Human-readable summary of the next two days.
    pub hourly_summary: Option<String>,

    /// Hour-by-hour conditions, oldest first.
    pub hourly: Vec<MomentaryCondition>,

    /// Human-readable summary of the next week.
    pub daily_summary: Option<String>,

    /// Day-by-day conditions, oldest first.
    pub daily: Vec<AverageCondition>,
}

impl Forecast {
    /// Every period in the forecast: current conditions, then hourly, then daily.
    pub fn periods(&self) -> impl Iterator<Item = Condition<'_>> {
        std::iter::once(Condition::Momentary(&self.currently))
            .chain(self.hourly.iter().map(Condition::Momentary))
            .chain(self.daily.iter().map(Condition::Average))
    }
}

/// Decode a raw response body into a [`Forecast`].
pub fn decode_forecast(body: &[u8]) -> serde_json::Result<Forecast> {
    serde_json::from_slice(body)
}

/// Fields shared by every period, whether a moment or a daily aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherCondition {
    /// Start of the period. Hourly data is aligned to the top of the hour,
    /// daily data to local midnight.
    pub time: DateTime<Utc>,
    pub summary: Option<String>,
    pub icon: Icon,
    /// Probability of precipitation, `0.0..=1.0`.
    pub precip_probability: f64,
    pub precip_type: PrecipitationType,
    /// Relative humidity, `0.0..=1.0`.
    pub humidity: f64,
    /// Miles per hour.
    pub wind_speed: f64,
    /// Miles per hour.
    pub wind_gust: f64,
    /// Degrees clockwise from true north the wind is coming from. Only
    /// meaningful when `wind_speed` is non-zero, but kept as reported.
    pub wind_bearing: Option<i32>,
    /// Miles, capped at [`UNLIMITED_VISIBILITY`].
    pub visibility: f64,
    /// Fraction of sky covered by clouds, `0.0..=1.0`.
    pub cloud_cover: f64,
}

/// Conditions at a single moment: the present or a given hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawMomentaryCondition")]
pub struct MomentaryCondition {
    #[serde(flatten)]
    pub common: WeatherCondition,
    /// Air temperature, °F.
    pub temperature: f64,
    /// "Feels like" temperature, °F.
    pub apparent_temperature: f64,
}

/// Aggregate conditions over a whole day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawAverageCondition")]
pub struct AverageCondition {
    #[serde(flatten)]
    pub common: WeatherCondition,
    /// Daily maximum, °F.
    pub temperature_max: f64,
    /// Daily minimum, °F.
    pub temperature_min: f64,
}

/// A borrowed view over either kind of period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition<'a> {
    Momentary(&'a MomentaryCondition),
    Average(&'a AverageCondition),
}

impl<'a> Condition<'a> {
    pub fn common(&self) -> &'a WeatherCondition {
        match self {
            Condition::Momentary(c) => &c.common,
            Condition::Average(c) => &c.common,
        }
    }

    /// `(low, high)` in °F. A moment has the same value for both.
    pub fn temperature_range(&self) -> (f64, f64) {
        match self {
            Condition::Momentary(c) => (c.temperature, c.temperature),
            Condition::Average(c) => (c.temperature_min, c.temperature_max),
        }
    }
}

/// Machine-readable summary of a period, used to pick an icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Icon {
    Rain,
    Snow,
    Sleet,
    Wind,
    Fog,
    Cloudy,
    ClearDay,
    ClearNight,
    PartlyCloudyDay,
    PartlyCloudyNight,
    #[default]
    None,
}

const ICON_TAGS: &[(&str, Icon)] = &[
    ("rain", Icon::Rain),
    ("snow", Icon::Snow),
    ("sleet", Icon::Sleet),
    ("wind", Icon::Wind),
    ("fog", Icon::Fog),
    ("cloudy", Icon::Cloudy),
    ("clear-day", Icon::ClearDay),
    ("clear-night", Icon::ClearNight),
    ("partly-cloudy-day", Icon::PartlyCloudyDay),
    ("partly-cloudy-night", Icon::PartlyCloudyNight),
];

impl Icon {
    /// Map a provider tag to an icon. Unknown or absent tags are `Icon::None`.
    pub fn from_tag(tag: Option<&str>) -> Self {
        lookup(ICON_TAGS, tag)
    }

    pub fn as_tag(self) -> &'static str {
        reverse_lookup(ICON_TAGS, self).unwrap_or("none")
    }
}

/// Kind of precipitation expected during a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecipitationType {
    Rain,
    Snow,
    Sleet,
    #[default]
    None,
}

const PRECIPITATION_TAGS: &[(&str, PrecipitationType)] = &[
    ("rain", PrecipitationType::Rain),
    ("snow", PrecipitationType::Snow),
    ("sleet", PrecipitationType::Sleet),
];

impl PrecipitationType {
    /// Map a provider tag to a precipitation type. Unknown or absent tags are
    /// `PrecipitationType::None`.
    pub fn from_tag(tag: Option<&str>) -> Self {
        lookup(PRECIPITATION_TAGS, tag)
    }

    pub fn as_tag(self) -> &'static str {
        reverse_lookup(PRECIPITATION_TAGS, self).unwrap_or("none")
    }
}

fn lookup<T: Copy + Default>(table: &[(&str, T)], tag: Option<&str>) -> T {
    tag.and_then(|tag| table.iter().find(|(known, _)| *known == tag))
        .map(|(_, value)| *value)
        .unwrap_or_default()
}

fn reverse_lookup<T: Copy + PartialEq>(table: &[(&'static str, T)], value: T) -> Option<&'static str> {
    table.iter().find(|(_, v)| *v == value).map(|(tag, _)| *tag)
}

/// Decode an optional field, treating a value of the wrong shape (or `null`)
/// the same as an absent one.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Deserialize)]
struct RawForecast {
    latitude: f64,
    longitude: f64,
    timezone: String,
    currently: MomentaryCondition,
    hourly: DataBlock<MomentaryCondition>,
    daily: DataBlock<AverageCondition>,
}

/// A `{ "summary": ..., "data": [...] }` slice of the response.
#[derive(Deserialize)]
struct DataBlock<T> {
    summary: String,
    data: Vec<T>,
}

impl From<RawForecast> for Forecast {
    fn from(raw: RawForecast) -> Self {
        Self {
            latitude: raw.latitude,
            longitude: raw.longitude,
            timezone: raw.timezone,
            currently: raw.currently,
            hourly_summary: Some(raw.hourly.summary),
            hourly: raw.hourly.data,
            daily_summary: Some(raw.daily.summary),
            daily: raw.daily.data,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWeatherCondition {
    #[serde(with = "chrono::serde::ts_seconds")]
    time: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient")]
    summary: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    icon: Option<String>,
    precip_probability: f64,
    #[serde(default, deserialize_with = "lenient")]
    precip_type: Option<String>,
    humidity: f64,
    #[serde(default, deserialize_with = "lenient")]
    wind_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    wind_gust: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    wind_bearing: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    visibility: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    cloud_cover: Option<f64>,
}

impl From<RawWeatherCondition> for WeatherCondition {
    fn from(raw: RawWeatherCondition) -> Self {
        Self {
            time: raw.time,
            summary: raw.summary,
            icon: Icon::from_tag(raw.icon.as_deref()),
            precip_probability: raw.precip_probability,
            precip_type: PrecipitationType::from_tag(raw.precip_type.as_deref()),
            humidity: raw.humidity,
            wind_speed: raw.wind_speed.unwrap_or(0.0),
            wind_gust: raw.wind_gust.unwrap_or(0.0),
            wind_bearing: raw.wind_bearing,
            visibility: raw.visibility.unwrap_or(UNLIMITED_VISIBILITY),
            cloud_cover: raw.cloud_cover.unwrap_or(0.0),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMomentaryCondition {
    #[serde(flatten)]
    common: RawWeatherCondition,
    temperature: f64,
    #[serde(default, deserialize_with = "lenient")]
    apparent_temperature: Option<f64>,
}

impl From<RawMomentaryCondition> for MomentaryCondition {
    fn from(raw: RawMomentaryCondition) -> Self {
        Self {
            common: raw.common.into(),
            temperature: raw.temperature,
            apparent_temperature: raw.apparent_temperature.unwrap_or(raw.temperature),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAverageCondition {
    #[serde(flatten)]
    common: RawWeatherCondition,
    temperature_max: f64,
    temperature_min: f64,
}

impl From<RawAverageCondition> for AverageCondition {
    fn from(raw: RawAverageCondition) -> Self {
        Self {
            common: raw.common.into(),
            temperature_max: raw.temperature_max,
            temperature_min: raw.temperature_min,
        }
    }
}
