use std::fmt;

use chrono::{DateTime, Utc};
use forecast_core::{Condition, Forecast, Icon, PrecipitationType};

/// Plain-text rendering of a forecast for the terminal.
pub struct ForecastView<'a> {
    forecast: &'a Forecast,
    hours: usize,
    days: usize,
}

impl<'a> ForecastView<'a> {
    pub fn new(forecast: &'a Forecast, hours: usize, days: usize) -> Self {
        Self { forecast, hours, days }
    }
}

impl fmt::Display for ForecastView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let forecast = self.forecast;

        writeln!(
            f,
            "Forecast for {:.4}, {:.4} ({})",
            forecast.latitude, forecast.longitude, forecast.timezone
        )?;
        writeln!(f, "\nNow: {}", Line(Condition::Momentary(&forecast.currently)))?;

        if self.hours > 0 {
            writeln!(f, "\nHourly: {}", forecast.hourly_summary.as_deref().unwrap_or("-"))?;
            for hour in forecast.hourly.iter().take(self.hours) {
                writeln!(f, "  {}", Line(Condition::Momentary(hour)))?;
            }
        }

        if self.days > 0 {
            writeln!(f, "\nDaily: {}", forecast.daily_summary.as_deref().unwrap_or("-"))?;
            for day in forecast.daily.iter().take(self.days) {
                writeln!(f, "  {}", Line(Condition::Average(day)))?;
            }
        }

        Ok(())
    }
}

/// One condition on a single line.
struct Line<'a>(Condition<'a>);

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let condition = self.0;
        let common = condition.common();
        let (low, high) = condition.temperature_range();

        let when = match condition {
            Condition::Momentary(_) => time(common.time, "%a %H:%M"),
            Condition::Average(_) => time(common.time, "%a %b %d"),
        };

        let temperature = match condition {
            Condition::Momentary(c) if c.apparent_temperature.round() != c.temperature.round() => {
                format!("{:.0}°F (feels {:.0}°F)", c.temperature, c.apparent_temperature)
            }
            Condition::Momentary(c) => format!("{:.0}°F", c.temperature),
            Condition::Average(_) => format!("{low:.0}-{high:.0}°F"),
        };

        write!(
            f,
            "{when}  {:<20} {temperature}",
            label(common.icon, common.summary.as_deref())
        )?;

        if common.precip_type != PrecipitationType::None {
            write!(
                f,
                ", {:.0}% {}",
                common.precip_probability * 100.0,
                common.precip_type.as_tag()
            )?;
        }

        if common.wind_speed > 0.0 {
            write!(f, ", wind {:.0} mph", common.wind_speed)?;
            if let Some(bearing) = common.wind_bearing {
                write!(f, " from {}", compass(bearing))?;
            }
        }

        Ok(())
    }
}

fn time(at: DateTime<Utc>, format: &str) -> String {
    at.format(format).to_string()
}

fn label(icon: Icon, summary: Option<&str>) -> String {
    match summary {
        Some(summary) => summary.to_string(),
        None if icon == Icon::None => "-".to_string(),
        None => icon.as_tag().replace('-', " "),
    }
}

fn compass(bearing: i32) -> &'static str {
    const POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let index = ((bearing.rem_euclid(360) as f64 + 22.5) / 45.0) as usize % 8;
    POINTS[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Forecast {
        let body = serde_json::json!({
            "latitude": 40.0,
            "longitude": -105.0,
            "timezone": "America/Denver",
            "currently": {
                "time": 0,
                "icon": "partly-cloudy-night",
                "precipProbability": 0.3,
                "precipType": "snow",
                "humidity": 0.7,
                "windSpeed": 12.0,
                "windBearing": 270,
                "temperature": 28.0,
                "apparentTemperature": 19.0
            },
            "hourly": { "summary": "Snow tonight.", "data": [] },
            "daily": {
                "summary": "Cold week.",
                "data": [{
                    "time": 86400,
                    "summary": "Flurries.",
                    "precipProbability": 0.5,
                    "humidity": 0.8,
                    "temperatureMax": 35.0,
                    "temperatureMin": 20.0
                }]
            }
        });
        forecast_core::decode_forecast(body.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn renders_current_and_daily_lines() {
        let forecast = sample();
        let text = ForecastView::new(&forecast, 12, 7).to_string();

        assert!(text.contains("America/Denver"));
        assert!(text.contains("partly cloudy night"));
        assert!(text.contains("28°F (feels 19°F)"));
        assert!(text.contains("30% snow"));
        assert!(text.contains("wind 12 mph from W"));
        assert!(text.contains("Flurries."));
        assert!(text.contains("20-35°F"));
    }

    #[test]
    fn zero_counts_skip_sections() {
        let forecast = sample();
        let text = ForecastView::new(&forecast, 0, 0).to_string();

        assert!(!text.contains("Hourly"));
        assert!(!text.contains("Daily"));
    }

    #[test]
    fn compass_points_wrap() {
        assert_eq!(compass(0), "N");
        assert_eq!(compass(359), "N");
        assert_eq!(compass(90), "E");
        assert_eq!(compass(225), "SW");
    }
}
