//! National Weather Service forecasts for Corn Belt stations.
//!
//! Two requests per station: `points/{lat},{lon}` resolves the gridpoint
//! forecast URL, which is then fetched for the next few periods.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{HttpConfig, StationConfig, WeatherConfig};
use crate::data::http::HttpFetcher;
use crate::data::{DataPoint, DataSource};
use crate::error::FetchError;

/// Forecast periods for one station, as summarized for the briefing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationForecast {
    pub station: String,
    pub periods: Vec<PeriodSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodSummary {
    pub name: String,
    pub temperature: i32,
    pub temperature_unit: String,
    pub short_forecast: String,
    pub precipitation_chance: Option<i32>,
    pub wind: String,
}

impl StationForecast {
    /// One prompt line, e.g. "Des Moines, IA: Today 61°F Sunny (10% precip); Tonight ...".
    pub fn summary_line(&self) -> String {
        let periods: Vec<String> = self
            .periods
            .iter()
            .map(|p| {
                let mut line = format!(
                    "{} {}°{} {}",
                    p.name, p.temperature, p.temperature_unit, p.short_forecast
                );
                if let Some(chance) = p.precipitation_chance {
                    line.push_str(&format!(" ({chance}% precip)"));
                }
                line
            })
            .collect();
        format!("{}: {}", self.station, periods.join("; "))
    }
}

pub struct WeatherSource {
    http: HttpFetcher,
    base_url: String,
    stations: Vec<StationConfig>,
    periods: usize,
}

impl WeatherSource {
    pub fn new(weather: &WeatherConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::new(&http.user_agent, http.weather_timeout())?,
            base_url: weather.nws_base_url.trim_end_matches('/').to_string(),
            stations: weather.stations.clone(),
            periods: weather.periods,
        })
    }

    async fn fetch_forecast(&self, station: &StationConfig) -> Result<StationForecast, FetchError> {
        let points_url = format!(
            "{}/points/{:.4},{:.4}",
            self.base_url, station.lat, station.lon
        );
        let points: PointsResponse = decode(&points_url, self.http.get_json(&points_url, &[]).await?)?;

        let forecast_url = points.properties.forecast;
        let forecast: NwsForecast = decode(&forecast_url, self.http.get_json(&forecast_url, &[]).await?)?;

        let periods = forecast
            .properties
            .periods
            .into_iter()
            .take(self.periods)
            .map(|p| PeriodSummary {
                name: p.name,
                temperature: p.temperature,
                temperature_unit: p.temperature_unit,
                short_forecast: p.short_forecast,
                precipitation_chance: p.probability_of_precipitation.and_then(|pp| pp.value),
                wind: format!("{} {}", p.wind_direction, p.wind_speed).trim().to_string(),
            })
            .collect();

        Ok(StationForecast {
            station: station.name.clone(),
            periods,
        })
    }
}

fn decode<T: serde::de::DeserializeOwned>(url: &str, body: serde_json::Value) -> Result<T, FetchError> {
    serde_json::from_value(body).map_err(|e| FetchError::parse(url, e))
}

#[async_trait]
impl DataSource for WeatherSource {
    async fn fetch(&self) -> Result<Vec<DataPoint>> {
        let mut points = Vec::new();

        for station in &self.stations {
            match self.fetch_forecast(station).await {
                Ok(forecast) => points.push(DataPoint::Forecast(forecast)),
                Err(e) => warn!(station = %station.name, error = %e, "Failed to fetch weather for station"),
            }
        }

        if points.is_empty() && !self.stations.is_empty() {
            bail!("no station forecasts available");
        }
        Ok(points)
    }

    fn name(&self) -> &str {
        "nws_weather"
    }
}

// --- NWS API Response Types ---

#[derive(Debug, Deserialize)]
struct PointsResponse {
    properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
struct PointsProperties {
    forecast: String,
}

#[derive(Debug, Deserialize)]
struct NwsForecast {
    properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    periods: Vec<ForecastPeriod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastPeriod {
    name: String,
    temperature: i32,
    temperature_unit: String,
    #[serde(default)]
    wind_speed: String,
    #[serde(default)]
    wind_direction: String,
    short_forecast: String,
    probability_of_precipitation: Option<PrecipitationProbability>,
}

#[derive(Debug, Deserialize)]
struct PrecipitationProbability {
    value: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(base_url: &str) -> WeatherSource {
        let mut config = crate::config::AppConfig::from_toml(include_str!("../../config/default.toml")).unwrap();
        config.weather.nws_base_url = base_url.to_string();
        config.weather.stations.truncate(2);
        WeatherSource::new(&config.weather, &config.http).unwrap()
    }

    #[test]
    fn test_summary_line() {
        let f = StationForecast {
            station: "Des Moines, IA".into(),
            periods: vec![
                PeriodSummary {
                    name: "Today".into(),
                    temperature: 61,
                    temperature_unit: "F".into(),
                    short_forecast: "Sunny".into(),
                    precipitation_chance: Some(10),
                    wind: "S 10 mph".into(),
                },
                PeriodSummary {
                    name: "Tonight".into(),
                    temperature: 40,
                    temperature_unit: "F".into(),
                    short_forecast: "Clear".into(),
                    precipitation_chance: None,
                    wind: "S 5 mph".into(),
                },
            ],
        };
        assert_eq!(
            f.summary_line(),
            "Des Moines, IA: Today 61°F Sunny (10% precip); Tonight 40°F Clear"
        );
    }

    #[tokio::test]
    async fn test_points_then_forecast() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/points/41.5868,-93.6250"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": {"forecast": format!("{}/gridpoints/DMX/73,49/forecast", server.uri())}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gridpoints/DMX/73,49/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": {"periods": [
                    {"name": "Today", "temperature": 61, "temperatureUnit": "F", "windSpeed": "10 mph",
                     "windDirection": "S", "shortForecast": "Sunny",
                     "probabilityOfPrecipitation": {"unitCode": "wmoUnit:percent", "value": null}},
                    {"name": "Tonight", "temperature": 40, "temperatureUnit": "F", "windSpeed": "5 mph",
                     "windDirection": "S", "shortForecast": "Clear"},
                    {"name": "Tuesday", "temperature": 66, "temperatureUnit": "F", "shortForecast": "Showers"}
                ]}
            })))
            .mount(&server)
            .await;

        // Champaign has no mock and fails; Des Moines still comes through.
        let points = source(&server.uri()).fetch().await.unwrap();
        assert_eq!(points.len(), 1);
        let DataPoint::Forecast(f) = &points[0] else {
            panic!("expected forecast");
        };
        assert_eq!(f.station, "Des Moines, IA");
        assert_eq!(f.periods.len(), 2);
        assert_eq!(f.periods[0].wind, "S 10 mph");
        assert_eq!(f.periods[0].precipitation_chance, None);
    }

    #[tokio::test]
    async fn test_all_stations_failing_is_error() {
        let server = MockServer::start().await;
        assert!(source(&server.uri()).fetch().await.is_err());
    }
}
