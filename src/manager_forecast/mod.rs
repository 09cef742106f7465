pub mod models;

use std::time::Duration;
use log::info;
use reqwest::blocking::Client;
use thiserror::Error;
use crate::config::ForecastParameters;
use crate::manager_forecast::models::ForecastResponse;

const EXCLUDE: [&str; 5] = ["currently", "minutely", "daily", "alerts", "flags"];

/// Struct for fetching hourly weather forecasts
pub struct Forecast {
    client: Client,
    url: String,
}

impl Forecast {
    /// Returns a forecast struct ready for fetching forecasts
    ///
    /// # Arguments
    ///
    /// * 'config' - forecast API configuration
    pub fn new(config: &ForecastParameters) -> Result<Forecast, ForecastError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let url = format!("{}/{}/{},{}",
            config.api_url.trim_end_matches('/'), config.api_key, config.lat, config.lng);

        Ok(Forecast { client, url })
    }

    /// Retrieves the hourly forecast.
    /// Returns the decoded response together with the raw response body
    ///
    pub fn fetch(&self) -> Result<(ForecastResponse, String), ForecastError> {
        let exclude = EXCLUDE.join(",");

        let response = self.client
            .get(&self.url)
            .query(&[("exclude", exclude.as_str())])
            .send()?;

        let status = response.status();
        let json = response.text()?;
        info!("forecast response status {}, length {}", status, json.len());

        let forecast = decode(&json)?;

        Ok((forecast, json))
    }
}

/// Decodes a forecast document, the error carries the raw document
///
/// # Arguments
///
/// * 'json' - the raw response body
pub fn decode(json: &str) -> Result<ForecastResponse, ForecastError> {
    serde_json::from_str(json)
        .map_err(|e| ForecastError::Document(format!("decoding response {}: {}", json, e)))
}

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("DocumentError: {0}")]
    Document(String),
    #[error("NetworkError: {0}")]
    Network(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hourly_data() {
        let json = r#"{
            "latitude": 47.6,
            "timezone": "America/Los_Angeles",
            "hourly": {
                "summary": "Rain",
                "data": [
                    {"time": 1705309200, "precipProbability": 0.3, "temperature": 40.1},
                    {"time": 1705312800}
                ]
            }
        }"#;

        let forecast = decode(json).unwrap();
        assert_eq!(forecast.timezone, "America/Los_Angeles");
        assert_eq!(forecast.hourly.data.len(), 2);
        assert_eq!(forecast.hourly.data[0].precip_probability, 0.3);
        assert_eq!(forecast.hourly.data[1].precip_probability, 0.0);
    }

    #[test]
    fn missing_hourly_block_is_empty() {
        let forecast = decode(r#"{"timezone": "UTC"}"#).unwrap();
        assert!(forecast.hourly.data.is_empty());
    }

    #[test]
    fn document_error_carries_raw_body() {
        let body = "<html>502 Bad Gateway</html>";
        let err = decode(body).err().unwrap();

        assert!(matches!(err, ForecastError::Document(_)));
        assert!(err.to_string().contains(body));
    }

    #[test]
    fn url_is_built_from_parameters() {
        let params = ForecastParameters {
            api_url: "https://api.example.com/forecast/".into(),
            api_key: "key".into(),
            lat: "47.6".into(),
            lng: "-122.3".into(),
        };

        let forecast = Forecast::new(&params).unwrap();
        assert_eq!(forecast.url, "https://api.example.com/forecast/key/47.6,-122.3");
    }
}
