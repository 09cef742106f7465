use serde::Deserialize;

/// One hour of forecast data
///
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct HourlyDatum {
    /// Unix timestamp in seconds
    pub time: i64,
    #[serde(rename = "precipProbability", default)]
    pub precip_probability: f64,
}

#[derive(Deserialize, Debug, Default)]
pub struct Hourly {
    #[serde(default)]
    pub data: Vec<HourlyDatum>,
}

/// The parts of the forecast response that are of interest, data is sorted ascending on time
///
#[derive(Deserialize, Debug)]
pub struct ForecastResponse {
    pub timezone: String,
    #[serde(default)]
    pub hourly: Hourly,
}
