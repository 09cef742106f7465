use std::fs;
use std::str::FromStr;
use chrono::TimeDelta;
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_EMAIL_FROM: &str = "weather@yangmillstheory.com";
const DEFAULT_WINDOW_START_HOURS: i64 = 9;
const DEFAULT_WINDOW_LENGTH_HOURS: i64 = 13;
const DEFAULT_RAIN_THRESHOLD: f64 = 0.3;
const MAX_WINDOW_HOURS: i64 = 8760;

pub struct ForecastParameters {
    pub api_url: String,
    pub api_key: String,
    pub lat: String,
    pub lng: String,
}

pub struct MailParameters {
    pub from: String,
    pub to: String,
}

pub struct TopicParameters {
    pub topic_arn: String,
}

pub struct AwsParameters {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: String,
    pub ses_endpoint: String,
    pub sns_endpoint: String,
}

/// Lookahead window and rain threshold
///
#[derive(Clone, Debug)]
pub struct Policy {
    pub start_offset: TimeDelta,
    pub window_length: TimeDelta,
    pub threshold: f64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            start_offset: TimeDelta::hours(DEFAULT_WINDOW_START_HOURS),
            window_length: TimeDelta::hours(DEFAULT_WINDOW_LENGTH_HOURS),
            threshold: DEFAULT_RAIN_THRESHOLD,
        }
    }
}

pub struct General {
    pub log_path: Option<String>,
    pub log_level: LevelFilter,
}

pub struct Config {
    pub forecast: ForecastParameters,
    pub mail: MailParameters,
    pub topic: TopicParameters,
    pub aws: AwsParameters,
    pub policy: Policy,
    pub general: General,
}

/// Optional settings file, keys are the environment variable names in lower case
///
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    api_url: Option<String>,
    api_key: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    topic_arn: Option<String>,
    email_to: Option<String>,
    email_from: Option<String>,
    aws_access_key_id: Option<String>,
    aws_secret_access_key: Option<String>,
    aws_session_token: Option<String>,
    aws_region: Option<String>,
    ses_endpoint: Option<String>,
    sns_endpoint: Option<String>,
    window_start_hours: Option<i64>,
    window_length_hours: Option<i64>,
    rain_threshold: Option<f64>,
    log_level: Option<String>,
    log_path: Option<String>,
}

impl FileSettings {
    /// Returns the file value for an upper case setting name
    ///
    fn get(&self, key: &str) -> Option<String> {
        match key {
            "API_URL" => self.api_url.clone(),
            "API_KEY" => self.api_key.clone(),
            "LAT" => self.lat.map(|v| v.to_string()),
            "LNG" => self.lng.map(|v| v.to_string()),
            "TOPIC_ARN" => self.topic_arn.clone(),
            "EMAIL_TO" => self.email_to.clone(),
            "EMAIL_FROM" => self.email_from.clone(),
            "AWS_ACCESS_KEY_ID" => self.aws_access_key_id.clone(),
            "AWS_SECRET_ACCESS_KEY" => self.aws_secret_access_key.clone(),
            "AWS_SESSION_TOKEN" => self.aws_session_token.clone(),
            "AWS_REGION" => self.aws_region.clone(),
            "SES_ENDPOINT" => self.ses_endpoint.clone(),
            "SNS_ENDPOINT" => self.sns_endpoint.clone(),
            "WINDOW_START_HOURS" => self.window_start_hours.map(|v| v.to_string()),
            "WINDOW_LENGTH_HOURS" => self.window_length_hours.map(|v| v.to_string()),
            "RAIN_THRESHOLD" => self.rain_threshold.map(|v| v.to_string()),
            "LOG_LEVEL" => self.log_level.clone(),
            "LOG_PATH" => self.log_path.clone(),
            _ => None,
        }
    }
}

/// Source of configuration values, the process environment layered over an optional file
///
pub struct Settings {
    file: FileSettings,
    lookup: Box<dyn Fn(&str) -> Option<String>>,
}

impl Settings {
    /// Returns settings backed by the process environment and, if given, a TOML file
    ///
    /// # Arguments
    ///
    /// * 'config_path' - optional path to a TOML file with lower case keys
    pub fn from_env(config_path: Option<&str>) -> Result<Settings, LoadConfigurationError> {
        let file = match config_path {
            Some(path) => {
                let toml = fs::read_to_string(path)
                    .map_err(|e| LoadConfigurationError::File(format!("{}: {}", path, e)))?;
                parse_file(&toml)?
            }
            None => FileSettings::default(),
        };

        Ok(Settings { file, lookup: Box::new(|key| std::env::var(key).ok()) })
    }

    /// Returns settings backed by the given lookup function only
    ///
    /// # Arguments
    ///
    /// * 'lookup' - function returning the value for a key, if any
    pub fn from_lookup<F>(lookup: F) -> Settings
    where
        F: Fn(&str) -> Option<String> + 'static,
    {
        Settings { file: FileSettings::default(), lookup: Box::new(lookup) }
    }

    /// Returns the non-empty value for the key, the environment taking precedence over the file
    ///
    /// # Arguments
    ///
    /// * 'key' - upper case setting name, e.g. API_URL
    pub fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .filter(|v| !v.is_empty())
            .or_else(|| self.file.get(key))
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, LoadConfigurationError> {
        self.get(key).ok_or_else(|| LoadConfigurationError::Missing(key.to_string()))
    }

    fn parsed<T: FromStr>(&self, key: &str, default: T) -> Result<T, LoadConfigurationError>
    where
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(v) => v.parse::<T>()
                .map_err(|e| LoadConfigurationError::Invalid(key.to_string(), e.to_string())),
            None => Ok(default),
        }
    }
}

/// Loads the general (logging) section, which has defaults for everything
///
/// # Arguments
///
/// * 'settings' - configuration source
pub fn load_general(settings: &Settings) -> Result<General, LoadConfigurationError> {
    Ok(General {
        log_path: settings.get("LOG_PATH"),
        log_level: settings.parsed("LOG_LEVEL", LevelFilter::Info)?,
    })
}

/// Loads the configuration and returns a struct with all configuration items
///
/// # Arguments
///
/// * 'settings' - configuration source
pub fn load_config(settings: &Settings) -> Result<Config, LoadConfigurationError> {
    let api_url = settings.required("API_URL")?;
    let api_key = settings.required("API_KEY")?;
    let lat = coordinate(settings, "LAT")?;
    let lng = coordinate(settings, "LNG")?;
    let topic_arn = settings.required("TOPIC_ARN")?;
    let email_to = settings.required("EMAIL_TO")?;

    let region = match settings.get("AWS_REGION") {
        Some(region) => region,
        None => region_from_arn(&topic_arn)
            .ok_or_else(|| LoadConfigurationError::Invalid("TOPIC_ARN".into(), "no region in ARN and AWS_REGION not set".into()))?,
    };

    let aws = AwsParameters {
        access_key_id: settings.required("AWS_ACCESS_KEY_ID")?,
        secret_access_key: settings.required("AWS_SECRET_ACCESS_KEY")?,
        session_token: settings.get("AWS_SESSION_TOKEN"),
        ses_endpoint: settings.get("SES_ENDPOINT")
            .unwrap_or_else(|| format!("https://email.{}.amazonaws.com/", region)),
        sns_endpoint: settings.get("SNS_ENDPOINT")
            .unwrap_or_else(|| format!("https://sns.{}.amazonaws.com/", region)),
        region,
    };

    let policy = Policy {
        start_offset: hours(settings, "WINDOW_START_HOURS", DEFAULT_WINDOW_START_HOURS, true)?,
        window_length: hours(settings, "WINDOW_LENGTH_HOURS", DEFAULT_WINDOW_LENGTH_HOURS, false)?,
        threshold: settings.parsed("RAIN_THRESHOLD", DEFAULT_RAIN_THRESHOLD)?,
    };
    if !(0.0..=1.0).contains(&policy.threshold) {
        return Err(LoadConfigurationError::Invalid("RAIN_THRESHOLD".into(), "must be within 0.0 and 1.0".into()));
    }

    Ok(Config {
        forecast: ForecastParameters { api_url, api_key, lat, lng },
        mail: MailParameters {
            from: settings.get("EMAIL_FROM").unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
            to: email_to,
        },
        topic: TopicParameters { topic_arn },
        aws,
        policy,
        general: load_general(settings)?,
    })
}

/// Returns the coordinate as given, after checking that it is a number
///
fn coordinate(settings: &Settings, key: &str) -> Result<String, LoadConfigurationError> {
    let value = settings.required(key)?;
    value.trim().parse::<f64>()
        .map_err(|e| LoadConfigurationError::Invalid(key.to_string(), e.to_string()))?;

    Ok(value.trim().to_string())
}

fn hours(settings: &Settings, key: &str, default: i64, allow_negative: bool) -> Result<TimeDelta, LoadConfigurationError> {
    let value: i64 = settings.parsed(key, default)?;
    if value < 0 && !allow_negative {
        return Err(LoadConfigurationError::Invalid(key.to_string(), "must not be negative".into()));
    }
    if !(-MAX_WINDOW_HOURS..=MAX_WINDOW_HOURS).contains(&value) {
        return Err(LoadConfigurationError::Invalid(key.to_string(), format!("must be within {} hours", MAX_WINDOW_HOURS)));
    }

    Ok(TimeDelta::hours(value))
}

/// Picks the region out of an ARN such as arn:aws:sns:us-east-1:123456789012:rain
///
fn region_from_arn(arn: &str) -> Option<String> {
    arn.split(':')
        .nth(3)
        .filter(|r| !r.is_empty())
        .map(|r| r.to_string())
}

/// Loads the settings file
///
/// # Arguments
///
/// * 'toml' - contents of the TOML file
fn parse_file(toml: &str) -> Result<FileSettings, LoadConfigurationError> {
    toml::from_str(toml).map_err(|e| LoadConfigurationError::File(e.to_string()))
}

/// Error depicting errors that occur while loading configuration
///
#[derive(Debug, Error)]
pub enum LoadConfigurationError {
    #[error("expected {0} to be set")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("FileError: {0}")]
    File(String),
}
