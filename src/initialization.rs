use std::env;
use log::{error, info};
use thiserror::Error;
use crate::config::{load_config, load_general, Config, LoadConfigurationError, Settings};
use crate::logging::{setup_logger, LoggerError};
use crate::manager_aws::{AwsClient, AwsError};
use crate::manager_forecast::{Forecast, ForecastError};
use crate::manager_mail::{Mail, MailError};
use crate::manager_topic::{Topic, TopicError};

pub struct Mgr {
    pub forecast: Forecast,
    pub mail: Mail,
    pub topic: Topic,
}

impl Mgr {
    /// Builds all managers from configuration
    ///
    /// # Arguments
    ///
    /// * 'config' - configuration to use
    pub fn new(config: &Config) -> Result<Mgr, InitializationError> {
        let aws = AwsClient::new(&config.aws)?;

        Ok(Mgr {
            forecast: Forecast::new(&config.forecast)?,
            mail: Mail::new(&config.mail, aws.clone(), &config.aws.ses_endpoint)?,
            topic: Topic::new(&config.topic, aws, &config.aws.sns_endpoint)?,
        })
    }
}

/// Initializes and returns configuration and a Mgr struct holding the initialized managers.
/// An optional `--config=<path>` argument names a TOML file with settings, the environment
/// takes precedence over it.
///
pub fn init() -> Result<(Config, Mgr), InitializationError> {
    let args: Vec<String> = env::args().collect();
    let config_path = args.iter()
        .find_map(|a| a.strip_prefix("--config="));

    let settings = Settings::from_env(config_path)?;

    // Setup logging first so that a missing setting can be logged
    let general = load_general(&settings)?;
    let _ = setup_logger(general.log_path.as_deref(), general.log_level)?;

    info!("starting rain notifier version: {}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&settings).inspect_err(|e| error!("configuration: {}", e))?;
    info!("initializing with API URL {}, latitude {}, longitude {}",
        config.forecast.api_url, config.forecast.lat, config.forecast.lng);

    let mgr = Mgr::new(&config)?;

    Ok((config, mgr))
}

/// Error depicting errors that occur while initializing
///
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("ConfigurationError: {0}")]
    ConfigurationError(#[from] LoadConfigurationError),
    #[error("SetupLoggerError: {0}")]
    SetupLoggerError(#[from] LoggerError),
    #[error("AwsSetupError: {0}")]
    AwsSetupError(#[from] AwsError),
    #[error("ForecastSetupError: {0}")]
    ForecastSetupError(#[from] ForecastError),
    #[error("MailSetupError: {0}")]
    MailSetupError(#[from] MailError),
    #[error("TopicSetupError: {0}")]
    TopicSetupError(#[from] TopicError),
}
