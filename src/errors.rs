use thiserror::Error;
use crate::manager_forecast::ForecastError;
use crate::notifier::NotifyError;

/// Error depicting errors that end an invocation
///
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("fetching forecast: {0}")]
    Forecast(#[from] ForecastError),
    #[error("loading timezone location {0}")]
    Timezone(String),
    #[error("notifying: {0}")]
    Notify(#[from] NotifyError),
}
