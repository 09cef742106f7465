use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::info;
use crate::config::Policy;
use crate::errors::WorkerError;
use crate::initialization::Mgr;
use crate::notifier::notify;
use crate::rain::{filter_rain, format_time, select_window, RainEvent, Window};

/// Result of a successful invocation
///
#[derive(Debug, PartialEq)]
pub enum RunOutcome {
    NoRain,
    Notified { events: Vec<RainEvent> },
}

/// Runs one invocation: fetches the forecast, looks for rain within the lookahead window
/// and notifies if any is found
///
/// # Arguments
///
/// * 'mgr' - struct with configured managers
/// * 'policy' - lookahead window and rain threshold
/// * 'now' - the time to compute the window from
pub fn run(mgr: &Mgr, policy: &Policy, now: DateTime<Utc>) -> Result<RunOutcome, WorkerError> {
    let (forecast, raw_json) = mgr.forecast.fetch()?;

    let tz = forecast.timezone.parse::<Tz>()
        .map_err(|e| WorkerError::Timezone(format!("{}: {}", forecast.timezone, e)))?;

    let window = Window::starting_at(now.with_timezone(&tz), policy);
    let data = &forecast.hourly.data;
    let range = select_window(data, window.start.timestamp(), window.end.timestamp());

    info!("found index {} for time {}", range.start, format_time(&tz, window.start.timestamp()));
    info!("found index {} for time {}", range.end, format_time(&tz, window.end.timestamp()));

    let events = filter_rain(data, &tz, range, policy.threshold);
    if events.is_empty() {
        info!("no rain to worry about");
        return Ok(RunOutcome::NoRain);
    }

    notify(&events, &raw_json, &mgr.mail, &mgr.topic)?;

    Ok(RunOutcome::Notified { events })
}
