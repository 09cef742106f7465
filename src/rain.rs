use std::fmt;
use std::ops::Range;
use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use log::debug;
use crate::config::Policy;
use crate::manager_forecast::models::HourlyDatum;

const TIME_FORMAT: &str = "%b %-d %-I:%M%p";

/// The lookahead window, start inclusive and end exclusive
///
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl Window {
    /// Returns the window that starts `policy.start_offset` after now and lasts `policy.window_length`
    ///
    /// # Arguments
    ///
    /// * 'now' - current time in the forecast's time zone
    /// * 'policy' - window offsets
    pub fn starting_at(now: DateTime<Tz>, policy: &Policy) -> Window {
        let start = now + policy.start_offset;
        let end = start + policy.window_length;

        Window { start, end }
    }
}

/// An hour within the window where rain is likely enough to tell someone about
///
#[derive(Debug, Clone, PartialEq)]
pub struct RainEvent {
    pub formatted_time: String,
    pub probability_percent: f64,
}

impl fmt::Display for RainEvent {
    /// Percent is rounded half away from zero, 30.5 shows as 31%
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}%", self.formatted_time, self.probability_percent.round())
    }
}

/// Returns the first index whose timestamp is at or after `ts`, or `data.len()` if there is none.
/// Data must be sorted ascending on time.
///
/// # Arguments
///
/// * 'data' - hourly data sorted on time
/// * 'ts' - unix timestamp to search for
pub fn lower_bound(data: &[HourlyDatum], ts: i64) -> usize {
    data.partition_point(|d| d.time < ts)
}

/// Returns the index range of data points with a timestamp within [start, end)
///
/// # Arguments
///
/// * 'data' - hourly data sorted on time
/// * 'start' - window start as unix timestamp
/// * 'end' - window end as unix timestamp (non-inclusive)
pub fn select_window(data: &[HourlyDatum], start: i64, end: i64) -> Range<usize> {
    let s = lower_bound(data, start);
    let e = lower_bound(data, end);

    if s > e { s..s } else { s..e }
}

/// Picks out the hours in range with a precipitation probability at or above threshold
///
/// # Arguments
///
/// * 'data' - hourly data
/// * 'tz' - time zone to format times in
/// * 'range' - index range into data to consider
/// * 'threshold' - minimum probability (0.0 - 1.0), inclusive
pub fn filter_rain(data: &[HourlyDatum], tz: &Tz, range: Range<usize>, threshold: f64) -> Vec<RainEvent> {
    let Some(hours) = data.get(range) else {
        return Vec::new();
    };

    hours.iter()
        .filter_map(|d| {
            let formatted_time = format_time(tz, d.time);
            let probability_percent = 100.0 * d.precip_probability;

            if d.precip_probability >= threshold {
                debug!("{}: {:.0}% accepted", formatted_time, probability_percent);
                Some(RainEvent { formatted_time, probability_percent })
            } else {
                debug!("{}: {:.0}% rejected", formatted_time, probability_percent);
                None
            }
        })
        .collect()
}

/// Formats a unix timestamp in the given time zone, e.g. "Jan 2 3:04PM"
///
pub fn format_time(tz: &Tz, ts: i64) -> String {
    match tz.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format(TIME_FORMAT).to_string(),
        None => ts.to_string(),
    }
}
