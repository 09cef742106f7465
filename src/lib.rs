pub mod config;
pub mod errors;
pub mod initialization;
pub mod logging;
pub mod manager_aws;
pub mod manager_forecast;
pub mod manager_mail;
pub mod manager_topic;
pub mod notifier;
pub mod rain;
pub mod worker;
