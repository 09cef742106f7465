use anyhow::Result;
use chrono::Utc;
use log::{error, info};
use rayon::ThreadPoolBuilder;
use rain_notifier::initialization::init;
use rain_notifier::worker::{run, RunOutcome};

fn main() -> Result<()> {
    // One thread per notification leg
    ThreadPoolBuilder::new().num_threads(2).build_global()?;

    // Errors from before the logger is up only reach stderr through the returned error
    let (config, mgr) = init()?;

    match run(&mgr, &config.policy, Utc::now()) {
        Ok(RunOutcome::NoRain) => {
            info!("done, nothing to notify");
        }
        Ok(RunOutcome::Notified { events }) => {
            info!("done, notified about {} hours of rain", events.len());
        }
        Err(e) => {
            error!("run failed: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
