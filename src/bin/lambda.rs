//! AWS Lambda entry point, each invocation runs the notifier once.
//! The managers use blocking clients, so they are built before the async runtime
//! starts and every run happens on a blocking thread.

use std::sync::Arc;
use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use log::{error, info};
use rayon::ThreadPoolBuilder;
use serde_json::{json, Value};
use rain_notifier::config::Policy;
use rain_notifier::initialization::{init, Mgr};
use rain_notifier::worker::{run, RunOutcome};

fn main() -> Result<(), Error> {
    // One thread per notification leg
    ThreadPoolBuilder::new().num_threads(2).build_global()?;

    let (config, mgr) = init()?;
    let mgr = Arc::new(mgr);
    let policy = config.policy;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let handler_mgr = mgr.clone();
    let result = runtime.block_on(lambda_runtime::run(service_fn(move |event| {
        handler(handler_mgr.clone(), policy.clone(), event)
    })));

    // The blocking clients in Mgr must not be dropped inside the runtime
    drop(runtime);
    drop(mgr);

    result
}

/// Runs the notifier once for an invocation, the event payload is not used
///
/// # Arguments
///
/// * 'mgr' - initialized managers
/// * 'policy' - window and threshold policy
/// * 'event' - the triggering event
async fn handler(mgr: Arc<Mgr>, policy: Policy, event: LambdaEvent<Value>) -> Result<Value, Error> {
    info!("invocation {}", event.context.request_id);

    let outcome = tokio::task::spawn_blocking(move || run(&mgr, &policy, Utc::now()))
        .await?
        .inspect_err(|e| error!("run failed: {}", e))?;

    match &outcome {
        RunOutcome::NoRain => info!("done, nothing to notify"),
        RunOutcome::Notified { events } => info!("done, notified about {} hours of rain", events.len()),
    }

    Ok(response(&outcome))
}

/// Maps a run outcome to the invocation's response document
///
fn response(outcome: &RunOutcome) -> Value {
    match outcome {
        RunOutcome::NoRain => json!({ "notified": false, "events": [] }),
        RunOutcome::Notified { events } => json!({
            "notified": true,
            "events": events.iter().map(|e| e.to_string()).collect::<Vec<String>>(),
        }),
    }
}
