use std::sync::Arc;

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use xml_intake_core::contract::HandlerResponse;
use xml_intake_lambda::adapters::ledger::{DisabledLedger, RelocationLedger, StoreLedger};
use xml_intake_lambda::adapters::object_store::ObjectStore;
use xml_intake_lambda::adapters::s3::S3ObjectStore;
use xml_intake_lambda::config::RenameConfig;
use xml_intake_lambda::deadline::{processing_budget, spawn_deadline_watchdog};
use xml_intake_lambda::handlers::rename::{handle_rename_event, RenameDependencies};
use xml_intake_lambda::logging;

struct RuntimeDependencies {
    config: RenameConfig,
    store: Arc<dyn ObjectStore>,
    ledger: Box<dyn RelocationLedger>,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    runtime: &RuntimeDependencies,
) -> Result<HandlerResponse, Error> {
    let now_ms = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
    let budget = processing_budget(
        event.context.deadline,
        now_ms,
        runtime.config.deadline_margin_ms,
    );

    let cancel = CancellationToken::new();
    let watchdog = spawn_deadline_watchdog(cancel.clone(), budget);

    let deps = RenameDependencies {
        store: runtime.store.as_ref(),
        ledger: runtime.ledger.as_ref(),
        options: runtime.config.scan,
    };
    let response = handle_rename_event(&event.payload, &deps, &cancel).await;

    watchdog.abort();
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init("rename_lambda");

    let config = RenameConfig::from_env().map_err(|error| Error::from(error.to_string()))?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store: Arc<dyn ObjectStore> =
        Arc::new(S3ObjectStore::new(aws_sdk_s3::Client::new(&aws_config)));

    let ledger: Box<dyn RelocationLedger> = match &config.ledger {
        Some(ledger) => Box::new(StoreLedger::new(
            store.clone(),
            ledger.bucket.clone(),
            ledger.prefix.clone(),
        )),
        None => Box::new(DisabledLedger),
    };

    let runtime = RuntimeDependencies {
        config,
        store,
        ledger,
    };
    let runtime = &runtime;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, runtime).await
    }))
    .await
}
