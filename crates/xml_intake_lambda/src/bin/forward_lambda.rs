use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use xml_intake_core::contract::HandlerResponse;
use xml_intake_lambda::adapters::forwarder::HttpDocumentSink;
use xml_intake_lambda::adapters::s3::S3ObjectStore;
use xml_intake_lambda::config::ForwardConfig;
use xml_intake_lambda::handlers::forward::{handle_forward_event, ForwardDependencies};
use xml_intake_lambda::logging;

struct RuntimeDependencies {
    config: ForwardConfig,
    store: S3ObjectStore,
    sink: HttpDocumentSink,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    runtime: &RuntimeDependencies,
) -> Result<HandlerResponse, Error> {
    let deps = ForwardDependencies {
        store: &runtime.store,
        sink: &runtime.sink,
        namespace: &runtime.config.document_namespace,
    };
    Ok(handle_forward_event(&event.payload, &deps).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init("forward_lambda");

    let config = ForwardConfig::from_env().map_err(|error| Error::from(error.to_string()))?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

    let runtime = RuntimeDependencies {
        store: S3ObjectStore::new(aws_sdk_s3::Client::new(&aws_config)),
        sink: HttpDocumentSink::new(reqwest::Client::new(), config.forward_url.clone()),
        config,
    };
    let runtime = &runtime;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, runtime).await
    }))
    .await
}
