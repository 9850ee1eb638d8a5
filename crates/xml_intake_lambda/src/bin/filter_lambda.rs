use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use xml_intake_core::contract::HandlerResponse;
use xml_intake_lambda::adapters::publisher::SqsPublisher;
use xml_intake_lambda::config::FilterConfig;
use xml_intake_lambda::handlers::filter::handle_filter_event;
use xml_intake_lambda::logging;

struct RuntimeDependencies {
    config: FilterConfig,
    publisher: SqsPublisher,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    runtime: &RuntimeDependencies,
) -> Result<HandlerResponse, Error> {
    Ok(handle_filter_event(&event.payload, &runtime.config.intake_prefix, &runtime.publisher).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init("filter_lambda");

    let config = FilterConfig::from_env().map_err(|error| Error::from(error.to_string()))?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let publisher = SqsPublisher::new(
        aws_sdk_sqs::Client::new(&aws_config),
        config.publish_queue_url.clone(),
    );

    let runtime = RuntimeDependencies { config, publisher };
    let runtime = &runtime;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, runtime).await
    }))
    .await
}
