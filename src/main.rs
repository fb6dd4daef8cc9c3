#![recursion_limit = "256"]

use lambda_runtime::{Error, LambdaEvent, run, service_fn, tracing};
use secret_router_lambda::{
    aws::{AwsSecretStore, aws_config},
    config::Config,
    handler::Handler,
    local::FileSecretStore,
    router::RouteTable,
    secrets::SecretStore,
};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), Error> {
    _ = dotenvy::dotenv();

    tracing::init_default_subscriber();

    let config = Config::from_env()?;

    match config.local_secrets_file.clone() {
        Some(path) => {
            tracing::info!(path = %path.display(), "using local secrets file");
            serve(Handler::new(config, RouteTable, FileSecretStore::new(path))).await
        }
        None => {
            let aws_config = aws_config(config.region.as_deref()).await;
            let store =
                AwsSecretStore::from_config(&aws_config, config.secrets_endpoint.as_deref());
            serve(Handler::new(config, RouteTable, store)).await
        }
    }
}

async fn serve<S>(handler: Handler<RouteTable, S>) -> Result<(), Error>
where
    S: SecretStore,
{
    let handler = &handler;

    run(service_fn(move |event: LambdaEvent<Value>| async move {
        handler.handle(event).await
    }))
    .await
}
