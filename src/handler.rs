use lambda_runtime::{Context, Error, LambdaEvent};
use serde_json::{Value, json};

use crate::{
    config::Config,
    failure::{APPLICATION_JSON, CONTENT_TYPE, Failure, HttpResponse, normalize},
    router::{RouteRequest, Router},
    secrets::{SecretStore, Secrets, fetch_secret},
};

/// Invocation wrapper delegating each event to the router, every failure is
/// turned into an HTTP shaped response
pub struct Handler<R, S> {
    config: Config,
    router: R,
    store: S,
}

impl<R, S> Handler<R, S>
where
    R: Router,
    S: SecretStore,
{
    pub fn new(config: Config, router: R, store: S) -> Self {
        Self {
            config,
            router,
            store,
        }
    }

    /// This is the main body for the function.
    ///
    /// Never fails, the error type only exists to satisfy the runtime.
    pub async fn handle(&self, event: LambdaEvent<Value>) -> Result<HttpResponse, Error> {
        Ok(self.invoke(event.payload, &event.context).await)
    }

    /// Load secrets when enabled then delegate the event to the router
    pub async fn invoke(&self, event: Value, context: &Context) -> HttpResponse {
        let secrets = match self.load_secrets(context).await {
            Ok(value) => value,
            Err(failure) => return normalize(&failure),
        };

        let request = RouteRequest {
            event,
            context,
            secrets: secrets.as_ref(),
        };

        match self.router.route(&self.config.route_file, request).await {
            Ok(response) => with_json_content_type(response),
            Err(failure) => {
                tracing::error!(
                    request_id = %context.request_id,
                    failure = %failure.raw,
                    "failed to handle event"
                );
                normalize(&failure)
            }
        }
    }

    async fn load_secrets(&self, context: &Context) -> Result<Option<Secrets>, Failure> {
        if !self.config.secrets_enabled {
            return Ok(None);
        }

        let key = self.config.secret_key().map_err(|err| {
            tracing::error!(?err, request_id = %context.request_id, "cannot build secret key");
            Failure::new(json!({
                "name": "ConfigError",
                "message": err.to_string(),
            }))
        })?;

        fetch_secret(&self.store, &key)
            .await
            .map(Some)
            .map_err(|err| {
                tracing::error!(
                    ?err,
                    %key,
                    request_id = %context.request_id,
                    "failed to load secrets"
                );
                Failure::from(err)
            })
    }
}

/// Responses without a content type are marked as JSON, an explicit content
/// type chosen by the router is kept
fn with_json_content_type(mut response: HttpResponse) -> HttpResponse {
    if response.header(CONTENT_TYPE).is_none() {
        response
            .headers
            .insert(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string());
    }
    response
}
