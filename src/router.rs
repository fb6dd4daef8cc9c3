//! Delegation seam between the invocation wrapper and the routing layer

use std::{future::Future, path::Path};

use lambda_runtime::Context;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    failure::{Failure, HttpResponse},
    secrets::Secrets,
};

/// Inbound invocation handed to a [Router]
pub struct RouteRequest<'a> {
    /// Event exactly as received from the runtime
    pub event: Value,
    /// Invocation context exactly as received from the runtime
    pub context: &'a Context,
    /// Secrets loaded for this invocation, when secret loading is enabled
    pub secrets: Option<&'a Secrets>,
}

/// Routing layer that performs the actual business dispatch of an event
pub trait Router {
    /// Dispatch `request` using the declarative routes in `route_file`
    fn route(
        &self,
        route_file: &Path,
        request: RouteRequest<'_>,
    ) -> impl Future<Output = Result<HttpResponse, Failure>> + Send;
}

/// Minimal declarative router answering API Gateway events with static
/// responses declared in a TOML route file:
///
/// ```toml
/// [[route]]
/// method = "GET"
/// path = "/health"
/// status = 200
/// body = { ok = true }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct RouteTable;

#[derive(Debug, Deserialize)]
struct RouteFile {
    #[serde(default, rename = "route")]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    method: String,
    path: String,
    #[serde(default = "default_status")]
    status: u16,
    #[serde(default)]
    body: Value,
}

fn default_status() -> u16 {
    200
}

impl RouteTable {
    async fn load(route_file: &Path) -> Result<RouteFile, Failure> {
        let contents = tokio::fs::read_to_string(route_file).await.map_err(|err| {
            tracing::error!(?err, path = %route_file.display(), "failed to read route file");
            Failure::new(json!({
                "name": "RouteFileError",
                "message": format!("failed to read route file: {err}"),
            }))
        })?;

        toml::from_str(&contents).map_err(|err| {
            tracing::error!(?err, path = %route_file.display(), "failed to parse route file");
            Failure::new(json!({
                "name": "RouteFileError",
                "message": format!("failed to parse route file: {err}"),
            }))
        })
    }
}

impl Router for RouteTable {
    async fn route(
        &self,
        route_file: &Path,
        request: RouteRequest<'_>,
    ) -> Result<HttpResponse, Failure> {
        let (method, path) = match request_line(&request.event) {
            Some(value) => value,
            None => {
                return Err(Failure::new(json!({
                    "name": "UnsupportedEvent",
                    "message": "event is not an HTTP request",
                }))
                .with_status_code(400)
                .with_body(json!({ "message": "unsupported event" })));
            }
        };

        let table = Self::load(route_file).await?;

        tracing::debug!(%method, %path, routes = table.routes.len(), "routing request");

        let route = table
            .routes
            .into_iter()
            .find(|route| route.method.eq_ignore_ascii_case(&method) && route.path == path);

        match route {
            Some(route) => Ok(HttpResponse::json(route.status, route.body.to_string())),
            None => {
                let message = format!("no route for {method} {path}");
                Err(Failure::new(json!({
                    "name": "RouteNotFound",
                    "statusCode": 404,
                    "message": message,
                }))
                .with_status_code(404)
                .with_body(json!({ "message": message })))
            }
        }
    }
}

/// Extract the method and path from a REST (v1) or HTTP (v2) API Gateway event
fn request_line(event: &Value) -> Option<(String, String)> {
    let method = event
        .get("httpMethod")
        .or_else(|| event.pointer("/requestContext/http/method"))
        .and_then(Value::as_str)?;
    let path = event
        .get("path")
        .or_else(|| event.get("rawPath"))
        .and_then(Value::as_str)?;

    Some((method.to_string(), path.to_string()))
}
