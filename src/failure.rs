use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::secrets::SecretError;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const APPLICATION_JSON: &str = "application/json";

const DEFAULT_STATUS_CODE: u16 = 500;

/// HTTP shaped response returned from every invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    pub status_code: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: String,
}

impl HttpResponse {
    /// Response with a JSON content type
    pub fn json(status_code: u16, body: String) -> Self {
        Self {
            status_code,
            headers: HashMap::from([(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string())]),
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Failure raised while handling an invocation
///
/// Carries an optional status code and body alongside the raw failure value,
/// any of which may be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub status_code: Option<u16>,
    pub body: Option<Value>,
    pub raw: Value,
}

impl Failure {
    pub fn new(raw: Value) -> Self {
        Self {
            status_code: None,
            body: None,
            raw,
        }
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl Serialize for Failure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.raw.serialize(serializer)
    }
}

impl From<SecretError> for Failure {
    fn from(error: SecretError) -> Self {
        let message = error.to_string();
        match error {
            SecretError::Store {
                status_code,
                code,
                message: store_message,
            } => {
                let body = json!({
                    "code": code,
                    "message": store_message,
                });
                let mut failure = Failure::new(json!({
                    "name": "StoreError",
                    "statusCode": status_code,
                    "code": code,
                    "message": message,
                }))
                .with_body(body);
                failure.status_code = status_code;
                failure
            }
            _ => Failure::new(json!({
                "name": "DecodeError",
                "message": message,
            })),
        }
    }
}

/// Convert a failure into the response handed back to the caller
pub fn normalize(failure: &Failure) -> HttpResponse {
    let status_code = match failure.status_code {
        Some(0) | None => DEFAULT_STATUS_CODE,
        Some(status_code) => status_code,
    };

    let body = failure.body.as_ref().unwrap_or(&failure.raw);

    HttpResponse::json(status_code, body.to_string())
}
