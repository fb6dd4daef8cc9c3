//! Secret loading and decoding
//!
//! A secret bundle is stored as a JSON object of string values. Depending on
//! how the secret was provisioned the store hands it back either as a string
//! or as binary, both decode into the same [Secrets] mapping.

use std::{collections::HashMap, fmt, future::Future};

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

/// Separator between the components of a [SecretKey]
const KEY_SEPARATOR: char = '/';

/// Identifier of a secret bundle in the form `environment/platform/function`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(environment: &str, platform: &str, function: &str) -> Self {
        Self(format!(
            "{environment}{KEY_SEPARATOR}{platform}{KEY_SEPARATOR}{function}"
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SecretKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Payload of a secret as returned by a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretPayload {
    /// Secret provisioned as a string
    Text(String),
    /// Secret provisioned as binary, the bytes are already unwrapped from
    /// their base64 envelope
    Binary(Vec<u8>),
}

/// Decoded secret bundle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secrets(HashMap<String, String>);

impl Secrets {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Secrets
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    /// The store rejected the request or could not be reached
    #[error("secret store request failed: {message}")]
    Store {
        /// HTTP status attached by the store, if a response was received
        status_code: Option<u16>,
        /// Service error code (e.g. "ResourceNotFoundException")
        code: Option<String>,
        message: String,
    },

    /// The record carried neither a string nor a binary payload
    #[error("secret record has neither SecretString nor SecretBinary")]
    MissingPayload,

    #[error("secret binary is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("secret binary is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("secret payload is not a JSON object of strings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Store holding secret bundles
pub trait SecretStore {
    /// Fetch the payload stored under `key`
    fn get_secret_value(
        &self,
        key: &SecretKey,
    ) -> impl Future<Output = Result<SecretPayload, SecretError>> + Send;
}

/// Fetch the secret bundle stored under `key` and decode it
///
/// Performs exactly one store request, failures are returned as-is without
/// any retry.
pub async fn fetch_secret<S>(store: &S, key: &SecretKey) -> Result<Secrets, SecretError>
where
    S: SecretStore,
{
    let payload = store.get_secret_value(key).await?;
    decode_secret(payload)
}

/// Decode a secret payload into its mapping
pub fn decode_secret(payload: SecretPayload) -> Result<Secrets, SecretError> {
    let secrets = match payload {
        SecretPayload::Text(text) => serde_json::from_str(&text)?,
        SecretPayload::Binary(bytes) => {
            let text = String::from_utf8(bytes)?;
            serde_json::from_str(&text)?
        }
    };

    Ok(secrets)
}

/// Wire shape of a `GetSecretValue` record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecretRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_string: Option<String>,
    /// Base64 encoded binary secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_binary: Option<String>,
}

impl SecretRecord {
    /// Record storing `secrets` as a JSON string
    pub fn from_secrets_string(secrets: &Secrets) -> Result<Self, SecretError> {
        Ok(Self {
            secret_string: Some(serde_json::to_string(secrets)?),
            secret_binary: None,
        })
    }

    /// Record storing `secrets` as base64 encoded JSON bytes
    pub fn from_secrets_binary(secrets: &Secrets) -> Result<Self, SecretError> {
        let bytes = serde_json::to_vec(secrets)?;
        Ok(Self {
            secret_string: None,
            secret_binary: Some(STANDARD.encode(bytes)),
        })
    }

    /// Convert the record into a payload, unwrapping the base64 envelope of
    /// binary secrets
    pub fn into_payload(self) -> Result<SecretPayload, SecretError> {
        match (self.secret_string, self.secret_binary) {
            (Some(text), _) => Ok(SecretPayload::Text(text)),
            (None, Some(encoded)) => Ok(SecretPayload::Binary(STANDARD.decode(encoded)?)),
            (None, None) => Err(SecretError::MissingPayload),
        }
    }
}

#[cfg(test)]
mod test {
    use std::{collections::HashMap, sync::Mutex};

    use super::{
        SecretError, SecretKey, SecretPayload, SecretRecord, SecretStore, Secrets, decode_secret,
        fetch_secret,
    };

    /// Store answering from a fixed set of records, counting requests
    struct FixedStore {
        records: HashMap<String, SecretRecord>,
        requests: Mutex<Vec<String>>,
    }

    impl FixedStore {
        fn new(records: &[(&str, SecretRecord)]) -> Self {
            Self {
                records: records
                    .iter()
                    .map(|(key, record)| (key.to_string(), record.clone()))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl SecretStore for FixedStore {
        async fn get_secret_value(&self, key: &SecretKey) -> Result<SecretPayload, SecretError> {
            self.requests.lock().unwrap().push(key.to_string());
            match self.records.get(key.as_str()) {
                Some(record) => record.clone().into_payload(),
                None => Err(SecretError::Store {
                    status_code: Some(400),
                    code: Some("ResourceNotFoundException".to_string()),
                    message: "secret not found".to_string(),
                }),
            }
        }
    }

    #[test]
    fn test_key_format() {
        let key = SecretKey::new("prod", "billing", "invoice");
        assert_eq!(key.as_str(), "prod/billing/invoice");
        assert_eq!(key.to_string(), "prod/billing/invoice");
    }

    #[test]
    fn test_decode_string_payload() {
        let secrets = decode_secret(SecretPayload::Text(r#"{"a":"1"}"#.to_string())).unwrap();
        assert_eq!(secrets, Secrets::from_iter([("a", "1")]));
    }

    #[test]
    fn test_decode_binary_record() {
        // base64 of {"b":"2"}
        let record = SecretRecord {
            secret_string: None,
            secret_binary: Some("eyJiIjoiMiJ9".to_string()),
        };
        let secrets = decode_secret(record.into_payload().unwrap()).unwrap();
        assert_eq!(secrets.get("b"), Some("2"));
        assert_eq!(secrets.len(), 1);
    }

    #[test]
    fn test_string_takes_precedence() {
        let record = SecretRecord {
            secret_string: Some(r#"{"a":"1"}"#.to_string()),
            secret_binary: Some("eyJiIjoiMiJ9".to_string()),
        };
        let secrets = decode_secret(record.into_payload().unwrap()).unwrap();
        assert_eq!(secrets.get("a"), Some("1"));
        assert_eq!(secrets.get("b"), None);
    }

    #[test]
    fn test_empty_record_is_an_error() {
        let err = SecretRecord::default().into_payload().unwrap_err();
        assert!(matches!(err, SecretError::MissingPayload));
    }

    #[test]
    fn test_empty_record_from_wire() {
        let record: SecretRecord = serde_json::from_str(r#"{"Name":"dev/a/b"}"#).unwrap();
        assert!(matches!(
            record.into_payload(),
            Err(SecretError::MissingPayload)
        ));
    }

    #[test]
    fn test_malformed_payloads() {
        let err = decode_secret(SecretPayload::Text("not json".to_string())).unwrap_err();
        assert!(matches!(err, SecretError::Json(_)));

        let err = decode_secret(SecretPayload::Text(r#"{"a":1}"#.to_string())).unwrap_err();
        assert!(matches!(err, SecretError::Json(_)));

        let err = decode_secret(SecretPayload::Binary(vec![0xff, 0xfe])).unwrap_err();
        assert!(matches!(err, SecretError::Utf8(_)));

        let record = SecretRecord {
            secret_string: None,
            secret_binary: Some("%%%".to_string()),
        };
        assert!(matches!(record.into_payload(), Err(SecretError::Base64(_))));
    }

    #[test]
    fn test_both_encodings_reproduce_mapping() {
        let secrets = Secrets::from_iter([
            ("db_password", "hunter2"),
            ("api_token", "tok-123"),
            ("unicode", "ß✓"),
        ]);

        for record in [
            SecretRecord::from_secrets_string(&secrets).unwrap(),
            SecretRecord::from_secrets_binary(&secrets).unwrap(),
        ] {
            let decoded = decode_secret(record.into_payload().unwrap()).unwrap();
            assert_eq!(decoded, secrets);
        }
    }

    #[tokio::test]
    async fn test_fetch_secret_single_request() {
        let store = FixedStore::new(&[(
            "dev/reports/render",
            SecretRecord {
                secret_string: Some(r#"{"token":"abc"}"#.to_string()),
                secret_binary: None,
            },
        )]);
        let key = SecretKey::new("dev", "reports", "render");

        let secrets = fetch_secret(&store, &key).await.unwrap();

        assert_eq!(secrets.get("token"), Some("abc"));
        assert_eq!(
            *store.requests.lock().unwrap(),
            vec!["dev/reports/render".to_string()]
        );
    }

    #[tokio::test]
    async fn test_fetch_secret_store_failure() {
        let store = FixedStore::new(&[]);
        let key = SecretKey::new("dev", "reports", "render");

        let err = fetch_secret(&store, &key).await.unwrap_err();

        assert!(matches!(
            err,
            SecretError::Store {
                status_code: Some(400),
                ..
            }
        ));
        assert_eq!(store.requests.lock().unwrap().len(), 1);
    }
}
