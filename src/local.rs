use std::{collections::HashMap, path::PathBuf};

use crate::secrets::{SecretError, SecretKey, SecretPayload, SecretRecord, SecretStore};

/// Secret store reading `GetSecretValue` records from a local JSON file, keyed
/// by secret id:
///
/// ```json
/// { "dev/reports/render": { "SecretString": "{\"token\":\"abc\"}" } }
/// ```
///
/// The file is read on every request so edits apply to the next invocation.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SecretStore for FileSecretStore {
    async fn get_secret_value(&self, key: &SecretKey) -> Result<SecretPayload, SecretError> {
        let contents = tokio::fs::read(&self.path)
            .await
            .map_err(|err| SecretError::Store {
                status_code: None,
                code: None,
                message: format!(
                    "failed to read local secrets file {}: {err}",
                    self.path.display()
                ),
            })?;

        let mut records: HashMap<String, SecretRecord> = serde_json::from_slice(&contents)?;

        let record = records
            .remove(key.as_str())
            .ok_or_else(|| SecretError::Store {
                status_code: Some(400),
                code: Some("ResourceNotFoundException".to_string()),
                message: format!("secret {key} was not found in local secrets file"),
            })?;

        record.into_payload()
    }
}
