use aws_config::{BehaviorVersion, Region, SdkConfig, meta::region::RegionProviderChain};
use aws_sdk_secretsmanager::{
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::get_secret_value::{GetSecretValueError, GetSecretValueOutput},
};

use crate::secrets::{SecretError, SecretKey, SecretPayload, SecretStore};

const FALLBACK_REGION: &str = "us-east-1";

/// Create the AWS production configuration
pub async fn aws_config(region: Option<&str>) -> SdkConfig {
    let region_provider =
        RegionProviderChain::first_try(region.map(|value| Region::new(value.to_string())))
            .or_default_provider()
            // Fallback to our desired region
            .or_else(FALLBACK_REGION);

    // Load the configuration from env variables (See https://docs.aws.amazon.com/sdkref/latest/guide/settings-reference.html#EVarSettings)
    aws_config::defaults(BehaviorVersion::v2025_08_07())
        // Setup the region provider
        .region(region_provider)
        .load()
        .await
}

/// Secret store backed by AWS Secrets Manager
#[derive(Debug, Clone)]
pub struct AwsSecretStore {
    client: aws_sdk_secretsmanager::Client,
}

impl AwsSecretStore {
    pub fn new(client: aws_sdk_secretsmanager::Client) -> Self {
        Self { client }
    }

    /// Create a store from the shared configuration, optionally pointing the
    /// client at a different endpoint
    pub fn from_config(config: &SdkConfig, endpoint: Option<&str>) -> Self {
        let mut builder = aws_sdk_secretsmanager::config::Builder::from(config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self::new(aws_sdk_secretsmanager::Client::from_conf(builder.build()))
    }
}

impl SecretStore for AwsSecretStore {
    async fn get_secret_value(&self, key: &SecretKey) -> Result<SecretPayload, SecretError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(key.as_str())
            .send()
            .await
            .map_err(store_error)?;

        output_payload(output)
    }
}

/// Secrets Manager decrypts the secret with its KMS key, exactly one of the
/// string or binary fields is populated
fn output_payload(output: GetSecretValueOutput) -> Result<SecretPayload, SecretError> {
    if let Some(text) = output.secret_string() {
        return Ok(SecretPayload::Text(text.to_string()));
    }

    if let Some(blob) = output.secret_binary() {
        return Ok(SecretPayload::Binary(blob.as_ref().to_vec()));
    }

    Err(SecretError::MissingPayload)
}

fn store_error(err: SdkError<GetSecretValueError>) -> SecretError {
    let status_code = err
        .raw_response()
        .map(|response| response.status().as_u16());
    let code = err.code().map(str::to_string);
    let message = match err.message() {
        Some(message) => message.to_string(),
        None => DisplayErrorContext(&err).to_string(),
    };

    SecretError::Store {
        status_code,
        code,
        message,
    }
}
