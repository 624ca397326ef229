use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

use crate::errors::ReaderError;

pub const DEFAULT_SINK_CAPACITY: usize = 1024;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Queue URL, always ending with `?`.
    pub sqs_endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    /// Signing region; derived from the endpoint host when absent.
    pub region: Option<String>,
    pub sink_capacity: usize,
}

pub fn load_config() -> Result<Config, ReaderError> {
    dotenv().ok();
    let sqs_endpoint = required("SQS_ENDPOINT")?;
    let access_key = required("AWS_ACCESS_KEY_ID")?;
    let secret_key = required("AWS_SECRET_ACCESS_KEY")?;
    let region = env::var("AWS_REGION").ok().filter(|r| !r.is_empty());
    let sink_capacity = match env::var("SINK_CAPACITY") {
        Ok(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ReaderError::ConfigError(format!("SINK_CAPACITY must be a positive integer, got {raw:?}"))
            })?,
        Err(_) => DEFAULT_SINK_CAPACITY,
    };
    Ok(Config {
        sqs_endpoint: normalize_endpoint(&sqs_endpoint),
        access_key,
        secret_key,
        region,
        sink_capacity,
    })
}

fn required(key: &str) -> Result<String, ReaderError> {
    env::var(key).map_err(|e| ReaderError::ConfigError(format!("{key}: {e}")))
}

/// Ensure the endpoint ends with the query separator so parameters can be appended.
pub fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.ends_with('?') {
        endpoint.to_string()
    } else {
        format!("{endpoint}?")
    }
}
