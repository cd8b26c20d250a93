use crate::types::{StorageError, StorageResult};
use reqwest::header::HeaderValue;
use reqwest::Url;
use std::env;
use std::fmt;
use std::time::Duration;

/// Default size of the chunks a file body is streamed in.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Connection settings for a [`StorageClient`](crate::StorageClient).
///
/// Values are validated once at construction and never change afterwards.
#[derive(Clone)]
pub struct ClientConfig {
    host_url: Url,
    token: String,
    chunk_size: usize,
    timeout: Option<Duration>,
}

impl ClientConfig {
    /// Validate a host URL and bearer token.
    pub fn new(host_url: &str, token: &str) -> StorageResult<Self> {
        let host_url = host_url.trim();
        let token = token.trim();

        if host_url.is_empty() {
            return Err(StorageError::Configuration("host URL must not be empty".into()));
        }
        if token.is_empty() {
            return Err(StorageError::Configuration("token must not be empty".into()));
        }

        let url = Url::parse(host_url).map_err(|e| {
            StorageError::Configuration(format!("invalid host URL {:?}: {}", host_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(StorageError::Configuration(format!(
                "host URL must be an absolute http(s) URL, got {:?}",
                host_url
            )));
        }

        // The token ends up in an Authorization header
        if HeaderValue::from_str(&format!("Bearer {}", token)).is_err() {
            return Err(StorageError::Configuration(
                "token contains characters not allowed in an HTTP header".into(),
            ));
        }

        Ok(Self {
            host_url: url,
            token: token.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: None,
        })
    }

    /// Load configuration from the environment (and `.env`).
    ///
    /// Reads `YOP_HOST_URL`, `YOP_TOKEN`, and optionally `YOP_CHUNK_SIZE`
    /// and `YOP_TIMEOUT_SECS`.
    pub fn from_env() -> StorageResult<Self> {
        Self::load(None, None)
    }

    /// Like [`from_env`](Self::from_env), but explicit values win over the
    /// environment.
    pub fn load(host_url: Option<String>, token: Option<String>) -> StorageResult<Self> {
        dotenvy::dotenv().ok();

        let host_url = host_url
            .or_else(|| env::var("YOP_HOST_URL").ok())
            .ok_or_else(|| StorageError::Configuration("YOP_HOST_URL must be set".into()))?;
        let token = token
            .or_else(|| env::var("YOP_TOKEN").ok())
            .ok_or_else(|| StorageError::Configuration("YOP_TOKEN must be set".into()))?;

        let mut config = Self::new(&host_url, &token)?;

        if let Ok(raw) = env::var("YOP_CHUNK_SIZE") {
            config.chunk_size = parse_chunk_size(&raw)?;
        }
        if let Ok(raw) = env::var("YOP_TIMEOUT_SECS") {
            config.timeout = Some(parse_timeout(&raw)?);
        }

        Ok(config)
    }

    /// Set the streaming chunk size (clamped to at least one byte).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set a whole-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn host_url(&self) -> &Url {
        &self.host_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host_url", &self.host_url.as_str())
            .field("token", &"<redacted>")
            .field("chunk_size", &self.chunk_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn parse_chunk_size(raw: &str) -> StorageResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(StorageError::Configuration(format!(
            "YOP_CHUNK_SIZE must be a positive integer, got {:?}",
            raw
        ))),
    }
}

fn parse_timeout(raw: &str) -> StorageResult<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(StorageError::Configuration(format!(
            "YOP_TIMEOUT_SECS must be a positive number of seconds, got {:?}",
            raw
        ))),
    }
}
