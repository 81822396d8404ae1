//! Configuration types for the client.
//!
//! [`S3Config`] is validated once when built and is read-only afterwards.
//! Endpoint selection and addressing style live in [`endpoints`].

pub mod endpoints;

pub use endpoints::{AddressingStyle, EndpointSet};

use crate::credentials::AwsCredentials;
use crate::error::{ConfigurationError, S3Error};
use crate::resilience::RetryConfig;
use std::time::Duration;
use url::Url;

/// Smallest part size the service accepts for non-final parts.
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;
/// Largest part size the service accepts.
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Configuration for the client.
#[derive(Clone)]
pub struct S3Config {
    /// Ordered base endpoints.
    pub endpoints: Vec<Url>,

    /// Bucket addressing style.
    ///
    /// Path: `https://endpoint/bucket/key`
    /// Virtual-hosted: `https://bucket.endpoint/key`
    pub addressing_style: AddressingStyle,

    /// Signing region (e.g., "us-east-1").
    pub region: String,

    /// Credentials; signing fails without them.
    pub credentials: Option<AwsCredentials>,

    /// Connection timeout per attempt.
    pub connect_timeout: Duration,

    /// Read timeout per attempt.
    pub read_timeout: Duration,

    /// Deadline for one logical call across all of its retries.
    pub operation_timeout: Duration,

    /// Retry policy settings.
    pub retry: RetryConfig,

    /// Maximum idle pooled connections per host.
    pub max_connections: usize,

    /// Idle timeout for pooled connections.
    pub idle_timeout: Duration,

    /// Verify TLS certificates.
    pub verify_ssl: bool,

    /// User-Agent header value.
    pub user_agent: String,

    /// Object size from which the high-level upload switches to multipart.
    pub multipart_threshold: u64,

    /// Default part size for multipart uploads.
    pub multipart_part_size: u64,

    /// Default number of parts uploaded concurrently.
    pub multipart_concurrency: usize,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoints", &self.endpoints)
            .field("addressing_style", &self.addressing_style)
            .field("region", &self.region)
            .field("credentials", &self.credentials)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("operation_timeout", &self.operation_timeout)
            .field("retry", &self.retry)
            .field("multipart_part_size", &self.multipart_part_size)
            .field("multipart_concurrency", &self.multipart_concurrency)
            .finish_non_exhaustive()
    }
}

fn default_endpoint(region: &str) -> Result<Url, ConfigurationError> {
    let raw = format!("https://s3.{}.amazonaws.com", region);
    Url::parse(&raw).map_err(|e| ConfigurationError::InvalidEndpoint {
        url: raw,
        details: e.to_string(),
    })
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoints: default_endpoint("us-east-1").into_iter().collect(),
            addressing_style: AddressingStyle::Path,
            region: "us-east-1".to_string(),
            credentials: None,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            operation_timeout: Duration::from_secs(300),
            retry: RetryConfig::default(),
            max_connections: 100,
            idle_timeout: Duration::from_secs(90),
            verify_ssl: true,
            user_agent: format!("s3-compat-integration/{}", env!("CARGO_PKG_VERSION")),
            multipart_threshold: 16 * 1024 * 1024,
            multipart_part_size: 8 * 1024 * 1024,
            multipart_concurrency: 4,
        }
    }
}

impl S3Config {
    /// Create a configuration builder.
    pub fn builder() -> S3ConfigBuilder {
        S3ConfigBuilder::new()
    }

    /// Build the endpoint set for this configuration.
    pub fn endpoint_set(&self) -> Result<EndpointSet, ConfigurationError> {
        EndpointSet::new(self.endpoints.clone())
    }
}

/// Builder for [`S3Config`].
#[derive(Default)]
pub struct S3ConfigBuilder {
    endpoints: Vec<Url>,
    invalid_endpoint: Option<ConfigurationError>,
    addressing_style: Option<AddressingStyle>,
    region: Option<String>,
    credentials: Option<AwsCredentials>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    operation_timeout: Option<Duration>,
    retry: Option<RetryConfig>,
    max_retries: Option<u32>,
    max_connections: Option<usize>,
    idle_timeout: Option<Duration>,
    verify_ssl: Option<bool>,
    user_agent: Option<String>,
    multipart_threshold: Option<u64>,
    multipart_part_size: Option<u64>,
    multipart_concurrency: Option<usize>,
}

impl S3ConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint. Parse failures are reported by [`build`](Self::build).
    pub fn endpoint(mut self, endpoint: impl AsRef<str>) -> Self {
        match Url::parse(endpoint.as_ref()) {
            Ok(url) => self.endpoints.push(url),
            Err(e) => {
                self.invalid_endpoint.get_or_insert(ConfigurationError::InvalidEndpoint {
                    url: endpoint.as_ref().to_string(),
                    details: e.to_string(),
                });
            }
        }
        self
    }

    /// Add a parsed endpoint.
    pub fn endpoint_url(mut self, endpoint: Url) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Set the addressing style.
    pub fn addressing_style(mut self, style: AddressingStyle) -> Self {
        self.addressing_style = Some(style);
        self
    }

    /// Shorthand for virtual-hosted (`true`) or path (`false`) addressing.
    pub fn virtual_hosted(self, enabled: bool) -> Self {
        self.addressing_style(if enabled {
            AddressingStyle::VirtualHosted
        } else {
            AddressingStyle::Path
        })
    }

    /// Set the signing region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the credentials.
    pub fn credentials(mut self, credentials: AwsCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the per-attempt read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the per-call deadline.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Replace the retry configuration.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Set the maximum number of retries.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set the maximum idle connections per host.
    pub fn max_connections(mut self, connections: usize) -> Self {
        self.max_connections = Some(connections);
        self
    }

    /// Set the idle timeout for pooled connections.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Set whether to verify TLS certificates.
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = Some(verify);
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the multipart threshold.
    pub fn multipart_threshold(mut self, threshold: u64) -> Self {
        self.multipart_threshold = Some(threshold);
        self
    }

    /// Set the multipart part size.
    pub fn multipart_part_size(mut self, size: u64) -> Self {
        self.multipart_part_size = Some(size);
        self
    }

    /// Set the multipart concurrency.
    pub fn multipart_concurrency(mut self, concurrency: usize) -> Self {
        self.multipart_concurrency = Some(concurrency);
        self
    }

    /// Load settings from environment variables.
    ///
    /// Explicitly set values take precedence only if set after this call.
    pub fn from_env(mut self) -> Self {
        if let Ok(region) = std::env::var("AWS_REGION") {
            self.region = Some(region);
        } else if let Ok(region) = std::env::var("AWS_DEFAULT_REGION") {
            self.region = Some(region);
        }

        if let Ok(list) = std::env::var("S3_ENDPOINTS") {
            for endpoint in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                self = self.endpoint(endpoint);
            }
        } else if let Ok(endpoint) = std::env::var("AWS_ENDPOINT_URL_S3") {
            self = self.endpoint(endpoint);
        }

        if let Ok(val) = std::env::var("S3_VIRTUAL_HOST") {
            self = self.virtual_hosted(val.eq_ignore_ascii_case("true"));
        }
        if let Ok(val) = std::env::var("S3_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.max_retries = Some(retries);
            }
        }
        if let Ok(val) = std::env::var("S3_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.operation_timeout = Some(Duration::from_secs(secs));
            }
        }

        if let Some(credentials) = AwsCredentials::from_env() {
            self.credentials = Some(credentials);
        }

        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<S3Config, S3Error> {
        if let Some(err) = self.invalid_endpoint {
            return Err(err.into());
        }
        let defaults = S3Config::default();
        let region = self.region.unwrap_or(defaults.region);

        let endpoints = if self.endpoints.is_empty() {
            vec![default_endpoint(&region)?]
        } else {
            self.endpoints
        };
        EndpointSet::new(endpoints.clone())?;

        let multipart_part_size = self.multipart_part_size.unwrap_or(defaults.multipart_part_size);
        if !(MIN_PART_SIZE..=MAX_PART_SIZE).contains(&multipart_part_size) {
            return Err(ConfigurationError::InvalidValue {
                field: "multipart_part_size",
                message: format!(
                    "must be between {} and {} bytes",
                    MIN_PART_SIZE, MAX_PART_SIZE
                ),
            }
            .into());
        }

        let multipart_concurrency = self
            .multipart_concurrency
            .unwrap_or(defaults.multipart_concurrency);
        if multipart_concurrency == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "multipart_concurrency",
                message: "must be at least 1".to_string(),
            }
            .into());
        }

        let mut retry = self.retry.unwrap_or(defaults.retry);
        if let Some(max_retries) = self.max_retries {
            retry.max_retries = max_retries;
        }
        if retry.backoff_multiplier < 1.0 {
            return Err(ConfigurationError::InvalidValue {
                field: "retry.backoff_multiplier",
                message: "must be at least 1.0".to_string(),
            }
            .into());
        }

        Ok(S3Config {
            endpoints,
            addressing_style: self.addressing_style.unwrap_or(defaults.addressing_style),
            region,
            credentials: self.credentials,
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            read_timeout: self.read_timeout.unwrap_or(defaults.read_timeout),
            operation_timeout: self.operation_timeout.unwrap_or(defaults.operation_timeout),
            retry,
            max_connections: self.max_connections.unwrap_or(defaults.max_connections),
            idle_timeout: self.idle_timeout.unwrap_or(defaults.idle_timeout),
            verify_ssl: self.verify_ssl.unwrap_or(defaults.verify_ssl),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            multipart_threshold: self.multipart_threshold.unwrap_or(defaults.multipart_threshold),
            multipart_part_size,
            multipart_concurrency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = S3Config::default();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.addressing_style, AddressingStyle::Path);
        assert!(config.credentials.is_none());
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_builder() {
        let config = S3Config::builder()
            .endpoint("http://10.0.0.1:9020")
            .endpoint("http://10.0.0.2:9020")
            .virtual_hosted(true)
            .region("eu-west-1")
            .credentials(AwsCredentials::new("AKID", "SECRET"))
            .max_retries(5)
            .operation_timeout(Duration::from_secs(30))
            .build()
            .unwrap();

        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.addressing_style, AddressingStyle::VirtualHosted);
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.operation_timeout, Duration::from_secs(30));
        assert_eq!(config.endpoint_set().unwrap().len(), 2);
    }

    #[test]
    fn test_default_endpoint_follows_region() {
        let config = S3Config::builder().region("ap-south-1").build().unwrap();
        assert_eq!(
            config.endpoints[0].as_str(),
            "https://s3.ap-south-1.amazonaws.com/"
        );
    }

    #[test]
    fn test_invalid_endpoint_reported_at_build() {
        let result = S3Config::builder().endpoint("not a url").build();
        assert!(matches!(
            result,
            Err(S3Error::Configuration(ConfigurationError::InvalidEndpoint { .. }))
        ));
    }

    #[test]
    fn test_invalid_part_size() {
        let result = S3Config::builder().multipart_part_size(1024).build();
        assert!(matches!(
            result,
            Err(S3Error::Configuration(ConfigurationError::InvalidValue {
                field: "multipart_part_size",
                ..
            }))
        ));
    }
}
