//! Bucket sub-resource configurations: versioning, CORS and lifecycle.

/// Versioning state of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersioningStatus {
    /// Versioning enabled.
    Enabled,
    /// Versioning suspended.
    Suspended,
}

impl VersioningStatus {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            VersioningStatus::Enabled => "Enabled",
            VersioningStatus::Suspended => "Suspended",
        }
    }
}

impl std::str::FromStr for VersioningStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Enabled" => Ok(VersioningStatus::Enabled),
            "Suspended" => Ok(VersioningStatus::Suspended),
            _ => Err(format!("Unknown versioning status: {}", s)),
        }
    }
}

/// Versioning configuration. A bucket that never had versioning has no status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersioningConfiguration {
    /// Status.
    pub status: Option<VersioningStatus>,
}

/// HTTP method allowed by a CORS rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorsMethod {
    /// GET
    Get,
    /// PUT
    Put,
    /// POST
    Post,
    /// DELETE
    Delete,
    /// HEAD
    Head,
}

impl CorsMethod {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CorsMethod::Get => "GET",
            CorsMethod::Put => "PUT",
            CorsMethod::Post => "POST",
            CorsMethod::Delete => "DELETE",
            CorsMethod::Head => "HEAD",
        }
    }
}

impl std::str::FromStr for CorsMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(CorsMethod::Get),
            "PUT" => Ok(CorsMethod::Put),
            "POST" => Ok(CorsMethod::Post),
            "DELETE" => Ok(CorsMethod::Delete),
            "HEAD" => Ok(CorsMethod::Head),
            _ => Err(format!("Unknown CORS method: {}", s)),
        }
    }
}

/// One CORS rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsRule {
    /// Rule ID.
    pub id: Option<String>,
    /// Allowed origins.
    pub allowed_origins: Vec<String>,
    /// Allowed methods.
    pub allowed_methods: Vec<CorsMethod>,
    /// Allowed request headers.
    pub allowed_headers: Vec<String>,
    /// Response headers exposed to the browser.
    pub expose_headers: Vec<String>,
    /// Preflight cache duration.
    pub max_age_seconds: Option<u32>,
}

impl CorsRule {
    /// Rule allowing `methods` from `origin`.
    pub fn new(origin: impl Into<String>, methods: impl IntoIterator<Item = CorsMethod>) -> Self {
        Self {
            allowed_origins: vec![origin.into()],
            allowed_methods: methods.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Allow a request header.
    pub fn with_allowed_header(mut self, header: impl Into<String>) -> Self {
        self.allowed_headers.push(header.into());
        self
    }

    /// Set the preflight cache duration.
    pub fn with_max_age(mut self, seconds: u32) -> Self {
        self.max_age_seconds = Some(seconds);
        self
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsConfiguration {
    /// Rules.
    pub rules: Vec<CorsRule>,
}

/// Whether a lifecycle rule is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleStatus {
    /// Active.
    #[default]
    Enabled,
    /// Inactive.
    Disabled,
}

impl RuleStatus {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Enabled => "Enabled",
            RuleStatus::Disabled => "Disabled",
        }
    }
}

/// When current object versions expire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleExpiration {
    /// Days after creation.
    Days(u32),
    /// ISO 8601 date.
    Date(String),
}

/// One lifecycle rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleRule {
    /// Rule ID.
    pub id: Option<String>,
    /// Key prefix the rule applies to.
    pub prefix: String,
    /// Status.
    pub status: RuleStatus,
    /// Expiration of current versions.
    pub expiration: Option<LifecycleExpiration>,
    /// Days after which noncurrent versions expire.
    pub noncurrent_version_expiration_days: Option<u32>,
    /// Days after which incomplete multipart uploads are aborted.
    pub abort_incomplete_multipart_days: Option<u32>,
}

impl LifecycleRule {
    /// Rule expiring objects under `prefix` after `days`.
    pub fn expire_after(prefix: impl Into<String>, days: u32) -> Self {
        Self {
            prefix: prefix.into(),
            expiration: Some(LifecycleExpiration::Days(days)),
            ..Default::default()
        }
    }

    /// Set the rule ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Abort incomplete multipart uploads after `days`.
    pub fn with_abort_incomplete_multipart(mut self, days: u32) -> Self {
        self.abort_incomplete_multipart_days = Some(days);
        self
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleConfiguration {
    /// Rules.
    pub rules: Vec<LifecycleRule>,
}
